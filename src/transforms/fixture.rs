//! A small set.mm-like library shared by the transformation tests.

use super::{Engine, TransformConfig};
use crate::{
    database::Database,
    node::ParseNode,
    serialization::{load_library, load_worksheet, Formatter},
    syntax::Symbol,
    types::*,
    worksheet::Worksheet,
};

pub const LIBRARY: &str = "\
jdg wff
jdg class
var wff ph ps ch th
var class A B C D
opr wff -> 2
opr wff <-> 2
opr wff /\\ 2
opr wff = 2
opr wff e. 2
opr class + 2
opr class x. 2
opr class .o 2
opr class CC 0
opr class RR 0
opr class 1 0
axm { |- ph, |- (ph -> ps) => |- ps }: ax-mp
axm { |- ph, |- (ph <-> ps) => |- ps }: mpbi
axm { |- (ph <-> ps) => |- (ps <-> ph) }: bicomi
axm { |- (ph <-> ps), |- (ps <-> ch) => |- (ph <-> ch) }: bitri
axm { |- (A = B) => |- (B = A) }: eqcomi
axm { |- (A = B), |- (B = C) => |- (A = C) }: eqtri
axm { |- ph => |- (ps -> ph) }: a1i
axm { |- (ph -> ps), |- (ps -> ch) => |- (ph -> ch) }: syl
axm { |- (ph -> (ps <-> ch)) => |- (ph -> (ch <-> ps)) }: bicomd
axm { |- (ph -> (ps <-> ch)), |- (ph -> (ch <-> th)) => |- (ph -> (ps <-> th)) }: bitrd
axm { |- (ph -> (A = B)) => |- (ph -> (B = A)) }: eqcomd
axm { |- (ph -> (A = B)), |- (ph -> (B = C)) => |- (ph -> (A = C)) }: eqtrd
axm { |- (ph -> (ps <-> ch)) => |- ((ph -> ps) <-> (ph -> ch)) }: pm5.74i
axm { |- ph, |- ps => |- (ph /\\ ps) }: pm3.2i
axm { |- (ph /\\ ps) => |- ph }: simpli
axm { |- (ph /\\ ps) => |- ps }: simpri
axm { |- (ph -> ps), |- (ph -> ch) => |- (ph -> (ps /\\ ch)) }: jca
axm { |- (A = B) => |- ((A = C) <-> (B = C)) }: eqeq1i
axm { |- (A = B) => |- ((C = A) <-> (C = B)) }: eqeq2i
axm { |- ((A = B) -> ((A = C) <-> (B = C))) }: eqeq1
axm { |- ((A = B) -> ((C = A) <-> (C = B))) }: eqeq2
axm { |- (ph <-> ps) => |- ((ch -> ph) <-> (ch -> ps)) }: imbi2i
axm { |- ((ph <-> ps) -> ((ch -> ph) <-> (ch -> ps))) }: imbi2
axm { |- (A = B) => |- ((A + C) = (B + C)) }: addeq1i
axm { |- (A = B) => |- ((C + A) = (C + B)) }: addeq2i
axm { |- ((A = B) -> ((A + C) = (B + C))) }: addeq1
axm { |- ((A = B) -> ((C + A) = (C + B))) }: addeq2
axm { |- (A = B) => |- ((A x. C) = (B x. C)) }: muleq1i
axm { |- (A = B) => |- ((C x. A) = (C x. B)) }: muleq2i
axm { |- ((A = B) -> ((A x. C) = (B x. C))) }: muleq1
axm { |- ((A = B) -> ((C x. A) = (C x. B))) }: muleq2
axm { |- (A = B) => |- ((A .o C) = (B .o C)) }: coeq1i
axm { |- (A = B) => |- ((C .o A) = (C .o B)) }: coeq2i
axm { |- (1 e. CC) }: ax-1cn
axm { |- (1 e. RR) }: 1re
axm { |- (A e. CC), |- (B e. CC) => |- ((A + B) e. CC) }: addcl
axm { |- (A e. CC), |- (B e. CC) => |- ((A x. B) e. CC) }: mulcl
axm { |- (((A e. RR) /\\ (B e. RR)) -> ((A + B) e. RR)) }: readdcl
axm { |- ((A + B) = (B + A)) }: addcom
axm { |- (((A + B) + C) = (A + (B + C))) }: addass
axm { |- (A e. CC), |- (B e. CC) => |- ((A x. B) = (B x. A)) }: mulcomi
axm { |- (((A e. CC) /\\ (B e. CC)) -> ((A x. B) = (B x. A))) }: mulcom
axm { |- (A e. CC), |- (B e. CC), |- (C e. CC) => |- (((A x. B) x. C) = (A x. (B x. C))) }: mulassi
axm { |- (((A .o B) .o C) = (A .o (B .o C))) }: coass
";

pub struct Fixture {
    pub db: Database,
}

impl Fixture {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Fixture {
            db: load_library(LIBRARY).unwrap(),
        }
    }

    pub fn engine(&self) -> Engine<'_> {
        Engine::new(&self.db, TransformConfig::default())
    }

    pub fn op(&self, symbol: &str) -> Identifier {
        match self.db.syntax().lookup(symbol) {
            Some(Symbol::Operator(id)) => id,
            _ => panic!("no operator {}", symbol),
        }
    }

    pub fn label(&self, label: &str) -> AssertionId {
        self.db.find(label).unwrap()
    }

    pub fn parse(&self, expr: &str) -> ParseNode {
        let fmt = Formatter::new(self.db.syntax());
        let (rest, node) = fmt.parse_expression(expr).unwrap();
        assert_eq!(rest, "");
        node
    }

    pub fn format(&self, node: &ParseNode) -> String {
        Formatter::new(self.db.syntax()).expression_string(node)
    }

    pub fn worksheet(&self, text: &str) -> Worksheet {
        load_worksheet(&self.db, text).unwrap()
    }

    /// Checks every justified step of `worksheet`
    pub fn verify(&self, worksheet: &Worksheet) {
        for (id, step) in worksheet.steps() {
            if step.is_justified() {
                assert_eq!(worksheet.verify_step(&self.db, id), Ok(()), "step {}", id);
            }
        }
    }

    pub fn labels(&self, worksheet: &Worksheet, steps: &[StepId]) -> Vec<String> {
        steps
            .iter()
            .map(|s| match worksheet.step(*s).justification() {
                crate::worksheet::Justification::Assertion(a) => self.db.get(a).label().to_owned(),
                j => format!("{:?}", j),
            })
            .collect()
    }
}

//! Automatic proofs of goals that follow from an earlier step by rewriting with equalities.
//!
//! The [`Engine`] scans a [`Database`] once and mines the rules it can use: equivalences,
//! implications, conjunctions, closure laws like `A e. CC, B e. CC => (A + B) e. CC`, congruence
//! rules and associativity and commutativity laws. Afterwards
//! [`try_to_find_transformations`](Engine::try_to_find_transformations) proves a goal of a
//! [`Worksheet`] if some earlier step has the same canonical form, or if the goal is a closure
//! property that follows from the hypotheses.
//!
//! ```text
//! 1 |- (ph -> (A e. CC))        by hyp
//! 2 |- (ph -> (B e. CC))        by hyp
//! 3 |- (ph -> ((A x. B) = C))   by hyp
//! 4 |- (ph -> ((B x. A) = C))   by ?
//! ```
//!
//! Here the engine proves `(A x. B) = (B x. A)` under the prefix `ph` from the closure
//! hypotheses, lifts it through `=` and `->` and finishes step 4 from step 3.

use log::{debug, info, trace};

mod assoc_com;
mod assoc_tree;
mod associative;
mod closure;
mod commutative;
mod conjunction;
mod const_subst;
mod equivalence;
#[cfg(all(test, feature = "serialization"))]
mod fixture;
mod implication;
mod replace;
mod rule_map;
mod template;
mod transformation;
mod worksheet_info;

pub use assoc_tree::AssocTree;
pub use associative::AssociativeInfo;
pub use closure::{ClosureInfo, ClosureResult};
pub use commutative::CommutativeInfo;
pub use conjunction::ConjunctionInfo;
pub use const_subst::ConstSubst;
pub use equivalence::EquivalenceInfo;
pub use implication::ImplicationInfo;
pub use replace::ReplaceInfo;
pub use rule_map::{GeneralizedStmt, RuleGroup, RuleKey, RuleMap};
pub use template::PropertyTemplate;
pub use transformation::Transformation;
pub use worksheet_info::{GenProofStep, WorksheetInfo};

use associative::AssocContext;
use transformation::Necessity;

use crate::{
    assertion::Assertion,
    database::{Database, LOGIC_TYPECODE},
    error::TransformError,
    node::ParseNode,
    types::*,
    worksheet::Worksheet,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformConfig {
    /// Work under the antecedent of a goal `ph -> ...` if `ph` is a variable
    pub support_implication_prefix: bool,
    /// Log every mined closure template and the operators whose simple and implication
    /// congruence rules disagree
    pub debug: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        TransformConfig {
            support_implication_prefix: true,
            debug: false,
        }
    }
}

/// The rules mined from one database, and the synthesis of proof steps from them.
///
/// The synthesis methods live next to the rules they use, in the submodules of this module.
pub struct Engine<'a> {
    db: &'a Database,
    config: TransformConfig,
    pub(crate) eq: EquivalenceInfo,
    pub(crate) imp: ImplicationInfo,
    pub(crate) conj: ConjunctionInfo,
    pub(crate) closure: ClosureInfo,
    pub(crate) replace: ReplaceInfo,
    pub(crate) assoc: AssociativeInfo,
    pub(crate) com: CommutativeInfo,
}

/// The side condition of an assertion like `A e. CC, B e. CC => (A x. B) = (B x. A)`: none if
/// there are no hypotheses, otherwise one property shared by all mandatory variables
fn transform_operation_template(assertion: &Assertion) -> Option<PropertyTemplate> {
    let hyps = assertion.hypotheses();
    if hyps.is_empty() {
        return Some(PropertyTemplate::empty());
    }
    let (template, vars) = PropertyTemplate::from_hypotheses(hyps)?;
    if vars.as_slice() == assertion.mandatory_variables() {
        Some(template)
    } else {
        None
    }
}

impl<'a> Engine<'a> {
    pub fn new(db: &'a Database, config: TransformConfig) -> Self {
        let mut eq = EquivalenceInfo::new(db);
        let imp = ImplicationInfo::new(db, &eq);
        eq.fill_deduct_rules(db, &imp);
        let conj = ConjunctionInfo::new(db, &imp);
        let closure = ClosureInfo::new(db, &imp, &conj);
        let replace = ReplaceInfo::new(db, &eq, &imp);
        let assoc = AssociativeInfo::new(
            db,
            &AssocContext {
                eq: &eq,
                imp: &imp,
                conj: &conj,
                closure: &closure,
                replace: &replace,
            },
        );
        let com = CommutativeInfo::new(db, &eq, &imp, &conj);
        info!("mined transformation rules from {} assertions", db.len());

        if config.debug {
            for template in closure.possible_properties() {
                debug!("closure template {:?}", template);
            }
            for stmt in replace.differing_forms() {
                debug!("congruence rules of operator {} differ between forms", stmt);
            }
        }

        Engine {
            db,
            config,
            eq,
            imp,
            conj,
            closure,
            replace,
            assoc,
            com,
        }
    }

    pub fn db(&self) -> &'a Database {
        self.db
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Proves `left = right` by the associativity or commutativity law `rule`, from the closure
    /// `hyps` of the operands.
    ///
    /// In implication form the hypotheses are first gathered into the rule's antecedent. The
    /// result is prefixed if one of the hypotheses is.
    fn apply_closure_properties(
        &self,
        info: &mut WorksheetInfo,
        impl_form: bool,
        hyps: &[GenProofStep],
        rule: AssertionId,
        left: &ParseNode,
        right: &ParseNode,
    ) -> Result<GenProofStep, TransformError> {
        let conclusion = self.db.get(rule).conclusion();
        let eq_node = if impl_form {
            conclusion.child(1)
        } else {
            conclusion
        };
        let node = ParseNode::binary(eq_node.stmt(), left.clone(), right.clone());
        if !impl_form {
            let hyps: Vec<_> = hyps.iter().collect();
            return Ok(info.get_or_create(node, &hyps, rule));
        }
        let hyp = self.concatenate_in_the_same_pattern(info, hyps, conclusion.child(0))?;
        self.apply_hyp(info, &hyp, &node, rule)
    }

    /// Tries to prove the pending step `goal` and returns the steps that were created, the goal
    /// included.
    ///
    /// The worksheet is left untouched if no proof is found.
    pub fn try_to_find_transformations(
        &self,
        worksheet: &mut Worksheet,
        goal: StepId,
    ) -> Option<Vec<StepId>> {
        if worksheet.step(goal).is_justified() {
            debug!("step {} is already justified", goal);
            return None;
        }
        let mut scratch = worksheet.clone();
        let mut info = WorksheetInfo::new(self.db, &mut scratch, goal);
        match self.find_transformations(&mut info) {
            Ok(Some(_)) => {
                let new_steps = info.into_new_steps();
                *worksheet = scratch;
                Some(new_steps)
            }
            Ok(None) => {
                debug!("no transformation found for step {}", goal);
                None
            }
            Err(e) => {
                debug!("transformation of step {} failed: {}", goal, e);
                None
            }
        }
    }

    fn find_transformations(
        &self,
        info: &mut WorksheetInfo,
    ) -> Result<Option<GenProofStep>, TransformError> {
        let goal = info.goal_formula().clone();
        if self.config.support_implication_prefix {
            if let Some((op, prefix, _)) = self.imp.extract_prefix_and_get_impl_part(&goal) {
                if prefix.is_var() {
                    info.set_prefix(op, prefix);
                }
            }
        }
        let eq_impl = match self.imp.eq_implication(LOGIC_TYPECODE) {
            Some(eq_impl) => eq_impl,
            None => {
                debug!("no equivalence implication for provable statements");
                return Ok(None);
            }
        };

        let goal_tr = self.create_transformation(info, &goal);
        let canonical = self.transformation_canonical_form(info, &goal_tr);
        let candidates: Vec<StepId> = info
            .worksheet()
            .steps()
            .take_while(|(id, _)| *id != info.goal())
            .filter(|(_, step)| step.is_justified())
            .map(|(id, _)| id)
            .collect();
        for id in candidates {
            let source = info.gen_step(id, None);
            let source_tr = self.create_transformation(info, source.formula());
            if self.transformation_canonical_form(info, &source_tr) != canonical {
                continue;
            }
            trace!("step {} has the canonical form of the goal", id);
            let res = match self.transform(info, &source_tr, &goal_tr) {
                Ok(Some(res)) if !res.has_prefix() => res,
                Ok(Some(_)) => {
                    debug!("step {} only leads to the goal under its prefix", id);
                    continue;
                }
                Ok(None) => continue,
                Err(e) => {
                    debug!("step {} does not lead to the goal: {}", id, e);
                    continue;
                }
            };
            return Ok(Some(info.finish(&[&source, &res], eq_impl)));
        }
        self.perform_closure_transformation(info)
    }
}

#[cfg(all(test, feature = "serialization"))]
mod tests {
    use super::fixture::*;
    use super::*;
    use quickcheck::{Arbitrary, Gen};

    /// Runs the engine on the last step of `worksheet` and returns the labels of the new steps
    fn prove(fx: &Fixture, engine: &Engine, worksheet: &mut Worksheet) -> Option<Vec<String>> {
        let goal = worksheet.len() - 1;
        let new_steps = engine.try_to_find_transformations(worksheet, goal)?;
        assert_eq!(worksheet.verify_all(&fx.db), Ok(()));
        assert_eq!(new_steps.last(), Some(&goal));
        Some(fx.labels(worksheet, &new_steps))
    }

    #[test]
    fn commuted_sum() {
        let fx = Fixture::new();
        let mut worksheet = fx.worksheet("hyp |- ((A + B) = C)\ngoal |- ((B + A) = C)\n");
        let labels = prove(&fx, &fx.engine(), &mut worksheet);
        assert_eq!(labels.unwrap(), vec!["addcom", "eqeq1i", "mpbi"]);
    }

    #[test]
    fn reassociated_chain() {
        let fx = Fixture::new();
        let mut worksheet = fx.worksheet(
            "hyp |- ((((A .o B) .o C) .o D) = D)\ngoal |- ((A .o (B .o (C .o D))) = D)\n",
        );
        let labels = prove(&fx, &fx.engine(), &mut worksheet);
        assert_eq!(
            labels.unwrap(),
            vec!["coass", "coass", "eqtri", "eqeq1i", "mpbi"]
        );
    }

    #[test]
    fn commuted_product_under_prefix() {
        let fx = Fixture::new();
        let mut worksheet = fx.worksheet(
            "hyp |- (ph -> (A e. CC))\n\
             hyp |- (ph -> (B e. CC))\n\
             hyp |- (ph -> ((A x. B) = C))\n\
             goal |- (ph -> ((B x. A) = C))\n",
        );
        let labels = prove(&fx, &fx.engine(), &mut worksheet);
        assert_eq!(
            labels.unwrap(),
            vec!["jca", "mulcom", "syl", "eqeq1", "syl", "pm5.74i", "mpbi"]
        );
        let distributed = fx.parse("((ph -> ((A x. B) = C)) <-> (ph -> ((B x. A) = C)))");
        assert!(worksheet.find(&distributed, 3).is_some());
    }

    #[test]
    fn prefix_can_be_disabled() {
        let fx = Fixture::new();
        let engine = Engine::new(
            &fx.db,
            TransformConfig {
                support_implication_prefix: false,
                debug: true,
            },
        );
        let mut worksheet = fx.worksheet(
            "hyp |- (ph -> (A e. CC))\n\
             hyp |- (ph -> (B e. CC))\n\
             hyp |- (ph -> ((A x. B) = C))\n\
             goal |- (ph -> ((B x. A) = C))\n",
        );
        let before = worksheet.clone();
        assert_eq!(prove(&fx, &engine, &mut worksheet), None);
        assert_eq!(worksheet, before);
    }

    #[test]
    fn closure_goal() {
        let fx = Fixture::new();
        let mut worksheet = fx.worksheet("hyp |- (A e. CC)\ngoal |- ((A x. 1) e. CC)\n");
        let labels = prove(&fx, &fx.engine(), &mut worksheet);
        assert_eq!(labels.unwrap(), vec!["ax-1cn", "mulcl"]);
    }

    #[test]
    fn unrelated_goal() {
        let fx = Fixture::new();
        let mut worksheet = fx.worksheet("hyp |- ((A + B) = C)\ngoal |- ((A + C) = B)\n");
        let before = worksheet.clone();
        assert_eq!(prove(&fx, &fx.engine(), &mut worksheet), None);
        assert_eq!(worksheet, before);

        let mut worksheet = fx.worksheet("hyp |- (A = B)\nhyp |- (A = B)\n");
        assert_eq!(fx.engine().try_to_find_transformations(&mut worksheet, 1), None);
    }

    /// A class expression in the syntax of the fixture
    #[derive(Clone, Debug)]
    struct ClassExpr(String);

    impl Arbitrary for ClassExpr {
        fn arbitrary(g: &mut Gen) -> Self {
            fn gen(g: &mut Gen, depth: usize) -> String {
                if depth == 0 || u8::arbitrary(g) % 3 == 0 {
                    return g.choose(&["A", "B", "C", "1"]).unwrap().to_string();
                }
                let op = g.choose(&["+", "x.", ".o"]).unwrap();
                format!("({} {} {})", gen(g, depth - 1), op, gen(g, depth - 1))
            }
            ClassExpr(gen(g, 3))
        }
    }

    quickcheck! {
        fn canonical_form_is_idempotent(expr: ClassExpr) -> bool {
            let fx = Fixture::new();
            let engine = fx.engine();
            let mut worksheet = fx.worksheet("goal |- ph\n");
            let info = WorksheetInfo::new(&fx.db, &mut worksheet, 0);
            let canonical = engine.canonical_form(&info, &fx.parse(&expr.0));
            engine.canonical_form(&info, &canonical) == canonical
        }

        fn swapped_sums_are_equal(a: ClassExpr, b: ClassExpr) -> bool {
            let fx = Fixture::new();
            let engine = fx.engine();
            let mut worksheet = fx.worksheet("goal |- ph\n");
            let mut info = WorksheetInfo::new(&fx.db, &mut worksheet, 0);
            let source = fx.parse(&format!("({} + {})", a.0, b.0));
            let target = fx.parse(&format!("({} + {})", b.0, a.0));
            if engine.canonical_form(&info, &source) != engine.canonical_form(&info, &target) {
                return false;
            }
            let source = engine.create_transformation(&info, &source);
            let target = engine.create_transformation(&info, &target);
            let ok = match engine.transform(&mut info, &source, &target) {
                Ok(None) => a.0 == b.0,
                Ok(Some(step)) => {
                    step.core().children() == [source.node().clone(), target.node().clone()]
                }
                Err(_) => false,
            };
            drop(info);
            fx.verify(&worksheet);
            ok
        }

        fn closure_is_monotone(expr: ClassExpr) -> bool {
            let fx = Fixture::new();
            let engine = fx.engine();
            let mut worksheet = fx.worksheet("hyp |- (A e. CC)\ngoal |- ph\n");
            let info = WorksheetInfo::new(&fx.db, &mut worksheet, 1);
            let cc = PropertyTemplate::from_hypothesis(&fx.parse("(A e. CC)"), fx.parse("A").stmt())
                .unwrap();
            let node = fx.parse(&expr.0);
            if !engine.closure_possibility(&info, &cc, &node, true).has_closure() {
                return true;
            }
            ["(1 + {})", "({} x. A)"].iter().all(|outer| {
                let outer = fx.parse(&outer.replace("{}", &expr.0));
                engine.closure_possibility(&info, &cc, &outer, true).has_closure()
            })
        }

        fn reassociated_chains_are_equal(leaves: Vec<ClassExpr>) -> bool {
            if leaves.len() < 2 {
                return true;
            }
            let fx = Fixture::new();
            let engine = fx.engine();
            let mut worksheet = fx.worksheet("goal |- ph\n");
            let mut info = WorksheetInfo::new(&fx.db, &mut worksheet, 0);
            let leaves: Vec<_> = leaves.iter().take(5).map(|l| fx.parse(&l.0)).collect();
            let dot = fx.op(".o");
            let left = leaves[1..].iter().fold(leaves[0].clone(), |acc, l| {
                ParseNode::binary(dot, acc, l.clone())
            });
            let right = leaves[..leaves.len() - 1]
                .iter()
                .rev()
                .fold(leaves[leaves.len() - 1].clone(), |acc, l| {
                    ParseNode::binary(dot, l.clone(), acc)
                });
            let source = engine.create_transformation(&info, &left);
            let target = engine.create_transformation(&info, &right);
            let ok = match engine.transform(&mut info, &source, &target) {
                Ok(None) => left == right,
                Ok(Some(step)) => step.core().children() == [left, right],
                Err(_) => false,
            };
            drop(info);
            fx.verify(&worksheet);
            ok
        }
    }
}

use std::collections::HashMap;

use log::debug;

use super::{Engine, EquivalenceInfo, GenProofStep, ImplicationInfo, WorksheetInfo};
use crate::{
    assertion::Assertion, database::Database, error::TransformError, node::ParseNode, types::*,
};

/// Congruence rules: `A = B => (A + C) = (B + C)` replaces the operand at one position of an
/// operator by an equal one.
#[derive(Debug, Default)]
pub struct ReplaceInfo {
    replace_rules: HashMap<Identifier, Vec<Option<AssertionId>>>,
    /// `A = B -> (A + C) = (B + C)`
    impl_replace_rules: HashMap<Identifier, Vec<Option<AssertionId>>>,
}

impl ReplaceInfo {
    pub fn new(db: &Database, eq: &EquivalenceInfo, imp: &ImplicationInfo) -> Self {
        let mut info = Self::default();
        for (id, assertion) in db.assertions() {
            info.find_replace_rule(eq, id, assertion);
            info.find_impl_replace_rule(eq, imp, id, assertion);
        }
        info
    }

    /// Checks that `concl` is `op(.., a, ..) = op(.., b, ..)` where `hyp` is `a = b` (or
    /// `b = a`) and returns the operator, the position of `a` and the arity
    fn core_check(
        eq: &EquivalenceInfo,
        concl: &ParseNode,
        hyp: &ParseNode,
    ) -> Option<(Identifier, usize, usize)> {
        if !eq.is_equivalence(concl.stmt()) || !eq.is_equivalence(hyp.stmt()) {
            return None;
        }
        if hyp.children().len() != 2 || hyp.children().iter().any(|c| !c.is_var()) {
            return None;
        }
        if concl.children().len() != 2 {
            return None;
        }
        let (left, right) = (concl.child(0), concl.child(1));
        if left.stmt() != right.stmt() || left.children().len() != right.children().len() {
            return None;
        }
        let mut differing = (0..left.children().len()).filter(|i| left.child(*i) != right.child(*i));
        let i = differing.next()?;
        if differing.next().is_some() {
            return None;
        }
        let pair = (left.child(i), right.child(i));
        if pair != (hyp.child(0), hyp.child(1)) && pair != (hyp.child(1), hyp.child(0)) {
            return None;
        }
        Some((left.stmt(), i, left.children().len()))
    }

    fn register(
        rules: &mut HashMap<Identifier, Vec<Option<AssertionId>>>,
        (stmt, i, arity): (Identifier, usize, usize),
        id: AssertionId,
    ) -> bool {
        let slots = rules.entry(stmt).or_insert_with(|| vec![None; arity]);
        if slots[i].is_some() {
            return false;
        }
        slots[i] = Some(id);
        true
    }

    // A = B => (A + C) = (B + C)
    fn find_replace_rule(&mut self, eq: &EquivalenceInfo, id: AssertionId, assertion: &Assertion) {
        let hyp = match assertion.hypotheses() {
            [hyp] => hyp,
            _ => return,
        };
        if assertion.depth() != 3 {
            return;
        }
        if let Some(core) = Self::core_check(eq, assertion.conclusion(), hyp) {
            if Self::register(&mut self.replace_rules, core, id) {
                debug!("replace rule: {}", assertion.label());
            }
        }
    }

    // A = B -> (A + C) = (B + C)
    fn find_impl_replace_rule(
        &mut self,
        eq: &EquivalenceInfo,
        imp: &ImplicationInfo,
        id: AssertionId,
        assertion: &Assertion,
    ) {
        let root = assertion.conclusion();
        if !assertion.hypotheses().is_empty()
            || assertion.depth() != 4
            || !imp.is_impl_operator(root.stmt())
        {
            return;
        }
        if let Some(core) = Self::core_check(eq, root.child(1), root.child(0)) {
            if Self::register(&mut self.impl_replace_rules, core, id) {
                debug!("implication replace rule: {}", assertion.label());
            }
        }
    }

    /// Whether every operand of `stmt` can be replaced without the implication forms
    pub fn is_full_replace_statement(&self, stmt: Identifier) -> bool {
        self.replace_rules
            .get(&stmt)
            .map_or(false, |slots| slots.iter().all(Option::is_some))
    }

    /// The positions of `stmt` which can be replaced. Under a prefix only the implication forms
    /// are usable.
    pub fn possible_replaces(&self, stmt: Identifier, has_prefix: bool) -> Option<Vec<bool>> {
        let implications = self.impl_replace_rules.get(&stmt);
        let simple = if has_prefix {
            None
        } else {
            self.replace_rules.get(&stmt)
        };
        let arity = implications.or(simple)?.len();
        let res: Vec<_> = (0..arity)
            .map(|i| {
                let has = |slots: Option<&Vec<Option<AssertionId>>>| {
                    slots.map_or(false, |s| s[i].is_some())
                };
                has(simple) || has(implications)
            })
            .collect();
        if res.iter().any(|b| *b) {
            Some(res)
        } else {
            None
        }
    }

    /// Operators whose simple and implication forms replace different positions, sorted
    pub fn differing_forms(&self) -> Vec<Identifier> {
        let positions = |slots: Option<&Vec<Option<AssertionId>>>| -> Vec<bool> {
            slots.map_or_else(Vec::new, |s| s.iter().map(Option::is_some).collect())
        };
        let mut res: Vec<_> = self
            .replace_rules
            .keys()
            .chain(self.impl_replace_rules.keys())
            .copied()
            .filter(|stmt| {
                positions(self.replace_rules.get(stmt))
                    != positions(self.impl_replace_rules.get(stmt))
            })
            .collect();
        res.sort_unstable();
        res.dedup();
        res
    }

    fn rule(
        rules: &HashMap<Identifier, Vec<Option<AssertionId>>>,
        stmt: Identifier,
        i: usize,
    ) -> Option<AssertionId> {
        rules.get(&stmt)?.get(i).copied().flatten()
    }
}

impl Engine<'_> {
    /// From `child` proving `prev[i] = new_child`, proves `prev = prev[i := new_child]`
    pub fn create_replace_step(
        &self,
        info: &mut WorksheetInfo,
        prev: &ParseNode,
        i: usize,
        new_child: &ParseNode,
        child: &GenProofStep,
    ) -> Result<GenProofStep, TransformError> {
        let stmt = prev.stmt();
        let res = prev.with_child(i, new_child.clone());
        if !child.has_prefix() {
            if let Some(rule) = ReplaceInfo::rule(&self.replace.replace_rules, stmt, i) {
                let eq = self.db.get(rule).conclusion().stmt();
                let node = ParseNode::binary(eq, prev.clone(), res);
                return Ok(info.get_or_create(node, &[child], rule));
            }
        }
        let rule = ReplaceInfo::rule(&self.replace.impl_replace_rules, stmt, i)
            .ok_or(TransformError::MissingRule("replace", stmt))?;
        let eq = self.db.get(rule).conclusion().child(1).stmt();
        let node = ParseNode::binary(eq, prev.clone(), res);
        self.apply_hyp(info, child, &node, rule)
    }
}

#[cfg(all(test, feature = "serialization"))]
mod tests {
    use super::super::fixture::*;
    use super::*;

    #[test]
    fn mines_replace_rules() {
        let fx = Fixture::new();
        let replace = &fx.engine().replace;
        let plus = fx.op("+");
        assert_eq!(
            ReplaceInfo::rule(&replace.replace_rules, plus, 0),
            Some(fx.label("addeq1i"))
        );
        assert_eq!(
            ReplaceInfo::rule(&replace.impl_replace_rules, fx.op("="), 1),
            Some(fx.label("eqeq2"))
        );
        assert!(replace.is_full_replace_statement(plus));
        assert!(replace.is_full_replace_statement(fx.op(".o")));
        assert!(!replace.is_full_replace_statement(fx.op("->")));
        assert_eq!(
            replace.possible_replaces(fx.op("->"), true),
            Some(vec![false, true])
        );
        assert_eq!(
            replace.possible_replaces(fx.op(".o"), false),
            Some(vec![true, true])
        );
        assert_eq!(replace.possible_replaces(fx.op(".o"), true), None);
        assert_eq!(replace.possible_replaces(fx.op("e."), false), None);
        assert_eq!(replace.differing_forms(), vec![fx.op(".o")]);
    }

    #[test]
    fn replace_steps() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let mut worksheet = fx.worksheet(
            "hyp |- (A = B)\nhyp |- (ph -> (A = B))\ngoal |- ph\n",
        );
        let mut info = WorksheetInfo::new(&fx.db, &mut worksheet, 2);
        info.set_prefix(fx.op("->"), fx.parse("ph"));
        let prev = fx.parse("(C .o A)");
        let b = fx.parse("B");

        let plain = info.gen_step(0, None);
        let step = engine
            .create_replace_step(&mut info, &prev, 1, &b, &plain)
            .unwrap();
        assert!(!step.has_prefix());
        assert_eq!(step.formula(), &fx.parse("((C .o A) = (C .o B))"));

        let prefixed = info.gen_step(1, info.prefix());
        let prev = fx.parse("(C + A)");
        let step = engine
            .create_replace_step(&mut info, &prev, 1, &b, &prefixed)
            .unwrap();
        assert_eq!(step.formula(), &fx.parse("(ph -> ((C + A) = (C + B)))"));
        assert_eq!(
            engine.create_replace_step(&mut info, &fx.parse("(C .o A)"), 1, &b, &prefixed),
            Err(TransformError::MissingRule("replace", fx.op(".o")))
        );
        let new_steps = info.into_new_steps();
        assert_eq!(
            fx.labels(&worksheet, &new_steps),
            vec!["coeq2i", "addeq2", "syl"]
        );
        fx.verify(&worksheet);
    }
}

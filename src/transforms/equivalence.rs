use std::collections::HashMap;

use log::{debug, warn};

use super::{Engine, GenProofStep, ImplicationInfo, WorksheetInfo};
use crate::{
    assertion::Assertion, database::Database, error::TransformError, node::ParseNode,
    syntax::Syntax, types::*,
};

/// Equality-like operators (`=`, `<->`) together with their symmetry and transitivity laws.
#[derive(Debug, Default)]
pub struct EquivalenceInfo {
    eq_map: HashMap<Typecode, Identifier>,
    commutatives: HashMap<Identifier, AssertionId>,
    transitives: HashMap<Identifier, AssertionId>,
    /// Keyed by implication operator and equivalence operator
    deduct_commutatives: HashMap<(Identifier, Identifier), AssertionId>,
    deduct_transitives: HashMap<(Identifier, Identifier), AssertionId>,
}

impl EquivalenceInfo {
    pub fn new(db: &Database) -> Self {
        let mut info = Self::default();
        for (id, assertion) in db.assertions() {
            info.find_commutative_rule(id, assertion);
        }
        for (id, assertion) in db.assertions() {
            info.find_transitive_rule(id, assertion);
        }
        info.filter_only_eq_rules(db);
        info
    }

    // b = a => a = b
    fn find_commutative_rule(&mut self, id: AssertionId, assertion: &Assertion) {
        let hyp = match assertion.hypotheses() {
            [hyp] => hyp,
            _ => return,
        };
        if assertion.mandatory_variables().len() != 2 || hyp.depth() != 2 || assertion.depth() != 2
        {
            return;
        }
        let root = assertion.conclusion();
        if root.children().len() != 2 || hyp.stmt() != root.stmt() {
            return;
        }
        if hyp.child(0) != root.child(1) || hyp.child(1) != root.child(0) {
            return;
        }
        if self.commutatives.contains_key(&root.stmt()) {
            return;
        }
        debug!("equivalence commutative rule: {}", assertion.label());
        self.commutatives.insert(root.stmt(), id);
    }

    // a = b, b = c => a = c
    fn find_transitive_rule(&mut self, id: AssertionId, assertion: &Assertion) {
        let (hyp1, hyp2) = match assertion.hypotheses() {
            [hyp1, hyp2] => (hyp1, hyp2),
            _ => return,
        };
        if assertion.mandatory_variables().len() != 3
            || hyp1.depth() != 2
            || hyp2.depth() != 2
            || assertion.depth() != 2
        {
            return;
        }
        let root = assertion.conclusion();
        let stmt = root.stmt();
        if root.children().len() != 2 || hyp1.stmt() != stmt || hyp2.stmt() != stmt {
            return;
        }
        if hyp1.child(0) != root.child(0)
            || hyp1.child(1) != hyp2.child(0)
            || hyp2.child(1) != root.child(1)
        {
            return;
        }
        if self.transitives.contains_key(&stmt) {
            return;
        }
        debug!("equivalence transitive rule: {}", assertion.label());
        self.transitives.insert(stmt, id);
    }

    fn filter_only_eq_rules(&mut self, db: &Database) {
        let transitives = &self.transitives;
        self.commutatives.retain(|stmt, _| transitives.contains_key(stmt));
        let commutatives = &self.commutatives;
        self.transitives.retain(|stmt, _| commutatives.contains_key(stmt));

        // library order decides which operator a typecode gets
        for (id, assertion) in db.assertions() {
            let root = assertion.conclusion();
            if self.commutatives.get(&root.stmt()) != Some(&id) {
                continue;
            }
            let typecode = match db.syntax().typecode_of(root.child(0)) {
                Some(t) => t,
                None => continue,
            };
            match self.eq_map.get(&typecode) {
                Some(other) => warn!(
                    "more than one equality operator for typecode {}: {} and {}",
                    db.syntax().typecode_name(typecode),
                    other,
                    root.stmt()
                ),
                None => {
                    debug!(
                        "equality for typecode {}: {}",
                        db.syntax().typecode_name(typecode),
                        root.stmt()
                    );
                    self.eq_map.insert(typecode, root.stmt());
                }
            }
        }
    }

    /// Mines `ph -> b = a => ph -> a = b` and `ph -> a = b, ph -> b = c => ph -> a = c`. Needs
    /// the implication operators.
    pub fn fill_deduct_rules(&mut self, db: &Database, imp: &ImplicationInfo) {
        for (id, assertion) in db.assertions() {
            self.find_deduct_commutative_rule(id, assertion, imp);
        }
        for (id, assertion) in db.assertions() {
            self.find_deduct_transitive_rule(id, assertion, imp);
        }
        for op in imp.impl_for_prefix_operators() {
            for eq in self.commutatives.keys() {
                if !self.deduct_commutatives.contains_key(&(op, *eq)) {
                    warn!(
                        "no deduction form of the commutative rule for {} under {}",
                        eq, op
                    );
                }
                if !self.deduct_transitives.contains_key(&(op, *eq)) {
                    warn!(
                        "no deduction form of the transitive rule for {} under {}",
                        eq, op
                    );
                }
            }
        }
    }

    /// Splits `ph -> core` where `ph` is the first mandatory variable
    fn split_deduction<'a>(
        &self,
        assertion: &Assertion,
        node: &'a ParseNode,
        op: Identifier,
    ) -> Option<&'a ParseNode> {
        if node.stmt() != op || node.children().len() != 2 {
            return None;
        }
        let prefix = assertion.mandatory_variables().first()?;
        if node.child(0) != &ParseNode::var(*prefix) {
            return None;
        }
        let core = node.child(1);
        if self.is_equivalence(core.stmt()) && core.children().len() == 2 {
            Some(core)
        } else {
            None
        }
    }

    fn find_deduct_commutative_rule(
        &mut self,
        id: AssertionId,
        assertion: &Assertion,
        imp: &ImplicationInfo,
    ) {
        let hyp = match assertion.hypotheses() {
            [hyp] => hyp,
            _ => return,
        };
        if assertion.mandatory_variables().len() != 3 || hyp.depth() != 3 || assertion.depth() != 3
        {
            return;
        }
        let root = assertion.conclusion();
        let op = root.stmt();
        if !imp.is_impl_for_prefix_operator(op) {
            return;
        }
        let (core, hyp_core) = match (
            self.split_deduction(assertion, root, op),
            self.split_deduction(assertion, hyp, op),
        ) {
            (Some(core), Some(hyp_core)) => (core, hyp_core),
            _ => return,
        };
        if hyp_core.stmt() != core.stmt()
            || hyp_core.child(0) != core.child(1)
            || hyp_core.child(1) != core.child(0)
        {
            return;
        }
        if self.deduct_commutatives.contains_key(&(op, core.stmt())) {
            return;
        }
        debug!(
            "equivalence commutative deduction rule: {}",
            assertion.label()
        );
        self.deduct_commutatives.insert((op, core.stmt()), id);
    }

    fn find_deduct_transitive_rule(
        &mut self,
        id: AssertionId,
        assertion: &Assertion,
        imp: &ImplicationInfo,
    ) {
        let (hyp1, hyp2) = match assertion.hypotheses() {
            [hyp1, hyp2] => (hyp1, hyp2),
            _ => return,
        };
        if assertion.mandatory_variables().len() != 4
            || hyp1.depth() != 3
            || hyp2.depth() != 3
            || assertion.depth() != 3
        {
            return;
        }
        let root = assertion.conclusion();
        let op = root.stmt();
        if !imp.is_impl_for_prefix_operator(op) {
            return;
        }
        let (core, core1, core2) = match (
            self.split_deduction(assertion, root, op),
            self.split_deduction(assertion, hyp1, op),
            self.split_deduction(assertion, hyp2, op),
        ) {
            (Some(core), Some(core1), Some(core2)) => (core, core1, core2),
            _ => return,
        };
        let stmt = core.stmt();
        if core1.stmt() != stmt || core2.stmt() != stmt {
            return;
        }
        if core1.child(0) != core.child(0)
            || core1.child(1) != core2.child(0)
            || core2.child(1) != core.child(1)
        {
            return;
        }
        if self.deduct_transitives.contains_key(&(op, stmt)) {
            return;
        }
        debug!(
            "equivalence transitive deduction rule: {}",
            assertion.label()
        );
        self.deduct_transitives.insert((op, stmt), id);
    }

    pub fn is_equivalence(&self, stmt: Identifier) -> bool {
        self.eq_map.values().any(|s| *s == stmt)
    }

    /// The equality operator for expressions of `typecode`
    pub fn eq_stmt(&self, typecode: Typecode) -> Option<Identifier> {
        self.eq_map.get(&typecode).copied()
    }

    pub fn commutative(&self, stmt: Identifier) -> Option<AssertionId> {
        self.commutatives.get(&stmt).copied()
    }

    pub fn transitive(&self, stmt: Identifier) -> Option<AssertionId> {
        self.transitives.get(&stmt).copied()
    }

    /// `left = right` with the equality operator of `left`'s typecode
    pub fn create_eq_node(
        &self,
        syntax: &Syntax,
        left: &ParseNode,
        right: &ParseNode,
    ) -> Result<ParseNode, TransformError> {
        let typecode = syntax
            .typecode_of(left)
            .ok_or(TransformError::UnknownTypecode(left.stmt()))?;
        debug_assert_eq!(syntax.typecode_of(right), Some(typecode));
        let stmt = self
            .eq_stmt(typecode)
            .ok_or(TransformError::NoEquality(typecode))?;
        Ok(ParseNode::binary(stmt, left.clone(), right.clone()))
    }
}

impl Engine<'_> {
    /// Turns a proof of `a = b` into a proof of `b = a`
    pub fn create_reverse_step(
        &self,
        info: &mut WorksheetInfo,
        source: &GenProofStep,
    ) -> Result<GenProofStep, TransformError> {
        let core = source.core();
        let eq = core.stmt();
        let reversed = ParseNode::binary(eq, core.child(1).clone(), core.child(0).clone());
        if !source.has_prefix() {
            let rule = self
                .eq
                .commutative(eq)
                .ok_or(TransformError::MissingRule("equality commutative", eq))?;
            return Ok(info.get_or_create(reversed, &[source], rule));
        }
        let op = info.prefix_stmt().ok_or(TransformError::NoPrefix)?;
        let rule = self
            .eq
            .deduct_commutatives
            .get(&(op, eq))
            .copied()
            .ok_or(TransformError::MissingRule("deduction commutative", eq))?;
        let node = info.apply_prefix(&reversed);
        let step = info.get_or_create(node, &[source], rule);
        Ok(info.with_prefix(step))
    }

    /// Chains `a = b` and `b = c` into `a = c`. A missing first step yields the second one.
    ///
    /// If one of the steps is proven under the prefix, the other one is lifted and the deduction
    /// form of transitivity is used.
    pub fn get_transitive_step(
        &self,
        info: &mut WorksheetInfo,
        first: Option<GenProofStep>,
        second: GenProofStep,
    ) -> Result<GenProofStep, TransformError> {
        let first = match first {
            Some(first) => first,
            None => return Ok(second),
        };
        let (first_core, second_core) = (first.core(), second.core());
        let eq = first_core.stmt();
        debug_assert_eq!(eq, second_core.stmt());
        debug_assert_eq!(first_core.child(1), second_core.child(0));
        let res = ParseNode::binary(
            eq,
            first_core.child(0).clone(),
            second_core.child(1).clone(),
        );
        if !first.has_prefix() && !second.has_prefix() {
            let rule = self
                .eq
                .transitive(eq)
                .ok_or(TransformError::MissingRule("equality transitive", eq))?;
            return Ok(info.get_or_create(res, &[&first, &second], rule));
        }
        let op = info.prefix_stmt().ok_or(TransformError::NoPrefix)?;
        let rule = self
            .eq
            .deduct_transitives
            .get(&(op, eq))
            .copied()
            .ok_or(TransformError::MissingRule("deduction transitive", eq))?;
        let first = self.lift_to_prefix(info, first)?;
        let second = self.lift_to_prefix(info, second)?;
        let node = info.apply_prefix(&res);
        let step = info.get_or_create(node, &[&first, &second], rule);
        Ok(info.with_prefix(step))
    }

    /// Returns `step` proven under the prefix, applying the stub rule if it is plain
    pub(super) fn lift_to_prefix(
        &self,
        info: &mut WorksheetInfo,
        step: GenProofStep,
    ) -> Result<GenProofStep, TransformError> {
        if step.has_prefix() {
            Ok(step)
        } else {
            self.apply_stub_rule(info, &step)
        }
    }
}

#[cfg(all(test, feature = "serialization"))]
mod tests {
    use super::super::fixture::*;
    use super::*;

    #[test]
    fn mines_equalities() {
        let fx = Fixture::new();
        let eq = &fx.engine().eq;
        let class = fx.db.syntax().typecode("class").unwrap();
        let wff = fx.db.syntax().typecode("wff").unwrap();
        assert_eq!(eq.eq_stmt(class), Some(fx.op("=")));
        assert_eq!(eq.eq_stmt(wff), Some(fx.op("<->")));
        assert!(eq.is_equivalence(fx.op("=")));
        assert!(!eq.is_equivalence(fx.op("->")));
        assert_eq!(eq.commutative(fx.op("=")), Some(fx.label("eqcomi")));
        assert_eq!(eq.transitive(fx.op("<->")), Some(fx.label("bitri")));
        assert_eq!(
            eq.deduct_transitives.get(&(fx.op("->"), fx.op("="))),
            Some(&fx.label("eqtrd"))
        );
        assert_eq!(
            eq.deduct_commutatives.get(&(fx.op("->"), fx.op("<->"))),
            Some(&fx.label("bicomd"))
        );
    }

    #[test]
    fn reverse_and_chain() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let mut worksheet =
            fx.worksheet("hyp |- (A = B)\nhyp |- (C = B)\ngoal |- (A = C)\n");
        let mut info = WorksheetInfo::new(&fx.db, &mut worksheet, 2);
        let first = info.gen_step(0, None);
        let second = info.gen_step(1, None);
        let reversed = engine.create_reverse_step(&mut info, &second).unwrap();
        assert_eq!(reversed.core(), &fx.parse("(B = C)"));
        let chained = engine
            .get_transitive_step(&mut info, Some(first), reversed)
            .unwrap();
        assert_eq!(chained.core(), &fx.parse("(A = C)"));
        assert_eq!(info.new_steps().len(), 2);
        fx.verify(&worksheet);
    }
}

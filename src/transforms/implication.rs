use std::collections::HashMap;

use log::{debug, warn};

use super::{Engine, EquivalenceInfo, GenProofStep, WorksheetInfo};
use crate::{
    assertion::Assertion, database::Database, error::TransformError, node::ParseNode, types::*,
};

/// Implication-like operators: everything with a modus ponens rule `ph, ph -> ps => ps`.
///
/// Operators which are not equivalences may carry a prefix, for those the stub rule
/// `ph => ps -> ph` and the transitive rule `ph -> ps, ps -> ch => ph -> ch` are mined as well.
#[derive(Debug, Default)]
pub struct ImplicationInfo {
    impl_ops: HashMap<Identifier, AssertionId>,
    prefix_ops: Vec<Identifier>,
    eq_implications: HashMap<Typecode, AssertionId>,
    stubs: HashMap<Identifier, AssertionId>,
    transitives: HashMap<Identifier, AssertionId>,
    /// `ph -> (ps = ch) => (ph -> ps) = (ph -> ch)`, keyed by implication and equivalence
    distributives: HashMap<(Identifier, Identifier), AssertionId>,
}

impl ImplicationInfo {
    pub fn new(db: &Database, eq: &EquivalenceInfo) -> Self {
        let mut info = Self::default();
        for (id, assertion) in db.assertions() {
            info.find_impl_op_rule(db, eq, id, assertion);
        }
        for (id, assertion) in db.assertions() {
            info.find_stub_rule(id, assertion);
            info.find_transitive_rule(id, assertion);
        }
        for op in &info.prefix_ops {
            if !info.stubs.contains_key(op) {
                warn!("implication operator {} has no stub rule", op);
            }
            if !info.transitives.contains_key(op) {
                warn!("implication operator {} has no transitive rule", op);
            }
        }
        for (id, assertion) in db.assertions() {
            info.find_distributive_rule(eq, id, assertion);
        }
        info
    }

    // ph, ph -> ps => ps
    fn find_impl_op_rule(
        &mut self,
        db: &Database,
        eq: &EquivalenceInfo,
        id: AssertionId,
        assertion: &Assertion,
    ) {
        let (pre, hyp) = match assertion.hypotheses() {
            [pre, hyp] => (pre, hyp),
            _ => return,
        };
        let res = assertion.conclusion();
        if res.depth() != 1 || !res.is_var() || !pre.is_var() || pre == res {
            return;
        }
        if hyp.children().len() != 2 || hyp.child(0) != pre || hyp.child(1) != res {
            return;
        }
        let op = hyp.stmt();
        if self.impl_ops.contains_key(&op) {
            return;
        }
        debug!("implication operator {}: {}", op, assertion.label());
        self.impl_ops.insert(op, id);
        if !eq.is_equivalence(op) {
            self.prefix_ops.push(op);
            return;
        }
        if let Some(typecode) = db.syntax().typecode_of(res) {
            self.eq_implications.entry(typecode).or_insert(id);
        }
    }

    // ph => ps -> ph
    fn find_stub_rule(&mut self, id: AssertionId, assertion: &Assertion) {
        let hyp = match assertion.hypotheses() {
            [hyp] => hyp,
            _ => return,
        };
        let root = assertion.conclusion();
        if !hyp.is_var() || !self.is_impl_for_prefix_operator(root.stmt()) {
            return;
        }
        if root.child(1) != hyp || !root.child(0).is_var() || root.child(0) == hyp {
            return;
        }
        if self.stubs.contains_key(&root.stmt()) {
            return;
        }
        debug!("stub rule: {}", assertion.label());
        self.stubs.insert(root.stmt(), id);
    }

    // ph -> ps, ps -> ch => ph -> ch
    fn find_transitive_rule(&mut self, id: AssertionId, assertion: &Assertion) {
        let (hyp1, hyp2) = match assertion.hypotheses() {
            [hyp1, hyp2] => (hyp1, hyp2),
            _ => return,
        };
        let root = assertion.conclusion();
        let op = root.stmt();
        if !self.is_impl_for_prefix_operator(op) || hyp1.stmt() != op || hyp2.stmt() != op {
            return;
        }
        if [root, hyp1, hyp2]
            .iter()
            .any(|n| n.depth() != 2 || n.children().iter().any(|c| !c.is_var()))
        {
            return;
        }
        if hyp1.child(0) != root.child(0)
            || hyp1.child(1) != hyp2.child(0)
            || hyp2.child(1) != root.child(1)
        {
            return;
        }
        if self.transitives.contains_key(&op) {
            return;
        }
        debug!("implication transitive rule: {}", assertion.label());
        self.transitives.insert(op, id);
    }

    fn find_distributive_rule(&mut self, eq: &EquivalenceInfo, id: AssertionId, assertion: &Assertion) {
        let hyp = match assertion.hypotheses() {
            [hyp] => hyp,
            _ => return,
        };
        let op = hyp.stmt();
        if !self.is_impl_for_prefix_operator(op) || hyp.children().len() != 2 {
            return;
        }
        let (prefix, core) = (hyp.child(0), hyp.child(1));
        let eq_op = core.stmt();
        if !prefix.is_var() || !eq.is_equivalence(eq_op) || core.children().len() != 2 {
            return;
        }
        let expected = ParseNode::binary(
            eq_op,
            ParseNode::binary(op, prefix.clone(), core.child(0).clone()),
            ParseNode::binary(op, prefix.clone(), core.child(1).clone()),
        );
        if *assertion.conclusion() != expected {
            return;
        }
        if self.distributives.contains_key(&(op, eq_op)) {
            return;
        }
        debug!("distributive rule: {}", assertion.label());
        self.distributives.insert((op, eq_op), id);
    }

    pub fn is_impl_operator(&self, op: Identifier) -> bool {
        self.impl_ops.contains_key(&op)
    }

    /// Whether `op` is an implication which is not an equivalence
    pub fn is_impl_for_prefix_operator(&self, op: Identifier) -> bool {
        self.prefix_ops.contains(&op)
    }

    pub fn impl_for_prefix_operators(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.prefix_ops.iter().copied()
    }

    /// The modus ponens rule of the equivalence for statements of `typecode`
    pub fn eq_implication(&self, typecode: Typecode) -> Option<AssertionId> {
        self.eq_implications.get(&typecode).copied()
    }

    /// Splits `ph -> core` into the operator, the prefix `ph` and the core
    pub fn extract_prefix_and_get_impl_part(
        &self,
        goal: &ParseNode,
    ) -> Option<(Identifier, ParseNode, ParseNode)> {
        if !self.is_impl_for_prefix_operator(goal.stmt()) || goal.children().len() != 2 {
            return None;
        }
        Some((goal.stmt(), goal.child(0).clone(), goal.child(1).clone()))
    }

    fn impl_op(&self, op: Identifier) -> Result<AssertionId, TransformError> {
        self.impl_ops
            .get(&op)
            .copied()
            .ok_or(TransformError::MissingRule("modus ponens", op))
    }

    fn transitive(&self, op: Identifier) -> Result<AssertionId, TransformError> {
        self.transitives
            .get(&op)
            .copied()
            .ok_or(TransformError::MissingRule("implication transitive", op))
    }

    fn stub(&self, op: Identifier) -> Result<AssertionId, TransformError> {
        self.stubs
            .get(&op)
            .copied()
            .ok_or(TransformError::MissingRule("stub", op))
    }
}

impl Engine<'_> {
    /// `core => prefix -> core`
    pub fn apply_stub_rule(
        &self,
        info: &mut WorksheetInfo,
        core: &GenProofStep,
    ) -> Result<GenProofStep, TransformError> {
        debug_assert!(!core.has_prefix());
        let op = info.prefix_stmt().ok_or(TransformError::NoPrefix)?;
        let stub = self.imp.stub(op)?;
        let node = info.apply_prefix(core.formula());
        let step = info.get_or_create(node, &[core], stub);
        Ok(info.with_prefix(step))
    }

    /// Proves the goal `prefix -> core` from `core`
    pub fn finish_stub_rule(
        &self,
        info: &mut WorksheetInfo,
        core: &GenProofStep,
    ) -> Result<GenProofStep, TransformError> {
        let op = info.prefix_stmt().ok_or(TransformError::NoPrefix)?;
        let stub = self.imp.stub(op)?;
        Ok(info.finish(&[core], stub))
    }

    /// Instantiates the implication `maj_assrt` as `hyp -> impl_node` and returns the step
    /// proving `impl_node`, together with the transitive rule to chain a prefixed hypothesis
    fn major_step(
        &self,
        info: &mut WorksheetInfo,
        hyp: &ParseNode,
        impl_node: &ParseNode,
        maj_assrt: AssertionId,
    ) -> (Identifier, GenProofStep) {
        let op = info.db().get(maj_assrt).conclusion().stmt();
        let node = ParseNode::binary(op, hyp.clone(), impl_node.clone());
        (op, info.get_or_create(node, &[], maj_assrt))
    }

    /// From `prefix -> hyp` and the implication `hyp -> impl_node` given by `maj_assrt`, proves
    /// `prefix -> impl_node`
    pub fn apply_transitive_rule(
        &self,
        info: &mut WorksheetInfo,
        min: &GenProofStep,
        impl_node: &ParseNode,
        maj_assrt: AssertionId,
    ) -> Result<GenProofStep, TransformError> {
        let (op, maj) = self.major_step(info, min.core(), impl_node, maj_assrt);
        debug_assert_eq!(info.prefix_stmt(), Some(op));
        let trans = self.imp.transitive(op)?;
        let node = info.apply_prefix(impl_node);
        let step = info.get_or_create(node, &[min, &maj], trans);
        Ok(info.with_prefix(step))
    }

    /// Like [`apply_transitive_rule`](#method.apply_transitive_rule), but proves the goal
    pub fn finish_transitive_rule(
        &self,
        info: &mut WorksheetInfo,
        min: &GenProofStep,
        impl_node: &ParseNode,
        maj_assrt: AssertionId,
    ) -> Result<GenProofStep, TransformError> {
        let (op, maj) = self.major_step(info, min.core(), impl_node, maj_assrt);
        let trans = self.imp.transitive(op)?;
        Ok(info.finish(&[min, &maj], trans))
    }

    /// From `hyp` and the implication `hyp -> impl_node` given by `maj_assrt`, proves
    /// `impl_node` by modus ponens
    pub fn apply_implication_rule(
        &self,
        info: &mut WorksheetInfo,
        min: &GenProofStep,
        impl_node: &ParseNode,
        maj_assrt: AssertionId,
    ) -> Result<GenProofStep, TransformError> {
        let (op, maj) = self.major_step(info, min.formula(), impl_node, maj_assrt);
        let rule = self.imp.impl_op(op)?;
        Ok(info.get_or_create(impl_node.clone(), &[min, &maj], rule))
    }

    /// Like [`apply_implication_rule`](#method.apply_implication_rule), but proves the goal
    pub fn finish_with_implication(
        &self,
        info: &mut WorksheetInfo,
        min: &GenProofStep,
        impl_node: &ParseNode,
        maj_assrt: AssertionId,
    ) -> Result<GenProofStep, TransformError> {
        let (op, maj) = self.major_step(info, min.formula(), impl_node, maj_assrt);
        let rule = self.imp.impl_op(op)?;
        Ok(info.finish(&[min, &maj], rule))
    }

    /// Uses the implication `maj_assrt` on `hyp`, keeping `hyp`'s prefix
    pub fn apply_hyp(
        &self,
        info: &mut WorksheetInfo,
        hyp: &GenProofStep,
        impl_node: &ParseNode,
        maj_assrt: AssertionId,
    ) -> Result<GenProofStep, TransformError> {
        if hyp.has_prefix() {
            self.apply_transitive_rule(info, hyp, impl_node, maj_assrt)
        } else {
            self.apply_implication_rule(info, hyp, impl_node, maj_assrt)
        }
    }

    /// Turns `prefix -> (a = b)` into the plain `(prefix -> a) = (prefix -> b)`
    pub fn apply_distributive_rule(
        &self,
        info: &mut WorksheetInfo,
        step: &GenProofStep,
    ) -> Result<GenProofStep, TransformError> {
        let op = info.prefix_stmt().ok_or(TransformError::NoPrefix)?;
        let core = step.core();
        let eq = core.stmt();
        let rule = self
            .imp
            .distributives
            .get(&(op, eq))
            .copied()
            .ok_or(TransformError::MissingRule("distributive", eq))?;
        let node = ParseNode::binary(
            eq,
            info.apply_prefix(core.child(0)),
            info.apply_prefix(core.child(1)),
        );
        Ok(info.get_or_create(node, &[step], rule))
    }
}

#[cfg(all(test, feature = "serialization"))]
mod tests {
    use super::super::fixture::*;
    use super::*;

    #[test]
    fn mines_implications() {
        let fx = Fixture::new();
        let imp = &fx.engine().imp;
        assert!(imp.is_impl_operator(fx.op("->")));
        assert!(imp.is_impl_operator(fx.op("<->")));
        assert!(imp.is_impl_for_prefix_operator(fx.op("->")));
        assert!(!imp.is_impl_for_prefix_operator(fx.op("<->")));
        assert_eq!(imp.eq_implication(0), Some(fx.label("mpbi")));
        assert_eq!(imp.stub(fx.op("->")), Ok(fx.label("a1i")));
        assert_eq!(imp.transitive(fx.op("->")), Ok(fx.label("syl")));
        assert_eq!(
            imp.distributives.get(&(fx.op("->"), fx.op("<->"))),
            Some(&fx.label("pm5.74i"))
        );

        let goal = fx.parse("(ph -> (A = B))");
        assert_eq!(
            imp.extract_prefix_and_get_impl_part(&goal),
            Some((fx.op("->"), fx.parse("ph"), fx.parse("(A = B)")))
        );
        assert_eq!(
            imp.extract_prefix_and_get_impl_part(&fx.parse("(ph <-> ps)")),
            None
        );
    }

    #[test]
    fn hypotheses_keep_their_prefix() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let mut worksheet = fx.worksheet(
            "hyp |- (A = B)\nhyp |- (ph -> (A = B))\ngoal |- (ph -> ((A + C) = (B + C)))\n",
        );
        let mut info = WorksheetInfo::new(&fx.db, &mut worksheet, 2);
        info.set_prefix(fx.op("->"), fx.parse("ph"));
        let addeq1 = fx.label("addeq1");
        let target = fx.parse("((A + C) = (B + C))");

        let plain = info.gen_step(0, None);
        let step = engine.apply_hyp(&mut info, &plain, &target, addeq1).unwrap();
        assert!(!step.has_prefix());
        assert_eq!(step.formula(), &target);

        let prefixed = info.gen_step(1, info.prefix());
        let step = engine
            .apply_hyp(&mut info, &prefixed, &target, addeq1)
            .unwrap();
        assert!(step.has_prefix());
        assert_eq!(step.core(), &target);
        // the instance of addeq1 is shared
        assert_eq!(info.new_steps().len(), 3);

        let stubbed = engine.apply_stub_rule(&mut info, &plain).unwrap();
        assert_eq!(stubbed.formula(), &fx.parse("(ph -> (A = B))"));
        fx.verify(&worksheet);
    }
}

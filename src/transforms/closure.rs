use std::collections::HashMap;

use log::debug;

use super::{
    ConjunctionInfo, ConstSubst, Engine, GenProofStep, ImplicationInfo, PropertyTemplate,
    RuleKey, RuleMap, WorksheetInfo,
};
use crate::{
    assertion::Assertion, database::Database, error::TransformError, node::ParseNode, types::*,
};

/// How a property like `(A + 1) e. CC` can be derived. Variants are ordered from worst to best,
/// combining two results keeps the worse one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureResult {
    NoRule,
    /// Only under the implication prefix of the goal
    UsedPrefixRule,
    SimpleRule,
    SimpleRuleImpl,
    ConstantRule,
}

impl ClosureResult {
    fn rank(self) -> u8 {
        match self {
            ClosureResult::NoRule => 1,
            ClosureResult::UsedPrefixRule => 2,
            ClosureResult::SimpleRule | ClosureResult::SimpleRuleImpl => 3,
            ClosureResult::ConstantRule => 4,
        }
    }

    pub fn has_closure(self) -> bool {
        self != ClosureResult::NoRule
    }

    pub fn merge(self, other: Self) -> Self {
        if other.rank() < self.rank() {
            other
        } else {
            self
        }
    }
}

/// Splits `hyp_1 /\ ... /\ hyp_n -> main` where every `hyp_i` is a property of its own variable.
/// Returns the property, the variables and `main`.
pub(super) fn extract_impl_closure_info<'a>(
    imp: &ImplicationInfo,
    conj: &ConjunctionInfo,
    assertion: &'a Assertion,
) -> Option<(PropertyTemplate, Vec<Identifier>, &'a ParseNode)> {
    if !assertion.hypotheses().is_empty() {
        return None;
    }
    let root = assertion.conclusion();
    if !imp.is_impl_operator(root.stmt()) || root.children().len() != 2 {
        return None;
    }
    let hyps = conj.separate_by_and(root.child(0));
    let (template, vars) = PropertyTemplate::from_hypotheses(&hyps)?;
    Some((template, vars, root.child(1)))
}

/// Rules which derive a property of an operator application from the properties of its
/// operands, like `A e. CC, B e. CC => (A + B) e. CC`.
#[derive(Debug, Default)]
pub struct ClosureInfo {
    closure_rules: RuleMap<AssertionId>,
    /// `(A e. RR /\ B e. RR) -> (A + B) e. RR`
    impl_closure_rules: RuleMap<AssertionId>,
    possible_properties: Vec<PropertyTemplate>,
    constants: HashMap<(PropertyTemplate, ParseNode), AssertionId>,
}

impl ClosureInfo {
    pub fn new(db: &Database, imp: &ImplicationInfo, conj: &ConjunctionInfo) -> Self {
        let mut info = Self::default();
        for (id, assertion) in db.assertions() {
            info.find_closure_rule(id, assertion);
            if assertion.depth() == 4 {
                info.find_impl_closure_rule(imp, conj, id, assertion);
            }
        }
        for (id, assertion) in db.assertions() {
            info.find_constant(id, assertion);
        }
        debug!(
            "{} closure rules, {} implication closure rules, {} constant facts",
            info.closure_rules.len(),
            info.impl_closure_rules.len(),
            info.constants.len()
        );
        info
    }

    /// The operator application inside `main` whose operands are exactly `vars`, in order, and
    /// whose other children are constants
    fn closure_core(
        template: PropertyTemplate,
        main: &ParseNode,
        vars: &[Identifier],
    ) -> Option<RuleKey> {
        let node = template.extract(main)?;
        if node.is_var() || node.children().is_empty() {
            return None;
        }
        let mut next = vars.iter();
        let mut consts = Vec::with_capacity(node.children().len());
        for child in node.children() {
            if child.is_var() {
                if Some(&child.stmt()) != next.next() {
                    return None;
                }
                consts.push(None);
            } else if child.is_const() {
                consts.push(Some(child.clone()));
            } else {
                return None;
            }
        }
        if next.next().is_some() {
            return None;
        }
        Some(RuleKey {
            stmt: node.stmt(),
            const_subst: ConstSubst::new(consts),
            template,
        })
    }

    fn register(&mut self, impl_form: bool, key: RuleKey, id: AssertionId) {
        let template = key.template.clone();
        let map = if impl_form {
            &mut self.impl_closure_rules
        } else {
            &mut self.closure_rules
        };
        if map.insert(key, id) && !self.possible_properties.contains(&template) {
            self.possible_properties.push(template);
        }
    }

    // A e. CC, B e. CC => (A + B) e. CC
    fn find_closure_rule(&mut self, id: AssertionId, assertion: &Assertion) {
        let hyps = assertion.hypotheses();
        if hyps.is_empty() || hyps.len() != assertion.mandatory_variables().len() {
            return;
        }
        let (template, vars) = match PropertyTemplate::from_hypotheses(hyps) {
            Some(res) => res,
            None => return,
        };
        if let Some(key) = Self::closure_core(template, assertion.conclusion(), &vars) {
            debug!("closure rule: {}", assertion.label());
            self.register(false, key, id);
        }
    }

    // (A e. RR /\ B e. RR) -> (A + B) e. RR
    fn find_impl_closure_rule(
        &mut self,
        imp: &ImplicationInfo,
        conj: &ConjunctionInfo,
        id: AssertionId,
        assertion: &Assertion,
    ) {
        let (template, vars, main) = match extract_impl_closure_info(imp, conj, assertion) {
            Some(res) => res,
            None => return,
        };
        if let Some(key) = Self::closure_core(template, main, &vars) {
            debug!("implication closure rule: {}", assertion.label());
            self.register(true, key, id);
        }
    }

    // 1 e. CC
    fn find_constant(&mut self, id: AssertionId, assertion: &Assertion) {
        if !assertion.hypotheses().is_empty() {
            return;
        }
        for template in &self.possible_properties {
            if let Some(node) = template.extract(assertion.conclusion()) {
                if node.is_const() {
                    self.constants
                        .entry((template.clone(), node))
                        .or_insert(id);
                }
            }
        }
    }

    /// The properties any closure rule is known for, in mining order
    pub fn possible_properties(&self) -> &[PropertyTemplate] {
        &self.possible_properties
    }

    pub fn has_closure_assert(&self, template: &PropertyTemplate) -> bool {
        self.possible_properties.contains(template)
    }

    pub fn constant(&self, template: &PropertyTemplate, node: &ParseNode) -> Option<AssertionId> {
        self.constants
            .get(&(template.clone(), node.clone()))
            .copied()
    }
}

impl Engine<'_> {
    /// Decides whether `template(node)` can be derived, without creating any step
    pub fn closure_possibility(
        &self,
        info: &WorksheetInfo,
        template: &PropertyTemplate,
        node: &ParseNode,
        with_prefix: bool,
    ) -> ClosureResult {
        let property = template.subst(node);
        if info.proof_step(&property).is_some() {
            return ClosureResult::SimpleRule;
        }
        if node.is_const() && self.closure.constant(template, node).is_some() {
            return ClosureResult::ConstantRule;
        }
        if let Some(res) = self.check_closure_rules(
            info,
            &self.closure.closure_rules,
            template,
            node,
            false,
            ClosureResult::SimpleRule,
        ) {
            return res;
        }
        if let Some(res) = self.check_closure_rules(
            info,
            &self.closure.impl_closure_rules,
            template,
            node,
            with_prefix,
            ClosureResult::SimpleRuleImpl,
        ) {
            return res;
        }
        if with_prefix
            && info.has_prefix()
            && info.proof_step(&info.apply_prefix(&property)).is_some()
        {
            return ClosureResult::UsedPrefixRule;
        }
        ClosureResult::NoRule
    }

    fn check_closure_rules(
        &self,
        info: &WorksheetInfo,
        rules: &RuleMap<AssertionId>,
        template: &PropertyTemplate,
        node: &ParseNode,
        with_prefix: bool,
        base: ClosureResult,
    ) -> Option<ClosureResult> {
        rules.visit(node, |group, var_indexes| {
            group.get(template)?;
            var_indexes.iter().try_fold(base, |res, i| {
                let child = self.closure_possibility(info, template, node.child(*i), with_prefix);
                if child.has_closure() {
                    Some(res.merge(child))
                } else {
                    None
                }
            })
        })
    }

    /// Finds the first rule of `rules` applicable to `node` whose operands all have the property
    fn find_closure_rule(
        &self,
        info: &WorksheetInfo,
        rules: &RuleMap<AssertionId>,
        template: &PropertyTemplate,
        node: &ParseNode,
        with_prefix: bool,
    ) -> Result<(AssertionId, Vec<usize>), TransformError> {
        rules
            .visit(node, |group, var_indexes| {
                let rule = group.get(template)?;
                var_indexes
                    .iter()
                    .all(|i| {
                        self.closure_possibility(info, template, node.child(*i), with_prefix)
                            .has_closure()
                    })
                    .then(|| (*rule, var_indexes.to_vec()))
            })
            .ok_or(TransformError::NoClosure(node.stmt()))
    }

    /// Derives `template(node)`, creating the steps on the way.
    ///
    /// With `finish` the property (or, if the prefix is set, the property under the prefix) is
    /// the goal, which gets justified by the last rule.
    pub fn closure_property(
        &self,
        info: &mut WorksheetInfo,
        template: &PropertyTemplate,
        node: &ParseNode,
        finish: bool,
        with_prefix: bool,
    ) -> Result<GenProofStep, TransformError> {
        let property = template.subst(node);
        if let Some(step) = info.proof_step(&property) {
            return Ok(step);
        }
        if with_prefix && info.has_prefix() {
            if let Some(step) = info.proof_step(&info.apply_prefix(&property)) {
                return Ok(info.with_prefix(step));
            }
        }

        match self.closure_possibility(info, template, node, with_prefix) {
            ClosureResult::NoRule => Err(TransformError::NoClosure(node.stmt())),
            ClosureResult::ConstantRule => {
                let rule = self
                    .closure
                    .constant(template, node)
                    .ok_or(TransformError::NoClosure(node.stmt()))?;
                if !finish {
                    Ok(info.get_or_create(property, &[], rule))
                } else if info.has_prefix() {
                    let step = info.get_or_create(property, &[], rule);
                    self.finish_stub_rule(info, &step)
                } else {
                    Ok(info.finish(&[], rule))
                }
            }
            ClosureResult::SimpleRule => {
                let (rule, positions) = self.find_closure_rule(
                    info,
                    &self.closure.closure_rules,
                    template,
                    node,
                    false,
                )?;
                let hyps = positions
                    .iter()
                    .map(|i| self.closure_property(info, template, node.child(*i), false, false))
                    .collect::<Result<Vec<_>, _>>()?;
                let hyps: Vec<_> = hyps.iter().collect();
                if !finish {
                    Ok(info.get_or_create(property, &hyps, rule))
                } else if info.has_prefix() {
                    let step = info.get_or_create(property, &hyps, rule);
                    self.finish_stub_rule(info, &step)
                } else {
                    Ok(info.finish(&hyps, rule))
                }
            }
            ClosureResult::SimpleRuleImpl | ClosureResult::UsedPrefixRule => {
                let (rule, positions) = self.find_closure_rule(
                    info,
                    &self.closure.impl_closure_rules,
                    template,
                    node,
                    with_prefix,
                )?;
                let hyps = positions
                    .iter()
                    .map(|i| {
                        self.closure_property(info, template, node.child(*i), false, with_prefix)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let pattern = self.db.get(rule).conclusion().child(0);
                let hyp = self.concatenate_in_the_same_pattern(info, &hyps, pattern)?;
                if !finish {
                    self.apply_hyp(info, &hyp, &property, rule)
                } else if hyp.has_prefix() {
                    let step = self.finish_transitive_rule(info, &hyp, &property, rule)?;
                    Ok(info.with_prefix(step))
                } else if info.has_prefix() {
                    let step = self.apply_implication_rule(info, &hyp, &property, rule)?;
                    self.finish_stub_rule(info, &step)
                } else {
                    self.finish_with_implication(info, &hyp, &property, rule)
                }
            }
        }
    }

    /// Proves the goal if it is a property of an expression, trying again under the goal's
    /// implication prefix if the goal has one
    pub fn perform_closure_transformation(
        &self,
        info: &mut WorksheetInfo,
    ) -> Result<Option<GenProofStep>, TransformError> {
        let goal = info.goal_formula().clone();
        if let Some(step) = self.closure_on(info, &goal)? {
            return Ok(Some(step));
        }
        match self.imp.extract_prefix_and_get_impl_part(&goal) {
            Some((op, prefix, core)) => {
                info.set_prefix(op, prefix);
                self.closure_on(info, &core)
            }
            None => Ok(None),
        }
    }

    fn closure_on(
        &self,
        info: &mut WorksheetInfo,
        formula: &ParseNode,
    ) -> Result<Option<GenProofStep>, TransformError> {
        for template in self.closure.possible_properties() {
            let node = match template.extract(formula) {
                Some(node) => node,
                None => continue,
            };
            if self
                .closure_possibility(info, template, &node, true)
                .has_closure()
            {
                debug!("goal is a closure property");
                return self
                    .closure_property(info, template, &node, true, true)
                    .map(Some);
            }
        }
        Ok(None)
    }
}

#[cfg(all(test, feature = "serialization"))]
mod tests {
    use super::super::fixture::*;
    use super::*;

    fn template(fx: &Fixture, s: &str) -> PropertyTemplate {
        PropertyTemplate::from_hypothesis(&fx.parse(s), fx.parse("A").stmt()).unwrap()
    }

    #[test]
    fn mines_closure_rules() {
        let fx = Fixture::new();
        let closure = &fx.engine().closure;
        let cc = template(&fx, "(A e. CC)");
        let rr = template(&fx, "(A e. RR)");
        assert_eq!(closure.possible_properties(), &[cc.clone(), rr.clone()]);
        let two = ConstSubst::new(vec![None, None]);
        assert_eq!(
            closure.closure_rules.get(fx.op("+"), &two, &cc),
            Some(&fx.label("addcl"))
        );
        assert_eq!(
            closure.impl_closure_rules.get(fx.op("+"), &two, &rr),
            Some(&fx.label("readdcl"))
        );
        assert_eq!(closure.closure_rules.get(fx.op("+"), &two, &rr), None);
        assert_eq!(closure.constant(&cc, &fx.parse("1")), Some(fx.label("ax-1cn")));
        assert_eq!(closure.constant(&rr, &fx.parse("1")), Some(fx.label("1re")));
        assert!(!closure.has_closure_assert(&PropertyTemplate::empty()));
    }

    #[test]
    fn closure_possibility() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let cc = template(&fx, "(A e. CC)");
        let mut worksheet = fx.worksheet("hyp |- (B e. CC)\ngoal |- ph\n");
        let info = WorksheetInfo::new(&fx.db, &mut worksheet, 1);
        let possibility = |s| engine.closure_possibility(&info, &cc, &fx.parse(s), true);
        assert_eq!(possibility("1"), ClosureResult::ConstantRule);
        assert_eq!(possibility("(1 + 1)"), ClosureResult::SimpleRule);
        assert_eq!(possibility("((B x. 1) + 1)"), ClosureResult::SimpleRule);
        assert_eq!(possibility("(A + 1)"), ClosureResult::NoRule);
        assert_eq!(possibility("(1 .o 1)"), ClosureResult::NoRule);
    }

    #[test]
    fn closure_property_creates_steps() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let cc = template(&fx, "(A e. CC)");
        let mut worksheet = fx.worksheet("hyp |- (B e. CC)\ngoal |- ph\n");
        let mut info = WorksheetInfo::new(&fx.db, &mut worksheet, 1);
        let step = engine
            .closure_property(&mut info, &cc, &fx.parse("(B + (1 x. 1))"), false, true)
            .unwrap();
        assert_eq!(step.formula(), &fx.parse("((B + (1 x. 1)) e. CC)"));
        let new_steps = info.into_new_steps();
        assert_eq!(
            fx.labels(&worksheet, &new_steps),
            vec!["ax-1cn", "mulcl", "addcl"]
        );
        fx.verify(&worksheet);
    }

    #[test]
    fn goal_under_prefix() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let mut worksheet =
            fx.worksheet("hyp |- (ph -> (A e. RR))\ngoal |- (ph -> ((A + 1) e. RR))\n");
        let mut info = WorksheetInfo::new(&fx.db, &mut worksheet, 1);
        let step = engine.perform_closure_transformation(&mut info).unwrap();
        assert_eq!(step.map(|s| s.step()), Some(1));
        assert_eq!(info.prefix(), Some(fx.parse("ph")));
        let new_steps = info.into_new_steps();
        assert_eq!(
            fx.labels(&worksheet, &new_steps),
            vec!["1re", "a1i", "jca", "readdcl", "syl"]
        );
        assert_eq!(worksheet.verify_all(&fx.db), Ok(()));
    }

    #[test]
    fn plain_goal() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let mut worksheet = fx.worksheet("hyp |- (A e. CC)\ngoal |- ((A + 1) e. CC)\n");
        let mut info = WorksheetInfo::new(&fx.db, &mut worksheet, 1);
        assert!(engine.perform_closure_transformation(&mut info).unwrap().is_some());
        let new_steps = info.into_new_steps();
        assert_eq!(fx.labels(&worksheet, &new_steps), vec!["ax-1cn", "addcl"]);
        assert_eq!(worksheet.verify_all(&fx.db), Ok(()));
    }
}

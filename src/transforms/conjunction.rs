use std::collections::HashMap;

use log::debug;

use super::{Engine, GenProofStep, ImplicationInfo, WorksheetInfo};
use crate::{
    assertion::Assertion, database::Database, error::TransformError, node::ParseNode, types::*,
};

/// Conjunction-like operators: an operator is a conjunction if it has a gathering rule
/// `ph, ps => ph /\ ps` and a projection rule for every operand.
#[derive(Debug, Default)]
pub struct ConjunctionInfo {
    gatherings: HashMap<Identifier, AssertionId>,
    parts: HashMap<Identifier, Vec<Option<AssertionId>>>,
    /// `ph -> ps, ph -> ch => ph -> (ps /\ ch)`, keyed by implication and conjunction
    impl_gatherings: HashMap<(Identifier, Identifier), AssertionId>,
}

impl ConjunctionInfo {
    pub fn new(db: &Database, imp: &ImplicationInfo) -> Self {
        let mut info = Self::default();
        for (id, assertion) in db.assertions() {
            info.find_gathering_rule(id, assertion);
        }
        for (id, assertion) in db.assertions() {
            info.find_part_rule(id, assertion);
            info.find_impl_gathering_rule(imp, id, assertion);
        }

        info.parts.retain(|stmt, parts| {
            let complete = parts.iter().all(Option::is_some);
            if !complete {
                debug!("operator {} lacks projection rules", stmt);
            }
            complete
        });
        let parts = &info.parts;
        info.gatherings.retain(|stmt, _| parts.contains_key(stmt));
        info.impl_gatherings
            .retain(|(_, stmt), _| parts.contains_key(stmt));
        info
    }

    // ph, ps => ph /\ ps
    fn find_gathering_rule(&mut self, id: AssertionId, assertion: &Assertion) {
        if assertion.hypotheses().len() < 2 {
            return;
        }
        let vars = match assertion.hyp_to_var_map(None) {
            Some(vars) => vars,
            None => return,
        };
        if assertion
            .hypotheses()
            .iter()
            .zip(vars.iter())
            .any(|(hyp, var)| *hyp != ParseNode::var(*var))
        {
            return;
        }
        let root = assertion.conclusion();
        if root.children().len() != vars.len()
            || root
                .children()
                .iter()
                .zip(vars.iter())
                .any(|(child, var)| *child != ParseNode::var(*var))
        {
            return;
        }
        if self.gatherings.contains_key(&root.stmt()) {
            return;
        }
        debug!("gathering rule: {}", assertion.label());
        self.gatherings.insert(root.stmt(), id);
    }

    // ph /\ ps => ph
    fn find_part_rule(&mut self, id: AssertionId, assertion: &Assertion) {
        let hyp = match assertion.hypotheses() {
            [hyp] => hyp,
            _ => return,
        };
        let res = assertion.conclusion();
        if !res.is_var() || !self.gatherings.contains_key(&hyp.stmt()) {
            return;
        }
        if hyp.children().iter().any(|c| !c.is_var()) {
            return;
        }
        let num = match hyp.children().iter().position(|c| c == res) {
            Some(num) => num,
            None => return,
        };
        let parts = self
            .parts
            .entry(hyp.stmt())
            .or_insert_with(|| vec![None; hyp.children().len()]);
        if parts[num].is_none() {
            debug!("projection rule {} of {}: {}", num, hyp.stmt(), assertion.label());
            parts[num] = Some(id);
        }
    }

    // ph -> ps, ph -> ch => ph -> (ps /\ ch)
    fn find_impl_gathering_rule(
        &mut self,
        imp: &ImplicationInfo,
        id: AssertionId,
        assertion: &Assertion,
    ) {
        if assertion.hypotheses().len() < 2 {
            return;
        }
        let root = assertion.conclusion();
        let op = root.stmt();
        if !imp.is_impl_for_prefix_operator(op) {
            return;
        }
        let (prefix, core) = (root.child(0), root.child(1));
        if !prefix.is_var() || !self.gatherings.contains_key(&core.stmt()) {
            return;
        }
        let vars = match assertion.hyp_to_var_map(Some(prefix.stmt())) {
            Some(vars) => vars,
            None => return,
        };
        let is_prefixed_var = |hyp: &ParseNode, var: Identifier| {
            hyp.stmt() == op && hyp.child(0) == prefix && *hyp.child(1) == ParseNode::var(var)
        };
        if assertion
            .hypotheses()
            .iter()
            .zip(vars.iter())
            .any(|(hyp, var)| !is_prefixed_var(hyp, *var))
        {
            return;
        }
        if core.children().len() != vars.len()
            || core
                .children()
                .iter()
                .zip(vars.iter())
                .any(|(child, var)| *child != ParseNode::var(*var))
        {
            return;
        }
        if self.impl_gatherings.contains_key(&(op, core.stmt())) {
            return;
        }
        debug!("implication gathering rule: {}", assertion.label());
        self.impl_gatherings.insert((op, core.stmt()), id);
    }

    pub fn is_and(&self, stmt: Identifier) -> bool {
        self.parts.contains_key(&stmt)
    }

    /// The rule projecting the `i`th operand out of a conjunction
    pub fn part(&self, stmt: Identifier, i: usize) -> Option<AssertionId> {
        self.parts.get(&stmt)?.get(i).copied().flatten()
    }

    /// Splits nested conjunctions into their operands, left to right
    pub fn separate_by_and(&self, node: &ParseNode) -> Vec<ParseNode> {
        let mut res = Vec::new();
        self.separate_rec(node, &mut res);
        res
    }

    fn separate_rec(&self, node: &ParseNode, res: &mut Vec<ParseNode>) {
        if self.is_and(node.stmt()) {
            for child in node.children() {
                self.separate_rec(child, res);
            }
        } else {
            res.push(node.clone());
        }
    }
}

impl Engine<'_> {
    /// Joins `hyps` into one step whose conjunctions are nested like the ones of `pattern`.
    ///
    /// The leaves of `pattern` (see [`ConjunctionInfo::separate_by_and`]) must correspond to
    /// `hyps`. If any hypothesis carries the prefix, the result does too.
    pub fn concatenate_in_the_same_pattern(
        &self,
        info: &mut WorksheetInfo,
        hyps: &[GenProofStep],
        pattern: &ParseNode,
    ) -> Result<GenProofStep, TransformError> {
        let mut next = 0;
        let res = self.concatenate_rec(info, hyps, pattern, &mut next)?;
        debug_assert_eq!(next, hyps.len());
        Ok(res)
    }

    fn concatenate_rec(
        &self,
        info: &mut WorksheetInfo,
        hyps: &[GenProofStep],
        pattern: &ParseNode,
        next: &mut usize,
    ) -> Result<GenProofStep, TransformError> {
        let stmt = pattern.stmt();
        if !self.conj.is_and(stmt) {
            *next += 1;
            return Ok(hyps[*next - 1].clone());
        }
        let children = pattern
            .children()
            .iter()
            .map(|c| self.concatenate_rec(info, hyps, c, next))
            .collect::<Result<Vec<_>, _>>()?;
        let res = ParseNode::new(stmt, children.iter().map(|c| c.core().clone()).collect());

        if children.iter().all(|c| !c.has_prefix()) {
            let rule = self
                .conj
                .gatherings
                .get(&stmt)
                .copied()
                .ok_or(TransformError::MissingRule("gathering", stmt))?;
            let refs: Vec<_> = children.iter().collect();
            return Ok(info.get_or_create(res, &refs, rule));
        }

        let op = info.prefix_stmt().ok_or(TransformError::NoPrefix)?;
        let rule = self
            .conj
            .impl_gatherings
            .get(&(op, stmt))
            .copied()
            .ok_or(TransformError::MissingRule("implication gathering", stmt))?;
        let children = children
            .into_iter()
            .map(|c| self.lift_to_prefix(info, c))
            .collect::<Result<Vec<_>, _>>()?;
        let refs: Vec<_> = children.iter().collect();
        let node = info.apply_prefix(&res);
        let step = info.get_or_create(node, &refs, rule);
        Ok(info.with_prefix(step))
    }
}

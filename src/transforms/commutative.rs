use std::cmp::Ordering;

use log::debug;

use super::{
    closure::extract_impl_closure_info, transform_operation_template, ConjunctionInfo,
    ConstSubst, Engine, EquivalenceInfo, GenProofStep, GeneralizedStmt, ImplicationInfo,
    Necessity, PropertyTemplate, RuleKey, RuleMap, Transformation, WorksheetInfo,
};
use crate::{
    assertion::Assertion, database::Database, error::TransformError, node::ParseNode, types::*,
};

/// Commutativity laws `(A + B) = (B + A)`, optionally guarded by a property of the operands.
#[derive(Debug, Default)]
pub struct CommutativeInfo {
    com_op: RuleMap<AssertionId>,
    /// `(A e. CC /\ B e. CC) -> (A x. B) = (B x. A)`
    impl_com_op: RuleMap<AssertionId>,
}

impl CommutativeInfo {
    pub fn new(
        db: &Database,
        eq: &EquivalenceInfo,
        imp: &ImplicationInfo,
        conj: &ConjunctionInfo,
    ) -> Self {
        let mut info = Self::default();
        for (id, assertion) in db.assertions() {
            if let Some(template) = transform_operation_template(assertion) {
                let main = assertion.conclusion();
                Self::find_com_rule(&mut info.com_op, eq, id, assertion, template, main);
            }
            if let Some((template, vars, main)) = extract_impl_closure_info(imp, conj, assertion) {
                if vars.as_slice() == assertion.mandatory_variables() {
                    Self::find_com_rule(&mut info.impl_com_op, eq, id, assertion, template, main);
                }
            }
        }
        debug!(
            "{} commutative operators, {} under a side condition",
            info.com_op.len(),
            info.impl_com_op.len()
        );
        info
    }

    fn find_com_rule(
        rules: &mut RuleMap<AssertionId>,
        eq: &EquivalenceInfo,
        id: AssertionId,
        assertion: &Assertion,
        template: PropertyTemplate,
        main: &ParseNode,
    ) {
        let mand = assertion.mandatory_variables();
        if mand.len() != 2 || !eq.is_equivalence(main.stmt()) || main.children().len() != 2 {
            return;
        }
        let (left, right) = (main.child(0), main.child(1));
        if left.stmt() != right.stmt() {
            return;
        }
        let const_subst = ConstSubst::from_node(left);
        let var_places = const_subst.var_places();
        if var_places.len() != 2 || !const_subst.is_same_const_map(right) {
            return;
        }
        let (k0, k1) = (var_places[0], var_places[1]);
        if *left.child(k0) != ParseNode::var(mand[0])
            || *left.child(k1) != ParseNode::var(mand[1])
            || right.child(k1) != left.child(k0)
            || right.child(k0) != left.child(k1)
        {
            return;
        }
        let key = RuleKey {
            stmt: left.stmt(),
            const_subst,
            template,
        };
        if rules.insert(key, id) {
            debug!("commutative rule: {}", assertion.label());
        }
    }
}

/// Order used to sort the operands of commutative operators: smaller trees go last
pub(super) fn compare_operands(a: &ParseNode, b: &ParseNode) -> Ordering {
    (a.size(), a).cmp(&(b.size(), b))
}

impl Engine<'_> {
    pub fn is_commutative_with_prop(
        &self,
        info: &WorksheetInfo,
        gen: &GeneralizedStmt,
        node: &ParseNode,
    ) -> bool {
        gen.template.is_empty()
            || (0..2).all(|slot| {
                self.closure_possibility(info, &gen.template, gen.operand(node, slot), true)
                    .has_closure()
            })
    }

    fn detect_com(
        &self,
        info: &WorksheetInfo,
        rules: &RuleMap<AssertionId>,
        node: &ParseNode,
    ) -> Option<GeneralizedStmt> {
        rules.visit(node, |group, var_indexes| {
            let var_indexes = match var_indexes {
                [a, b] => [*a, *b],
                _ => return None,
            };
            group.templates().find_map(|template| {
                let gen = GeneralizedStmt {
                    stmt: group.stmt,
                    const_subst: group.const_subst.clone(),
                    template: template.clone(),
                    var_indexes,
                };
                Some(gen).filter(|gen| self.is_commutative_with_prop(info, gen, node))
            })
        })
    }

    /// Finds the commutative operator schema `node` is an application of
    pub fn get_gen_stmt_for_com_node(
        &self,
        info: &WorksheetInfo,
        node: &ParseNode,
    ) -> Option<GeneralizedStmt> {
        match self.detect_com(info, &self.com.com_op, node) {
            Some(gen) if !info.has_prefix() || gen.template.is_empty() => Some(gen),
            _ => self.detect_com(info, &self.com.impl_com_op, node),
        }
    }

    /// Proves `source = target` where `target` is `source` with its operands swapped
    pub fn create_commutative_step(
        &self,
        info: &mut WorksheetInfo,
        gen: &GeneralizedStmt,
        source: &ParseNode,
        target: &ParseNode,
    ) -> Result<GenProofStep, TransformError> {
        let key = gen.key();
        let plain = if !info.has_prefix() || gen.template.is_empty() {
            self.com.com_op.get_key(&key)
        } else {
            None
        };
        let (rule, impl_form) = match plain {
            Some(rule) => (*rule, false),
            None => (
                *self
                    .com
                    .impl_com_op
                    .get_key(&key)
                    .ok_or(TransformError::MissingRule("commutative", gen.stmt))?,
                true,
            ),
        };
        let mut hyps = Vec::new();
        if !gen.template.is_empty() {
            for slot in 0..2 {
                let operand = gen.operand(source, slot);
                hyps.push(self.closure_property(info, &gen.template, operand, false, true)?);
            }
        }
        self.apply_closure_properties(info, impl_form, &hyps, rule, source, target)
    }

    /// Swaps the operands of `node` if their order differs from `target`, then transforms the
    /// operands separately
    pub(super) fn commutative_transform(
        &self,
        info: &mut WorksheetInfo,
        node: &ParseNode,
        gen: &GeneralizedStmt,
        target: &ParseNode,
    ) -> Result<Option<GenProofStep>, TransformError> {
        if let Necessity::Done(res) = self.check_necessary(info, node, target)? {
            return Ok(res);
        }
        let (left, right) = (gen.operand(node, 0), gen.operand(node, 1));
        let (my_node, reverse) = if self.canonical_form(info, left)
            != self.canonical_form(info, gen.operand(target, 0))
        {
            let swapped = gen.build(right.clone(), left.clone());
            let step = self.create_commutative_step(info, gen, node, &swapped)?;
            (swapped, Some(step))
        } else {
            (node.clone(), None)
        };
        let rest = self.transform(
            info,
            &Transformation::Replace(my_node),
            &Transformation::Replace(target.clone()),
        )?;
        match (reverse, rest) {
            (Some(reverse), Some(rest)) => {
                Ok(Some(self.get_transitive_step(info, Some(reverse), rest)?))
            }
            (reverse, rest) => Ok(reverse.or(rest)),
        }
    }

    /// Both operands in canonical form, the larger one first
    pub(super) fn commutative_canonical_form(
        &self,
        info: &WorksheetInfo,
        node: &ParseNode,
        gen: &GeneralizedStmt,
    ) -> ParseNode {
        let mut first = self.canonical_form(info, gen.operand(node, 0));
        let mut second = self.canonical_form(info, gen.operand(node, 1));
        if compare_operands(&first, &second) == Ordering::Less {
            std::mem::swap(&mut first, &mut second);
        }
        gen.build(first, second)
    }
}

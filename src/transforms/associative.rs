use log::debug;

use super::{
    closure::extract_impl_closure_info, transform_operation_template, AssocTree, ClosureInfo,
    ConjunctionInfo, ConstSubst, Engine, EquivalenceInfo, GenProofStep, GeneralizedStmt,
    ImplicationInfo, Necessity, PropertyTemplate, ReplaceInfo, RuleKey, RuleMap, Transformation,
    WorksheetInfo,
};
use crate::{
    assertion::Assertion, database::Database, error::TransformError, node::ParseNode, types::*,
};

/// Slot `i` holds the law whose left side nests in slot `i`: slot `0` is
/// `((A + B) + C) = (A + (B + C))`, slot `1` is `(A + (B + C)) = ((A + B) + C)`.
type AssocRules = RuleMap<[Option<AssertionId>; 2]>;

/// Associativity laws, optionally guarded by a property of the operands like `_ e. CC`.
#[derive(Debug, Default)]
pub struct AssociativeInfo {
    assoc_op: AssocRules,
    /// `(A e. CC /\ B e. CC /\ C e. CC) -> ((A x. B) x. C) = (A x. (B x. C))`
    impl_assoc_op: AssocRules,
}

/// The previously mined rules associativity laws depend on
pub(super) struct AssocContext<'a> {
    pub eq: &'a EquivalenceInfo,
    pub imp: &'a ImplicationInfo,
    pub conj: &'a ConjunctionInfo,
    pub closure: &'a ClosureInfo,
    pub replace: &'a ReplaceInfo,
}

impl AssociativeInfo {
    pub(super) fn new(db: &Database, cx: &AssocContext) -> Self {
        let mut info = Self::default();
        for (id, assertion) in db.assertions() {
            if let Some(template) = transform_operation_template(assertion) {
                let main = assertion.conclusion();
                Self::find_assoc_rule(&mut info.assoc_op, cx, id, assertion, template, main);
            }
            if let Some((template, vars, main)) =
                extract_impl_closure_info(cx.imp, cx.conj, assertion)
            {
                if vars.as_slice() == assertion.mandatory_variables() {
                    Self::find_assoc_rule(&mut info.impl_assoc_op, cx, id, assertion, template, main);
                }
            }
        }
        debug!(
            "{} associative operators, {} under a side condition",
            info.assoc_op.len(),
            info.impl_assoc_op.len()
        );
        info
    }

    fn find_assoc_rule(
        rules: &mut AssocRules,
        cx: &AssocContext,
        id: AssertionId,
        assertion: &Assertion,
        template: PropertyTemplate,
        main: &ParseNode,
    ) {
        let mand = assertion.mandatory_variables();
        if mand.len() != 3 || !cx.eq.is_equivalence(main.stmt()) || main.children().len() != 2 {
            return;
        }
        let (left, right) = (main.child(0), main.child(1));
        let stmt = left.stmt();
        if right.stmt() != stmt {
            return;
        }
        let const_subst = ConstSubst::from_node(left);
        let var_places = const_subst.var_places();
        if var_places.len() != 2 || !const_subst.is_same_const_map(right) {
            return;
        }
        if !template.is_empty() && !cx.closure.has_closure_assert(&template) {
            return;
        }
        let middle = ParseNode::var(mand[1]);
        let nested = |node: &ParseNode| node.stmt() == stmt && const_subst.is_same_const_map(node);

        for i in 0..2 {
            let k = var_places[i];
            let n = var_places[(i + 1) % 2];
            let k_var = ParseNode::var(mand[2 * i]);
            let n_var = ParseNode::var(mand[2 * (1 - i)]);
            let (left_k, left_n) = (left.child(k), left.child(n));
            let (right_k, right_n) = (right.child(k), right.child(n));
            if !nested(left_k) || !nested(right_n) {
                continue;
            }
            if *left_n != n_var
                || left_n != right_n.child(n)
                || *left_k.child(k) != k_var
                || left_k.child(k) != right_k
                || *left_k.child(n) != middle
                || left_k.child(n) != right_n.child(k)
            {
                continue;
            }
            if !cx.replace.is_full_replace_statement(stmt) {
                debug!(
                    "{} is associative but lacks replace rules: {}",
                    stmt,
                    assertion.label()
                );
                return;
            }
            let key = RuleKey {
                stmt,
                const_subst: const_subst.clone(),
                template: template.clone(),
            };
            let slots = rules.get_or_insert_with(key, || [None, None]);
            if slots[i].is_none() {
                debug!("associative rule {}: {}", i, assertion.label());
                slots[i] = Some(id);
                return;
            }
            rules.add_collision();
        }
    }
}

impl Engine<'_> {
    /// Whether the operands of `node` (an application of `gen`) satisfy `gen`'s side condition.
    /// Nested applications of `gen` are checked recursively.
    pub fn is_associative_with_prop(
        &self,
        info: &WorksheetInfo,
        gen: &GeneralizedStmt,
        node: &ParseNode,
    ) -> bool {
        if gen.template.is_empty() {
            return true;
        }
        (0..2).all(|slot| {
            let operand = gen.operand(node, slot);
            if gen.matches(operand) && self.is_associative_with_prop(info, gen, operand) {
                return true;
            }
            self.closure_possibility(info, &gen.template, operand, true)
                .has_closure()
        })
    }

    fn detect_assoc(
        &self,
        info: &WorksheetInfo,
        rules: &AssocRules,
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
                if self.is_associative_with_prop(info, &gen, node) {
                    Some(gen)
                } else {
                    None
                }
            })
        })
    }

    /// Finds the associative operator schema `node` is an application of. Under a prefix, laws
    /// with a side condition are taken from the implication forms.
    pub fn get_gen_stmt_for_assoc_node(
        &self,
        info: &WorksheetInfo,
        node: &ParseNode,
    ) -> Option<GeneralizedStmt> {
        match self.detect_assoc(info, &self.assoc.assoc_op, node) {
            Some(gen) if !info.has_prefix() || gen.template.is_empty() => Some(gen),
            _ => self.detect_assoc(info, &self.assoc.impl_assoc_op, node),
        }
    }

    /// Proves `first = second` where `second` is `first` rotated at the top: the operand in slot
    /// `from` of `first` is nested and moves to the other slot
    pub fn create_associative_step(
        &self,
        info: &mut WorksheetInfo,
        gen: &GeneralizedStmt,
        from: usize,
        first: &ParseNode,
        second: &ParseNode,
    ) -> Result<GenProofStep, TransformError> {
        let key = gen.key();
        let plain = if !info.has_prefix() || gen.template.is_empty() {
            self.assoc.assoc_op.get_key(&key)
        } else {
            None
        };
        let (slots, impl_form) = match plain {
            Some(slots) => (slots, false),
            None => (
                self.assoc
                    .impl_assoc_op
                    .get_key(&key)
                    .ok_or(TransformError::MissingRule("associative", gen.stmt))?,
                true,
            ),
        };
        let (slot, left, right, reversed) = match slots[from] {
            Some(_) => (from, first, second, false),
            None => (1 - from, second, first, true),
        };
        let rule = slots[slot].ok_or(TransformError::MissingRule("associative", gen.stmt))?;

        let mut hyps = Vec::new();
        if !gen.template.is_empty() {
            let side = if slot == 0 { left } else { right };
            let inner = gen.operand(side, 0);
            for operand in [gen.operand(inner, 0), gen.operand(inner, 1), gen.operand(side, 1)] {
                hyps.push(self.closure_property(info, &gen.template, operand, false, true)?);
            }
        }
        let step = self.apply_closure_properties(info, impl_form, &hyps, rule, left, right)?;
        if reversed {
            self.create_reverse_step(info, &step)
        } else {
            Ok(step)
        }
    }

    /// Rotates `node` (shaped like `structure`) until its top level split matches the one of
    /// `target`, then transforms both sides separately
    pub(super) fn associative_transform(
        &self,
        info: &mut WorksheetInfo,
        node: &ParseNode,
        gen: &GeneralizedStmt,
        structure: &AssocTree,
        target: &ParseNode,
        target_structure: &AssocTree,
    ) -> Result<Option<GenProofStep>, TransformError> {
        if let Necessity::Done(res) = self.check_necessary(info, node, target)? {
            return Ok(res);
        }
        let (from, to) = if structure.expect_sub(0, gen)?.size()
            > target_structure.expect_sub(0, gen)?.size()
        {
            (0, 1)
        } else {
            (1, 0)
        };
        let to_size = target_structure.expect_sub(to, gen)?.size();

        let mut g = node.clone();
        let mut tree = structure.clone();
        let mut res = None;
        loop {
            // (a . d) . f => a . (d . f)
            loop {
                let e_tree = tree.expect_sub(from, gen)?;
                let f_tree = tree.expect_sub(to, gen)?;
                if f_tree.size() >= to_size {
                    break;
                }
                let a_tree = e_tree.expect_sub(from, gen)?;
                let d_tree = e_tree.expect_sub(to, gen)?;
                if d_tree.size() + f_tree.size() > to_size {
                    break;
                }
                let e = gen.operand(&g, from);
                let f = gen.operand(&g, to).clone();
                let (a, d) = (gen.operand(e, from).clone(), gen.operand(e, to).clone());
                let new_g = gen.build_oriented(from, a, gen.build_oriented(from, d, f));
                let new_tree = AssocTree::compose_oriented(
                    from,
                    a_tree.clone(),
                    AssocTree::compose_oriented(from, d_tree.clone(), f_tree.clone()),
                );
                let step = self.create_associative_step(info, gen, from, &g, &new_g)?;
                res = Some(self.get_transitive_step(info, res, step)?);
                g = new_g;
                tree = new_tree;
            }

            let e_tree = tree.expect_sub(from, gen)?;
            let f_tree = tree.expect_sub(to, gen)?;
            if f_tree.size() == to_size {
                break;
            }
            // a . (b . c) => (a . b) . c inside the operand in slot `from`
            let a_tree = e_tree.expect_sub(from, gen)?;
            let d_tree = e_tree.expect_sub(to, gen)?;
            let (b_tree, c_tree) = (d_tree.expect_sub(from, gen)?, d_tree.expect_sub(to, gen)?);
            let e = gen.operand(&g, from).clone();
            let f = gen.operand(&g, to).clone();
            let a = gen.operand(&e, from).clone();
            let d = gen.operand(&e, to);
            let (b, c) = (gen.operand(d, from).clone(), gen.operand(d, to).clone());
            let new_e = gen.build_oriented(from, gen.build_oriented(from, a, b), c);
            let new_tree = AssocTree::compose_oriented(
                from,
                AssocTree::compose_oriented(
                    from,
                    AssocTree::compose_oriented(from, a_tree.clone(), b_tree.clone()),
                    c_tree.clone(),
                ),
                f_tree.clone(),
            );
            let e_step = self.create_associative_step(info, gen, to, &e, &new_e)?;
            let step = self.create_replace_step(info, &g, gen.position(from), &new_e, &e_step)?;
            res = Some(self.get_transitive_step(info, res, step)?);
            g = gen.build_oriented(from, new_e, f);
            tree = new_tree;
        }

        let rest = self.transform(
            info,
            &Transformation::Replace(g),
            &Transformation::Replace(target.clone()),
        )?;
        match rest {
            Some(step) => Ok(Some(self.get_transitive_step(info, res, step)?)),
            None => Ok(res),
        }
    }

    /// Left-nested chain of the canonical forms of the leaves
    pub(super) fn associative_canonical_form(
        &self,
        info: &WorksheetInfo,
        node: &ParseNode,
        gen: &GeneralizedStmt,
        structure: &AssocTree,
    ) -> ParseNode {
        let mut leaves = structure
            .leaves(gen, node)
            .into_iter()
            .map(|leaf| self.canonical_form(info, leaf));
        let first = match leaves.next() {
            Some(first) => first,
            None => return node.clone(),
        };
        leaves.fold(first, |res, next| gen.build(res, next))
    }
}

#[cfg(all(test, feature = "serialization"))]
mod tests {
    use super::super::fixture::*;
    use super::*;

    #[test]
    fn mines_associative_rules() {
        let fx = Fixture::new();
        let assoc = &fx.engine().assoc;
        let two = ConstSubst::new(vec![None, None]);
        let empty = PropertyTemplate::empty();
        assert_eq!(
            assoc.assoc_op.get(fx.op(".o"), &two, &empty),
            Some(&[Some(fx.label("coass")), None])
        );
        assert_eq!(
            assoc.assoc_op.get(fx.op("+"), &two, &empty),
            Some(&[Some(fx.label("addass")), None])
        );
        let cc = PropertyTemplate::from_hypothesis(&fx.parse("(A e. CC)"), fx.parse("A").stmt())
            .unwrap();
        assert_eq!(
            assoc.assoc_op.get(fx.op("x."), &two, &cc),
            Some(&[Some(fx.label("mulassi")), None])
        );
        assert!(assoc.impl_assoc_op.is_empty());
    }

    #[test]
    fn detects_side_conditions() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let mut worksheet = fx.worksheet("hyp |- (A e. CC)\ngoal |- ph\n");
        let info = WorksheetInfo::new(&fx.db, &mut worksheet, 1);
        assert!(engine
            .get_gen_stmt_for_assoc_node(&info, &fx.parse("((A x. 1) x. 1)"))
            .is_some());
        assert!(engine
            .get_gen_stmt_for_assoc_node(&info, &fx.parse("(A x. B)"))
            .is_none());
        assert!(engine
            .get_gen_stmt_for_assoc_node(&info, &fx.parse("(A e. B)"))
            .is_none());
    }

    #[test]
    fn rotation_against_the_law() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let mut worksheet = fx.worksheet("goal |- ph\n");
        let mut info = WorksheetInfo::new(&fx.db, &mut worksheet, 0);
        let first = fx.parse("(A .o (B .o C))");
        let second = fx.parse("((A .o B) .o C)");
        let gen = engine.get_gen_stmt_for_assoc_node(&info, &first).unwrap();
        let step = engine
            .create_associative_step(&mut info, &gen, 1, &first, &second)
            .unwrap();
        assert_eq!(
            step.formula(),
            &fx.parse("((A .o (B .o C)) = ((A .o B) .o C))")
        );
        let new_steps = info.into_new_steps();
        assert_eq!(fx.labels(&worksheet, &new_steps), vec!["coass", "eqcomi"]);
        fx.verify(&worksheet);
    }

    #[test]
    fn rotation_with_closure_hypotheses() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let mut worksheet = fx.worksheet("hyp |- (A e. CC)\nhyp |- (B e. CC)\ngoal |- ph\n");
        let mut info = WorksheetInfo::new(&fx.db, &mut worksheet, 2);
        let first = fx.parse("((A x. B) x. 1)");
        let second = fx.parse("(A x. (B x. 1))");
        let gen = engine.get_gen_stmt_for_assoc_node(&info, &first).unwrap();
        engine
            .create_associative_step(&mut info, &gen, 0, &first, &second)
            .unwrap();
        let new_steps = info.into_new_steps();
        assert_eq!(fx.labels(&worksheet, &new_steps), vec!["ax-1cn", "mulassi"]);
        fx.verify(&worksheet);
    }
}

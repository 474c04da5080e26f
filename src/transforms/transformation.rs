use log::trace;

use super::{AssocTree, Engine, GenProofStep, GeneralizedStmt, WorksheetInfo};
use crate::{error::TransformError, node::ParseNode};

/// How an expression can be rewritten into an equal one.
///
/// Two expressions with the same [canonical form](Engine::canonical_form) can be transformed into
/// each other with [`Engine::transform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformation {
    /// The expression can only be replaced by itself
    Identity(ParseNode),
    /// Operands at replaceable positions are transformed one by one
    Replace(ParseNode),
    /// A chain of an associative operator, which is rotated into the target's shape
    Associative {
        node: ParseNode,
        gen: GeneralizedStmt,
        structure: AssocTree,
    },
    /// An application of a commutative operator, whose operands may be swapped
    Commutative { node: ParseNode, gen: GeneralizedStmt },
    /// A chain of an operator which is associative and commutative, whose leaves may be
    /// reordered and regrouped
    AssocCom {
        node: ParseNode,
        gen: GeneralizedStmt,
        com: GeneralizedStmt,
        structure: AssocTree,
    },
}

impl Transformation {
    pub fn node(&self) -> &ParseNode {
        match self {
            Transformation::Identity(node) | Transformation::Replace(node) => node,
            Transformation::Associative { node, .. }
            | Transformation::Commutative { node, .. }
            | Transformation::AssocCom { node, .. } => node,
        }
    }
}

/// Result of [`Engine::check_necessary`]
pub(super) enum Necessity {
    /// Nothing left to do: no step is needed (`None`) or the step exists already
    Done(Option<GenProofStep>),
    Transform,
}

impl Engine<'_> {
    /// Picks the transformation for `node`
    pub fn create_transformation(&self, info: &WorksheetInfo, node: &ParseNode) -> Transformation {
        if self
            .replace
            .possible_replaces(node.stmt(), info.has_prefix())
            .is_none()
        {
            return Transformation::Identity(node.clone());
        }
        let com = self.get_gen_stmt_for_com_node(info, node);
        let assoc = self.get_gen_stmt_for_assoc_node(info, node);
        match (assoc, com) {
            (Some(gen), Some(com)) if Self::is_assoc_com(&gen, &com) => {
                let structure = AssocTree::new(self, info, &gen, node);
                Transformation::AssocCom {
                    node: node.clone(),
                    gen,
                    com,
                    structure,
                }
            }
            (_, Some(gen)) => Transformation::Commutative {
                node: node.clone(),
                gen,
            },
            (Some(gen), None) => {
                let structure = AssocTree::new(self, info, &gen, node);
                Transformation::Associative {
                    node: node.clone(),
                    gen,
                    structure,
                }
            }
            (None, None) => Transformation::Replace(node.clone()),
        }
    }

    /// The representative of all expressions `node` can be transformed into
    pub fn canonical_form(&self, info: &WorksheetInfo, node: &ParseNode) -> ParseNode {
        let transformation = self.create_transformation(info, node);
        self.transformation_canonical_form(info, &transformation)
    }

    pub fn transformation_canonical_form(
        &self,
        info: &WorksheetInfo,
        transformation: &Transformation,
    ) -> ParseNode {
        match transformation {
            Transformation::Identity(node) => node.clone(),
            Transformation::Replace(node) => self.replace_canonical_form(info, node),
            Transformation::Associative {
                node,
                gen,
                structure,
            } => self.associative_canonical_form(info, node, gen, structure),
            Transformation::Commutative { node, gen } => {
                self.commutative_canonical_form(info, node, gen)
            }
            Transformation::AssocCom {
                node,
                gen,
                structure,
                ..
            } => self.assoc_com_canonical_form(info, node, gen, structure),
        }
    }

    fn replace_canonical_form(&self, info: &WorksheetInfo, node: &ParseNode) -> ParseNode {
        let possible = match self
            .replace
            .possible_replaces(node.stmt(), info.has_prefix())
        {
            Some(possible) => possible,
            None => return node.clone(),
        };
        let children = node
            .children()
            .iter()
            .zip(possible)
            .map(|(child, replaceable)| {
                if replaceable {
                    self.canonical_form(info, child)
                } else {
                    child.clone()
                }
            })
            .collect();
        ParseNode::new(node.stmt(), children)
    }

    /// Proves `source = target`, if possible under the prefix. Returns `None` if the nodes are
    /// equal.
    pub fn transform(
        &self,
        info: &mut WorksheetInfo,
        source: &Transformation,
        target: &Transformation,
    ) -> Result<Option<GenProofStep>, TransformError> {
        trace!("transform {:?} into {:?}", source.node(), target.node());
        match source {
            Transformation::Identity(node) => match self.check_necessary(info, node, target.node())? {
                Necessity::Done(res) => Ok(res),
                Necessity::Transform => Err(TransformError::Unreachable(node.stmt())),
            },
            Transformation::Replace(node) => self.replace_transform(info, node, target.node()),
            Transformation::Associative {
                node,
                gen,
                structure,
            } => match target {
                Transformation::Associative {
                    node: target,
                    structure: target_structure,
                    ..
                } => self.associative_transform(info, node, gen, structure, target, target_structure),
                _ => match self.check_necessary(info, node, target.node())? {
                    Necessity::Done(res) => Ok(res),
                    Necessity::Transform => Err(TransformError::Unreachable(node.stmt())),
                },
            },
            Transformation::Commutative { node, gen } => {
                self.commutative_transform(info, node, gen, target.node())
            }
            Transformation::AssocCom {
                node,
                gen,
                com,
                structure,
            } => self.assoc_com_transform(info, node, gen, com, structure, target.node()),
        }
    }

    /// Looks for a shortcut: equal nodes need no step and an existing step proving
    /// `source = target` (possibly under the prefix) is reused
    pub(super) fn check_necessary(
        &self,
        info: &WorksheetInfo,
        source: &ParseNode,
        target: &ParseNode,
    ) -> Result<Necessity, TransformError> {
        if source == target {
            return Ok(Necessity::Done(None));
        }
        let eq_node = self.eq.create_eq_node(self.db.syntax(), source, target)?;
        if let Some(step) = info.proof_step(&eq_node) {
            return Ok(Necessity::Done(Some(step)));
        }
        if info.has_prefix() {
            if let Some(step) = info.proof_step(&info.apply_prefix(&eq_node)) {
                return Ok(Necessity::Done(Some(info.with_prefix(step))));
            }
        }
        Ok(Necessity::Transform)
    }

    /// Transforms the replaceable operands of `node` one at a time
    fn replace_transform(
        &self,
        info: &mut WorksheetInfo,
        node: &ParseNode,
        target: &ParseNode,
    ) -> Result<Option<GenProofStep>, TransformError> {
        if let Necessity::Done(res) = self.check_necessary(info, node, target)? {
            return Ok(res);
        }
        let stmt = node.stmt();
        if target.stmt() != stmt || target.children().len() != node.children().len() {
            return Err(TransformError::Unreachable(stmt));
        }
        let could_simplify = info.prefix_stmt() == Some(stmt)
            && info.prefix().as_ref() == Some(node.child(0))
            && info.prefix().as_ref() == Some(target.child(0));
        let possible = self
            .replace
            .possible_replaces(stmt, info.has_prefix())
            .unwrap_or_else(|| vec![false; node.children().len()]);

        let mut res_node = node.clone();
        let mut res = None;
        for (i, replaceable) in possible.into_iter().enumerate() {
            if !replaceable {
                continue;
            }
            let source_child = self.create_transformation(info, node.child(i));
            let target_child = self.create_transformation(info, target.child(i));
            let child_step = match self.transform(info, &source_child, &target_child)? {
                Some(step) => step,
                None => continue,
            };
            if could_simplify && i == 1 && child_step.has_prefix() {
                return self.apply_distributive_rule(info, &child_step).map(Some);
            }
            let step =
                self.create_replace_step(info, &res_node, i, target.child(i), &child_step)?;
            res_node = step.core().child(1).clone();
            res = Some(self.get_transitive_step(info, res, step)?);
        }
        if res_node != *target {
            return Err(TransformError::Unreachable(stmt));
        }
        Ok(res)
    }
}

#[cfg(all(test, feature = "serialization"))]
mod tests {
    use super::super::fixture::*;
    use super::*;

    fn kind(transformation: &Transformation) -> &'static str {
        match transformation {
            Transformation::Identity(_) => "identity",
            Transformation::Replace(_) => "replace",
            Transformation::Associative { .. } => "associative",
            Transformation::Commutative { .. } => "commutative",
            Transformation::AssocCom { .. } => "assoc-com",
        }
    }

    #[test]
    fn transformation_kinds() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let mut worksheet = fx.worksheet("goal |- ph\n");
        let info = WorksheetInfo::new(&fx.db, &mut worksheet, 0);
        let kind_of = |s| kind(&engine.create_transformation(&info, &fx.parse(s)));
        assert_eq!(kind_of("A"), "identity");
        assert_eq!(kind_of("(A e. CC)"), "identity");
        assert_eq!(kind_of("(A + B)"), "assoc-com");
        assert_eq!(kind_of("((A + B) + C)"), "assoc-com");
        assert_eq!(kind_of("(A .o B)"), "associative");
        assert_eq!(kind_of("(A x. B)"), "replace");
        assert_eq!(kind_of("(A = B)"), "replace");
    }

    fn run(fx: &Fixture, worksheet: &str, source: &str, target: &str) -> Vec<String> {
        let engine = fx.engine();
        let mut worksheet = fx.worksheet(worksheet);
        let goal = worksheet.len() - 1;
        let mut info = WorksheetInfo::new(&fx.db, &mut worksheet, goal);
        let source = engine.create_transformation(&info, &fx.parse(source));
        let target = engine.create_transformation(&info, &fx.parse(target));
        let step = engine.transform(&mut info, &source, &target).unwrap().unwrap();
        assert_eq!(step.core().child(0), source.node());
        assert_eq!(step.core().child(1), target.node());
        let new_steps = info.into_new_steps();
        fx.verify(&worksheet);
        fx.labels(&worksheet, &new_steps)
    }

    #[test]
    fn canonical_forms_agree() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let mut worksheet = fx.worksheet("goal |- ph\n");
        let info = WorksheetInfo::new(&fx.db, &mut worksheet, 0);
        let canonical = |s| engine.canonical_form(&info, &fx.parse(s));
        assert_eq!(
            canonical("(((A .o B) .o C) .o D)"),
            canonical("(A .o (B .o (C .o D)))")
        );
        assert_eq!(
            canonical("((A .o (B .o C)) .o D)"),
            fx.parse("(((A .o B) .o C) .o D)")
        );
        assert_ne!(canonical("(A .o B)"), canonical("(B .o A)"));
        assert_eq!(canonical("((A + B) = C)"), canonical("((B + A) = C)"));
        assert_ne!(canonical("((A + B) = C)"), canonical("(C = (B + A))"));
    }

    #[test]
    fn single_rotation() {
        let fx = Fixture::new();
        let labels = run(&fx, "goal |- ph\n", "((A .o B) .o C)", "(A .o (B .o C))");
        assert_eq!(labels, vec!["coass"]);
    }

    #[test]
    fn two_rotations() {
        let fx = Fixture::new();
        let labels = run(
            &fx,
            "goal |- ph\n",
            "(((A .o B) .o C) .o D)",
            "(A .o (B .o (C .o D)))",
        );
        assert_eq!(labels, vec!["coass", "coass", "eqtri"]);
    }

    #[test]
    fn rotation_inside_operand() {
        let fx = Fixture::new();
        let labels = run(
            &fx,
            "goal |- ph\n",
            "((A .o (B .o C)) .o D)",
            "(((A .o B) .o C) .o D)",
        );
        assert_eq!(labels, vec!["coass", "eqcomi", "coeq1i"]);
    }

    #[test]
    fn reassociation_inside_shrinking_side() {
        let fx = Fixture::new();
        let labels = run(
            &fx,
            "goal |- ph\n",
            "((A .o (B .o C)) .o D)",
            "((A .o B) .o (C .o D))",
        );
        assert_eq!(labels, vec!["coass", "eqcomi", "coeq1i", "coass", "eqtri"]);
        let labels = run(
            &fx,
            "goal |- ph\n",
            "(A .o ((B .o C) .o D))",
            "((A .o B) .o (C .o D))",
        );
        assert_eq!(labels, vec!["coass", "coeq2i", "coass", "eqcomi", "eqtri"]);
    }

    #[test]
    fn single_swap() {
        let fx = Fixture::new();
        let labels = run(&fx, "goal |- ph\n", "(A + B)", "(B + A)");
        assert_eq!(labels, vec!["addcom"]);
    }

    #[test]
    fn swap_inside_operand() {
        let fx = Fixture::new();
        let labels = run(&fx, "goal |- ph\n", "((A + B) = C)", "((B + A) = C)");
        assert_eq!(labels, vec!["addcom", "eqeq1i"]);
    }

    #[test]
    fn existing_steps_are_reused() {
        let fx = Fixture::new();
        let labels = run(
            &fx,
            "hyp |- (A = B)\ngoal |- ph\n",
            "(C .o A)",
            "(C .o B)",
        );
        assert_eq!(labels, vec!["coeq2i"]);
    }

    #[test]
    fn unreachable_targets_fail() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let mut worksheet = fx.worksheet("goal |- ph\n");
        let mut info = WorksheetInfo::new(&fx.db, &mut worksheet, 0);
        let source = engine.create_transformation(&info, &fx.parse("(A e. CC)"));
        let target = engine.create_transformation(&info, &fx.parse("(B e. CC)"));
        assert_eq!(
            engine.transform(&mut info, &source, &target),
            Err(TransformError::Unreachable(fx.op("e.")))
        );
        assert_eq!(engine.transform(&mut info, &source, &source), Ok(None));
    }
}

use super::{Engine, GeneralizedStmt, WorksheetInfo};
use crate::{error::TransformError, node::ParseNode};

/// The shape of a chain of one associative operator: which operands are nested applications of
/// the same operator and which are opaque leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssocTree {
    Leaf,
    Node { size: usize, sub: Box<[AssocTree; 2]> },
}

impl AssocTree {
    /// Builds the shape of `node`. Operands are only descended into if they apply `gen` and
    /// satisfy its side condition.
    pub fn new(engine: &Engine, info: &WorksheetInfo, gen: &GeneralizedStmt, node: &ParseNode) -> Self {
        if !gen.matches(node) {
            return AssocTree::Leaf;
        }
        let sub = [0, 1].map(|slot| {
            let operand = gen.operand(node, slot);
            if gen.matches(operand) && engine.is_associative_with_prop(info, gen, operand) {
                Self::new(engine, info, gen, operand)
            } else {
                AssocTree::Leaf
            }
        });
        Self::compose(sub)
    }

    pub fn compose(sub: [AssocTree; 2]) -> Self {
        AssocTree::Node {
            size: sub[0].size() + sub[1].size(),
            sub: Box::new(sub),
        }
    }

    /// Like [`compose`](#method.compose), with `inner` in slot `from`
    pub fn compose_oriented(from: usize, inner: AssocTree, outer: AssocTree) -> Self {
        if from == 0 {
            Self::compose([inner, outer])
        } else {
            Self::compose([outer, inner])
        }
    }

    /// The shape of `((a . b) . c) . ...` with `size` leaves
    pub fn left_nested(size: usize) -> Self {
        (1..size).fold(AssocTree::Leaf, |tree, _| {
            Self::compose([tree, AssocTree::Leaf])
        })
    }

    /// Number of leaves
    pub fn size(&self) -> usize {
        match self {
            AssocTree::Leaf => 1,
            AssocTree::Node { size, .. } => *size,
        }
    }

    pub fn sub(&self, slot: usize) -> Option<&AssocTree> {
        match self {
            AssocTree::Leaf => None,
            AssocTree::Node { sub, .. } => Some(&sub[slot]),
        }
    }

    pub(super) fn expect_sub(
        &self,
        slot: usize,
        gen: &GeneralizedStmt,
    ) -> Result<&AssocTree, TransformError> {
        self.sub(slot).ok_or(TransformError::Unreachable(gen.stmt))
    }

    /// The leaves of `node` (shaped like this tree) from left to right
    pub fn leaves<'a>(&self, gen: &GeneralizedStmt, node: &'a ParseNode) -> Vec<&'a ParseNode> {
        let mut res = Vec::with_capacity(self.size());
        self.collect_leaves(gen, node, &mut res);
        res
    }

    fn collect_leaves<'a>(
        &self,
        gen: &GeneralizedStmt,
        node: &'a ParseNode,
        res: &mut Vec<&'a ParseNode>,
    ) {
        match self {
            AssocTree::Leaf => res.push(node),
            AssocTree::Node { sub, .. } => {
                for (slot, tree) in sub.iter().enumerate() {
                    tree.collect_leaves(gen, gen.operand(node, slot), res);
                }
            }
        }
    }
}

use log::trace;

use super::{
    commutative::compare_operands, AssocTree, Engine, GenProofStep, GeneralizedStmt, Necessity,
    WorksheetInfo,
};
use crate::{error::TransformError, node::ParseNode};

/// `chains[k]` is the left-nested chain of `leaves[..=k]`
fn left_chains(gen: &GeneralizedStmt, leaves: &[ParseNode]) -> Vec<ParseNode> {
    let mut chains: Vec<ParseNode> = Vec::with_capacity(leaves.len());
    for leaf in leaves {
        let next = match chains.last() {
            Some(prev) => gen.build(prev.clone(), leaf.clone()),
            None => leaf.clone(),
        };
        chains.push(next);
    }
    chains
}

impl Engine<'_> {
    /// Whether `assoc` and `com` describe the same operator, so that the leaves of an
    /// associative chain can be swapped with the commutativity law
    pub(super) fn is_assoc_com(assoc: &GeneralizedStmt, com: &GeneralizedStmt) -> bool {
        assoc.stmt == com.stmt
            && assoc.const_subst == com.const_subst
            && assoc.var_indexes == com.var_indexes
    }

    /// Proves that the left-nested chain of `leaves` equals the one with leaves `i` and `i + 1`
    /// swapped.
    ///
    /// ```text
    /// ((p . a) . b) = (p . (a . b)) = (p . (b . a)) = ((p . b) . a)
    /// ```
    fn swap_adjacent_leaves(
        &self,
        info: &mut WorksheetInfo,
        gen: &GeneralizedStmt,
        com: &GeneralizedStmt,
        leaves: &[ParseNode],
        i: usize,
    ) -> Result<GenProofStep, TransformError> {
        let old = left_chains(gen, leaves);
        let mut swapped = leaves.to_vec();
        swapped.swap(i, i + 1);
        let new = left_chains(gen, &swapped);

        let mut step = if i == 0 {
            self.create_commutative_step(info, com, &old[1], &new[1])?
        } else {
            let (a, b) = (leaves[i].clone(), leaves[i + 1].clone());
            let inner = gen.build(a.clone(), b.clone());
            let inner_swapped = gen.build(b, a);
            let rotated = gen.build(old[i - 1].clone(), inner.clone());
            let rotated_swapped = gen.build(old[i - 1].clone(), inner_swapped.clone());

            let down = self.create_associative_step(info, gen, 0, &old[i + 1], &rotated)?;
            let swap = self.create_commutative_step(info, com, &inner, &inner_swapped)?;
            let swap =
                self.create_replace_step(info, &rotated, gen.position(1), &inner_swapped, &swap)?;
            let up = self.create_associative_step(info, gen, 1, &rotated_swapped, &new[i + 1])?;
            let res = self.get_transitive_step(info, Some(down), swap)?;
            self.get_transitive_step(info, Some(res), up)?
        };
        for k in i + 2..leaves.len() {
            step = self.create_replace_step(info, &old[k], gen.position(0), &new[k - 1], &step)?;
        }
        Ok(step)
    }

    /// Reorders the leaves of `node` into the order of the matching leaves of `target`, then
    /// rotates it into the shape of `target`.
    ///
    /// The chain is flattened to a left-nested one first, where adjacent leaves can be swapped.
    pub(super) fn assoc_com_transform(
        &self,
        info: &mut WorksheetInfo,
        node: &ParseNode,
        gen: &GeneralizedStmt,
        com: &GeneralizedStmt,
        structure: &AssocTree,
        target: &ParseNode,
    ) -> Result<Option<GenProofStep>, TransformError> {
        if let Necessity::Done(res) = self.check_necessary(info, node, target)? {
            return Ok(res);
        }
        if !gen.matches(target) {
            return Err(TransformError::Unreachable(node.stmt()));
        }
        let target_structure = AssocTree::new(self, info, gen, target);
        let leaves: Vec<ParseNode> = structure.leaves(gen, node).into_iter().cloned().collect();
        let target_leaves = target_structure.leaves(gen, target);
        if leaves.len() != target_leaves.len() {
            return Err(TransformError::Unreachable(node.stmt()));
        }

        // rank[i] is the position in `target` the leaf `i` of `node` goes to
        let canonical: Vec<_> = leaves.iter().map(|l| self.canonical_form(info, l)).collect();
        let mut rank = vec![None; leaves.len()];
        for (j, leaf) in target_leaves.iter().enumerate() {
            let form = self.canonical_form(info, leaf);
            let i = (0..leaves.len())
                .find(|i| rank[*i].is_none() && canonical[*i] == form)
                .ok_or(TransformError::Unreachable(node.stmt()))?;
            rank[i] = Some(j);
        }
        let rank = rank
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or(TransformError::Unreachable(node.stmt()))?;
        let mut order: Vec<(usize, ParseNode)> = rank.into_iter().zip(leaves).collect();

        let flat_structure = AssocTree::left_nested(order.len());
        let leaves: Vec<_> = order.iter().map(|(_, l)| l.clone()).collect();
        let flat = left_chains(gen, &leaves).pop().unwrap_or_else(|| node.clone());
        let mut res =
            self.associative_transform(info, node, gen, structure, &flat, &flat_structure)?;

        let mut sorted = false;
        while !sorted {
            sorted = true;
            for i in 1..order.len() {
                if order[i - 1].0 > order[i].0 {
                    trace!("swap leaves {} and {}", i - 1, i);
                    let leaves: Vec<_> = order.iter().map(|(_, l)| l.clone()).collect();
                    let step = self.swap_adjacent_leaves(info, gen, com, &leaves, i - 1)?;
                    res = Some(self.get_transitive_step(info, res, step)?);
                    order.swap(i - 1, i);
                    sorted = false;
                }
            }
        }

        let leaves: Vec<_> = order.into_iter().map(|(_, l)| l).collect();
        let sorted_node = left_chains(gen, &leaves).pop().unwrap_or_else(|| node.clone());
        let rest = self.associative_transform(
            info,
            &sorted_node,
            gen,
            &flat_structure,
            target,
            &target_structure,
        )?;
        match rest {
            Some(step) => Ok(Some(self.get_transitive_step(info, res, step)?)),
            None => Ok(res),
        }
    }

    /// Left-nested chain of the canonical forms of the leaves, the larger leaves first
    pub(super) fn assoc_com_canonical_form(
        &self,
        info: &WorksheetInfo,
        node: &ParseNode,
        gen: &GeneralizedStmt,
        structure: &AssocTree,
    ) -> ParseNode {
        let mut leaves: Vec<_> = structure
            .leaves(gen, node)
            .into_iter()
            .map(|leaf| self.canonical_form(info, leaf))
            .collect();
        leaves.sort_by(|a, b| compare_operands(b, a));
        left_chains(gen, &leaves).pop().unwrap_or_else(|| node.clone())
    }
}

use crate::{node::ParseNode, types::Identifier};

/// The constant children of an operator application.
///
/// Position `i` holds `Some(c)` if the `i`th child is the ground term `c` and `None` if a
/// variable (or any non-ground expression) lives there.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstSubst(Vec<Option<ParseNode>>);

impl ConstSubst {
    pub fn new(consts: Vec<Option<ParseNode>>) -> Self {
        ConstSubst(consts)
    }

    /// Collects the ground children of `node`
    ///
    /// # Example
    /// ```
    /// use attomath_transforms::ParseNode;
    /// use attomath_transforms::transforms::ConstSubst;
    ///
    /// let one = ParseNode::new(-3, vec![]);
    /// let node = ParseNode::new(-2, vec![ParseNode::var(0), one.clone(), ParseNode::var(1)]);
    /// let subst = ConstSubst::from_node(&node);
    /// assert_eq!(subst.var_places(), vec![0, 2]);
    /// assert_eq!(subst.get(1), Some(&one));
    /// ```
    pub fn from_node(node: &ParseNode) -> Self {
        ConstSubst(
            node.children()
                .iter()
                .map(|c| if c.is_const() { Some(c.clone()) } else { None })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no position holds a constant
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    pub fn get(&self, i: usize) -> Option<&ParseNode> {
        self.0.get(i).and_then(Option::as_ref)
    }

    /// Tests whether `candidate` has constants exactly where this substitution has them, and the
    /// same ones.
    pub fn is_same_const_map(&self, candidate: &ParseNode) -> bool {
        candidate.children().len() == self.0.len()
            && candidate
                .children()
                .iter()
                .zip(self.0.iter())
                .all(|(child, c)| match c {
                    Some(c) => child.is_const() && child == c,
                    None => !child.is_const(),
                })
    }

    /// Positions without a constant
    pub fn var_places(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// Checks that every constant of this substitution is also present in `node_consts` (the
    /// substitution collected from a concrete node) and returns the variable positions.
    ///
    /// A ground child of the node may stand at a variable position.
    pub fn var_positions_in(&self, node_consts: &ConstSubst) -> Option<Vec<usize>> {
        if node_consts.len() != self.len() {
            return None;
        }
        let mut res = Vec::new();
        for (i, c) in self.0.iter().enumerate() {
            match c {
                Some(c) => {
                    if node_consts.get(i) != Some(c) {
                        return None;
                    }
                }
                None => res.push(i),
            }
        }
        Some(res)
    }

    /// Builds an application of `stmt` with these constants and `vars` at `var_indexes`
    pub fn build(&self, stmt: Identifier, var_indexes: &[usize], vars: &[ParseNode]) -> ParseNode {
        debug_assert_eq!(var_indexes.len(), vars.len());
        let mut children: Vec<_> = self
            .0
            .iter()
            .map(|c| c.clone().unwrap_or_else(ParseNode::placeholder))
            .collect();
        for (i, var) in var_indexes.iter().zip(vars.iter()) {
            children[*i] = var.clone();
        }
        ParseNode::new(stmt, children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one() -> ParseNode {
        ParseNode::new(-3, vec![])
    }

    #[test]
    fn same_const_map() {
        let a = ParseNode::var(0);
        let node = ParseNode::new(-2, vec![a.clone(), one(), a.clone()]);
        let subst = ConstSubst::from_node(&node);
        assert!(!subst.is_empty());
        assert!(subst.is_same_const_map(&node));
        let other = ParseNode::new(-2, vec![one(), one(), a.clone()]);
        assert!(!subst.is_same_const_map(&other));
        assert!(!subst.is_same_const_map(&ParseNode::binary(-1, a.clone(), a)));
    }

    #[test]
    fn constants_may_fill_variable_places() {
        let pattern = ConstSubst::new(vec![None, Some(one()), None]);
        let node = ParseNode::new(-2, vec![one(), one(), ParseNode::var(1)]);
        assert_eq!(
            pattern.var_positions_in(&ConstSubst::from_node(&node)),
            Some(vec![0, 2])
        );
        let node = ParseNode::new(-2, vec![one(), ParseNode::var(0), ParseNode::var(1)]);
        assert_eq!(pattern.var_positions_in(&ConstSubst::from_node(&node)), None);
        let two = ConstSubst::new(vec![None, None]);
        assert_eq!(two.var_positions_in(&ConstSubst::from_node(&node)), None);
    }

    #[test]
    fn build_fills_variable_places() {
        let pattern = ConstSubst::new(vec![None, Some(one()), None]);
        let (a, b) = (ParseNode::var(0), ParseNode::var(1));
        assert_eq!(
            pattern.build(-2, &[2, 0], &[a.clone(), b.clone()]),
            ParseNode::new(-2, vec![b, one(), a])
        );
    }
}

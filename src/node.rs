use crate::{error::ProofError, types::*};
use std::sync::Arc;

/// Identifier of the distinguished hole inside a property template (see
/// [`PropertyTemplate`][crate::transforms::PropertyTemplate]).
pub const PLACEHOLDER: Identifier = Identifier::MIN;

/// An immutable n-ary parse tree.
///
/// Every node carries the identifier of its root symbol. Operators (syntax axioms) have negative
/// identifiers and variables have non-negative ones, so a variable leaf is identified by its
/// variable id. Children are shared, which makes cloning a tree cheap while equality, hashing and
/// ordering stay structural.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ParseNode {
    stmt: Identifier,
    children: Arc<[ParseNode]>,
}

impl ParseNode {
    pub fn new(stmt: Identifier, children: Vec<ParseNode>) -> Self {
        ParseNode {
            stmt,
            children: children.into(),
        }
    }

    /// Creates a variable leaf.
    ///
    /// # Panics
    /// This method panics if `id` is an operator identifier
    pub fn var(id: Identifier) -> Self {
        assert!(!is_operator(id), "{} is not a variable", id);
        Self::new(id, Vec::new())
    }

    pub fn binary(stmt: Identifier, left: ParseNode, right: ParseNode) -> Self {
        Self::new(stmt, vec![left, right])
    }

    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER, Vec::new())
    }

    pub fn stmt(&self) -> Identifier {
        self.stmt
    }

    pub fn children(&self) -> &[ParseNode] {
        &self.children
    }

    pub fn child(&self, i: usize) -> &ParseNode {
        &self.children[i]
    }

    pub fn is_var(&self) -> bool {
        !is_operator(self.stmt)
    }

    pub fn is_placeholder(&self) -> bool {
        self.stmt == PLACEHOLDER
    }

    /// Tests whether this tree is a ground term, i.e. contains neither variables nor a template
    /// placeholder.
    ///
    /// # Example
    /// ```
    /// use attomath_transforms::ParseNode;
    ///
    /// let one = ParseNode::new(-3, vec![]);
    /// assert!(one.is_const());
    /// assert!(ParseNode::binary(-1, one.clone(), one.clone()).is_const());
    /// assert!(!ParseNode::binary(-1, one, ParseNode::var(0)).is_const());
    /// ```
    pub fn is_const(&self) -> bool {
        !self.is_var() && !self.is_placeholder() && self.children.iter().all(|c| c.is_const())
    }

    /// Number of levels of this tree, a leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(|c| c.depth()).max().unwrap_or(0)
    }

    /// Number of nodes of this tree.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(|c| c.size()).sum::<usize>()
    }

    /// The variables occuring in this tree, sorted and without duplicates.
    pub fn variables(&self) -> Vec<Identifier> {
        let mut res = Vec::new();
        self.collect_variables(&mut res);
        res.sort_unstable();
        res.dedup();
        res
    }

    fn collect_variables(&self, res: &mut Vec<Identifier>) {
        if self.is_var() {
            res.push(self.stmt);
        } else {
            for child in self.children.iter() {
                child.collect_variables(res);
            }
        }
    }

    /// Returns the only variable of this tree, or `None` if there are zero or several.
    pub fn single_variable(&self) -> Option<Identifier> {
        match self.variables().as_slice() {
            [v] => Some(*v),
            _ => None,
        }
    }

    /// Returns a copy of this node with the `i`th child replaced.
    pub fn with_child(&self, i: usize, node: ParseNode) -> Self {
        let mut children = self.children.to_vec();
        children[i] = node;
        Self::new(self.stmt, children)
    }

    /// Replaces every occurence of the subtree `from` by `to` and returns the number of
    /// replacements.
    ///
    /// # Example
    /// ```
    /// use attomath_transforms::ParseNode;
    ///
    /// let a = ParseNode::var(0);
    /// let b = ParseNode::var(1);
    /// let expr = ParseNode::binary(-1, a.clone(), ParseNode::binary(-2, a.clone(), b.clone()));
    /// let (res, count) = expr.replace_all(&a, &b);
    /// assert_eq!(count, 2);
    /// assert_eq!(res, ParseNode::binary(-1, b.clone(), ParseNode::binary(-2, b.clone(), b)));
    /// ```
    pub fn replace_all(&self, from: &ParseNode, to: &ParseNode) -> (Self, usize) {
        if self == from {
            return (to.clone(), 1);
        }
        let mut count = 0;
        let children = self
            .children
            .iter()
            .map(|c| {
                let (c, n) = c.replace_all(from, to);
                count += n;
                c
            })
            .collect();
        (Self::new(self.stmt, children), count)
    }

    /// Calculates a `Substitution` which transforms `pattern` into `self`. If this function
    /// succeeds then it is guaranteed that `pattern.substitute(&substitution) == *self`.
    ///
    /// # Errors
    /// * OperatorMismatch - if the operators of `pattern` do not match the corresponding
    /// operators of `self`
    /// * VariableMismatch - if a variable in `pattern` would have to be substituted by two
    /// different expressions
    ///
    /// # Example
    /// ```
    /// use attomath_transforms::node::{ParseNode, WholeSubstitution};
    /// use attomath_transforms::error::ProofError;
    ///
    /// let x = ParseNode::var(0);
    /// let y = ParseNode::var(1);
    /// let pattern = ParseNode::binary(-1, x.clone(), y.clone());
    /// let instance = ParseNode::binary(-1, y.clone(), ParseNode::binary(-1, x.clone(), y.clone()));
    /// let mut sub = WholeSubstitution::with_capacity(2);
    /// assert_eq!(instance.unify(&pattern, &mut sub), Ok(()));
    /// assert_eq!(pattern.substitute(&sub), instance);
    ///
    /// let pattern = ParseNode::binary(-1, x.clone(), x.clone());
    /// let mut sub = WholeSubstitution::with_capacity(2);
    /// assert_eq!(instance.unify(&pattern, &mut sub), Err(ProofError::VariableMismatch(0)));
    /// ```
    pub fn unify(
        &self,
        pattern: &ParseNode,
        substitution: &mut WholeSubstitution,
    ) -> Result<(), ProofError> {
        if pattern.is_var() {
            return match substitution.substitution_opt(pattern.stmt) {
                Some(old) if old != self => Err(ProofError::VariableMismatch(pattern.stmt)),
                Some(_) => Ok(()),
                None => {
                    substitution.insert(pattern.stmt, self.clone());
                    Ok(())
                }
            };
        }
        if pattern.stmt != self.stmt || pattern.children.len() != self.children.len() {
            return Err(ProofError::OperatorMismatch(pattern.stmt, self.stmt));
        }
        for (p, c) in pattern.children.iter().zip(self.children.iter()) {
            c.unify(p, substitution)?;
        }
        Ok(())
    }

    /// Use the given substitution on this tree to create a new tree
    pub fn substitute<S: Substitution>(&self, substitution: &S) -> ParseNode {
        if self.is_var() {
            return substitution
                .substitution_opt(self.stmt)
                .cloned()
                .unwrap_or_else(|| self.clone());
        }
        let children = self
            .children
            .iter()
            .map(|c| c.substitute(substitution))
            .collect();
        Self::new(self.stmt, children)
    }
}

/// Tests whether the given identifier is an operator
///
/// # Example
/// ```
/// use attomath_transforms::node::is_operator;
///
/// assert!(is_operator(-2));
/// assert!(is_operator(-1));
/// assert!(!is_operator(0));
/// ```
pub fn is_operator(x: Identifier) -> bool {
    x < 0
}

/// A `Substitution` maps variable ids to parse trees.
pub trait Substitution {
    /// Get the stored substitution for the variable with identifier `id`. Or `None` if the
    /// variable should not be replaced.
    fn substitution_opt(&self, id: Identifier) -> Option<&ParseNode>;
}

/// A general [`Substitution`](trait.Substitution.html) covering the variables `0..n`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WholeSubstitution {
    substitution: Vec<Option<ParseNode>>,
}

impl WholeSubstitution {
    /// Creates a substitution with the capacity to store replacements for variables `0` to
    /// `n - 1`.
    pub fn with_capacity(n: usize) -> Self {
        WholeSubstitution {
            substitution: vec![None; n],
        }
    }

    /// Marks the `id` to be substituted by `expr`. The table grows when `id` is out of range.
    pub fn insert(&mut self, id: Identifier, expr: ParseNode) {
        let index = id as usize;
        if index >= self.substitution.len() {
            self.substitution.resize(index + 1, None);
        }
        self.substitution[index] = Some(expr)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Identifier, &ParseNode)> + '_ {
        self.substitution
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (i as Identifier, e)))
    }
}

impl Substitution for WholeSubstitution {
    fn substitution_opt(&self, id: Identifier) -> Option<&ParseNode> {
        self.substitution.get(id as usize).and_then(|e| e.as_ref())
    }
}

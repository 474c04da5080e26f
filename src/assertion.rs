use crate::{node::ParseNode, types::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionKind {
    Axiom,
    Theorem,
}

/// An axiom or theorem of the library.
///
/// The hypotheses and the conclusion are expressions of the logical typecode. An assertion is
/// applied by substituting its mandatory variables, which are all variables occuring in
/// hypotheses or conclusion, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    label: String,
    kind: AssertionKind,
    hypotheses: Vec<ParseNode>,
    conclusion: ParseNode,
    mandatory_variables: Vec<Identifier>,
}

impl Assertion {
    pub fn new(
        label: String,
        kind: AssertionKind,
        hypotheses: Vec<ParseNode>,
        conclusion: ParseNode,
    ) -> Self {
        let mut mandatory_variables = conclusion.variables();
        for hyp in hypotheses.iter() {
            mandatory_variables.extend(hyp.variables());
        }
        mandatory_variables.sort_unstable();
        mandatory_variables.dedup();
        Assertion {
            label,
            kind,
            hypotheses,
            conclusion,
            mandatory_variables,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> AssertionKind {
        self.kind
    }

    pub fn hypotheses(&self) -> &[ParseNode] {
        &self.hypotheses
    }

    pub fn conclusion(&self) -> &ParseNode {
        &self.conclusion
    }

    pub fn mandatory_variables(&self) -> &[Identifier] {
        &self.mandatory_variables
    }

    /// Depth of the conclusion's parse tree
    pub fn depth(&self) -> usize {
        self.conclusion.depth()
    }

    /// If every hypothesis mentions exactly one variable and the hypotheses cover all mandatory
    /// variables, returns the variable of each hypothesis.
    ///
    /// With a `param` variable, every hypothesis has to mention `param` and exactly one other
    /// variable, and the mandatory variables are `param` plus one per hypothesis.
    pub fn hyp_to_var_map(&self, param: Option<Identifier>) -> Option<Vec<Identifier>> {
        let extra = if param.is_some() { 1 } else { 0 };
        if self.hypotheses.len() + extra != self.mandatory_variables.len() {
            return None;
        }
        self.hypotheses
            .iter()
            .map(|hyp| {
                let vars = hyp.variables();
                match (param, vars.as_slice()) {
                    (None, [v]) => Some(*v),
                    (Some(p), [a, b]) if *a == p => Some(*b),
                    (Some(p), [a, b]) if *b == p => Some(*a),
                    _ => None,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mandatory_variables_are_sorted() {
        let a = ParseNode::var(3);
        let b = ParseNode::var(1);
        let assertion = Assertion::new(
            "x".to_owned(),
            AssertionKind::Axiom,
            vec![ParseNode::binary(-1, a.clone(), ParseNode::var(5))],
            ParseNode::binary(-1, a, b),
        );
        assert_eq!(assertion.mandatory_variables(), &[1, 3, 5]);
        assert_eq!(assertion.depth(), 2);
    }

    #[test]
    fn hyp_to_var_map() {
        let el = |v| ParseNode::binary(-1, ParseNode::var(v), ParseNode::new(-2, vec![]));
        let closure = Assertion::new(
            "cl".to_owned(),
            AssertionKind::Theorem,
            vec![el(1), el(0)],
            el(2),
        );
        // the conclusion's variable is not covered by a hypothesis
        assert_eq!(closure.hyp_to_var_map(None), None);

        let closure = Assertion::new(
            "cl".to_owned(),
            AssertionKind::Theorem,
            vec![el(1), el(0)],
            ParseNode::binary(-1, ParseNode::binary(-3, ParseNode::var(0), ParseNode::var(1)), ParseNode::new(-2, vec![])),
        );
        assert_eq!(closure.hyp_to_var_map(None), Some(vec![1, 0]));

        let imp = |p, v| ParseNode::binary(-4, ParseNode::var(p), ParseNode::var(v));
        let gathering = Assertion::new(
            "jca".to_owned(),
            AssertionKind::Theorem,
            vec![imp(0, 1), imp(0, 2)],
            imp(0, 3),
        );
        assert_eq!(gathering.hyp_to_var_map(Some(0)), None);
        let gathering = Assertion::new(
            "jca".to_owned(),
            AssertionKind::Theorem,
            vec![imp(0, 1), imp(0, 2)],
            imp(0, 2),
        );
        assert_eq!(gathering.hyp_to_var_map(Some(0)), Some(vec![1, 2]));
    }
}

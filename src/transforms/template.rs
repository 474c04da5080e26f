use crate::{node::ParseNode, types::Identifier};

/// A property like `_ e. CC`: an expression with a single placeholder.
///
/// The empty template stands for "no side condition", substituting into it returns the argument
/// unchanged.
///
/// # Example
/// ```
/// use attomath_transforms::ParseNode;
/// use attomath_transforms::transforms::PropertyTemplate;
///
/// let cc = ParseNode::new(-3, vec![]);
/// // A e. CC
/// let hyp = ParseNode::binary(-1, ParseNode::var(0), cc.clone());
/// let template = PropertyTemplate::from_hypothesis(&hyp, 0).unwrap();
///
/// let sum = ParseNode::binary(-2, ParseNode::var(1), ParseNode::var(2));
/// let property = template.subst(&sum);
/// assert_eq!(property, ParseNode::binary(-1, sum.clone(), cc));
/// assert_eq!(template.extract(&property), Some(sum));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PropertyTemplate(Option<ParseNode>);

impl PropertyTemplate {
    pub fn empty() -> Self {
        PropertyTemplate(None)
    }

    /// Creates a template from an expression which contains the placeholder exactly once
    pub fn new(node: ParseNode) -> Self {
        debug_assert_eq!(
            node.replace_all(&ParseNode::placeholder(), &ParseNode::placeholder())
                .1,
            1
        );
        PropertyTemplate(Some(node))
    }

    /// Turns `hyp` into a template by replacing the variable `var` with the placeholder.
    ///
    /// Fails if `hyp` is the bare variable or mentions `var` more than once.
    pub fn from_hypothesis(hyp: &ParseNode, var: Identifier) -> Option<Self> {
        let var = ParseNode::var(var);
        if *hyp == var {
            return None;
        }
        match hyp.replace_all(&var, &ParseNode::placeholder()) {
            (template, 1) => Some(PropertyTemplate(Some(template))),
            _ => None,
        }
    }

    /// Finds the template shared by all `hyps`, each of which has to apply it to a distinct
    /// variable. Returns the template and the variable of every hypothesis.
    pub fn from_hypotheses(hyps: &[ParseNode]) -> Option<(Self, Vec<Identifier>)> {
        let first = hyps.first()?;
        let template = Self::from_hypothesis(first, first.single_variable()?)?;
        let vars = hyps
            .iter()
            .map(|hyp| template.extract(hyp).filter(ParseNode::is_var).map(|v| v.stmt()))
            .collect::<Option<Vec<_>>>()?;
        let mut distinct = vars.clone();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() != vars.len() {
            return None;
        }
        Some((template, vars))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn node(&self) -> Option<&ParseNode> {
        self.0.as_ref()
    }

    pub fn subst(&self, x: &ParseNode) -> ParseNode {
        match &self.0 {
            Some(template) => template.replace_all(&ParseNode::placeholder(), x).0,
            None => x.clone(),
        }
    }

    /// Recovers the expression at the placeholder, if `input` agrees with the template everywhere
    /// else
    pub fn extract(&self, input: &ParseNode) -> Option<ParseNode> {
        fn rec(template: &ParseNode, input: &ParseNode, res: &mut Option<ParseNode>) -> bool {
            if template.is_placeholder() {
                if res.is_some() {
                    return false;
                }
                *res = Some(input.clone());
                return true;
            }
            template.stmt() == input.stmt()
                && template.children().len() == input.children().len()
                && template
                    .children()
                    .iter()
                    .zip(input.children().iter())
                    .all(|(t, i)| rec(t, i, res))
        }

        let template = match &self.0 {
            Some(template) => template,
            None => return Some(input.clone()),
        };
        let mut res = None;
        if rec(template, input, &mut res) {
            res
        } else {
            None
        }
    }
}

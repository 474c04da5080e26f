use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::char,
    combinator::{eof, map_opt},
    error::context,
    multi::{count, separated_list1},
    sequence::preceded,
    IResult,
};

use super::error::GreedyError;
use crate::{
    node::ParseNode,
    syntax::{Symbol, Syntax},
};

/// Prints and parses expressions of a [`Syntax`].
///
/// Operators of arity 0 are written bare, binary operators infix `(a op b)` and all other
/// operators prefix `(op a b ...)`. Provable statements are written `|- expr`.
///
/// ```
/// use attomath_transforms::Syntax;
/// use attomath_transforms::serialization::Formatter;
///
/// let mut syntax = Syntax::new();
/// let wff = syntax.add_typecode("wff".to_owned()).unwrap();
/// syntax.add_variable(wff, "ph".to_owned()).unwrap();
/// syntax.add_variable(wff, "ps".to_owned()).unwrap();
/// syntax.add_operator(wff, "->".to_owned(), 2).unwrap();
/// syntax.add_operator(wff, "-.".to_owned(), 1).unwrap();
///
/// let fmt = Formatter::new(&syntax);
/// let s = "|- ph, |- (ph -> ps) => |- (-. (-. ps))";
/// let (remaining, (hyps, conclusion)) = fmt.parse_assertion(s).unwrap();
/// assert_eq!(remaining, "");
/// assert_eq!(hyps.len(), 2);
///
/// let mut s1 = String::new();
/// fmt.format_assertion(&mut s1, &hyps, &conclusion);
/// assert_eq!(s1, s);
/// ```
pub struct Formatter<'a> {
    syntax: &'a Syntax,
}

impl<'a> Formatter<'a> {
    pub fn new(syntax: &'a Syntax) -> Self {
        Formatter { syntax }
    }

    pub fn syntax(&self) -> &'a Syntax {
        self.syntax
    }

    pub fn format_expression(&self, s: &mut String, node: &ParseNode) {
        if node.is_placeholder() {
            s.push('_');
            return;
        }
        if node.is_var() {
            match self.syntax.variable(node.stmt()) {
                Some(v) => s.push_str(&v.name),
                None => s.push_str(&format!("?{}", node.stmt())),
            }
            return;
        }
        let symbol = match self.syntax.operator(node.stmt()) {
            Some(o) => o.symbol.as_str(),
            None => "?",
        };
        match node.children() {
            [] => s.push_str(symbol),
            [left, right] => {
                s.push('(');
                self.format_expression(s, left);
                s.push(' ');
                s.push_str(symbol);
                s.push(' ');
                self.format_expression(s, right);
                s.push(')');
            }
            children => {
                s.push('(');
                s.push_str(symbol);
                for child in children {
                    s.push(' ');
                    self.format_expression(s, child);
                }
                s.push(')');
            }
        }
    }

    /// Formats an expression into a new string
    pub fn expression_string(&self, node: &ParseNode) -> String {
        let mut s = String::new();
        self.format_expression(&mut s, node);
        s
    }

    fn parse_leaf<'b>(&self, input: &'b str) -> IResult<&'b str, ParseNode, GreedyError<&'b str>> {
        map_opt(is_not(" (),"), |name: &str| match self.syntax.lookup(name)? {
            Symbol::Variable(id) => Some(ParseNode::var(id)),
            Symbol::Operator(id) if self.syntax.operator(id)?.arity == 0 => {
                Some(ParseNode::new(id, Vec::new()))
            }
            _ => None,
        })(input)
    }

    fn parse_operator_symbol<'b>(
        &self,
        prefix: bool,
        input: &'b str,
    ) -> IResult<&'b str, (crate::Identifier, u8), GreedyError<&'b str>> {
        map_opt(is_not(" (),"), |name: &str| match self.syntax.lookup(name)? {
            Symbol::Operator(id) => {
                let arity = self.syntax.operator(id)?.arity;
                if (arity == 2) != prefix && arity != 0 {
                    Some((id, arity))
                } else {
                    None
                }
            }
            _ => None,
        })(input)
    }

    fn parse_prefix<'b>(&self, input: &'b str) -> IResult<&'b str, ParseNode, GreedyError<&'b str>> {
        let (input, _) = char('(')(input)?;
        let (input, (id, arity)) = self.parse_operator_symbol(true, input)?;
        let (input, children) = count(
            preceded(char(' '), |input| self.parse_expression(input)),
            arity as usize,
        )(input)?;
        let (input, _) = char(')')(input)?;
        Ok((input, ParseNode::new(id, children)))
    }

    fn parse_infix<'b>(&self, input: &'b str) -> IResult<&'b str, ParseNode, GreedyError<&'b str>> {
        let (input, _) = char('(')(input)?;
        let (input, left) = self.parse_expression(input)?;
        let (input, _) = char(' ')(input)?;
        let (input, (id, _)) = self.parse_operator_symbol(false, input)?;
        let (input, _) = char(' ')(input)?;
        let (input, right) = self.parse_expression(input)?;
        let (input, _) = char(')')(input)?;
        Ok((input, ParseNode::binary(id, left, right)))
    }

    pub fn parse_expression<'b>(
        &self,
        input: &'b str,
    ) -> IResult<&'b str, ParseNode, GreedyError<&'b str>> {
        alt((
            |input| self.parse_leaf(input),
            |input| self.parse_prefix(input),
            |input| self.parse_infix(input),
        ))(input)
    }

    pub fn format_statement(&self, s: &mut String, node: &ParseNode) {
        s.push_str("|- ");
        self.format_expression(s, node);
    }

    pub fn parse_statement<'b>(
        &self,
        input: &'b str,
    ) -> IResult<&'b str, ParseNode, GreedyError<&'b str>> {
        let (input, _) = tag("|- ")(input)?;
        self.parse_expression(input)
    }

    pub fn format_assertion(&self, s: &mut String, hyps: &[ParseNode], conclusion: &ParseNode) {
        for (i, hyp) in hyps.iter().enumerate() {
            self.format_statement(s, hyp);
            if i != hyps.len() - 1 {
                s.push_str(", ");
            }
        }
        if !hyps.is_empty() {
            s.push_str(" => ");
        }
        self.format_statement(s, conclusion);
    }

    pub fn parse_assertion<'b>(
        &self,
        input: &'b str,
    ) -> IResult<&'b str, (Vec<ParseNode>, ParseNode), GreedyError<&'b str>> {
        alt((
            |input| {
                let (input, hyps) = context(
                    "hypotheses",
                    separated_list1(tag(", "), |input| self.parse_statement(input)),
                )(input)?;
                let (input, _) = tag(" => ")(input)?;
                let (input, conclusion) =
                    context("conclusion", |input| self.parse_statement(input))(input)?;
                let (input, _) = eof(input)?;
                Ok((input, (hyps, conclusion)))
            },
            |input| {
                let (input, conclusion) =
                    context("conclusion", |input| self.parse_statement(input))(input)?;
                let (input, _) = eof(input)?;
                Ok((input, (Vec::new(), conclusion)))
            },
        ))(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Identifier;
    use quickcheck::{Arbitrary, Gen};

    fn syntax() -> Syntax {
        let mut syntax = Syntax::new();
        let wff = syntax.add_typecode("wff".to_owned()).unwrap();
        let class = syntax.add_typecode("class".to_owned()).unwrap();
        for name in ["A", "B", "C", "D"] {
            syntax.add_variable(class, name.to_owned()).unwrap();
        }
        syntax.add_operator(class, "+".to_owned(), 2).unwrap();
        syntax.add_operator(class, "ov".to_owned(), 3).unwrap();
        syntax.add_operator(class, "1".to_owned(), 0).unwrap();
        syntax.add_operator(wff, "=".to_owned(), 2).unwrap();
        syntax.add_variable(wff, "ph".to_owned()).unwrap();
        syntax.add_variable(wff, "ps".to_owned()).unwrap();
        syntax.add_operator(wff, "->".to_owned(), 2).unwrap();
        syntax
    }

    /// A class expression over the syntax above
    #[derive(Clone, Debug)]
    struct ClassExpr(ParseNode);

    impl Arbitrary for ClassExpr {
        fn arbitrary(g: &mut Gen) -> Self {
            fn gen(g: &mut Gen, depth: usize) -> ParseNode {
                let choice = u8::arbitrary(g) % if depth == 0 { 2 } else { 4 };
                match choice {
                    0 => ParseNode::var((u8::arbitrary(g) % 4) as Identifier),
                    1 => ParseNode::new(-3, vec![]),
                    2 => ParseNode::binary(-1, gen(g, depth - 1), gen(g, depth - 1)),
                    _ => ParseNode::new(
                        -2,
                        vec![gen(g, depth - 1), gen(g, depth - 1), gen(g, depth - 1)],
                    ),
                }
            }
            ClassExpr(gen(g, 3))
        }
    }

    quickcheck! {
        fn format_then_parse(expr: ClassExpr) -> bool {
            let syntax = syntax();
            let fmt = Formatter::new(&syntax);
            let s = fmt.expression_string(&expr.0);
            match fmt.parse_expression(&s) {
                Ok((rest, node)) => rest.is_empty() && node == expr.0,
                Err(_) => false,
            }
        }
    }

    #[test]
    fn prefix_and_infix() {
        let syntax = syntax();
        let fmt = Formatter::new(&syntax);
        let (rest, node) = fmt.parse_statement("|- ((ov A 1 B) + C) = A").unwrap();
        assert_eq!(rest, " = A");
        let sum = ParseNode::binary(
            -1,
            ParseNode::new(
                -2,
                vec![ParseNode::var(0), ParseNode::new(-3, vec![]), ParseNode::var(1)],
            ),
            ParseNode::var(2),
        );
        assert_eq!(node, sum);
        assert!(fmt.parse_expression("(A ov B)").is_err());
        assert!(fmt.parse_expression("(+ A B)").is_err());
        assert_eq!(
            fmt.expression_string(&ParseNode::binary(-4, ParseNode::placeholder(), sum)),
            "(_ = ((ov A 1 B) + C))"
        );
    }

    #[test]
    fn bare_hypotheses() {
        let syntax = syntax();
        let fmt = Formatter::new(&syntax);
        let (ph, ps) = (ParseNode::var(4), ParseNode::var(5));
        let (rest, (hyps, conclusion)) = fmt
            .parse_assertion("|- ph, |- (ph -> ps) => |- ps")
            .unwrap();
        assert_eq!(rest, "");
        assert_eq!(hyps, vec![ph.clone(), ParseNode::binary(-5, ph, ps.clone())]);
        assert_eq!(conclusion, ps);

        let (_, (hyps, _)) = fmt.parse_assertion("|- 1, |- A => |- (1 + A)").unwrap();
        assert_eq!(hyps, vec![ParseNode::new(-3, vec![]), ParseNode::var(0)]);
    }
}

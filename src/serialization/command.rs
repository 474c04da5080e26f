use std::fmt::Write;

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_until},
    character::complete::{char, digit1},
    combinator::{all_consuming, map, map_opt, map_parser, rest},
    error::context,
    multi::separated_list1,
    IResult,
};

use super::{
    error::{or_fail, GreedyError},
    Formatter,
};
use crate::{
    assertion::AssertionKind, database::Database, error::DatabaseError, node::ParseNode,
    worksheet::Worksheet,
};

/// One line of a library or worksheet file
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Command {
    /// `jdg <typecode>`
    Typecode(String),
    /// `var <typecode> <name>...`
    Variables(String, Vec<String>),
    /// `opr <typecode> <symbol> <arity>`
    Operator(String, String, u8),
    /// `axm { <assertion> }: <label>` or `thm { <assertion> }: <label>`
    Assertion(AssertionKind, Vec<ParseNode>, ParseNode, String),
    /// `hyp <statement>`
    Hypothesis(ParseNode),
    /// `goal <statement>`
    Goal(ParseNode),
}

impl Command {
    /// Whether this command belongs in a library file rather than a worksheet
    pub fn is_library_command(&self) -> bool {
        !matches!(self, Command::Hypothesis(_) | Command::Goal(_))
    }

    /// Applies a library command
    ///
    /// # Panics
    /// This method panics on worksheet commands, see
    /// [`is_library_command`](#method.is_library_command)
    pub fn apply(self, database: &mut Database) -> Result<(), DatabaseError> {
        match self {
            Command::Typecode(name) => {
                database.syntax_mut().add_typecode(name)?;
            }
            Command::Variables(typecode, names) => {
                let typecode = database.syntax().typecode(&typecode)?;
                for name in names {
                    database.syntax_mut().add_variable(typecode, name)?;
                }
            }
            Command::Operator(typecode, symbol, arity) => {
                let typecode = database.syntax().typecode(&typecode)?;
                database
                    .syntax_mut()
                    .add_operator(typecode, symbol, arity)?;
            }
            Command::Assertion(kind, hyps, conclusion, label) => {
                database.add_assertion(label, kind, hyps, conclusion)?;
            }
            Command::Hypothesis(_) | Command::Goal(_) => {
                panic!("worksheet command applied to a library")
            }
        }
        Ok(())
    }

    /// Applies a worksheet command
    ///
    /// # Panics
    /// This method panics on library commands
    pub fn apply_worksheet(
        self,
        database: &Database,
        worksheet: &mut Worksheet,
    ) -> Result<(), DatabaseError> {
        match self {
            Command::Hypothesis(formula) => {
                database.check_statement(&formula)?;
                worksheet.add_hypothesis(formula);
            }
            Command::Goal(formula) => {
                database.check_statement(&formula)?;
                worksheet.add_goal(formula);
            }
            _ => panic!("library command applied to a worksheet"),
        }
        Ok(())
    }

    pub fn parse<'a>(
        fmt: &Formatter,
        input: &'a str,
    ) -> Result<Self, nom::Err<GreedyError<&'a str>>> {
        let (_, command) = or_fail(all_consuming(alt((
            context(
                "assertion",
                alt((
                    context("axm", |input| {
                        Self::parse_assertion(fmt, "axm", AssertionKind::Axiom, input)
                    }),
                    context("thm", |input| {
                        Self::parse_assertion(fmt, "thm", AssertionKind::Theorem, input)
                    }),
                )),
            ),
            context("hyp", |input| Self::parse_step(fmt, "hyp", input)),
            context("goal", |input| Self::parse_step(fmt, "goal", input)),
            context("jdg", |input| Self::parse_typecode(input)),
            context("var", |input| Self::parse_variables(input)),
            context("opr", |input| Self::parse_operator(input)),
        ))))(input)?;
        Ok(command)
    }

    fn parse_assertion<'a>(
        fmt: &Formatter,
        keyword: &'static str,
        kind: AssertionKind,
        input: &'a str,
    ) -> IResult<&'a str, Command, GreedyError<&'a str>> {
        let (input, _) = tag(keyword)(input)?;
        let (input, _) = tag(" { ")(input)?;
        or_fail(move |input| {
            let (input, (hyps, conclusion)) =
                map_parser(take_until(" }"), |input| fmt.parse_assertion(input))(input)?;
            let (input, _) = tag(" }: ")(input)?;
            let (input, label) = rest(input)?;
            Ok((
                input,
                Command::Assertion(kind, hyps, conclusion, label.to_owned()),
            ))
        })(input)
    }

    fn parse_step<'a>(
        fmt: &Formatter,
        keyword: &'static str,
        input: &'a str,
    ) -> IResult<&'a str, Command, GreedyError<&'a str>> {
        let (input, _) = tag(keyword)(input)?;
        let (input, _) = char(' ')(input)?;
        let (input, formula) = or_fail(|input| fmt.parse_statement(input))(input)?;
        let command = if keyword == "hyp" {
            Command::Hypothesis(formula)
        } else {
            Command::Goal(formula)
        };
        Ok((input, command))
    }

    fn parse_typecode(input: &str) -> IResult<&str, Command, GreedyError<&str>> {
        let (input, _) = tag("jdg ")(input)?;
        let (input, typecode) = is_not(" ")(input)?;
        Ok((input, Command::Typecode(typecode.to_owned())))
    }

    fn parse_variables(input: &str) -> IResult<&str, Command, GreedyError<&str>> {
        let (input, _) = tag("var ")(input)?;
        let (input, typecode) = is_not(" ")(input)?;
        let (input, _) = char(' ')(input)?;
        let (input, names) = separated_list1(
            char(' '),
            map(is_not(" "), |name: &str| name.to_owned()),
        )(input)?;
        Ok((input, Command::Variables(typecode.to_owned(), names)))
    }

    fn parse_operator(input: &str) -> IResult<&str, Command, GreedyError<&str>> {
        let (input, _) = tag("opr ")(input)?;
        let (input, typecode) = is_not(" ")(input)?;
        let (input, _) = char(' ')(input)?;
        let (input, symbol) = is_not(" ")(input)?;
        let (input, _) = char(' ')(input)?;
        let (input, arity) = map_opt(digit1, |s: &str| s.parse::<u8>().ok())(input)?;
        Ok((
            input,
            Command::Operator(typecode.to_owned(), symbol.to_owned(), arity),
        ))
    }

    pub fn serialize(&self, s: &mut String, fmt: &Formatter) {
        match self {
            Command::Typecode(typecode) => {
                write!(s, "jdg {}", typecode).unwrap();
            }
            Command::Variables(typecode, names) => {
                write!(s, "var {} {}", typecode, names.join(" ")).unwrap();
            }
            Command::Operator(typecode, symbol, arity) => {
                write!(s, "opr {} {} {}", typecode, symbol, arity).unwrap();
            }
            Command::Assertion(kind, hyps, conclusion, label) => {
                s.push_str(match kind {
                    AssertionKind::Axiom => "axm { ",
                    AssertionKind::Theorem => "thm { ",
                });
                fmt.format_assertion(s, hyps, conclusion);
                write!(s, " }}: {}", label).unwrap();
            }
            Command::Hypothesis(formula) => {
                s.push_str("hyp ");
                fmt.format_statement(s, formula);
            }
            Command::Goal(formula) => {
                s.push_str("goal ");
                fmt.format_statement(s, formula);
            }
        }
    }

    /// The commands that rebuild `database`, one variable declaration per variable
    pub fn from_database<'a>(database: &'a Database) -> impl 'a + Iterator<Item = Self> {
        let syntax = database.syntax();
        syntax
            .typecodes()
            .map(|t| Command::Typecode(t.to_owned()))
            .chain(syntax.variables().map(move |(_, v)| {
                Command::Variables(
                    syntax.typecode_name(v.typecode).to_owned(),
                    vec![v.name.clone()],
                )
            }))
            .chain(syntax.operators().map(move |(_, o)| {
                Command::Operator(
                    syntax.typecode_name(o.typecode).to_owned(),
                    o.symbol.clone(),
                    o.arity,
                )
            }))
            .chain(database.assertions().map(|(_, a)| {
                Command::Assertion(
                    a.kind(),
                    a.hypotheses().to_vec(),
                    a.conclusion().clone(),
                    a.label().to_owned(),
                )
            }))
    }
}

//! Text formats for libraries and worksheets.
//!
//! Both are line based, every non-empty line is one [`Command`]. A library declares typecodes,
//! variables and operators before the assertions using them:
//!
//! ```text
//! jdg wff
//! var wff ph ps
//! opr wff -> 2
//! axm { |- ph, |- (ph -> ps) => |- ps }: ax-mp
//! ```
//!
//! A worksheet lists hypotheses and goals over the syntax of a library:
//!
//! ```text
//! hyp |- ph
//! goal |- (ph -> ph)
//! ```
mod command;
pub mod error;
mod formatter;

pub use command::*;
pub use formatter::*;

use std::fmt::Write;

use thiserror::Error;

use crate::{
    database::Database,
    error::DatabaseError,
    worksheet::{Justification, Worksheet},
    StepId,
};

/// Error produced while loading a library or worksheet file. Lines are counted from 1.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("line {line}: cannot parse `{text}`\n{message}")]
    Parse {
        line: usize,
        text: String,
        message: String,
    },
    #[error("line {line}: {source}")]
    Database {
        line: usize,
        #[source]
        source: DatabaseError,
    },
    #[error("line {line}: `{text}` is not allowed in this file")]
    Misplaced { line: usize, text: String },
}

fn non_empty_lines(input: &str) -> impl Iterator<Item = (usize, &str)> {
    input
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end()))
        .filter(|(_, line)| !line.is_empty())
}

fn parse_command(database: &Database, line: usize, text: &str) -> Result<Command, LoadError> {
    let fmt = Formatter::new(database.syntax());
    Command::parse(&fmt, text).map_err(|e| LoadError::Parse {
        line,
        text: text.to_owned(),
        message: error::describe(&e),
    })
}

/// Builds a [`Database`] from the commands of a library file
pub fn load_library(input: &str) -> Result<Database, LoadError> {
    let mut database = Database::new();
    for (line, text) in non_empty_lines(input) {
        let command = parse_command(&database, line, text)?;
        if !command.is_library_command() {
            return Err(LoadError::Misplaced {
                line,
                text: text.to_owned(),
            });
        }
        command
            .apply(&mut database)
            .map_err(|source| LoadError::Database { line, source })?;
    }
    Ok(database)
}

/// Builds a [`Worksheet`] from the `hyp` and `goal` lines of a worksheet file
pub fn load_worksheet(database: &Database, input: &str) -> Result<Worksheet, LoadError> {
    let mut worksheet = Worksheet::new();
    for (line, text) in non_empty_lines(input) {
        let command = parse_command(database, line, text)?;
        if command.is_library_command() {
            return Err(LoadError::Misplaced {
                line,
                text: text.to_owned(),
            });
        }
        command
            .apply_worksheet(database, &mut worksheet)
            .map_err(|source| LoadError::Database { line, source })?;
    }
    Ok(worksheet)
}

/// Formats one proof step as `<n> <statement> by <label> [<hyps>]`, numbering steps by their
/// position in the worksheet
pub fn format_step(s: &mut String, database: &Database, worksheet: &Worksheet, id: StepId) {
    let fmt = Formatter::new(database.syntax());
    let step = worksheet.step(id);
    write!(s, "{} ", worksheet.position(id) + 1).unwrap();
    fmt.format_statement(s, step.formula());
    match step.justification() {
        Justification::Hypothesis => s.push_str(" by hyp"),
        Justification::Pending => s.push_str(" by ?"),
        Justification::Assertion(a) => {
            write!(s, " by {}", database.get(a).label()).unwrap();
            if !step.hyps().is_empty() {
                let hyps: Vec<_> = step
                    .hyps()
                    .iter()
                    .map(|h| (worksheet.position(*h) + 1).to_string())
                    .collect();
                write!(s, " [{}]", hyps.join(", ")).unwrap();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ParseNode;

    const LIBRARY: &str = "jdg wff\nvar wff ph ps\nopr wff -> 2\n\naxm { |- ph, |- (ph -> ps) => |- ps }: ax-mp\n";

    #[test]
    fn load_and_format() {
        let database = load_library(LIBRARY).unwrap();
        let mut worksheet =
            load_worksheet(&database, "hyp |- ph\nhyp |- (ph -> ps)\ngoal |- ps\n").unwrap();
        worksheet.justify(2, vec![0, 1], 0);
        assert_eq!(worksheet.verify_all(&database), Ok(()));
        let mut s = String::new();
        format_step(&mut s, &database, &worksheet, 2);
        assert_eq!(s, "3 |- ps by ax-mp [1, 2]");

        let pending = worksheet.add_goal(ParseNode::var(1));
        let inserted = worksheet.insert_before(
            pending,
            ParseNode::var(0),
            Vec::new(),
            Justification::Hypothesis,
        );
        worksheet.justify(pending, vec![inserted, 1], 0);
        s.clear();
        format_step(&mut s, &database, &worksheet, inserted);
        assert_eq!(s, "4 |- ph by hyp");
        s.clear();
        format_step(&mut s, &database, &worksheet, pending);
        assert_eq!(s, "5 |- ps by ax-mp [4, 2]");
    }

    #[test]
    fn errors_carry_lines() {
        match load_library("jdg wff\nvar wff ph\nvar wff ph") {
            Err(LoadError::Database {
                line: 3,
                source: DatabaseError::NameCollision(name),
            }) => assert_eq!(name, "ph"),
            e => panic!("unexpected {:?}", e),
        }
        match load_library("jdg wff\nopr wff -> x") {
            Err(LoadError::Parse { line: 2, .. }) => (),
            e => panic!("unexpected {:?}", e),
        }
        let database = load_library(LIBRARY).unwrap();
        match load_worksheet(&database, "hyp |- ph\njdg class") {
            Err(LoadError::Misplaced { line: 2, .. }) => (),
            e => panic!("unexpected {:?}", e),
        }
    }
}

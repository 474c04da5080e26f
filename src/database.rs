use std::collections::HashMap;

use crate::{
    assertion::{Assertion, AssertionKind},
    error::DatabaseError,
    node::ParseNode,
    syntax::Syntax,
    types::*,
};

/// Typecode of provable statements
pub const LOGIC_TYPECODE: Typecode = 0;

/// An ordered library of assertions over a [`Syntax`].
///
/// Assertions are only ever appended, the order in which they were added is the order in
/// which rules are mined from them.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Database {
    syntax: Syntax,
    assertions: Vec<Assertion>,
    labels: HashMap<String, AssertionId>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_syntax(syntax: Syntax) -> Self {
        Database {
            syntax,
            ..Self::default()
        }
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    pub fn syntax_mut(&mut self) -> &mut Syntax {
        &mut self.syntax
    }

    /// Checks that `node` is a well formed expression of the logical typecode
    pub fn check_statement(&self, node: &ParseNode) -> Result<(), DatabaseError> {
        self.syntax.check(node)?;
        match self.syntax.typecode_of(node) {
            Some(LOGIC_TYPECODE) => Ok(()),
            Some(t) => Err(DatabaseError::StatementTypecode(LOGIC_TYPECODE, t)),
            None => Err(DatabaseError::UnknownSymbol(node.stmt())),
        }
    }

    /// Adds an assertion and returns its id.
    ///
    /// # Errors
    /// * NameCollision - if the label is already used
    /// * UnknownSymbol, ArityMismatch - if a statement is not well formed
    /// * StatementTypecode - if a statement is not of the logical typecode
    pub fn add_assertion(
        &mut self,
        label: String,
        kind: AssertionKind,
        hypotheses: Vec<ParseNode>,
        conclusion: ParseNode,
    ) -> Result<AssertionId, DatabaseError> {
        if self.labels.contains_key(&label) {
            return Err(DatabaseError::NameCollision(label));
        }
        for statement in hypotheses.iter().chain(std::iter::once(&conclusion)) {
            self.check_statement(statement)?;
        }
        let id = self.assertions.len();
        self.labels.insert(label.clone(), id);
        self.assertions
            .push(Assertion::new(label, kind, hypotheses, conclusion));
        Ok(id)
    }

    pub fn get(&self, id: AssertionId) -> &Assertion {
        &self.assertions[id]
    }

    pub fn find(&self, label: &str) -> Result<AssertionId, DatabaseError> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| DatabaseError::AssertionNotFound(label.to_owned()))
    }

    pub fn assertions(&self) -> impl Iterator<Item = (AssertionId, &Assertion)> {
        self.assertions.iter().enumerate()
    }

    pub fn len(&self) -> usize {
        self.assertions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assertions.is_empty()
    }
}

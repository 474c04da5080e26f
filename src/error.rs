use thiserror::Error;

use crate::types::*;

/// A error which is produced when a formula does not match an assertion
#[derive(Debug, PartialEq, Eq, Error)]
pub enum ProofError {
    #[error("operator mismatch: expected {0}, found {1}")]
    OperatorMismatch(Identifier, Identifier),
    #[error("variable {0} is bound to two different expressions")]
    VariableMismatch(Identifier),
    #[error("variable {0} of typecode {1} cannot hold an expression of typecode {2}")]
    TypecodeMismatch(Identifier, Typecode, Typecode),
    #[error("assertion expects {0} hypotheses, step has {1}")]
    ParameterError(usize, usize),
    #[error("step {0} is not justified by an assertion")]
    Unjustified(StepId),
    #[error("step {0} is used before it is proven")]
    ForwardReference(StepId),
}

/// A error which is produced when building a [`Database`][crate::Database]
#[derive(Debug, PartialEq, Eq, Error)]
pub enum DatabaseError {
    #[error("name `{0}` is already in use")]
    NameCollision(String),
    #[error("assertion `{0}` not found")]
    AssertionNotFound(String),
    #[error("unknown typecode `{0}`")]
    UnknownTypecode(String),
    #[error("unknown symbol {0}")]
    UnknownSymbol(Identifier),
    #[error("operator {0} expects {1} arguments, found {2}")]
    ArityMismatch(Identifier, u8, usize),
    #[error("statement of typecode {1} where {0} was expected")]
    StatementTypecode(Typecode, Typecode),
    #[error(transparent)]
    Proof(#[from] ProofError),
}

/// A error which is produced when a transformation needs a rule the library does not provide
#[derive(Debug, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("no {0} rule for operator {1}")]
    MissingRule(&'static str, Identifier),
    #[error("no equality operator for typecode {0}")]
    NoEquality(Typecode),
    #[error("expression with unknown typecode rooted at {0}")]
    UnknownTypecode(Identifier),
    #[error("no closure derivation for an operand rooted at {0}")]
    NoClosure(Identifier),
    #[error("expression rooted at {0} has no transformation to the target")]
    Unreachable(Identifier),
    #[error("step depends on an implication prefix but none is set")]
    NoPrefix,
}

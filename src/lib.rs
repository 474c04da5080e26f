//! `attomath-transforms` proves steps of a Metamath-style proof automatically when they only
//! differ from an earlier step by rewriting with equalities.
//!
//! # Main data structures
//! A library is a [`Database`]: a [`Syntax`] declaring typecodes, operators and variables, and a
//! list of axioms and theorems. Formulas are [`ParseNode`]s, trees of operators with variables at
//! the leaves. A proof session is a [`Worksheet`], an ordered list of hypotheses, justified steps
//! and pending goals.
//!
//! ## Rules
//! Nothing about the logic is built in. The [`transforms::Engine`] reads the database once and
//! recognizes the rules it needs by their shape: `A = B => B = A` makes `=` an equivalence,
//! `((A + B) + C) = (A + (B + C))` makes `+` associative, `A = B => (A + C) = (B + C)` allows
//! replacing the first operand of `+` and so on. Rules may carry side conditions like `A e. CC`,
//! which the engine derives from closure laws.
//!
//! ## Transformations
//! Two formulas which are equal up to associativity, commutativity and replacement of equal
//! operands have the same canonical form. For a pending goal the engine looks for an earlier step
//! with the goal's canonical form, proves both equivalent and justifies the goal. New steps are
//! inserted right before the goal and can be checked with [`Worksheet::verify_step`].
//!
//! Goals of the form `ph -> ...` are worked on under the antecedent `ph`, so hypotheses like
//! `ph -> A e. CC` can discharge side conditions.

#[cfg(feature = "serialization")]
extern crate nom;
#[cfg(test)]
#[macro_use]
extern crate quickcheck;

pub mod assertion;
pub mod database;
pub mod error;
pub mod node;
#[cfg(feature = "serialization")]
pub mod serialization;
pub mod syntax;
pub mod transforms;
mod types;
pub mod worksheet;

pub use database::Database;
pub use node::ParseNode;
pub use syntax::Syntax;
pub use types::*;
pub use worksheet::Worksheet;

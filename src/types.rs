/// Type alias for a typecode like `wff` or `class` (see [`Syntax`][crate::Syntax])
pub type Typecode = u8;

/// Type alias for an identifier representing a variable or operator (see
/// [`ParseNode`][crate::ParseNode])
pub type Identifier = i16;

/// Index of an assertion inside a [`Database`][crate::Database]
pub type AssertionId = usize;

/// Index of a proof step inside a [`Worksheet`][crate::Worksheet]
pub type StepId = usize;

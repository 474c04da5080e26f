use std::collections::HashMap;

use crate::{error::DatabaseError, node::ParseNode, types::*};

/// A syntax axiom, e.g. `wff -> 2` for implication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub symbol: String,
    pub typecode: Typecode,
    pub arity: u8,
}

/// A variable declaration, e.g. `class A`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub typecode: Typecode,
}

/// Anything a name can refer to inside a [`Syntax`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Typecode(Typecode),
    Operator(Identifier),
    Variable(Identifier),
}

/// The grammar of a library: its typecodes, operators and variables.
///
/// The first declared typecode is the logical one, every provable statement has to be an
/// expression of that typecode. Operator `i` (counting from 0) has identifier `-i - 1` and
/// variable `i` has identifier `i`, so variables are ordered by declaration.
///
/// # Example
/// ```
/// use attomath_transforms::Syntax;
///
/// let mut syntax = Syntax::new();
/// let wff = syntax.add_typecode("wff".to_owned()).unwrap();
/// let ph = syntax.add_variable(wff, "ph".to_owned()).unwrap();
/// let imp = syntax.add_operator(wff, "->".to_owned(), 2).unwrap();
/// assert_eq!(ph, 0);
/// assert_eq!(imp, -1);
/// assert!(syntax.add_variable(wff, "->".to_owned()).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Syntax {
    typecodes: Vec<String>,
    operators: Vec<Operator>,
    variables: Vec<Variable>,
    names: HashMap<String, Symbol>,
}

impl Syntax {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim_name(&mut self, name: &str, symbol: Symbol) -> Result<(), DatabaseError> {
        if self.names.contains_key(name) {
            return Err(DatabaseError::NameCollision(name.to_owned()));
        }
        self.names.insert(name.to_owned(), symbol);
        Ok(())
    }

    pub fn add_typecode(&mut self, name: String) -> Result<Typecode, DatabaseError> {
        let typecode = self.typecodes.len() as Typecode;
        self.claim_name(&name, Symbol::Typecode(typecode))?;
        self.typecodes.push(name);
        Ok(typecode)
    }

    pub fn add_operator(
        &mut self,
        typecode: Typecode,
        symbol: String,
        arity: u8,
    ) -> Result<Identifier, DatabaseError> {
        let id = -(self.operators.len() as Identifier) - 1;
        self.claim_name(&symbol, Symbol::Operator(id))?;
        self.operators.push(Operator {
            symbol,
            typecode,
            arity,
        });
        Ok(id)
    }

    pub fn add_variable(
        &mut self,
        typecode: Typecode,
        name: String,
    ) -> Result<Identifier, DatabaseError> {
        let id = self.variables.len() as Identifier;
        self.claim_name(&name, Symbol::Variable(id))?;
        self.variables.push(Variable { name, typecode });
        Ok(id)
    }

    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.names.get(name).copied()
    }

    pub fn typecode(&self, name: &str) -> Result<Typecode, DatabaseError> {
        match self.lookup(name) {
            Some(Symbol::Typecode(t)) => Ok(t),
            _ => Err(DatabaseError::UnknownTypecode(name.to_owned())),
        }
    }

    pub fn typecode_name(&self, typecode: Typecode) -> &str {
        &self.typecodes[typecode as usize]
    }

    pub fn typecodes(&self) -> impl Iterator<Item = &str> {
        self.typecodes.iter().map(|s| s.as_str())
    }

    pub fn operator(&self, id: Identifier) -> Option<&Operator> {
        if id >= 0 {
            return None;
        }
        self.operators.get((id.checked_neg()? - 1) as usize)
    }

    pub fn operators(&self) -> impl Iterator<Item = (Identifier, &Operator)> {
        self.operators
            .iter()
            .enumerate()
            .map(|(i, o)| (-(i as Identifier) - 1, o))
    }

    pub fn variable(&self, id: Identifier) -> Option<&Variable> {
        if id < 0 {
            return None;
        }
        self.variables.get(id as usize)
    }

    pub fn variables(&self) -> impl Iterator<Item = (Identifier, &Variable)> {
        self.variables
            .iter()
            .enumerate()
            .map(|(i, v)| (i as Identifier, v))
    }

    /// The typecode of the root symbol of `node`, or `None` for a template placeholder or an
    /// undeclared symbol.
    pub fn typecode_of(&self, node: &ParseNode) -> Option<Typecode> {
        if node.is_var() {
            self.variable(node.stmt()).map(|v| v.typecode)
        } else {
            self.operator(node.stmt()).map(|o| o.typecode)
        }
    }

    /// Checks that every symbol of `node` is declared and every operator gets as many arguments
    /// as its arity.
    pub fn check(&self, node: &ParseNode) -> Result<(), DatabaseError> {
        if node.is_var() {
            return self
                .variable(node.stmt())
                .map(|_| ())
                .ok_or(DatabaseError::UnknownSymbol(node.stmt()));
        }
        let operator = self
            .operator(node.stmt())
            .ok_or(DatabaseError::UnknownSymbol(node.stmt()))?;
        if operator.arity as usize != node.children().len() {
            return Err(DatabaseError::ArityMismatch(
                node.stmt(),
                operator.arity,
                node.children().len(),
            ));
        }
        node.children().iter().try_for_each(|c| self.check(c))
    }
}

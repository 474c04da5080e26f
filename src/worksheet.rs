use log::trace;

use crate::{
    database::Database,
    error::{DatabaseError, ProofError},
    node::{ParseNode, WholeSubstitution},
    types::*,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justification {
    Hypothesis,
    Assertion(AssertionId),
    /// A goal which still waits for a proof
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofStep {
    formula: ParseNode,
    hyps: Vec<StepId>,
    justification: Justification,
}

impl ProofStep {
    pub fn formula(&self) -> &ParseNode {
        &self.formula
    }

    pub fn hyps(&self) -> &[StepId] {
        &self.hyps
    }

    pub fn justification(&self) -> Justification {
        self.justification
    }

    pub fn is_justified(&self) -> bool {
        self.justification != Justification::Pending
    }
}

/// The steps of one proof session.
///
/// Steps live in an arena and keep their [`StepId`] forever, while the display order is kept
/// separately so that derived steps can be inserted right before the goal they support. A step
/// may only use steps that come before it in this order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Worksheet {
    steps: Vec<ProofStep>,
    order: Vec<StepId>,
}

impl Worksheet {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, step: ProofStep) -> StepId {
        let id = self.steps.len();
        self.steps.push(step);
        id
    }

    pub fn add_hypothesis(&mut self, formula: ParseNode) -> StepId {
        let id = self.push(ProofStep {
            formula,
            hyps: Vec::new(),
            justification: Justification::Hypothesis,
        });
        self.order.push(id);
        id
    }

    pub fn add_goal(&mut self, formula: ParseNode) -> StepId {
        let id = self.push(ProofStep {
            formula,
            hyps: Vec::new(),
            justification: Justification::Pending,
        });
        self.order.push(id);
        id
    }

    /// Inserts a new step directly before `anchor`
    pub fn insert_before(
        &mut self,
        anchor: StepId,
        formula: ParseNode,
        hyps: Vec<StepId>,
        justification: Justification,
    ) -> StepId {
        let position = self.position(anchor);
        let id = self.push(ProofStep {
            formula,
            hyps,
            justification,
        });
        self.order.insert(position, id);
        id
    }

    /// Position of `step` in display order
    ///
    /// # Panics
    /// This method panics if `step` does not belong to this worksheet
    pub fn position(&self, step: StepId) -> usize {
        self.order
            .iter()
            .position(|s| *s == step)
            .unwrap_or_else(|| panic!("step {} is not part of the worksheet", step))
    }

    /// Finds the first step with the given formula that comes before `before`
    pub fn find(&self, formula: &ParseNode, before: StepId) -> Option<StepId> {
        self.order
            .iter()
            .take_while(|s| **s != before)
            .copied()
            .find(|s| &self.steps[*s].formula == formula)
    }

    pub fn justify(&mut self, step: StepId, hyps: Vec<StepId>, assertion: AssertionId) {
        let step = &mut self.steps[step];
        step.hyps = hyps;
        step.justification = Justification::Assertion(assertion);
    }

    pub fn step(&self, id: StepId) -> &ProofStep {
        &self.steps[id]
    }

    /// All steps in display order
    pub fn steps(&self) -> impl Iterator<Item = (StepId, &ProofStep)> {
        self.order.iter().map(move |id| (*id, &self.steps[*id]))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Checks that `step` follows from its hypotheses by its assertion.
    ///
    /// The assertion's hypotheses and conclusion are unified with the formulas of the hypothesis
    /// steps and the step itself, and every variable has to be replaced by an expression of its
    /// own typecode.
    pub fn verify_step(&self, db: &Database, step: StepId) -> Result<(), DatabaseError> {
        let proof_step = &self.steps[step];
        let assertion = match proof_step.justification {
            Justification::Hypothesis => return Ok(()),
            Justification::Pending => return Err(ProofError::Unjustified(step).into()),
            Justification::Assertion(a) => db.get(a),
        };
        if assertion.hypotheses().len() != proof_step.hyps.len() {
            return Err(ProofError::ParameterError(
                assertion.hypotheses().len(),
                proof_step.hyps.len(),
            )
            .into());
        }
        let position = self.position(step);
        let mut substitution = WholeSubstitution::with_capacity(db.syntax().variables().count());
        proof_step
            .formula
            .unify(assertion.conclusion(), &mut substitution)?;
        for (pattern, hyp) in assertion.hypotheses().iter().zip(proof_step.hyps.iter()) {
            if self.position(*hyp) >= position {
                return Err(ProofError::ForwardReference(*hyp).into());
            }
            self.steps[*hyp]
                .formula
                .unify(pattern, &mut substitution)?;
        }
        for (var, expr) in substitution.iter() {
            let expected = db
                .syntax()
                .variable(var)
                .ok_or(DatabaseError::UnknownSymbol(var))?
                .typecode;
            let found = db
                .syntax()
                .typecode_of(expr)
                .ok_or(DatabaseError::UnknownSymbol(expr.stmt()))?;
            if expected != found {
                return Err(ProofError::TypecodeMismatch(var, expected, found).into());
            }
        }
        trace!("verified step {} by {}", step, assertion.label());
        Ok(())
    }

    /// Verifies every step, returning the first failure
    pub fn verify_all(&self, db: &Database) -> Result<(), DatabaseError> {
        self.order
            .iter()
            .try_for_each(|step| self.verify_step(db, *step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assertion::AssertionKind, syntax::Syntax};

    // ph ps : wff, A : class, -> : wff, = : wff
    fn database() -> Database {
        let mut syntax = Syntax::new();
        let wff = syntax.add_typecode("wff".to_owned()).unwrap();
        let class = syntax.add_typecode("class".to_owned()).unwrap();
        syntax.add_variable(wff, "ph".to_owned()).unwrap();
        syntax.add_variable(wff, "ps".to_owned()).unwrap();
        syntax.add_variable(class, "A".to_owned()).unwrap();
        syntax.add_operator(wff, "->".to_owned(), 2).unwrap();
        syntax.add_operator(wff, "=".to_owned(), 2).unwrap();
        let mut db = Database::with_syntax(syntax);
        let (ph, ps) = (ParseNode::var(0), ParseNode::var(1));
        db.add_assertion(
            "ax-mp".to_owned(),
            AssertionKind::Axiom,
            vec![ph.clone(), ParseNode::binary(-1, ph, ps.clone())],
            ps,
        )
        .unwrap();
        db
    }

    #[test]
    fn modus_ponens() {
        let db = database();
        let a = ParseNode::var(2);
        let eq = ParseNode::binary(-2, a.clone(), a);
        let ph = ParseNode::var(0);
        let mut ws = Worksheet::new();
        let h1 = ws.add_hypothesis(ph.clone());
        let goal = ws.add_goal(eq.clone());
        let h2 = ws.insert_before(
            goal,
            ParseNode::binary(-1, ph, eq.clone()),
            vec![],
            Justification::Hypothesis,
        );
        assert_eq!(ws.verify_step(&db, goal), Err(ProofError::Unjustified(goal).into()));
        ws.justify(goal, vec![h1, h2], 0);
        assert_eq!(ws.verify_all(&db), Ok(()));
        assert_eq!(ws.find(&eq, goal), None);
        assert_eq!(ws.steps().map(|(id, _)| id).collect::<Vec<_>>(), vec![h1, h2, goal]);

        ws.justify(goal, vec![h2, h1], 0);
        assert!(ws.verify_step(&db, goal).is_err());
    }

    #[test]
    fn typecodes_are_checked() {
        let db = database();
        let a = ParseNode::var(2);
        let mut ws = Worksheet::new();
        // a class variable can not stand for a wff
        let h1 = ws.add_hypothesis(a.clone());
        let h2 = ws.add_hypothesis(ParseNode::binary(-1, a.clone(), ParseNode::var(1)));
        let goal = ws.add_goal(ParseNode::var(1));
        ws.justify(goal, vec![h1, h2], 0);
        assert_eq!(
            ws.verify_step(&db, goal),
            Err(ProofError::TypecodeMismatch(0, 0, 1).into())
        );
    }

    #[test]
    fn forward_references_are_rejected() {
        let db = database();
        let (ph, ps) = (ParseNode::var(0), ParseNode::var(1));
        let mut ws = Worksheet::new();
        let h1 = ws.add_hypothesis(ph.clone());
        let goal = ws.add_goal(ps.clone());
        let late = ws.add_hypothesis(ParseNode::binary(-1, ph, ps));
        ws.justify(goal, vec![h1, late], 0);
        assert_eq!(
            ws.verify_step(&db, goal),
            Err(ProofError::ForwardReference(late).into())
        );
        assert_eq!(ws.find(ws.step(h1).formula(), goal), Some(h1));
    }
}

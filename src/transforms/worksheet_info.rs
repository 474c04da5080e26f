use log::debug;

use crate::{
    database::Database,
    node::ParseNode,
    types::*,
    worksheet::{Justification, Worksheet},
};

/// A proof step, possibly proven under the implication prefix of the current goal.
///
/// Without a prefix the step proves its core. With a prefix `ph` and implication operator `->`
/// the step proves `ph -> core`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenProofStep {
    step: StepId,
    formula: ParseNode,
    prefix: Option<ParseNode>,
}

impl GenProofStep {
    pub fn step(&self) -> StepId {
        self.step
    }

    pub fn formula(&self) -> &ParseNode {
        &self.formula
    }

    pub fn has_prefix(&self) -> bool {
        self.prefix.is_some()
    }

    pub fn prefix(&self) -> Option<&ParseNode> {
        self.prefix.as_ref()
    }

    /// The proven statement without the prefix
    pub fn core(&self) -> &ParseNode {
        match self.prefix {
            Some(_) => self.formula.child(1),
            None => &self.formula,
        }
    }
}

/// The state of one synthesis run: the worksheet, the goal being proven and the implication
/// prefix that derived steps may use.
///
/// New steps are inserted directly before the goal, so every step found or created here may be
/// used to justify the goal.
pub struct WorksheetInfo<'a> {
    db: &'a Database,
    worksheet: &'a mut Worksheet,
    goal: StepId,
    goal_formula: ParseNode,
    prefix: Option<(Identifier, ParseNode)>,
    new_steps: Vec<StepId>,
}

impl<'a> WorksheetInfo<'a> {
    pub fn new(db: &'a Database, worksheet: &'a mut Worksheet, goal: StepId) -> Self {
        let goal_formula = worksheet.step(goal).formula().clone();
        WorksheetInfo {
            db,
            worksheet,
            goal,
            goal_formula,
            prefix: None,
            new_steps: Vec::new(),
        }
    }

    pub fn db(&self) -> &'a Database {
        self.db
    }

    pub fn goal(&self) -> StepId {
        self.goal
    }

    pub fn goal_formula(&self) -> &ParseNode {
        &self.goal_formula
    }

    pub fn worksheet(&self) -> &Worksheet {
        self.worksheet
    }

    /// Wraps an existing step
    pub fn gen_step(&self, step: StepId, prefix: Option<ParseNode>) -> GenProofStep {
        GenProofStep {
            step,
            formula: self.worksheet.step(step).formula().clone(),
            prefix,
        }
    }

    /// Finds a step proving `formula` before the goal
    pub fn proof_step(&self, formula: &ParseNode) -> Option<GenProofStep> {
        self.worksheet
            .find(formula, self.goal)
            .map(|step| self.gen_step(step, None))
    }

    /// Returns a step proving `formula` if there is one, otherwise creates it from `hyps` by
    /// `assertion`
    pub fn get_or_create(
        &mut self,
        formula: ParseNode,
        hyps: &[&GenProofStep],
        assertion: AssertionId,
    ) -> GenProofStep {
        match self.proof_step(&formula) {
            Some(step) => step,
            None => self.create(formula, hyps, assertion),
        }
    }

    /// Creates a new step proving `formula` from `hyps` by `assertion`
    pub fn create(
        &mut self,
        formula: ParseNode,
        hyps: &[&GenProofStep],
        assertion: AssertionId,
    ) -> GenProofStep {
        debug_assert_eq!(self.db.get(assertion).hypotheses().len(), hyps.len());
        let hyps: Vec<_> = hyps.iter().map(|h| h.step).collect();
        debug!(
            "emitted step {} by {} from {:?}",
            self.worksheet.len(),
            self.db.get(assertion).label(),
            hyps
        );
        let step = self.worksheet.insert_before(
            self.goal,
            formula.clone(),
            hyps,
            Justification::Assertion(assertion),
        );
        self.new_steps.push(step);
        GenProofStep {
            step,
            formula,
            prefix: None,
        }
    }

    /// Justifies the goal itself by `assertion`
    pub fn finish(&mut self, hyps: &[&GenProofStep], assertion: AssertionId) -> GenProofStep {
        debug_assert_eq!(self.db.get(assertion).hypotheses().len(), hyps.len());
        let hyps: Vec<_> = hyps.iter().map(|h| h.step).collect();
        debug!(
            "finished goal {} by {} from {:?}",
            self.goal,
            self.db.get(assertion).label(),
            hyps
        );
        self.worksheet.justify(self.goal, hyps, assertion);
        self.new_steps.push(self.goal);
        GenProofStep {
            step: self.goal,
            formula: self.goal_formula.clone(),
            prefix: None,
        }
    }

    /// Marks `step` as proven under the current prefix
    pub fn with_prefix(&self, step: GenProofStep) -> GenProofStep {
        debug_assert!(self.prefix.is_some());
        GenProofStep {
            prefix: self.prefix(),
            ..step
        }
    }

    pub fn set_prefix(&mut self, stmt: Identifier, prefix: ParseNode) {
        self.prefix = Some((stmt, prefix));
    }

    pub fn has_prefix(&self) -> bool {
        self.prefix.is_some()
    }

    pub fn prefix(&self) -> Option<ParseNode> {
        self.prefix.as_ref().map(|(_, p)| p.clone())
    }

    /// The implication operator of the prefix
    pub fn prefix_stmt(&self) -> Option<Identifier> {
        self.prefix.as_ref().map(|(s, _)| *s)
    }

    /// `prefix -> core`
    ///
    /// # Panics
    /// This method panics if no prefix is set
    pub fn apply_prefix(&self, core: &ParseNode) -> ParseNode {
        let (stmt, prefix) = self
            .prefix
            .as_ref()
            .unwrap_or_else(|| panic!("no implication prefix"));
        ParseNode::binary(*stmt, prefix.clone(), core.clone())
    }

    /// Steps created or justified so far, in creation order
    pub fn new_steps(&self) -> &[StepId] {
        &self.new_steps
    }

    pub fn into_new_steps(self) -> Vec<StepId> {
        self.new_steps
    }
}

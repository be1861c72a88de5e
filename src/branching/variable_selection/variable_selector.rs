use rand::rngs::SmallRng;

use crate::basic_types::Variable;
use crate::engine::Assignments;

/// A variable-order heuristic. The searcher notifies every selector of
/// assignments, unassignments, and conflicts, so that switching the active
/// strategy at a restart finds the other selectors up to date.
pub trait VariableSelector {
    fn grow(&mut self);

    /// Called for each variable encountered during conflict analysis.
    fn bump_activity(&mut self, variable: Variable);

    /// Called once per conflict, after analysis.
    fn on_conflict(&mut self);

    fn on_assign(&mut self, variable: Variable, num_conflicts: u64);

    fn on_unassign(&mut self, variable: Variable, num_conflicts: u64);

    /// The unassigned variable the heuristic prefers, or None if all
    /// variables are assigned.
    fn peek_next_variable(
        &mut self,
        assignments: &Assignments,
        random_generator: &mut SmallRng,
    ) -> Option<Variable>;

    fn name(&self) -> &'static str;
}

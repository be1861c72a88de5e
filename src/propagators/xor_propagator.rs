use crate::basic_types::ConflictInfo;
use crate::basic_types::ConstraintOperationError;
use crate::basic_types::ClauseReference;
use crate::basic_types::Literal;
use crate::basic_types::Variable;
use crate::ember_assert_moderate;
use crate::ember_assert_simple;
use crate::engine::Assignments;

/// A parity constraint `x1 (+) x2 (+) ... (+) xk = rhs` over variables.
/// Rows of length at least three are attached here; shorter rows collapse
/// into units or variable equivalences on addition or during cleaning.
#[derive(Debug, Clone)]
pub struct XorRow {
    /// The first two variables are the watched variables while the row is attached.
    variables: Vec<Variable>,
    rhs: bool,
    is_deleted: bool,
    is_strengthened: bool,
}

impl XorRow {
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn rhs(&self) -> bool {
        self.rhs
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    pub fn is_strengthened(&self) -> bool {
        self.is_strengthened
    }
}

/// The outcome of normalising a new xor clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XorAdditionOutcome {
    TriviallySatisfied,
    /// The row collapsed to a single variable; the literal fixes it.
    Unit(Literal),
    /// The row collapsed to two variables: `lhs = rhs (+) inverted`.
    Equivalence(Variable, Variable, bool),
    Attached(u32),
}

/// Propagates parity constraints with a two-watched-variable scheme. Each
/// attached row watches its first two variables; when a watched variable is
/// assigned, the propagator looks for an unassigned replacement, otherwise
/// the row is unit (the remaining variable is forced to match the parity) or
/// fully assigned (satisfied or conflicting).
#[derive(Default)]
pub struct XorPropagator {
    rows: Vec<XorRow>,
    //watch lists are per variable: parity is indifferent to literal polarity
    watch_lists: Vec<Vec<u32>>,
    pub(crate) next_position_on_trail_to_propagate: usize,
    num_deleted_rows: usize,
}

impl XorPropagator {
    pub fn grow(&mut self) {
        self.watch_lists.push(vec![]);
    }

    pub fn num_attached_rows(&self) -> usize {
        self.rows.len() - self.num_deleted_rows
    }

    pub fn get_row(&self, row_id: u32) -> &XorRow {
        &self.rows[row_id as usize]
    }

    pub fn rows(&self) -> impl Iterator<Item = (u32, &XorRow)> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.is_deleted)
            .map(|(id, row)| (id as u32, row))
    }

    /// Normalises and adds a parity constraint at the root level. Duplicated
    /// variables cancel pairwise and assigned variables fold their value into
    /// the right-hand side. Rows that collapse below length three are
    /// reported back to the caller instead of being attached.
    pub fn add_xor_clause(
        &mut self,
        mut variables: Vec<Variable>,
        mut rhs: bool,
        assignments: &Assignments,
    ) -> Result<XorAdditionOutcome, ConstraintOperationError> {
        ember_assert_simple!(assignments.is_at_the_root_level());

        //cancel out duplicated variables: x (+) x = 0
        variables.sort_unstable_by_key(|v| v.index());
        let mut deduplicated: Vec<Variable> = Vec::with_capacity(variables.len());
        let mut i = 0;
        while i < variables.len() {
            if i + 1 < variables.len() && variables[i] == variables[i + 1] {
                i += 2;
            } else {
                deduplicated.push(variables[i]);
                i += 1;
            }
        }

        //fold root-assigned variables into the right-hand side
        deduplicated.retain(|&variable| {
            if assignments.is_variable_assigned(variable) {
                ember_assert_moderate!(
                    assignments.get_variable_assignment_level(variable) == 0
                );
                rhs ^= assignments.is_variable_assigned_true(variable);
                false
            } else {
                true
            }
        });

        match deduplicated.len() {
            0 => {
                if rhs {
                    //0 = 1, the formula is trivially unsatisfiable
                    Err(ConstraintOperationError::InfeasibleClause)
                } else {
                    Ok(XorAdditionOutcome::TriviallySatisfied)
                }
            }
            1 => Ok(XorAdditionOutcome::Unit(Literal::new(deduplicated[0], rhs))),
            2 => Ok(XorAdditionOutcome::Equivalence(
                deduplicated[0],
                deduplicated[1],
                rhs,
            )),
            _ => {
                let row_id = self.rows.len() as u32;
                self.watch_lists[deduplicated[0]].push(row_id);
                self.watch_lists[deduplicated[1]].push(row_id);
                self.rows.push(XorRow {
                    variables: deduplicated,
                    rhs,
                    is_deleted: false,
                    is_strengthened: false,
                });
                Ok(XorAdditionOutcome::Attached(row_id))
            }
        }
    }

    pub fn propagate(&mut self, assignments: &mut Assignments) -> Result<(), ConflictInfo> {
        while self.next_position_on_trail_to_propagate < assignments.trail.len() {
            let true_literal = assignments.trail[self.next_position_on_trail_to_propagate];
            let assigned_variable = true_literal.get_variable();

            if self.watch_lists[assigned_variable].is_empty() {
                self.next_position_on_trail_to_propagate += 1;
                continue;
            }

            let mut end_index: usize = 0;
            let mut current_index: usize = 0;
            while current_index < self.watch_lists[assigned_variable].len() {
                let row_id = self.watch_lists[assigned_variable][current_index];
                let row = &mut self.rows[row_id as usize];
                ember_assert_moderate!(!row.is_deleted);

                //place the assigned variable at position 1 for simplicity
                if row.variables[0] == assigned_variable {
                    row.variables.swap(0, 1);
                }
                ember_assert_moderate!(row.variables[1] == assigned_variable);

                //look for an unassigned replacement watch, skipping the watched positions
                let mut found_new_watch = false;
                for i in 2..row.variables.len() {
                    if assignments.is_variable_unassigned(row.variables[i]) {
                        row.variables.swap(1, i);
                        self.watch_lists[row.variables[1]].push(row_id);
                        found_new_watch = true;
                        break;
                    }
                }

                if found_new_watch {
                    //the row is removed from this variable's watch list by not copying it back
                    current_index += 1;
                    continue;
                }

                //keep the current watch for this variable
                self.watch_lists[assigned_variable][end_index] =
                    self.watch_lists[assigned_variable][current_index];
                end_index += 1;
                current_index += 1;

                //every variable apart from possibly the other watch is now assigned
                let row = &self.rows[row_id as usize];
                let other_watch = row.variables[0];
                let parity_of_assigned = row.variables[1..]
                    .iter()
                    .fold(false, |parity, &variable| {
                        parity ^ assignments.is_variable_assigned_true(variable)
                    });

                if assignments.is_variable_unassigned(other_watch) {
                    //the row is unit, the remaining variable is forced
                    let forced_value = row.rhs ^ parity_of_assigned;
                    let _ = assignments.enqueue_propagated_literal(
                        Literal::new(other_watch, forced_value),
                        ClauseReference::create_xor_row_reference(row_id).into(),
                    );
                } else {
                    let parity =
                        parity_of_assigned ^ assignments.is_variable_assigned_true(other_watch);
                    if parity != row.rhs {
                        //conflict detected, readd the remaining watchers and report
                        while current_index < self.watch_lists[assigned_variable].len() {
                            self.watch_lists[assigned_variable][end_index] =
                                self.watch_lists[assigned_variable][current_index];
                            current_index += 1;
                            end_index += 1;
                        }
                        self.watch_lists[assigned_variable].truncate(end_index);
                        return Err(ConflictInfo::XorRow { row_id });
                    }
                    //the row is satisfied, nothing to do
                }
            }
            self.watch_lists[assigned_variable].truncate(end_index);
            self.next_position_on_trail_to_propagate += 1;
        }
        Ok(())
    }

    pub fn synchronise(&mut self, trail_size: usize) {
        ember_assert_simple!(self.next_position_on_trail_to_propagate >= trail_size);
        self.next_position_on_trail_to_propagate = trail_size;
    }

    pub fn is_propagation_complete(&self, trail_size: usize) -> bool {
        self.next_position_on_trail_to_propagate == trail_size
    }

    /// The clause literals explaining the propagation of `propagated_literal`
    /// by the given row: the propagated literal first, followed by the
    /// falsified literals of the remaining variables.
    pub fn explain_propagation(
        &self,
        row_id: u32,
        propagated_literal: Literal,
        assignments: &Assignments,
    ) -> Vec<Literal> {
        let row = &self.rows[row_id as usize];
        let mut explanation = Vec::with_capacity(row.variables.len());
        explanation.push(propagated_literal);
        for &variable in row.variables.iter() {
            if variable == propagated_literal.get_variable() {
                continue;
            }
            ember_assert_moderate!(assignments.is_variable_assigned(variable));
            explanation.push(Literal::new(
                variable,
                !assignments.is_variable_assigned_true(variable),
            ));
        }
        explanation
    }

    /// The clause literals explaining why the given row is falsified: the
    /// falsified literal of every variable in the row.
    pub fn explain_conflict(&self, row_id: u32, assignments: &Assignments) -> Vec<Literal> {
        let row = &self.rows[row_id as usize];
        row.variables
            .iter()
            .map(|&variable| {
                ember_assert_moderate!(assignments.is_variable_assigned(variable));
                Literal::new(variable, !assignments.is_variable_assigned_true(variable))
            })
            .collect()
    }

    pub fn is_row_satisfied(&self, row_id: u32, assignments: &Assignments) -> bool {
        let row = &self.rows[row_id as usize];
        let mut parity = false;
        for &variable in row.variables.iter() {
            if assignments.is_variable_unassigned(variable) {
                return false;
            }
            parity ^= assignments.is_variable_assigned_true(variable);
        }
        parity == row.rhs
    }

    /// Shrinks every attached row at the root level by dropping assigned
    /// variables and folding their values into the parity. Rows that collapse
    /// to two variables are detached and reported as equivalences; rows that
    /// collapse to zero variables are satisfied and deleted.
    pub fn clean_rows(&mut self, assignments: &Assignments) -> Vec<(Variable, Variable, bool)> {
        ember_assert_simple!(assignments.is_at_the_root_level());

        let mut equivalences = vec![];
        for row_id in 0..self.rows.len() as u32 {
            if self.rows[row_id as usize].is_deleted {
                continue;
            }
            if !self.rows[row_id as usize]
                .variables
                .iter()
                .any(|&v| assignments.is_variable_assigned(v))
            {
                continue;
            }

            self.detach_row_watchers(row_id);

            let row = &mut self.rows[row_id as usize];
            let num_variables_before = row.variables.len();
            let mut rhs = row.rhs;
            row.variables.retain(|&variable| {
                if assignments.is_variable_assigned(variable) {
                    rhs ^= assignments.is_variable_assigned_true(variable);
                    false
                } else {
                    true
                }
            });
            row.rhs = rhs;

            match row.variables.len() {
                0 => {
                    //a falsified row would have conflicted during root propagation
                    ember_assert_moderate!(!row.rhs);
                    row.is_deleted = true;
                    self.num_deleted_rows += 1;
                }
                1 => {
                    //a unit row would have been propagated during root propagation, after
                    //which the remaining variable is assigned and dropped above
                    unreachable!("Unit xor rows cannot survive root-level propagation");
                }
                2 => {
                    equivalences.push((row.variables[0], row.variables[1], row.rhs));
                    row.is_deleted = true;
                    self.num_deleted_rows += 1;
                }
                _ => {
                    ember_assert_moderate!(row.variables.len() < num_variables_before);
                    row.is_strengthened = true;
                    let first = self.rows[row_id as usize].variables[0];
                    let second = self.rows[row_id as usize].variables[1];
                    self.watch_lists[first].push(row_id);
                    self.watch_lists[second].push(row_id);
                }
            }
        }
        equivalences
    }

    fn detach_row_watchers(&mut self, row_id: u32) {
        let first = self.rows[row_id as usize].variables[0];
        let second = self.rows[row_id as usize].variables[1];
        for watched_variable in [first, second] {
            let watchers = &mut self.watch_lists[watched_variable];
            let index = watchers
                .iter()
                .position(|&id| id == row_id)
                .expect("Detaching an xor row that is not being watched");
            let _ = watchers.swap_remove(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(num_variables: u32) -> (XorPropagator, Assignments) {
        let mut propagator = XorPropagator::default();
        let mut assignments = Assignments::default();
        for _ in 0..=num_variables {
            propagator.grow();
            assignments.grow();
        }
        assignments.enqueue_decision_literal(assignments.true_literal);
        (propagator, assignments)
    }

    fn var(index: u32) -> Variable {
        Variable::new(index)
    }

    #[test]
    fn duplicated_variables_cancel_out() {
        let (mut propagator, assignments) = setup(3);
        let outcome = propagator.add_xor_clause(
            vec![var(1), var(2), var(1), var(3)],
            true,
            &assignments,
        );
        assert_eq!(
            outcome,
            Ok(XorAdditionOutcome::Equivalence(var(2), var(3), true))
        );
    }

    #[test]
    fn empty_odd_parity_is_infeasible() {
        let (mut propagator, assignments) = setup(2);
        let outcome = propagator.add_xor_clause(vec![var(1), var(1)], true, &assignments);
        assert_eq!(outcome, Err(ConstraintOperationError::InfeasibleClause));
    }

    #[test]
    fn row_collapsing_to_one_variable_is_a_unit() {
        let (mut propagator, mut assignments) = setup(2);
        assignments.enqueue_decision_literal(Literal::new(var(1), true));
        let outcome = propagator.add_xor_clause(vec![var(1), var(2)], true, &assignments);
        assert_eq!(
            outcome,
            Ok(XorAdditionOutcome::Unit(Literal::new(var(2), false)))
        );
    }

    #[test]
    fn unit_row_propagates_the_remaining_variable() {
        let (mut propagator, mut assignments) = setup(3);
        let outcome = propagator.add_xor_clause(
            vec![var(1), var(2), var(3)],
            true,
            &assignments,
        );
        assert!(matches!(outcome, Ok(XorAdditionOutcome::Attached(_))));

        assignments.increase_decision_level();
        assignments.enqueue_decision_literal(Literal::new(var(1), false));
        assignments.increase_decision_level();
        assignments.enqueue_decision_literal(Literal::new(var(2), false));
        //mirror the clausal propagator's progress over the trail
        propagator.next_position_on_trail_to_propagate = 1;

        let result = propagator.propagate(&mut assignments);
        assert!(result.is_ok());
        //1 (+) 2 (+) 3 = 1 with vars 1 and 2 false forces var 3 true
        assert!(assignments.is_literal_assigned_true(Literal::new(var(3), true)));
        let reason = assignments.get_literal_reason(Literal::new(var(3), true));
        assert!(reason.is_xor_row());
    }

    #[test]
    fn fully_assigned_row_with_wrong_parity_conflicts() {
        let (mut propagator, mut assignments) = setup(3);
        let _ = propagator.add_xor_clause(vec![var(1), var(2), var(3)], false, &assignments);

        assignments.increase_decision_level();
        assignments.enqueue_decision_literal(Literal::new(var(1), true));
        assignments.increase_decision_level();
        assignments.enqueue_decision_literal(Literal::new(var(2), false));
        assignments.increase_decision_level();
        assignments.enqueue_decision_literal(Literal::new(var(3), false));
        propagator.next_position_on_trail_to_propagate = 1;

        //var 1 true alone gives odd parity, the rhs requires even
        let result = propagator.propagate(&mut assignments);
        match result {
            Err(ConflictInfo::XorRow { row_id }) => {
                let explanation = propagator.explain_conflict(row_id, &assignments);
                assert_eq!(explanation.len(), 3);
                assert!(explanation
                    .iter()
                    .all(|&lit| assignments.is_literal_assigned_false(lit)));
            }
            other => panic!("Expected an xor conflict, got {other:?}"),
        }
    }

    #[test]
    fn cleaning_folds_root_assignments_into_the_parity() {
        let (mut propagator, mut assignments) = setup(4);
        let outcome = propagator.add_xor_clause(
            vec![var(1), var(2), var(3), var(4)],
            true,
            &assignments,
        );
        assert!(matches!(outcome, Ok(XorAdditionOutcome::Attached(_))));

        assignments.enqueue_decision_literal(Literal::new(var(1), true));
        propagator.next_position_on_trail_to_propagate = 2;

        let equivalences = propagator.clean_rows(&assignments);
        assert!(equivalences.is_empty());
        let (_, row) = propagator.rows().next().unwrap();
        //x2 (+) x3 (+) x4 = 0 remains
        assert_eq!(row.variables().len(), 3);
        assert!(!row.rhs());
        assert!(row.is_strengthened());
    }

    #[test]
    fn cleaning_detaches_rows_that_collapse_to_equivalences() {
        let (mut propagator, mut assignments) = setup(4);
        let _ = propagator.add_xor_clause(vec![var(1), var(2), var(3)], true, &assignments);

        assignments.enqueue_decision_literal(Literal::new(var(1), true));
        propagator.next_position_on_trail_to_propagate = 2;

        let equivalences = propagator.clean_rows(&assignments);
        //x2 (+) x3 = 0
        assert_eq!(equivalences, vec![(var(2), var(3), false)]);
        assert_eq!(propagator.num_attached_rows(), 0);
    }
}

use rand::rngs::SmallRng;
use rand::Rng;

use super::VariableSelector;
use crate::basic_types::Variable;
use crate::engine::Assignments;

/// Selects uniformly at random among the unassigned variables.
#[derive(Default)]
pub struct RandomSelector {}

impl VariableSelector for RandomSelector {
    fn grow(&mut self) {}

    fn bump_activity(&mut self, _variable: Variable) {}

    fn on_conflict(&mut self) {}

    fn on_assign(&mut self, _variable: Variable, _num_conflicts: u64) {}

    fn on_unassign(&mut self, _variable: Variable, _num_conflicts: u64) {}

    fn peek_next_variable(
        &mut self,
        assignments: &Assignments,
        random_generator: &mut SmallRng,
    ) -> Option<Variable> {
        //reservoir sampling over the unassigned variables
        let mut selected = None;
        let mut num_candidates = 0u64;
        for variable in assignments.get_variables() {
            if assignments.is_variable_unassigned(variable) {
                num_candidates += 1;
                if random_generator.gen_range(0..num_candidates) == 0 {
                    selected = Some(variable);
                }
            }
        }
        selected
    }

    fn name(&self) -> &'static str {
        "rand"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Literal;
    use rand::SeedableRng;

    #[test]
    fn only_unassigned_variables_are_selected() {
        let mut selector = RandomSelector::default();
        let mut assignments = Assignments::default();
        for _ in 0..=3 {
            assignments.grow();
        }
        assignments.enqueue_decision_literal(assignments.true_literal);
        assignments.increase_decision_level();
        assignments.enqueue_decision_literal(Literal::new(Variable::new(1), true));
        assignments.enqueue_decision_literal(Literal::new(Variable::new(3), false));

        let mut rng = SmallRng::seed_from_u64(0);
        for _ in 0..20 {
            assert_eq!(
                selector.peek_next_variable(&assignments, &mut rng),
                Some(Variable::new(2))
            );
        }
    }
}

use crate::basic_types::Literal;
use crate::engine::Assignments;

#[derive(Debug, Copy, Clone)]
pub struct Preprocessor {}

impl Preprocessor {
    /// Normalises a clause against the root assignment before it is attached.
    ///
    /// The result is one of three shapes:
    /// - the empty clause, when every literal is falsified at the root;
    /// - a single always-true literal, when the clause already holds at the
    ///   root or mentions a variable in both polarities;
    /// - otherwise the surviving literals, without duplicates and without
    ///   root-falsified entries.
    ///
    /// Watch lists rely on the absence of duplicates, so this step is a matter
    /// of correctness and not merely of clause quality.
    pub fn preprocess_clause(literals: Vec<Literal>, assignments: &Assignments) -> Vec<Literal> {
        let mut cleaned: Vec<Literal> = Vec::with_capacity(literals.len());
        for literal in literals {
            if assignments.is_literal_assigned_true(literal) {
                //nothing else matters once one literal holds at the root
                return vec![assignments.true_literal];
            }
            if assignments.is_literal_unassigned(literal) {
                cleaned.push(literal);
            }
            //root-falsified literals are dropped
        }

        //ordering by code places duplicates, and the two polarities of a
        //variable, next to each other
        cleaned.sort_unstable_by_key(|literal| literal.to_u32());
        cleaned.dedup();

        let is_tautology = cleaned
            .windows(2)
            .any(|pair| pair[0].get_variable() == pair[1].get_variable());
        if is_tautology {
            return vec![assignments.true_literal];
        }

        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Variable;

    fn setup(num_variables: u32) -> Assignments {
        let mut assignments = Assignments::default();
        for _ in 0..num_variables {
            assignments.grow();
        }
        //the dummy variable zero is true at the root
        assignments.enqueue_decision_literal(assignments.true_literal);
        assignments
    }

    #[test]
    fn duplicates_are_removed() {
        let assignments = setup(3);
        let a = Literal::new(Variable::new(1), true);
        let b = Literal::new(Variable::new(2), false);

        let result = Preprocessor::preprocess_clause(vec![a, b, a], &assignments);
        assert_eq!(result.len(), 2);
        assert!(result.contains(&a) && result.contains(&b));
    }

    #[test]
    fn tautologies_become_the_true_literal() {
        let assignments = setup(2);
        let a = Literal::new(Variable::new(1), true);

        let result = Preprocessor::preprocess_clause(vec![a, !a], &assignments);
        assert_eq!(result, vec![assignments.true_literal]);
    }

    #[test]
    fn root_falsified_literals_are_dropped() {
        let mut assignments = setup(3);
        let a = Literal::new(Variable::new(1), true);
        let b = Literal::new(Variable::new(2), true);
        assignments.enqueue_decision_literal(!a);

        let result = Preprocessor::preprocess_clause(vec![a, b], &assignments);
        assert_eq!(result, vec![b]);
    }

    #[test]
    fn root_falsified_clause_becomes_empty() {
        let mut assignments = setup(2);
        let a = Literal::new(Variable::new(1), true);
        assignments.enqueue_decision_literal(!a);

        let result = Preprocessor::preprocess_clause(vec![a], &assignments);
        assert!(result.is_empty());
    }

    #[test]
    fn root_satisfied_clause_collapses_to_the_true_literal() {
        let mut assignments = setup(3);
        let a = Literal::new(Variable::new(1), true);
        let b = Literal::new(Variable::new(2), true);
        assignments.enqueue_decision_literal(a);

        let result = Preprocessor::preprocess_clause(vec![b, a], &assignments);
        assert_eq!(result, vec![assignments.true_literal]);
    }
}

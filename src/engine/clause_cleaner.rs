use crate::basic_types::Literal;
use crate::basic_types::Variable;
use crate::ember_assert_moderate;
use crate::ember_assert_simple;
use crate::engine::Assignments;
use crate::engine::ClauseAllocator;
use crate::engine::LearnedClauseManager;
use crate::engine::VariableReplacer;
use crate::propagators::ClausalPropagator;
use crate::propagators::XorPropagator;

/// Removes and shrinks clauses that became satisfied or shortened by root
/// assignments. The cleaner runs only at decision level zero, and only once
/// the number of root assignments has grown by at least the configured
/// increment since its previous run. Long clauses that shrink to two literals
/// migrate into the inline binary representation; xor rows that collapse to
/// two variables are forwarded to the variable replacer as equivalences.
#[derive(Default, Debug)]
pub struct ClauseCleaner {
    last_num_root_assignments_clauses: u64,
    last_num_root_assignments_xor: u64,
    num_clauses_removed: u64,
    num_became_binary: u64,
}

impl ClauseCleaner {
    pub fn num_clauses_removed(&self) -> u64 {
        self.num_clauses_removed
    }

    pub fn num_became_binary(&self) -> u64 {
        self.num_became_binary
    }

    #[allow(clippy::too_many_arguments)]
    pub fn clean_clauses_if_needed(
        &mut self,
        increment: u64,
        assignments: &Assignments,
        clause_allocator: &mut ClauseAllocator,
        clausal_propagator: &mut ClausalPropagator,
        xor_propagator: &mut XorPropagator,
        learned_clause_manager: &mut LearnedClauseManager,
        variable_replacer: &mut VariableReplacer,
    ) {
        ember_assert_simple!(assignments.is_at_the_root_level());
        ember_assert_simple!(
            clausal_propagator.is_propagation_complete(assignments.num_trail_entries())
        );

        //at the root level every trail entry is a root assignment
        let num_root_assignments = assignments.num_trail_entries() as u64;

        if self.last_num_root_assignments_clauses + increment < num_root_assignments {
            self.clean_long_clauses(assignments, clause_allocator, clausal_propagator);
            clausal_propagator.retain_live_permanent_clauses(clause_allocator);
            learned_clause_manager.retain_live_clauses(clause_allocator);
            self.last_num_root_assignments_clauses = num_root_assignments;
        }

        if self.last_num_root_assignments_xor + increment < num_root_assignments {
            self.clean_xor_rows(
                assignments,
                clause_allocator,
                clausal_propagator,
                xor_propagator,
                variable_replacer,
            );
            self.last_num_root_assignments_xor = num_root_assignments;
        }
    }

    fn clean_long_clauses(
        &mut self,
        assignments: &Assignments,
        clause_allocator: &mut ClauseAllocator,
        clausal_propagator: &mut ClausalPropagator,
    ) {
        let references: Vec<_> = clause_allocator.clause_references().collect();
        for clause_reference in references {
            let clause = clause_allocator.get_clause(clause_reference);
            let is_learned = clause.is_learned();
            let original_len = clause.len() as u64;

            let is_satisfied = clause
                .get_literal_slice()
                .iter()
                .any(|&lit| assignments.is_literal_assigned_true(lit));
            let num_false_literals = clause
                .get_literal_slice()
                .iter()
                .filter(|&&lit| assignments.is_literal_assigned_false(lit))
                .count();

            if !is_satisfied && num_false_literals == 0 {
                continue;
            }

            //the clause will change, so its watches are removed first
            clausal_propagator.remove_clause_from_consideration(
                clause_allocator.get_clause(clause_reference).get_literal_slice(),
                clause_reference,
            );

            if is_satisfied {
                self.decrement_literal_counts(clausal_propagator, is_learned, original_len);
                clause_allocator.delete_clause(clause_reference);
                self.num_clauses_removed += 1;
                continue;
            }

            //drop the falsified literals, back to front so that positions stay valid
            let clause = clause_allocator.get_mutable_clause(clause_reference);
            for position in (0..clause.len() as usize).rev() {
                if assignments.is_literal_assigned_false(clause[position as u32]) {
                    clause.remove_literal_at(position);
                }
            }

            let remaining = clause.len();
            //a unit or empty remainder is impossible: the clause would have been propagated
            //or falsified during root propagation
            ember_assert_moderate!(remaining >= 2);

            if remaining == 2 {
                //the clause became binary, move it to the inline representation
                let lit0 = clause[0];
                let lit1 = clause[1];
                self.decrement_literal_counts(clausal_propagator, is_learned, original_len);
                clause_allocator.delete_clause(clause_reference);
                clausal_propagator.start_watching_binary_clause_unchecked(lit0, lit1, is_learned);
                self.num_became_binary += 1;
            } else {
                clause.mark_strengthened();
                self.decrement_literal_counts(
                    clausal_propagator,
                    is_learned,
                    original_len - remaining as u64,
                );
                clausal_propagator.attach_clause_unchecked(
                    clause_allocator.get_clause(clause_reference).get_literal_slice(),
                    clause_reference,
                );
            }
        }
    }

    fn decrement_literal_counts(
        &self,
        clausal_propagator: &mut ClausalPropagator,
        is_learned: bool,
        amount: u64,
    ) {
        if is_learned {
            clausal_propagator.num_learned_clause_literals -= amount;
        } else {
            clausal_propagator.num_clause_literals -= amount;
        }
    }

    fn clean_xor_rows(
        &mut self,
        assignments: &Assignments,
        clause_allocator: &mut ClauseAllocator,
        clausal_propagator: &mut ClausalPropagator,
        xor_propagator: &mut XorPropagator,
        variable_replacer: &mut VariableReplacer,
    ) {
        let equivalences = xor_propagator.clean_rows(assignments);
        for (lhs, rhs, inverted) in equivalences {
            variable_replacer.replace(lhs, rhs, inverted);
            //the equivalence stays enforced through a pair of binary clauses
            add_equivalence_clauses(lhs, rhs, inverted, clause_allocator, clausal_propagator);
        }
    }
}

/// Encodes `lhs (+) rhs = inverted` as two inline binary clauses so that the
/// equivalence keeps propagating while the replacement itself is deferred to
/// the external simplifier.
pub(crate) fn add_equivalence_clauses(
    lhs: Variable,
    rhs: Variable,
    inverted: bool,
    clause_allocator: &mut ClauseAllocator,
    clausal_propagator: &mut ClausalPropagator,
) {
    let lhs_true = Literal::new(lhs, true);
    let rhs_true = Literal::new(rhs, true);
    if inverted {
        //lhs (+) rhs = 1, the variables take different values
        let _ = clausal_propagator.add_clause_unchecked(
            vec![lhs_true, rhs_true],
            false,
            clause_allocator,
        );
        let _ = clausal_propagator.add_clause_unchecked(
            vec![!lhs_true, !rhs_true],
            false,
            clause_allocator,
        );
    } else {
        //lhs (+) rhs = 0, the variables take equal values
        let _ = clausal_propagator.add_clause_unchecked(
            vec![lhs_true, !rhs_true],
            false,
            clause_allocator,
        );
        let _ = clausal_propagator.add_clause_unchecked(
            vec![!lhs_true, rhs_true],
            false,
            clause_allocator,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Setup {
        cleaner: ClauseCleaner,
        assignments: Assignments,
        clause_allocator: ClauseAllocator,
        clausal_propagator: ClausalPropagator,
        xor_propagator: XorPropagator,
        learned_clause_manager: LearnedClauseManager,
        variable_replacer: VariableReplacer,
    }

    fn lit(index: u32) -> Literal {
        Literal::new(Variable::new(index), true)
    }

    fn setup(num_variables: u32) -> Setup {
        let mut assignments = Assignments::default();
        let mut clausal_propagator = ClausalPropagator::default();
        let mut xor_propagator = XorPropagator::default();
        let mut variable_replacer = VariableReplacer::default();
        for _ in 0..=num_variables {
            assignments.grow();
            clausal_propagator.grow();
            xor_propagator.grow();
            variable_replacer.grow();
        }
        assignments.enqueue_decision_literal(assignments.true_literal);
        Setup {
            cleaner: ClauseCleaner::default(),
            assignments,
            clause_allocator: ClauseAllocator::new(),
            clausal_propagator,
            xor_propagator,
            learned_clause_manager: LearnedClauseManager::new(
                crate::engine::LearningOptions::default(),
            ),
            variable_replacer,
        }
    }

    fn clean(s: &mut Setup) {
        //propagate so that the propagator's trail pointer reaches the end
        let outcome = s
            .clausal_propagator
            .propagate(&mut s.assignments, &mut s.clause_allocator);
        assert!(outcome.is_ok());
        let outcome = s.xor_propagator.propagate(&mut s.assignments);
        assert!(outcome.is_ok());
        s.cleaner.clean_clauses_if_needed(
            0,
            &s.assignments,
            &mut s.clause_allocator,
            &mut s.clausal_propagator,
            &mut s.xor_propagator,
            &mut s.learned_clause_manager,
            &mut s.variable_replacer,
        );
    }

    #[test]
    fn satisfied_clauses_are_removed() {
        let mut s = setup(3);
        let _ = s.clausal_propagator.add_permanent_clause(
            vec![lit(1), lit(2), lit(3)],
            &mut s.assignments,
            &mut s.clause_allocator,
        );
        s.assignments.enqueue_decision_literal(lit(2));

        clean(&mut s);

        assert_eq!(s.cleaner.num_clauses_removed(), 1);
        assert_eq!(s.clause_allocator.num_allocated_clauses(), 0);
        assert!(s.clausal_propagator.permanent_clause_references().is_empty());
        assert_eq!(s.clausal_propagator.num_clause_literals, 0);
    }

    #[test]
    fn falsified_literals_are_stripped_and_the_clause_is_strengthened() {
        let mut s = setup(4);
        let _ = s.clausal_propagator.add_permanent_clause(
            vec![lit(1), lit(2), lit(3), lit(4)],
            &mut s.assignments,
            &mut s.clause_allocator,
        );
        s.assignments.enqueue_decision_literal(!lit(4));

        clean(&mut s);

        let reference = s.clausal_propagator.permanent_clause_references()[0];
        let clause = s.clause_allocator.get_clause(reference);
        assert_eq!(clause.len(), 3);
        assert!(clause.is_strengthened());
        assert_eq!(s.clausal_propagator.num_clause_literals, 3);
        assert!(s
            .clausal_propagator
            .debug_check_state(&s.assignments, &s.clause_allocator));
    }

    #[test]
    fn clauses_shrinking_to_two_literals_become_inline_binaries() {
        let mut s = setup(3);
        let _ = s.clausal_propagator.add_permanent_clause(
            vec![lit(1), lit(2), lit(3)],
            &mut s.assignments,
            &mut s.clause_allocator,
        );
        s.assignments.enqueue_decision_literal(!lit(3));

        clean(&mut s);

        assert_eq!(s.cleaner.num_became_binary(), 1);
        assert_eq!(s.clause_allocator.num_allocated_clauses(), 0);
        assert!(s.clausal_propagator.contains_binary_clause(lit(1), lit(2)));
    }

    #[test]
    fn collapsing_xor_rows_are_forwarded_as_equivalences() {
        let mut s = setup(3);
        let outcome = s.xor_propagator.add_xor_clause(
            vec![Variable::new(1), Variable::new(2), Variable::new(3)],
            true,
            &s.assignments,
        );
        assert!(outcome.is_ok());
        s.assignments.enqueue_decision_literal(lit(1));

        clean(&mut s);

        assert_eq!(s.variable_replacer.num_replaced_variables(), 1);
        //x2 (+) x3 = 0 is enforced through the equivalence clauses
        assert!(s.clausal_propagator.contains_binary_clause(lit(2), !lit(3)));
        assert!(s.clausal_propagator.contains_binary_clause(!lit(2), lit(3)));
    }

    #[test]
    fn cleaning_is_gated_on_root_assignment_growth() {
        let mut s = setup(3);
        let _ = s.clausal_propagator.add_permanent_clause(
            vec![lit(1), lit(2), lit(3)],
            &mut s.assignments,
            &mut s.clause_allocator,
        );
        s.assignments.enqueue_decision_literal(lit(1));

        //with a large increment the cleaner does not run
        let outcome = s
            .clausal_propagator
            .propagate(&mut s.assignments, &mut s.clause_allocator);
        assert!(outcome.is_ok());
        s.cleaner.clean_clauses_if_needed(
            100,
            &s.assignments,
            &mut s.clause_allocator,
            &mut s.clausal_propagator,
            &mut s.xor_propagator,
            &mut s.learned_clause_manager,
            &mut s.variable_replacer,
        );
        assert_eq!(s.cleaner.num_clauses_removed(), 0);
    }
}

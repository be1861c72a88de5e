use crate::basic_types::ConflictInfo;
use crate::basic_types::ConstraintReference;
use crate::basic_types::Literal;
use crate::basic_types::Trail;
use crate::basic_types::Variable;
use crate::basic_types::VariableGeneratorIterator;
use crate::ember_assert_simple;

#[derive(Clone, Debug)]
pub struct Assignments {
    assignment_info: Vec<AssignmentInfo>,
    pub(crate) trail: Trail<Literal>,
    pub true_literal: Literal,
    pub false_literal: Literal,
}

impl Default for Assignments {
    fn default() -> Self {
        let dummy_literal = Literal::new(Variable::new(0), true);
        Assignments {
            assignment_info: Default::default(),
            trail: Default::default(),
            true_literal: dummy_literal,
            false_literal: !dummy_literal,
        }
    }
}

impl Assignments {
    pub fn increase_decision_level(&mut self) {
        self.trail.increase_decision_level()
    }

    pub fn get_decision_level(&self) -> u32 {
        self.trail.get_decision_level()
    }

    pub fn num_trail_entries(&self) -> usize {
        self.trail.len()
    }

    pub fn get_trail_entry(&self, index: usize) -> Literal {
        self.trail[index]
    }

    /// The trail position at which the given decision level begins.
    pub fn get_trail_position_of_level(&self, decision_level: u32) -> usize {
        self.trail.get_level_start(decision_level)
    }

    pub fn grow(&mut self) {
        self.assignment_info.push(AssignmentInfo::Unassigned);
    }

    pub fn num_variables(&self) -> u32 {
        self.assignment_info.len() as u32
    }

    pub fn get_variables(&self) -> VariableGeneratorIterator {
        // we start from 1 to ignore the special variable with index zero, which is always assigned
        // at the root to true
        VariableGeneratorIterator::new(1, self.num_variables())
    }

    pub fn is_variable_assigned_true(&self, variable: Variable) -> bool {
        match self.assignment_info[variable] {
            AssignmentInfo::Assigned { truth_value, .. } => truth_value,
            AssignmentInfo::Unassigned => false,
        }
    }

    pub fn is_variable_assigned_false(&self, variable: Variable) -> bool {
        match self.assignment_info[variable] {
            AssignmentInfo::Assigned { truth_value, .. } => !truth_value,
            AssignmentInfo::Unassigned => false,
        }
    }

    pub fn is_literal_assigned_true(&self, literal: Literal) -> bool {
        if literal.is_positive() {
            self.is_variable_assigned_true(literal.get_variable())
        } else {
            self.is_variable_assigned_false(literal.get_variable())
        }
    }

    pub fn is_literal_assigned_false(&self, literal: Literal) -> bool {
        self.is_literal_assigned(literal) && !self.is_literal_assigned_true(literal)
    }

    pub fn is_literal_assigned(&self, literal: Literal) -> bool {
        self.is_variable_assigned(literal.get_variable())
    }

    pub fn is_literal_unassigned(&self, literal: Literal) -> bool {
        self.is_variable_unassigned(literal.get_variable())
    }

    pub fn is_variable_unassigned(&self, variable: Variable) -> bool {
        self.assignment_info[variable] == AssignmentInfo::Unassigned
    }

    pub fn is_variable_assigned(&self, variable: Variable) -> bool {
        self.assignment_info[variable] != AssignmentInfo::Unassigned
    }

    pub fn is_literal_root_assignment(&self, literal: Literal) -> bool {
        if self.is_literal_unassigned(literal) {
            false
        } else {
            self.get_variable_assignment_level(literal.get_variable()) == 0
        }
    }

    pub fn is_variable_decision(&self, variable: Variable) -> bool {
        match self.assignment_info[variable] {
            AssignmentInfo::Unassigned => false,
            AssignmentInfo::Assigned { reason, .. } => reason.is_null(),
        }
    }

    pub fn is_literal_decision(&self, literal: Literal) -> bool {
        self.is_variable_decision(literal.get_variable())
    }

    pub fn is_variable_propagated(&self, variable: Variable) -> bool {
        match self.assignment_info[variable] {
            AssignmentInfo::Unassigned => false,
            AssignmentInfo::Assigned { reason, .. } => !reason.is_null(),
        }
    }

    pub fn is_literal_propagated(&self, literal: Literal) -> bool {
        self.is_variable_propagated(literal.get_variable())
    }

    pub fn get_variable_assignment_level(&self, variable: Variable) -> u32 {
        match self.assignment_info[variable] {
            AssignmentInfo::Unassigned => {
                panic!("Unassigned variables do not have assignment levels");
            }
            AssignmentInfo::Assigned { decision_level, .. } => decision_level,
        }
    }

    pub fn get_literal_assignment_level(&self, literal: Literal) -> u32 {
        self.get_variable_assignment_level(literal.get_variable())
    }

    pub fn get_variable_reason(&self, variable: Variable) -> ConstraintReference {
        match self.assignment_info[variable] {
            AssignmentInfo::Unassigned => {
                panic!("Unassigned variables do not have reasons");
            }
            AssignmentInfo::Assigned { reason, .. } => reason,
        }
    }

    pub fn get_literal_reason(&self, literal: Literal) -> ConstraintReference {
        self.get_variable_reason(literal.get_variable())
    }

    fn make_assignment(
        &mut self,
        true_literal: Literal,
        reason: ConstraintReference,
    ) -> Option<ConflictInfo> {
        if self.is_literal_assigned_false(true_literal) {
            return Some(ConflictInfo::Propagation {
                literal: true_literal,
                reference: reason,
            });
        } else if self.is_literal_assigned_true(true_literal) {
            // This can happen when e.g. an incoming shared clause repeats a propagation that has
            // already been made.
            return None;
        }

        self.assignment_info[true_literal.get_variable()] = AssignmentInfo::Assigned {
            truth_value: true_literal.is_positive(),
            decision_level: self.get_decision_level(),
            reason,
        };

        self.trail.push(true_literal);

        None
    }

    pub fn enqueue_decision_literal(&mut self, decision_literal: Literal) {
        ember_assert_simple!(!self.is_literal_assigned(decision_literal));

        let _ = self.make_assignment(decision_literal, ConstraintReference::NULL);
    }

    pub fn enqueue_propagated_literal(
        &mut self,
        propagated_literal: Literal,
        reason: ConstraintReference,
    ) -> Option<ConflictInfo> {
        ember_assert_simple!(!reason.is_null());
        self.make_assignment(propagated_literal, reason)
    }

    /// This iterator returns the literals on the trail in _reverse_ order (LIFO)
    pub fn synchronise(&mut self, new_decision_level: u32) -> impl Iterator<Item = Literal> + '_ {
        ember_assert_simple!(new_decision_level < self.get_decision_level());
        self.trail.synchronise(new_decision_level).inspect(|entry| {
            let variable = entry.get_variable();

            self.assignment_info[variable] = AssignmentInfo::Unassigned;
        })
    }

    pub fn is_at_the_root_level(&self) -> bool {
        self.get_decision_level() == 0
    }
}

#[derive(PartialEq, Clone, Copy, Default, Debug)]
enum AssignmentInfo {
    Assigned {
        truth_value: bool,
        decision_level: u32,
        reason: ConstraintReference,
    },
    #[default]
    Unassigned,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::ClauseReference;

    fn assignments_with_variables(num_variables: u32) -> Assignments {
        let mut assignments = Assignments::default();
        for _ in 0..num_variables {
            assignments.grow();
        }
        assignments
    }

    #[test]
    fn already_assigned_literal_does_not_override_assignment_info() {
        let mut assignments = assignments_with_variables(1);
        let literal = Literal::new(Variable::new(0), true);

        let first_reason: ConstraintReference =
            ClauseReference::create_allocated_clause_reference(1).into();
        let result = assignments.enqueue_propagated_literal(literal, first_reason);
        assert!(result.is_none());
        assert_eq!(assignments.num_trail_entries(), 1);

        // Re-assigning a literal which is already true does not result in the info being
        // overwritten
        let second_reason: ConstraintReference =
            ClauseReference::create_allocated_clause_reference(2).into();
        let result_reassignment = assignments.enqueue_propagated_literal(literal, second_reason);
        assert!(result_reassignment.is_none());
        // Nor does it result in anything being added to the trail
        assert_eq!(assignments.num_trail_entries(), 1);
        assert_eq!(assignments.get_literal_reason(literal), first_reason);
    }

    #[test]
    fn enqueueing_a_falsified_literal_reports_the_conflict() {
        let mut assignments = assignments_with_variables(1);
        let literal = Literal::new(Variable::new(0), true);

        assignments.enqueue_decision_literal(literal);

        let reason: ConstraintReference =
            ClauseReference::create_allocated_clause_reference(1).into();
        let conflict = assignments.enqueue_propagated_literal(!literal, reason);
        assert_eq!(
            conflict,
            Some(ConflictInfo::Propagation {
                literal: !literal,
                reference: reason,
            })
        );
    }

    #[test]
    fn synchronise_unassigns_in_reverse_trail_order() {
        let mut assignments = assignments_with_variables(3);
        let a = Literal::new(Variable::new(0), true);
        let b = Literal::new(Variable::new(1), false);
        let c = Literal::new(Variable::new(2), true);

        assignments.enqueue_decision_literal(a);
        assignments.increase_decision_level();
        assignments.enqueue_decision_literal(b);
        assignments.increase_decision_level();
        assignments.enqueue_decision_literal(c);

        let unassigned: Vec<Literal> = assignments.synchronise(0).collect();
        assert_eq!(unassigned, vec![c, b]);
        assert!(assignments.is_literal_assigned_true(a));
        assert!(assignments.is_literal_unassigned(b));
        assert!(assignments.is_literal_unassigned(c));
    }
}

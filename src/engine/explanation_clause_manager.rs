use crate::basic_types::ClauseReference;
use crate::basic_types::ConflictInfo;
use crate::basic_types::Literal;
use crate::ember_assert_moderate;
use crate::engine::Assignments;
use crate::engine::ClauseAllocator;
use crate::propagators::XorPropagator;

/// Materialises temporary clauses during conflict analysis for reasons that
/// are not allocated clauses: virtual binary clauses and xor rows. The
/// explanation clauses are deleted as soon as analysis completes.
#[derive(Default, Debug)]
pub struct ExplanationClauseManager {
    explanation_clauses: Vec<ClauseReference>,
}

impl ExplanationClauseManager {
    pub fn is_empty(&self) -> bool {
        self.explanation_clauses.is_empty()
    }

    pub fn add_explanation_clause_unchecked(
        &mut self,
        explanation_literals: Vec<Literal>,
        clause_allocator: &mut ClauseAllocator,
    ) -> ClauseReference {
        ember_assert_moderate!(explanation_literals.len() >= 2);

        let clause_reference = clause_allocator.create_clause(explanation_literals, false);
        self.explanation_clauses.push(clause_reference);

        clause_reference
    }

    /// The clause that caused the propagation of the given literal, with the
    /// propagated literal in first position. For virtual binary clauses and
    /// xor rows the clause is materialised on the spot.
    pub fn reason_clause_reference(
        &mut self,
        propagated_literal: Literal,
        assignments: &Assignments,
        xor_propagator: &XorPropagator,
        clause_allocator: &mut ClauseAllocator,
    ) -> ClauseReference {
        let reason = assignments.get_literal_reason(propagated_literal);
        ember_assert_moderate!(!reason.is_null());

        let clause_reference: ClauseReference = reason.into();
        if clause_reference.is_allocated_clause() {
            //the clause already exists in the clause allocator, simply return the reference
            ember_assert_moderate!(
                clause_allocator.get_clause(clause_reference)[0] == propagated_literal
            );
            clause_reference
        } else if clause_reference.is_virtual_binary_clause() {
            //create the explanation clause for the virtual binary clause, effectively
            //temporarily creating the clause in memory during conflict analysis
            self.add_explanation_clause_unchecked(
                vec![
                    propagated_literal, //important to have the propagated literal at position 0
                    clause_reference.get_virtual_binary_clause_literal(),
                ],
                clause_allocator,
            )
        } else {
            let explanation = xor_propagator.explain_propagation(
                clause_reference.get_xor_row_id(),
                propagated_literal,
                assignments,
            );
            self.add_explanation_clause_unchecked(explanation, clause_allocator)
        }
    }

    /// The falsified clause corresponding to a reported conflict; every
    /// literal of the returned clause is assigned false.
    pub fn conflict_clause_reference(
        &mut self,
        conflict_info: ConflictInfo,
        assignments: &Assignments,
        xor_propagator: &XorPropagator,
        clause_allocator: &mut ClauseAllocator,
    ) -> ClauseReference {
        match conflict_info {
            ConflictInfo::StandardClause { clause_reference } => clause_reference,
            ConflictInfo::VirtualBinaryClause { lit1, lit2 } => {
                self.add_explanation_clause_unchecked(vec![lit1, lit2], clause_allocator)
            }
            ConflictInfo::XorRow { row_id } => {
                let explanation = xor_propagator.explain_conflict(row_id, assignments);
                self.add_explanation_clause_unchecked(explanation, clause_allocator)
            }
            ConflictInfo::Propagation { literal, reference } => {
                let clause_reference: ClauseReference = reference.into();
                if clause_reference.is_allocated_clause() {
                    clause_reference
                } else if clause_reference.is_virtual_binary_clause() {
                    self.add_explanation_clause_unchecked(
                        vec![
                            literal,
                            clause_reference.get_virtual_binary_clause_literal(),
                        ],
                        clause_allocator,
                    )
                } else {
                    let explanation = xor_propagator
                        .explain_conflict(clause_reference.get_xor_row_id(), assignments);
                    self.add_explanation_clause_unchecked(explanation, clause_allocator)
                }
            }
        }
    }

    pub fn clean_up_explanation_clauses(&mut self, clause_allocator: &mut ClauseAllocator) {
        // the idea is to delete clauses in reverse order
        //  so that in the future, when we implement manual memory management, we can simply skip
        // large blocks of memory without inspection
        for clause_reference in self.explanation_clauses.iter().rev() {
            clause_allocator.delete_clause(*clause_reference);
        }
        self.explanation_clauses.clear();
    }
}

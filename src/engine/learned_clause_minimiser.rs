use std::collections::HashMap;
use std::collections::HashSet;

use crate::basic_types::Literal;
use crate::ember_assert_moderate;
use crate::ember_assert_simple;
use crate::engine::Assignments;
use crate::engine::ClauseAllocator;
use crate::engine::ConflictAnalysisResult;
use crate::engine::ExplanationClauseManager;
use crate::propagators::ClausalPropagator;
use crate::propagators::XorPropagator;

#[derive(Default)]
pub struct LearnedClauseMinimiser {
    current_depth: usize,
    allowed_decision_levels: HashSet<u32>, //could consider direct hashing here
    label_assignments: HashMap<Literal, Option<Label>>,
    num_minimisation_calls: usize,
    num_literals_removed_total: usize,
    num_literals_seen_total: usize,
}

impl LearnedClauseMinimiser {
    /// Removes literals that are dominated in the implication graph from the
    /// learned clause. A literal is dominated if a subset of the other
    /// literals in the learned clause imply it, making it redundant. The
    /// asserting literal at position zero is never removed.
    ///
    /// The implementation is based on the algorithms from the papers:
    ///   "Improved conflict-clause minimization leads to improved propositional proof traces",
    ///   Allen Van Gelder, SAT'09
    ///   "Minimizing learned clauses", Niklas Sörensson and Armin Biere, SAT'09
    pub fn remove_dominated_literals(
        &mut self,
        analysis_result: &mut ConflictAnalysisResult,
        assignments: &Assignments,
        xor_propagator: &XorPropagator,
        explanation_clause_manager: &mut ExplanationClauseManager,
        clause_allocator: &mut ClauseAllocator,
    ) {
        self.num_minimisation_calls += 1;
        self.num_literals_seen_total += analysis_result.learned_literals.len();
        let num_literals_before_minimisation = analysis_result.learned_literals.len();

        self.initialise(analysis_result, assignments);

        //iterate over each literal and check whether it is a dominated literal
        let mut end_position: usize = 1; //the asserting literal must stay, so we skip it
        for i in 1..analysis_result.learned_literals.len() {
            let learned_literal = analysis_result.learned_literals[i];

            self.compute_label(
                !learned_literal,
                assignments,
                xor_propagator,
                explanation_clause_manager,
                clause_allocator,
            );

            let label = self.get_literal_label(!learned_literal);
            //keep the literal in case it was not deemed redundant
            //  note that in other cases, since 'end_position' is not incremented, the literal is
            //  effectively removed
            if label == Label::Poison || label == Label::Keep {
                analysis_result.learned_literals[end_position] = learned_literal;
                end_position += 1;
                //ensure that the literal at position 1 is at the highest level
                //  this is an important invariant for the conflict analysis result
                let literal_at_index_1 = analysis_result.learned_literals[1];
                if assignments.get_literal_assignment_level(literal_at_index_1)
                    < assignments.get_literal_assignment_level(learned_literal)
                {
                    //notice the minus one, since end_position was already incremented above
                    analysis_result.learned_literals.swap(1, end_position - 1);
                }
            }
        }
        analysis_result.learned_literals.truncate(end_position);

        self.clean_up();

        let num_literals_removed =
            num_literals_before_minimisation - analysis_result.learned_literals.len();
        self.num_literals_removed_total += num_literals_removed;
    }

    fn compute_label(
        &mut self,
        input_literal: Literal,
        assignments: &Assignments,
        xor_propagator: &XorPropagator,
        explanation_clause_manager: &mut ExplanationClauseManager,
        clause_allocator: &mut ClauseAllocator,
    ) {
        ember_assert_moderate!(assignments.is_literal_assigned_true(input_literal));

        self.current_depth += 1;

        if self.is_literal_label_already_computed(input_literal) {
            self.current_depth -= 1;
            return;
        }

        //for performance reasons we stop the analysis if we need too many recursive calls
        if self.is_at_max_allowed_depth() {
            self.assign_literal_label(input_literal, Label::Poison);
            self.current_depth -= 1;
            return;
        }

        //at this point the literal is either SEEN ('present') or unlabelled
        //if the literal is a decision literal, it cannot be a literal from the original learned
        //clause since those are labelled as part of initialisation
        //therefore the decision literal is labelled as poison and then return
        if assignments.is_literal_decision(input_literal) {
            self.assign_literal_label(input_literal, Label::Poison);
            self.current_depth -= 1;
            return;
        }

        //a literal that is not part of the allowed decision levels (levels from the original
        //learned clause) cannot be removed
        if !self
            .allowed_decision_levels
            .contains(&assignments.get_literal_assignment_level(input_literal))
        {
            self.assign_literal_label(input_literal, Label::Poison);
            self.current_depth -= 1;
            return;
        }

        let reason_reference = explanation_clause_manager.reason_clause_reference(
            input_literal,
            assignments,
            xor_propagator,
            clause_allocator,
        );

        for i in 1..clause_allocator.get_clause(reason_reference).len() {
            let antecedent_literal = !clause_allocator.get_clause(reason_reference)[i];

            //root assignments can be safely ignored
            if assignments.is_literal_root_assignment(antecedent_literal) {
                continue;
            }

            //compute the label of the antecedent literal
            self.compute_label(
                antecedent_literal,
                assignments,
                xor_propagator,
                explanation_clause_manager,
                clause_allocator,
            );

            //in case one of the antecedents is Poison, the input literal is not deemed redundant
            if self.get_literal_label(antecedent_literal) == Label::Poison {
                //if the input literal is part of the original learned clause, it is labelled Keep
                if self.is_literal_assigned_seen(input_literal) {
                    self.assign_literal_label(input_literal, Label::Keep);
                    self.current_depth -= 1;
                    return;
                }
                //otherwise it is not part of the original learned clause, so it cannot be Keep
                //but is labelled Poison instead
                else {
                    self.assign_literal_label(input_literal, Label::Poison);
                    self.current_depth -= 1;
                    return;
                }
            }
        }
        //all antecedents of the literal are either Keep or Removable, meaning this literal is
        //Removable
        self.assign_literal_label(input_literal, Label::Removable);
        self.current_depth -= 1;
    }

    fn is_literal_assigned_seen(&self, literal: Literal) -> bool {
        let entry = self.label_assignments.get(&literal);
        if let Some(label) = entry {
            label.expect("Stored label is None, error?") == Label::Seen
        } else {
            false
        }
    }

    fn get_literal_label(&self, literal: Literal) -> Label {
        self.label_assignments
            .get(&literal)
            .expect("Cannot ask for a label of an unlabelled literal?")
            .expect("Stored label is None, error?")
    }

    fn assign_literal_label(&mut self, literal: Literal, label: Label) {
        ember_assert_moderate!(
            !self.label_assignments.contains_key(&literal)
                || self.is_literal_assigned_seen(literal),
            "Cannot assign the label of an already labelled literal"
        );
        let _ = self.label_assignments.insert(literal, Some(label));
    }

    fn is_literal_label_already_computed(&self, literal: Literal) -> bool {
        let entry = self.label_assignments.get(&literal);
        if let Some(label) = entry {
            label.expect("Stored label is None, error?") != Label::Seen
        } else {
            false
        }
    }

    fn initialise(&mut self, analysis_result: &ConflictAnalysisResult, assignments: &Assignments) {
        ember_assert_simple!(self.current_depth == 0);

        //mark literals from the initial learned clause
        //   the asserting literal is always kept
        let _ = self
            .label_assignments
            .insert(analysis_result.learned_literals[0], Some(Label::Keep));
        //  go through the other literals
        for i in 1..analysis_result.learned_literals.len() {
            let literal = !analysis_result.learned_literals[i];
            //decision literals must be kept
            if assignments.is_literal_decision(literal) {
                self.assign_literal_label(literal, Label::Keep);
            } else {
                self.assign_literal_label(literal, Label::Seen);
            }

            let _ = self
                .allowed_decision_levels
                .insert(assignments.get_literal_assignment_level(literal));
        }
    }

    fn clean_up(&mut self) {
        ember_assert_simple!(self.current_depth == 0);

        self.allowed_decision_levels.clear();
        self.label_assignments.clear();
    }

    fn is_at_max_allowed_depth(&self) -> bool {
        ember_assert_moderate!(self.current_depth <= 500);
        self.current_depth == 500
    }

    /// Removes literals implied by a binary clause over the asserting
    /// literal: when a binary clause `(L[0] v q)` exists and `~q` occurs in
    /// the learned clause, resolving the two clauses removes `~q`.
    pub fn remove_binary_implied_literals(
        &mut self,
        analysis_result: &mut ConflictAnalysisResult,
        assignments: &Assignments,
        clausal_propagator: &ClausalPropagator,
    ) {
        if analysis_result.learned_literals.len() <= 2 {
            return;
        }

        let asserting_literal = analysis_result.learned_literals[0];

        let marked: HashSet<Literal> = analysis_result.learned_literals[1..]
            .iter()
            .map(|&lit| !lit)
            .collect();

        let mut implied: HashSet<Literal> = HashSet::new();
        for other_literal in clausal_propagator.binary_clause_other_literals(asserting_literal) {
            //the binary clause is (asserting v other); when 'other' is the negation of a learned
            //literal (hence currently true), the learned literal is redundant
            if assignments.is_literal_assigned_true(other_literal)
                && marked.contains(&other_literal)
            {
                let _ = implied.insert(other_literal);
            }
        }

        if implied.is_empty() {
            return;
        }

        let num_literals_before = analysis_result.learned_literals.len();
        analysis_result
            .learned_literals
            .retain(|&lit| lit == asserting_literal || !implied.contains(&!lit));
        self.num_literals_removed_total +=
            num_literals_before - analysis_result.learned_literals.len();

        //restore the invariant that position 1 holds a literal of the highest level
        if analysis_result.learned_literals.len() > 2 {
            let mut highest_index = 1;
            let mut highest_level = assignments
                .get_literal_assignment_level(analysis_result.learned_literals[1]);
            for i in 2..analysis_result.learned_literals.len() {
                let level = assignments
                    .get_literal_assignment_level(analysis_result.learned_literals[i]);
                if level > highest_level {
                    highest_level = level;
                    highest_index = i;
                }
            }
            analysis_result.learned_literals.swap(1, highest_index);
        }
    }
}

impl LearnedClauseMinimiser {
    pub fn num_literals_removed_total(&self) -> usize {
        self.num_literals_removed_total
    }

    pub fn num_minimisation_calls(&self) -> usize {
        self.num_minimisation_calls
    }

    pub fn percentage_num_removed_literals_per_clause(&self) -> f64 {
        if self.num_literals_seen_total > 0 {
            self.num_literals_removed_total as f64 / self.num_literals_seen_total as f64
        } else {
            0.0
        }
    }
}

#[derive(PartialEq, Copy, Clone)]
enum Label {
    Seen, //'Present'
    Poison,
    Removable,
    Keep,
}

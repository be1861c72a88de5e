use crate::basic_types::ClauseReference;
use crate::basic_types::Literal;
use crate::ember_assert_moderate;
use crate::engine::Assignments;
use crate::engine::ClauseAllocator;
use crate::propagators::ClausalPropagator;

#[derive(Debug, Clone, Copy)]
pub struct LearningOptions {
    pub max_clause_activity: f32,
    pub clause_activity_decay_factor: f32,
    /// Learnt clauses with glue at most this value are kept permanently (tier 0).
    pub glue_put_lev0_if_below_or_eq: u32,
    /// Learnt clauses with glue at most this value (and above the tier-0
    /// threshold) are kept across reductions more aggressively (tier 1).
    pub glue_put_lev1_if_below_or_eq: u32,
    /// The conflict cadence of the tier-1 sweep.
    pub every_lev1_reduce: u64,
    /// The conflict cadence of the tier-2 halving.
    pub every_lev2_reduce: u64,
    /// The initial cap on the number of tier-2 clauses.
    pub max_temp_lev2_learnt_clauses: usize,
    /// The factor by which the tier-2 cap grows after each reduction.
    pub inc_max_temp_lev2_red_cls: f64,
    /// Learnt clauses with glue above this value are dropped at the next
    /// tier-2 reduction when `do_max_glue_del` is set.
    pub max_glue: u32,
    pub do_max_glue_del: bool,
}

impl Default for LearningOptions {
    fn default() -> Self {
        Self {
            max_clause_activity: 1e20,
            clause_activity_decay_factor: 0.99,
            glue_put_lev0_if_below_or_eq: 3,
            glue_put_lev1_if_below_or_eq: 6,
            every_lev1_reduce: 10_000,
            every_lev2_reduce: 1_000,
            max_temp_lev2_learnt_clauses: 30_000,
            inc_max_temp_lev2_red_cls: 1.04,
            max_glue: u32::MAX,
            do_max_glue_del: false,
        }
    }
}

/// The database of learnt clauses, organised in three tiers by glue:
/// tier 0 is kept permanently, tier 1 is swept occasionally and demotes
/// stale clauses, and tier 2 is halved periodically, keeping the clauses of
/// highest activity (ties broken by lower glue). Clauses currently acting as
/// the reason for a trail literal are never removed, and a clause whose glue
/// improves is promoted and protected for one reduction cycle.
pub struct LearnedClauseManager {
    learned_clause_references: Vec<ClauseReference>,
    parameters: LearningOptions,
    clause_bump_increment: f32,
    next_lev1_reduce_at_conflict: u64,
    next_lev2_reduce_at_conflict: u64,
    cur_max_temp_red_lev2_cls: usize,
    num_learned_clauses_removed: u64,
}

impl LearnedClauseManager {
    pub fn new(parameters: LearningOptions) -> Self {
        LearnedClauseManager {
            learned_clause_references: vec![],
            clause_bump_increment: 1.0,
            next_lev1_reduce_at_conflict: parameters.every_lev1_reduce,
            next_lev2_reduce_at_conflict: parameters.every_lev2_reduce,
            cur_max_temp_red_lev2_cls: parameters.max_temp_lev2_learnt_clauses,
            num_learned_clauses_removed: 0,
            parameters,
        }
    }

    pub fn num_learned_clauses(&self) -> usize {
        self.learned_clause_references.len()
    }

    pub fn num_learned_clauses_removed(&self) -> u64 {
        self.num_learned_clauses_removed
    }

    pub fn learned_clause_references(&self) -> &[ClauseReference] {
        &self.learned_clause_references
    }

    /// Adds an asserting learnt clause to the database and enqueues its
    /// asserting literal. The tier is assigned from the glue computed during
    /// conflict analysis.
    pub fn add_learned_clause(
        &mut self,
        learned_clause_literals: Vec<Literal>,
        glue: u32,
        num_conflicts: u64,
        clausal_propagator: &mut ClausalPropagator,
        assignments: &mut Assignments,
        clause_allocator: &mut ClauseAllocator,
    ) -> Option<ClauseReference> {
        let clause_reference = clausal_propagator.add_asserting_learned_clause(
            learned_clause_literals,
            assignments,
            clause_allocator,
        )?;

        self.learned_clause_references.push(clause_reference);

        let clause = clause_allocator.get_mutable_clause(clause_reference);
        if glue < clause.get_lbd() {
            clause.update_lbd(glue);
        }
        clause.set_tier(self.tier_for_glue(glue));
        clause.set_last_touched(num_conflicts);

        Some(clause_reference)
    }

    fn tier_for_glue(&self, glue: u32) -> u8 {
        if glue <= self.parameters.glue_put_lev0_if_below_or_eq {
            0
        } else if glue <= self.parameters.glue_put_lev1_if_below_or_eq {
            1
        } else {
            2
        }
    }

    /// Runs the periodic reductions when their conflict cadences are due or
    /// when tier 2 has outgrown its cap. May only be called at the root.
    pub fn shrink_learned_clause_database_if_needed(
        &mut self,
        num_conflicts: u64,
        assignments: &Assignments,
        clause_allocator: &mut ClauseAllocator,
        clausal_propagator: &mut ClausalPropagator,
    ) {
        ember_assert_moderate!(
            assignments.is_at_the_root_level(),
            "Learned clause reductions can only be done at the root level."
        );

        if num_conflicts >= self.next_lev1_reduce_at_conflict {
            self.sweep_tier1(num_conflicts, assignments, clause_allocator);
            self.next_lev1_reduce_at_conflict = num_conflicts + self.parameters.every_lev1_reduce;
        }

        let num_tier2 = self
            .learned_clause_references
            .iter()
            .filter(|&&reference| clause_allocator.get_clause(reference).get_tier() == 2)
            .count();

        if num_conflicts >= self.next_lev2_reduce_at_conflict
            || num_tier2 > self.cur_max_temp_red_lev2_cls
        {
            self.reduce_tier2(assignments, clause_allocator, clausal_propagator);
            self.next_lev2_reduce_at_conflict = num_conflicts + self.parameters.every_lev2_reduce;
            //grow the cap so that the database is allowed to keep more clauses over time
            self.cur_max_temp_red_lev2_cls = (self.cur_max_temp_red_lev2_cls as f64
                * self.parameters.inc_max_temp_lev2_red_cls)
                as usize;
        }
    }

    /// Demotes tier-1 clauses that have not been touched for a full tier-1
    /// cycle to tier 2. Clauses locked as reasons are left alone.
    fn sweep_tier1(
        &mut self,
        num_conflicts: u64,
        assignments: &Assignments,
        clause_allocator: &mut ClauseAllocator,
    ) {
        let stale_bound = num_conflicts.saturating_sub(self.parameters.every_lev1_reduce);
        for &clause_reference in self.learned_clause_references.iter() {
            let clause = clause_allocator.get_clause(clause_reference);
            if clause.get_tier() != 1 || clause.is_deleted() {
                continue;
            }
            if clause.get_last_touched() >= stale_bound {
                continue;
            }
            if is_clause_locked(clause_reference, assignments, clause_allocator) {
                continue;
            }
            clause_allocator
                .get_mutable_clause(clause_reference)
                .set_tier(2);
        }
    }

    /// Sorts the tier-2 clauses by quality and detaches + deletes the worse
    /// half. Clauses locked as reasons survive; protected clauses spend their
    /// protection instead of being removed.
    fn reduce_tier2(
        &mut self,
        assignments: &Assignments,
        clause_allocator: &mut ClauseAllocator,
        clausal_propagator: &mut ClausalPropagator,
    ) {
        let mut tier2_references: Vec<ClauseReference> = self
            .learned_clause_references
            .iter()
            .copied()
            .filter(|&reference| {
                let clause = clause_allocator.get_clause(reference);
                !clause.is_deleted() && clause.get_tier() == 2
            })
            .collect();

        //sort the learnt clauses so that the clauses of better quality are in the front:
        //higher activity first, ties broken by lower glue
        tier2_references.sort_unstable_by(|&reference1, &reference2| {
            let clause1 = clause_allocator.get_clause(reference1);
            let clause2 = clause_allocator.get_clause(reference2);
            clause2
                .get_activity()
                .partial_cmp(&clause1.get_activity())
                .unwrap()
                .then(clause1.get_lbd().cmp(&clause2.get_lbd()))
        });

        let mut num_clauses_to_remove = tier2_references.len() / 2;
        //note the 'rev', since we give priority to removing poor clauses
        for &clause_reference in tier2_references.iter().rev() {
            let clause = clause_allocator.get_clause(clause_reference);
            let exceeds_max_glue =
                self.parameters.do_max_glue_del && clause.get_lbd() > self.parameters.max_glue;

            if num_clauses_to_remove == 0 && !exceeds_max_glue {
                break;
            }

            if is_clause_locked(clause_reference, assignments, clause_allocator) {
                continue;
            }

            if clause.is_protected_against_deletion() {
                clause_allocator
                    .get_mutable_clause(clause_reference)
                    .clear_protection_against_deletion();
                continue;
            }

            //remove the clause from the watch lists and delete it
            clausal_propagator.remove_clause_from_consideration(
                clause_allocator.get_clause(clause_reference).get_literal_slice(),
                clause_reference,
            );
            let num_literals = clause_allocator.get_clause(clause_reference).len() as u64;
            clausal_propagator.num_learned_clause_literals -= num_literals;
            clause_allocator.delete_clause(clause_reference);

            self.num_learned_clauses_removed += 1;
            num_clauses_to_remove = num_clauses_to_remove.saturating_sub(1);
        }

        self.learned_clause_references
            .retain(|&clause_reference| !clause_allocator.get_clause(clause_reference).is_deleted());
    }

    /// Drops references to clauses deleted by the clause cleaner.
    pub fn retain_live_clauses(&mut self, clause_allocator: &ClauseAllocator) {
        self.learned_clause_references
            .retain(|&reference| !clause_allocator.get_clause(reference).is_deleted());
    }

    /// Recomputes the glue of a learnt clause taking part in conflict
    /// analysis and bumps its activity. On improvement the clause is promoted
    /// towards a better tier and protected for one reduction cycle.
    pub fn update_clause_lbd_and_bump_activity(
        &mut self,
        clause_reference: ClauseReference,
        num_conflicts: u64,
        assignments: &Assignments,
        clause_allocator: &mut ClauseAllocator,
    ) {
        if !clause_allocator.get_clause(clause_reference).is_learned()
            || clause_allocator.get_clause(clause_reference).get_lbd() <= 2
        {
            return;
        }

        self.bump_clause_activity(clause_reference, clause_allocator);
        clause_allocator
            .get_mutable_clause(clause_reference)
            .set_last_touched(num_conflicts);

        let new_lbd = compute_lbd_for_literals(
            clause_allocator.get_clause(clause_reference).get_literal_slice(),
            assignments,
        );
        if new_lbd < clause_allocator.get_clause(clause_reference).get_lbd() {
            let new_tier = self.tier_for_glue(new_lbd);
            let clause = clause_allocator.get_mutable_clause(clause_reference);
            clause.update_lbd(new_lbd);
            clause.mark_protection_against_deletion();
            if new_tier < clause.get_tier() {
                clause.set_tier(new_tier);
            }
        }
    }

    pub fn bump_clause_activity(
        &mut self,
        clause_reference: ClauseReference,
        clause_allocator: &mut ClauseAllocator,
    ) {
        //check if bumping the activity would lead to a large activity value
        if clause_allocator.get_clause(clause_reference).get_activity()
            + self.clause_bump_increment
            > self.parameters.max_clause_activity
        {
            //if so, rescale all activity values
            self.rescale_clause_activities(clause_allocator);
        }
        //at this point, it is safe to increase the activity value
        clause_allocator
            .get_mutable_clause(clause_reference)
            .increase_activity(self.clause_bump_increment);
    }

    pub fn rescale_clause_activities(&mut self, clause_allocator: &mut ClauseAllocator) {
        self.learned_clause_references.iter().for_each(|reference| {
            let clause = clause_allocator.get_mutable_clause(*reference);
            clause.divide_activity(self.parameters.max_clause_activity);
        });
        self.clause_bump_increment /= self.parameters.max_clause_activity;
    }

    pub fn decay_clause_activities(&mut self) {
        self.clause_bump_increment /= self.parameters.clause_activity_decay_factor;
    }
}

/// A clause is locked when it is the reason of the assignment of its first
/// literal; locked clauses cannot be removed from the database.
pub fn is_clause_locked(
    clause_reference: ClauseReference,
    assignments: &Assignments,
    clause_allocator: &ClauseAllocator,
) -> bool {
    let propagated_literal = clause_allocator.get_clause(clause_reference)[0];
    assignments.is_literal_assigned_true(propagated_literal)
        && assignments.is_literal_propagated(propagated_literal)
        && ClauseReference::from(assignments.get_literal_reason(propagated_literal))
            == clause_reference
}

/// The LBD of a set of assigned literals: the number of distinct decision
/// levels among them, not counting the root level.
pub fn compute_lbd_for_literals(literals: &[Literal], assignments: &Assignments) -> u32 {
    ember_assert_moderate!(
        literals
            .iter()
            .all(|lit| assignments.is_literal_assigned(*lit)),
        "Cannot compute the LBD if not all literals are assigned."
    );
    //the LBD is the number of literals at different decision levels
    let mut levels: Vec<u32> = literals
        .iter()
        .map(|lit| assignments.get_literal_assignment_level(*lit))
        .filter(|&level| level > 0)
        .collect();
    levels.sort_unstable();
    levels.dedup();
    levels.len() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Variable;

    struct Setup {
        manager: LearnedClauseManager,
        propagator: ClausalPropagator,
        assignments: Assignments,
        clause_allocator: ClauseAllocator,
    }

    fn lit(index: u32) -> Literal {
        Literal::new(Variable::new(index), true)
    }

    fn setup(num_variables: u32, options: LearningOptions) -> Setup {
        let mut propagator = ClausalPropagator::default();
        let mut assignments = Assignments::default();
        for _ in 0..=num_variables {
            assignments.grow();
            propagator.grow();
        }
        assignments.enqueue_decision_literal(assignments.true_literal);
        Setup {
            manager: LearnedClauseManager::new(options),
            propagator,
            assignments,
            clause_allocator: ClauseAllocator::new(),
        }
    }

    #[test]
    fn tiers_are_assigned_from_glue() {
        let manager = LearnedClauseManager::new(LearningOptions::default());
        assert_eq!(manager.tier_for_glue(2), 0);
        assert_eq!(manager.tier_for_glue(3), 0);
        assert_eq!(manager.tier_for_glue(4), 1);
        assert_eq!(manager.tier_for_glue(6), 1);
        assert_eq!(manager.tier_for_glue(7), 2);
    }

    #[test]
    fn lbd_counts_distinct_nonroot_levels() {
        let mut s = setup(4, LearningOptions::default());
        //level 0: root; levels 1 and 2 carry two and one literals
        s.assignments.enqueue_decision_literal(lit(1));
        s.assignments.increase_decision_level();
        s.assignments.enqueue_decision_literal(lit(2));
        let reason = ClauseReference::create_virtual_binary_clause_reference(lit(2));
        let _ = s
            .assignments
            .enqueue_propagated_literal(lit(3), reason.into());
        s.assignments.increase_decision_level();
        s.assignments.enqueue_decision_literal(lit(4));

        let lbd = compute_lbd_for_literals(&[lit(1), lit(2), lit(3), lit(4)], &s.assignments);
        assert_eq!(lbd, 2);
    }

    #[test]
    fn tier2_reduction_halves_the_temporary_clauses() {
        let options = LearningOptions {
            every_lev2_reduce: 1,
            max_temp_lev2_learnt_clauses: 4,
            ..LearningOptions::default()
        };
        let mut s = setup(40, options);

        //create ten tier-2 learnt clauses at the root with varying activity
        for i in 0..10u32 {
            let literals = vec![lit(3 * i + 1), lit(3 * i + 2), lit(3 * i + 3)];
            let reference = s
                .propagator
                .add_clause_unchecked(literals, true, &mut s.clause_allocator)
                .unwrap();
            s.manager.learned_clause_references.push(reference);
            s.clause_allocator.get_mutable_clause(reference).set_tier(2);
            for _ in 0..i {
                s.manager
                    .bump_clause_activity(reference, &mut s.clause_allocator);
            }
        }

        s.manager.shrink_learned_clause_database_if_needed(
            100,
            &s.assignments,
            &mut s.clause_allocator,
            &mut s.propagator,
        );

        assert_eq!(s.manager.num_learned_clauses(), 5);
        assert_eq!(s.manager.num_learned_clauses_removed(), 5);
        //the surviving clauses are the ones with the highest activity
        assert!(s
            .manager
            .learned_clause_references()
            .iter()
            .all(|&reference| s.clause_allocator.get_clause(reference).get_activity() >= 5.0));
    }

    #[test]
    fn protected_clauses_survive_one_reduction() {
        let options = LearningOptions {
            every_lev2_reduce: 1,
            ..LearningOptions::default()
        };
        let mut s = setup(40, options);

        let mut references = vec![];
        for i in 0..4u32 {
            let literals = vec![lit(3 * i + 1), lit(3 * i + 2), lit(3 * i + 3)];
            let reference = s
                .propagator
                .add_clause_unchecked(literals, true, &mut s.clause_allocator)
                .unwrap();
            s.manager.learned_clause_references.push(reference);
            s.clause_allocator.get_mutable_clause(reference).set_tier(2);
            references.push(reference);
        }
        //the two clauses that would be removed first are protected
        s.clause_allocator
            .get_mutable_clause(references[2])
            .mark_protection_against_deletion();
        s.clause_allocator
            .get_mutable_clause(references[3])
            .mark_protection_against_deletion();

        s.manager.shrink_learned_clause_database_if_needed(
            100,
            &s.assignments,
            &mut s.clause_allocator,
            &mut s.propagator,
        );

        //the unprotected clauses are removed while protection is spent on the others
        assert_eq!(s.manager.num_learned_clauses(), 2);
        assert!(s
            .manager
            .learned_clause_references()
            .contains(&references[2]));
        assert!(s
            .manager
            .learned_clause_references()
            .contains(&references[3]));
        assert!(!s
            .clause_allocator
            .get_clause(references[2])
            .is_protected_against_deletion());
    }

    #[test]
    fn stale_tier1_clauses_are_demoted() {
        let options = LearningOptions {
            every_lev1_reduce: 10,
            every_lev2_reduce: 1_000_000,
            ..LearningOptions::default()
        };
        let mut s = setup(10, options);

        let reference = s
            .propagator
            .add_clause_unchecked(vec![lit(1), lit(2), lit(3)], true, &mut s.clause_allocator)
            .unwrap();
        s.manager.learned_clause_references.push(reference);
        let clause = s.clause_allocator.get_mutable_clause(reference);
        clause.set_tier(1);
        clause.set_last_touched(0);

        s.manager.shrink_learned_clause_database_if_needed(
            100,
            &s.assignments,
            &mut s.clause_allocator,
            &mut s.propagator,
        );

        assert_eq!(s.clause_allocator.get_clause(reference).get_tier(), 2);
    }
}

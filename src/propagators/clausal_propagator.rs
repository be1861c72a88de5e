use log::warn;

use crate::basic_types::ClauseReference;
use crate::basic_types::ConflictInfo;
use crate::basic_types::ConstraintOperationError;
use crate::basic_types::Literal;
use crate::ember_assert_moderate;
use crate::ember_assert_simple;
use crate::engine::Assignments;
use crate::engine::ClauseAllocator;
use crate::engine::Preprocessor;

/// Boolean constraint propagation with the two-watched-literal scheme. Binary
/// clauses are not allocated, they are inlined in the watch lists as virtual
/// binary clauses; long clauses are watched through (reference, cached
/// literal) pairs where the cached literal serves as a blocker.
#[derive(Default)]
pub struct ClausalPropagator {
    pub(crate) watch_lists: Vec<Vec<ClauseWatcher>>,
    pub(crate) next_position_on_trail_to_propagate: usize,
    permanent_clause_references: Vec<ClauseReference>,
    is_in_infeasible_state: bool,
    /// Literal counts over attached long clauses, maintained together with
    /// the clause cleaner.
    pub(crate) num_clause_literals: u64,
    pub(crate) num_learned_clause_literals: u64,
    pub(crate) num_binary_clauses: u64,
}

impl ClausalPropagator {
    pub fn grow(&mut self) {
        //increase the watch list, once for each polarity
        self.watch_lists.push(vec![]);
        self.watch_lists.push(vec![]);
    }

    pub fn permanent_clause_references(&self) -> &[ClauseReference] {
        &self.permanent_clause_references
    }

    pub fn add_permanent_clause(
        &mut self,
        literals: Vec<Literal>,
        assignments: &mut Assignments,
        clause_allocator: &mut ClauseAllocator,
    ) -> Result<(), ConstraintOperationError> {
        ember_assert_simple!(assignments.is_at_the_root_level());
        ember_assert_simple!(!self.is_in_infeasible_state);

        if literals.is_empty() {
            warn!("Adding empty clause, unusual!");
        }

        let literals = Preprocessor::preprocess_clause(literals, assignments);

        //infeasible at the root? Note that we do not add the original clause to the database in
        //this case
        if literals.is_empty() {
            self.is_in_infeasible_state = true;
            return Err(ConstraintOperationError::InfeasibleClause);
        }

        //unit clauses are added as root assignments, rather than as actual clauses
        //	in case the clause is satisfied at the root, the preprocessing returns a unit clause
        //  with a literal that is satisfied at the root
        if literals.len() == 1 {
            if assignments.is_literal_assigned_false(literals[0]) {
                self.is_in_infeasible_state = true;
                return Err(ConstraintOperationError::InfeasibleClause);
            } else if assignments.is_literal_unassigned(literals[0]) {
                assignments.enqueue_decision_literal(literals[0]);
                let outcome = self.propagate(assignments, clause_allocator);
                if outcome.is_err() {
                    self.is_in_infeasible_state = true;
                    return Err(ConstraintOperationError::InfeasibleClause);
                }
            }
        } else {
            //standard case - the clause has at least two unassigned literals
            let _ = self.add_clause_unchecked(literals, false, clause_allocator);
        }

        Ok(())
    }

    /// Adds a learned clause with the asserting literal in first position and
    /// enqueues the asserting literal with the clause as its reason.
    pub fn add_asserting_learned_clause(
        &mut self,
        literals: Vec<Literal>,
        assignments: &mut Assignments,
        clause_allocator: &mut ClauseAllocator,
    ) -> Option<ClauseReference> {
        let asserting_literal = literals[0];
        // binary clause - these have special treatment and are stored directly in the watch lists
        if literals.len() == 2 {
            let second_literal = literals[1];
            let _ = self.add_clause_unchecked(literals, true, clause_allocator);
            let _ = assignments.enqueue_propagated_literal(
                asserting_literal,
                ClauseReference::create_virtual_binary_clause_reference(second_literal).into(),
            );
            None
        }
        // standard clause
        else {
            let clause_reference = self
                .add_clause_unchecked(literals, true, clause_allocator)
                .expect("Allocating a long learned clause cannot fail");
            let _ = assignments
                .enqueue_propagated_literal(asserting_literal, clause_reference.into());
            Some(clause_reference)
        }
    }

    pub fn add_clause_unchecked(
        &mut self,
        literals: Vec<Literal>,
        is_learned: bool,
        clause_allocator: &mut ClauseAllocator,
    ) -> Option<ClauseReference> {
        ember_assert_moderate!(literals.len() >= 2);
        ember_assert_simple!(!self.is_in_infeasible_state);

        //binary clauses have special treatment
        //  they are not allocated in memory with other clauses but instead inlined in the watch
        //  list of the clausal propagator
        if literals.len() == 2 {
            self.start_watching_binary_clause_unchecked(literals[0], literals[1], is_learned);
            None
        }
        //otherwise standard clause allocation takes place
        else {
            if is_learned {
                self.num_learned_clause_literals += literals.len() as u64;
            } else {
                self.num_clause_literals += literals.len() as u64;
            }

            let clause_reference = clause_allocator.create_clause(literals, is_learned);
            let clause = clause_allocator.get_clause(clause_reference);

            if !is_learned {
                self.permanent_clause_references.push(clause_reference);
            }
            self.start_watching_clause_unchecked(clause.get_literal_slice(), clause_reference);

            Some(clause_reference)
        }
    }

    pub fn add_permanent_implication_unchecked(&mut self, lhs: Literal, rhs: Literal) {
        self.start_watching_binary_clause_unchecked(!lhs, rhs, false);
    }

    pub fn propagate(
        &mut self,
        assignments: &mut Assignments,
        clause_allocator: &mut ClauseAllocator,
    ) -> Result<(), ConflictInfo> {
        ember_assert_simple!(!self.is_in_infeasible_state);
        //this function is implemented as one long function
        //  dividing it into smaller functions would normally make sense for readability
        //  however this is a performance hotspot, so the function is kept as a single unit
        while self.next_position_on_trail_to_propagate < assignments.trail.len() {
            let true_literal = assignments.trail[self.next_position_on_trail_to_propagate];
            ember_assert_simple!(assignments.is_literal_assigned_true(true_literal));

            //effectively remove all watches from this true_literal
            //then go through the previous watches one by one and insert them as indicated (some
            //might be placed back in the watch list of this true_literal)
            //if a conflict takes place, put back the remaining clauses into the watch list of this
            //true_literal and report the conflict
            //empty watch lists are immediately skipped
            if self.watch_lists[!true_literal].is_empty() {
                self.next_position_on_trail_to_propagate += 1;
                continue;
            }

            //effectively, we are resizing the watch list to size zero for this literal
            //  and in the loop we will add some of the old watches back
            let mut end_index: usize = 0;
            let mut current_index: usize = 0;
            while current_index < self.watch_lists[!true_literal].len() {
                //inspect if the cached literal is already set to true
                //if so, no need to go further in memory to check the clause
                //often this literal will be true in practice so it is a good heuristic to check
                let cached_literal = self.watch_lists[!true_literal][current_index].cached_literal;
                if assignments.is_literal_assigned_true(cached_literal) {
                    //keep the watcher, the clause is satisfied, no propagation can take place
                    self.watch_lists[!true_literal][end_index] =
                        self.watch_lists[!true_literal][current_index];
                    current_index += 1;
                    end_index += 1;
                    continue;
                }

                let watched_clause_reference =
                    self.watch_lists[!true_literal][current_index].clause_reference;

                //first check whether the watcher is a binary clause
                //  binary clauses are handled in a special way, i.e., they are inlined in the
                //  watch list instead of being allocated
                if watched_clause_reference.is_virtual_binary_clause() {
                    //the cached literal contains the other literal from the watched clause
                    //  since the cached literal is not assigned true (see code above)
                    //  we only need to check if the cached literal is unassigned (propagate) or
                    //  false (conflict)

                    //propagate
                    if assignments.is_literal_unassigned(cached_literal) {
                        let _ = assignments.enqueue_propagated_literal(
                            cached_literal,
                            ClauseReference::create_virtual_binary_clause_reference(
                                !true_literal,
                            )
                            .into(),
                        );
                        //keep the watcher
                        self.watch_lists[!true_literal][end_index] =
                            self.watch_lists[!true_literal][current_index];
                        current_index += 1;
                        end_index += 1;
                        //continue to the next watcher
                        continue;
                    //conflict
                    } else {
                        ember_assert_moderate!(
                            assignments.is_literal_assigned_false(cached_literal)
                        );
                        //stop any further propagation and report the conflict
                        //readd this watcher and other remaining watchers to the watch list
                        while current_index < self.watch_lists[!true_literal].len() {
                            self.watch_lists[!true_literal][end_index] =
                                self.watch_lists[!true_literal][current_index];
                            current_index += 1;
                            end_index += 1;
                        }
                        self.watch_lists[!true_literal].truncate(end_index);
                        return Err(ConflictInfo::VirtualBinaryClause {
                            lit1: cached_literal,
                            lit2: !true_literal,
                        });
                    }
                }

                let watched_clause = clause_allocator.get_mutable_clause(watched_clause_reference);

                //standard clause propagation starts here

                //place the considered literal at position 1 for simplicity
                if watched_clause[0] == !true_literal {
                    watched_clause[0] = watched_clause[1];
                    watched_clause[1] = !true_literal;
                }

                //check the other watched literal to see if the clause is already satisfied
                if assignments.is_literal_assigned_true(watched_clause[0]) {
                    //take the true literal as the new cached literal
                    self.watch_lists[!true_literal][current_index].cached_literal =
                        watched_clause[0];
                    //keep the watcher, the clause is satisfied, no propagation can take place
                    self.watch_lists[!true_literal][end_index] =
                        self.watch_lists[!true_literal][current_index];
                    current_index += 1;
                    end_index += 1;
                    continue;
                }

                //look for another nonfalsified literal to replace one of the watched literals
                let mut found_new_watch = false;
                //start from index 2 since we are skipping watched literals
                for i in 2..watched_clause.len() {
                    //find a literal that is either true or unassigned, i.e., not assigned false
                    if !assignments.is_literal_assigned_false(watched_clause[i]) {
                        //replace the watched literal and add the clause to the watch list of the
                        //new watcher literal
                        watched_clause[1] = watched_clause[i];
                        watched_clause[i] = !true_literal;

                        self.watch_lists[watched_clause[1]].push(ClauseWatcher {
                            cached_literal: watched_clause[0],
                            clause_reference: watched_clause_reference,
                            is_learned_binary: false,
                        });

                        found_new_watch = true;
                        break; //no propagation is taking place, go to the next clause
                    }
                }

                if found_new_watch {
                    //note this clause is effectively removed from the watch list of true_literal,
                    //since we are only incrementing the current index, and not copying anything to
                    //the end_index location
                    current_index += 1;
                    continue;
                }

                //keep the current watch for this literal
                self.watch_lists[!true_literal][end_index] =
                    self.watch_lists[!true_literal][current_index];
                end_index += 1;
                current_index += 1;

                //at this point, nonwatched literals and literal[1] are assigned false. There are
                //two scenarios:
                //	watched_clause[0] is unassigned -> propagate the literal to true
                //	watched_clause[0] is assigned false -> conflict

                //can propagate?
                if assignments.is_literal_unassigned(watched_clause[0]) {
                    let propagated_literal = watched_clause[0];
                    let _ = assignments.enqueue_propagated_literal(
                        propagated_literal,
                        watched_clause_reference.into(),
                    );
                } else {
                    //conflict detected, stop any further propagation and report the conflict
                    //readd the remaining watchers to the watch list
                    while current_index < self.watch_lists[!true_literal].len() {
                        self.watch_lists[!true_literal][end_index] =
                            self.watch_lists[!true_literal][current_index];
                        current_index += 1;
                        end_index += 1;
                    }
                    self.watch_lists[!true_literal].truncate(end_index);
                    return Err(ConflictInfo::StandardClause {
                        clause_reference: watched_clause_reference,
                    });
                }
            }
            self.watch_lists[!true_literal].truncate(end_index);
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

    pub fn remove_clause_from_consideration(
        &mut self,
        clause: &[Literal],
        clause_reference: ClauseReference,
    ) {
        //for now a simple implementation, in the future it could be worthwhile considering lazy
        //data structures or batch removals
        let remove_clause_from_watchers =
            |watchers: &mut Vec<ClauseWatcher>, clause_reference: ClauseReference| {
                let index = watchers
                    .iter()
                    .position(|x| x.clause_reference == clause_reference)
                    .expect("Detaching a clause that is not being watched");
                let _ = watchers.swap_remove(index);
            };

        let watched_literal1 = clause[0];
        let watched_literal2 = clause[1];

        remove_clause_from_watchers(&mut self.watch_lists[watched_literal1], clause_reference);
        remove_clause_from_watchers(&mut self.watch_lists[watched_literal2], clause_reference);
    }

    /// The literals `q` such that the binary clause `(literal v q)` is
    /// present, i.e., such that `~literal` implies `q`.
    pub fn binary_clause_other_literals(
        &self,
        literal: Literal,
    ) -> impl Iterator<Item = Literal> + '_ {
        self.watch_lists[literal]
            .iter()
            .filter(|watcher| watcher.clause_reference.is_virtual_binary_clause())
            .map(|watcher| watcher.cached_literal)
    }

    /// Iterates over all inline binary clauses as literal pairs, each clause
    /// reported once, together with its learned flag.
    pub fn binary_clauses(&self) -> impl Iterator<Item = (Literal, Literal, bool)> + '_ {
        self.watch_lists
            .iter()
            .enumerate()
            .flat_map(|(literal_code, watchers)| {
                let literal = Literal::u32_to_literal(literal_code as u32);
                watchers
                    .iter()
                    .filter(move |watcher| {
                        watcher.clause_reference.is_virtual_binary_clause()
                            && watcher.cached_literal.to_u32() > literal.to_u32()
                    })
                    .map(move |watcher| {
                        (literal, watcher.cached_literal, watcher.is_learned_binary)
                    })
            })
    }

    pub fn contains_binary_clause(&self, lit1: Literal, lit2: Literal) -> bool {
        self.watch_lists[lit1].iter().any(|watcher| {
            watcher.clause_reference.is_virtual_binary_clause()
                && watcher.cached_literal == lit2
        })
    }

    fn start_watching_clause_unchecked(
        &mut self,
        clause: &[Literal],
        clause_reference: ClauseReference,
    ) {
        ember_assert_simple!(clause.len() >= 2);

        self.watch_lists[clause[0]].push(ClauseWatcher {
            cached_literal: clause[1],
            clause_reference,
            is_learned_binary: false,
        });

        self.watch_lists[clause[1]].push(ClauseWatcher {
            cached_literal: clause[0],
            clause_reference,
            is_learned_binary: false,
        });
    }

    pub(crate) fn start_watching_binary_clause_unchecked(
        &mut self,
        lit1: Literal,
        lit2: Literal,
        is_learned: bool,
    ) {
        self.num_binary_clauses += 1;

        self.watch_lists[lit1].push(ClauseWatcher {
            cached_literal: lit2,
            clause_reference: ClauseReference::create_virtual_binary_clause_reference(lit1),
            is_learned_binary: is_learned,
        });

        self.watch_lists[lit2].push(ClauseWatcher {
            cached_literal: lit1,
            clause_reference: ClauseReference::create_virtual_binary_clause_reference(lit2),
            is_learned_binary: is_learned,
        });
    }

    /// Drops references to deleted clauses after a cleaning pass.
    pub(crate) fn retain_live_permanent_clauses(&mut self, clause_allocator: &ClauseAllocator) {
        self.permanent_clause_references
            .retain(|&reference| !clause_allocator.get_clause(reference).is_deleted());
    }

    /// Re-attaches a clause that the clause cleaner shrank while detached.
    pub(crate) fn attach_clause_unchecked(
        &mut self,
        clause: &[Literal],
        clause_reference: ClauseReference,
    ) {
        self.start_watching_clause_unchecked(clause, clause_reference);
    }

    pub fn debug_check_state(
        &self,
        assignments: &Assignments,
        clause_allocator: &ClauseAllocator,
    ) -> bool {
        assert!(
            self.watch_lists.len() as u32 == 2 * assignments.num_variables(),
            "Watch list length is not as expected given the number of variables."
        );

        //check that each allocated clause that appears in the watch list appears exactly twice
        let mut clause_counts: std::collections::HashMap<ClauseReference, usize> =
            std::collections::HashMap::new();
        self.watch_lists
            .iter()
            .flatten()
            .filter(|x| x.clause_reference.is_allocated_clause())
            .for_each(|x| {
                *clause_counts.entry(x.clause_reference).or_insert(0) += 1;
            });
        assert!(
            clause_counts.iter().all(|x| *x.1 == 2),
            "There is a clause in the watch list that does not appear exactly twice."
        );

        //the number of binary clause watchers must be even
        assert!(
            self.watch_lists
                .iter()
                .flatten()
                .filter(|x| x.clause_reference.is_virtual_binary_clause())
                .count()
                % 2
                == 0,
        );

        //the watches of each clause must be its first two literals
        for literal_code in 0..self.watch_lists.len() {
            let literal = Literal::u32_to_literal(literal_code as u32);
            assert!(self.watch_lists[literal]
                .iter()
                .filter(|x| x.clause_reference.is_allocated_clause())
                .all(|x| {
                    let clause = clause_allocator.get_clause(x.clause_reference);
                    clause[0] == literal || clause[1] == literal
                }),
                "There is a clause in the watch list of a literal that is not a watcher of the clause");
        }

        //check if the propagator missed a falsified clause or a propagation
        clause_counts.iter().for_each(|x| {
            let clause = clause_allocator.get_clause(*x.0);
            assert!(
                !clause
                    .get_literal_slice()
                    .iter()
                    .all(|lit| assignments.is_literal_assigned_false(*lit)),
                "Debugging revealed that the clausal propagator missed a falsifying clause."
            );

            let num_falsified_literals = clause
                .get_literal_slice()
                .iter()
                .filter(|lit| assignments.is_literal_assigned_false(**lit))
                .count();

            if num_falsified_literals + 1 == clause.len() as usize {
                let nonfalse_literal = clause
                    .get_literal_slice()
                    .iter()
                    .find(|lit| !assignments.is_literal_assigned_false(**lit));
                assert!(
                    assignments.is_literal_assigned_true(*nonfalse_literal.unwrap()),
                    "Debugging revealed that the clausal propagator missed a propagation."
                );
            }
        });

        true
    }
}

#[derive(Clone, Copy)]
pub struct ClauseWatcher {
    pub(crate) cached_literal: Literal,
    pub(crate) clause_reference: ClauseReference,
    //only meaningful for virtual binary clauses; long clauses carry the flag
    //in the allocated clause itself
    pub(crate) is_learned_binary: bool,
}

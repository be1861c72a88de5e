//! Houses the solver which decides satisfiability of a formula given as a
//! conjunction of disjunctive clauses and parity (xor) constraints, using
//! conflict-driven clause learning.

use std::fs::File;
use std::io::Write;

use log::debug;
use log::warn;
use rand::rngs::SmallRng;
use rand::Rng;
use rand::SeedableRng;

use crate::basic_types::moving_averages::CumulativeMovingAverage;
use crate::basic_types::moving_averages::MovingAverage;
use crate::basic_types::ClauseReference;
use crate::basic_types::ConflictInfo;
use crate::basic_types::ConstraintOperationError;
use crate::basic_types::Literal;
use crate::basic_types::Solution;
use crate::basic_types::SolverExecutionFlag;
use crate::basic_types::Stopwatch;
use crate::basic_types::Variable;
use crate::basic_types::VariableStatus;
use crate::branching::BranchStrategy;
use crate::branching::MapleSelector;
use crate::branching::PolarityMode;
use crate::branching::RandomSelector;
use crate::branching::ValueSelector;
use crate::branching::VariableSelector;
use crate::branching::VsidsSelector;
use crate::ember_assert_moderate;
use crate::ember_assert_simple;
use crate::engine::clause_cleaner::add_equivalence_clauses;
use crate::engine::compute_lbd_for_literals;
use crate::engine::termination::TerminationCondition;
use crate::engine::Assignments;
use crate::engine::ClauseAllocator;
use crate::engine::ClauseCleaner;
use crate::engine::ExplanationClauseManager;
use crate::engine::LearnedClauseManager;
use crate::engine::LearnedClauseMinimiser;
use crate::engine::LearningOptions;
use crate::engine::RestartOptions;
use crate::engine::RestartStrategy;
use crate::engine::SharedClause;
use crate::engine::SharedClausePoolHandle;
use crate::engine::VariableReplacer;
use crate::propagators::ClausalPropagator;
use crate::propagators::XorAdditionOutcome;
use crate::propagators::XorPropagator;
use crate::statistics::statistic_logger::log_statistic;

/// Configuration of the search, grouping the options of the subsystems.
#[derive(Debug)]
pub struct SatOptions {
    pub learning_options: LearningOptions,
    pub restart_options: RestartOptions,
    /// Whether recursive (self-subsuming) learned clause minimisation runs.
    pub learning_clause_minimisation: bool,
    /// Whether binary-implication minimisation of learned clauses runs.
    pub learning_minimise_binary: bool,
    /// When the distance between the conflict level and the backjump level
    /// exceeds this value, the solver backtracks chronologically by a single
    /// level instead. A negative value disables chronological backtracking.
    pub diff_declev_for_chrono: i64,
    /// The fraction of decisions taken uniformly at random.
    pub rnd_var_freq: f64,
    pub polarity_mode: PolarityMode,
    /// The branching strategies the solver rotates among, advancing at each
    /// restart.
    pub branch_strategy_setup: Vec<BranchStrategy>,
    /// The clause cleaner runs once this many new root assignments accumulated.
    pub clean_after_new_root_assignments: u64,
    /// The conflict interval between drains of the shared clause pool.
    pub sync_every_conf: u64,
    /// The solver gives up with an unknown answer after this many restarts.
    pub num_restarts_max: u64,
    /// Learnt clauses are appended to this file in DIMACS form when set.
    pub certificate_file: Option<File>,
    /// The random generator seeded from the configuration, so that runs with
    /// equal seeds and options are deterministic.
    pub random_generator: SmallRng,
}

impl Default for SatOptions {
    fn default() -> Self {
        SatOptions {
            learning_options: LearningOptions::default(),
            restart_options: RestartOptions::default(),
            learning_clause_minimisation: true,
            learning_minimise_binary: true,
            diff_declev_for_chrono: -1,
            rnd_var_freq: 0.0,
            polarity_mode: PolarityMode::default(),
            branch_strategy_setup: vec![BranchStrategy::Vsids],
            clean_after_new_root_assignments: 100,
            sync_every_conf: 6000,
            num_restarts_max: u64::MAX,
            certificate_file: None,
            random_generator: SmallRng::seed_from_u64(42),
        }
    }
}

/// A conflict-driven clause learning SAT solver with parity-constraint
/// support.
///
/// The solver interleaves propagation and branching: the clausal propagator
/// and the xor propagator extend the trail until fixpoint, after which a
/// decision is enqueued. A failed propagation is analysed into a first-UIP
/// learnt clause, the trail is truncated to the backtrack level, and the
/// search continues. The restart strategy periodically cancels all decisions
/// while keeping the learnt clauses and heuristic state; at those quiescent
/// points the learnt database is reduced, root-satisfied clauses are
/// collected, and clauses are exchanged with peer solvers.
///
/// # Example
/// ```
/// # use embersat::engine::SatSolver;
/// # use embersat::engine::termination::Indefinite;
/// # use embersat::basic_types::Literal;
/// # use embersat::basic_types::SolverExecutionFlag;
/// let mut solver = SatSolver::default();
/// let x = Literal::new(solver.new_variable(), true);
/// let y = Literal::new(solver.new_variable(), true);
///
/// let _ = solver.add_clause(vec![x, y]);
/// let _ = solver.add_clause(vec![!x, y]);
///
/// let result = solver.solve(&[], &mut Indefinite);
/// assert_eq!(result, SolverExecutionFlag::Feasible);
/// assert!(solver.get_solution().get_value(y.get_variable()));
/// ```
pub struct SatSolver {
    /// The solver continuously changes states during the search.
    /// The state helps track additional information and contributes to making the code clearer.
    pub(crate) state: SolverState,
    /// Tracks information related to the assignments of variables.
    pub(crate) assignments: Assignments,
    /// Responsible for clausal propagation based on the two-watched scheme.
    clausal_propagator: ClausalPropagator,
    /// Propagates the parity constraints; its rows are watched separately
    /// from the clausal watch lists.
    xor_propagator: XorPropagator,
    /// Tracks information about all allocated clauses. All clause allocation
    /// goes exclusively through the clause allocator. There are two notable
    /// exceptions: unit clauses are stored directly on the trail, and binary
    /// clauses are inlined in the watch lists of the clausal propagator.
    pub(crate) clause_allocator: ClauseAllocator,
    /// Holds temporary explanation clauses for binary and xor reasons during
    /// conflict analysis.
    explanation_clause_manager: ExplanationClauseManager,
    /// Tracks information about the learnt clauses, with the exception of
    /// unit clauses which are directly stored on the trail.
    learned_clause_manager: LearnedClauseManager,
    /// Removes dominated literals from freshly learnt clauses.
    learned_clause_minimiser: LearnedClauseMinimiser,
    /// Tracks information about the restarts. Occasionally the solver will
    /// undo all its decisions and start the search from the root. Note that
    /// learnt clauses and heuristic state are kept after a restart.
    restart_strategy: RestartStrategy,
    /// Collects clauses that became satisfied or shortened at the root.
    clause_cleaner: ClauseCleaner,
    /// Records variable equivalences discovered from collapsed xor rows.
    variable_replacer: VariableReplacer,
    /// The variable-order heuristics; the active one rotates at restarts.
    variable_selectors: Vec<Box<dyn VariableSelector>>,
    active_variable_selector: usize,
    /// Used for the random-decision fraction independently of the strategy
    /// rotation.
    random_selector: RandomSelector,
    value_selector: ValueSelector,
    /// Holds the assumptions when the solver is queried to solve under assumptions.
    assumptions: Vec<Literal>,
    is_assumption: Vec<bool>,
    /// On infeasibility under assumptions, a subset of the negated
    /// assumptions implied by the formula.
    final_conflict: Vec<Literal>,
    /// The mailbox for clauses exchanged with peer solvers, drained at
    /// quiescent points only.
    clause_exchange: Option<SharedClausePoolHandle>,
    last_sync_at_conflict: u64,
    /// Scratch flags for conflict analysis, indexed by variable.
    seen: Vec<bool>,
    /// The next trail entry the branching heuristics have not been notified of.
    branching_trail_index: usize,
    counters: Counters,
    solution: Solution,
    internal_parameters: SatOptions,
    jeroslow_wang_initialised: bool,
}

impl Default for SatSolver {
    fn default() -> Self {
        SatSolver::new(SatOptions::default())
    }
}

//methods that offer basic functionality
impl SatSolver {
    pub fn new(options: SatOptions) -> SatSolver {
        let variable_selectors: Vec<Box<dyn VariableSelector>> = if options
            .branch_strategy_setup
            .is_empty()
        {
            vec![Box::<VsidsSelector>::default()]
        } else {
            options
                .branch_strategy_setup
                .iter()
                .map(|strategy| match strategy {
                    BranchStrategy::Vsids => {
                        Box::<VsidsSelector>::default() as Box<dyn VariableSelector>
                    }
                    BranchStrategy::Maple => Box::<MapleSelector>::default(),
                    BranchStrategy::Rand => Box::<RandomSelector>::default(),
                })
                .collect()
        };

        let mut solver = SatSolver {
            state: SolverState::default(),
            assignments: Assignments::default(),
            clausal_propagator: ClausalPropagator::default(),
            xor_propagator: XorPropagator::default(),
            clause_allocator: ClauseAllocator::new(),
            explanation_clause_manager: ExplanationClauseManager::default(),
            learned_clause_manager: LearnedClauseManager::new(options.learning_options),
            learned_clause_minimiser: LearnedClauseMinimiser::default(),
            restart_strategy: RestartStrategy::new(options.restart_options),
            clause_cleaner: ClauseCleaner::default(),
            variable_replacer: VariableReplacer::default(),
            variable_selectors,
            active_variable_selector: 0,
            random_selector: RandomSelector::default(),
            value_selector: ValueSelector::new(options.polarity_mode),
            assumptions: vec![],
            is_assumption: vec![],
            final_conflict: vec![],
            clause_exchange: None,
            last_sync_at_conflict: 0,
            seen: vec![],
            branching_trail_index: 0,
            counters: Counters::default(),
            solution: Solution::default(),
            internal_parameters: options,
            jeroslow_wang_initialised: false,
        };

        //we introduce a dummy variable set to true at the root level
        //  this is useful for convenience when a fact needs to be expressed that is always true
        let root_variable = solver.new_variable();
        let true_literal = Literal::new(root_variable, true);

        solver.assignments.true_literal = true_literal;
        solver.assignments.false_literal = !true_literal;

        solver.assignments.enqueue_decision_literal(true_literal);
        let result = solver.propagate_root();
        ember_assert_simple!(result.is_ok());

        solver
    }

    /// Allocates one variable; the returned id is dense and equal to the
    /// prior variable count.
    pub fn new_variable(&mut self) -> Variable {
        let variable = Variable::new(self.assignments.num_variables());
        self.assignments.grow();
        self.clausal_propagator.grow();
        self.xor_propagator.grow();
        self.variable_replacer.grow();
        self.value_selector.grow();
        for selector in self.variable_selectors.iter_mut() {
            selector.grow();
        }
        self.random_selector.grow();
        self.seen.push(false);
        self.is_assumption.push(false);
        variable
    }

    pub fn num_variables(&self) -> u32 {
        self.assignments.num_variables()
    }

    pub fn get_state(&self) -> &SolverState {
        &self.state
    }

    pub fn get_assignments(&self) -> &Assignments {
        &self.assignments
    }

    pub fn get_counters(&self) -> &Counters {
        &self.counters
    }

    /// The satisfying assignment; only valid after a feasible result.
    pub fn get_solution(&self) -> &Solution {
        ember_assert_simple!(self.state.has_solution());
        &self.solution
    }

    /// A subset of the negated assumptions which the formula implies; only
    /// valid after an infeasible-under-assumptions result.
    pub fn get_final_conflict(&self) -> &[Literal] {
        ember_assert_simple!(self.state.is_infeasible_under_assumptions());
        &self.final_conflict
    }

    pub fn get_variable_status(&self, variable: Variable) -> VariableStatus {
        self.variable_replacer.get_status(variable)
    }

    /// Connects the solver to a shared clause pool. The pool is drained and
    /// flushed only at restarts.
    pub fn set_clause_exchange(&mut self, pool: SharedClausePoolHandle) {
        self.clause_exchange = Some(pool);
    }

    /// Creates a clause from the literals and adds it to the formula.
    ///
    /// An error is returned iff the formula becomes trivially unsatisfiable
    /// at the root; subsequent calls then always return an error without
    /// modifying the solver.
    pub fn add_clause(&mut self, literals: Vec<Literal>) -> Result<(), ConstraintOperationError> {
        ember_assert_simple!(self.assignments.is_at_the_root_level());

        if self.state.is_infeasible() {
            return Err(ConstraintOperationError::InfeasibleState);
        }

        let result = self.clausal_propagator.add_permanent_clause(
            literals,
            &mut self.assignments,
            &mut self.clause_allocator,
        );

        if result.is_err() {
            self.state.declare_infeasible();
            return result;
        }

        self.propagate_root()
    }

    /// Adds the parity constraint `variables[0] (+) ... (+) variables[k] = rhs`.
    pub fn add_xor_clause(
        &mut self,
        variables: Vec<Variable>,
        rhs: bool,
    ) -> Result<(), ConstraintOperationError> {
        ember_assert_simple!(self.assignments.is_at_the_root_level());

        if self.state.is_infeasible() {
            return Err(ConstraintOperationError::InfeasibleState);
        }

        let outcome = self
            .xor_propagator
            .add_xor_clause(variables, rhs, &self.assignments);

        match outcome {
            Err(error) => {
                self.state.declare_infeasible();
                Err(error)
            }
            Ok(XorAdditionOutcome::TriviallySatisfied) => Ok(()),
            Ok(XorAdditionOutcome::Unit(literal)) => {
                if self.assignments.is_literal_assigned_false(literal) {
                    self.state.declare_infeasible();
                    return Err(ConstraintOperationError::InfeasibleClause);
                }
                if self.assignments.is_literal_unassigned(literal) {
                    self.assignments.enqueue_decision_literal(literal);
                }
                self.propagate_root()
            }
            Ok(XorAdditionOutcome::Equivalence(lhs, rhs_variable, inverted)) => {
                self.variable_replacer.replace(lhs, rhs_variable, inverted);
                add_equivalence_clauses(
                    lhs,
                    rhs_variable,
                    inverted,
                    &mut self.clause_allocator,
                    &mut self.clausal_propagator,
                );
                self.propagate_root()
            }
            Ok(XorAdditionOutcome::Attached(_)) => Ok(()),
        }
    }

    pub fn solve(
        &mut self,
        assumptions: &[Literal],
        termination: &mut impl TerminationCondition,
    ) -> SolverExecutionFlag {
        if self.state.is_infeasible() {
            return SolverExecutionFlag::Infeasible;
        }

        let stopwatch = Stopwatch::starting_now();

        self.initialise(assumptions);
        let result = self.solve_internal(termination);

        self.counters.time_spent_in_solver += stopwatch.elapsed_millis();

        result
    }

    pub fn log_statistics(&self) {
        self.counters.log_statistics();
        log_statistic("numberOfRestarts", self.restart_strategy.num_restarts());
        log_statistic(
            "numberOfBlockedRestarts",
            self.restart_strategy.num_blocked_restarts(),
        );
        log_statistic(
            "numberOfLearnedClauses",
            self.learned_clause_manager.num_learned_clauses(),
        );
        log_statistic(
            "numberOfLearnedClausesRemoved",
            self.learned_clause_manager.num_learned_clauses_removed(),
        );
        log_statistic(
            "numberOfClausesRemovedBySatisfaction",
            self.clause_cleaner.num_clauses_removed(),
        );
        log_statistic(
            "numberOfClausesThatBecameBinary",
            self.clause_cleaner.num_became_binary(),
        );
        log_statistic(
            "numberOfMinimisedLiterals",
            self.learned_clause_minimiser.num_literals_removed_total(),
        );
        log_statistic(
            "numberOfReplacedVariables",
            self.variable_replacer.num_replaced_variables(),
        );
    }
}

//methods that serve as the main building blocks
impl SatSolver {
    fn initialise(&mut self, assumptions: &[Literal]) {
        //a previous feasible result leaves the trail populated
        if self.assignments.get_decision_level() > 0 {
            self.backtrack(0);
        }
        self.state.declare_solving();
        assumptions.clone_into(&mut self.assumptions);
        self.final_conflict.clear();
        self.is_assumption.iter_mut().for_each(|flag| *flag = false);
        for assumption in assumptions {
            self.is_assumption[assumption.get_variable()] = true;
        }

        if self.internal_parameters.polarity_mode == PolarityMode::Auto
            && !self.jeroslow_wang_initialised
        {
            self.initialise_jeroslow_wang_polarities();
            self.jeroslow_wang_initialised = true;
        }
    }

    fn solve_internal(
        &mut self,
        termination: &mut impl TerminationCondition,
    ) -> SolverExecutionFlag {
        loop {
            //interrupts are polled sparingly: at restarts and every 256 conflicts
            if self.counters.num_conflicts & 0xff == 0xff
                && termination.should_stop(self.counters.num_conflicts)
            {
                debug!("Terminated after {} conflicts", self.counters.num_conflicts);
                return self.prepare_for_timeout();
            }

            self.propagate_enqueued();

            if self.state.no_conflict() {
                self.declare_new_decision_level();

                // Restarts only occur once all assumptions are assigned. Since one assumption is
                // posted per decision level, all assumptions are assigned when the decision level
                // is strictly larger than the number of assumptions.
                if self.restart_strategy.should_restart() && self.are_all_assumptions_assigned() {
                    if termination.should_stop(self.counters.num_conflicts)
                        || self.restart_strategy.num_restarts()
                            >= self.internal_parameters.num_restarts_max
                    {
                        return self.prepare_for_timeout();
                    }

                    self.restart_during_search();

                    //an incoming shared clause may have revealed infeasibility
                    if self.state.is_infeasible() {
                        return SolverExecutionFlag::Infeasible;
                    }
                    self.declare_new_decision_level();
                }

                if let Err(flag) = self.make_next_decision() {
                    return flag;
                }
            }
            //conflict
            else {
                if self.assignments.get_decision_level() == 0 {
                    self.state.declare_infeasible();
                    return SolverExecutionFlag::Infeasible;
                }

                //propagation failed while the assumptions were being posted
                if !self.assumptions.is_empty()
                    && self.assignments.get_decision_level() <= self.assumptions.len() as u32
                {
                    return self.conclude_infeasible_under_assumptions();
                }

                self.value_selector.notify_trail_depth(&self.assignments);

                self.resolve_conflict();

                self.learned_clause_manager.decay_clause_activities();
                for selector in self.variable_selectors.iter_mut() {
                    selector.on_conflict();
                }
            }
        }
    }

    fn make_next_decision(&mut self) -> Result<(), SolverExecutionFlag> {
        if let Some(assumption_literal) = self.peek_next_assumption_literal() {
            //Case 1: the assumption is unassigned, assign it
            if self.assignments.is_literal_unassigned(assumption_literal) {
                self.assignments.enqueue_decision_literal(assumption_literal);
                Ok(())
            //Case 2: the assumption has already been set to true
            //  this happens when other assumptions propagated the literal
            //  or the assumption is already set to true at the root level
            } else if self.assignments.is_literal_assigned_true(assumption_literal) {
                // in this case, do nothing
                //  note that the solver will then increase the decision level without enqueuing a
                //  decision literal; this is necessary because by convention the solver will
                //  try to assign the i-th assumption literal at decision level i+1
                Ok(())
            }
            //Case 3: the assumption literal is in conflict with the input assumption
            //  which means the instance is infeasible under the current assumptions
            else {
                ember_assert_moderate!(
                    self.assignments
                        .get_literal_assignment_level(assumption_literal)
                        == 0
                        || self.assignments.is_literal_propagated(assumption_literal)
                );

                self.final_conflict =
                    self.compute_core_from_violated_assumption(assumption_literal);
                self.state
                    .declare_infeasible_under_assumptions(assumption_literal);
                if self.assignments.get_decision_level() > 0 {
                    self.backtrack(0);
                }
                Err(SolverExecutionFlag::InfeasibleUnderAssumptions)
            }
        } else {
            let selected_variable = if self.internal_parameters.rnd_var_freq > 0.0
                && self
                    .internal_parameters
                    .random_generator
                    .gen::<f64>()
                    < self.internal_parameters.rnd_var_freq
            {
                self.random_selector.peek_next_variable(
                    &self.assignments,
                    &mut self.internal_parameters.random_generator,
                )
            } else {
                self.variable_selectors[self.active_variable_selector].peek_next_variable(
                    &self.assignments,
                    &mut self.internal_parameters.random_generator,
                )
            };

            match selected_variable {
                Some(variable) => {
                    let truth_value = self
                        .value_selector
                        .select_value(variable, &mut self.internal_parameters.random_generator);
                    let decision_literal = Literal::new(variable, truth_value);
                    self.counters.num_decisions += 1;
                    self.assignments.enqueue_decision_literal(decision_literal);
                    Ok(())
                }
                None => {
                    //all variables are assigned, the formula is satisfied
                    self.record_solution();
                    self.state.declare_solution_found();
                    Err(SolverExecutionFlag::Feasible)
                }
            }
        }
    }

    fn are_all_assumptions_assigned(&self) -> bool {
        self.assignments.get_decision_level() as usize > self.assumptions.len()
    }

    fn peek_next_assumption_literal(&self) -> Option<Literal> {
        if self.are_all_assumptions_assigned() {
            None
        } else {
            // the convention is that at decision level i, the (i-1)th assumption is set
            //  note that the decision level is increased before branching, hence the minus one
            Some(self.assumptions[self.assignments.get_decision_level() as usize - 1])
        }
    }

    fn declare_new_decision_level(&mut self) {
        self.assignments.increase_decision_level();
    }

    fn record_solution(&mut self) {
        let truth_values = (0..self.assignments.num_variables())
            .map(|index| {
                let variable = Variable::new(index);
                ember_assert_moderate!(self.assignments.is_variable_assigned(variable));
                self.assignments.is_variable_assigned_true(variable)
            })
            .collect();
        self.solution = Solution::new(truth_values);
    }

    fn prepare_for_timeout(&mut self) -> SolverExecutionFlag {
        if self.assignments.get_decision_level() > 0 {
            self.backtrack(0);
        }
        self.state.declare_timeout();
        SolverExecutionFlag::Timeout
    }

    /// Main propagation loop: the clausal propagator and the xor propagator
    /// alternate until a common fixpoint or a conflict. Both propagators
    /// process the trail in enqueue (FIFO) order.
    fn propagate_enqueued(&mut self) {
        let num_trail_entries_old = self.assignments.num_trail_entries();

        loop {
            let clausal_propagation_status = self
                .clausal_propagator
                .propagate(&mut self.assignments, &mut self.clause_allocator);

            if let Err(conflict_info) = clausal_propagation_status {
                self.state.declare_conflict(conflict_info);
                break;
            }

            let xor_propagation_status = self.xor_propagator.propagate(&mut self.assignments);

            if let Err(conflict_info) = xor_propagation_status {
                self.state.declare_conflict(conflict_info);
                break;
            }

            //the xor propagator may have enqueued literals the clausal propagator has not seen
            if self
                .clausal_propagator
                .is_propagation_complete(self.assignments.num_trail_entries())
            {
                break;
            }
        }

        self.counters.num_conflicts += self.state.conflicting() as u64;
        self.counters.num_propagations +=
            (self.assignments.num_trail_entries() - num_trail_entries_old) as u64;

        self.notify_assignments();
    }

    /// Reports the trail entries accumulated since the last call to the
    /// branching heuristics.
    fn notify_assignments(&mut self) {
        let num_conflicts = self.counters.num_conflicts;
        for index in self.branching_trail_index..self.assignments.num_trail_entries() {
            let variable = self.assignments.get_trail_entry(index).get_variable();
            for selector in self.variable_selectors.iter_mut() {
                selector.on_assign(variable, num_conflicts);
            }
        }
        self.branching_trail_index = self.assignments.num_trail_entries();
    }

    fn propagate_root(&mut self) -> Result<(), ConstraintOperationError> {
        ember_assert_simple!(self.assignments.is_at_the_root_level());
        self.propagate_enqueued();
        if self.state.conflicting() {
            self.state.declare_infeasible();
            Err(ConstraintOperationError::InfeasibleClause)
        } else {
            Ok(())
        }
    }

    pub(crate) fn backtrack(&mut self, backtrack_level: u32) {
        ember_assert_simple!(backtrack_level < self.assignments.get_decision_level());

        let num_conflicts = self.counters.num_conflicts;
        let variable_selectors = &mut self.variable_selectors;
        let value_selector = &mut self.value_selector;

        self.assignments
            .synchronise(backtrack_level)
            .for_each(|literal| {
                value_selector.on_unassign(literal);
                for selector in variable_selectors.iter_mut() {
                    selector.on_unassign(literal.get_variable(), num_conflicts);
                }
            });

        self.clausal_propagator
            .synchronise(self.assignments.num_trail_entries());
        self.xor_propagator
            .synchronise(self.assignments.num_trail_entries());

        self.branching_trail_index = self
            .branching_trail_index
            .min(self.assignments.num_trail_entries());
    }

    /// Performs a restart; a restart differs from backtracking to the root in
    /// that additional operations take place afterwards: the learnt database
    /// is reduced, root-satisfied clauses are collected, clauses are
    /// exchanged with peers, and the branching strategy rotation advances.
    fn restart_during_search(&mut self) {
        ember_assert_simple!(
            self.are_all_assumptions_assigned(),
            "Restarts should not trigger whilst assigning assumptions"
        );

        // no point backtracking past the assumption levels
        if self.assignments.get_decision_level() as usize <= self.assumptions.len() {
            return;
        }

        self.backtrack(0);
        self.restart_strategy.notify_restart();

        //rotate the branching strategy
        if self.variable_selectors.len() > 1 {
            self.active_variable_selector =
                (self.active_variable_selector + 1) % self.variable_selectors.len();
            debug!(
                "Branching rotated to {}",
                self.variable_selectors[self.active_variable_selector].name()
            );
        }

        self.learned_clause_manager
            .shrink_learned_clause_database_if_needed(
                self.counters.num_conflicts,
                &self.assignments,
                &mut self.clause_allocator,
                &mut self.clausal_propagator,
            );

        self.clause_cleaner.clean_clauses_if_needed(
            self.internal_parameters.clean_after_new_root_assignments,
            &self.assignments,
            &mut self.clause_allocator,
            &mut self.clausal_propagator,
            &mut self.xor_propagator,
            &mut self.learned_clause_manager,
            &mut self.variable_replacer,
        );

        if self.counters.num_conflicts - self.last_sync_at_conflict
            >= self.internal_parameters.sync_every_conf
        {
            self.synchronise_shared_clauses();
            self.last_sync_at_conflict = self.counters.num_conflicts;

            //incoming units are enqueued at the root and propagated right away, so that
            //their consequences are recorded as root assignments
            if !self.state.is_infeasible() {
                self.propagate_enqueued();
                if self.state.conflicting() {
                    self.state.declare_infeasible();
                }
            }
        }
    }

    /// Changes the state based on the conflict analysis result. It performs
    /// the following: computes and minimises the learnt clause, backtracks,
    /// adds the clause to the database, and enqueues its asserting literal.
    /// No propagation is performed, that is left to the solver afterwards.
    fn resolve_conflict(&mut self) {
        ember_assert_moderate!(self.state.conflicting());

        let conflict_info = *self.state.get_conflict_info();
        let conflict_reference = self.explanation_clause_manager.conflict_clause_reference(
            conflict_info,
            &self.assignments,
            &self.xor_propagator,
            &mut self.clause_allocator,
        );

        let mut analysis_result = self.analyse_conflict(conflict_reference);

        if self.internal_parameters.learning_clause_minimisation {
            self.learned_clause_minimiser.remove_dominated_literals(
                &mut analysis_result,
                &self.assignments,
                &self.xor_propagator,
                &mut self.explanation_clause_manager,
                &mut self.clause_allocator,
            );
        }
        if self.internal_parameters.learning_minimise_binary {
            self.learned_clause_minimiser.remove_binary_implied_literals(
                &mut analysis_result,
                &self.assignments,
                &self.clausal_propagator,
            );
        }

        //minimisation maintains the position-1 invariant, so the backtrack level is the level
        //of the literal at position 1
        if analysis_result.learned_literals.len() > 1 {
            analysis_result.backjump_level = self
                .assignments
                .get_literal_assignment_level(analysis_result.learned_literals[1]);
        } else {
            analysis_result.backjump_level = 0;
        }

        self.explanation_clause_manager
            .clean_up_explanation_clauses(&mut self.clause_allocator);

        self.process_learned_clause(analysis_result);

        self.state.declare_solving();
    }

    /// Computes the first-UIP learnt clause from the falsified clause. The
    /// asserting literal ends up at position 0 and a literal of the
    /// second-highest decision level at position 1.
    fn analyse_conflict(&mut self, conflict_reference: ClauseReference) -> ConflictAnalysisResult {
        ember_assert_simple!(self.seen.len() as u32 == self.assignments.num_variables());

        let mut analysis_result = ConflictAnalysisResult {
            //the convention is to place the asserting literal at index zero; space is allocated
            //for it now, using the true_literal as a placeholder
            learned_literals: vec![self.assignments.true_literal],
            backjump_level: 0,
        };

        let current_decision_level = self.assignments.get_decision_level();
        let mut num_current_decision_level_literals: u32 = 0;
        let mut next_trail_index = self.assignments.num_trail_entries() - 1;
        //none signals the first iteration, where the conflict reference is used as the reason
        let mut next_literal: Option<Literal> = None;

        loop {
            ember_assert_moderate!(
                next_literal.is_none()
                    || self
                        .assignments
                        .is_literal_propagated(next_literal.unwrap())
                        && self
                            .assignments
                            .get_literal_assignment_level(next_literal.unwrap())
                            == current_decision_level
            );

            let reason_reference = if let Some(propagated_literal) = next_literal {
                self.explanation_clause_manager.reason_clause_reference(
                    propagated_literal,
                    &self.assignments,
                    &self.xor_propagator,
                    &mut self.clause_allocator,
                )
            } else {
                conflict_reference
            };

            self.learned_clause_manager.update_clause_lbd_and_bump_activity(
                reason_reference,
                self.counters.num_conflicts,
                &self.assignments,
                &mut self.clause_allocator,
            );

            //process the reason literals, i.e., perform resolution and update the internal
            //data structures

            //the index is either 0 or 1: the 0th literal is skipped when the clause is the
            //reason of a propagation, since it is the propagated literal itself
            let mut index = (next_literal.is_some()) as u32;
            while index < self.clause_allocator.get_clause(reason_reference).len() {
                let reason_literal = self.clause_allocator.get_clause(reason_reference)[index];
                index += 1;

                //only consider non-root assignments that have not been considered before
                if self.assignments.is_literal_root_assignment(reason_literal) {
                    continue;
                }
                let variable = reason_literal.get_variable();
                if self.seen[variable] {
                    continue;
                }
                //mark the variable as seen so that it is not processed more than once
                self.seen[variable] = true;

                for selector in self.variable_selectors.iter_mut() {
                    selector.bump_activity(variable);
                }

                let literal_decision_level =
                    self.assignments.get_literal_assignment_level(reason_literal);

                if literal_decision_level == current_decision_level {
                    num_current_decision_level_literals += 1;
                } else {
                    //literals from previous decision levels are kept in the learnt clause
                    analysis_result.learned_literals.push(reason_literal);
                    //the literal of the highest such level is maintained at index 1 to prepare
                    //the clause for propagation
                    if literal_decision_level > analysis_result.backjump_level {
                        analysis_result.backjump_level = literal_decision_level;
                        let last_index = analysis_result.learned_literals.len() - 1;
                        analysis_result.learned_literals[last_index] =
                            analysis_result.learned_literals[1];
                        analysis_result.learned_literals[1] = reason_literal;
                    }
                }
            }

            //find the next literal on the trail to resolve on: walk back skipping literals whose
            //variable has not been seen in the analysis; recall that each variable appears on
            //the trail at most once
            while !self.seen[self
                .assignments
                .get_trail_entry(next_trail_index)
                .get_variable()]
            {
                next_trail_index -= 1;
            }

            let pivot_literal = self.assignments.get_trail_entry(next_trail_index);
            next_literal = Some(pivot_literal);
            //the same variable cannot be encountered on the trail again, so the flag can be
            //cleared already
            self.seen[pivot_literal.get_variable()] = false;
            num_current_decision_level_literals -= 1;
            next_trail_index = next_trail_index.saturating_sub(1);

            //once the counter hits zero the first unique implication point has been found
            if num_current_decision_level_literals == 0 {
                break;
            }
        }
        analysis_result.learned_literals[0] = !next_literal.unwrap();

        //clear the seen flags of the literals in the learnt clause, these were not cleared above
        for literal in &analysis_result.learned_literals {
            self.seen[literal.get_variable()] = false;
        }

        self.counters
            .average_conflict_size
            .add_term(analysis_result.learned_literals.len() as u64);

        analysis_result
    }

    fn process_learned_clause(&mut self, analysis_result: ConflictAnalysisResult) {
        if let Err(write_error) = self.write_to_certificate(&analysis_result) {
            warn!(
                "Failed to update the certificate file, error message: {}",
                write_error
            );
        }

        //the glue is computed before backtracking, while every literal is still assigned
        let glue = compute_lbd_for_literals(&analysis_result.learned_literals, &self.assignments);
        let num_trail_entries_before = self.assignments.num_trail_entries() as u64;

        //unit clauses are treated in a special way: they are added as root assignments
        if analysis_result.learned_literals.len() == 1 {
            // important to notify about the conflict _before_ backtracking removes literals
            // from the trail
            self.restart_strategy
                .notify_conflict(1, num_trail_entries_before);

            self.backtrack(0);

            let unit_clause = analysis_result.learned_literals[0];
            ember_assert_simple!(
                self.assignments.is_literal_unassigned(unit_clause),
                "Do not expect to learn a literal that is already set."
            );
            self.assignments.enqueue_decision_literal(unit_clause);

            self.counters.num_unit_clauses_learned += 1;
            self.publish_shared_clause(SharedClause::Unit(literal_to_external(unit_clause)));
        } else {
            self.counters
                .average_learned_clause_length
                .add_term(analysis_result.learned_literals.len() as u64);

            let current_decision_level = self.assignments.get_decision_level();
            let backjump_level = analysis_result.backjump_level;

            //backtrack chronologically by a single level when the jump would be too far
            let chrono_threshold = self.internal_parameters.diff_declev_for_chrono;
            let backtrack_level = if chrono_threshold >= 0
                && (current_decision_level - backjump_level) as i64 > chrono_threshold
            {
                current_decision_level - 1
            } else {
                backjump_level
            };

            self.counters
                .average_backtrack_amount
                .add_term((current_decision_level - backtrack_level) as u64);
            self.restart_strategy
                .notify_conflict(glue, num_trail_entries_before);

            self.backtrack(backtrack_level);

            if analysis_result.learned_literals.len() == 2 {
                self.publish_shared_clause(SharedClause::Binary(
                    literal_to_external(analysis_result.learned_literals[0]),
                    literal_to_external(analysis_result.learned_literals[1]),
                ));
            }

            let _ = self.learned_clause_manager.add_learned_clause(
                analysis_result.learned_literals,
                glue,
                self.counters.num_conflicts,
                &mut self.clausal_propagator,
                &mut self.assignments,
                &mut self.clause_allocator,
            );
        }
    }

    fn write_to_certificate(
        &mut self,
        analysis_result: &ConflictAnalysisResult,
    ) -> std::io::Result<()> {
        if let Some(certificate_file) = &mut self.internal_parameters.certificate_file {
            for literal in &analysis_result.learned_literals {
                if literal.is_negative() {
                    certificate_file.write_all("-".as_bytes())?;
                }
                certificate_file
                    .write_all(format!("{} ", literal.get_variable().index()).as_bytes())?;
            }
            certificate_file.write_all("0\n".as_bytes())?;
        }
        Ok(())
    }
}

//methods for extracting the conflicting set of assumptions
impl SatSolver {
    fn conclude_infeasible_under_assumptions(&mut self) -> SolverExecutionFlag {
        let conflict_info = *self.state.get_conflict_info();
        self.final_conflict = self.compute_core_from_conflict(conflict_info);

        //the innermost assumption in effect is reported as the violated one
        let violated_assumption =
            self.assumptions[self.assignments.get_decision_level() as usize - 1];
        self.state
            .declare_infeasible_under_assumptions(violated_assumption);

        if self.assignments.get_decision_level() > 0 {
            self.backtrack(0);
        }
        SolverExecutionFlag::InfeasibleUnderAssumptions
    }

    /// The case where enqueueing an assumption finds it already falsified:
    /// the negated assumption is implied by the other assumptions.
    fn compute_core_from_violated_assumption(
        &mut self,
        assumption_literal: Literal,
    ) -> Vec<Literal> {
        let mut core = vec![!assumption_literal];
        //when the negation holds at the root, the formula alone implies it
        if self.assignments.is_literal_root_assignment(assumption_literal) {
            return core;
        }
        self.seen[assumption_literal.get_variable()] = true;
        self.analyse_final_into(&mut core);
        core
    }

    /// The case where propagation failed while the assumptions were being
    /// posted: the falsified clause seeds the sweep.
    fn compute_core_from_conflict(&mut self, conflict_info: ConflictInfo) -> Vec<Literal> {
        let conflict_reference = self.explanation_clause_manager.conflict_clause_reference(
            conflict_info,
            &self.assignments,
            &self.xor_propagator,
            &mut self.clause_allocator,
        );

        let mut index = 0;
        while index < self.clause_allocator.get_clause(conflict_reference).len() {
            let literal = self.clause_allocator.get_clause(conflict_reference)[index];
            index += 1;
            if !self.assignments.is_literal_root_assignment(literal) {
                self.seen[literal.get_variable()] = true;
            }
        }

        let mut core = vec![];
        self.analyse_final_into(&mut core);
        core
    }

    /// Sweeps the trail in reverse order, from the end back to the first
    /// entry beyond the root, collecting the negations of the assumptions
    /// that imply the seeded literals. Reasons are expanded along the way;
    /// every element of the resulting core is a negated assumption.
    fn analyse_final_into(&mut self, core: &mut Vec<Literal>) {
        ember_assert_simple!(self.assignments.get_decision_level() > 0);

        let first_nonroot_position = self.assignments.get_trail_position_of_level(1);
        for trail_index in (first_nonroot_position..self.assignments.num_trail_entries()).rev() {
            let literal = self.assignments.get_trail_entry(trail_index);
            let variable = literal.get_variable();
            if !self.seen[variable] {
                continue;
            }
            self.seen[variable] = false;

            if self.assignments.is_literal_decision(literal) {
                //decisions at the assumption levels are assumptions
                ember_assert_moderate!(self.is_assumption[variable]);
                core.push(!literal);
            } else {
                let reason_reference = self.explanation_clause_manager.reason_clause_reference(
                    literal,
                    &self.assignments,
                    &self.xor_propagator,
                    &mut self.clause_allocator,
                );
                let mut index = 1;
                while index < self.clause_allocator.get_clause(reason_reference).len() {
                    let reason_literal = self.clause_allocator.get_clause(reason_reference)[index];
                    index += 1;
                    if !self.assignments.is_literal_root_assignment(reason_literal) {
                        self.seen[reason_literal.get_variable()] = true;
                    }
                }
            }
        }

        self.explanation_clause_manager
            .clean_up_explanation_clauses(&mut self.clause_allocator);
    }
}

//methods for exchanging clauses with peer solvers
impl SatSolver {
    fn synchronise_shared_clauses(&mut self) {
        let Some(pool) = self.clause_exchange.clone() else {
            return;
        };
        let mut pool = pool.lock().expect("the shared clause pool lock is poisoned");
        while let Some(shared_clause) = pool.pop_incoming() {
            match shared_clause {
                SharedClause::Unit(code) => self.add_shared_unit_clause(code),
                SharedClause::Binary(code1, code2) => {
                    self.add_shared_binary_clause(code1, code2)
                }
            }
            if self.state.is_infeasible() {
                break;
            }
        }
    }

    fn add_shared_unit_clause(&mut self, code: i32) {
        //clauses over unknown or removed variables are discarded
        let Some(literal) = self.external_to_literal(code) else {
            return;
        };
        if self.assignments.is_literal_assigned_true(literal) {
            return; //already satisfied or a duplicate
        }
        if self.assignments.is_literal_assigned_false(literal) {
            //the shared clause is implied, so a falsified unit means the formula is infeasible
            self.state.declare_infeasible();
            return;
        }
        self.assignments.enqueue_decision_literal(literal);
    }

    fn add_shared_binary_clause(&mut self, code1: i32, code2: i32) {
        let (Some(lit1), Some(lit2)) = (
            self.external_to_literal(code1),
            self.external_to_literal(code2),
        ) else {
            return;
        };
        if self.assignments.is_literal_assigned_true(lit1)
            || self.assignments.is_literal_assigned_true(lit2)
        {
            return;
        }
        if self.clausal_propagator.contains_binary_clause(lit1, lit2) {
            return; //duplicate
        }

        let lit1_false = self.assignments.is_literal_assigned_false(lit1);
        let lit2_false = self.assignments.is_literal_assigned_false(lit2);
        match (lit1_false, lit2_false) {
            (true, true) => self.state.declare_infeasible(),
            (true, false) => self.assignments.enqueue_decision_literal(lit2),
            (false, true) => self.assignments.enqueue_decision_literal(lit1),
            (false, false) => {
                let _ = self.clausal_propagator.add_clause_unchecked(
                    vec![lit1, lit2],
                    true,
                    &mut self.clause_allocator,
                );
            }
        }
    }

    fn publish_shared_clause(&mut self, clause: SharedClause) {
        if let Some(pool) = &self.clause_exchange {
            pool.lock()
                .expect("the shared clause pool lock is poisoned")
                .publish(clause);
        }
    }

    fn external_to_literal(&self, code: i32) -> Option<Literal> {
        let index = code.unsigned_abs();
        if index == 0 || index >= self.assignments.num_variables() {
            return None;
        }
        let variable = Variable::new(index);
        if self.variable_replacer.get_status(variable) != VariableStatus::Active {
            return None;
        }
        Some(Literal::new(variable, code > 0))
    }
}

//methods for the initial polarities
impl SatSolver {
    /// Jeroslow-Wang weighting: every occurrence of a literal in a clause of
    /// length k contributes 2^-k, and the initial polarity of a variable is
    /// the sign with the greater weight.
    fn initialise_jeroslow_wang_polarities(&mut self) {
        let mut scores = vec![0.0f64; 2 * self.assignments.num_variables() as usize];

        for &reference in self.clausal_propagator.permanent_clause_references() {
            let clause = self.clause_allocator.get_clause(reference);
            if clause.is_deleted() {
                continue;
            }
            let weight = 0.5f64.powi(clause.len() as i32);
            for &literal in clause.get_literal_slice() {
                scores[literal] += weight;
            }
        }
        for (lit1, lit2, is_learned) in self.clausal_propagator.binary_clauses() {
            if is_learned {
                continue;
            }
            scores[lit1] += 0.25;
            scores[lit2] += 0.25;
        }

        for variable in self.assignments.get_variables() {
            let positive_score = scores[Literal::new(variable, true)];
            let negative_score = scores[Literal::new(variable, false)];
            self.value_selector
                .update_if_not_frozen(variable, positive_score >= negative_score);
        }
    }
}

//methods for dumping the clause database
impl SatSolver {
    /// Writes the simplified original clauses in DIMACS form: the root
    /// assignments as units, the irredundant inline binaries, the remaining
    /// long clauses, and the attached xor rows as `x` lines.
    pub fn dump_irredundant_clauses(&self, writer: &mut impl Write) -> std::io::Result<()> {
        let root_units: Vec<Literal> = self
            .assignments
            .trail
            .iter()
            .copied()
            .filter(|&literal| {
                self.assignments.get_literal_assignment_level(literal) == 0
                    && literal.get_variable().index() != 0
            })
            .collect();

        let binaries: Vec<(Literal, Literal)> = self
            .clausal_propagator
            .binary_clauses()
            .filter(|&(_, _, is_learned)| !is_learned)
            .map(|(lit1, lit2, _)| (lit1, lit2))
            .collect();

        let long_references: Vec<ClauseReference> = self
            .clausal_propagator
            .permanent_clause_references()
            .iter()
            .copied()
            .filter(|&reference| !self.clause_allocator.get_clause(reference).is_deleted())
            .collect();

        let num_clauses = root_units.len()
            + binaries.len()
            + long_references.len()
            + self.xor_propagator.num_attached_rows();

        writeln!(
            writer,
            "p cnf {} {}",
            self.assignments.num_variables() - 1,
            num_clauses
        )?;

        for literal in root_units {
            writeln!(writer, "{} 0", literal_to_external(literal))?;
        }
        for (lit1, lit2) in binaries {
            writeln!(
                writer,
                "{} {} 0",
                literal_to_external(lit1),
                literal_to_external(lit2)
            )?;
        }
        for reference in long_references {
            let clause = self.clause_allocator.get_clause(reference);
            for &literal in clause.get_literal_slice() {
                write!(writer, "{} ", literal_to_external(literal))?;
            }
            writeln!(writer, "0")?;
        }
        for (_, row) in self.xor_propagator.rows() {
            write!(writer, "x")?;
            for (position, &variable) in row.variables().iter().enumerate() {
                //an even right-hand side is encoded by negating the first variable
                let sign = if position == 0 && !row.rhs() { -1 } else { 1 };
                write!(writer, " {}", sign * variable.index() as i32)?;
            }
            writeln!(writer, " 0")?;
        }
        Ok(())
    }

    /// Writes the learnt clauses in DIMACS form, sorted by glue, skipping
    /// clauses longer than `max_dump_len`. Learnt binaries are written first.
    pub fn dump_learned_clauses(
        &self,
        writer: &mut impl Write,
        max_dump_len: usize,
    ) -> std::io::Result<()> {
        for (lit1, lit2, is_learned) in self.clausal_propagator.binary_clauses() {
            if is_learned && max_dump_len >= 2 {
                writeln!(
                    writer,
                    "{} {} 0",
                    literal_to_external(lit1),
                    literal_to_external(lit2)
                )?;
            }
        }

        let mut references: Vec<ClauseReference> = self
            .learned_clause_manager
            .learned_clause_references()
            .iter()
            .copied()
            .filter(|&reference| !self.clause_allocator.get_clause(reference).is_deleted())
            .collect();
        references
            .sort_unstable_by_key(|&reference| self.clause_allocator.get_clause(reference).get_lbd());

        for reference in references {
            let clause = self.clause_allocator.get_clause(reference);
            if clause.len() as usize > max_dump_len {
                continue;
            }
            for &literal in clause.get_literal_slice() {
                write!(writer, "{} ", literal_to_external(literal))?;
            }
            writeln!(writer, "0")?;
        }
        Ok(())
    }
}

/// The literal in the outer representation: a signed 1-based variable index.
pub(crate) fn literal_to_external(literal: Literal) -> i32 {
    let index = literal.get_variable().index() as i32;
    if literal.is_positive() {
        index
    } else {
        -index
    }
}

pub struct ConflictAnalysisResult {
    pub learned_literals: Vec<Literal>,
    pub backjump_level: u32,
}

/// Counters updated during the search.
#[derive(Default, Debug, Copy, Clone)]
pub struct Counters {
    pub num_decisions: u64,
    pub num_conflicts: u64,
    pub num_propagations: u64,
    pub num_unit_clauses_learned: u64,
    pub average_conflict_size: CumulativeMovingAverage,
    pub average_learned_clause_length: CumulativeMovingAverage,
    pub average_backtrack_amount: CumulativeMovingAverage,
    pub time_spent_in_solver: u64,
}

impl Counters {
    fn log_statistics(&self) {
        log_statistic("numberOfDecisions", self.num_decisions);
        log_statistic("numberOfConflicts", self.num_conflicts);
        log_statistic("numberOfPropagations", self.num_propagations);
        log_statistic("numberOfLearnedUnitClauses", self.num_unit_clauses_learned);
        log_statistic(
            "averageSizeOfConflictExplanation",
            self.average_conflict_size.value(),
        );
        log_statistic(
            "averageLearnedClauseLength",
            self.average_learned_clause_length.value(),
        );
        log_statistic(
            "averageBacktrackAmount",
            self.average_backtrack_amount.value(),
        );
        log_statistic("timeSpentInSolverInMilliseconds", self.time_spent_in_solver);
    }
}

#[derive(Default, Debug)]
enum SolverStateInternal {
    #[default]
    Ready,
    Solving,
    ContainsSolution,
    Conflict {
        conflict_info: ConflictInfo,
    },
    Infeasible,
    InfeasibleUnderAssumptions {
        violated_assumption: Literal,
    },
    Timeout,
}

#[derive(Default, Debug)]
pub struct SolverState {
    internal_state: SolverStateInternal,
}

impl SolverState {
    pub fn is_ready(&self) -> bool {
        matches!(self.internal_state, SolverStateInternal::Ready)
    }

    pub fn no_conflict(&self) -> bool {
        !self.conflicting()
    }

    pub fn conflicting(&self) -> bool {
        matches!(
            self.internal_state,
            SolverStateInternal::Conflict { conflict_info: _ }
        )
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self.internal_state, SolverStateInternal::Infeasible)
    }

    pub fn is_infeasible_under_assumptions(&self) -> bool {
        matches!(
            self.internal_state,
            SolverStateInternal::InfeasibleUnderAssumptions {
                violated_assumption: _
            }
        )
    }

    pub fn get_violated_assumption(&self) -> Literal {
        if let SolverStateInternal::InfeasibleUnderAssumptions {
            violated_assumption,
        } = self.internal_state
        {
            violated_assumption
        } else {
            panic!(
                "Cannot extract the violated assumption without being in the infeasible under \
                 assumptions state."
            );
        }
    }

    pub fn get_conflict_info(&self) -> &ConflictInfo {
        if let SolverStateInternal::Conflict { conflict_info } = &self.internal_state {
            conflict_info
        } else {
            panic!("Cannot extract the conflict info if the solver is not in a conflict.");
        }
    }

    pub fn timeout(&self) -> bool {
        matches!(self.internal_state, SolverStateInternal::Timeout)
    }

    pub fn has_solution(&self) -> bool {
        matches!(self.internal_state, SolverStateInternal::ContainsSolution)
    }

    pub(crate) fn declare_solving(&mut self) {
        ember_assert_simple!(!self.is_infeasible());
        self.internal_state = SolverStateInternal::Solving;
    }

    pub(crate) fn declare_infeasible(&mut self) {
        self.internal_state = SolverStateInternal::Infeasible;
    }

    pub(crate) fn declare_conflict(&mut self, conflict_info: ConflictInfo) {
        ember_assert_simple!(!self.conflicting());
        self.internal_state = SolverStateInternal::Conflict { conflict_info };
    }

    pub(crate) fn declare_solution_found(&mut self) {
        ember_assert_simple!(!self.is_infeasible());
        self.internal_state = SolverStateInternal::ContainsSolution;
    }

    pub(crate) fn declare_timeout(&mut self) {
        ember_assert_simple!(!self.is_infeasible());
        self.internal_state = SolverStateInternal::Timeout;
    }

    pub(crate) fn declare_infeasible_under_assumptions(&mut self, violated_assumption: Literal) {
        ember_assert_simple!(!self.is_infeasible());
        self.internal_state = SolverStateInternal::InfeasibleUnderAssumptions {
            violated_assumption,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::termination::Indefinite;

    fn new_literals(solver: &mut SatSolver, count: usize) -> Vec<Literal> {
        (0..count)
            .map(|_| Literal::new(solver.new_variable(), true))
            .collect()
    }

    #[test]
    fn unit_clause_gives_a_feasible_result_with_the_literal_set() {
        let mut solver = SatSolver::default();
        let literals = new_literals(&mut solver, 1);

        let _ = solver.add_clause(vec![literals[0]]);
        let result = solver.solve(&[], &mut Indefinite);

        assert_eq!(result, SolverExecutionFlag::Feasible);
        assert!(solver.get_solution().get_value(literals[0].get_variable()));
    }

    #[test]
    fn contradicting_unit_clauses_are_infeasible() {
        let mut solver = SatSolver::default();
        let literals = new_literals(&mut solver, 1);

        let first = solver.add_clause(vec![literals[0]]);
        assert!(first.is_ok());
        let second = solver.add_clause(vec![!literals[0]]);
        assert!(second.is_err());

        let result = solver.solve(&[], &mut Indefinite);
        assert_eq!(result, SolverExecutionFlag::Infeasible);
    }

    #[test]
    fn conflicts_learn_clauses_and_the_search_recovers() {
        let mut solver = SatSolver::default();
        let literals = new_literals(&mut solver, 4);
        let &[a, b, c, d] = &literals[..] else {
            unreachable!()
        };

        //an instance that forces at least one conflict under any branching
        let _ = solver.add_clause(vec![a, b]);
        let _ = solver.add_clause(vec![a, !b, c]);
        let _ = solver.add_clause(vec![!a, c, d]);
        let _ = solver.add_clause(vec![!a, c, !d]);
        let _ = solver.add_clause(vec![!a, !c, d]);
        let _ = solver.add_clause(vec![!a, !c, !d]);

        let result = solver.solve(&[], &mut Indefinite);
        assert_eq!(result, SolverExecutionFlag::Feasible);
        //the formula forces ~a, which in turn forces b
        assert!(!solver.get_solution().get_value(a.get_variable()));
        assert!(solver.get_solution().get_value(b.get_variable()));
    }

    #[test]
    fn solving_with_a_satisfied_assumption_is_feasible() {
        let mut solver = SatSolver::default();
        let literals = new_literals(&mut solver, 2);

        let _ = solver.add_clause(vec![literals[0], literals[1]]);
        let result = solver.solve(&[!literals[0]], &mut Indefinite);

        assert_eq!(result, SolverExecutionFlag::Feasible);
        assert!(!solver.get_solution().get_value(literals[0].get_variable()));
        assert!(solver.get_solution().get_value(literals[1].get_variable()));
    }

    #[test]
    fn contradictory_assumptions_produce_a_core() {
        let mut solver = SatSolver::default();
        let literals = new_literals(&mut solver, 2);
        let &[a, b] = &literals[..] else { unreachable!() };

        let _ = solver.add_clause(vec![!a, b]);
        let result = solver.solve(&[a, !b], &mut Indefinite);

        assert_eq!(result, SolverExecutionFlag::InfeasibleUnderAssumptions);
        let core = solver.get_final_conflict().to_vec();
        //the core consists of negated assumptions
        assert!(core.iter().all(|&lit| [!a, b].contains(&lit)));
        assert!(!core.is_empty());
    }

    #[test]
    fn conflict_budget_interrupts_the_search_cleanly() {
        use crate::engine::termination::ConflictBudget;
        use crate::engine::RestartMode;
        use crate::engine::RestartOptions;

        //restart after every conflict so the termination condition is polled early
        let options = SatOptions {
            restart_options: RestartOptions {
                mode: RestartMode::Geom,
                base_interval: 1,
                geometric_coef: 1.0,
                min_num_conflicts_before_first_restart: 1,
                ..RestartOptions::default()
            },
            ..SatOptions::default()
        };
        let mut solver = SatSolver::new(options);

        //a pigeonhole instance: 5 pigeons in 4 holes, guaranteed to conflict
        //long before the formula can be refuted
        let p: Vec<Vec<Literal>> = (0..5).map(|_| new_literals(&mut solver, 4)).collect();
        for pigeon in p.iter() {
            let _ = solver.add_clause(pigeon.clone());
        }
        for hole in 0..4 {
            for i in 0..5 {
                for j in (i + 1)..5 {
                    let _ = solver.add_clause(vec![!p[i][hole], !p[j][hole]]);
                }
            }
        }

        let result = solver.solve(&[], &mut ConflictBudget::with_budget(0));
        //the budget is already exhausted at the first poll
        assert_eq!(result, SolverExecutionFlag::Timeout);
        assert!(solver.get_state().timeout());
        assert!(solver.get_assignments().is_at_the_root_level());
    }
}

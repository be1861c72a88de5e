//! End-to-end scenarios exercising the full search loop: propagation,
//! conflict analysis, learning, restarts, xor reasoning, and assumption
//! handling.

use embersat::basic_types::Literal;
use embersat::basic_types::SolverExecutionFlag;
use embersat::basic_types::Variable;
use embersat::branching::BranchStrategy;
use embersat::branching::PolarityMode;
use embersat::engine::new_shared_clause_pool;
use embersat::engine::termination::Indefinite;
use embersat::engine::RestartMode;
use embersat::engine::RestartOptions;
use embersat::engine::SatOptions;
use embersat::engine::SatSolver;
use embersat::engine::SharedClause;

fn new_literals(solver: &mut SatSolver, count: usize) -> Vec<Literal> {
    (0..count)
        .map(|_| Literal::new(solver.new_variable(), true))
        .collect()
}

/// Restart after every conflict, as aggressively as the controller allows.
fn restart_every_conflict_options() -> SatOptions {
    SatOptions {
        restart_options: RestartOptions {
            mode: RestartMode::Geom,
            base_interval: 1,
            geometric_coef: 1.0,
            min_num_conflicts_before_first_restart: 1,
            ..RestartOptions::default()
        },
        ..SatOptions::default()
    }
}

/// The standard encoding of fitting `num_holes + 1` pigeons into `num_holes`
/// holes: every pigeon takes a hole, and no two pigeons share one.
fn add_pigeonhole_clauses(solver: &mut SatSolver, num_holes: usize) -> Vec<Vec<Literal>> {
    let num_pigeons = num_holes + 1;
    let mut clauses = vec![];

    let p: Vec<Vec<Literal>> = (0..num_pigeons)
        .map(|_| new_literals(solver, num_holes))
        .collect();
    for pigeon in p.iter() {
        clauses.push(pigeon.clone());
    }
    for hole in 0..num_holes {
        for i in 0..num_pigeons {
            for j in (i + 1)..num_pigeons {
                clauses.push(vec![!p[i][hole], !p[j][hole]]);
            }
        }
    }

    for clause in clauses.iter() {
        let _ = solver.add_clause(clause.clone());
    }
    clauses
}

fn assert_model_satisfies_clauses(solver: &SatSolver, clauses: &[Vec<Literal>]) {
    let solution = solver.get_solution();
    for clause in clauses {
        assert!(
            clause.iter().any(|lit| {
                solution.get_value(lit.get_variable()) == lit.is_positive()
            }),
            "The model does not satisfy the clause {clause:?}"
        );
    }
}

#[test]
fn trivial_sat_single_unit() {
    let mut solver = SatSolver::default();
    let x = Literal::new(solver.new_variable(), true);

    let result = solver.add_clause(vec![x]);
    assert!(result.is_ok());

    let flag = solver.solve(&[], &mut Indefinite);
    assert_eq!(flag, SolverExecutionFlag::Feasible);
    assert!(solver.get_solution().get_value(x.get_variable()));
}

#[test]
fn trivial_unsat_contradicting_units() {
    let mut solver = SatSolver::default();
    let x = Literal::new(solver.new_variable(), true);

    assert!(solver.add_clause(vec![x]).is_ok());
    assert!(solver.add_clause(vec![!x]).is_err());

    let flag = solver.solve(&[], &mut Indefinite);
    assert_eq!(flag, SolverExecutionFlag::Infeasible);
}

#[test]
fn pigeonhole_three_pigeons_two_holes_is_unsat() {
    let mut solver = SatSolver::default();
    let _ = add_pigeonhole_clauses(&mut solver, 2);

    let flag = solver.solve(&[], &mut Indefinite);
    assert_eq!(flag, SolverExecutionFlag::Infeasible);
}

#[test]
fn pigeonhole_four_pigeons_three_holes_is_unsat() {
    let mut solver = SatSolver::default();
    let _ = add_pigeonhole_clauses(&mut solver, 3);

    let flag = solver.solve(&[], &mut Indefinite);
    assert_eq!(flag, SolverExecutionFlag::Infeasible);
}

#[test]
fn single_xor_with_units_forces_the_last_variable() {
    let mut solver = SatSolver::default();
    let a = solver.new_variable();
    let b = solver.new_variable();
    let c = solver.new_variable();

    //a (+) b (+) c = 1 together with a = 0 and b = 0 forces c = 1
    assert!(solver.add_xor_clause(vec![a, b, c], true).is_ok());
    assert!(solver.add_clause(vec![Literal::new(a, false)]).is_ok());
    assert!(solver.add_clause(vec![Literal::new(b, false)]).is_ok());

    let flag = solver.solve(&[], &mut Indefinite);
    assert_eq!(flag, SolverExecutionFlag::Feasible);
    assert!(!solver.get_solution().get_value(a));
    assert!(!solver.get_solution().get_value(b));
    assert!(solver.get_solution().get_value(c));
}

#[test]
fn assumption_conflict_reports_the_negated_assumption() {
    let mut solver = SatSolver::default();
    let x = Literal::new(solver.new_variable(), true);
    let y = Literal::new(solver.new_variable(), true);

    //(x v y) /\ (~x v y) forces y, so assuming ~y is infeasible
    assert!(solver.add_clause(vec![x, y]).is_ok());
    assert!(solver.add_clause(vec![!x, y]).is_ok());

    let flag = solver.solve(&[!y], &mut Indefinite);
    assert_eq!(flag, SolverExecutionFlag::InfeasibleUnderAssumptions);
    assert_eq!(solver.get_final_conflict(), &[y]);
}

#[test]
fn assumptions_that_are_jointly_infeasible_give_a_core_of_negated_assumptions() {
    let mut solver = SatSolver::default();
    let literals = new_literals(&mut solver, 4);
    let &[a, b, c, d] = &literals[..] else {
        unreachable!()
    };

    assert!(solver.add_clause(vec![!a, !b, c]).is_ok());
    assert!(solver.add_clause(vec![!c, d]).is_ok());

    //a and b force c and then d, contradicting the assumption ~d
    let assumptions = [a, b, !d];
    let flag = solver.solve(&assumptions, &mut Indefinite);
    assert_eq!(flag, SolverExecutionFlag::InfeasibleUnderAssumptions);

    let core = solver.get_final_conflict();
    assert!(!core.is_empty());
    //every core element is the negation of an assumption
    assert!(core
        .iter()
        .all(|&lit| assumptions.contains(&!lit)));
}

#[test]
fn restarting_after_every_conflict_still_finds_a_model() {
    let mut options = restart_every_conflict_options();
    //branch towards true so the all-negative clauses generate conflicts
    options.polarity_mode = PolarityMode::True;
    let mut solver = SatSolver::new(options);

    //60 variables; neighbouring triples may not be all-equal, which is
    //satisfied by alternating values but conflicts under constant branching
    let literals = new_literals(&mut solver, 60);
    let mut clauses = vec![];
    for window in literals.windows(3) {
        clauses.push(window.to_vec());
        clauses.push(window.iter().map(|&lit| !lit).collect());
    }
    for clause in clauses.iter() {
        assert!(solver.add_clause(clause.clone()).is_ok());
    }

    let flag = solver.solve(&[], &mut Indefinite);
    assert_eq!(flag, SolverExecutionFlag::Feasible);
    assert_model_satisfies_clauses(&solver, &clauses);
}

#[test]
fn equal_seeds_and_options_give_equal_results() {
    let solve_once = || {
        let mut solver = SatSolver::new(SatOptions {
            rnd_var_freq: 0.2,
            polarity_mode: PolarityMode::Rnd,
            ..SatOptions::default()
        });
        let literals = new_literals(&mut solver, 30);
        for window in literals.windows(3) {
            let _ = solver.add_clause(window.to_vec());
            let _ = solver.add_clause(window.iter().map(|&lit| !lit).collect());
        }
        let flag = solver.solve(&[], &mut Indefinite);
        assert_eq!(flag, SolverExecutionFlag::Feasible);
        (1..solver.num_variables())
            .map(|index| solver.get_solution().get_value(Variable::new(index)))
            .collect::<Vec<bool>>()
    };

    assert_eq!(solve_once(), solve_once());
}

#[test]
fn adding_an_implied_clause_does_not_change_satisfiability() {
    let mut solver = SatSolver::default();
    let literals = new_literals(&mut solver, 3);
    let &[a, b, c] = &literals[..] else { unreachable!() };

    assert!(solver.add_clause(vec![a, b]).is_ok());
    assert!(solver.add_clause(vec![!a, c]).is_ok());
    //implied by resolution of the two clauses above
    assert!(solver.add_clause(vec![b, c]).is_ok());

    let flag = solver.solve(&[], &mut Indefinite);
    assert_eq!(flag, SolverExecutionFlag::Feasible);
}

#[test]
fn xor_constraints_hold_in_the_model_after_search() {
    let mut options = restart_every_conflict_options();
    options.polarity_mode = PolarityMode::True;
    let mut solver = SatSolver::new(options);

    let variables: Vec<Variable> = (0..12).map(|_| solver.new_variable()).collect();
    let mut xor_rows = vec![];
    for window in variables.windows(3) {
        xor_rows.push((window.to_vec(), true));
        assert!(solver.add_xor_clause(window.to_vec(), true).is_ok());
    }
    //a few clauses so that the search must take decisions
    let _ = solver.add_clause(vec![
        Literal::new(variables[0], true),
        Literal::new(variables[3], true),
    ]);
    let _ = solver.add_clause(vec![
        Literal::new(variables[5], false),
        Literal::new(variables[8], true),
    ]);

    let flag = solver.solve(&[], &mut Indefinite);
    assert_eq!(flag, SolverExecutionFlag::Feasible);

    let solution = solver.get_solution();
    for (row_variables, rhs) in xor_rows {
        let parity = row_variables
            .iter()
            .fold(false, |parity, &variable| parity ^ solution.get_value(variable));
        assert_eq!(parity, rhs, "An xor row is violated by the model");
    }
}

#[test]
fn shared_clause_pool_tolerates_foreign_clauses_and_publishes_short_learnts() {
    let mut options = restart_every_conflict_options();
    options.sync_every_conf = 0;
    let mut solver = SatSolver::new(options);
    let _ = add_pigeonhole_clauses(&mut solver, 2);

    let pool = new_shared_clause_pool();
    {
        let mut pool = pool.lock().unwrap();
        //an unknown variable, discarded on drain
        pool.push_incoming(SharedClause::Unit(999));
        //a clause over an unknown variable, discarded on drain
        pool.push_incoming(SharedClause::Binary(-999, 1));
        //a duplicate of an original clause
        pool.push_incoming(SharedClause::Binary(1, 2));
    }
    solver.set_clause_exchange(pool.clone());

    let flag = solver.solve(&[], &mut Indefinite);
    assert_eq!(flag, SolverExecutionFlag::Infeasible);

    //refuting the pigeonhole formula passes through learnt units, which are
    //published for the peers
    let published = pool.lock().unwrap().drain_outgoing();
    assert!(published
        .iter()
        .any(|clause| matches!(clause, SharedClause::Unit(_))));
}

#[test]
fn chronological_backtracking_preserves_the_answers() {
    let chrono_options = || SatOptions {
        diff_declev_for_chrono: 0,
        ..SatOptions::default()
    };

    let mut solver = SatSolver::new(chrono_options());
    let _ = add_pigeonhole_clauses(&mut solver, 2);
    assert_eq!(
        solver.solve(&[], &mut Indefinite),
        SolverExecutionFlag::Infeasible
    );

    let mut solver = SatSolver::new(chrono_options());
    let literals = new_literals(&mut solver, 20);
    let mut clauses = vec![];
    for window in literals.windows(3) {
        clauses.push(window.to_vec());
        clauses.push(window.iter().map(|&lit| !lit).collect());
    }
    for clause in clauses.iter() {
        assert!(solver.add_clause(clause.clone()).is_ok());
    }
    assert_eq!(
        solver.solve(&[], &mut Indefinite),
        SolverExecutionFlag::Feasible
    );
    assert_model_satisfies_clauses(&solver, &clauses);
}

#[test]
fn branching_strategy_rotation_preserves_the_answers() {
    let mut options = restart_every_conflict_options();
    options.branch_strategy_setup = vec![
        BranchStrategy::Vsids,
        BranchStrategy::Maple,
        BranchStrategy::Rand,
    ];
    let mut solver = SatSolver::new(options);
    let _ = add_pigeonhole_clauses(&mut solver, 3);

    let flag = solver.solve(&[], &mut Indefinite);
    assert_eq!(flag, SolverExecutionFlag::Infeasible);
}

#[test]
fn solving_twice_reuses_the_learnt_state() {
    let mut solver = SatSolver::default();
    let literals = new_literals(&mut solver, 30);
    let mut clauses = vec![];
    for window in literals.windows(3) {
        clauses.push(window.to_vec());
        clauses.push(window.iter().map(|&lit| !lit).collect());
    }
    for clause in clauses.iter() {
        assert!(solver.add_clause(clause.clone()).is_ok());
    }

    assert_eq!(
        solver.solve(&[], &mut Indefinite),
        SolverExecutionFlag::Feasible
    );
    //a second solve on the same solver answers again, from the kept state
    assert_eq!(
        solver.solve(&[], &mut Indefinite),
        SolverExecutionFlag::Feasible
    );
    assert_model_satisfies_clauses(&solver, &clauses);
}

mod result;

use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use embersat::basic_types::SolverExecutionFlag;
use embersat::basic_types::Stopwatch;
use embersat::basic_types::Variable;
use embersat::branching::BranchStrategy;
use embersat::branching::PolarityMode;
use embersat::engine::termination::Combinator;
use embersat::engine::termination::ConflictBudget;
use embersat::engine::termination::OsSignal;
use embersat::engine::termination::TimeBudget;
use embersat::engine::LearningOptions;
use embersat::engine::RestartMode;
use embersat::engine::RestartOptions;
use embersat::engine::SatOptions;
use embersat::engine::SatSolver;
use embersat::parsers::dimacs::parse_cnf_file;
use embersat::parsers::dimacs::DimacsOptions;
use embersat::statistics::statistic_logger;
use log::error;
use log::info;
use log::LevelFilter;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use result::EmbersatError;
use result::EmbersatResult;

#[derive(Debug, Parser)]
#[command(author, version, about = "A CDCL SAT solver with xor-clause extensions")]
struct Args {
    /// The instance to solve, given as a '*.cnf' file in the DIMACS format.
    /// Lines of the form 'x <literals> 0' denote xor constraints.
    instance_path: PathBuf,

    /// The time budget in seconds; exceeding it reports unknown.
    #[arg(short = 't', long = "time-limit")]
    time_limit: Option<u64>,

    /// The conflict budget; exceeding it reports unknown.
    #[arg(long = "max-conflicts")]
    max_conflicts: Option<u64>,

    /// No more than the given number of restarts will be performed.
    #[arg(long = "max-restarts")]
    max_restarts: Option<u64>,

    /// The seed of the random generator; runs with equal seeds and options
    /// behave identically.
    #[arg(long = "random-seed", default_value_t = 42)]
    random_seed: u64,

    /// The polarity selection mode for decision variables.
    #[arg(long = "polarity-mode", value_enum, default_value_t)]
    polarity_mode: PolarityMode,

    /// The fraction of decisions taken uniformly at random.
    #[arg(long = "rnd-var-freq", default_value_t = 0.0)]
    rnd_var_freq: f64,

    /// The restart strategy.
    #[arg(long = "restart-type", value_enum, default_value_t)]
    restart_type: RestartMode,

    /// The base unit of the restart sequence.
    #[arg(long = "restart-first", default_value_t = 50)]
    restart_first: u64,

    /// The growth factor of the geometric restart sequence.
    #[arg(long = "restart-inc", default_value_t = 1.1)]
    restart_inc: f64,

    /// Learnt clauses with glue at most this value are kept permanently.
    #[arg(long = "glue-put-lev0-if-below-or-eq", default_value_t = 3)]
    glue_put_lev0_if_below_or_eq: u32,

    /// Learnt clauses with glue at most this value are kept across
    /// reductions more aggressively.
    #[arg(long = "glue-put-lev1-if-below-or-eq", default_value_t = 6)]
    glue_put_lev1_if_below_or_eq: u32,

    /// The conflict cadence of the tier-1 sweep of the learnt database.
    #[arg(long = "every-lev1-reduce", default_value_t = 10_000)]
    every_lev1_reduce: u64,

    /// The conflict cadence of the tier-2 halving of the learnt database.
    #[arg(long = "every-lev2-reduce", default_value_t = 1_000)]
    every_lev2_reduce: u64,

    /// The initial cap on the number of tier-2 learnt clauses.
    #[arg(long = "max-temp-lev2-learnt-clauses", default_value_t = 30_000)]
    max_temp_lev2_learnt_clauses: usize,

    /// The factor by which the tier-2 cap grows after each reduction.
    #[arg(long = "inc-max-temp-lev2-red-cls", default_value_t = 1.04)]
    inc_max_temp_lev2_red_cls: f64,

    /// Drop learnt clauses with glue above this value at reductions.
    #[arg(long = "max-glue")]
    max_glue: Option<u32>,

    /// Disables recursive learned clause minimisation.
    #[arg(long = "no-recursive-minim")]
    no_recursive_minim: bool,

    /// Disables binary-implication minimisation of learned clauses.
    #[arg(long = "no-minim-red-more")]
    no_minim_red_more: bool,

    /// Backtrack chronologically when the level gap of a conflict exceeds
    /// this value; -1 disables chronological backtracking.
    #[arg(long = "diff-declev-for-chrono", default_value_t = -1, allow_hyphen_values = true)]
    diff_declev_for_chrono: i64,

    /// A '+'-separated sequence of branching strategies the solver rotates
    /// among at restarts, e.g. 'vsids+maple'.
    #[arg(long = "branch-strategy-setup", default_value = "vsids")]
    branch_strategy_setup: String,

    /// The conflict interval between clause exchanges with peer solvers.
    #[arg(long = "sync-every-conf", default_value_t = 6_000)]
    sync_every_conf: u64,

    /// The clause cleaner runs once this many new root assignments accumulated.
    #[arg(long = "clean-after-units", default_value_t = 100)]
    clean_after_units: u64,

    /// Dump the learnt clauses, sorted by glue, to this file on completion.
    #[arg(long = "dumplearnts")]
    dump_learnts_path: Option<PathBuf>,

    /// The maximum length of a dumped learnt clause.
    #[arg(long = "maxdumplearnts", default_value_t = usize::MAX)]
    max_dump_learnts: usize,

    /// Dump the simplified original clauses to this file on completion.
    #[arg(long = "dumporig")]
    dump_orig_path: Option<PathBuf>,

    /// Append the learnt clauses to this file as they are derived.
    #[arg(long = "certificate")]
    certificate_path: Option<PathBuf>,

    /// Recognise 'c Solver::solve()' and 'c Solver::newVar()' comments and
    /// replay them as API calls.
    #[arg(long = "debug-lib")]
    debug_lib: bool,

    /// Enables debug-level logging.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Print search statistics after solving.
    #[arg(short = 's', long = "log-statistics")]
    log_statistics: bool,

    /// Removes the timestamp from the log messages.
    #[arg(long = "omit-timestamp")]
    omit_timestamp: bool,

    /// Removes the call site from the log messages.
    #[arg(long = "omit-call-site")]
    omit_call_site: bool,
}

fn configure_logging(
    verbose: bool,
    omit_timestamp: bool,
    omit_call_site: bool,
) -> std::io::Result<()> {
    let level_filter = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    //log lines are prefixed with 'c ' so that the output stays valid DIMACS commentary
    env_logger::Builder::new()
        .format(move |buf, record| {
            write!(buf, "c ")?;
            if !omit_timestamp {
                write!(buf, "{} ", buf.timestamp())?;
            }
            write!(buf, "{} ", record.level())?;
            if !omit_call_site {
                write!(
                    buf,
                    "[{}:{}] ",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0)
                )?;
            }
            writeln!(buf, "{}", record.args())
        })
        .filter_level(level_filter)
        .init();
    info!("Logging successfully configured");
    Ok(())
}

fn parse_branch_strategies(setup: &str) -> EmbersatResult<Vec<BranchStrategy>> {
    setup
        .split('+')
        .map(|name| match name.trim() {
            "vsids" => Ok(BranchStrategy::Vsids),
            "maple" => Ok(BranchStrategy::Maple),
            "rand" => Ok(BranchStrategy::Rand),
            unknown => Err(EmbersatError::InvalidBranchStrategy(unknown.to_string())),
        })
        .collect()
}

fn stringify_solution(solver: &SatSolver) -> String {
    let solution = solver.get_solution();
    let mut line = (1..solution.num_variables())
        .map(Variable::new)
        .map(|variable| {
            if solution[variable] {
                format!("{} ", variable.index())
            } else {
                format!("-{} ", variable.index())
            }
        })
        .collect::<String>();
    line.push('0');
    line
}

fn main() {
    let exit_code = match run() {
        Ok(exit_code) => exit_code,
        Err(error) => {
            error!("Execution failed, error: {}", error);
            eprintln!("c Execution failed, error: {}", error);
            1
        }
    };
    std::process::exit(exit_code);
}

fn run() -> EmbersatResult<i32> {
    let args = Args::parse();

    configure_logging(args.verbose, args.omit_timestamp, args.omit_call_site)?;
    statistic_logger::configure(args.log_statistics, "c", None);

    let instance_path = args
        .instance_path
        .to_str()
        .ok_or(EmbersatError::InvalidInstanceFile)?;
    if !instance_path.ends_with(".cnf") {
        return Err(EmbersatError::InvalidInstanceFile);
    }

    let certificate_file = args
        .certificate_path
        .as_ref()
        .map(File::create)
        .transpose()?;

    let options = SatOptions {
        learning_options: LearningOptions {
            glue_put_lev0_if_below_or_eq: args.glue_put_lev0_if_below_or_eq,
            glue_put_lev1_if_below_or_eq: args.glue_put_lev1_if_below_or_eq,
            every_lev1_reduce: args.every_lev1_reduce,
            every_lev2_reduce: args.every_lev2_reduce,
            max_temp_lev2_learnt_clauses: args.max_temp_lev2_learnt_clauses,
            inc_max_temp_lev2_red_cls: args.inc_max_temp_lev2_red_cls,
            max_glue: args.max_glue.unwrap_or(u32::MAX),
            do_max_glue_del: args.max_glue.is_some(),
            ..LearningOptions::default()
        },
        restart_options: RestartOptions {
            mode: args.restart_type,
            base_interval: args.restart_first,
            geometric_coef: args.restart_inc,
            ..RestartOptions::default()
        },
        learning_clause_minimisation: !args.no_recursive_minim,
        learning_minimise_binary: !args.no_minim_red_more,
        diff_declev_for_chrono: args.diff_declev_for_chrono,
        rnd_var_freq: args.rnd_var_freq,
        polarity_mode: args.polarity_mode,
        branch_strategy_setup: parse_branch_strategies(&args.branch_strategy_setup)?,
        clean_after_new_root_assignments: args.clean_after_units,
        sync_every_conf: args.sync_every_conf,
        num_restarts_max: args.max_restarts.unwrap_or(u64::MAX),
        certificate_file,
        random_generator: SmallRng::seed_from_u64(args.random_seed),
    };

    let mut solver = SatSolver::new(options);

    let stopwatch = Stopwatch::starting_now();
    if let Err(error) = parse_cnf_file(
        instance_path,
        &mut solver,
        DimacsOptions {
            debug_lib: args.debug_lib,
        },
    ) {
        return Err(EmbersatError::FileReadingError(
            error,
            instance_path.to_string(),
        ));
    }
    info!("Parsing took {} ms", stopwatch.elapsed_millis());

    let mut termination = Combinator::new(
        OsSignal::install(),
        Combinator::new(
            TimeBudget::starting_now(Duration::from_secs(args.time_limit.unwrap_or(u64::MAX))),
            ConflictBudget::with_budget(args.max_conflicts.unwrap_or(u64::MAX)),
        ),
    );

    let flag = solver.solve(&[], &mut termination);

    if args.log_statistics {
        solver.log_statistics();
        statistic_logger::log_statistic_postfix();
    }

    if let Some(path) = &args.dump_orig_path {
        let mut writer = BufWriter::new(File::create(path)?);
        solver.dump_irredundant_clauses(&mut writer)?;
        info!("Dumped the simplified original clauses to {:?}", path);
    }
    if let Some(path) = &args.dump_learnts_path {
        let mut writer = BufWriter::new(File::create(path)?);
        solver.dump_learned_clauses(&mut writer, args.max_dump_learnts)?;
        info!("Dumped the learnt clauses to {:?}", path);
    }

    let exit_code = match flag {
        SolverExecutionFlag::Feasible => {
            println!("s SATISFIABLE");
            println!("v {}", stringify_solution(&solver));
            10
        }
        SolverExecutionFlag::Infeasible
        | SolverExecutionFlag::InfeasibleUnderAssumptions => {
            println!("s UNSATISFIABLE");
            20
        }
        SolverExecutionFlag::Timeout => {
            println!("s UNKNOWN");
            15
        }
    };

    Ok(exit_code)
}

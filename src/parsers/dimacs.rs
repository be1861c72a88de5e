use std::fs;

use log::debug;

use crate::basic_types::Literal;
use crate::basic_types::SolverExecutionFlag;
use crate::basic_types::Variable;
use crate::engine::termination::Indefinite;
use crate::engine::SatSolver;

/// Options that influence the interpretation of the input file.
#[derive(Default, Debug, Copy, Clone)]
pub struct DimacsOptions {
    /// When set, the comment lines `c Solver::solve()` and
    /// `c Solver::newVar()` trigger mid-file calls to the solver API. Used to
    /// replay library call sequences through a file.
    pub debug_lib: bool,
}

/// Reads a DIMACS CNF file with xor extensions into the solver. A line
/// `x <literals> 0` denotes a parity constraint; a negated literal flips the
/// right-hand side, since `~x = 1 (+) x`.
pub fn parse_cnf_file(
    file_location: &str,
    solver: &mut SatSolver,
    options: DimacsOptions,
) -> std::io::Result<()> {
    //this is a slow method of reading, especially for large files,
    //  but for now it will do
    let file_contents = fs::read_to_string(file_location)?;
    debug!("Reading file: {}", file_location);
    parse_cnf(&file_contents, solver, options);
    Ok(())
}

/// Reads DIMACS CNF content into the solver. The input is assumed well-formed
/// in the sense of the format; violations are fatal at this boundary and
/// never reach the search engine.
pub fn parse_cnf(input: &str, solver: &mut SatSolver, options: DimacsOptions) {
    let mut lines = input.lines().filter(|line| {
        !line.starts_with('c')
            || (options.debug_lib && matches!(line.trim_end(), "c Solver::solve()" | "c Solver::newVar()"))
    });

    //read the header line
    //  the format is 'p cnf [num variables] [num clauses]'
    let mut header = lines
        .next()
        .expect("Missing DIMACS header line")
        .split_whitespace();
    assert!(header.next() == Some("p"), "Expected a 'p cnf' header");
    assert!(header.next() == Some("cnf"), "Expected a 'p cnf' header");
    let num_variables = header
        .next()
        .expect("Missing variable count in the header")
        .parse::<u64>()
        .expect("The variable count is not a number");
    let num_clauses = header
        .next()
        .expect("Missing clause count in the header")
        .parse::<u64>()
        .expect("The clause count is not a number");

    //variable i of the file maps to the solver variable of index i; the solver
    //reserves index zero for its internal always-true variable
    let mut variables: Vec<Variable> = (0..num_variables)
        .map(|_i| solver.new_variable())
        .collect();

    debug!("Number of variables: {}", num_variables);
    debug!("Number of clauses: {}", num_clauses);

    let mut num_clauses_read = 0;
    for line in lines {
        if options.debug_lib && line.starts_with('c') {
            match line.trim_end() {
                "c Solver::solve()" => {
                    let flag = solver.solve(&[], &mut Indefinite);
                    debug!("Mid-file solve call returned {:?}", flag);
                    if flag == SolverExecutionFlag::Infeasible {
                        return;
                    }
                }
                "c Solver::newVar()" => {
                    variables.push(solver.new_variable());
                }
                _ => unreachable!(),
            }
            continue;
        }

        let mut tokens = line.split_whitespace().peekable();
        let is_xor = tokens.peek() == Some(&"x");
        if is_xor {
            let _ = tokens.next();
        }

        let raw_literals: Vec<i64> = tokens
            .map(|token| token.parse::<i64>().expect("Literals must be numbers"))
            .take_while(|&value| value != 0)
            .collect();

        if raw_literals.is_empty() && !is_xor {
            continue; //an empty line, or a clause line holding only the terminating zero
        }

        let to_variable = |value: i64| -> Variable {
            //minus one is important: the file indexes variables from one
            variables[value.unsigned_abs() as usize - 1]
        };

        if is_xor {
            //each negated literal flips the parity of the right-hand side
            let mut rhs = true;
            let xor_variables: Vec<Variable> = raw_literals
                .iter()
                .map(|&value| {
                    if value < 0 {
                        rhs = !rhs;
                    }
                    to_variable(value)
                })
                .collect();
            if solver.add_xor_clause(xor_variables, rhs).is_err() {
                debug!("Formula found infeasible while adding an xor clause");
                return;
            }
        } else {
            let literals: Vec<Literal> = raw_literals
                .iter()
                .map(|&value| Literal::new(to_variable(value), value > 0))
                .collect();
            if solver.add_clause(literals).is_err() {
                debug!("Formula found infeasible while adding a clause");
                return;
            }
        }

        num_clauses_read += 1;
    }
    debug!("Number of clauses read: {}", num_clauses_read);
}

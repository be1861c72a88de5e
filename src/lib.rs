//! embersat is a conflict-driven clause learning (CDCL) SAT solver with
//! parity (xor) clause extensions.
//!
//! The solver decides satisfiability of a Boolean formula given as a
//! conjunction of disjunctive clauses and optional xor constraints, and
//! produces a satisfying assignment on feasible instances or, when solving
//! under assumptions, a conflicting subset of the assumptions on infeasible
//! ones.
//!
//! The central type is [`engine::SatSolver`]; the `embersat` binary wraps it
//! behind a DIMACS command-line frontend.

pub mod basic_types;
pub mod branching;
pub mod ember_asserts;
pub mod engine;
pub mod parsers;
pub mod propagators;
pub mod statistics;

use super::ClauseReference;
use super::ConstraintReference;
use super::Literal;

/// A conflict discovered during propagation, carrying enough information to
/// recover the falsified constraint for conflict analysis.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictInfo {
    //virtual binary clauses do not have a clause reference
    //  so we record the two falsified literals directly
    VirtualBinaryClause { lit1: Literal, lit2: Literal },
    StandardClause { clause_reference: ClauseReference },
    XorRow { row_id: u32 },
    //enqueueing a literal whose negation is already assigned
    Propagation {
        literal: Literal,
        reference: ConstraintReference,
    },
}

use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConstraintOperationError {
    #[error("Adding the clause failed because the formula is infeasible at the root")]
    InfeasibleClause,
    #[error("The operation failed because the solver is in an infeasible state")]
    InfeasibleState,
}

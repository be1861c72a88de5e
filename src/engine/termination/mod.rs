mod combinator;
mod conflict_budget;
mod indefinite;
mod os_signal;
mod time_budget;

pub use combinator::Combinator;
pub use conflict_budget::ConflictBudget;
pub use indefinite::Indefinite;
pub use os_signal::OsSignal;
pub use time_budget::TimeBudget;

/// A condition under which the search loop gives up and returns unknown. The
/// solver consults the condition only at restarts and every 256 conflicts, so
/// implementations need not be cheap to evaluate.
pub trait TerminationCondition {
    fn should_stop(&mut self, num_conflicts: u64) -> bool;
}

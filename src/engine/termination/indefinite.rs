use super::TerminationCondition;

/// A [`TerminationCondition`] which never triggers, i.e., the solver runs
/// until it has found an answer.
#[derive(Clone, Copy, Debug, Default)]
pub struct Indefinite;

impl TerminationCondition for Indefinite {
    fn should_stop(&mut self, _num_conflicts: u64) -> bool {
        false
    }
}

use super::TerminationCondition;

/// A [`TerminationCondition`] which triggers when any of its two components
/// triggers. Combinators can be nested to combine more conditions.
#[derive(Clone, Copy, Debug)]
pub struct Combinator<T1, T2> {
    t1: T1,
    t2: T2,
}

impl<T1, T2> Combinator<T1, T2>
where
    T1: TerminationCondition,
    T2: TerminationCondition,
{
    pub fn new(t1: T1, t2: T2) -> Combinator<T1, T2> {
        Combinator { t1, t2 }
    }
}

impl<T1, T2> TerminationCondition for Combinator<T1, T2>
where
    T1: TerminationCondition,
    T2: TerminationCondition,
{
    fn should_stop(&mut self, num_conflicts: u64) -> bool {
        self.t1.should_stop(num_conflicts) || self.t2.should_stop(num_conflicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::termination::ConflictBudget;
    use crate::engine::termination::Indefinite;

    #[test]
    fn triggers_when_either_component_triggers() {
        let mut combinator = Combinator::new(Indefinite, ConflictBudget::with_budget(10));
        assert!(!combinator.should_stop(5));
        assert!(combinator.should_stop(10));
    }
}

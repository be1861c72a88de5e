use std::fmt::Debug;

pub trait MovingAverage: Debug {
    fn add_term(&mut self, new_term: u64);

    fn value(&self) -> f64;

    /// Adapts the internal data structures to take into account the given
    /// interval length, e.g., the length of a restart phase.
    fn adapt(&mut self, interval_length: u64);
}

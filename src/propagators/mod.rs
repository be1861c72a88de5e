mod clausal_propagator;
mod xor_propagator;

pub use clausal_propagator::ClausalPropagator;
pub use clausal_propagator::ClauseWatcher;
pub use xor_propagator::XorAdditionOutcome;
pub use xor_propagator::XorPropagator;
pub use xor_propagator::XorRow;

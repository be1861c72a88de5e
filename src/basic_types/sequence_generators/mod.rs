pub mod constant_sequence;
pub mod geometric_sequence;
pub mod luby_sequence;
pub mod sequence_generator;

pub use constant_sequence::ConstantSequence;
pub use geometric_sequence::GeometricSequence;
pub use luby_sequence::LubySequence;
pub use sequence_generator::SequenceGenerator;

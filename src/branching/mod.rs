pub mod value_selection;
pub mod variable_selection;

pub use value_selection::PolarityMode;
pub use value_selection::ValueSelector;
pub use variable_selection::BranchStrategy;
pub use variable_selection::MapleSelector;
pub use variable_selection::RandomSelector;
pub use variable_selection::VariableSelector;
pub use variable_selection::VsidsSelector;

mod value_selector;

pub use value_selector::PolarityMode;
pub use value_selector::ValueSelector;

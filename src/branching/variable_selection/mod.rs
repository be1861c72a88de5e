mod maple_selector;
mod random_selector;
mod variable_selector;
mod vsids_selector;

pub use maple_selector::MapleSelector;
pub use random_selector::RandomSelector;
pub use variable_selector::VariableSelector;
pub use vsids_selector::VsidsSelector;

use clap::ValueEnum;

/// The variable-order heuristics the searcher can rotate among. The active
/// strategy changes at restarts according to the configured sequence.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchStrategy {
    Vsids,
    Maple,
    Rand,
}

impl std::fmt::Display for BranchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BranchStrategy::Vsids => write!(f, "vsids"),
            BranchStrategy::Maple => write!(f, "maple"),
            BranchStrategy::Rand => write!(f, "rand"),
        }
    }
}

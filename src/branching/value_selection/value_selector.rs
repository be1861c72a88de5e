use clap::ValueEnum;
use rand::rngs::SmallRng;
use rand::Rng;

use crate::basic_types::Literal;
use crate::basic_types::Variable;
use crate::engine::Assignments;

/// How the polarity of a decision variable is chosen.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolarityMode {
    /// Always branch on the positive literal.
    True,
    /// Always branch on the negative literal.
    False,
    /// Choose the polarity uniformly at random.
    Rnd,
    /// Jeroslow-Wang weighting for the initial polarities, after which the
    /// last assigned polarity of the variable is cached and reused.
    #[default]
    Auto,
    /// Use the polarity the variable had on the longest trail seen so far.
    Stable,
    /// The inversion of the longest-trail polarity.
    BestInverted,
}

impl std::fmt::Display for PolarityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolarityMode::True => write!(f, "true"),
            PolarityMode::False => write!(f, "false"),
            PolarityMode::Rnd => write!(f, "rnd"),
            PolarityMode::Auto => write!(f, "auto"),
            PolarityMode::Stable => write!(f, "stable"),
            PolarityMode::BestInverted => write!(f, "best-inverted"),
        }
    }
}

/// Chooses the truth value for a decision variable according to the
/// configured polarity mode. The selector tracks two polarity memories: the
/// cached last-assigned values (used by [`PolarityMode::Auto`]) and the
/// values the variables had on the longest trail observed so far (used by
/// [`PolarityMode::Stable`] and [`PolarityMode::BestInverted`]).
pub struct ValueSelector {
    mode: PolarityMode,
    truth_values: Vec<CandidateTruthAssignment>,
    best_truth_values: Vec<bool>,
    longest_trail_seen: usize,
}

struct CandidateTruthAssignment {
    value: bool,
    frozen: bool,
}

impl ValueSelector {
    pub fn new(mode: PolarityMode) -> ValueSelector {
        ValueSelector {
            mode,
            truth_values: vec![],
            best_truth_values: vec![],
            longest_trail_seen: 0,
        }
    }

    pub fn grow(&mut self) {
        self.truth_values.push(CandidateTruthAssignment {
            value: false,
            frozen: false,
        });
        self.best_truth_values.push(false);
    }

    pub fn select_value(&self, variable: Variable, random_generator: &mut SmallRng) -> bool {
        match self.mode {
            PolarityMode::True => true,
            PolarityMode::False => false,
            PolarityMode::Rnd => random_generator.gen::<bool>(),
            PolarityMode::Auto => self.truth_values[variable].value,
            PolarityMode::Stable => self.best_truth_values[variable],
            PolarityMode::BestInverted => !self.best_truth_values[variable],
        }
    }

    pub fn update_if_not_frozen(&mut self, variable: Variable, new_truth_value: bool) {
        if !self.truth_values[variable].frozen {
            self.truth_values[variable].value = new_truth_value;
        }
    }

    pub fn update_and_freeze(&mut self, variable: Variable, new_truth_value: bool) {
        self.truth_values[variable].value = new_truth_value;
        self.truth_values[variable].frozen = true;
    }

    /// Caches the polarity of a variable that is being unassigned.
    pub fn on_unassign(&mut self, literal: Literal) {
        self.update_if_not_frozen(literal.get_variable(), literal.is_positive());
    }

    /// Snapshots the current polarities whenever the trail is the deepest
    /// observed so far.
    pub fn notify_trail_depth(&mut self, assignments: &Assignments) {
        if assignments.num_trail_entries() <= self.longest_trail_seen {
            return;
        }
        self.longest_trail_seen = assignments.num_trail_entries();
        for variable in assignments.get_variables() {
            if assignments.is_variable_assigned(variable) {
                self.best_truth_values[variable] =
                    assignments.is_variable_assigned_true(variable);
            }
        }
    }
}

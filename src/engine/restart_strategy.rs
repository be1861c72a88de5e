use clap::ValueEnum;

use crate::basic_types::moving_averages::CumulativeMovingAverage;
use crate::basic_types::moving_averages::MovingAverage;
use crate::basic_types::moving_averages::WindowedMovingAverage;
use crate::basic_types::sequence_generators::ConstantSequence;
use crate::basic_types::sequence_generators::GeometricSequence;
use crate::basic_types::sequence_generators::LubySequence;
use crate::basic_types::sequence_generators::SequenceGenerator;

/// When the solver restarts. The glue-based mode follows the Glucose scheme:
/// restart when the recently learned clauses are of poor quality, i.e., when
/// the short-term average LBD exceeds the long-term average scaled by a
/// coefficient. The alternating mode switches between a glue phase and a
/// geometric phase at every restart.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartMode {
    Never,
    Geom,
    Luby,
    #[default]
    Glue,
    GlueGeom,
}

impl std::fmt::Display for RestartMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestartMode::Never => write!(f, "never"),
            RestartMode::Geom => write!(f, "geom"),
            RestartMode::Luby => write!(f, "luby"),
            RestartMode::Glue => write!(f, "glue"),
            RestartMode::GlueGeom => write!(f, "glue-geom"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RestartOptions {
    pub mode: RestartMode,
    /// The base unit of the restart sequence: the first geometric phase
    /// length, the Luby multiplier, and the short-term LBD window size.
    pub base_interval: u64,
    /// The growth factor of the geometric sequence.
    pub geometric_coef: f64,
    /// A restart is forced when the short-term average LBD exceeds the
    /// long-term average multiplied by this coefficient. A greater/lower
    /// value means a less/more frequent restart policy.
    pub lbd_coef: f64,
    /// A pending glue restart is blocked when the current trail depth exceeds
    /// the windowed average trail depth multiplied by this coefficient, i.e.,
    /// when the solver appears to be making progress towards a solution.
    pub num_assigned_coef: f64,
    /// The window length for the trail-depth average used by blocking.
    pub num_assigned_window: u64,
    /// The minimum number of conflicts before the first restart is considered.
    pub min_num_conflicts_before_first_restart: u64,
}

impl Default for RestartOptions {
    fn default() -> Self {
        // The values are based on the Glucose defaults.
        Self {
            mode: RestartMode::default(),
            base_interval: 50,
            geometric_coef: 1.1,
            lbd_coef: 1.25,
            num_assigned_coef: 1.4,
            num_assigned_window: 5000,
            min_num_conflicts_before_first_restart: 100,
        }
    }
}

#[derive(Debug)]
pub struct RestartStrategy {
    options: RestartOptions,
    /// Generates the number of conflicts that must pass before the next
    /// restart is considered.
    sequence_generator: Box<dyn SequenceGenerator>,
    num_conflicts_encountered_since_restart: u64,
    num_conflicts_until_restart: u64,
    lbd_short_term_moving_average: WindowedMovingAverage,
    lbd_long_term_moving_average: CumulativeMovingAverage,
    num_assigned_variables_moving_average: WindowedMovingAverage,
    num_restarts: u64,
    num_blocked_restarts: u64,
    /// In the alternating mode, whether the current phase is geometric.
    in_geometric_phase: bool,
}

impl Default for RestartStrategy {
    fn default() -> Self {
        RestartStrategy::new(RestartOptions::default())
    }
}

impl RestartStrategy {
    pub fn new(options: RestartOptions) -> Self {
        let mut sequence_generator: Box<dyn SequenceGenerator> = match options.mode {
            RestartMode::Never | RestartMode::Glue => {
                Box::new(ConstantSequence::new(options.base_interval as i64))
            }
            RestartMode::Geom | RestartMode::GlueGeom => Box::new(GeometricSequence::new(
                options.base_interval as i64,
                options.geometric_coef,
            )),
            RestartMode::Luby => Box::new(LubySequence::new(options.base_interval as i64)),
        };

        let num_conflicts_until_restart = sequence_generator
            .next()
            .try_into()
            .expect("Expected the restart sequence to generate a positive value");

        RestartStrategy {
            sequence_generator,
            num_conflicts_encountered_since_restart: 0,
            num_conflicts_until_restart,
            lbd_short_term_moving_average: WindowedMovingAverage::new(options.base_interval),
            lbd_long_term_moving_average: CumulativeMovingAverage::default(),
            num_assigned_variables_moving_average: WindowedMovingAverage::new(
                options.num_assigned_window,
            ),
            num_restarts: 0,
            num_blocked_restarts: 0,
            in_geometric_phase: true,
            options,
        }
    }

    pub fn num_restarts(&self) -> u64 {
        self.num_restarts
    }

    pub fn num_blocked_restarts(&self) -> u64 {
        self.num_blocked_restarts
    }

    /// Determines whether a restart should take place. Before the first
    /// restart a minimum number of conflicts must pass to collect early
    /// statistics; afterwards the decision depends on the restart mode: the
    /// sequence-paced modes restart as soon as their conflict budget is
    /// spent, while the glue mode additionally requires the solver to be
    /// learning "sufficiently bad" clauses relative to the long-term average.
    pub fn should_restart(&self) -> bool {
        if self.options.mode == RestartMode::Never {
            return false;
        }

        // Do not restart until a certain number of conflicts took place before the first restart
        // this is done to collect some early runtime statistics for the restart strategy
        if self.is_before_first_restart() {
            return false;
        }

        // Do not restart until a minimum number of conflicts took place after the last restart
        if !self.is_conflict_budget_spent() {
            return false;
        }

        if !self.is_glue_phase() {
            return true;
        }

        // Only restart if the solver is learning "bad" clauses, which is the case when the
        // long-term average lbd multiplied by the coefficient is exceeded by the short-term
        // average lbd
        self.lbd_long_term_moving_average.value() * self.options.lbd_coef
            <= self.lbd_short_term_moving_average.value()
    }

    fn is_glue_phase(&self) -> bool {
        match self.options.mode {
            RestartMode::Glue => true,
            RestartMode::GlueGeom => !self.in_geometric_phase,
            _ => false,
        }
    }

    fn is_before_first_restart(&self) -> bool {
        self.num_restarts == 0
            && self.num_conflicts_encountered_since_restart
                < self.options.min_num_conflicts_before_first_restart
    }

    fn is_conflict_budget_spent(&self) -> bool {
        self.num_conflicts_until_restart <= self.num_conflicts_encountered_since_restart
    }

    /// Notifies the strategy of a conflict, updating the moving averages.
    /// This method also checks whether a pending glue restart should be
    /// blocked because the solver is "sufficiently close" to a solution.
    pub fn notify_conflict(&mut self, lbd: u32, num_assigned_variables: u64) {
        self.num_assigned_variables_moving_average
            .add_term(num_assigned_variables);
        self.lbd_short_term_moving_average.add_term(lbd as u64);
        self.lbd_long_term_moving_average.add_term(lbd as u64);

        self.num_conflicts_encountered_since_restart += 1;

        if self.should_block_restart(num_assigned_variables) {
            self.num_blocked_restarts += 1;
            self.reset_values()
        }
    }

    fn should_block_restart(&self, num_assigned_variables: u64) -> bool {
        // If the solver has more variables assigned now than in the recent past, then block the
        // restart. The idea is that the solver is 'closer' to finding a solution and restarting
        // could be harmful to the performance

        if !self.is_glue_phase() || self.is_before_first_restart() {
            return false;
        }

        let close_to_solution = num_assigned_variables as f64
            > self.num_assigned_variables_moving_average.value()
                * self.options.num_assigned_coef;

        self.is_conflict_budget_spent() && close_to_solution
    }

    /// Notifies the strategy that a restart has taken place.
    pub fn notify_restart(&mut self) {
        self.num_restarts += 1;
        self.in_geometric_phase = !self.in_geometric_phase;
        self.reset_values()
    }

    /// Resets the values related to determining whether a restart takes place; called whenever a
    /// restart has taken place or should have taken place and was blocked.
    fn reset_values(&mut self) {
        self.num_conflicts_until_restart = self
            .sequence_generator
            .next()
            .try_into()
            .expect("Expected the restart sequence to generate a positive value");
        self.num_conflicts_encountered_since_restart = 0;
        self.lbd_short_term_moving_average
            .adapt(self.num_conflicts_until_restart);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options_with(mode: RestartMode) -> RestartOptions {
        RestartOptions {
            mode,
            base_interval: 10,
            min_num_conflicts_before_first_restart: 10,
            ..RestartOptions::default()
        }
    }

    #[test]
    fn never_mode_does_not_restart() {
        let mut strategy = RestartStrategy::new(options_with(RestartMode::Never));
        for _ in 0..1000 {
            strategy.notify_conflict(100, 5);
            assert!(!strategy.should_restart());
        }
    }

    #[test]
    fn geometric_mode_restarts_when_the_budget_is_spent() {
        let mut strategy = RestartStrategy::new(options_with(RestartMode::Geom));
        for _ in 0..9 {
            strategy.notify_conflict(3, 5);
            assert!(!strategy.should_restart());
        }
        strategy.notify_conflict(3, 5);
        assert!(strategy.should_restart());
        strategy.notify_restart();
        assert_eq!(strategy.num_restarts(), 1);
        assert!(!strategy.should_restart());
    }

    #[test]
    fn glue_mode_restarts_only_on_poor_lbd() {
        let mut strategy = RestartStrategy::new(options_with(RestartMode::Glue));
        //consistently good clauses: the short-term average equals the long-term average,
        //which does not exceed it multiplied by the coefficient
        for _ in 0..50 {
            strategy.notify_conflict(2, 5);
        }
        assert!(!strategy.should_restart());

        //a burst of poor clauses drives the short-term average up
        for _ in 0..20 {
            strategy.notify_conflict(50, 5);
        }
        assert!(strategy.should_restart());
    }

    #[test]
    fn deep_trails_block_glue_restarts() {
        let mut strategy = RestartStrategy::new(options_with(RestartMode::Glue));
        for _ in 0..30 {
            strategy.notify_conflict(2, 10);
        }
        //a sudden much deeper trail with poor lbd blocks the pending restart
        strategy.notify_conflict(50, 1000);
        assert_eq!(strategy.num_blocked_restarts(), 1);
    }

    #[test]
    fn alternating_mode_switches_phase_each_restart() {
        let strategy = RestartStrategy::new(options_with(RestartMode::GlueGeom));
        assert!(!strategy.is_glue_phase());
        let mut strategy = strategy;
        strategy.notify_restart();
        assert!(strategy.is_glue_phase());
        strategy.notify_restart();
        assert!(!strategy.is_glue_phase());
    }
}

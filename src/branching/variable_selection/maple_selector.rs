use rand::rngs::SmallRng;

use super::VariableSelector;
use crate::basic_types::KeyValueHeap;
use crate::basic_types::Variable;
use crate::engine::Assignments;

/// A learning-rate-based heuristic in the style of Maple solvers: while a
/// variable is assigned it accumulates the number of conflicts it takes part
/// in, and on unassignment its activity is updated with an exponential moving
/// average of the conflict rate over the assignment interval. The smoothing
/// step size decays from its original value towards a minimum as conflicts
/// accumulate.
pub struct MapleSelector {
    heap: KeyValueHeap,
    assigned_at_conflict: Vec<u64>,
    num_conflicts_participated: Vec<u32>,
    step_size: f64,
    min_step_size: f64,
    step_size_decay: f64,
}

impl MapleSelector {
    pub fn new(orig_step_size: f64, min_step_size: f64) -> MapleSelector {
        MapleSelector {
            heap: KeyValueHeap::new(),
            assigned_at_conflict: vec![],
            num_conflicts_participated: vec![],
            step_size: orig_step_size,
            min_step_size,
            step_size_decay: 0.000_001,
        }
    }
}

impl Default for MapleSelector {
    fn default() -> Self {
        MapleSelector::new(0.4, 0.06)
    }
}

impl VariableSelector for MapleSelector {
    fn grow(&mut self) {
        self.heap.grow(0.0);
        self.assigned_at_conflict.push(0);
        self.num_conflicts_participated.push(0);
    }

    fn bump_activity(&mut self, variable: Variable) {
        self.num_conflicts_participated[variable] += 1;
    }

    fn on_conflict(&mut self) {
        self.step_size = (self.step_size - self.step_size_decay).max(self.min_step_size);
    }

    fn on_assign(&mut self, variable: Variable, num_conflicts: u64) {
        self.assigned_at_conflict[variable] = num_conflicts;
        self.num_conflicts_participated[variable] = 0;
    }

    fn on_unassign(&mut self, variable: Variable, num_conflicts: u64) {
        let interval = num_conflicts - self.assigned_at_conflict[variable];
        if interval > 0 {
            let reward =
                self.num_conflicts_participated[variable] as f64 / interval as f64;
            let old_activity = self.heap.get_value(variable.index());
            let new_activity =
                self.step_size * reward + (1.0 - self.step_size) * old_activity;
            self.heap
                .increment(variable.index(), new_activity - old_activity);
        }
        self.heap.restore_key(variable.index());
    }

    fn peek_next_variable(
        &mut self,
        assignments: &Assignments,
        _random_generator: &mut SmallRng,
    ) -> Option<Variable> {
        loop {
            if let Some(candidate_variable) = self.heap.peek_max().map(Variable::new) {
                if assignments.is_variable_assigned(candidate_variable) {
                    let _ = self.heap.pop_max();
                } else {
                    return Some(candidate_variable);
                }
            } else {
                return None;
            }
        }
    }

    fn name(&self) -> &'static str {
        "maple"
    }
}

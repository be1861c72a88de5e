use rand::rngs::SmallRng;

use super::VariableSelector;
use crate::basic_types::KeyValueHeap;
use crate::basic_types::Variable;
use crate::engine::Assignments;

/// The VSIDS heuristic: each variable carries a floating-point activity that
/// is bumped whenever the variable takes part in conflict analysis, and all
/// bumps decay geometrically over time. Selection takes the unassigned
/// variable of maximum activity from a lazily maintained heap.
pub struct VsidsSelector {
    heap: KeyValueHeap,
    increment: f64,
    max_threshold: f64,
    decay_factor: f64,
}

impl VsidsSelector {
    pub fn new(decay_factor: f64) -> VsidsSelector {
        VsidsSelector {
            heap: KeyValueHeap::new(),
            increment: 1.0,
            max_threshold: 1e100,
            decay_factor,
        }
    }
}

impl Default for VsidsSelector {
    fn default() -> Self {
        VsidsSelector::new(0.95)
    }
}

impl VariableSelector for VsidsSelector {
    fn grow(&mut self) {
        self.heap.grow(0.0);
    }

    fn bump_activity(&mut self, variable: Variable) {
        //scale the activities if the values get too large
        let activity = self.heap.get_value(variable.index());
        if activity + self.increment >= self.max_threshold {
            self.heap.divide_values(self.max_threshold);
            self.increment /= self.max_threshold;
        }
        //now perform the standard bumping
        self.heap.increment(variable.index(), self.increment);
    }

    fn on_conflict(&mut self) {
        //note that decaying activities is implemented as increasing the 'increment'
        //  so that future bumps are more impactful
        //  this is cheaper than dividing each activity value
        self.increment *= 1.0 / self.decay_factor;
    }

    fn on_assign(&mut self, _variable: Variable, _num_conflicts: u64) {}

    fn on_unassign(&mut self, variable: Variable, _num_conflicts: u64) {
        self.heap.restore_key(variable.index());
    }

    fn peek_next_variable(
        &mut self,
        assignments: &Assignments,
        _random_generator: &mut SmallRng,
    ) -> Option<Variable> {
        loop {
            if let Some(candidate_variable) = self.heap.peek_max().map(Variable::new) {
                //note that some variables on the heap may already be assigned because a lazy data
                //structure is used; in case an assigned variable is next, remove it from the heap,
                //and loop again
                if assignments.is_variable_assigned(candidate_variable) {
                    let _ = self.heap.pop_max();
                } else {
                    return Some(candidate_variable);
                }
            //otherwise there are no variables left in the heap
            } else {
                return None;
            }
        }
    }

    fn name(&self) -> &'static str {
        "vsids"
    }
}

use super::Variable;
use crate::ember_assert_simple;

/// A satisfying truth assignment recorded when the search finds a solution.
#[derive(Default, Clone, Debug)]
pub struct Solution {
    truth_values: Vec<bool>,
}

impl Solution {
    pub fn new(truth_values: Vec<bool>) -> Solution {
        Solution { truth_values }
    }

    pub fn num_variables(&self) -> u32 {
        self.truth_values.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.truth_values.is_empty()
    }

    pub fn get_value(&self, variable: Variable) -> bool {
        ember_assert_simple!((variable.index() as usize) < self.truth_values.len());
        self.truth_values[variable]
    }
}

impl std::ops::Index<Variable> for Solution {
    type Output = bool;
    fn index(&self, variable: Variable) -> &bool {
        &self.truth_values[variable]
    }
}

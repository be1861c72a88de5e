use std::iter::Rev;
use std::ops::Deref;
use std::vec::Drain;

use crate::ember_assert_simple;

#[derive(Clone, Debug)]
pub struct Trail<T> {
    current_decision_level: u32,
    /// At index i is the position where the i-th decision level ends (exclusive) on the trail
    trail_delimiter: Vec<usize>,
    trail: Vec<T>,
}

impl<T> Default for Trail<T> {
    fn default() -> Self {
        Trail {
            current_decision_level: Default::default(),
            trail_delimiter: Default::default(),
            trail: Default::default(),
        }
    }
}

impl<T> Trail<T> {
    pub fn increase_decision_level(&mut self) {
        self.current_decision_level += 1;
        self.trail_delimiter.push(self.trail.len());
    }

    pub fn get_decision_level(&self) -> u32 {
        self.current_decision_level
    }

    /// The trail position at which the given decision level begins.
    pub fn get_level_start(&self, decision_level: u32) -> usize {
        ember_assert_simple!(decision_level >= 1 && decision_level <= self.current_decision_level);
        self.trail_delimiter[decision_level as usize - 1]
    }

    pub fn synchronise(&mut self, new_decision_level: u32) -> Rev<Drain<'_, T>> {
        ember_assert_simple!(new_decision_level < self.current_decision_level);

        let new_trail_len = self.trail_delimiter[new_decision_level as usize];

        self.current_decision_level = new_decision_level;
        self.trail_delimiter.truncate(new_decision_level as usize);
        self.trail.drain(new_trail_len..).rev()
    }

    pub fn push(&mut self, elem: T) {
        self.trail.push(elem)
    }
}

impl<T> Deref for Trail<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.trail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushed_values_are_observed_through_indexing() {
        let mut trail = Trail::default();

        let expected = [1, 2, 3, 4];
        for &elem in expected.iter() {
            trail.push(elem);
        }

        assert_eq!(&expected, trail.deref());
    }

    #[test]
    fn backtracking_removes_elements_beyond_decision_level() {
        let mut trail = Trail::default();

        trail.increase_decision_level();
        trail.push(1);
        let _ = trail.synchronise(0);

        assert!(trail.is_empty());
    }

    #[test]
    fn backtracking_is_nonchronological() {
        let mut trail = Trail::default();
        trail.push(1);

        trail.increase_decision_level();
        trail.push(2);
        trail.increase_decision_level();
        trail.push(3);
        trail.increase_decision_level();
        trail.push(4);

        let _ = trail.synchronise(1);

        assert_eq!(&[1, 2], trail.deref());
    }

    #[test]
    fn popped_elements_are_given_in_reverse_order_when_backtracking() {
        let mut trail = Trail::default();
        trail.push(1);

        trail.increase_decision_level();
        trail.push(2);
        trail.increase_decision_level();
        trail.push(3);
        trail.increase_decision_level();
        trail.push(4);

        let popped = trail.synchronise(0).collect::<Vec<_>>();
        assert_eq!(vec![4, 3, 2], popped);
    }

    #[test]
    fn level_starts_track_the_trail_positions_of_decisions() {
        let mut trail = Trail::default();
        trail.push(1);

        trail.increase_decision_level();
        trail.push(2);
        trail.push(3);
        trail.increase_decision_level();
        trail.push(4);

        assert_eq!(trail.get_level_start(1), 1);
        assert_eq!(trail.get_level_start(2), 3);
    }
}

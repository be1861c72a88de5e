use super::MovingAverage;

#[derive(Default, Debug, Copy, Clone)]
pub struct CumulativeMovingAverage {
    sum: u64,
    num_terms: u64,
}

impl MovingAverage for CumulativeMovingAverage {
    fn add_term(&mut self, new_term: u64) {
        self.sum += new_term;
        self.num_terms += 1;
    }

    fn value(&self) -> f64 {
        if self.num_terms > 0 {
            (self.sum as f64) / (self.num_terms as f64)
        } else {
            0.0
        }
    }

    fn adapt(&mut self, _interval_length: u64) {
        //do nothing, the cumulative average considers all terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_average_is_zero() {
        let average = CumulativeMovingAverage::default();
        assert_eq!(average.value(), 0.0);
    }

    #[test]
    fn average_over_all_terms() {
        let mut average = CumulativeMovingAverage::default();
        average.add_term(10);
        average.add_term(20);
        average.add_term(30);
        assert_eq!(average.value(), 20.0);
    }
}

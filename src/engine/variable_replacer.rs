use crate::basic_types::Variable;
use crate::basic_types::VariableStatus;
use crate::ember_assert_moderate;

/// Records binary variable equivalences discovered when xor rows collapse to
/// two variables: `kept = replaced (+) inverted`. Executing the replacement
/// throughout the clause database is the business of an external simplifier;
/// the core only records the equivalence, marks the replaced variable, and
/// keeps the equivalence enforced through a pair of binary clauses.
#[derive(Default, Debug)]
pub struct VariableReplacer {
    statuses: Vec<VariableStatus>,
    equivalences: Vec<Equivalence>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Equivalence {
    pub kept: Variable,
    pub replaced: Variable,
    pub inverted: bool,
}

impl VariableReplacer {
    pub fn grow(&mut self) {
        self.statuses.push(VariableStatus::Active);
    }

    pub fn get_status(&self, variable: Variable) -> VariableStatus {
        self.statuses[variable]
    }

    pub fn is_active(&self, variable: Variable) -> bool {
        self.statuses[variable] == VariableStatus::Active
    }

    pub fn num_replaced_variables(&self) -> usize {
        self.equivalences.len()
    }

    pub fn equivalences(&self) -> &[Equivalence] {
        &self.equivalences
    }

    /// Registers `lhs (+) rhs = inverted`. The variable of the higher index
    /// is marked as replaced by the other.
    pub fn replace(&mut self, lhs: Variable, rhs: Variable, inverted: bool) {
        ember_assert_moderate!(lhs != rhs);
        let (kept, replaced) = if lhs.index() < rhs.index() {
            (lhs, rhs)
        } else {
            (rhs, lhs)
        };
        //a variable that is already replaced keeps its original status; the equivalence is
        //still recorded so that the external simplifier can chain the replacements
        if self.statuses[replaced] == VariableStatus::Active {
            self.statuses[replaced] = VariableStatus::Replaced;
        }
        self.equivalences.push(Equivalence {
            kept,
            replaced,
            inverted,
        });
    }
}

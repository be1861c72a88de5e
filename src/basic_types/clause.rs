use super::Literal;
use crate::ember_assert_moderate;
use crate::ember_assert_simple;

//the boolean properties of a clause are packed into a single flags byte
const FLAG_LEARNED: u8 = 1;
const FLAG_DELETED: u8 = 1 << 1;
const FLAG_PROTECTED: u8 = 1 << 2;
const FLAG_STRENGTHENED: u8 = 1 << 3;

/// A clause held by the clause allocator, of length at least two. Shorter
/// clauses never reach the allocator: binary clauses live inline in the
/// clausal propagator's watch lists and unit clauses become root
/// assignments. While a clause is attached, its first two literals are the
/// watched literals.
#[allow(clippy::len_without_is_empty)] // at least two literals at all times
pub struct Clause {
    literals: Vec<Literal>,
    lbd: u32,
    activity: f32,
    tier: u8,
    flags: u8,
    last_touched: u64,
}

impl Clause {
    pub fn new(literals: Vec<Literal>, is_learned: bool) -> Clause {
        ember_assert_simple!(literals.len() >= 2);

        //the glue is unknown until analysis first touches the clause; the
        //clause length is an upper bound on it
        let lbd = literals.len() as u32;
        Clause {
            literals,
            lbd,
            activity: 0.0,
            tier: 2,
            flags: if is_learned { FLAG_LEARNED } else { 0 },
            last_touched: 0,
        }
    }

    fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    pub fn len(&self) -> u32 {
        self.literals.len() as u32
    }

    pub fn is_learned(&self) -> bool {
        self.has_flag(FLAG_LEARNED)
    }

    pub fn is_deleted(&self) -> bool {
        self.has_flag(FLAG_DELETED)
    }

    pub fn is_protected_against_deletion(&self) -> bool {
        self.has_flag(FLAG_PROTECTED)
    }

    pub fn is_strengthened(&self) -> bool {
        self.has_flag(FLAG_STRENGTHENED)
    }

    pub fn get_literal_slice(&self) -> &[Literal] {
        &self.literals
    }

    pub fn get_lbd(&self) -> u32 {
        self.lbd
    }

    pub fn get_activity(&self) -> f32 {
        ember_assert_moderate!(self.activity.is_finite());
        self.activity
    }

    pub fn get_tier(&self) -> u8 {
        self.tier
    }

    pub fn get_last_touched(&self) -> u64 {
        self.last_touched
    }

    //marking does not free the clause: the allocator keeps the slot and
    //recycles it at a later allocation
    pub fn mark_deleted(&mut self) {
        ember_assert_moderate!(!self.is_deleted());
        self.flags |= FLAG_DELETED;
    }

    pub fn mark_protection_against_deletion(&mut self) {
        self.flags |= FLAG_PROTECTED;
    }

    pub fn clear_protection_against_deletion(&mut self) {
        ember_assert_moderate!(self.is_protected_against_deletion());
        self.flags &= !FLAG_PROTECTED;
    }

    pub fn mark_strengthened(&mut self) {
        self.flags |= FLAG_STRENGTHENED;
    }

    pub fn update_lbd(&mut self, new_lbd: u32) {
        ember_assert_moderate!(new_lbd < self.lbd);
        self.lbd = new_lbd;
    }

    pub fn set_tier(&mut self, tier: u8) {
        ember_assert_simple!(tier <= 2);
        self.tier = tier;
    }

    pub fn set_last_touched(&mut self, conflict_index: u64) {
        self.last_touched = conflict_index;
    }

    pub fn increase_activity(&mut self, increment: f32) {
        self.activity += increment;
    }

    pub fn divide_activity(&mut self, division_factor: f32) {
        self.activity /= division_factor;
    }

    /// Drops the literal at the given position, keeping the order of the
    /// remaining literals. The clause cleaner calls this at the root while
    /// the clause is detached from the watch lists.
    pub fn remove_literal_at(&mut self, position: usize) {
        let _ = self.literals.remove(position);
    }
}

impl std::ops::Index<u32> for Clause {
    type Output = Literal;
    fn index(&self, index: u32) -> &Literal {
        self.literals.index(index as usize)
    }
}

impl std::ops::IndexMut<u32> for Clause {
    fn index_mut(&mut self, index: u32) -> &mut Literal {
        self.literals.index_mut(index as usize)
    }
}

impl std::fmt::Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (position, literal) in self.literals.iter().enumerate() {
            if position > 0 {
                write!(f, " ")?;
            }
            write!(f, "{literal}")?;
        }
        write!(f, ")")?;
        if self.is_learned() {
            write!(f, " learnt[glue={}, tier={}]", self.lbd, self.tier)?;
        }
        if self.is_deleted() {
            write!(f, " deleted")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Variable;

    fn clause_over(indices: &[u32], is_learned: bool) -> Clause {
        Clause::new(
            indices
                .iter()
                .map(|&index| Literal::new(Variable::new(index), true))
                .collect(),
            is_learned,
        )
    }

    #[test]
    fn a_fresh_clause_starts_with_a_pessimistic_glue() {
        let clause = clause_over(&[1, 2, 3], true);
        assert_eq!(clause.get_lbd(), 3);
        assert_eq!(clause.get_tier(), 2);
        assert!(clause.is_learned());
    }

    #[test]
    fn the_flags_are_independent() {
        let mut clause = clause_over(&[1, 2, 3], true);

        clause.mark_protection_against_deletion();
        clause.mark_strengthened();
        assert!(clause.is_protected_against_deletion());
        assert!(clause.is_strengthened());
        assert!(!clause.is_deleted());

        clause.clear_protection_against_deletion();
        assert!(!clause.is_protected_against_deletion());
        assert!(clause.is_strengthened());
        assert!(clause.is_learned());

        clause.mark_deleted();
        assert!(clause.is_deleted());
        assert!(clause.is_strengthened());
    }
}

use bitfield::Bit;
use bitfield::BitMut;
use bitfield::BitRange;

use super::ConstraintReference;
use super::Literal;
use crate::ember_assert_moderate;

#[derive(PartialEq, Eq, Clone, Copy, Hash)]
pub struct ClauseReference {
    //the clause reference may refer to a virtual binary clause, an xor row, or an allocated clause
    //the idea is to pack all this information into 32 bits
    //this is done in the following way
    //1. binary clause: the 31st bit is one (31st bit -> most significant bit)
    //      the remaining 31 bits encode a literal that is part of the binary clause
    //      the other literal of the binary clause is to be recovered from the data structure that
    //      stores this constraint reference, e.g., if ref 'r' is used as the reason for propagating
    //      variable x, then the binary clause is (x v r)
    //2. xor row: the 31st bit is zero and the 30th bit is one
    //      the remaining 30 bits encode the id of the xor row in the xor propagator
    //3. allocated clause: both the 31st and 30th bit are zero
    //      the remaining 30 bits encode the clause id
    code: u32,
}

impl ClauseReference {
    pub fn is_virtual_binary_clause(&self) -> bool {
        self.code.bit(31)
    }

    pub fn is_xor_row(&self) -> bool {
        !self.code.bit(31) && self.code.bit(30)
    }

    pub fn is_allocated_clause(&self) -> bool {
        ClauseReference::are_two_most_significant_bits_zero(self.code)
    }

    pub fn get_virtual_binary_clause_literal(&self) -> Literal {
        ember_assert_moderate!(self.is_virtual_binary_clause());
        let literal_code = <u32 as BitRange<u32>>::bit_range(&self.code, 30, 0);
        Literal::u32_to_literal(literal_code)
    }

    pub fn get_xor_row_id(&self) -> u32 {
        ember_assert_moderate!(self.is_xor_row());
        <u32 as BitRange<u32>>::bit_range(&self.code, 29, 0)
    }

    pub fn create_allocated_clause_reference(id: u32) -> Self {
        ember_assert_moderate!(ClauseReference::is_valid_allocated_clause_id(id));
        ClauseReference { code: id }
    }

    //creates the reference to indicate that propagation was due to the input literal as part of a
    //binary clause
    pub fn create_virtual_binary_clause_reference(literal: Literal) -> ClauseReference {
        ember_assert_moderate!(!literal.to_u32().bit(31));
        let mut code = literal.to_u32();
        code.set_bit(31, true);
        ClauseReference { code }
    }

    pub fn create_xor_row_reference(row_id: u32) -> ClauseReference {
        ember_assert_moderate!(!row_id.bit(31) && !row_id.bit(30));
        let mut code = row_id;
        code.set_bit(30, true);
        ClauseReference { code }
    }

    //for internal purposes, not to be called usually
    pub fn get_code(&self) -> u32 {
        self.code
    }

    fn are_two_most_significant_bits_zero(number: u32) -> bool {
        <u32 as BitRange<u32>>::bit_range(&number, 31, 30) == 0
    }

    fn is_valid_allocated_clause_id(clause_id: u32) -> bool {
        ClauseReference::are_two_most_significant_bits_zero(clause_id) && clause_id != 0
    }
}

impl From<ConstraintReference> for ClauseReference {
    fn from(constraint_reference: ConstraintReference) -> Self {
        ember_assert_moderate!(!constraint_reference.is_null());
        ClauseReference {
            code: constraint_reference.get_code(),
        }
    }
}

impl std::fmt::Debug for ClauseReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_virtual_binary_clause() {
            write!(
                f,
                "ClauseReference::VirtualBinary({})",
                self.get_virtual_binary_clause_literal()
            )
        } else if self.is_xor_row() {
            write!(f, "ClauseReference::XorRow({})", self.get_xor_row_id())
        } else {
            write!(f, "ClauseReference::Allocated({})", self.code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Variable;

    #[test]
    fn virtual_binary_clause_creation() {
        for num in [10, 11] {
            let literal = Literal::u32_to_literal(num);
            let clause_reference = ClauseReference::create_virtual_binary_clause_reference(literal);
            assert!(clause_reference.is_virtual_binary_clause());
            assert!(!clause_reference.is_xor_row());
            assert!(!clause_reference.is_allocated_clause());
            assert!(clause_reference.get_virtual_binary_clause_literal() == literal);
        }
    }

    #[test]
    fn allocated_clause_creation() {
        let clause_id: u32 = 10;
        let clause_reference = ClauseReference::create_allocated_clause_reference(clause_id);
        assert!(!clause_reference.is_virtual_binary_clause());
        assert!(!clause_reference.is_xor_row());
        assert!(clause_reference.is_allocated_clause());
        assert!(clause_reference.get_code() == clause_id);
    }

    #[test]
    fn xor_row_creation() {
        let clause_reference = ClauseReference::create_xor_row_reference(42);
        assert!(clause_reference.is_xor_row());
        assert!(!clause_reference.is_virtual_binary_clause());
        assert!(!clause_reference.is_allocated_clause());
        assert_eq!(clause_reference.get_xor_row_id(), 42);
    }

    #[test]
    fn the_three_variants_do_not_collide() {
        let literal = Literal::new(Variable::new(21), true);
        let binary = ClauseReference::create_virtual_binary_clause_reference(literal);
        let xor = ClauseReference::create_xor_row_reference(literal.to_u32());
        let allocated = ClauseReference::create_allocated_clause_reference(literal.to_u32());
        assert_ne!(binary.get_code(), xor.get_code());
        assert_ne!(binary.get_code(), allocated.get_code());
        assert_ne!(xor.get_code(), allocated.get_code());
    }
}

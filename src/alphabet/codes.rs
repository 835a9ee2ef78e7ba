use tinyvec::ArrayVec;

/// Compact tile code. Natural letters are `0..N` where `N` is the alphabet
/// size; the gaddag separator is `N` and never appears on a board or rack.
pub type Code = u8;

/// Upper bound on the alphabet size; cross-sets are 64-bit masks and the
/// blank flag claims the high bit of a code.
pub const MAX_ALPHABET: usize = 32;

/// Set on a code when a blank stands in for the letter in the low bits.
pub const BLANK_MASK: Code = 0x80;

/// An unassigned blank on a rack or in the bag.
pub const BLANK: Code = BLANK_MASK;

/// Sentinel in a move's tile vector: reuse the letter already on the board.
pub const PLAYED_THROUGH: Code = 0xfe;

/// A word as a list of tile codes. Sized to span a full board row.
pub type MachineWord = ArrayVec<[Code; 15]>;

/// Check if `code` is a blank, assigned or not.
#[inline]
pub fn is_blank(code: Code) -> bool {
    code & BLANK_MASK != 0
}

/// The natural letter designated by `code`, stripping any blank flag.
#[inline]
pub fn natural(code: Code) -> Code {
    code & !BLANK_MASK
}

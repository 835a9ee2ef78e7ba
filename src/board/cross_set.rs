use super::{step, Board, DIM};
use crate::alphabet::{natural, Code, LetterDistribution, MachineWord};
use crate::gaddag::Gaddag;
use std::fmt;

/// A bit mask of the letters allowed on a square.
///
/// The trivial set allows every letter; it is the state of any square with
/// no perpendicular neighbours.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct CrossSet(u64);

impl CrossSet {
    pub fn empty() -> CrossSet {
        CrossSet(0)
    }

    /// The set allowing all `n` letters of the alphabet.
    pub fn trivial(n: usize) -> CrossSet {
        CrossSet((1 << n) - 1)
    }

    /// Check whether a letter may be placed here. Blanks are judged by the
    /// letter they designate.
    #[inline]
    pub fn allows(&self, code: Code) -> bool {
        self.0 & (1 << natural(code)) != 0
    }

    pub fn insert(&mut self, letter: Code) {
        self.0 |= 1 << letter;
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Code> + '_ {
        let bits = self.0;
        (0..64u8).filter(move |i| bits & (1 << i) != 0)
    }
}

impl fmt::Debug for CrossSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = self
            .iter()
            .map(|letter| format!("{}", letter))
            .collect::<Vec<String>>()
            .join(",");
        write!(f, "{{{}}}", s)
    }
}

impl Board {
    /// Compute the cross-set and cross-score of an empty square for plays
    /// of the given orientation.
    ///
    /// The perpendicular partials around the square are walked; a letter
    /// is in the set when `before · letter · after` is a lexicon word.
    /// The walk follows the reversed `before` partial from the root,
    /// takes the separator, then spells `after` forward to a terminal —
    /// the same traversal the move generator uses.
    pub(crate) fn cross_data(
        &self,
        gaddag: &Gaddag,
        dist: &LetterDistribution,
        row: usize,
        col: usize,
        vertical: bool,
    ) -> (CrossSet, i32) {
        let (dr, dc) = step(!vertical);

        // nearest-first letters above/left of the square
        let mut before = MachineWord::new();
        let (mut r, mut c) = (row, col);
        while r >= dr && c >= dc {
            match self.letters[r - dr][c - dc] {
                Some(tile) => before.push(tile),
                None => break,
            }
            r -= dr;
            c -= dc;
        }
        // reading-order letters below/right of the square
        let mut after = MachineWord::new();
        let (mut r, mut c) = (row + dr, col + dc);
        while r < DIM && c < DIM {
            match self.letters[r][c] {
                Some(tile) => after.push(tile),
                None => break,
            }
            r += dr;
            c += dc;
        }

        if before.is_empty() && after.is_empty() {
            return (CrossSet::trivial(self.alphabet_size()), 0);
        }
        let score = dist.score_of(before.as_slice()) + dist.score_of(after.as_slice());

        let mut node = gaddag.root_node_id();
        for &tile in before.iter() {
            match gaddag.next_node(node, natural(tile)) {
                Some(child) => node = child,
                None => return (CrossSet::empty(), score),
            }
        }
        node = match gaddag.next_node(node, gaddag.separator_code()) {
            Some(child) => child,
            None => return (CrossSet::empty(), score),
        };

        let mut set = CrossSet::empty();
        if after.is_empty() {
            for letter in 0..gaddag.alphabet_size() as Code {
                if gaddag.is_terminal(node, letter) {
                    set.insert(letter);
                }
            }
        } else {
            let (last, mid) = after.as_slice().split_last().expect("after is non-empty");
            'arcs: for (letter, child) in gaddag.arcs_from(node) {
                let mut n = child;
                for &tile in mid {
                    match gaddag.next_node(n, natural(tile)) {
                        Some(next) => n = next,
                        None => continue 'arcs,
                    }
                }
                if gaddag.is_terminal(n, natural(*last)) {
                    set.insert(letter);
                }
            }
        }
        (set, score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::{Alphabet, Rack};
    use crate::grid::Grid;
    use crate::moves::Move;

    fn setup<S: AsRef<str>>(words: &[&str], rows: &[S]) -> (Gaddag, LetterDistribution, Board) {
        let gaddag = Gaddag::from_words(words, Alphabet::english()).unwrap();
        let dist = LetterDistribution::english(gaddag.alphabet());
        let mut board = Board::new(Grid::default(), gaddag.alphabet_size());
        board
            .set_state_from_strings(gaddag.alphabet(), rows)
            .unwrap();
        board.recompute_all(&gaddag, &dist);
        (gaddag, dist, board)
    }

    fn rows_with(row: usize, content: &str) -> Vec<String> {
        let mut rows = vec![String::from("..............."); DIM];
        rows[row] = String::from(content);
        rows
    }

    #[test]
    fn test_cross_set_between_words() {
        // H . S across row 8: a vertical play through the gap must form
        // H_S into a word
        let rows = rows_with(7, "......H.S......");
        let (_, _, board) = setup(&["HAS", "HES", "HAT"], &rows);
        let set = board.cross_set(7, 7, true);
        assert!(set.allows(0)); // A completes HAS
        assert!(set.allows(4)); // E completes HES
        assert!(!set.allows(14)); // O does not
        assert_eq!(set.len(), 2);
        assert_eq!(board.cross_score(7, 7, true), 4 + 1);
    }

    #[test]
    fn test_cross_set_before_word() {
        // a vertical play crossing just before "AT" must spell a word
        // ending in AT
        let rows = rows_with(7, "........AT.....");
        let (_, _, board) = setup(&["AT", "BAT", "CAT", "BOA"], &rows);
        let set = board.cross_set(7, 7, true);
        assert!(set.allows(1)); // B
        assert!(set.allows(2)); // C
        assert!(!set.allows(0));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_cross_set_after_word() {
        let rows = rows_with(7, "......BO.......");
        let (_, _, board) = setup(&["BOA", "BOS", "OBOE"], &rows);
        let set = board.cross_set(7, 8, true);
        assert!(set.allows(0)); // BOA
        assert!(set.allows(18)); // BOS
        assert!(!set.allows(4)); // BOE is not a word
    }

    #[test]
    fn test_no_neighbours_is_trivial() {
        let rows = rows_with(7, "......H.S......");
        let (_, _, board) = setup(&["HAS"], &rows);
        assert_eq!(board.cross_set(0, 0, false), CrossSet::trivial(26));
        assert_eq!(board.cross_score(0, 0, false), 0);
    }

    #[test]
    fn test_impossible_gap_is_empty() {
        let rows = rows_with(7, "......X.X......");
        let (_, _, board) = setup(&["XI"], &rows);
        let set = board.cross_set(7, 7, true);
        assert!(set.is_empty());
    }

    #[test]
    fn test_blank_on_board_scores_zero_but_constrains() {
        let rows = rows_with(7, "......h.S......");
        let (_, _, board) = setup(&["HAS", "HES"], &rows);
        let set = board.cross_set(7, 7, true);
        assert!(set.allows(0));
        // the blank H contributes no points, the S its one
        assert_eq!(board.cross_score(7, 7, true), 1);
    }

    #[test]
    fn test_in_line_cross_set_matches_definition() {
        // For every empty square and orientation, membership must agree
        // with "placing this letter forms a valid perpendicular word".
        let rows = rows_with(7, "......CARE.....");
        let (gaddag, _, board) = setup(&["CARE", "CARES", "ACE", "RACE"], &rows);
        for row in 0..DIM {
            for col in 0..DIM {
                if board.tile_at(row, col).is_some() {
                    continue;
                }
                for vertical in [false, true] {
                    let set = board.cross_set(row, col, vertical);
                    for letter in 0..26u8 {
                        let allowed = set.allows(letter);
                        let word = perpendicular_word(&board, row, col, letter, vertical);
                        let expect = match word {
                            None => true, // no neighbours: trivial
                            Some(w) => gaddag.in_lexicon(w.as_slice()),
                        };
                        assert_eq!(allowed, expect, "({},{}) {} v={}", row, col, letter, vertical);
                    }
                }
            }
        }
    }

    /// The word formed perpendicular to a play when `letter` lands on the
    /// square, or None when it has no perpendicular neighbours.
    fn perpendicular_word(
        board: &Board,
        row: usize,
        col: usize,
        letter: Code,
        vertical: bool,
    ) -> Option<MachineWord> {
        let (dr, dc) = step(!vertical);
        let (mut sr, mut sc) = (row, col);
        while sr >= dr && sc >= dc && board.tile_at(sr - dr, sc - dc).is_some() {
            sr -= dr;
            sc -= dc;
        }
        let mut word = MachineWord::new();
        let (mut r, mut c) = (sr, sc);
        loop {
            if (r, c) == (row, col) {
                word.push(letter);
            } else {
                match board.tile_at(r, c) {
                    Some(tile) => word.push(tile),
                    None => break,
                }
            }
            r += dr;
            c += dc;
            if r >= DIM || c >= DIM {
                break;
            }
        }
        if word.len() < 2 {
            None
        } else {
            Some(word)
        }
    }

    #[test]
    fn test_update_region_matches_full_recompute() {
        let (gaddag, dist, mut board) = setup(&["HIS", "OI", "SI"], &rows_with(7, "..............."));
        let alphabet = gaddag.alphabet().clone();
        let rack = Rack::from_codes(alphabet.encode("HIS").unwrap().as_slice()).unwrap();
        let mv = Move::play_from_strings(&alphabet, "H7", "HIS", 12, &rack).unwrap();
        board.place(&mv);
        board.update_cross_sets(&gaddag, &dist, &mv);
        let mut fresh = board.clone();
        fresh.recompute_all(&gaddag, &dist);
        for row in 0..DIM {
            for col in 0..DIM {
                for vertical in [false, true] {
                    if board.tile_at(row, col).is_none() {
                        assert_eq!(
                            board.cross_set(row, col, vertical),
                            fresh.cross_set(row, col, vertical),
                            "({},{},{})",
                            row,
                            col,
                            vertical
                        );
                        assert_eq!(
                            board.cross_score(row, col, vertical),
                            fresh.cross_score(row, col, vertical)
                        );
                    }
                    assert_eq!(board.is_anchor(row, col), fresh.is_anchor(row, col));
                }
            }
        }
    }
}

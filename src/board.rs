mod cross_set;

use crate::alphabet::{Alphabet, Code, LetterDistribution, MachineWord, PLAYED_THROUGH, RACK_SIZE};
use crate::error::{Error, PlacementError};
use crate::gaddag::Gaddag;
use crate::grid::Grid;
use crate::moves::Move;

pub use cross_set::CrossSet;

/// The board is DIM x DIM squares.
pub const DIM: usize = 15;

/// Points awarded for playing a full rack in one move.
pub const BINGO_BONUS: i32 = 50;

/// Snapshot of one square's dynamic state, used by the undo stack.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct SquareSnapshot {
    pub row: u8,
    pub col: u8,
    pub letter: Option<Code>,
    pub cross_sets: [CrossSet; 2],
    pub cross_scores: [i32; 2],
    pub anchor: bool,
}

/// The mutable playing surface: placed letters over a static bonus
/// [`Grid`], with per-square cross-sets, cross-scores and anchor flags
/// kept incrementally up to date as plays land.
///
/// A square's cross-set for one orientation is the set of letters that can
/// sit there without breaking the perpendicular word; its cross-score is
/// the point total of the perpendicular letters touching it. Anchors are
/// the empty squares move generation starts from.
#[derive(Debug, Clone)]
pub struct Board {
    grid: Grid,
    letters: [[Option<Code>; DIM]; DIM],
    cross_sets: [[[CrossSet; DIM]; DIM]; 2],
    cross_scores: [[[i32; DIM]; DIM]; 2],
    anchors: [[bool; DIM]; DIM],
    tiles_on_board: u16,
    alphabet_size: u8,
}

#[inline]
fn dir(vertical: bool) -> usize {
    vertical as usize
}

#[inline]
fn step(vertical: bool) -> (usize, usize) {
    if vertical {
        (1, 0)
    } else {
        (0, 1)
    }
}

impl Board {
    /// An empty board. The sole anchor is the grid's start square.
    pub fn new(grid: Grid, alphabet_size: usize) -> Board {
        let trivial = CrossSet::trivial(alphabet_size);
        let mut board = Board {
            grid,
            letters: [[None; DIM]; DIM],
            cross_sets: [[[trivial; DIM]; DIM]; 2],
            cross_scores: [[[0; DIM]; DIM]; 2],
            anchors: [[false; DIM]; DIM],
            tiles_on_board: 0,
            alphabet_size: alphabet_size as u8,
        };
        let (r, c) = board.grid.start_square();
        board.anchors[r][c] = true;
        board
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn is_empty(&self) -> bool {
        self.tiles_on_board == 0
    }

    pub fn tiles_on_board(&self) -> usize {
        self.tiles_on_board as usize
    }

    /// Tile at a square, or None if the square is empty or out of bounds.
    pub fn tile_at(&self, row: usize, col: usize) -> Option<Code> {
        if row < DIM && col < DIM {
            self.letters[row][col]
        } else {
            None
        }
    }

    pub fn is_anchor(&self, row: usize, col: usize) -> bool {
        self.anchors[row][col]
    }

    /// The cross-set constraining a play of the given orientation here.
    pub fn cross_set(&self, row: usize, col: usize, vertical: bool) -> CrossSet {
        self.cross_sets[dir(vertical)][row][col]
    }

    /// Point total of the perpendicular letters touching this square.
    pub fn cross_score(&self, row: usize, col: usize, vertical: bool) -> i32 {
        self.cross_scores[dir(vertical)][row][col]
    }

    /// Check whether the square has an occupied neighbour perpendicular to
    /// a play of the given orientation.
    pub fn has_cross_word(&self, row: usize, col: usize, vertical: bool) -> bool {
        let (dr, dc) = step(!vertical);
        (row >= dr && col >= dc && self.letters[row - dr][col - dc].is_some())
            || (row + dr < DIM && col + dc < DIM && self.letters[row + dr][col + dc].is_some())
    }

    /// Write a move's tiles onto the board. Cross-sets and anchors are not
    /// touched; call [`update_cross_sets`](Board::update_cross_sets) after.
    pub fn place(&mut self, mv: &Move) {
        let (dr, dc) = step(mv.vertical());
        for (i, &tile) in mv.tiles().iter().enumerate() {
            if tile == PLAYED_THROUGH {
                continue;
            }
            let (r, c) = (mv.row() + i * dr, mv.col() + i * dc);
            debug_assert!(self.letters[r][c].is_none());
            self.letters[r][c] = Some(tile);
            self.tiles_on_board += 1;
        }
    }

    /// Reverse exactly the writes of [`place`](Board::place).
    pub fn unplace(&mut self, mv: &Move) {
        let (dr, dc) = step(mv.vertical());
        for (i, &tile) in mv.tiles().iter().enumerate() {
            if tile == PLAYED_THROUGH {
                continue;
            }
            let (r, c) = (mv.row() + i * dr, mv.col() + i * dc);
            self.letters[r][c] = None;
            self.tiles_on_board -= 1;
        }
    }

    /// Bitmasks of the rows and columns holding the move's new tiles: the
    /// region whose cross-sets and anchors a play can affect.
    pub(crate) fn affected_lines(mv: &Move) -> (u16, u16) {
        let (dr, dc) = step(mv.vertical());
        let (mut rows, mut cols) = (0u16, 0u16);
        for (i, &tile) in mv.tiles().iter().enumerate() {
            if tile == PLAYED_THROUGH {
                continue;
            }
            rows |= 1 << (mv.row() + i * dr);
            cols |= 1 << (mv.col() + i * dc);
        }
        (rows, cols)
    }

    /// The squares in the union of the flagged rows and columns.
    pub(crate) fn region_squares(rows: u16, cols: u16) -> impl Iterator<Item = (usize, usize)> {
        (0..DIM).flat_map(move |r| {
            (0..DIM).filter_map(move |c| {
                if rows & (1 << r) != 0 || cols & (1 << c) != 0 {
                    Some((r, c))
                } else {
                    None
                }
            })
        })
    }

    /// Recompute cross-sets, cross-scores and anchors over the region a
    /// move affected: the rows and columns of its new tiles (the squares
    /// beyond each end of the new word lie in those lines).
    pub fn update_cross_sets(&mut self, gaddag: &Gaddag, dist: &LetterDistribution, mv: &Move) {
        let (rows, cols) = Board::affected_lines(mv);
        self.update_region(gaddag, dist, rows, cols);
    }

    pub(crate) fn update_region(
        &mut self,
        gaddag: &Gaddag,
        dist: &LetterDistribution,
        rows: u16,
        cols: u16,
    ) {
        for (r, c) in Board::region_squares(rows, cols) {
            if self.letters[r][c].is_none() {
                for vertical in [false, true] {
                    let (set, score) = self.cross_data(gaddag, dist, r, c, vertical);
                    self.cross_sets[dir(vertical)][r][c] = set;
                    self.cross_scores[dir(vertical)][r][c] = score;
                }
            }
            self.anchors[r][c] = self.computed_anchor(r, c);
        }
    }

    /// Recompute every square from scratch. Used when a position is set up
    /// wholesale rather than built play by play.
    pub fn recompute_all(&mut self, gaddag: &Gaddag, dist: &LetterDistribution) {
        for r in 0..DIM {
            for c in 0..DIM {
                if self.letters[r][c].is_none() {
                    for vertical in [false, true] {
                        let (set, score) = self.cross_data(gaddag, dist, r, c, vertical);
                        self.cross_sets[dir(vertical)][r][c] = set;
                        self.cross_scores[dir(vertical)][r][c] = score;
                    }
                }
                self.anchors[r][c] = self.computed_anchor(r, c);
            }
        }
        if self.is_empty() {
            let (r, c) = self.grid.start_square();
            self.anchors[r][c] = true;
        }
    }

    fn computed_anchor(&self, row: usize, col: usize) -> bool {
        if self.letters[row][col].is_some() {
            return false;
        }
        let neighbours = [
            (row.wrapping_sub(1), col),
            (row + 1, col),
            (row, col.wrapping_sub(1)),
            (row, col + 1),
        ];
        neighbours
            .iter()
            .any(|&(r, c)| r < DIM && c < DIM && self.letters[r][c].is_some())
    }

    /// Score a play before it is placed. `tiles` spans the main word;
    /// played-through squares contribute their board letter unmultiplied,
    /// newly covered squares their premiums and any perpendicular word.
    pub fn score_play(
        &self,
        dist: &LetterDistribution,
        row: usize,
        col: usize,
        vertical: bool,
        tiles: &[Code],
    ) -> i32 {
        let (dr, dc) = step(vertical);
        let mut main = 0;
        let mut word_mult = 1;
        let mut cross_total = 0;
        let mut played = 0;
        for (i, &tile) in tiles.iter().enumerate() {
            let (r, c) = (row + i * dr, col + i * dc);
            if tile == PLAYED_THROUGH {
                if let Some(board_tile) = self.letters[r][c] {
                    main += dist.points(board_tile);
                }
                continue;
            }
            let lm = self.grid.letter_multiplier(r, c);
            let wm = self.grid.word_multiplier(r, c);
            let points = dist.points(tile);
            main += points * lm;
            word_mult *= wm;
            played += 1;
            if self.has_cross_word(r, c, vertical) {
                cross_total += (points * lm + self.cross_score(r, c, vertical)) * wm;
            }
        }
        let mut score = main * word_mult + cross_total;
        if played == RACK_SIZE {
            score += BINGO_BONUS;
        }
        score
    }

    /// All words a play forms: the main word first (if at least two
    /// letters), then one perpendicular word per new tile that touches
    /// perpendicular neighbours. Works both before and after the tiles
    /// are placed.
    ///
    /// ## Errors
    /// If a played-through marker points at an empty square.
    pub fn formed_words(&self, mv: &Move) -> Result<Vec<MachineWord>, Error> {
        let (dr, dc) = step(mv.vertical());
        let mut words = Vec::new();
        let mut main = MachineWord::new();
        for (i, &tile) in mv.tiles().iter().enumerate() {
            let (r, c) = (mv.row() + i * dr, mv.col() + i * dc);
            if tile == PLAYED_THROUGH {
                let board_tile = self.letters[r][c]
                    .ok_or(Error::IllegalPlacement(PlacementError::NotContiguous))?;
                main.push(board_tile);
            } else {
                main.push(tile);
            }
        }
        if main.len() >= 2 {
            words.push(main);
        }
        let (pdr, pdc) = step(!mv.vertical());
        for (i, &tile) in mv.tiles().iter().enumerate() {
            if tile == PLAYED_THROUGH {
                continue;
            }
            let (r, c) = (mv.row() + i * dr, mv.col() + i * dc);
            // walk to the start of the perpendicular word
            let (mut sr, mut sc) = (r, c);
            while sr >= pdr && sc >= pdc && self.letters[sr - pdr][sc - pdc].is_some() {
                sr -= pdr;
                sc -= pdc;
            }
            let mut word = MachineWord::new();
            let (mut wr, mut wc) = (sr, sc);
            loop {
                if (wr, wc) == (r, c) {
                    word.push(tile);
                } else {
                    match self.letters[wr][wc] {
                        Some(t) => word.push(t),
                        None => break,
                    }
                }
                wr += pdr;
                wc += pdc;
                if wr >= DIM || wc >= DIM {
                    break;
                }
            }
            if word.len() >= 2 {
                words.push(word);
            }
        }
        Ok(words)
    }

    /// Set placed letters from 15 strings of 15 runes, `.` or space for an
    /// empty square, lowercase for blanks. Cross-sets are not recomputed;
    /// call [`recompute_all`](Board::recompute_all) with the lexicon.
    ///
    /// ## Errors
    /// If the rows do not parse or have the wrong dimensions.
    pub fn set_state_from_strings<S: AsRef<str>>(
        &mut self,
        alphabet: &Alphabet,
        rows: &[S],
    ) -> Result<(), Error> {
        if rows.len() != DIM {
            return Err(Error::InvalidRowCount(rows.len()));
        }
        let mut letters = [[None; DIM]; DIM];
        let mut count = 0u16;
        for (r, row) in rows.iter().enumerate() {
            let chars: Vec<char> = row.as_ref().chars().collect();
            if chars.len() != DIM {
                return Err(Error::InvalidRowLength(chars.len()));
            }
            for (c, &ch) in chars.iter().enumerate() {
                if ch == '.' || ch == ' ' {
                    continue;
                }
                letters[r][c] = Some(alphabet.encode_char(ch)?);
                count += 1;
            }
        }
        self.letters = letters;
        self.tiles_on_board = count;
        Ok(())
    }

    /// The board as 15 rows of runes, empty squares shown as `.`.
    pub fn to_strings(&self, alphabet: &Alphabet) -> Vec<String> {
        self.letters
            .iter()
            .map(|row| {
                row.iter()
                    .map(|sq| sq.map_or('.', |t| alphabet.decode_char(t)))
                    .collect()
            })
            .collect()
    }

    pub(crate) fn snapshot_square(&self, row: usize, col: usize) -> SquareSnapshot {
        SquareSnapshot {
            row: row as u8,
            col: col as u8,
            letter: self.letters[row][col],
            cross_sets: [self.cross_sets[0][row][col], self.cross_sets[1][row][col]],
            cross_scores: [
                self.cross_scores[0][row][col],
                self.cross_scores[1][row][col],
            ],
            anchor: self.anchors[row][col],
        }
    }

    pub(crate) fn restore_square(&mut self, snap: &SquareSnapshot) {
        let (r, c) = (snap.row as usize, snap.col as usize);
        self.letters[r][c] = snap.letter;
        self.cross_sets[0][r][c] = snap.cross_sets[0];
        self.cross_sets[1][r][c] = snap.cross_sets[1];
        self.cross_scores[0][r][c] = snap.cross_scores[0];
        self.cross_scores[1][r][c] = snap.cross_scores[1];
        self.anchors[r][c] = snap.anchor;
    }

    pub(crate) fn set_tiles_on_board(&mut self, count: u16) {
        self.tiles_on_board = count;
    }

    pub(crate) fn alphabet_size(&self) -> usize {
        self.alphabet_size as usize
    }
}

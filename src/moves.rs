use crate::alphabet::{Alphabet, Code, MachineWord, Rack, PLAYED_THROUGH, RACK_SIZE};
use crate::error::Error;
use tinyvec::ArrayVec;

/// The kind of action a [`Move`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Play,
    Exchange,
    Pass,
    PhonyTilesReturned,
    EndgameTiles,
    LostTileScore,
}

impl Default for Action {
    fn default() -> Self {
        Action::Pass
    }
}

/// One code per covered square; reused board tiles are the
/// played-through sentinel.
pub type MoveTiles = ArrayVec<[Code; 15]>;

/// Rack residue after a play, sorted ascending with blanks last.
pub type Leave = ArrayVec<[Code; RACK_SIZE]>;

/// A move: a scoring play, an exchange, a pass, or one of the bookkeeping
/// records the game appends when scoring ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Move {
    action: Action,
    row: u8,
    col: u8,
    vertical: bool,
    tiles: MoveTiles,
    word: MachineWord,
    score: i32,
    equity: f64,
    leave: Leave,
    tiles_played: u8,
    bingo: bool,
}

impl Move {
    /// A scoring play. `tiles` covers the whole main word span; `word` is
    /// the same span with played-through sentinels expanded to the board
    /// letters.
    #[allow(clippy::too_many_arguments)]
    pub fn play(
        row: usize,
        col: usize,
        vertical: bool,
        tiles: MoveTiles,
        word: MachineWord,
        score: i32,
        leave: Leave,
    ) -> Move {
        let tiles_played = tiles.iter().filter(|&&t| t != PLAYED_THROUGH).count() as u8;
        Move {
            action: Action::Play,
            row: row as u8,
            col: col as u8,
            vertical,
            tiles,
            word,
            score,
            equity: 0.0,
            leave,
            bingo: tiles_played as usize == RACK_SIZE,
            tiles_played,
        }
    }

    pub fn exchange(tiles: MoveTiles, leave: Leave) -> Move {
        Move {
            action: Action::Exchange,
            tiles_played: tiles.len() as u8,
            tiles,
            leave,
            ..Move::default()
        }
    }

    pub fn pass(leave: Leave) -> Move {
        Move {
            action: Action::Pass,
            leave,
            ..Move::default()
        }
    }

    /// Bookkeeping record for a bonus or deduction applied when the game
    /// ends, or for a phony coming off the board.
    pub fn scoring_record(action: Action, score: i32, tiles: MoveTiles) -> Move {
        Move {
            action,
            score,
            tiles,
            ..Move::default()
        }
    }

    /// Build a play from game notation, the way positions are exchanged in
    /// annotated games: `coords` is column-letter-first for a vertical play
    /// (`"H7"`), row-number-first for a horizontal one (`"8G"`); `word`
    /// uses `.` for played-through squares and lowercase for blanks.
    /// The declared `score` is trusted; [`crate::Game::validate`] is the
    /// checked path.
    ///
    /// ## Errors
    /// If the coordinates or word do not parse.
    pub fn play_from_strings(
        alphabet: &Alphabet,
        coords: &str,
        word: &str,
        score: i32,
        rack: &Rack,
    ) -> Result<Move, Error> {
        let (row, col, vertical) = parse_coords(coords)?;
        let tiles = alphabet.encode(word)?;
        let mut remainder = rack.clone();
        remainder.remove_play_tiles(tiles.as_slice())?;
        let leave: Leave = remainder.codes();
        let tiles_played = tiles.iter().filter(|&&t| t != PLAYED_THROUGH).count();
        Ok(Move {
            action: Action::Play,
            row,
            col,
            vertical,
            word: tiles,
            tiles_played: tiles_played as u8,
            bingo: tiles_played == RACK_SIZE,
            tiles,
            score,
            equity: 0.0,
            leave,
        })
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Start square of the main word.
    pub fn row(&self) -> usize {
        self.row as usize
    }

    pub fn col(&self) -> usize {
        self.col as usize
    }

    pub fn vertical(&self) -> bool {
        self.vertical
    }

    pub fn tiles(&self) -> &[Code] {
        self.tiles.as_slice()
    }

    /// The main word with played-through squares expanded, when known.
    pub fn word(&self) -> &[Code] {
        self.word.as_slice()
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    pub fn set_equity(&mut self, equity: f64) {
        self.equity = equity;
    }

    pub fn leave(&self) -> &[Code] {
        self.leave.as_slice()
    }

    pub fn tiles_played(&self) -> usize {
        self.tiles_played as usize
    }

    pub fn is_bingo(&self) -> bool {
        self.bingo
    }

    /// Game notation for the start square, matching
    /// [`play_from_strings`](Move::play_from_strings).
    pub fn coords(&self) -> String {
        let col = (b'A' + self.col) as char;
        if self.vertical {
            format!("{}{}", col, self.row + 1)
        } else {
            format!("{}{}", self.row + 1, col)
        }
    }

    /// Human-readable form, e.g. `8G OI (+2)`.
    pub fn to_user_string(&self, alphabet: &Alphabet) -> String {
        match self.action {
            Action::Play => format!(
                "{} {} (+{})",
                self.coords(),
                alphabet.decode(self.tiles.as_slice()),
                self.score
            ),
            Action::Exchange => format!("exch {}", alphabet.decode(self.tiles.as_slice())),
            Action::Pass => String::from("pass"),
            Action::PhonyTilesReturned => {
                format!("phony tiles returned: {}", alphabet.decode(self.tiles.as_slice()))
            }
            Action::EndgameTiles => format!("endgame tiles (+{})", self.score),
            Action::LostTileScore => format!("lost tile score ({})", self.score),
        }
    }
}

/// Sort descending by equity, breaking ties by score.
pub fn sort_by_equity(moves: &mut [Move]) {
    moves.sort_by(|a, b| {
        b.equity
            .partial_cmp(&a.equity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.score.cmp(&a.score))
    });
}

/// Sort descending by score.
pub fn sort_by_score(moves: &mut [Move]) {
    moves.sort_by(|a, b| b.score.cmp(&a.score));
}

fn parse_coords(coords: &str) -> Result<(u8, u8, bool), Error> {
    let bad = || Error::InvalidCoordinates(String::from(coords));
    let chars: Vec<char> = coords.chars().collect();
    if chars.len() < 2 {
        return Err(bad());
    }
    let (vertical, col_ch, row_str) = if chars[0].is_ascii_alphabetic() {
        (true, chars[0], coords[1..].to_string())
    } else if chars[chars.len() - 1].is_ascii_alphabetic() {
        (
            false,
            chars[chars.len() - 1],
            coords[..coords.len() - 1].to_string(),
        )
    } else {
        return Err(bad());
    };
    let col = (col_ch.to_ascii_uppercase() as u8).wrapping_sub(b'A');
    let row: u8 = row_str.parse().map_err(|_| bad())?;
    if col >= 15 || !(1..=15).contains(&row) {
        return Err(bad());
    }
    Ok((row - 1, col, vertical))
}

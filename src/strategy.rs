//! Equity estimation: how much a play is really worth once the rack it
//! leaves behind and the state of the game are taken into account.
mod leave;

use crate::alphabet::{Code, LetterDistribution, Rack, PLAYED_THROUGH};
use crate::bag::Bag;
use crate::board::Board;
use crate::moves::{Action, Move};
use std::sync::Arc;
use tinyvec::ArrayVec;

pub use leave::LeaveTable;

/// Leaves longer than this are worth nothing; they only arise from
/// passes and full-rack exchanges.
pub const MAX_LEAVE: usize = 6;

/// Equity estimation for candidate plays.
///
/// Implementations are stateless beyond their loaded tables and safe to
/// share between concurrent games.
pub trait Strategy: Send + Sync {
    /// Expected long-run value of `play` on the position `board`/`bag`.
    /// `opp_rack` is the opponent's rack when it is known (endgame).
    fn equity(&self, play: &Move, board: &Board, bag: &Bag, opp_rack: Option<&Rack>) -> f64;

    /// The value of keeping this rack residue for future turns.
    fn leave_value(&self, leave: &[Code]) -> f64;
}

/// Full equity: score, plus an exhaustively tabulated leave value, plus
/// placement and endgame corrections.
pub struct ExhaustiveLeaveStrategy {
    leaves: LeaveTable,
    dist: Arc<LetterDistribution>,
}

impl ExhaustiveLeaveStrategy {
    pub fn new(leaves: LeaveTable, dist: Arc<LetterDistribution>) -> ExhaustiveLeaveStrategy {
        ExhaustiveLeaveStrategy { leaves, dist }
    }

    /// Load the leave table from `path` (plain or gzip-compressed).
    ///
    /// ## Errors
    /// If the table cannot be read or parsed.
    pub fn from_file(
        path: &str,
        dist: Arc<LetterDistribution>,
    ) -> Result<ExhaustiveLeaveStrategy, crate::Error> {
        Ok(ExhaustiveLeaveStrategy::new(
            LeaveTable::from_file(path)?,
            dist,
        ))
    }
}

impl Strategy for ExhaustiveLeaveStrategy {
    fn equity(&self, play: &Move, board: &Board, bag: &Bag, opp_rack: Option<&Rack>) -> f64 {
        let mut equity = play.score() as f64;
        if board.is_empty() {
            equity += placement_adjustment(play, &self.dist);
        }
        if bag.remaining() == 0 {
            equity += endgame_adjustment(play, opp_rack, &self.dist);
        } else {
            // the leave doesn't matter once the bag is empty
            equity += self.leave_value(play.leave());
        }
        equity
    }

    fn leave_value(&self, leave: &[Code]) -> f64 {
        if leave.is_empty() || leave.len() > MAX_LEAVE {
            return 0.0;
        }
        let mut sorted: ArrayVec<[u8; 7]> = leave.iter().copied().collect();
        sorted.as_mut_slice().sort_unstable();
        match self.leaves.get(sorted.as_slice()) {
            Some(value) => value as f64,
            // only reachable with a leave table that does not cover its
            // alphabet: a data-file bug, not a game state
            None => panic!("leave {:?} missing from leave table", sorted.as_slice()),
        }
    }
}

/// Score plus positional corrections only; used when no leave table is
/// available.
pub struct NoLeaveStrategy {
    dist: Arc<LetterDistribution>,
}

impl NoLeaveStrategy {
    pub fn new(dist: Arc<LetterDistribution>) -> NoLeaveStrategy {
        NoLeaveStrategy { dist }
    }
}

impl Strategy for NoLeaveStrategy {
    fn equity(&self, play: &Move, board: &Board, bag: &Bag, opp_rack: Option<&Rack>) -> f64 {
        let mut equity = play.score() as f64;
        if board.is_empty() {
            equity += placement_adjustment(play, &self.dist);
        }
        if bag.remaining() == 0 {
            equity += endgame_adjustment(play, opp_rack, &self.dist);
        }
        equity
    }

    fn leave_value(&self, _leave: &[Code]) -> f64 {
        0.0
    }
}

/// Endgame corrections only, for searches that already know the bag is
/// empty.
pub struct EndgameStrategy {
    dist: Arc<LetterDistribution>,
}

impl EndgameStrategy {
    pub fn new(dist: Arc<LetterDistribution>) -> EndgameStrategy {
        EndgameStrategy { dist }
    }
}

impl Strategy for EndgameStrategy {
    fn equity(&self, play: &Move, _board: &Board, _bag: &Bag, opp_rack: Option<&Rack>) -> f64 {
        play.score() as f64 + endgame_adjustment(play, opp_rack, &self.dist)
    }

    fn leave_value(&self, _leave: &[Code]) -> f64 {
        0.0
    }
}

/// Compute and store the equity of each play.
pub fn assign_equities(
    strategy: &dyn Strategy,
    plays: &mut [Move],
    board: &Board,
    bag: &Bag,
    opp_rack: Option<&Rack>,
) {
    for play in plays {
        let equity = strategy.equity(play, board, bag, opp_rack);
        play.set_equity(equity);
    }
}

/// Opening placement heuristic: vowels next to the centre's flanking
/// bonus squares give the second player easy premium access.
fn placement_adjustment(play: &Move, dist: &LetterDistribution) -> f64 {
    if play.action() != Action::Play {
        return 0.0;
    }
    const VOWEL_PENALTY: f64 = -0.7;
    let start = if play.vertical() {
        play.row()
    } else {
        play.col()
    };
    let mut penalty = 0.0;
    for (i, &tile) in play.tiles().iter().enumerate() {
        let pos = start + i;
        if (pos == 6 || pos == 8) && tile != PLAYED_THROUGH && dist.is_vowel(tile) {
            penalty += VOWEL_PENALTY;
        }
    }
    penalty
}

fn endgame_adjustment(play: &Move, opp_rack: Option<&Rack>, dist: &LetterDistribution) -> f64 {
    if !play.leave().is_empty() {
        // not going out: the leave stays on our score sheet, and the
        // opponent gets at least one more scoring turn
        return -2.0 * dist.score_of(play.leave()) as f64 - 10.0;
    }
    match opp_rack {
        Some(rack) => 2.0 * dist.score_of(rack.codes().as_slice()) as f64,
        None => 0.0,
    }
}

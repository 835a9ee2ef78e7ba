#![deny(clippy::used_underscore_binding,
//    clippy::missing_docs_in_private_items,
//    clippy::unwrap_used,
   clippy::map_unwrap_or,
   clippy::int_plus_one, clippy::string_add_assign, clippy::if_not_else,
   clippy::invalid_upcast_comparisons,
   clippy::mutex_integer, clippy::mut_mut, clippy::items_after_statements,
   clippy::print_stdout, clippy::mem_forget, clippy::maybe_infinite_iter)]

//! The core engine of a crossword tile game.
//! <br>
//! Given a board, a rack, a lexicon and an alphabet, this crate
//! enumerates every legal play, scores it, estimates its long-run equity,
//! and applies or exactly undoes it — fast enough to drive Monte-Carlo
//! simulation and endgame search.
//!
//! The lexicon is consumed as a gaddag: a word graph holding every
//! reversed-prefix/suffix split of every word, so that move generation
//! can start at any anchor square and scan outward. Per-square cross-sets
//! keep perpendicular words valid without ever spelling them out during
//! the traversal.
//!
//! # Basic usage
//! ```
//! # use std::sync::Arc;
//! # use crossword_engine::{
//! #     Alphabet, Error, Gaddag, Game, GameRules, GenOptions, Grid,
//! #     LetterDistribution, MoveGenerator,
//! # };
//! let gaddag = Arc::new(Gaddag::from_words(&["HIS", "OI"], Alphabet::english())?);
//! let dist = Arc::new(LetterDistribution::english(gaddag.alphabet()));
//! let rules = GameRules::new(gaddag, dist, Grid::default());
//! let mut game = Game::new(rules, &["ada", "grace"], 42);
//! game.start();
//! let mut gen = MoveGenerator::new();
//! let plays = game.generate_moves(&mut gen, GenOptions::default());
//! for play in &plays {
//!     println!("{}", play.to_user_string(game.rules().alphabet()));
//! }
//! # Ok::<(), Error>(())
//! ```
//!
//! The shared, read-only tier ([`Gaddag`], [`LetterDistribution`],
//! [`LeaveTable`], [`Grid`]) is loaded once and may serve any number of
//! concurrent games; each [`Game`] owns its mutable state and is driven
//! from a single thread.
mod alphabet;
mod bag;
mod board;
mod error;
mod game;
mod gaddag;
mod grid;
mod movegen;
mod moves;
mod strategy;

pub use crate::alphabet::{
    is_blank, natural, Alphabet, Code, LetterDistribution, MachineWord, Rack, BLANK, BLANK_MASK,
    PLAYED_THROUGH, RACK_SIZE,
};
pub use crate::bag::Bag;
pub use crate::board::{Board, CrossSet, BINGO_BONUS, DIM};
pub use crate::error::{Error, PlacementError};
pub use crate::gaddag::{Gaddag, NodeId};
pub use crate::game::{BackupMode, ChallengeRule, Game, GameRules, Player};
pub use crate::grid::{Cell, Grid};
pub use crate::movegen::{GenOptions, MoveGenerator};
pub use crate::moves::{sort_by_equity, sort_by_score, Action, Leave, Move, MoveTiles};
pub use crate::strategy::{
    assign_equities, EndgameStrategy, ExhaustiveLeaveStrategy, LeaveTable, NoLeaveStrategy,
    Strategy, MAX_LEAVE,
};

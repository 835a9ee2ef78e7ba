use crate::alphabet::{Alphabet, Code, LetterDistribution, MachineWord, Rack, PLAYED_THROUGH, RACK_SIZE};
use crate::bag::Bag;
use crate::board::{Board, SquareSnapshot, DIM};
use crate::error::{Error, PlacementError};
use crate::gaddag::Gaddag;
use crate::grid::Grid;
use crate::movegen::{GenOptions, MoveGenerator};
use crate::moves::{Action, Move, MoveTiles};
use rand::rngs::StdRng;
use std::sync::Arc;

/// Six consecutive scoreless turns (both players passing three times)
/// end the game.
const SCORELESS_TURN_LIMIT: u32 = 6;

/// How much state each play records for [`Game::unplay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupMode {
    /// No undo; plays are final.
    None,
    /// Record the minimum needed to restore the previous position.
    Simulation,
    /// Additionally append every move to an inspectable history.
    Interactive,
}

/// What happens when a play is challenged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeRule {
    /// Phonies never reach the board; plays are validated as they land.
    Void,
    /// A successful challenge removes the play and costs the offender
    /// the turn; a wrong challenge is free.
    Single,
    /// As Single, but a wrong challenge costs the challenger their turn.
    Double,
    /// A wrong challenge gives the challenged player 5 points.
    FivePoint,
    /// A wrong challenge gives the challenged player 10 points.
    TenPoint,
}

/// The immutable rule set shared by all games of a variant: lexicon,
/// letter distribution and bonus layout. Cloning is cheap and the shared
/// parts are safe for unbounded concurrent readers.
#[derive(Clone)]
pub struct GameRules {
    gaddag: Arc<Gaddag>,
    dist: Arc<LetterDistribution>,
    layout: Grid,
}

impl GameRules {
    pub fn new(gaddag: Arc<Gaddag>, dist: Arc<LetterDistribution>, layout: Grid) -> GameRules {
        GameRules {
            gaddag,
            dist,
            layout,
        }
    }

    pub fn alphabet(&self) -> &Alphabet {
        self.gaddag.alphabet()
    }

    pub fn gaddag(&self) -> &Arc<Gaddag> {
        &self.gaddag
    }

    pub fn letter_distribution(&self) -> &Arc<LetterDistribution> {
        &self.dist
    }

    pub fn layout(&self) -> &Grid {
        &self.layout
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    nickname: String,
    rack: Rack,
    score: i32,
}

impl Player {
    fn new(nickname: &str) -> Player {
        Player {
            nickname: String::from(nickname),
            rack: Rack::new(),
            score: 0,
        }
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn rack(&self) -> &Rack {
        &self.rack
    }

    pub fn score(&self) -> i32 {
        self.score
    }
}

/// One slot of the preallocated undo ring: everything a play disturbed.
#[derive(Clone, Default)]
struct UndoRecord {
    squares: Vec<SquareSnapshot>,
    board_tiles: u16,
    bag_tiles: Vec<Code>,
    rng: Option<StdRng>,
    racks: Vec<Rack>,
    scores: Vec<i32>,
    onturn: u8,
    turn_number: u32,
    scoreless_turns: u32,
    playing: bool,
    history_len: usize,
    last_move: Option<(Move, usize)>,
}

/// A single game: players, board, bag and turn order, with play,
/// validation, undo and end-of-game scoring.
///
/// A game owns all of its mutable state; simulation workers each clone a
/// template game and roll out positions independently, sharing only the
/// read-only [`GameRules`].
#[derive(Clone)]
pub struct Game {
    rules: GameRules,
    board: Board,
    bag: Bag,
    players: Vec<Player>,
    onturn: usize,
    turn_number: u32,
    scoreless_turns: u32,
    playing: bool,
    seed: u64,
    challenge_rule: ChallengeRule,
    backup_mode: BackupMode,
    stack: Vec<UndoRecord>,
    stack_ptr: usize,
    history: Vec<Move>,
    last_move: Option<(Move, usize)>,
}

impl Game {
    /// A game ready to [`start`](Game::start). `seed` fixes the bag's
    /// draw order.
    pub fn new(rules: GameRules, nicknames: &[&str], seed: u64) -> Game {
        let board = Board::new(rules.layout.clone(), rules.gaddag.alphabet_size());
        let bag = Bag::new(&rules.dist, seed);
        let players = nicknames.iter().map(|n| Player::new(n)).collect();
        Game {
            rules,
            board,
            bag,
            players,
            onturn: 0,
            turn_number: 0,
            scoreless_turns: 0,
            playing: false,
            seed,
            challenge_rule: ChallengeRule::Void,
            backup_mode: BackupMode::None,
            stack: Vec::new(),
            stack_ptr: 0,
            history: Vec::new(),
            last_move: None,
        }
    }

    /// Reset the position, refill and shuffle the bag, and deal every
    /// player a fresh rack. The first player in the list starts.
    pub fn start(&mut self) {
        self.board = Board::new(self.rules.layout.clone(), self.rules.gaddag.alphabet_size());
        self.bag = Bag::new(&self.rules.dist, self.seed);
        for player in &mut self.players {
            player.score = 0;
            player.rack = Rack::new();
            for &tile in self.bag.draw_at_most(RACK_SIZE).iter() {
                player.rack.add(tile);
            }
        }
        self.onturn = 0;
        self.turn_number = 0;
        self.scoreless_turns = 0;
        self.playing = true;
        self.history.clear();
        self.last_move = None;
        self.stack_ptr = 0;
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn bag(&self) -> &Bag {
        &self.bag
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn player(&self, idx: usize) -> &Player {
        &self.players[idx]
    }

    pub fn num_players(&self) -> usize {
        self.players.len()
    }

    /// Index of the player to move.
    pub fn player_on_turn(&self) -> usize {
        self.onturn
    }

    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    pub fn scoreless_turns(&self) -> u32 {
        self.scoreless_turns
    }

    /// False once the game is finalised.
    pub fn playing(&self) -> bool {
        self.playing
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    /// Depth of the undo stack currently in use.
    pub fn backup_stack_height(&self) -> usize {
        self.stack_ptr
    }

    pub fn set_backup_mode(&mut self, mode: BackupMode) {
        self.backup_mode = mode;
    }

    pub fn set_challenge_rule(&mut self, rule: ChallengeRule) {
        self.challenge_rule = rule;
    }

    /// Preallocate the undo ring to depth `length`. Pushing past the
    /// configured depth fails with [`Error::BackupStackOverflow`].
    pub fn set_state_stack_length(&mut self, length: usize) {
        self.stack = (0..length).map(|_| UndoRecord::default()).collect();
        self.stack_ptr = 0;
    }

    pub fn set_player_on_turn(&mut self, idx: usize) {
        self.onturn = idx;
    }

    /// Replace a player's rack directly (simulation seeding). No tiles
    /// move between rack and bag.
    pub fn set_rack_for(&mut self, idx: usize, rack: Rack) {
        self.players[idx].rack = rack;
    }

    /// All legal moves for the player on turn.
    pub fn generate_moves(&self, gen: &mut MoveGenerator, mut opts: GenOptions) -> Vec<Move> {
        opts.bag_remaining = self.bag.remaining();
        gen.generate(
            &self.board,
            &self.players[self.onturn].rack,
            &self.rules.gaddag,
            &self.rules.dist,
            opts,
        )
    }

    /// Check a move against the current position without mutating any
    /// state, returning the words it would form.
    ///
    /// ## Errors
    /// - [`Error::TilesNotInRack`] if the mover does not hold the tiles;
    /// - [`Error::IllegalPlacement`] if the geometry is wrong;
    /// - [`Error::PhonyWord`] if a formed word is not in the lexicon;
    /// - [`Error::BagExhausted`] for an exchange with a depleted bag.
    pub fn validate(&self, mv: &Move) -> Result<Vec<MachineWord>, Error> {
        match mv.action() {
            Action::Play => self.validate_play(mv),
            Action::Exchange => {
                if self.bag.remaining() < RACK_SIZE {
                    return Err(Error::BagExhausted);
                }
                let mut rack = self.players[self.onturn].rack.clone();
                for &tile in mv.tiles() {
                    if !rack.remove(tile) {
                        return Err(Error::TilesNotInRack);
                    }
                }
                Ok(Vec::new())
            }
            _ => Ok(Vec::new()),
        }
    }

    fn validate_play(&self, mv: &Move) -> Result<Vec<MachineWord>, Error> {
        let tiles = mv.tiles();
        if tiles.is_empty() {
            return Err(Error::IllegalPlacement(PlacementError::NotContiguous));
        }
        let (dr, dc) = if mv.vertical() { (1, 0) } else { (0, 1) };
        let (row, col) = (mv.row(), mv.col());
        let (end_r, end_c) = (row + (tiles.len() - 1) * dr, col + (tiles.len() - 1) * dc);
        if row >= DIM || col >= DIM || end_r >= DIM || end_c >= DIM {
            return Err(Error::IllegalPlacement(PlacementError::OffBoard));
        }

        let mut new_tiles = 0;
        for (i, &tile) in tiles.iter().enumerate() {
            let occupied = self.board.tile_at(row + i * dr, col + i * dc).is_some();
            if tile == PLAYED_THROUGH {
                if !occupied {
                    return Err(Error::IllegalPlacement(PlacementError::NotContiguous));
                }
            } else {
                if occupied {
                    return Err(Error::IllegalPlacement(
                        PlacementError::OverlapsMismatchedTile,
                    ));
                }
                new_tiles += 1;
            }
        }
        if new_tiles == 0 {
            return Err(Error::IllegalPlacement(PlacementError::NotContiguous));
        }
        // the tile vector must span the whole main word
        let before_occupied = row >= dr
            && col >= dc
            && self.board.tile_at(row - dr, col - dc).is_some();
        let after_occupied = self.board.tile_at(end_r + dr, end_c + dc).is_some();
        if before_occupied || after_occupied {
            return Err(Error::IllegalPlacement(PlacementError::NotContiguous));
        }

        let mut rack = self.players[self.onturn].rack.clone();
        rack.remove_play_tiles(tiles)?;

        if self.board.is_empty() {
            let centre = self.board.grid().start_square();
            let covers_centre = (0..tiles.len())
                .any(|i| (row + i * dr, col + i * dc) == centre);
            if !covers_centre {
                return Err(Error::IllegalPlacement(PlacementError::FirstPlayMissesCentre));
            }
        } else {
            let connected = tiles.iter().enumerate().any(|(i, &tile)| {
                tile == PLAYED_THROUGH
                    || self.has_occupied_neighbour(row + i * dr, col + i * dc)
            });
            if !connected {
                return Err(Error::IllegalPlacement(PlacementError::Isolated));
            }
        }

        let words = self.board.formed_words(mv)?;
        if words.is_empty() {
            return Err(Error::IllegalPlacement(PlacementError::Isolated));
        }
        for word in &words {
            if !self.rules.gaddag.in_lexicon(word.as_slice()) {
                return Err(Error::PhonyWord(
                    self.rules.alphabet().decode(word.as_slice()),
                ));
            }
        }
        Ok(words)
    }

    fn has_occupied_neighbour(&self, row: usize, col: usize) -> bool {
        let neighbours = [
            (row.wrapping_sub(1), col),
            (row + 1, col),
            (row, col.wrapping_sub(1)),
            (row, col + 1),
        ];
        neighbours
            .iter()
            .any(|&(r, c)| self.board.tile_at(r, c).is_some())
    }

    /// Apply a move. This is the trusted path: geometry and lexicon are
    /// assumed checked by [`validate`](Game::validate) or the generator;
    /// rack and bag preconditions are still verified so state is never
    /// half-mutated.
    ///
    /// ## Errors
    /// - [`Error::GameAlreadyFinalised`] once the game has ended;
    /// - [`Error::TilesNotInRack`] / [`Error::BagExhausted`] on broken
    ///   preconditions;
    /// - [`Error::BackupStackOverflow`] when the undo ring is full.
    pub fn play(&mut self, mv: &Move, add_to_history: bool) -> Result<(), Error> {
        if !self.playing {
            return Err(Error::GameAlreadyFinalised);
        }
        let mover = self.onturn;
        // preconditions before any mutation
        match mv.action() {
            Action::Play => {
                let mut probe = self.players[mover].rack.clone();
                probe.remove_play_tiles(mv.tiles())?;
            }
            Action::Exchange => {
                if self.bag.remaining() < RACK_SIZE {
                    return Err(Error::BagExhausted);
                }
                let mut probe = self.players[mover].rack.clone();
                for &tile in mv.tiles() {
                    if !probe.remove(tile) {
                        return Err(Error::TilesNotInRack);
                    }
                }
            }
            _ => {}
        }
        self.push_backup()?;
        if self.backup_mode != BackupMode::None && mv.action() == Action::Play {
            self.backup_region(mv);
        }

        match mv.action() {
            Action::Play => {
                let rack = &mut self.players[mover].rack;
                rack.remove_play_tiles(mv.tiles())
                    .expect("tiles checked above");
                self.board.place(mv);
                self.board
                    .update_cross_sets(&self.rules.gaddag, &self.rules.dist, mv);
                self.players[mover].score += mv.score();
                let need = RACK_SIZE - self.players[mover].rack.len();
                for &tile in self.bag.draw_at_most(need).iter() {
                    self.players[mover].rack.add(tile);
                }
                self.scoreless_turns = if mv.score() == 0 {
                    self.scoreless_turns + 1
                } else {
                    0
                };
            }
            Action::Exchange => {
                let drawn = self
                    .bag
                    .draw(mv.tiles().len())
                    .expect("bag checked above");
                let rack = &mut self.players[mover].rack;
                for &tile in mv.tiles() {
                    rack.remove(tile);
                }
                for &tile in drawn.iter() {
                    rack.add(tile);
                }
                self.bag.put_back(mv.tiles());
                self.scoreless_turns += 1;
            }
            Action::Pass | Action::PhonyTilesReturned => {
                self.scoreless_turns += 1;
            }
            // bookkeeping actions are appended by the game itself
            _ => {}
        }

        if add_to_history || self.backup_mode == BackupMode::Interactive {
            self.history.push(mv.clone());
        }
        self.last_move = Some((mv.clone(), mover));
        self.onturn = (self.onturn + 1) % self.players.len();
        self.turn_number += 1;

        if mv.action() == Action::Play
            && self.players[mover].rack.is_empty()
            && self.bag.is_empty()
        {
            self.finalise(Some(mover));
        } else if self.scoreless_turns >= SCORELESS_TURN_LIMIT {
            self.finalise(None);
        }
        Ok(())
    }

    /// End-of-game scoring: a player going out collects twice the
    /// opponents' leaves; after a pass-out every player pays for their
    /// own.
    fn finalise(&mut self, went_out: Option<usize>) {
        self.playing = false;
        match went_out {
            Some(winner) => {
                let mut bonus = 0;
                let mut tiles = MoveTiles::new();
                for (idx, player) in self.players.iter().enumerate() {
                    if idx == winner {
                        continue;
                    }
                    let codes = player.rack.codes();
                    bonus += 2 * self.rules.dist.score_of(codes.as_slice());
                    let room = tiles.capacity() - tiles.len();
                    tiles.extend(codes.iter().copied().take(room));
                }
                self.players[winner].score += bonus;
                if self.backup_mode == BackupMode::Interactive {
                    self.history
                        .push(Move::scoring_record(Action::EndgameTiles, bonus, tiles));
                }
            }
            None => {
                for idx in 0..self.players.len() {
                    let codes = self.players[idx].rack.codes();
                    let penalty = self.rules.dist.score_of(codes.as_slice());
                    self.players[idx].score -= penalty;
                    if self.backup_mode == BackupMode::Interactive {
                        let mut tiles = MoveTiles::new();
                        for &code in codes.iter() {
                            tiles.push(code);
                        }
                        self.history.push(Move::scoring_record(
                            Action::LostTileScore,
                            -penalty,
                            tiles,
                        ));
                    }
                }
            }
        }
    }

    fn push_backup(&mut self) -> Result<(), Error> {
        if self.backup_mode == BackupMode::None {
            return Ok(());
        }
        if self.stack_ptr == self.stack.len() {
            return Err(Error::BackupStackOverflow(self.stack.len()));
        }
        let mv = self.last_move.clone();
        let record = &mut self.stack[self.stack_ptr];
        record.squares.clear();
        record.board_tiles = self.board.tiles_on_board() as u16;
        record.bag_tiles.clear();
        record.bag_tiles.extend_from_slice(self.bag.tiles());
        record.rng = Some(self.bag.rng().clone());
        record.racks.clear();
        record.racks.extend(self.players.iter().map(|p| p.rack.clone()));
        record.scores.clear();
        record.scores.extend(self.players.iter().map(|p| p.score));
        record.onturn = self.onturn as u8;
        record.turn_number = self.turn_number;
        record.scoreless_turns = self.scoreless_turns;
        record.playing = self.playing;
        record.history_len = self.history.len();
        record.last_move = mv;
        self.stack_ptr += 1;
        Ok(())
    }

    /// Snapshot the squares a play is about to disturb. Called by
    /// [`play`](Game::play) for scoring plays only; other actions leave
    /// the board alone.
    fn backup_region(&mut self, mv: &Move) {
        let (rows, cols) = Board::affected_lines(mv);
        let record = &mut self.stack[self.stack_ptr - 1];
        for (r, c) in Board::region_squares(rows, cols) {
            record.squares.push(self.board.snapshot_square(r, c));
        }
    }

    /// Restore the position to before the most recent play, bit for bit:
    /// board tiles, cross-sets, anchors, bag order, racks, scores and
    /// turn state. Undoing past a finalisation un-finalises the game.
    ///
    /// Calling this with no recorded play is a programmer error and
    /// panics.
    pub fn unplay(&mut self) {
        assert!(
            self.stack_ptr > 0,
            "unplay called with an empty backup stack"
        );
        self.stack_ptr -= 1;
        let record = &mut self.stack[self.stack_ptr];
        for snapshot in &record.squares {
            self.board.restore_square(snapshot);
        }
        self.board.set_tiles_on_board(record.board_tiles);
        let rng = record.rng.take().expect("record holds the bag rng");
        self.bag.restore(&record.bag_tiles, rng);
        for (player, rack) in self.players.iter_mut().zip(&record.racks) {
            player.rack = rack.clone();
        }
        for (player, &score) in self.players.iter_mut().zip(&record.scores) {
            player.score = score;
        }
        self.onturn = record.onturn as usize;
        self.turn_number = record.turn_number;
        self.scoreless_turns = record.scoreless_turns;
        self.playing = record.playing;
        self.history.truncate(record.history_len);
        self.last_move = record.last_move.take();
    }

    /// Resolve a challenge of the last scoring play.
    ///
    /// A phony comes off the board (the offender's turn is consumed as a
    /// scoreless `PhonyTilesReturned` record); a valid play stands and
    /// the configured [`ChallengeRule`] decides the challenger's cost.
    /// Returns whether the play was a phony. Requires a backup mode that
    /// records plays.
    ///
    /// ## Errors
    /// If resolving the challenge needs to apply a move and that fails.
    pub fn challenge_last_play(&mut self, challenger: usize) -> Result<bool, Error> {
        let (mv, who) = match &self.last_move {
            Some((mv, who)) if mv.action() == Action::Play => (mv.clone(), *who),
            _ => return Ok(false),
        };
        let words = self.board.formed_words(&mv)?;
        let phony = words
            .iter()
            .any(|word| !self.rules.gaddag.in_lexicon(word.as_slice()));
        if self.challenge_rule == ChallengeRule::Void {
            // plays were validated as they landed; nothing to resolve
            return Ok(phony);
        }
        if phony {
            assert!(
                self.stack_ptr > 0,
                "challenge resolution needs the play's backup record"
            );
            self.unplay();
            let mut tiles = MoveTiles::new();
            for &tile in mv.tiles() {
                if tile != PLAYED_THROUGH {
                    tiles.push(tile);
                }
            }
            let returned = Move::scoring_record(Action::PhonyTilesReturned, 0, tiles);
            self.play(&returned, true)?;
        } else {
            match self.challenge_rule {
                ChallengeRule::Double => {
                    if challenger == self.onturn {
                        let pass = Move::pass(self.players[challenger].rack.codes());
                        self.play(&pass, true)?;
                    }
                }
                ChallengeRule::FivePoint => self.players[who].score += 5,
                ChallengeRule::TenPoint => self.players[who].score += 10,
                _ => {}
            }
        }
        Ok(phony)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::{is_blank, BLANK};
    use crate::board::CrossSet;
    use anyhow::Result;
    use multiset::HashMultiSet;
    use std::collections::HashSet;

    fn rules(words: &[&str]) -> GameRules {
        let gaddag = Arc::new(Gaddag::from_words(words, Alphabet::english()).unwrap());
        let dist = Arc::new(LetterDistribution::english(gaddag.alphabet()));
        GameRules::new(gaddag, dist, Grid::default())
    }

    fn rack(alphabet: &Alphabet, s: &str) -> Rack {
        Rack::from_codes(alphabet.encode(s).unwrap().as_slice()).unwrap()
    }

    /// Build a play for the player on turn with its real score.
    fn scoring_move(game: &Game, coords: &str, word: &str) -> Move {
        let alphabet = game.rules().alphabet();
        let holder = game.player(game.player_on_turn()).rack().clone();
        let probe = Move::play_from_strings(alphabet, coords, word, 0, &holder).unwrap();
        let score = game.board().score_play(
            game.rules().letter_distribution(),
            probe.row(),
            probe.col(),
            probe.vertical(),
            probe.tiles(),
        );
        Move::play_from_strings(alphabet, coords, word, score, &holder).unwrap()
    }

    #[test]
    fn test_new_game_deals_fourteen_tiles() {
        let mut game = Game::new(rules(&["HIS"]), &["JD", "cesar"], 11);
        game.start();
        assert_eq!(game.bag().remaining(), 86);
        assert_eq!(game.player(0).rack().len(), 7);
        assert_eq!(game.player(1).rack().len(), 7);
        assert_eq!(game.player_on_turn(), 0);
        assert!(game.playing());
    }

    #[test]
    fn test_backup_and_unplay() {
        let rules = rules(&["AVOCET"]);
        let alphabet = rules.alphabet().clone();
        let mut game = Game::new(rules, &["JD", "cesar"], 11);
        game.start();
        game.set_state_stack_length(5);
        game.set_backup_mode(BackupMode::Simulation);
        game.set_player_on_turn(0);
        game.set_rack_for(0, rack(&alphabet, "ACEOTV?"));

        let m = Move::play_from_strings(&alphabet, "H7", "AVOCET", 20, &rack(&alphabet, "ACEOTV?"))
            .unwrap();
        game.play(&m, false).unwrap();

        assert_eq!(game.backup_stack_height(), 1);
        assert_eq!(game.player(0).score(), 20);
        assert_eq!(game.player(1).score(), 0);
        assert_eq!(game.bag().remaining(), 80);

        game.unplay();
        assert_eq!(game.backup_stack_height(), 0);
        assert_eq!(game.player(0).score(), 0);
        assert_eq!(game.player(1).score(), 0);
        assert_eq!(game.bag().remaining(), 86);
        assert_eq!(
            alphabet.decode(game.player(0).rack().codes().as_slice()),
            "ACEOTV?"
        );
    }

    #[test]
    fn test_validate_play_and_hook() -> Result<()> {
        let rules = rules(&["HIS", "OI"]);
        let alphabet = rules.alphabet().clone();
        let mut game = Game::new(rules, &["JD", "cesar"], 11);
        game.start();
        game.set_player_on_turn(0);
        game.set_rack_for(0, rack(&alphabet, "HIS"));
        game.set_challenge_rule(ChallengeRule::Double);

        let m = scoring_move(&game, "H7", "HIS");
        assert_eq!(m.score(), 12);
        let words = game.validate(&m)?;
        assert_eq!(words.len(), 1);
        assert_eq!(alphabet.decode(words[0].as_slice()), "HIS");
        game.play(&m, false)?;
        assert_eq!(game.player(0).score(), 12);

        game.set_rack_for(1, rack(&alphabet, "O"));
        let m = scoring_move(&game, "8G", "O.");
        assert_eq!(m.score(), 2);
        let words = game.validate(&m)?;
        assert_eq!(words.len(), 1);
        assert_eq!(alphabet.decode(words[0].as_slice()), "OI");
        game.play(&m, false)?;
        assert_eq!(game.player(1).score(), 2);
        Ok(())
    }

    #[test]
    fn test_validate_rejections() {
        let rules = rules(&["HIS", "OI"]);
        let alphabet = rules.alphabet().clone();
        let mut game = Game::new(rules, &["JD", "cesar"], 11);
        game.start();
        game.set_rack_for(0, rack(&alphabet, "HISOQZJ"));

        // first play must cover the centre
        let m = Move::play_from_strings(&alphabet, "A1", "HIS", 0, &rack(&alphabet, "HIS")).unwrap();
        assert!(matches!(
            game.validate(&m),
            Err(Error::IllegalPlacement(PlacementError::FirstPlayMissesCentre))
        ));
        // tiles the mover does not hold
        let m = Move::play_from_strings(&alphabet, "H7", "AB", 0, &rack(&alphabet, "AB")).unwrap();
        assert!(matches!(game.validate(&m), Err(Error::TilesNotInRack)));
        // phony
        let m = Move::play_from_strings(&alphabet, "H7", "SI", 0, &rack(&alphabet, "SI")).unwrap();
        game.set_rack_for(0, rack(&alphabet, "SIHOQZJ"));
        assert!(matches!(game.validate(&m), Err(Error::PhonyWord(_))));
        // off the board
        let m =
            Move::play_from_strings(&alphabet, "H14", "HIS", 0, &rack(&alphabet, "HIS")).unwrap();
        game.set_rack_for(0, rack(&alphabet, "HISOQZJ"));
        assert!(matches!(
            game.validate(&m),
            Err(Error::IllegalPlacement(PlacementError::OffBoard))
        ));

        // disconnected second play
        let first = scoring_move(&game, "H7", "HIS");
        game.play(&first, false).unwrap();
        game.set_rack_for(1, rack(&alphabet, "OI"));
        let m = Move::play_from_strings(&alphabet, "1A", "OI", 0, &rack(&alphabet, "OI")).unwrap();
        assert!(matches!(
            game.validate(&m),
            Err(Error::IllegalPlacement(PlacementError::Isolated))
        ));
        // a marker over an empty square
        let m = Move::play_from_strings(&alphabet, "8G", ".O", 0, &rack(&alphabet, "OI")).unwrap();
        assert!(matches!(
            game.validate(&m),
            Err(Error::IllegalPlacement(PlacementError::NotContiguous))
        ));
    }

    /// Fingerprint of everything unplay promises to restore.
    fn fingerprint(game: &Game) -> (Vec<String>, Vec<(CrossSet, i32, bool)>, Vec<Code>, Vec<String>, Vec<i32>, usize, u32, u32, bool) {
        let alphabet = game.rules().alphabet();
        let mut squares = Vec::new();
        for row in 0..DIM {
            for col in 0..DIM {
                for vertical in [false, true] {
                    squares.push((
                        game.board().cross_set(row, col, vertical),
                        game.board().cross_score(row, col, vertical),
                        game.board().is_anchor(row, col),
                    ));
                }
            }
        }
        (
            game.board().to_strings(alphabet),
            squares,
            game.bag.tiles().to_vec(),
            (0..game.num_players())
                .map(|i| alphabet.decode(game.player(i).rack().codes().as_slice()))
                .collect(),
            (0..game.num_players()).map(|i| game.player(i).score()).collect(),
            game.player_on_turn(),
            game.turn_number(),
            game.scoreless_turns(),
            game.playing(),
        )
    }

    #[test]
    fn test_unplay_round_trip_is_bit_identical() {
        let rules = rules(&["HIS", "OI", "HI", "SI"]);
        let alphabet = rules.alphabet().clone();
        let mut game = Game::new(rules, &["JD", "cesar"], 23);
        game.start();
        game.set_state_stack_length(8);
        game.set_backup_mode(BackupMode::Simulation);
        game.set_rack_for(0, rack(&alphabet, "HIS"));

        let before = fingerprint(&game);
        let m1 = scoring_move(&game, "H7", "HIS");
        game.play(&m1, false).unwrap();
        game.set_rack_for(1, rack(&alphabet, "O"));
        let mid = fingerprint(&game);
        let m2 = scoring_move(&game, "8G", "O.");
        game.play(&m2, false).unwrap();

        assert_eq!(game.backup_stack_height(), 2);
        game.unplay();
        assert_eq!(fingerprint(&game), mid);
        game.unplay();
        assert_eq!(fingerprint(&game), before);
    }

    #[test]
    fn test_score_conservation() {
        let rules = rules(&["HIS", "OI"]);
        let alphabet = rules.alphabet().clone();
        let mut game = Game::new(rules, &["JD", "cesar"], 23);
        game.start();
        game.set_rack_for(0, rack(&alphabet, "HIS"));
        let m = scoring_move(&game, "H7", "HIS");
        let before: Vec<i32> = (0..2).map(|i| game.player(i).score()).collect();
        game.play(&m, false).unwrap();
        assert_eq!(game.player(0).score(), before[0] + m.score());
        assert_eq!(game.player(1).score(), before[1]);
    }

    fn tile_census(game: &Game) -> HashMultiSet<Code> {
        let mut census = HashMultiSet::new();
        for i in 0..game.num_players() {
            for &code in game.player(i).rack().codes().iter() {
                census.insert(code);
            }
        }
        for row in 0..DIM {
            for col in 0..DIM {
                if let Some(tile) = game.board().tile_at(row, col) {
                    census.insert(if is_blank(tile) { BLANK } else { tile });
                }
            }
        }
        for &code in game.bag.tiles() {
            census.insert(code);
        }
        census
    }

    #[test]
    fn test_bag_conservation() {
        let rules = rules(&["HIS", "OI"]);
        let full: HashMultiSet<Code> = rules
            .letter_distribution()
            .full_bag()
            .into_iter()
            .collect();
        let mut game = Game::new(rules, &["JD", "cesar"], 23);
        game.start();
        game.set_state_stack_length(4);
        game.set_backup_mode(BackupMode::Simulation);
        assert_eq!(tile_census(&game), full);

        // racks, bag and board always add up to the full distribution
        let tiles: MoveTiles = game.player(0).rack().codes().iter().take(4).copied().collect();
        let mut remainder = game.player(0).rack().clone();
        for &t in tiles.iter() {
            remainder.remove(t);
        }
        game.play(&Move::exchange(tiles, remainder.codes()), false).unwrap();
        assert_eq!(tile_census(&game), full);

        let leave = game.player(1).rack().codes();
        game.play(&Move::pass(leave), false).unwrap();
        assert_eq!(tile_census(&game), full);

        game.unplay();
        game.unplay();
        assert_eq!(tile_census(&game), full);
    }

    #[test]
    fn test_exchange_keeps_bag_size() -> Result<()> {
        let rules = rules(&["HIS"]);
        let mut game = Game::new(rules, &["JD", "cesar"], 23);
        game.start();
        let tiles: MoveTiles = game.player(0).rack().codes().iter().take(3).copied().collect();
        let mut remainder = game.player(0).rack().clone();
        for &t in tiles.iter() {
            remainder.remove(t);
        }
        let m = Move::exchange(tiles, remainder.codes());
        game.validate(&m)?;
        game.play(&m, false)?;
        assert_eq!(game.bag().remaining(), 86);
        assert_eq!(game.player(0).rack().len(), 7);
        assert_eq!(game.scoreless_turns(), 1);
        assert_eq!(game.player_on_turn(), 1);
        Ok(())
    }

    #[test]
    fn test_pass_loop_finalises_game() {
        let rules = rules(&["HIS"]);
        let mut game = Game::new(rules, &["JD", "cesar"], 23);
        game.start();
        for _ in 0..6 {
            let leave = game.player(game.player_on_turn()).rack().codes();
            game.play(&Move::pass(leave), false).unwrap();
        }
        assert!(!game.playing());
        // each player pays for their own leave
        for i in 0..2 {
            let penalty = game
                .rules()
                .letter_distribution()
                .score_of(game.player(i).rack().codes().as_slice());
            assert_eq!(game.player(i).score(), -penalty);
        }
        let leave = game.player(game.player_on_turn()).rack().codes();
        let err = game.play(&Move::pass(leave), false);
        assert!(matches!(err, Err(Error::GameAlreadyFinalised)));
    }

    #[test]
    fn test_going_out_collects_double_opponent_leave() {
        let rules = rules(&["TO"]);
        let alphabet = rules.alphabet().clone();
        let dist = rules.letter_distribution().clone();
        let mut game = Game::new(rules, &["JD", "cesar"], 23);
        game.start();
        game.set_state_stack_length(2);
        game.set_backup_mode(BackupMode::Simulation);
        let rng = game.bag.rng().clone();
        game.bag.restore(&[], rng);
        game.set_rack_for(0, rack(&alphabet, "TO"));
        game.set_rack_for(1, rack(&alphabet, "QZ"));

        let m = scoring_move(&game, "8H", "TO");
        assert_eq!(m.score(), 4);
        game.play(&m, false).unwrap();
        assert!(!game.playing());
        let opp = dist.score_of(game.player(1).rack().codes().as_slice());
        assert_eq!(opp, 20);
        assert_eq!(game.player(0).score(), 4 + 2 * opp);
        assert_eq!(game.player(1).score(), 0);

        // finalisation is undoable too
        game.unplay();
        assert!(game.playing());
        assert_eq!(game.player(0).score(), 0);
        assert_eq!(
            alphabet.decode(game.player(0).rack().codes().as_slice()),
            "OT"
        );
    }

    #[test]
    fn test_backup_stack_overflow() {
        let rules = rules(&["HIS", "OI"]);
        let alphabet = rules.alphabet().clone();
        let mut game = Game::new(rules, &["JD", "cesar"], 23);
        game.start();
        game.set_state_stack_length(1);
        game.set_backup_mode(BackupMode::Simulation);
        game.set_rack_for(0, rack(&alphabet, "HIS"));
        let m = scoring_move(&game, "H7", "HIS");
        game.play(&m, false).unwrap();
        game.set_rack_for(1, rack(&alphabet, "O"));
        let m = scoring_move(&game, "8G", "O.");
        let err = game.play(&m, false);
        assert!(matches!(err, Err(Error::BackupStackOverflow(1))));
    }

    #[test]
    fn test_challenge_removes_phony() {
        let rules = rules(&["HIS"]);
        let alphabet = rules.alphabet().clone();
        let mut game = Game::new(rules, &["JD", "cesar"], 23);
        game.start();
        game.set_state_stack_length(4);
        game.set_backup_mode(BackupMode::Simulation);
        game.set_challenge_rule(ChallengeRule::Single);
        game.set_rack_for(0, rack(&alphabet, "SIZQJXK"));

        // SI is not in this lexicon, but play() trusts its caller
        let m = Move::play_from_strings(&alphabet, "H7", "SI", 10, &rack(&alphabet, "SIZQJXK"))
            .unwrap();
        game.play(&m, false).unwrap();
        assert_eq!(game.player(0).score(), 10);

        let phony = game.challenge_last_play(1).unwrap();
        assert!(phony);
        assert!(game.board().is_empty());
        assert_eq!(game.player(0).score(), 0);
        // the offender's turn is consumed
        assert_eq!(game.player_on_turn(), 1);
        assert_eq!(game.scoreless_turns(), 1);
        assert_eq!(
            alphabet.decode(game.player(0).rack().codes().as_slice()),
            "IJKQSXZ"
        );
    }

    #[test]
    fn test_challenge_wrong_double_costs_turn() {
        let rules = rules(&["HIS"]);
        let alphabet = rules.alphabet().clone();
        let mut game = Game::new(rules, &["JD", "cesar"], 23);
        game.start();
        game.set_state_stack_length(4);
        game.set_backup_mode(BackupMode::Simulation);
        game.set_challenge_rule(ChallengeRule::Double);
        game.set_rack_for(0, rack(&alphabet, "HIS"));

        let m = scoring_move(&game, "H7", "HIS");
        game.play(&m, false).unwrap();
        let phony = game.challenge_last_play(1).unwrap();
        assert!(!phony);
        // the wrong challenge cost player 1 their turn
        assert_eq!(game.player_on_turn(), 0);
        assert_eq!(game.player(0).score(), 12);
    }

    #[test]
    fn test_challenge_wrong_ten_point_bonus() {
        let rules = rules(&["HIS"]);
        let alphabet = rules.alphabet().clone();
        let mut game = Game::new(rules, &["JD", "cesar"], 23);
        game.start();
        game.set_state_stack_length(4);
        game.set_backup_mode(BackupMode::Simulation);
        game.set_challenge_rule(ChallengeRule::TenPoint);
        game.set_rack_for(0, rack(&alphabet, "HIS"));

        let m = scoring_move(&game, "H7", "HIS");
        game.play(&m, false).unwrap();
        let phony = game.challenge_last_play(1).unwrap();
        assert!(!phony);
        assert_eq!(game.player(0).score(), 12 + 10);
        assert_eq!(game.player_on_turn(), 1);
    }

    #[test]
    fn test_interactive_history_records_endgame() {
        let rules = rules(&["TO"]);
        let alphabet = rules.alphabet().clone();
        let mut game = Game::new(rules, &["JD", "cesar"], 23);
        game.start();
        game.set_state_stack_length(2);
        game.set_backup_mode(BackupMode::Interactive);
        let rng = game.bag.rng().clone();
        game.bag.restore(&[], rng);
        game.set_rack_for(0, rack(&alphabet, "TO"));
        game.set_rack_for(1, rack(&alphabet, "QZ"));

        let m = scoring_move(&game, "8H", "TO");
        game.play(&m, false).unwrap();
        let actions: Vec<Action> = game.history().iter().map(|m| m.action()).collect();
        assert_eq!(actions, vec![Action::Play, Action::EndgameTiles]);
        game.unplay();
        assert!(game.history().is_empty());
    }

    /// Every play the generator emits validates, and everything that
    /// validates is emitted: the two agree exactly on this position.
    #[test]
    fn test_generator_matches_validation() {
        let rules = rules(&["AB", "BA", "ABA", "CAB"]);
        let alphabet = rules.alphabet().clone();
        let mut game = Game::new(rules, &["JD", "cesar"], 23);
        game.start();
        game.set_rack_for(0, rack(&alphabet, "AB"));
        let m = scoring_move(&game, "8H", "AB");
        game.play(&m, false).unwrap();
        game.set_rack_for(1, rack(&alphabet, "AB?"));

        let mut gen = MoveGenerator::new();
        let generated = game.generate_moves(&mut gen, GenOptions::default());
        let generated_keys: HashSet<Vec<(usize, usize, Code)>> = generated
            .iter()
            .map(|p| placement_key(p))
            .collect();
        assert_eq!(generated_keys.len(), generated.len(), "duplicate plays");

        let mut validated_keys = HashSet::new();
        let words = ["AB", "BA", "ABA", "CAB"];
        for word in words {
            for vertical in [false, true] {
                for row in 0..DIM {
                    for col in 0..DIM {
                        for blank_mask in 0..(1u32 << word.len()) {
                            if let Some(key) = try_candidate(
                                &game, &alphabet, word, row, col, vertical, blank_mask,
                            ) {
                                validated_keys.insert(key);
                            }
                        }
                    }
                }
            }
        }
        assert_eq!(generated_keys, validated_keys);
    }

    fn placement_key(play: &Move) -> Vec<(usize, usize, Code)> {
        let (dr, dc) = if play.vertical() { (1, 0) } else { (0, 1) };
        let mut key: Vec<(usize, usize, Code)> = play
            .tiles()
            .iter()
            .enumerate()
            .filter(|(_, &t)| t != PLAYED_THROUGH)
            .map(|(i, &t)| (play.row() + i * dr, play.col() + i * dc, t))
            .collect();
        key.sort_unstable();
        key
    }

    /// Build one candidate placement of `word` and push it through
    /// validate; returns its placement key when legal.
    fn try_candidate(
        game: &Game,
        alphabet: &Alphabet,
        word: &str,
        row: usize,
        col: usize,
        vertical: bool,
        blank_mask: u32,
    ) -> Option<Vec<(usize, usize, Code)>> {
        let (dr, dc) = if vertical { (1, 0) } else { (0, 1) };
        let chars: Vec<char> = word.chars().collect();
        if row + (chars.len() - 1) * dr >= DIM || col + (chars.len() - 1) * dc >= DIM {
            return None;
        }
        let mut rendered = String::new();
        for (i, &ch) in chars.iter().enumerate() {
            let (r, c) = (row + i * dr, col + i * dc);
            match game.board().tile_at(r, c) {
                Some(tile) => {
                    if alphabet.decode_char(tile).to_ascii_uppercase() != ch {
                        return None;
                    }
                    rendered.push('.');
                }
                None => {
                    if blank_mask & (1 << i) != 0 {
                        rendered.push(ch.to_ascii_lowercase());
                    } else {
                        rendered.push(ch);
                    }
                }
            }
        }
        let coords = if vertical {
            format!("{}{}", (b'A' + col as u8) as char, row + 1)
        } else {
            format!("{}{}", row + 1, (b'A' + col as u8) as char)
        };
        let holder = game.player(game.player_on_turn()).rack().clone();
        let candidate =
            Move::play_from_strings(alphabet, &coords, &rendered, 0, &holder).ok()?;
        game.validate(&candidate).ok()?;
        Some(placement_key(&candidate))
    }
}

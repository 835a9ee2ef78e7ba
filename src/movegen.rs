use crate::alphabet::{
    natural, Code, LetterDistribution, MachineWord, Rack, BLANK, BLANK_MASK, PLAYED_THROUGH,
    RACK_SIZE,
};
use crate::board::{Board, DIM};
use crate::gaddag::{Gaddag, NodeId};
use crate::moves::{Leave, Move, MoveTiles};
use std::collections::HashSet;
use tinyvec::ArrayVec;

/// Which pseudo-moves to emit besides scoring plays.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenOptions {
    /// Emit every distinct non-empty exchange. Exchanges are only legal
    /// while at least a rack's worth of tiles remains in the bag, so
    /// `bag_remaining` gates them.
    pub exchanges: bool,
    /// Emit the pass.
    pub passes: bool,
    pub bag_remaining: usize,
}

/// Generates every legal play for a position.
///
/// The generator walks the gaddag outward from each anchor square: first
/// leftward (or upward) over the reversed prefix, then across the
/// separator and rightward to a word terminal. Cross-sets prune letters
/// that would break a perpendicular word, so every emitted play is legal
/// by construction. Scratch state is reused between calls and the
/// traversal itself does not allocate.
#[derive(Debug, Default)]
pub struct MoveGenerator {
    dedup: HashSet<(u8, u8, Code)>,
}

impl MoveGenerator {
    pub fn new() -> MoveGenerator {
        MoveGenerator::default()
    }

    /// All legal plays for `rack` on `board`, plus the pseudo-moves
    /// `opts` requests. Emission order is unspecified.
    pub fn generate(
        &mut self,
        board: &Board,
        rack: &Rack,
        gaddag: &Gaddag,
        dist: &LetterDistribution,
        opts: GenOptions,
    ) -> Vec<Move> {
        self.generate_with(board, rack, gaddag, dist, opts, || false)
    }

    /// Like [`generate`](MoveGenerator::generate), but polls `should_stop`
    /// between anchors so a caller can cancel a long generation
    /// cooperatively. A cancelled call returns the plays found so far.
    pub fn generate_with(
        &mut self,
        board: &Board,
        rack: &Rack,
        gaddag: &Gaddag,
        dist: &LetterDistribution,
        opts: GenOptions,
        mut should_stop: impl FnMut() -> bool,
    ) -> Vec<Move> {
        self.dedup.clear();
        let mut plays = Vec::new();
        let mut gen = Gen {
            board,
            gaddag,
            dist,
            rack: rack.clone(),
            vertical: false,
            line: 0,
            strip: [0; DIM],
            plays: &mut plays,
            dedup: &mut self.dedup,
        };
        'lines: for vertical in [false, true] {
            gen.vertical = vertical;
            for line in 0..DIM {
                gen.line = line;
                for idx in 0..DIM {
                    let (row, col) = gen.coords(idx);
                    if gen.board.is_anchor(row, col) {
                        if should_stop() {
                            break 'lines;
                        }
                        gen.from_anchor(idx);
                    }
                }
            }
        }
        if opts.exchanges && opts.bag_remaining >= RACK_SIZE {
            gen_exchanges(rack, &mut plays);
        }
        if opts.passes {
            plays.push(Move::pass(rack.codes()));
        }
        plays
    }
}

struct Gen<'a> {
    board: &'a Board,
    gaddag: &'a Gaddag,
    dist: &'a LetterDistribution,
    rack: Rack,
    vertical: bool,
    line: usize,
    /// Letters of the play under construction, indexed by in-line
    /// position; occupied squares hold the played-through marker.
    strip: [Code; DIM],
    plays: &'a mut Vec<Move>,
    dedup: &'a mut HashSet<(u8, u8, Code)>,
}

impl<'a> Gen<'a> {
    #[inline]
    fn coords(&self, idx: usize) -> (usize, usize) {
        if self.vertical {
            (idx, self.line)
        } else {
            (self.line, idx)
        }
    }

    #[inline]
    fn at(&self, idx: usize) -> Option<Code> {
        let (row, col) = self.coords(idx);
        self.board.tile_at(row, col)
    }

    #[inline]
    fn open_after(&self, idx: usize) -> bool {
        idx + 1 >= DIM || self.at(idx + 1).is_none()
    }

    fn from_anchor(&mut self, anchor: usize) {
        let root = self.gaddag.root_node_id();
        if anchor > 0 && self.at(anchor - 1).is_some() {
            // A word sits directly left: the reversed prefix is exactly
            // that run. Plays reaching further left belong to an earlier
            // anchor.
            let mut node = root;
            let mut j = anchor;
            while j > 0 {
                match self.at(j - 1) {
                    Some(tile) => match self.gaddag.next_node(node, natural(tile)) {
                        Some(child) => {
                            self.strip[j - 1] = PLAYED_THROUGH;
                            node = child;
                            j -= 1;
                        }
                        None => return,
                    },
                    None => break,
                }
            }
            if let Some(sep_node) = self.gaddag.next_node(node, self.gaddag.separator_code()) {
                self.extend_right(j, anchor, sep_node, 0);
            }
        } else {
            self.extend_left(anchor, anchor, root);
        }
    }

    /// Place rack tiles leftward of the anchor. `word_start` is the
    /// leftmost position filled so far (the anchor itself when none).
    fn extend_left(&mut self, anchor: usize, word_start: usize, node: NodeId) {
        if let Some(sep_node) = self.gaddag.next_node(node, self.gaddag.separator_code()) {
            self.extend_right(word_start, anchor, sep_node, anchor - word_start);
        }
        if word_start == 0 {
            return;
        }
        let pos = word_start - 1;
        let (row, col) = self.coords(pos);
        // stopping at anchors keeps every play on exactly one anchor and
        // guarantees an open square beyond the leftmost tile
        if self.at(pos).is_some() || self.board.is_anchor(row, col) {
            return;
        }
        let cross = self.board.cross_set(row, col, self.vertical);
        for letter in 0..self.gaddag.alphabet_size() as Code {
            if self.rack.count_of(letter) == 0 || !cross.allows(letter) {
                continue;
            }
            if let Some(child) = self.gaddag.next_node(node, letter) {
                self.strip[pos] = letter;
                self.rack.remove(letter);
                self.extend_left(anchor, pos, child);
                self.rack.add(letter);
            }
        }
        if self.rack.count_of(BLANK) > 0 {
            let gaddag = self.gaddag;
            for (letter, child) in gaddag.arcs_from(node) {
                if !cross.allows(letter) {
                    continue;
                }
                self.strip[pos] = letter | BLANK_MASK;
                self.rack.remove(BLANK);
                self.extend_left(anchor, pos, child);
                self.rack.add(BLANK);
            }
        }
    }

    /// Walk rightward from the anchor spelling the forward suffix,
    /// emitting a play at every word terminal with an open square beyond.
    fn extend_right(&mut self, word_start: usize, pos: usize, node: NodeId, played: usize) {
        if pos >= DIM {
            return;
        }
        match self.at(pos) {
            Some(tile) => {
                let letter = natural(tile);
                if let Some(child) = self.gaddag.next_node(node, letter) {
                    self.strip[pos] = PLAYED_THROUGH;
                    if played > 0 && self.gaddag.is_terminal(node, letter) && self.open_after(pos) {
                        self.record(word_start, pos, played);
                    }
                    self.extend_right(word_start, pos + 1, child, played);
                }
            }
            None => {
                let (row, col) = self.coords(pos);
                let cross = self.board.cross_set(row, col, self.vertical);
                for letter in 0..self.gaddag.alphabet_size() as Code {
                    if self.rack.count_of(letter) == 0 || !cross.allows(letter) {
                        continue;
                    }
                    if let Some(child) = self.gaddag.next_node(node, letter) {
                        self.strip[pos] = letter;
                        self.rack.remove(letter);
                        if self.gaddag.is_terminal(node, letter) && self.open_after(pos) {
                            self.record(word_start, pos, played + 1);
                        }
                        self.extend_right(word_start, pos + 1, child, played + 1);
                        self.rack.add(letter);
                    }
                }
                if self.rack.count_of(BLANK) > 0 {
                    let gaddag = self.gaddag;
                    for (letter, child) in gaddag.arcs_from(node) {
                        if !cross.allows(letter) {
                            continue;
                        }
                        self.strip[pos] = letter | BLANK_MASK;
                        self.rack.remove(BLANK);
                        if self.gaddag.is_terminal(node, letter) && self.open_after(pos) {
                            self.record(word_start, pos, played + 1);
                        }
                        self.extend_right(word_start, pos + 1, child, played + 1);
                        self.rack.add(BLANK);
                    }
                }
            }
        }
    }

    fn record(&mut self, word_start: usize, end: usize, played: usize) {
        if played == 1 {
            // a lone tile reads the same in either orientation; key it by
            // its square so it is emitted exactly once
            let (idx, code) = (word_start..=end)
                .map(|i| (i, self.strip[i]))
                .find(|&(_, code)| code != PLAYED_THROUGH)
                .expect("a play places at least one tile");
            let (row, col) = self.coords(idx);
            if !self.dedup.insert((row as u8, col as u8, code)) {
                return;
            }
        }
        let mut tiles = MoveTiles::new();
        let mut word = MachineWord::new();
        for i in word_start..=end {
            let code = self.strip[i];
            tiles.push(code);
            if code == PLAYED_THROUGH {
                let (row, col) = self.coords(i);
                word.push(self.board.tile_at(row, col).expect("marker covers a tile"));
            } else {
                word.push(code);
            }
        }
        let (row, col) = self.coords(word_start);
        let score = self
            .board
            .score_play(self.dist, row, col, self.vertical, tiles.as_slice());
        let leave: Leave = self.rack.codes();
        self.plays
            .push(Move::play(row, col, self.vertical, tiles, word, score, leave));
    }
}

/// Emit every distinct non-empty sub-multiset of the rack as an exchange.
fn gen_exchanges(rack: &Rack, plays: &mut Vec<Move>) {
    let codes = rack.codes();
    let mut distinct: ArrayVec<[(Code, u8); RACK_SIZE]> = ArrayVec::new();
    for &code in codes.iter() {
        match distinct.last_mut() {
            Some(entry) if entry.0 == code => entry.1 += 1,
            _ => distinct.push((code, 1)),
        }
    }
    let mut chosen = MoveTiles::new();
    exchange_rec(rack, &distinct, 0, &mut chosen, plays);
}

fn exchange_rec(
    rack: &Rack,
    distinct: &[(Code, u8)],
    i: usize,
    chosen: &mut MoveTiles,
    plays: &mut Vec<Move>,
) {
    if i == distinct.len() {
        if chosen.is_empty() {
            return;
        }
        let mut remainder = rack.clone();
        for &code in chosen.iter() {
            remainder.remove(code);
        }
        plays.push(Move::exchange(*chosen, remainder.codes()));
        return;
    }
    let (code, count) = distinct[i];
    exchange_rec(rack, distinct, i + 1, chosen, plays);
    for _ in 0..count {
        chosen.push(code);
        exchange_rec(rack, distinct, i + 1, chosen, plays);
    }
    for _ in 0..count {
        chosen.pop();
    }
}

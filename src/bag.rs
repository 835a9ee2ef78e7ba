use crate::alphabet::{Code, LetterDistribution, RACK_SIZE};
use crate::error::Error;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tinyvec::ArrayVec;

/// The tiles not yet on a rack or the board, in draw order.
///
/// Tiles are drawn from the end of the sequence; draws and put-backs are
/// deterministic given the seed, which makes simulated games replayable
/// and exactly undoable.
#[derive(Debug, Clone)]
pub struct Bag {
    tiles: Vec<Code>,
    rng: StdRng,
}

impl Bag {
    /// A full, shuffled bag for the given distribution.
    pub fn new(dist: &LetterDistribution, seed: u64) -> Bag {
        let mut bag = Bag {
            tiles: dist.full_bag(),
            rng: StdRng::seed_from_u64(seed),
        };
        bag.shuffle();
        bag
    }

    pub fn shuffle(&mut self) {
        self.tiles.shuffle(&mut self.rng);
    }

    /// Number of tiles left.
    pub fn remaining(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Draw exactly `n` tiles.
    ///
    /// ## Errors
    /// [`Error::BagExhausted`] if fewer than `n` tiles remain; the bag is
    /// left untouched.
    pub fn draw(&mut self, n: usize) -> Result<ArrayVec<[Code; RACK_SIZE]>, Error> {
        if n > self.tiles.len() || n > RACK_SIZE {
            return Err(Error::BagExhausted);
        }
        Ok(self.draw_at_most(n))
    }

    /// Draw up to `n` tiles, fewer when the bag runs dry.
    pub fn draw_at_most(&mut self, n: usize) -> ArrayVec<[Code; RACK_SIZE]> {
        let mut drawn = ArrayVec::new();
        for _ in 0..n.min(RACK_SIZE) {
            match self.tiles.pop() {
                Some(tile) => drawn.push(tile),
                None => break,
            }
        }
        drawn
    }

    /// Return tiles to the bag and reshuffle the contents.
    pub fn put_back(&mut self, tiles: &[Code]) {
        self.tiles.extend_from_slice(tiles);
        self.shuffle();
    }

    /// Per-letter counts of the remaining tiles, indexed by natural code
    /// with blanks in the last slot.
    pub fn letter_counts(&self) -> [u8; crate::alphabet::MAX_ALPHABET + 1] {
        let mut counts = [0u8; crate::alphabet::MAX_ALPHABET + 1];
        for &tile in &self.tiles {
            if crate::alphabet::is_blank(tile) {
                counts[crate::alphabet::MAX_ALPHABET] += 1;
            } else {
                counts[tile as usize] += 1;
            }
        }
        counts
    }

    pub(crate) fn tiles(&self) -> &[Code] {
        &self.tiles
    }

    pub(crate) fn rng(&self) -> &StdRng {
        &self.rng
    }

    pub(crate) fn restore(&mut self, tiles: &[Code], rng: StdRng) {
        self.tiles.clear();
        self.tiles.extend_from_slice(tiles);
        self.rng = rng;
    }
}

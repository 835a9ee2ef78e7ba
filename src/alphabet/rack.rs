use super::codes::{is_blank, Code, MAX_ALPHABET, PLAYED_THROUGH};
use crate::error::Error;
use tinyvec::ArrayVec;

/// Maximum number of tiles on a rack.
pub const RACK_SIZE: usize = 7;

const BLANK_SLOT: usize = MAX_ALPHABET;

/// A player's hand of up to 7 tiles, kept as a per-code count array for
/// O(1) presence tests. Letters occupy their code slot; blanks the last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rack {
    counts: [u8; MAX_ALPHABET + 1],
    len: u8,
}

impl Default for Rack {
    fn default() -> Rack {
        Rack {
            counts: [0; MAX_ALPHABET + 1],
            len: 0,
        }
    }
}

impl Rack {
    pub fn new() -> Rack {
        Rack::default()
    }

    /// Build a rack from tile codes (natural letters and unassigned blanks).
    ///
    /// ## Errors
    /// If there are more than [`RACK_SIZE`] codes, or a code is a
    /// designated blank or played-through marker.
    pub fn from_codes(codes: &[Code]) -> Result<Rack, Error> {
        if codes.len() > RACK_SIZE {
            return Err(Error::EncodeStringTooLong(format!("{:?}", codes)));
        }
        let mut rack = Rack::new();
        for &code in codes {
            if code == PLAYED_THROUGH || (is_blank(code) && code != super::BLANK) {
                return Err(Error::InvalidTileCode(code));
            }
            rack.add(code);
        }
        Ok(rack)
    }

    fn slot(code: Code) -> usize {
        if is_blank(code) {
            BLANK_SLOT
        } else {
            code as usize
        }
    }

    /// Number of tiles on the rack.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Count of a given tile. A designated blank counts as a blank.
    pub fn count_of(&self, code: Code) -> u8 {
        self.counts[Rack::slot(code)]
    }

    pub fn has(&self, code: Code) -> bool {
        self.count_of(code) > 0
    }

    /// Add a tile to the rack. The blank flag is stripped to the bare
    /// blank; racks never hold designated blanks.
    pub fn add(&mut self, code: Code) {
        self.counts[Rack::slot(code)] += 1;
        self.len += 1;
    }

    /// Remove one tile. Returns false (and leaves the rack unchanged) if
    /// the tile is not held.
    pub fn remove(&mut self, code: Code) -> bool {
        let slot = Rack::slot(code);
        if self.counts[slot] == 0 {
            return false;
        }
        self.counts[slot] -= 1;
        self.len -= 1;
        true
    }

    /// The rack as a sorted list of codes, letters ascending, blanks last.
    pub fn codes(&self) -> ArrayVec<[Code; RACK_SIZE]> {
        let mut out = ArrayVec::new();
        for (slot, &count) in self.counts.iter().enumerate() {
            let code = if slot == BLANK_SLOT {
                super::BLANK
            } else {
                slot as Code
            };
            for _ in 0..count {
                out.push(code);
            }
        }
        out
    }

    /// Remove the tiles a play consumes: one rack tile per non-sentinel
    /// entry, a blank for each designated blank.
    ///
    /// ## Errors
    /// Restores the rack and fails with [`Error::TilesNotInRack`] if any
    /// tile is missing.
    pub fn remove_play_tiles(&mut self, tiles: &[Code]) -> Result<(), Error> {
        let mut taken: ArrayVec<[Code; RACK_SIZE]> = ArrayVec::new();
        for &code in tiles.iter().filter(|&&c| c != PLAYED_THROUGH) {
            let rack_tile = if is_blank(code) { super::BLANK } else { code };
            if !self.remove(rack_tile) {
                for &t in taken.iter() {
                    self.add(t);
                }
                return Err(Error::TilesNotInRack);
            }
            taken.push(rack_tile);
        }
        Ok(())
    }

    /// Put the consumed tiles of a play back (exact inverse of
    /// [`remove_play_tiles`](Rack::remove_play_tiles)).
    pub fn add_play_tiles(&mut self, tiles: &[Code]) {
        for &code in tiles.iter().filter(|&&c| c != PLAYED_THROUGH) {
            let rack_tile = if is_blank(code) { super::BLANK } else { code };
            self.add(rack_tile);
        }
    }
}

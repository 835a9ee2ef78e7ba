use super::codes::{is_blank, natural, Code, BLANK};
use super::Alphabet;
use crate::error::Error;

/// The standard English distribution: 98 letters plus two blanks.
const ENGLISH: &str = "A,9,1
B,2,3
C,2,3
D,4,2
E,12,1
F,2,4
G,3,2
H,2,4
I,9,1
J,1,8
K,1,5
L,4,1
M,2,3
N,6,1
O,8,1
P,2,3
Q,1,10
R,6,1
S,4,1
T,6,1
U,4,1
V,2,4
W,2,4
X,1,8
Y,2,4
Z,1,10
?,2,0";

/// Per-letter tile counts and point values for a game variant.
///
/// Parsed from newline-delimited `<rune>,<count>,<points>` records; the
/// blank is the distinguished rune `?` with 0 points.
#[derive(Debug, Clone)]
pub struct LetterDistribution {
    counts: Vec<u8>,
    points: Vec<i32>,
    vowels: u64,
    blank_count: u8,
}

impl LetterDistribution {
    /// Parse a distribution from `<rune>,<count>,<points>` records.
    ///
    /// ## Errors
    /// If a record does not have three fields, a field does not parse, or
    /// a rune is not in `alphabet`. `name` is only used in error messages.
    pub fn parse(text: &str, alphabet: &Alphabet, name: &str) -> Result<LetterDistribution, Error> {
        let malformed = |reason: String| Error::MalformedDataFile {
            path: String::from(name),
            reason,
        };
        let mut counts = vec![0u8; alphabet.len()];
        let mut points = vec![0i32; alphabet.len()];
        let mut vowels = 0u64;
        let mut blank_count = 0u8;
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() != 3 {
                return Err(malformed(format!("expected 3 fields in \"{}\"", line)));
            }
            let count: u8 = fields[1]
                .parse()
                .map_err(|_| malformed(format!("bad count in \"{}\"", line)))?;
            let pts: i32 = fields[2]
                .parse()
                .map_err(|_| malformed(format!("bad points in \"{}\"", line)))?;
            if fields[0] == "?" {
                blank_count = count;
                continue;
            }
            let mut chars = fields[0].chars();
            let rune = chars
                .next()
                .filter(|_| chars.next().is_none())
                .ok_or_else(|| malformed(format!("bad rune in \"{}\"", line)))?;
            let code = alphabet.encode_char(rune)?;
            counts[code as usize] = count;
            points[code as usize] = pts;
            if alphabet.is_vowel(code) {
                vowels |= 1 << code;
            }
        }
        Ok(LetterDistribution {
            counts,
            points,
            vowels,
            blank_count,
        })
    }

    /// The standard English distribution (100 tiles).
    pub fn english(alphabet: &Alphabet) -> LetterDistribution {
        // The embedded table always parses
        LetterDistribution::parse(ENGLISH, alphabet, "english").unwrap()
    }

    /// Point value of a tile code. Blanks are worth 0 however assigned.
    #[inline]
    pub fn points(&self, code: Code) -> i32 {
        if is_blank(code) {
            0
        } else {
            self.points[code as usize]
        }
    }

    /// Number of tiles with this natural letter in a full bag.
    pub fn count(&self, code: Code) -> u8 {
        if is_blank(code) {
            self.blank_count
        } else {
            self.counts[natural(code) as usize]
        }
    }

    pub fn blank_count(&self) -> u8 {
        self.blank_count
    }

    /// Check if a tile is a vowel; blanks count as the letter they
    /// designate.
    pub fn is_vowel(&self, code: Code) -> bool {
        self.vowels & (1 << natural(code)) != 0
    }

    /// Total number of tiles in a full bag, blanks included.
    pub fn total_tiles(&self) -> usize {
        self.counts.iter().map(|&c| c as usize).sum::<usize>() + self.blank_count as usize
    }

    /// Sum of point values over a list of tile codes.
    pub fn score_of(&self, codes: &[Code]) -> i32 {
        codes.iter().map(|&c| self.points(c)).sum()
    }

    /// All tile codes of a full bag, in code order, blanks last.
    pub fn full_bag(&self) -> Vec<Code> {
        let mut tiles = Vec::with_capacity(self.total_tiles());
        for (code, &count) in self.counts.iter().enumerate() {
            for _ in 0..count {
                tiles.push(code as Code);
            }
        }
        for _ in 0..self.blank_count {
            tiles.push(BLANK);
        }
        tiles
    }
}

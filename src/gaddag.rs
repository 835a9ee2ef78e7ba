use crate::alphabet::{natural, Alphabet, Code};
use crate::error::Error;
use log::{debug, info};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};

/// Index of a gaddag node.
pub type NodeId = u32;

const NO_NODE: NodeId = NodeId::MAX;
const MAGIC: &[u8; 4] = b"GDAG";
const MAX_NODES: usize = 0xff_ffff; // child indices are stored in 3 bytes

/// An immutable word graph encoding, for every lexicon word, every
/// `reversed-prefix · separator · suffix` split, so that a traversal can
/// start at any letter of a word and scan outward.
///
/// Nodes are plain indices into dense per-node arc tables; all lookups are
/// O(1) and the structure is freely shared between concurrent readers.
#[derive(Debug, Clone)]
pub struct Gaddag {
    alphabet: Alphabet,
    stride: usize,
    arcs: Vec<NodeId>,
    terminals: Vec<u64>,
}

impl fmt::Display for Gaddag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<Gaddag: {} letters, {} nodes>",
            self.alphabet.len(),
            self.node_count()
        )
    }
}

impl Gaddag {
    /// The node every traversal starts from.
    #[inline]
    pub fn root_node_id(&self) -> NodeId {
        0
    }

    /// Follow the arc labelled `label` (a letter code or the separator).
    #[inline]
    pub fn next_node(&self, node: NodeId, label: Code) -> Option<NodeId> {
        let child = self.arcs[node as usize * self.stride + label as usize];
        if child == NO_NODE {
            None
        } else {
            Some(child)
        }
    }

    /// Check whether arriving at `letter` from `node` completes a word.
    #[inline]
    pub fn is_terminal(&self, node: NodeId, letter: Code) -> bool {
        self.terminals[node as usize] & (1 << letter) != 0
    }

    /// The arc label marking the switch from reversed prefix to suffix.
    #[inline]
    pub fn separator_code(&self) -> Code {
        self.alphabet.separator()
    }

    pub fn alphabet_size(&self) -> usize {
        self.alphabet.len()
    }

    /// The alphabet the graph was built against.
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn node_count(&self) -> usize {
        self.terminals.len()
    }

    /// Iterate the letter arcs leaving `node` (the separator is skipped).
    pub fn arcs_from(&self, node: NodeId) -> impl Iterator<Item = (Code, NodeId)> + '_ {
        let base = node as usize * self.stride;
        let letters = self.alphabet.len();
        self.arcs[base..base + letters]
            .iter()
            .enumerate()
            .filter(|(_, &child)| child != NO_NODE)
            .map(|(label, &child)| (label as Code, child))
    }

    /// Check whether `word` is in the lexicon. Designated blanks count as
    /// their letter.
    pub fn in_lexicon(&self, word: &[Code]) -> bool {
        let (last, prefix) = match word.split_last() {
            Some(split) => split,
            None => return false,
        };
        let mut node = match self.next_node(self.root_node_id(), self.separator_code()) {
            Some(node) => node,
            None => return false,
        };
        for &code in prefix {
            match self.next_node(node, natural(code)) {
                Some(child) => node = child,
                None => return false,
            }
        }
        self.is_terminal(node, natural(*last))
    }

    /// Build the graph in memory from a list of words.
    ///
    /// ## Errors
    /// If a word contains runes outside the alphabet, or blanks.
    ///
    /// ## Examples
    /// ```
    /// # use crossword_engine::{Alphabet, Error, Gaddag};
    /// let gaddag = Gaddag::from_words(&["CARE", "CARES"], Alphabet::english())?;
    /// assert!(gaddag.in_lexicon(&[2, 0, 17, 4]));
    /// assert!(!gaddag.in_lexicon(&[2, 0, 17]));
    /// # Ok::<(), Error>(())
    /// ```
    pub fn from_words<S: AsRef<str>>(words: &[S], alphabet: Alphabet) -> Result<Gaddag, Error> {
        let mut builder = Builder::new(&alphabet);
        for word in words {
            let word = word.as_ref().trim();
            if word.is_empty() {
                continue;
            }
            let codes = alphabet.encode(word)?;
            for &code in codes.iter() {
                if natural(code) != code {
                    return Err(Error::InvalidTileCode(code));
                }
            }
            builder.insert(codes.as_slice());
        }
        let gaddag = builder.build(alphabet);
        debug!("built gaddag: {} nodes", gaddag.node_count());
        Ok(gaddag)
    }

    /// Read the graph from its binary file format.
    ///
    /// Layout, little-endian: 4-byte magic, 4-byte alphabet size, 4-byte
    /// node count; a letter table of length-prefixed UTF-8 runes; then per
    /// node an arc-count-prefixed record of (label, 3-byte child index,
    /// terminal flag) arcs.
    ///
    /// ## Errors
    /// If the file cannot be opened, or its contents are malformed.
    pub fn read_from(path: &str) -> Result<Gaddag, Error> {
        let file = File::open(path).map_err(|source| Error::LexiconNotFound {
            path: String::from(path),
            source,
        })?;
        let gaddag = Gaddag::from_reader(BufReader::new(file), path)?;
        info!(
            "loaded gaddag from {}: {} letters, {} nodes",
            path,
            gaddag.alphabet_size(),
            gaddag.node_count()
        );
        Ok(gaddag)
    }

    /// Read the graph from any reader. `path` is only used in errors.
    pub fn from_reader<R: Read>(mut r: R, path: &str) -> Result<Gaddag, Error> {
        let malformed = |reason: String| Error::MalformedDataFile {
            path: String::from(path),
            reason,
        };
        let read_err = |source: io::Error| Error::LexiconNotFound {
            path: String::from(path),
            source,
        };

        let mut magic = [0u8; 4];
        r.read_exact(&mut magic).map_err(read_err)?;
        if &magic != MAGIC {
            return Err(malformed(format!("bad magic {:02x?}", magic)));
        }
        let letters = read_u32(&mut r).map_err(read_err)? as usize;
        let nodes = read_u32(&mut r).map_err(read_err)? as usize;
        if letters == 0 || letters > crate::alphabet::MAX_ALPHABET {
            return Err(malformed(format!("unsupported alphabet size {}", letters)));
        }
        if nodes == 0 || nodes > MAX_NODES {
            return Err(malformed(format!("unsupported node count {}", nodes)));
        }

        let mut runes = Vec::with_capacity(letters);
        for _ in 0..letters {
            let mut len = [0u8; 1];
            r.read_exact(&mut len).map_err(read_err)?;
            let mut buf = vec![0u8; len[0] as usize];
            r.read_exact(&mut buf).map_err(read_err)?;
            let s = std::str::from_utf8(&buf)
                .map_err(|_| malformed(String::from("letter table is not UTF-8")))?;
            let mut chars = s.chars();
            let rune = chars
                .next()
                .filter(|_| chars.next().is_none())
                .ok_or_else(|| malformed(String::from("letter table entry is not one rune")))?;
            runes.push(rune);
        }
        let alphabet = Alphabet::new(&runes)?;

        let stride = letters + 1;
        let mut arcs = vec![NO_NODE; nodes * stride];
        let mut terminals = vec![0u64; nodes];
        for node in 0..nodes {
            let mut count = [0u8; 1];
            r.read_exact(&mut count).map_err(read_err)?;
            for _ in 0..count[0] {
                let mut arc = [0u8; 5];
                r.read_exact(&mut arc).map_err(read_err)?;
                let label = arc[0] as usize;
                let child = u32::from_le_bytes([arc[1], arc[2], arc[3], 0]);
                if label > letters {
                    return Err(malformed(format!("arc label {} out of range", label)));
                }
                if child as usize >= nodes {
                    return Err(malformed(format!("arc child {} out of range", child)));
                }
                arcs[node * stride + label] = child;
                if arc[4] != 0 {
                    terminals[node] |= 1 << label;
                }
            }
        }

        Ok(Gaddag {
            alphabet,
            stride,
            arcs,
            terminals,
        })
    }

    /// Write the graph in the format [`read_from`](Gaddag::read_from)
    /// accepts.
    pub fn write_to(&self, path: &str) -> io::Result<()> {
        let file = File::create(path)?;
        self.to_writer(BufWriter::new(file))
    }

    pub fn to_writer<W: Write>(&self, mut w: W) -> io::Result<()> {
        let nodes = self.node_count();
        if nodes > MAX_NODES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} nodes do not fit 3-byte child indices", nodes),
            ));
        }
        w.write_all(MAGIC)?;
        w.write_all(&(self.alphabet.len() as u32).to_le_bytes())?;
        w.write_all(&(nodes as u32).to_le_bytes())?;
        for code in 0..self.alphabet.len() {
            let rune = self.alphabet.rune(code as Code).unwrap();
            let mut buf = [0u8; 4];
            let s = rune.encode_utf8(&mut buf);
            w.write_all(&[s.len() as u8])?;
            w.write_all(s.as_bytes())?;
        }
        let sep = self.separator_code();
        for node in 0..nodes as NodeId {
            let base = node as usize * self.stride;
            let arcs: Vec<(usize, NodeId)> = self.arcs[base..base + self.stride]
                .iter()
                .enumerate()
                .filter(|(_, &child)| child != NO_NODE)
                .map(|(label, &child)| (label, child))
                .collect();
            w.write_all(&[arcs.len() as u8])?;
            for (label, child) in arcs {
                let terminal = label != sep as usize && self.is_terminal(node, label as Code);
                let child = child.to_le_bytes();
                w.write_all(&[label as u8, child[0], child[1], child[2], terminal as u8])?;
            }
        }
        w.flush()
    }
}

fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Trie builder used by [`Gaddag::from_words`]. Children are kept sorted
/// so the flattened arc tables are deterministic.
struct Builder {
    children: Vec<BTreeMap<Code, NodeId>>,
    terminals: Vec<u64>,
    separator: Code,
}

impl Builder {
    fn new(alphabet: &Alphabet) -> Builder {
        Builder {
            children: vec![BTreeMap::new()],
            terminals: vec![0],
            separator: alphabet.separator(),
        }
    }

    /// Insert every split of `word`: `rev(word[..i]) · SEP · word[i..]`
    /// for each split point with a non-empty suffix.
    fn insert(&mut self, word: &[Code]) {
        let mut entry: Vec<Code> = Vec::with_capacity(word.len() + 1);
        for i in 0..word.len() {
            entry.clear();
            entry.extend(word[..i].iter().rev());
            entry.push(self.separator);
            entry.extend(&word[i..]);
            self.insert_entry(&entry);
        }
    }

    fn insert_entry(&mut self, entry: &[Code]) {
        let (last, prefix) = entry.split_last().expect("entries are never empty");
        let mut node: NodeId = 0;
        for &label in prefix {
            node = self.child(node, label);
        }
        self.terminals[node as usize] |= 1 << last;
        self.child(node, *last);
    }

    fn child(&mut self, node: NodeId, label: Code) -> NodeId {
        if let Some(&child) = self.children[node as usize].get(&label) {
            return child;
        }
        let child = self.children.len() as NodeId;
        self.children.push(BTreeMap::new());
        self.terminals.push(0);
        self.children[node as usize].insert(label, child);
        child
    }

    fn build(self, alphabet: Alphabet) -> Gaddag {
        let stride = alphabet.len() + 1;
        let nodes = self.children.len();
        let mut arcs = vec![NO_NODE; nodes * stride];
        for (node, children) in self.children.iter().enumerate() {
            for (&label, &child) in children {
                arcs[node * stride + label as usize] = child;
            }
        }
        Gaddag {
            alphabet,
            stride,
            arcs,
            terminals: self.terminals,
        }
    }
}

use crate::error::Error;
use flate2::read::GzDecoder;
use fst::Map;
use log::info;
use std::fs::File;
use std::io::Read;

/// Immutable table mapping a sorted rack residue to its equity
/// adjustment.
///
/// Keys are the raw bytes of sorted leave codes (length 1..=6); values
/// are float32 bits. The table is read-only after loading and freely
/// shared between games.
pub struct LeaveTable {
    map: Map<Vec<u8>>,
}

impl LeaveTable {
    /// Load a table, transparently decompressing when the path ends in
    /// `.gz`.
    ///
    /// ## Errors
    /// If the file cannot be read or its contents do not parse.
    pub fn from_file(path: &str) -> Result<LeaveTable, Error> {
        let file = File::open(path).map_err(|source| Error::LeaveTableNotFound {
            path: String::from(path),
            source,
        })?;
        let table = LeaveTable::read(file, path.ends_with(".gz"), path)?;
        info!("loaded leave table from {}: {} leaves", path, table.len());
        Ok(table)
    }

    /// Read a table from any source. `name` is only used in errors.
    pub fn read<R: Read>(r: R, gzipped: bool, name: &str) -> Result<LeaveTable, Error> {
        let read_err = |source: std::io::Error| Error::LeaveTableNotFound {
            path: String::from(name),
            source,
        };
        let mut bytes = Vec::new();
        if gzipped {
            GzDecoder::new(r).read_to_end(&mut bytes).map_err(read_err)?;
        } else {
            let mut r = r;
            r.read_to_end(&mut bytes).map_err(read_err)?;
        }
        let map = Map::new(bytes).map_err(|e| Error::MalformedDataFile {
            path: String::from(name),
            reason: e.to_string(),
        })?;
        Ok(LeaveTable { map })
    }

    /// Build a table from (sorted leave, value) pairs. Entries are sorted
    /// here; duplicate keys are rejected.
    ///
    /// ## Errors
    /// If two entries share a key.
    pub fn from_entries(entries: &[(Vec<u8>, f32)]) -> Result<LeaveTable, Error> {
        let mut entries: Vec<(Vec<u8>, f32)> = entries.to_vec();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let map = Map::from_iter(
            entries
                .iter()
                .map(|(key, value)| (key.as_slice(), value.to_bits() as u64)),
        )
        .map_err(|e| Error::MalformedDataFile {
            path: String::from("<entries>"),
            reason: e.to_string(),
        })?;
        Ok(LeaveTable { map })
    }

    /// The serialized bytes, as accepted by [`read`](LeaveTable::read).
    pub fn as_bytes(&self) -> &[u8] {
        self.map.as_fst().as_bytes()
    }

    /// Look up a sorted leave.
    pub fn get(&self, sorted_leave: &[u8]) -> Option<f32> {
        self.map
            .get(sorted_leave)
            .map(|bits| f32::from_bits(bits as u32))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

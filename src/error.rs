use thiserror::Error;

/// The reason a tile placement was rejected by validation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    #[error("placement runs off the board")]
    OffBoard,
    #[error("placed tiles are not contiguous")]
    NotContiguous,
    #[error("placement overlaps a mismatched tile")]
    OverlapsMismatchedTile,
    #[error("the first play must cover the centre square")]
    FirstPlayMissesCentre,
    #[error("placement does not connect to any tile")]
    Isolated,
}

#[derive(Error, Debug)]
/// Errors that can be returned
pub enum Error {
    /// Error reading a lexicon data file
    #[error("Lexicon \"{path}\" could not be read")]
    LexiconNotFound {
        path: String,
        source: std::io::Error,
    },

    /// Error reading a leave table file
    #[error("Leave table \"{path}\" could not be read")]
    LeaveTableNotFound {
        path: String,
        source: std::io::Error,
    },

    /// A data file was read but its contents could not be parsed
    #[error("Malformed data file \"{path}\": {reason}")]
    MalformedDataFile { path: String, reason: String },

    /// Error when encoding a string to tile codes
    #[error("Encoder: no tile for token '{0}'")]
    EncodeInvalidToken(String),
    #[error("Encoder: string too long: \"{0}\"")]
    EncodeStringTooLong(String),
    #[error("Invalid code for tile {0}")]
    InvalidTileCode(u8),

    /// Error parsing a bonus grid from strings
    #[error("Invalid number of rows {0} (expect 15)")]
    InvalidRowCount(usize),
    #[error("Invalid row length {0} (expect 15)")]
    InvalidRowLength(usize),
    #[error("Invalid grid bonus cell: \"{0}\"")]
    GridParseError(String),

    /// Error parsing board game coordinates such as "H7" or "8G"
    #[error("Invalid coordinates: \"{0}\"")]
    InvalidCoordinates(String),

    /// A move's tiles do not fit the board
    #[error("Illegal placement: {0}")]
    IllegalPlacement(PlacementError),

    /// A move uses tiles the player does not hold
    #[error("Tiles not in rack")]
    TilesNotInRack,

    /// A formed word is not in the lexicon
    #[error("\"{0}\" is not a word in the lexicon")]
    PhonyWord(String),

    /// Too few tiles remain in the bag for the request
    #[error("Not enough tiles in the bag")]
    BagExhausted,

    /// The preallocated undo ring is full
    #[error("Backup stack overflow (configured depth {0})")]
    BackupStackOverflow(usize),

    /// The game has ended; no further plays are accepted
    #[error("Game is already finalised")]
    GameAlreadyFinalised,
}

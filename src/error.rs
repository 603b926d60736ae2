use crate::Level;

use thiserror::Error;

/// Errors surfaced by codec and tree operations.
///
/// Absence of a key from the tree is reported as `None` by the lookup APIs;
/// only contract violations become a [`TreeError`]. Note that refining an
/// already-internal cell is a silent no-op rather than an error, mirroring the
/// copy-value-to-children contract of [`refine_cell`](crate::Orthtree::refine_cell).
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum TreeError {
    /// The operation needed a non-root key, a key present in the tree, or a
    /// lattice offset inside the level's grid, and got none of those.
    #[error("key is not valid for this operation")]
    InvalidKey,

    /// A level argument lies beyond the codec's precomputed range.
    #[error("level {level} exceeds the maximum level {max}")]
    LevelExceeded {
        /// The offending level.
        level: Level,
        /// The codec's level cap.
        max: Level,
    },

    /// Bulk construction was started at a cell deeper than its stop level.
    #[error("build starts at level {start}, past its stop level {stop}")]
    StartPastStop {
        /// The level construction was asked to start from.
        start: Level,
        /// The requested stop level.
        stop: Level,
    },

    /// Children were requested from a cell that is a leaf.
    #[error("cell is a leaf and has no children")]
    NotInternal,

    /// An internal cell is missing one of its children. This is a structural
    /// invariant violation: correct sequences of build/refine/prune cannot
    /// produce it.
    #[error("internal cell is missing a child")]
    MissingChild,
}

/// The result type of fallible codec and tree operations.
pub type Result<T> = core::result::Result<T, TreeError>;

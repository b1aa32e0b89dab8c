//! Typed engine errors (§7). File I/O and parsing live in the CLI crate, but
//! the error *kinds* are defined here so the driver can match on them (e.g.
//! to turn `InaccessibleExit` into a skipped set rather than a hard failure).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("allocation failure while building grid/list for {context}")]
    AllocationFailure { context: &'static str },

    #[error("malformed environment: {detail} (file {file}, line {line})")]
    MalformedEnvironment {
        file: String,
        line: usize,
        detail: String,
    },

    #[error("malformed auxiliary file: {detail} (byte offset {offset})")]
    MalformedAuxiliary { offset: usize, detail: String },

    #[error("exit is inaccessible: no orthogonal empty neighbor to any of its cells")]
    InaccessibleExit,

    #[error("no room for pedestrians: random placement wrapped around without finding an empty cell (density over-saturated)")]
    NoRoomForPedestrians,
}

pub type EngineResult<T> = Result<T, EngineError>;

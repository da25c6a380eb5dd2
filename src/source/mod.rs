//! The external record source and the background reader that polls it.

pub mod reader;
pub mod records;

pub use reader::{ReaderState, SourceReader, TickOutcome};
pub use records::{LatestRecord, RecordSource, SeedOutcome};

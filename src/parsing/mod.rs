//! Parsers for submitted sequences and for the search service's result artifacts.
//!
//! - **FASTA submissions**: split and validate raw user input ([`fasta`])
//! - **Tabular report** (`tblout`): one fixed-column row per hit ([`tblout`])
//! - **Narrative report** (`out`): per-hit alignment blocks ([`narrative`])
//! - **Correlation**: join the two reports into structured hits ([`correlate`])
//!
//! ## Fragility
//!
//! Both reports are meant for humans. Field positions and line offsets are a
//! contract with the service's output format; they live in [`tblout`] and
//! [`narrative`] only, so a format change stays local to those modules.
//! Rows and blocks that do not fit are logged and skipped, never fatal.
//!
//! ## Example
//!
//! ```rust
//! use rfam_batch::parsing::fasta::parse_sequences;
//!
//! let records = parse_sequences(">h1\nacgu\n>h2\nUGCA").unwrap();
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[0].residues, "ACGU");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod correlate;
pub mod fasta;
pub mod narrative;
pub mod tblout;

/// A row, block or field in a result artifact that could not be read.
///
/// Line numbers are 1-based. Serialized with a `kind` tag so result
/// documents can carry the rows and blocks that were skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseError {
    #[error("Malformed tabular row on line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("Malformed alignment block at line {line}: {reason}")]
    MalformedBlock { line: usize, reason: String },

    #[error("Unrecognised date '{raw}'")]
    InvalidDate { raw: String },
}

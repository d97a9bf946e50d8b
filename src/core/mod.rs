//! Core data types for batch covariance-model searches.
//!
//! - [`SequenceRecord`], [`SubmissionQuery`]: validated input and what gets submitted
//! - [`JobHandle`], [`JobStatus`], [`ArtifactKind`]: remote job lifecycle
//! - [`HitRow`], [`AlignmentBlock`], [`Hit`]: a single reported hit
//! - [`ScanResult`], [`MultiSequenceResult`], [`CmScanOutcome`]: the correlated result
//!
//! Nothing here is persisted. Job state always comes fresh from the search
//! service, so [`JobHandle`] is just the remote identifier.

pub mod hit;
pub mod job;
pub mod sequence;

pub use hit::{AlignmentBlock, CmScanOutcome, Hit, HitKey, HitRow, MultiSequenceResult, ScanResult};
pub use job::{ArtifactKind, JobHandle, JobStatus, UnknownStatus};
pub use sequence::{SequenceRecord, SubmissionQuery};

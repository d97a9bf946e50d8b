//! Centralized validation for submitted sequences and uploads.

use std::collections::BTreeSet;

/// Longest sequence the search service accepts
pub const MAX_SEQUENCE_LENGTH: usize = 7000;

/// IUPAC nucleotide symbols accepted in a sequence (uppercase)
pub const NUCLEOTIDE_ALPHABET: &[char] = &[
    'A', 'C', 'G', 'T', 'U', 'R', 'Y', 'S', 'W', 'M', 'K', 'B', 'D', 'H', 'N',
];

/// Alignment gap symbols, rejected with their own error
pub const GAP_CHARACTERS: &[char] = &['.', '-'];

/// Characters that may not appear in a FASTA header
pub const FORBIDDEN_HEADER_CHARACTERS: &[char] = &[';', '\\', '!', '*'];

/// Upper bound on an uploaded sequence file
pub const MAX_UPLOAD_SIZE: usize = 1024 * 1024; // 1MB

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Sequence length must be less than or equal to 7,000 nucleotides (got {length})")]
    TooLong { length: usize },
    #[error("Invalid characters in sequence: {}", format_chars(.offending))]
    InvalidChars { offending: BTreeSet<char> },
    #[error("Gap characters ('.' or '-') are not allowed in sequence")]
    GapChars,
    #[error("Invalid characters in header: {header}")]
    InvalidHeader { header: String },
    #[error("No sequences found in submission")]
    NoSequences,
    #[error("Uploaded file must be UTF-8 text no larger than 1MB")]
    InvalidUpload,
    /// Rejection reported by the search service itself, surfaced verbatim
    #[error("{message}")]
    RemoteRejected { message: String },
}

fn format_chars(chars: &BTreeSet<char>) -> String {
    chars
        .iter()
        .map(char::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check an uppercased residue string.
///
/// Length is checked first so a long, invalid sequence reports its length.
/// Gap characters are left out of the alphabet check and reported on their own.
///
/// # Errors
///
/// Returns `ValidationError::TooLong`, `ValidationError::InvalidChars` or
/// `ValidationError::GapChars`, in that order of precedence.
pub fn validate_residues(residues: &str) -> Result<(), ValidationError> {
    let length = residues.chars().count();
    if length > MAX_SEQUENCE_LENGTH {
        return Err(ValidationError::TooLong { length });
    }

    let offending: BTreeSet<char> = residues
        .chars()
        .filter(|c| !NUCLEOTIDE_ALPHABET.contains(c) && !GAP_CHARACTERS.contains(c))
        .collect();
    if !offending.is_empty() {
        return Err(ValidationError::InvalidChars { offending });
    }

    if residues.contains(GAP_CHARACTERS) {
        return Err(ValidationError::GapChars);
    }

    Ok(())
}

/// Check header text (without the leading `>`).
///
/// # Errors
///
/// Returns `ValidationError::InvalidHeader` if the header contains a
/// forbidden or control character.
pub fn validate_header(header: &str) -> Result<(), ValidationError> {
    if header
        .chars()
        .any(|c| FORBIDDEN_HEADER_CHARACTERS.contains(&c) || c.is_control())
    {
        return Err(ValidationError::InvalidHeader {
            header: header.to_string(),
        });
    }
    Ok(())
}

/// Validate an uploaded sequence file and return it as text
///
/// # Errors
///
/// Returns `ValidationError::InvalidUpload` if the content is too large or
/// not valid UTF-8.
pub fn validate_upload(content: &[u8]) -> Result<&str, ValidationError> {
    if content.len() > MAX_UPLOAD_SIZE {
        return Err(ValidationError::InvalidUpload);
    }
    std::str::from_utf8(content).map_err(|_| ValidationError::InvalidUpload)
}

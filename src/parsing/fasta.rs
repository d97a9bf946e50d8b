//! Validator and splitter for submitted FASTA text.
//!
//! Input is lenient about layout (headerless input, wrapped residue lines,
//! lowercase, CRLF) and strict about content: every record must pass
//! [`validate_residues`] and every header [`validate_header`].

use tracing::debug;

use crate::core::sequence::SequenceRecord;
use crate::utils::validation::{validate_header, validate_residues, ValidationError};

/// Split raw FASTA text into validated, uppercased records.
///
/// A `>` line starts a new record. Input with no header lines is one
/// headerless record. A header followed by no residues is dropped. Empty input
/// yields an empty list.
///
/// # Errors
///
/// Returns the `ValidationError` of the first invalid header or sequence,
/// in input order.
pub fn parse_sequences(raw: &str) -> Result<Vec<SequenceRecord>, ValidationError> {
    let mut records = Vec::new();
    let mut header: Option<String> = None;
    let mut residues = String::new();

    for line in raw.lines() {
        if let Some(text) = line.strip_prefix('>') {
            if !residues.is_empty() {
                records.push(finish_record(header.take(), &residues)?);
                residues.clear();
            }
            let text = text.trim();
            validate_header(text)?;
            header = Some(text.to_string());
        } else {
            residues.extend(line.chars().filter(|c| !c.is_whitespace()));
        }
    }

    if !residues.is_empty() {
        records.push(finish_record(header, &residues)?);
    }

    debug!("Parsed {} sequence(s) from submission", records.len());
    Ok(records)
}

fn finish_record(header: Option<String>, residues: &str) -> Result<SequenceRecord, ValidationError> {
    let residues = residues.to_uppercase();
    validate_residues(&residues)?;
    Ok(SequenceRecord::new(header, residues))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_record_with_header() {
        let records = parse_sequences(">seq1\nACGTU").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].header.as_deref(), Some("seq1"));
        assert_eq!(records[0].residues, "ACGTU");
    }

    #[test]
    fn test_no_fasta_header() {
        let records = parse_sequences("ACGT").unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].header.is_none());
        assert_eq!(records[0].residues, "ACGT");
    }

    #[test]
    fn test_multiple_records_keep_order() {
        let records = parse_sequences(">h1\nACGT\n>h2\nTGCA").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].header.as_deref(), Some("h1"));
        assert_eq!(records[0].residues, "ACGT");
        assert_eq!(records[1].header.as_deref(), Some("h2"));
        assert_eq!(records[1].residues, "TGCA");
    }

    #[test]
    fn test_wrapped_lines_and_case() {
        let records = parse_sequences(">Header\r\nAcGt\r\nacgu\r\n\r\n").unwrap();
        assert_eq!(records[0].residues, "ACGTACGU");
        assert_eq!(
            parse_sequences("acgturyswmkbdhn").unwrap()[0].residues,
            "ACGTURYSWMKBDHN"
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_sequences("").unwrap().is_empty());
        assert!(parse_sequences("\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_header_without_residues_is_dropped() {
        let records = parse_sequences(">empty\n>full\nACGU\n>trailing\n").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].header.as_deref(), Some("full"));
    }

    #[test]
    fn test_too_long_reported_before_invalid_chars() {
        let raw = format!(">long\n{}", "Z".repeat(7001));
        assert_eq!(
            parse_sequences(&raw),
            Err(ValidationError::TooLong { length: 7001 })
        );
        assert!(matches!(
            parse_sequences(&"A".repeat(7001)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_invalid_and_gap_characters() {
        assert!(matches!(
            parse_sequences("ACGTUXYZ"),
            Err(ValidationError::InvalidChars { .. })
        ));
        assert_eq!(parse_sequences("ACGT.U"), Err(ValidationError::GapChars));
    }

    #[test]
    fn test_first_invalid_record_wins() {
        let raw = ">ok\nACGU\n>gapped\nAC-GU\n>bad\nACXGU";
        assert_eq!(parse_sequences(raw), Err(ValidationError::GapChars));
    }

    #[test]
    fn test_invalid_header() {
        assert!(matches!(
            parse_sequences(">bad;header\nACGU"),
            Err(ValidationError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_reparse_of_serialized_records_is_stable() {
        let raw = ">h1 first\nacgu\nacgu\n>h2\nRYKM\nN";
        let parsed = parse_sequences(raw).unwrap();
        let serialized = parsed
            .iter()
            .map(SequenceRecord::to_fasta)
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(parse_sequences(&serialized).unwrap(), parsed);
    }
}

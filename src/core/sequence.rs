use serde::{Deserialize, Serialize};

/// A validated nucleotide sequence ready for submission.
///
/// Built only by [`crate::parsing::fasta::parse_sequences`], so `residues` is
/// always uppercase, at most [`crate::utils::validation::MAX_SEQUENCE_LENGTH`]
/// long and drawn from the IUPAC nucleotide alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord {
    /// Header text without the leading `>`
    pub header: Option<String>,
    pub residues: String,
}

impl SequenceRecord {
    pub(crate) fn new(header: Option<String>, residues: String) -> Self {
        Self { header, residues }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.residues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Render as FASTA text: `>header\nRESIDUES`, or the bare residues when
    /// the record has no header.
    #[must_use]
    pub fn to_fasta(&self) -> String {
        match &self.header {
            Some(header) => format!(">{header}\n{}", self.residues),
            None => self.residues.clone(),
        }
    }
}

/// One submission to the search service.
#[derive(Debug, Clone)]
pub struct SubmissionQuery {
    pub sequences: Vec<SequenceRecord>,
    pub email: String,
    pub title: Option<String>,
}

impl SubmissionQuery {
    pub fn new(sequences: Vec<SequenceRecord>, email: impl Into<String>) -> Self {
        Self {
            sequences,
            email: email.into(),
            title: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title.filter(|t| !t.trim().is_empty());
        self
    }

    /// All records as one FASTA document, newline separated.
    #[must_use]
    pub fn sequence_payload(&self) -> String {
        self.sequences
            .iter()
            .map(SequenceRecord::to_fasta)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Form fields for the `run` endpoint.
    #[must_use]
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("email", self.email.clone()),
            ("threshold_model", "cut_ga".to_string()),
            ("sequence", self.sequence_payload()),
        ];
        if let Some(title) = &self.title {
            fields.push(("title", title.clone()));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_fasta() {
        let with_header = SequenceRecord::new(Some("seq1".to_string()), "ACGU".to_string());
        assert_eq!(with_header.to_fasta(), ">seq1\nACGU");

        let bare = SequenceRecord::new(None, "ACGU".to_string());
        assert_eq!(bare.to_fasta(), "ACGU");
    }

    #[test]
    fn test_form_fields() {
        let query = SubmissionQuery::new(
            vec![
                SequenceRecord::new(Some("h1".to_string()), "ACGT".to_string()),
                SequenceRecord::new(Some("h2".to_string()), "TGCA".to_string()),
            ],
            "someone@example.org",
        )
        .with_title(Some("batch-1".to_string()));

        let fields = query.form_fields();
        assert_eq!(fields[0], ("email", "someone@example.org".to_string()));
        assert_eq!(fields[1], ("threshold_model", "cut_ga".to_string()));
        assert_eq!(fields[2], ("sequence", ">h1\nACGT\n>h2\nTGCA".to_string()));
        assert_eq!(fields[3], ("title", "batch-1".to_string()));
    }

    #[test]
    fn test_blank_title_is_dropped() {
        let query = SubmissionQuery::new(vec![], "a@b.c").with_title(Some("  ".to_string()));
        assert!(query.title.is_none());
        assert_eq!(query.form_fields().len(), 3);
    }
}

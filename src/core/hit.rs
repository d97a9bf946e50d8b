use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::parsing::ParseError;

/// One row of the tabular (`tblout`) report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitRow {
    /// Model name, e.g. `5S_rRNA`
    #[serde(rename = "id")]
    pub model_id: String,
    /// Model accession, e.g. `RF00001`
    #[serde(rename = "acc")]
    pub accession: String,
    /// Name of the query sequence the hit was found in
    pub query: String,
    pub start: u64,
    pub end: u64,
    pub strand: String,
    #[serde(rename = "GC")]
    pub gc_content: f64,
    pub score: f64,
    #[serde(rename = "E")]
    pub e_value: f64,
}

impl HitRow {
    #[must_use]
    pub fn key(&self) -> HitKey {
        HitKey {
            start: self.start,
            end: self.end,
            score: self.score,
            e_value: self.e_value,
        }
    }
}

/// Composite key joining a tabular row to a narrative alignment block.
///
/// Floats are compared exactly as parsed; both reports print the same text
/// for the same hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitKey {
    pub start: u64,
    pub end: u64,
    pub score: f64,
    pub e_value: f64,
}

/// The six labelled alignment lines for one hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentBlock {
    /// Non-canonical base pair annotation (`#NC`)
    pub nc: String,
    /// Consensus secondary structure (`#SS`)
    pub ss: String,
    /// Model consensus sequence (`#CM`)
    pub hit_seq: String,
    /// Match line (`#MATCH`)
    #[serde(rename = "match")]
    pub match_line: String,
    /// Aligned query sequence (`#SEQ`)
    pub user_seq: String,
    /// Posterior probabilities (`#PP`)
    pub pp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    #[serde(flatten)]
    pub row: HitRow,
    pub alignment: Option<AlignmentBlock>,
}

/// Structured result of a single-sequence job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub search_sequence: String,
    pub num_hits: u64,
    pub job_id: String,
    pub opened: String,
    pub started: String,
    pub closed: String,
    /// Hits grouped by model id, each group in report order
    pub hits: BTreeMap<String, Vec<Hit>>,
    /// Rows, blocks and dates that could not be read
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ParseError>,
}

impl ScanResult {
    /// Total number of hits across all models
    #[must_use]
    pub fn hit_count(&self) -> usize {
        self.hits.values().map(Vec::len).sum()
    }
}

/// Flat hit listing for a job that scanned several query sequences.
///
/// Alignments are never attached: the narrative report cannot be attributed
/// to a particular query when several were scanned together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiSequenceResult {
    pub opened: String,
    pub hits: Vec<HitRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ParseError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CmScanOutcome {
    Single(ScanResult),
    Multiple(MultiSequenceResult),
}

impl CmScanOutcome {
    #[must_use]
    pub fn opened(&self) -> &str {
        match self {
            Self::Single(result) => &result.opened,
            Self::Multiple(result) => &result.opened,
        }
    }

    /// Problems met while parsing the artifacts; empty for a clean result
    #[must_use]
    pub fn warnings(&self) -> &[ParseError] {
        match self {
            Self::Single(result) => &result.warnings,
            Self::Multiple(result) => &result.warnings,
        }
    }

    /// Iterate over every reported row regardless of mode
    pub fn rows(&self) -> Box<dyn Iterator<Item = &HitRow> + '_> {
        match self {
            Self::Single(result) => Box::new(result.hits.values().flatten().map(|h| &h.row)),
            Self::Multiple(result) => Box::new(result.hits.iter()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> HitRow {
        HitRow {
            model_id: "5S_rRNA".to_string(),
            accession: "RF00001".to_string(),
            query: "seq1".to_string(),
            start: 1,
            end: 119,
            strand: "+".to_string(),
            gc_content: 0.49,
            score: 104.9,
            e_value: 4.5e-24,
        }
    }

    #[test]
    fn test_hit_serializes_with_service_field_names() {
        let hit = Hit {
            row: row(),
            alignment: None,
        };
        let value = serde_json::to_value(&hit).unwrap();
        assert_eq!(value["id"], "5S_rRNA");
        assert_eq!(value["acc"], "RF00001");
        assert_eq!(value["GC"], 0.49);
        assert_eq!(value["E"], 4.5e-24);
        assert!(value["alignment"].is_null());
    }

    #[test]
    fn test_scan_result_json_is_stable() {
        let mut hits = BTreeMap::new();
        hits.insert(
            "5S_rRNA".to_string(),
            vec![Hit {
                row: row(),
                alignment: None,
            }],
        );
        let result = ScanResult {
            search_sequence: "ACGU".to_string(),
            num_hits: 1,
            job_id: "job-1".to_string(),
            opened: "2024-04-03 10:28:27".to_string(),
            started: "2024-04-03 10:28:27".to_string(),
            closed: String::new(),
            hits,
            warnings: Vec::new(),
        };

        let json = serde_json::to_string(&CmScanOutcome::Single(result.clone())).unwrap();
        assert!(json.contains("\"searchSequence\":\"ACGU\""));
        assert!(json.contains("\"numHits\":1"));
        assert!(!json.contains("warnings"));

        let back: CmScanOutcome = serde_json::from_str(&json).unwrap();
        let CmScanOutcome::Single(back) = back else {
            panic!("expected single-sequence result");
        };
        assert_eq!(back.job_id, result.job_id);
        assert_eq!(back.hits["5S_rRNA"].len(), 1);
        assert_eq!(back.hits["5S_rRNA"][0].row.model_id, "5S_rRNA");
    }

    #[test]
    fn test_warnings_serialized_with_kind_tag() {
        let outcome = CmScanOutcome::Multiple(MultiSequenceResult {
            opened: String::new(),
            hits: Vec::new(),
            warnings: vec![ParseError::MalformedRow {
                line: 1,
                reason: "expected at least 16 fields, found 2".to_string(),
            }],
        });
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["warnings"][0]["kind"], "malformed_row");
        assert_eq!(value["warnings"][0]["line"], 1);
        assert_eq!(outcome.warnings().len(), 1);
    }

    #[test]
    fn test_key_uses_coordinates_and_scores() {
        let a = row();
        let mut b = row();
        assert_eq!(a.key(), b.key());
        b.score = 104.8;
        assert_ne!(a.key(), b.key());
    }
}

//! Parser for the narrative report (`out`).
//!
//! Each hit in the report starts with a `>>` line followed by a fixed
//! sequence of lines:
//!
//! ```text
//! >> 5S_rRNA  5S ribosomal RNA                  <- block marker
//!  rank     E-value  score  bias mdl ...        <- column header
//!  ----   --------- ------ ----- --- ...        <- rule
//!   (1) !   4.5e-24  104.9   0.0  cm  1  119 []  1  119 + [] 0.99 no 0.49   <- summary
//!                                               <- blank
//!                      ...                   NC
//!                      (((((,,,<<-<<...))))): CS
//!           5S_rRNA  1 gccuGcggcCAUAcc...    119
//!                      :: U:C:GCCAUACC ...
//!        EMBOSS_001  1 AGUUACGGCCAUACC...    119
//!                      *****************...  PP
//! ```
//!
//! Scanning stops at the pipeline statistics summary.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::core::hit::{AlignmentBlock, HitKey};
use crate::parsing::ParseError;

const BLOCK_MARKER: &str = ">>";
const PIPELINE_SENTINEL: &str = "Internal CM pipeline statistics summary:";

/// Lines between the block marker and the summary line
const SUMMARY_OFFSET: usize = 3;
const ALIGNMENT_LINES: usize = 6;

/// Word offsets in the summary line
const SUMMARY_E_VALUE: usize = 2;
const SUMMARY_SCORE: usize = 3;
const SUMMARY_SEQ_FROM: usize = 9;
const SUMMARY_SEQ_TO: usize = 10;

/// Width of the name column replaced by a record tag
const TAG_COLUMNS: usize = 3;

/// One parsed `>>` block
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeBlock {
    pub model_id: String,
    pub key: HitKey,
    pub alignment: AlignmentBlock,
}

#[derive(Debug, Clone, Default)]
pub struct NarrativeReport {
    pub blocks: Vec<NarrativeBlock>,
    /// Blocks that were skipped
    pub errors: Vec<ParseError>,
}

/// Parse every hit block up to the pipeline statistics summary.
#[must_use]
pub fn parse_narrative_report(text: &str) -> NarrativeReport {
    let lines: Vec<&str> = text.lines().collect();
    let mut report = NarrativeReport::default();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if line.starts_with(PIPELINE_SENTINEL) {
            break;
        }
        if line.starts_with(BLOCK_MARKER) {
            match parse_block(&lines, i) {
                Ok((block, next)) => {
                    debug!(
                        "Parsed alignment block for {} ({}..{})",
                        block.model_id, block.key.start, block.key.end
                    );
                    report.blocks.push(block);
                    i = next;
                    continue;
                }
                Err(e) => {
                    warn!("Skipping alignment block: {e}");
                    report.errors.push(e);
                }
            }
        }
        i += 1;
    }

    report
}

/// Parse the block whose marker is at `marker`; returns the block and the
/// index of the first line after it.
fn parse_block(lines: &[&str], marker: usize) -> Result<(NarrativeBlock, usize), ParseError> {
    let malformed = |offset: usize, reason: String| ParseError::MalformedBlock {
        line: marker + offset + 1,
        reason,
    };

    let model_id = lines[marker]
        .trim_start_matches(BLOCK_MARKER)
        .split_whitespace()
        .next()
        .ok_or_else(|| malformed(0, "missing model name".to_string()))?
        .to_string();

    let summary = lines
        .get(marker + SUMMARY_OFFSET)
        .ok_or_else(|| malformed(SUMMARY_OFFSET, "missing summary line".to_string()))?;
    let key = parse_summary(summary).map_err(|reason| malformed(SUMMARY_OFFSET, reason))?;

    let mut first = marker + SUMMARY_OFFSET + 1;
    while lines.get(first).is_some_and(|l| l.trim().is_empty()) {
        first += 1;
    }
    let end = first + ALIGNMENT_LINES;
    let Some(block) = lines.get(first..end) else {
        return Err(malformed(
            first - marker,
            "alignment block ends early".to_string(),
        ));
    };
    if block.iter().any(|l| l.starts_with(BLOCK_MARKER) || l.starts_with(PIPELINE_SENTINEL)) {
        return Err(malformed(first - marker, "alignment block is incomplete".to_string()));
    }

    let alignment = label_alignment(block).map_err(|reason| malformed(first - marker, reason))?;

    Ok((
        NarrativeBlock {
            model_id,
            key,
            alignment,
        },
        end,
    ))
}

fn parse_summary(line: &str) -> Result<HitKey, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let word = |index: usize| {
        words
            .get(index)
            .copied()
            .ok_or_else(|| format!("summary line has only {} words", words.len()))
    };

    let start = word(SUMMARY_SEQ_FROM)?;
    let end = word(SUMMARY_SEQ_TO)?;
    let score = word(SUMMARY_SCORE)?;
    let e_value = word(SUMMARY_E_VALUE)?;

    Ok(HitKey {
        start: start.parse().map_err(|_| format!("invalid start '{start}'"))?,
        end: end.parse().map_err(|_| format!("invalid end '{end}'"))?,
        score: score.parse().map_err(|_| format!("invalid score '{score}'"))?,
        e_value: e_value
            .parse()
            .map_err(|_| format!("invalid E-value '{e_value}'"))?,
    })
}

/// Tag the six alignment lines (NC, CS, CM, MATCH, SEQ, PP).
fn label_alignment(block: &[&str]) -> Result<AlignmentBlock, String> {
    Ok(AlignmentBlock {
        nc: tag_annotation(block[0], "#NC", "NC")?,
        ss: tag_annotation(block[1], "#SS", "CS")?,
        hit_seq: tag_sequence(block[2], "#CM"),
        match_line: format!("#MATCH{}", after_tag_columns(block[3])),
        user_seq: tag_sequence(block[4], "#SEQ"),
        pp: tag_annotation(block[5], "#PP", "PP")?,
    })
}

/// Annotation lines end in their own tag; it is dropped and the name
/// columns are replaced by `label`.
fn tag_annotation(line: &str, label: &str, suffix: &str) -> Result<String, String> {
    let body = after_tag_columns(line)
        .trim_end()
        .strip_suffix(suffix)
        .ok_or_else(|| format!("expected '{suffix}' annotation line, found '{}'", line.trim()))?;
    Ok(format!("{label}{body}"))
}

/// Sequence lines start with a name; it is replaced by `label` and the
/// remaining words are joined by single spaces.
fn tag_sequence(line: &str, label: &str) -> String {
    let rest: Vec<&str> = line.split_whitespace().skip(1).collect();
    format!("{label} {}", rest.join(" "))
}

fn after_tag_columns(line: &str) -> &str {
    line.get(TAG_COLUMNS..).unwrap_or("")
}

/// Number of hits the report claims, 0 when the marker is absent.
#[must_use]
pub fn extract_num_hits(text: &str) -> u64 {
    static TOTAL_HITS: OnceLock<Regex> = OnceLock::new();
    let re = TOTAL_HITS.get_or_init(|| {
        Regex::new(r"Total CM hits reported:\s*(\d+)").expect("static regex is valid")
    });
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// The searched sequence from the `sequence` artifact, without its header
/// line and with line breaks removed.
#[must_use]
pub fn extract_search_sequence(sequence: &str) -> String {
    let mut lines = sequence.lines().peekable();
    if lines.peek().is_some_and(|first| first.starts_with('>')) {
        lines.next();
    }
    lines.map(str::trim).collect()
}

//! Merge the tabular and narrative reports into one structured result.
//!
//! The join key is `(start, end, score, E-value)`, compared exactly as
//! parsed. A row gets an alignment only when exactly one narrative block
//! carries its key; otherwise the row is kept without one.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::core::hit::{CmScanOutcome, Hit, HitRow, MultiSequenceResult, ScanResult};
use crate::parsing::narrative::{
    extract_num_hits, extract_search_sequence, parse_narrative_report, NarrativeBlock,
};
use crate::parsing::tblout::{parse_tabular_report, TIMESTAMP_FORMAT};

/// Correlate the three artifacts of a finished job, stamping `closed` with
/// the current time.
#[must_use]
pub fn correlate(out: &str, sequence: &str, tblout: &str, job_id: &str) -> CmScanOutcome {
    correlate_at(out, sequence, tblout, job_id, Utc::now())
}

/// Same as [`correlate`] with an explicit completion time.
#[must_use]
pub fn correlate_at(
    out: &str,
    sequence: &str,
    tblout: &str,
    job_id: &str,
    now: DateTime<Utc>,
) -> CmScanOutcome {
    let tabular = parse_tabular_report(tblout);
    let opened = tabular.opened.clone().unwrap_or_default();

    let query_count = sequence.matches('>').count();
    if query_count > 1 {
        info!(
            "Job {job_id} scanned {query_count} sequences; returning {} hit(s) without alignments",
            tabular.rows.len()
        );
        return CmScanOutcome::Multiple(MultiSequenceResult {
            opened,
            hits: tabular.rows,
            warnings: tabular.errors,
        });
    }

    let narrative = parse_narrative_report(out);
    let closed = if tabular.opened.is_some() {
        now.format(TIMESTAMP_FORMAT).to_string()
    } else {
        String::new()
    };

    let hits = group_by_model(attach_alignments(tabular.rows, &narrative.blocks));
    debug!(
        "Job {job_id}: {} model(s), {} block(s) parsed, {} block(s) skipped",
        hits.len(),
        narrative.blocks.len(),
        narrative.errors.len()
    );

    let mut warnings = tabular.errors;
    warnings.extend(narrative.errors);
    if !warnings.is_empty() {
        warn!("Job {job_id}: {} problem(s) while reading results", warnings.len());
    }

    CmScanOutcome::Single(ScanResult {
        search_sequence: extract_search_sequence(sequence),
        num_hits: extract_num_hits(out),
        job_id: job_id.to_string(),
        started: opened.clone(),
        opened,
        closed,
        hits,
        warnings,
    })
}

/// Pair each row with the single block sharing its key, if there is one.
#[must_use]
pub fn attach_alignments(rows: Vec<HitRow>, blocks: &[NarrativeBlock]) -> Vec<Hit> {
    rows.into_iter()
        .map(|row| {
            let key = row.key();
            let mut matching = blocks.iter().filter(|b| b.key == key);
            let alignment = match (matching.next(), matching.next()) {
                (Some(block), None) => Some(block.alignment.clone()),
                (Some(_), Some(_)) => {
                    warn!(
                        "Several alignment blocks match {} {}..{}; leaving it unaligned",
                        row.model_id, row.start, row.end
                    );
                    None
                }
                (None, _) => None,
            };
            Hit { row, alignment }
        })
        .collect()
}

fn group_by_model(hits: Vec<Hit>) -> BTreeMap<String, Vec<Hit>> {
    let mut grouped: BTreeMap<String, Vec<Hit>> = BTreeMap::new();
    for hit in hits {
        grouped.entry(hit.row.model_id.clone()).or_default().push(hit);
    }
    grouped
}

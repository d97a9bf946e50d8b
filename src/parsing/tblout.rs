//! Parser for the fixed-column tabular report (`tblout`).
//!
//! Two column layouts are recognised:
//!
//! | Layout | Produced by | First columns |
//! |--------|-------------|---------------|
//! | [`TabularLayout::Standard`] | `cmscan --tblout` (`--fmt 1`) | target name, accession, query name, ... |
//! | [`TabularLayout::Extended`] | `cmscan --tblout --fmt 2` | idx, target name, accession, query name, accession, clan, ... |
//!
//! Comment lines (`#`) are skipped except `# Date:`, which gives the job's
//! open timestamp.

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::core::hit::HitRow;
use crate::parsing::ParseError;

/// Canonical timestamp format for result documents
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATE_PREFIX: &str = "# Date:";

/// `ctime` style date as written by Infernal, after whitespace is collapsed
const REPORT_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TabularLayout {
    #[default]
    Standard,
    Extended,
}

/// Field offsets after whitespace splitting
#[derive(Debug, Clone, Copy)]
struct Columns {
    model_id: usize,
    accession: usize,
    query: usize,
    start: usize,
    end: usize,
    strand: usize,
    gc: usize,
    score: usize,
    e_value: usize,
}

impl Columns {
    fn min_fields(self) -> usize {
        self.e_value + 1
    }
}

impl TabularLayout {
    fn columns(self) -> Columns {
        match self {
            Self::Standard => Columns {
                model_id: 0,
                accession: 1,
                query: 2,
                start: 7,
                end: 8,
                strand: 9,
                gc: 12,
                score: 14,
                e_value: 15,
            },
            Self::Extended => Columns {
                model_id: 1,
                accession: 2,
                query: 3,
                start: 9,
                end: 10,
                strand: 11,
                gc: 14,
                score: 16,
                e_value: 17,
            },
        }
    }

    /// Pick the layout from the column-header comment.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        let extended = text
            .lines()
            .take_while(|line| line.starts_with('#') || line.trim().is_empty())
            .any(|line| line.starts_with("#idx"));
        if extended {
            Self::Extended
        } else {
            Self::Standard
        }
    }
}

/// Everything extracted from a tabular report
#[derive(Debug, Clone, Default)]
pub struct TabularReport {
    pub layout: TabularLayout,
    /// Canonical open timestamp, if the `# Date:` line was found and readable
    pub opened: Option<String>,
    pub rows: Vec<HitRow>,
    /// Rows and dates that were skipped
    pub errors: Vec<ParseError>,
}

/// Parse a tabular report.
///
/// Never fails as a whole: unreadable rows are recorded in
/// [`TabularReport::errors`] and left out of [`TabularReport::rows`].
#[must_use]
pub fn parse_tabular_report(text: &str) -> TabularReport {
    let layout = TabularLayout::detect(text);
    let mut report = TabularReport {
        layout,
        ..TabularReport::default()
    };

    for (i, line) in text.lines().enumerate() {
        let line_num = i + 1;

        if let Some(raw_date) = line.strip_prefix(DATE_PREFIX) {
            match parse_report_date(raw_date) {
                Ok(opened) => report.opened = Some(opened),
                Err(e) => {
                    warn!("{e}");
                    report.errors.push(e);
                }
            }
            continue;
        }

        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        match parse_row(line, line_num, layout) {
            Ok(row) => report.rows.push(row),
            Err(e) => {
                warn!("Skipping tabular row: {e}");
                report.errors.push(e);
            }
        }
    }

    debug!(
        "Parsed {} tabular row(s) ({:?} layout, {} skipped)",
        report.rows.len(),
        layout,
        report.errors.len()
    );
    report
}

/// Parse a single data row.
///
/// # Errors
///
/// Returns `ParseError::MalformedRow` if the row has too few fields or a
/// numeric field does not parse.
pub fn parse_row(line: &str, line_num: usize, layout: TabularLayout) -> Result<HitRow, ParseError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let cols = layout.columns();

    if fields.len() < cols.min_fields() {
        return Err(ParseError::MalformedRow {
            line: line_num,
            reason: format!(
                "expected at least {} fields, found {}",
                cols.min_fields(),
                fields.len()
            ),
        });
    }

    let malformed = |name: &str, value: &str| ParseError::MalformedRow {
        line: line_num,
        reason: format!("invalid {name} '{value}'"),
    };

    Ok(HitRow {
        model_id: fields[cols.model_id].to_string(),
        accession: fields[cols.accession].to_string(),
        query: fields[cols.query].to_string(),
        start: fields[cols.start]
            .parse()
            .map_err(|_| malformed("start", fields[cols.start]))?,
        end: fields[cols.end]
            .parse()
            .map_err(|_| malformed("end", fields[cols.end]))?,
        strand: fields[cols.strand].to_string(),
        gc_content: fields[cols.gc]
            .parse()
            .map_err(|_| malformed("GC content", fields[cols.gc]))?,
        score: fields[cols.score]
            .parse()
            .map_err(|_| malformed("score", fields[cols.score]))?,
        e_value: fields[cols.e_value]
            .parse()
            .map_err(|_| malformed("E-value", fields[cols.e_value]))?,
    })
}

/// Convert an Infernal report date (`Wed Apr  3 10:28:27 2024`) to
/// [`TIMESTAMP_FORMAT`].
///
/// # Errors
///
/// Returns `ParseError::InvalidDate` if the text is not a `ctime` style date.
pub fn parse_report_date(raw: &str) -> Result<String, ParseError> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&collapsed, REPORT_DATE_FORMAT)
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .map_err(|_| ParseError::InvalidDate {
            raw: raw.trim().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TBLOUT: &str = include_str!("../../tests/data/tblout");

    #[test]
    fn test_parse_fixture() {
        let report = parse_tabular_report(TBLOUT);
        assert_eq!(report.layout, TabularLayout::Standard);
        assert_eq!(report.opened.as_deref(), Some("2024-04-03 10:28:27"));
        assert!(report.errors.is_empty());
        assert_eq!(report.rows.len(), 1);

        let row = &report.rows[0];
        assert_eq!(row.model_id, "5S_rRNA");
        assert_eq!(row.accession, "RF00001");
        assert_eq!(row.query, "EMBOSS_001");
        assert_eq!(row.start, 1);
        assert_eq!(row.end, 119);
        assert_eq!(row.strand, "+");
        assert_eq!(row.gc_content, 0.49);
        assert_eq!(row.score, 104.9);
        assert_eq!(row.e_value, 4.5e-24);
    }

    #[test]
    fn test_extended_layout() {
        let text = "\
#idx target name          accession query name           accession clan name mdl mdl from   mdl to seq from   seq to strand trunc pass   gc  bias  score   E-value inc olp anyidx afrct1 afrct2 winidx wfrct1 wfrct2 description of target
#--- -------------------- --------- -------------------- --------- --------- --- -------- -------- -------- -------- ------ ----- ---- ---- ----- ------ --------- --- --- ------ ------ ------ ------ ------ ------ ---------------------
1    tRNA                 RF00005   chrM_frag            -         CL00001    cm        1       71      204      133      -    no    1 0.45   0.0   52.3   2.1e-11 !   *       -      -      -      -      -      - tRNA
";
        let report = parse_tabular_report(text);
        assert_eq!(report.layout, TabularLayout::Extended);
        assert_eq!(report.rows.len(), 1);
        let row = &report.rows[0];
        assert_eq!(row.model_id, "tRNA");
        assert_eq!(row.accession, "RF00005");
        assert_eq!(row.query, "chrM_frag");
        assert_eq!((row.start, row.end), (204, 133));
        assert_eq!(row.strand, "-");
        assert_eq!(row.score, 52.3);
        assert_eq!(row.e_value, 2.1e-11);
        assert!(report.opened.is_none());
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let text = "\
5S_rRNA RF00001 q1 - cm 1 119 1 119 + no 1 0.49 0.0 104.9 4.5e-24 ! 5S
truncated row
5S_rRNA RF00001 q1 - cm 1 119 one 119 + no 1 0.49 0.0 104.9 4.5e-24 ! 5S
";
        let report = parse_tabular_report(text);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.errors.len(), 2);
        assert!(matches!(
            report.errors[0],
            ParseError::MalformedRow { line: 2, .. }
        ));
        assert_eq!(
            report.errors[1].to_string(),
            "Malformed tabular row on line 3: invalid start 'one'"
        );
    }

    #[test]
    fn test_report_date() {
        assert_eq!(
            parse_report_date("            Wed Apr  3 10:28:27 2024").unwrap(),
            "2024-04-03 10:28:27"
        );
        assert_eq!(
            parse_report_date("Thu May 30 11:14:02 2024").unwrap(),
            "2024-05-30 11:14:02"
        );
        assert!(parse_report_date("yesterday").is_err());
    }

    #[test]
    fn test_unreadable_date_leaves_opened_empty() {
        let report = parse_tabular_report("# Date:   sometime\n");
        assert!(report.opened.is_none());
        assert_eq!(
            report.errors,
            vec![ParseError::InvalidDate {
                raw: "sometime".to_string()
            }]
        );
    }
}

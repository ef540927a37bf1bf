//! Delimited-file loading with defensive fallbacks.
//!
//! Parsing is attempted three ways before giving up: plain comma-separated,
//! then with a sniffed delimiter, then with the sniffed delimiter while
//! dropping any line with more fields than the header or that cannot be
//! decoded. Lines with fewer fields are kept and padded with nulls.

use std::path::Path;

use csv::ReaderBuilder;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::table::{Cell, Table};

const SNIFF_CANDIDATES: &[u8] = b",;\t|";
const SNIFF_LINES: usize = 20;

/// How many non-data lines surround the real table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub skip_header: usize,
    pub skip_footer: usize,
}

impl LoadOptions {
    /// Feeder setup exports carry two metadata lines above and below the data.
    pub const SETUP: LoadOptions = LoadOptions {
        skip_header: 2,
        skip_footer: 2,
    };

    pub const HISTORICAL: LoadOptions = LoadOptions {
        skip_header: 0,
        skip_footer: 0,
    };
}

/// Names of the identifying columns as spelled in a setup file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupColumns {
    pub module: String,
    pub location: String,
    pub part_number: String,
}

impl SetupColumns {
    pub const MODULE: &'static str = "ModuleNumber";
    pub const LOCATION: &'static str = "Location";
    pub const PART_NUMBER: &'static str = "PartNumber";

    /// Locates the identifying columns case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingColumns`] listing every column not found.
    pub fn resolve(table: &Table) -> Result<Self> {
        let module = table.find_column_ci(Self::MODULE);
        let location = table.find_column_ci(Self::LOCATION);
        let part_number = table.find_column_ci(Self::PART_NUMBER);

        match (module, location, part_number) {
            (Some(m), Some(l), Some(p)) => Ok(Self {
                module: m.to_string(),
                location: l.to_string(),
                part_number: p.to_string(),
            }),
            _ => {
                let missing = [
                    (module, Self::MODULE),
                    (location, Self::LOCATION),
                    (part_number, Self::PART_NUMBER),
                ]
                .iter()
                .filter(|(found, _)| found.is_none())
                .map(|(_, name)| name.to_string())
                .collect();
                Err(PipelineError::MissingColumns { missing })
            }
        }
    }
}

/// Loads a feeder setup file and resolves its identifying columns.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_setup(path: &Path) -> Result<(Table, SetupColumns)> {
    let table = load_table(path, LoadOptions::SETUP)?;
    let columns = SetupColumns::resolve(&table)?;
    info!(
        module = %columns.module,
        location = %columns.location,
        part_number = %columns.part_number,
        "Setup columns resolved"
    );
    Ok((table, columns))
}

/// Loads the historical part-usage reference table.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_historical(path: &Path) -> Result<Table> {
    load_table(path, LoadOptions::HISTORICAL)
}

/// Reads `path` into a [`Table`], trying each delimiter strategy in turn.
///
/// # Errors
///
/// [`PipelineError::Io`] if the file cannot be read, [`PipelineError::Parse`]
/// if no strategy produces a table.
pub fn load_table(path: &Path, options: LoadOptions) -> Result<Table> {
    let bytes = std::fs::read(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = String::from_utf8_lossy(&bytes);
    let text = trim_lines(&raw, options);

    match parse_text(&text) {
        Ok((table, strategy)) => {
            info!(
                rows = table.len(),
                columns = table.width(),
                strategy,
                "Table loaded"
            );
            debug!(columns = ?table.columns(), "Table columns");
            Ok(table)
        }
        Err(attempts) => Err(PipelineError::Parse {
            path: path.to_path_buf(),
            attempts,
        }),
    }
}

/// Runs the strategy chain over already-trimmed text. On success returns the
/// table and the name of the strategy that produced it; on failure, one
/// reason per strategy.
pub fn parse_text(text: &str) -> std::result::Result<(Table, &'static str), Vec<String>> {
    let mut attempts = Vec::new();
    let sniffed = sniff_delimiter(text);

    match parse_delimited(text, b',', false) {
        Ok(table) if table.width() == 1 && sniffed.is_some_and(|d| d != b',') => {
            attempts.push("comma: produced a single column".to_string());
        }
        Ok(table) => return Ok((table, "comma")),
        Err(e) => attempts.push(format!("comma: {e}")),
    }
    warn!(reason = %attempts[0], "Comma parse failed, sniffing delimiter");

    let Some(delimiter) = sniffed else {
        attempts.push("sniffed: no delimiter detected".to_string());
        attempts.push("lenient: no delimiter detected".to_string());
        return Err(attempts);
    };
    debug!(delimiter = %(delimiter as char).escape_default(), "Delimiter sniffed");

    match parse_delimited(text, delimiter, false) {
        Ok(table) => return Ok((table, "sniffed")),
        Err(e) => attempts.push(format!("sniffed: {e}")),
    }
    warn!(reason = %attempts[1], "Sniffed parse failed, skipping bad lines");

    match parse_delimited(text, delimiter, true) {
        Ok(table) => Ok((table, "lenient")),
        Err(e) => {
            attempts.push(format!("lenient: {e}"));
            Err(attempts)
        }
    }
}

/// Drops the leading and trailing metadata lines. Blank lines at the very end
/// of the file do not count towards the footer.
fn trim_lines(raw: &str, options: LoadOptions) -> String {
    let raw = raw.trim_start_matches('\u{feff}');
    let mut lines: Vec<&str> = raw.lines().collect();
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let end = lines.len().saturating_sub(options.skip_footer);
    let start = options.skip_header.min(end);
    lines[start..end].join("\n")
}

fn parse_delimited(text: &str, delimiter: u8, lenient: bool) -> std::result::Result<Table, String> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err("no header row".to_string());
    }

    let width = headers.len();
    let mut table = Table::new(headers);
    let mut skipped = 0usize;
    let mut padded = 0usize;

    for (idx, record) in reader.records().enumerate() {
        match record {
            Ok(record) if record.len() > width => {
                if !lenient {
                    return Err(format!(
                        "record {} has {} fields, header has {width}",
                        idx + 1,
                        record.len()
                    ));
                }
                skipped += 1;
                debug!(record = idx + 1, fields = record.len(), expected = width, "Skipping malformed line");
            }
            Ok(record) => {
                if record.len() < width {
                    padded += 1;
                }
                // push_row fills the missing trailing cells with nulls
                table.push_row(record.iter().map(Cell::parse).collect());
            }
            Err(e) if lenient => {
                skipped += 1;
                debug!(record = idx + 1, error = %e, "Skipping unparseable line");
            }
            Err(e) => return Err(e.to_string()),
        }
    }

    if skipped > 0 {
        warn!(skipped, "Malformed lines skipped");
    }
    if padded > 0 {
        debug!(padded, "Short lines padded with nulls");
    }
    Ok(table)
}

/// Picks the candidate delimiter that occurs the same non-zero number of
/// times on the most sample lines. Occurrences inside double quotes are ignored.
pub fn sniff_delimiter(text: &str) -> Option<u8> {
    let sample: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    let mut best: Option<(u8, usize)> = None;
    for &candidate in SNIFF_CANDIDATES {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| count_unquoted(line, candidate))
            .collect();

        let mut tally: Vec<(usize, usize)> = Vec::new();
        for &count in counts.iter().filter(|&&c| c > 0) {
            match tally.iter_mut().find(|(c, _)| *c == count) {
                Some((_, lines)) => *lines += 1,
                None => tally.push((count, 1)),
            }
        }
        let consistent = tally.iter().map(|(_, lines)| *lines).max().unwrap_or(0);
        if consistent > 0 && best.is_none_or(|(_, score)| consistent > score) {
            best = Some((candidate, consistent));
        }
    }
    best.map(|(d, _)| d)
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut quoted = false;
    let mut count = 0;
    for b in line.bytes() {
        if b == b'"' {
            quoted = !quoted;
        } else if b == delimiter && !quoted {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_setup_skips_metadata_lines() {
        let file = write_temp(
            "Feeder Setup Export\nLine: SMT-1\nModuleNumber,Location,PartNumber\n1,2,P1\n3,4,P2\nTotal: 2\nEnd\n",
        );
        let table = load_table(file.path(), LoadOptions::SETUP).unwrap();
        assert_eq!(table.columns(), ["ModuleNumber", "Location", "PartNumber"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_trailing_blank_lines_do_not_count_as_footer() {
        let text = trim_lines("a\nb\nh1,h2\n1,2\nf1\nf2\n\n\n", LoadOptions::SETUP);
        assert_eq!(text, "h1,h2\n1,2");
    }

    #[test]
    fn test_semicolon_file_is_sniffed() {
        let (table, strategy) = parse_text("A;B;C\n1;2;3\n4;5;6").unwrap();
        assert_eq!(strategy, "sniffed");
        assert_eq!(table.width(), 3);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_long_rows_fall_back_to_skipping() {
        let (table, strategy) = parse_text("A;B;C\n1;2;3\n4;5;6;7\n7;8;9").unwrap();
        assert_eq!(strategy, "lenient");
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1][0], Cell::Number(7.0));
    }

    #[test]
    fn test_short_row_is_padded_not_dropped() {
        let (table, strategy) =
            parse_text("ModuleNumber,Location,PartNumber,PackageName\n1,1,P1,R0402\n2,3,P2\n4,5,P3,C0603").unwrap();
        assert_eq!(strategy, "comma");
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[1][2], Cell::Text("P2".into()));
        assert!(table.rows()[1][3].is_null());
        assert_eq!(table.rows()[2][2], Cell::Text("P3".into()));
    }

    #[test]
    fn test_short_row_in_sniffed_file_is_padded() {
        let (table, strategy) = parse_text("A;B;C\n1;2;3\n4;5\n7;8;9").unwrap();
        assert_eq!(strategy, "sniffed");
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[1], vec![Cell::Number(4.0), Cell::Number(5.0), Cell::Null]);
    }

    #[test]
    fn test_clean_comma_file_uses_first_strategy() {
        let (table, strategy) = parse_text("A,B\n1,x").unwrap();
        assert_eq!(strategy, "comma");
        assert_eq!(table.rows()[0], vec![Cell::Number(1.0), Cell::Text("x".into())]);
    }

    #[test]
    fn test_empty_input_is_parse_error() {
        let file = write_temp("meta\nmeta\nfoot\nfoot\n");
        let err = load_table(file.path(), LoadOptions::SETUP).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_table(Path::new("/nonexistent/setup.csv"), LoadOptions::SETUP).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[test]
    fn test_resolve_columns_case_insensitive() {
        let table = Table::new(vec!["MODULENUMBER".into(), "location".into(), "partNumber".into()]);
        let cols = SetupColumns::resolve(&table).unwrap();
        assert_eq!(cols.module, "MODULENUMBER");
        assert_eq!(cols.location, "location");
        assert_eq!(cols.part_number, "partNumber");
    }

    #[test]
    fn test_resolve_columns_names_all_missing() {
        let table = Table::new(vec!["ModuleNumber".into(), "Slot".into()]);
        match SetupColumns::resolve(&table) {
            Err(PipelineError::MissingColumns { missing }) => {
                assert_eq!(missing, vec!["Location".to_string(), "PartNumber".to_string()]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn test_sniff_prefers_consistent_delimiter() {
        assert_eq!(sniff_delimiter("a\tb\tc\n1\t2\t3"), Some(b'\t'));
        assert_eq!(sniff_delimiter("a|b\n\"x;y\"|2"), Some(b'|'));
        assert_eq!(sniff_delimiter("abc\ndef"), None);
    }
}

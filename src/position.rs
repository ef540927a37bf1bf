//! Canonical feeder position keys and multi-value row explosion.

use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::loader::SetupColumns;
use crate::table::{Cell, Table};

/// Name of the derived join-key column.
pub const POSITION_COLUMN: &str = "Position";

/// A normalized `M<module>-<location>` feeder slot identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CanonicalPosition(String);

impl CanonicalPosition {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits back into `(module, location)` at the first `-`. The module keeps
    /// its `M` prefix, which [`normalize`] accepts.
    pub fn split(&self) -> (&str, &str) {
        self.0.split_once('-').unwrap_or((self.0.as_str(), ""))
    }

    /// The leading `M<digits>` token, if the module part has any digits.
    pub fn module(&self) -> Option<&str> {
        module_token(&self.0)
    }
}

impl fmt::Display for CanonicalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the canonical position for a module and location value.
///
/// Leading zeros are stripped from both parts (an all-zero or empty value
/// becomes `0`) and quote characters are dropped from the location. A module
/// that already carries an `M` prefix is accepted, so feeding a split
/// canonical value back in is a no-op.
pub fn normalize(module: &str, location: &str) -> CanonicalPosition {
    let module = module.trim();
    let module = module
        .strip_prefix(['M', 'm'])
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
        .unwrap_or(module);
    let location: String = location.chars().filter(|c| *c != '\'' && *c != '"').collect();

    CanonicalPosition(format!(
        "M{}-{}",
        strip_leading_zeros(module),
        strip_leading_zeros(location.trim())
    ))
}

/// Extracts the first `M<digits>` token anywhere in `s`.
pub fn module_token(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    for (start, &b) in bytes.iter().enumerate() {
        if b != b'M' {
            continue;
        }
        let digits = bytes[start + 1..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .count();
        if digits > 0 {
            return Some(&s[start..start + 1 + digits]);
        }
    }
    None
}

fn strip_leading_zeros(s: &str) -> &str {
    let stripped = s.trim_start_matches('0');
    if stripped.is_empty() { "0" } else { stripped }
}

/// Comma-separated tokens of a cell, trimmed, with empty tokens dropped.
/// A null cell yields a single empty token so the row is never lost.
fn tokens(cell: &Cell) -> Vec<String> {
    let raw = cell.display();
    let parts: Vec<String> = raw
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if parts.is_empty() { vec![String::new()] } else { parts }
}

/// Adds the `Position` column to a setup table, emitting one row per
/// module × location token pair. Rows stay in input order; the copies made
/// from one multi-valued row are contiguous and in list order.
#[tracing::instrument(skip_all, fields(rows_in = setup.len()))]
pub fn explode_positions(setup: &Table, columns: &SetupColumns) -> Table {
    let module_idx = setup.column_index(&columns.module);
    let location_idx = setup.column_index(&columns.location);

    let mut names: Vec<String> = setup
        .columns()
        .iter()
        .filter(|c| c.as_str() != POSITION_COLUMN)
        .cloned()
        .collect();
    let kept: Vec<usize> = setup
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.as_str() != POSITION_COLUMN)
        .map(|(i, _)| i)
        .collect();
    names.push(POSITION_COLUMN.to_string());

    let mut out = Table::new(names);
    let mut multi_valued = 0usize;

    for row in setup.rows() {
        let modules = module_idx.map_or_else(|| vec![String::new()], |i| tokens(&row[i]));
        let locations = location_idx.map_or_else(|| vec![String::new()], |i| tokens(&row[i]));
        if modules.len() * locations.len() > 1 {
            multi_valued += 1;
        }

        let base: Vec<Cell> = kept.iter().map(|&i| row[i].clone()).collect();
        for module in &modules {
            for location in &locations {
                let mut cells = base.clone();
                cells.push(Cell::Text(normalize(module, location).0));
                out.push_row(cells);
            }
        }
    }

    info!(
        rows_out = out.len(),
        multi_valued,
        "Positions normalized"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_table(rows: &[(&str, &str, &str)]) -> (Table, SetupColumns) {
        let mut table = Table::new(vec![
            "ModuleNumber".into(),
            "Location".into(),
            "PartNumber".into(),
            "Side".into(),
        ]);
        for (m, l, p) in rows {
            table.push_row(vec![Cell::parse(m), Cell::parse(l), Cell::parse(p), Cell::Text("T".into())]);
        }
        let cols = SetupColumns::resolve(&table).unwrap();
        (table, cols)
    }

    #[test]
    fn test_strips_leading_zeros() {
        assert_eq!(normalize("007", "0012").as_str(), "M7-12");
        assert_eq!(normalize("000", "000").as_str(), "M0-0");
        assert_eq!(normalize("", "").as_str(), "M0-0");
    }

    #[test]
    fn test_removes_quotes_from_location() {
        assert_eq!(normalize("1", "'0005").as_str(), "M1-5");
        assert_eq!(normalize("1", "\"07\"").as_str(), "M1-7");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for (m, l) in [("007", "0012"), ("000", "000"), ("12", "'3"), ("1", "A01"), ("M3", "4")] {
            let once = normalize(m, l);
            let (module, location) = once.split();
            assert_eq!(normalize(module, location), once, "input ({m}, {l})");
        }
    }

    #[test]
    fn test_module_token() {
        assert_eq!(normalize("07", "3").module(), Some("M7"));
        assert_eq!(module_token("M12-3"), Some("M12"));
        assert_eq!(module_token("MA-3"), None);
    }

    #[test]
    fn test_explode_location_list() {
        let (table, cols) = setup_table(&[("1", "1", "P0"), ("2", "3, 04,5", "P1"), ("3", "9", "P2")]);
        let out = explode_positions(&table, &cols);

        assert_eq!(out.len(), table.len() + 2);
        let pos = out.column_index(POSITION_COLUMN).unwrap();
        let positions: Vec<String> = out.column(pos).map(Cell::display).collect();
        assert_eq!(positions, ["M1-1", "M2-3", "M2-4", "M2-5", "M3-9"]);

        let part = out.column_index("PartNumber").unwrap();
        for r in 1..4 {
            assert_eq!(out.cell(r, part), &Cell::Text("P1".into()));
            assert_eq!(out.cell(r, 1), table.cell(1, 1));
        }
    }

    #[test]
    fn test_explode_replaces_existing_position_column() {
        let mut table = Table::new(vec!["Position".into(), "ModuleNumber".into(), "Location".into(), "PartNumber".into()]);
        table.push_row(vec![Cell::Text("old".into()), Cell::Number(1.0), Cell::Number(2.0), Cell::Text("P".into())]);
        let cols = SetupColumns::resolve(&table).unwrap();
        let out = explode_positions(&table, &cols);
        assert_eq!(out.columns(), ["ModuleNumber", "Location", "PartNumber", "Position"]);
        assert_eq!(out.cell(0, 3), &Cell::Text("M1-2".into()));
    }

    #[test]
    fn test_null_location_keeps_row() {
        let (table, cols) = setup_table(&[("4", "", "P0")]);
        let out = explode_positions(&table, &cols);
        assert_eq!(out.len(), 1);
        assert_eq!(out.cell(0, 4), &Cell::Text("M4-0".into()));
    }

    #[test]
    fn test_explode_ignores_empty_tokens() {
        let (table, cols) = setup_table(&[("1", "3,,4", "P0"), ("2", ", 7 ,", "P1")]);
        let out = explode_positions(&table, &cols);
        let pos = out.column_index(POSITION_COLUMN).unwrap();
        let positions: Vec<String> = out.column(pos).map(Cell::display).collect();
        assert_eq!(positions, ["M1-3", "M1-4", "M2-7"]);
    }
}

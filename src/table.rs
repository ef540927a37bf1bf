//! In-memory rectangular table of loosely typed cells.

use serde::{Serialize, Serializer};

/// Spellings read as a missing value, compared case-insensitively.
const NULL_MARKERS: &[&str] = &["na", "n/a", "#n/a", "nan", "null", "none", "-nan"];

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Reads a raw field: blanks and null markers become [`Cell::Null`], anything
    /// that parses as a float becomes [`Cell::Number`], the rest stays text.
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() || NULL_MARKERS.iter().any(|m| s.eq_ignore_ascii_case(m)) {
            return Cell::Null;
        }
        match s.parse::<f64>() {
            Ok(v) if v.is_nan() => Cell::Null,
            Ok(v) => Cell::Number(v),
            Err(_) => Cell::Text(s.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Numeric view of the cell. Text that does not parse yields `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Null => None,
            Cell::Number(v) => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| !v.is_nan()),
        }
    }

    /// String form used for joins and grouping. Integral numbers render
    /// without a fractional part so `7.0` and `"7"` share a key.
    pub fn key(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Number(v) => Some(format_number(*v)),
            Cell::Text(s) => Some(s.clone()),
        }
    }

    /// Like [`Cell::key`] but renders nulls as an empty string.
    pub fn display(&self) -> String {
        self.key().unwrap_or_default()
    }
}

/// Serializes as a bare JSON value. Infinite numbers become `0`.
impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Null => serializer.serialize_none(),
            Cell::Number(v) if v.is_finite() => serializer.serialize_f64(*v),
            Cell::Number(_) => serializer.serialize_f64(0.0),
            Cell::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

pub(crate) fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Named columns over rows of equal width.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Finds a column whose name matches `name` ignoring ASCII case and
    /// returns the name as spelled in the table. The last match wins.
    pub fn find_column_ci(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .rev()
            .find(|c| c.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    /// Appends a row, padding with nulls or truncating to the table width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Null);
        self.rows.push(row);
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        &self.rows[row][col]
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> &mut Cell {
        &mut self.rows[row][col]
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, col: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |r| &r[col])
    }

    /// Adds a column filled with `fill` and returns its index. An existing
    /// column with the same name is left untouched.
    pub fn add_column(&mut self, name: &str, fill: Cell) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(fill.clone());
        }
        self.columns.len() - 1
    }

    /// Sets every value of `name`, adding the column if needed.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not have one entry per row.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) -> usize {
        assert_eq!(values.len(), self.rows.len(), "column length mismatch");
        let idx = self.add_column(name, Cell::Null);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
        idx
    }

    /// Number of null cells across the whole table.
    pub fn null_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| r.iter())
            .filter(|c| c.is_null())
            .count()
    }

    /// Projects the listed columns (missing names are skipped) into a new table.
    pub fn select(&self, names: &[&str]) -> Table {
        let picked: Vec<(usize, &str)> = names
            .iter()
            .filter_map(|n| self.column_index(n).map(|i| (i, *n)))
            .collect();
        let mut out = Table::new(picked.iter().map(|(_, n)| n.to_string()).collect());
        for row in &self.rows {
            out.rows
                .push(picked.iter().map(|(i, _)| row[*i].clone()).collect());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_parse_kinds() {
        assert_eq!(Cell::parse(""), Cell::Null);
        assert_eq!(Cell::parse("  NaN "), Cell::Null);
        assert_eq!(Cell::parse("N/A"), Cell::Null);
        assert_eq!(Cell::parse("007"), Cell::Number(7.0));
        assert_eq!(Cell::parse("1.5"), Cell::Number(1.5));
        assert_eq!(Cell::parse("'12"), Cell::Text("'12".into()));
        assert_eq!(Cell::parse("1,2"), Cell::Text("1,2".into()));
    }

    #[test]
    fn test_cell_parse_keeps_infinity_as_number() {
        assert_eq!(Cell::parse("inf"), Cell::Number(f64::INFINITY));
        assert_eq!(Cell::parse("-inf"), Cell::Number(f64::NEG_INFINITY));
    }

    #[test]
    fn test_key_drops_integral_fraction() {
        assert_eq!(Cell::Number(7.0).key().as_deref(), Some("7"));
        assert_eq!(Cell::Number(7.25).key().as_deref(), Some("7.25"));
        assert_eq!(Cell::Text("ABC".into()).key().as_deref(), Some("ABC"));
        assert_eq!(Cell::Null.key(), None);
    }

    #[test]
    fn test_find_column_ci() {
        let table = Table::new(vec!["modulenumber".into(), "Location".into()]);
        assert_eq!(table.find_column_ci("ModuleNumber"), Some("modulenumber"));
        assert_eq!(table.find_column_ci("LOCATION"), Some("Location"));
        assert_eq!(table.find_column_ci("PartNumber"), None);
    }

    #[test]
    fn test_push_row_pads_to_width() {
        let mut table = Table::new(vec!["a".into(), "b".into()]);
        table.push_row(vec![Cell::Number(1.0)]);
        assert_eq!(table.rows()[0], vec![Cell::Number(1.0), Cell::Null]);
    }

    #[test]
    fn test_add_and_set_column() {
        let mut table = Table::new(vec!["a".into()]);
        table.push_row(vec![Cell::Number(1.0)]);
        table.push_row(vec![Cell::Number(2.0)]);

        let idx = table.add_column("b", Cell::Number(0.0));
        assert_eq!(idx, 1);
        assert_eq!(table.add_column("b", Cell::Null), 1);
        assert_eq!(table.null_count(), 0);

        table.set_column("a", vec![Cell::Null, Cell::Null]);
        assert_eq!(table.null_count(), 2);
    }

    #[test]
    fn test_serializes_as_plain_json() {
        let mut table = Table::new(vec!["a".into(), "b".into()]);
        table.push_row(vec![Cell::Number(1.0), Cell::Text("x".into())]);
        table.push_row(vec![Cell::Null, Cell::Text("y".into())]);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"columns":["a","b"],"rows":[[1.0,"x"],[null,"y"]]}"#);
    }

    #[test]
    fn test_infinite_numbers_serialize_as_zero() {
        let json = serde_json::to_string(&vec![Cell::Number(f64::INFINITY), Cell::Number(2.5)]).unwrap();
        assert_eq!(json, "[0.0,2.5]");
    }
}

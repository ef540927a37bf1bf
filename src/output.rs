//! Report artifacts: sectioned CSV, Excel workbook, prediction exports and
//! the JSON report document.
//!
//! Every artifact is rendered to bytes in memory and then handed to an
//! [`ArtifactSink`]. A failure in one artifact is logged and recorded; the
//! remaining artifacts are still attempted. When the report workbook fails,
//! each of its sheets is written as a workbook of its own instead.

use std::borrow::Cow;
use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Local};
use csv::WriterBuilder;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::analyzers::types::{Aggregates, Breakdown};
use crate::error::ArtifactWriteError;
use crate::reconcile::JoinReport;
use crate::scoring::ScoringSummary;
use crate::sink::ArtifactSink;
use crate::stats::finite_or_zero;
use crate::table::{Cell, Table};

const STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// The artifacts produced for every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Excel,
    Csv,
    PredictionsExcel,
    PredictionsCsv,
    Json,
}

impl ArtifactKind {
    /// Write order. The JSON document goes last so it can report earlier failures.
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::Excel,
        ArtifactKind::Csv,
        ArtifactKind::PredictionsExcel,
        ArtifactKind::PredictionsCsv,
        ArtifactKind::Json,
    ];

    /// Key used in `output_files`.
    pub fn key(&self) -> &'static str {
        match self {
            ArtifactKind::Excel => "excel",
            ArtifactKind::Csv => "csv",
            ArtifactKind::PredictionsExcel => "predictions_excel",
            ArtifactKind::PredictionsCsv => "predictions_csv",
            ArtifactKind::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactKind::Excel | ArtifactKind::PredictionsExcel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ArtifactKind::Csv | ArtifactKind::PredictionsCsv => "text/csv",
            ArtifactKind::Json => "application/json",
        }
    }
}

/// Artifact names for one run, all under a timestamped folder.
#[derive(Debug, Clone)]
pub struct ArtifactPlan {
    prefix: String,
    generated_at: DateTime<Local>,
}

impl ArtifactPlan {
    pub fn new(prefix: &str, generated_at: DateTime<Local>) -> Self {
        Self {
            prefix: prefix.to_string(),
            generated_at,
        }
    }

    pub fn now(prefix: &str) -> Self {
        Self::new(prefix, Local::now())
    }

    fn stamp(&self) -> String {
        self.generated_at.format(STAMP_FORMAT).to_string()
    }

    /// `<prefix>_<YYYY-MM-DD_HH-MM-SS>`
    pub fn folder(&self) -> String {
        format!("{}_{}", self.prefix, self.stamp())
    }

    /// Name of `kind` relative to the sink root.
    pub fn name(&self, kind: ArtifactKind) -> String {
        let stamp = self.stamp();
        let file = match kind {
            ArtifactKind::Excel => format!("{}_{stamp}.xlsx", self.prefix),
            ArtifactKind::Csv => format!("{}_{stamp}.csv", self.prefix),
            ArtifactKind::Json => format!("{}_{stamp}.json", self.prefix),
            ArtifactKind::PredictionsExcel => format!("predictions_with_data_{stamp}.xlsx"),
            ArtifactKind::PredictionsCsv => format!("predictions_with_data_{stamp}.csv"),
        };
        format!("{}/{file}", self.folder())
    }

    /// Name of a single-sheet workbook written in place of the report workbook.
    pub fn sheet_name(&self, slug: &str) -> String {
        format!("{}/{}_{slug}_{}.xlsx", self.folder(), self.prefix, self.stamp())
    }

    pub fn names(&self) -> BTreeMap<String, String> {
        ArtifactKind::ALL
            .iter()
            .map(|k| (k.key().to_string(), self.name(*k)))
            .collect()
    }
}

/// Everything the emitter renders.
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    pub aggregates: &'a Aggregates,
    pub scoring: &'a ScoringSummary,
    pub join: Option<&'a JoinReport>,
    /// The scored table.
    pub table: &'a Table,
    /// Setup rows as loaded, with the predictions merged back.
    pub predictions: &'a Table,
}

/// The JSON artifact: the run result without the row-level table.
#[derive(Debug, Serialize)]
pub struct ReportDocument<'a> {
    #[serde(flatten)]
    pub aggregates: &'a Aggregates,
    pub scoring: &'a ScoringSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join: Option<&'a JoinReport>,
    pub generated_at: String,
    /// Planned artifact names, keyed like `output_files`.
    pub output_files: BTreeMap<String, String>,
    pub artifact_errors: &'a [ArtifactWriteError],
}

/// Outcome of [`emit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Emitted {
    /// Locations of the artifacts that were written.
    pub output_files: BTreeMap<String, String>,
    pub errors: Vec<ArtifactWriteError>,
}

/// Overview metrics as label/value pairs. Rates are in percent.
pub fn overview_rows(aggregates: &Aggregates) -> Vec<(&'static str, Cell)> {
    let s = &aggregates.summary;
    let m = &aggregates.model_performance;
    let percent = |v: f64| Cell::Number(finite_or_zero(v * 100.0));
    vec![
        ("Total Parts", Cell::Number(s.total_parts as f64)),
        ("Unique Part Numbers", Cell::Number(s.unique_part_numbers as f64)),
        ("Unique Feeder IDs", Cell::Number(s.unique_feeder_ids as f64)),
        (
            "Most Used Feeder",
            s.most_used_feeder_id.as_deref().map_or(Cell::Null, Cell::from),
        ),
        ("Total Errors", Cell::Number(m.total_errors as f64)),
        ("Error Rate (%)", percent(m.error_rate)),
        ("Accuracy", percent(m.accuracy)),
        ("Precision", percent(m.precision)),
        ("Recall", percent(m.recall)),
        ("F1 Score", percent(m.f1_score)),
    ]
}

fn overview_table(aggregates: &Aggregates) -> Table {
    let mut t = Table::new(vec!["Metric".into(), "Value".into()]);
    for (label, value) in overview_rows(aggregates) {
        t.push_row(vec![Cell::from(label), value]);
    }
    t
}

/// A breakdown laid out as `<column>, ErrorCount, ErrorRate, TotalCount, ErrorPercentage`.
fn breakdown_table(b: &Breakdown) -> Table {
    let mut t = Table::new(vec![
        b.column.clone(),
        "ErrorCount".into(),
        "ErrorRate".into(),
        "TotalCount".into(),
        "ErrorPercentage".into(),
    ]);
    for g in &b.groups {
        t.push_row(vec![
            Cell::Text(g.key.clone()),
            Cell::Number(g.error_count as f64),
            Cell::Number(finite_or_zero(g.error_rate)),
            Cell::Number(g.total_count as f64),
            Cell::Number(finite_or_zero(g.error_percentage)),
        ]);
    }
    t
}

/// Writes `table` as CSV with a header row.
pub fn table_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(Cell::display))?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// Titled tables separated by blank lines: overview first, then each breakdown.
pub fn sectioned_csv(aggregates: &Aggregates) -> Result<Vec<u8>> {
    let mut sections = vec![("OVERVIEW", overview_table(aggregates))];
    sections.extend(
        aggregates
            .breakdowns
            .iter()
            .map(|b| (b.dimension.title(), breakdown_table(b))),
    );

    let mut out = Vec::new();
    for (i, (title, table)) in sections.iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(b"\n\n");
        }
        out.extend_from_slice(title.as_bytes());
        out.push(b'\n');
        out.extend(table_csv(table)?);
    }
    Ok(out)
}

fn write_cell(ws: &mut Worksheet, row: u32, col: u16, cell: &Cell) -> Result<()> {
    match cell {
        Cell::Null => {}
        Cell::Number(v) if v.is_finite() => {
            ws.write_number(row, col, *v)?;
        }
        other => {
            ws.write_string(row, col, other.display())?;
        }
    }
    Ok(())
}

/// Writes `table` starting at `start` with a bold header. Returns the next free row.
fn write_table(ws: &mut Worksheet, table: &Table, start: u32, bold: &Format) -> Result<u32> {
    for (c, name) in table.columns().iter().enumerate() {
        ws.write_string_with_format(start, u16::try_from(c)?, name, bold)?;
    }
    let mut row = start + 1;
    for cells in table.rows() {
        for (c, cell) in cells.iter().enumerate() {
            write_cell(ws, row, u16::try_from(c)?, cell)?;
        }
        row += 1;
    }
    Ok(row)
}

/// Body of one report sheet.
enum SheetBody<'a> {
    Table(Cow<'a, Table>),
    /// Titled tables stacked top to bottom with two blank rows between them.
    Stacked(Vec<(&'static str, Table)>),
}

struct Sheet<'a> {
    name: &'static str,
    body: SheetBody<'a>,
}

impl<'a> Sheet<'a> {
    fn owned(name: &'static str, table: Table) -> Self {
        Self {
            name,
            body: SheetBody::Table(Cow::Owned(table)),
        }
    }

    fn borrowed(name: &'static str, table: &'a Table) -> Self {
        Self {
            name,
            body: SheetBody::Table(Cow::Borrowed(table)),
        }
    }
}

/// Sheets of the report workbook, in order.
fn report_sheets<'a>(report: &Report<'a>) -> Vec<Sheet<'a>> {
    let breakdowns = &report.aggregates.breakdowns;

    let mut stacked = Vec::new();
    if let Some(shape) = &breakdowns.shape {
        stacked.push(("Shape Errors", breakdown_table(shape)));
    }
    stacked.push(("Part Number Errors", breakdown_table(&breakdowns.part_number)));

    let mut sheets = vec![
        Sheet::owned("Overview", overview_table(report.aggregates)),
        Sheet::borrowed("Raw Data", report.table),
        Sheet::borrowed("Predictions", report.predictions),
        Sheet {
            name: "Shape and Part Number",
            body: SheetBody::Stacked(stacked),
        },
        Sheet::owned("Module Errors", breakdown_table(&breakdowns.module)),
    ];
    if let Some(package) = &breakdowns.package {
        sheets.push(Sheet::owned("Package Errors", breakdown_table(package)));
    }
    sheets
}

/// One `(title, table)` per table in `sheets`; stacked sheets are split apart.
fn split_sheets(sheets: Vec<Sheet<'_>>) -> Vec<(&'static str, Cow<'_, Table>)> {
    sheets
        .into_iter()
        .flat_map(|sheet| match sheet.body {
            SheetBody::Table(table) => vec![(sheet.name, table)],
            SheetBody::Stacked(parts) => parts
                .into_iter()
                .map(|(title, table)| (title, Cow::Owned(table)))
                .collect(),
        })
        .collect()
}

fn add_sheet(workbook: &mut Workbook, sheet: &Sheet<'_>, bold: &Format) -> Result<()> {
    let ws = workbook.add_worksheet();
    ws.set_name(sheet.name)?;
    match &sheet.body {
        SheetBody::Table(table) => {
            write_table(ws, table, 0, bold)?;
        }
        SheetBody::Stacked(parts) => {
            let mut row = 0;
            for (title, table) in parts {
                ws.write_string_with_format(row, 0, *title, bold)?;
                row = write_table(ws, table, row + 1, bold)? + 2;
            }
        }
    }
    Ok(())
}

/// The multi-sheet report workbook.
pub fn report_workbook(report: &Report<'_>) -> Result<Vec<u8>> {
    let bold = Format::new().set_bold();
    let mut workbook = Workbook::new();
    for sheet in report_sheets(report) {
        add_sheet(&mut workbook, &sheet, &bold)?;
    }
    Ok(workbook.save_to_buffer()?)
}

/// A workbook with `table` as its only sheet, named `name`.
pub fn sheet_workbook(name: &'static str, table: &Table) -> Result<Vec<u8>> {
    let bold = Format::new().set_bold();
    let mut workbook = Workbook::new();
    add_sheet(&mut workbook, &Sheet::borrowed(name, table), &bold)?;
    Ok(workbook.save_to_buffer()?)
}

fn sheet_slug(title: &str) -> String {
    title.to_lowercase().replace(' ', "_")
}

fn render(kind: ArtifactKind, report: &Report<'_>, plan: &ArtifactPlan, errors: &[ArtifactWriteError]) -> Result<Vec<u8>> {
    match kind {
        ArtifactKind::Excel => report_workbook(report),
        ArtifactKind::Csv => sectioned_csv(report.aggregates),
        ArtifactKind::PredictionsExcel => sheet_workbook("Predictions", report.predictions),
        ArtifactKind::PredictionsCsv => table_csv(report.predictions),
        ArtifactKind::Json => {
            let document = ReportDocument {
                aggregates: report.aggregates,
                scoring: report.scoring,
                join: report.join,
                generated_at: plan.generated_at.to_rfc3339(),
                output_files: plan.names(),
                artifact_errors: errors,
            };
            Ok(serde_json::to_vec_pretty(&document)?)
        }
    }
}

/// Hands `bytes` to the sink under `name` and records the outcome under `key`.
/// Returns whether the artifact was stored.
fn store(
    emitted: &mut Emitted,
    sink: &dyn ArtifactSink,
    key: &str,
    name: &str,
    content_type: &str,
    bytes: Result<Vec<u8>>,
) -> bool {
    match bytes.and_then(|bytes| sink.put(name, content_type, &bytes)) {
        Ok(location) => {
            info!(artifact = key, location = %location, "Artifact saved");
            emitted.output_files.insert(key.to_string(), location);
            true
        }
        Err(e) => {
            let failure = ArtifactWriteError {
                artifact: key.to_string(),
                reason: format!("{e:#}"),
            };
            error!(artifact = key, error = %failure.reason, "Artifact failed");
            emitted.errors.push(failure);
            false
        }
    }
}

/// Writes every report sheet as its own workbook, keyed `excel_<sheet>`.
fn emit_sheets_separately(report: &Report<'_>, plan: &ArtifactPlan, sink: &dyn ArtifactSink, emitted: &mut Emitted) {
    let kind = ArtifactKind::Excel;
    warn!("Report workbook failed, writing one workbook per sheet");
    for (title, table) in split_sheets(report_sheets(report)) {
        let slug = sheet_slug(title);
        let key = format!("{}_{slug}", kind.key());
        store(
            emitted,
            sink,
            &key,
            &plan.sheet_name(&slug),
            kind.content_type(),
            sheet_workbook(title, &table),
        );
    }
}

/// Renders and stores every artifact. Never fails as a whole.
#[tracing::instrument(skip_all, fields(folder = %plan.folder()))]
pub fn emit(report: &Report<'_>, plan: &ArtifactPlan, sink: &dyn ArtifactSink) -> Emitted {
    let mut emitted = Emitted::default();

    for kind in ArtifactKind::ALL {
        let bytes = render(kind, report, plan, &emitted.errors);
        let stored = store(
            &mut emitted,
            sink,
            kind.key(),
            &plan.name(kind),
            kind.content_type(),
            bytes,
        );
        if !stored && kind == ArtifactKind::Excel {
            emit_sheets_separately(report, plan, sink, &mut emitted);
        }
    }
    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::aggregate::aggregate;
    use crate::scoring::ThresholdSource;
    use crate::sink::MemorySink;
    use chrono::TimeZone;

    fn scored_table() -> Table {
        let mut t = Table::new(vec![
            "PartNumber".into(),
            "Position".into(),
            "Shape".into(),
            "ErrorProbability".into(),
            "PredictedError".into(),
        ]);
        for (part, pos, shape, p, label) in [
            ("P1", "M1-1", "QFP", 0.9, 1.0),
            ("P2", "M1-2", "QFP", 0.2, 0.0),
            ("P3", "M2-1", "SOIC", 0.7, 1.0),
        ] {
            t.push_row(vec![
                Cell::parse(part),
                Cell::parse(pos),
                Cell::parse(shape),
                Cell::Number(p),
                Cell::Number(label),
            ]);
        }
        t
    }

    fn plan() -> ArtifactPlan {
        let at = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        ArtifactPlan::new("predictions_output", at)
    }

    fn scoring() -> ScoringSummary {
        ScoringSummary {
            threshold: ThresholdSource::Model,
            fallback_applied: false,
            raw_positive_count: 2,
            predicted_positive_count: 2,
        }
    }

    /// Refuses names ending in `suffix` and stores the rest.
    struct Refusing {
        inner: MemorySink,
        suffix: String,
    }

    impl Refusing {
        fn new(suffix: &str) -> Self {
            Self {
                inner: MemorySink::new(),
                suffix: suffix.to_string(),
            }
        }
    }

    impl ArtifactSink for Refusing {
        fn put(&self, name: &str, content_type: &str, bytes: &[u8]) -> Result<String> {
            if name.ends_with(&self.suffix) {
                anyhow::bail!("disk full");
            }
            self.inner.put(name, content_type, bytes)
        }
    }

    fn report<'a>(agg: &'a Aggregates, scoring: &'a ScoringSummary, table: &'a Table, predictions: &'a Table) -> Report<'a> {
        Report {
            aggregates: agg,
            scoring,
            join: None,
            table,
            predictions,
        }
    }

    fn predictions_table() -> Table {
        let mut t = Table::new(vec![
            "PartNumber".into(),
            "Location".into(),
            "Position".into(),
            "ErrorProbability".into(),
            "PredictedError".into(),
        ]);
        t.push_row(vec![
            Cell::parse("P1"),
            Cell::parse("1"),
            Cell::parse("M1-1"),
            Cell::Number(0.9),
            Cell::Number(1.0),
        ]);
        t.push_row(vec![
            Cell::parse("P2"),
            Cell::parse("2,3"),
            Cell::parse("M1-2,3"),
            Cell::Number(0.0),
            Cell::Number(0.0),
        ]);
        t
    }

    #[test]
    fn test_artifact_names() {
        let plan = plan();
        assert_eq!(plan.folder(), "predictions_output_2024-03-05_14-07-09");
        assert_eq!(
            plan.name(ArtifactKind::Csv),
            "predictions_output_2024-03-05_14-07-09/predictions_output_2024-03-05_14-07-09.csv"
        );
        assert_eq!(
            plan.name(ArtifactKind::PredictionsExcel),
            "predictions_output_2024-03-05_14-07-09/predictions_with_data_2024-03-05_14-07-09.xlsx"
        );
        assert_eq!(plan.names().len(), 5);
    }

    #[test]
    fn test_sectioned_csv_layout() {
        let table = scored_table();
        let agg = aggregate(&table, "PartNumber", &[1, 0, 1], true);
        let text = String::from_utf8(sectioned_csv(&agg).unwrap()).unwrap();

        let titles: Vec<&str> = text
            .lines()
            .filter(|l| l.ends_with("ERRORS") || *l == "OVERVIEW")
            .collect();
        assert_eq!(titles, ["OVERVIEW", "SHAPE ERRORS", "PART NUMBER ERRORS", "MODULE ERRORS"]);
        assert!(text.contains("Metric,Value\nTotal Parts,3\n"));
        assert!(text.contains("\n\n\nSHAPE ERRORS\nShape,ErrorCount,ErrorRate,TotalCount,ErrorPercentage\n"));
    }

    #[test]
    fn test_overview_rates_in_percent() {
        let table = scored_table();
        let agg = aggregate(&table, "PartNumber", &[1, 0, 1], true);
        let rows = overview_rows(&agg);
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[4], ("Total Errors", Cell::Number(2.0)));
        assert!(matches!(rows[5].1, Cell::Number(v) if (v - 200.0 / 3.0).abs() < 1e-9));
    }

    #[test]
    fn test_emit_writes_every_artifact() {
        let table = scored_table();
        let predictions = predictions_table();
        let agg = aggregate(&table, "PartNumber", &[1, 0, 1], true);
        let scoring = scoring();
        let report = report(&agg, &scoring, &table, &predictions);
        let sink = MemorySink::new();
        let emitted = emit(&report, &plan(), &sink);

        assert!(emitted.errors.is_empty());
        assert_eq!(emitted.output_files.len(), 5);
        let workbook = sink.get(&plan().name(ArtifactKind::Excel)).unwrap();
        assert_eq!(&workbook[..2], b"PK");
    }

    #[test]
    fn test_one_failure_does_not_stop_the_rest() {
        let table = scored_table();
        let predictions = predictions_table();
        let agg = aggregate(&table, "PartNumber", &[1, 0, 1], true);
        let scoring = scoring();
        let report = report(&agg, &scoring, &table, &predictions);
        let sink = Refusing::new(".xlsx");
        let emitted = emit(&report, &plan(), &sink);

        let failed: Vec<&str> = emitted.errors.iter().map(|e| e.artifact.as_str()).collect();
        assert_eq!(
            failed,
            [
                "excel",
                "excel_overview",
                "excel_raw_data",
                "excel_predictions",
                "excel_shape_errors",
                "excel_part_number_errors",
                "excel_module_errors",
                "predictions_excel",
            ]
        );
        assert!(emitted.errors[0].reason.contains("disk full"));
        assert_eq!(
            emitted.output_files.keys().collect::<Vec<_>>(),
            ["csv", "json", "predictions_csv"]
        );

        let json: serde_json::Value =
            serde_json::from_slice(&sink.inner.get(&plan().name(ArtifactKind::Json)).unwrap()).unwrap();
        assert_eq!(json["artifact_errors"].as_array().unwrap().len(), failed.len());
        assert_eq!(json["output_files"].as_object().unwrap().len(), 5);
        assert!(json.get("rows").is_none());
    }

    #[test]
    fn test_report_workbook_failure_writes_sheets_separately() {
        let table = scored_table();
        let predictions = predictions_table();
        let agg = aggregate(&table, "PartNumber", &[1, 0, 1], true);
        let scoring = scoring();
        let report = report(&agg, &scoring, &table, &predictions);
        let plan = plan();
        let sink = Refusing::new(&plan.name(ArtifactKind::Excel));
        let emitted = emit(&report, &plan, &sink);

        let failed: Vec<&str> = emitted.errors.iter().map(|e| e.artifact.as_str()).collect();
        assert_eq!(failed, ["excel"]);
        for key in [
            "excel_overview",
            "excel_raw_data",
            "excel_predictions",
            "excel_shape_errors",
            "excel_part_number_errors",
            "excel_module_errors",
            "predictions_excel",
        ] {
            assert!(emitted.output_files.contains_key(key), "{key} missing");
        }
        assert!(!emitted.output_files.contains_key("excel"));

        let name = plan.sheet_name("raw_data");
        assert_eq!(
            name,
            "predictions_output_2024-03-05_14-07-09/predictions_output_raw_data_2024-03-05_14-07-09.xlsx"
        );
        assert_eq!(&sink.inner.get(&name).unwrap()[..2], b"PK");
    }

    #[test]
    fn test_report_sheets_include_predictions() {
        let table = scored_table();
        let predictions = predictions_table();
        let agg = aggregate(&table, "PartNumber", &[1, 0, 1], true);
        let scoring = scoring();
        let report = report(&agg, &scoring, &table, &predictions);

        let sheets = report_sheets(&report);
        let names: Vec<&str> = sheets.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            ["Overview", "Raw Data", "Predictions", "Shape and Part Number", "Module Errors"]
        );
        match &sheets[2].body {
            SheetBody::Table(t) => assert_eq!(&**t, &predictions),
            SheetBody::Stacked(_) => panic!("predictions sheet should be a plain table"),
        }

        let titles: Vec<&str> = split_sheets(sheets).into_iter().map(|(t, _)| t).collect();
        assert_eq!(titles[3..5], ["Shape Errors", "Part Number Errors"]);
    }

    #[test]
    fn test_predictions_csv_is_the_merged_setup_table() {
        let table = scored_table();
        let predictions = predictions_table();
        let agg = aggregate(&table, "PartNumber", &[1, 0, 1], true);
        let scoring = scoring();
        let report = report(&agg, &scoring, &table, &predictions);

        let bytes = render(ArtifactKind::PredictionsCsv, &report, &plan(), &[]).unwrap();
        let mut reader = csv::Reader::from_reader(&bytes[..]);
        let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(headers, predictions.columns());
        assert!(!headers.iter().any(|h| h == "Shape"));

        let labels: Vec<String> = reader
            .records()
            .map(|r| r.unwrap()[4].to_string())
            .collect();
        assert_eq!(labels, ["1", "0"]);
    }
}

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::analyzers::summary::{PACKAGE_COLUMN, shape_column};
use crate::analyzers::types::{Breakdown, Breakdowns, Dimension, GroupCount, GroupStats, MostAffected};
use crate::position::{POSITION_COLUMN, module_token};
use crate::stats::{pct, ratio};
use crate::table::Table;

/// Length of the truncated "top" view of each breakdown.
pub const TOP_N: usize = 5;

/// Column label used for the module dimension, which is derived from positions.
pub const MODULE_COLUMN: &str = "Module";

/// Groups rows by `keys` and tallies predicted errors per group.
///
/// Rows with no key are left out. Groups come back by descending error count;
/// groups with equal counts keep the order in which they first appeared, and
/// the first of them is the one reported as most affected.
pub fn breakdown<I>(dimension: Dimension, column: &str, keys: I, labels: &[u8], total_errors: usize) -> Breakdown
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut groups: Vec<GroupStats> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (key, &label) in keys.into_iter().zip(labels) {
        let Some(key) = key else { continue };
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(GroupStats {
                key,
                total_count: 0,
                error_count: 0,
                error_rate: 0.0,
                error_percentage: 0.0,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.total_count += 1;
        if label == 1 {
            group.error_count += 1;
        }
    }

    for g in &mut groups {
        g.error_rate = ratio(g.error_count, g.total_count);
        g.error_percentage = pct(g.error_count, total_errors);
    }
    groups.sort_by(|a, b| b.error_count.cmp(&a.error_count));

    let most_affected = groups.first().filter(|g| g.error_count > 0).map(|g| MostAffected {
        name: g.key.clone(),
        count: g.error_count,
        percentage: ratio(g.error_count, total_errors),
    });
    let top = groups.iter().take(TOP_N).cloned().collect();

    debug!(
        ?dimension,
        column,
        groups = groups.len(),
        total_errors,
        "Breakdown computed"
    );

    Breakdown {
        dimension,
        column: column.to_string(),
        groups,
        top,
        most_affected,
    }
}

fn column_keys(table: &Table, column: &str) -> Vec<Option<String>> {
    match table.column_index(column) {
        Some(i) => table.column(i).map(|c| c.key()).collect(),
        None => vec![None; table.len()],
    }
}

fn module_keys(table: &Table) -> Vec<Option<String>> {
    column_keys(table, POSITION_COLUMN)
        .into_iter()
        .map(|p| p.and_then(|p| module_token(&p).map(str::to_string)))
        .collect()
}

/// Breakdowns for every dimension whose source column is present. Part
/// number and module are always produced.
pub fn breakdowns(table: &Table, part_column: &str, labels: &[u8]) -> Breakdowns {
    let total_errors = labels.iter().filter(|&&l| l == 1).count();

    let shape = shape_column(table).map(|c| {
        breakdown(Dimension::Shape, c, column_keys(table, c), labels, total_errors)
    });
    let package = table.has_column(PACKAGE_COLUMN).then(|| {
        breakdown(
            Dimension::Package,
            PACKAGE_COLUMN,
            column_keys(table, PACKAGE_COLUMN),
            labels,
            total_errors,
        )
    });

    Breakdowns {
        shape,
        part_number: breakdown(
            Dimension::PartNumber,
            part_column,
            column_keys(table, part_column),
            labels,
            total_errors,
        ),
        module: breakdown(Dimension::Module, MODULE_COLUMN, module_keys(table), labels, total_errors),
        package,
    }
}

/// For each module with predicted errors, its part numbers with the most
/// predicted errors (at most [`TOP_N`]).
pub fn module_top_parts(table: &Table, part_column: &str, labels: &[u8]) -> BTreeMap<String, Vec<GroupCount>> {
    let mut per_module: BTreeMap<String, Vec<GroupCount>> = BTreeMap::new();

    let modules = module_keys(table);
    let parts = column_keys(table, part_column);
    for ((module, part), &label) in modules.into_iter().zip(parts).zip(labels) {
        let (Some(module), Some(part), 1) = (module, part, label) else {
            continue;
        };
        let counts = per_module.entry(module).or_default();
        match counts.iter_mut().find(|c| c.key == part) {
            Some(c) => c.error_count += 1,
            None => counts.push(GroupCount { key: part, error_count: 1 }),
        }
    }

    for counts in per_module.values_mut() {
        counts.sort_by(|a, b| b.error_count.cmp(&a.error_count));
        counts.truncate(TOP_N);
    }
    per_module
}

use std::path::Path;

use log::{debug, info, warn};

use super::clean::DateOrder;
use super::loader::{read_table, Cell, RawTable, SheetOptions};
use super::model::{CustomerRecord, CustomerTable, ParseWarning, WarningKind};
use crate::error::{LoadError, LoadResult};

pub const HEADER_ROW: usize = 4;
pub const NAME_COLUMN: &str = "Name";
pub const CONTRACT_TYPE_COLUMN: &str = "Kontrakttype";
pub const START_DATE_COLUMN: &str = "Start Dato";
/// Case-insensitive substring identifying revenue columns.
pub const REVENUE_PATTERN: &str = "indtjening";
/// Preferred revenue column when several match [`REVENUE_PATTERN`].
pub const REVENUE_COLUMN: &str = "Indtjening";
pub const SUBSCRIPTION_COLUMN: &str = "Indtjening på abonnement (pr. år)";
pub const FEE_COLUMN: &str = "indtjening gebyr/i alt";

/// Layout of the customer export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomerLoadOptions {
    pub header_row: usize,
    /// Only used when the export is delimited text.
    pub delimiter: u8,
}

impl Default for CustomerLoadOptions {
    fn default() -> Self {
        Self {
            header_row: HEADER_ROW,
            delimiter: b';',
        }
    }
}

/// Pick the total-revenue column: the exact [`REVENUE_COLUMN`] if present,
/// else the first header containing [`REVENUE_PATTERN`] in any case.
pub fn resolve_revenue_column(headers: &[String]) -> Option<&str> {
    let candidates: Vec<&str> = headers
        .iter()
        .map(String::as_str)
        .filter(|h| h.to_lowercase().contains(REVENUE_PATTERN))
        .collect();
    debug!("revenue column candidates: {candidates:?}");

    candidates
        .iter()
        .copied()
        .find(|h| *h == REVENUE_COLUMN)
        .or_else(|| candidates.first().copied())
}

static EMPTY: Cell = Cell::Empty;

/// Column positions; `None` when the header exists but the column was
/// dropped for having no values.
struct Columns {
    name: Option<usize>,
    contract_type: Option<usize>,
    start_date: Option<usize>,
    revenue: usize,
    subscription: Option<usize>,
    fee: Option<usize>,
}

impl Columns {
    /// Locate every required column before any row is touched.
    fn resolve(path: &Path, raw: &RawTable) -> LoadResult<Self> {
        let revenue_name = resolve_revenue_column(&raw.headers)
            .ok_or_else(|| LoadError::missing_column(path, format!("matching '{REVENUE_PATTERN}'")))?;
        let revenue = raw
            .column(revenue_name)
            .ok_or_else(|| LoadError::missing_column(path, format!("'{revenue_name}'")))?;

        let find = |name: &str| -> LoadResult<Option<usize>> {
            match raw.column(name) {
                Some(idx) => Ok(Some(idx)),
                None if raw.was_dropped(name) => {
                    debug!("{}: column '{name}' is empty", path.display());
                    Ok(None)
                }
                None => Err(LoadError::missing_column(path, format!("'{name}'"))),
            }
        };

        Ok(Columns {
            name: find(NAME_COLUMN)?,
            contract_type: find(CONTRACT_TYPE_COLUMN)?,
            start_date: find(START_DATE_COLUMN)?,
            revenue,
            subscription: find(SUBSCRIPTION_COLUMN)?,
            fee: find(FEE_COLUMN)?,
        })
    }
}

/// Load and clean the customer export.
///
/// Monetary cells that fail to parse become `None` and are reported in
/// [`CustomerTable::warnings`]; rows left without a name or total revenue
/// are dropped. Fails only when the file cannot be read or a required
/// column is missing.
pub fn load_customers(path: &Path, options: &CustomerLoadOptions) -> LoadResult<CustomerTable> {
    let raw = read_table(
        path,
        &SheetOptions {
            header_row: options.header_row,
            delimiter: options.delimiter,
        },
    )?;
    let table = clean_customers(path, &raw)?;

    if !table.warnings.is_empty() {
        warn!(
            "{}: {} cells could not be parsed and were treated as missing",
            path.display(),
            table.warnings.len()
        );
    }
    info!(
        "Loaded {} customers from {} (revenue column '{}')",
        table.len(),
        path.display(),
        table.revenue_column
    );
    Ok(table)
}

/// Turn a raw table into customer records.
pub fn clean_customers(path: &Path, raw: &RawTable) -> LoadResult<CustomerTable> {
    let cols = Columns::resolve(path, raw)?;
    let revenue_column = raw.headers[cols.revenue].clone();

    let mut records = Vec::with_capacity(raw.len());
    let mut warnings = Vec::new();
    let mut dropped = 0usize;

    for (row_no, row) in raw.rows.iter().enumerate() {
        let cell = |col: Option<usize>| cell_at(row, col);

        let mut number = |col: Option<usize>, column: &str| -> Option<f64> {
            let value = cell(col).number();
            if value.is_none() {
                note_failure(&mut warnings, row_no, column, cell(col), WarningKind::Number);
            }
            value
        };
        let total_revenue = number(Some(cols.revenue), &revenue_column);
        let subscription_revenue = number(cols.subscription, SUBSCRIPTION_COLUMN);
        let fee_revenue = number(cols.fee, FEE_COLUMN);

        let start_date = cell(cols.start_date).date(DateOrder::MonthFirst);
        if start_date.is_none() {
            note_failure(
                &mut warnings,
                row_no,
                START_DATE_COLUMN,
                cell(cols.start_date),
                WarningKind::Date,
            );
        }

        let (Some(name), Some(total_revenue)) = (cell(cols.name).text(), total_revenue) else {
            dropped += 1;
            continue;
        };

        records.push(CustomerRecord::new(
            name,
            cell(cols.contract_type).text(),
            start_date,
            total_revenue,
            subscription_revenue,
            fee_revenue,
        ));
    }

    if dropped > 0 {
        debug!("{}: dropped {dropped} rows without name or revenue", path.display());
    }

    Ok(CustomerTable {
        records,
        revenue_column,
        subscription_column: SUBSCRIPTION_COLUMN.to_string(),
        fee_column: FEE_COLUMN.to_string(),
        warnings,
    })
}

fn cell_at(row: &[Cell], col: Option<usize>) -> &Cell {
    col.map_or(&EMPTY, |c| &row[c])
}

/// Record a warning when a non-empty cell did not parse.
pub(crate) fn note_failure(
    warnings: &mut Vec<ParseWarning>,
    row: usize,
    column: &str,
    cell: &Cell,
    kind: WarningKind,
) {
    if let Some(value) = cell.text() {
        warnings.push(ParseWarning {
            row,
            column: column.to_string(),
            value,
            kind,
        });
    }
}

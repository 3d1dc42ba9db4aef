use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use log::{debug, info, warn};

use super::clean::DateOrder;
use super::customers::note_failure;
use super::loader::{read_table, RawTable, SheetOptions};
use super::model::{FeeRecord, FeeTable, OrganizerTotal, ParseWarning, WarningKind};
use crate::error::{LoadError, LoadResult};

pub const HEADER_ROW: usize = 2;
pub const DELIMITER: u8 = b';';
pub const PERIOD_START_COLUMN: &str = "Periode start";
pub const FEE_COLUMN: &str = "Vores gebyr";
pub const ORGANIZER_COLUMN: &str = "Arrangør";
pub const TOP_ORGANIZERS: usize = 25;

/// Layout of the fee export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeLoadOptions {
    pub header_row: usize,
    pub delimiter: u8,
    /// Size of the top organizer set.
    pub top_organizers: usize,
}

impl Default for FeeLoadOptions {
    fn default() -> Self {
        Self {
            header_row: HEADER_ROW,
            delimiter: DELIMITER,
            top_organizers: TOP_ORGANIZERS,
        }
    }
}

/// Load and clean the fee export, then rank organizers by total fee.
///
/// Rows whose period start or fee does not parse are left out entirely.
pub fn load_fees(path: &Path, options: &FeeLoadOptions) -> LoadResult<FeeTable> {
    let raw = read_table(
        path,
        &SheetOptions {
            header_row: options.header_row,
            delimiter: options.delimiter,
        },
    )?;
    let (records, warnings) = clean_fees(path, &raw)?;
    let dropped = raw.len() - records.len();

    let top_organizers = rank_organizers(&records, options.top_organizers);
    let members: HashSet<&str> = top_organizers.iter().map(|t| t.organizer.as_str()).collect();
    let top25: Vec<FeeRecord> = records
        .iter()
        .filter(|r| members.contains(r.organizer.as_str()))
        .cloned()
        .collect();

    if dropped > 0 {
        warn!(
            "{}: skipped {dropped} rows without a valid period start or fee",
            path.display()
        );
    }
    info!(
        "Loaded {} fee rows for {} organizers from {}",
        records.len(),
        records.iter().map(|r| r.organizer.as_str()).collect::<HashSet<_>>().len(),
        path.display()
    );

    Ok(FeeTable {
        records,
        top_organizers,
        top25,
        warnings,
    })
}

fn clean_fees(path: &Path, raw: &RawTable) -> LoadResult<(Vec<FeeRecord>, Vec<ParseWarning>)> {
    // `None` when the header is there but every cell below it is blank.
    let find = |name: &str| -> LoadResult<Option<usize>> {
        match raw.column(name) {
            Some(idx) => Ok(Some(idx)),
            None if raw.was_dropped(name) => Ok(None),
            None => Err(LoadError::missing_column(path, format!("'{name}'"))),
        }
    };
    let period_col = find(PERIOD_START_COLUMN)?;
    let fee_col = find(FEE_COLUMN)?;
    let organizer_col = find(ORGANIZER_COLUMN)?;

    let (Some(period_col), Some(fee_col)) = (period_col, fee_col) else {
        debug!("{}: no period starts or fees at all", path.display());
        return Ok((Vec::new(), Vec::new()));
    };

    let mut records = Vec::with_capacity(raw.len());
    let mut warnings = Vec::new();

    for (row_no, row) in raw.rows.iter().enumerate() {
        let period_cell = &row[period_col];
        let period_start = period_cell.date(DateOrder::MonthFirst);
        if period_start.is_none() {
            note_failure(&mut warnings, row_no, PERIOD_START_COLUMN, period_cell, WarningKind::Date);
        }

        let fee_cell = &row[fee_col];
        let fee_amount = fee_cell.number();
        if fee_amount.is_none() {
            note_failure(&mut warnings, row_no, FEE_COLUMN, fee_cell, WarningKind::Number);
        }

        let (Some(period_start), Some(fee_amount)) = (period_start, fee_amount) else {
            continue;
        };
        let organizer = organizer_col
            .and_then(|c| row[c].text())
            .unwrap_or_default();
        records.push(FeeRecord::new(organizer, period_start, fee_amount));
    }

    Ok((records, warnings))
}

/// The `n` organizers with the largest summed fee, largest first.
///
/// Groups are visited in ascending organizer order and the sort is stable,
/// so equal totals keep that order. Blank organizers are not ranked.
pub fn rank_organizers(records: &[FeeRecord], n: usize) -> Vec<OrganizerTotal> {
    let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
    for rec in records.iter().filter(|r| !r.organizer.is_empty()) {
        *sums.entry(rec.organizer.as_str()).or_insert(0.0) += rec.fee_amount;
    }

    let mut ranked: Vec<OrganizerTotal> = sums
        .into_iter()
        .map(|(organizer, total)| OrganizerTotal {
            organizer: organizer.to_string(),
            total,
        })
        .collect();
    ranked.sort_by(|a, b| b.total.total_cmp(&a.total));
    ranked.truncate(n);
    debug!("top organizers: {:?}", ranked.iter().map(|t| &t.organizer).collect::<Vec<_>>());
    ranked
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::NaiveDate;

    use super::*;

    fn export(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Gebyr omsætning og deltager opgørelse pr år;;;").unwrap();
        writeln!(file, "Periode: alle;;;").unwrap();
        writeln!(file, "Arrangør;Periode start;Deltagere;Vores gebyr").unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn load(file: &tempfile::NamedTempFile) -> FeeTable {
        load_fees(file.path(), &FeeLoadOptions::default()).unwrap()
    }

    fn rec(organizer: &str, year: i32, fee: f64) -> FeeRecord {
        FeeRecord::new(
            organizer.to_string(),
            NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
            fee,
        )
    }

    #[test]
    fn fee_row_scenario() {
        let file = export(&["X;2022-03-01;12;250"]);
        let table = load(&file);
        assert_eq!(table.len(), 1);
        let x = &table.records[0];
        assert_eq!(x.organizer, "X");
        assert_eq!(x.year, 2022);
        assert_eq!(x.fee_amount, 250.0);
        assert_eq!(x.period_start, NaiveDate::from_ymd_opt(2022, 3, 1).unwrap());
    }

    #[test]
    fn unparseable_rows_are_excluded() {
        let file = export(&[
            "A;2022-03-01;1;100",
            "B;ukendt;1;100",
            "C;2022-03-01;1;-",
            "D;;1;",
            "E;03/01/2021;1;1.250,50",
        ]);
        let table = load(&file);
        let organizers: Vec<&str> = table.records.iter().map(|r| r.organizer.as_str()).collect();
        assert_eq!(organizers, vec!["A", "E"]);

        let e = &table.records[1];
        assert_eq!(e.period_start, NaiveDate::from_ymd_opt(2021, 3, 1).unwrap());
        assert_eq!(e.fee_amount, 1250.5);
        assert_eq!(table.warnings.len(), 2);
    }

    #[test]
    fn missing_fee_column_is_a_schema_error() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "x\ny\nArrangør;Periode start\nA;2022-01-01").unwrap();
        file.flush().unwrap();
        let err = load_fees(file.path(), &FeeLoadOptions::default()).unwrap_err();
        assert!(err.is_schema_error());
        assert!(err.to_string().contains(FEE_COLUMN));
    }

    #[test]
    fn ranking_sums_across_years() {
        let records = vec![
            rec("Lystrup", 2020, 100.0),
            rec("Aarhus", 2020, 150.0),
            rec("Lystrup", 2021, 100.0),
            rec("Viby", 2021, 50.0),
        ];
        let ranked = rank_organizers(&records, 2);
        assert_eq!(
            ranked,
            vec![
                OrganizerTotal { organizer: "Lystrup".into(), total: 200.0 },
                OrganizerTotal { organizer: "Aarhus".into(), total: 150.0 },
            ]
        );
    }

    #[test]
    fn ranking_ties_follow_organizer_order() {
        let records = vec![rec("Zeta", 2020, 10.0), rec("Alfa", 2020, 10.0), rec("Mid", 2020, 10.0)];
        let names: Vec<String> = rank_organizers(&records, 2).into_iter().map(|t| t.organizer).collect();
        assert_eq!(names, vec!["Alfa", "Mid"]);
    }

    #[test]
    fn blank_organizers_are_not_ranked() {
        let records = vec![rec("", 2020, 1000.0), rec("A", 2020, 1.0)];
        let ranked = rank_organizers(&records, 25);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].organizer, "A");
    }

    #[test]
    fn top_set_is_bounded_and_dominates_the_rest() {
        let rows: Vec<String> = (0..40)
            .map(|i| format!("Org{i:02};2021-06-01;1;{}", (i * 37) % 101))
            .collect();
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let table = load(&export(&refs));

        assert_eq!(table.top_organizers.len(), TOP_ORGANIZERS);
        let min_member = table
            .top_organizers
            .iter()
            .map(|t| t.total)
            .fold(f64::INFINITY, f64::min);
        for rec in &table.records {
            if !table.is_top_organizer(&rec.organizer) {
                assert!(rec.fee_amount <= min_member);
            }
        }
        assert!(table.top25.iter().all(|r| table.is_top_organizer(&r.organizer)));
        assert_eq!(table.top25.len(), TOP_ORGANIZERS);
    }
}

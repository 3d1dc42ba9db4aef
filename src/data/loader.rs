use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use log::debug;

use super::clean::{parse_date, parse_locale_number, DateOrder};
use crate::error::{LoadError, LoadResult};

// ---------------------------------------------------------------------------
// Cell – one raw value from a sheet or delimited file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    fn from_text(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Display form, `None` for empty cells.
    pub fn text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => Some(format!("{v:.0}")),
            Cell::Number(v) => Some(v.to_string()),
            Cell::Date(d) => Some(d.to_string()),
        }
    }

    /// Numeric value; text goes through [`parse_locale_number`].
    pub fn number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(s) => parse_locale_number(s),
            Cell::Empty | Cell::Date(_) => None,
        }
    }

    /// Date value; text goes through [`parse_date`].
    pub fn date(&self, order: DateOrder) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Text(s) => parse_date(s, order),
            Cell::Empty | Cell::Number(_) => None,
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) | Data::DurationIso(s) => Cell::from_text(s),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(ts) => Cell::Date(ts.date()),
                None => Cell::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) => match parse_date(s, DateOrder::MonthFirst) {
                Some(d) => Cell::Date(d),
                None => Cell::from_text(s),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// RawTable – header + rows, before any domain cleaning
// ---------------------------------------------------------------------------

/// Where the header sits and how delimited text is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetOptions {
    /// 0-based index of the header row; earlier rows are skipped.
    pub header_row: usize,
    /// Field separator for delimited text. Ignored for spreadsheets.
    pub delimiter: u8,
}

/// A header row and the data rows below it, every row padded to the header
/// width, with all-empty columns already removed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Headers of the columns removed for having no values.
    pub dropped_columns: Vec<String>,
}

impl RawTable {
    /// Build from a grid of rows, taking `header_row` as the header.
    pub fn from_grid(path: &Path, mut grid: Vec<Vec<Cell>>, header_row: usize) -> LoadResult<Self> {
        if header_row >= grid.len() {
            return Err(LoadError::MissingHeader {
                path: path.to_path_buf(),
                row: header_row,
            });
        }
        let data = grid.split_off(header_row + 1);
        let header_cells = grid.pop().unwrap_or_default();

        let width = data
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(header_cells.len()))
            .max()
            .unwrap_or(0);

        let headers = header_names(&header_cells, width);
        let rows: Vec<Vec<Cell>> = data
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();

        let mut table = RawTable {
            headers,
            rows,
            dropped_columns: Vec::new(),
        };
        table.drop_empty_columns();
        Ok(table)
    }

    /// Remove columns with no value in any data row.
    fn drop_empty_columns(&mut self) {
        let keep: Vec<bool> = (0..self.headers.len())
            .map(|col| self.rows.iter().any(|row| !row[col].is_empty()))
            .collect();

        self.dropped_columns = self
            .headers
            .iter()
            .zip(&keep)
            .filter(|(_, k)| !**k)
            .map(|(h, _)| h.clone())
            .collect();
        if !self.dropped_columns.is_empty() {
            debug!("dropping empty columns {:?}", self.dropped_columns);
        }

        let mut flags = keep.iter();
        self.headers.retain(|_| *flags.next().unwrap_or(&false));
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| *flags.next().unwrap_or(&false));
        }
    }

    /// Index of the column with exactly this header.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Whether a column with this header existed but had no values.
    pub fn was_dropped(&self, name: &str) -> bool {
        self.dropped_columns.iter().any(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Header labels with placeholders for blanks and `.N` suffixes on repeats.
fn header_names(cells: &[Cell], width: usize) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    (0..width)
        .map(|i| {
            let base = cells
                .get(i)
                .and_then(Cell::text)
                .unwrap_or_else(|| format!("Unnamed: {i}"));
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Read a raw table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xls` / `.ods` – first worksheet
/// * `.csv` / `.txt` – delimited text, separator from `options`
pub fn read_table(path: &Path, options: &SheetOptions) -> LoadResult<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let grid = match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path)?,
        "csv" | "txt" => read_delimited(path, options.delimiter)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };
    debug!("{}: {} raw rows", path.display(), grid.len());

    RawTable::from_grid(path, grid, options.header_row)
}

// ---------------------------------------------------------------------------
// Spreadsheet reader
// ---------------------------------------------------------------------------

/// Rows of the first worksheet, indexed from the top of the sheet.
fn read_workbook(path: &Path) -> LoadResult<Vec<Vec<Cell>>> {
    let mut workbook = open_workbook_auto(path).map_err(|source| LoadError::Workbook {
        path: path.to_path_buf(),
        source,
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::NoWorksheet {
            path: path.to_path_buf(),
        })?
        .map_err(|source| LoadError::Workbook {
            path: path.to_path_buf(),
            source,
        })?;

    // The range starts at the first used cell, not at A1.
    let (first_row, first_col) = range.start().unwrap_or((0, 0));
    let mut grid: Vec<Vec<Cell>> = vec![Vec::new(); first_row as usize];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; first_col as usize];
        cells.extend(row.iter().map(Cell::from));
        grid.push(cells);
    }
    Ok(grid)
}

// ---------------------------------------------------------------------------
// Delimited-text reader
// ---------------------------------------------------------------------------

/// Rows of a delimited text file. Blank lines are skipped.
fn read_delimited(path: &Path, delimiter: u8) -> LoadResult<Vec<Vec<Cell>>> {
    let bytes = std::fs::read(path).map_err(|e| LoadError::io(path, e))?;
    let text = decode_text(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut grid = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }
        grid.push(record.iter().map(Cell::from_text).collect());
    }
    Ok(grid)
}

/// UTF-8 (BOM stripped) when valid, otherwise Windows-1252.
fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            debug!("input is not UTF-8, decoding as Windows-1252");
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_file(suffix: &str, bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn opts(header_row: usize) -> SheetOptions {
        SheetOptions {
            header_row,
            delimiter: b';',
        }
    }

    #[test]
    fn skips_leading_rows_and_blank_lines() {
        let file = write_file(
            ".csv",
            "Rapport\n\nGenereret 2024\nA;B\n1;x\n\n2;y\n".as_bytes(),
        );
        let table = read_table(file.path(), &opts(2)).unwrap();
        assert_eq!(table.headers, vec!["A", "B"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1][1], Cell::Text("y".into()));
    }

    #[test]
    fn names_blank_and_duplicate_headers() {
        let file = write_file(".csv", b"A;;A;C\n1;2;3;4\n");
        let table = read_table(file.path(), &opts(0)).unwrap();
        assert_eq!(table.headers, vec!["A", "Unnamed: 1", "A.1", "C"]);
    }

    #[test]
    fn drops_columns_without_data() {
        let file = write_file(".csv", b"A;Empty;B\n1;;x\n2; ;y\n");
        let table = read_table(file.path(), &opts(0)).unwrap();
        assert_eq!(table.headers, vec!["A", "B"]);
        assert!(table.rows.iter().all(|r| r.len() == 2));
        assert_eq!(table.column("B"), Some(1));
        assert_eq!(table.column("Empty"), None);
        assert!(table.was_dropped("Empty"));
    }

    #[test]
    fn pads_short_rows() {
        let file = write_file(".csv", b"A;B;C\n1\n2;3;4\n");
        let table = read_table(file.path(), &opts(0)).unwrap();
        assert_eq!(table.rows[0], vec![Cell::Text("1".into()), Cell::Empty, Cell::Empty]);
    }

    #[test]
    fn decodes_windows_1252() {
        // "Arrangør" with ø as 0xF8
        let file = write_file(".csv", b"Arrang\xF8r;Gebyr\nAarhus;10\n");
        let table = read_table(file.path(), &opts(0)).unwrap();
        assert_eq!(table.headers[0], "Arrangør");
    }

    #[test]
    fn strips_utf8_bom() {
        let file = write_file(".csv", "\u{feff}Name;X\nA;1\n".as_bytes());
        let table = read_table(file.path(), &opts(0)).unwrap();
        assert_eq!(table.headers[0], "Name");
    }

    #[test]
    fn header_past_end_is_an_error() {
        let file = write_file(".csv", b"A;B\n");
        let err = read_table(file.path(), &opts(4)).unwrap_err();
        assert!(matches!(err, LoadError::MissingHeader { row: 4, .. }));
    }

    #[test]
    fn rejects_unknown_extension() {
        let file = write_file(".parquet", b"");
        let err = read_table(file.path(), &opts(0)).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(ext) if ext == "parquet"));
    }

    #[test]
    fn cell_conversions() {
        assert_eq!(Cell::Number(1500.0).text().as_deref(), Some("1500"));
        assert_eq!(Cell::Number(12.5).number(), Some(12.5));
        assert_eq!(Cell::Text("1.500,00".into()).number(), Some(1500.0));
        assert_eq!(Cell::Empty.number(), None);
        assert_eq!(
            Cell::Text("2021-06-30".into()).date(DateOrder::MonthFirst),
            NaiveDate::from_ymd_opt(2021, 6, 30)
        );
    }
}

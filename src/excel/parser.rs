use std::collections::HashMap;
use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::{Duration, NaiveDate};
use derive_more::Display;

use crate::error::AppError;

/// Why a whole upload was refused before any row was looked at.
#[derive(Debug, Display, PartialEq)]
pub enum SheetError {
    #[display(fmt = "file is not a readable spreadsheet: {}", _0)]
    Unreadable(String),
    #[display(fmt = "spreadsheet has no worksheets")]
    NoWorksheet,
    #[display(fmt = "spreadsheet contains no data rows")]
    NoDataRows,
}

impl From<SheetError> for AppError {
    fn from(e: SheetError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

/// A single cell, reduced to the shapes the import cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(trimmed.to_string())
                }
            }
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
                .map(Cell::Date)
                .unwrap_or(Cell::Number(dt.as_f64())),
            Data::Error(e) => Cell::Text(format!("{:?}", e)),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Text rendering; whole numbers lose their trailing `.0`.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Numeric value, or zero when the cell is blank, not a number or not
    /// finite (`NaN` and `inf` parse as floats but cannot be stored).
    pub fn as_f64(&self) -> f64 {
        let value = match self {
            Cell::Number(n) => *n,
            Cell::Text(s) => s.trim().parse().unwrap_or(0.0),
            Cell::Empty | Cell::Date(_) => 0.0,
        };
        if value.is_finite() { value } else { 0.0 }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Cell::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

// Excel's day zero is 1899-12-30 once the 1900 leap-year bug is accounted for.
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// One data row of the uploaded sheet, addressed by header name.
#[derive(Debug, Clone)]
pub struct ImportRow {
    /// Line number as shown in the spreadsheet (the header is line 1).
    pub row: u32,
    cells: HashMap<String, Cell>,
}

impl ImportRow {
    pub fn cell(&self, column: &str) -> &Cell {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }

    /// First non-empty cell among alternative spellings of one column.
    pub fn any_of(&self, columns: &[&str]) -> &Cell {
        columns
            .iter()
            .map(|column| self.cell(column))
            .find(|cell| !cell.is_empty())
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn text(&self, column: &str) -> String {
        self.cell(column).as_text()
    }

    pub fn number(&self, column: &str) -> f64 {
        self.cell(column).as_f64()
    }

    fn is_blank(&self) -> bool {
        self.cells.values().all(Cell::is_empty)
    }
}

/// Reads the first worksheet of an `.xlsx`/`.xls` upload. The first non-empty
/// line is the header; every later line becomes an [`ImportRow`] unless it is
/// entirely blank.
pub fn parse_rows(bytes: &[u8]) -> Result<Vec<ImportRow>, SheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| SheetError::Unreadable(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(SheetError::NoWorksheet)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| SheetError::Unreadable(e.to_string()))?;

    // Zero-based sheet line of the header.
    let first_line = range.start().map(|(row, _)| row).unwrap_or(0);

    let mut lines = range.rows();
    let header: Vec<String> = match lines.next() {
        Some(cells) => cells
            .iter()
            .map(|c| Cell::from_data(c).as_text().trim().to_string())
            .collect(),
        None => return Err(SheetError::NoDataRows),
    };

    let mut rows = Vec::new();
    for (offset, line) in lines.enumerate() {
        let cells = header
            .iter()
            .zip(line.iter())
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, data)| (name.clone(), Cell::from_data(data)))
            .collect();

        let row = ImportRow {
            // header is at first_line + 1 (one-based), data starts right after
            row: first_line + offset as u32 + 2,
            cells,
        };

        if !row.is_blank() {
            rows.push(row);
        }
    }

    if rows.is_empty() {
        return Err(SheetError::NoDataRows);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::fixtures::{SheetValue::*, workbook};
    use crate::excel::{COL_BASE, COL_NAME, COL_YEAR_MONTH};

    #[test]
    fn garbage_bytes_are_unreadable() {
        let err = parse_rows(b"definitely not a workbook").unwrap_err();
        assert!(matches!(err, SheetError::Unreadable(_)));
    }

    #[test]
    fn header_only_sheet_has_no_data_rows() {
        let bytes = workbook(&[COL_NAME, COL_YEAR_MONTH], &[]);
        assert_eq!(parse_rows(&bytes).unwrap_err(), SheetError::NoDataRows);
    }

    #[test]
    fn cells_are_addressed_by_header() {
        let bytes = workbook(
            &[COL_NAME, COL_YEAR_MONTH, COL_BASE],
            &[vec![Str("张三"), Str("2024年01月"), Num(5000.0)]],
        );

        let rows = parse_rows(&bytes).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row, 2);
        assert_eq!(rows[0].text(COL_NAME), "张三");
        assert_eq!(rows[0].text(COL_YEAR_MONTH), "2024年01月");
        assert_eq!(rows[0].number(COL_BASE), 5000.0);
        assert!(rows[0].cell("不存在的列").is_empty());
    }

    #[test]
    fn blank_lines_are_skipped_but_keep_line_numbers() {
        let bytes = workbook(
            &[COL_NAME, COL_BASE],
            &[
                vec![Str("张三"), Num(1.0)],
                vec![Blank, Blank],
                vec![Str("李四"), Str("abc")],
            ],
        );

        let rows = parse_rows(&bytes).unwrap();
        let lines: Vec<u32> = rows.iter().map(|r| r.row).collect();
        assert_eq!(lines, vec![2, 4]);
        assert_eq!(rows[1].number(COL_BASE), 0.0);
    }

    #[test]
    fn whole_numbers_render_without_fraction() {
        assert_eq!(Cell::Number(2024.0).as_text(), "2024");
        assert_eq!(Cell::Number(12.5).as_text(), "12.5");
        assert_eq!(Cell::Text(" 7 ".into()).as_integer(), Some(7));
        assert_eq!(Cell::Number(7.5).as_integer(), None);
    }

    #[test]
    fn non_finite_values_read_as_zero() {
        assert_eq!(Cell::Text("NaN".into()).as_f64(), 0.0);
        assert_eq!(Cell::Text("inf".into()).as_f64(), 0.0);
        assert_eq!(Cell::Text("-infinity".into()).as_f64(), 0.0);
        assert_eq!(Cell::Number(f64::NAN).as_f64(), 0.0);
        assert_eq!(Cell::Text(" 1e3 ".into()).as_f64(), 1000.0);
    }

    #[test]
    fn excel_serials_map_to_calendar_dates() {
        assert_eq!(
            excel_serial_to_date(45322.0),
            NaiveDate::from_ymd_opt(2024, 1, 31)
        );
    }
}

//! In-memory workbooks for tests.

use rust_xlsxwriter::Workbook;

pub enum SheetValue {
    Str(&'static str),
    Num(f64),
    Blank,
}

pub fn workbook(header: &[&str], rows: &[Vec<SheetValue>]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, name) in header.iter().enumerate() {
        worksheet.write_string(0, col as u16, *name).unwrap();
    }

    for (idx, row) in rows.iter().enumerate() {
        let line = idx as u32 + 1;
        for (col, value) in row.iter().enumerate() {
            match value {
                SheetValue::Str(s) => {
                    worksheet.write_string(line, col as u16, *s).unwrap();
                }
                SheetValue::Num(n) => {
                    worksheet.write_number(line, col as u16, *n).unwrap();
                }
                SheetValue::Blank => {}
            }
        }
    }

    workbook.save_to_buffer().unwrap()
}

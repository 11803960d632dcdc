use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use super::SHEET_COLUMNS;
use crate::model::salary::SalaryWithEmployee;

const TEMPLATE_SHEET: &str = "工资数据模板";
const EXPORT_SHEET: &str = "工资数据";

// Same order as SHEET_COLUMNS.
const COLUMN_WIDTHS: [f64; 18] = [
    10.0, 12.0, 12.0, 10.0, 10.0, 10.0, 10.0, 8.0, 8.0, 12.0, 14.0, 14.0, 10.0, 8.0, 8.0, 8.0,
    12.0, 10.0,
];

enum SheetCell {
    Text(String),
    Number(f64),
}

/// Blank import template: header plus one filled-in example row.
pub fn salary_template() -> Result<Vec<u8>, XlsxError> {
    let sample = vec![
        SheetCell::Text("张三".into()),
        SheetCell::Text("2024年01月".into()),
        SheetCell::Text("全职".into()),
        SheetCell::Text("正常".into()),
        SheetCell::Number(5000.0),
        SheetCell::Number(2000.0),
        SheetCell::Number(1500.0),
        SheetCell::Number(200.0),
        SheetCell::Number(100.0),
        SheetCell::Number(10.0),
        SheetCell::Number(8.0),
        SheetCell::Number(4.0),
        SheetCell::Number(500.0),
        SheetCell::Number(1000.0),
        SheetCell::Number(300.0),
        SheetCell::Number(200.0),
        SheetCell::Text("2024-01-31".into()),
        SheetCell::Text("示例数据".into()),
    ];

    write_workbook(TEMPLATE_SHEET, &[sample])
}

/// Stored salary records in the import layout, so an edited export can be
/// uploaded again as-is.
pub fn export_salaries(records: &[SalaryWithEmployee]) -> Result<Vec<u8>, XlsxError> {
    let rows: Vec<Vec<SheetCell>> = records
        .iter()
        .map(|r| {
            let s = &r.record;
            vec![
                SheetCell::Text(r.name.clone()),
                SheetCell::Text(format!("{}年{:02}月", s.year, s.month)),
                SheetCell::Text(s.work_time_type.clone()),
                SheetCell::Text(s.attendance_status.clone()),
                SheetCell::Number(s.base_salary),
                SheetCell::Number(s.position_salary),
                SheetCell::Number(s.performance_salary),
                SheetCell::Number(s.full_time),
                SheetCell::Number(s.other),
                SheetCell::Number(s.weekday_overtime_hours),
                SheetCell::Number(s.weekend_overtime_hours),
                SheetCell::Number(s.holiday_overtime_hours),
                SheetCell::Number(s.overtime_pay),
                SheetCell::Number(s.bonus),
                SheetCell::Number(s.allowance),
                SheetCell::Number(s.deduction),
                SheetCell::Text(s.payment_date.format("%Y-%m-%d").to_string()),
                SheetCell::Text(s.remarks.clone()),
            ]
        })
        .collect();

    write_workbook(EXPORT_SHEET, &rows)
}

fn write_workbook(sheet_name: &str, rows: &[Vec<SheetCell>]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    write_header(worksheet)?;

    for (idx, row) in rows.iter().enumerate() {
        let line = idx as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                // empty strings would still create a cell; leave them blank
                SheetCell::Text(s) if s.is_empty() => {}
                SheetCell::Text(s) => {
                    worksheet.write_string(line, col as u16, s.as_str())?;
                }
                SheetCell::Number(n) => {
                    worksheet.write_number(line, col as u16, *n)?;
                }
            }
        }
    }

    workbook.save_to_buffer()
}

fn write_header(worksheet: &mut Worksheet) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();

    for (col, (name, width)) in SHEET_COLUMNS.iter().zip(COLUMN_WIDTHS).enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &bold)?;
        worksheet.set_column_width(col as u16, width)?;
    }

    Ok(())
}

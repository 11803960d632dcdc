//! Salary spreadsheet import and export, plus the employee roster import.
//!
//! The column names are the ones payroll staff already use in their monthly
//! sheets; the template, the export and the parser share them.

pub mod employee_import;
pub mod parser;
pub mod reconcile;
pub mod template;

pub const COL_NAME: &str = "姓名";
pub const COL_YEAR_MONTH: &str = "年月";
pub const COL_YEAR: &str = "年份";
pub const COL_MONTH: &str = "月份";
pub const COL_WORK_TIME_TYPE: &str = "工作时间类型";
pub const COL_ATTENDANCE: &str = "考勤情况";
pub const COL_BASE: &str = "基础工资";
pub const COL_POSITION: &str = "岗位工资";
pub const COL_PERFORMANCE: &str = "绩效工资";
pub const COL_FULL_TIME: &str = "全勤";
pub const COL_OTHER: &str = "其他";
pub const COL_WEEKDAY_HOURS: &str = "平日累计时间";
pub const COL_WEEKEND_HOURS: &str = "双休日累计时间";
pub const COL_HOLIDAY_HOURS: &str = "法定节日累计时间";
pub const COL_OVERTIME_PAY: &str = "加班费";
pub const COL_BONUS: &str = "奖金";
pub const COL_ALLOWANCE: &str = "津贴";
pub const COL_DEDUCTION: &str = "扣除";
pub const COL_PAYMENT_DATE: &str = "发放日期";
pub const COL_REMARKS: &str = "备注";

/// Header row written by the template and the export, in order.
pub const SHEET_COLUMNS: [&str; 18] = [
    COL_NAME,
    COL_YEAR_MONTH,
    COL_WORK_TIME_TYPE,
    COL_ATTENDANCE,
    COL_BASE,
    COL_POSITION,
    COL_PERFORMANCE,
    COL_FULL_TIME,
    COL_OTHER,
    COL_WEEKDAY_HOURS,
    COL_WEEKEND_HOURS,
    COL_HOLIDAY_HOURS,
    COL_OVERTIME_PAY,
    COL_BONUS,
    COL_ALLOWANCE,
    COL_DEDUCTION,
    COL_PAYMENT_DATE,
    COL_REMARKS,
];

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[cfg(test)]
pub(crate) mod fixtures;

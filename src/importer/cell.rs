// ==========================================
// 轮胎厂生产 KPI 系统 - 原始单元格网格
// ==========================================
// 职责: 工作表读取后的无类型二维表，仅在表头识别与行解析期间存在
// ==========================================

use chrono::{Days, NaiveDate};

/// Excel 序列日期的零点（兼容 1900 闰年错误）
fn excel_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

/// Excel 序列值 → 日期（只取整数部分）
///
/// 合法范围 1 ..= 2958465（9999-12-31）
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    excel_epoch()?.checked_add_days(Days::new(serial.floor() as u64))
}

// ==========================================
// RawCell - 无类型单元格
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(f64), // Excel 序列值
    Error(String),
}

impl RawCell {
    /// 文本单元格（空白文本视为空）
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 渲染为文本（已 TRIM）
    ///
    /// 整数值不带 `.0`，日序号表头读作 `1`、`2`…
    pub fn as_text(&self) -> String {
        match self {
            RawCell::Empty | RawCell::Error(_) => String::new(),
            RawCell::Text(s) => s.trim().to_string(),
            RawCell::Number(n) => format_number(*n),
            RawCell::Bool(b) => b.to_string(),
            RawCell::DateTime(serial) => match excel_serial_to_date(*serial) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => format_number(*serial),
            },
        }
    }

    /// 小写文本（表头打分用）
    pub fn as_lower_text(&self) -> String {
        self.as_text().to_lowercase()
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&calamine::Data> for RawCell {
    fn from(data: &calamine::Data) -> Self {
        use calamine::Data;
        match data {
            Data::Empty => RawCell::Empty,
            Data::String(s) => RawCell::text(s.clone()),
            Data::Float(f) => RawCell::Number(*f),
            Data::Int(i) => RawCell::Number(*i as f64),
            Data::Bool(b) => RawCell::Bool(*b),
            Data::DateTime(dt) => RawCell::DateTime(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::text(s.clone()),
            Data::Error(e) => RawCell::Error(format!("{:?}", e)),
        }
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        RawCell::text(value)
    }
}

static EMPTY_CELL: RawCell = RawCell::Empty;

/// 行内取单元格；越界视为空
pub fn cell_at(row: &[RawCell], col: usize) -> &RawCell {
    row.get(col).unwrap_or(&EMPTY_CELL)
}

// ==========================================
// RawGrid - 一个工作表的无类型二维表
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    rows: Vec<Vec<RawCell>>,
}

impl RawGrid {
    pub fn new(rows: Vec<Vec<RawCell>>) -> Self {
        Self { rows }
    }

    /// 由字符串行构造（CSV 与测试使用）
    pub fn from_text_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|s| RawCell::text(s.as_ref())).collect())
                .collect(),
        }
    }

    pub fn rows(&self) -> &[Vec<RawCell>] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> Option<&[RawCell]> {
        self.rows.get(idx).map(|r| r.as_slice())
    }

    /// 取单元格；越界视为空
    pub fn cell(&self, row: usize, col: usize) -> &RawCell {
        match self.rows.get(row) {
            Some(r) => cell_at(r, col),
            None => &EMPTY_CELL,
        }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.iter().all(|c| c.is_empty()))
    }
}

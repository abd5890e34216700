// ==========================================
// 轮胎厂生产 KPI 系统 - 单元格类型转换
// ==========================================
// 职责: 按列角色把无类型单元格转换为日期 / 计数 / 百分比
// 模式: 有序策略链，依次尝试，保留首个成功结果
// 策略:
// - 日期：整列优先匹配同一格式，否则逐格试解析；失败为缺失
// - 计数：去千分位，取前导数字；失败按 0
// - 百分比：去 %，取前导数字；失败为缺失；越界不截断
// ==========================================

use crate::importer::cell::{excel_serial_to_date, RawCell};
use chrono::{Datelike, NaiveDate};

// ==========================================
// CoercionStrategy Trait
// ==========================================
pub trait CoercionStrategy<T>: Send + Sync {
    /// 策略名称（日志/调试用）
    fn name(&self) -> &str;

    /// 尝试转换；不适用或失败返回 None
    fn coerce(&self, cell: &RawCell) -> Option<T>;
}

// ==========================================
// StrategyChain - 有序策略链
// ==========================================
pub struct StrategyChain<T> {
    strategies: Vec<Box<dyn CoercionStrategy<T>>>,
}

impl<T> Default for StrategyChain<T> {
    fn default() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }
}

impl<T> StrategyChain<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, strategy: impl CoercionStrategy<T> + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn push(&mut self, strategy: Box<dyn CoercionStrategy<T>>) {
        self.strategies.push(strategy);
    }

    pub fn coerce(&self, cell: &RawCell) -> Option<T> {
        self.coerce_traced(cell).map(|(value, _)| value)
    }

    /// 转换并返回命中的策略名
    pub fn coerce_traced(&self, cell: &RawCell) -> Option<(T, &str)> {
        if cell.is_empty() {
            return None;
        }
        self.strategies
            .iter()
            .find_map(|s| s.coerce(cell).map(|v| (v, s.name())))
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

// ==========================================
// 日期策略
// ==========================================

/// Excel 日期单元格 / 序列值
pub struct ExcelSerialDate;

impl CoercionStrategy<NaiveDate> for ExcelSerialDate {
    fn name(&self) -> &str {
        "excel_serial"
    }

    fn coerce(&self, cell: &RawCell) -> Option<NaiveDate> {
        match cell {
            RawCell::DateTime(serial) => excel_serial_to_date(*serial),
            // 纯数字只接受合理年份范围内的序列值（约 1927 ~ 2119）
            RawCell::Number(n) if (10_000.0..=80_000.0).contains(n) => excel_serial_to_date(*n),
            _ => None,
        }
    }
}

/// `YYYY-MM-DD` 开头的日期时间文本（如 `2025-03-01 00:00:00`）
pub struct IsoPrefixDate;

impl CoercionStrategy<NaiveDate> for IsoPrefixDate {
    fn name(&self) -> &str {
        "iso_prefix"
    }

    fn coerce(&self, cell: &RawCell) -> Option<NaiveDate> {
        let text = cell.as_text();
        let prefix = text.get(..10)?;
        if text.len() > 10 {
            let sep = text[10..].chars().next()?;
            if sep != ' ' && sep != 'T' {
                return None;
            }
        }
        NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
    }
}

/// 单一格式
pub struct FormatDate {
    format: String,
}

impl FormatDate {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    /// `%Y` 也接受两位年份；1900 年以前的结果视为未命中
    pub fn parse_text(&self, text: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(text.trim(), &self.format)
            .ok()
            .filter(|d| d.year() >= 1900)
    }
}

impl CoercionStrategy<NaiveDate> for FormatDate {
    fn name(&self) -> &str {
        &self.format
    }

    fn coerce(&self, cell: &RawCell) -> Option<NaiveDate> {
        match cell {
            RawCell::Text(_) | RawCell::Number(_) => self.parse_text(&cell.as_text()),
            _ => None,
        }
    }
}

/// 日期时间文本：取首个空白前的部分再按格式解析
pub struct LeadingTokenDate {
    formats: Vec<FormatDate>,
}

impl LeadingTokenDate {
    pub fn new(formats: &[String]) -> Self {
        Self {
            formats: formats.iter().map(FormatDate::new).collect(),
        }
    }
}

impl CoercionStrategy<NaiveDate> for LeadingTokenDate {
    fn name(&self) -> &str {
        "leading_token"
    }

    fn coerce(&self, cell: &RawCell) -> Option<NaiveDate> {
        let text = cell.as_text();
        let (head, rest) = text.split_once(char::is_whitespace)?;
        if rest.trim().is_empty() {
            return None;
        }
        self.formats.iter().find_map(|f| f.parse_text(head))
    }
}

// ==========================================
// DateParser - 日期列解析
// ==========================================
pub struct DateParser {
    formats: Vec<FormatDate>,
    chain: StrategyChain<NaiveDate>,
}

impl DateParser {
    pub fn new(formats: &[String]) -> Self {
        let mut chain = StrategyChain::new().with(ExcelSerialDate).with(IsoPrefixDate);
        for format in formats {
            chain.push(Box::new(FormatDate::new(format.clone())));
        }
        let chain = chain.with(LeadingTokenDate::new(formats));

        Self {
            formats: formats.iter().map(FormatDate::new).collect(),
            chain,
        }
    }

    /// 单个单元格（逐策略试解析）
    pub fn parse_cell(&self, cell: &RawCell) -> Option<NaiveDate> {
        self.chain.coerce(cell)
    }

    /// 整列解析
    ///
    /// 若某一格式能解析整列全部非空文本，则整列统一使用该格式
    /// （避免 01/03 与 03/01 在同一列中混用两种解读）；否则逐格回退
    pub fn parse_column(&self, cells: &[&RawCell]) -> Vec<Option<NaiveDate>> {
        let texts: Vec<String> = cells
            .iter()
            .filter(|c| matches!(c, RawCell::Text(_)) && !c.is_empty())
            .map(|c| c.as_text())
            .collect();

        let column_format = if texts.is_empty() {
            None
        } else {
            self.formats
                .iter()
                .find(|f| texts.iter().all(|t| f.parse_text(t).is_some()))
        };

        cells
            .iter()
            .map(|cell| match (cell, column_format) {
                (RawCell::Text(_), Some(format)) if !cell.is_empty() => {
                    format.parse_text(&cell.as_text())
                }
                _ => self.parse_cell(cell),
            })
            .collect()
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.chain.names()
    }
}

// ==========================================
// 数值策略
// ==========================================

/// 原生数值单元格
pub struct NativeNumber;

impl CoercionStrategy<f64> for NativeNumber {
    fn name(&self) -> &str {
        "native"
    }

    fn coerce(&self, cell: &RawCell) -> Option<f64> {
        match cell {
            RawCell::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }
}

/// 文本前导数字：去千分位（以及可选的 %），取 `[+-]?\d+(\.\d+)?`
pub struct LeadingNumber {
    strip_percent: bool,
}

impl LeadingNumber {
    pub fn counts() -> Self {
        Self {
            strip_percent: false,
        }
    }

    pub fn percentages() -> Self {
        Self {
            strip_percent: true,
        }
    }
}

impl CoercionStrategy<f64> for LeadingNumber {
    fn name(&self) -> &str {
        if self.strip_percent {
            "leading_number_pct"
        } else {
            "leading_number"
        }
    }

    fn coerce(&self, cell: &RawCell) -> Option<f64> {
        let RawCell::Text(text) = cell else {
            return None;
        };
        let cleaned: String = text
            .trim()
            .chars()
            .filter(|c| *c != ',' && !(self.strip_percent && *c == '%'))
            .collect();
        leading_numeric_token(cleaned.trim())
            .and_then(|t| t.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }
}

/// 提取前导数字片段
pub fn leading_numeric_token(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == int_start {
        return None;
    }
    if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    Some(&text[..end])
}

// ==========================================
// ValueCoercer - 计数 / 百分比 / 文本
// ==========================================
pub struct ValueCoercer {
    counts: StrategyChain<f64>,
    percentages: StrategyChain<f64>,
}

impl Default for ValueCoercer {
    fn default() -> Self {
        Self {
            counts: StrategyChain::new()
                .with(NativeNumber)
                .with(LeadingNumber::counts()),
            percentages: StrategyChain::new()
                .with(NativeNumber)
                .with(LeadingNumber::percentages()),
        }
    }
}

impl ValueCoercer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 计数列：无法解析按 0（未报告的缺陷数视为没有）
    pub fn count(&self, cell: &RawCell) -> f64 {
        self.counts.coerce(cell).unwrap_or(0.0)
    }

    /// 百分比列：无法解析为缺失，越界值原样保留
    pub fn percentage(&self, cell: &RawCell) -> Option<f64> {
        self.percentages.coerce(cell)
    }

    /// 文本标签（TRIM，空为 None）
    pub fn label(&self, cell: &RawCell) -> Option<String> {
        let text = cell.as_text();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::app_config::DEFAULT_DATE_FORMATS;

    fn parser() -> DateParser {
        let formats: Vec<String> = DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect();
        DateParser::new(&formats)
    }

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_parse_cell_variants() {
        let p = parser();
        assert_eq!(p.parse_cell(&RawCell::text("2025-03-01")), ymd(2025, 3, 1));
        assert_eq!(p.parse_cell(&RawCell::text("2025-03-01 00:00:00")), ymd(2025, 3, 1));
        assert_eq!(p.parse_cell(&RawCell::text("01/03/2025")), ymd(2025, 3, 1));
        assert_eq!(p.parse_cell(&RawCell::text("1-Mar-2025")), ymd(2025, 3, 1));
        assert_eq!(p.parse_cell(&RawCell::text("March 1, 2025")), ymd(2025, 3, 1));
        assert_eq!(p.parse_cell(&RawCell::text("01/03/2025 08:30")), ymd(2025, 3, 1));
        assert_eq!(p.parse_cell(&RawCell::text("01/03/25")), ymd(2025, 3, 1));
        assert_eq!(p.parse_cell(&RawCell::DateTime(45717.0)), ymd(2025, 3, 1));
        assert_eq!(p.parse_cell(&RawCell::Number(45717.0)), ymd(2025, 3, 1));
        assert_eq!(p.parse_cell(&RawCell::Number(20250301.0)), ymd(2025, 3, 1));
        assert_eq!(p.parse_cell(&RawCell::text("not a date")), None);
        assert_eq!(p.parse_cell(&RawCell::Empty), None);
    }

    #[test]
    fn test_parse_column_prefers_single_format() {
        let p = parser();
        // 13/03 只能是日在前，整列统一按 %d/%m/%Y 解读
        let cells = [
            RawCell::text("02/03/2025"),
            RawCell::text("13/03/2025"),
            RawCell::Empty,
        ];
        let refs: Vec<&RawCell> = cells.iter().collect();
        assert_eq!(
            p.parse_column(&refs),
            vec![ymd(2025, 3, 2), ymd(2025, 3, 13), None]
        );
    }

    #[test]
    fn test_parse_column_falls_back_per_cell() {
        let p = parser();
        let cells = [
            RawCell::text("2025-03-01"),
            RawCell::text("02/03/2025"),
            RawCell::text("garbage"),
        ];
        let refs: Vec<&RawCell> = cells.iter().collect();
        assert_eq!(
            p.parse_column(&refs),
            vec![ymd(2025, 3, 1), ymd(2025, 3, 2), None]
        );
    }

    #[test]
    fn test_count_coercion() {
        let c = ValueCoercer::new();
        assert_eq!(c.count(&RawCell::Number(42.0)), 42.0);
        assert_eq!(c.count(&RawCell::text("1,250")), 1250.0);
        assert_eq!(c.count(&RawCell::text("300 pcs")), 300.0);
        assert_eq!(c.count(&RawCell::text("-5")), -5.0);
        assert_eq!(c.count(&RawCell::text("n/a")), 0.0);
        assert_eq!(c.count(&RawCell::Empty), 0.0);
    }

    #[test]
    fn test_percentage_coercion_keeps_out_of_range() {
        let c = ValueCoercer::new();
        assert_eq!(c.percentage(&RawCell::text("85.5%")), Some(85.5));
        assert_eq!(c.percentage(&RawCell::Number(120.0)), Some(120.0));
        assert_eq!(c.percentage(&RawCell::text("-")), None);
        assert_eq!(c.percentage(&RawCell::Empty), None);
    }

    #[test]
    fn test_overflowing_digits_are_not_numbers() {
        let c = ValueCoercer::new();
        let huge = format!("1{}", "0".repeat(400));
        assert_eq!(LeadingNumber::counts().coerce(&RawCell::text(&huge)), None);
        assert_eq!(c.count(&RawCell::text(&huge)), 0.0);
        assert_eq!(c.percentage(&RawCell::text(&format!("{}%", huge))), None);
        assert_eq!(c.count(&RawCell::Number(f64::INFINITY)), 0.0);
    }

    #[test]
    fn test_leading_numeric_token() {
        assert_eq!(leading_numeric_token("12.5kg"), Some("12.5"));
        assert_eq!(leading_numeric_token("12."), Some("12"));
        assert_eq!(leading_numeric_token("+7"), Some("+7"));
        assert_eq!(leading_numeric_token("abc"), None);
        assert_eq!(leading_numeric_token("-"), None);
    }
}

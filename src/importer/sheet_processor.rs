// ==========================================
// 轮胎厂生产 KPI 系统 - 工作表处理器
// ==========================================
// 职责: 单个 RawGrid → 标准记录
// 流程:
// 1. 表头识别（未找到 → 跳过，记 Info）
// 2. 列名归一化（重复映射 → 告警）
// 3. 正文分类：元数据日期行 / 重复表头 / 空行 / 数据行
// 4. 必要列检查（块日期视为 date 列）
// 5. 按列角色转换类型，缺少 date/tyre_size 的行丢弃
// 版式: 单表 / 多块（Date: 元数据行）/ 宽表（每日一列）
// ==========================================

use crate::config::LoaderConfig;
use crate::domain::load_report::{IssueKind, LoadIssue, SheetLayout, SheetSummary};
use crate::domain::record::CanonicalRecord;
use crate::domain::types::{CanonicalColumn, Column, ColumnRole};
use crate::importer::cell::{cell_at, RawCell, RawGrid};
use crate::importer::coercion::{DateParser, ValueCoercer};
use crate::importer::column_normalizer::{ColumnNormalizer, NormalizedHeader};
use crate::importer::error::ImportResult;
use crate::importer::header_detector::HeaderDetector;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// 宽表至少需要的日序号列数
const MIN_DAY_COLUMNS: usize = 5;

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// 单个工作表的处理结果
#[derive(Debug, Default)]
pub struct SheetOutcome {
    pub records: Vec<CanonicalRecord>,
    pub summary: Option<SheetSummary>, // 工作表被跳过时为 None
    pub issues: Vec<LoadIssue>,
    pub rows_dropped: usize,
    pub rows_skipped: usize, // 重复表头行 + 合计行
}

/// 正文数据行 + 所属块日期
type BodyRow<'g> = (&'g [RawCell], Option<NaiveDate>);

/// 表头之后的正文
struct SheetBody<'g> {
    rows: Vec<BodyRow<'g>>,
    block_dates_seen: bool,
    headers_skipped: usize,
}

// ==========================================
// SheetProcessor
// ==========================================
pub struct SheetProcessor {
    config: LoaderConfig,
    detector: HeaderDetector,
    normalizer: ColumnNormalizer,
    dates: DateParser,
    values: ValueCoercer,
    summary_marker: Option<Regex>, // 无合计标记时为 None
}

impl SheetProcessor {
    pub fn new(config: LoaderConfig) -> ImportResult<Self> {
        Ok(Self {
            detector: HeaderDetector::from_config(&config),
            normalizer: ColumnNormalizer::standard()?,
            dates: DateParser::new(&config.date_formats),
            values: ValueCoercer::new(),
            summary_marker: summary_marker_regex(&config.summary_row_markers)?,
            config,
        })
    }

    pub fn detector(&self) -> &HeaderDetector {
        &self.detector
    }

    pub fn normalizer(&self) -> &ColumnNormalizer {
        &self.normalizer
    }

    /// 处理一个工作表
    pub fn process(&self, file: &str, sheet: &str, grid: &RawGrid) -> SheetOutcome {
        let mut outcome = SheetOutcome::default();
        let issue = |kind: IssueKind, message: String| {
            LoadIssue::new(kind, message).for_file(file).for_sheet(sheet)
        };

        // === 步骤 1: 表头识别 ===
        let Some(header_idx) = self.detector.detect(grid) else {
            debug!(file = %file, sheet = %sheet, "未找到表头，跳过工作表");
            outcome.issues.push(issue(
                IssueKind::NoHeaderFound,
                format!("没有任何行的关键字得分达到 {}", self.detector.min_score()),
            ));
            return outcome;
        };

        // === 步骤 2: 列名归一化 ===
        let headers: Vec<String> = grid
            .row(header_idx)
            .unwrap_or(&[])
            .iter()
            .map(|c| c.as_text())
            .collect();
        let normalized = self.normalizer.normalize(&headers);
        for dup in &normalized.duplicates {
            warn!(
                file = %file,
                sheet = %sheet,
                column = %dup.column,
                headers = ?dup.headers,
                "多个表头归一到同一标准列"
            );
            outcome.issues.push(issue(
                IssueKind::DuplicateColumn,
                format!(
                    "表头 {:?} 均归一为 {}，取最后一列（第 {} 列）",
                    dup.headers,
                    dup.column,
                    dup.positions.last().map(|p| p + 1).unwrap_or(0)
                ),
            ));
        }
        let positions = normalized.positions();

        // === 步骤 3: 正文分类 ===
        let body = self.split_body(grid, header_idx, &positions);
        let day_columns = day_columns(&normalized);
        let wide = positions.contains_key(&CanonicalColumn::TyreSize)
            && !positions.contains_key(&CanonicalColumn::Date)
            && !positions.contains_key(&CanonicalColumn::Quantity)
            && day_columns.len() >= MIN_DAY_COLUMNS;

        // === 步骤 4: 必要列检查 ===
        let mut present: BTreeSet<CanonicalColumn> = positions.keys().copied().collect();
        if body.block_dates_seen || wide {
            present.insert(CanonicalColumn::Date);
        }
        if wide {
            present.insert(CanonicalColumn::Quantity);
        }
        let overlap = self
            .config
            .essential_columns
            .iter()
            .filter(|c| present.contains(c))
            .count();
        if overlap < self.config.min_essential_overlap {
            debug!(file = %file, sheet = %sheet, overlap = overlap, "必要列不足，跳过工作表");
            outcome.issues.push(issue(
                IssueKind::MissingEssentialColumns,
                format!(
                    "仅命中 {} 个必要列（要求至少 {}），列: {:?}",
                    overlap,
                    self.config.min_essential_overlap,
                    normalized.names()
                ),
            ));
            return outcome;
        }

        // === 步骤 5: 构造记录 ===
        let layout = if wide {
            SheetLayout::WideMonthly
        } else if body.block_dates_seen {
            SheetLayout::Blocked
        } else {
            SheetLayout::Tabular
        };

        let built = if wide {
            let Some((year, month)) = body
                .rows
                .iter()
                .find_map(|(_, block)| *block)
                .map(|d| (d.year(), d.month()))
                .or_else(|| month_from_sheet_name(sheet))
            else {
                outcome.issues.push(issue(
                    IssueKind::MissingEssentialColumns,
                    "宽表无法确定所属月份（无块日期，工作表名也不含月份）".to_string(),
                ));
                return outcome;
            };
            self.melt_wide(file, &body.rows, &positions, &day_columns, (year, month))
        } else {
            self.build_rows(file, &body.rows, &normalized, &positions)
        };

        if built.derived_quantity {
            outcome.issues.push(issue(
                IssueKind::DerivedQuantity,
                "无产量列，产量按 A + B + R 推导".to_string(),
            ));
        }
        if built.dropped > 0 {
            outcome.issues.push(issue(
                IssueKind::RowsDropped,
                format!("{} 行缺少 date 或 tyre_size，已丢弃", built.dropped),
            ));
        }
        let skipped = body.headers_skipped + built.summary_rows;
        if skipped > 0 {
            outcome.issues.push(issue(
                IssueKind::RowsSkipped,
                format!(
                    "跳过 {} 行重复表头、{} 行合计行",
                    body.headers_skipped, built.summary_rows
                ),
            ));
        }

        debug!(
            file = %file,
            sheet = %sheet,
            header_row = header_idx,
            layout = ?layout,
            rows = built.records.len(),
            dropped = built.dropped,
            skipped_headers = body.headers_skipped,
            skipped_summary = built.summary_rows,
            "工作表处理完成"
        );

        outcome.summary = Some(SheetSummary {
            file: file.to_string(),
            sheet: sheet.to_string(),
            header_row: header_idx,
            columns: normalized.names(),
            layout,
            rows_kept: built.records.len(),
            rows_dropped: built.dropped,
            rows_skipped: skipped,
        });
        outcome.rows_dropped = built.dropped;
        outcome.rows_skipped = skipped;
        outcome.records = built.records;
        outcome
    }

    /// 表头之后的行分类
    ///
    /// 表头之上的元数据日期行作为初始块日期
    fn split_body<'g>(
        &self,
        grid: &'g RawGrid,
        header_idx: usize,
        positions: &BTreeMap<CanonicalColumn, usize>,
    ) -> SheetBody<'g> {
        let all = grid.rows();
        let mut block_date = all[..header_idx]
            .iter()
            .filter_map(|row| self.block_marker(row))
            .flatten()
            .last();
        let mut block_dates_seen = block_date.is_some();
        let mut rows = Vec::new();
        let mut headers_skipped = 0;

        for row in &all[header_idx + 1..] {
            if row.iter().all(|c| c.is_empty()) {
                continue;
            }
            if let Some(marker) = self.block_marker(row) {
                if marker.is_some() {
                    block_date = marker;
                    block_dates_seen = true;
                }
                continue;
            }
            // 多块版式中每块重复出现的表头
            if self.is_repeated_header(row, positions) {
                headers_skipped += 1;
                continue;
            }
            rows.push((row.as_slice(), block_date));
        }

        SheetBody {
            rows,
            block_dates_seen,
            headers_skipped,
        }
    }

    /// 重复表头：关键字得分达标，且
    /// - 归一后的标准列与表头完全相同，或
    /// - 表头的 date / tyre_size 列位置上仍是对应的列名
    ///
    /// 仅关键字得分达标的数据行（例如备注里写了 "quality hold - output reduced"）不算表头
    fn is_repeated_header(&self, row: &[RawCell], positions: &BTreeMap<CanonicalColumn, usize>) -> bool {
        if !self.detector.is_header_row(row) {
            return false;
        }

        let texts: Vec<String> = row.iter().map(|c| c.as_text()).collect();
        let columns: BTreeSet<CanonicalColumn> =
            self.normalizer.normalize(&texts).positions().into_keys().collect();
        if columns.iter().eq(positions.keys()) {
            return true;
        }

        let keys: Vec<(CanonicalColumn, usize)> = [CanonicalColumn::Date, CanonicalColumn::TyreSize]
            .into_iter()
            .filter_map(|column| positions.get(&column).map(|&col| (column, col)))
            .collect();
        !keys.is_empty()
            && keys.iter().all(|&(column, col)| {
                self.normalizer
                    .normalize_one(&cell_at(row, col).as_text())
                    .canonical()
                    == Some(column)
            })
    }

    /// 元数据日期行：首个非空单元格为 `Date: ...`
    ///
    /// # 返回
    /// - None: 不是元数据行
    /// - Some(None): 是元数据行但日期无法解析
    /// - Some(Some(date)): 块日期
    fn block_marker(&self, row: &[RawCell]) -> Option<Option<NaiveDate>> {
        let mut cells = row.iter().filter(|c| !c.is_empty());
        let first = cells.next()?.as_text();
        let colon = first.find(':')?;
        if !first[..colon].trim().eq_ignore_ascii_case("date") {
            return None;
        }

        let rest = first[colon + 1..].trim();
        let date = if rest.is_empty() {
            cells.next().and_then(|c| self.dates.parse_cell(c))
        } else {
            self.dates.parse_cell(&RawCell::text(rest))
        };
        Some(date)
    }

    /// 合计行：规格或首个非空单元格以完整的合计标记词开头
    ///
    /// `Total` / `Grand Total:` / `Sum` 命中；`Grandtrek` / `Summit` 这类规格名不命中
    fn is_summary_row(&self, row: &[RawCell], tyre_size: Option<&str>) -> bool {
        let Some(marker) = &self.summary_marker else {
            return false;
        };
        if tyre_size.is_some_and(|size| marker.is_match(size)) {
            return true;
        }
        row.iter()
            .find(|c| !c.is_empty())
            .is_some_and(|first| marker.is_match(&first.as_text()))
    }

    /// 单表 / 多块版式
    fn build_rows(
        &self,
        file: &str,
        rows: &[BodyRow<'_>],
        normalized: &NormalizedHeader,
        positions: &BTreeMap<CanonicalColumn, usize>,
    ) -> BuiltRows {
        let mut built = BuiltRows::default();

        let parsed_dates = match positions.get(&CanonicalColumn::Date) {
            Some(&col) => {
                let cells: Vec<&RawCell> = rows.iter().map(|(row, _)| cell_at(row, col)).collect();
                self.dates.parse_column(&cells)
            }
            None => vec![None; rows.len()],
        };

        let has = |c: CanonicalColumn| positions.contains_key(&c);
        let derive = self.config.derive_quantity_from_grades
            && !has(CanonicalColumn::Quantity)
            && (has(CanonicalColumn::AGrade)
                || has(CanonicalColumn::BGrade)
                || has(CanonicalColumn::Rework));
        built.derived_quantity = derive;

        let extras: Vec<(usize, &str)> = normalized
            .columns
            .iter()
            .enumerate()
            .filter_map(|(idx, column)| match column {
                Column::Other(name) if !name.starts_with("unnamed_") => Some((idx, name.as_str())),
                _ => None,
            })
            .collect();

        for (i, (row, block_date)) in rows.iter().enumerate() {
            let tyre_size = positions
                .get(&CanonicalColumn::TyreSize)
                .and_then(|&col| self.values.label(cell_at(row, col)));

            if self.is_summary_row(row, tyre_size.as_deref()) {
                built.summary_rows += 1;
                continue;
            }

            let date = parsed_dates.get(i).copied().flatten().or(*block_date);
            let (Some(date), Some(tyre_size)) = (date, tyre_size) else {
                built.dropped += 1;
                continue;
            };

            let mut record = CanonicalRecord::new(date, tyre_size, file);
            for (&column, &col) in positions {
                self.assign(&mut record, column, cell_at(row, col));
            }
            if derive {
                record.quantity = record.a_grade + record.b_grade + record.rework;
            }
            for &(col, name) in &extras {
                let text = cell_at(row, col).as_text();
                if !text.is_empty() {
                    record.extras.insert(name.to_string(), text);
                }
            }
            built.records.push(record);
        }

        built
    }

    /// 宽表：每个正值的日序号单元格展开为一条记录
    fn melt_wide(
        &self,
        file: &str,
        rows: &[BodyRow<'_>],
        positions: &BTreeMap<CanonicalColumn, usize>,
        day_columns: &[(usize, u32)],
        (year, month): (i32, u32),
    ) -> BuiltRows {
        let mut built = BuiltRows::default();

        for (row, block_date) in rows {
            let tyre_size = positions
                .get(&CanonicalColumn::TyreSize)
                .and_then(|&col| self.values.label(cell_at(row, col)));

            if self.is_summary_row(row, tyre_size.as_deref()) {
                built.summary_rows += 1;
                continue;
            }
            let Some(tyre_size) = tyre_size else {
                built.dropped += 1;
                continue;
            };

            let (y, m) = block_date
                .map(|d| (d.year(), d.month()))
                .unwrap_or((year, month));
            let month_days = days_in_month(y, m);
            if month_days == 0 {
                built.dropped += 1;
                continue;
            }

            let monthly_target = positions
                .get(&CanonicalColumn::Target)
                .map(|&col| self.values.count(cell_at(row, col)))
                .unwrap_or(0.0);
            let daily_target = monthly_target / month_days as f64;

            for &(col, day) in day_columns {
                let quantity = self.values.count(cell_at(row, col));
                if quantity <= 0.0 {
                    continue;
                }
                let Some(date) = NaiveDate::from_ymd_opt(y, m, day) else {
                    continue;
                };
                let mut record = CanonicalRecord::new(date, tyre_size.clone(), file);
                record.quantity = quantity;
                record.target = daily_target;
                built.records.push(record);
            }
        }

        built
    }

    /// 按列角色写入记录字段
    fn assign(&self, record: &mut CanonicalRecord, column: CanonicalColumn, cell: &RawCell) {
        match column.role() {
            ColumnRole::Count => {
                let value = self.values.count(cell);
                match column {
                    CanonicalColumn::Quantity => record.quantity = value,
                    CanonicalColumn::Target => record.target = value,
                    CanonicalColumn::AGrade => record.a_grade = value,
                    CanonicalColumn::BGrade => record.b_grade = value,
                    CanonicalColumn::Scrap => record.scrap = value,
                    CanonicalColumn::Rework => record.rework = value,
                    _ => {}
                }
            }
            ColumnRole::Percentage => {
                let value = self.values.percentage(cell);
                match column {
                    CanonicalColumn::Oee => record.oee = value,
                    CanonicalColumn::Fpy => record.fpy = value,
                    _ => {}
                }
            }
            // 日期与规格在构造记录时已处理
            ColumnRole::Date | ColumnRole::Label => {}
        }
    }
}

#[derive(Debug, Default)]
struct BuiltRows {
    records: Vec<CanonicalRecord>,
    dropped: usize,
    summary_rows: usize,
    derived_quantity: bool,
}

/// 合计标记 → 行首整词匹配的正则（忽略大小写，词间空白可变）
fn summary_marker_regex(markers: &[String]) -> ImportResult<Option<Regex>> {
    let alternatives: Vec<String> = markers
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .map(|m| {
            m.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect();
    if alternatives.is_empty() {
        return Ok(None);
    }
    let pattern = format!(r"(?i)^\s*(?:{})\b", alternatives.join("|"));
    Ok(Some(Regex::new(&pattern)?))
}

/// 表头为 1..=31 的列（宽表日序号列）
fn day_columns(normalized: &NormalizedHeader) -> Vec<(usize, u32)> {
    normalized
        .columns
        .iter()
        .enumerate()
        .filter_map(|(idx, column)| match column {
            Column::Other(name) => name
                .parse::<u32>()
                .ok()
                .filter(|d| (1..=31).contains(d))
                .map(|d| (idx, d)),
            Column::Canonical(_) => None,
        })
        .collect()
}

/// 当月天数（非法年月返回 0）
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(start), Some(end)) => (end - start).num_days() as u32,
        _ => 0,
    }
}

fn month_from_name(token: &str) -> Option<u32> {
    let lower = token.to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTH_NAMES
        .iter()
        .position(|name| name.starts_with(lower.as_str()))
        .map(|idx| idx as u32 + 1)
}

fn year_from_token(token: &str) -> Option<i32> {
    if !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let value: i32 = token.parse().ok()?;
    match token.len() {
        2 => Some(2000 + value),
        4 => Some(value),
        _ => None,
    }
}

/// 从工作表名识别年月
///
/// 支持 `March-25`、`Mar 2025`、`03-25`、`2025-03`
pub fn month_from_sheet_name(name: &str) -> Option<(i32, u32)> {
    let tokens: Vec<&str> = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    tokens.windows(2).find_map(|pair| {
        let (a, b) = (pair[0], pair[1]);
        if let Some(month) = month_from_name(a) {
            return year_from_token(b).map(|year| (year, month));
        }
        if !a.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if a.len() == 4 {
            let month: u32 = b.parse().ok().filter(|m| (1..=12).contains(m))?;
            return year_from_token(a).map(|year| (year, month));
        }
        let month: u32 = a.parse().ok().filter(|m| (1..=12).contains(m))?;
        year_from_token(b).map(|year| (year, month))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> SheetProcessor {
        SheetProcessor::new(LoaderConfig::default()).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_tabular_sheet_with_decorative_rows() {
        let grid = RawGrid::from_text_rows(vec![
            vec!["ACME TYRES", "", "", "", "", ""],
            vec!["Daily production", "", "", "", "", ""],
            vec!["", "", "", "", "", ""],
            vec!["Date", "Tyre Size", "Quantity", "Target", "A Grade", "B Grade"],
            vec!["01/03/2025", "185/70R14", "100", "150", "95", "5"],
            vec!["02/03/2025", "195/65R15", "200", "150", "190", "10"],
            vec!["", "", "", "", "", ""],
            vec!["Total", "", "300", "300", "285", "15"],
        ]);

        let outcome = processor().process("daily.csv", "daily", &grid);
        let summary = outcome.summary.unwrap();
        assert_eq!(summary.header_row, 3);
        assert_eq!(summary.layout, SheetLayout::Tabular);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.rows_dropped, 0);

        let first = &outcome.records[0];
        assert_eq!(first.date, ymd(2025, 3, 1));
        assert_eq!(first.tyre_size, "185/70R14");
        assert_eq!(first.quantity, 100.0);
        assert_eq!(first.target, 150.0);
        assert_eq!(first.a_grade, 95.0);
        assert_eq!(first.source_file, "daily.csv");
    }

    #[test]
    fn test_rows_without_keys_are_dropped() {
        let grid = RawGrid::from_text_rows(vec![
            vec!["Date", "Tyre Size", "Qty"],
            vec!["01/03/2025", "185/70R14", "10"],
            vec!["not a date", "185/70R14", "10"],
            vec!["02/03/2025", "", "10"],
        ]);

        let outcome = processor().process("a.csv", "a", &grid);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.rows_dropped, 2);
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::RowsDropped));
    }

    #[test]
    fn test_no_header_is_info_issue() {
        let grid = RawGrid::from_text_rows(vec![vec!["Cover page"], vec!["Nothing here"]]);
        let outcome = processor().process("a.xlsx", "Cover", &grid);

        assert!(outcome.summary.is_none());
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].kind, IssueKind::NoHeaderFound);
        assert_eq!(outcome.issues[0].sheet.as_deref(), Some("Cover"));
    }

    #[test]
    fn test_missing_essential_columns_skips_sheet() {
        let config = LoaderConfig {
            min_essential_overlap: 2,
            ..LoaderConfig::default()
        };
        let grid = RawGrid::from_text_rows(vec![
            vec!["OEE", "FPY", "Quantity"],
            vec!["85", "97", "10"],
        ]);
        let outcome = SheetProcessor::new(config).unwrap().process("a.csv", "a", &grid);

        assert!(outcome.summary.is_none());
        assert_eq!(outcome.issues[0].kind, IssueKind::MissingEssentialColumns);
    }

    #[test]
    fn test_blocked_layout_uses_block_dates() {
        let grid = RawGrid::from_text_rows(vec![
            vec!["Weekly A/B/R report", "", "", ""],
            vec!["Date: 03/03/2025", "", "", ""],
            vec!["Tyre Size", "A", "B", "R"],
            vec!["185/70R14", "90", "5", "5"],
            vec!["195/65R15", "40", "0", "0"],
            vec!["Grand Total", "130", "5", "5"],
            vec!["Date:", "04/03/2025", "", ""],
            vec!["Tyre Size", "A", "B", "R"],
            vec!["185/70R14", "80", "10", "0"],
        ]);

        let outcome = processor().process("Weekly Tyre.xlsx", "Week 10", &grid);
        let summary = outcome.summary.unwrap();
        assert_eq!(summary.layout, SheetLayout::Blocked);
        assert_eq!(outcome.records.len(), 3);

        assert_eq!(outcome.records[0].date, ymd(2025, 3, 3));
        assert_eq!(outcome.records[0].quantity, 100.0);
        assert_eq!(outcome.records[1].quantity, 40.0);
        assert_eq!(outcome.records[2].date, ymd(2025, 3, 4));
        assert_eq!(outcome.records[2].quantity, 90.0);
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::DerivedQuantity));
    }

    #[test]
    fn test_wide_monthly_layout_is_melted() {
        let grid = RawGrid::from_text_rows(vec![
            vec!["Tyre Size", "Target", "1", "2", "3", "4", "5", "Total"],
            vec!["185/70R14", "310", "10", "0", "12", "", "8", "30"],
            vec!["Total", "310", "10", "0", "12", "", "8", "30"],
        ]);

        let outcome = processor().process("monthly.xlsx", "March-25", &grid);
        let summary = outcome.summary.unwrap();
        assert_eq!(summary.layout, SheetLayout::WideMonthly);
        assert_eq!(outcome.records.len(), 3);

        let dates: Vec<NaiveDate> = outcome.records.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![ymd(2025, 3, 1), ymd(2025, 3, 3), ymd(2025, 3, 5)]);
        assert_eq!(outcome.records[0].quantity, 10.0);
        assert_eq!(outcome.records[0].target, 10.0); // 310 / 31
    }

    #[test]
    fn test_wide_layout_without_month_is_skipped() {
        let grid = RawGrid::from_text_rows(vec![
            vec!["Tyre Size", "1", "2", "3", "4", "5"],
            vec!["185/70R14", "1", "1", "1", "1", "1"],
        ]);
        let outcome = processor().process("monthly.xlsx", "Sheet1", &grid);
        assert!(outcome.summary.is_none());
        assert!(outcome.records.is_empty());
    }

    #[test]
    fn test_duplicate_columns_warned_last_wins() {
        let grid = RawGrid::from_text_rows(vec![
            vec!["Date", "Tyre Size", "Output", "Production"],
            vec!["2025-03-01", "185/70R14", "1", "2"],
        ]);
        let outcome = processor().process("a.csv", "a", &grid);

        assert!(outcome
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::DuplicateColumn));
        assert_eq!(outcome.records[0].quantity, 2.0);
    }

    #[test]
    fn test_unknown_columns_kept_as_extras() {
        let grid = RawGrid::from_text_rows(vec![
            vec!["Date", "Tyre Size", "Qty", "Shift"],
            vec!["2025-03-01", "185/70R14", "5", "Night"],
        ]);
        let outcome = processor().process("a.csv", "a", &grid);
        assert_eq!(
            outcome.records[0].extras.get("shift").map(String::as_str),
            Some("Night")
        );
    }

    #[test]
    fn test_data_row_with_header_keywords_in_remarks_is_kept() {
        let grid = RawGrid::from_text_rows(vec![
            vec!["Date", "Tyre Size", "Qty", "Remarks"],
            vec!["2025-03-01", "185/70R14", "100", "quality hold - output reduced"],
            vec!["2025-03-02", "195/65R15", "80", "size change, target missed"],
        ]);

        let outcome = processor().process("a.csv", "a", &grid);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.rows_skipped, 0);
        assert_eq!(
            outcome.records[0].extras.get("remarks").map(String::as_str),
            Some("quality hold - output reduced")
        );
    }

    #[test]
    fn test_repeated_header_is_skipped_and_counted() {
        let grid = RawGrid::from_text_rows(vec![
            vec!["Date", "Tyre Size", "Qty"],
            vec!["2025-03-01", "185/70R14", "100"],
            vec!["Date", "Tyre Size", "Qty"],
            vec!["2025-03-02", "185/70R14", "90"],
        ]);

        let outcome = processor().process("a.csv", "a", &grid);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.rows_skipped, 1);
        assert_eq!(outcome.summary.unwrap().rows_skipped, 1);
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::RowsSkipped));
    }

    #[test]
    fn test_repeated_block_header_with_fewer_columns_is_skipped() {
        let grid = RawGrid::from_text_rows(vec![
            vec!["Date: 03/03/2025", "", "", ""],
            vec!["Tyre Size", "A", "B", "R"],
            vec!["185/70R14", "90", "5", "5"],
            vec!["Date: 04/03/2025", "", "", ""],
            vec!["Tyre Size", "A", "B", ""],
            vec!["185/70R14", "80", "10", ""],
        ]);

        let outcome = processor().process("weekly.xlsx", "Week 10", &grid);
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.records.iter().all(|r| r.tyre_size == "185/70R14"));
        assert_eq!(outcome.rows_skipped, 1);
    }

    #[test]
    fn test_summary_markers_match_whole_leading_words() {
        let grid = RawGrid::from_text_rows(vec![
            vec!["Date", "Tyre Size", "Qty"],
            vec!["2025-03-01", "Grandtrek AT3", "10"],
            vec!["2025-03-01", "Summit HTR", "20"],
            vec!["2025-03-01", "205/55R16", "30"],
            vec!["Total", "", "60"],
            vec!["", "Grand Total", "60"],
        ]);

        let outcome = processor().process("a.csv", "a", &grid);
        let sizes: Vec<&str> = outcome.records.iter().map(|r| r.tyre_size.as_str()).collect();
        assert_eq!(sizes, vec!["Grandtrek AT3", "Summit HTR", "205/55R16"]);
        assert_eq!(outcome.rows_skipped, 2);
        assert_eq!(outcome.rows_dropped, 0);
    }

    #[test]
    fn test_summary_marker_regex() {
        let markers: Vec<String> = ["total", "grand total", "sum"].iter().map(|s| s.to_string()).collect();
        let re = summary_marker_regex(&markers).unwrap().unwrap();

        assert!(re.is_match("Total"));
        assert!(re.is_match("  GRAND   TOTAL:"));
        assert!(re.is_match("Sum of March"));
        assert!(!re.is_match("Summit"));
        assert!(!re.is_match("Totally new"));
        assert!(!re.is_match("Sub Total")); // 非行首
        assert!(summary_marker_regex(&[]).unwrap().is_none());
    }

    #[test]
    fn test_month_from_sheet_name() {
        assert_eq!(month_from_sheet_name("March-25"), Some((2025, 3)));
        assert_eq!(month_from_sheet_name("Mar 2025"), Some((2025, 3)));
        assert_eq!(month_from_sheet_name("03-25"), Some((2025, 3)));
        assert_eq!(month_from_sheet_name("2025-03"), Some((2025, 3)));
        assert_eq!(month_from_sheet_name("Summary"), None);
        assert_eq!(month_from_sheet_name("Sheet1"), None);
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2025, 12), 31);
        assert_eq!(days_in_month(2025, 13), 0);
    }
}

// ==========================================
// 轮胎厂生产 KPI 系统 - 表头识别器
// ==========================================
// 职责: 在无类型网格中按关键字打分定位表头行
// 规则: 每个关键字每行至多计 1 分；首个得分 ≥ 阈值的行即表头
// ==========================================

use crate::config::LoaderConfig;
use crate::importer::cell::{RawCell, RawGrid};

#[derive(Debug, Clone)]
pub struct HeaderDetector {
    keywords: Vec<String>, // 小写关键字
    min_score: usize,
}

impl HeaderDetector {
    pub fn new<I, S>(keywords: I, min_score: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            min_score,
        }
    }

    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new(&config.header_keywords, config.min_header_score)
    }

    pub fn min_score(&self) -> usize {
        self.min_score
    }

    /// 一行的得分 = 出现在任一非空单元格中的关键字个数
    pub fn score_row(&self, row: &[RawCell]) -> usize {
        let cells: Vec<String> = row
            .iter()
            .filter(|c| !c.is_empty())
            .map(|c| c.as_lower_text())
            .collect();

        if cells.is_empty() {
            return 0;
        }

        self.keywords
            .iter()
            .filter(|k| cells.iter().any(|cell| cell.contains(k.as_str())))
            .count()
    }

    pub fn is_header_row(&self, row: &[RawCell]) -> bool {
        self.min_score > 0 && self.score_row(row) >= self.min_score
    }

    /// 自上而下扫描，返回首个合格行的下标
    ///
    /// 没有合格行时返回 None（调用方跳过该工作表，不是错误）
    pub fn detect(&self, grid: &RawGrid) -> Option<usize> {
        grid.rows()
            .iter()
            .position(|row| self.is_header_row(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> HeaderDetector {
        HeaderDetector::new(["date", "tyre", "quantity"], 2)
    }

    #[test]
    fn test_detects_header_below_decorative_rows() {
        let grid = RawGrid::from_text_rows(vec![
            vec!["ACME TYRES LTD", "", ""],
            vec!["Production report", "", ""],
            vec!["", "", ""],
            vec!["Date", "Tyre Size", "Quantity"],
            vec!["01/03/2025", "185/70R14", "100"],
        ]);
        assert_eq!(detector().detect(&grid), Some(3));
        assert_eq!(detector().score_row(grid.row(3).unwrap()), 3);
    }

    #[test]
    fn test_keyword_counted_once_per_row() {
        // 三个单元格都含 "date"，仍只计 1 分
        let row = vec![
            RawCell::text("Date"),
            RawCell::text("Start date"),
            RawCell::text("End date"),
        ];
        assert_eq!(detector().score_row(&row), 1);
        assert!(!detector().is_header_row(&row));
    }

    #[test]
    fn test_first_qualifying_row_wins() {
        let grid = RawGrid::from_text_rows(vec![
            vec!["Date", "Tyre"],
            vec!["Date", "Tyre", "Quantity"],
        ]);
        assert_eq!(detector().detect(&grid), Some(0));
    }

    #[test]
    fn test_no_header_found() {
        let grid = RawGrid::from_text_rows(vec![vec!["Notes", "Only"], vec!["date", ""]]);
        assert_eq!(detector().detect(&grid), None);
        assert_eq!(detector().detect(&RawGrid::default()), None);
    }
}

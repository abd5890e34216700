// ==========================================
// 轮胎厂生产 KPI 系统 - 看板照片交叉校验
// ==========================================
// 职责: 对比看板读数与报表同日产量，输出一致 / 偏差结论
// 红线: 结果仅供参考，不修改数据集
// ==========================================

use crate::config::CrossCheckConfig;
use crate::domain::record::CanonicalDataset;
use crate::engine::board_reading::BoardReading;
use crate::engine::collaborators::{collect_readings, list_board_images, BoardReader, CollaboratorError};
use chrono::NaiveDate;
use std::path::Path;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrossCheckStatus {
    Consistent,
    Divergent,
    NoSpreadsheetData, // 报表中无该日数据
    Undated,           // 读数无日期
    NoProductionFigure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossCheckResult {
    pub source_image: String,
    pub date: Option<NaiveDate>,
    pub board_production: Option<f64>,
    pub sheet_production: Option<f64>,
    pub variance_pct: Option<f64>,
    pub status: CrossCheckStatus,
}

#[derive(Debug, Clone, Default)]
pub struct CrossValidator {
    config: CrossCheckConfig,
}

impl CrossValidator {
    pub fn new(config: CrossCheckConfig) -> Self {
        Self { config }
    }

    /// 读取目录下全部看板照片并逐张比对
    ///
    /// 单张照片读取失败只跳过该照片；目录不可读才返回错误
    pub async fn validate_directory(
        &self,
        dataset: &CanonicalDataset,
        reader: &dyn BoardReader,
        board_dir: &Path,
    ) -> Result<Vec<CrossCheckResult>, CollaboratorError> {
        let images = list_board_images(board_dir).await?;
        let readings = collect_readings(reader, &images).await;
        Ok(self.validate(dataset, &readings))
    }

    pub fn validate(&self, dataset: &CanonicalDataset, readings: &[BoardReading]) -> Vec<CrossCheckResult> {
        let results: Vec<CrossCheckResult> = readings
            .iter()
            .map(|reading| self.check_one(dataset, reading))
            .collect();

        let divergent = results
            .iter()
            .filter(|r| r.status == CrossCheckStatus::Divergent)
            .count();
        if divergent > 0 {
            warn!(divergent, total = results.len(), "看板读数与报表存在偏差");
        } else {
            info!(total = results.len(), "看板交叉校验完成");
        }
        results
    }

    fn check_one(&self, dataset: &CanonicalDataset, reading: &BoardReading) -> CrossCheckResult {
        let mut result = CrossCheckResult {
            source_image: reading.source_image.clone(),
            date: reading.date,
            board_production: reading.production,
            sheet_production: None,
            variance_pct: None,
            status: CrossCheckStatus::Undated,
        };

        let Some(date) = reading.date else {
            return result;
        };
        let Some(board) = reading.production else {
            result.status = CrossCheckStatus::NoProductionFigure;
            return result;
        };

        let rows = dataset.on(date);
        if rows.is_empty() {
            result.status = CrossCheckStatus::NoSpreadsheetData;
            return result;
        }

        let sheet: f64 = rows.iter().map(|r| r.quantity).sum();
        let variance = if sheet == 0.0 {
            if board == 0.0 {
                0.0
            } else {
                100.0
            }
        } else {
            ((board - sheet) / sheet * 100.0).abs()
        };

        result.sheet_production = Some(sheet);
        result.variance_pct = Some(variance);
        result.status = if variance > self.config.max_variance_pct {
            CrossCheckStatus::Divergent
        } else {
            CrossCheckStatus::Consistent
        };
        result
    }
}

// ==========================================
// 轮胎厂生产 KPI 系统 - 外部协作方接口
// ==========================================
// 职责: 定义 OCR 看板读取、KPI 叙述生成的接口（不含具体 OCR / 模型实现）
// 红线: 协作方失败不影响核心 KPI 结果
// ==========================================

use crate::domain::kpi::KpiSnapshot;
use crate::engine::board_reading::{parse_board_text, BoardReading};
use async_trait::async_trait;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("图片读取失败 {path}: {message}")]
    ImageRead { path: String, message: String },

    #[error("OCR 识别失败: {0}")]
    Ocr(String),

    #[error("叙述生成失败: {0}")]
    Narrative(String),
}

// ==========================================
// BoardReader - 看板照片 OCR
// ==========================================
// 返回 Ok(None) 表示图片中未识别出任何文字
#[async_trait]
pub trait BoardReader: Send + Sync {
    async fn read_board(&self, image: &Path) -> Result<Option<BoardReading>, CollaboratorError>;
}

// ==========================================
// NarrativeGenerator - KPI 文字解读
// ==========================================
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn narrate(&self, snapshot: &KpiSnapshot) -> Result<String, CollaboratorError>;
}

/// 读取与图片同名的 .txt 旁路文本（由外部 OCR 预先生成）
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarTextReader;

#[async_trait]
impl BoardReader for SidecarTextReader {
    async fn read_board(&self, image: &Path) -> Result<Option<BoardReading>, CollaboratorError> {
        let sidecar = image.with_extension("txt");
        let text = tokio::fs::read_to_string(&sidecar)
            .await
            .map_err(|e| CollaboratorError::ImageRead {
                path: sidecar.display().to_string(),
                message: e.to_string(),
            })?;

        if text.trim().is_empty() {
            return Ok(None);
        }

        let name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Some(parse_board_text(&text, &name)))
    }
}

/// 看板照片扩展名（小写）
pub const BOARD_IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// 列出目录下的看板照片（按文件名排序，临时文件除外）
pub async fn list_board_images(dir: &Path) -> Result<Vec<PathBuf>, CollaboratorError> {
    let read_error = |e: std::io::Error| CollaboratorError::ImageRead {
        path: dir.display().to_string(),
        message: e.to_string(),
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_error)?;
    let mut images = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || name.starts_with('~') {
            continue;
        }
        let is_image = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|e| BOARD_IMAGE_EXTENSIONS.contains(&e.as_str()));
        if is_image && path.is_file() {
            images.push(path);
        }
    }

    images.sort();
    debug!(dir = %dir.display(), images = images.len(), "看板照片枚举完成");
    Ok(images)
}

/// 以 summary_text 作为叙述（无外部模型时使用）
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainNarrative;

#[async_trait]
impl NarrativeGenerator for PlainNarrative {
    async fn narrate(&self, snapshot: &KpiSnapshot) -> Result<String, CollaboratorError> {
        Ok(snapshot.summary_text())
    }
}

/// 并发读取全部图片；失败与空结果跳过
pub async fn collect_readings(reader: &dyn BoardReader, images: &[PathBuf]) -> Vec<BoardReading> {
    let results = join_all(images.iter().map(|image| reader.read_board(image))).await;

    let mut readings = Vec::with_capacity(images.len());
    for (image, result) in images.iter().zip(results) {
        match result {
            Ok(Some(reading)) => readings.push(reading),
            Ok(None) => debug!(image = %image.display(), "看板照片无可识别文本"),
            Err(e) => warn!(image = %image.display(), error = %e, "看板照片读取失败，已跳过"),
        }
    }
    readings
}

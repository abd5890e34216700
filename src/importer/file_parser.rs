// ==========================================
// 轮胎厂生产 KPI 系统 - 工作簿读取
// ==========================================
// 支持: Excel (.xlsx/.xlsm/.xls) / ODS / CSV
// 职责: 文件 → 每个工作表一个 RawGrid
// 红线: 工作簿句柄只在一次调用内持有，返回前释放
// ==========================================

use crate::config::LoaderConfig;
use crate::importer::cell::{RawCell, RawGrid};
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 单个工作表的读取结果（工作表级失败不影响同文件其它工作表）
#[derive(Debug)]
pub struct SheetRead {
    pub name: String,
    pub grid: ImportResult<RawGrid>,
}

/// 临时文件 / 锁文件 / 隐藏文件
pub fn is_temp_artifact(file_name: &str) -> bool {
    file_name.starts_with('~') || file_name.starts_with(".~lock") || file_name.starts_with('.')
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// 列出目录下可加载的文件（按文件名字典序）
///
/// 目录读取失败返回 Err；单个条目读取失败跳过
pub fn list_source_files(dir: &Path, config: &LoaderConfig) -> ImportResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| ImportError::SourceDirectoryUnreadable {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if is_temp_artifact(&name) {
                debug!(file = %name, "跳过临时文件");
                return false;
            }
            config.accepts_extension(&extension_of(path))
        })
        .collect();

    files.sort_by_key(|path| path.file_name().map(|n| n.to_os_string()));
    Ok(files)
}

// ==========================================
// WorkbookReader - 按扩展名选择读取方式
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkbookReader;

impl WorkbookReader {
    /// 读取文件中的全部工作表
    ///
    /// # 返回
    /// - Ok(Vec<SheetRead>): 每个工作表一项（工作表级失败在项内）
    /// - Err: 文件无法打开或格式不支持
    pub fn read_sheets(&self, path: &Path) -> ImportResult<Vec<SheetRead>> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        match extension_of(path).as_str() {
            "csv" => {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| "csv".to_string());
                let grid = self.read_csv(path)?;
                Ok(vec![SheetRead {
                    name,
                    grid: Ok(grid),
                }])
            }
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => self.read_workbook(path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }

    fn read_workbook(&self, path: &Path) -> ImportResult<Vec<SheetRead>> {
        let mut workbook = open_workbook_auto(path)?;
        let sheet_names = workbook.sheet_names();

        let sheets = sheet_names
            .into_iter()
            .map(|name| {
                let grid = workbook
                    .worksheet_range(&name)
                    .map(|range| {
                        RawGrid::new(
                            range
                                .rows()
                                .map(|row| row.iter().map(RawCell::from).collect())
                                .collect(),
                        )
                    })
                    .map_err(|e| ImportError::SheetReadError {
                        sheet: name.clone(),
                        message: e.to_string(),
                    });
                SheetRead { name, grid }
            })
            .collect();

        Ok(sheets)
    }

    fn read_csv(&self, path: &Path) -> ImportResult<RawGrid> {
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false) // 表头位置由表头识别器决定
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        // 按字节读取：非 UTF-8 字节（如 Latin-1 导出）替换为 U+FFFD，不整文件失败
        let mut rows = Vec::new();
        for result in reader.byte_records() {
            let record = result?;
            rows.push(
                record
                    .iter()
                    .map(|field| RawCell::text(String::from_utf8_lossy(field)))
                    .collect(),
            );
        }

        Ok(RawGrid::new(rows))
    }
}

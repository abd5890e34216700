// ==========================================
// 轮胎厂生产 KPI 系统 - 生产数据加载器
// ==========================================
// 职责: 源目录 → 标准数据集 + 加载报告
// 流程:
// 1. 枚举文件（跳过临时/锁文件，按文件名排序）
// 2. 逐文件逐工作表：表头识别 → 列名归一化 → 类型转换
// 3. 合并 → (date, tyre_size) 去重 → 按日期升序
// 红线:
// - 单个文件/工作表失败只记录，不中断整体加载
// - 无目录/无文件返回空数据集，不是错误
// ==========================================

use crate::config::LoaderConfig;
use crate::domain::load_report::{
    FileSummary, IssueKind, LoadIssue, LoadOutcome, LoadReport, SheetSummary,
};
use crate::domain::record::{dedup_records, CanonicalDataset, CanonicalRecord};
use crate::domain::types::SourceKind;
use crate::importer::cell::RawGrid;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{list_source_files, WorkbookReader};
use crate::importer::sheet_processor::SheetProcessor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 内存中的一张表（调用方已自行读取）
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub source_file: String,
    pub sheet_name: String,
    pub grid: RawGrid,
}

impl SourceTable {
    pub fn new(source_file: impl Into<String>, sheet_name: impl Into<String>, grid: RawGrid) -> Self {
        Self {
            source_file: source_file.into(),
            sheet_name: sheet_name.into(),
            grid,
        }
    }
}

/// 单个文件的加载结果（合并前）
#[derive(Debug)]
struct FileLoad {
    summary: FileSummary,
    sheets: Vec<SheetSummary>,
    records: Vec<CanonicalRecord>,
    issues: Vec<LoadIssue>,
    rows_dropped: usize,
    rows_skipped: usize,
}

impl FileLoad {
    fn new(file: &str) -> Self {
        Self {
            summary: FileSummary {
                file: file.to_string(),
                source_kind: SourceKind::from_file_name(file),
                sheets_total: 0,
                sheets_loaded: 0,
            },
            sheets: Vec::new(),
            records: Vec::new(),
            issues: Vec::new(),
            rows_dropped: 0,
            rows_skipped: 0,
        }
    }

    fn absorb_sheet(&mut self, processor: &SheetProcessor, sheet: &str, grid: &RawGrid) {
        let outcome = processor.process(&self.summary.file, sheet, grid);
        self.summary.sheets_total += 1;
        self.issues.extend(outcome.issues);
        if let Some(summary) = outcome.summary {
            self.summary.sheets_loaded += 1;
            self.rows_dropped += outcome.rows_dropped;
            self.rows_skipped += outcome.rows_skipped;
            self.records.extend(outcome.records);
            self.sheets.push(summary);
        }
    }
}

// ==========================================
// ProductionLoader - 生产数据加载器
// ==========================================
pub struct ProductionLoader {
    config: LoaderConfig,
    processor: SheetProcessor,
    reader: WorkbookReader,
}

impl ProductionLoader {
    pub fn new(config: LoaderConfig) -> ImportResult<Self> {
        Ok(Self {
            processor: SheetProcessor::new(config.clone())?,
            reader: WorkbookReader,
            config,
        })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// 加载源目录
    ///
    /// # 返回
    /// - Ok(LoadOutcome): 数据集可能为空（无目录/无文件/无有效工作表）
    /// - Err: 路径存在但不是可读目录
    #[instrument(skip(self, dir), fields(source = %dir.display()))]
    pub fn load_directory(&self, dir: &Path) -> ImportResult<LoadOutcome> {
        let started = Instant::now();
        let mut report = self.new_report(dir);
        info!(batch_id = %report.batch_id, "开始加载源目录");

        let Some(files) = self.source_files(dir, &mut report)? else {
            return Ok(self.finish(report, Vec::new(), started));
        };

        let mut records = Vec::new();
        for path in &files {
            let load = self.load_file(path);
            self.merge(&mut report, &mut records, load);
        }

        Ok(self.finish(report, records, started))
    }

    /// 并发加载源目录（每个文件一个阻塞任务，合并顺序与文件顺序一致）
    #[instrument(skip(self, dir), fields(source = %dir.display()))]
    pub async fn load_directory_concurrent(self: Arc<Self>, dir: PathBuf) -> ImportResult<LoadOutcome> {
        use futures::future::join_all;

        let started = Instant::now();
        let mut report = self.new_report(&dir);
        info!(batch_id = %report.batch_id, "开始并发加载源目录");

        let Some(files) = self.source_files(&dir, &mut report)? else {
            return Ok(self.finish(report, Vec::new(), started));
        };

        let tasks = files.into_iter().map(|path| {
            let loader = Arc::clone(&self);
            let name = file_name_of(&path);
            async move {
                tokio::task::spawn_blocking(move || loader.load_file(&path))
                    .await
                    .unwrap_or_else(|e| {
                        error!(file = %name, error = %e, "文件加载任务异常");
                        let mut load = FileLoad::new(&name);
                        load.issues.push(
                            LoadIssue::new(
                                IssueKind::UnreadableFile,
                                format!("加载任务异常: {}", e),
                            )
                            .for_file(name.clone()),
                        );
                        load
                    })
            }
        });

        // 并发执行，join_all 保持输入顺序
        let loads = join_all(tasks).await;

        let mut records = Vec::new();
        for load in loads {
            self.merge(&mut report, &mut records, load);
        }

        Ok(self.finish(report, records, started))
    }

    /// 加载内存中的表（不经过文件系统）
    pub fn load_tables(&self, tables: Vec<SourceTable>) -> LoadOutcome {
        let started = Instant::now();
        let mut report = LoadReport::new(
            Uuid::new_v4().to_string(),
            "<memory>".to_string(),
            self.config.dedup_policy,
        );

        // 同一 source_file 的连续表归为一个文件
        let mut loads: Vec<FileLoad> = Vec::new();
        for table in tables {
            let same_file = loads
                .last()
                .is_some_and(|l| l.summary.file == table.source_file);
            if !same_file {
                loads.push(FileLoad::new(&table.source_file));
            }
            if let Some(load) = loads.last_mut() {
                load.absorb_sheet(&self.processor, &table.sheet_name, &table.grid);
            }
        }

        let mut records = Vec::new();
        for load in loads {
            self.merge(&mut report, &mut records, load);
        }

        self.finish(report, records, started)
    }

    fn new_report(&self, dir: &Path) -> LoadReport {
        LoadReport::new(
            Uuid::new_v4().to_string(),
            dir.display().to_string(),
            self.config.dedup_policy,
        )
    }

    /// 目录检查 + 文件枚举
    ///
    /// 目录不存在时返回 Ok(None) 并记录问题
    fn source_files(&self, dir: &Path, report: &mut LoadReport) -> ImportResult<Option<Vec<PathBuf>>> {
        if !dir.exists() {
            warn!(source = %dir.display(), "源目录不存在，返回空数据集");
            report.issues.push(LoadIssue::new(
                IssueKind::SourceDirectoryMissing,
                format!("源目录不存在: {}", dir.display()),
            ));
            return Ok(None);
        }
        if !dir.is_dir() {
            return Err(ImportError::NotADirectory(dir.display().to_string()));
        }

        let files = list_source_files(dir, &self.config)?;
        info!(files = files.len(), "文件枚举完成");
        Ok(Some(files))
    }

    /// 加载单个文件的全部工作表
    fn load_file(&self, path: &Path) -> FileLoad {
        let name = file_name_of(path);
        let mut load = FileLoad::new(&name);
        debug!(file = %name, kind = %load.summary.source_kind, "开始读取文件");

        match self.reader.read_sheets(path) {
            Ok(sheets) => {
                for sheet in sheets {
                    match sheet.grid {
                        Ok(grid) => load.absorb_sheet(&self.processor, &sheet.name, &grid),
                        Err(e) => {
                            warn!(file = %name, sheet = %sheet.name, error = %e, "工作表读取失败");
                            load.summary.sheets_total += 1;
                            load.issues.push(
                                LoadIssue::new(IssueKind::UnreadableSheet, e.to_string())
                                    .for_file(name.clone())
                                    .for_sheet(sheet.name.clone()),
                            );
                        }
                    }
                }
            }
            Err(e) => {
                error!(file = %name, error = %e, "文件读取失败，已跳过");
                load.issues.push(
                    LoadIssue::new(IssueKind::UnreadableFile, e.to_string()).for_file(name.clone()),
                );
            }
        }

        info!(
            file = %name,
            kind = %load.summary.source_kind,
            sheets = load.summary.sheets_total,
            loaded = load.summary.sheets_loaded,
            rows = load.records.len(),
            "文件加载完成"
        );
        load
    }

    fn merge(&self, report: &mut LoadReport, records: &mut Vec<CanonicalRecord>, load: FileLoad) {
        report.rows_read += load.records.len();
        report.rows_dropped += load.rows_dropped;
        report.rows_skipped += load.rows_skipped;
        report.files.push(load.summary);
        report.sheets.extend(load.sheets);
        report.issues.extend(load.issues);
        records.extend(load.records);
    }

    /// 去重 + 排序 + 汇总
    fn finish(&self, mut report: LoadReport, records: Vec<CanonicalRecord>, started: Instant) -> LoadOutcome {
        let (kept, removed) = dedup_records(records, self.config.dedup_policy);
        let dataset = CanonicalDataset::from_records(kept);

        report.duplicates_removed = removed;
        report.rows_loaded = dataset.len();
        report.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            batch_id = %report.batch_id,
            files = report.files_scanned(),
            sheets = report.sheets_loaded(),
            rows = report.rows_loaded,
            skipped = report.rows_skipped,
            duplicates = removed,
            errors = report.error_count(),
            warnings = report.warning_count(),
            elapsed_ms = report.elapsed_ms,
            "源目录加载完成"
        );

        LoadOutcome { dataset, report }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::DedupPolicy;
    use chrono::NaiveDate;

    fn table(file: &str, rows: Vec<Vec<&str>>) -> SourceTable {
        SourceTable::new(file, "Sheet1", RawGrid::from_text_rows(rows))
    }

    #[test]
    fn test_load_tables_dedup_keep_first() {
        let loader = ProductionLoader::new(LoaderConfig::default()).unwrap();
        let outcome = loader.load_tables(vec![
            table(
                "a.csv",
                vec![
                    vec!["Date", "Tyre Size", "Qty"],
                    vec!["2025-03-02", "185/70R14", "10"],
                    vec!["2025-03-01", "185/70R14", "20"],
                ],
            ),
            table(
                "b.csv",
                vec![
                    vec!["Date", "Tyre Size", "Qty"],
                    vec!["2025-03-01", "185/70R14", "99"],
                ],
            ),
        ]);

        assert_eq!(outcome.dataset.len(), 2);
        assert_eq!(outcome.report.duplicates_removed, 1);
        assert_eq!(outcome.report.files_scanned(), 2);

        let first = &outcome.dataset.records()[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(first.quantity, 20.0);
        assert_eq!(first.source_file, "a.csv");
    }

    #[test]
    fn test_load_tables_dedup_keep_last() {
        let config = LoaderConfig {
            dedup_policy: DedupPolicy::KeepLast,
            ..LoaderConfig::default()
        };
        let loader = ProductionLoader::new(config).unwrap();
        let outcome = loader.load_tables(vec![
            table("a.csv", vec![vec!["Date", "Tyre Size", "Qty"], vec!["2025-03-01", "X", "1"]]),
            table("b.csv", vec![vec!["Date", "Tyre Size", "Qty"], vec!["2025-03-01", "X", "2"]]),
        ]);

        assert_eq!(outcome.dataset.len(), 1);
        assert_eq!(outcome.dataset.records()[0].quantity, 2.0);
        assert_eq!(outcome.dataset.records()[0].source_file, "b.csv");
    }

    #[test]
    fn test_skipped_rows_summed_into_report() {
        let loader = ProductionLoader::new(LoaderConfig::default()).unwrap();
        let outcome = loader.load_tables(vec![
            table(
                "a.csv",
                vec![
                    vec!["Date", "Tyre Size", "Qty"],
                    vec!["2025-03-01", "X", "1"],
                    vec!["Total", "", "1"],
                ],
            ),
            table(
                "b.csv",
                vec![
                    vec!["Date", "Tyre Size", "Qty"],
                    vec!["2025-03-02", "Summit", "2"],
                    vec!["Date", "Tyre Size", "Qty"],
                    vec!["Grand Total", "", "2"],
                ],
            ),
        ]);

        assert_eq!(outcome.dataset.len(), 2);
        assert_eq!(outcome.report.rows_skipped, 3);
        assert_eq!(outcome.report.sheets[1].rows_skipped, 2);
        assert_eq!(outcome.report.rows_dropped, 0);
    }

    #[test]
    fn test_empty_tables_give_empty_dataset() {
        let loader = ProductionLoader::new(LoaderConfig::default()).unwrap();
        let outcome = loader.load_tables(Vec::new());
        assert!(!outcome.has_data());
        assert_eq!(outcome.report.rows_loaded, 0);
        assert!(outcome.report.issues.is_empty());
    }
}

// ==========================================
// 轮胎厂生产 KPI 系统 - 加载报告
// ==========================================
// 职责: 记录目录加载过程中每个文件/工作表的处理结果
// 红线: 单个文件/工作表失败只记录、不中断整体加载
// ==========================================

use crate::domain::record::CanonicalDataset;
use crate::domain::types::{DedupPolicy, SourceKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// IssueLevel - 问题级别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueLevel {
    Error,   // 文件/工作表读取失败（已跳过）
    Warning, // 数据被丢弃或存在歧义
    Info,    // 预期内的跳过（装饰性工作表等）
}

// ==========================================
// IssueKind - 问题类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    SourceDirectoryMissing,  // 源目录不存在（返回空数据集）
    UnreadableFile,          // 文件无法打开/解析
    UnreadableSheet,         // 工作表无法读取
    NoHeaderFound,           // 未找到表头
    MissingEssentialColumns, // 缺少必要列
    DuplicateColumn,         // 多个表头归一到同一标准列
    DerivedQuantity,         // 产量由 A+B+R 推导
    RowsDropped,             // 缺少 date/tyre_size 的行被丢弃
    RowsSkipped,             // 重复表头行 / 合计行被跳过
}

impl IssueKind {
    pub fn level(&self) -> IssueLevel {
        match self {
            IssueKind::UnreadableFile | IssueKind::UnreadableSheet => IssueLevel::Error,
            IssueKind::MissingEssentialColumns
            | IssueKind::DuplicateColumn
            | IssueKind::RowsDropped => IssueLevel::Warning,
            IssueKind::SourceDirectoryMissing
            | IssueKind::NoHeaderFound
            | IssueKind::DerivedQuantity
            | IssueKind::RowsSkipped => IssueLevel::Info,
        }
    }
}

// ==========================================
// LoadIssue - 加载问题记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadIssue {
    pub file: Option<String>,  // 文件名
    pub sheet: Option<String>, // 工作表名
    pub kind: IssueKind,
    pub level: IssueLevel,
    pub message: String,
}

impl LoadIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            file: None,
            sheet: None,
            kind,
            level: kind.level(),
            message: message.into(),
        }
    }

    pub fn for_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn for_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }
}

// ==========================================
// SheetLayout - 工作表版式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SheetLayout {
    Tabular,     // 单表：一行表头 + 数据
    Blocked,     // 多块：Date: 元数据行分隔的重复块
    WideMonthly, // 宽表：每日一列（1..31）
}

// ==========================================
// SheetSummary - 单个工作表的加载结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetSummary {
    pub file: String,
    pub sheet: String,
    pub header_row: usize,    // 表头行号（相对已用区域，0 起）
    pub columns: Vec<String>, // 归一化后的列名
    pub layout: SheetLayout,
    pub rows_kept: usize,     // 产出的记录数（去重前）
    pub rows_dropped: usize,  // 缺少键字段被丢弃的行数
    #[serde(default)]
    pub rows_skipped: usize,  // 重复表头行 + 合计行
}

// ==========================================
// FileSummary - 单个文件的加载结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSummary {
    pub file: String,
    pub source_kind: SourceKind,
    pub sheets_total: usize,
    pub sheets_loaded: usize,
}

// ==========================================
// LoadReport - 一次目录加载的完整报告
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadReport {
    pub batch_id: String,           // 批次 ID（UUID）
    pub source: String,             // 源目录
    pub started_at: DateTime<Utc>,  // 开始时间
    pub elapsed_ms: u64,            // 耗时（毫秒）
    pub dedup_policy: DedupPolicy,  // 去重策略
    pub files: Vec<FileSummary>,
    pub sheets: Vec<SheetSummary>,
    pub rows_read: usize,           // 各工作表产出的记录总数
    pub rows_dropped: usize,        // 缺少键字段的行
    #[serde(default)]
    pub rows_skipped: usize,        // 重复表头行 + 合计行
    pub duplicates_removed: usize,  // 去重移除的行
    pub rows_loaded: usize,         // 最终数据集行数
    pub issues: Vec<LoadIssue>,
}

impl LoadReport {
    pub fn new(batch_id: String, source: String, dedup_policy: DedupPolicy) -> Self {
        Self {
            batch_id,
            source,
            started_at: Utc::now(),
            elapsed_ms: 0,
            dedup_policy,
            files: Vec::new(),
            sheets: Vec::new(),
            rows_read: 0,
            rows_dropped: 0,
            rows_skipped: 0,
            duplicates_removed: 0,
            rows_loaded: 0,
            issues: Vec::new(),
        }
    }

    pub fn files_scanned(&self) -> usize {
        self.files.len()
    }

    pub fn sheets_loaded(&self) -> usize {
        self.sheets.len()
    }

    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &LoadIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.level == IssueLevel::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.level == IssueLevel::Warning)
            .count()
    }
}

// ==========================================
// LoadOutcome - 加载结果（数据集 + 报告）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOutcome {
    pub dataset: CanonicalDataset,
    pub report: LoadReport,
}

impl LoadOutcome {
    /// "无数据"是正常结果，不是失败
    pub fn has_data(&self) -> bool {
        !self.dataset.is_empty()
    }
}

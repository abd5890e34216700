// ==========================================
// 轮胎厂生产 KPI 系统 - 加载层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 只有目录级故障才作为 Err 返回；文件/工作表级故障记入 LoadReport
// ==========================================

use thiserror::Error;

/// 加载层错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 目录相关错误 =====
    #[error("源目录无法读取: {path}: {message}")]
    SourceDirectoryUnreadable { path: String, message: String },

    #[error("源路径不是目录: {0}")]
    NotADirectory(String),

    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xlsm/.xls/.ods/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("工作表读取失败 (sheet: {sheet}): {message}")]
    SheetReadError { sheet: String, message: String },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 列名规则表编译失败属于内部错误
impl From<regex::Error> for ImportError {
    fn from(err: regex::Error) -> Self {
        ImportError::InternalError(format!("列名规则编译失败: {}", err))
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

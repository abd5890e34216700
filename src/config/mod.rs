// ==========================================
// 轮胎厂生产 KPI 系统 - 配置层
// ==========================================
// 职责: 默认配置 + config_kv 覆写
// 存储: config_kv 表
// ==========================================

pub mod app_config;
pub mod config_manager;
pub mod error;

// 重导出核心配置类型
pub use app_config::{AppConfig, CrossCheckConfig, KpiConfig, LoaderConfig};
pub use config_manager::{config_keys, ConfigManager};
pub use error::{ConfigError, ConfigResult};

// ==========================================
// 轮胎厂生产 KPI 系统 - 配置管理器
// ==========================================
// 职责: 在默认配置之上叠加 config_kv 表中的覆写值
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::app_config::AppConfig;
use crate::config::error::{ConfigError, ConfigResult};
use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::domain::types::{CanonicalColumn, DedupPolicy};
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（自动建表）
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA 与建表（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| ConfigError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    pub fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ConfigError::ReadError {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        debug!(key = key, "配置已写入");
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 读取生效配置：默认值 + config_kv 覆写
    pub fn load_app_config(&self) -> ConfigResult<AppConfig> {
        let mut config = AppConfig::default();
        let mut overrides = 0usize;

        // ===== 加载层 =====
        if let Some(v) = self.get_config_value(config_keys::HEADER_KEYWORDS)? {
            config.loader.header_keywords = split_list(&v)
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect();
            overrides += 1;
        }
        if let Some(v) = self.get_config_value(config_keys::MIN_HEADER_SCORE)? {
            config.loader.min_header_score = parse_value(config_keys::MIN_HEADER_SCORE, &v)?;
            overrides += 1;
        }
        if let Some(v) = self.get_config_value(config_keys::ESSENTIAL_COLUMNS)? {
            config.loader.essential_columns = split_list(&v)
                .iter()
                .map(|s| parse_value::<CanonicalColumn>(config_keys::ESSENTIAL_COLUMNS, s))
                .collect::<ConfigResult<Vec<_>>>()?;
            overrides += 1;
        }
        if let Some(v) = self.get_config_value(config_keys::MIN_ESSENTIAL_OVERLAP)? {
            config.loader.min_essential_overlap =
                parse_value(config_keys::MIN_ESSENTIAL_OVERLAP, &v)?;
            overrides += 1;
        }
        if let Some(v) = self.get_config_value(config_keys::DATE_FORMATS)? {
            // 日期格式本身可能含逗号，因此使用 JSON 数组
            config.loader.date_formats =
                serde_json::from_str(&v).map_err(|e| ConfigError::ValueError {
                    key: config_keys::DATE_FORMATS.to_string(),
                    value: v.clone(),
                    message: e.to_string(),
                })?;
            overrides += 1;
        }
        if let Some(v) = self.get_config_value(config_keys::FILE_EXTENSIONS)? {
            config.loader.file_extensions = split_list(&v)
                .into_iter()
                .map(|s| s.trim_start_matches('.').to_lowercase())
                .collect();
            overrides += 1;
        }
        if let Some(v) = self.get_config_value(config_keys::SUMMARY_ROW_MARKERS)? {
            config.loader.summary_row_markers = split_list(&v)
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect();
            overrides += 1;
        }
        if let Some(v) = self.get_config_value(config_keys::DEDUP_POLICY)? {
            config.loader.dedup_policy = parse_value::<DedupPolicy>(config_keys::DEDUP_POLICY, &v)?;
            overrides += 1;
        }
        if let Some(v) = self.get_config_value(config_keys::DERIVE_QUANTITY_FROM_GRADES)? {
            config.loader.derive_quantity_from_grades = parse_flag(&v);
            overrides += 1;
        }

        // ===== KPI 引擎 =====
        if let Some(v) = self.get_config_value(config_keys::QUALITY_RATE_ALERT)? {
            config.kpi.quality_rate_alert = parse_value(config_keys::QUALITY_RATE_ALERT, &v)?;
            overrides += 1;
        }
        if let Some(v) = self.get_config_value(config_keys::TARGET_ACHIEVEMENT_ALERT)? {
            config.kpi.target_achievement_alert =
                parse_value(config_keys::TARGET_ACHIEVEMENT_ALERT, &v)?;
            overrides += 1;
        }
        if let Some(v) = self.get_config_value(config_keys::TOP_SIZES_LIMIT)? {
            config.kpi.top_sizes_limit = parse_value(config_keys::TOP_SIZES_LIMIT, &v)?;
            overrides += 1;
        }
        if let Some(v) = self.get_config_value(config_keys::TREND_WINDOW)? {
            config.kpi.trend_window = parse_value(config_keys::TREND_WINDOW, &v)?;
            overrides += 1;
        }
        if let Some(v) = self.get_config_value(config_keys::TREND_MIN_PERIODS)? {
            config.kpi.trend_min_periods = parse_value(config_keys::TREND_MIN_PERIODS, &v)?;
            overrides += 1;
        }

        // ===== 交叉校验 =====
        if let Some(v) = self.get_config_value(config_keys::MAX_VARIANCE_PCT)? {
            config.cross_check.max_variance_pct = parse_value(config_keys::MAX_VARIANCE_PCT, &v)?;
            overrides += 1;
        }

        info!(overrides = overrides, "配置加载完成");
        Ok(config)
    }
}

/// 解析单个配置值
fn parse_value<T>(key: &str, raw: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::ValueError {
        key: key.to_string(),
        value: raw.to_string(),
        message: e.to_string(),
    })
}

/// 逗号分隔列表（忽略空项）
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn parse_flag(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 表头识别
    pub const HEADER_KEYWORDS: &str = "loader.header_keywords"; // 逗号分隔
    pub const MIN_HEADER_SCORE: &str = "loader.min_header_score";

    // 必要列
    pub const ESSENTIAL_COLUMNS: &str = "loader.essential_columns"; // 逗号分隔
    pub const MIN_ESSENTIAL_OVERLAP: &str = "loader.min_essential_overlap";

    // 文件枚举
    pub const FILE_EXTENSIONS: &str = "loader.file_extensions"; // 逗号分隔，不含点

    // 合计行
    pub const SUMMARY_ROW_MARKERS: &str = "loader.summary_row_markers"; // 逗号分隔

    // 类型转换
    pub const DATE_FORMATS: &str = "loader.date_formats"; // JSON 数组
    pub const DERIVE_QUANTITY_FROM_GRADES: &str = "loader.derive_quantity_from_grades";

    // 去重
    pub const DEDUP_POLICY: &str = "loader.dedup_policy";

    // KPI
    pub const QUALITY_RATE_ALERT: &str = "kpi.quality_rate_alert";
    pub const TARGET_ACHIEVEMENT_ALERT: &str = "kpi.target_achievement_alert";
    pub const TOP_SIZES_LIMIT: &str = "kpi.top_sizes_limit";
    pub const TREND_WINDOW: &str = "kpi.trend_window";
    pub const TREND_MIN_PERIODS: &str = "kpi.trend_min_periods";

    // 交叉校验
    pub const MAX_VARIANCE_PCT: &str = "cross_check.max_variance_pct";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_without_overrides() {
        let manager = memory_manager();
        let config = manager.load_app_config().unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_overrides_applied() {
        let manager = memory_manager();
        manager.set_config_value(config_keys::MIN_HEADER_SCORE, "3").unwrap();
        manager.set_config_value(config_keys::DEDUP_POLICY, "keep_last").unwrap();
        manager
            .set_config_value(config_keys::ESSENTIAL_COLUMNS, "date, tyre_size")
            .unwrap();
        manager
            .set_config_value(config_keys::DATE_FORMATS, r#"["%d/%m/%Y", "%b %d, %Y"]"#)
            .unwrap();
        manager.set_config_value(config_keys::MAX_VARIANCE_PCT, "15.5").unwrap();

        let config = manager.load_app_config().unwrap();
        assert_eq!(config.loader.min_header_score, 3);
        assert_eq!(config.loader.dedup_policy, DedupPolicy::KeepLast);
        assert_eq!(
            config.loader.essential_columns,
            vec![CanonicalColumn::Date, CanonicalColumn::TyreSize]
        );
        assert_eq!(config.loader.date_formats, vec!["%d/%m/%Y", "%b %d, %Y"]);
        assert_eq!(config.cross_check.max_variance_pct, 15.5);
    }

    #[test]
    fn test_invalid_value_reports_key() {
        let manager = memory_manager();
        manager.set_config_value(config_keys::TOP_SIZES_LIMIT, "many").unwrap();

        let err = manager.load_app_config().unwrap_err();
        assert!(err.to_string().contains(config_keys::TOP_SIZES_LIMIT));
    }

    #[test]
    fn test_snapshot_contains_overrides() {
        let manager = memory_manager();
        manager.set_config_value(config_keys::TREND_WINDOW, "14").unwrap();

        let snapshot = manager.get_config_snapshot().unwrap();
        let map: BTreeMap<String, String> = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(map.get(config_keys::TREND_WINDOW), Some(&"14".to_string()));
    }
}

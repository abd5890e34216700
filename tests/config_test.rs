// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 默认配置 + config_kv 覆写 + 配置快照
// ==========================================


use test_helpers::create_test_db;
use tyre_kpi::config::{config_keys, AppConfig, ConfigManager};
use tyre_kpi::domain::{CanonicalColumn, DedupPolicy};

#[test]
fn test_defaults_without_overrides() {
    let (_temp, db_path) = create_test_db().unwrap();
    let manager = ConfigManager::new(&db_path).unwrap();

    let config = manager.load_app_config().unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.loader.min_header_score, 2);
    assert_eq!(config.kpi.quality_rate_alert, 95.0);
    assert_eq!(config.cross_check.max_variance_pct, 10.0);
}

#[test]
fn test_overrides_are_applied() {
    let (_temp, db_path) = create_test_db().unwrap();
    let manager = ConfigManager::new(&db_path).unwrap();

    manager
        .set_config_value(config_keys::DEDUP_POLICY, "keep_last")
        .unwrap();
    manager
        .set_config_value(config_keys::ESSENTIAL_COLUMNS, "date, tyre_size")
        .unwrap();
    manager
        .set_config_value(config_keys::TOP_SIZES_LIMIT, "3")
        .unwrap();

    let config = manager.load_app_config().unwrap();
    assert_eq!(config.loader.dedup_policy, DedupPolicy::KeepLast);
    assert_eq!(
        config.loader.essential_columns,
        vec![CanonicalColumn::Date, CanonicalColumn::TyreSize]
    );
    assert_eq!(config.kpi.top_sizes_limit, 3);
}

#[test]
fn test_list_overrides_for_extensions_and_summary_markers() {
    let (_temp, db_path) = create_test_db().unwrap();
    let manager = ConfigManager::new(&db_path).unwrap();

    manager
        .set_config_value(config_keys::FILE_EXTENSIONS, "XLSX, .csv,")
        .unwrap();
    manager
        .set_config_value(config_keys::SUMMARY_ROW_MARKERS, "Total, Grand Total, Gesamt")
        .unwrap();

    let config = manager.load_app_config().unwrap();
    assert_eq!(config.loader.file_extensions, vec!["xlsx", "csv"]);
    assert!(config.loader.accepts_extension("CSV"));
    assert!(!config.loader.accepts_extension("ods"));
    assert_eq!(
        config.loader.summary_row_markers,
        vec!["total", "grand total", "gesamt"]
    );
}

#[test]
fn test_overrides_survive_reopen() {
    let (_temp, db_path) = create_test_db().unwrap();
    ConfigManager::new(&db_path)
        .unwrap()
        .set_config_value(config_keys::MAX_VARIANCE_PCT, "5.5")
        .unwrap();

    let reopened = ConfigManager::new(&db_path).unwrap();
    assert_eq!(
        reopened.load_app_config().unwrap().cross_check.max_variance_pct,
        5.5
    );
}

#[test]
fn test_invalid_override_is_an_error() {
    let (_temp, db_path) = create_test_db().unwrap();
    let manager = ConfigManager::new(&db_path).unwrap();
    manager
        .set_config_value(config_keys::MIN_HEADER_SCORE, "two")
        .unwrap();

    assert!(manager.load_app_config().is_err());
}

#[test]
fn test_app_config_json_fills_missing_fields() {
    let config = AppConfig::from_json_str(r#"{"kpi": {"top_sizes_limit": 2}}"#).unwrap();
    assert_eq!(config.kpi.top_sizes_limit, 2);
    assert_eq!(config.kpi.trend_window, 7);
    assert_eq!(config.loader.min_header_score, 2);

    let json = config.to_json_string().unwrap();
    assert_eq!(AppConfig::from_json_str(&json).unwrap(), config);
}

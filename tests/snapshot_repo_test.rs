// ==========================================
// SnapshotRepository 集成测试
// ==========================================
// 测试目标: 加载 → 快照 → 持久化 → 读回
// ==========================================


use std::sync::{Arc, Mutex};
use test_helpers::{create_source_dir, create_test_db, daily_report_lines, write_csv};
use tyre_kpi::config::{ConfigManager, LoaderConfig};
use tyre_kpi::engine::KpiEngine;
use tyre_kpi::importer::ProductionLoader;
use tyre_kpi::repository::SnapshotRepository;

#[test]
fn test_snapshot_round_trip_through_database() {
    let (_temp, db_path) = create_test_db().unwrap();
    let dir = create_source_dir();
    write_csv(dir.path(), "daily_report.csv", &daily_report_lines());

    let outcome = ProductionLoader::new(LoaderConfig::default())
        .unwrap()
        .load_directory(dir.path())
        .unwrap();
    let snapshot = KpiEngine::default().snapshot(&outcome.dataset);

    let repo = SnapshotRepository::new(&db_path).unwrap();
    let id = repo
        .insert(Some(outcome.report.batch_id.as_str()), &snapshot)
        .unwrap();

    let reopened = SnapshotRepository::new(&db_path).unwrap();
    let stored = reopened.latest().unwrap().unwrap();
    assert_eq!(stored.snapshot_id, id);
    assert_eq!(stored.batch_id.as_deref(), Some(outcome.report.batch_id.as_str()));
    assert_eq!(stored.snapshot.row_count, 2);
    assert_eq!(stored.snapshot.latest_date, snapshot.latest_date);
    assert_eq!(stored.snapshot.overall.production, 300.0);
    assert_eq!(stored.snapshot.overall.target_achievement, 100.0);
    assert_eq!(stored.snapshot.top_sizes, snapshot.top_sizes);
    assert_eq!(stored.snapshot.recommendations, snapshot.recommendations);
    assert_eq!(stored.snapshot.trend.len(), snapshot.trend.len());
}

#[test]
fn test_shared_connection_with_config_manager() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let conn = Arc::new(Mutex::new(conn));

    let config = ConfigManager::from_connection(conn.clone())
        .unwrap()
        .load_app_config()
        .unwrap();
    let repo = SnapshotRepository::from_connection(conn).unwrap();

    let snapshot = KpiEngine::new(config.kpi).snapshot(&Default::default());
    repo.insert(None, &snapshot).unwrap();

    assert_eq!(repo.count().unwrap(), 1);
    assert_eq!(repo.list_recent(10).unwrap().len(), 1);
}

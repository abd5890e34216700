// ==========================================
// 轮胎厂生产 KPI 系统 - 命令行入口
// ==========================================
// 用法: tyre-kpi [data_dir] [db_path] [board_dir]
// 流程: 配置覆写 → 加载报表 → KPI 快照 + 质量检查 → 看板交叉校验（可选）
//       → 保存快照 → 输出 JSON
// ==========================================

use anyhow::Context;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tyre_kpi::config::ConfigManager;
use tyre_kpi::engine::{
    CrossValidator, KpiEngine, NarrativeGenerator, PlainNarrative, QualityChecker,
    SidecarTextReader,
};
use tyre_kpi::importer::ProductionLoader;
use tyre_kpi::repository::SnapshotRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tyre_kpi::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", tyre_kpi::APP_NAME);
    tracing::info!("系统版本: {}", tyre_kpi::VERSION);
    tracing::info!("==================================================");

    let mut args = std::env::args().skip(1);
    let data_dir = PathBuf::from(args.next().unwrap_or_else(|| "data".to_string()));
    let db_path = args.next().unwrap_or_else(get_default_db_path);
    let board_dir = args.next().map(PathBuf::from);
    tracing::info!("使用数据库: {}", db_path);

    let conn = tyre_kpi::db::open_and_init(&db_path)
        .with_context(|| format!("无法打开数据库 {}", db_path))?;
    let conn = Arc::new(Mutex::new(conn));

    let config = ConfigManager::from_connection(conn.clone())?.load_app_config()?;

    let loader = Arc::new(ProductionLoader::new(config.loader.clone())?);
    let outcome = loader.load_directory_concurrent(data_dir).await?;

    let engine = KpiEngine::new(config.kpi.clone());
    let snapshot = engine.snapshot(&outcome.dataset);
    let findings = QualityChecker::new().check(&outcome.dataset);

    // 看板照片旁路文本（外部 OCR 生成的同名 .txt）
    let cross_check = match &board_dir {
        Some(dir) => Some(
            CrossValidator::new(config.cross_check.clone())
                .validate_directory(&outcome.dataset, &SidecarTextReader, dir)
                .await
                .with_context(|| format!("无法读取看板目录 {}", dir.display()))?,
        ),
        None => None,
    };

    let repo = SnapshotRepository::from_connection(conn)?;
    let snapshot_id = repo.insert(Some(outcome.report.batch_id.as_str()), &snapshot)?;

    let summary = PlainNarrative.narrate(&snapshot).await?;

    let output = serde_json::json!({
        "snapshot_id": snapshot_id,
        "report": outcome.report,
        "kpis": snapshot,
        "findings": findings,
        "cross_check": cross_check,
        "summary": summary,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// 默认数据库路径：TYRE_KPI_DB_PATH → 用户数据目录 → 当前目录
fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var("TYRE_KPI_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./tyre_kpi.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("tyre-kpi");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("tyre_kpi.db");
        }
    }
    path.to_string_lossy().into_owned()
}

// ==========================================
// 轮胎厂生产 KPI 系统 - KPI 快照仓储
// ==========================================
// 职责: kpi_snapshot 表的追加与查询
// 红线: 快照写入后不可修改；Repository 不含业务逻辑
// ==========================================

use crate::domain::kpi::KpiSnapshot;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::SecondsFormat;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

/// 已存储的快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub snapshot_id: String,
    pub batch_id: Option<String>,
    pub snapshot: KpiSnapshot,
}

// ==========================================
// SnapshotRepository - KPI 快照仓储
// ==========================================
pub struct SnapshotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SnapshotRepository {
    /// 打开数据库并确保 schema 就绪
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_and_init(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::init_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加快照，返回 snapshot_id
    pub fn insert(&self, batch_id: Option<&str>, snapshot: &KpiSnapshot) -> RepositoryResult<String> {
        let snapshot_id = Uuid::new_v4().to_string();
        let payload = serde_json::to_string(snapshot)?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO kpi_snapshot (
                snapshot_id, batch_id, latest_date, row_count, computed_at, payload_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                snapshot_id,
                batch_id,
                snapshot.latest_date.map(|d| d.to_string()),
                snapshot.row_count as i64,
                snapshot
                    .computed_at
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
                payload,
            ],
        )?;

        info!(snapshot_id = %snapshot_id, rows = snapshot.row_count, "KPI 快照已保存");
        Ok(snapshot_id)
    }

    /// 按 ID 查询
    pub fn find_by_id(&self, snapshot_id: &str) -> RepositoryResult<Option<StoredSnapshot>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                "SELECT snapshot_id, batch_id, payload_json FROM kpi_snapshot WHERE snapshot_id = ?1",
                params![snapshot_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?, row.get::<_, String>(2)?)),
            )
            .optional()?;

        row.map(decode_row).transpose()
    }

    /// 最近一次快照
    pub fn latest(&self) -> RepositoryResult<Option<StoredSnapshot>> {
        Ok(self.list_recent(1)?.into_iter().next())
    }

    /// 最近 N 条（按计算时间倒序）
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<StoredSnapshot>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT snapshot_id, batch_id, payload_json
            FROM kpi_snapshot
            ORDER BY computed_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?, row.get::<_, String>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(decode_row).collect()
    }

    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM kpi_snapshot", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn decode_row((snapshot_id, batch_id, payload): (String, Option<String>, String)) -> RepositoryResult<StoredSnapshot> {
    Ok(StoredSnapshot {
        snapshot_id,
        batch_id,
        snapshot: serde_json::from_str(&payload)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{CanonicalDataset, CanonicalRecord};
    use crate::engine::KpiEngine;
    use chrono::{Duration, NaiveDate, Utc};

    fn repo() -> SnapshotRepository {
        let conn = Connection::open_in_memory().unwrap();
        SnapshotRepository::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    fn snapshot(offset_secs: i64) -> KpiSnapshot {
        let mut r = CanonicalRecord::new(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), "A", "t.csv");
        r.quantity = 100.0;
        r.target = 200.0;
        KpiEngine::default().snapshot_at(
            &CanonicalDataset::from_records(vec![r]),
            Utc::now() + Duration::seconds(offset_secs),
        )
    }

    #[test]
    fn test_insert_and_find() {
        let repo = repo();
        let snap = snapshot(0);
        let id = repo.insert(Some("batch-1"), &snap).unwrap();

        let stored = repo.find_by_id(&id).unwrap().unwrap();
        assert_eq!(stored.batch_id.as_deref(), Some("batch-1"));
        assert_eq!(stored.snapshot.overall.production, 100.0);
        assert_eq!(stored.snapshot.overall.target_achievement, 50.0);
        assert!(repo.find_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn test_latest_and_recent_order() {
        let repo = repo();
        assert!(repo.latest().unwrap().is_none());

        repo.insert(None, &snapshot(-60)).unwrap();
        let newest = repo.insert(None, &snapshot(0)).unwrap();
        repo.insert(None, &snapshot(-120)).unwrap();

        assert_eq!(repo.count().unwrap(), 3);
        assert_eq!(repo.latest().unwrap().unwrap().snapshot_id, newest);
        assert_eq!(repo.list_recent(2).unwrap().len(), 2);
    }
}

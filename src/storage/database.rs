//! 数据库存储模块
//!
//! 使用SQLite存储用户筛选预设

use crate::core::models::{FilterPreset, PresetOrigin};
use anyhow::Result;
use rusqlite::{params, Connection};
use std::path::Path;

/// 数据库管理器
pub struct Database {
    conn: Connection,
}

fn parse_timestamp(value: &str) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&chrono::Utc))
        .unwrap_or_else(|_| chrono::Utc::now())
}

impl Database {
    /// 打开或创建数据库
    pub fn open(path: &Path) -> Result<Self> {
        // 确保目录存在
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_tables()?;
        Ok(db)
    }

    /// 打开内存数据库
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_tables()?;
        Ok(db)
    }

    /// 初始化表结构
    fn init_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            -- 预设表
            CREATE TABLE IF NOT EXISTS presets (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                criteria_json TEXT NOT NULL,
                origin TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                hit_count INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_presets_hits ON presets(hit_count DESC);
            "#,
        )?;
        Ok(())
    }

    /// 保存预设，同名预设被覆盖
    ///
    /// id 或 name 冲突的旧行由同一条 `INSERT OR REPLACE` 语句删除。
    pub fn save_preset(&self, preset: &FilterPreset) -> Result<()> {
        let criteria_json = serde_json::to_string(&preset.criteria)?;
        let origin = format!("{:?}", preset.origin);
        let created_at = preset.created_at.to_rfc3339();
        let updated_at = preset.updated_at.to_rfc3339();

        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO presets
            (id, name, criteria_json, origin, created_at, updated_at, hit_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                preset.id,
                preset.name,
                criteria_json,
                origin,
                created_at,
                updated_at,
                preset.hit_count,
            ],
        )?;
        Ok(())
    }

    /// 加载所有用户预设
    pub fn load_user_presets(&self) -> Result<Vec<FilterPreset>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, criteria_json, created_at, updated_at, hit_count
            FROM presets
            WHERE origin = 'User'
            ORDER BY name ASC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, u64>(5)?,
            ))
        })?;

        let mut presets = Vec::new();
        for row in rows {
            let (id, name, criteria_json, created_at, updated_at, hit_count) = row?;
            // 损坏的筛选条件只跳过该行
            let criteria = match serde_json::from_str(&criteria_json) {
                Ok(criteria) => criteria,
                Err(e) => {
                    tracing::warn!("跳过无法解析的预设 {} ({}): {}", name, id, e);
                    continue;
                }
            };
            presets.push(FilterPreset {
                id,
                name,
                criteria,
                origin: PresetOrigin::User,
                created_at: parse_timestamp(&created_at),
                updated_at: parse_timestamp(&updated_at),
                hit_count,
            });
        }
        Ok(presets)
    }

    /// 删除预设
    pub fn delete_preset(&self, preset_id: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM presets WHERE id = ?1", params![preset_id])?;
        Ok(affected > 0)
    }

    /// 记录一次预设使用
    pub fn record_hit(&self, preset_id: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE presets SET hit_count = hit_count + 1, updated_at = ?2 WHERE id = ?1",
            params![preset_id, now],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::FilterCriteria;
    use tempfile::tempdir;

    #[test]
    fn test_database_init() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let _db = Database::open(&db_path).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_preset_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let preset = FilterPreset::new(
            "Delhi seed".to_string(),
            FilterCriteria::all()
                .with_cities(["New Delhi"])
                .with_investment_types(["Seed Funding"])
                .with_year_range(2015, 2017),
        );
        db.save_preset(&preset).unwrap();
        db.record_hit(&preset.id).unwrap();

        let loaded = db.load_user_presets().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "Delhi seed");
        assert_eq!(loaded[0].criteria, preset.criteria);
        assert_eq!(loaded[0].hit_count, 1);

        assert!(db.delete_preset(&preset.id).unwrap());
        assert!(!db.delete_preset(&preset.id).unwrap());
        assert!(db.load_user_presets().unwrap().is_empty());
    }

    #[test]
    fn test_same_name_replaces_preset() {
        let db = Database::open_in_memory().unwrap();
        db.save_preset(&FilterPreset::new("x".to_string(), FilterCriteria::all()))
            .unwrap();
        let newer = FilterPreset::new("x".to_string(), FilterCriteria::all().with_months([3]));
        db.save_preset(&newer).unwrap();

        let loaded = db.load_user_presets().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, newer.id);
    }

    #[test]
    fn test_renamed_preset_keeps_single_row() {
        let db = Database::open_in_memory().unwrap();
        let mut preset = FilterPreset::new("old".to_string(), FilterCriteria::all());
        db.save_preset(&preset).unwrap();
        preset.name = "new".to_string();
        db.save_preset(&preset).unwrap();

        let loaded = db.load_user_presets().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "new");
    }

    #[test]
    fn test_corrupt_preset_row_is_skipped() {
        let db = Database::open_in_memory().unwrap();
        let good = FilterPreset::new("good".to_string(), FilterCriteria::all().with_months([6]));
        db.save_preset(&good).unwrap();
        db.conn
            .execute(
                r#"
                INSERT INTO presets (id, name, criteria_json, origin, created_at, updated_at, hit_count)
                VALUES ('broken-id', 'broken', '{not json', 'User', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z', 0)
                "#,
                [],
            )
            .unwrap();

        let loaded = db.load_user_presets().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, good.id);
        assert_eq!(loaded[0].criteria, good.criteria);
    }
}

// ==========================================
// CSV 行数据导入器 - SQLite 记录存储实现
// ==========================================
// 职责: 基于 rusqlite 实现 RecordStore
// 要点: PRAGMA table_info 结构反射（带缓存）、
//       属性等值集合 → 参数化 WHERE、
//       约束违反 → save 返回 Ok(false)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::{ColumnInfo, Record, TableSchema, Value};
use crate::repository::error::{StoreError, StoreResult};
use crate::repository::record_store::RecordStore;
use rusqlite::{Connection, OptionalExtension, ToSql};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

// ==========================================
// SqliteRecordStore
// ==========================================
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
    // 表结构缓存（表名 → 反射结果）
    schemas: Mutex<HashMap<String, Arc<TableSchema>>>,
}

impl SqliteRecordStore {
    /// 打开数据库文件并创建存储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> StoreResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// 基于已有连接创建存储实例
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            schemas: Mutex::new(HashMap::new()),
        }
    }

    /// 创建内存数据库存储（测试用）
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    fn lock_conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }

    /// 通过 PRAGMA table_info 反射表结构
    fn load_schema(conn: &Connection, table: &str) -> StoreResult<TableSchema> {
        let sql = format!("PRAGMA table_info({})", quote_ident(table));
        let mut stmt = conn.prepare(&sql)?;

        // table_info 列序: cid, name, type, notnull, dflt_value, pk
        let columns = stmt
            .query_map([], |row| {
                let decl_type: String = row.get(2)?;
                Ok(ColumnInfo {
                    name: row.get(1)?,
                    decl_type: if decl_type.is_empty() {
                        None
                    } else {
                        Some(decl_type)
                    },
                    not_null: row.get::<_, i64>(3)? != 0,
                    // pk 字段为主键序号（0 = 非主键）
                    is_pk: row.get::<_, i64>(5)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(StoreError::TableNotFound(table.to_string()));
        }

        let pk_count = columns.iter().filter(|c| c.is_pk).count();
        if pk_count > 1 {
            return Err(StoreError::UnsupportedSchema {
                table: table.to_string(),
                message: format!("仅支持单列主键，实际主键列数: {}", pk_count),
            });
        }

        Ok(TableSchema::new(table, columns))
    }

    /// 执行 INSERT，填充主键标识
    fn insert_row(&self, record: &mut Record) -> StoreResult<bool> {
        let schema = record.schema_cloned();
        let table = schema.table().to_string();

        let mut cols: Vec<String> = Vec::new();
        let mut bound: Vec<Value> = Vec::new();
        for col in schema.columns() {
            if let Some(value) = record.get_attribute(&col.name) {
                cols.push(quote_ident(&col.name));
                bound.push(value.clone());
            }
        }

        let sql = if cols.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(&table))
        } else {
            let placeholders: Vec<String> =
                (1..=cols.len()).map(|i| format!("?{}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(&table),
                cols.join(", "),
                placeholders.join(", ")
            )
        };

        let rowid = {
            let conn = self.lock_conn()?;
            let params: Vec<&dyn ToSql> = bound.iter().map(|v| v as &dyn ToSql).collect();
            match conn.execute(&sql, params.as_slice()) {
                Ok(_) => conn.last_insert_rowid(),
                Err(e) if is_constraint_violation(&e) => {
                    debug!(table = %table, error = %e, "插入校验失败（约束违反）");
                    return Ok(false);
                }
                Err(e) => return Err(e.into()),
            }
        };

        // 主键标识: 显式赋值的主键列优先，否则回填 rowid
        let pk = match schema.pk_column() {
            Some(pk_col) => match record.get_attribute(pk_col) {
                Some(v) if !v.is_null() => v.clone(),
                _ => {
                    record.set_attribute(pk_col, Value::Integer(rowid));
                    Value::Integer(rowid)
                }
            },
            None => Value::Integer(rowid),
        };
        record.set_stored_pk(pk);

        Ok(true)
    }

    /// 执行 UPDATE（按主键定位，写入所有已设置的非主键列）
    fn update_row(&self, record: &mut Record) -> StoreResult<bool> {
        let schema = record.schema_cloned();
        let table = schema.table().to_string();

        let pk_value = record
            .identifier()
            .cloned()
            .ok_or_else(|| StoreError::MissingIdentifier(table.clone()))?;
        // 无声明主键的表按 rowid 定位（查询命中时标识即为 rowid）
        let key_col = match schema.pk_column() {
            Some(pk_col) => quote_ident(pk_col),
            None => "rowid".to_string(),
        };

        let mut sets: Vec<String> = Vec::new();
        let mut bound: Vec<Value> = Vec::new();
        for col in schema.columns() {
            if col.is_pk {
                continue;
            }
            if let Some(value) = record.get_attribute(&col.name) {
                bound.push(value.clone());
                sets.push(format!("{} = ?{}", quote_ident(&col.name), bound.len()));
            }
        }

        if sets.is_empty() {
            return Ok(true);
        }

        bound.push(pk_value);
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            quote_ident(&table),
            sets.join(", "),
            key_col,
            bound.len()
        );

        let conn = self.lock_conn()?;
        let params: Vec<&dyn ToSql> = bound.iter().map(|v| v as &dyn ToSql).collect();
        match conn.execute(&sql, params.as_slice()) {
            Ok(_) => Ok(true),
            Err(e) if is_constraint_violation(&e) => {
                debug!(table = %table, error = %e, "更新校验失败（约束违反）");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl RecordStore for SqliteRecordStore {
    fn schema(&self, table: &str) -> StoreResult<Arc<TableSchema>> {
        {
            let schemas = self
                .schemas
                .lock()
                .map_err(|e| StoreError::LockError(e.to_string()))?;
            if let Some(schema) = schemas.get(table) {
                return Ok(Arc::clone(schema));
            }
        }

        let schema = {
            let conn = self.lock_conn()?;
            Arc::new(Self::load_schema(&conn, table)?)
        };

        let mut schemas = self
            .schemas
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))?;
        schemas.insert(table.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    fn new_record(&self, table: &str) -> StoreResult<Record> {
        Ok(Record::new(self.schema(table)?))
    }

    fn exists_matching(&self, table: &str, criteria: &[(String, Value)]) -> StoreResult<bool> {
        // 先反射表结构，保证表名合法
        let _schema = self.schema(table)?;
        let (clause, params) = build_where(criteria);

        let sql = if clause.is_empty() {
            format!("SELECT EXISTS(SELECT 1 FROM {})", quote_ident(table))
        } else {
            format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {})",
                quote_ident(table),
                clause
            )
        };

        let conn = self.lock_conn()?;
        let exists: i64 = conn.query_row(&sql, params.as_slice(), |row| row.get(0))?;
        Ok(exists != 0)
    }

    fn find_one_matching(
        &self,
        table: &str,
        criteria: &[(String, Value)],
    ) -> StoreResult<Option<Record>> {
        let schema = self.schema(table)?;
        let has_pk = schema.pk_column().is_some();

        let mut select_cols: Vec<String> = schema
            .columns()
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect();
        if !has_pk {
            // 无声明主键的表以 rowid 作为标识
            select_cols.insert(0, "rowid".to_string());
        }

        let (clause, params) = build_where(criteria);
        let sql = if clause.is_empty() {
            format!(
                "SELECT {} FROM {} LIMIT 1",
                select_cols.join(", "),
                quote_ident(table)
            )
        } else {
            format!(
                "SELECT {} FROM {} WHERE {} LIMIT 1",
                select_cols.join(", "),
                quote_ident(table),
                clause
            )
        };

        let schema_for_row = Arc::clone(&schema);
        let hit = {
            let conn = self.lock_conn()?;
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_row(params.as_slice(), |row| {
                let offset = usize::from(!has_pk);
                let rowid: i64 = if has_pk { 0 } else { row.get(0)? };
                let mut values = HashMap::new();
                for (i, col) in schema_for_row.columns().iter().enumerate() {
                    values.insert(col.name.clone(), Value::from(row.get_ref(i + offset)?));
                }
                Ok((rowid, values))
            })
            .optional()?
        };

        let Some((rowid, values)) = hit else {
            return Ok(None);
        };

        let stored_pk = match schema.pk_column() {
            Some(pk_col) => values.get(pk_col).cloned().unwrap_or(Value::Null),
            None => Value::Integer(rowid),
        };

        Ok(Some(Record::restored(schema, values, stored_pk)))
    }

    fn save(&self, record: &mut Record) -> StoreResult<bool> {
        if record.is_persisted() {
            self.update_row(record)
        } else {
            self.insert_row(record)
        }
    }
}

/// 标识符转义（表名/列名均来自结构反射或调用方配置）
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// 属性等值集合 → 参数化 WHERE 子句
///
/// 空值条件按 IS NULL 匹配（`= NULL` 永不命中）。
fn build_where(criteria: &[(String, Value)]) -> (String, Vec<&dyn ToSql>) {
    let mut parts: Vec<String> = Vec::new();
    let mut params: Vec<&dyn ToSql> = Vec::new();

    for (attribute, value) in criteria {
        if value.is_null() {
            parts.push(format!("{} IS NULL", quote_ident(attribute)));
        } else {
            params.push(value as &dyn ToSql);
            parts.push(format!("{} = ?{}", quote_ident(attribute), params.len()));
        }
    }

    (parts.join(" AND "), params)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteRecordStore {
        let store = SqliteRecordStore::in_memory().expect("Failed to create in-memory store");
        {
            let conn = store.lock_conn().unwrap();
            conn.execute_batch(
                r#"
                CREATE TABLE users (
                    id INTEGER PRIMARY KEY,
                    email TEXT NOT NULL,
                    name TEXT NOT NULL,
                    age INTEGER
                );
                CREATE TABLE audit_log (
                    event TEXT,
                    detail TEXT
                );
                "#,
            )
            .unwrap();
        }
        store
    }

    #[test]
    fn test_schema_reflection() {
        let store = create_test_store();
        let schema = store.schema("users").unwrap();

        assert_eq!(schema.table(), "users");
        assert_eq!(schema.columns().len(), 4);
        assert_eq!(schema.pk_column(), Some("id"));
        assert!(schema.has_column("email"));
        assert!(!schema.has_column("nickname"));
    }

    #[test]
    fn test_schema_missing_table() {
        let store = create_test_store();
        let result = store.schema("missing");
        assert!(matches!(result, Err(StoreError::TableNotFound(_))));
    }

    #[test]
    fn test_insert_assigns_rowid_pk() {
        let store = create_test_store();
        let mut record = store.new_record("users").unwrap();
        record.set_attribute("email", "a@x.com");
        record.set_attribute("name", "A");

        let saved = store.save(&mut record).unwrap();

        assert!(saved);
        assert!(record.is_persisted());
        assert_eq!(record.identifier(), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_insert_constraint_violation_returns_false() {
        let store = create_test_store();
        let mut record = store.new_record("users").unwrap();
        record.set_attribute("email", "a@x.com");
        // name 缺失 → NOT NULL 约束违反

        let saved = store.save(&mut record).unwrap();

        assert!(!saved);
        assert!(!record.is_persisted());
        assert!(!store.exists_matching("users", &[]).unwrap());
    }

    #[test]
    fn test_exists_and_find_by_criteria() {
        let store = create_test_store();
        let mut record = store.new_record("users").unwrap();
        record.set_attribute("email", "a@x.com");
        record.set_attribute("name", "A");
        store.save(&mut record).unwrap();

        let criteria = vec![("email".to_string(), Value::Text("a@x.com".to_string()))];
        assert!(store.exists_matching("users", &criteria).unwrap());

        let found = store.find_one_matching("users", &criteria).unwrap().unwrap();
        assert_eq!(found.identifier(), Some(&Value::Integer(1)));
        assert_eq!(
            found.get_attribute("name"),
            Some(&Value::Text("A".to_string()))
        );
        // 未赋值的列读回为 Null
        assert_eq!(found.get_attribute("age"), Some(&Value::Null));

        let missing = vec![("email".to_string(), Value::Text("b@y.com".to_string()))];
        assert!(!store.exists_matching("users", &missing).unwrap());
        assert!(store.find_one_matching("users", &missing).unwrap().is_none());
    }

    #[test]
    fn test_null_criterion_matches_is_null() {
        let store = create_test_store();
        let mut record = store.new_record("users").unwrap();
        record.set_attribute("email", "a@x.com");
        record.set_attribute("name", "A");
        record.set_attribute("age", Value::Null);
        store.save(&mut record).unwrap();

        let criteria = vec![("age".to_string(), Value::Null)];
        assert!(store.exists_matching("users", &criteria).unwrap());
    }

    #[test]
    fn test_update_persisted_record() {
        let store = create_test_store();
        let mut record = store.new_record("users").unwrap();
        record.set_attribute("email", "a@x.com");
        record.set_attribute("name", "A");
        store.save(&mut record).unwrap();

        let criteria = vec![("email".to_string(), Value::Text("a@x.com".to_string()))];
        let mut existing = store.find_one_matching("users", &criteria).unwrap().unwrap();
        existing.set_attribute("name", "A2");

        assert!(store.save(&mut existing).unwrap());

        let reloaded = store.find_one_matching("users", &criteria).unwrap().unwrap();
        assert_eq!(
            reloaded.get_attribute("name"),
            Some(&Value::Text("A2".to_string()))
        );
        // 仍然只有一条记录
        assert_eq!(reloaded.identifier(), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_update_constraint_violation_returns_false() {
        let store = create_test_store();
        let mut record = store.new_record("users").unwrap();
        record.set_attribute("email", "a@x.com");
        record.set_attribute("name", "A");
        store.save(&mut record).unwrap();

        let criteria = vec![("email".to_string(), Value::Text("a@x.com".to_string()))];
        let mut existing = store.find_one_matching("users", &criteria).unwrap().unwrap();
        existing.set_attribute("name", Value::Null);

        assert!(!store.save(&mut existing).unwrap());

        // 原记录保持不变
        let reloaded = store.find_one_matching("users", &criteria).unwrap().unwrap();
        assert_eq!(
            reloaded.get_attribute("name"),
            Some(&Value::Text("A".to_string()))
        );
    }

    #[test]
    fn test_table_without_pk_uses_rowid() {
        let store = create_test_store();
        let mut record = store.new_record("audit_log").unwrap();
        record.set_attribute("event", "import");

        assert!(store.save(&mut record).unwrap());
        assert_eq!(record.identifier(), Some(&Value::Integer(1)));

        let criteria = vec![("event".to_string(), Value::Text("import".to_string()))];
        let found = store
            .find_one_matching("audit_log", &criteria)
            .unwrap()
            .unwrap();
        assert_eq!(found.identifier(), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_update_table_without_pk_targets_rowid() {
        let store = create_test_store();
        let mut first = store.new_record("audit_log").unwrap();
        first.set_attribute("event", "import");
        first.set_attribute("detail", "run-1");
        store.save(&mut first).unwrap();

        let mut second = store.new_record("audit_log").unwrap();
        second.set_attribute("event", "export");
        second.set_attribute("detail", "run-1");
        store.save(&mut second).unwrap();

        let criteria = vec![("event".to_string(), Value::Text("import".to_string()))];
        let mut existing = store
            .find_one_matching("audit_log", &criteria)
            .unwrap()
            .unwrap();
        existing.set_attribute("detail", "run-2");

        assert!(store.save(&mut existing).unwrap());

        // 仅 rowid 命中的那一行被改写
        let reloaded = store
            .find_one_matching("audit_log", &criteria)
            .unwrap()
            .unwrap();
        assert_eq!(
            reloaded.get_attribute("detail"),
            Some(&Value::Text("run-2".to_string()))
        );
        let other = store
            .find_one_matching(
                "audit_log",
                &[("event".to_string(), Value::Text("export".to_string()))],
            )
            .unwrap()
            .unwrap();
        assert_eq!(
            other.get_attribute("detail"),
            Some(&Value::Text("run-1".to_string()))
        );
    }
}

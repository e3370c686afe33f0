// ==========================================
// CSV 行数据导入器 - 动态记录与表结构
// ==========================================
// 职责: 候选记录的构建、属性读写、持久化标识
// 红线: 仅接受目标表已声明的列，未知属性静默忽略
// ==========================================

use crate::domain::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// 目标表的列信息（来自存储层的结构反射）
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub decl_type: Option<String>,
    pub not_null: bool,
    pub is_pk: bool,
}

/// 目标表结构
///
/// 由存储层反射生成，导入器以此校验映射规则的目标属性。
#[derive(Debug, Clone)]
pub struct TableSchema {
    table: String,
    columns: Vec<ColumnInfo>,
}

impl TableSchema {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// 声明的主键列（单列主键；无主键表返回 None，走 rowid）
    pub fn pk_column(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.is_pk)
            .map(|c| c.name.as_str())
    }
}

/// 动态属性记录
///
/// 每行输入产生一个新的候选记录，持久化成功或该行处理结束后即被丢弃；
/// `stored_pk` 在记录来自存储层（查询命中）或保存成功后填充。
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<TableSchema>,
    values: HashMap<String, Value>,
    stored_pk: Option<Value>,
}

impl Record {
    /// 创建未持久化的空白记录
    pub fn new(schema: Arc<TableSchema>) -> Self {
        Self {
            schema,
            values: HashMap::new(),
            stored_pk: None,
        }
    }

    /// 从存储层查询结果还原记录
    pub(crate) fn restored(
        schema: Arc<TableSchema>,
        values: HashMap<String, Value>,
        stored_pk: Value,
    ) -> Self {
        Self {
            schema,
            values,
            stored_pk: Some(stored_pk),
        }
    }

    pub fn table(&self) -> &str {
        self.schema.table()
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub(crate) fn schema_cloned(&self) -> Arc<TableSchema> {
        Arc::clone(&self.schema)
    }

    /// 属性是否为目标表的列
    pub fn has_attribute(&self, name: &str) -> bool {
        self.schema.has_column(name)
    }

    /// 设置属性值（未知列静默忽略）
    pub fn set_attribute(&mut self, name: &str, value: impl Into<Value>) {
        if self.schema.has_column(name) {
            self.values.insert(name.to_string(), value.into());
        }
    }

    /// 读取属性值（未设置的属性返回 None）
    pub fn get_attribute(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// 记录是否已持久化
    pub fn is_persisted(&self) -> bool {
        self.stored_pk.is_some()
    }

    /// 持久化标识（主键列的值；保存成功前为 None）
    pub fn identifier(&self) -> Option<&Value> {
        self.stored_pk.as_ref()
    }

    pub(crate) fn set_stored_pk(&mut self, pk: Value) {
        self.stored_pk = Some(pk);
    }

    /// 用候选记录的属性整体覆盖本记录（更新路径）
    ///
    /// 主键列保持不变；候选记录未设置的列覆盖为 Null，
    /// 与"全量属性覆盖"语义一致。
    pub(crate) fn overwrite_from(&mut self, candidate: &Record) {
        let schema = self.schema_cloned();
        for col in schema.columns() {
            if col.is_pk {
                continue;
            }
            let value = candidate
                .get_attribute(&col.name)
                .cloned()
                .unwrap_or(Value::Null);
            self.values.insert(col.name.clone(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_schema() -> Arc<TableSchema> {
        Arc::new(TableSchema::new(
            "users",
            vec![
                ColumnInfo {
                    name: "id".to_string(),
                    decl_type: Some("INTEGER".to_string()),
                    not_null: false,
                    is_pk: true,
                },
                ColumnInfo {
                    name: "email".to_string(),
                    decl_type: Some("TEXT".to_string()),
                    not_null: true,
                    is_pk: false,
                },
                ColumnInfo {
                    name: "name".to_string(),
                    decl_type: Some("TEXT".to_string()),
                    not_null: true,
                    is_pk: false,
                },
            ],
        ))
    }

    #[test]
    fn test_set_and_get_attribute() {
        let mut record = Record::new(users_schema());
        record.set_attribute("email", "a@x.com");

        assert_eq!(
            record.get_attribute("email"),
            Some(&Value::Text("a@x.com".to_string()))
        );
        assert_eq!(record.get_attribute("name"), None);
    }

    #[test]
    fn test_unknown_attribute_ignored() {
        let mut record = Record::new(users_schema());
        record.set_attribute("nickname", "abc");

        assert!(!record.has_attribute("nickname"));
        assert_eq!(record.get_attribute("nickname"), None);
    }

    #[test]
    fn test_new_record_not_persisted() {
        let record = Record::new(users_schema());
        assert!(!record.is_persisted());
        assert_eq!(record.identifier(), None);
    }

    #[test]
    fn test_overwrite_from_keeps_pk_and_nulls_missing() {
        let schema = users_schema();
        let mut existing = Record::restored(
            Arc::clone(&schema),
            HashMap::from([
                ("id".to_string(), Value::Integer(7)),
                ("email".to_string(), Value::Text("a@x.com".to_string())),
                ("name".to_string(), Value::Text("A".to_string())),
            ]),
            Value::Integer(7),
        );

        let mut candidate = Record::new(schema);
        candidate.set_attribute("email", "a@x.com");
        // name 未设置 → 覆盖后应为 Null

        existing.overwrite_from(&candidate);

        assert_eq!(existing.identifier(), Some(&Value::Integer(7)));
        assert_eq!(existing.get_attribute("id"), Some(&Value::Integer(7)));
        assert_eq!(existing.get_attribute("name"), Some(&Value::Null));
        assert_eq!(
            existing.get_attribute("email"),
            Some(&Value::Text("a@x.com".to_string()))
        );
    }
}

// ==========================================
// CSV 行数据导入器 - 存储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 存储层错误类型
///
/// 注意: 普通的记录校验失败（约束违反）不是错误，
/// 由 `RecordStore::save` 以 `Ok(false)` 表达。
#[derive(Error, Debug)]
pub enum StoreError {
    // ===== 连接与并发 =====
    #[error("数据库连接失败: {0}")]
    ConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    // ===== 查询 =====
    #[error("数据库查询失败: {0}")]
    QueryError(String),

    // ===== 表结构 =====
    #[error("目标表不存在: {0}")]
    TableNotFound(String),

    #[error("不支持的表结构 (表 {table}): {message}")]
    UnsupportedSchema { table: String, message: String },

    // ===== 记录标识 =====
    #[error("记录缺少主键标识 (表 {0})")]
    MissingIdentifier(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::QueryError(err.to_string())
    }
}

/// Result 类型别名
pub type StoreResult<T> = Result<T, StoreError>;

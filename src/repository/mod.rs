// ==========================================
// CSV 行数据导入器 - 存储层
// ==========================================
// 职责: 提供记录存取接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod record_store;
pub mod sqlite_store;

// 重导出核心类型
pub use error::{StoreError, StoreResult};
pub use record_store::RecordStore;
pub use sqlite_store::SqliteRecordStore;

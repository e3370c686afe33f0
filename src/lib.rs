// ==========================================
// CSV 行数据导入器 - 核心库
// ==========================================
// 技术栈: Rust + SQLite (rusqlite)
// 系统定位: CSV 派生的行数据 → 关系存储的可靠导入策略
// 取舍: 逐行校验与持久化，可靠性优先于吞吐量，适合中小数据量
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 动态值与动态记录
pub mod domain;

// 存储层 - 记录存取
pub mod repository;

// 导入层 - 行导入策略
pub mod importer;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{ColumnInfo, Record, TableSchema, Value};

// 导入器
pub use importer::{
    DropReason, FieldMapping, ImportConfig, ImportError, ImportResult, MappingRule, RowImporter,
    RowOutcome,
};

// 存储
pub use repository::{RecordStore, SqliteRecordStore, StoreError, StoreResult};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "CSV 行数据导入器";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

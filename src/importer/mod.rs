// ==========================================
// CSV 行数据导入器 - 导入层
// ==========================================
// 职责: CSV 派生的行数据 → 关系存储，逐行决策
// 范围: 不含文件解析与 CLI，只消费已解析的行序列
// ==========================================

// 模块声明
pub mod config;
pub mod error;
pub mod mapping;
pub mod row_importer;

// 重导出核心类型
pub use config::{AfterSaveFn, ImportConfig, OutcomeObserver, SkipFn};
pub use error::{ImportError, ImportResult};
pub use mapping::{DeriveFn, FieldMapping, MappingRule};
pub use row_importer::{DropReason, RowImporter, RowOutcome};

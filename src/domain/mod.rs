// ==========================================
// CSV 行数据导入器 - 领域模型层
// ==========================================
// 职责: 定义动态值、动态记录与表结构
// 红线: 不含数据访问逻辑,不含导入决策逻辑
// ==========================================

pub mod record;
pub mod value;

// 重导出核心类型
pub use record::{ColumnInfo, Record, TableSchema};
pub use value::Value;

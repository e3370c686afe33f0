// ==========================================
// CSV 行数据导入器 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::Value;
use crate::repository::StoreError;
use thiserror::Error;

/// 导入模块错误类型
///
/// 普通的单行校验失败与唯一键冲突不是错误：
/// 该行被静默丢弃，可通过结果观察回调审计。
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 配置错误（构造时抛出）=====
    #[error("导入配置缺失: 目标表名为空")]
    MissingTargetTable,

    #[error("导入配置缺失: 字段映射列表为空")]
    EmptyFieldMapping,

    // ===== 运行时错误 =====
    #[error("后置回调返回失败 (行 {row})，导入中止；此前已提交 {} 条记录", .imported.len())]
    HookFailure {
        /// 回调失败的行号（从 1 开始）
        row: usize,
        /// 中止前已提交到存储的记录标识（不回滚）
        imported: Vec<Value>,
    },

    // ===== 存储错误 =====
    #[error(transparent)]
    Store(#[from] StoreError),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

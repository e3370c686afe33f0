// ==========================================
// CSV 行数据导入器 - 记录存储 Trait
// ==========================================
// 职责: 定义导入器所需的存储访问接口（不包含实现）
// 红线: 存储层不含导入决策规则，只做记录 CRUD
// ==========================================

use crate::domain::{Record, TableSchema, Value};
use crate::repository::error::StoreResult;
use std::sync::Arc;

// ==========================================
// RecordStore Trait
// ==========================================
// 用途: 导入器的存储协作方
// 实现者: SqliteRecordStore（使用 rusqlite）
//
// 所有方法均同步返回：导入器逐行顺序处理，
// 不存在与存储操作重叠的并发。
pub trait RecordStore: Send + Sync {
    /// 反射目标表结构
    ///
    /// # 参数
    /// - table: 目标表名
    ///
    /// # 返回
    /// - Ok(Arc<TableSchema>): 表结构（实现方可缓存）
    /// - Err(TableNotFound): 表不存在
    fn schema(&self, table: &str) -> StoreResult<Arc<TableSchema>>;

    /// 创建目标表的空白候选记录
    ///
    /// # 参数
    /// - table: 目标表名
    fn new_record(&self, table: &str) -> StoreResult<Record>;

    /// 按属性等值集合检查是否已存在记录
    ///
    /// # 参数
    /// - table: 目标表名
    /// - criteria: (属性名, 值) 列表，全部条件按 AND 匹配；
    ///   空值条件按 IS NULL 匹配
    ///
    /// # 返回
    /// - Ok(true): 存在匹配记录
    /// - Ok(false): 不存在
    fn exists_matching(&self, table: &str, criteria: &[(String, Value)]) -> StoreResult<bool>;

    /// 按属性等值集合查找单条记录
    ///
    /// # 参数
    /// - table: 目标表名
    /// - criteria: (属性名, 值) 列表，全部条件按 AND 匹配
    ///
    /// # 返回
    /// - Ok(Some(record)): 命中的已持久化记录（含主键标识）
    /// - Ok(None): 未命中
    fn find_one_matching(
        &self,
        table: &str,
        criteria: &[(String, Value)],
    ) -> StoreResult<Option<Record>>;

    /// 保存记录（未持久化 → INSERT，已持久化 → UPDATE）
    ///
    /// # 返回
    /// - Ok(true): 保存成功，记录的主键标识已填充
    /// - Ok(false): 记录校验失败（约束违反），未持久化
    /// - Err: 其他数据库错误
    fn save(&self, record: &mut Record) -> StoreResult<bool>;
}

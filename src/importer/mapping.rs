// ==========================================
// CSV 行数据导入器 - 字段映射配置
// ==========================================
// 职责: 定义 目标属性 ← 行派生函数 的有序映射规则
// 要点: 派生函数为显式函数字段（依赖注入），不做运行时字符串分发
// ==========================================

use crate::domain::Value;

/// 字段派生函数: 从一行原始输入计算属性值
///
/// 行类型 R 对导入器不透明，由 CSV 解析层决定。
pub type DeriveFn<R> = Box<dyn Fn(&R) -> Value + Send + Sync>;

/// 单条映射规则
pub struct MappingRule<R> {
    /// 目标属性名（须为目标表的列，否则整条规则被忽略）
    pub attribute: String,
    /// 值派生函数（纯转换，不应有副作用）
    pub derive: DeriveFn<R>,
    /// 是否参与唯一键集合
    pub unique: bool,
}

/// 有序字段映射列表
///
/// # 示例
/// ```ignore
/// let mapping = FieldMapping::new()
///     .map_unique("email", |row: &CsvRow| Value::from(row.get("email")))
///     .map("name", |row: &CsvRow| Value::from(row.get("name")));
/// ```
pub struct FieldMapping<R> {
    rules: Vec<MappingRule<R>>,
}

impl<R> FieldMapping<R> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// 添加普通映射规则
    pub fn map(
        self,
        attribute: impl Into<String>,
        derive: impl Fn(&R) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.push(attribute, derive, false)
    }

    /// 添加唯一键映射规则（参与去重/更新匹配）
    pub fn map_unique(
        self,
        attribute: impl Into<String>,
        derive: impl Fn(&R) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.push(attribute, derive, true)
    }

    fn push(
        mut self,
        attribute: impl Into<String>,
        derive: impl Fn(&R) -> Value + Send + Sync + 'static,
        unique: bool,
    ) -> Self {
        self.rules.push(MappingRule {
            attribute: attribute.into(),
            derive: Box::new(derive),
            unique,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn rules(&self) -> &[MappingRule<R>] {
        &self.rules
    }
}

impl<R> Default for FieldMapping<R> {
    fn default() -> Self {
        Self::new()
    }
}

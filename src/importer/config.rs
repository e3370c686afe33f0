// ==========================================
// CSV 行数据导入器 - 导入配置
// ==========================================
// 职责: 聚合导入器的全部配置项（目标表/映射/可选回调）
// 要点: 所有回调均为显式函数字段；校验在 RowImporter::new 执行
// ==========================================

use crate::domain::Record;
use crate::importer::mapping::FieldMapping;
use crate::importer::row_importer::RowOutcome;

/// 跳过判定函数: 返回 true 时该行在任何副作用前被跳过
pub type SkipFn<R> = Box<dyn Fn(&R) -> bool + Send + Sync>;

/// 后置回调: 每条持久化成功的记录调用一次，
/// 返回 false 立即中止整个导入
pub type AfterSaveFn<R> = Box<dyn Fn(&R, &Record) -> bool + Send + Sync>;

/// 行结果观察回调: (行号, 结果)，用于审计被丢弃/跳过的行
pub type OutcomeObserver = Box<dyn Fn(usize, &RowOutcome) + Send + Sync>;

/// 导入配置
pub struct ImportConfig<R> {
    /// 目标表名（必填）
    pub table: String,
    /// 字段映射列表（必填，非空）
    pub mapping: FieldMapping<R>,
    /// 是否启用更新模式（按唯一键命中已有记录时覆盖更新）
    pub update_existing: bool,
    /// 跳过判定（可选）
    pub skip_row: Option<SkipFn<R>>,
    /// 后置回调（可选）
    pub after_save: Option<AfterSaveFn<R>>,
    /// 行结果观察回调（可选，不影响默认行为）
    pub observer: Option<OutcomeObserver>,
}

impl<R> ImportConfig<R> {
    pub fn new(table: impl Into<String>, mapping: FieldMapping<R>) -> Self {
        Self {
            table: table.into(),
            mapping,
            update_existing: false,
            skip_row: None,
            after_save: None,
            observer: None,
        }
    }

    /// 启用/关闭更新模式
    pub fn update_existing(mut self, enabled: bool) -> Self {
        self.update_existing = enabled;
        self
    }

    /// 设置跳过判定函数
    pub fn skip_row_when(mut self, f: impl Fn(&R) -> bool + Send + Sync + 'static) -> Self {
        self.skip_row = Some(Box::new(f));
        self
    }

    /// 设置后置回调
    pub fn after_save(mut self, f: impl Fn(&R, &Record) -> bool + Send + Sync + 'static) -> Self {
        self.after_save = Some(Box::new(f));
        self
    }

    /// 设置行结果观察回调
    pub fn on_outcome(mut self, f: impl Fn(usize, &RowOutcome) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(f));
        self
    }
}

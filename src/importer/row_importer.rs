// ==========================================
// CSV 行数据导入器 - 行导入策略（核心）
// ==========================================
// 职责: 逐行顺序处理: 跳过判定 → 字段提取 → 更新/插入决策 → 落库 → 收集标识
// 流程: 每行独立校验与持久化，可靠性优先于吞吐量，适合中小数据量
// 红线: 单行校验失败/唯一键冲突静默丢弃；后置回调失败立即中止且不回滚
// ==========================================

use crate::domain::{Record, TableSchema, Value};
use crate::importer::config::ImportConfig;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::RecordStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 行被丢弃的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DropReason {
    /// 唯一键集合已有持久化记录匹配（非更新模式）
    UniqueConflict,
    /// 落库时记录校验失败
    ValidationFailed,
}

/// 单行处理结果（通过观察回调暴露）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RowOutcome {
    /// 跳过判定命中，无任何副作用
    Skipped,
    /// 新插入记录（携带主键标识）
    Inserted(Value),
    /// 更新模式下覆盖已有记录（携带主键标识）
    Updated(Value),
    /// 静默丢弃
    Dropped(DropReason),
}

// 更新路径的尝试结果：保存失败时回落到插入路径
enum UpdateAttempt {
    Updated(Record),
    FellThrough,
    NotFound,
}

// 单行决策流程的中间结果（回调与标识收集在 import 统一处理）
enum Processed {
    Skipped,
    Dropped(DropReason),
    Persisted { record: Record, updated: bool },
}

// ==========================================
// RowImporter - 行导入器
// ==========================================
pub struct RowImporter<R, S: RecordStore> {
    store: S,
    config: ImportConfig<R>,
    schema: Arc<TableSchema>,
}

impl<R, S: RecordStore> RowImporter<R, S> {
    /// 创建导入器实例，配置校验在此处快速失败
    ///
    /// # 参数
    /// - store: 存储协作方（导入期间由导入器独占）
    /// - config: 导入配置
    ///
    /// # 错误
    /// - MissingTargetTable / EmptyFieldMapping: 必填配置缺失
    /// - Store(TableNotFound): 目标表不存在
    ///
    /// 映射规则的目标属性不是目标表的列时，该规则在导入时被整条
    /// 忽略（含唯一键标记）；这里仅记录一次告警，不视为错误。
    pub fn new(store: S, config: ImportConfig<R>) -> ImportResult<Self> {
        if config.table.trim().is_empty() {
            return Err(ImportError::MissingTargetTable);
        }
        if config.mapping.is_empty() {
            return Err(ImportError::EmptyFieldMapping);
        }

        let schema = store.schema(&config.table)?;
        for rule in config.mapping.rules() {
            if !schema.has_column(&rule.attribute) {
                warn!(
                    table = %config.table,
                    attribute = %rule.attribute,
                    "映射目标属性不是表的列，该规则将被忽略"
                );
            }
        }

        Ok(Self {
            store,
            config,
            schema,
        })
    }

    /// 存储协作方的只读访问（导入后校验用）
    pub fn store(&self) -> &S {
        &self.store
    }

    /// 取回存储协作方的所有权
    pub fn into_store(self) -> S {
        self.store
    }

    /// 导入行序列
    ///
    /// # 参数
    /// - rows: 行序列（所有权转移，避免复制大数据集）
    ///
    /// # 返回
    /// - Ok(Vec<Value>): 成功持久化记录的主键标识，按处理顺序排列；
    ///   被跳过/丢弃的行不产生标识
    /// - Err(HookFailure): 后置回调失败，立即中止；
    ///   此前已持久化的记录保持已提交状态
    /// - Err(Store): 存储层错误
    pub fn import<I>(&self, rows: I) -> ImportResult<Vec<Value>>
    where
        I: IntoIterator<Item = R>,
    {
        let run_id = Uuid::new_v4().to_string();
        info!(
            run_id = %run_id,
            table = %self.config.table,
            update_existing = self.config.update_existing,
            "开始导入行数据"
        );

        let mut imported: Vec<Value> = Vec::new();
        let mut total = 0usize;
        let mut inserted = 0usize;
        let mut updated = 0usize;
        let mut dropped = 0usize;
        let mut skipped = 0usize;

        for (idx, row) in rows.into_iter().enumerate() {
            let row_number = idx + 1;
            total = row_number;

            let outcome = match self.process_row(&row, row_number)? {
                Processed::Skipped => {
                    skipped += 1;
                    RowOutcome::Skipped
                }
                Processed::Dropped(reason) => {
                    dropped += 1;
                    RowOutcome::Dropped(reason)
                }
                Processed::Persisted {
                    record,
                    updated: was_update,
                } => {
                    let id = record
                        .identifier()
                        .cloned()
                        .ok_or_else(|| {
                            crate::repository::StoreError::MissingIdentifier(
                                self.config.table.clone(),
                            )
                        })?;
                    imported.push(id.clone());

                    if let Some(hook) = &self.config.after_save {
                        if !hook(&row, &record) {
                            error!(
                                run_id = %run_id,
                                row_number,
                                "后置回调返回失败，导入中止（已提交记录不回滚）"
                            );
                            return Err(ImportError::HookFailure {
                                row: row_number,
                                imported,
                            });
                        }
                    }

                    if was_update {
                        updated += 1;
                        RowOutcome::Updated(id)
                    } else {
                        inserted += 1;
                        RowOutcome::Inserted(id)
                    }
                }
            };

            if let Some(observer) = &self.config.observer {
                observer(row_number, &outcome);
            }
        }

        info!(
            run_id = %run_id,
            total,
            inserted,
            updated,
            dropped,
            skipped,
            "行数据导入完成"
        );

        Ok(imported)
    }

    /// 单行决策流程
    fn process_row(&self, row: &R, row_number: usize) -> ImportResult<Processed> {
        // === 步骤 1: 跳过判定 ===
        if let Some(skip) = &self.config.skip_row {
            if skip(row) {
                debug!(row_number, "跳过判定命中，该行不处理");
                return Ok(Processed::Skipped);
            }
        }

        // === 步骤 2: 字段提取，同步收集唯一键集合 ===
        let mut candidate = Record::new(Arc::clone(&self.schema));
        let mut unique_keys: Vec<(String, Value)> = Vec::new();
        for rule in self.config.mapping.rules() {
            // 未知列: 整条规则忽略（含唯一键标记）
            if !candidate.has_attribute(&rule.attribute) {
                continue;
            }
            let value = (rule.derive)(row);
            if rule.unique {
                // 同一属性重复标记唯一键时后值覆盖前值（与属性赋值一致）
                match unique_keys
                    .iter_mut()
                    .find(|(attribute, _)| attribute == &rule.attribute)
                {
                    Some(entry) => entry.1 = value.clone(),
                    None => unique_keys.push((rule.attribute.clone(), value.clone())),
                }
            }
            candidate.set_attribute(&rule.attribute, value);
        }

        // === 步骤 3: 更新路径（仅更新模式 + 唯一键非空）===
        if self.config.update_existing && !unique_keys.is_empty() {
            match self.try_update(&unique_keys, &candidate)? {
                UpdateAttempt::Updated(record) => {
                    debug!(row_number, "按唯一键命中已有记录，覆盖更新成功");
                    return Ok(Processed::Persisted {
                        record,
                        updated: true,
                    });
                }
                // 未命中或更新保存失败: 回落到插入路径
                UpdateAttempt::FellThrough | UpdateAttempt::NotFound => {}
            }
        }

        // === 步骤 4: 插入路径 ===
        self.try_insert(row_number, unique_keys, candidate)
    }

    /// 更新尝试: 查找唯一键匹配的已有记录并整体覆盖
    fn try_update(
        &self,
        unique_keys: &[(String, Value)],
        candidate: &Record,
    ) -> ImportResult<UpdateAttempt> {
        let existing = self
            .store
            .find_one_matching(&self.config.table, unique_keys)?;

        let Some(mut existing) = existing else {
            return Ok(UpdateAttempt::NotFound);
        };

        existing.overwrite_from(candidate);
        if self.store.save(&mut existing)? {
            Ok(UpdateAttempt::Updated(existing))
        } else {
            debug!(
                unique_keys = %keys_json(unique_keys),
                "覆盖更新保存未通过校验，转入插入路径"
            );
            Ok(UpdateAttempt::FellThrough)
        }
    }

    /// 插入路径: 唯一性守卫 → 落库
    fn try_insert(
        &self,
        row_number: usize,
        unique_keys: Vec<(String, Value)>,
        mut candidate: Record,
    ) -> ImportResult<Processed> {
        // 唯一性守卫（空唯一键集合恒通过）
        if !unique_keys.is_empty()
            && self
                .store
                .exists_matching(&self.config.table, &unique_keys)?
        {
            debug!(
                row_number,
                unique_keys = %keys_json(&unique_keys),
                "唯一键已存在，该行被丢弃"
            );
            return Ok(Processed::Dropped(DropReason::UniqueConflict));
        }

        if self.store.save(&mut candidate)? {
            Ok(Processed::Persisted {
                record: candidate,
                updated: false,
            })
        } else {
            debug!(row_number, "记录校验失败，该行被丢弃");
            Ok(Processed::Dropped(DropReason::ValidationFailed))
        }
    }
}

// 唯一键集合的诊断序列化（仅用于日志）
fn keys_json(keys: &[(String, Value)]) -> String {
    serde_json::to_string(keys).unwrap_or_else(|_| "[]".to_string())
}

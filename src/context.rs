//! # 记录上下文 (Context)
//!
//! ## 业务说明
//! 上下文拥有“记录名 → 记录”的映射，每个进程一个。生命周期分两段：
//! - **初始化**: `ContextBuilder` 创建记录、挂接设备处理器
//! - **运行**: `ContextBuilder::build()` 消费构建器得到只读的 `Context`，
//!   之后不能再创建记录，查找不需要任何锁
//!
//! ## Rust知识点
//! - **类型状态**: 构建器被 `build(self)` 消费，运行期创建记录在类型上就不可表达
//! - **Arc共享**: 记录以 `Arc` 保存，查找返回的门面只是引用计数的克隆

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::models::RecordType;
use crate::record::{AnyHandlerBox, AnyRecord, RecordConfig, RecordServices};
use crate::scan::ForwardQueue;
use crate::utils::error::{IocError, IocResult};

/// 创建记录后返回的句柄
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordHandle {
    pub name: String,
    pub rtype: RecordType,
}

/// 初始化阶段的上下文构建器
#[derive(Debug, Default)]
pub struct ContextBuilder {
    index: HashMap<String, usize>,
    records: Vec<AnyRecord>,
    services: Arc<RecordServices>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建一条记录
    ///
    /// # 错误
    /// - `InvalidRecordName`: 名称为空或含空白字符
    /// - `DuplicateName`: 名称已被使用
    /// - `InvalidScanConfig`: 周期为0或事件名为空
    /// - `ConfigurationError`: 驱动限值无效
    /// - `ValueTypeMismatch`: 初始值无法转换为记录类型
    pub fn create(&mut self, name: &str, config: RecordConfig) -> IocResult<RecordHandle> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(IocError::invalid_record_name(name));
        }
        if self.index.contains_key(name) {
            return Err(IocError::duplicate_name(name));
        }
        config.scan.validate()?;
        if let Some((lo, hi)) = config.numeric.drive {
            if lo.is_nan() || hi.is_nan() || lo > hi {
                return Err(IocError::configuration_error(format!(
                    "记录 {} 的驱动限值无效: [{}, {}]",
                    name, lo, hi
                )));
            }
        }

        let record = AnyRecord::create(name, &config, self.services.clone())?;
        self.index.insert(name.to_string(), self.records.len());
        self.records.push(record);
        debug!("创建记录 {} ({}, {})", name, config.rtype, config.scan);

        Ok(RecordHandle {
            name: name.to_string(),
            rtype: config.rtype,
        })
    }

    /// 为已创建的记录挂接设备处理器
    pub fn set_handler(&mut self, name: &str, handler: AnyHandlerBox) -> IocResult<()> {
        let record = self
            .lookup(name)
            .ok_or_else(|| IocError::record_not_found(name))?;
        record.set_handler(handler)
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.lookup(name).map_or(false, |r| r.has_handler())
    }

    pub fn lookup(&self, name: &str) -> Option<AnyRecord> {
        self.index.get(name).map(|&i| self.records[i].clone())
    }

    /// 已创建记录的句柄，按创建顺序
    pub fn handles(&self) -> Vec<RecordHandle> {
        self.records
            .iter()
            .map(|r| RecordHandle {
                name: r.name().to_string(),
                rtype: r.rtype(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 结束初始化，冻结为只读上下文
    pub fn build(self) -> Context {
        let soft = self.records.iter().filter(|r| !r.has_handler()).count();
        info!(
            "上下文初始化完成: {} 条记录 ({} 条软记录)",
            self.records.len(),
            soft
        );
        Context {
            index: self.index,
            records: self.records,
            services: self.services,
        }
    }
}

/// 运行期只读上下文
#[derive(Debug)]
pub struct Context {
    index: HashMap<String, usize>,
    records: Vec<AnyRecord>,
    services: Arc<RecordServices>,
}

impl Context {
    /// 按名称查找记录
    pub fn lookup(&self, name: &str) -> Option<AnyRecord> {
        self.get(name).cloned()
    }

    /// 按名称借用记录，不增加引用计数
    pub fn get(&self, name: &str) -> Option<&AnyRecord> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    /// 按创建顺序遍历全部记录
    pub fn iter(&self) -> std::slice::Iter<'_, AnyRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.iter().map(|r| r.name())
    }

    /// 记录的创建序号
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// 处理指定记录一次
    pub fn process(&self, name: &str) -> IocResult<()> {
        self.get(name)
            .ok_or_else(|| IocError::record_not_found(name))?
            .process()
    }

    /// 前向链接队列
    pub fn forward_queue(&self) -> &ForwardQueue {
        &self.services.forward
    }

    pub(crate) fn services(&self) -> &Arc<RecordServices> {
        &self.services
    }
}

impl<'a> IntoIterator for &'a Context {
    type Item = &'a AnyRecord;
    type IntoIter = std::slice::Iter<'a, AnyRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScanMode, Value};
    use crate::record::{read_fn, AiHandler, HandlerStatus};
    use std::time::Duration;

    /// 测试创建后查找得到相同类型，重名被拒绝
    #[test]
    fn test_create_and_duplicate() {
        let mut builder = ContextBuilder::new();
        let handle = builder.create("TEMP:1", RecordConfig::ai()).unwrap();
        assert_eq!(handle.rtype, RecordType::Ai);

        let err = builder.create("TEMP:1", RecordConfig::bo()).unwrap_err();
        assert_eq!(err, IocError::duplicate_name("TEMP:1"));

        let ctx = builder.build();
        assert_eq!(ctx.lookup("TEMP:1").unwrap().rtype(), RecordType::Ai);
        assert!(ctx.lookup("TEMP:2").is_none());
    }

    /// 测试无效名称与扫描配置
    #[test]
    fn test_create_rejects_invalid_input() {
        let mut builder = ContextBuilder::new();
        assert_eq!(
            builder.create("", RecordConfig::ai()).unwrap_err().error_code(),
            "INVALID_RECORD_NAME"
        );
        assert_eq!(
            builder.create("A B", RecordConfig::ai()).unwrap_err().error_code(),
            "INVALID_RECORD_NAME"
        );
        assert_eq!(
            builder
                .create("P", RecordConfig::ai().periodic(Duration::ZERO))
                .unwrap_err()
                .error_code(),
            "INVALID_SCAN_CONFIG"
        );
        assert_eq!(
            builder
                .create("D", RecordConfig::ao().drive_limits(5.0, 1.0))
                .unwrap_err()
                .error_code(),
            "CONFIGURATION_ERROR"
        );
        assert!(builder.is_empty());
    }

    /// 测试遍历保持创建顺序
    #[test]
    fn test_iteration_in_creation_order() {
        let mut builder = ContextBuilder::new();
        for name in ["C", "A", "B"] {
            builder.create(name, RecordConfig::longin()).unwrap();
        }
        let ctx = builder.build();
        let names: Vec<_> = ctx.names().collect();
        assert_eq!(names, vec!["C", "A", "B"]);
        assert_eq!(ctx.iter().count(), 3);
        assert_eq!(ctx.position("B"), Some(2));
    }

    /// 测试构建期挂接处理器
    #[test]
    fn test_set_handler_during_init() {
        let mut builder = ContextBuilder::new();
        builder
            .create("AI:1", RecordConfig::ai().scan(ScanMode::Passive))
            .unwrap();
        let handler: Box<dyn AiHandler> = Box::new(read_fn(|_: &str, v: &mut f64| {
            *v = 2.0;
            Ok(HandlerStatus::Done)
        }));
        builder.set_handler("AI:1", handler.into()).unwrap();
        assert!(builder.has_handler("AI:1"));

        let missing: Box<dyn AiHandler> =
            Box::new(read_fn(|_: &str, _: &mut f64| Ok(HandlerStatus::Done)));
        assert_eq!(
            builder.set_handler("AI:X", missing.into()).unwrap_err(),
            IocError::record_not_found("AI:X")
        );

        let ctx = builder.build();
        ctx.process("AI:1").unwrap();
        assert_eq!(ctx.lookup("AI:1").unwrap().read().value, Value::Double(2.0));
    }
}

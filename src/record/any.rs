//! # 多态记录门面
//!
//! ## 业务说明
//! 调度器、命令层和外部协作方通过这些枚举统一访问八种记录，
//! 每次调用都是一次 `match` 分派，没有堆分配。
//!
//! - `AnyRecord`: 完整访问（处理、读、挂接处理器）
//! - `AnyReadRecord`: 只读视图，覆盖全部八种记录
//! - `AnyWriteRecord`: 可写视图，只覆盖四种输出记录
//! - `AnyHandlerBox`: 八种处理器trait对象之一
//!
//! ## Rust知识点
//! - **声明宏**: `dispatch!` 展开为八个分支的 match，避免手写重复代码
//! - **TryFrom**: 转换失败时把原值还给调用方

use std::sync::Arc;

use crate::models::{AlarmState, RecordType, ScanMode, Value};
use crate::record::analog::{AiKind, AiRecord, AoKind, AoRecord};
use crate::record::binary::{BiKind, BiRecord, BoKind, BoRecord};
use crate::record::common::{CommonPrivate, RecordConfig, RecordServices, RecordSnapshot, RecordStatsSnapshot};
use crate::record::base::Record;
use crate::record::handler::{
    AiHandler, AoHandler, BiHandler, BoHandler, LonginHandler, LongoutHandler, StringinHandler,
    StringoutHandler,
};
use crate::record::long::{LonginKind, LonginRecord, LongoutKind, LongoutRecord};
use crate::record::string::{StringinKind, StringinRecord, StringoutKind, StringoutRecord};
use crate::scan::ScanTrigger;
use crate::utils::error::{IocError, IocResult};

macro_rules! dispatch {
    ($enum:ident, $value:expr, $rec:ident => $body:expr) => {
        match $value {
            $enum::Ai($rec) => $body,
            $enum::Ao($rec) => $body,
            $enum::Bi($rec) => $body,
            $enum::Bo($rec) => $body,
            $enum::Longin($rec) => $body,
            $enum::Longout($rec) => $body,
            $enum::Stringin($rec) => $body,
            $enum::Stringout($rec) => $body,
        }
    };
}

macro_rules! dispatch_write {
    ($value:expr, $rec:ident => $body:expr) => {
        match $value {
            AnyWriteRecord::Ao($rec) => $body,
            AnyWriteRecord::Bo($rec) => $body,
            AnyWriteRecord::Longout($rec) => $body,
            AnyWriteRecord::Stringout($rec) => $body,
        }
    };
}

/// 任意记录（完整访问）
#[derive(Debug, Clone)]
pub enum AnyRecord {
    Ai(Arc<AiRecord>),
    Ao(Arc<AoRecord>),
    Bi(Arc<BiRecord>),
    Bo(Arc<BoRecord>),
    Longin(Arc<LonginRecord>),
    Longout(Arc<LongoutRecord>),
    Stringin(Arc<StringinRecord>),
    Stringout(Arc<StringoutRecord>),
}

/// 任意记录的只读视图
#[derive(Debug, Clone)]
pub enum AnyReadRecord {
    Ai(Arc<AiRecord>),
    Ao(Arc<AoRecord>),
    Bi(Arc<BiRecord>),
    Bo(Arc<BoRecord>),
    Longin(Arc<LonginRecord>),
    Longout(Arc<LongoutRecord>),
    Stringin(Arc<StringinRecord>),
    Stringout(Arc<StringoutRecord>),
}

/// 输出记录的可写视图
#[derive(Debug, Clone)]
pub enum AnyWriteRecord {
    Ao(Arc<AoRecord>),
    Bo(Arc<BoRecord>),
    Longout(Arc<LongoutRecord>),
    Stringout(Arc<StringoutRecord>),
}

/// 任意记录类型的设备处理器
pub enum AnyHandlerBox {
    Ai(Box<dyn AiHandler>),
    Ao(Box<dyn AoHandler>),
    Bi(Box<dyn BiHandler>),
    Bo(Box<dyn BoHandler>),
    Longin(Box<dyn LonginHandler>),
    Longout(Box<dyn LongoutHandler>),
    Stringin(Box<dyn StringinHandler>),
    Stringout(Box<dyn StringoutHandler>),
}

impl std::fmt::Debug for AnyHandlerBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AnyHandlerBox({})", self.rtype())
    }
}

impl AnyHandlerBox {
    /// 处理器对应的记录类型
    pub fn rtype(&self) -> RecordType {
        match self {
            AnyHandlerBox::Ai(_) => RecordType::Ai,
            AnyHandlerBox::Ao(_) => RecordType::Ao,
            AnyHandlerBox::Bi(_) => RecordType::Bi,
            AnyHandlerBox::Bo(_) => RecordType::Bo,
            AnyHandlerBox::Longin(_) => RecordType::Longin,
            AnyHandlerBox::Longout(_) => RecordType::Longout,
            AnyHandlerBox::Stringin(_) => RecordType::Stringin,
            AnyHandlerBox::Stringout(_) => RecordType::Stringout,
        }
    }
}

impl AnyRecord {
    /// 按配置创建记录
    pub(crate) fn create(
        name: &str,
        config: &RecordConfig,
        services: Arc<RecordServices>,
    ) -> IocResult<Self> {
        let common = CommonPrivate::new(
            name,
            config.rtype,
            config.scan.clone(),
            config.flnk.clone(),
            services,
        );
        let record = match config.rtype {
            RecordType::Ai => AnyRecord::Ai(Arc::new(Record::<AiKind>::new(common, config)?)),
            RecordType::Ao => AnyRecord::Ao(Arc::new(Record::<AoKind>::new(common, config)?)),
            RecordType::Bi => AnyRecord::Bi(Arc::new(Record::<BiKind>::new(common, config)?)),
            RecordType::Bo => AnyRecord::Bo(Arc::new(Record::<BoKind>::new(common, config)?)),
            RecordType::Longin => {
                AnyRecord::Longin(Arc::new(Record::<LonginKind>::new(common, config)?))
            }
            RecordType::Longout => {
                AnyRecord::Longout(Arc::new(Record::<LongoutKind>::new(common, config)?))
            }
            RecordType::Stringin => {
                AnyRecord::Stringin(Arc::new(Record::<StringinKind>::new(common, config)?))
            }
            RecordType::Stringout => {
                AnyRecord::Stringout(Arc::new(Record::<StringoutKind>::new(common, config)?))
            }
        };
        Ok(record)
    }

    pub fn name(&self) -> &str {
        dispatch!(AnyRecord, self, r => r.name())
    }

    pub fn rtype(&self) -> RecordType {
        dispatch!(AnyRecord, self, r => r.rtype())
    }

    pub fn scan(&self) -> ScanMode {
        dispatch!(AnyRecord, self, r => r.common().scan())
    }

    pub(crate) fn set_scan_mode(&self, mode: ScanMode) {
        dispatch!(AnyRecord, self, r => r.common().set_scan(mode))
    }

    pub fn forward_links(&self) -> &[String] {
        dispatch!(AnyRecord, self, r => r.common().forward_links())
    }

    /// 处理一次记录，记录忙时返回 `AlreadyProcessing`
    pub fn process(&self) -> IocResult<()> {
        dispatch!(AnyRecord, self, r => r.process())
    }

    pub fn read(&self) -> RecordSnapshot {
        dispatch!(AnyRecord, self, r => r.read())
    }

    pub fn alarm(&self) -> AlarmState {
        self.read().alarm
    }

    pub fn is_busy(&self) -> bool {
        dispatch!(AnyRecord, self, r => r.common().is_busy())
    }

    pub fn stats(&self) -> RecordStatsSnapshot {
        dispatch!(AnyRecord, self, r => r.common().stats())
    }

    pub fn has_handler(&self) -> bool {
        dispatch!(AnyRecord, self, r => r.has_handler())
    }

    pub fn complete_async(&self) -> bool {
        dispatch!(AnyRecord, self, r => r.complete_async())
    }

    pub fn set_scan_trigger(&self, trigger: ScanTrigger) {
        dispatch!(AnyRecord, self, r => r.set_scan_trigger(trigger))
    }

    /// 挂接设备处理器
    ///
    /// 处理器类型与记录类型不符时返回 `HandlerMismatch`，重复挂接返回 `HandlerAlreadySet`
    pub fn set_handler(&self, handler: AnyHandlerBox) -> IocResult<()> {
        match (self, handler) {
            (AnyRecord::Ai(r), AnyHandlerBox::Ai(h)) => r.set_handler(h),
            (AnyRecord::Ao(r), AnyHandlerBox::Ao(h)) => r.set_handler(h),
            (AnyRecord::Bi(r), AnyHandlerBox::Bi(h)) => r.set_handler(h),
            (AnyRecord::Bo(r), AnyHandlerBox::Bo(h)) => r.set_handler(h),
            (AnyRecord::Longin(r), AnyHandlerBox::Longin(h)) => r.set_handler(h),
            (AnyRecord::Longout(r), AnyHandlerBox::Longout(h)) => r.set_handler(h),
            (AnyRecord::Stringin(r), AnyHandlerBox::Stringin(h)) => r.set_handler(h),
            (AnyRecord::Stringout(r), AnyHandlerBox::Stringout(h)) => r.set_handler(h),
            (record, handler) => Err(IocError::handler_mismatch(
                record.rtype().to_string(),
                handler.rtype().to_string(),
            )),
        }
    }

    /// 只读视图，总是成功
    pub fn as_read(&self) -> AnyReadRecord {
        match self {
            AnyRecord::Ai(r) => AnyReadRecord::Ai(r.clone()),
            AnyRecord::Ao(r) => AnyReadRecord::Ao(r.clone()),
            AnyRecord::Bi(r) => AnyReadRecord::Bi(r.clone()),
            AnyRecord::Bo(r) => AnyReadRecord::Bo(r.clone()),
            AnyRecord::Longin(r) => AnyReadRecord::Longin(r.clone()),
            AnyRecord::Longout(r) => AnyReadRecord::Longout(r.clone()),
            AnyRecord::Stringin(r) => AnyReadRecord::Stringin(r.clone()),
            AnyRecord::Stringout(r) => AnyReadRecord::Stringout(r.clone()),
        }
    }

    /// 可写视图，输入记录返回 `NotWritable`
    pub fn as_write(&self) -> IocResult<AnyWriteRecord> {
        AnyWriteRecord::try_from(self.clone())
    }
}

impl AnyReadRecord {
    pub fn name(&self) -> &str {
        dispatch!(AnyReadRecord, self, r => r.name())
    }

    pub fn rtype(&self) -> RecordType {
        dispatch!(AnyReadRecord, self, r => r.rtype())
    }

    pub fn read(&self) -> RecordSnapshot {
        dispatch!(AnyReadRecord, self, r => r.read())
    }

    pub fn alarm(&self) -> AlarmState {
        self.read().alarm
    }
}

impl AnyWriteRecord {
    pub fn name(&self) -> &str {
        dispatch_write!(self, r => r.name())
    }

    pub fn rtype(&self) -> RecordType {
        dispatch_write!(self, r => r.rtype())
    }

    /// 写入新值；值按记录类型转换，数值输出按驱动限值钳位
    pub fn write(&self, value: &Value) -> IocResult<()> {
        dispatch_write!(self, r => r.write(value))
    }

    pub fn read(&self) -> RecordSnapshot {
        dispatch_write!(self, r => r.read())
    }
}

impl From<AnyWriteRecord> for AnyRecord {
    fn from(record: AnyWriteRecord) -> Self {
        match record {
            AnyWriteRecord::Ao(r) => AnyRecord::Ao(r),
            AnyWriteRecord::Bo(r) => AnyRecord::Bo(r),
            AnyWriteRecord::Longout(r) => AnyRecord::Longout(r),
            AnyWriteRecord::Stringout(r) => AnyRecord::Stringout(r),
        }
    }
}

impl TryFrom<AnyRecord> for AnyWriteRecord {
    type Error = IocError;

    fn try_from(record: AnyRecord) -> Result<Self, Self::Error> {
        match record {
            AnyRecord::Ao(r) => Ok(AnyWriteRecord::Ao(r)),
            AnyRecord::Bo(r) => Ok(AnyWriteRecord::Bo(r)),
            AnyRecord::Longout(r) => Ok(AnyWriteRecord::Longout(r)),
            AnyRecord::Stringout(r) => Ok(AnyWriteRecord::Stringout(r)),
            other => Err(IocError::not_writable(other.name(), other.rtype().to_string())),
        }
    }
}

impl From<AnyRecord> for AnyReadRecord {
    fn from(record: AnyRecord) -> Self {
        record.as_read()
    }
}

/// 具体记录 / 处理器与门面枚举之间的转换
macro_rules! any_conversions {
    ($($variant:ident => $record:ty, $handler:ident;)*) => {
        $(
            impl From<Arc<$record>> for AnyRecord {
                fn from(record: Arc<$record>) -> Self {
                    AnyRecord::$variant(record)
                }
            }

            impl TryFrom<AnyRecord> for Arc<$record> {
                type Error = AnyRecord;

                fn try_from(record: AnyRecord) -> Result<Self, Self::Error> {
                    match record {
                        AnyRecord::$variant(r) => Ok(r),
                        other => Err(other),
                    }
                }
            }

            impl From<Box<dyn $handler>> for AnyHandlerBox {
                fn from(handler: Box<dyn $handler>) -> Self {
                    AnyHandlerBox::$variant(handler)
                }
            }
        )*
    };
}

any_conversions! {
    Ai => AiRecord, AiHandler;
    Ao => AoRecord, AoHandler;
    Bi => BiRecord, BiHandler;
    Bo => BoRecord, BoHandler;
    Longin => LonginRecord, LonginHandler;
    Longout => LongoutRecord, LongoutHandler;
    Stringin => StringinRecord, StringinHandler;
    Stringout => StringoutRecord, StringoutHandler;
}

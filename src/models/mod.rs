//! # 数据模型模块
//!
//! 值、报警与基础枚举类型，被记录、扫描与命令各层共享

pub mod alarm;
pub mod enums;
pub mod value;

pub use alarm::{AlarmAccumulator, AlarmLimits, AlarmSeverity, AlarmState, AlarmStatus, LimitSpec};
pub use enums::{ForwardPolicy, RecordType, ScanMode};
pub use value::{BoundedString, Value, MAX_STRING_SIZE};

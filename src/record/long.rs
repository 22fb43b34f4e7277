//! 整型记录：Longin（输入）/ Longout（输出）
//!
//! 值类型为 `i32`，越限报警规则与模拟量相同；浮点写入四舍五入并饱和到 i32 范围。

use crate::models::{AlarmAccumulator, AlarmStatus, RecordType, Value};
use crate::record::analog::check_limits;
use crate::record::common::{Committed, NumericConfig, RecordConfig};
use crate::record::base::{mismatch, OutputKind, Record, RecordKind};
use crate::record::handler::{HandlerError, HandlerResult, LonginHandler, LongoutHandler};
use crate::scan::ScanTrigger;
use crate::utils::error::IocResult;

/// 整型输入
pub struct LonginKind;

/// 整型输出
pub struct LongoutKind;

pub type LonginRecord = Record<LonginKind>;
pub type LongoutRecord = Record<LongoutKind>;

impl RecordKind for LonginKind {
    const RTYPE: RecordType = RecordType::Longin;
    type Data = i32;
    type Config = NumericConfig;
    type Handler = dyn LonginHandler;

    fn to_value(data: &i32) -> Value {
        Value::Long(*data)
    }

    fn config_from(config: &RecordConfig) -> NumericConfig {
        NumericConfig {
            limits: config.numeric.limits.clone(),
            drive: None,
        }
    }

    fn coerce(_config: &NumericConfig, value: &Value) -> IocResult<i32> {
        value.to_i32().ok_or_else(|| mismatch(Self::RTYPE, value))
    }

    fn run_io(handler: &mut Self::Handler, name: &str, data: &mut i32) -> HandlerResult {
        handler.read(name, data)
    }

    fn run_io_async(handler: &mut Self::Handler, name: &str, data: &mut i32) -> Result<(), HandlerError> {
        handler.read_async(name, data)
    }

    fn set_scan(handler: &mut Self::Handler, trigger: ScanTrigger) {
        handler.set_scan(trigger);
    }

    fn check_alarms(
        config: &NumericConfig,
        data: &i32,
        prev: &Committed<i32>,
        acc: &mut AlarmAccumulator,
    ) -> Option<AlarmStatus> {
        check_limits(config, f64::from(*data), prev, acc)
    }
}

impl RecordKind for LongoutKind {
    const RTYPE: RecordType = RecordType::Longout;
    type Data = i32;
    type Config = NumericConfig;
    type Handler = dyn LongoutHandler;

    fn to_value(data: &i32) -> Value {
        Value::Long(*data)
    }

    fn config_from(config: &RecordConfig) -> NumericConfig {
        config.numeric.clone()
    }

    fn coerce(config: &NumericConfig, value: &Value) -> IocResult<i32> {
        let raw = value.to_i32().ok_or_else(|| mismatch(Self::RTYPE, value))?;
        // 钳位结果落在两个 i32 之间时向限值内侧取整
        let clamped = config
            .clamp(f64::from(raw))
            .ok_or_else(|| mismatch(Self::RTYPE, value))?;
        Ok(if clamped > f64::from(raw) {
            clamped.ceil() as i32
        } else {
            clamped.floor() as i32
        })
    }

    fn run_io(handler: &mut Self::Handler, name: &str, data: &mut i32) -> HandlerResult {
        handler.write(name, data)
    }

    fn run_io_async(handler: &mut Self::Handler, name: &str, data: &mut i32) -> Result<(), HandlerError> {
        handler.write_async(name, data)
    }

    fn set_scan(handler: &mut Self::Handler, trigger: ScanTrigger) {
        handler.set_scan(trigger);
    }

    fn check_alarms(
        config: &NumericConfig,
        data: &i32,
        prev: &Committed<i32>,
        acc: &mut AlarmAccumulator,
    ) -> Option<AlarmStatus> {
        check_limits(config, f64::from(*data), prev, acc)
    }
}

impl OutputKind for LongoutKind {}

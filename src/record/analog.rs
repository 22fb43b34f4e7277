//! 模拟量记录：Ai（输入）/ Ao（输出）
//!
//! 值类型为 `f64`。两者都支持 HIHI/HIGH/LOW/LOLO 越限报警与滞回，
//! Ao 额外按驱动限值 (DRVL/DRVH) 钳位写入值。

use crate::models::{AlarmAccumulator, AlarmSeverity, AlarmStatus, RecordType, Value};
use crate::record::common::{Committed, NumericConfig, RecordConfig};
use crate::record::base::{mismatch, OutputKind, Record, RecordKind};
use crate::record::handler::{AiHandler, AoHandler, HandlerError, HandlerResult};
use crate::scan::ScanTrigger;
use crate::utils::error::IocResult;

/// 模拟量输入
pub struct AiKind;

/// 模拟量输出
pub struct AoKind;

pub type AiRecord = Record<AiKind>;
pub type AoRecord = Record<AoKind>;

/// 数值越限评估，Ai/Ao/Longin/Longout 共用
///
/// NaN 值视为未定义，报 `Udf / Invalid`
pub(crate) fn check_limits<T>(
    config: &NumericConfig,
    value: f64,
    prev: &Committed<T>,
    acc: &mut AlarmAccumulator,
) -> Option<AlarmStatus> {
    if value.is_nan() {
        acc.raise(AlarmStatus::Udf, AlarmSeverity::Invalid);
        return None;
    }
    config.limits.raise_into(value, prev.last_limit, acc)
}

impl RecordKind for AiKind {
    const RTYPE: RecordType = RecordType::Ai;
    type Data = f64;
    type Config = NumericConfig;
    type Handler = dyn AiHandler;

    fn to_value(data: &f64) -> Value {
        Value::Double(*data)
    }

    fn config_from(config: &RecordConfig) -> NumericConfig {
        NumericConfig {
            limits: config.numeric.limits.clone(),
            drive: None,
        }
    }

    fn coerce(_config: &NumericConfig, value: &Value) -> IocResult<f64> {
        value.to_f64().ok_or_else(|| mismatch(Self::RTYPE, value))
    }

    fn run_io(handler: &mut Self::Handler, name: &str, data: &mut f64) -> HandlerResult {
        handler.read(name, data)
    }

    fn run_io_async(handler: &mut Self::Handler, name: &str, data: &mut f64) -> Result<(), HandlerError> {
        handler.read_async(name, data)
    }

    fn set_scan(handler: &mut Self::Handler, trigger: ScanTrigger) {
        handler.set_scan(trigger);
    }

    fn check_alarms(
        config: &NumericConfig,
        data: &f64,
        prev: &Committed<f64>,
        acc: &mut AlarmAccumulator,
    ) -> Option<AlarmStatus> {
        check_limits(config, *data, prev, acc)
    }
}

impl RecordKind for AoKind {
    const RTYPE: RecordType = RecordType::Ao;
    type Data = f64;
    type Config = NumericConfig;
    type Handler = dyn AoHandler;

    fn to_value(data: &f64) -> Value {
        Value::Double(*data)
    }

    fn config_from(config: &RecordConfig) -> NumericConfig {
        config.numeric.clone()
    }

    fn coerce(config: &NumericConfig, value: &Value) -> IocResult<f64> {
        value
            .to_f64()
            .filter(|v| v.is_finite())
            .and_then(|v| config.clamp(v))
            .ok_or_else(|| mismatch(Self::RTYPE, value))
    }

    fn run_io(handler: &mut Self::Handler, name: &str, data: &mut f64) -> HandlerResult {
        handler.write(name, data)
    }

    fn run_io_async(handler: &mut Self::Handler, name: &str, data: &mut f64) -> Result<(), HandlerError> {
        handler.write_async(name, data)
    }

    fn set_scan(handler: &mut Self::Handler, trigger: ScanTrigger) {
        handler.set_scan(trigger);
    }

    fn check_alarms(
        config: &NumericConfig,
        data: &f64,
        prev: &Committed<f64>,
        acc: &mut AlarmAccumulator,
    ) -> Option<AlarmStatus> {
        check_limits(config, *data, prev, acc)
    }
}

impl OutputKind for AoKind {}

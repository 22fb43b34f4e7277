//! 开关量记录：Bi（输入）/ Bo（输出）
//!
//! 值类型为 `bool`。报警规则：
//! - 状态报警：当前状态对应的严重度 (ZSV / OSV)，状态为 `State`
//! - 变化报警：与上次处理提交的值不同时使用 COSV，状态为 `ChangeOfState`

use crate::models::{AlarmAccumulator, AlarmSeverity, AlarmStatus, RecordType, Value};
use crate::record::common::{BinaryConfig, Committed, RecordConfig};
use crate::record::base::{mismatch, OutputKind, Record, RecordKind};
use crate::record::handler::{BiHandler, BoHandler, HandlerError, HandlerResult};
use crate::scan::ScanTrigger;
use crate::utils::error::IocResult;

/// 开关量输入
pub struct BiKind;

/// 开关量输出
pub struct BoKind;

pub type BiRecord = Record<BiKind>;
pub type BoRecord = Record<BoKind>;

/// 把外部值转换为开关量
///
/// 字符串可以是状态名 (ZNAM/ONAM)、`0`/`1`、`true`/`false` 或任意数值（非零为真）
fn coerce_bool(config: &BinaryConfig, rtype: RecordType, value: &Value) -> IocResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Long(n) => Ok(*n != 0),
        Value::Double(d) if d.is_nan() => Err(mismatch(rtype, value)),
        Value::Double(d) => Ok(*d != 0.0),
        Value::Text(text) => {
            let text = text.as_str().trim();
            if text == config.znam.as_str() {
                Ok(false)
            } else if text == config.onam.as_str() {
                Ok(true)
            } else if text.eq_ignore_ascii_case("true") {
                Ok(true)
            } else if text.eq_ignore_ascii_case("false") {
                Ok(false)
            } else {
                text.parse::<f64>()
                    .ok()
                    .filter(|v| !v.is_nan())
                    .map(|v| v != 0.0)
                    .ok_or_else(|| mismatch(rtype, value))
            }
        }
    }
}

fn check_states(
    config: &BinaryConfig,
    data: bool,
    prev: &Committed<bool>,
    acc: &mut AlarmAccumulator,
) -> Option<AlarmStatus> {
    let state_severity = if data { config.osv } else { config.zsv };
    acc.raise(AlarmStatus::State, state_severity);

    if prev.processed_value.map_or(false, |last| last != data) {
        acc.raise(AlarmStatus::ChangeOfState, config.cosv);
    }
    None
}

impl RecordKind for BiKind {
    const RTYPE: RecordType = RecordType::Bi;
    type Data = bool;
    type Config = BinaryConfig;
    type Handler = dyn BiHandler;

    fn to_value(data: &bool) -> Value {
        Value::Bool(*data)
    }

    fn config_from(config: &RecordConfig) -> BinaryConfig {
        config.binary.clone()
    }

    fn coerce(config: &BinaryConfig, value: &Value) -> IocResult<bool> {
        coerce_bool(config, Self::RTYPE, value)
    }

    fn run_io(handler: &mut Self::Handler, name: &str, data: &mut bool) -> HandlerResult {
        handler.read(name, data)
    }

    fn run_io_async(handler: &mut Self::Handler, name: &str, data: &mut bool) -> Result<(), HandlerError> {
        handler.read_async(name, data)
    }

    fn set_scan(handler: &mut Self::Handler, trigger: ScanTrigger) {
        handler.set_scan(trigger);
    }

    fn check_alarms(
        config: &BinaryConfig,
        data: &bool,
        prev: &Committed<bool>,
        acc: &mut AlarmAccumulator,
    ) -> Option<AlarmStatus> {
        check_states(config, *data, prev, acc)
    }
}

impl RecordKind for BoKind {
    const RTYPE: RecordType = RecordType::Bo;
    type Data = bool;
    type Config = BinaryConfig;
    type Handler = dyn BoHandler;

    fn to_value(data: &bool) -> Value {
        Value::Bool(*data)
    }

    fn config_from(config: &RecordConfig) -> BinaryConfig {
        config.binary.clone()
    }

    fn coerce(config: &BinaryConfig, value: &Value) -> IocResult<bool> {
        coerce_bool(config, Self::RTYPE, value)
    }

    fn run_io(handler: &mut Self::Handler, name: &str, data: &mut bool) -> HandlerResult {
        handler.write(name, data)
    }

    fn run_io_async(handler: &mut Self::Handler, name: &str, data: &mut bool) -> Result<(), HandlerError> {
        handler.write_async(name, data)
    }

    fn set_scan(handler: &mut Self::Handler, trigger: ScanTrigger) {
        handler.set_scan(trigger);
    }

    fn check_alarms(
        config: &BinaryConfig,
        data: &bool,
        prev: &Committed<bool>,
        acc: &mut AlarmAccumulator,
    ) -> Option<AlarmStatus> {
        check_states(config, *data, prev, acc)
    }
}

impl OutputKind for BoKind {}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试开关量值转换
    #[test]
    fn test_coerce_bool() {
        let cfg = BinaryConfig::default().names("Off", "On");
        let rt = RecordType::Bo;
        assert_eq!(coerce_bool(&cfg, rt, &Value::from("On")).unwrap(), true);
        assert_eq!(coerce_bool(&cfg, rt, &Value::from("Off")).unwrap(), false);
        assert_eq!(coerce_bool(&cfg, rt, &Value::from("1")).unwrap(), true);
        assert_eq!(coerce_bool(&cfg, rt, &Value::from("TRUE")).unwrap(), true);
        assert_eq!(coerce_bool(&cfg, rt, &Value::Long(0)).unwrap(), false);
        assert_eq!(coerce_bool(&cfg, rt, &Value::Double(0.5)).unwrap(), true);

        let err = coerce_bool(&cfg, rt, &Value::from("maybe")).unwrap_err();
        assert_eq!(err.error_code(), "VALUE_TYPE_MISMATCH");
    }

    /// 测试状态报警与变化报警取最高严重度
    #[test]
    fn test_state_and_change_of_state() {
        let cfg = BinaryConfig::default()
            .state_severities(AlarmSeverity::NoAlarm, AlarmSeverity::Minor)
            .change_of_state(AlarmSeverity::Major);

        let mut prev = Committed::new(false);
        let mut acc = AlarmAccumulator::new();
        check_states(&cfg, true, &prev, &mut acc);
        // 首次处理没有变化报警
        assert_eq!(acc.finish().status, AlarmStatus::State);

        prev.processed_value = Some(false);
        let mut acc = AlarmAccumulator::new();
        check_states(&cfg, true, &prev, &mut acc);
        let state = acc.finish();
        assert_eq!(state.status, AlarmStatus::ChangeOfState);
        assert_eq!(state.severity, AlarmSeverity::Major);
    }
}

//! 字符串记录：Stringin（输入）/ Stringout（输出）
//!
//! 值类型为 `BoundedString`，没有值相关的报警规则；任意值按显示格式转为字符串。

use crate::models::{AlarmAccumulator, AlarmStatus, BoundedString, RecordType, Value};
use crate::record::common::{Committed, RecordConfig};
use crate::record::base::{OutputKind, Record, RecordKind};
use crate::record::handler::{HandlerError, HandlerResult, StringinHandler, StringoutHandler};
use crate::scan::ScanTrigger;
use crate::utils::error::IocResult;

/// 字符串输入
pub struct StringinKind;

/// 字符串输出
pub struct StringoutKind;

pub type StringinRecord = Record<StringinKind>;
pub type StringoutRecord = Record<StringoutKind>;

fn coerce_text(value: &Value) -> BoundedString {
    match value {
        Value::Text(text) => text.clone(),
        other => BoundedString::new(other.to_string()),
    }
}

impl RecordKind for StringinKind {
    const RTYPE: RecordType = RecordType::Stringin;
    type Data = BoundedString;
    type Config = ();
    type Handler = dyn StringinHandler;

    fn to_value(data: &BoundedString) -> Value {
        Value::Text(data.clone())
    }

    fn config_from(_config: &RecordConfig) {}

    fn coerce(_config: &(), value: &Value) -> IocResult<BoundedString> {
        Ok(coerce_text(value))
    }

    fn run_io(handler: &mut Self::Handler, name: &str, data: &mut BoundedString) -> HandlerResult {
        handler.read(name, data)
    }

    fn run_io_async(
        handler: &mut Self::Handler,
        name: &str,
        data: &mut BoundedString,
    ) -> Result<(), HandlerError> {
        handler.read_async(name, data)
    }

    fn set_scan(handler: &mut Self::Handler, trigger: ScanTrigger) {
        handler.set_scan(trigger);
    }

    fn check_alarms(
        _config: &(),
        _data: &BoundedString,
        _prev: &Committed<BoundedString>,
        _acc: &mut AlarmAccumulator,
    ) -> Option<AlarmStatus> {
        None
    }
}

impl RecordKind for StringoutKind {
    const RTYPE: RecordType = RecordType::Stringout;
    type Data = BoundedString;
    type Config = ();
    type Handler = dyn StringoutHandler;

    fn to_value(data: &BoundedString) -> Value {
        Value::Text(data.clone())
    }

    fn config_from(_config: &RecordConfig) {}

    fn coerce(_config: &(), value: &Value) -> IocResult<BoundedString> {
        Ok(coerce_text(value))
    }

    fn run_io(handler: &mut Self::Handler, name: &str, data: &mut BoundedString) -> HandlerResult {
        handler.write(name, data)
    }

    fn run_io_async(
        handler: &mut Self::Handler,
        name: &str,
        data: &mut BoundedString,
    ) -> Result<(), HandlerError> {
        handler.write_async(name, data)
    }

    fn set_scan(handler: &mut Self::Handler, trigger: ScanTrigger) {
        handler.set_scan(trigger);
    }

    fn check_alarms(
        _config: &(),
        _data: &BoundedString,
        _prev: &Committed<BoundedString>,
        _acc: &mut AlarmAccumulator,
    ) -> Option<AlarmStatus> {
        None
    }
}

impl OutputKind for StringoutKind {}

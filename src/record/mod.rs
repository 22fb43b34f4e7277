//! # 记录模块 (Record Module)
//!
//! ## 业务说明
//! 记录是过程变量数据库的基本单元。八种记录类型共享 `base::Record<K>` 的处理协议：
//! 非阻塞忙标志、工作副本、报警累加、原子提交、前向链接排队。
//!
//! ## 模块组成
//! - `common`: 公共私有状态、创建配置、统计
//! - `handler`: 设备处理器trait
//! - `base`: 通用记录与 `RecordKind`
//! - `analog` / `binary` / `long` / `string`: 八种记录类型
//! - `any`: 多态门面

pub mod analog;
pub mod any;
pub mod binary;
pub mod common;
pub mod base;
pub mod handler;
pub mod long;
pub mod string;

pub use analog::{AiKind, AiRecord, AoKind, AoRecord};
pub use any::{AnyHandlerBox, AnyReadRecord, AnyRecord, AnyWriteRecord};
pub use binary::{BiKind, BiRecord, BoKind, BoRecord};
pub use common::{
    BinaryConfig, CommonPrivate, Committed, NumericConfig, RecordConfig, RecordServices,
    RecordSnapshot, RecordStatsSnapshot,
};
pub use base::{OutputKind, Record, RecordKind};
pub use handler::{
    read_fn, write_fn, AiHandler, AoHandler, BiHandler, BoHandler, FnReadHandler, FnWriteHandler,
    HandlerError, HandlerResult, HandlerStatus, LonginHandler, LongoutHandler, ReadHandler,
    StringinHandler, StringoutHandler, WriteHandler,
};
pub use long::{LonginKind, LonginRecord, LongoutKind, LongoutRecord};
pub use string::{StringinKind, StringinRecord, StringoutKind, StringoutRecord};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlarmLimits, AlarmSeverity, AlarmStatus, RecordType, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn create(name: &str, config: RecordConfig) -> AnyRecord {
        AnyRecord::create(name, &config, Arc::new(RecordServices::new())).unwrap()
    }

    mockall::mock! {
        pub TempSensor {}

        impl ReadHandler<f64> for TempSensor {
            fn set_scan(&mut self, trigger: crate::scan::ScanTrigger);
            fn read(&mut self, name: &str, value: &mut f64) -> HandlerResult;
            fn read_async(&mut self, name: &str, value: &mut f64) -> Result<(), HandlerError>;
        }
    }

    /// 测试未处理的记录报告 Udf/Invalid
    #[test]
    fn test_unprocessed_record_is_undefined() {
        let rec = create("AI:1", RecordConfig::ai());
        let snap = rec.read();
        assert_eq!(snap.alarm.status, AlarmStatus::Udf);
        assert_eq!(snap.alarm.severity, AlarmSeverity::Invalid);
        assert!(snap.timestamp.is_none());
    }

    /// 测试软记录（无处理器）处理后报警清除
    #[test]
    fn test_soft_record_processes_without_handler() {
        let rec = create("AI:SOFT", RecordConfig::ai().initial_value(3.5));
        rec.process().unwrap();
        let snap = rec.read();
        assert_eq!(snap.value, Value::Double(3.5));
        assert_eq!(snap.alarm.severity, AlarmSeverity::NoAlarm);
        assert!(snap.timestamp.is_some());
        assert_eq!(rec.stats().processed, 1);
    }

    /// 测试 mock 处理器：读值触发 HIGH 报警
    #[test]
    fn test_mock_handler_drives_limit_alarm() {
        let mut sensor = MockTempSensor::new();
        sensor.expect_read().times(1).returning(|_, v| {
            *v = 150.0;
            Ok(HandlerStatus::Done)
        });

        let rec = create(
            "TEMP:1",
            RecordConfig::ai().limits(AlarmLimits::new().high(100.0, AlarmSeverity::Major)),
        );
        let handler: Box<dyn AiHandler> = Box::new(sensor);
        rec.set_handler(handler.into()).unwrap();
        rec.process().unwrap();

        let snap = rec.read();
        assert_eq!(snap.value, Value::Double(150.0));
        assert_eq!(snap.alarm.status, AlarmStatus::High);
        assert_eq!(snap.alarm.severity, AlarmSeverity::Major);
    }

    /// 测试设备故障折算为 Invalid 报警并保留原值
    #[test]
    fn test_handler_fault_sets_invalid_alarm() {
        let rec = create("AI:FAULT", RecordConfig::ai().initial_value(1.0));
        let handler: Box<dyn AiHandler> = Box::new(read_fn(|_: &str, v: &mut f64| {
            *v = 99.0;
            Err(HandlerError::Io("adc offline".into()))
        }));
        rec.set_handler(handler.into()).unwrap();

        assert!(rec.process().is_ok());
        let snap = rec.read();
        assert_eq!(snap.value, Value::Double(1.0));
        assert_eq!(snap.alarm.status, AlarmStatus::ReadError);
        assert_eq!(snap.alarm.severity, AlarmSeverity::Invalid);
        assert_eq!(rec.stats().faults, 1);
        assert!(!rec.is_busy());
    }

    /// 测试处理器类型不匹配与重复挂接
    #[test]
    fn test_set_handler_errors() {
        let rec = create("BO:1", RecordConfig::bo());
        let wrong: Box<dyn AiHandler> =
            Box::new(read_fn(|_: &str, _: &mut f64| Ok(HandlerStatus::Done)));
        let err = rec.set_handler(wrong.into()).unwrap_err();
        assert_eq!(err.error_code(), "HANDLER_MISMATCH");

        let first: Box<dyn BoHandler> =
            Box::new(write_fn(|_: &str, _: &mut bool| Ok(HandlerStatus::Done)));
        let second: Box<dyn BoHandler> =
            Box::new(write_fn(|_: &str, _: &mut bool| Ok(HandlerStatus::Done)));
        rec.set_handler(first.into()).unwrap();
        let err = rec.set_handler(second.into()).unwrap_err();
        assert_eq!(err.error_code(), "HANDLER_ALREADY_SET");
    }

    /// 测试输入记录不可写
    #[test]
    fn test_input_not_writable() {
        let rec = create("BI:1", RecordConfig::bi());
        let err = rec.as_write().unwrap_err();
        assert_eq!(err.error_code(), "NOT_WRITABLE");
        assert_eq!(rec.as_read().rtype(), RecordType::Bi);
    }

    /// 测试 Ao 写入钳位后读回
    #[test]
    fn test_ao_write_clamps_and_reads_back() {
        let rec = create("AO:1", RecordConfig::ao().drive_limits(0.0, 10.0));
        let writer = rec.as_write().unwrap();
        writer.write(&Value::Double(25.0)).unwrap();
        assert_eq!(rec.read().value, Value::Double(10.0));
        writer.write(&Value::from("4.5")).unwrap();
        assert_eq!(writer.read().value, Value::Double(4.5));
        assert!(writer.write(&Value::from("abc")).is_err());
        assert_eq!(rec.read().value, Value::Double(4.5));
    }

    /// 测试输出处理器在 process 时收到写入的值
    #[test]
    fn test_output_handler_receives_written_value() {
        let seen = Arc::new(AtomicUsize::new(0));
        let tally = seen.clone();
        let rec = create("LO:1", RecordConfig::longout());
        let handler: Box<dyn LongoutHandler> = Box::new(write_fn(move |_: &str, v: &mut i32| {
            tally.store(*v as usize, Ordering::SeqCst);
            Ok(HandlerStatus::Done)
        }));
        rec.set_handler(handler.into()).unwrap();

        rec.as_write().unwrap().write(&Value::Long(17)).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        rec.process().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 17);
    }

    /// 测试异步处理器在没有工作线程时在当前线程完成
    #[test]
    fn test_async_handler_completes_inline_without_worker() {
        let mut sensor = MockTempSensor::new();
        sensor.expect_read().returning(|_, _| Ok(HandlerStatus::Async));
        sensor.expect_read_async().times(1).returning(|_, v| {
            *v = 7.0;
            Ok(())
        });

        let rec = create("AI:ASYNC", RecordConfig::ai());
        let handler: Box<dyn AiHandler> = Box::new(sensor);
        rec.set_handler(handler.into()).unwrap();
        rec.process().unwrap();

        assert_eq!(rec.read().value, Value::Double(7.0));
        assert!(!rec.is_busy());
        assert!(!rec.complete_async());
    }

    /// 测试字符串记录截断与转换
    #[test]
    fn test_stringout_write_truncates() {
        let rec = create("SO:1", RecordConfig::stringout());
        let writer = rec.as_write().unwrap();
        writer.write(&Value::from("y".repeat(80))).unwrap();
        match rec.read().value {
            Value::Text(s) => assert_eq!(s.len(), crate::models::MAX_STRING_SIZE),
            other => panic!("unexpected value {:?}", other),
        }
        writer.write(&Value::Double(2.5)).unwrap();
        assert_eq!(rec.read().value, Value::from("2.5"));
    }

    /// 测试具体记录与门面之间的转换
    #[test]
    fn test_concrete_conversions() {
        let rec = create("LI:1", RecordConfig::longin());
        let concrete: Arc<LonginRecord> = rec.clone().try_into().unwrap();
        assert_eq!(concrete.name(), "LI:1");
        let back: AnyRecord = concrete.into();
        assert_eq!(back.rtype(), RecordType::Longin);

        let wrong: Result<Arc<AiRecord>, AnyRecord> = rec.try_into();
        assert_eq!(wrong.unwrap_err().name(), "LI:1");
    }
}

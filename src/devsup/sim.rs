//! # 仿真设备支持
//!
//! ## 业务说明
//! 没有硬件时用于演示和联调，为名称带指定前缀的记录提供仿真处理器：
//! - Ai: 随机游走，步长可由 `sim_step` 命令调整
//! - Bi: 以 10% 概率翻转
//! - Longin: 每次处理加一
//! - Stringin: 当前本地时间
//! - 输出记录: 只把写入值记到日志
//!
//! 开启演示记录时，`init` 会创建一组带前缀的演示记录。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use log::info;
use rand::Rng;

use crate::command::CommandRegistry;
use crate::context::{Context, ContextBuilder, RecordHandle};
use crate::devsup::DeviceSupport;
use crate::models::{AlarmLimits, AlarmSeverity, BoundedString, RecordType};
use crate::record::{
    read_fn, write_fn, AiHandler, AnyHandlerBox, AoHandler, BiHandler, BinaryConfig, BoHandler,
    HandlerStatus, LonginHandler, LongoutHandler, RecordConfig, StringinHandler,
    StringoutHandler,
};
use crate::register_command;
use crate::utils::error::{IocError, IocResult};

/// 默认随机游走步长
pub const DEFAULT_STEP: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct SimDeviceSupport {
    prefix: String,
    demo_records: bool,
    /// f64 位模式
    step: Arc<AtomicU64>,
}

impl SimDeviceSupport {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            demo_records: false,
            step: Arc::new(AtomicU64::new(DEFAULT_STEP.to_bits())),
        }
    }

    /// 初始化时创建演示记录
    pub fn with_demo_records(mut self) -> Self {
        self.demo_records = true;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn step(&self) -> f64 {
        f64::from_bits(self.step.load(Ordering::Relaxed))
    }

    fn record_name(&self, suffix: &str) -> String {
        format!("{}{}", self.prefix, suffix)
    }

    fn create_demo_records(&self, builder: &mut ContextBuilder) -> IocResult<()> {
        let second = Duration::from_secs(1);
        builder.create(
            &self.record_name("TEMP"),
            RecordConfig::ai()
                .periodic(second)
                .initial_value(20.0)
                .limits(
                    AlarmLimits::new()
                        .high(30.0, AlarmSeverity::Minor)
                        .hihi(40.0, AlarmSeverity::Major)
                        .low(10.0, AlarmSeverity::Minor)
                        .hysteresis(0.5),
                ),
        )?;
        builder.create(
            &self.record_name("SETPOINT"),
            RecordConfig::ao().drive_limits(0.0, 100.0),
        )?;
        builder.create(
            &self.record_name("PUMP"),
            RecordConfig::bo()
                .binary(BinaryConfig::default().names("OFF", "ON"))
                .forward_link(&self.record_name("PUMP:RBV")),
        )?;
        builder.create(
            &self.record_name("PUMP:RBV"),
            RecordConfig::bi().binary(
                BinaryConfig::default()
                    .names("STOPPED", "RUNNING")
                    .change_of_state(AlarmSeverity::Minor),
            ),
        )?;
        builder.create(&self.record_name("COUNTER"), RecordConfig::longin().periodic(second))?;
        builder.create(&self.record_name("MODE"), RecordConfig::longout().drive_limits(0.0, 3.0))?;
        builder.create(
            &self.record_name("CLOCK"),
            RecordConfig::stringin().periodic(Duration::from_secs(5)),
        )?;
        builder.create(&self.record_name("MSG"), RecordConfig::stringout())?;
        Ok(())
    }
}

impl DeviceSupport for SimDeviceSupport {
    fn name(&self) -> &str {
        "sim"
    }

    fn init(&self, builder: &mut ContextBuilder, registry: &CommandRegistry) -> IocResult<()> {
        if self.demo_records {
            self.create_demo_records(builder)?;
        }

        let step_cell = self.step.clone();
        register_command!(registry, fn sim_step(_ctx, step: f64) -> f64 {
            if !step.is_finite() || step < 0.0 {
                return Err(IocError::command_failed("sim_step", format!("无效的步长: {}", step)));
            }
            let previous = f64::from_bits(step_cell.swap(step.to_bits(), Ordering::Relaxed));
            Ok(previous)
        })
    }

    fn record_init(&self, handle: &RecordHandle) -> Option<AnyHandlerBox> {
        if !handle.name.starts_with(&self.prefix) {
            return None;
        }

        let handler: AnyHandlerBox = match handle.rtype {
            RecordType::Ai => {
                let step = self.step.clone();
                let h: Box<dyn AiHandler> = Box::new(read_fn(move |_: &str, v: &mut f64| {
                    let s = f64::from_bits(step.load(Ordering::Relaxed));
                    if s > 0.0 {
                        *v += rand::thread_rng().gen_range(-s..=s);
                    }
                    Ok(HandlerStatus::Done)
                }));
                h.into()
            }
            RecordType::Bi => {
                let h: Box<dyn BiHandler> = Box::new(read_fn(|_: &str, v: &mut bool| {
                    if rand::thread_rng().gen_bool(0.1) {
                        *v = !*v;
                    }
                    Ok(HandlerStatus::Done)
                }));
                h.into()
            }
            RecordType::Longin => {
                let h: Box<dyn LonginHandler> = Box::new(read_fn(|_: &str, v: &mut i32| {
                    *v = v.wrapping_add(1);
                    Ok(HandlerStatus::Done)
                }));
                h.into()
            }
            RecordType::Stringin => {
                let h: Box<dyn StringinHandler> =
                    Box::new(read_fn(|_: &str, v: &mut BoundedString| {
                        *v = BoundedString::new(Local::now().format("%H:%M:%S").to_string());
                        Ok(HandlerStatus::Done)
                    }));
                h.into()
            }
            RecordType::Ao => {
                let h: Box<dyn AoHandler> = Box::new(write_fn(|name: &str, v: &mut f64| {
                    info!("[SIM] {} <- {}", name, v);
                    Ok(HandlerStatus::Done)
                }));
                h.into()
            }
            RecordType::Bo => {
                let h: Box<dyn BoHandler> = Box::new(write_fn(|name: &str, v: &mut bool| {
                    info!("[SIM] {} <- {}", name, v);
                    Ok(HandlerStatus::Done)
                }));
                h.into()
            }
            RecordType::Longout => {
                let h: Box<dyn LongoutHandler> = Box::new(write_fn(|name: &str, v: &mut i32| {
                    info!("[SIM] {} <- {}", name, v);
                    Ok(HandlerStatus::Done)
                }));
                h.into()
            }
            RecordType::Stringout => {
                let h: Box<dyn StringoutHandler> =
                    Box::new(write_fn(|name: &str, v: &mut BoundedString| {
                        info!("[SIM] {} <- {}", name, v);
                        Ok(HandlerStatus::Done)
                    }));
                h.into()
            }
        };
        Some(handler)
    }

    fn quit(&self, ctx: &Context) {
        let processed: u64 = ctx
            .iter()
            .filter(|r| r.name().starts_with(&self.prefix))
            .map(|r| r.stats().processed)
            .sum();
        info!("🛑 [SIM] 仿真设备支持退出，累计处理 {} 次", processed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ArgBuf, ArgBufWriter};
    use crate::devsup::install_device_support;
    use crate::models::Value;

    /// 测试演示记录全部挂接仿真处理器
    #[test]
    fn test_demo_records_get_handlers() {
        let sim = SimDeviceSupport::new("SIM:").with_demo_records();
        let mut builder = ContextBuilder::new();
        builder.create("REAL:AI", RecordConfig::ai()).unwrap();
        let registry = CommandRegistry::new();

        let attached = install_device_support(&mut builder, &registry, &sim).unwrap();
        assert_eq!(attached, 8);
        assert!(!builder.has_handler("REAL:AI"));
        assert!(registry.contains("sim_step"));
    }

    /// 测试计数器与步长命令
    #[test]
    fn test_counter_and_step_command() {
        let sim = SimDeviceSupport::new("SIM:").with_demo_records();
        let mut builder = ContextBuilder::new();
        let registry = CommandRegistry::new();
        install_device_support(&mut builder, &registry, &sim).unwrap();
        let ctx = builder.build();

        ctx.process("SIM:COUNTER").unwrap();
        ctx.process("SIM:COUNTER").unwrap();
        assert_eq!(ctx.lookup("SIM:COUNTER").unwrap().read().value, Value::Long(2));

        let bytes = ArgBufWriter::new().double(0.0).finish();
        let previous = registry.invoke(&ctx, "sim_step", ArgBuf::new(&bytes)).unwrap();
        assert_eq!(previous, Value::Double(DEFAULT_STEP));
        assert_eq!(sim.step(), 0.0);

        ctx.process("SIM:TEMP").unwrap();
        assert_eq!(ctx.lookup("SIM:TEMP").unwrap().read().value, Value::Double(20.0));

        let bytes = ArgBufWriter::new().double(-1.0).finish();
        let err = registry.invoke(&ctx, "sim_step", ArgBuf::new(&bytes)).unwrap_err();
        assert_eq!(err.error_code(), "COMMAND_FAILED");
    }
}

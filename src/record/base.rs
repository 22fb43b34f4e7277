//! # 通用记录实现
//!
//! ## 业务说明
//! 八种记录共享同一套处理协议，差异（值类型、配置、处理器接口、报警规则、
//! 值转换）通过 `RecordKind` 关联类型注入。
//!
//! ## 处理流程
//! 1. CAS 获取忙标志，失败立即返回 `AlreadyProcessing`（绝不阻塞）
//! 2. 复制已提交值为工作副本，调用处理器
//! 3. 处理器返回 Async 时暂存工作副本，交给异步工作线程
//! 4. 收尾：评估报警、写入时间戳、在写锁内提交工作副本与报警，释放忙标志
//! 5. 前向链接推入上下文队列，由调度器稍后处理（不递归）
//!
//! ## Rust知识点
//! - **关联类型**: `type Handler: ?Sized` 允许存放 `dyn AiHandler` 等trait对象
//! - **标记trait**: `OutputKind` 只为输出类型实现，`write()` 在编译期受限

use chrono::Utc;
use log::{debug, warn};

use crate::log_scan_fault;
use crate::models::{AlarmAccumulator, AlarmSeverity, AlarmStatus, RecordType, Value};
use crate::record::common::{
    mutex_guard, read_guard, write_guard, CommonPrivate, Committed, RecordConfig, RecordSnapshot,
};
use crate::record::handler::{HandlerError, HandlerResult, HandlerStatus};
use crate::scan::ScanTrigger;
use crate::utils::error::{IocError, IocResult};
use std::sync::{Mutex, RwLock};

/// 记录类型描述
pub trait RecordKind: Send + Sync + 'static {
    /// 记录类型标识
    const RTYPE: RecordType;

    /// 记录值的原生类型
    type Data: Clone + Default + PartialEq + Send + Sync + 'static;

    /// 记录类型专属配置
    type Config: Send + Sync + 'static;

    /// 设备处理器trait对象
    type Handler: ?Sized + Send + 'static;

    fn to_value(data: &Self::Data) -> Value;

    fn config_from(config: &RecordConfig) -> Self::Config;

    /// 把外部值转换为记录值；输出记录同时按驱动限值钳位
    fn coerce(config: &Self::Config, value: &Value) -> IocResult<Self::Data>;

    fn run_io(handler: &mut Self::Handler, name: &str, data: &mut Self::Data) -> HandlerResult;

    fn run_io_async(
        handler: &mut Self::Handler,
        name: &str,
        data: &mut Self::Data,
    ) -> Result<(), HandlerError>;

    fn set_scan(handler: &mut Self::Handler, trigger: ScanTrigger);

    /// 评估值相关的报警，返回命中的越限状态（供下周期滞回判断）
    fn check_alarms(
        config: &Self::Config,
        data: &Self::Data,
        prev: &Committed<Self::Data>,
        acc: &mut AlarmAccumulator,
    ) -> Option<AlarmStatus>;
}

/// 输出类记录标记
pub trait OutputKind: RecordKind {}

/// 异步处理期间暂存的工作副本
struct Parked<T> {
    working: Option<T>,
    acc: AlarmAccumulator,
}

/// 通用记录
pub struct Record<K: RecordKind> {
    common: CommonPrivate,
    config: K::Config,
    state: RwLock<Committed<K::Data>>,
    handler: Mutex<Option<Box<K::Handler>>>,
    parked: Mutex<Option<Parked<K::Data>>>,
}

impl<K: RecordKind> std::fmt::Debug for Record<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("name", &self.common.name())
            .field("rtype", &K::RTYPE)
            .field("busy", &self.common.is_busy())
            .finish()
    }
}

impl<K: RecordKind> Record<K> {
    /// 创建记录；初始值按记录类型转换
    pub(crate) fn new(common: CommonPrivate, config: &RecordConfig) -> IocResult<Self> {
        let kind_config = K::config_from(config);
        let initial = match &config.initial_value {
            Some(v) => K::coerce(&kind_config, v)?,
            None => K::Data::default(),
        };

        Ok(Self {
            common,
            config: kind_config,
            state: RwLock::new(Committed::new(initial)),
            handler: Mutex::new(None),
            parked: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        self.common.name()
    }

    pub fn rtype(&self) -> RecordType {
        K::RTYPE
    }

    pub fn common(&self) -> &CommonPrivate {
        &self.common
    }

    pub fn config(&self) -> &K::Config {
        &self.config
    }

    /// 当前已提交的原生值
    pub fn value(&self) -> K::Data {
        read_guard(&self.state).value.clone()
    }

    /// 读取最近一次提交的状态，处理进行中也可以调用
    pub fn read(&self) -> RecordSnapshot {
        let state = read_guard(&self.state);
        RecordSnapshot {
            value: K::to_value(&state.value),
            alarm: state.alarm,
            timestamp: state.timestamp,
        }
    }

    /// 挂接设备处理器，只允许一次
    pub fn set_handler(&self, handler: Box<K::Handler>) -> IocResult<()> {
        let mut slot = mutex_guard(&self.handler);
        if slot.is_some() {
            return Err(IocError::handler_already_set(self.name()));
        }
        *slot = Some(handler);
        Ok(())
    }

    pub fn has_handler(&self) -> bool {
        mutex_guard(&self.handler).is_some()
    }

    /// 把事件触发器交给处理器
    pub fn set_scan_trigger(&self, trigger: ScanTrigger) {
        if let Some(handler) = mutex_guard(&self.handler).as_mut() {
            K::set_scan(&mut **handler, trigger);
        }
    }

    /// 处理一次记录
    ///
    /// 唯一可能返回的错误是 `AlreadyProcessing`；设备故障折算为报警状态
    pub fn process(&self) -> IocResult<()> {
        if !self.common.try_acquire() {
            return Err(IocError::already_processing(self.name()));
        }

        let mut working = read_guard(&self.state).value.clone();
        let mut acc = AlarmAccumulator::new();

        let outcome = match mutex_guard(&self.handler).as_mut() {
            Some(handler) => K::run_io(&mut **handler, self.name(), &mut working),
            None => Ok(HandlerStatus::Done),
        };

        match outcome {
            Ok(HandlerStatus::Done) => self.finish(Some(working), acc),
            Ok(HandlerStatus::Async) => self.park(working, acc),
            Err(e) => {
                self.raise_fault(&e, &mut acc);
                self.finish(None, acc);
            }
        }
        Ok(())
    }

    /// 完成异步处理的后半段
    ///
    /// 由异步工作线程调用；没有暂存的工作副本时返回 false
    pub fn complete_async(&self) -> bool {
        let parked = mutex_guard(&self.parked).take();
        let Some(Parked { working, mut acc }) = parked else {
            warn!("记录 {} 没有待完成的异步处理", self.name());
            return false;
        };

        let mut working = working;
        if let Some(data) = working.as_mut() {
            let result = match mutex_guard(&self.handler).as_mut() {
                Some(handler) => K::run_io_async(&mut **handler, self.name(), data),
                None => Ok(()),
            };
            if let Err(e) = result {
                self.raise_fault(&e, &mut acc);
                working = None;
            }
        }

        self.finish(working, acc);
        true
    }

    fn park(&self, working: K::Data, acc: AlarmAccumulator) {
        *mutex_guard(&self.parked) = Some(Parked {
            working: Some(working),
            acc,
        });

        if !self.common.services().request_async_completion(self.name()) {
            debug!("记录 {} 无异步工作线程，在当前线程完成异步处理", self.name());
            self.complete_async();
        }
    }

    fn raise_fault(&self, error: &HandlerError, acc: &mut AlarmAccumulator) {
        log_scan_fault!("记录 {} 设备处理失败: {}", self.name(), error);
        self.common.count_fault();
        acc.raise(error.alarm_status(K::RTYPE), AlarmSeverity::Invalid);
    }

    /// 收尾：评估报警并原子提交，释放忙标志，推送前向链接
    ///
    /// `working` 为 None 表示设备故障，保留原值只更新报警与时间戳
    fn finish(&self, working: Option<K::Data>, mut acc: AlarmAccumulator) {
        {
            let mut state = write_guard(&self.state);
            let value = working.unwrap_or_else(|| state.value.clone());
            let limit = K::check_alarms(&self.config, &value, &state, &mut acc);

            state.alarm = acc.finish();
            state.timestamp = Some(Utc::now());
            state.last_limit = limit;
            state.processed_value = Some(value.clone());
            state.value = value;

            debug!(
                "处理完成: {} = {} [{}]",
                self.name(),
                K::to_value(&state.value),
                state.alarm
            );
        }

        self.common.release();
        self.common.count_processed();
        self.common
            .services()
            .forward
            .push_all(self.common.forward_links());
    }
}

impl<K: OutputKind> Record<K> {
    /// 写入新值（不触发处理），设备写入发生在下一次 `process()`
    pub fn write(&self, value: &Value) -> IocResult<()> {
        let data = K::coerce(&self.config, value)?;

        if !self.common.try_acquire() {
            return Err(IocError::already_processing(self.name()));
        }
        write_guard(&self.state).value = data;
        self.common.release();
        Ok(())
    }
}

/// 生成值类型不匹配错误
pub(crate) fn mismatch(rtype: RecordType, value: &Value) -> IocError {
    IocError::value_type_mismatch(rtype.to_string(), format!("{}({})", value.kind_name(), value))
}

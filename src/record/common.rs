//! # 记录公共状态
//!
//! 所有记录类型共享的私有状态：名称、扫描方式、忙标志 (pact)、前向链接、统计计数，
//! 以及由上下文统一持有的运行服务（前向链接队列、异步完成通道）。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::models::{
    AlarmLimits, AlarmSeverity, AlarmState, AlarmStatus, BoundedString, RecordType, ScanMode, Value,
};
use crate::scan::ForwardQueue;

// 锁中毒只说明另一线程在持锁时panic，已提交的数据仍然一致，直接取回内部值

pub(crate) fn read_guard<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_guard<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn mutex_guard<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 上下文内所有记录共享的运行服务
#[derive(Debug, Default)]
pub struct RecordServices {
    /// 前向链接队列，由调度器的前向处理阶段消费
    pub forward: ForwardQueue,
    /// 异步完成通道；未连接时异步处理在调用线程内完成
    async_tx: RwLock<Option<UnboundedSender<String>>>,
}

impl RecordServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attach_async_sender(&self, tx: UnboundedSender<String>) -> bool {
        let mut slot = write_guard(&self.async_tx);
        if slot.as_ref().map_or(false, |s| !s.is_closed()) {
            return false;
        }
        *slot = Some(tx);
        true
    }

    pub(crate) fn detach_async_sender(&self) {
        write_guard(&self.async_tx).take();
    }

    /// 把记录名发送给异步工作线程，失败时返回 false
    pub(crate) fn request_async_completion(&self, name: &str) -> bool {
        read_guard(&self.async_tx)
            .as_ref()
            .map_or(false, |tx| tx.send(name.to_string()).is_ok())
    }
}

/// 记录统计计数
#[derive(Debug, Default)]
pub struct RecordStats {
    processed: AtomicU64,
    busy_rejections: AtomicU64,
    faults: AtomicU64,
}

/// 记录统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordStatsSnapshot {
    /// 完成的处理次数
    pub processed: u64,
    /// 因忙被拒绝的处理/写入次数
    pub busy_rejections: u64,
    /// 设备处理器故障次数
    pub faults: u64,
}

impl RecordStats {
    pub fn snapshot(&self) -> RecordStatsSnapshot {
        RecordStatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            busy_rejections: self.busy_rejections.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
        }
    }
}

/// 记录公共私有状态
#[derive(Debug)]
pub struct CommonPrivate {
    name: String,
    rtype: RecordType,
    scan: RwLock<ScanMode>,
    pact: AtomicBool,
    flnk: Vec<String>,
    stats: RecordStats,
    services: Arc<RecordServices>,
}

impl CommonPrivate {
    pub(crate) fn new(
        name: &str,
        rtype: RecordType,
        scan: ScanMode,
        flnk: Vec<String>,
        services: Arc<RecordServices>,
    ) -> Self {
        Self {
            name: name.to_string(),
            rtype,
            scan: RwLock::new(scan),
            pact: AtomicBool::new(false),
            flnk,
            stats: RecordStats::default(),
            services,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rtype(&self) -> RecordType {
        self.rtype
    }

    pub fn scan(&self) -> ScanMode {
        read_guard(&self.scan).clone()
    }

    pub(crate) fn set_scan(&self, mode: ScanMode) {
        *write_guard(&self.scan) = mode;
    }

    pub fn forward_links(&self) -> &[String] {
        &self.flnk
    }

    pub fn stats(&self) -> RecordStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_busy(&self) -> bool {
        self.pact.load(Ordering::Acquire)
    }

    /// 非阻塞地获取忙标志；失败时计入忙拒绝次数
    pub(crate) fn try_acquire(&self) -> bool {
        let acquired = self
            .pact
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if !acquired {
            self.stats.busy_rejections.fetch_add(1, Ordering::Relaxed);
        }
        acquired
    }

    pub(crate) fn release(&self) {
        self.pact.store(false, Ordering::Release);
    }

    pub(crate) fn count_processed(&self) {
        self.stats.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_fault(&self) {
        self.stats.faults.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn services(&self) -> &RecordServices {
        &self.services
    }
}

/// 已提交的记录状态，读者看到的始终是它
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    pub alarm: AlarmState,
    pub timestamp: Option<DateTime<Utc>>,
    /// 上一周期命中的越限状态（滞回用）
    pub last_limit: Option<AlarmStatus>,
    /// 上一次处理提交的值（变化报警用）
    pub processed_value: Option<T>,
}

impl<T> Committed<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value,
            alarm: AlarmState::undefined(),
            timestamp: None,
            last_limit: None,
            processed_value: None,
        }
    }
}

/// 记录的只读快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub value: Value,
    pub alarm: AlarmState,
    pub timestamp: Option<DateTime<Utc>>,
}

/// 数值类记录配置（Ai / Ao / Longin / Longout）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericConfig {
    pub limits: AlarmLimits,
    /// 输出驱动限值 (DRVL, DRVH)，只对输出记录生效
    pub drive: Option<(f64, f64)>,
}

impl NumericConfig {
    /// 按驱动限值钳位，NaN 无法钳位返回 None
    pub fn clamp(&self, v: f64) -> Option<f64> {
        if v.is_nan() {
            return None;
        }
        Some(match self.drive {
            Some((lo, _)) if v < lo => lo,
            Some((_, hi)) if v > hi => hi,
            _ => v,
        })
    }
}

/// 开关量记录配置（Bi / Bo）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryConfig {
    /// 0 状态名称
    pub znam: BoundedString,
    /// 1 状态名称
    pub onam: BoundedString,
    /// 0 状态严重度
    pub zsv: AlarmSeverity,
    /// 1 状态严重度
    pub osv: AlarmSeverity,
    /// 状态变化严重度
    pub cosv: AlarmSeverity,
}

impl Default for BinaryConfig {
    fn default() -> Self {
        Self {
            znam: BoundedString::new("0"),
            onam: BoundedString::new("1"),
            zsv: AlarmSeverity::NoAlarm,
            osv: AlarmSeverity::NoAlarm,
            cosv: AlarmSeverity::NoAlarm,
        }
    }
}

impl BinaryConfig {
    pub fn names(mut self, znam: &str, onam: &str) -> Self {
        self.znam = BoundedString::new(znam);
        self.onam = BoundedString::new(onam);
        self
    }

    pub fn state_severities(mut self, zsv: AlarmSeverity, osv: AlarmSeverity) -> Self {
        self.zsv = zsv;
        self.osv = osv;
        self
    }

    pub fn change_of_state(mut self, cosv: AlarmSeverity) -> Self {
        self.cosv = cosv;
        self
    }
}

/// 记录创建配置
///
/// 用于 `ContextBuilder::create`，不同记录类型只读取与自己相关的部分
#[derive(Debug, Clone)]
pub struct RecordConfig {
    pub rtype: RecordType,
    pub scan: ScanMode,
    pub flnk: Vec<String>,
    pub numeric: NumericConfig,
    pub binary: BinaryConfig,
    pub initial_value: Option<Value>,
}

impl RecordConfig {
    pub fn new(rtype: RecordType) -> Self {
        Self {
            rtype,
            scan: ScanMode::Passive,
            flnk: Vec::new(),
            numeric: NumericConfig::default(),
            binary: BinaryConfig::default(),
            initial_value: None,
        }
    }

    pub fn ai() -> Self {
        Self::new(RecordType::Ai)
    }

    pub fn ao() -> Self {
        Self::new(RecordType::Ao)
    }

    pub fn bi() -> Self {
        Self::new(RecordType::Bi)
    }

    pub fn bo() -> Self {
        Self::new(RecordType::Bo)
    }

    pub fn longin() -> Self {
        Self::new(RecordType::Longin)
    }

    pub fn longout() -> Self {
        Self::new(RecordType::Longout)
    }

    pub fn stringin() -> Self {
        Self::new(RecordType::Stringin)
    }

    pub fn stringout() -> Self {
        Self::new(RecordType::Stringout)
    }

    pub fn scan(mut self, scan: ScanMode) -> Self {
        self.scan = scan;
        self
    }

    pub fn periodic(self, period: std::time::Duration) -> Self {
        self.scan(ScanMode::Periodic(period))
    }

    pub fn event(self, name: &str) -> Self {
        self.scan(ScanMode::Event(name.to_string()))
    }

    /// 追加一个前向链接
    pub fn forward_link(mut self, target: &str) -> Self {
        self.flnk.push(target.to_string());
        self
    }

    pub fn limits(mut self, limits: AlarmLimits) -> Self {
        self.numeric.limits = limits;
        self
    }

    pub fn drive_limits(mut self, lo: f64, hi: f64) -> Self {
        self.numeric.drive = Some((lo, hi));
        self
    }

    pub fn binary(mut self, binary: BinaryConfig) -> Self {
        self.binary = binary;
        self
    }

    pub fn initial_value(mut self, value: impl Into<Value>) -> Self {
        self.initial_value = Some(value.into());
        self
    }
}

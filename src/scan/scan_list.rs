//! # 扫描列表
//!
//! ## 业务说明
//! 每个周期类别 / 事件名对应一个扫描列表，成员按创建顺序排列。
//! 列表状态机：`Idle → Due → Processing → Settling → Idle`，
//! Settling 表示成员已处理完，正在等待前向链接阶段结束。
//!
//! 成员互斥锁同时被处理周期和成员变更 (`Scheduler::set_scan`) 使用，
//! 因此成员变更只会发生在两次扫描之间。

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};

use crate::log_scan_fault;
use crate::models::ScanMode;
use crate::record::common::mutex_guard;
use crate::record::AnyRecord;

/// 扫描列表标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScanListId {
    Periodic(Duration),
    Event(String),
}

impl ScanListId {
    /// 记录扫描方式对应的列表，被动记录不属于任何列表
    pub fn for_mode(mode: &ScanMode) -> Option<Self> {
        match mode {
            ScanMode::Passive => None,
            ScanMode::Periodic(period) => Some(ScanListId::Periodic(*period)),
            ScanMode::Event(name) => Some(ScanListId::Event(name.clone())),
        }
    }
}

impl Display for ScanListId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanListId::Periodic(period) => write!(f, "periodic({:?})", period),
            ScanListId::Event(name) => write!(f, "event({})", name),
        }
    }
}

/// 扫描列表状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ScanListState {
    Idle = 0,
    Due = 1,
    Processing = 2,
    Settling = 3,
}

impl ScanListState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ScanListState::Due,
            2 => ScanListState::Processing,
            3 => ScanListState::Settling,
            _ => ScanListState::Idle,
        }
    }
}

/// 扫描列表统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// 完成的扫描周期数
    pub cycles: u64,
    /// 成功处理的记录次数
    pub processed: u64,
    /// 因记录忙而跳过的次数
    pub missed: u64,
    /// 上一周期尚未结束时到来的扫描请求次数
    pub overruns: u64,
}

/// 单个列表一次扫描的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOutcome {
    pub processed: u64,
    pub missed: u64,
}

pub struct ScanList {
    id: ScanListId,
    state: AtomicU8,
    members: Mutex<Vec<AnyRecord>>,
    cycles: AtomicU64,
    processed: AtomicU64,
    missed: AtomicU64,
    overruns: AtomicU64,
}

impl ScanList {
    pub fn new(id: ScanListId) -> Self {
        Self {
            id,
            state: AtomicU8::new(ScanListState::Idle as u8),
            members: Mutex::new(Vec::new()),
            cycles: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            missed: AtomicU64::new(0),
            overruns: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &ScanListId {
        &self.id
    }

    pub fn state(&self) -> ScanListState {
        ScanListState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ScanListState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn stats(&self) -> ScanStats {
        ScanStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            missed: self.missed.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
        }
    }

    /// 成员互斥锁，成员变更时使用
    pub(crate) fn members(&self) -> MutexGuard<'_, Vec<AnyRecord>> {
        mutex_guard(&self.members)
    }

    pub fn member_names(&self) -> Vec<String> {
        self.members().iter().map(|r| r.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.members().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members().is_empty()
    }

    /// 标记列表到期；上一周期未结束时返回 false 并计入 overruns
    pub(crate) fn mark_due(&self) -> bool {
        let ok = self
            .state
            .compare_exchange(
                ScanListState::Idle as u8,
                ScanListState::Due as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if !ok {
            self.overruns.fetch_add(1, Ordering::Relaxed);
            warn!("扫描列表 {} 上一周期尚未结束，本次请求跳过", self.id);
        }
        ok
    }

    /// 按顺序处理全部成员，结束后进入 Settling
    ///
    /// 忙记录直接跳过并计为错过的扫描，不排队
    pub(crate) fn run(&self) -> ListOutcome {
        let members = self.members();
        self.set_state(ScanListState::Processing);

        let mut outcome = ListOutcome::default();
        for record in members.iter() {
            match record.process() {
                Ok(()) => outcome.processed += 1,
                Err(e) if e.is_busy() => {
                    outcome.missed += 1;
                    warn!("扫描列表 {} 跳过忙记录 {}", self.id, record.name());
                }
                Err(e) => {
                    log_scan_fault!("扫描列表 {} 处理记录 {} 失败: {}", self.id, record.name(), e);
                }
            }
        }
        drop(members);

        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(outcome.processed, Ordering::Relaxed);
        self.missed.fetch_add(outcome.missed, Ordering::Relaxed);
        self.set_state(ScanListState::Settling);
        debug!(
            "扫描列表 {} 完成: 处理 {} 条, 跳过 {} 条",
            self.id, outcome.processed, outcome.missed
        );
        outcome
    }

    /// 前向链接阶段结束，回到 Idle
    pub(crate) fn settle(&self) {
        self.set_state(ScanListState::Idle);
    }
}

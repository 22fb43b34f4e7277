//! # 扫描调度器 (Scheduler)
//!
//! ## 业务说明
//! 调度器按记录的扫描方式建立扫描列表，并在列表到期时依次处理成员：
//! - `tick(period)`: 处理一个周期列表
//! - `trigger(event)`: 处理一个事件列表
//! - `run_cycle(ids)`: 处理多个到期列表
//!
//! 每个周期之后执行前向链接阶段，消费上下文的前向链接队列。
//! 同一阶段内每条记录至多处理一次，重复请求留到下一阶段，避免链接环无限展开。
//!
//! ## 前向链接策略
//! - `Deferred`: 本周期所有列表处理完后统一执行一次前向链接阶段
//! - `AfterList`: 每个列表处理完后立即执行，继承触发列表的时间片
//!
//! ## Rust知识点
//! - **RwLock<BTreeMap>**: 列表集合按标识有序，运行期只在成员变更时写锁
//! - **mpsc有界通道**: 事件请求来自设备线程，队列满时请求方立即得到错误

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::context::Context;
use crate::log_scan_fault;
use crate::models::{ForwardPolicy, ScanMode};
use crate::record::common::{mutex_guard, read_guard, write_guard};
use crate::scan::scan_list::{ListOutcome, ScanList, ScanListId, ScanListState, ScanStats};
use crate::scan::trigger::ScanTrigger;
use crate::utils::config::ScanConfig;
use crate::utils::error::{IocError, IocResult};

/// 一次前向链接阶段的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardOutcome {
    /// 成功处理的链接目标数
    pub processed: u64,
    /// 目标记录忙而跳过的次数
    pub missed: u64,
    /// 目标不存在而丢弃的次数
    pub dropped: u64,
    /// 本阶段已处理过、留到下一阶段的目标数
    pub deferred: u64,
}

impl ForwardOutcome {
    fn merge(&mut self, other: ForwardOutcome) {
        self.processed += other.processed;
        self.missed += other.missed;
        self.dropped += other.dropped;
        self.deferred += other.deferred;
    }
}

/// 一个扫描周期的报告
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// 实际处理的列表数
    pub lists: usize,
    pub processed: u64,
    pub missed: u64,
    /// 上一周期未结束而跳过的列表数
    pub overruns: u64,
    pub forward: ForwardOutcome,
}

impl CycleReport {
    fn add_list(&mut self, outcome: ListOutcome) {
        self.lists += 1;
        self.processed += outcome.processed;
        self.missed += outcome.missed;
    }
}

/// 调度器全局统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub cycles: u64,
    pub forward_processed: u64,
    pub forward_missed: u64,
    pub forward_dropped: u64,
    pub forward_deferred: u64,
}

pub struct Scheduler {
    context: Arc<Context>,
    lists: RwLock<BTreeMap<ScanListId, Arc<ScanList>>>,
    policy: ForwardPolicy,
    max_forward_per_pass: usize,
    event_tx: mpsc::Sender<String>,
    event_rx: Mutex<Option<mpsc::Receiver<String>>>,
    cycles: AtomicU64,
    forward_processed: AtomicU64,
    forward_missed: AtomicU64,
    forward_dropped: AtomicU64,
    forward_deferred: AtomicU64,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("lists", &self.lists())
            .field("policy", &self.policy)
            .field("max_forward_per_pass", &self.max_forward_per_pass)
            .finish()
    }
}

impl Scheduler {
    /// 按上下文中各记录的扫描方式建立扫描列表
    ///
    /// 列表成员保持记录创建顺序；事件扫描记录的处理器收到对应的 `ScanTrigger`
    pub fn new(context: Arc<Context>, config: &ScanConfig) -> IocResult<Self> {
        if config.max_forward_per_pass == 0 {
            return Err(IocError::invalid_scan_config("max_forward_per_pass 必须大于0"));
        }
        if config.event_queue_capacity == 0 {
            return Err(IocError::invalid_scan_config("event_queue_capacity 必须大于0"));
        }

        let (event_tx, event_rx) = mpsc::channel(config.event_queue_capacity);
        let mut lists: BTreeMap<ScanListId, Arc<ScanList>> = BTreeMap::new();
        for record in context.iter() {
            let scan = record.scan();
            scan.validate()?;
            if let Some(id) = ScanListId::for_mode(&scan) {
                lists
                    .entry(id.clone())
                    .or_insert_with(|| Arc::new(ScanList::new(id)))
                    .members()
                    .push(record.clone());
            }
            if let ScanMode::Event(event) = &scan {
                record.set_scan_trigger(ScanTrigger::new(event, event_tx.clone()));
            }
        }

        info!(
            "扫描调度器初始化: {} 个扫描列表, 前向链接策略 {:?}",
            lists.len(),
            config.forward_policy
        );

        Ok(Self {
            context,
            lists: RwLock::new(lists),
            policy: config.forward_policy,
            max_forward_per_pass: config.max_forward_per_pass,
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            cycles: AtomicU64::new(0),
            forward_processed: AtomicU64::new(0),
            forward_missed: AtomicU64::new(0),
            forward_dropped: AtomicU64::new(0),
            forward_deferred: AtomicU64::new(0),
        })
    }

    /// 使用默认扫描配置
    pub fn with_defaults(context: Arc<Context>) -> IocResult<Self> {
        Self::new(context, &ScanConfig::default())
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    pub fn policy(&self) -> ForwardPolicy {
        self.policy
    }

    /// 全部列表标识（有序）
    pub fn lists(&self) -> Vec<ScanListId> {
        read_guard(&self.lists).keys().cloned().collect()
    }

    /// 全部周期类别
    pub fn periods(&self) -> Vec<Duration> {
        read_guard(&self.lists)
            .keys()
            .filter_map(|id| match id {
                ScanListId::Periodic(period) => Some(*period),
                ScanListId::Event(_) => None,
            })
            .collect()
    }

    fn list(&self, id: &ScanListId) -> Option<Arc<ScanList>> {
        read_guard(&self.lists).get(id).cloned()
    }

    pub fn list_state(&self, id: &ScanListId) -> Option<ScanListState> {
        self.list(id).map(|l| l.state())
    }

    pub fn list_stats(&self, id: &ScanListId) -> Option<ScanStats> {
        self.list(id).map(|l| l.stats())
    }

    /// 列表成员名（处理顺序）
    pub fn members(&self, id: &ScanListId) -> Option<Vec<String>> {
        self.list(id).map(|l| l.member_names())
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            forward_processed: self.forward_processed.load(Ordering::Relaxed),
            forward_missed: self.forward_missed.load(Ordering::Relaxed),
            forward_dropped: self.forward_dropped.load(Ordering::Relaxed),
            forward_deferred: self.forward_deferred.load(Ordering::Relaxed),
        }
    }

    /// 注册一个（可能为空的）周期列表
    pub fn register_periodic(&self, period: Duration) -> IocResult<ScanListId> {
        ScanMode::Periodic(period).validate()?;
        let id = ScanListId::Periodic(period);
        write_guard(&self.lists)
            .entry(id.clone())
            .or_insert_with(|| Arc::new(ScanList::new(id.clone())));
        Ok(id)
    }

    /// 注册一个（可能为空的）事件列表
    pub fn register_event(&self, event: &str) -> IocResult<ScanListId> {
        ScanMode::Event(event.to_string()).validate()?;
        let id = ScanListId::Event(event.to_string());
        write_guard(&self.lists)
            .entry(id.clone())
            .or_insert_with(|| Arc::new(ScanList::new(id.clone())));
        Ok(id)
    }

    /// 事件触发器，可交给任意线程使用
    pub fn scan_trigger(&self, event: &str) -> ScanTrigger {
        ScanTrigger::new(event, self.event_tx.clone())
    }

    /// 修改记录的扫描方式
    ///
    /// 需要先后取得旧、新列表的成员锁，与正在进行的扫描周期互斥，
    /// 因此变更只会发生在两次扫描之间。不要在设备处理器内调用。
    pub fn set_scan(&self, name: &str, mode: ScanMode) -> IocResult<()> {
        let record = self
            .context
            .lookup(name)
            .ok_or_else(|| IocError::record_not_found(name))?;
        mode.validate()?;

        let old = ScanListId::for_mode(&record.scan());
        let new = ScanListId::for_mode(&mode);
        if old == new {
            return Ok(());
        }

        {
            let mut lists = write_guard(&self.lists);
            if let Some(list) = old.as_ref().and_then(|id| lists.get(id)) {
                list.members().retain(|r| r.name() != name);
            }
            if let Some(id) = new {
                let list = lists
                    .entry(id.clone())
                    .or_insert_with(|| Arc::new(ScanList::new(id)));
                let mut members = list.members();
                members.push(record.clone());
                members.sort_by_key(|r| self.context.position(r.name()));
            }
            record.set_scan_mode(mode.clone());
        }

        if let ScanMode::Event(event) = &mode {
            record.set_scan_trigger(self.scan_trigger(event));
        }
        info!("记录 {} 扫描方式改为 {}", name, mode);
        Ok(())
    }

    /// 处理一个周期列表
    pub fn tick(&self, period: Duration) -> IocResult<CycleReport> {
        self.run_cycle(&[ScanListId::Periodic(period)])
    }

    /// 处理一个事件列表
    pub fn trigger(&self, event: &str) -> IocResult<CycleReport> {
        self.run_cycle(&[ScanListId::Event(event.to_string())])
    }

    /// 处理一组到期列表，随后按前向链接策略执行前向链接阶段
    ///
    /// 所有标识先解析，任何一个不存在都返回 `ScanListNotFound` 且不处理任何列表
    pub fn run_cycle(&self, ids: &[ScanListId]) -> IocResult<CycleReport> {
        let due = {
            let lists = read_guard(&self.lists);
            ids.iter()
                .map(|id| {
                    lists
                        .get(id)
                        .cloned()
                        .ok_or_else(|| IocError::scan_list_not_found(id.to_string()))
                })
                .collect::<IocResult<Vec<_>>>()?
        };

        let mut report = CycleReport::default();
        let mut settling = Vec::with_capacity(due.len());
        for list in due {
            if !list.mark_due() {
                report.overruns += 1;
                continue;
            }
            report.add_list(list.run());
            match self.policy {
                ForwardPolicy::AfterList => {
                    report.forward.merge(self.run_forward_pass());
                    list.settle();
                }
                ForwardPolicy::Deferred => settling.push(list),
            }
        }

        if self.policy == ForwardPolicy::Deferred {
            report.forward.merge(self.run_forward_pass());
            for list in settling {
                list.settle();
            }
        }

        self.cycles.fetch_add(1, Ordering::Relaxed);
        debug!("扫描周期完成: {:?}", report);
        Ok(report)
    }

    /// 前向链接阶段
    ///
    /// 反复取空前向链接队列直到没有新请求；同一阶段内每条记录至多处理一次，
    /// 处理总数不超过 `max_forward_per_pass`，其余请求放回队列等待下一阶段
    pub fn run_forward_pass(&self) -> ForwardOutcome {
        let queue = self.context.forward_queue();
        let mut seen: HashSet<String> = HashSet::new();
        let mut deferred: Vec<String> = Vec::new();
        let mut outcome = ForwardOutcome::default();

        loop {
            let batch = queue.take_all();
            if batch.is_empty() {
                break;
            }
            for name in batch {
                if seen.contains(&name) || seen.len() >= self.max_forward_per_pass {
                    if !deferred.contains(&name) {
                        deferred.push(name);
                    }
                    continue;
                }
                let Some(record) = self.context.get(&name) else {
                    warn!("前向链接目标不存在，已丢弃: {}", name);
                    outcome.dropped += 1;
                    continue;
                };
                match record.process() {
                    Ok(()) => outcome.processed += 1,
                    Err(e) if e.is_busy() => {
                        outcome.missed += 1;
                        warn!("前向链接目标 {} 正忙，本次跳过", record.name());
                    }
                    Err(e) => log_scan_fault!("前向链接处理 {} 失败: {}", record.name(), e),
                }
                seen.insert(name);
            }
        }

        outcome.deferred = deferred.len() as u64;
        queue.push_all(&deferred);

        self.forward_processed
            .fetch_add(outcome.processed, Ordering::Relaxed);
        self.forward_missed.fetch_add(outcome.missed, Ordering::Relaxed);
        self.forward_dropped.fetch_add(outcome.dropped, Ordering::Relaxed);
        self.forward_deferred
            .fetch_add(outcome.deferred, Ordering::Relaxed);
        outcome
    }

    /// 处理已排队的全部事件请求，返回请求数
    ///
    /// 事件接收端被扫描运行器占用时返回 0
    pub fn drain_events(&self) -> usize {
        let events: Vec<String> = {
            let mut guard = mutex_guard(&self.event_rx);
            let Some(rx) = guard.as_mut() else {
                return 0;
            };
            let mut events = Vec::new();
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
            events
        };

        for event in &events {
            self.handle_event(event);
        }
        events.len()
    }

    /// 处理一个事件请求，错误只记录日志
    pub(crate) fn handle_event(&self, event: &str) {
        if let Err(e) = self.trigger(event) {
            warn!("事件 {} 处理失败: {}", event, e);
        }
    }

    pub(crate) fn take_event_receiver(&self) -> Option<mpsc::Receiver<String>> {
        mutex_guard(&self.event_rx).take()
    }

    pub(crate) fn restore_event_receiver(&self, rx: mpsc::Receiver<String>) {
        *mutex_guard(&self.event_rx) = Some(rx);
    }
}

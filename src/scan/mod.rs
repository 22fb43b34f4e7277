//! # 扫描模块 (Scan Module)
//!
//! ## 业务说明
//! 负责“何时处理哪些记录”：
//! - `scan_list`: 扫描列表与列表状态机
//! - `scheduler`: 同步调度核心，`tick` / `trigger` / 前向链接阶段
//! - `runner`: tokio 上的周期任务与事件任务
//! - `async_worker`: 异步设备处理的后半段
//! - `forward` / `trigger`: 前向链接队列、事件触发器

pub mod async_worker;
pub mod forward;
pub mod runner;
pub mod scan_list;
pub mod scheduler;
pub mod trigger;

pub use async_worker::AsyncWorker;
pub use forward::ForwardQueue;
pub use runner::ScanRunner;
pub use scan_list::{ListOutcome, ScanList, ScanListId, ScanListState, ScanStats};
pub use scheduler::{CycleReport, ForwardOutcome, Scheduler, SchedulerStats};
pub use trigger::ScanTrigger;

//! # 扫描运行器 (ScanRunner)
//!
//! ## 业务说明
//! 在 tokio 运行时上驱动调度器：
//! - 每个周期类别一个任务，`tokio::time::interval` 定时调用 `Scheduler::tick`，
//!   错过的节拍直接跳过
//! - 一个任务消费 `ScanTrigger` 发来的事件请求
//! - 一个异步完成工作者
//!
//! 记录处理是同步代码，全部放到 `spawn_blocking` 中执行。
//! `shutdown()` 取消所有任务并等待正在进行的扫描周期结束。
//!
//! 周期任务只为启动时已存在的周期列表创建，之后新注册的周期需要重启运行器。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::log_scan_fault;
use crate::scan::async_worker::AsyncWorker;
use crate::scan::scheduler::Scheduler;
use crate::services::traits::BaseService;
use crate::utils::error::{IocError, IocResult};

pub struct ScanRunner {
    scheduler: Arc<Scheduler>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    started: bool,
}

impl ScanRunner {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self {
            scheduler,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
            started: false,
        }
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn is_running(&self) -> bool {
        self.started
    }

    /// 启动全部扫描任务，必须在 tokio 运行时内调用
    pub fn start(&mut self) -> IocResult<()> {
        if self.started {
            return Err(IocError::concurrency_error("扫描运行器已经启动"));
        }
        let rx = self
            .scheduler
            .take_event_receiver()
            .ok_or_else(|| IocError::concurrency_error("事件请求队列已被占用"))?;

        self.cancel = CancellationToken::new();

        let periods = self.scheduler.periods();
        for period in &periods {
            self.tasks.push(tokio::spawn(run_periodic(
                self.scheduler.clone(),
                *period,
                self.cancel.clone(),
            )));
        }

        self.tasks.push(tokio::spawn(run_events(
            self.scheduler.clone(),
            rx,
            self.cancel.clone(),
        )));

        match AsyncWorker::attach(self.scheduler.context().clone()) {
            Ok(worker) => {
                let cancel = self.cancel.clone();
                self.tasks.push(tokio::spawn(async move {
                    worker.run(cancel).await;
                }));
            }
            Err(e) => warn!("🔧 [SCAN_RUNNER] 未启动异步完成工作者: {}", e),
        }

        self.started = true;
        info!(
            "🚀 [SCAN_RUNNER] 扫描运行器已启动: {} 个周期任务 {:?}",
            periods.len(),
            periods
        );
        Ok(())
    }

    /// 停止全部任务并等待进行中的扫描周期结束
    pub async fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.cancel.cancel();
        for result in join_all(self.tasks.drain(..)).await {
            if let Err(e) = result {
                log_scan_fault!("扫描任务异常退出: {}", e);
            }
        }
        self.started = false;
        info!("🛑 [SCAN_RUNNER] 扫描运行器已停止");
    }
}

async fn run_periodic(scheduler: Arc<Scheduler>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!("周期扫描任务启动: {:?}", period);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let sched = scheduler.clone();
                match tokio::task::spawn_blocking(move || sched.tick(period)).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => warn!("周期 {:?} 扫描失败: {}", period, e),
                    Err(e) => log_scan_fault!("周期 {:?} 扫描任务失败: {}", period, e),
                }
            }
        }
    }
    debug!("周期扫描任务退出: {:?}", period);
}

async fn run_events(
    scheduler: Arc<Scheduler>,
    mut rx: mpsc::Receiver<String>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(event) => {
                    let sched = scheduler.clone();
                    if let Err(e) =
                        tokio::task::spawn_blocking(move || sched.handle_event(&event)).await
                    {
                        log_scan_fault!("事件扫描任务失败: {}", e);
                    }
                }
                None => break,
            },
        }
    }
    scheduler.restore_event_receiver(rx);
}

#[async_trait]
impl BaseService for ScanRunner {
    fn service_name(&self) -> &'static str {
        "ScanRunner"
    }

    async fn initialize(&mut self) -> IocResult<()> {
        self.start()
    }

    async fn shutdown(&mut self) -> IocResult<()> {
        self.stop().await;
        self.scheduler.context().services().detach_async_sender();
        Ok(())
    }

    async fn health_check(&self) -> IocResult<()> {
        if !self.started {
            return Err(IocError::concurrency_error("扫描运行器未启动"));
        }
        if self.tasks.iter().any(|t| t.is_finished()) {
            return Err(IocError::concurrency_error("扫描任务意外退出"));
        }
        Ok(())
    }
}

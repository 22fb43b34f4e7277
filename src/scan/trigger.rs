//! 事件扫描触发器
//!
//! 调度器为每个事件扫描记录的处理器分发一个 `ScanTrigger`，
//! 设备支持可以在自己的线程里调用 `request()` 请求处理该事件列表。
//! 请求进入有界队列，由扫描运行器（或 `Scheduler::drain_events`）消费。

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::utils::error::{IocError, IocResult};

#[derive(Debug, Clone)]
pub struct ScanTrigger {
    event: String,
    tx: mpsc::Sender<String>,
}

impl ScanTrigger {
    pub(crate) fn new(event: &str, tx: mpsc::Sender<String>) -> Self {
        Self {
            event: event.to_string(),
            tx,
        }
    }

    /// 触发器对应的事件名
    pub fn event(&self) -> &str {
        &self.event
    }

    /// 请求处理事件列表，不阻塞
    ///
    /// 队列已满或调度器已销毁时返回 `ConcurrencyError`
    pub fn request(&self) -> IocResult<()> {
        self.tx.try_send(self.event.clone()).map_err(|e| match e {
            TrySendError::Full(_) => {
                IocError::concurrency_error(format!("事件扫描队列已满: {}", self.event))
            }
            TrySendError::Closed(_) => {
                IocError::concurrency_error(format!("调度器已停止: {}", self.event))
            }
        })
    }
}

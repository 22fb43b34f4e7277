//! # 异步完成工作者
//!
//! 设备处理器返回 `HandlerStatus::Async` 时，记录保持忙标志并把记录名发送到本工作者，
//! 工作者在阻塞线程池里调用 `complete_async()` 完成处理的后半段
//! （`read_async` / `write_async`、报警评估、提交、前向链接）。
//!
//! 工作者连接期间记录通过通道交付；断开后记录在调用线程内直接完成。

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;

use crate::context::Context;
use crate::log_scan_fault;
use crate::utils::error::{IocError, IocResult};

pub struct AsyncWorker {
    context: Arc<Context>,
    rx: UnboundedReceiver<String>,
}

impl AsyncWorker {
    /// 连接到上下文；已有工作者连接时返回 `ConcurrencyError`
    pub fn attach(context: Arc<Context>) -> IocResult<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        if !context.services().attach_async_sender(tx) {
            return Err(IocError::concurrency_error("异步完成工作者已连接"));
        }
        debug!("异步完成工作者已连接");
        Ok(Self { context, rx })
    }

    /// 运行直到取消，返回完成的记录数
    ///
    /// 退出前先断开通道，再完成已经排队的记录
    pub async fn run(mut self, cancel: CancellationToken) -> usize {
        let mut completed = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = self.rx.recv() => match next {
                    Some(name) => {
                        if self.complete(name).await {
                            completed += 1;
                        }
                    }
                    None => break,
                },
            }
        }

        self.context.services().detach_async_sender();
        completed += self.complete_pending();
        info!("异步完成工作者退出，共完成 {} 次异步处理", completed);
        completed
    }

    async fn complete(&self, name: String) -> bool {
        let Some(record) = self.context.lookup(&name) else {
            warn!("异步完成请求的记录不存在: {}", name);
            return false;
        };
        match tokio::task::spawn_blocking(move || record.complete_async()).await {
            Ok(done) => done,
            Err(e) => {
                log_scan_fault!("记录 {} 异步完成任务失败: {}", name, e);
                false
            }
        }
    }

    /// 在当前线程完成所有已排队的记录
    pub fn complete_pending(&mut self) -> usize {
        let mut completed = 0;
        while let Ok(name) = self.rx.try_recv() {
            match self.context.get(&name) {
                Some(record) if record.complete_async() => completed += 1,
                Some(_) => {}
                None => warn!("异步完成请求的记录不存在: {}", name),
            }
        }
        completed
    }

    /// 断开通道，之后的异步处理在调用线程内完成
    pub fn detach(mut self) -> usize {
        self.context.services().detach_async_sender();
        self.complete_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextBuilder;
    use crate::models::Value;
    use crate::record::{AnyRecord, HandlerStatus, LonginHandler, ReadHandler, RecordConfig};

    struct Counter;

    impl ReadHandler<i32> for Counter {
        fn read(&mut self, _name: &str, _value: &mut i32) -> crate::record::HandlerResult {
            Ok(HandlerStatus::Async)
        }

        fn read_async(
            &mut self,
            _name: &str,
            value: &mut i32,
        ) -> Result<(), crate::record::HandlerError> {
            *value += 1;
            Ok(())
        }
    }

    fn context() -> (Arc<Context>, AnyRecord) {
        let mut builder = ContextBuilder::new();
        builder.create("CNT", RecordConfig::longin()).unwrap();
        let handler: Box<dyn LonginHandler> = Box::new(Counter);
        builder.set_handler("CNT", handler.into()).unwrap();
        let ctx = Arc::new(builder.build());
        let record = ctx.lookup("CNT").unwrap();
        (ctx, record)
    }

    /// 测试连接工作者后异步处理保持忙状态直到工作者完成
    #[test]
    fn test_record_stays_busy_until_worker_completes() {
        let (ctx, record) = context();
        let mut worker = AsyncWorker::attach(ctx.clone()).unwrap();
        assert!(AsyncWorker::attach(ctx.clone()).is_err());

        record.process().unwrap();
        assert!(record.is_busy());
        assert_eq!(record.process().unwrap_err().error_code(), "ALREADY_PROCESSING");

        assert_eq!(worker.complete_pending(), 1);
        assert!(!record.is_busy());
        assert_eq!(record.read().value, Value::Long(1));

        assert_eq!(worker.detach(), 0);
        record.process().unwrap();
        assert!(!record.is_busy());
        assert_eq!(record.read().value, Value::Long(2));
    }

    /// 测试取消后工作者完成排队记录并断开
    #[tokio::test]
    async fn test_run_drains_on_cancel() {
        let (ctx, record) = context();
        let worker = AsyncWorker::attach(ctx.clone()).unwrap();
        record.process().unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let completed = worker.run(cancel).await;
        assert_eq!(completed, 1);
        assert!(!record.is_busy());
        assert!(AsyncWorker::attach(ctx).is_ok());
    }
}

//! # 设备处理器 (device support) 接口
//!
//! ## 业务说明
//! 每种记录类型可以挂接一个设备处理器，负责真正的硬件读写：
//! - 输入记录调用 `read`，处理器把读到的值写入工作副本
//! - 输出记录调用 `write`，处理器把工作副本中的值送往设备
//!
//! 处理器返回 `HandlerStatus::Async` 表示操作尚未完成，
//! 记录会保持忙状态直到异步工作线程调用 `read_async` / `write_async`。
//!
//! ## Rust知识点
//! - **泛型trait + 子trait**: `AiHandler` 等是 `ReadHandler<f64>` 的别名式子trait，
//!   通过blanket impl自动实现，`Box<dyn AiHandler>` 即可存放任意实现
//! - **默认方法**: `set_scan` / `read_async` 默认空实现，简单处理器无需关心

use thiserror::Error;

use crate::models::{AlarmStatus, BoundedString, RecordType};
use crate::scan::ScanTrigger;

/// 处理器调用结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerStatus {
    /// 同步完成
    Done,
    /// 已发起异步操作，稍后由异步工作线程完成
    Async,
}

/// 设备层故障
///
/// 不会从 `process()` 向外传播，而是折算为记录的报警状态（严重度 Invalid）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandlerError {
    #[error("设备读写失败: {0}")]
    Io(String),

    #[error("设备响应超时: {0}")]
    Timeout(String),

    #[error("设备通讯失败: {0}")]
    Comm(String),

    #[error("设备处理器错误: {0}")]
    Other(String),
}

impl HandlerError {
    /// 折算为报警状态
    pub fn alarm_status(&self, rtype: RecordType) -> AlarmStatus {
        match self {
            HandlerError::Io(_) if rtype.is_input() => AlarmStatus::ReadError,
            HandlerError::Io(_) => AlarmStatus::WriteError,
            HandlerError::Timeout(_) => AlarmStatus::Timeout,
            HandlerError::Comm(_) => AlarmStatus::Comm,
            HandlerError::Other(_) => AlarmStatus::ScanError,
        }
    }
}

pub type HandlerResult = Result<HandlerStatus, HandlerError>;

/// 输入记录处理器
pub trait ReadHandler<T>: Send {
    /// 事件扫描记录在调度器构建时收到自己的触发器
    fn set_scan(&mut self, _trigger: ScanTrigger) {}

    /// 读取设备值到 `value`
    fn read(&mut self, name: &str, value: &mut T) -> HandlerResult;

    /// 异步读取的完成阶段
    fn read_async(&mut self, _name: &str, _value: &mut T) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// 输出记录处理器
pub trait WriteHandler<T>: Send {
    fn set_scan(&mut self, _trigger: ScanTrigger) {}

    /// 把 `value` 写入设备
    fn write(&mut self, name: &str, value: &mut T) -> HandlerResult;

    fn write_async(&mut self, _name: &str, _value: &mut T) -> Result<(), HandlerError> {
        Ok(())
    }
}

macro_rules! handler_alias {
    ($($(#[$doc:meta])* $alias:ident: $base:ident<$ty:ty>;)*) => {
        $(
            $(#[$doc])*
            pub trait $alias: $base<$ty> {}
            impl<H: $base<$ty> + ?Sized> $alias for H {}
        )*
    };
}

handler_alias! {
    /// 模拟量输入处理器
    AiHandler: ReadHandler<f64>;
    /// 模拟量输出处理器
    AoHandler: WriteHandler<f64>;
    /// 开关量输入处理器
    BiHandler: ReadHandler<bool>;
    /// 开关量输出处理器
    BoHandler: WriteHandler<bool>;
    /// 整型输入处理器
    LonginHandler: ReadHandler<i32>;
    /// 整型输出处理器
    LongoutHandler: WriteHandler<i32>;
    /// 字符串输入处理器
    StringinHandler: ReadHandler<BoundedString>;
    /// 字符串输出处理器
    StringoutHandler: WriteHandler<BoundedString>;
}

/// 由闭包构造的输入处理器
pub struct FnReadHandler<F>(F);

/// 由闭包构造的输出处理器
pub struct FnWriteHandler<F>(F);

/// 用闭包创建输入处理器
///
/// ```rust
/// use ioc_lib::record::{read_fn, AiHandler, HandlerStatus};
///
/// let handler: Box<dyn AiHandler> = Box::new(read_fn(|_name: &str, value: &mut f64| {
///     *value = 42.0;
///     Ok(HandlerStatus::Done)
/// }));
/// # drop(handler);
/// ```
pub fn read_fn<T, F>(f: F) -> FnReadHandler<F>
where
    F: FnMut(&str, &mut T) -> HandlerResult + Send,
{
    FnReadHandler(f)
}

/// 用闭包创建输出处理器
pub fn write_fn<T, F>(f: F) -> FnWriteHandler<F>
where
    F: FnMut(&str, &mut T) -> HandlerResult + Send,
{
    FnWriteHandler(f)
}

impl<T, F> ReadHandler<T> for FnReadHandler<F>
where
    F: FnMut(&str, &mut T) -> HandlerResult + Send,
{
    fn read(&mut self, name: &str, value: &mut T) -> HandlerResult {
        (self.0)(name, value)
    }
}

impl<T, F> WriteHandler<T> for FnWriteHandler<F>
where
    F: FnMut(&str, &mut T) -> HandlerResult + Send,
{
    fn write(&mut self, name: &str, value: &mut T) -> HandlerResult {
        (self.0)(name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试故障到报警状态的映射
    #[test]
    fn test_error_to_alarm_status() {
        let io = HandlerError::Io("bus".into());
        assert_eq!(io.alarm_status(RecordType::Ai), AlarmStatus::ReadError);
        assert_eq!(io.alarm_status(RecordType::Bo), AlarmStatus::WriteError);
        assert_eq!(
            HandlerError::Timeout("t".into()).alarm_status(RecordType::Ai),
            AlarmStatus::Timeout
        );
        assert_eq!(HandlerError::Comm("c".into()).alarm_status(RecordType::Ao), AlarmStatus::Comm);
        assert_eq!(
            HandlerError::Other("x".into()).alarm_status(RecordType::Stringin),
            AlarmStatus::ScanError
        );
    }

    /// 测试闭包处理器可以装箱为对应的处理器trait对象
    #[test]
    fn test_fn_handlers_box_into_trait_objects() {
        let mut ai: Box<dyn AiHandler> = Box::new(read_fn(|_: &str, v: &mut f64| {
            *v += 1.0;
            Ok(HandlerStatus::Done)
        }));
        let mut value = 1.0;
        assert_eq!(ai.read("AI", &mut value), Ok(HandlerStatus::Done));
        assert_eq!(value, 2.0);

        let mut bo: Box<dyn BoHandler> =
            Box::new(write_fn(|_: &str, _: &mut bool| Err(HandlerError::Io("relay".into()))));
        let mut state = true;
        assert!(bo.write("BO", &mut state).is_err());
    }
}

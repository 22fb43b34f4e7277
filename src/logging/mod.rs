//! # 日志记录模块 (Logging Module)
//!
//! ## 业务说明
//! IOC核心运行过程中的信息记录：记录处理、扫描调度、命令调用以及配置问题。
//! 所有模块都通过 `log` 门面输出，具体后端由 `init_logger` 安装的 env_logger 提供。
//!
//! ## 日志策略
//! - **debug**: 每条记录的处理结果
//! - **info**: 生命周期事件（上下文冻结、扫描器启动/停止）
//! - **warn**: 错过的扫描、被丢弃的前向链接
//! - **error**: 设备处理器故障、命令失败
//!
//! ## Rust知识点
//! - **日志宏**: 使用log crate的宏系统
//! - **macro_export**: 分类宏导出到crate根，任何模块可直接调用
//! - **环境配置**: 通过env_logger进行环境变量配置（RUST_LOG 优先）

pub mod logger_config;

pub use logger_config::*;

/// 记录扫描/处理故障日志
#[macro_export]
macro_rules! log_scan_fault {
    ($msg:expr) => {
        log::error!("[扫描故障] {}", $msg)
    };
    ($msg:expr, $($arg:tt)*) => {
        log::error!("[扫描故障] {}", format!($msg, $($arg)*))
    };
}

/// 记录命令调用失败日志
#[macro_export]
macro_rules! log_command_failure {
    ($msg:expr) => {
        log::error!("[命令失败] {}", $msg)
    };
    ($msg:expr, $($arg:tt)*) => {
        log::error!("[命令失败] {}", format!($msg, $($arg)*))
    };
}

/// 记录配置警告
#[macro_export]
macro_rules! log_config_warning {
    ($msg:expr) => {
        log::warn!("[配置警告] {}", $msg)
    };
    ($msg:expr, $($arg:tt)*) => {
        log::warn!("[配置警告] {}", format!($msg, $($arg)*))
    };
}

// 重新导出宏
pub use log_command_failure;
pub use log_config_warning;
pub use log_scan_fault;

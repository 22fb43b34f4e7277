//! 日志配置模块
//!
//! 把 `LoggingConfig` 翻译为 env_logger 的过滤级别与输出格式

use chrono::Local;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::str::FromStr;

use crate::utils::config::LoggingConfig;
use crate::utils::error::{IocError, IocResult};

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = IocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(IocError::configuration_error(format!("无效的日志级别: {}", other))),
        }
    }
}

/// 初始化日志系统
///
/// 环境变量 `RUST_LOG` 存在时优先生效；否则使用配置中的级别。
/// 关闭控制台输出时只保留 error 级别。
/// 使用 `try_init`，重复调用（例如多个测试）不会报错。
pub fn init_logger(config: &LoggingConfig) -> IocResult<()> {
    let level: LogLevel = config.log_level.parse()?;
    let filter = if config.console_output {
        LevelFilter::from(level)
    } else {
        LevelFilter::Error
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(filter);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }

    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}] [{}] [{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    if builder.try_init().is_ok() {
        log::info!("日志系统初始化完成 - 级别: {:?}", level);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试日志级别解析
    #[test]
    fn test_log_level_parse() {
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LevelFilter::from(LogLevel::Trace), LevelFilter::Trace);
    }

    /// 测试重复初始化不报错
    #[test]
    fn test_init_logger_twice() {
        let config = LoggingConfig::default();
        assert!(init_logger(&config).is_ok());
        assert!(init_logger(&config).is_ok());
    }
}

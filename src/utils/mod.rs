/// 工具模块，包含错误处理、配置管理等通用功能

/// 统一错误处理模块
pub mod error;

/// 配置管理模块
pub mod config;

// 重新导出常用类型，方便使用
pub use error::{IocError, IocResult};
pub use config::{
    AppSettings, CommandConfig, ConfigManager, IocConfig, LoggingConfig, ScanConfig,
    get_global_config, init_global_config,
};

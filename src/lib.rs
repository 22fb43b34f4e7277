//! IOC 核心库：进程内过程变量数据库
//!
//! - `record`: 八种记录类型与多态门面
//! - `context`: 记录注册表（初始化 → 冻结）
//! - `scan`: 周期/事件扫描调度与前向链接
//! - `command`: 强类型命令注册与调用
//! - `devsup`: 设备支持接入点
//!
//! ```
//! use ioc_lib::context::ContextBuilder;
//! use ioc_lib::record::RecordConfig;
//! use ioc_lib::models::Value;
//!
//! let mut builder = ContextBuilder::new();
//! builder.create("AO:1", RecordConfig::ao().drive_limits(0.0, 10.0)).unwrap();
//! let ctx = builder.build();
//!
//! let ao = ctx.lookup("AO:1").unwrap();
//! ao.as_write().unwrap().write(&Value::Double(12.0)).unwrap();
//! assert_eq!(ao.read().value, Value::Double(10.0));
//! ```

pub mod command;
pub mod context;
pub mod devsup;
pub mod error;
pub mod logging;
pub mod models;
pub mod record;
pub mod scan;
pub mod services;
pub mod utils;

// 重新导出常用类型，方便使用
pub use command::{ArgBuf, ArgBufWriter, ArgType, CommandRegistry, FuncDef};
pub use context::{Context, ContextBuilder, RecordHandle};
pub use models::{AlarmSeverity, AlarmState, AlarmStatus, RecordType, ScanMode, Value};
pub use record::{AnyHandlerBox, AnyReadRecord, AnyRecord, AnyWriteRecord, RecordConfig};
pub use scan::{ScanRunner, Scheduler};
pub use utils::{IocConfig, IocError, IocResult};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// IOC核心统一错误类型
///
/// 用于封装记录注册、扫描调度、命令调用过程中可能出现的各种错误。
/// 设备层故障（HandlerError）不会出现在这里，它们在处理周期内被折算为报警状态。
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IocError {
    /// 记录名重复
    #[error("记录名重复: {name}")]
    DuplicateName { name: String },

    /// 记录名非法（空名或包含空白字符）
    #[error("记录名非法: '{name}'")]
    InvalidRecordName { name: String },

    /// 命令名重复
    #[error("命令名重复: {name}")]
    DuplicateCommand { name: String },

    /// 记录不可写（输入类记录）
    #[error("记录不可写: {name} ({rtype})")]
    NotWritable { name: String, rtype: String },

    /// 记录正在处理中
    ///
    /// **业务含义**: 记录的互斥标志已被其他线程持有，本次请求立即失败而不等待。
    /// 扫描器把它计为一次错过的扫描，下个周期自然重试。
    #[error("记录正在处理中: {name}")]
    AlreadyProcessing { name: String },

    /// 扫描配置非法（周期为零等）
    #[error("扫描配置非法: {message}")]
    InvalidScanConfig { message: String },

    /// 扫描列表不存在
    #[error("扫描列表不存在: {list}")]
    ScanListNotFound { list: String },

    /// 参数个数不匹配
    #[error("参数个数不匹配: 命令 {command} 需要 {expected} 个参数, 实际 {found} 个")]
    ArgCountMismatch {
        command: String,
        expected: usize,
        found: usize,
    },

    /// 参数类型不匹配
    #[error("参数类型不匹配: 命令 {command} 第 {position} 个参数需要 {expected}, 实际 {found}")]
    ArgTypeMismatch {
        command: String,
        position: usize,
        expected: String,
        found: String,
    },

    /// 参数缓冲区解码失败
    #[error("参数缓冲区解码失败: {message}")]
    ArgDecode { message: String },

    /// 命令不存在
    #[error("命令不存在: {name}")]
    UnknownCommand { name: String },

    /// 记录不存在
    #[error("记录不存在: {name}")]
    RecordNotFound { name: String },

    /// 设备处理器与记录类型不匹配
    #[error("设备处理器类型不匹配: 记录 {expected}, 处理器 {found}")]
    HandlerMismatch { expected: String, found: String },

    /// 设备处理器已设置
    #[error("设备处理器已设置: {name}")]
    HandlerAlreadySet { name: String },

    /// 值类型无法转换为记录类型
    #[error("值类型不匹配: {rtype} 无法接受 {value}")]
    ValueTypeMismatch { rtype: String, value: String },

    /// 命令执行失败
    #[error("命令执行失败: {command} - {message}")]
    CommandFailed { command: String, message: String },

    /// 配置相关错误
    #[error("配置错误: {message}")]
    ConfigurationError { message: String },

    /// 输入/输出错误
    #[error("IO错误: {message} (Kind: {kind})")]
    IoError { message: String, kind: String },

    /// JSON序列化/反序列化错误
    #[error("JSON序列化/反序列化错误: {message}")]
    JsonError { message: String },

    /// 并发/异步操作错误
    #[error("并发错误: {message}")]
    ConcurrencyError { message: String },
}

impl IocError {
    /// 创建记录名重复错误
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    /// 创建记录名非法错误
    pub fn invalid_record_name(name: impl Into<String>) -> Self {
        Self::InvalidRecordName { name: name.into() }
    }

    /// 创建命令名重复错误
    pub fn duplicate_command(name: impl Into<String>) -> Self {
        Self::DuplicateCommand { name: name.into() }
    }

    /// 创建记录不可写错误
    pub fn not_writable(name: impl Into<String>, rtype: impl Into<String>) -> Self {
        Self::NotWritable {
            name: name.into(),
            rtype: rtype.into(),
        }
    }

    /// 创建记录忙错误
    pub fn already_processing(name: impl Into<String>) -> Self {
        Self::AlreadyProcessing { name: name.into() }
    }

    /// 创建扫描配置错误
    pub fn invalid_scan_config(message: impl Into<String>) -> Self {
        Self::InvalidScanConfig {
            message: message.into(),
        }
    }

    /// 创建扫描列表不存在错误
    pub fn scan_list_not_found(list: impl Into<String>) -> Self {
        Self::ScanListNotFound { list: list.into() }
    }

    /// 创建参数个数不匹配错误
    pub fn arg_count_mismatch(command: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::ArgCountMismatch {
            command: command.into(),
            expected,
            found,
        }
    }

    /// 创建参数类型不匹配错误
    ///
    /// **参数**: `position` 从 0 开始计数，与 FuncDef 中 ArgDef 的顺序一致
    pub fn arg_type_mismatch(
        command: impl Into<String>,
        position: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::ArgTypeMismatch {
            command: command.into(),
            position,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// 创建参数解码错误
    pub fn arg_decode(message: impl Into<String>) -> Self {
        Self::ArgDecode {
            message: message.into(),
        }
    }

    /// 创建命令不存在错误
    pub fn unknown_command(name: impl Into<String>) -> Self {
        Self::UnknownCommand { name: name.into() }
    }

    /// 创建记录不存在错误
    pub fn record_not_found(name: impl Into<String>) -> Self {
        Self::RecordNotFound { name: name.into() }
    }

    /// 创建处理器类型不匹配错误
    pub fn handler_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::HandlerMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// 创建处理器已设置错误
    pub fn handler_already_set(name: impl Into<String>) -> Self {
        Self::HandlerAlreadySet { name: name.into() }
    }

    /// 创建值类型不匹配错误
    pub fn value_type_mismatch(rtype: impl Into<String>, value: impl Into<String>) -> Self {
        Self::ValueTypeMismatch {
            rtype: rtype.into(),
            value: value.into(),
        }
    }

    /// 创建命令执行失败错误
    pub fn command_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    /// 创建配置错误
    pub fn configuration_error(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// 创建IO错误
    pub fn io_error(message: impl Into<String>, kind_str: impl Into<String>) -> Self {
        Self::IoError {
            message: message.into(),
            kind: kind_str.into(),
        }
    }

    /// 创建JSON错误
    pub fn json_error(message: impl Into<String>) -> Self {
        Self::JsonError {
            message: message.into(),
        }
    }

    /// 创建并发错误
    pub fn concurrency_error(message: impl Into<String>) -> Self {
        Self::ConcurrencyError {
            message: message.into(),
        }
    }

    /// 是否为“记录忙”错误（非致命，下个周期重试）
    pub fn is_busy(&self) -> bool {
        matches!(self, IocError::AlreadyProcessing { .. })
    }

    /// 获取错误的简短描述
    pub fn error_code(&self) -> &'static str {
        match self {
            IocError::DuplicateName { .. } => "DUPLICATE_NAME",
            IocError::InvalidRecordName { .. } => "INVALID_RECORD_NAME",
            IocError::DuplicateCommand { .. } => "DUPLICATE_COMMAND",
            IocError::NotWritable { .. } => "NOT_WRITABLE",
            IocError::AlreadyProcessing { .. } => "ALREADY_PROCESSING",
            IocError::InvalidScanConfig { .. } => "INVALID_SCAN_CONFIG",
            IocError::ScanListNotFound { .. } => "SCAN_LIST_NOT_FOUND",
            IocError::ArgCountMismatch { .. } => "ARG_COUNT_MISMATCH",
            IocError::ArgTypeMismatch { .. } => "ARG_TYPE_MISMATCH",
            IocError::ArgDecode { .. } => "ARG_DECODE_ERROR",
            IocError::UnknownCommand { .. } => "UNKNOWN_COMMAND",
            IocError::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            IocError::HandlerMismatch { .. } => "HANDLER_MISMATCH",
            IocError::HandlerAlreadySet { .. } => "HANDLER_ALREADY_SET",
            IocError::ValueTypeMismatch { .. } => "VALUE_TYPE_MISMATCH",
            IocError::CommandFailed { .. } => "COMMAND_FAILED",
            IocError::ConfigurationError { .. } => "CONFIGURATION_ERROR",
            IocError::IoError { .. } => "IO_ERROR",
            IocError::JsonError { .. } => "JSON_ERROR",
            IocError::ConcurrencyError { .. } => "CONCURRENCY_ERROR",
        }
    }
}

/// 标准 I/O 错误到 IocError 的转换
impl From<std::io::Error> for IocError {
    fn from(err: std::io::Error) -> Self {
        IocError::IoError {
            message: err.to_string(),
            kind: format!("{:?}", err.kind()),
        }
    }
}

/// serde_json 错误到 IocError 的转换
impl From<serde_json::Error> for IocError {
    fn from(err: serde_json::Error) -> Self {
        IocError::JsonError {
            message: err.to_string(),
        }
    }
}

/// config 库错误到 IocError 的转换
impl From<config::ConfigError> for IocError {
    fn from(err: config::ConfigError) -> Self {
        IocError::ConfigurationError {
            message: err.to_string(),
        }
    }
}

/// IOC结果类型别名
pub type IocResult<T> = Result<T, IocError>;

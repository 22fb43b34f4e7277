use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use once_cell::sync::OnceCell;

use crate::models::enums::ForwardPolicy;
use crate::utils::error::{IocError, IocResult};

/// 环境变量前缀，例如 `IOC_SCAN_CONFIG__MAX_FORWARD_PER_PASS=64`
pub const ENV_PREFIX: &str = "IOC";

/// IOC运行时主配置结构
///
/// 只调节核心自身的运行策略（前向链接优先级、事件队列容量等），
/// 记录定义本身不在配置文件中。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IocConfig {
    /// 应用程序基本设置
    pub app_settings: AppSettings,
    /// 扫描调度配置
    pub scan_config: ScanConfig,
    /// 命令子系统配置
    pub command_config: CommandConfig,
    /// 日志配置
    pub logging_config: LoggingConfig,
}

/// 应用程序基本设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// IOC名称
    pub ioc_name: String,
    /// 运行环境 (development, testing, production)
    pub environment: String,
}

/// 扫描调度配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 前向链接处理策略
    pub forward_policy: ForwardPolicy,
    /// 单次前向链接处理最多处理的记录数
    pub max_forward_per_pass: usize,
    /// 事件扫描请求队列容量
    pub event_queue_capacity: usize,
}

/// 命令子系统配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// 是否注册内置命令 (dbgf / dbpf / dbproc)
    pub enable_builtin_commands: bool,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 是否启用控制台输出
    pub console_output: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            ioc_name: "ioc".to_string(),
            environment: "development".to_string(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            forward_policy: ForwardPolicy::Deferred,
            max_forward_per_pass: 1024,
            event_queue_capacity: 256,
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            enable_builtin_commands: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            console_output: true,
        }
    }
}

/// 配置管理器
/// 负责加载、校验和保存IOC运行时配置
pub struct ConfigManager {
    config: IocConfig,
    config_file_path: Option<PathBuf>,
}

impl ConfigManager {
    /// 创建新的配置管理器（默认配置）
    pub fn new(config_file_path: Option<PathBuf>) -> Self {
        Self {
            config: IocConfig::default(),
            config_file_path,
        }
    }

    /// 分层加载配置
    ///
    /// 顺序：内置默认值 → 配置文件（可缺省）→ `IOC_` 前缀环境变量。
    /// 后加载的来源覆盖先加载的来源。
    pub fn load(&mut self) -> IocResult<()> {
        let mut builder = config::Config::builder();

        if let Some(path) = &self.config_file_path {
            builder = builder.add_source(config::File::from(path.as_path()).required(false));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        self.config = settings.try_deserialize::<IocConfig>()?;
        Ok(())
    }

    /// 只从指定文件加载（不读取环境变量）
    pub fn load_file_only(&mut self, path: &Path) -> IocResult<()> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;
        self.config = settings.try_deserialize::<IocConfig>()?;
        self.config_file_path = Some(path.to_path_buf());
        Ok(())
    }

    /// 将配置保存为JSON文件
    pub async fn save_to_file(&self) -> IocResult<()> {
        let path = self
            .config_file_path
            .as_ref()
            .ok_or_else(|| IocError::configuration_error("未指定配置文件路径"))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                IocError::io_error(format!("创建配置目录失败: {}", e), e.kind().to_string())
            })?;
        }

        let content = serde_json::to_string_pretty(&self.config)
            .map_err(|e| IocError::json_error(format!("序列化配置失败: {}", e)))?;

        tokio::fs::write(path, content).await.map_err(|e| {
            IocError::io_error(format!("写入配置文件失败: {}", e), e.kind().to_string())
        })?;

        Ok(())
    }

    /// 获取配置的只读引用
    pub fn get_config(&self) -> &IocConfig {
        &self.config
    }

    /// 获取配置的可变引用
    pub fn get_config_mut(&mut self) -> &mut IocConfig {
        &mut self.config
    }

    /// 验证配置的有效性
    pub fn validate_config(&self) -> IocResult<()> {
        let valid_environments = ["development", "testing", "production"];
        if !valid_environments.contains(&self.config.app_settings.environment.as_str()) {
            return Err(IocError::configuration_error(format!(
                "无效的环境配置: {}，有效值: {:?}",
                self.config.app_settings.environment, valid_environments
            )));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging_config.log_level.as_str()) {
            return Err(IocError::configuration_error(format!(
                "无效的日志级别: {}，有效值: {:?}",
                self.config.logging_config.log_level, valid_log_levels
            )));
        }

        if self.config.scan_config.max_forward_per_pass == 0 {
            return Err(IocError::configuration_error("max_forward_per_pass 不能为0"));
        }

        if self.config.scan_config.event_queue_capacity == 0 {
            return Err(IocError::configuration_error("event_queue_capacity 不能为0"));
        }

        Ok(())
    }

    /// 重置为默认配置
    pub fn reset_to_default(&mut self) {
        self.config = IocConfig::default();
    }
}

static GLOBAL_CONFIG: OnceCell<Mutex<ConfigManager>> = OnceCell::new();

/// 初始化全局配置管理器
pub fn init_global_config(config_path: Option<PathBuf>) -> IocResult<IocConfig> {
    let mut config_manager = ConfigManager::new(config_path);

    config_manager.load()?;
    config_manager.validate_config()?;
    let snapshot = config_manager.get_config().clone();

    GLOBAL_CONFIG
        .set(Mutex::new(config_manager))
        .map_err(|_| IocError::configuration_error("全局配置已经初始化"))?;

    Ok(snapshot)
}

/// 获取全局配置的只读访问
pub fn get_global_config() -> IocResult<IocConfig> {
    let config_manager = GLOBAL_CONFIG
        .get()
        .ok_or_else(|| IocError::configuration_error("全局配置未初始化"))?
        .lock()
        .map_err(|_| IocError::concurrency_error("获取全局配置锁失败"))?;

    Ok(config_manager.get_config().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// 测试默认配置通过校验
    #[test]
    fn test_default_config_is_valid() {
        let manager = ConfigManager::new(None);
        assert!(manager.validate_config().is_ok());
        assert_eq!(manager.get_config().scan_config.forward_policy, ForwardPolicy::Deferred);
    }

    /// 测试从JSON文件加载部分配置，缺省字段使用默认值
    #[test]
    fn test_load_partial_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{ "scan_config": {{ "forward_policy": "after_list", "max_forward_per_pass": 8 }} }}"#
        )
        .unwrap();

        let mut manager = ConfigManager::new(None);
        manager.load_file_only(file.path()).unwrap();

        let config = manager.get_config();
        assert_eq!(config.scan_config.forward_policy, ForwardPolicy::AfterList);
        assert_eq!(config.scan_config.max_forward_per_pass, 8);
        assert_eq!(config.scan_config.event_queue_capacity, 256);
        assert!(config.command_config.enable_builtin_commands);
    }

    /// 测试非法日志级别被拒绝
    #[test]
    fn test_invalid_log_level_rejected() {
        let mut manager = ConfigManager::new(None);
        manager.get_config_mut().logging_config.log_level = "verbose".to_string();
        let err = manager.validate_config().unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    /// 测试保存后再加载得到相同配置
    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("ioc.json");

        let mut manager = ConfigManager::new(Some(path.clone()));
        manager.get_config_mut().app_settings.ioc_name = "bench".to_string();
        manager.save_to_file().await.unwrap();

        let mut reloaded = ConfigManager::new(None);
        reloaded.load_file_only(&path).unwrap();
        assert_eq!(reloaded.get_config(), manager.get_config());
    }
}

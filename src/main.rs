// IOC 演示程序入口
//
// 用法: ioc [配置文件路径]
// 配置也可以用 IOC_ 前缀的环境变量覆盖，例如 IOC_LOGGING_CONFIG__LOG_LEVEL=debug

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use log::info;

use ioc_lib::command::{register_builtin_commands, CommandRegistry};
use ioc_lib::context::ContextBuilder;
use ioc_lib::devsup::{install_device_support, DeviceSupport, SimDeviceSupport};
use ioc_lib::logging::init_logger;
use ioc_lib::scan::{ScanRunner, Scheduler};
use ioc_lib::services::BaseService;
use ioc_lib::utils::init_global_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = init_global_config(config_path).context("加载配置失败")?;
    init_logger(&config.logging_config).context("初始化日志失败")?;
    info!(
        "🚀 [IOC] 启动 {} ({})",
        config.app_settings.ioc_name, config.app_settings.environment
    );

    let registry = CommandRegistry::new();
    if config.command_config.enable_builtin_commands {
        register_builtin_commands(&registry)?;
    }

    let sim = SimDeviceSupport::new("SIM:").with_demo_records();
    let mut builder = ContextBuilder::new();
    install_device_support(&mut builder, &registry, &sim)?;
    let ctx = Arc::new(builder.build());

    let scheduler = Arc::new(Scheduler::new(ctx.clone(), &config.scan_config)?);
    let mut runner = ScanRunner::new(scheduler);
    runner.initialize().await?;
    info!(
        "✅ [IOC] 运行中: {} 条记录, {} 个命令，按 Ctrl+C 退出",
        ctx.len(),
        registry.len()
    );

    tokio::signal::ctrl_c().await.context("等待退出信号失败")?;

    runner.shutdown().await?;
    sim.quit(&ctx);
    info!("🛑 [IOC] 已退出");
    Ok(())
}

//! # 设备支持 (Device Support)
//!
//! ## 业务说明
//! 设备支持把具体硬件接入记录数据库。初始化阶段：
//! 1. `init`: 可以创建记录、注册命令
//! 2. `record_init`: 对每条尚无处理器的记录调用一次，返回要挂接的处理器
//!
//! 运行结束时 `quit` 收到冻结后的上下文。
//!
//! ## Rust知识点
//! - **trait对象**: `&dyn DeviceSupport`，多个设备支持可以依次安装
//! - **默认方法**: 只关心处理器的设备支持无需实现 `init` / `quit`

pub mod sim;

use log::info;

use crate::command::CommandRegistry;
use crate::context::{Context, ContextBuilder, RecordHandle};
use crate::record::AnyHandlerBox;
use crate::utils::error::IocResult;

pub use sim::SimDeviceSupport;

pub trait DeviceSupport: Send + Sync {
    /// 设备支持名称
    fn name(&self) -> &str;

    /// 初始化：创建记录、注册命令
    fn init(&self, _builder: &mut ContextBuilder, _registry: &CommandRegistry) -> IocResult<()> {
        Ok(())
    }

    /// 为记录提供处理器，不处理的记录返回 None
    fn record_init(&self, handle: &RecordHandle) -> Option<AnyHandlerBox>;

    /// 运行结束
    fn quit(&self, _ctx: &Context) {}
}

/// 安装设备支持，返回挂接的处理器数量
///
/// 已经挂接处理器的记录会被跳过，因此多个设备支持可以按优先级依次安装
pub fn install_device_support(
    builder: &mut ContextBuilder,
    registry: &CommandRegistry,
    support: &dyn DeviceSupport,
) -> IocResult<usize> {
    support.init(builder, registry)?;

    let mut attached = 0;
    for handle in builder.handles() {
        if builder.has_handler(&handle.name) {
            continue;
        }
        if let Some(handler) = support.record_init(&handle) {
            builder.set_handler(&handle.name, handler)?;
            attached += 1;
        }
    }

    info!(
        "🔧 [DEVSUP] 设备支持 {} 安装完成，挂接 {} 个处理器",
        support.name(),
        attached
    );
    Ok(attached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordType;
    use crate::record::{read_fn, AiHandler, HandlerStatus, RecordConfig};

    struct Fixed;

    impl DeviceSupport for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn init(&self, builder: &mut ContextBuilder, _registry: &CommandRegistry) -> IocResult<()> {
            builder.create("FIX:AI", RecordConfig::ai())?;
            Ok(())
        }

        fn record_init(&self, handle: &RecordHandle) -> Option<AnyHandlerBox> {
            if handle.rtype != RecordType::Ai {
                return None;
            }
            let handler: Box<dyn AiHandler> = Box::new(read_fn(|_: &str, v: &mut f64| {
                *v = 5.0;
                Ok(HandlerStatus::Done)
            }));
            Some(handler.into())
        }
    }

    /// 测试安装时先初始化再挂接，已有处理器的记录被跳过
    #[test]
    fn test_install_attaches_handlers() {
        let mut builder = ContextBuilder::new();
        builder.create("OTHER:BO", RecordConfig::bo()).unwrap();
        let registry = CommandRegistry::new();

        assert_eq!(install_device_support(&mut builder, &registry, &Fixed).unwrap(), 1);
        assert!(builder.has_handler("FIX:AI"));
        assert!(!builder.has_handler("OTHER:BO"));

        let err = install_device_support(&mut builder, &registry, &Fixed).unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_NAME");
    }
}

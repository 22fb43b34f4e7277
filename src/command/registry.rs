//! # 命令注册表
//!
//! ## 业务说明
//! 命令在启动时注册，之后可以从任意线程调用。调用流程：
//! 1. 按名称查找命令（`UnknownCommand`）
//! 2. 完整解码参数缓冲区（`ArgDecode`）
//! 3. 校验参数个数（`ArgCountMismatch`）和逐位置类型（`ArgTypeMismatch`）
//! 4. 解析记录名参数（`RecordNotFound`）
//! 5. 调用回调
//!
//! 1-4 步任何一步失败都不会调用回调，被拒绝的调用没有副作用。

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::command::arg::{ArgBuf, ArgDef, ArgValue, Args, RawArg};
use crate::command::func_def::FuncDef;
use crate::context::Context;
use crate::log_command_failure;
use crate::models::Value;
use crate::record::common::{read_guard, write_guard};
use crate::utils::error::{IocError, IocResult};

/// 命令的描述信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInfo {
    pub name: String,
    pub args: Vec<ArgDef>,
    pub help: Option<String>,
}

#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: RwLock<HashMap<String, Arc<FuncDef>>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册命令，重名返回 `DuplicateCommand`
    pub fn register(&self, def: FuncDef) -> IocResult<()> {
        if def.name().trim().is_empty() {
            return Err(IocError::configuration_error("命令名不能为空"));
        }
        let mut commands = write_guard(&self.commands);
        if commands.contains_key(def.name()) {
            return Err(IocError::duplicate_command(def.name()));
        }
        debug!("注册命令 {} ({} 个参数)", def.name(), def.args().len());
        commands.insert(def.name().to_string(), Arc::new(def));
        Ok(())
    }

    /// 调用命令
    pub fn invoke(&self, ctx: &Context, name: &str, buf: ArgBuf<'_>) -> IocResult<Value> {
        let def = self
            .get(name)
            .ok_or_else(|| IocError::unknown_command(name))?;

        let result = Self::dispatch(&def, ctx, buf);
        match &result {
            Ok(value) => info!("命令 {} 执行完成: {}", name, value),
            Err(e) => log_command_failure!("命令 {} 执行失败: {}", name, e),
        }
        result
    }

    fn dispatch(def: &FuncDef, ctx: &Context, buf: ArgBuf<'_>) -> IocResult<Value> {
        let raw = buf.decode()?;
        if raw.len() != def.args().len() {
            return Err(IocError::arg_count_mismatch(
                def.name(),
                def.args().len(),
                raw.len(),
            ));
        }
        for (position, (arg, spec)) in raw.iter().zip(def.args()).enumerate() {
            if arg.arg_type() != spec.arg_type {
                return Err(IocError::arg_type_mismatch(
                    def.name(),
                    position,
                    spec.arg_type.to_string(),
                    arg.arg_type().to_string(),
                ));
            }
        }

        let values = raw
            .into_iter()
            .map(|arg| match arg {
                RawArg::Int(v) => Ok(ArgValue::Int(v)),
                RawArg::Double(v) => Ok(ArgValue::Double(v)),
                RawArg::Str(s) => Ok(ArgValue::Str(s)),
                RawArg::Record(name) => ctx
                    .lookup(name)
                    .map(ArgValue::Record)
                    .ok_or_else(|| IocError::record_not_found(name)),
            })
            .collect::<IocResult<Vec<_>>>()?;

        def.call(ctx, &Args::new(def.name(), values))
    }

    pub fn get(&self, name: &str) -> Option<Arc<FuncDef>> {
        read_guard(&self.commands).get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        read_guard(&self.commands).contains_key(name)
    }

    /// 全部命令，按名称排序
    pub fn list(&self) -> Vec<CommandInfo> {
        let mut infos: Vec<CommandInfo> = read_guard(&self.commands)
            .values()
            .map(|def| CommandInfo {
                name: def.name().to_string(),
                args: def.args().to_vec(),
                help: def.help().map(str::to_string),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn len(&self) -> usize {
        read_guard(&self.commands).len()
    }

    pub fn is_empty(&self) -> bool {
        read_guard(&self.commands).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::arg::{ArgBufWriter, ArgType};
    use crate::context::ContextBuilder;

    fn echo() -> FuncDef {
        FuncDef::builder("echo")
            .arg("text", ArgType::String)
            .help("返回输入文本")
            .build(|_ctx, args| Ok(Value::from(args.get::<&str>(0)?)))
    }

    /// 测试重复注册被拒绝
    #[test]
    fn test_duplicate_command() {
        let registry = CommandRegistry::new();
        registry.register(echo()).unwrap();
        assert_eq!(
            registry.register(echo()).unwrap_err(),
            IocError::duplicate_command("echo")
        );
        assert_eq!(registry.len(), 1);
    }

    /// 测试正常调用与未知命令
    #[test]
    fn test_invoke_and_unknown() {
        let registry = CommandRegistry::new();
        registry.register(echo()).unwrap();
        let ctx = ContextBuilder::new().build();

        let bytes = ArgBufWriter::new().string("hi").finish();
        let value = registry.invoke(&ctx, "echo", ArgBuf::new(&bytes)).unwrap();
        assert_eq!(value, Value::from("hi"));

        let err = registry
            .invoke(&ctx, "nope", ArgBuf::new(&bytes))
            .unwrap_err();
        assert_eq!(err, IocError::unknown_command("nope"));
    }

    /// 测试列表按名称排序并带有参数定义
    #[test]
    fn test_list_sorted() {
        let registry = CommandRegistry::new();
        registry.register(echo()).unwrap();
        registry
            .register(FuncDef::builder("alpha").build(|_, _| Ok(Value::Long(0))))
            .unwrap();

        let infos = registry.list();
        assert_eq!(infos[0].name, "alpha");
        assert_eq!(infos[1].args, vec![ArgDef::new("text", ArgType::String)]);
        assert_eq!(infos[1].help.as_deref(), Some("返回输入文本"));
    }
}

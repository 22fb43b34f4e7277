//! 命令定义
//!
//! `FuncDef` = 名称 + 有序参数定义 + 回调。通过构建器创建：
//!
//! ```
//! use ioc_lib::command::{ArgType, FuncDef};
//! use ioc_lib::models::Value;
//!
//! let def = FuncDef::builder("add")
//!     .arg("a", ArgType::Int)
//!     .arg("b", ArgType::Int)
//!     .help("两个整数相加")
//!     .build(|_ctx, args| Ok(Value::Long(args.get::<i32>(0)? + args.get::<i32>(1)?)));
//! assert_eq!(def.args().len(), 2);
//! ```

use std::fmt::{Debug, Formatter};

use crate::command::arg::{ArgDef, ArgType, Args};
use crate::context::Context;
use crate::models::Value;
use crate::utils::error::IocResult;

/// 命令回调类型
pub type CommandFn = dyn for<'a> Fn(&Context, &Args<'a>) -> IocResult<Value> + Send + Sync;

pub struct FuncDef {
    name: String,
    args: Vec<ArgDef>,
    help: Option<String>,
    func: Box<CommandFn>,
}

impl FuncDef {
    pub fn builder(name: &str) -> FuncDefBuilder {
        FuncDefBuilder {
            name: name.to_string(),
            args: Vec::new(),
            help: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[ArgDef] {
        &self.args
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub(crate) fn call(&self, ctx: &Context, args: &Args<'_>) -> IocResult<Value> {
        (self.func)(ctx, args)
    }
}

impl Debug for FuncDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuncDef")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("help", &self.help)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct FuncDefBuilder {
    name: String,
    args: Vec<ArgDef>,
    help: Option<String>,
}

impl FuncDefBuilder {
    /// 追加一个位置参数
    pub fn arg(mut self, name: &str, arg_type: ArgType) -> Self {
        self.args.push(ArgDef::new(name, arg_type));
        self
    }

    pub fn help(mut self, text: &str) -> Self {
        self.help = Some(text.to_string());
        self
    }

    pub fn build<F>(self, func: F) -> FuncDef
    where
        F: for<'a> Fn(&Context, &Args<'a>) -> IocResult<Value> + Send + Sync + 'static,
    {
        FuncDef {
            name: self.name,
            args: self.args,
            help: self.help,
            func: Box::new(func),
        }
    }
}

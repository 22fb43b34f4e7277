//! # 命令子系统 (Command Module)
//!
//! ## 业务说明
//! 静态注册的命令函数，调用方以字节缓冲区传参，注册表负责安全地解码为强类型参数。
//! 只支持固定的几种参数类型：整数、浮点、字符串、记录名。
//!
//! ## 模块组成
//! - `arg`: 参数类型、缓冲区编解码、类型化访问
//! - `func_def`: 命令定义与构建器
//! - `registry`: 注册与调用
//! - `builtin`: 内置调试命令
//!
//! ## Rust知识点
//! - **声明宏**: `register_command!` 从函数签名推导参数定义
//! - **高阶trait约束**: 回调 `for<'a> Fn(&Context, &Args<'a>)` 对任意缓冲区生命周期有效

pub mod arg;
pub mod builtin;
pub mod func_def;
pub mod registry;

pub use arg::{ArgBuf, ArgBufWriter, ArgDef, ArgKind, ArgType, ArgValue, Args, FromArg, RawArg};
pub use builtin::register_builtin_commands;
pub use func_def::{CommandFn, FuncDef, FuncDefBuilder};
pub use registry::{CommandInfo, CommandRegistry};

/// 从函数签名声明并注册命令
///
/// 第一个参数是上下文绑定名，其后每个参数的类型决定 `ArgDef` 的类型
/// （`i32`、`f64`、`&str`、`String`、`AnyRecord`）。函数体返回 `IocResult<T>`，
/// `T` 通过 `Value::from` 转换；省略返回类型时命令返回 `Long(0)`。
/// 函数体用到的外部变量会被移动进回调。
///
/// ```
/// use ioc_lib::command::{ArgBuf, ArgBufWriter, CommandRegistry};
/// use ioc_lib::context::ContextBuilder;
/// use ioc_lib::models::Value;
/// use ioc_lib::register_command;
///
/// let registry = CommandRegistry::new();
/// register_command!(registry, fn scale(_ctx, x: f64, factor: i32) -> f64 {
///     Ok(x * factor as f64)
/// }).unwrap();
///
/// let ctx = ContextBuilder::new().build();
/// let bytes = ArgBufWriter::new().double(1.5).int(4).finish();
/// let value = registry.invoke(&ctx, "scale", ArgBuf::new(&bytes)).unwrap();
/// assert_eq!(value, Value::Double(6.0));
/// ```
#[macro_export]
macro_rules! register_command {
    ($registry:expr, fn $name:ident ( $ctx:ident $(, $arg:ident : $ty:ty )* $(,)? ) -> $ret:ty $body:block) => {{
        let def = $crate::command::FuncDef::builder(stringify!($name))
            $( .arg(stringify!($arg), <$ty as $crate::command::ArgKind>::ARG_TYPE) )*
            .build(move |$ctx: &$crate::context::Context, args: &$crate::command::Args<'_>| {
                #[allow(unused_mut)]
                let mut _index = 0usize;
                $(
                    let $arg: $ty = args.get(_index)?;
                    _index += 1;
                )*
                let result = (|| -> $crate::error::IocResult<$ret> { $body })();
                result.map($crate::models::Value::from)
            });
        $registry.register(def)
    }};
    ($registry:expr, fn $name:ident ( $ctx:ident $(, $arg:ident : $ty:ty )* $(,)? ) $body:block) => {
        $crate::register_command!($registry, fn $name ( $ctx $(, $arg : $ty )* ) -> () $body)
    };
}

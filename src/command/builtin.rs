//! 内置调试命令
//!
//! - `dbgf(record)`: 读取记录当前值
//! - `dbpf(record, value)`: 写入输出记录（文本按记录类型转换），被动记录随即处理一次
//! - `dbproc(record)`: 处理记录一次
//! - `dbnr()`: 记录总数

use crate::command::registry::CommandRegistry;
use crate::models::Value;
use crate::record::AnyRecord;
use crate::register_command;
use crate::utils::error::IocResult;

pub fn register_builtin_commands(registry: &CommandRegistry) -> IocResult<()> {
    register_command!(registry, fn dbgf(_ctx, record: AnyRecord) -> Value {
        Ok(record.read().value)
    })?;

    register_command!(registry, fn dbpf(_ctx, record: AnyRecord, value: &str) -> Value {
        record.as_write()?.write(&Value::from(value))?;
        if record.scan().is_passive() {
            record.process()?;
        }
        Ok(record.read().value)
    })?;

    register_command!(registry, fn dbproc(_ctx, record: AnyRecord) {
        record.process()
    })?;

    register_command!(registry, fn dbnr(ctx) -> i32 {
        Ok(i32::try_from(ctx.len()).unwrap_or(i32::MAX))
    })?;

    Ok(())
}

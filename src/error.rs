/// 错误处理模块
///
/// 业务说明：
/// 本模块是错误处理的统一入口点，重新导出 utils::error 中的所有错误类型，
/// 其他模块可以通过 `use crate::error::*` 使用。
///
/// 使用示例：
/// ```rust
/// use ioc_lib::error::{IocError, IocResult};
///
/// fn lookup_something() -> IocResult<String> {
///     Err(IocError::record_not_found("TEMP:01"))
/// }
/// assert!(lookup_something().is_err());
/// ```
pub use crate::utils::error::*;

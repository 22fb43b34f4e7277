//! 服务层模块
//!
//! 只包含后台服务的公共trait，具体服务位于各自的业务模块（如 `scan::runner`）。

pub mod traits;

pub use traits::BaseService;

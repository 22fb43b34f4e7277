//! 服务层基础trait定义
//!
//! 长期运行的后台组件（扫描运行器等）实现 `BaseService`，
//! 由 `main` 统一初始化与关闭。

use async_trait::async_trait;

use crate::utils::error::IocResult;

/// 基础服务trait，所有后台服务都应实现
#[async_trait]
pub trait BaseService: Send + Sync {
    /// 服务名称
    fn service_name(&self) -> &'static str;

    /// 初始化服务
    async fn initialize(&mut self) -> IocResult<()>;

    /// 关闭服务
    async fn shutdown(&mut self) -> IocResult<()>;

    /// 健康检查
    async fn health_check(&self) -> IocResult<()>;
}

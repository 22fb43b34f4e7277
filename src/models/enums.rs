//! # 模型枚举类型模块
//!
//! ## 业务作用
//! - **RecordType**: 八种记录类型，区分输入/输出
//! - **ScanMode**: 记录的扫描方式（被动 / 周期 / 事件）
//! - **ForwardPolicy**: 前向链接处理相对扫描列表的优先级
//!
//! ## Rust知识点
//! - **trait实现**: Display、FromStr、Default
//! - **serde(rename_all)**: 配置文件中使用 snake_case 字符串

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use crate::utils::error::IocError;

/// 记录类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// 模拟量输入
    Ai,
    /// 模拟量输出
    Ao,
    /// 开关量输入
    Bi,
    /// 开关量输出
    Bo,
    /// 整型输入
    Longin,
    /// 整型输出
    Longout,
    /// 字符串输入
    Stringin,
    /// 字符串输出
    Stringout,
}

impl RecordType {
    /// 全部记录类型
    pub const ALL: [RecordType; 8] = [
        RecordType::Ai,
        RecordType::Ao,
        RecordType::Bi,
        RecordType::Bo,
        RecordType::Longin,
        RecordType::Longout,
        RecordType::Stringin,
        RecordType::Stringout,
    ];

    pub fn is_input(&self) -> bool {
        matches!(
            self,
            RecordType::Ai | RecordType::Bi | RecordType::Longin | RecordType::Stringin
        )
    }

    pub fn is_output(&self) -> bool {
        !self.is_input()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Ai => "ai",
            RecordType::Ao => "ao",
            RecordType::Bi => "bi",
            RecordType::Bo => "bo",
            RecordType::Longin => "longin",
            RecordType::Longout => "longout",
            RecordType::Stringin => "stringin",
            RecordType::Stringout => "stringout",
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = IocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| IocError::configuration_error(format!("未知的记录类型: {}", s)))
    }
}

/// 扫描方式
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScanMode {
    /// 被动：只在被显式处理或前向链接触发时处理
    Passive,
    /// 周期扫描
    Periodic(Duration),
    /// 事件扫描，事件名标识扫描列表
    Event(String),
}

impl Default for ScanMode {
    fn default() -> Self {
        ScanMode::Passive
    }
}

impl ScanMode {
    pub fn is_passive(&self) -> bool {
        matches!(self, ScanMode::Passive)
    }

    /// 校验扫描方式：周期不能为零，事件名不能为空
    pub fn validate(&self) -> Result<(), IocError> {
        match self {
            ScanMode::Periodic(period) if period.is_zero() => {
                Err(IocError::invalid_scan_config("扫描周期不能为0"))
            }
            ScanMode::Event(name) if name.trim().is_empty() => {
                Err(IocError::invalid_scan_config("事件名不能为空"))
            }
            _ => Ok(()),
        }
    }
}

impl Display for ScanMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanMode::Passive => f.write_str("Passive"),
            ScanMode::Periodic(period) => write!(f, "{} second", period.as_secs_f64()),
            ScanMode::Event(name) => write!(f, "Event({})", name),
        }
    }
}

/// 前向链接处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardPolicy {
    /// 一个扫描周期的所有列表处理完后统一处理前向链接（最低优先级）
    Deferred,
    /// 每个列表处理完后立即处理其产生的前向链接
    AfterList,
}

impl Default for ForwardPolicy {
    fn default() -> Self {
        ForwardPolicy::Deferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试输入/输出分类
    #[test]
    fn test_input_output_split() {
        let inputs: Vec<_> = RecordType::ALL.iter().filter(|t| t.is_input()).collect();
        let outputs: Vec<_> = RecordType::ALL.iter().filter(|t| t.is_output()).collect();
        assert_eq!(inputs.len(), 4);
        assert_eq!(outputs.len(), 4);
        assert!(RecordType::Stringout.is_output());
    }

    /// 测试字符串双向转换
    #[test]
    fn test_record_type_from_str() {
        for t in RecordType::ALL {
            assert_eq!(t.to_string().parse::<RecordType>().unwrap(), t);
        }
        assert_eq!("AI".parse::<RecordType>().unwrap(), RecordType::Ai);
        assert!("calc".parse::<RecordType>().is_err());
    }

    /// 测试扫描方式校验
    #[test]
    fn test_scan_mode_validate() {
        assert!(ScanMode::Passive.validate().is_ok());
        assert!(ScanMode::Periodic(Duration::from_millis(100)).validate().is_ok());
        let err = ScanMode::Periodic(Duration::ZERO).validate().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SCAN_CONFIG");
        assert!(ScanMode::Event(" ".into()).validate().is_err());
    }

    /// 测试前向策略的 snake_case 序列化
    #[test]
    fn test_forward_policy_serde() {
        let json = serde_json::to_string(&ForwardPolicy::AfterList).unwrap();
        assert_eq!(json, "\"after_list\"");
        let back: ForwardPolicy = serde_json::from_str("\"deferred\"").unwrap();
        assert_eq!(back, ForwardPolicy::Deferred);
    }
}

//! # 过程变量值模块
//!
//! ## 业务说明
//! `Value` 是记录对外暴露的统一值类型，四种形态覆盖全部八种记录：
//! 模拟量 (Double)、整型 (Long)、开关量 (Bool)、字符串 (Text)。
//! 字符串受固定上限 `MAX_STRING_SIZE` 约束，超长输入在字符边界处截断。
//!
//! ## Rust知识点
//! - **serde(from/into)**: 反序列化同样经过截断逻辑，保证不变量
//! - **From trait**: 原生类型到 Value 的无损转换

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// 字符串记录值的最大字节数
pub const MAX_STRING_SIZE: usize = 40;

/// 长度受限的 UTF-8 字符串
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct BoundedString(String);

impl BoundedString {
    /// 创建受限字符串，超过 `MAX_STRING_SIZE` 字节的部分被截断
    pub fn new(text: impl Into<String>) -> Self {
        let mut text = text.into();
        if text.len() > MAX_STRING_SIZE {
            let mut cut = MAX_STRING_SIZE;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for BoundedString {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for BoundedString {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<BoundedString> for String {
    fn from(text: BoundedString) -> Self {
        text.0
    }
}

impl Display for BoundedString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 过程变量值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// 双精度浮点（Ai / Ao）
    Double(f64),
    /// 32位整数（Longin / Longout）
    Long(i32),
    /// 开关量（Bi / Bo）
    Bool(bool),
    /// 受限字符串（Stringin / Stringout）
    Text(BoundedString),
}

impl Value {
    /// 值形态名称，用于错误信息
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Double(_) => "Double",
            Value::Long(_) => "Long",
            Value::Bool(_) => "Bool",
            Value::Text(_) => "Text",
        }
    }

    /// 转换为浮点数
    ///
    /// 字符串按十进制数解析（允许首尾空白），解析失败返回 None
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Long(v) => Some(f64::from(*v)),
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::Text(s) => s.as_str().trim().parse::<f64>().ok(),
        }
    }

    /// 转换为 i32
    ///
    /// 浮点数四舍五入后饱和到 i32 范围；NaN 视为不可转换
    pub fn to_i32(&self) -> Option<i32> {
        match self {
            Value::Long(v) => Some(*v),
            Value::Bool(v) => Some(i32::from(*v)),
            Value::Double(v) => saturate_i32(*v),
            Value::Text(s) => {
                let trimmed = s.as_str().trim();
                trimmed
                    .parse::<i32>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().and_then(saturate_i32))
            }
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

fn saturate_i32(v: f64) -> Option<i32> {
    if v.is_nan() {
        return None;
    }
    // `as` 在 Rust 中对越界浮点做饱和转换
    Some(v.round() as i32)
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Double(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", u8::from(*v)),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Long(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(BoundedString::new(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(BoundedString::new(v))
    }
}

impl From<BoundedString> for Value {
    fn from(v: BoundedString) -> Self {
        Value::Text(v)
    }
}

/// 无返回值的命令统一返回 `Long(0)`
impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Long(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试超长字符串在字符边界截断
    #[test]
    fn test_bounded_string_truncates_on_char_boundary() {
        let ascii = "x".repeat(60);
        assert_eq!(BoundedString::new(ascii).len(), MAX_STRING_SIZE);

        // 每个汉字3字节，40字节只能容纳13个汉字（39字节）
        let wide = "温".repeat(20);
        let bounded = BoundedString::new(wide);
        assert_eq!(bounded.len(), 39);
        assert_eq!(bounded.as_str().chars().count(), 13);
    }

    /// 测试反序列化同样执行截断
    #[test]
    fn test_bounded_string_deserialize_truncates() {
        let json = format!("\"{}\"", "a".repeat(50));
        let s: BoundedString = serde_json::from_str(&json).unwrap();
        assert_eq!(s.len(), MAX_STRING_SIZE);
    }

    /// 测试数值转换
    #[test]
    fn test_numeric_conversions() {
        assert_eq!(Value::from(" 12.5 ").to_f64(), Some(12.5));
        assert_eq!(Value::from("abc").to_f64(), None);
        assert_eq!(Value::Double(2.6).to_i32(), Some(3));
        assert_eq!(Value::Double(1e20).to_i32(), Some(i32::MAX));
        assert_eq!(Value::Double(f64::NAN).to_i32(), None);
        assert_eq!(Value::from("7.4").to_i32(), Some(7));
        assert_eq!(Value::Bool(true).to_f64(), Some(1.0));
    }

    /// 测试显示格式
    #[test]
    fn test_display() {
        assert_eq!(Value::Bool(true).to_string(), "1");
        assert_eq!(Value::Long(-4).to_string(), "-4");
        assert_eq!(Value::from("run").to_string(), "run");
    }
}

//! # 命令参数
//!
//! ## 业务说明
//! 命令调用方把参数编码成字节缓冲区，注册表在调用回调之前完整解码并校验。
//!
//! 编码格式：若干个 `tag:u8` + 负载
//! - `0` Int: i32 小端 4 字节
//! - `1` Double: f64 小端 8 字节
//! - `2` String / `3` RecordName: u16 小端长度 + UTF-8 字节
//!
//! ## Rust知识点
//! - **生命周期**: `ArgBuf<'a>` 只借用调用方的字节，解码出的字符串参数同样借用它
//! - **关联常量**: `ArgKind::ARG_TYPE` 让 `register_command!` 从参数类型推导 `ArgDef`

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::record::AnyRecord;
use crate::utils::error::{IocError, IocResult};

/// 参数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgType {
    Int,
    Double,
    String,
    /// 记录名，调用前解析为记录
    RecordName,
}

impl ArgType {
    pub fn tag(&self) -> u8 {
        match self {
            ArgType::Int => 0,
            ArgType::Double => 1,
            ArgType::String => 2,
            ArgType::RecordName => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ArgType::Int),
            1 => Some(ArgType::Double),
            2 => Some(ArgType::String),
            3 => Some(ArgType::RecordName),
            _ => None,
        }
    }
}

impl Display for ArgType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ArgType::Int => "int",
            ArgType::Double => "double",
            ArgType::String => "string",
            ArgType::RecordName => "record",
        };
        f.write_str(name)
    }
}

/// 参数定义，位置即在 `FuncDef` 中的序号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgDef {
    pub name: String,
    pub arg_type: ArgType,
}

impl ArgDef {
    pub fn new(name: &str, arg_type: ArgType) -> Self {
        Self {
            name: name.to_string(),
            arg_type,
        }
    }
}

/// 解码后、尚未解析记录名的参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawArg<'a> {
    Int(i32),
    Double(f64),
    Str(&'a str),
    Record(&'a str),
}

impl RawArg<'_> {
    pub fn arg_type(&self) -> ArgType {
        match self {
            RawArg::Int(_) => ArgType::Int,
            RawArg::Double(_) => ArgType::Double,
            RawArg::Str(_) => ArgType::String,
            RawArg::Record(_) => ArgType::RecordName,
        }
    }
}

/// 一次调用的原始参数缓冲区
#[derive(Debug, Clone, Copy)]
pub struct ArgBuf<'a> {
    bytes: &'a [u8],
}

impl<'a> ArgBuf<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 解码整个缓冲区
    ///
    /// 截断、未知标签、非 UTF-8 字符串都返回 `ArgDecode`
    pub fn decode(&self) -> IocResult<Vec<RawArg<'a>>> {
        let mut cursor = Cursor {
            bytes: self.bytes,
            pos: 0,
        };
        let mut args = Vec::new();

        while !cursor.at_end() {
            let offset = cursor.pos;
            let tag = cursor.take(1)?[0];
            let arg_type = ArgType::from_tag(tag).ok_or_else(|| {
                IocError::arg_decode(format!("偏移 {} 处的参数标签未知: {}", offset, tag))
            })?;
            let arg = match arg_type {
                ArgType::Int => {
                    let mut raw = [0u8; 4];
                    raw.copy_from_slice(cursor.take(4)?);
                    RawArg::Int(i32::from_le_bytes(raw))
                }
                ArgType::Double => {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(cursor.take(8)?);
                    RawArg::Double(f64::from_le_bytes(raw))
                }
                ArgType::String => RawArg::Str(cursor.text()?),
                ArgType::RecordName => RawArg::Record(cursor.text()?),
            };
            args.push(arg);
        }
        Ok(args)
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, n: usize) -> IocResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                IocError::arg_decode(format!(
                    "参数缓冲区在偏移 {} 处截断，需要 {} 字节",
                    self.pos, n
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn text(&mut self) -> IocResult<&'a str> {
        let mut len = [0u8; 2];
        len.copy_from_slice(self.take(2)?);
        let offset = self.pos;
        let raw = self.take(u16::from_le_bytes(len) as usize)?;
        std::str::from_utf8(raw).map_err(|e| {
            IocError::arg_decode(format!("偏移 {} 处的字符串不是有效UTF-8: {}", offset, e))
        })
    }
}

/// 参数缓冲区编码器
///
/// ```
/// use ioc_lib::command::{ArgBuf, ArgBufWriter};
///
/// let bytes = ArgBufWriter::new().record("AO:1").string("3.5").finish();
/// assert_eq!(ArgBuf::new(&bytes).decode().unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArgBufWriter {
    bytes: Vec<u8>,
}

impl ArgBufWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn int(mut self, value: i32) -> Self {
        self.bytes.push(ArgType::Int.tag());
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn double(mut self, value: f64) -> Self {
        self.bytes.push(ArgType::Double.tag());
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn string(self, value: &str) -> Self {
        self.text(ArgType::String, value)
    }

    pub fn record(self, name: &str) -> Self {
        self.text(ArgType::RecordName, name)
    }

    /// 超过 u16 长度上限的字符串在字符边界截断
    fn text(mut self, arg_type: ArgType, value: &str) -> Self {
        let mut end = value.len().min(u16::MAX as usize);
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        self.bytes.push(arg_type.tag());
        self.bytes.extend_from_slice(&(end as u16).to_le_bytes());
        self.bytes.extend_from_slice(&value.as_bytes()[..end]);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// 解析完成、交给回调的参数值
#[derive(Debug, Clone)]
pub enum ArgValue<'a> {
    Int(i32),
    Double(f64),
    Str(&'a str),
    Record(AnyRecord),
}

impl ArgValue<'_> {
    pub fn arg_type(&self) -> ArgType {
        match self {
            ArgValue::Int(_) => ArgType::Int,
            ArgValue::Double(_) => ArgType::Double,
            ArgValue::Str(_) => ArgType::String,
            ArgValue::Record(_) => ArgType::RecordName,
        }
    }
}

/// 回调看到的参数列表，按位置类型化访问
#[derive(Debug)]
pub struct Args<'a> {
    command: String,
    values: Vec<ArgValue<'a>>,
}

impl<'a> Args<'a> {
    pub(crate) fn new(command: &str, values: Vec<ArgValue<'a>>) -> Self {
        Self {
            command: command.to_string(),
            values,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn raw(&self, index: usize) -> Option<&ArgValue<'a>> {
        self.values.get(index)
    }

    /// 取第 `index` 个参数并转换为 `T`
    pub fn get<T: FromArg<'a>>(&self, index: usize) -> IocResult<T> {
        let value = self.values.get(index).ok_or_else(|| {
            IocError::arg_count_mismatch(&self.command, index + 1, self.values.len())
        })?;
        T::from_arg(value).ok_or_else(|| {
            IocError::arg_type_mismatch(
                &self.command,
                index,
                T::ARG_TYPE.to_string(),
                value.arg_type().to_string(),
            )
        })
    }
}

/// 可以作为命令参数的 Rust 类型
pub trait ArgKind {
    const ARG_TYPE: ArgType;
}

/// 从参数值取出 Rust 值
pub trait FromArg<'a>: ArgKind + Sized {
    fn from_arg(value: &ArgValue<'a>) -> Option<Self>;
}

impl ArgKind for i32 {
    const ARG_TYPE: ArgType = ArgType::Int;
}

impl<'a> FromArg<'a> for i32 {
    fn from_arg(value: &ArgValue<'a>) -> Option<Self> {
        match value {
            ArgValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl ArgKind for f64 {
    const ARG_TYPE: ArgType = ArgType::Double;
}

impl<'a> FromArg<'a> for f64 {
    fn from_arg(value: &ArgValue<'a>) -> Option<Self> {
        match value {
            ArgValue::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl ArgKind for &str {
    const ARG_TYPE: ArgType = ArgType::String;
}

impl<'a> FromArg<'a> for &'a str {
    fn from_arg(value: &ArgValue<'a>) -> Option<Self> {
        match value {
            ArgValue::Str(s) => Some(*s),
            _ => None,
        }
    }
}

impl ArgKind for String {
    const ARG_TYPE: ArgType = ArgType::String;
}

impl<'a> FromArg<'a> for String {
    fn from_arg(value: &ArgValue<'a>) -> Option<Self> {
        match value {
            ArgValue::Str(s) => Some(s.to_string()),
            _ => None,
        }
    }
}

impl ArgKind for AnyRecord {
    const ARG_TYPE: ArgType = ArgType::RecordName;
}

impl<'a> FromArg<'a> for AnyRecord {
    fn from_arg(value: &ArgValue<'a>) -> Option<Self> {
        match value {
            ArgValue::Record(r) => Some(r.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试编码器与解码器的字节布局一致
    #[test]
    fn test_writer_layout() {
        let bytes = ArgBufWriter::new().int(-2).string("ab").finish();
        assert_eq!(bytes, vec![0, 0xfe, 0xff, 0xff, 0xff, 2, 2, 0, b'a', b'b']);

        let args = ArgBuf::new(&bytes).decode().unwrap();
        assert_eq!(args, vec![RawArg::Int(-2), RawArg::Str("ab")]);
    }

    /// 测试截断缓冲区
    #[test]
    fn test_truncated_buffer() {
        let bytes = ArgBufWriter::new().double(1.5).finish();
        let err = ArgBuf::new(&bytes[..5]).decode().unwrap_err();
        assert_eq!(err.error_code(), "ARG_DECODE_ERROR");

        let bytes = ArgBufWriter::new().string("hello").finish();
        assert!(ArgBuf::new(&bytes[..4]).decode().is_err());
    }

    /// 测试未知标签与非法UTF-8
    #[test]
    fn test_bad_tag_and_utf8() {
        assert!(ArgBuf::new(&[9]).decode().is_err());
        assert!(ArgBuf::new(&[2, 2, 0, 0xff, 0xfe]).decode().is_err());
        assert!(ArgBuf::new(&[]).decode().unwrap().is_empty());
    }

    /// 测试按位置取值时的类型检查
    #[test]
    fn test_args_typed_access() {
        let args = Args::new("cmd", vec![ArgValue::Int(3), ArgValue::Str("x")]);
        assert_eq!(args.get::<i32>(0).unwrap(), 3);
        assert_eq!(args.get::<&str>(1).unwrap(), "x");
        assert_eq!(args.get::<String>(1).unwrap(), "x");

        let err = args.get::<f64>(0).unwrap_err();
        assert_eq!(
            err,
            IocError::arg_type_mismatch("cmd", 0, "double", "int")
        );
        assert!(args.get::<i32>(2).is_err());
    }
}

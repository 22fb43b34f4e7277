//! # 报警模型模块
//!
//! ## 业务说明
//! 每次处理周期内可能同时出现多个报警条件（设备故障、越限、状态报警），
//! 记录最终的报警严重度取所有条件中最高者；严重度相同时保留最先出现的状态。
//! 从未处理过的记录报告 `Udf / Invalid`。
//!
//! ## 越限判断
//! 所有启用的级别都参与评估，按 HIHI → LOLO → HIGH → LOW 的顺序提交给累加器，
//! 因此最终取命中级别中的最高严重度，严重度相同时靠前的级别胜出。
//! 滞回 (hysteresis)：上一周期胜出的越限状态，
//! 值需要回到限值另一侧超过 `hyst` 才解除。
//!
//! ## Rust知识点
//! - **derive(PartialOrd, Ord)**: 枚举按声明顺序比较，直接得到严重度全序

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// 报警严重度，按声明顺序全序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlarmSeverity {
    NoAlarm,
    Minor,
    Major,
    Invalid,
}

impl Default for AlarmSeverity {
    fn default() -> Self {
        AlarmSeverity::NoAlarm
    }
}

impl Display for AlarmSeverity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            AlarmSeverity::NoAlarm => "NO_ALARM",
            AlarmSeverity::Minor => "MINOR",
            AlarmSeverity::Major => "MAJOR",
            AlarmSeverity::Invalid => "INVALID",
        };
        f.write_str(text)
    }
}

/// 报警状态（原因）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlarmStatus {
    NoAlarm,
    ReadError,
    WriteError,
    HiHi,
    High,
    Low,
    LoLo,
    State,
    ChangeOfState,
    Comm,
    Timeout,
    ScanError,
    Soft,
    Udf,
}

impl Default for AlarmStatus {
    fn default() -> Self {
        AlarmStatus::NoAlarm
    }
}

impl Display for AlarmStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            AlarmStatus::NoAlarm => "NO_ALARM",
            AlarmStatus::ReadError => "READ",
            AlarmStatus::WriteError => "WRITE",
            AlarmStatus::HiHi => "HIHI",
            AlarmStatus::High => "HIGH",
            AlarmStatus::Low => "LOW",
            AlarmStatus::LoLo => "LOLO",
            AlarmStatus::State => "STATE",
            AlarmStatus::ChangeOfState => "COS",
            AlarmStatus::Comm => "COMM",
            AlarmStatus::Timeout => "TIMEOUT",
            AlarmStatus::ScanError => "SCAN",
            AlarmStatus::Soft => "SOFT",
            AlarmStatus::Udf => "UDF",
        };
        f.write_str(text)
    }
}

/// 报警状态 + 严重度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmState {
    pub status: AlarmStatus,
    pub severity: AlarmSeverity,
}

impl AlarmState {
    pub fn new(status: AlarmStatus, severity: AlarmSeverity) -> Self {
        Self { status, severity }
    }

    /// 从未处理过的记录的报警状态
    pub fn undefined() -> Self {
        Self::new(AlarmStatus::Udf, AlarmSeverity::Invalid)
    }

    pub fn is_alarm(&self) -> bool {
        self.severity > AlarmSeverity::NoAlarm
    }
}

impl Display for AlarmState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.status, self.severity)
    }
}

/// 单个处理周期内的报警累加器
///
/// 只有严格更高的严重度才会替换当前状态
#[derive(Debug, Clone, Default)]
pub struct AlarmAccumulator {
    current: AlarmState,
}

impl AlarmAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 提交一个报警条件
    pub fn raise(&mut self, status: AlarmStatus, severity: AlarmSeverity) {
        if severity > self.current.severity {
            self.current = AlarmState::new(status, severity);
        }
    }

    pub fn severity(&self) -> AlarmSeverity {
        self.current.severity
    }

    /// 结束本周期，得到最终报警状态
    pub fn finish(self) -> AlarmState {
        self.current
    }
}

/// 单个越限级别：限值 + 严重度
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitSpec {
    pub value: f64,
    pub severity: AlarmSeverity,
}

impl LimitSpec {
    /// 创建越限级别，严重度缺省为 Major
    pub fn new(value: f64) -> Self {
        Self {
            value,
            severity: AlarmSeverity::Major,
        }
    }

    pub fn with_severity(value: f64, severity: AlarmSeverity) -> Self {
        Self { value, severity }
    }
}

/// 模拟量/整型记录的越限报警配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmLimits {
    pub hihi: Option<LimitSpec>,
    pub high: Option<LimitSpec>,
    pub low: Option<LimitSpec>,
    pub lolo: Option<LimitSpec>,
    /// 滞回宽度
    pub hyst: f64,
}

impl AlarmLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hihi(mut self, value: f64, severity: AlarmSeverity) -> Self {
        self.hihi = Some(LimitSpec::with_severity(value, severity));
        self
    }

    pub fn high(mut self, value: f64, severity: AlarmSeverity) -> Self {
        self.high = Some(LimitSpec::with_severity(value, severity));
        self
    }

    pub fn low(mut self, value: f64, severity: AlarmSeverity) -> Self {
        self.low = Some(LimitSpec::with_severity(value, severity));
        self
    }

    pub fn lolo(mut self, value: f64, severity: AlarmSeverity) -> Self {
        self.lolo = Some(LimitSpec::with_severity(value, severity));
        self
    }

    pub fn hysteresis(mut self, hyst: f64) -> Self {
        self.hyst = hyst.abs();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.hihi.is_none() && self.high.is_none() && self.low.is_none() && self.lolo.is_none()
    }

    /// 本周期命中的全部越限级别，按 HIHI → LOLO → HIGH → LOW 排列
    ///
    /// `last` 为上一周期胜出的越限状态，用于滞回判断。
    /// 严重度为 NoAlarm 的级别视为未启用；NaN 值不命中任何级别。
    pub fn tripped(&self, val: f64, last: Option<AlarmStatus>) -> Vec<(AlarmStatus, AlarmSeverity)> {
        if val.is_nan() {
            return Vec::new();
        }

        let upper = |spec: &Option<LimitSpec>, status: AlarmStatus| {
            spec.filter(|s| s.severity > AlarmSeverity::NoAlarm).and_then(|s| {
                let held = last == Some(status) && val > s.value - self.hyst;
                (val >= s.value || held).then_some((status, s.severity))
            })
        };
        let lower = |spec: &Option<LimitSpec>, status: AlarmStatus| {
            spec.filter(|s| s.severity > AlarmSeverity::NoAlarm).and_then(|s| {
                let held = last == Some(status) && val < s.value + self.hyst;
                (val <= s.value || held).then_some((status, s.severity))
            })
        };

        [
            upper(&self.hihi, AlarmStatus::HiHi),
            lower(&self.lolo, AlarmStatus::LoLo),
            upper(&self.high, AlarmStatus::High),
            lower(&self.low, AlarmStatus::Low),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// 把命中的级别全部提交给累加器，返回越限级别中胜出的状态
    pub fn raise_into(&self, val: f64, last: Option<AlarmStatus>, acc: &mut AlarmAccumulator) -> Option<AlarmStatus> {
        let mut winner: Option<(AlarmStatus, AlarmSeverity)> = None;
        for (status, severity) in self.tripped(val, last) {
            acc.raise(status, severity);
            if winner.map_or(true, |(_, best)| severity > best) {
                winner = Some((status, severity));
            }
        }
        winner.map(|(status, _)| status)
    }

    /// 越限级别中胜出的状态与严重度
    pub fn evaluate(&self, val: f64, last: Option<AlarmStatus>) -> Option<(AlarmStatus, AlarmSeverity)> {
        let mut acc = AlarmAccumulator::new();
        self.raise_into(val, last, &mut acc)?;
        let state = acc.finish();
        Some((state.status, state.severity))
    }
}

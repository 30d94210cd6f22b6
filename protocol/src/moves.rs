//! 走法与时限

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::piece::Side;

/// 走法
///
/// 只保存传输时的文本记号，不校验其内部结构。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    name: String,
}

impl Move {
    /// 创建新走法
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// 走法名称
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Move {
    fn from(name: &str) -> Self {
        Move::new(name)
    }
}

/// 双方时限（秒），握手后不可变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeControl {
    pub white_seconds: u32,
    pub black_seconds: u32,
}

impl TimeControl {
    /// 某一方的时限
    pub fn for_side(&self, side: Side) -> u32 {
        match side {
            Side::White => self.white_seconds,
            Side::Black => self.black_seconds,
        }
    }
}

impl fmt::Display for TimeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s/{}s", self.white_seconds, self.black_seconds)
    }
}

/// 随走法一起到达的剩余时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUpdate {
    /// 刚刚走棋的一方
    pub mover: Side,
    /// 该方剩余秒数
    pub seconds: u32,
}

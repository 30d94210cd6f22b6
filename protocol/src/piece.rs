//! 阵营与胜负方定义

use std::fmt;

use serde::{Deserialize, Serialize};

/// 阵营
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// 白方（先手）
    White,
    /// 黑方（后手）
    Black,
}

impl Side {
    /// 获取对方阵营
    pub fn opponent(&self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// 握手时请求阵营所用的记号
    pub fn request_token(&self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }

    /// 从请求记号解析（不区分大小写）
    pub fn from_token(token: &str) -> Option<Side> {
        match token.to_ascii_lowercase().as_str() {
            "white" | "w" => Some(Side::White),
            "black" | "b" => Some(Side::Black),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.request_token())
    }
}

/// 胜负方
///
/// `Other` 表示非阵营性的结局（和棋或异常终止）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    White,
    Black,
    Other,
}

impl Winner {
    /// 获胜阵营（和棋时为 None）
    pub fn side(&self) -> Option<Side> {
        match self {
            Winner::White => Some(Side::White),
            Winner::Black => Some(Side::Black),
            Winner::Other => None,
        }
    }
}

impl From<Side> for Winner {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Winner::White,
            Side::Black => Winner::Black,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::White => f.write_str("white"),
            Winner::Black => f.write_str("black"),
            Winner::Other => f.write_str("other"),
        }
    }
}

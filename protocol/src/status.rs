//! 状态码目录
//!
//! 服务器每一行都以三位数字状态码开头。同一语义事件按阵营/来源使用不同编号，
//! 这里在边界处把线上编号翻译为与阵营无关的规范含义：
//! - [`Reply`]：提交走法后的应答（200/207/201/202/203）
//! - [`Reception`]：等待对方走法时收到的消息（311-326, 361, 362）
//!
//! 阵营归属表和结局表都以常量数据表示，便于逐项审计和穷举测试。

use std::fmt;
use std::ops::RangeInclusive;

use crate::error::{ProtocolError, Result};
use crate::piece::{Side, Winner};

/// 三位数字状态码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(pub u16);

impl StatusCode {
    /// 问候
    pub const GREETING: StatusCode = StatusCode(0);
    /// 阵营已接受，无时限
    pub const SIDE_ACCEPTED: StatusCode = StatusCode(100);
    /// 阵营已接受，消息文本携带双方时限
    pub const SIDE_ACCEPTED_TIMED: StatusCode = StatusCode(101);
    /// 走法已接受
    pub const MOVE_ACCEPTED: StatusCode = StatusCode(200);
    /// 走法方获胜
    pub const MOVER_WINS: StatusCode = StatusCode(201);
    /// 对方获胜
    pub const OPPONENT_WINS: StatusCode = StatusCode(202);
    /// 无胜方结局（和棋等）
    pub const NO_WINNER: StatusCode = StatusCode(203);
    /// 走法已接受，消息文本携带剩余时间
    pub const MOVE_ACCEPTED_TIMED: StatusCode = StatusCode(207);
    /// 白方确认
    pub const WHITE_CONFIRMED: StatusCode = StatusCode(351);
    /// 黑方确认
    pub const BLACK_CONFIRMED: StatusCode = StatusCode(352);
    /// 黑方获胜，无走法文本
    pub const BLACK_WINS: StatusCode = StatusCode(361);
    /// 白方获胜，无走法文本
    pub const WHITE_WINS: StatusCode = StatusCode(362);

    /// 握手最后一步对应阵营的确认码
    pub fn confirmation_for(side: Side) -> StatusCode {
        match side {
            Side::White => StatusCode::WHITE_CONFIRMED,
            Side::Black => StatusCode::BLACK_CONFIRMED,
        }
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// 走法提交后第二条消息允许的状态码范围
pub const MOVE_STATUS_RANGE: RangeInclusive<u16> = 311..=314;

/// 等待对方走法时允许的状态码范围（另加 361/362）
pub const RECEPTION_RANGE: RangeInclusive<u16> = 311..=326;

/// 携带白方走法的状态码，只能由黑方观察到，走法前带省略号
pub const WHITE_MOVE_CODES: [u16; 5] = [312, 314, 323, 324, 326];

/// 携带黑方走法的状态码，只能由白方观察到
pub const BLACK_MOVE_CODES: [u16; 5] = [311, 313, 321, 322, 325];

/// 走法后附带剩余时间的状态码及走棋方
pub const TIMED_MOVE_CODES: [(u16, Side); 2] = [(313, Side::Black), (314, Side::White)];

/// 状态码所携带走法的来源阵营
pub fn move_origin(code: StatusCode) -> Option<Side> {
    if WHITE_MOVE_CODES.contains(&code.0) {
        Some(Side::White)
    } else if BLACK_MOVE_CODES.contains(&code.0) {
        Some(Side::Black)
    } else {
        None
    }
}

/// 走法前是否必须出现省略号
pub fn expects_ellipsis(code: StatusCode) -> bool {
    move_origin(code) == Some(Side::White)
}

/// 若状态码在走法后附带时间，返回走棋方
pub fn timed_mover(code: StatusCode) -> Option<Side> {
    TIMED_MOVE_CODES
        .iter()
        .find(|(c, _)| *c == code.0)
        .map(|(_, side)| *side)
}

/// 提交走法后的应答（与阵营无关的规范含义）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// 已接受，继续
    Accepted,
    /// 已接受，文本携带本方剩余时间
    AcceptedWithTime,
    /// 游戏结束
    Ended(Ending),
}

/// 走法应答中的结局，相对走棋方而言
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    MoverWins,
    OpponentWins,
    NoWinner,
}

impl Ending {
    /// 换算为绝对的胜负方
    pub fn winner(self, mover: Side) -> Winner {
        match self {
            Ending::MoverWins => mover.into(),
            Ending::OpponentWins => mover.opponent().into(),
            Ending::NoWinner => Winner::Other,
        }
    }
}

const REPLIES: [(StatusCode, Reply); 5] = [
    (StatusCode::MOVE_ACCEPTED, Reply::Accepted),
    (StatusCode::MOVE_ACCEPTED_TIMED, Reply::AcceptedWithTime),
    (StatusCode::MOVER_WINS, Reply::Ended(Ending::MoverWins)),
    (StatusCode::OPPONENT_WINS, Reply::Ended(Ending::OpponentWins)),
    (StatusCode::NO_WINNER, Reply::Ended(Ending::NoWinner)),
];

impl Reply {
    /// 从线上状态码翻译
    pub fn from_code(code: StatusCode) -> Option<Reply> {
        REPLIES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, reply)| *reply)
    }
}

/// 等待对方走法时收到消息的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reception {
    /// 文本中是否带有对方走法
    pub carries_move: bool,
    /// 若游戏就此结束，胜负方
    pub ending: Option<Winner>,
}

impl Reception {
    const fn play() -> Self {
        Self { carries_move: true, ending: None }
    }

    const fn final_move(winner: Winner) -> Self {
        Self { carries_move: true, ending: Some(winner) }
    }

    const fn no_move(winner: Winner) -> Self {
        Self { carries_move: false, ending: Some(winner) }
    }
}

/// (观察方, 状态码) → 处理方式
const RECEPTIONS: [(Side, u16, Reception); 14] = [
    (Side::White, 311, Reception::play()),
    (Side::White, 313, Reception::play()),
    (Side::White, 321, Reception::final_move(Winner::Black)),
    (Side::White, 361, Reception::no_move(Winner::Black)),
    (Side::White, 322, Reception::final_move(Winner::White)),
    (Side::White, 362, Reception::no_move(Winner::White)),
    (Side::White, 325, Reception::final_move(Winner::Other)),
    (Side::Black, 312, Reception::play()),
    (Side::Black, 314, Reception::play()),
    (Side::Black, 323, Reception::final_move(Winner::White)),
    (Side::Black, 362, Reception::no_move(Winner::White)),
    (Side::Black, 324, Reception::final_move(Winner::Black)),
    (Side::Black, 361, Reception::no_move(Winner::Black)),
    (Side::Black, 326, Reception::final_move(Winner::Other)),
];

impl Reception {
    /// 检查状态码并查表
    ///
    /// 依次执行：范围检查（`BadStatus`）、阵营归属检查（`WrongSide`）、
    /// 结局表查找（`UnknownStatus`）。
    pub fn classify(observer: Side, code: StatusCode) -> Result<Reception> {
        let in_range = RECEPTION_RANGE.contains(&code.0)
            || code == StatusCode::BLACK_WINS
            || code == StatusCode::WHITE_WINS;
        if !in_range {
            return Err(ProtocolError::BadStatus { code });
        }

        if move_origin(code) == Some(observer) {
            return Err(ProtocolError::WrongSide { code, side: observer });
        }

        RECEPTIONS
            .iter()
            .find(|(side, c, _)| *side == observer && *c == code.0)
            .map(|(_, _, reception)| *reception)
            .ok_or(ProtocolError::UnknownStatus { code })
    }
}

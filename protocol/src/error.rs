//! 错误类型定义

use thiserror::Error;

use crate::piece::Side;
use crate::status::StatusCode;

/// 协议错误类型
///
/// 所有错误对当前会话都是致命的，协议没有重同步机制，不做任何重试。
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化错误
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭（读到 EOF 或在关闭后继续使用）
    #[error("Connection closed")]
    ConnectionClosed,

    /// 行格式错误：过短、状态码非数字或缺少分隔空格
    #[error("Ill-formatted line {line:?}: {reason}")]
    Framing { line: String, reason: &'static str },

    /// 序号不一致，双方已失去同步
    #[error("Synchronization lost: expected serial {expected}, got {actual}")]
    Desync { expected: u32, actual: u32 },

    /// 消息缺少预期的记号
    #[error("Expected {expected} in {text:?}")]
    MissingToken { expected: &'static str, text: String },

    /// 时间/时限文本无法解析
    #[error("Cannot find {what} in message text {text:?}")]
    Format { what: &'static str, text: String },

    /// 握手阶段收到意外状态码
    #[error("Handshake failed at {stage}: unexpected status {code}")]
    Handshake { stage: &'static str, code: StatusCode },

    /// 状态码不在当前调用允许的范围内
    #[error("Bad status code {code}")]
    BadStatus { code: StatusCode },

    /// 状态码只对另一方有效
    #[error("Status code {code} from wrong side (we are {side:?})")]
    WrongSide { code: StatusCode, side: Side },

    /// 状态码通过了范围与阵营检查，但没有对应的处理
    #[error("Unknown status code {code}")]
    UnknownStatus { code: StatusCode },

    /// 会话尚未完成握手
    #[error("Session not initialized")]
    NotInitialized,

    /// 会话已完成握手，不能再次握手
    #[error("Session already initialized")]
    AlreadyInitialized,

    /// 游戏已结束
    #[error("Game is already over")]
    GameOver,
}

impl ProtocolError {
    /// 获取出错的状态码（如果有）
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            ProtocolError::Handshake { code, .. }
            | ProtocolError::BadStatus { code }
            | ProtocolError::WrongSide { code, .. }
            | ProtocolError::UnknownStatus { code } => Some(*code),
            _ => None,
        }
    }
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;

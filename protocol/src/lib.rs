//! 按行文本对局协议的共享库
//!
//! 包含:
//! - 阵营、胜负方、走法、时限等数据结构
//! - 状态码目录与阵营归属表
//! - 消息分帧与走法/时间文本编解码
//! - 传输层抽象 (Connector, LineTransport traits)
//! - 对局记录格式 (JSON)

mod codec;
mod constants;
mod error;
mod message;
mod moves;
mod piece;
mod record;
mod status;
mod transport;

pub use codec::{
    extract_leading_time, extract_leading_time_pair, format_move, format_side_request, parse_move,
};
pub use constants::*;
pub use error::{ProtocolError, Result};
pub use message::{read_message, Message};
pub use moves::{Move, TimeControl, TimeUpdate};
pub use piece::{Side, Winner};
pub use record::{GameMetadata, GameRecord, MoveRecord};
pub use status::{
    expects_ellipsis, move_origin, timed_mover, Ending, Reception, Reply, StatusCode,
    BLACK_MOVE_CODES, MOVE_STATUS_RANGE, RECEPTION_RANGE, TIMED_MOVE_CODES, WHITE_MOVE_CODES,
};
pub use transport::{Connector, LineTransport, TcpConnector, TcpLineTransport};

#[cfg(any(test, feature = "test-util"))]
pub use transport::ScriptedTransport;

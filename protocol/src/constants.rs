//! 协议常量定义

use std::time::Duration;

/// 协议版本标识（握手时发送）
pub const PROTOCOL_VERSION: &str = "0.9";

/// 服务器基础端口，实际端口 = 基础端口 + 逻辑端口偏移
pub const SERVER_BASE_PORT: u16 = 29057;

/// 白方走法的省略号标记
pub const ELLIPSIS: &str = "...";

/// 初始序号
pub const INITIAL_SERIAL: u32 = 1;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);

/// 单行最大长度，超出视为帧错误
pub const MAX_LINE_LEN: usize = 4096;

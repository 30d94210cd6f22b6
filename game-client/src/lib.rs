//! 按行文本对局协议客户端
//!
//! 包含:
//! - 会话状态机（握手、本方走法、对方走法）
//! - 客户端门面（连接生命周期、对局记录）
//! - 客户端配置

pub mod client;
pub mod config;
pub mod session;

pub use client::GameClient;
pub use config::ClientConfig;
pub use session::{Observation, Progress, Session, SessionState};

//! 服务器消息分帧
//!
//! 每行格式：三位十进制状态码 + 一个空格 + 任意文本。

use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::status::StatusCode;
use crate::transport::LineTransport;

/// 一条服务器消息，只在一次读取周期内存在
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub code: StatusCode,
    pub text: String,
}

impl Message {
    /// 解析一行（不含行尾）
    pub fn parse(line: &str) -> Result<Message> {
        let bytes = line.as_bytes();
        if bytes.len() < 4 {
            return Err(framing(line, "short read"));
        }
        if !bytes[..3].iter().all(u8::is_ascii_digit) {
            return Err(framing(line, "ill-formatted response code"));
        }
        if bytes[3] != b' ' {
            return Err(framing(line, "missing separator"));
        }

        let code = bytes[..3]
            .iter()
            .fold(0u16, |acc, b| acc * 10 + u16::from(b - b'0'));

        Ok(Message {
            code: StatusCode(code),
            text: line[4..].to_string(),
        })
    }
}

fn framing(line: &str, reason: &'static str) -> ProtocolError {
    ProtocolError::Framing {
        line: line.to_string(),
        reason,
    }
}

/// 从传输层读取一行并分帧
///
/// 对端关闭连接时返回 [`ProtocolError::ConnectionClosed`]。
pub async fn read_message<T: LineTransport + ?Sized>(transport: &mut T) -> Result<Message> {
    let line = transport
        .read_line()
        .await?
        .ok_or(ProtocolError::ConnectionClosed)?;
    let msg = Message::parse(&line)?;
    debug!(code = %msg.code, text = %msg.text, "received");
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;

    #[test]
    fn test_parse_valid_lines() {
        let msg = Message::parse("351 you are white").unwrap();
        assert_eq!(msg.code, StatusCode(351));
        assert_eq!(msg.text, "you are white");

        let msg = Message::parse("000 ").unwrap();
        assert_eq!(msg.code, StatusCode(0));
        assert_eq!(msg.text, "");

        let msg = Message::parse("101  300 280 ").unwrap();
        assert_eq!(msg.code, StatusCode(101));
        assert_eq!(msg.text, " 300 280 ");
    }

    #[test]
    fn test_parse_recovers_every_code() {
        for code in [0u16, 7, 42, 100, 207, 311, 362, 999] {
            let line = format!("{:03} text {}", code, code);
            let msg = Message::parse(&line).unwrap();
            assert_eq!(msg.code, StatusCode(code));
            assert_eq!(msg.text, format!("text {}", code));
        }
    }

    #[test]
    fn test_parse_short_line() {
        for line in ["", "2", "20", "200"] {
            let err = Message::parse(line).unwrap_err();
            assert!(matches!(err, ProtocolError::Framing { reason: "short read", .. }));
        }
    }

    #[test]
    fn test_parse_non_digit_code() {
        for line in ["2x0 ok", "a00 ok", "20a ok", " 00 ok", "-10 ok"] {
            let err = Message::parse(line).unwrap_err();
            assert!(matches!(err, ProtocolError::Framing { .. }), "{line}");
        }
    }

    #[test]
    fn test_parse_missing_separator() {
        for line in ["2000", "200-ok", "200\tok"] {
            let err = Message::parse(line).unwrap_err();
            assert!(matches!(
                err,
                ProtocolError::Framing { reason: "missing separator", .. }
            ));
        }
    }

    #[tokio::test]
    async fn test_read_message() {
        let mut transport = ScriptedTransport::new(["200 ok"]);
        let msg = read_message(&mut transport).await.unwrap();
        assert_eq!(msg.code, StatusCode::MOVE_ACCEPTED);
        assert_eq!(msg.text, "ok");
    }

    #[tokio::test]
    async fn test_read_message_eof() {
        let mut transport = ScriptedTransport::new(Vec::<String>::new());
        let err = read_message(&mut transport).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ConnectionClosed));
    }
}

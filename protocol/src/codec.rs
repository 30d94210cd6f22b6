//! 走法与时间文本编解码
//!
//! 对方走法的消息文本格式：`<序号> [...] <走法> [剩余秒数]`。
//! 省略号只出现在白方走法前，剩余秒数只随 313/314 出现。

use crate::error::{ProtocolError, Result};
use crate::moves::{Move, TimeUpdate};
use crate::piece::Side;
use crate::status::{expects_ellipsis, timed_mover, StatusCode};
use crate::{ELLIPSIS, PROTOCOL_VERSION};

/// 解析消息文本中的走法
///
/// 序号必须等于 `expected_serial`，否则说明双方已失去同步。
/// 对于 313/314，额外返回刚走棋一方的剩余时间，由调用方按本方阵营归属。
pub fn parse_move(
    text: &str,
    code: StatusCode,
    expected_serial: u32,
) -> Result<(Move, Option<TimeUpdate>)> {
    let mut tokens = text.split_whitespace();

    let serial = tokens
        .next()
        .and_then(|t| t.parse::<u32>().ok())
        .ok_or_else(|| missing("serial number", text))?;
    if serial != expected_serial {
        return Err(ProtocolError::Desync {
            expected: expected_serial,
            actual: serial,
        });
    }

    if expects_ellipsis(code) && tokens.next() != Some(ELLIPSIS) {
        return Err(missing("ellipsis", text));
    }

    let name = tokens.next().ok_or_else(|| missing("move", text))?;
    let mv = Move::new(name);

    let time = match timed_mover(code) {
        Some(mover) => {
            let seconds = tokens
                .next()
                .and_then(|t| t.parse::<u32>().ok())
                .ok_or_else(|| missing("time control", text))?;
            Some(TimeUpdate { mover, seconds })
        }
        None => None,
    };

    Ok((mv, time))
}

fn missing(expected: &'static str, text: &str) -> ProtocolError {
    ProtocolError::MissingToken {
        expected,
        text: text.to_string(),
    }
}

/// 从 `from` 开始查找下一段连续数字，返回 [start, end)
fn digit_run(text: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let start = from + bytes.get(from..)?.iter().position(u8::is_ascii_digit)?;
    let len = bytes[start..].iter().take_while(|b| b.is_ascii_digit()).count();
    Some((start, start + len))
}

fn parse_run(text: &str, run: (usize, usize), what: &'static str) -> Result<u32> {
    text[run.0..run.1].parse().map_err(|_| ProtocolError::Format {
        what,
        text: text.to_string(),
    })
}

/// 提取文本中前两段数字：(白方秒数, 黑方秒数)
pub fn extract_leading_time_pair(text: &str) -> Result<(u32, u32)> {
    let not_found = || ProtocolError::Format {
        what: "time controls",
        text: text.to_string(),
    };

    let white = digit_run(text, 0).ok_or_else(not_found)?;
    let black = digit_run(text, white.1).ok_or_else(not_found)?;

    Ok((
        parse_run(text, white, "time controls")?,
        parse_run(text, black, "time controls")?,
    ))
}

/// 提取文本中第一段数字（秒数）
pub fn extract_leading_time(text: &str) -> Result<u32> {
    let run = digit_run(text, 0).ok_or_else(|| ProtocolError::Format {
        what: "time",
        text: text.to_string(),
    })?;
    parse_run(text, run, "time")
}

/// 组装本方走法行：白方在序号后加省略号
pub fn format_move(serial: u32, side: Side, mv: &Move) -> String {
    match side {
        Side::White => format!("{} {} {}", serial, ELLIPSIS, mv.name()),
        Side::Black => format!("{} {}", serial, mv.name()),
    }
}

/// 组装握手时的阵营请求行
pub fn format_side_request(side: Side) -> String {
    format!("{} player {}", PROTOCOL_VERSION, side.request_token())
}

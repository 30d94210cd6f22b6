//! 对局记录格式
//!
//! 按 JSON 保存一局中双方的走法、剩余时间和结果。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::moves::{Move, TimeControl};
use crate::piece::{Side, Winner};

/// 记录格式版本
pub const RECORD_VERSION: &str = "1.0";

/// 对局元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    /// 服务器地址
    pub server: String,
    /// 本方阵营
    pub side: Side,
    /// 开始时间
    pub started_at: DateTime<Utc>,
    /// 双方时限
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_control: Option<TimeControl>,
    /// 对局结果
    pub result: Option<Winner>,
}

/// 走法记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRecord {
    /// 回合序号
    pub serial: u32,
    /// 走棋方
    pub side: Side,
    /// 走法名称
    pub name: String,
    /// 收发时间
    pub timestamp: DateTime<Utc>,
    /// 走棋后该方剩余秒数
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left: Option<u32>,
}

impl MoveRecord {
    /// 以当前时间创建
    pub fn new(serial: u32, side: Side, mv: &Move) -> Self {
        Self {
            serial,
            side,
            name: mv.name().to_string(),
            timestamp: Utc::now(),
            time_left: None,
        }
    }

    /// 附带剩余时间
    pub fn with_time_left(mut self, seconds: Option<u32>) -> Self {
        self.time_left = seconds;
        self
    }
}

/// 完整的对局记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    /// 版本号
    pub version: String,
    /// 元数据
    pub metadata: GameMetadata,
    /// 走法列表
    pub moves: Vec<MoveRecord>,
}

impl GameRecord {
    /// 创建新的对局记录
    pub fn new(server: impl Into<String>, side: Side, time_control: Option<TimeControl>) -> Self {
        Self {
            version: RECORD_VERSION.to_string(),
            metadata: GameMetadata {
                server: server.into(),
                side,
                started_at: Utc::now(),
                time_control,
                result: None,
            },
            moves: Vec::new(),
        }
    }

    /// 添加走法
    pub fn add_move(&mut self, mv: MoveRecord) {
        self.moves.push(mv);
    }

    /// 设置对局结果
    pub fn set_result(&mut self, winner: Winner) {
        self.metadata.result = Some(winner);
    }

    /// 转换为 JSON 字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// 生成可读的文本棋谱，白方走法与黑方走法按序号成对排列
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        let mut current = None;

        for mv in &self.moves {
            match (mv.side, current) {
                (Side::White, _) => {
                    if current.is_some() {
                        output.push('\n');
                    }
                    output.push_str(&format!("{}. {}", mv.serial, mv.name));
                    current = Some(mv.serial);
                }
                (Side::Black, Some(serial)) if serial == mv.serial => {
                    output.push_str(&format!("  {}", mv.name));
                }
                (Side::Black, _) => {
                    if current.is_some() {
                        output.push('\n');
                    }
                    output.push_str(&format!("{}. ... {}", mv.serial, mv.name));
                    current = Some(mv.serial);
                }
            }
        }
        if current.is_some() {
            output.push('\n');
        }

        if let Some(result) = self.metadata.result {
            output.push_str(&format!("result: {}\n", result));
        }

        output
    }
}

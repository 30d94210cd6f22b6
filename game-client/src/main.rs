use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use game_client::{ClientConfig, GameClient, Progress};
use protocol::{GameRecord, LineTransport, Move, Side, TcpConnector};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 按行文本对局协议客户端
///
/// 从标准输入读取本方走法，输出对方走法、时钟和结果。
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// 服务器主机名
    host: Option<String>,

    /// 逻辑端口偏移
    #[arg(short, long)]
    server: Option<u16>,

    /// 请求的阵营 (white/black)
    #[arg(long, value_parser = parse_side)]
    side: Option<Side>,

    /// 配置文件路径
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// 对局记录保存路径
    #[arg(long, value_name = "PATH")]
    record: Option<PathBuf>,
}

fn parse_side(s: &str) -> Result<Side, String> {
    Side::from_token(s).ok_or_else(|| format!("unknown side {:?}, expected white or black", s))
}

impl Args {
    fn apply(self, config: &mut ClientConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(server) = self.server {
            config.server = server;
        }
        if let Some(side) = self.side {
            config.side = side;
        }
        if let Some(record) = self.record {
            config.record_path = Some(record);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志（输出到 stderr，stdout 留给对局内容）
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("game_client=info".parse()?))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load(),
    };
    args.apply(&mut config);

    let connector = TcpConnector::default();
    let mut client = GameClient::connect(&connector, &config.host, config.server, config.side)
        .await
        .with_context(|| format!("Failed to join game on {}", config.host))?;

    let outcome = play(&mut client).await;
    wrap_up(&mut client, outcome, config.record_path.as_deref()).await
}

/// 关闭连接并保存对局记录
///
/// 关闭失败只记录日志；对局本身的错误优先于记录保存的错误返回。
async fn wrap_up<T: LineTransport>(
    client: &mut GameClient<T>,
    outcome: Result<()>,
    record_path: Option<&Path>,
) -> Result<()> {
    if let Err(e) = client.close().await {
        warn!("Failed to close connection: {}", e);
    }

    let saved = match (record_path, client.record()) {
        (Some(path), Some(record)) => save_record(path, record),
        _ => Ok(()),
    };
    if let (Err(play_err), Err(save_err)) = (&outcome, &saved) {
        warn!("{:#} (while handling: {:#})", save_err, play_err);
    }
    outcome.and(saved)
}

fn save_record(path: &Path, record: &GameRecord) -> Result<()> {
    let json = record.to_json().context("Failed to serialize record")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write record {:?}", path))?;
    info!("Record saved to {:?}", path);
    Ok(())
}

/// 轮流提交本方走法和接收对方走法，直到对局结束
async fn play<T: LineTransport>(client: &mut GameClient<T>) -> Result<()> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut my_turn = client.side() == Some(Side::White);

    loop {
        let progress = if my_turn {
            print!("{}> ", client.serial());
            std::io::stdout().flush()?;

            let Some(line) = input.next_line().await? else {
                bail!("Input closed before the game ended");
            };
            let name = line.trim();
            if name.is_empty() {
                continue;
            }
            client.make_move(&Move::new(name)).await?
        } else {
            let seen = client.record().map_or(0, |r| r.moves.len());
            let progress = client.get_move().await?;
            if let Some(mv) = client.record().and_then(|r| r.moves.get(seen)) {
                println!("{}: {}", mv.side, mv.name);
            }
            progress
        };

        if let (Some(mine), Some(theirs)) = (client.my_time(), client.opp_time()) {
            println!("clock: {}s / {}s", mine, theirs);
        }

        if progress == Progress::Done {
            if let Some(winner) = client.winner() {
                println!("winner: {}", winner);
            }
            if let Some(record) = client.record() {
                print!("{}", record.to_text());
            }
            return Ok(());
        }
        my_turn = !my_turn;
    }
}

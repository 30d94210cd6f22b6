//! 客户端门面
//!
//! 负责握手和走法交换的收发，状态解释委托给 [`Session`]。
//! 连接在对局结束时关闭且只关闭一次；普通错误不会自动关闭，
//! 调用方应在收到错误后显式调用 [`GameClient::close`]。

use protocol::{
    format_side_request, read_message, Connector, GameRecord, LineTransport, Message, Move,
    MoveRecord, ProtocolError, Result, Side, StatusCode, TimeControl, Winner,
};
use tracing::{debug, info, warn};

use crate::session::{Progress, Session, SessionState};

/// 对局客户端
pub struct GameClient<T: LineTransport> {
    transport: Option<T>,
    session: Session,
    record: Option<GameRecord>,
    server: String,
}

impl<T: LineTransport> GameClient<T> {
    /// 以已建立的连接创建，尚未握手
    pub fn new(transport: T) -> Self {
        let server = transport
            .peer_addr()
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            transport: Some(transport),
            session: Session::new(),
            record: None,
            server,
        }
    }

    /// 连接服务器并完成握手
    ///
    /// 握手失败时连接在返回前关闭。
    pub async fn connect<C>(connector: &C, host: &str, server: u16, side: Side) -> Result<Self>
    where
        C: Connector<Conn = T>,
    {
        info!("Connecting to {} (server {}) as {}", host, server, side);
        let transport = connector.connect(host, server).await?;
        let mut client = Self::new(transport);

        if let Err(e) = client.handshake(side).await {
            if let Err(close_err) = client.close().await {
                warn!("Failed to close after handshake error: {}", close_err);
            }
            return Err(e);
        }
        Ok(client)
    }

    /// 握手：问候 → 请求阵营 → (时限) → 确认
    ///
    /// 每个连接只能尝试一次，失败后再次调用返回 `AlreadyInitialized`。
    pub async fn handshake(&mut self, side: Side) -> Result<()> {
        self.session.begin_handshake()?;

        let greeting = self.read().await?;
        self.session.check_greeting(&greeting)?;

        let request = format_side_request(side);
        self.transport()?.send_line(&request).await?;

        let reply = self.read().await?;
        let time_control = self.session.accept_side_reply(&reply)?;

        let confirmation = self.read().await?;
        self.session.confirm_side(side, time_control, &confirmation)?;

        match self.session.time_control() {
            Some(tc) => info!("Playing {} with time controls {}", side, tc),
            None => info!("Playing {} without time controls", side),
        }
        self.record = Some(GameRecord::new(
            self.server.clone(),
            side,
            self.session.time_control(),
        ));
        Ok(())
    }

    /// 提交本方走法
    ///
    /// 返回 `Done` 时对局已结束且连接已关闭。
    pub async fn make_move(&mut self, mv: &Move) -> Result<Progress> {
        let side = self.session.active_side()?;
        let serial = self.session.serial();

        let line = self.session.outgoing_move(mv)?;
        self.transport()?.send_line(&line).await?;

        let reply = self.read().await?;
        let progress = self.session.on_move_reply(&reply)?;

        let time_left = if reply.code == StatusCode::MOVE_ACCEPTED_TIMED {
            self.session.my_time()
        } else {
            None
        };
        self.record_move(MoveRecord::new(serial, side, mv).with_time_left(time_left));

        if progress == Progress::Done {
            self.finish().await;
            return Ok(Progress::Done);
        }

        let status = self.read().await?;
        self.session.on_move_status(&status)
    }

    /// 等待并接收对方走法
    ///
    /// 返回 `Done` 时对局已结束且连接已关闭。
    pub async fn get_move(&mut self) -> Result<Progress> {
        let side = self.session.active_side()?;

        let msg = self.read().await?;
        let observation = self.session.on_opponent_message(&msg)?;

        if let Some(mv) = &observation.mv {
            debug!("Opponent played {}", mv);
            let time_left = observation.time.map(|t| t.seconds);
            let record = MoveRecord::new(self.session.serial(), side.opponent(), mv)
                .with_time_left(time_left);
            self.record_move(record);
        }

        if observation.progress == Progress::Done {
            self.finish().await;
        }
        Ok(observation.progress)
    }

    /// 关闭连接，重复调用为空操作
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut transport) = self.transport.take() {
            transport.close().await?;
            debug!("Connection to {} released", self.server);
        }
        Ok(())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn side(&self) -> Option<Side> {
        self.session.side()
    }

    pub fn winner(&self) -> Option<Winner> {
        self.session.winner()
    }

    pub fn last_move(&self) -> Option<&Move> {
        self.session.last_move()
    }

    pub fn time_control(&self) -> Option<TimeControl> {
        self.session.time_control()
    }

    pub fn my_time(&self) -> Option<u32> {
        self.session.my_time()
    }

    pub fn opp_time(&self) -> Option<u32> {
        self.session.opp_time()
    }

    pub fn serial(&self) -> u32 {
        self.session.serial()
    }

    /// 对局记录（握手后可用）
    pub fn record(&self) -> Option<&GameRecord> {
        self.record.as_ref()
    }

    /// 连接是否仍然打开
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    fn transport(&mut self) -> Result<&mut T> {
        self.transport.as_mut().ok_or(ProtocolError::ConnectionClosed)
    }

    async fn read(&mut self) -> Result<Message> {
        read_message(self.transport()?).await
    }

    fn record_move(&mut self, mv: MoveRecord) {
        if let Some(record) = self.record.as_mut() {
            record.add_move(mv);
        }
    }

    /// 进入终态：记录结果并关闭连接
    async fn finish(&mut self) {
        let Some(winner) = self.session.winner() else {
            return;
        };
        info!("Game over, winner: {}", winner);
        if let Some(record) = self.record.as_mut() {
            record.set_result(winner);
        }
        if let Err(e) = self.close().await {
            warn!("Failed to close connection: {}", e);
        }
    }
}

impl<T: LineTransport> Drop for GameClient<T> {
    fn drop(&mut self) {
        // 连接随 transport 一起释放
        if self.transport.is_some() {
            warn!("GameClient dropped without close(), releasing connection to {}", self.server);
        }
    }
}

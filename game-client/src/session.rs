//! 会话状态机
//!
//! `Uninitialized → Active(side) → Done(winner)`，`Done` 为终态。
//! 本模块只解释消息、维护状态，不做 I/O；收发由 [`crate::GameClient`] 负责。

use protocol::{
    extract_leading_time, extract_leading_time_pair, format_move, parse_move, Message, Move,
    ProtocolError, Reception, Reply, Result, Side, StatusCode, TimeControl, TimeUpdate, Winner,
    INITIAL_SERIAL, MOVE_STATUS_RANGE,
};

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 尚未握手
    Uninitialized,
    /// 对局进行中
    Active(Side),
    /// 对局结束
    Done(Winner),
}

/// 一次走法交换后的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Continue,
    Done,
}

/// 收到对方消息后的观察结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub progress: Progress,
    /// 对方走法（361/362 不带走法）
    pub mv: Option<Move>,
    pub time: Option<TimeUpdate>,
}

/// 会话
#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    side: Option<Side>,
    serial: u32,
    time_control: Option<TimeControl>,
    my_time: Option<u32>,
    opp_time: Option<u32>,
    last_move: Option<Move>,
    handshake_started: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Uninitialized,
            side: None,
            serial: INITIAL_SERIAL,
            time_control: None,
            my_time: None,
            opp_time: None,
            last_move: None,
            handshake_started: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 本方阵营，握手后不变
    pub fn side(&self) -> Option<Side> {
        self.side
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn winner(&self) -> Option<Winner> {
        match self.state {
            SessionState::Done(winner) => Some(winner),
            _ => None,
        }
    }

    pub fn time_control(&self) -> Option<TimeControl> {
        self.time_control
    }

    pub fn my_time(&self) -> Option<u32> {
        self.my_time
    }

    pub fn opp_time(&self) -> Option<u32> {
        self.opp_time
    }

    /// 最近一次解析出的对方走法
    pub fn last_move(&self) -> Option<&Move> {
        self.last_move.as_ref()
    }

    /// 当前允许走法交换的阵营
    pub fn active_side(&self) -> Result<Side> {
        match self.state {
            SessionState::Uninitialized => Err(ProtocolError::NotInitialized),
            SessionState::Active(side) => Ok(side),
            SessionState::Done(_) => Err(ProtocolError::GameOver),
        }
    }

    // ------------------------------------------------------------------
    // 握手
    // ------------------------------------------------------------------

    pub fn ensure_uninitialized(&self) -> Result<()> {
        match self.state {
            SessionState::Uninitialized => Ok(()),
            _ => Err(ProtocolError::AlreadyInitialized),
        }
    }

    /// 握手只允许尝试一次，失败后的连接不能再次握手
    pub fn begin_handshake(&mut self) -> Result<()> {
        self.ensure_uninitialized()?;
        if self.handshake_started {
            return Err(ProtocolError::AlreadyInitialized);
        }
        self.handshake_started = true;
        Ok(())
    }

    /// 第一步：问候码必须为 000
    pub fn check_greeting(&self, msg: &Message) -> Result<()> {
        self.ensure_uninitialized()?;
        if msg.code != StatusCode::GREETING {
            return Err(ProtocolError::Handshake {
                stage: "greeting",
                code: msg.code,
            });
        }
        Ok(())
    }

    /// 第二步：阵营请求的应答，101 时文本携带双方时限
    ///
    /// 只解析，不修改会话；时限在确认成功后由 [`Session::confirm_side`] 写入。
    pub fn accept_side_reply(&self, msg: &Message) -> Result<Option<TimeControl>> {
        self.ensure_uninitialized()?;
        match msg.code {
            StatusCode::SIDE_ACCEPTED => Ok(None),
            StatusCode::SIDE_ACCEPTED_TIMED => {
                let (white_seconds, black_seconds) = extract_leading_time_pair(&msg.text)?;
                Ok(Some(TimeControl {
                    white_seconds,
                    black_seconds,
                }))
            }
            code => Err(ProtocolError::Handshake {
                stage: "side request",
                code,
            }),
        }
    }

    /// 第三步：确认码必须与请求的阵营一致，成功后进入 Active
    ///
    /// 无论请求哪一方，`my_time` 取白方时限、`opp_time` 取黑方时限，
    /// 黑方的两个时钟因此是对调的。
    pub fn confirm_side(
        &mut self,
        side: Side,
        time_control: Option<TimeControl>,
        msg: &Message,
    ) -> Result<()> {
        self.ensure_uninitialized()?;
        if msg.code != StatusCode::confirmation_for(side) {
            return Err(ProtocolError::Handshake {
                stage: "confirmation",
                code: msg.code,
            });
        }
        if let Some(tc) = time_control {
            self.time_control = Some(tc);
            self.my_time = Some(tc.white_seconds);
            self.opp_time = Some(tc.black_seconds);
        }
        self.side = Some(side);
        self.state = SessionState::Active(side);
        Ok(())
    }

    // ------------------------------------------------------------------
    // 本方走法
    // ------------------------------------------------------------------

    /// 组装本方走法行
    pub fn outgoing_move(&self, mv: &Move) -> Result<String> {
        let side = self.active_side()?;
        Ok(format_move(self.serial, side, mv))
    }

    /// 走法提交后的第一条应答
    pub fn on_move_reply(&mut self, msg: &Message) -> Result<Progress> {
        let side = self.active_side()?;
        match Reply::from_code(msg.code) {
            Some(Reply::Ended(ending)) => {
                self.state = SessionState::Done(ending.winner(side));
                Ok(Progress::Done)
            }
            Some(Reply::Accepted) => Ok(Progress::Continue),
            Some(Reply::AcceptedWithTime) => {
                self.my_time = Some(extract_leading_time(&msg.text)?);
                Ok(Progress::Continue)
            }
            None => Err(ProtocolError::BadStatus { code: msg.code }),
        }
    }

    /// 走法提交后的第二条状态消息，成功后序号加一
    pub fn on_move_status(&mut self, msg: &Message) -> Result<Progress> {
        self.active_side()?;
        if !MOVE_STATUS_RANGE.contains(&msg.code.value()) {
            return Err(ProtocolError::BadStatus { code: msg.code });
        }
        self.serial += 1;
        Ok(Progress::Continue)
    }

    // ------------------------------------------------------------------
    // 对方走法
    // ------------------------------------------------------------------

    /// 解释等待对方走法时收到的消息
    pub fn on_opponent_message(&mut self, msg: &Message) -> Result<Observation> {
        let side = self.active_side()?;
        let reception = Reception::classify(side, msg.code)?;

        let (mv, time) = if reception.carries_move {
            let (mv, time) = parse_move(&msg.text, msg.code, self.serial)?;
            if let Some(update) = time {
                self.apply_time(side, update);
            }
            self.last_move = Some(mv.clone());
            (Some(mv), time)
        } else {
            (None, None)
        };

        let progress = match reception.ending {
            Some(winner) => {
                self.state = SessionState::Done(winner);
                Progress::Done
            }
            None => Progress::Continue,
        };

        Ok(Observation { progress, mv, time })
    }

    fn apply_time(&mut self, side: Side, update: TimeUpdate) {
        if update.mover == side {
            self.my_time = Some(update.seconds);
        } else {
            self.opp_time = Some(update.seconds);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(line: &str) -> Message {
        Message::parse(line).unwrap()
    }

    fn active(side: Side) -> Session {
        let mut session = Session::new();
        session.begin_handshake().unwrap();
        session.check_greeting(&msg("000 hello")).unwrap();
        let time_control = session.accept_side_reply(&msg("100 ok")).unwrap();
        let confirmation = format!("{} ok", StatusCode::confirmation_for(side));
        session.confirm_side(side, time_control, &msg(&confirmation)).unwrap();
        session
    }

    #[test]
    fn test_initial_state() {
        let session = Session::new();
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert_eq!(session.serial(), 1);
        assert_eq!(session.side(), None);
        assert_eq!(session.winner(), None);
        assert!(matches!(session.active_side(), Err(ProtocolError::NotInitialized)));
        assert!(matches!(
            session.outgoing_move(&Move::new("e4")),
            Err(ProtocolError::NotInitialized)
        ));
    }

    #[test]
    fn test_handshake_without_time_controls() {
        let session = active(Side::Black);
        assert_eq!(session.state(), SessionState::Active(Side::Black));
        assert_eq!(session.side(), Some(Side::Black));
        assert_eq!(session.time_control(), None);
        assert_eq!(session.my_time(), None);
    }

    #[test]
    fn test_bad_greeting() {
        let session = Session::new();
        let err = session.check_greeting(&msg("100 hi")).unwrap_err();
        assert!(matches!(err, ProtocolError::Handshake { stage: "greeting", .. }));
    }

    #[test]
    fn test_side_rejected() {
        let session = Session::new();
        let err = session.accept_side_reply(&msg("102 taken")).unwrap_err();
        assert!(matches!(err, ProtocolError::Handshake { stage: "side request", .. }));
    }

    #[test]
    fn test_confirmation_must_match_side() {
        let mut session = Session::new();
        let err = session.confirm_side(Side::White, None, &msg("352 black")).unwrap_err();
        assert!(matches!(err, ProtocolError::Handshake { stage: "confirmation", .. }));
        assert_eq!(session.state(), SessionState::Uninitialized);

        let err = session.confirm_side(Side::Black, None, &msg("351 white")).unwrap_err();
        assert!(matches!(err, ProtocolError::Handshake { .. }));
    }

    #[test]
    fn test_time_controls_as_white() {
        let mut session = Session::new();
        let time_control = session.accept_side_reply(&msg("101 300 280")).unwrap();
        session.confirm_side(Side::White, time_control, &msg("351 ok")).unwrap();
        assert_eq!(
            session.time_control(),
            Some(TimeControl { white_seconds: 300, black_seconds: 280 })
        );
        assert_eq!(session.my_time(), Some(300));
        assert_eq!(session.opp_time(), Some(280));
    }

    #[test]
    fn test_time_controls_as_black_keep_white_first_mapping() {
        let mut session = Session::new();
        let time_control = session.accept_side_reply(&msg("101 300 280")).unwrap();
        session.confirm_side(Side::Black, time_control, &msg("352 ok")).unwrap();
        assert_eq!(session.my_time(), Some(300));
        assert_eq!(session.opp_time(), Some(280));
    }

    #[test]
    fn test_time_controls_unparseable() {
        let session = Session::new();
        let err = session.accept_side_reply(&msg("101 clocks soon")).unwrap_err();
        assert!(matches!(err, ProtocolError::Format { .. }));
    }

    #[test]
    fn test_second_handshake_rejected() {
        let mut session = active(Side::White);
        assert!(matches!(
            session.check_greeting(&msg("000 hi")),
            Err(ProtocolError::AlreadyInitialized)
        ));
        assert!(matches!(
            session.confirm_side(Side::Black, None, &msg("352 ok")),
            Err(ProtocolError::AlreadyInitialized)
        ));
        assert!(matches!(
            session.begin_handshake(),
            Err(ProtocolError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_failed_confirmation_leaves_no_clocks() {
        let mut session = Session::new();
        session.begin_handshake().unwrap();
        session.check_greeting(&msg("000 hello")).unwrap();
        let time_control = session.accept_side_reply(&msg("101 300 280")).unwrap();
        assert_eq!(
            time_control,
            Some(TimeControl { white_seconds: 300, black_seconds: 280 })
        );

        let err = session
            .confirm_side(Side::White, time_control, &msg("352 black"))
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Handshake { stage: "confirmation", .. }));
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert_eq!(session.side(), None);
        assert_eq!(session.time_control(), None);
        assert_eq!(session.my_time(), None);
        assert_eq!(session.opp_time(), None);

        assert!(matches!(
            session.begin_handshake(),
            Err(ProtocolError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_outgoing_move() {
        assert_eq!(active(Side::White).outgoing_move(&Move::new("e4")).unwrap(), "1 ... e4");
        assert_eq!(active(Side::Black).outgoing_move(&Move::new("e5")).unwrap(), "1 e5");
    }

    #[test]
    fn test_move_accepted_then_status() {
        let mut session = active(Side::White);
        assert_eq!(session.on_move_reply(&msg("200 ok")).unwrap(), Progress::Continue);
        assert_eq!(session.on_move_status(&msg("311 waiting")).unwrap(), Progress::Continue);
        assert_eq!(session.serial(), 2);
    }

    #[test]
    fn test_move_accepted_with_time() {
        let mut session = active(Side::Black);
        session.on_move_reply(&msg("207 time left: 042s")).unwrap();
        assert_eq!(session.my_time(), Some(42));
    }

    #[test]
    fn test_move_reply_endings() {
        let cases = [
            (Side::White, "201", Winner::White),
            (Side::White, "202", Winner::Black),
            (Side::White, "203", Winner::Other),
            (Side::Black, "201", Winner::Black),
            (Side::Black, "202", Winner::White),
            (Side::Black, "203", Winner::Other),
        ];
        for (side, code, winner) in cases {
            let mut session = active(side);
            let progress = session.on_move_reply(&msg(&format!("{} over", code))).unwrap();
            assert_eq!(progress, Progress::Done);
            assert_eq!(session.winner(), Some(winner));
            assert_eq!(session.state(), SessionState::Done(winner));
            assert_eq!(session.side(), Some(side));
            assert!(matches!(session.active_side(), Err(ProtocolError::GameOver)));
        }
    }

    #[test]
    fn test_move_reply_bad_status() {
        let mut session = active(Side::White);
        let err = session.on_move_reply(&msg("311 what")).unwrap_err();
        assert!(matches!(err, ProtocolError::BadStatus { code: StatusCode(311) }));
    }

    #[test]
    fn test_move_status_out_of_range() {
        for code in ["310", "315", "200"] {
            let mut session = active(Side::White);
            let err = session.on_move_status(&msg(&format!("{} x", code))).unwrap_err();
            assert!(matches!(err, ProtocolError::BadStatus { .. }));
            assert_eq!(session.serial(), 1);
        }
    }

    #[test]
    fn test_role_exclusivity_312() {
        let mut session = active(Side::White);
        let err = session.on_opponent_message(&msg("312 1 ... e4")).unwrap_err();
        assert!(matches!(err, ProtocolError::WrongSide { side: Side::White, .. }));

        let mut session = active(Side::Black);
        let observation = session.on_opponent_message(&msg("312 1 ... e4")).unwrap();
        assert_eq!(observation.progress, Progress::Continue);
        assert_eq!(observation.mv, Some(Move::new("e4")));
        assert_eq!(session.last_move(), Some(&Move::new("e4")));
    }

    #[test]
    fn test_opponent_move_desync() {
        let mut session = active(Side::White);
        let err = session.on_opponent_message(&msg("311 2 e5")).unwrap_err();
        assert!(matches!(err, ProtocolError::Desync { expected: 1, actual: 2 }));
        assert_eq!(session.state(), SessionState::Active(Side::White));
    }

    #[test]
    fn test_opponent_timed_move_goes_to_opp_time() {
        let mut session = active(Side::White);
        let observation = session.on_opponent_message(&msg("313 1 e5 250")).unwrap();
        assert_eq!(observation.time, Some(TimeUpdate { mover: Side::Black, seconds: 250 }));
        assert_eq!(session.opp_time(), Some(250));
        assert_eq!(session.my_time(), None);
    }

    #[test]
    fn test_terminal_receptions() {
        let cases = [
            (Side::White, "321 1 Qxf7#", Winner::Black, true),
            (Side::White, "322 1 e5", Winner::White, true),
            (Side::White, "325 1 e5", Winner::Other, true),
            (Side::White, "361 resigned", Winner::Black, false),
            (Side::White, "362 flag fell", Winner::White, false),
            (Side::Black, "323 1 ... Qxf7#", Winner::White, true),
            (Side::Black, "324 1 ... e4", Winner::Black, true),
            (Side::Black, "326 1 ... e4", Winner::Other, true),
            (Side::Black, "361 flag fell", Winner::Black, false),
            (Side::Black, "362 resigned", Winner::White, false),
        ];
        for (side, line, winner, carries_move) in cases {
            let mut session = active(side);
            let observation = session.on_opponent_message(&msg(line)).unwrap();
            assert_eq!(observation.progress, Progress::Done, "{line}");
            assert_eq!(observation.mv.is_some(), carries_move, "{line}");
            assert_eq!(session.winner(), Some(winner), "{line}");
            assert!(matches!(
                session.on_opponent_message(&msg(line)),
                Err(ProtocolError::GameOver)
            ));
            assert!(matches!(
                session.outgoing_move(&Move::new("e4")),
                Err(ProtocolError::GameOver)
            ));
        }
    }

    #[test]
    fn test_unknown_status_in_range() {
        let mut session = active(Side::Black);
        let err = session.on_opponent_message(&msg("317 1 e4")).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownStatus { code: StatusCode(317) }));
    }

    #[test]
    fn test_opponent_message_before_handshake() {
        let mut session = Session::new();
        assert!(matches!(
            session.on_opponent_message(&msg("311 1 e4")),
            Err(ProtocolError::NotInitialized)
        ));
    }
}

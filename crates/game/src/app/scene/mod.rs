//! The single game screen: wires the session, the leaderboard client and the
//! personal best to the engine's input and frame callbacks.

mod hud;

use std::time::{Duration, Instant};

use engine::{Canvas, InputEvent, Key, Scene, SceneCommand};
use tracing::{info, warn};

use super::best_score::{brag_line, PersonalBest};
use super::leaderboard::{
    BoardStatus, LeaderboardClient, LeaderboardResponse, Medal, NewScore, Nickname, Rank,
    RankingBoard, RegionCode, Scope, DEFAULT_BOARD_LIMIT, NICKNAME_MAX_CHARS,
};
use super::session::{Session, SessionEvent, SessionState};

/// How often the scene wakes to collect leaderboard responses while it is
/// waiting on the worker or showing live board updates.
const IO_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Submission {
    Editing { error: Option<String> },
    Pending,
    Submitted(Rank),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Connection {
    Connecting,
    Online(&'static str),
    Offline(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttemptSummary {
    brag: String,
    new_best: bool,
}

pub(crate) struct StillnessScene {
    session: Session,
    leaderboard: LeaderboardClient,
    personal_best: PersonalBest,
    board: RankingBoard,
    board_visible: bool,
    region: RegionCode,
    nickname_input: String,
    submission: Submission,
    connection: Connection,
    last_attempt: Option<AttemptSummary>,
    last_update: Option<Instant>,
    session_events: Vec<SessionEvent>,
    responses: Vec<LeaderboardResponse>,
}

impl StillnessScene {
    pub(crate) fn new(
        session: Session,
        leaderboard: LeaderboardClient,
        personal_best: PersonalBest,
        region: RegionCode,
        nickname: String,
    ) -> Self {
        Self {
            session,
            leaderboard,
            personal_best,
            board: RankingBoard::new(Scope::World, DEFAULT_BOARD_LIMIT),
            board_visible: false,
            region,
            nickname_input: nickname.chars().take(NICKNAME_MAX_CHARS).collect(),
            submission: Submission::Editing { error: None },
            connection: Connection::Connecting,
            last_attempt: None,
            last_update: None,
            session_events: Vec::new(),
            responses: Vec::new(),
        }
    }

    fn start_attempt(&mut self, now: Instant) {
        if let Err(error) = self.session.start(now) {
            warn!(error = %error, "start_rejected");
        }
    }

    fn handle_idle_input(&mut self, event: InputEvent, now: Instant) -> SceneCommand {
        match event {
            InputEvent::KeyPressed(Key::Space | Key::Enter) | InputEvent::PointerPressed => {
                self.start_attempt(now);
            }
            InputEvent::KeyPressed(Key::Character('l' | 'L')) => self.toggle_board(),
            InputEvent::KeyPressed(Key::Character('f' | 'F')) => self.toggle_scope(),
            InputEvent::KeyPressed(Key::Escape) => {
                info!(reason = "escape", "quit_requested");
                return SceneCommand::Quit;
            }
            _ => {}
        }
        SceneCommand::None
    }

    fn handle_result_input(&mut self, event: InputEvent, now: Instant) {
        match event {
            InputEvent::KeyPressed(Key::Enter) => match self.submission {
                Submission::Submitted(_) => self.start_attempt(now),
                Submission::Pending => {}
                Submission::Editing { .. } | Submission::Failed(_) => self.submit_score(),
            },
            InputEvent::KeyPressed(Key::Escape) => self.session.reset(),
            InputEvent::KeyPressed(Key::Tab) => self.toggle_board(),
            InputEvent::KeyPressed(Key::Backspace) if self.accepts_nickname_edits() => {
                self.nickname_input.pop();
                self.submission = Submission::Editing { error: None };
            }
            InputEvent::KeyPressed(Key::Space) if self.accepts_nickname_edits() => {
                self.push_nickname_char(' ');
            }
            InputEvent::KeyPressed(Key::Character(ch)) if self.accepts_nickname_edits() => {
                self.push_nickname_char(ch);
            }
            _ => {}
        }
    }

    fn handle_paused_input(&mut self, event: InputEvent, now: Instant) {
        match event {
            InputEvent::KeyPressed(Key::Space | Key::Enter) => {
                if let Err(error) = self.session.resume(now) {
                    warn!(error = %error, "resume_rejected");
                }
            }
            InputEvent::KeyPressed(Key::Escape) => self.session.reset(),
            _ => {}
        }
    }

    fn accepts_nickname_edits(&self) -> bool {
        matches!(
            self.submission,
            Submission::Editing { .. } | Submission::Failed(_)
        )
    }

    fn push_nickname_char(&mut self, ch: char) {
        if ch.is_control() || self.nickname_input.chars().count() >= NICKNAME_MAX_CHARS {
            return;
        }
        if ch == ' ' && self.nickname_input.is_empty() {
            return;
        }
        self.nickname_input.push(ch);
        self.submission = Submission::Editing { error: None };
    }

    fn submit_score(&mut self) {
        let Some(disqualification) = self.session.disqualification() else {
            return;
        };
        let nickname = match Nickname::parse(&self.nickname_input) {
            Ok(nickname) => nickname,
            Err(error) => {
                self.submission = Submission::Editing {
                    error: Some(error.to_string()),
                };
                return;
            }
        };
        let score = NewScore {
            nickname,
            duration_ms: disqualification.elapsed.as_millis() as u64,
            region: self.region,
        };
        self.submission = match self.leaderboard.submit(score) {
            Ok(()) => Submission::Pending,
            Err(error) => Submission::Failed(error.to_string()),
        };
    }

    fn toggle_board(&mut self) {
        self.board_visible = !self.board_visible;
        if self.board_visible {
            self.refresh_board();
        }
    }

    fn toggle_scope(&mut self) {
        let next = match self.board.scope() {
            Scope::World => Scope::Region(self.region),
            Scope::Region(_) => Scope::World,
        };
        if self.board.set_scope(next) && self.board_visible {
            self.refresh_board();
        }
    }

    fn refresh_board(&mut self) {
        match self
            .leaderboard
            .query_top(self.board.limit(), self.board.scope())
        {
            Ok(()) => self.board.begin_loading(),
            Err(error) => self.board.fail(self.board.scope(), error.to_string()),
        }
    }

    fn process_session_events(&mut self) {
        let mut events = std::mem::take(&mut self.session_events);
        self.session.drain_events(&mut events);
        for event in events.drain(..) {
            match event {
                SessionEvent::Started => {
                    self.last_attempt = None;
                    self.submission = Submission::Editing { error: None };
                }
                SessionEvent::Disqualified(disqualification) => {
                    let new_best = match self.personal_best.record(disqualification.elapsed) {
                        Ok(improved) => improved,
                        Err(error) => {
                            warn!(error = %error, "personal_best_write_failed");
                            false
                        }
                    };
                    let brag = brag_line(disqualification.elapsed);
                    info!(brag = %brag, new_best, "attempt_finished");
                    self.last_attempt = Some(AttemptSummary { brag, new_best });
                }
                SessionEvent::Reset => {
                    self.last_attempt = None;
                }
                SessionEvent::Paused { .. }
                | SessionEvent::Resumed { .. }
                | SessionEvent::ChallengeOpened { .. }
                | SessionEvent::ChallengeCountdown { .. }
                | SessionEvent::ChallengeCleared => {}
            }
        }
        self.session_events = events;
    }

    fn process_responses(&mut self) {
        let mut responses = std::mem::take(&mut self.responses);
        self.leaderboard.drain_responses(&mut responses);
        for response in responses.drain(..) {
            match response {
                LeaderboardResponse::Connected { store } => {
                    self.connection = Connection::Online(store);
                }
                LeaderboardResponse::ConnectFailed(error) => {
                    self.connection = Connection::Offline(error.to_string());
                }
                LeaderboardResponse::Submitted { rank, duration_ms } => {
                    if let Some(medal) = Medal::for_rank(rank.0 as usize) {
                        info!(rank = rank.0, duration_ms, medal = medal.emoji(), "podium_finish");
                    }
                    self.submission = Submission::Submitted(rank);
                }
                LeaderboardResponse::SubmitFailed(error) => {
                    self.submission = Submission::Failed(error.to_string());
                }
                LeaderboardResponse::Top { scope, records } => {
                    self.board.replace(scope, records);
                }
                LeaderboardResponse::QueryFailed { scope, error } => {
                    self.board.fail(scope, error.to_string());
                }
                LeaderboardResponse::Inserted(record) => {
                    self.board.apply_insert(record);
                }
            }
        }
        self.responses = responses;
    }

    fn awaiting_worker(&self) -> bool {
        self.connection == Connection::Connecting
            || self.submission == Submission::Pending
            || self.board_visible
            || *self.board.status() == BoardStatus::Loading
    }
}

impl Scene for StillnessScene {
    fn load(&mut self, now: Instant) {
        self.last_update = Some(now);
        info!(
            region = %self.region,
            flag = %self.region.flag(),
            personal_best = %self.personal_best.display(),
            "scene_loaded"
        );
    }

    fn handle_input(&mut self, event: InputEvent, now: Instant) -> SceneCommand {
        let command = match self.session.state() {
            SessionState::Active => {
                self.session.handle_input(&event, now);
                SceneCommand::None
            }
            SessionState::Idle => self.handle_idle_input(event, now),
            SessionState::Disqualified => {
                self.handle_result_input(event, now);
                SceneCommand::None
            }
            SessionState::Paused => {
                self.handle_paused_input(event, now);
                SceneCommand::None
            }
        };
        self.process_session_events();
        command
    }

    fn update(&mut self, now: Instant) -> SceneCommand {
        self.last_update = Some(now);
        self.session.poll(now);
        self.process_session_events();
        self.process_responses();
        SceneCommand::None
    }

    fn render(&mut self, canvas: &mut Canvas<'_>, now: Instant) {
        self.draw(canvas, now);
    }

    fn unload(&mut self) {
        info!(state = %self.session.state(), "scene_unloaded");
    }

    fn wants_continuous_frames(&self) -> bool {
        self.session.state() == SessionState::Active
    }

    fn next_deadline(&self) -> Option<Instant> {
        let io_wakeup = self
            .last_update
            .filter(|_| self.awaiting_worker())
            .map(|at| at + IO_POLL_INTERVAL);
        match (self.session.next_deadline(), io_wakeup) {
            (Some(session), Some(io)) => Some(session.min(io)),
            (session, io) => session.or(io),
        }
    }

    fn title(&self) -> Option<String> {
        Some(format!("Stay Still ({})", self.session.state()))
    }
}

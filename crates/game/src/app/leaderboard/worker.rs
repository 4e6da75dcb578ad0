use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{
    GatewayError, InsertSubscription, LeaderboardGateway, NewScore, Rank, ScoreRecord, Scope,
};

const INSERT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const WORKER_THREAD_NAME: &str = "leaderboard";

enum WorkerCommand {
    Submit(NewScore),
    QueryTop { limit: usize, scope: Scope },
    Shutdown,
}

#[derive(Debug)]
pub enum LeaderboardResponse {
    Connected { store: &'static str },
    ConnectFailed(GatewayError),
    Submitted { rank: Rank, duration_ms: u64 },
    SubmitFailed(GatewayError),
    Top { scope: Scope, records: Vec<ScoreRecord> },
    QueryFailed { scope: Scope, error: GatewayError },
    Inserted(ScoreRecord),
}

/// Owns the gateway on a background thread. Requests are queued and answered
/// through [`LeaderboardClient::drain_responses`], which never blocks.
pub struct LeaderboardClient {
    commands: mpsc::Sender<WorkerCommand>,
    responses: mpsc::Receiver<LeaderboardResponse>,
    handle: Option<JoinHandle<()>>,
}

impl LeaderboardClient {
    pub fn spawn(gateway: Box<dyn LeaderboardGateway>) -> Result<Self, GatewayError> {
        let (command_tx, command_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || worker_loop(gateway, command_rx, response_tx))
            .map_err(GatewayError::Spawn)?;

        Ok(Self {
            commands: command_tx,
            responses: response_rx,
            handle: Some(handle),
        })
    }

    pub fn submit(&self, score: NewScore) -> Result<(), GatewayError> {
        self.send(WorkerCommand::Submit(score))
    }

    pub fn query_top(&self, limit: usize, scope: Scope) -> Result<(), GatewayError> {
        self.send(WorkerCommand::QueryTop { limit, scope })
    }

    pub fn drain_responses(&self, out: &mut Vec<LeaderboardResponse>) {
        out.extend(self.responses.try_iter());
    }

    fn send(&self, command: WorkerCommand) -> Result<(), GatewayError> {
        self.commands
            .send(command)
            .map_err(|_| GatewayError::WorkerUnavailable)
    }

    fn shutdown(&mut self) {
        let _ = self.commands.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("leaderboard_worker_panicked");
            }
        }
    }
}

impl Drop for LeaderboardClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    gateway: Box<dyn LeaderboardGateway>,
    subscription: Option<InsertSubscription>,
    responses: mpsc::Sender<LeaderboardResponse>,
}

impl Worker {
    /// Connects if needed. Failures are reported and retried on the next
    /// request.
    fn ensure_connected(&mut self) -> bool {
        if self.subscription.is_some() {
            return true;
        }
        let connected = self
            .gateway
            .connect()
            .and_then(|()| self.gateway.subscribe_inserts());
        match connected {
            Ok(subscription) => {
                let store = self.gateway.name();
                info!(store, "leaderboard_connected");
                self.subscription = Some(subscription);
                self.respond(LeaderboardResponse::Connected { store });
                true
            }
            Err(error) => {
                warn!(store = self.gateway.name(), error = %error, "leaderboard_connect_failed");
                self.respond(LeaderboardResponse::ConnectFailed(error));
                false
            }
        }
    }

    fn handle(&mut self, command: WorkerCommand) -> bool {
        if !self.ensure_connected() {
            let error = GatewayError::NotConnected;
            return match command {
                WorkerCommand::Submit(_) => self.respond(LeaderboardResponse::SubmitFailed(error)),
                WorkerCommand::QueryTop { scope, .. } => {
                    self.respond(LeaderboardResponse::QueryFailed { scope, error })
                }
                WorkerCommand::Shutdown => false,
            };
        }

        match command {
            WorkerCommand::Submit(score) => {
                let duration_ms = score.duration_ms;
                let response = match self.gateway.submit_score(score) {
                    Ok(rank) => {
                        info!(duration_ms, rank = rank.0, "score_submitted");
                        LeaderboardResponse::Submitted { rank, duration_ms }
                    }
                    Err(error) => {
                        warn!(duration_ms, error = %error, "score_submit_failed");
                        LeaderboardResponse::SubmitFailed(error)
                    }
                };
                self.respond(response)
            }
            WorkerCommand::QueryTop { limit, scope } => {
                let response = match self.gateway.query_top(limit, &scope) {
                    Ok(records) => {
                        debug!(scope = %scope, count = records.len(), "leaderboard_queried");
                        LeaderboardResponse::Top { scope, records }
                    }
                    Err(error) => {
                        warn!(scope = %scope, error = %error, "leaderboard_query_failed");
                        LeaderboardResponse::QueryFailed { scope, error }
                    }
                };
                self.respond(response)
            }
            WorkerCommand::Shutdown => false,
        }
    }

    fn forward_inserts(&mut self, scratch: &mut Vec<ScoreRecord>) -> bool {
        let Some(subscription) = self.subscription.as_ref() else {
            return true;
        };
        subscription.drain_into(scratch);
        for record in scratch.drain(..) {
            if !self.respond(LeaderboardResponse::Inserted(record)) {
                return false;
            }
        }
        true
    }

    /// False once the client has gone away.
    fn respond(&self, response: LeaderboardResponse) -> bool {
        self.responses.send(response).is_ok()
    }
}

fn worker_loop(
    gateway: Box<dyn LeaderboardGateway>,
    commands: mpsc::Receiver<WorkerCommand>,
    responses: mpsc::Sender<LeaderboardResponse>,
) {
    let mut worker = Worker {
        gateway,
        subscription: None,
        responses,
    };
    worker.ensure_connected();

    let mut inserted = Vec::new();
    loop {
        let keep_running = match commands.recv_timeout(INSERT_POLL_INTERVAL) {
            Ok(command) => worker.handle(command),
            Err(RecvTimeoutError::Timeout) => true,
            Err(RecvTimeoutError::Disconnected) => false,
        };
        if !keep_running || !worker.forward_inserts(&mut inserted) {
            break;
        }
    }

    worker.subscription = None;
    worker.gateway.disconnect();
    info!("leaderboard_worker_stopped");
}

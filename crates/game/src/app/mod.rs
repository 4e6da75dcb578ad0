mod best_score;
mod bootstrap;
mod config;
mod leaderboard;
mod loop_runner;
mod scene;
mod session;

pub(crate) use bootstrap::build_app;
pub(crate) use loop_runner::run;

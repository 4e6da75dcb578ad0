use engine::{resolve_app_paths, LoopConfig, Scene, StartupError};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::best_score::PersonalBest;
use super::config::{GameConfig, LeaderboardBackend};
use super::leaderboard::{
    FileLeaderboard, GatewayError, LeaderboardClient, LeaderboardGateway, MemoryLeaderboard,
};
use super::scene::StillnessScene;
use super::session::Session;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Stay Still Startup ===");

    let paths = resolve_app_paths()?;
    let game = GameConfig::from_env();
    info!(
        root = %paths.root.display(),
        data_dir = %paths.data_dir.display(),
        leaderboard = ?game.leaderboard,
        region = %game.region,
        "startup_config"
    );

    let gateway: Box<dyn LeaderboardGateway> = match game.leaderboard {
        LeaderboardBackend::File => Box::new(FileLeaderboard::in_dir(&paths.data_dir)),
        LeaderboardBackend::Memory => Box::new(MemoryLeaderboard::new()),
    };
    let leaderboard = LeaderboardClient::spawn(gateway)?;

    let personal_best = match PersonalBest::load(&paths.data_dir) {
        Ok(best) => best,
        Err(error) => {
            warn!(error = %error, "personal_best_unreadable");
            PersonalBest::empty(&paths.data_dir)
        }
    };

    let rng = match game.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };
    let session = Session::new(game.session, rng);
    let scene = StillnessScene::new(
        session,
        leaderboard,
        personal_best,
        game.region,
        game.nickname,
    );

    Ok(AppWiring {
        config: LoopConfig::default(),
        scene: Box::new(scene),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

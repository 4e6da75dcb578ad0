use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod storage;

pub use app::{
    glyph_advance, line_advance, run_app, text_width, AppError, Canvas, InputEvent, Key,
    LoopConfig, LoopMetricsSnapshot, PointerPosition, Renderer, Rgba, Scene, SceneCommand,
    Viewport, MAX_FPS_ENV_VAR,
};

pub const ROOT_ENV_VAR: &str = "STAY_STILL_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub data_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create data directory at {path}: {source}")]
    CreateDataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{var} is set but is not an existing directory: {path}")]
    InvalidEnvRoot { var: &'static str, path: PathBuf },
}

/// Resolves the root directory and ensures `<root>/data` exists.
///
/// `STAY_STILL_ROOT` wins when set. Otherwise the nearest ancestor of the
/// executable that looks like a workspace checkout is used, and failing that
/// the executable's own directory.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    paths_for_root(root)
}

pub fn paths_for_root(root: PathBuf) -> Result<AppPaths, StartupError> {
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).map_err(|source| StartupError::CreateDataDir {
        path: data_dir.clone(),
        source,
    })?;

    Ok(AppPaths { root, data_dir })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(Path::new(value.trim()));
            if normalized.is_dir() {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot {
                    var: ROOT_ENV_VAR,
                    path: normalized,
                })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
            Ok(detect_root_from(&exe_dir))
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn detect_root_from(start_dir: &Path) -> PathBuf {
    start_dir
        .ancestors()
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
        .unwrap_or_else(|| normalize_path(start_dir))
}

fn is_repo_marker(path: &Path) -> bool {
    path.join("Cargo.toml").is_file() && path.join("crates").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

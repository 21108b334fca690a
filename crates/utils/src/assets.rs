use std::{
    env, io,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");
const DATA_DIR_ENV: &str = "NOTEBOOK_DATA_DIR";
const ARTIFACT_DIR_ENV: &str = "NOTEBOOK_ARTIFACT_DIR";

pub const ARTIFACTS_DIR: &str = "artifacts";
pub const DATABASE_FILE: &str = "notebook.db";

/// Root directory for everything the assistant writes to disk.
///
/// `NOTEBOOK_DATA_DIR` wins, debug builds use `dev_assets/` at the workspace
/// root, release builds use the platform data directory.
pub fn data_dir() -> io::Result<PathBuf> {
    let path = if let Ok(custom_dir) = env::var(DATA_DIR_ENV) {
        PathBuf::from(custom_dir)
    } else if cfg!(debug_assertions) {
        PathBuf::from(PROJECT_ROOT).join("../../dev_assets")
    } else {
        ProjectDirs::from("ai", "notebook", "notebook-assistant")
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory"))?
            .data_dir()
            .to_path_buf()
    };

    ensure_dir(&path)?;
    Ok(path)
    // macOS → ~/Library/Application Support/...
    // Linux → ~/.local/share/notebook-assistant (respects XDG_DATA_HOME)
}

/// Directory generated graph and audio artifacts are written to.
pub fn artifact_dir() -> io::Result<PathBuf> {
    let path = match env::var(ARTIFACT_DIR_ENV) {
        Ok(custom_dir) => PathBuf::from(custom_dir),
        Err(_) => data_dir()?.join(ARTIFACTS_DIR),
    };
    ensure_dir(&path)?;
    Ok(path)
}

pub fn database_path() -> io::Result<PathBuf> {
    Ok(data_dir()?.join(DATABASE_FILE))
}

pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        tracing::info!("Created directory: {}", path.display());
    }
    Ok(())
}

use std::path::PathBuf;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;

/// Where the tool host listens and writes artifacts.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub host: String,
    pub port: u16,
    pub artifact_dir: PathBuf,
}

impl HostConfig {
    /// `TOOL_HOST_ADDR`, `TOOL_HOST_PORT` and `NOTEBOOK_ARTIFACT_DIR`.
    pub fn from_env() -> std::io::Result<Self> {
        let host = std::env::var("TOOL_HOST_ADDR").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = std::env::var("TOOL_HOST_PORT")
            .ok()
            .and_then(|p| p.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        Ok(Self {
            host,
            port,
            artifact_dir: utils::assets::artifact_dir()?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub server_name: String,
    /// Host directory where the storage card is mounted
    pub storage_root: String,
    /// Device directory holding the archived logs
    pub archive_dir: String,
    /// Device directory holding the web UI assets
    pub web_dir: String,
    pub rest_port: u16,
    /// Bytes requested from the storage driver per body chunk
    pub stream_chunk_size: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let stream_chunk_size: usize = std::env::var("STREAM_CHUNK_SIZE")
            .unwrap_or_else(|_| "4096".to_string())
            .parse()?;
        if stream_chunk_size == 0 {
            anyhow::bail!("STREAM_CHUNK_SIZE must be greater than zero");
        }

        Ok(Config {
            server_name: std::env::var("SERVER_NAME")
                .unwrap_or_else(|_| "sdlogd".to_string()),
            storage_root: std::env::var("STORAGE_ROOT")
                .unwrap_or_else(|_| "./data/sd".to_string()),
            archive_dir: std::env::var("ARCHIVE_DIR")
                .unwrap_or_else(|_| "/logs".to_string()),
            web_dir: std::env::var("WEB_DIR")
                .unwrap_or_else(|_| "/www".to_string()),
            rest_port: std::env::var("REST_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            stream_chunk_size,
        })
    }
}

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "trackhub")]
#[command(about = "indexed genomic track server")]
pub struct Config {
    /// Host address to bind to
    #[arg(long, env = "TRACKHUB_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "TRACKHUB_PORT", default_value = "5000")]
    pub port: u16,

    /// Manifest TSV of key<TAB>location rows loaded at startup
    #[arg(short, long, env = "TRACKHUB_INPUT")]
    pub input: Option<PathBuf>,

    /// URL namespace the tracks are served under
    #[arg(short, long, env = "TRACKHUB_NAMESPACE", default_value = "tracks")]
    pub namespace: String,

    /// Directory relative track locations resolve against
    #[arg(long, env = "TRACKHUB_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable CORS for all origins
    #[arg(long, env = "TRACKHUB_CORS", default_value = "true")]
    pub cors: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Maximum size in bytes of a track ingested from a stream
    #[arg(long, env = "TRACKHUB_MAX_PAYLOAD", default_value = "10485760")]
    pub max_payload: usize,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

use std::net::SocketAddr;
use std::time::Duration;

use clap::Args;

use crate::types::Rgb;

/// Options shared by every command that produces highlights.
#[derive(Debug, Clone, Args)]
pub struct EngineArgs {
    /// Highlight color as r,g,b with components in 0..=1
    #[arg(long, env = "CITEMARK_HIGHLIGHT_COLOR", default_value = "1,1,0")]
    pub color: Rgb,

    /// Override pdfium library path
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pub pdfium_path: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "CITEMARK_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Blob-storage base URL; documents are fetched from <URL>/<name>
    #[arg(long, env = "CITEMARK_BLOB_URL")]
    pub blob_url: String,

    /// Timeout for fetching a document, in seconds
    #[arg(long, env = "CITEMARK_FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Largest document accepted from blob storage, in bytes
    #[arg(long, env = "CITEMARK_MAX_PDF_BYTES", default_value_t = 64 * 1024 * 1024)]
    pub max_pdf_bytes: u64,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Settings the server is built from at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub blob_url: String,
    pub fetch_timeout: Duration,
    pub max_pdf_bytes: u64,
    pub color: Rgb,
    pub pdfium_path: Option<String>,
}

impl From<ServeArgs> for Config {
    fn from(args: ServeArgs) -> Self {
        Config {
            bind: args.bind,
            blob_url: args.blob_url,
            fetch_timeout: Duration::from_secs(args.fetch_timeout_secs),
            max_pdf_bytes: args.max_pdf_bytes,
            color: args.engine.color,
            pdfium_path: args.engine.pdfium_path,
        }
    }
}

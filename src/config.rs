use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api-crm-livid.vercel.app";
pub const LOCAL_API_URL: &str = "http://localhost:3000";

/// Terminal client for the DealTrack CRM.
#[derive(Debug, Parser)]
#[command(name = "dealtrack", version, about)]
pub struct Cli {
    /// Backend base URL
    #[arg(long, env = "DEALTRACK_API_URL")]
    pub api_url: Option<String>,

    /// Talk to a backend on localhost:3000 (overrides --api-url)
    #[arg(long)]
    pub local: bool,

    /// Where the signed-in session is kept
    #[arg(long, env = "DEALTRACK_SESSION", default_value = "dealtrack_session.json")]
    pub session: PathBuf,

    /// Log file (the terminal belongs to the UI)
    #[arg(long, env = "DEALTRACK_LOG", default_value = "dealtrack.log")]
    pub log_file: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, env = "DEALTRACK_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Embedded report link shown on the dashboard
    #[arg(long, env = "DEALTRACK_REPORT_URL")]
    pub report_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub session_path: PathBuf,
    pub log_path: PathBuf,
    pub request_timeout: Duration,
    pub report_url: Option<String>,
}

impl From<Cli> for AppConfig {
    fn from(cli: Cli) -> Self {
        let api_base_url = if cli.local {
            LOCAL_API_URL.to_string()
        } else {
            cli.api_url
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string())
        };
        Self {
            api_base_url: api_base_url.trim().trim_end_matches('/').to_string(),
            session_path: cli.session,
            log_path: cli.log_file,
            request_timeout: Duration::from_secs(cli.timeout_secs.max(1)),
            report_url: cli.report_url.filter(|u| !u.trim().is_empty()),
        }
    }
}

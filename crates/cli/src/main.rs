use anyhow::{bail, Result};
use clap::Parser;
use qr_form::config::{default_config_path, Config};
use qr_form::App;
use qr_form_client::{ResponseOrdering, SubmitOutcome};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Submit a URL and expiry to a QR code backend and fetch the result.
#[derive(Debug, Parser)]
#[command(name = "qr-form", version)]
struct Cli {
    /// URL to encode. Together with --expires, submits once and exits.
    #[arg(long, requires = "expires")]
    url: Option<String>,

    /// Expiry in the form YYYY-MM-DDTHH:MM.
    #[arg(long, requires = "url")]
    expires: Option<String>,

    /// Backend base URL.
    #[arg(long, env = "QR_FORM_BACKEND_URL")]
    backend: Option<String>,

    /// Config file (defaults to the platform config dir).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only apply the response to the newest submission.
    #[arg(long)]
    latest_only: bool,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let Cli {
        url,
        expires,
        backend,
        config: config_path,
        latest_only,
    } = cli;

    let config_path = config_path.unwrap_or_else(default_config_path);
    let mut config = Config::load_or_default(&config_path);
    apply_overrides(&mut config, backend, latest_only);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_app(&config, url, expires))
}

/// Command-line flags (and `QR_FORM_BACKEND_URL`, via clap) win over the file.
fn apply_overrides(config: &mut Config, backend: Option<String>, latest_only: bool) {
    if let Some(backend) = backend {
        config.backend.base_url = backend;
    }
    if latest_only {
        config.page.ordering = ResponseOrdering::Latest;
    }
}

async fn run_app(config: &Config, url: Option<String>, expires: Option<String>) -> Result<ExitCode> {
    let mut app = App::from_config(config)?;
    tracing::info!("Using backend {}", config.backend.base_url);

    match (url, expires) {
        (Some(url), Some(expires)) => match app.run_once(&url, &expires).await {
            Some(SubmitOutcome::Displayed { .. }) => Ok(ExitCode::SUCCESS),
            Some(_) => Ok(ExitCode::FAILURE),
            None => bail!("submission produced no response"),
        },
        _ => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            app.run_interactive(stdin).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_and_expires_come_together() {
        assert!(Cli::try_parse_from(["qr-form", "--url", "https://a"]).is_err());
        assert!(Cli::try_parse_from(["qr-form", "--expires", "2030-01-01T00:00"]).is_err());

        let cli = Cli::try_parse_from([
            "qr-form",
            "--url",
            "https://a",
            "--expires",
            "2030-01-01T00:00",
        ])
        .unwrap();
        assert_eq!(cli.url.as_deref(), Some("https://a"));
        assert_eq!(cli.expires.as_deref(), Some("2030-01-01T00:00"));
    }

    #[test]
    fn latest_only_switches_ordering() {
        let cli = Cli::try_parse_from(["qr-form", "--latest-only"]).unwrap();
        let mut config = Config::default();
        apply_overrides(&mut config, None, cli.latest_only);
        assert_eq!(config.page.ordering, ResponseOrdering::Latest);

        let mut config = Config::default();
        apply_overrides(&mut config, None, false);
        assert_eq!(config.page.ordering, ResponseOrdering::Arrival);
    }

    #[test]
    fn backend_flag_replaces_base_url() {
        let cli =
            Cli::try_parse_from(["qr-form", "--backend", "https://qr.example.com"]).unwrap();
        let mut config = Config::default();
        apply_overrides(&mut config, cli.backend, false);
        assert_eq!(config.backend.base_url, "https://qr.example.com");
    }

    #[test]
    fn backend_env_var_is_read() {
        std::env::set_var("QR_FORM_BACKEND_URL", "http://env.example:8080");
        let parsed = Cli::try_parse_from(["qr-form"]);
        std::env::remove_var("QR_FORM_BACKEND_URL");

        let mut config = Config::default();
        apply_overrides(&mut config, parsed.unwrap().backend, false);
        assert_eq!(config.backend.base_url, "http://env.example:8080");
    }

    #[test]
    fn no_overrides_keep_the_file() {
        let mut config = Config::default();
        config.backend.base_url = "http://from-file:5000".to_string();
        apply_overrides(&mut config, None, false);
        assert_eq!(config.backend.base_url, "http://from-file:5000");
    }
}

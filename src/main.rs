//! Golden Butterfly portfolio updater.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! resolves credentials, then runs one scrape → aggregate → sheet-sync
//! pass and exits. The browser session is torn down on every path.

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{info, warn};

use butterfly_updater::browser::delays::Delays;
use butterfly_updater::browser::{BrowserSession, SessionOptions};
use butterfly_updater::config::AppConfig;
use butterfly_updater::engine::{SyncReport, SyncRunner};
use butterfly_updater::scrapers::my_investor::MyInvestorScraper;
use butterfly_updater::scrapers::trade_republic::TradeRepublicScraper;
use butterfly_updater::scrapers::BankScraper;
use butterfly_updater::sheets::google::GoogleSheetsUpdater;

const BANNER: &str = r#"
 _           _   _             __ _
| |__  _   _| |_| |_ ___ _ __ / _| |_   _
| '_ \| | | | __| __/ _ \ '__| |_| | | | |
| |_) | |_| | |_| ||  __/ |  |  _| | |_| |
|_.__/ \__,_|\__|\__\___|_|  |_| |_|\__, |
                                    |___/
  Golden Butterfly portfolio updater
  v0.1.0 — scrape, aggregate, sync, exit
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    println!("{BANNER}");
    info!(
        headless = cfg.browser.headless,
        delay_profile = ?cfg.browser.delay_profile,
        trade_republic = cfg.accounts.trade_republic.is_some(),
        my_investor = cfg.accounts.my_investor.is_some(),
        "Starting up"
    );

    // -- Resolve credentials ---------------------------------------------
    // Done before launching anything so a missing env var fails fast,
    // before a browser process exists.

    let trade_republic = cfg
        .accounts
        .trade_republic
        .as_ref()
        .map(|c| c.resolve_credentials())
        .transpose()?;

    let my_investor = match &cfg.accounts.my_investor {
        Some(c) => Some((c.resolve_credentials()?, c.holdings.clone())),
        None => None,
    };

    let updater = GoogleSheetsUpdater::new(
        &cfg.sheets.credentials_path,
        cfg.sheets.spreadsheet_id.clone(),
        cfg.sheets.worksheet.clone(),
    )?;

    // -- Launch the browser and wire the adapters ------------------------

    let session = Arc::new(
        BrowserSession::launch(&SessionOptions {
            headless: cfg.browser.headless,
            delays: Delays::new(cfg.browser.delay_profile),
            screenshot_dir: cfg.browser.screenshot_dir.clone(),
        })
        .await?,
    );

    let mut scrapers: Vec<Box<dyn BankScraper>> = Vec::new();
    if let Some(credentials) = trade_republic {
        scrapers.push(Box::new(TradeRepublicScraper::new(
            Arc::clone(&session),
            credentials,
        )));
    }
    if let Some((credentials, holdings)) = my_investor {
        scrapers.push(Box::new(MyInvestorScraper::new(
            Arc::clone(&session),
            credentials,
            holdings,
        )));
    }

    // -- Run one pass ----------------------------------------------------

    let runner = SyncRunner::new(scrapers);
    let result = runner.run(Some(&session), &updater).await;

    // The browser comes down before the result is examined, so a sheets
    // failure cannot leak a Chrome process.
    session.close().await;

    let report = result?;
    log_report(&report);

    if !report.is_clean() {
        bail!("{} account(s) failed to scrape", report.failures.len());
    }
    Ok(())
}

/// Log a human-readable run summary.
fn log_report(report: &SyncReport) {
    info!(
        accounts = report.accounts_attempted,
        failed = report.failures.len(),
        assets = report.assets_collected,
        wrote = report.wrote,
        cells = report.cells_written,
        "Run complete"
    );
    for failure in &report.failures {
        warn!(account = %failure.account, error = %failure.error, "Account failed");
    }
    if !report.skipped_labels.is_empty() {
        warn!(labels = ?report.skipped_labels, "Labels missing from sheet, values not written");
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("butterfly_updater=info"));

    let json_logging = std::env::var("BUTTERFLY_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}

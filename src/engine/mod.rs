//! Sync engine — one scrape → aggregate → write pass.
//!
//! Adapters run strictly sequentially: one shared browser fingerprint doing
//! two logins at once is exactly what bot detection looks for. A failed
//! account does not abort the run; its failure is recorded (with a
//! screenshot when the browser is still usable), remaining accounts run,
//! and the single batched write carries only what was actually scraped.
//! If nothing was scraped, no write happens at all. A spreadsheet error is
//! fatal for the run.

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::browser::BrowserSession;
use crate::scrapers::BankScraper;
use crate::sheets::{PortfolioUpdater, UpdateSummary};
use crate::types::Asset;

/// One account's scrape failure, kept for the run report.
#[derive(Debug, Clone)]
pub struct AccountFailure {
    pub account: String,
    pub error: String,
}

/// Summary of one full run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub accounts_attempted: usize,
    pub assets_collected: usize,
    /// Whether a spreadsheet write was performed.
    pub wrote: bool,
    pub cells_written: usize,
    pub skipped_labels: Vec<String>,
    pub failures: Vec<AccountFailure>,
}

impl SyncReport {
    /// True when every account scraped successfully.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives the configured site adapters and the spreadsheet updater.
pub struct SyncRunner {
    scrapers: Vec<Box<dyn BankScraper>>,
}

impl SyncRunner {
    pub fn new(scrapers: Vec<Box<dyn BankScraper>>) -> Self {
        Self { scrapers }
    }

    /// Run all adapters sequentially, then perform the single batched write.
    ///
    /// `browser` is only used to capture failure screenshots; tests that
    /// exercise the pipeline with mock adapters pass `None`.
    pub async fn run(
        &self,
        browser: Option<&BrowserSession>,
        updater: &dyn PortfolioUpdater,
    ) -> Result<SyncReport> {
        let mut assets: Vec<Asset> = Vec::new();
        let mut failures: Vec<AccountFailure> = Vec::new();

        for scraper in &self.scrapers {
            let account = scraper.name();
            info!(account, "Running site adapter");

            match scraper.fetch_assets().await {
                Ok(mut scraped) => {
                    info!(account, count = scraped.len(), "Scrape succeeded");
                    assets.append(&mut scraped);
                }
                Err(e) => {
                    error!(account, error = %e, "Scrape failed, continuing with remaining accounts");
                    if let Some(session) = browser {
                        if let Err(shot_err) = session.capture_failure_screenshot(account).await {
                            warn!(account, error = %shot_err, "Could not capture failure screenshot");
                        }
                    }
                    failures.push(AccountFailure {
                        account: account.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let assets_collected = assets.len();
        info!(total = assets_collected, "Scraping finished");

        let (wrote, summary) = if assets.is_empty() {
            warn!("No balances collected, skipping spreadsheet write");
            (false, UpdateSummary::default())
        } else {
            let summary = updater
                .update_portfolio(&assets)
                .await
                .context("spreadsheet update failed")?;
            (true, summary)
        };

        Ok(SyncReport {
            accounts_attempted: self.scrapers.len(),
            assets_collected,
            wrote,
            cells_written: summary.cells_written,
            skipped_labels: summary.skipped_labels,
            failures,
        })
    }
}

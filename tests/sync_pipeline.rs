//! Pipeline integration tests.
//!
//! Exercise the sync runner with deterministic mock adapters and a mock
//! updater — all in-memory, no browser and no network. These pin the
//! write-count and partial-failure properties of a run:
//! - N successful accounts produce exactly one batched write with all N
//!   account's values;
//! - a failed account is omitted from the write without aborting the run;
//! - when nothing was scraped, no write happens at all;
//! - a spreadsheet failure is fatal for the run.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal_macros::dec;

use butterfly_updater::engine::SyncRunner;
use butterfly_updater::scrapers::{BankScraper, ScraperError};
use butterfly_updater::sheets::{PortfolioUpdater, SheetsError, UpdateSummary};
use butterfly_updater::types::{Asset, AssetType};

/// A mock site adapter returning canned assets or a canned failure.
struct MockScraper {
    name: &'static str,
    assets: Vec<Asset>,
    fail_with: Option<String>,
    /// Shared log of adapter invocations, to assert sequential order.
    call_log: Arc<Mutex<Vec<&'static str>>>,
}

impl MockScraper {
    fn ok(name: &'static str, assets: Vec<Asset>, log: &Arc<Mutex<Vec<&'static str>>>) -> Self {
        Self {
            name,
            assets,
            fail_with: None,
            call_log: Arc::clone(log),
        }
    }

    fn failing(name: &'static str, message: &str, log: &Arc<Mutex<Vec<&'static str>>>) -> Self {
        Self {
            name,
            assets: Vec::new(),
            fail_with: Some(message.to_string()),
            call_log: Arc::clone(log),
        }
    }
}

#[async_trait]
impl BankScraper for MockScraper {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch_assets(&self) -> Result<Vec<Asset>, ScraperError> {
        self.call_log.lock().unwrap().push(self.name);
        match &self.fail_with {
            Some(message) => Err(ScraperError::Login(message.clone())),
            None => Ok(self.assets.clone()),
        }
    }
}

/// A mock updater recording every write it receives.
#[derive(Default)]
struct MockUpdater {
    writes: Mutex<Vec<Vec<Asset>>>,
    force_error: bool,
}

impl MockUpdater {
    fn failing() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            force_error: true,
        }
    }

    fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    fn last_write(&self) -> Vec<Asset> {
        self.writes.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl PortfolioUpdater for MockUpdater {
    async fn update_portfolio(&self, assets: &[Asset]) -> Result<UpdateSummary, SheetsError> {
        self.writes.lock().unwrap().push(assets.to_vec());
        if self.force_error {
            return Err(SheetsError::Api {
                status: 500,
                message: "backend error".to_string(),
            });
        }
        Ok(UpdateSummary {
            cells_written: assets.len(),
            skipped_labels: Vec::new(),
        })
    }
}

fn tr_assets() -> Vec<Asset> {
    vec![Asset::new("Trade Republic Cash", dec!(1000), AssetType::Cash)]
}

fn mi_assets() -> Vec<Asset> {
    vec![
        Asset::new("MyInvestor Cash", dec!(500), AssetType::Cash),
        Asset::new("iShares Physical Gold", dec!(250.5), AssetType::Gold),
    ]
}

#[tokio::test]
async fn test_all_accounts_one_batched_write() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let runner = SyncRunner::new(vec![
        Box::new(MockScraper::ok("trade_republic", tr_assets(), &log)),
        Box::new(MockScraper::ok("my_investor", mi_assets(), &log)),
    ]);
    let updater = MockUpdater::default();

    let report = runner.run(None, &updater).await.unwrap();

    assert_eq!(updater.write_count(), 1);
    assert_eq!(updater.last_write().len(), 3);
    assert!(report.is_clean());
    assert!(report.wrote);
    assert_eq!(report.accounts_attempted, 2);
    assert_eq!(report.assets_collected, 3);
    assert_eq!(report.cells_written, 3);
}

#[tokio::test]
async fn test_adapters_run_sequentially_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let runner = SyncRunner::new(vec![
        Box::new(MockScraper::ok("trade_republic", tr_assets(), &log)),
        Box::new(MockScraper::ok("my_investor", mi_assets(), &log)),
    ]);
    let updater = MockUpdater::default();

    runner.run(None, &updater).await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["trade_republic", "my_investor"]);
    // Collected assets keep adapter order too.
    let written = updater.last_write();
    assert_eq!(written[0].name, "Trade Republic Cash");
    assert_eq!(written[1].name, "MyInvestor Cash");
}

#[tokio::test]
async fn test_failed_account_omitted_from_write() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let runner = SyncRunner::new(vec![
        Box::new(MockScraper::failing("trade_republic", "bad PIN", &log)),
        Box::new(MockScraper::ok("my_investor", mi_assets(), &log)),
    ]);
    let updater = MockUpdater::default();

    let report = runner.run(None, &updater).await.unwrap();

    // The failure did not stop the second adapter from running.
    assert_eq!(*log.lock().unwrap(), vec!["trade_republic", "my_investor"]);

    // Still exactly one write, carrying only the successful account.
    assert_eq!(updater.write_count(), 1);
    let written = updater.last_write();
    assert_eq!(written.len(), 2);
    assert!(written.iter().all(|a| !a.name.contains("Trade Republic")));

    assert!(!report.is_clean());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].account, "trade_republic");
    assert!(report.failures[0].error.contains("bad PIN"));
    assert!(report.wrote);
}

#[tokio::test]
async fn test_all_accounts_failed_no_write() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let runner = SyncRunner::new(vec![
        Box::new(MockScraper::failing("trade_republic", "bad PIN", &log)),
        Box::new(MockScraper::failing("my_investor", "layout changed", &log)),
    ]);
    let updater = MockUpdater::default();

    let report = runner.run(None, &updater).await.unwrap();

    assert_eq!(updater.write_count(), 0);
    assert!(!report.wrote);
    assert_eq!(report.cells_written, 0);
    assert_eq!(report.failures.len(), 2);
}

#[tokio::test]
async fn test_updater_failure_is_fatal() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let runner = SyncRunner::new(vec![Box::new(MockScraper::ok(
        "trade_republic",
        tr_assets(),
        &log,
    ))]);
    let updater = MockUpdater::failing();

    let result = runner.run(None, &updater).await;

    assert!(result.is_err());
    // The write was attempted exactly once; no retry.
    assert_eq!(updater.write_count(), 1);
}

#[tokio::test]
async fn test_no_adapters_is_a_clean_noop() {
    let runner = SyncRunner::new(Vec::new());
    let updater = MockUpdater::default();

    let report = runner.run(None, &updater).await.unwrap();

    assert_eq!(updater.write_count(), 0);
    assert!(report.is_clean());
    assert!(!report.wrote);
    assert_eq!(report.accounts_attempted, 0);
}

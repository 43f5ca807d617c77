//! Site adapters.
//!
//! Defines the `BankScraper` trait and one implementation per supported
//! institution:
//! - Trade Republic — phone + PIN login, cash balance only
//! - MyInvestor — username/password login, cash plus fund/ETF positions
//!
//! Adapters are best-effort scrapes against third-party UI; the only
//! guarantee is "works against the site layout at time of writing".

pub mod my_investor;
pub mod trade_republic;

use async_trait::async_trait;
use thiserror::Error;

use crate::browser::BrowserError;
use crate::types::{Asset, BalanceParseError};

#[derive(Debug, Error)]
pub enum ScraperError {
    /// The site rejected the login or never reached the authenticated state.
    #[error("login failed: {0}")]
    Login(String),

    /// An expected page element is gone — the site layout changed.
    #[error("page structure changed: {0}")]
    PageStructure(String),

    #[error("balance text unreadable")]
    Balance(#[from] BalanceParseError),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// Abstraction over per-institution scraping logic.
///
/// Implementors drive the shared [`BrowserSession`](crate::browser::BrowserSession)
/// through the institution's login flow and return every balance they can
/// read, already bucketed into asset classes.
#[async_trait]
pub trait BankScraper: Send + Sync {
    /// Institution name for logging and failure reporting.
    fn name(&self) -> &'static str;

    /// Log in and read all balances for this account.
    async fn fetch_assets(&self) -> Result<Vec<Asset>, ScraperError>;
}

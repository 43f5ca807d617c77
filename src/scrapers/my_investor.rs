//! MyInvestor site adapter.
//!
//! Username/password login, then two reads: the cash account balance from
//! the dashboard, and the investments page position rows. Positions are
//! matched to configured holdings by ISIN; the holding mapping decides which
//! asset class each market value lands in. Positions with an ISIN that is
//! not configured are logged and skipped.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use super::{BankScraper, ScraperError};
use crate::browser::{BrowserError, BrowserSession};
use crate::config::{HoldingMapping, MyInvestorCredentials};
use crate::types::{parse_balance, Asset, AssetType};

const LOGIN_URL: &str = "https://app.myinvestor.es/login";
const INVESTMENTS_URL: &str = "https://app.myinvestor.es/investments";

const USERNAME_SELECTOR: &str = "input[name='username']";
const PASSWORD_SELECTOR: &str = "input[name='password'][type='password']";
const SUBMIT_BUTTON_SELECTOR: &str = "button[type='submit']";
const CASH_BALANCE_SELECTOR: &str = "[data-testid='cash-account-balance']";
const POSITION_ROW_SELECTOR: &str = "[data-testid='position-row']";

/// ISIN: 2 letters, 9 alphanumerics, 1 check digit.
static ISIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2}[A-Z0-9]{9}\d)\b").unwrap());

/// A euro amount as rendered in position rows ("1.234,56 €").
static EURO_AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d[\d.,\s]*\s*€").unwrap());

pub struct MyInvestorScraper {
    session: Arc<BrowserSession>,
    credentials: MyInvestorCredentials,
    holdings: Vec<HoldingMapping>,
}

impl MyInvestorScraper {
    pub fn new(
        session: Arc<BrowserSession>,
        credentials: MyInvestorCredentials,
        holdings: Vec<HoldingMapping>,
    ) -> Self {
        Self {
            session,
            credentials,
            holdings,
        }
    }

    async fn log_in(&self) -> Result<(), ScraperError> {
        self.session.navigate(LOGIN_URL).await?;

        let username = self.session.wait_for(USERNAME_SELECTOR).await?;
        self.session
            .type_text(&username, self.credentials.username.expose_secret())
            .await?;

        let password = self.session.wait_for(PASSWORD_SELECTOR).await?;
        self.session
            .type_text(&password, self.credentials.password.expose_secret())
            .await?;

        let submit = self.session.wait_for(SUBMIT_BUTTON_SELECTOR).await?;
        self.session.click(&submit).await?;
        Ok(())
    }

    async fn read_cash_balance(&self) -> Result<Asset, ScraperError> {
        let text = match self.session.read_text(CASH_BALANCE_SELECTOR).await {
            Ok(text) => text,
            Err(BrowserError::ElementNotFound { .. }) => {
                return Err(ScraperError::Login(
                    "dashboard never appeared after submitting credentials".to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        debug!(raw = %text, "Cash balance text");
        let amount = parse_balance(&text)?;
        Ok(Asset::new("MyInvestor Cash", amount, AssetType::Cash))
    }

    async fn read_positions(&self) -> Result<Vec<Asset>, ScraperError> {
        self.session.navigate(INVESTMENTS_URL).await?;

        let rows = self.session.wait_for_all(POSITION_ROW_SELECTOR).await?;
        let mut assets = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            let text = match self.session.text_of(row, POSITION_ROW_SELECTOR).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(index, error = %e, "Skipping unreadable position row");
                    continue;
                }
            };

            let Some((isin, amount)) = parse_position_row(&text) else {
                warn!(index, "Position row carries no ISIN or market value, skipping");
                continue;
            };

            match self.holdings.iter().find(|h| h.isin == isin) {
                Some(holding) => {
                    debug!(
                        isin = %isin,
                        amount = %amount,
                        product = %holding.product_type,
                        class = %holding.asset_type,
                        "Position matched"
                    );
                    assets.push(Asset::new(
                        holding.name.clone(),
                        amount,
                        holding.asset_type,
                    ));
                }
                None => warn!(isin = %isin, "Position ISIN not in configured holdings, skipping"),
            }
        }

        if assets.is_empty() && !self.holdings.is_empty() {
            warn!("No configured holding matched any position row");
        }
        Ok(assets)
    }
}

/// Pull the ISIN and the market value out of one position row's text.
///
/// The market value is the last euro amount in the row; earlier amounts are
/// unit prices or cost bases.
fn parse_position_row(text: &str) -> Option<(String, Decimal)> {
    let isin = ISIN_RE.captures(text)?.get(1)?.as_str().to_string();
    let raw_amount = EURO_AMOUNT_RE.find_iter(text).last()?.as_str();
    let amount = parse_balance(raw_amount).ok()?;
    Some((isin, amount))
}

#[async_trait]
impl BankScraper for MyInvestorScraper {
    fn name(&self) -> &'static str {
        "my_investor"
    }

    async fn fetch_assets(&self) -> Result<Vec<Asset>, ScraperError> {
        info!("Logging into MyInvestor");
        self.log_in().await?;

        let cash = self.read_cash_balance().await?;
        info!(amount = %cash.amount, "Cash balance retrieved");

        let mut assets = vec![cash];
        let positions = self.read_positions().await?;
        info!(count = positions.len(), "Positions retrieved");
        assets.extend(positions);

        Ok(assets)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_position_row_full() {
        let text = "Vanguard Global Stock Index Fund\nIE00B03HCZ61\n12,345 uds · 98,76 €\n1.234,56 €";
        let (isin, amount) = parse_position_row(text).unwrap();
        assert_eq!(isin, "IE00B03HCZ61");
        // Last euro amount is the market value, not the unit price.
        assert_eq!(amount, dec!(1234.56));
    }

    #[test]
    fn test_parse_position_row_single_amount() {
        let text = "iShares Physical Gold ETC IE00B4ND3602 500,00 €";
        let (isin, amount) = parse_position_row(text).unwrap();
        assert_eq!(isin, "IE00B4ND3602");
        assert_eq!(amount, dec!(500.00));
    }

    #[test]
    fn test_parse_position_row_missing_isin() {
        assert!(parse_position_row("Some fund without identifier 1.000,00 €").is_none());
    }

    #[test]
    fn test_parse_position_row_missing_amount() {
        assert!(parse_position_row("Vanguard Fund IE00B03HCZ61 pending").is_none());
    }
}

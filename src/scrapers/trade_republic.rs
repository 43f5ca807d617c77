//! Trade Republic site adapter.
//!
//! Login is phone-number based: pick the country code from a dropdown, type
//! the number, submit, then type the 4-digit PIN one digit per input field.
//! Only the cash balance is scraped here; securities held at Trade Republic
//! are tracked elsewhere.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::{debug, info};

use super::{BankScraper, ScraperError};
use crate::browser::{BrowserError, BrowserSession};
use crate::config::TradeRepublicCredentials;
use crate::types::{parse_balance, Asset, AssetType};

const LOGIN_URL: &str = "https://app.traderepublic.com/login";

const COUNTRY_DROPDOWN_SELECTOR: &str = ".dropdownList__openButton";
const PHONE_INPUT_SELECTOR: &str = "#loginPhoneNumber__input";
const SUBMIT_BUTTON_SELECTOR: &str = "button[type='submit']";
const PIN_INPUT_SELECTOR: &str = ".codeInput__character";
const CASH_BALANCE_SELECTOR: &str = "[class*='cashBalance__amount']";

pub struct TradeRepublicScraper {
    session: Arc<BrowserSession>,
    credentials: TradeRepublicCredentials,
}

impl TradeRepublicScraper {
    pub fn new(session: Arc<BrowserSession>, credentials: TradeRepublicCredentials) -> Self {
        Self {
            session,
            credentials,
        }
    }

    async fn log_in(&self) -> Result<(), ScraperError> {
        self.session.navigate(LOGIN_URL).await?;

        self.select_country_code().await?;
        self.enter_phone_number().await?;
        self.submit().await?;
        self.enter_pin().await?;

        Ok(())
    }

    async fn select_country_code(&self) -> Result<(), ScraperError> {
        let dropdown = self.session.wait_for(COUNTRY_DROPDOWN_SELECTOR).await?;
        self.session.click(&dropdown).await?;

        // Option ids embed the dialing code verbatim ("areaCode-+34"), which
        // needs an attribute selector because of the '+'.
        let option_selector = format!("[id='areaCode-{}']", self.credentials.phone_country_code);
        let option = self.session.wait_for(&option_selector).await?;
        self.session.click(&option).await?;
        Ok(())
    }

    async fn enter_phone_number(&self) -> Result<(), ScraperError> {
        let input = self.session.wait_for(PHONE_INPUT_SELECTOR).await?;
        self.session
            .type_text(&input, self.credentials.phone_number.expose_secret())
            .await?;
        Ok(())
    }

    async fn submit(&self) -> Result<(), ScraperError> {
        let button = self.session.wait_for(SUBMIT_BUTTON_SELECTOR).await?;
        self.session.click(&button).await?;
        Ok(())
    }

    /// The PIN form renders one single-character input per digit.
    async fn enter_pin(&self) -> Result<(), ScraperError> {
        let inputs = self.session.wait_for_all(PIN_INPUT_SELECTOR).await?;
        let pin = self.credentials.pin.expose_secret();

        if inputs.len() < pin.chars().count() {
            return Err(ScraperError::PageStructure(format!(
                "expected {} PIN inputs, found {}",
                pin.chars().count(),
                inputs.len()
            )));
        }

        for (input, digit) in inputs.iter().zip(pin.chars()) {
            self.session
                .type_text(input, &digit.to_string())
                .await?;
        }
        Ok(())
    }

    async fn read_cash_balance(&self) -> Result<Asset, ScraperError> {
        let text = match self.session.read_text(CASH_BALANCE_SELECTOR).await {
            Ok(text) => text,
            // The balance never rendering usually means the login was
            // rejected (or the site is asking to verify a new device),
            // not that the layout changed.
            Err(BrowserError::ElementNotFound { .. }) => {
                return Err(ScraperError::Login(
                    "cash balance never appeared after PIN entry; \
                     login rejected or device verification required"
                        .to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        debug!(raw = %text, "Cash balance text");
        let amount = parse_balance(&text)?;
        Ok(Asset::new("Trade Republic Cash", amount, AssetType::Cash))
    }
}

#[async_trait]
impl BankScraper for TradeRepublicScraper {
    fn name(&self) -> &'static str {
        "trade_republic"
    }

    async fn fetch_assets(&self) -> Result<Vec<Asset>, ScraperError> {
        info!("Logging into Trade Republic");
        self.log_in().await?;
        info!("Logged in, reading cash balance");

        let cash = self.read_cash_balance().await?;
        info!(amount = %cash.amount, "Cash balance retrieved");

        Ok(vec![cash])
    }
}

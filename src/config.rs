//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Credentials are referenced by env-var name in the config and resolved at
//! runtime into `SecretString`s, so neither the config file nor the logs
//! ever carry a secret value.

use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::Regex;
use secrecy::SecretString;
use serde::Deserialize;

use crate::browser::delays::DelayProfile;
use crate::types::{AssetType, ProductType};

/// Dialing codes like "+34" or "+1".
static PHONE_COUNTRY_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+\d{1,4}$").unwrap());

/// Phone numbers: 5–15 digits, no separators.
static PHONE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{5,15}$").unwrap());

/// Trade Republic PINs are exactly 4 digits.
static PIN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").unwrap());

static ISIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}[A-Z0-9]{9}\d$").unwrap());

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub browser: BrowserConfig,
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub accounts: AccountsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub delay_profile: DelayProfile,
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,
}

fn default_screenshot_dir() -> PathBuf {
    PathBuf::from("screenshots")
}

#[derive(Debug, Deserialize, Clone)]
pub struct SheetsConfig {
    /// Path to the Google service-account key JSON (supplied out-of-band).
    pub credentials_path: PathBuf,
    pub spreadsheet_id: String,
    /// Worksheet title within the spreadsheet.
    pub worksheet: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AccountsConfig {
    pub trade_republic: Option<TradeRepublicConfig>,
    pub my_investor: Option<MyInvestorConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TradeRepublicConfig {
    /// Dialing code, e.g. "+34". Stored in config — it is not a secret.
    pub phone_country_code: String,
    /// Env var holding the login phone number.
    pub phone_number_env: String,
    /// Env var holding the 4-digit PIN.
    pub pin_env: String,
}

/// Resolved Trade Republic login material.
#[derive(Debug, Clone)]
pub struct TradeRepublicCredentials {
    pub phone_country_code: String,
    pub phone_number: SecretString,
    pub pin: SecretString,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MyInvestorConfig {
    pub username_env: String,
    pub password_env: String,
    /// ISIN → asset class mapping for positions held at MyInvestor.
    #[serde(default)]
    pub holdings: Vec<HoldingMapping>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HoldingMapping {
    pub isin: String,
    /// Display name used for the scraped asset.
    pub name: String,
    pub product_type: ProductType,
    pub asset_type: AssetType,
}

/// Resolved MyInvestor login material.
#[derive(Debug, Clone)]
pub struct MyInvestorCredentials {
    pub username: SecretString,
    pub password: SecretString,
}

impl TradeRepublicConfig {
    /// Resolve and validate the credentials this account references.
    pub fn resolve_credentials(&self) -> Result<TradeRepublicCredentials> {
        let phone_number = resolve_env(&self.phone_number_env)?;
        if !PHONE_NUMBER_RE.is_match(&phone_number) {
            bail!(
                "value of {} is not a valid phone number (5-15 digits)",
                self.phone_number_env
            );
        }

        let pin = resolve_env(&self.pin_env)?;
        if !PIN_RE.is_match(&pin) {
            bail!("value of {} is not a valid 4-digit PIN", self.pin_env);
        }

        Ok(TradeRepublicCredentials {
            phone_country_code: self.phone_country_code.clone(),
            phone_number: SecretString::new(phone_number),
            pin: SecretString::new(pin),
        })
    }
}

impl MyInvestorConfig {
    pub fn resolve_credentials(&self) -> Result<MyInvestorCredentials> {
        Ok(MyInvestorCredentials {
            username: SecretString::new(resolve_env(&self.username_env)?),
            password: SecretString::new(resolve_env(&self.password_env)?),
        })
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.accounts.trade_republic.is_none() && self.accounts.my_investor.is_none() {
            bail!("no accounts configured; enable at least one of [accounts.trade_republic] or [accounts.my_investor]");
        }

        if let Some(tr) = &self.accounts.trade_republic {
            if !PHONE_COUNTRY_CODE_RE.is_match(&tr.phone_country_code) {
                bail!(
                    "invalid phone_country_code {:?} (expected e.g. \"+34\")",
                    tr.phone_country_code
                );
            }
        }

        if let Some(mi) = &self.accounts.my_investor {
            for holding in &mi.holdings {
                if !ISIN_RE.is_match(&holding.isin) {
                    bail!("invalid ISIN {:?} in my_investor holdings", holding.isin);
                }
            }
            let mut isins: Vec<&str> = mi.holdings.iter().map(|h| h.isin.as_str()).collect();
            isins.sort();
            isins.dedup();
            if isins.len() != mi.holdings.len() {
                bail!("duplicate ISIN in my_investor holdings");
            }
        }

        Ok(())
    }
}

/// Resolve an environment variable referenced from the config.
fn resolve_env(env_name: &str) -> Result<String> {
    std::env::var(env_name).with_context(|| format!("Environment variable not set: {env_name}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

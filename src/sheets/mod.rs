//! Spreadsheet output.
//!
//! Defines the `PortfolioUpdater` trait and the Google Sheets v4 REST
//! implementation. The one correctness invariant of the whole system lives
//! here: the write step touches only designated value cells, never the
//! sheet's formula cells.

pub mod google;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Asset;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("failed to load service-account credentials: {0}")]
    Credentials(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("Sheets API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP transport error")]
    Http(#[from] reqwest::Error),
}

/// Outcome of one batched update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Cells written by the batch (0 when there was nothing to write).
    pub cells_written: usize,
    /// Asset-class labels that were not found in the sheet and therefore
    /// skipped. Non-empty means the sheet layout drifted from the config.
    pub skipped_labels: Vec<String>,
}

/// Abstraction over the destination spreadsheet.
#[async_trait]
pub trait PortfolioUpdater: Send + Sync {
    /// Aggregate the scraped assets and write them in a single batched
    /// update. Implementations must not modify any cell outside their
    /// designated value-cell set, and must skip the write entirely when
    /// `assets` is empty.
    async fn update_portfolio(&self, assets: &[Asset]) -> Result<UpdateSummary, SheetsError>;
}

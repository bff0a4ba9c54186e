use std::time::Duration;

use thiserror::Error;

/// Failure to obtain a price snapshot from upstream.
#[derive(Debug, Error)]
pub enum PriceError {
    #[error("price request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("price source returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("price request timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not decode price payload: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("mongo error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("alert not found")]
    NotFound,

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail relay returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("notification timed out after {0:?}")]
    Timeout(Duration),

    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("user has no contact address")]
    MissingContact,
}

/// Reasons a whole monitoring cycle is abandoned before any alert is touched.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("loading active alerts failed: {0}")]
    Load(#[source] RepoError),

    #[error("fetching prices failed: {0}")]
    Prices(#[from] PriceError),
}

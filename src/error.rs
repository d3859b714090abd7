use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid selector `{0}`")]
    Selector(String),

    /// An opening tag was found but the page never closes it.
    #[error("unbalanced markup: <{0}> is never closed")]
    UnbalancedMarkup(&'static str),
}

/// Anything that turns a lookup into the `__error__` sentinel.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

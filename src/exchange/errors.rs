use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed kline row at field {field}")]
    MalformedKline { field: usize },
}

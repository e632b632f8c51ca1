use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("no eligible symbols after filtering; refusing to start an idle monitor")]
    EmptyUniverse,
}

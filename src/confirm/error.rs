use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfirmationError {
    #[error("invalid confirmation request: {0}")]
    InvalidRequest(String),

    #[error("confirmation store failure: {0}")]
    Store(#[from] anyhow::Error),

    #[error("page rendering failed: {0}")]
    Render(String),
}

impl ConfirmationError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::Store(_) => 500,
            Self::Render(_) => 500,
        }
    }
}

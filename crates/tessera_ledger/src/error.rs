use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt ledger: {0}")]
    Corrupt(String),
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

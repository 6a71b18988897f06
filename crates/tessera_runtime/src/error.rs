use tessera_ledger::LedgerError;
use thiserror::Error;

/// Coarse error classes reported to the consensus collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Encoding,
    Signature,
    Validation,
    NotFound,
    Storage,
}

impl ErrorKind {
    /// Stable result code; 0 is reserved for success.
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::Encoding => 1,
            ErrorKind::Signature => 2,
            ErrorKind::Validation => 3,
            ErrorKind::NotFound => 4,
            ErrorKind::Storage => 5,
        }
    }
}

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("encoding: {0}")]
    Encoding(String),
    #[error("signature: {0}")]
    Signature(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("wrong record type: want {want}, got {got}")]
    WrongType { want: String, got: String },
    #[error("unknown type tag {0}")]
    UnknownType(u64),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("block lifecycle: {0}")]
    Lifecycle(String),
}

impl ExecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::Encoding(_) | ExecError::UnknownType(_) => ErrorKind::Encoding,
            ExecError::Signature(_) => ErrorKind::Signature,
            ExecError::Validation(_)
            | ExecError::InsufficientBalance(_)
            | ExecError::WrongType { .. }
            | ExecError::Lifecycle(_) => ErrorKind::Validation,
            ExecError::NotFound(_) => ErrorKind::NotFound,
            ExecError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn code(&self) -> u32 {
        self.kind().code()
    }

    pub(crate) fn wrong_type(want: impl Into<String>, got: impl Into<String>) -> Self {
        ExecError::WrongType {
            want: want.into(),
            got: got.into(),
        }
    }
}

impl From<LedgerError> for ExecError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NotFound(key) => ExecError::NotFound(key),
            other => ExecError::Storage(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_not_found_stays_distinguishable() {
        let e: ExecError = LedgerError::NotFound("ab".into()).into();
        assert_eq!(e.kind(), ErrorKind::NotFound);

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let e: ExecError = LedgerError::Io(io).into();
        assert_eq!(e.kind(), ErrorKind::Storage);
    }

    #[test]
    fn codes_are_nonzero_and_distinct() {
        let kinds = [
            ErrorKind::Encoding,
            ErrorKind::Signature,
            ErrorKind::Validation,
            ErrorKind::NotFound,
            ErrorKind::Storage,
        ];
        let mut codes: Vec<u32> = kinds.iter().map(|k| k.code()).collect();
        assert!(codes.iter().all(|&c| c != 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn business_rule_errors_are_validation() {
        assert_eq!(
            ExecError::InsufficientBalance("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ExecError::wrong_type("KeyBook", "Identity").kind(),
            ErrorKind::Validation
        );
        assert_eq!(ExecError::UnknownType(99).kind(), ErrorKind::Encoding);
    }
}

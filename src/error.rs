//! Application error type.
//!
//! Every fallible operation in this crate returns `Result<_, AppError>`.
//! The error carries the process exit code so the binary can translate a
//! failure into the documented exit status without inspecting messages:
//!
//! - 0: converged (not an error)
//! - 1: not converged (not an error; reported through the run status)
//! - 10: invalid argument
//! - 20: runtime error (I/O, parse, numerics)
//! - 30: anything else

/// The kind of failure, used to select the exit code and to keep parse
/// diagnostics distinguishable from I/O failures in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed command line or unparsable numeric argument.
    InvalidArgument,
    /// Missing data file or read failure.
    Io,
    /// Ill-formed model definition; the message names the offending token.
    Parse,
    /// Eigendecomposition failure or mutation variance underflow.
    Numeric,
    /// Everything else.
    Other,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::InvalidArgument => 10,
            ErrorKind::Io | ErrorKind::Parse | ErrorKind::Numeric => 20,
            ErrorKind::Other => 30,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    /// A model-definition parse error. The offending identifier or token is
    /// part of the message, e.g. `"especia: Error: line_1: self reference"`.
    pub fn parse(token: &str, detail: &str) -> Self {
        Self::new(ErrorKind::Parse, format!("especia: Error: {token}: {detail}"))
    }

    pub fn numeric(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Numeric, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_kind() {
        assert_eq!(AppError::invalid_argument("x").exit_code(), 10);
        assert_eq!(AppError::io("x").exit_code(), 20);
        assert_eq!(AppError::parse("id", "self reference").exit_code(), 20);
        assert_eq!(AppError::numeric("x").exit_code(), 20);
        assert_eq!(AppError::new(ErrorKind::Other, "x").exit_code(), 30);
    }

    #[test]
    fn parse_error_names_the_token() {
        let err = AppError::parse("line_1", "self reference");
        assert!(err.to_string().contains("line_1"));
        assert!(err.to_string().contains("self reference"));
    }
}

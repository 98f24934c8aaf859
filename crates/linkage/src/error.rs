use std::fmt;

#[derive(Debug)]
pub enum LinkageError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, duplicate lab id, etc.).
    ConfigValidation(String),
    /// An input document could not be parsed. `input` names which one.
    InputParse { input: String, message: String },
    /// A parsed input row violates a record invariant (e.g. empty code).
    InvalidRecord { input: String, index: usize, message: String },
    /// Pair count or wall-clock budget exhausted before scoring finished.
    BudgetExceeded { reason: String },
}

impl fmt::Display for LinkageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InputParse { input, message } => {
                write!(f, "cannot parse {input}: {message}")
            }
            Self::InvalidRecord { input, index, message } => {
                write!(f, "{input}, entry #{index}: {message}")
            }
            Self::BudgetExceeded { reason } => write!(f, "budget exceeded: {reason}"),
        }
    }
}

impl std::error::Error for LinkageError {}

//! Process-level error type.
//!
//! Every fallible path funnels into [`AppError`], which pairs a message with
//! the exit code the binary should terminate with:
//!
//! - 2: structural input problems (bad flags, malformed spec files, duplicate
//!   maxima names, unusable pattern files)
//! - 3: data-window problems (empty slice, fewer samples than parameters,
//!   non-finite intensities)
//! - 4: numerical/internal failures

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Structural input error (exit code 2).
    pub fn input(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    /// Data-window error (exit code 3).
    pub fn data(message: impl Into<String>) -> Self {
        Self::new(3, message)
    }

    /// Numerical/internal error (exit code 4).
    pub fn numeric(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
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
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

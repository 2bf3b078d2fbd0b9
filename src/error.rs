//! Process-level error carrying the exit code of the `plate` binary.
//!
//! Exit codes:
//! - `2`: bad configuration (template, concentrations, CLI values, report to show)
//! - `3`: no usable data (no data files, or no plate blocks in any of them)
//! - `4`: an output could not be written

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_NO_DATA: u8 = 3;
pub const EXIT_OUTPUT: u8 = 4;

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

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG, message)
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self::new(EXIT_NO_DATA, message)
    }

    pub fn output(message: impl Into<String>) -> Self {
        Self::new(EXIT_OUTPUT, message)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_exit_codes() {
        assert_eq!(AppError::config("x").exit_code(), 2);
        assert_eq!(AppError::no_data("x").exit_code(), 3);
        let err = AppError::output("cannot write results/a.csv");
        assert_eq!(err.exit_code(), 4);
        assert_eq!(err.to_string(), "cannot write results/a.csv");
    }
}

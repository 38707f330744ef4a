use graham_core::{CoreError, ValidationError, WarehouseError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Core(error) => match error {
                CoreError::Validation(_) | CoreError::Config(_) => 2,
                CoreError::Warehouse(_) => 3,
                CoreError::Serialization(_) => 4,
                CoreError::Io(_) => 10,
            },
            Self::Warehouse(_) => 3,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_a_usage_error() {
        let error = CliError::from(ValidationError::MissingEnv {
            name: "GRAHAM_API_KEY",
        });
        assert_eq!(error.exit_code(), 2);
        assert_eq!(error.to_string(), "environment variable GRAHAM_API_KEY is not set");
    }

    #[test]
    fn core_errors_keep_their_category() {
        let storage = CliError::from(CoreError::Warehouse(WarehouseError::InvalidData(
            String::from("bad row"),
        )));
        let io = CliError::from(CoreError::Io(std::io::Error::other("disk")));

        assert_eq!(storage.exit_code(), 3);
        assert_eq!(io.exit_code(), 10);
    }
}

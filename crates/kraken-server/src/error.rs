use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a settings key such as `provider.api_key` to the variable that sets it
pub fn to_env_var(field_path: &str) -> String {
    format!(
        "KRAKEN_{}",
        field_path.to_uppercase().replace('.', "__")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("provider.api_key"), "KRAKEN_PROVIDER__API_KEY");
        assert_eq!(
            to_env_var("property_data.timeout_secs"),
            "KRAKEN_PROPERTY_DATA__TIMEOUT_SECS"
        );
    }

    #[test]
    fn test_missing_env_var_message() {
        let err = ConfigError::MissingEnvVar {
            env_var: "KRAKEN_PROPERTY_DATA__API_KEY".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing required environment variable: KRAKEN_PROPERTY_DATA__API_KEY"
        );
    }
}

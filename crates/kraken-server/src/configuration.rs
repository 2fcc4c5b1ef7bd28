use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use kraken::property_data::{PropertyDataConfig, DEFAULT_FIELDS, DEFAULT_TIMEOUT, PROPERTY_DATA_HOST};
use kraken::providers::configs::{OpenAiProviderConfig, ProviderConfig};
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::time::Duration;

/// Variable the property data key was read from before settings were namespaced
pub const LEGACY_API_KEY_VAR: &str = "KRAKEN";

#[derive(Debug, Default, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_openai_host")]
    pub host: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
}

impl ProviderSettings {
    pub fn into_config(self) -> ProviderConfig {
        ProviderConfig::OpenAi(OpenAiProviderConfig {
            host: self.host,
            api_key: self.api_key,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PropertyDataSettings {
    #[serde(default = "default_property_data_host")]
    pub host: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_fields")]
    pub fields: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl PropertyDataSettings {
    pub fn into_config(self) -> PropertyDataConfig {
        PropertyDataConfig::new(self.api_key)
            .with_host(self.host)
            .with_fields(self.fields)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    pub property_data: PropertyDataSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            // Provider defaults
            .set_default("provider.host", default_openai_host())?
            .set_default("provider.model", default_model())?
            // Property data defaults
            .set_default("property_data.host", default_property_data_host())?
            .set_default("property_data.fields", default_fields())?
            .set_default("property_data.timeout_secs", default_timeout_secs() as i64)?;

        // The bare variable is only a fallback for the namespaced one
        if let Ok(api_key) = std::env::var(LEGACY_API_KEY_VAR) {
            builder = builder.set_default("property_data.api_key", api_key)?;
        }

        let config = builder
            .add_source(
                Environment::with_prefix("KRAKEN")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => settings.validate(),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                // Handle both NotFound and missing field message variants
                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }

    /// Credentials are required up front so a bad deployment fails at startup
    fn validate(self) -> Result<Self, ConfigError> {
        if self.provider.api_key.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar {
                env_var: to_env_var("provider.api_key"),
            });
        }
        if self.property_data.api_key.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar {
                env_var: to_env_var("property_data.api_key"),
            });
        }
        Ok(self)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_openai_host() -> String {
    "https://api.openai.com".to_string()
}

fn default_property_data_host() -> String {
    PROPERTY_DATA_HOST.to_string()
}

fn default_fields() -> String {
    DEFAULT_FIELDS.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key == LEGACY_API_KEY_VAR || key.starts_with("KRAKEN_") {
                env::remove_var(&key);
            }
        }
    }

    fn set_required_keys() {
        env::set_var("KRAKEN_PROVIDER__API_KEY", "test-openai-key");
        env::set_var("KRAKEN_PROPERTY_DATA__API_KEY", "test-street-key");
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();
        set_required_keys();

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);

        assert_eq!(settings.provider.host, "https://api.openai.com");
        assert_eq!(settings.provider.api_key, "test-openai-key");
        assert_eq!(settings.provider.model, "gpt-4o");
        assert_eq!(settings.provider.temperature, None);
        assert_eq!(settings.provider.max_tokens, None);

        assert_eq!(settings.property_data.host, "https://api.data.street.co.uk");
        assert_eq!(settings.property_data.api_key, "test-street-key");
        assert_eq!(settings.property_data.fields, DEFAULT_FIELDS);
        assert_eq!(settings.property_data.timeout_secs, 30);

        clean_env();
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        set_required_keys();
        env::set_var("KRAKEN_SERVER__PORT", "8080");
        env::set_var("KRAKEN_PROVIDER__HOST", "https://custom.openai.com");
        env::set_var("KRAKEN_PROVIDER__MODEL", "gpt-4o-mini");
        env::set_var("KRAKEN_PROVIDER__TEMPERATURE", "0.5");
        env::set_var("KRAKEN_PROVIDER__MAX_TOKENS", "2000");
        env::set_var("KRAKEN_PROPERTY_DATA__FIELDS", "address,education");
        env::set_var("KRAKEN_PROPERTY_DATA__TIMEOUT_SECS", "5");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.provider.host, "https://custom.openai.com");
        assert_eq!(settings.provider.model, "gpt-4o-mini");
        assert_eq!(settings.provider.temperature, Some(0.5));
        assert_eq!(settings.provider.max_tokens, Some(2000));
        assert_eq!(settings.property_data.fields, "address,education");
        assert_eq!(settings.property_data.timeout_secs, 5);

        let config = settings.property_data.into_config();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.fields, "address,education");

        clean_env();
    }

    #[test]
    #[serial]
    fn test_legacy_api_key_variable() {
        clean_env();
        env::set_var("KRAKEN_PROVIDER__API_KEY", "test-openai-key");
        env::set_var(LEGACY_API_KEY_VAR, "legacy-street-key");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.property_data.api_key, "legacy-street-key");

        // The namespaced variable wins
        env::set_var("KRAKEN_PROPERTY_DATA__API_KEY", "namespaced-key");
        let settings = Settings::new().unwrap();
        assert_eq!(settings.property_data.api_key, "namespaced-key");

        clean_env();
    }

    #[test]
    #[serial]
    fn test_numeric_api_keys_stay_verbatim() {
        clean_env();
        env::set_var("KRAKEN_PROVIDER__API_KEY", "000042");
        env::set_var("KRAKEN_PROPERTY_DATA__API_KEY", "00123");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.provider.api_key, "000042");
        assert_eq!(settings.property_data.api_key, "00123");
        assert_eq!(settings.property_data.into_config().api_key, "00123");

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_property_data_key_fails() {
        clean_env();
        env::set_var("KRAKEN_PROVIDER__API_KEY", "test-openai-key");

        match Settings::new() {
            Err(ConfigError::MissingEnvVar { env_var }) => {
                assert_eq!(env_var, "KRAKEN_PROPERTY_DATA__API_KEY")
            }
            other => panic!("Expected MissingEnvVar, got {:?}", other),
        }

        clean_env();
    }

    #[test]
    #[serial]
    fn test_empty_property_data_key_fails() {
        clean_env();
        env::set_var("KRAKEN_PROVIDER__API_KEY", "test-openai-key");
        env::set_var(LEGACY_API_KEY_VAR, "");

        assert!(matches!(
            Settings::new(),
            Err(ConfigError::MissingEnvVar { .. })
        ));

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_provider_key_fails() {
        clean_env();
        env::set_var("KRAKEN_PROPERTY_DATA__API_KEY", "test-street-key");

        match Settings::new() {
            Err(ConfigError::MissingEnvVar { env_var }) => {
                assert_eq!(env_var, "KRAKEN_PROVIDER__API_KEY")
            }
            other => panic!("Expected MissingEnvVar, got {:?}", other),
        }

        clean_env();
    }

    #[test]
    fn test_provider_into_config() {
        let settings = ProviderSettings {
            host: "http://localhost:8000".to_string(),
            api_key: "key".to_string(),
            model: "local".to_string(),
            temperature: Some(0.1),
            max_tokens: None,
        };
        let ProviderConfig::OpenAi(config) = settings.into_config();
        assert_eq!(config.host, "http://localhost:8000");
        assert_eq!(config.model, "local");
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        let addr = server_settings.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");

        let invalid = ServerSettings {
            host: "not a host".to_string(),
            port: 3000,
        };
        assert!(invalid.socket_addr().is_err());
    }
}

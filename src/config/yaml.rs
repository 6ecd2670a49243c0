use serde::Deserialize;
use std::path::PathBuf;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// Every field is optional. Values present here override the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 5050
///   public_host: "relay.example.com"
///   tls:
///     cert_path: "/etc/relay/cert.pem"
///     key_path: "/etc/relay/key.pem"
///
/// realtime:
///   api_key: "sk-..."
///   url: "wss://api.openai.com/v1/realtime"
///   model: "gpt-4o-realtime-preview-2024-10-01"
///   voice: "shimmer"
///   instructions: "You are a helpful phone assistant."
///   temperature: 0.8
///   audio_format: "g711_ulaw"
///   settle_delay_ms: 250
///   log_event_types:
///     - "session.created"
///     - "response.done"
///
/// call:
///   greeting: "Please hold while we connect you."
///   ready_message: "Go ahead."
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub realtime: Option<RealtimeYaml>,
    pub call: Option<CallYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_host: Option<String>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Realtime backend settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    pub api_key: Option<String>,
    pub url: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub instructions: Option<String>,
    /// File whose contents replace `instructions`
    pub instructions_path: Option<String>,
    pub temperature: Option<f64>,
    pub audio_format: Option<String>,
    pub settle_delay_ms: Option<u64>,
    pub log_event_types: Option<Vec<String>>,
}

/// Call-setup document text from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CallYaml {
    pub greeting: Option<String>,
    pub ready_message: Option<String>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;

        let config: YamlConfig = serde_yaml::from_str(&contents)?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
  public_host: "relay.example.com"
  tls:
    cert_path: "/tmp/cert.pem"
    key_path: "/tmp/key.pem"

realtime:
  api_key: "yaml-key"
  url: "ws://localhost:9000/v1/realtime"
  model: "gpt-4o-realtime-preview"
  voice: "alloy"
  instructions: "Be brief."
  temperature: 0.7
  audio_format: "g711_alaw"
  settle_delay_ms: 100
  log_event_types:
    - "session.created"
    - "error"

call:
  greeting: "Hello"
  ready_message: "Go"
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.host, Some("127.0.0.1".to_string()));
        assert_eq!(server.port, Some(8080));
        assert_eq!(server.public_host.as_deref(), Some("relay.example.com"));
        assert_eq!(
            server.tls.as_ref().unwrap().key_path.as_deref(),
            Some("/tmp/key.pem")
        );

        let realtime = config.realtime.as_ref().unwrap();
        assert_eq!(realtime.api_key.as_deref(), Some("yaml-key"));
        assert_eq!(realtime.voice.as_deref(), Some("alloy"));
        assert_eq!(realtime.temperature, Some(0.7));
        assert_eq!(realtime.settle_delay_ms, Some(100));
        assert_eq!(
            realtime.log_event_types,
            Some(vec!["session.created".to_string(), "error".to_string()])
        );

        let call = config.call.as_ref().unwrap();
        assert_eq!(call.greeting.as_deref(), Some("Hello"));
        assert_eq!(call.ready_message.as_deref(), Some("Go"));
    }

    #[test]
    fn test_yaml_config_partial() {
        let yaml = r#"
server:
  port: 9000
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        assert!(config.server.as_ref().unwrap().host.is_none());
        assert_eq!(config.server.as_ref().unwrap().port, Some(9000));
        assert!(config.realtime.is_none());
        assert!(config.call.is_none());
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("").unwrap();

        assert!(config.server.is_none());
        assert!(config.realtime.is_none());
        assert!(config.call.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        fs::write(&config_path, "realtime:\n  voice: \"echo\"\n").unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();
        assert_eq!(
            config.realtime.as_ref().unwrap().voice,
            Some("echo".to_string())
        );
    }

    #[test]
    fn test_from_file_not_found() {
        let path = PathBuf::from("/nonexistent/config.yaml");
        let result = YamlConfig::from_file(&path);

        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");

        fs::write(&config_path, "invalid: yaml: content:").unwrap();

        let result = YamlConfig::from_file(&config_path);

        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );
    }
}

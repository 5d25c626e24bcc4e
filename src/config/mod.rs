//! Configuration module for the call bridge server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use callbridge_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use zeroize::Zeroizing;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

use crate::core::bridge::{BridgeSettings, DEFAULT_GREETING, DEFAULT_SESSION_INIT_DELAY};
use crate::core::realtime::{
    DEFAULT_CONNECT_TIMEOUT_SECONDS, DEFAULT_REALTIME_MODEL, Modality, OPENAI_REALTIME_URL,
    RealtimeConfig, SessionUpdate, TurnDetectionConfig,
};

/// Default bind address
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 5050;

/// Built-in system instructions for the assistant.
pub const DEFAULT_INSTRUCTIONS: &str = include_str!("../../prompts/support_agent.md");

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains everything needed to answer Twilio calls and bridge them to
/// the OpenAI Realtime API:
/// - Server settings (host, port, public host, TLS)
/// - Realtime connection settings (API key, model, endpoint)
/// - Per-call session settings (voice, instructions, codecs, greeting)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Host advertised in the TwiML stream URL; falls back to the request
    /// `Host` header when unset
    pub public_host: Option<String>,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Realtime connection
    /// OpenAI API key for the Realtime API
    pub openai_api_key: Option<String>,
    pub realtime_model: String,
    pub realtime_url: String,
    pub connect_timeout_seconds: u64,

    // Session settings
    pub voice: String,
    pub instructions: String,
    pub input_audio_format: String,
    pub output_audio_format: String,
    pub temperature: f32,
    /// Text seeded as the caller's first message so the assistant speaks first
    pub greeting: String,
    /// Fallback delay before configuring a session that never sent `session.created`
    pub session_init_delay_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            public_host: None,
            tls: None,
            openai_api_key: None,
            realtime_model: DEFAULT_REALTIME_MODEL.to_string(),
            realtime_url: OPENAI_REALTIME_URL.to_string(),
            connect_timeout_seconds: DEFAULT_CONNECT_TIMEOUT_SECONDS,
            voice: "alloy".to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            input_audio_format: "g711_ulaw".to_string(),
            output_audio_format: "g711_ulaw".to_string(),
            temperature: 0.8,
            greeting: DEFAULT_GREETING.to_string(),
            session_init_delay_ms: DEFAULT_SESSION_INIT_DELAY.as_millis() as u64,
        }
    }
}

/// Zeroize the API key when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables only
    ///
    /// The `.env` file, if any, is loaded into the environment by `main`
    /// before this runs.
    ///
    /// # Errors
    /// Returns an error if an environment variable has an invalid format or
    /// the merged configuration fails validation.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate_server_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - An instructions file cannot be read
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate_server_config(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Connection settings for one realtime session. The key copy is wiped
    /// when the returned config is dropped.
    pub fn realtime_config(&self) -> RealtimeConfig {
        RealtimeConfig {
            api_key: Zeroizing::new(self.openai_api_key.clone().unwrap_or_default()),
            model: self.realtime_model.clone(),
            url: Some(self.realtime_url.clone()),
            connect_timeout_seconds: Some(self.connect_timeout_seconds),
        }
    }

    /// The `session.update` every call starts with.
    pub fn session_update(&self) -> SessionUpdate {
        SessionUpdate {
            voice: self.voice.clone(),
            instructions: self.instructions.clone(),
            input_audio_format: self.input_audio_format.clone(),
            output_audio_format: self.output_audio_format.clone(),
            turn_detection: TurnDetectionConfig::default(),
            modalities: vec![Modality::Text, Modality::Audio],
            temperature: self.temperature,
        }
    }

    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            session: self.session_update(),
            greeting: self.greeting.clone(),
            session_init_delay: Duration::from_millis(self.session_init_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "HOST",
        "PORT",
        "PUBLIC_HOST",
        "TLS_CERT_PATH",
        "TLS_KEY_PATH",
        "OPENAI_API_KEY",
        "OPENAI_REALTIME_MODEL",
        "OPENAI_REALTIME_URL",
        "OPENAI_CONNECT_TIMEOUT_SECONDS",
        "VOICE",
        "SYSTEM_INSTRUCTIONS",
        "SYSTEM_INSTRUCTIONS_PATH",
        "INPUT_AUDIO_FORMAT",
        "OUTPUT_AUDIO_FORMAT",
        "TEMPERATURE",
        "GREETING_TEXT",
        "SESSION_INIT_DELAY_MS",
    ];

    // Helper to clean up environment variables
    fn cleanup_env_vars() {
        unsafe {
            for name in ENV_VARS {
                env::remove_var(name);
            }
        }
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.address(), "0.0.0.0:5050");
        assert!(!config.is_tls_enabled());
        assert_eq!(config.realtime_url, "wss://api.openai.com/v1/realtime");
        assert_eq!(config.voice, "alloy");
        assert_eq!(config.session_init_delay_ms, 100);
        assert!(!config.instructions.trim().is_empty());
    }

    #[test]
    fn test_bridge_settings_from_config() {
        let mut config = ServerConfig::default();
        config.voice = "shimmer".to_string();
        config.instructions = "Be brief.".to_string();
        config.greeting = "Hi".to_string();
        config.session_init_delay_ms = 250;

        let settings = config.bridge_settings();
        assert_eq!(settings.session.voice, "shimmer");
        assert_eq!(settings.session.instructions, "Be brief.");
        assert_eq!(
            settings.session.modalities,
            vec![Modality::Text, Modality::Audio]
        );
        assert_eq!(settings.session.turn_detection, TurnDetectionConfig::default());
        assert_eq!(settings.greeting, "Hi");
        assert_eq!(settings.session_init_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_realtime_config_key_outlives_server_config() {
        let realtime = {
            let mut config = ServerConfig::default();
            config.openai_api_key = Some("sk-per-call".to_string());
            config.realtime_config()
        };

        let key: &Zeroizing<String> = &realtime.api_key;
        assert_eq!(key.as_str(), "sk-per-call");
    }

    #[test]
    fn test_realtime_config_from_config() {
        let mut config = ServerConfig::default();
        config.openai_api_key = Some("sk-test".to_string());
        config.connect_timeout_seconds = 3;

        let realtime = config.realtime_config();
        assert_eq!(realtime.api_key.as_str(), "sk-test");
        assert_eq!(realtime.model, DEFAULT_REALTIME_MODEL);
        assert_eq!(realtime.url.as_deref(), Some(OPENAI_REALTIME_URL));
        assert_eq!(realtime.connect_timeout_seconds, Some(3));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        cleanup_env_vars();
        unsafe {
            env::set_var("OPENAI_API_KEY", "sk-env");
            env::set_var("PORT", "6000");
            env::set_var("VOICE", "echo");
            env::set_var("SYSTEM_INSTRUCTIONS", "Env instructions");
            env::set_var("SESSION_INIT_DELAY_MS", "50");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.openai_api_key, Some("sk-env".to_string()));
        assert_eq!(config.port, 6000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.voice, "echo");
        assert_eq!(config.instructions, "Env instructions");
        assert_eq!(config.session_init_delay_ms, 50);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_missing_api_key() {
        cleanup_env_vars();

        let result = ServerConfig::from_env();
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("OPENAI_API_KEY is required")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_port() {
        cleanup_env_vars();
        unsafe {
            env::set_var("OPENAI_API_KEY", "sk-env");
            env::set_var("PORT", "not-a-port");
        }

        let err = ServerConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("Invalid value for PORT"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_only() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 8080
  public_host: "bridge.example.com"

openai:
  api_key: "sk-yaml"
  url: "ws://127.0.0.1:9000/v1/realtime"

session:
  voice: "coral"
  instructions: "Yaml instructions"
  temperature: 0.7
  greeting: "Hey"
"#;

        fs::write(&config_path, yaml_content).unwrap();

        let config = ServerConfig::from_file(&config_path).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.public_host, Some("bridge.example.com".to_string()));
        assert_eq!(config.openai_api_key, Some("sk-yaml".to_string()));
        assert_eq!(config.realtime_url, "ws://127.0.0.1:9000/v1/realtime");
        assert_eq!(config.voice, "coral");
        assert_eq!(config.instructions, "Yaml instructions");
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.greeting, "Hey");

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();
        unsafe {
            env::set_var("OPENAI_API_KEY", "sk-env");
            env::set_var("HOST", "10.0.0.1");
            env::set_var("PORT", "7000");
            env::set_var("VOICE", "echo");
        }

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(
            &config_path,
            "server:\n  port: 9090\nsession:\n  voice: \"sage\"\n",
        )
        .unwrap();

        let config = ServerConfig::from_file(&config_path).unwrap();

        // YAML wins where set, ENV fills the rest
        assert_eq!(config.port, 9090);
        assert_eq!(config.voice, "sage");
        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.openai_api_key, Some("sk-env".to_string()));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let result = ServerConfig::from_file(&PathBuf::from("/nonexistent/config.yaml"));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_invalid_yaml() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");
        fs::write(&config_path, "server:\n  port: [not a port").unwrap();

        let result = ServerConfig::from_file(&config_path);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_instructions_path() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let prompt_path = temp_dir.path().join("prompt.txt");
        fs::write(&prompt_path, "Prompt from file").unwrap();

        let config_path = temp_dir.path().join("config.yaml");
        fs::write(
            &config_path,
            format!(
                "openai:\n  api_key: \"sk-yaml\"\nsession:\n  instructions_path: \"{}\"\n",
                prompt_path.display()
            ),
        )
        .unwrap();

        let config = ServerConfig::from_file(&config_path).unwrap();
        assert_eq!(config.instructions, "Prompt from file");

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_invalid_temperature() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(
            &config_path,
            "openai:\n  api_key: \"sk-yaml\"\nsession:\n  temperature: 2.0\n",
        )
        .unwrap();

        let err = ServerConfig::from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("out of range"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_tls_files_must_exist() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(
            &config_path,
            r#"
openai:
  api_key: "sk-yaml"
server:
  tls:
    cert_path: "/nonexistent/cert.pem"
    key_path: "/nonexistent/key.pem"
"#,
        )
        .unwrap();

        let err = ServerConfig::from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("TLS certificate file not found"));

        cleanup_env_vars();
    }
}

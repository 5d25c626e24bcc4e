//! Environment variable layer.

use std::path::PathBuf;

use super::utils::{env_parse, env_string};

/// Raw values read from the environment (including anything `.env` loaded).
#[derive(Debug, Clone, Default)]
pub(super) struct EnvConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_host: Option<String>,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,

    pub openai_api_key: Option<String>,
    pub realtime_model: Option<String>,
    pub realtime_url: Option<String>,
    pub connect_timeout_seconds: Option<u64>,

    pub voice: Option<String>,
    pub instructions: Option<String>,
    pub instructions_path: Option<PathBuf>,
    pub input_audio_format: Option<String>,
    pub output_audio_format: Option<String>,
    pub temperature: Option<f32>,
    pub greeting: Option<String>,
    pub session_init_delay_ms: Option<u64>,
}

impl EnvConfig {
    pub(super) fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            host: env_string("HOST"),
            port: env_parse("PORT")?,
            public_host: env_string("PUBLIC_HOST"),
            tls_cert_path: env_string("TLS_CERT_PATH").map(PathBuf::from),
            tls_key_path: env_string("TLS_KEY_PATH").map(PathBuf::from),

            openai_api_key: env_string("OPENAI_API_KEY"),
            realtime_model: env_string("OPENAI_REALTIME_MODEL"),
            realtime_url: env_string("OPENAI_REALTIME_URL"),
            connect_timeout_seconds: env_parse("OPENAI_CONNECT_TIMEOUT_SECONDS")?,

            voice: env_string("VOICE"),
            instructions: env_string("SYSTEM_INSTRUCTIONS"),
            instructions_path: env_string("SYSTEM_INSTRUCTIONS_PATH").map(PathBuf::from),
            input_audio_format: env_string("INPUT_AUDIO_FORMAT"),
            output_audio_format: env_string("OUTPUT_AUDIO_FORMAT"),
            temperature: env_parse("TEMPERATURE")?,
            greeting: env_string("GREETING_TEXT"),
            session_init_delay_ms: env_parse("SESSION_INIT_DELAY_MS")?,
        })
    }
}

//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Directory holding the JSON collection files
    /// (`messages.json`, `groups.json`, `users.json`, `notifications.json`).
    /// Env: `DATA_DIR`
    /// Default: `./database`
    pub data_dir: PathBuf,

    /// Ed25519 seed for the access-token issuer (hex-encoded, 64 chars).
    /// Env: `TOKEN_SIGNING_KEY`
    /// Default: none — an ephemeral dev key is generated at startup and
    /// previously issued tokens stop verifying on restart.
    pub token_signing_seed: Option<[u8; 32]>,

    /// Sessions expire after this many seconds.
    /// Env: `SESSION_MAX_AGE_SECS`
    /// Default: one year.
    pub session_max_age_secs: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            data_dir: PathBuf::from("./database"),
            token_signing_seed: None,
            session_max_age_secs: 365 * 24 * 3600,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DATA_DIR") {
            config.data_dir = PathBuf::from(path);
        }

        if let Ok(hex_key) = std::env::var("TOKEN_SIGNING_KEY") {
            match parse_hex_seed(&hex_key) {
                Ok(seed) => config.token_signing_seed = Some(seed),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Invalid TOKEN_SIGNING_KEY, falling back to an ephemeral dev key"
                    );
                }
            }
        }

        if let Ok(val) = std::env::var("SESSION_MAX_AGE_SECS") {
            match val.parse::<i64>() {
                Ok(secs) if secs > 0 => config.session_max_age_secs = secs,
                _ => {
                    tracing::warn!(value = %val, "Invalid SESSION_MAX_AGE_SECS, using default");
                }
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

/// Parse a 64-character hex string into a 32-byte seed.
fn parse_hex_seed(hex_str: &str) -> Result<[u8; 32], String> {
    let hex_str = hex_str.trim();
    if hex_str.len() != 64 {
        return Err(format!("expected 64 hex chars, got {}", hex_str.len()));
    }

    let bytes = hex::decode(hex_str).map_err(|e| format!("invalid hex: {e}"))?;
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&bytes);
    Ok(seed)
}

//! CLI argument parsing, validation, and startup helpers.

use std::num::NonZeroU32;
use std::sync::Arc;

use crate::ServerConfig;
use crate::auth::MemoryRegistry;
use crate::credentials::{MemoryCredentials, UserEntry};
use clap::Parser;
use tracing::{error, info, warn};
use url::Url;

const MIN_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "sparrow", about = "Social feed backend with cookie sessions")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "4538")]
    pub port: u16,

    /// Public origin (full URL). Cookies get the Secure flag when this is https
    #[arg(long, default_value = "http://localhost:4538")]
    pub origin: String,

    /// Path to file containing the access token secret. Prefer ACCESS_TOKEN_SECRET
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer REFRESH_TOKEN_SECRET
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// JSON file of users: [{"name": ..., "email": ..., "password": ...}]
    #[arg(long)]
    pub users_file: Option<String>,

    /// Login attempts per minute per client IP (0 disables the limit)
    #[arg(long, default_value = "10")]
    pub login_rate_limit: u32,

    /// Use the first X-Forwarded-For entry as client IP (only behind a trusted proxy)
    #[arg(long)]
    pub trust_forwarded_for: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load a signing secret from an environment variable or a file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(env_var: &str, secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_var) };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            "{} is required. Set the environment variable (recommended) or use the matching --*-secret-file",
            env_var
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            env_var, MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Load the CSRF key from CSRF_SECRET, or generate one for this process.
pub fn load_csrf_secret() -> Vec<u8> {
    match std::env::var("CSRF_SECRET") {
        Ok(secret) => {
            // SAFETY: see load_secret
            unsafe { std::env::remove_var("CSRF_SECRET") };
            secret.into_bytes()
        }
        Err(_) => {
            warn!("CSRF_SECRET not set, using a random key (forms break across restarts)");
            rand::random::<[u8; 32]>().to_vec()
        }
    }
}

/// Parse and validate the public origin URL.
/// Returns None and logs an error if validation fails.
pub fn validate_origin(origin: &str) -> Option<Url> {
    let url = match Url::parse(origin) {
        Ok(url) => url,
        Err(e) => {
            error!(origin = %origin, error = %e, "Invalid origin URL");
            return None;
        }
    };

    let is_https = url.scheme() == "https";
    let is_localhost = url.host_str() == Some("localhost");

    if !is_https && !is_localhost {
        error!("origin must use HTTPS for non-localhost deployments");
        return None;
    }

    Some(url)
}

/// Load users from a JSON file, or start with none.
pub fn load_users(path: Option<&str>) -> Option<MemoryCredentials> {
    let Some(path) = path else {
        warn!("No --users-file given, nobody can log in");
        return Some(MemoryCredentials::new());
    };

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!(path = %path, error = %e, "Failed to read users file");
            return None;
        }
    };

    let entries: Vec<UserEntry> = match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(e) => {
            error!(path = %path, error = %e, "Failed to parse users file");
            return None;
        }
    };

    let count = entries.len();
    match MemoryCredentials::from_entries(entries) {
        Ok(credentials) => {
            info!(path = %path, users = count, "Users loaded");
            Some(credentials)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to load users");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    origin: &Url,
    access_secret: String,
    refresh_secret: String,
    csrf_secret: Vec<u8>,
    credentials: MemoryCredentials,
) -> ServerConfig {
    let secure_cookies = origin.scheme() == "https";

    ServerConfig {
        access_secret: access_secret.into_bytes(),
        refresh_secret: refresh_secret.into_bytes(),
        csrf_secret,
        secure_cookies,
        registry: Arc::new(MemoryRegistry::new()),
        credentials: Arc::new(credentials),
        login_rate_limit: NonZeroU32::new(args.login_rate_limit),
        trust_forwarded_for: args.trust_forwarded_for,
    }
}

//! Configuration for the E2EE core.
//!
//! All tunables live in [`CoreConfig`]; there is no global state. The
//! defaults match the production backend and can be overridden per
//! instance (tests use short timeouts and low iteration counts).

use std::path::PathBuf;
use std::time::Duration;

/// Default PBKDF2-HMAC-SHA256 iteration count for password key derivation.
///
/// A security parameter, not a wire constant: raising it only affects
/// newly wrapped blobs, since the salt and iteration-derived key are
/// re-created on every wrap.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;

/// Default timeout for directory fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the E2EE core
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Base URL of the backend API (e.g. `https://api.parlor.app`)
    pub api_base_url: String,
    /// Bearer token attached to directory requests, if any
    pub auth_token: Option<String>,
    /// PBKDF2 iteration count for password-derived keys
    pub pbkdf2_iterations: u32,
    /// Timeout applied to every directory fetch; a timeout is reported as
    /// the same failure as any other fetch error
    pub fetch_timeout: Duration,
    /// Where the local device identifier is persisted (platform default
    /// if `None`)
    pub device_id_path: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            auth_token: None,
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            device_id_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoreConfig::default();
        assert_eq!(config.pbkdf2_iterations, DEFAULT_PBKDF2_ITERATIONS);
        assert!(config.auth_token.is_none());
    }
}

//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use ghosthunt_room::RoomConfig;
use ghosthunt_session::SessionConfig;

use crate::GhostError;

/// Everything the server needs to start.
///
/// Defaults suit local development. [`from_env`](Self::from_env) overrides
/// individual fields from `GHOSTHUNT_*` variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address of the HTTP listener (lobby and request/response commands).
    pub http_addr: String,
    /// Address of the WebSocket listener (push transport).
    pub ws_addr: String,
    /// Path of the topic file, one `topicA,topicB` pair per line.
    pub topics_path: PathBuf,
    /// Upper bound on a single push write. A connection that cannot take
    /// a frame within this time is dropped.
    pub write_timeout: Duration,
    /// Upper bound on a push connection's WebSocket upgrade. A peer that
    /// has not finished it by then is dropped.
    pub handshake_timeout: Duration,
    pub session: SessionConfig,
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:8080".to_string(),
            ws_addr: "127.0.0.1:8081".to_string(),
            topics_path: PathBuf::from("topics.txt"),
            write_timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(10),
            session: SessionConfig::default(),
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Builds a config from the process environment.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `GHOSTHUNT_HTTP_ADDR` | `http_addr` |
    /// | `GHOSTHUNT_WS_ADDR` | `ws_addr` |
    /// | `GHOSTHUNT_TOPICS` | `topics_path` |
    /// | `GHOSTHUNT_COOKIE_MAX_AGE` | `session.cookie_max_age_secs` |
    /// | `GHOSTHUNT_WRITE_TIMEOUT_MS` | `write_timeout` |
    /// | `GHOSTHUNT_HANDSHAKE_TIMEOUT_MS` | `handshake_timeout` |
    ///
    /// # Errors
    /// Returns [`GhostError::Config`] if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, GhostError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, GhostError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("GHOSTHUNT_HTTP_ADDR") {
            config.http_addr = addr;
        }
        if let Some(addr) = lookup("GHOSTHUNT_WS_ADDR") {
            config.ws_addr = addr;
        }
        if let Some(path) = lookup("GHOSTHUNT_TOPICS") {
            config.topics_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("GHOSTHUNT_COOKIE_MAX_AGE") {
            config.session.cookie_max_age_secs =
                parse_number("GHOSTHUNT_COOKIE_MAX_AGE", &raw)?;
        }
        if let Some(raw) = lookup("GHOSTHUNT_WRITE_TIMEOUT_MS") {
            config.write_timeout = Duration::from_millis(parse_number(
                "GHOSTHUNT_WRITE_TIMEOUT_MS",
                &raw,
            )?);
        }

        if let Some(raw) = lookup("GHOSTHUNT_HANDSHAKE_TIMEOUT_MS") {
            config.handshake_timeout = Duration::from_millis(parse_number(
                "GHOSTHUNT_HANDSHAKE_TIMEOUT_MS",
                &raw,
            )?);
        }

        Ok(config)
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u64, GhostError> {
    raw.trim()
        .parse()
        .map_err(|e| GhostError::Config(format!("{key}={raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, "127.0.0.1:8080");
        assert_eq!(config.ws_addr, "127.0.0.1:8081");
        assert_eq!(config.topics_path, PathBuf::from("topics.txt"));
        assert_eq!(config.write_timeout, Duration::from_secs(10));
        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
        assert_eq!(config.session.cookie_max_age_secs, 300);
        assert_eq!(config.room.channel_size, 64);
    }

    #[test]
    fn test_from_lookup_without_vars_is_default() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.http_addr, ServerConfig::default().http_addr);
    }

    #[test]
    fn test_from_lookup_overrides_fields() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("GHOSTHUNT_HTTP_ADDR", "0.0.0.0:80"),
            ("GHOSTHUNT_WS_ADDR", "0.0.0.0:81"),
            ("GHOSTHUNT_TOPICS", "/etc/ghosthunt/topics.txt"),
            ("GHOSTHUNT_COOKIE_MAX_AGE", "600"),
            ("GHOSTHUNT_WRITE_TIMEOUT_MS", "250"),
            ("GHOSTHUNT_HANDSHAKE_TIMEOUT_MS", "1500"),
        ]))
        .unwrap();

        assert_eq!(config.http_addr, "0.0.0.0:80");
        assert_eq!(config.ws_addr, "0.0.0.0:81");
        assert_eq!(config.topics_path, PathBuf::from("/etc/ghosthunt/topics.txt"));
        assert_eq!(config.session.cookie_max_age_secs, 600);
        assert_eq!(config.write_timeout, Duration::from_millis(250));
        assert_eq!(config.handshake_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_from_lookup_bad_number_is_config_error() {
        let result =
            ServerConfig::from_lookup(lookup(&[("GHOSTHUNT_COOKIE_MAX_AGE", "soon")]));
        match result {
            Err(GhostError::Config(msg)) => {
                assert!(msg.contains("GHOSTHUNT_COOKIE_MAX_AGE"));
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }
}

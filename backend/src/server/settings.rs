//! Server settings loaded via OrthoConfig.
//!
//! Values come from CLI flags, `TRIPBOARD_*` environment variables and an
//! optional config file, in OrthoConfig's usual precedence.

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use actix_web::cookie::Key;
use cap_std::{ambient_authority, fs::Dir};
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use tripboard::inbound::ws::origins::{AllowedOrigins, InvalidOrigin};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SESSION_KEY_FILE: &str = "/var/run/secrets/session_key";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000";
const SESSION_KEY_MIN_LEN: usize = 64;

/// Configuration values for the trip board server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "TRIPBOARD")]
pub struct ServerSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// File holding the cookie session signing key shared with the auth
    /// service.
    pub session_key_file: Option<PathBuf>,
    /// Fall back to a throwaway key when the key file is unreadable.
    #[ortho_config(default = false)]
    pub allow_ephemeral_key: bool,
    /// Mark session cookies `Secure`.
    #[ortho_config(default = true)]
    pub cookie_secure: bool,
    /// Comma-separated origins allowed to open trip feed sockets.
    pub allowed_origins: Option<String>,
    /// JSON dataset seeding the in-memory store.
    pub dataset_path: Option<PathBuf>,
}

/// Errors raised while turning settings into server configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid bind address '{value}': {source}")]
    BindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("invalid allowed origins: {0}")]
    Origins(#[from] InvalidOrigin),
    #[error("failed to read session key at {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("session key at {path} too short: need >= {min_len} bytes, got {length}")]
    KeyTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
}

impl ServerSettings {
    /// Parsed listen address, defaulting to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value.parse().map_err(|source| SettingsError::BindAddr {
            value: value.to_owned(),
            source,
        })
    }

    /// Parsed origin allow-list, defaulting to the local web client.
    pub fn allowed_origins(&self) -> Result<AllowedOrigins, SettingsError> {
        Ok(self
            .allowed_origins
            .as_deref()
            .unwrap_or(DEFAULT_ALLOWED_ORIGINS)
            .parse()?)
    }

    /// Path of the session key file.
    #[must_use]
    pub fn session_key_file(&self) -> PathBuf {
        self.session_key_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_KEY_FILE))
    }

    /// Load the session signing key.
    ///
    /// An unreadable key file yields a temporary key when ephemeral keys are
    /// allowed or in debug builds; a short key is always rejected.
    pub fn session_key(&self) -> Result<Key, SettingsError> {
        let path = self.session_key_file();
        match read_key_file(&path) {
            Ok(bytes) if bytes.len() < SESSION_KEY_MIN_LEN => Err(SettingsError::KeyTooShort {
                length: bytes.len(),
                path,
                min_len: SESSION_KEY_MIN_LEN,
            }),
            Ok(bytes) => Ok(Key::derive_from(&bytes)),
            Err(source) if self.allow_ephemeral_key || cfg!(debug_assertions) => {
                warn!(path = %path.display(), error = %source, "using temporary session key (dev only)");
                Ok(Key::generate())
            }
            Err(source) => Err(SettingsError::KeyRead { path, source }),
        }
    }
}

fn read_key_file(path: &Path) -> io::Result<Vec<u8>> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "key path has no file name"))?;
    Dir::open_ambient_dir(parent, ambient_authority())?.read(file_name)
}

#[cfg(test)]
mod tests {
    //! Unit tests for server settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;
    use tripboard::test_support::cap_fs::write_file;

    const VARS: [&str; 6] = [
        "TRIPBOARD_BIND_ADDR",
        "TRIPBOARD_SESSION_KEY_FILE",
        "TRIPBOARD_ALLOW_EPHEMERAL_KEY",
        "TRIPBOARD_COOKIE_SECURE",
        "TRIPBOARD_ALLOWED_ORIGINS",
        "TRIPBOARD_DATASET_PATH",
    ];

    fn load_from_empty_args() -> ServerSettings {
        ServerSettings::load_from_iter([OsString::from("tripboard")]).expect("config should load")
    }

    fn cleared() -> Vec<(&'static str, Option<String>)> {
        VARS.iter().map(|name| (*name, None)).collect()
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(cleared());

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("default address"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("address")
        );
        assert!(settings.cookie_secure);
        assert!(!settings.allow_ephemeral_key);
        assert!(settings.dataset_path.is_none());
        assert_eq!(
            settings.session_key_file(),
            PathBuf::from(DEFAULT_SESSION_KEY_FILE)
        );
        let origins = settings.allowed_origins().expect("default origins");
        let local = url::Url::parse("http://localhost:3000").expect("url");
        assert!(origins.allows(&local));
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let mut vars = cleared();
        vars.extend([
            ("TRIPBOARD_BIND_ADDR", Some("127.0.0.1:9000".to_owned())),
            ("TRIPBOARD_COOKIE_SECURE", Some("false".to_owned())),
            (
                "TRIPBOARD_ALLOWED_ORIGINS",
                Some("https://trips.example".to_owned()),
            ),
            ("TRIPBOARD_DATASET_PATH", Some("/tmp/board.json".to_owned())),
        ]);
        let _guard = lock_env(vars);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("address"),
            "127.0.0.1:9000".parse::<SocketAddr>().expect("address")
        );
        assert!(!settings.cookie_secure);
        assert_eq!(
            settings.dataset_path.as_deref(),
            Some(Path::new("/tmp/board.json"))
        );
        let remote = url::Url::parse("https://trips.example").expect("url");
        assert!(settings.allowed_origins().expect("origins").allows(&remote));
    }

    #[rstest]
    fn malformed_bind_address_is_reported() {
        let mut vars = cleared();
        vars.push(("TRIPBOARD_BIND_ADDR", Some("nowhere".to_owned())));
        let _guard = lock_env(vars);

        let err = load_from_empty_args()
            .bind_addr()
            .expect_err("invalid address");
        assert!(matches!(err, SettingsError::BindAddr { .. }));
    }

    #[rstest]
    #[case(vec![b'k'; 64], true)]
    #[case(vec![b'k'; 16], false)]
    fn session_key_length_is_enforced(#[case] bytes: Vec<u8>, #[case] accepted: bool) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("session_key");
        write_file(&path, &bytes).expect("write key");

        let mut vars = cleared();
        vars.push((
            "TRIPBOARD_SESSION_KEY_FILE",
            Some(path.display().to_string()),
        ));
        let _guard = lock_env(vars);

        let result = load_from_empty_args().session_key();
        assert_eq!(result.is_ok(), accepted);
    }

    #[rstest]
    fn missing_key_file_falls_back_when_ephemeral_keys_are_allowed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut vars = cleared();
        vars.extend([
            (
                "TRIPBOARD_SESSION_KEY_FILE",
                Some(dir.path().join("absent").display().to_string()),
            ),
            ("TRIPBOARD_ALLOW_EPHEMERAL_KEY", Some("true".to_owned())),
        ]);
        let _guard = lock_env(vars);

        assert!(load_from_empty_args().session_key().is_ok());
    }
}

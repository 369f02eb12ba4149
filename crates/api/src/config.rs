use std::net::SocketAddr;
use std::path::PathBuf;

/// Environment variable naming the directory to serve.
pub const FIXTURE_DIR_ENV: &str = "TESTRIG_FIXTURE_DIR";
/// Environment variable naming the listen address.
pub const ADDR_ENV: &str = "TESTRIG_ADDR";

const DEFAULT_ADDR: &str = "127.0.0.1:8081";

/// Fixture server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureConfig {
    /// Directory whose files are served at `/`.
    pub root: PathBuf,
    pub addr: SocketAddr,
}

impl FixtureConfig {
    pub fn new(root: impl Into<PathBuf>, addr: SocketAddr) -> Self {
        Self {
            root: root.into(),
            addr,
        }
    }

    /// Read settings from `TESTRIG_FIXTURE_DIR` / `TESTRIG_ADDR`, falling back
    /// to the working directory and `127.0.0.1:8081`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let root = lookup(FIXTURE_DIR_ENV).map(PathBuf::from).unwrap_or_else(|| {
            tracing::warn!("{FIXTURE_DIR_ENV} not set; serving the working directory");
            PathBuf::from(".")
        });

        let addr = match lookup(ADDR_ENV) {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(value = %raw, error = %e, "invalid {ADDR_ENV}; using {DEFAULT_ADDR}");
                default_addr()
            }),
            None => default_addr(),
        };

        Self { root, addr }
    }
}

fn default_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8081))
}

use std::net::SocketAddr;
use tracing::warn;

pub const ADDR_VAR: &str = "SHEDDING_ADDR";
pub const DEFAULT_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 33030);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(DEFAULT_ADDR),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unparseable values fall back to
    /// the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(ADDR_VAR) {
            match raw.trim().parse::<SocketAddr>() {
                Ok(addr) => config.addr = addr,
                Err(err) => warn!(value = %raw, %err, "ignoring invalid {ADDR_VAR}"),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config.addr, "0.0.0.0:33030".parse().unwrap());
    }

    #[test]
    fn reads_address_override() {
        let config = ServerConfig::from_lookup(|key| {
            (key == ADDR_VAR).then(|| " 127.0.0.1:4000 ".to_string())
        });
        assert_eq!(config.addr, "127.0.0.1:4000".parse().unwrap());
    }

    #[test]
    fn invalid_address_keeps_default() {
        let config = ServerConfig::from_lookup(|_| Some("not-an-address".to_string()));
        assert_eq!(config, ServerConfig::default());
    }
}

//! Process-wide runtime configuration.
//!
//! Defaults come from the environment the first time the configuration is
//! read; `set` and `warn_on_lazy_reuse` change it at runtime.

use once_cell::sync::Lazy;
use parking_lot::RwLock;

/// Environment variable enabling the lazy-reuse diagnostic.
pub const WARN_LAZY_REUSE_ENV: &str = "WEFT_WARN_LAZY_REUSE";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Emit a warning when a lazy sequence is traversed more than once.
    pub warn_on_lazy_reuse: bool,
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let warn_on_lazy_reuse = lookup(WARN_LAZY_REUSE_ENV)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);
        Config { warn_on_lazy_reuse }
    }
}

static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::from_env()));

/// Snapshot of the current configuration.
pub fn current() -> Config {
    *CONFIG.read()
}

/// Replace the current configuration.
pub fn set(config: Config) {
    *CONFIG.write() = config;
}

/// Turn on the lazy-reuse diagnostic.
pub fn warn_on_lazy_reuse() {
    CONFIG.write().warn_on_lazy_reuse = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_quiet() {
        assert!(!Config::default().warn_on_lazy_reuse);
    }

    #[test]
    fn test_from_lookup_parses_flag() {
        let on = Config::from_lookup(|_| Some("TRUE".to_string()));
        assert!(on.warn_on_lazy_reuse);

        let off = Config::from_lookup(|_| Some("0".to_string()));
        assert!(!off.warn_on_lazy_reuse);

        let unset = Config::from_lookup(|_| None);
        assert_eq!(unset, Config::default());
    }
}

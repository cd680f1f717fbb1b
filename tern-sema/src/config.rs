use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid checker configuration: {0}")]
    #[diagnostic(code(tern::config))]
    Toml(#[from] toml::de::Error),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CheckerConfig {
    /// Errors beyond this count abort checking.
    pub error_cap: usize,
    /// Check procedure bodies on the rayon pool.
    pub parallel: bool,
    pub warn_unused_imports: bool,
    pub entry_point: String,
    pub require_entry_point: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            error_cap: 10,
            parallel: false,
            warn_unused_imports: true,
            entry_point: "main".to_string(),
            require_entry_point: false,
        }
    }
}

impl CheckerConfig {
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(src)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg = CheckerConfig::from_toml_str("parallel = true\n").expect("config");
        assert!(cfg.parallel);
        assert_eq!(cfg.error_cap, 10);
        assert_eq!(cfg.entry_point, "main");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = CheckerConfig::from_toml_str("max_errors = 3\n").expect_err("unknown key");
        assert!(err.to_string().contains("invalid checker configuration"));
    }
}

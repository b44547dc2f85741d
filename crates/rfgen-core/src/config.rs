//! Session-level runtime filter configuration that downstream crates can
//! serialize/deserialize.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Default wait budget for a scan that receives its first runtime filter.
pub const DEFAULT_MAX_WAIT_TIME_MS: u64 = 10_000;

/// What a runtime filter tests: set membership or a value range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuntimeFilterType {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "MIN_MAX")]
    MinMax,
}

impl fmt::Display for RuntimeFilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeFilterType::In => f.write_str("IN"),
            RuntimeFilterType::MinMax => f.write_str("MIN_MAX"),
        }
    }
}

impl FromStr for RuntimeFilterType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(RuntimeFilterType::In),
            "MIN_MAX" | "MINMAX" => Ok(RuntimeFilterType::MinMax),
            other => Err(Error::Config(format!(
                "unknown runtime filter type '{other}' (expected IN or MIN_MAX)"
            ))),
        }
    }
}

/// Distribution scope of a runtime filter once it is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuntimeFilterMode {
    #[serde(rename = "LOCAL")]
    Local,
    #[serde(rename = "GLOBAL")]
    Global,
}

impl fmt::Display for RuntimeFilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeFilterMode::Local => f.write_str("LOCAL"),
            RuntimeFilterMode::Global => f.write_str("GLOBAL"),
        }
    }
}

impl FromStr for RuntimeFilterMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOCAL" => Ok(RuntimeFilterMode::Local),
            "GLOBAL" => Ok(RuntimeFilterMode::Global),
            other => Err(Error::Config(format!(
                "unknown runtime filter mode '{other}' (expected LOCAL or GLOBAL)"
            ))),
        }
    }
}

/// Parse a comma separated list such as `"IN,MIN_MAX"`. Order is kept and
/// duplicates are dropped so every enabled type yields exactly one filter.
pub fn parse_filter_types(s: &str) -> Result<Vec<RuntimeFilterType>, Error> {
    let mut types = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let t = part.parse::<RuntimeFilterType>()?;
        if !types.contains(&t) {
            types.push(t);
        }
    }
    Ok(types)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeFilterConfig {
    /// Master switch. When false no filter is generated at all.
    pub enabled: bool,

    /// Enabled filter types, in generation order.
    pub types: Vec<RuntimeFilterType>,

    /// Mode given to filters when they are assigned to a target scan.
    pub mode: RuntimeFilterMode,

    /// Wait budget set on a scan when its first filter is assigned.
    pub max_wait_time_ms: u64,
}

impl Default for RuntimeFilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            types: vec![RuntimeFilterType::In],
            mode: RuntimeFilterMode::Local,
            max_wait_time_ms: DEFAULT_MAX_WAIT_TIME_MS,
        }
    }
}

impl RuntimeFilterConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `RFGEN_RUNTIME_FILTER_ENABLED`: `true`/`false`
    /// - `RFGEN_RUNTIME_FILTER_TYPES`: comma list, e.g. `IN,MIN_MAX`
    /// - `RFGEN_RUNTIME_FILTER_MODE`: `OFF`, `LOCAL` or `GLOBAL`
    /// - `RFGEN_RUNTIME_FILTER_MAX_WAIT_MS`: scan wait budget in milliseconds
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("RFGEN_RUNTIME_FILTER_ENABLED") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.enabled = v;
            }
        }

        if let Ok(s) = std::env::var("RFGEN_RUNTIME_FILTER_TYPES") {
            if let Ok(v) = parse_filter_types(&s) {
                cfg.types = v;
            }
        }

        if let Ok(s) = std::env::var("RFGEN_RUNTIME_FILTER_MODE") {
            if s.trim().eq_ignore_ascii_case("OFF") {
                cfg.enabled = false;
            } else if let Ok(v) = s.parse::<RuntimeFilterMode>() {
                cfg.mode = v;
            }
        }

        if let Ok(s) = std::env::var("RFGEN_RUNTIME_FILTER_MAX_WAIT_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.max_wait_time_ms = v;
            }
        }

        cfg
    }

    /// True when generation should run at all.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = RuntimeFilterConfig::default();
        assert!(cfg.is_active());
        assert_eq!(cfg.types, vec![RuntimeFilterType::In]);
        assert_eq!(cfg.mode, RuntimeFilterMode::Local);
        assert_eq!(cfg.max_wait_time_ms, 10_000);
    }

    #[test]
    fn type_list_keeps_order_and_drops_duplicates() {
        let types = parse_filter_types("min_max, IN ,MIN_MAX").unwrap();
        assert_eq!(
            types,
            vec![RuntimeFilterType::MinMax, RuntimeFilterType::In]
        );
        assert!(parse_filter_types("IN,BLOOM").is_err());
        assert!(parse_filter_types("").unwrap().is_empty());
    }

    #[test]
    fn mode_parsing_is_case_insensitive() {
        assert_eq!(
            "global".parse::<RuntimeFilterMode>().unwrap(),
            RuntimeFilterMode::Global
        );
        assert!("OFF".parse::<RuntimeFilterMode>().is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let cfg = RuntimeFilterConfig {
            types: vec![RuntimeFilterType::In, RuntimeFilterType::MinMax],
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"MIN_MAX\""));
        assert!(json.contains("\"LOCAL\""));

        let partial: RuntimeFilterConfig =
            serde_json::from_str(r#"{"mode":"GLOBAL"}"#).unwrap();
        assert_eq!(partial.mode, RuntimeFilterMode::Global);
        assert_eq!(partial.max_wait_time_ms, DEFAULT_MAX_WAIT_TIME_MS);
    }

    // No other test reads these variables.
    #[test]
    fn env_overrides_defaults_and_ignores_malformed_values() {
        const VARS: [&str; 4] = [
            "RFGEN_RUNTIME_FILTER_ENABLED",
            "RFGEN_RUNTIME_FILTER_TYPES",
            "RFGEN_RUNTIME_FILTER_MODE",
            "RFGEN_RUNTIME_FILTER_MAX_WAIT_MS",
        ];
        let clear = || VARS.iter().for_each(|v| std::env::remove_var(v));

        clear();
        assert_eq!(RuntimeFilterConfig::from_env(), RuntimeFilterConfig::default());

        std::env::set_var("RFGEN_RUNTIME_FILTER_TYPES", "MIN_MAX,IN");
        std::env::set_var("RFGEN_RUNTIME_FILTER_MODE", "global");
        std::env::set_var("RFGEN_RUNTIME_FILTER_MAX_WAIT_MS", "750");
        let cfg = RuntimeFilterConfig::from_env();
        assert!(cfg.is_active());
        assert_eq!(
            cfg.types,
            vec![RuntimeFilterType::MinMax, RuntimeFilterType::In]
        );
        assert_eq!(cfg.mode, RuntimeFilterMode::Global);
        assert_eq!(cfg.max_wait_time_ms, 750);

        std::env::set_var("RFGEN_RUNTIME_FILTER_MODE", "OFF");
        let cfg = RuntimeFilterConfig::from_env();
        assert!(!cfg.enabled);
        assert!(!cfg.is_active());
        assert_eq!(cfg.mode, RuntimeFilterMode::Local);

        std::env::set_var("RFGEN_RUNTIME_FILTER_ENABLED", "maybe");
        std::env::set_var("RFGEN_RUNTIME_FILTER_TYPES", "IN,BLOOM");
        std::env::set_var("RFGEN_RUNTIME_FILTER_MODE", "REGIONAL");
        std::env::set_var("RFGEN_RUNTIME_FILTER_MAX_WAIT_MS", "-5");
        assert_eq!(RuntimeFilterConfig::from_env(), RuntimeFilterConfig::default());

        std::env::set_var("RFGEN_RUNTIME_FILTER_ENABLED", "false");
        assert!(!RuntimeFilterConfig::from_env().enabled);

        clear();
    }

    #[test]
    fn inactive_without_types() {
        let cfg = RuntimeFilterConfig {
            types: vec![],
            ..Default::default()
        };
        assert!(!cfg.is_active());
    }
}

use std::env;

/// Environment switch for [`VerifyConfig::require_connected_inputs`].
pub const REQUIRE_CONNECTED_ENV: &str = "TENSOR_IR_REQUIRE_CONNECTED";
/// Environment switch for [`VerifyConfig::allow_reinterpret_copy`].
pub const ALLOW_REINTERPRET_ENV: &str = "TENSOR_IR_ALLOW_REINTERPRET";

/// Knobs for [`crate::verify::verify_graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyConfig {
    /// Report input connectors that have no producer.
    pub require_connected_inputs: bool,
    /// Let a memory copy change dtype as long as the byte size is preserved.
    pub allow_reinterpret_copy: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            require_connected_inputs: true,
            allow_reinterpret_copy: false,
        }
    }
}

impl VerifyConfig {
    /// Starts from the defaults and applies any overrides set in the environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            require_connected_inputs: env_flag(REQUIRE_CONNECTED_ENV)
                .unwrap_or(defaults.require_connected_inputs),
            allow_reinterpret_copy: env_flag(ALLOW_REINTERPRET_ENV)
                .unwrap_or(defaults.allow_reinterpret_copy),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(parse_bool(&value)),
        _ => None,
    }
}

fn parse_bool(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        for value in ["1", "true", "YES", " on "] {
            assert!(parse_bool(value), "{value:?} should parse as true");
        }
        for value in ["0", "false", "off", "maybe"] {
            assert!(!parse_bool(value), "{value:?} should parse as false");
        }
    }
}

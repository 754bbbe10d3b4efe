use std::path::Path;

use anyhow::{Context, Result};
use coin_selection::{ProtocolParameters, SelectionPolicy};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Environment prefix; nested keys use `__`, e.g. `COIN_SELECT__POLICY__IMPROVE_ATTEMPTS`.
pub const ENV_PREFIX: &str = "COIN_SELECT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub policy: SelectionPolicy,
    /// Used when a request carries no protocol parameters of its own.
    pub protocol_parameters: ProtocolParameters,
}

impl Settings {
    /// Layer defaults, the optional settings file and the environment.
    ///
    /// # Errors
    /// Returns an error if a source cannot be read or parsed, or if the
    /// resulting policy is inconsistent.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }

        let settings: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to load settings")?
            .try_deserialize()
            .context("failed to parse settings")?;

        settings
            .policy
            .validate()
            .context("invalid selection policy in settings")?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("coin-select.toml");
        fs::write(
            &path,
            "[policy]\nimprove_attempts = 5\n\n[protocol_parameters]\nmin_fee_b = 1000\n",
        )
        .expect("write settings");

        let settings = Settings::load(Some(&path)).expect("loads");

        assert_eq!(settings.policy.improve_attempts, 5);
        assert_eq!(
            settings.policy.max_fee_iterations,
            SelectionPolicy::default().max_fee_iterations
        );
        assert_eq!(settings.protocol_parameters.min_fee_b, 1000);
        assert_eq!(
            settings.protocol_parameters.min_fee_a,
            ProtocolParameters::default().min_fee_a
        );
    }

    #[test]
    fn inconsistent_policy_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("coin-select.toml");
        fs::write(&path, "[policy]\nideal_multiplier = 4\nupper_multiplier = 2\n")
            .expect("write settings");

        let err = Settings::load(Some(&path)).expect_err("upper below ideal");
        assert!(format!("{err:#}").contains("upper_multiplier 2 must be >= ideal_multiplier 4"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(Settings::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}

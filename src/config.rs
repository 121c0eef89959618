//! Heap configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! `FIRSTFIT_*` environment variables. The merged result is validated before
//! it is handed out.

use std::{
  path::{Path, PathBuf},
  str::FromStr,
};

use figment::{
  Figment,
  providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{
  align::ALIGNMENT,
  error::{ConfigError, UnknownBackend},
};

/// Where the heap gets its bytes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
  /// A growable `Vec<u8>`.
  #[default]
  Arena,
  /// An anonymous `mmap(2)` reservation (unix only).
  Mmap,
}

impl FromStr for Backend {
  type Err = UnknownBackend;

  fn from_str(name: &str) -> Result<Self, Self::Err> {
    match name {
      "arena" => Ok(Backend::Arena),
      "mmap" => Ok(Backend::Mmap),
      other => Err(UnknownBackend(other.to_string())),
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_split_payload"))]
pub struct HeapConfig {
  /// Bytes the region may grow to, headers included.
  #[validate(range(min = 64))]
  pub capacity: usize,

  pub backend: Backend,

  /// Smallest payload a split may leave behind as a new free block.
  ///
  /// Must be a multiple of the alignment. Free blocks smaller than this are
  /// never carved, so the surplus stays with the allocated block.
  #[validate(range(min = 8, max = 4096))]
  pub min_split_payload: usize,

  /// Run the fragmentation analyzer after every mutating operation and
  /// forward the report to the event sink.
  pub analyze_each_op: bool,

  /// File receiving one JSON line per heap event.
  pub event_log: Option<PathBuf>,
}

impl HeapConfig {
  pub const DEFAULT_CAPACITY: usize = 64 * 1024 * 1024;

  pub const DEFAULT_MIN_SPLIT_PAYLOAD: usize = ALIGNMENT;

  /// Defaults with the given region capacity.
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      capacity,
      ..Self::default()
    }
  }

  /// Loads defaults, then `path` when given, then the environment.
  pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(HeapConfig::default()));

    if let Some(path) = path {
      if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
      }
      figment = figment.merge(Yaml::file(path));
    }

    Self::extract(figment.merge(Env::prefixed("FIRSTFIT_")))
  }

  fn extract(figment: Figment) -> Result<Self, ConfigError> {
    let config: Self = figment.extract()?;
    config.validate()?;
    Ok(config)
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self {
      capacity: Self::DEFAULT_CAPACITY,
      backend: Backend::default(),
      min_split_payload: Self::DEFAULT_MIN_SPLIT_PAYLOAD,
      analyze_each_op: false,
      event_log: None,
    }
  }
}

fn validate_split_payload(config: &HeapConfig) -> Result<(), ValidationError> {
  if config.min_split_payload % ALIGNMENT != 0 {
    return Err(ValidationError::new("min_split_payload_unaligned"));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_config_validates() {
    let config = HeapConfig::default();

    config.validate().unwrap();
    assert_eq!(config.min_split_payload, 8);
    assert_eq!(config.backend, Backend::Arena);
  }

  #[test]
  fn test_unaligned_split_payload_rejected() {
    let config = HeapConfig {
      min_split_payload: 12,
      ..HeapConfig::default()
    };

    assert!(config.validate().is_err());
  }

  #[test]
  fn test_yaml_overrides_defaults() {
    let figment = Figment::from(Serialized::defaults(HeapConfig::default())).merge(Yaml::string(
      "capacity: 4096\nbackend: mmap\nanalyze_each_op: true\n",
    ));

    let config = HeapConfig::extract(figment).unwrap();

    assert_eq!(config.capacity, 4096);
    assert_eq!(config.backend, Backend::Mmap);
    assert!(config.analyze_each_op);
    assert_eq!(config.min_split_payload, 8);
  }

  #[test]
  fn test_invalid_yaml_value_is_a_validation_error() {
    let figment = Figment::from(Serialized::defaults(HeapConfig::default()))
      .merge(Yaml::string("min_split_payload: 4\n"));

    assert!(matches!(
      HeapConfig::extract(figment),
      Err(ConfigError::Validation(_))
    ));
  }

  #[test]
  fn test_missing_file_is_reported() {
    let result = HeapConfig::load(Some(Path::new("/nonexistent/firstfit.yaml")));

    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
  }

  #[test]
  fn test_backend_from_name() {
    assert_eq!("arena".parse::<Backend>().unwrap(), Backend::Arena);
    assert_eq!("mmap".parse::<Backend>().unwrap(), Backend::Mmap);

    let error = "sbrk".parse::<Backend>().unwrap_err();
    assert_eq!(error.to_string(), "unknown backend `sbrk` (expected arena or mmap)");
  }

  #[test]
  fn test_environment_overrides_file() {
    figment::Jail::expect_with(|jail| {
      jail.create_file("firstfit.yaml", "capacity: 4096\nmin_split_payload: 16\n")?;
      jail.set_env("FIRSTFIT_MIN_SPLIT_PAYLOAD", "64");
      jail.set_env("FIRSTFIT_BACKEND", "mmap");

      let config = HeapConfig::load(Some(Path::new("firstfit.yaml"))).map_err(|e| e.to_string())?;

      assert_eq!(config.capacity, 4096);
      assert_eq!(config.min_split_payload, 64);
      assert_eq!(config.backend, Backend::Mmap);
      Ok(())
    });
  }

  #[test]
  fn test_invalid_environment_value_rejected() {
    figment::Jail::expect_with(|jail| {
      jail.set_env("FIRSTFIT_MIN_SPLIT_PAYLOAD", "0");

      let result = HeapConfig::load(None);

      assert!(matches!(result, Err(ConfigError::Validation(_))));
      Ok(())
    });
  }
}

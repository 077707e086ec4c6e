// Copyright 2018-2024 the Deno authors. MIT license.

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::module_specifier::ensure_trailing_slash;
use crate::module_specifier::module_specifier_for_name;
use crate::module_specifier::ModuleSpecifier;
use crate::module_specifier::SpecifierError;
use crate::module_specifier::DEFAULT_BASE_URL;
use crate::shim::Shim;

/// The options the normalizer and the dependency collector read.
pub trait AmdConfig {
  /// Keep `"use strict"` directives. When `false` they are removed from the
  /// module text.
  fn use_strict(&self) -> bool {
    false
  }

  /// Collect the dependencies of `require([...])` calls that are nested in
  /// functions or blocks. Top level calls are always collected.
  fn find_nested_dependencies(&self) -> bool {
    false
  }

  /// The shim registered for a module, if any.
  fn shim(&self, _module_name: &str) -> Option<&Shim> {
    None
  }
}

/// Configuration with every option at its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAmdConfig;

impl AmdConfig for DefaultAmdConfig {}

#[derive(Debug, Error, deno_error::JsError)]
pub enum ConfigError {
  #[class(type)]
  #[error("Invalid build profile: {0}")]
  Json(#[from] serde_json::Error),
}

/// A build profile in the shape used by AMD optimizers.
///
/// ```json
/// {
///   "baseUrl": "file:///app/js/",
///   "useStrict": false,
///   "findNestedDependencies": true,
///   "shim": {
///     "bootstrap": ["jquery"],
///     "backbone": { "deps": ["underscore", "jquery"], "exports": "Backbone" }
///   }
/// }
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub base_url: Option<ModuleSpecifier>,
  pub use_strict: bool,
  pub find_nested_dependencies: bool,
  #[serde(skip_serializing_if = "IndexMap::is_empty")]
  pub shim: IndexMap<String, Shim>,
}

impl BuildConfig {
  pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
    let mut config: BuildConfig = serde_json::from_str(text)?;
    config.base_url = config.base_url.map(ensure_trailing_slash);
    log::debug!(
      "Loaded build profile with {} shim(s)",
      config.shim.len()
    );
    Ok(config)
  }

  pub fn base_url(&self) -> &ModuleSpecifier {
    self.base_url.as_ref().unwrap_or(&DEFAULT_BASE_URL)
  }

  /// Resolves a module id against the configured base url.
  pub fn module_specifier(
    &self,
    name: &str,
  ) -> Result<ModuleSpecifier, SpecifierError> {
    module_specifier_for_name(self.base_url(), name)
  }
}

impl AmdConfig for BuildConfig {
  fn use_strict(&self) -> bool {
    self.use_strict
  }

  fn find_nested_dependencies(&self) -> bool {
    self.find_nested_dependencies
  }

  fn shim(&self, module_name: &str) -> Option<&Shim> {
    self.shim.get(module_name)
  }
}

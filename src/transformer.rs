// Copyright 2018-2024 the Deno authors. MIT license.

use deno_error::JsErrorBox;

use crate::ast::DefaultEsParser;
use crate::ast::EsParser;
use crate::config::AmdConfig;
use crate::module_specifier::ModuleSpecifier;
use crate::normalizer::AmdNormalizer;

/// A source transform run over a module's text before its dependencies
/// are collected.
pub trait Transformer {
  /// Whether this transform should run for the module at `specifier`.
  fn applies_to(&self, specifier: &ModuleSpecifier) -> bool;

  /// Rewrites `content` in place.
  fn transform(
    &self,
    config: &dyn AmdConfig,
    module_name: &str,
    content: &mut String,
  ) -> Result<(), JsErrorBox>;
}

/// Normalizes every module to a named `define` call.
#[derive(Clone, Copy)]
pub struct AmdTransformer<'a> {
  parser: &'a dyn EsParser,
}

impl Default for AmdTransformer<'_> {
  fn default() -> Self {
    Self {
      parser: &DefaultEsParser,
    }
  }
}

impl<'a> AmdTransformer<'a> {
  pub fn new(parser: &'a dyn EsParser) -> Self {
    Self { parser }
  }
}

impl Transformer for AmdTransformer<'_> {
  fn applies_to(&self, _specifier: &ModuleSpecifier) -> bool {
    true
  }

  fn transform(
    &self,
    config: &dyn AmdConfig,
    module_name: &str,
    content: &mut String,
  ) -> Result<(), JsErrorBox> {
    AmdNormalizer::new(self.parser)
      .normalize(config, module_name, content)
      .map_err(JsErrorBox::from_err)
  }
}

/// Runs each transform that applies to `specifier` over `content`, in order.
pub fn transform_all(
  transformers: &[&dyn Transformer],
  config: &dyn AmdConfig,
  specifier: &ModuleSpecifier,
  module_name: &str,
  content: &mut String,
) -> Result<(), JsErrorBox> {
  for transformer in transformers {
    if transformer.applies_to(specifier) {
      transformer.transform(config, module_name, content)?;
    }
  }
  Ok(())
}

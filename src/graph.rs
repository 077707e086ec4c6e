// Copyright 2018-2024 the Deno authors. MIT license.

use crate::ast::CapturingEsParser;
use crate::ast::DefaultParsedSourceStore;
use crate::ast::EsParser;
use crate::collector::CollectError;
use crate::collector::DependencyCollector;
use crate::config::AmdConfig;
use crate::module_specifier::module_specifier_for_name;
use crate::module_specifier::ModuleSpecifier;
use crate::module_specifier::SpecifierError;
use crate::normalizer::AmdNormalizer;
use crate::normalizer::NormalizeError;

use deno_ast::SourcePos;
use deno_ast::SourceTextInfo;
use indexmap::IndexSet;
use serde::Serialize;
use serde::Serializer;
use std::fmt;
use thiserror::Error;

/// A 0-indexed line and byte column reported by the parser.
#[derive(Debug, Clone, Copy)]
pub struct Position {
  pub line: usize,
  pub character: usize,
}

impl Position {
  pub fn from_source_pos(pos: SourcePos, text_info: &SourceTextInfo) -> Self {
    let line_and_column_index = text_info.line_and_column_index(pos);
    Self {
      line: line_and_column_index.line_index,
      character: line_and_column_index.column_index,
    }
  }
}

#[derive(Debug, Error, deno_error::JsError)]
pub enum ModuleError {
  #[class(inherit)]
  #[error("Failed to normalize {0}: {1}")]
  Normalize(String, #[source] #[inherit] NormalizeError),
  #[class(inherit)]
  #[error("Failed to collect the dependencies of {0}: {1}")]
  Collect(String, #[source] #[inherit] CollectError),
}

impl ModuleError {
  pub fn module_name(&self) -> &str {
    match self {
      Self::Normalize(name, _) | Self::Collect(name, _) => name.as_str(),
    }
  }
}

/// A single AMD module: its id, where its source lives, the source text
/// and the dependencies found so far.
///
/// The dependency set only ever grows and keeps insertion order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
  name: String,
  specifier: ModuleSpecifier,
  #[serde(rename = "size", serialize_with = "serialize_content")]
  content: String,
  #[serde(skip_serializing_if = "IndexSet::is_empty")]
  dependencies: IndexSet<String>,
}

impl Module {
  pub fn new(
    name: impl Into<String>,
    specifier: ModuleSpecifier,
    content: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      specifier,
      content: content.into(),
      dependencies: Default::default(),
    }
  }

  /// Creates a module whose specifier is resolved from its id.
  pub fn from_base_url(
    base: &ModuleSpecifier,
    name: impl Into<String>,
    content: impl Into<String>,
  ) -> Result<Self, SpecifierError> {
    let name = name.into();
    let specifier = module_specifier_for_name(base, &name)?;
    Ok(Self::new(name, specifier, content))
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn specifier(&self) -> &ModuleSpecifier {
    &self.specifier
  }

  pub fn content(&self) -> &str {
    &self.content
  }

  /// Direct access to the text buffer for transforms that edit it in place.
  pub fn content_mut(&mut self) -> &mut String {
    &mut self.content
  }

  pub fn dependencies(&self) -> &IndexSet<String> {
    &self.dependencies
  }

  /// Normalizes the module text to a named `define` call.
  pub fn normalize(
    &mut self,
    config: &dyn AmdConfig,
    parser: &dyn EsParser,
  ) -> Result<(), NormalizeError> {
    AmdNormalizer::new(parser).normalize_with_specifier(
      config,
      &self.name,
      &self.specifier,
      &mut self.content,
    )
  }

  /// Collects the module's dependencies into its dependency set.
  pub fn collect_dependencies(
    &mut self,
    config: &dyn AmdConfig,
    parser: &dyn EsParser,
  ) -> Result<&IndexSet<String>, CollectError> {
    let dependencies = DependencyCollector::new(parser).collect(config, self)?;
    self.dependencies.extend(dependencies);
    Ok(&self.dependencies)
  }

  /// Normalizes the module and then collects its dependencies.
  ///
  /// When normalization leaves the text as it was, the dependency
  /// collector reuses the first parse.
  pub fn analyze(
    &mut self,
    config: &dyn AmdConfig,
    maybe_parser: Option<&dyn EsParser>,
  ) -> Result<(), ModuleError> {
    let store = DefaultParsedSourceStore::default();
    let parser = CapturingEsParser::new(maybe_parser, &store);
    if let Err(err) = self.normalize(config, &parser) {
      return Err(ModuleError::Normalize(self.name.clone(), err));
    }
    let collected = self.collect_dependencies(config, &parser).map(|_| ());
    if let Err(err) = collected {
      return Err(ModuleError::Collect(self.name.clone(), err));
    }
    Ok(())
  }
}

impl fmt::Display for Module {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)
  }
}

fn serialize_content<S>(content: &str, serializer: S) -> Result<S::Ok, S::Error>
where
  S: Serializer,
{
  serializer.serialize_u32(content.len() as u32)
}

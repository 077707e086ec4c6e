// Copyright 2018-2024 the Deno authors. All rights reserved. MIT license.

#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]

mod ast;
mod collector;
mod config;
mod graph;
mod line_index;
mod module_specifier;
mod normalizer;
mod shim;
mod transformer;

use indexmap::IndexSet;

pub use ast::CapturingEsParser;
pub use ast::DefaultEsParser;
pub use ast::DefaultParsedSourceStore;
pub use ast::EsParser;
pub use ast::ParseOptions;
pub use ast::ParsedSourceStore;
pub use collector::CollectError;
pub use collector::DependencyCollector;
pub use config::AmdConfig;
pub use config::BuildConfig;
pub use config::ConfigError;
pub use config::DefaultAmdConfig;
pub use deno_ast::MediaType;
pub use graph::Module;
pub use graph::ModuleError;
pub use graph::Position;
pub use line_index::LineOffsetIndex;
pub use module_specifier::module_specifier_for_name;
pub use module_specifier::ModuleSpecifier;
pub use module_specifier::SpecifierError;
pub use module_specifier::DEFAULT_BASE_URL;
pub use normalizer::AmdNormalizer;
pub use normalizer::NormalizeError;
pub use shim::Shim;
pub use shim::ShimError;
pub use transformer::transform_all;
pub use transformer::AmdTransformer;
pub use transformer::Transformer;

/// Normalize the text of a single module in place, so that it contains a
/// named `define` call.
pub fn normalize(
  config: &dyn AmdConfig,
  module_name: &str,
  content: &mut String,
) -> Result<(), NormalizeError> {
  AmdNormalizer::default().normalize(config, module_name, content)
}

/// Collect the dependencies of a module without touching the module.
pub fn collect(
  config: &dyn AmdConfig,
  module: &Module,
) -> Result<IndexSet<String>, CollectError> {
  DependencyCollector::default().collect(config, module)
}

pub struct AnalyzeModuleOptions<'a> {
  pub config: &'a dyn AmdConfig,
  pub maybe_parser: Option<&'a dyn EsParser>,
}

/// Normalize a module and then collect its dependencies into it.
pub fn analyze_module(
  module: &mut Module,
  options: AnalyzeModuleOptions,
) -> Result<(), ModuleError> {
  module.analyze(options.config, options.maybe_parser)
}

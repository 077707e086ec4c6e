// Copyright 2018-2024 the Deno authors. MIT license.

use deno_ast::swc::ast::ArrowExpr;
use deno_ast::swc::ast::CallExpr;
use deno_ast::swc::ast::Class;
use deno_ast::swc::ast::Expr;
use deno_ast::swc::ast::ExprStmt;
use deno_ast::swc::ast::Function;
use deno_ast::swc::ast::Stmt;
use deno_ast::swc::common::Span;
use deno_ast::swc::ecma_visit::Visit;
use deno_ast::swc::ecma_visit::VisitWith;
use deno_ast::MediaType;
use deno_ast::ParseDiagnostic;
use indexmap::IndexSet;
use thiserror::Error;

use crate::ast::AmdCall;
use crate::ast::DefaultEsParser;
use crate::ast::EsParser;
use crate::ast::ParseOptions;
use crate::config::AmdConfig;
use crate::graph::Module;

#[derive(Debug, Error, deno_error::JsError)]
pub enum CollectError {
  #[class(inherit)]
  #[error(transparent)]
  Parse(#[from] ParseDiagnostic),
}

/// Finds the module ids a module depends on.
pub struct DependencyCollector<'a> {
  parser: &'a dyn EsParser,
}

impl Default for DependencyCollector<'_> {
  fn default() -> Self {
    Self {
      parser: &DefaultEsParser,
    }
  }
}

impl<'a> DependencyCollector<'a> {
  pub fn new(parser: &'a dyn EsParser) -> Self {
    Self { parser }
  }

  /// Returns the dependencies of `module` in the order they are found,
  /// followed by the dependencies of its shim.
  ///
  /// Only JavaScript modules are parsed. Any other media type, and empty
  /// content, yields an empty set.
  pub fn collect(
    &self,
    config: &dyn AmdConfig,
    module: &Module,
  ) -> Result<IndexSet<String>, CollectError> {
    let specifier = module.specifier();
    if module.content().is_empty() {
      log::debug!("Skipping empty module {}", module.name());
      return Ok(IndexSet::new());
    }
    let media_type = MediaType::from_specifier(specifier);
    if media_type != MediaType::JavaScript {
      log::debug!(
        "Skipping {} with media type {}",
        module.name(),
        media_type
      );
      return Ok(IndexSet::new());
    }

    let parsed_source = self.parser.parse_program(ParseOptions {
      specifier,
      source: module.content().into(),
      media_type,
    })?;
    let mut visitor = DependencyVisitor {
      find_nested_dependencies: config.find_nested_dependencies(),
      stmt_depth: 0,
      scope_depth: 0,
      top_level_call: None,
      dependencies: IndexSet::new(),
    };
    parsed_source.program().visit_with(&mut visitor);

    let mut dependencies = visitor.dependencies;
    if let Some(shim) = config.shim(module.name()) {
      dependencies.extend(shim.deps().iter().cloned());
    }
    Ok(dependencies)
  }
}

struct DependencyVisitor {
  find_nested_dependencies: bool,
  /// Number of statements enclosing the current node, counting the
  /// program level statement itself.
  stmt_depth: usize,
  /// Number of functions, arrows and classes enclosing the current node.
  scope_depth: usize,
  /// The call that makes up the whole of the current top level statement.
  top_level_call: Option<Span>,
  dependencies: IndexSet<String>,
}

impl DependencyVisitor {
  fn add_dependencies(&mut self, call: AmdCall) {
    for id in call.dependency_ids() {
      if let Some((plugin, _)) = id.split_once('!') {
        if !plugin.is_empty() {
          self.dependencies.insert(plugin.to_string());
        }
      }
      self.dependencies.insert(id);
    }
  }
}

impl Visit for DependencyVisitor {
  fn visit_stmt(&mut self, node: &Stmt) {
    self.stmt_depth += 1;
    node.visit_children_with(self);
    self.stmt_depth -= 1;
  }

  fn visit_expr_stmt(&mut self, node: &ExprStmt) {
    let is_program_stmt = self.stmt_depth == 1 && self.scope_depth == 0;
    let previous = self.top_level_call.take();
    match &*node.expr {
      Expr::Call(call) if is_program_stmt => {
        self.top_level_call = Some(call.span);
      }
      _ => {}
    }
    node.visit_children_with(self);
    self.top_level_call = previous;
  }

  fn visit_function(&mut self, node: &Function) {
    self.scope_depth += 1;
    node.visit_children_with(self);
    self.scope_depth -= 1;
  }

  fn visit_arrow_expr(&mut self, node: &ArrowExpr) {
    self.scope_depth += 1;
    node.visit_children_with(self);
    self.scope_depth -= 1;
  }

  fn visit_class(&mut self, node: &Class) {
    self.scope_depth += 1;
    node.visit_children_with(self);
    self.scope_depth -= 1;
  }

  fn visit_call_expr(&mut self, node: &CallExpr) {
    match AmdCall::from_call(node) {
      Some(call @ AmdCall::Define(_)) => self.add_dependencies(call),
      Some(call @ AmdCall::Require(_)) => {
        if self.find_nested_dependencies
          || self.top_level_call == Some(node.span)
        {
          self.add_dependencies(call);
        }
      }
      None => {}
    }
    node.visit_children_with(self);
  }
}

// Copyright 2018-2024 the Deno authors. MIT license.

use std::ops::Range;

use deno_ast::apply_text_changes;
use deno_ast::swc::ast::CallExpr;
use deno_ast::swc::ast::Expr;
use deno_ast::swc::ast::ExprStmt;
use deno_ast::swc::ast::Lit;
use deno_ast::swc::ecma_visit::Visit;
use deno_ast::swc::ecma_visit::VisitWith;
use deno_ast::MediaType;
use deno_ast::ParseDiagnostic;
use deno_ast::SourcePos;
use deno_ast::SourceRangedForSpanned;
use deno_ast::SourceTextInfo;
use deno_ast::TextChange;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::ast::AmdCall;
use crate::ast::DefaultEsParser;
use crate::ast::DefineArgs;
use crate::ast::EsParser;
use crate::ast::ParseOptions;
use crate::config::AmdConfig;
use crate::graph::Position;
use crate::line_index::LineOffsetIndex;
use crate::module_specifier::module_specifier_for_name;
use crate::module_specifier::ModuleSpecifier;
use crate::module_specifier::DEFAULT_BASE_URL;
use crate::shim::escape_string;
use crate::shim::render_shim_define;

const USE_STRICT: &str = "use strict";

/// Parse specifier for modules whose name does not resolve to a URL.
static FALLBACK_SPECIFIER: Lazy<ModuleSpecifier> =
  Lazy::new(|| ModuleSpecifier::parse("file:///module.js").unwrap());

#[derive(Debug, Error, deno_error::JsError)]
pub enum NormalizeError {
  #[class(inherit)]
  #[error(transparent)]
  Parse(#[from] ParseDiagnostic),
}

/// Rewrites module text so it contains a named AMD `define` call.
pub struct AmdNormalizer<'a> {
  parser: &'a dyn EsParser,
}

impl Default for AmdNormalizer<'_> {
  fn default() -> Self {
    Self {
      parser: &DefaultEsParser,
    }
  }
}

impl<'a> AmdNormalizer<'a> {
  pub fn new(parser: &'a dyn EsParser) -> Self {
    Self { parser }
  }

  /// Normalizes `content` in place.
  ///
  /// The module is parsed under a specifier derived from its name. Empty
  /// content is left alone. Only a parse failure is an error, and then the
  /// content is not modified.
  pub fn normalize(
    &self,
    config: &dyn AmdConfig,
    module_name: &str,
    content: &mut String,
  ) -> Result<(), NormalizeError> {
    if content.is_empty() {
      return Ok(());
    }
    let specifier =
      match module_specifier_for_name(&DEFAULT_BASE_URL, module_name) {
        Ok(specifier) => specifier,
        Err(err) => {
          log::debug!("{err}, parsing as {}", *FALLBACK_SPECIFIER);
          FALLBACK_SPECIFIER.clone()
        }
      };
    self.normalize_with_specifier(config, module_name, &specifier, content)
  }

  pub(crate) fn normalize_with_specifier(
    &self,
    config: &dyn AmdConfig,
    module_name: &str,
    specifier: &ModuleSpecifier,
    content: &mut String,
  ) -> Result<(), NormalizeError> {
    if content.is_empty() {
      return Ok(());
    }
    let parsed_source = self.parser.parse_program(ParseOptions {
      specifier,
      source: content.as_str().into(),
      media_type: MediaType::JavaScript,
    })?;
    let text: &str = parsed_source.text();
    let mut visitor = AmdVisitor {
      config,
      module_name,
      text,
      text_info: parsed_source.text_info_lazy(),
      lines: LineOffsetIndex::new(text),
      comment_ranges: Vec::new(),
      define_count: 0,
      text_changes: Vec::new(),
    };
    for comment in parsed_source.comments().get_vec().iter() {
      let start = visitor.offset_of(comment.start());
      let end = visitor.offset_of(comment.end());
      visitor.comment_ranges.push(start..end);
    }
    parsed_source.program().visit_with(&mut visitor);

    let mut text_changes = visitor.text_changes;
    if visitor.define_count == 0 {
      log::debug!("No define call in {module_name}, appending a shim");
      text_changes.push(TextChange {
        range: text.len()..text.len(),
        new_text: render_shim_define(module_name, config.shim(module_name)),
      });
    } else if visitor.define_count > 1 {
      log::debug!(
        "Found {} define calls in {module_name}",
        visitor.define_count
      );
    }

    if !text_changes.is_empty() {
      *content = apply_text_changes(text, text_changes);
    }
    Ok(())
  }
}

struct AmdVisitor<'a> {
  config: &'a dyn AmdConfig,
  module_name: &'a str,
  text: &'a str,
  text_info: &'a SourceTextInfo,
  lines: LineOffsetIndex<'a>,
  comment_ranges: Vec<Range<usize>>,
  define_count: usize,
  /// Edits against the original text, applied once the walk is done.
  text_changes: Vec<TextChange>,
}

impl AmdVisitor<'_> {
  fn offset_of(&mut self, pos: SourcePos) -> usize {
    let position = Position::from_source_pos(pos, self.text_info);
    self.lines.offset_of(&position)
  }

  fn insert(&mut self, offset: usize, new_text: String) {
    self.text_changes.push(TextChange {
      range: offset..offset,
      new_text,
    });
  }

  /// Finds the first `c` in `offset..end` that is not inside a comment.
  fn find_outside_comments(
    &self,
    mut offset: usize,
    end: usize,
    c: char,
  ) -> Option<usize> {
    loop {
      let found = offset + self.text.get(offset..end)?.find(c)?;
      match self
        .comment_ranges
        .iter()
        .find(|range| range.contains(&found))
      {
        Some(range) => offset = range.end,
        None => return Some(found),
      }
    }
  }

  fn strip_use_strict(&mut self, stmt: &ExprStmt) {
    let start = self.offset_of(stmt.start());
    let end = self.offset_of(stmt.end());
    self.text_changes.push(TextChange {
      range: start..end,
      new_text: String::new(),
    });
  }

  fn repair_define(&mut self, call: &CallExpr) {
    let args = DefineArgs::classify(&call.args);
    if args.is_complete() {
      return;
    }
    let callee_end = self.offset_of(call.callee.end());
    let call_end = self.offset_of(call.end());
    let Some(paren_offset) =
      self.find_outside_comments(callee_end, call_end, '(')
    else {
      return;
    };
    let after_paren = paren_offset + 1;

    if !args.has_module_id {
      let mut new_text = format!("'{}',", escape_string(self.module_name, '\''));
      if !args.has_dependencies {
        new_text.push_str("[],");
      }
      self.insert(after_paren, new_text);
      return;
    }

    // the module id is present, so the array goes after its comma
    let id_end = self.offset_of(call.args[0].expr.end());
    match call.args.get(1) {
      Some(next_arg) => {
        let next_start = self.offset_of(next_arg.start());
        match self.find_outside_comments(id_end, next_start, ',') {
          Some(comma_offset) => {
            self.insert(comma_offset + 1, "[],".to_string())
          }
          None => self.insert(id_end, ",[],".to_string()),
        }
      }
      None => self.insert(id_end, ",[]".to_string()),
    }
  }
}

impl Visit for AmdVisitor<'_> {
  fn visit_expr_stmt(&mut self, node: &ExprStmt) {
    if !self.config.use_strict() && is_use_strict_directive(node) {
      self.strip_use_strict(node);
    }
    node.visit_children_with(self);
  }

  fn visit_call_expr(&mut self, node: &CallExpr) {
    if let Some(AmdCall::Define(call)) = AmdCall::from_call(node) {
      self.define_count += 1;
      self.repair_define(call);
    }
    node.visit_children_with(self);
  }
}

fn is_use_strict_directive(stmt: &ExprStmt) -> bool {
  match &*stmt.expr {
    Expr::Lit(Lit::Str(lit)) => &*lit.value == USE_STRICT,
    _ => false,
  }
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::config::BuildConfig;
  use crate::config::DefaultAmdConfig;
  use crate::shim::Shim;

  fn normalize(config: &dyn AmdConfig, name: &str, text: &str) -> String {
    let mut content = text.to_string();
    AmdNormalizer::default()
      .normalize(config, name, &mut content)
      .unwrap();
    content
  }

  #[test]
  fn leaves_complete_define_alone() {
    let text = "define(\"a\", [\"b\"], function (b) { return b; });\n";
    assert_eq!(normalize(&DefaultAmdConfig, "a", text), text);
  }

  #[test]
  fn inserts_name_and_dependencies() {
    assert_eq!(
      normalize(&DefaultAmdConfig, "a", "define(function () {});"),
      "define('a',[],function () {});"
    );
  }

  #[test]
  fn inserts_name_before_existing_dependencies() {
    assert_eq!(
      normalize(
        &DefaultAmdConfig,
        "a",
        "define([\"a\",\"b\"], function () {});"
      ),
      "define('a',[\"a\",\"b\"], function () {});"
    );
  }

  #[test]
  fn inserts_dependencies_after_name() {
    assert_eq!(
      normalize(&DefaultAmdConfig, "a", "define('x,y', function () {});"),
      "define('x,y',[], function () {});"
    );
    assert_eq!(
      normalize(&DefaultAmdConfig, "a", "define(\"a\");"),
      "define(\"a\",[]);"
    );
  }

  #[test]
  fn handles_empty_define() {
    assert_eq!(
      normalize(&DefaultAmdConfig, "empty", "define();"),
      "define('empty',[],);"
    );
  }

  #[test]
  fn repairs_define_on_later_lines() {
    let text = "// header\nvar x = 1;\n\n  define(\n    function () {}\n  );\n";
    assert_eq!(
      normalize(&DefaultAmdConfig, "m", text),
      "// header\nvar x = 1;\n\n  define('m',[],\n    function () {}\n  );\n"
    );
  }

  #[test]
  fn repairs_every_define_call() {
    let text = concat!(
      "\"use strict\";\n",
      "if (typeof define === 'function' && define.amd) {\n",
      "  define(['jquery'], factory);\n",
      "} else {\n",
      "  define(function () {});\n",
      "}\n",
    );
    assert_eq!(
      normalize(&DefaultAmdConfig, "umd", text),
      concat!(
        "\n",
        "if (typeof define === 'function' && define.amd) {\n",
        "  define('umd',['jquery'], factory);\n",
        "} else {\n",
        "  define('umd',[],function () {});\n",
        "}\n",
      )
    );
  }

  #[test]
  fn ignores_member_and_aliased_define() {
    let text = "lib.define(function () {});\nvar d = define;\n";
    let output = normalize(&DefaultAmdConfig, "x", text);
    assert_eq!(
      output,
      format!("{text}\ndefine(\"x\", function(){{}});\n")
    );
  }

  #[test]
  fn strips_use_strict() {
    let text = "'use strict';\ndefine(\"a\", [], function () {\n  \"use strict\";\n  return 1;\n});\n";
    assert_eq!(
      normalize(&DefaultAmdConfig, "a", text),
      "\ndefine(\"a\", [], function () {\n  \n  return 1;\n});\n"
    );
  }

  #[test]
  fn keeps_use_strict_when_allowed() {
    let config = BuildConfig {
      use_strict: true,
      ..Default::default()
    };
    let text = "\"use strict\";\ndefine(\"a\", [], function () {});\n";
    assert_eq!(normalize(&config, "a", text), text);
  }

  #[test]
  fn keeps_use_strict_that_is_not_a_statement() {
    let text = "define(\"a\", [], function () { return \"use strict\"; });";
    assert_eq!(normalize(&DefaultAmdConfig, "a", text), text);
  }

  #[test]
  fn appends_empty_define_without_shim() {
    assert_eq!(
      normalize(&DefaultAmdConfig, "legacy", "var x = 1;"),
      "var x = 1;\ndefine(\"legacy\", function(){});\n"
    );
  }

  #[test]
  fn appends_shim_define() {
    let mut config = BuildConfig::default();
    config.shim.insert(
      "mylib".to_string(),
      Shim::new(
        vec!["jquery".to_string()],
        Some("MyLib".to_string()),
        None,
      )
      .unwrap(),
    );
    let output = normalize(&config, "mylib", "window.MyLib = {};");
    assert!(output.starts_with("window.MyLib = {};\ndefine(\"mylib\", [\"jquery\"], (function (global) {\n"));
    assert!(output.contains("return ret || global.MyLib;"));
  }

  #[test]
  fn empty_content_is_untouched() {
    assert_eq!(normalize(&DefaultAmdConfig, "a", ""), "");
  }

  #[test]
  fn parse_errors_leave_content_untouched() {
    let mut content = "define(function () {".to_string();
    let result =
      AmdNormalizer::default().normalize(&DefaultAmdConfig, "a", &mut content);
    assert!(matches!(result, Err(NormalizeError::Parse(_))));
    assert_eq!(content, "define(function () {");
  }

  #[test]
  fn works_with_multibyte_text() {
    let text = "var s = \"héllo wörld\"; define(function () {});";
    assert_eq!(
      normalize(&DefaultAmdConfig, "u", text),
      "var s = \"héllo wörld\"; define('u',[],function () {});"
    );
  }

  #[test]
  fn skips_parens_in_comments_before_arguments() {
    assert_eq!(
      normalize(&DefaultAmdConfig, "a", "define /* ( */ (function(){});"),
      "define /* ( */ ('a',[],function(){});"
    );
    assert_eq!(
      normalize(&DefaultAmdConfig, "a", "define // call (\n(function(){});"),
      "define // call (\n('a',[],function(){});"
    );
    assert_eq!(
      normalize(
        &DefaultAmdConfig,
        "a",
        "define(\"a\" /* , ( */, function(){});"
      ),
      "define(\"a\" /* , ( */,[], function(){});"
    );
  }

  #[test]
  fn module_names_that_are_not_urls() {
    assert_eq!(
      normalize(&DefaultAmdConfig, "http://[", "define(function(){});"),
      "define('http://[',[],function(){});"
    );
  }

  #[test]
  fn escapes_module_name() {
    assert_eq!(
      normalize(&DefaultAmdConfig, "it's", "define(function () {});"),
      "define('it\\'s',[],function () {});"
    );
  }
}

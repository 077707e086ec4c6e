// Copyright 2018-2024 the Deno authors. MIT license.

use deno_ast::swc::ast::ArrayLit;
use deno_ast::swc::ast::CallExpr;
use deno_ast::swc::ast::Callee;
use deno_ast::swc::ast::Expr;
use deno_ast::swc::ast::ExprOrSpread;
use deno_ast::swc::ast::Lit;
use deno_ast::swc::ast::Str;

/// A call to one of the AMD loader globals.
///
/// Only bare identifier callees count, so `foo.define(...)` or an aliased
/// `var d = define; d(...)` are not module definitions.
#[derive(Debug, Clone, Copy)]
pub enum AmdCall<'a> {
  Define(&'a CallExpr),
  Require(&'a CallExpr),
}

impl<'a> AmdCall<'a> {
  pub fn from_call(call: &'a CallExpr) -> Option<Self> {
    let Callee::Expr(callee) = &call.callee else {
      return None;
    };
    let Expr::Ident(ident) = &**callee else {
      return None;
    };
    match &*ident.sym {
      "define" => Some(AmdCall::Define(call)),
      "require" => Some(AmdCall::Require(call)),
      _ => None,
    }
  }

  pub fn call(&self) -> &'a CallExpr {
    match self {
      AmdCall::Define(call) | AmdCall::Require(call) => call,
    }
  }

  /// The first array literal argument, which holds the dependency ids.
  pub fn dependency_array(&self) -> Option<&'a ArrayLit> {
    self.call().args.iter().find_map(array_lit)
  }

  /// String literal elements of the dependency array. Holes, spreads and
  /// computed elements are skipped.
  pub fn dependency_ids(&self) -> Vec<String> {
    let Some(array) = self.dependency_array() else {
      return Vec::new();
    };
    array
      .elems
      .iter()
      .flatten()
      .filter(|elem| elem.spread.is_none())
      .filter_map(|elem| match &*elem.expr {
        Expr::Lit(Lit::Str(lit)) => Some(str_value(lit)),
        _ => None,
      })
      .collect()
  }
}

/// Which of the optional leading `define` arguments are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefineArgs {
  pub has_module_id: bool,
  pub has_dependencies: bool,
}

impl DefineArgs {
  pub fn classify(args: &[ExprOrSpread]) -> Self {
    match args {
      [] => Self {
        has_module_id: false,
        has_dependencies: false,
      },
      [only] => Self {
        has_module_id: str_lit(only).is_some(),
        has_dependencies: array_lit(only).is_some(),
      },
      [first, second, ..] => {
        let has_module_id = str_lit(first).is_some();
        let deps_arg = if has_module_id { second } else { first };
        Self {
          has_module_id,
          has_dependencies: array_lit(deps_arg).is_some(),
        }
      }
    }
  }

  pub fn is_complete(&self) -> bool {
    self.has_module_id && self.has_dependencies
  }
}

fn str_lit(arg: &ExprOrSpread) -> Option<&Str> {
  if arg.spread.is_some() {
    return None;
  }
  match &*arg.expr {
    Expr::Lit(Lit::Str(lit)) => Some(lit),
    _ => None,
  }
}

fn array_lit(arg: &ExprOrSpread) -> Option<&ArrayLit> {
  if arg.spread.is_some() {
    return None;
  }
  match &*arg.expr {
    Expr::Array(array) => Some(array),
    _ => None,
  }
}

pub fn str_value(lit: &Str) -> String {
  lit.value.to_string()
}

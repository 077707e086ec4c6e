// Copyright 2018-2024 the Deno authors. MIT license.

use std::borrow::Cow;

use capacity_builder::StringBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Matches a dotted global name such as `Backbone` or `jQuery.fn.plugin`.
static EXPORTS_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*$").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Error, deno_error::JsError)]
pub enum ShimError {
  #[class(type)]
  #[error("Shim declares an init function but no exports.")]
  InitWithoutExports,
  #[class(type)]
  #[error("Shim exports \"{0}\" is not a dotted global name.")]
  InvalidExports(String),
}

/// Describes how to wrap a script that does not call `define` itself.
///
/// A shim with an `init` function must also name its `exports`, as the
/// generated factory falls back to that global when `init` returns nothing.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawShim")]
pub struct Shim {
  deps: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  exports: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  init: Option<String>,
}

impl Shim {
  pub fn new(
    deps: Vec<String>,
    exports: Option<String>,
    init: Option<String>,
  ) -> Result<Self, ShimError> {
    match (&exports, &init) {
      (None, Some(_)) => return Err(ShimError::InitWithoutExports),
      (Some(exports), _) if !EXPORTS_RE.is_match(exports) => {
        return Err(ShimError::InvalidExports(exports.clone()))
      }
      _ => {}
    }
    Ok(Self {
      deps,
      exports,
      init,
    })
  }

  /// A shim that only declares dependencies.
  pub fn from_deps(deps: Vec<String>) -> Self {
    Self {
      deps,
      exports: None,
      init: None,
    }
  }

  pub fn deps(&self) -> &[String] {
    &self.deps
  }

  pub fn exports(&self) -> Option<&str> {
    self.exports.as_deref()
  }

  pub fn init(&self) -> Option<&str> {
    self.init.as_deref()
  }
}

/// The forms a shim takes in a build profile: either a bare list of
/// dependencies or an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawShim {
  Deps(Vec<String>),
  Options {
    #[serde(default)]
    deps: Vec<String>,
    #[serde(default)]
    exports: Option<String>,
    #[serde(default)]
    init: Option<String>,
  },
}

impl TryFrom<RawShim> for Shim {
  type Error = ShimError;

  fn try_from(raw: RawShim) -> Result<Self, Self::Error> {
    match raw {
      RawShim::Deps(deps) => Ok(Shim::from_deps(deps)),
      RawShim::Options {
        deps,
        exports,
        init,
      } => Shim::new(deps, exports, init),
    }
  }
}

/// Renders the `define` call appended to a module that has none.
///
/// Building in-memory text cannot fail.
pub(crate) fn render_shim_define(
  module_name: &str,
  maybe_shim: Option<&Shim>,
) -> String {
  let name = escape_string(module_name, '"');
  let deps = maybe_shim
    .map(|shim| {
      shim
        .deps
        .iter()
        .map(|dep| escape_string(dep, '"'))
        .collect::<Vec<_>>()
    })
    .unwrap_or_default();
  let exports = maybe_shim.and_then(|shim| shim.exports());
  let init = maybe_shim.and_then(|shim| shim.init());

  StringBuilder::<String>::build(|builder| {
    builder.append("\ndefine(\"");
    builder.append(&*name);
    builder.append('"');
    let Some(exports) = exports else {
      builder.append(", function(){});\n");
      return;
    };
    if !deps.is_empty() {
      builder.append(", [\"");
      for (i, dep) in deps.iter().enumerate() {
        if i > 0 {
          builder.append("\", \"");
        }
        builder.append(&**dep);
      }
      builder.append("\"]");
    }
    builder.append(", (function (global) {\n");
    builder.append("    return function () {\n");
    builder.append("        var ret, fn;\n");
    if let Some(init) = init {
      builder.append("fn = ");
      builder.append(init);
      builder.append(";\n");
      builder.append("        ret = fn.apply(global, arguments);\n");
    }
    builder.append("        return ret || global.");
    builder.append(exports);
    builder.append(";\n");
    builder.append("    };\n");
    builder.append("}(this)));\n");
  })
  .unwrap()
}

/// Escapes `text` for use inside a JavaScript string literal delimited by
/// `quote`.
pub(crate) fn escape_string(text: &str, quote: char) -> Cow<'_, str> {
  if !text.contains(['\\', quote, '\n', '\r']) {
    return Cow::Borrowed(text);
  }
  let mut escaped = String::with_capacity(text.len() + 2);
  for c in text.chars() {
    match c {
      '\\' => escaped.push_str("\\\\"),
      '\n' => escaped.push_str("\\n"),
      '\r' => escaped.push_str("\\r"),
      c if c == quote => {
        escaped.push('\\');
        escaped.push(c);
      }
      c => escaped.push(c),
    }
  }
  Cow::Owned(escaped)
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn renders_empty_define_without_shim() {
    assert_eq!(
      render_shim_define("legacy", None),
      "\ndefine(\"legacy\", function(){});\n"
    );
  }

  #[test]
  fn renders_empty_define_for_deps_only_shim() {
    let shim = Shim::from_deps(vec!["jquery".to_string()]);
    assert_eq!(
      render_shim_define("plugin", Some(&shim)),
      "\ndefine(\"plugin\", function(){});\n"
    );
  }

  #[test]
  fn renders_exports_accessor() {
    let shim = Shim::new(
      vec!["jquery".to_string()],
      Some("MyLib".to_string()),
      None,
    )
    .unwrap();
    assert_eq!(
      render_shim_define("mylib", Some(&shim)),
      concat!(
        "\ndefine(\"mylib\", [\"jquery\"], (function (global) {\n",
        "    return function () {\n",
        "        var ret, fn;\n",
        "        return ret || global.MyLib;\n",
        "    };\n",
        "}(this)));\n",
      )
    );
  }

  #[test]
  fn renders_init_function() {
    let shim = Shim::new(
      vec!["underscore".to_string(), "jquery".to_string()],
      Some("Backbone".to_string()),
      Some("function () { return this.Backbone.noConflict(); }".to_string()),
    )
    .unwrap();
    assert_eq!(
      render_shim_define("backbone", Some(&shim)),
      concat!(
        "\ndefine(\"backbone\", [\"underscore\", \"jquery\"], (function (global) {\n",
        "    return function () {\n",
        "        var ret, fn;\n",
        "fn = function () { return this.Backbone.noConflict(); };\n",
        "        ret = fn.apply(global, arguments);\n",
        "        return ret || global.Backbone;\n",
        "    };\n",
        "}(this)));\n",
      )
    );
  }

  #[test]
  fn omits_empty_dependency_array() {
    let shim = Shim::new(Vec::new(), Some("Lib".to_string()), None).unwrap();
    let text = render_shim_define("lib", Some(&shim));
    assert!(text.starts_with("\ndefine(\"lib\", (function (global) {\n"));
  }

  #[test]
  fn escapes_quotes_in_names() {
    assert_eq!(
      render_shim_define("we\"ird", None),
      "\ndefine(\"we\\\"ird\", function(){});\n"
    );
    assert_eq!(escape_string("it's", '\''), "it\\'s");
    assert!(matches!(escape_string("plain", '"'), Cow::Borrowed(_)));
  }

  #[test]
  fn validates_shims() {
    assert_eq!(
      Shim::new(Vec::new(), None, Some("function(){}".to_string())),
      Err(ShimError::InitWithoutExports)
    );
    assert_eq!(
      Shim::new(Vec::new(), Some("not valid".to_string()), None),
      Err(ShimError::InvalidExports("not valid".to_string()))
    );
    assert!(Shim::new(Vec::new(), Some("$.fn.modal".to_string()), None).is_ok());
  }

  #[test]
  fn deserializes_both_forms() {
    let shim: Shim = serde_json::from_str(r#"["jquery"]"#).unwrap();
    assert_eq!(shim, Shim::from_deps(vec!["jquery".to_string()]));
    let shim: Shim =
      serde_json::from_str(r#"{ "deps": ["a"], "exports": "A" }"#).unwrap();
    assert_eq!(shim.deps().to_vec(), vec!["a".to_string()]);
    assert_eq!(shim.exports(), Some("A"));
    assert_eq!(shim.init(), None);
    let err = serde_json::from_str::<Shim>(r#"{ "init": "function(){}" }"#)
      .unwrap_err();
    assert!(err.to_string().contains("no exports"), "{}", err);
  }
}

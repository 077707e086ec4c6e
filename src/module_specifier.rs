// Copyright 2018-2024 the Deno authors. MIT license.

use once_cell::sync::Lazy;
use thiserror::Error;

pub type ModuleSpecifier = url::Url;

/// Base used to give modules a specifier when only their id is known.
pub static DEFAULT_BASE_URL: Lazy<ModuleSpecifier> =
  Lazy::new(|| ModuleSpecifier::parse("file:///").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Error, deno_error::JsError)]
#[class(type)]
#[error("Invalid module id \"{name}\" relative to \"{base}\": {source}")]
pub struct SpecifierError {
  pub name: String,
  pub base: ModuleSpecifier,
  pub source: url::ParseError,
}

/// Resolves an AMD module id to the specifier of its source file.
///
/// Plain ids get a `.js` extension appended the way AMD loaders map ids to
/// paths. Ids that already end in `.js` and the resource part of a
/// `plugin!resource` id are used as they are.
pub fn module_specifier_for_name(
  base: &ModuleSpecifier,
  name: &str,
) -> Result<ModuleSpecifier, SpecifierError> {
  let path = match name.split_once('!') {
    Some((plugin, resource)) if !plugin.is_empty() => resource.to_string(),
    _ if name.ends_with(".js") => name.to_string(),
    _ => format!("{name}.js"),
  };
  base.join(&path).map_err(|source| SpecifierError {
    name: name.to_string(),
    base: base.clone(),
    source,
  })
}

/// Ensures a base url ends in a slash so that joining keeps its last
/// path segment.
pub(crate) fn ensure_trailing_slash(mut url: ModuleSpecifier) -> ModuleSpecifier {
  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  url
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn test_module_specifier_for_name() {
    let base = ModuleSpecifier::parse("file:///app/js/").unwrap();
    let cases = [
      ("jquery", "file:///app/js/jquery.js"),
      ("lib/underscore", "file:///app/js/lib/underscore.js"),
      ("vendor/legacy.js", "file:///app/js/vendor/legacy.js"),
      ("text!tpl/list.html", "file:///app/js/tpl/list.html"),
      ("../shared/util", "file:///app/shared/util.js"),
      ("https://cdn.example.com/lib", "https://cdn.example.com/lib.js"),
    ];
    for (name, expected) in cases {
      let specifier = module_specifier_for_name(&base, name).unwrap();
      assert_eq!(specifier.as_str(), expected, "{:?}", name);
    }
  }

  #[test]
  fn test_default_base_url() {
    let specifier = module_specifier_for_name(&DEFAULT_BASE_URL, "a/b").unwrap();
    assert_eq!(specifier.as_str(), "file:///a/b.js");
  }

  #[test]
  fn test_ensure_trailing_slash() {
    let url = ModuleSpecifier::parse("file:///app/js").unwrap();
    assert_eq!(ensure_trailing_slash(url).as_str(), "file:///app/js/");
    let url = ModuleSpecifier::parse("https://example.com/").unwrap();
    assert_eq!(ensure_trailing_slash(url).as_str(), "https://example.com/");
  }
}

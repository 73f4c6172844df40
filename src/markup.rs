//! HTML elements referencing resolved resources.
//!
//! Rendering is pure string formatting: callers pass the URL and integrity value obtained
//! from [`crate::ResourceResolver`] together with any extra attributes. Scripts and
//! stylesheets default to `crossorigin="anonymous"` because browsers only enforce integrity
//! on CORS requests; preload links carry no default attributes.

use crate::error::{ResolveError, ResolveResult};

/// A single HTML attribute; `value: None` renders as a bare name such as `async`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
  /// Attribute name.
  pub name: String,
  /// Attribute value, if any.
  pub value: Option<String>,
}

impl Attribute {
  /// Attribute with a value.
  pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      value: Some(value.into()),
    }
  }

  /// Attribute without a value.
  pub fn flag(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      value: None,
    }
  }
}

/// `<script src=".." integrity=".." crossorigin="anonymous"></script>`
pub fn script(url: &str, hash: &str, extra: &[Attribute]) -> String {
  let attributes = merge_attributes(cors_defaults(), extra);
  format!(
    r#"<script src="{}" integrity="{}"{}></script>"#,
    escape_html(url),
    escape_html(hash),
    render_attributes(&attributes)
  )
}

/// `<link rel="stylesheet" href=".." integrity=".." crossorigin="anonymous">`
pub fn stylesheet(url: &str, hash: &str, extra: &[Attribute]) -> String {
  let attributes = merge_attributes(cors_defaults(), extra);
  format!(
    r#"<link rel="stylesheet" href="{}" integrity="{}"{}>"#,
    escape_html(url),
    escape_html(hash),
    render_attributes(&attributes)
  )
}

/// `<link rel="preload" href=".." integrity="..">`
pub fn preload(url: &str, hash: &str, extra: &[Attribute]) -> String {
  let attributes = merge_attributes(Vec::new(), extra);
  format!(
    r#"<link rel="preload" href="{}" integrity="{}"{}>"#,
    escape_html(url),
    escape_html(hash),
    render_attributes(&attributes)
  )
}

/// Parse a directive-style attribute list such as `async, nonce => abc, as = script`.
///
/// Entries are comma separated; each is a bare name or `name = value` / `name => value`.
/// Values may be wrapped in single or double quotes.
pub fn parse_attributes(input: &str) -> ResolveResult<Vec<Attribute>> {
  if input.trim().is_empty() {
    return Ok(Vec::new());
  }

  input.split(',').map(parse_attribute).collect()
}

fn parse_attribute(entry: &str) -> ResolveResult<Attribute> {
  let entry = entry.trim();
  let invalid = || ResolveError::InvalidAttribute(entry.to_string());

  let (name, value) = match entry.find('=') {
    Some(index) => {
      let rest = &entry[index + 1..];
      let value = rest.strip_prefix('>').unwrap_or(rest).trim();
      let value = unquote(value);
      if value.is_empty() {
        return Err(invalid());
      }
      (entry[..index].trim(), Some(value.to_string()))
    }
    None => (entry, None),
  };

  if !is_attribute_name(name) {
    return Err(invalid());
  }

  Ok(Attribute {
    name: name.to_string(),
    value,
  })
}

fn unquote(value: &str) -> &str {
  for quote in ['"', '\''] {
    if let Some(inner) = value
      .strip_prefix(quote)
      .and_then(|rest| rest.strip_suffix(quote))
    {
      return inner;
    }
  }
  value
}

fn is_attribute_name(name: &str) -> bool {
  !name.is_empty()
    && name
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

fn cors_defaults() -> Vec<Attribute> {
  vec![Attribute::new("crossorigin", "anonymous")]
}

/// Caller attributes replace defaults of the same name in place; new names are appended.
fn merge_attributes(mut attributes: Vec<Attribute>, extra: &[Attribute]) -> Vec<Attribute> {
  for attribute in extra {
    match attributes
      .iter_mut()
      .find(|existing| existing.name.eq_ignore_ascii_case(&attribute.name))
    {
      Some(existing) => existing.value = attribute.value.clone(),
      None => attributes.push(attribute.clone()),
    }
  }
  attributes
}

fn render_attributes(attributes: &[Attribute]) -> String {
  attributes
    .iter()
    .map(|attribute| match &attribute.value {
      Some(value) => format!(r#" {}="{}""#, escape_html(&attribute.name), escape_html(value)),
      None => format!(" {}", escape_html(&attribute.name)),
    })
    .collect()
}

/// Escape text for use inside a double-quoted HTML attribute.
pub fn escape_html(value: &str) -> String {
  let mut escaped = String::with_capacity(value.len());
  for c in value.chars() {
    match c {
      '&' => escaped.push_str("&amp;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '"' => escaped.push_str("&quot;"),
      '\'' => escaped.push_str("&#039;"),
      _ => escaped.push(c),
    }
  }
  escaped
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn renders_script_with_default_crossorigin() {
    let html = script("/build/abc.js", "sha256-AAAA", &[]);
    assert_eq!(
      html,
      r#"<script src="/build/abc.js" integrity="sha256-AAAA" crossorigin="anonymous"></script>"#
    );
  }

  #[test]
  fn caller_attributes_override_defaults_in_place() {
    let html = stylesheet(
      "/app.css",
      "sha256-AAAA",
      &[
        Attribute::new("media", "print"),
        Attribute::new("crossorigin", "use-credentials"),
      ],
    );
    assert_eq!(
      html,
      r#"<link rel="stylesheet" href="/app.css" integrity="sha256-AAAA" crossorigin="use-credentials" media="print">"#
    );
  }

  #[test]
  fn preload_has_no_default_attributes() {
    let html = preload("/font.woff2", "sha256-AAAA", &[Attribute::new("as", "font")]);
    assert_eq!(
      html,
      r#"<link rel="preload" href="/font.woff2" integrity="sha256-AAAA" as="font">"#
    );
  }

  #[test]
  fn escapes_urls_and_values() {
    let html = script("/x.js?a=1&b=\"2\"", "sha256-A", &[Attribute::new("data-x", "<y>")]);
    assert!(html.contains(r#"src="/x.js?a=1&amp;b=&quot;2&quot;""#));
    assert!(html.contains(r#"data-x="&lt;y&gt;""#));
  }

  #[test]
  fn parses_attribute_lists() {
    let attributes =
      parse_attributes(r#"async, nonce => abc, as = "script", data-role='main'"#).unwrap();
    assert_eq!(attributes, vec![
      Attribute::flag("async"),
      Attribute::new("nonce", "abc"),
      Attribute::new("as", "script"),
      Attribute::new("data-role", "main"),
    ]);
    assert!(parse_attributes("  ").unwrap().is_empty());
  }

  #[test]
  fn rejects_malformed_attribute_lists() {
    assert!(matches!(
      parse_attributes("async,, defer"),
      Err(ResolveError::InvalidAttribute(entry)) if entry.is_empty()
    ));
    assert!(matches!(
      parse_attributes("nonce =>"),
      Err(ResolveError::InvalidAttribute(entry)) if entry == "nonce =>"
    ));
    assert!(matches!(
      parse_attributes("bad name"),
      Err(ResolveError::InvalidAttribute(_))
    ));
  }
}

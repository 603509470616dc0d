//! Loading of text sources addressed by a file path or an `http(s)://` URL.

use std::path::Path;

use encoding_rs::{Encoding, UTF_8};

use crate::error::SourceError;

pub fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Resolves `location` against `base`, the location of the document that names it. Absolute
/// paths and URLs are returned unchanged.
pub fn resolve_relative(base: &str, location: &str) -> String {
    if is_url(location) || Path::new(location).is_absolute() {
        return location.to_string();
    }
    if is_url(base) {
        return reqwest::Url::parse(base)
            .and_then(|url| url.join(location))
            .map(String::from)
            .unwrap_or_else(|_| location.to_string());
    }
    match Path::new(base).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(location).to_string_lossy().into_owned(),
        _ => location.to_string(),
    }
}

pub fn read_bytes(location: &str) -> Result<Vec<u8>, SourceError> {
    if is_url(location) {
        log::debug!("fetching {location}");
        let http = |source| SourceError::Http {
            location: location.to_string(),
            source,
        };
        let response = reqwest::blocking::get(location)
            .and_then(|r| r.error_for_status())
            .map_err(http)?;
        Ok(response.bytes().map_err(http)?.to_vec())
    } else {
        std::fs::read(location).map_err(|source| SourceError::Io {
            location: location.to_string(),
            source,
        })
    }
}

/// Reads and decodes a text source.
pub fn read_text(location: &str) -> Result<String, SourceError> {
    let bytes = read_bytes(location)?;
    Ok(decode(&bytes, location))
}

/// Decodes `bytes`, honouring a byte order mark or the `encoding` of an XML declaration, and
/// falling back to UTF-8.
pub fn decode(bytes: &[u8], location: &str) -> String {
    let encoding = declared_encoding(bytes).unwrap_or(UTF_8);
    // decode() sniffs the BOM, which takes precedence over the declaration
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        log::warn!("{location} contains bytes that are not valid {}", used.name());
    }
    text.into_owned()
}

fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(256)];
    let head = String::from_utf8_lossy(head);
    let declaration = head.strip_prefix("<?xml")?;
    let declaration = &declaration[..declaration.find("?>")?];
    let value = declaration.split("encoding").nth(1)?;
    let value = value.trim_start().strip_prefix('=')?.trim_start();
    let quote = value.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let label = value[1..].split(quote).next()?;
    Encoding::for_label(label.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_declared_latin1() {
        let mut bytes = br#"<?xml version="1.0" encoding="ISO-8859-1"?><a>"#.to_vec();
        bytes.push(0xe9);
        bytes.extend_from_slice(b"</a>");
        assert!(decode(&bytes, "test").ends_with("<a>\u{e9}</a>"));
    }

    #[test]
    fn bom_wins_over_declaration() {
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice("<?xml version='1.0' encoding='latin1'?><a>\u{e9}</a>".as_bytes());
        assert!(decode(&bytes, "test").ends_with("<a>\u{e9}</a>"));
    }

    #[test]
    fn relative_locations() {
        assert_eq!(resolve_relative("maps/m.xml", "data.xml"), Path::new("maps").join("data.xml").to_string_lossy());
        assert_eq!(resolve_relative("m.xml", "data.xml"), "data.xml");
        assert_eq!(
            resolve_relative("http://example.org/maps/m.xml", "data.xml"),
            "http://example.org/maps/data.xml"
        );
        assert_eq!(resolve_relative("maps/m.xml", "https://a.b/c"), "https://a.b/c");
    }
}

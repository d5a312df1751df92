//! Source map (revision 3) decoder.
//!
//! Reads the JSON payload with [`crate::json`], decodes the base64 VLQ
//! `mappings` field and resolves `sources` against `sourceRoot` and the
//! location of the map itself.
//!
//! A map that is not version 3, or that carries no mappings, yields `None`
//! without a diagnostic: such maps are common in the wild and ignoring them
//! is the expected outcome. A malformed `mappings` string yields `None` plus
//! one warning pointing at the offending character.

use tracing::{debug, trace};
use url::Url;

use crate::error::{Diagnostic, Log};
use crate::json::{self, JsonOptions, JsonValue};
use crate::span::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct SourceMap {
    /// Resolved source locations, indexed by [`Mapping::source_index`].
    pub sources: Vec<String>,
    pub sources_content: Vec<Option<String>>,
    pub names: Vec<String>,
    /// Sorted by generated position.
    pub mappings: Vec<Mapping>,
}

/// One segment of the `mappings` field. Lines and columns are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub source_index: u32,
    pub original_line: u32,
    pub original_column: u32,
    pub name_index: Option<u32>,
}

impl SourceMap {
    /// The mapping covering a generated position.
    pub fn find(&self, line: u32, column: u32) -> Option<&Mapping> {
        let index = self
            .mappings
            .partition_point(|m| (m.generated_line, m.generated_column) <= (line, column));
        let mapping = self.mappings.get(index.checked_sub(1)?)?;
        (mapping.generated_line == line).then_some(mapping)
    }
}

/// Parse the source map text `source` read from `path`, a filesystem path
/// or a URL.
pub fn parse(source: &str, path: &str) -> (Option<SourceMap>, Log) {
    let (value, mut log) = json::parse(source, JsonOptions::default());
    let map = value.and_then(|value| decode(&value, path, &mut log));
    if let Some(map) = &map {
        debug!(
            path,
            sources = map.sources.len(),
            mappings = map.mappings.len(),
            "parsed source map"
        );
    }
    (map, log)
}

fn decode(value: &JsonValue, path: &str, log: &mut Log) -> Option<SourceMap> {
    if value.get("version").and_then(JsonValue::as_f64) != Some(3.0) {
        trace!(path, "ignored source map without version 3");
        return None;
    }

    let strings = |key: &str| -> Vec<Option<String>> {
        value
            .get(key)
            .and_then(JsonValue::as_array)
            .map(|items| items.iter().map(|item| item.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    };
    let raw_sources = strings("sources");
    let sources_content = strings("sourcesContent");
    let names: Vec<String> = strings("names").into_iter().map(Option::unwrap_or_default).collect();

    let mappings_prop = value.property("mappings")?;
    let mappings_text = mappings_prop.value.as_str()?;
    // Offset of the first character inside the quotes
    let mappings_start = mappings_prop.value_span.start + 1;

    let mappings = match decode_mappings(mappings_text, raw_sources.len(), names.len()) {
        Ok(mappings) => mappings,
        Err(err) => {
            let at = mappings_start + err.offset as u32;
            log.add(Diagnostic::warning(
                Span::new(at, at),
                format!(
                    "Bad \"mappings\" data in source map at character {}: {}",
                    err.offset, err.message
                ),
            ));
            return None;
        }
    };
    if mappings.is_empty() {
        return None;
    }

    let source_root = value.get("sourceRoot").and_then(JsonValue::as_str).unwrap_or("");
    let sources_span = value.property("sources").map_or(Span::default(), |p| p.value_span);
    let resolver = SourceResolver::new(path, source_root);
    let sources = raw_sources
        .into_iter()
        .map(|source| {
            let source = source.unwrap_or_default();
            match resolver.resolve(&source) {
                Ok(resolved) => resolved,
                Err(err) => {
                    log.add(Diagnostic::warning(
                        sources_span,
                        format!("Invalid source URL \"{source}\" in source map: {err}"),
                    ));
                    source
                }
            }
        })
        .collect();

    Some(SourceMap {
        sources,
        sources_content,
        names,
        mappings,
    })
}

// =============================================================================
// Mappings
// =============================================================================

#[derive(Debug, PartialEq)]
struct MappingError {
    /// Character offset into the `mappings` string.
    offset: usize,
    message: String,
}

fn base64_value(b: u8) -> Option<u32> {
    let value = match b {
        b'A'..=b'Z' => b - b'A',
        b'a'..=b'z' => b - b'a' + 26,
        b'0'..=b'9' => b - b'0' + 52,
        b'+' => 62,
        b'/' => 63,
        _ => return None,
    };
    Some(u32::from(value))
}

/// Decode one VLQ number at `pos`. Returns the value and the position after
/// it, or `None` if there is no well-formed number there.
fn decode_vlq(bytes: &[u8], mut pos: usize) -> Option<(i64, usize)> {
    let mut shift = 0;
    let mut vlq: u64 = 0;
    loop {
        let digit = base64_value(*bytes.get(pos)?)?;
        pos += 1;
        vlq |= u64::from(digit & 31) << shift;
        shift += 5;
        if digit & 32 == 0 {
            break;
        }
        if shift > 32 {
            return None;
        }
    }
    let magnitude = (vlq >> 1) as i64;
    Some((if vlq & 1 == 1 { -magnitude } else { magnitude }, pos))
}

fn decode_mappings(text: &str, source_count: usize, name_count: usize) -> Result<Vec<Mapping>, MappingError> {
    let bytes = text.as_bytes();
    let mut mappings = Vec::new();
    let mut needs_sort = false;

    let mut generated_line: i64 = 0;
    let mut generated_column: i64 = 0;
    let mut source_index: i64 = 0;
    let mut original_line: i64 = 0;
    let mut original_column: i64 = 0;
    let mut name_index: i64 = 0;

    let at_segment_end = |pos: usize| matches!(bytes.get(pos), None | Some(b',' | b';'));
    let fail = |offset: usize, message: String| Err(MappingError { offset, message });

    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b';' => {
                generated_line += 1;
                generated_column = 0;
                pos += 1;
                continue;
            }
            b',' => {
                pos += 1;
                continue;
            }
            _ => {}
        }

        let Some((delta, next)) = decode_vlq(bytes, pos) else {
            return fail(pos, "Missing generated column".into());
        };
        if delta < 0 {
            needs_sort = true;
        }
        generated_column += delta;
        if generated_column < 0 {
            return fail(pos, format!("Invalid generated column value: {generated_column}"));
        }
        pos = next;

        // A segment with only a generated column maps to nothing
        if at_segment_end(pos) {
            continue;
        }

        let Some((delta, next)) = decode_vlq(bytes, pos) else {
            return fail(pos, "Missing source index".into());
        };
        source_index += delta;
        if source_index < 0 || source_index as usize >= source_count {
            return fail(pos, format!("Invalid source index value: {source_index}"));
        }
        pos = next;

        let Some((delta, next)) = decode_vlq(bytes, pos) else {
            return fail(pos, "Missing original line".into());
        };
        original_line += delta;
        if original_line < 0 {
            return fail(pos, format!("Invalid original line value: {original_line}"));
        }
        pos = next;

        let Some((delta, next)) = decode_vlq(bytes, pos) else {
            return fail(pos, "Missing original column".into());
        };
        original_column += delta;
        if original_column < 0 {
            return fail(pos, format!("Invalid original column value: {original_column}"));
        }
        pos = next;

        let mut name = None;
        if !at_segment_end(pos) {
            let Some((delta, next)) = decode_vlq(bytes, pos) else {
                return fail(pos, "Invalid name index".into());
            };
            name_index += delta;
            if name_index < 0 || name_index as usize >= name_count {
                return fail(pos, format!("Invalid name index value: {name_index}"));
            }
            name = Some(name_index as u32);
            pos = next;
        }

        if !at_segment_end(pos) {
            return fail(pos, format!("Invalid character after mapping: \"{}\"", char::from(bytes[pos])));
        }

        mappings.push(Mapping {
            generated_line: generated_line as u32,
            generated_column: generated_column as u32,
            source_index: source_index as u32,
            original_line: original_line as u32,
            original_column: original_column as u32,
            name_index: name,
        });
    }

    if needs_sort {
        // Stable: segments at the same position keep their order
        mappings.sort_by_key(|m| (m.generated_line, m.generated_column));
    }
    Ok(mappings)
}

// =============================================================================
// Source URLs
// =============================================================================

/// How the map's own location was given, which decides how resolved
/// sources are written back.
enum Base {
    Url(Url),
    AbsolutePath(Url),
    /// A relative path, resolved against a placeholder `file:///` root and
    /// written back relative.
    RelativePath(Url),
}

struct SourceResolver {
    base: Option<Base>,
    /// `sourceRoot` with a trailing `/`, or empty.
    root: String,
}

impl SourceResolver {
    fn new(path: &str, source_root: &str) -> Self {
        let base = if let Ok(url) = Url::parse(path) {
            Some(Base::Url(url))
        } else if path.starts_with('/') {
            Url::from_file_path(path).ok().map(Base::AbsolutePath)
        } else {
            Url::parse("file:///")
                .and_then(|root| root.join(path))
                .ok()
                .map(Base::RelativePath)
        };
        let mut root = source_root.to_string();
        if !root.is_empty() && !root.ends_with('/') {
            root.push('/');
        }
        Self { base, root }
    }

    fn resolve(&self, source: &str) -> Result<String, url::ParseError> {
        match Url::parse(source) {
            Ok(absolute) => return Ok(absolute.to_string()),
            Err(url::ParseError::RelativeUrlWithoutBase) => {}
            Err(err) => return Err(err),
        }
        let relative = format!("{}{source}", self.root);

        let Some(base) = &self.base else {
            return Ok(relative);
        };
        let resolved = match base {
            Base::Url(url) => url.join(&relative)?.to_string(),
            Base::AbsolutePath(url) => {
                let joined = url.join(&relative)?;
                match joined.to_file_path() {
                    Ok(path) => path.display().to_string(),
                    Err(()) => joined.to_string(),
                }
            }
            Base::RelativePath(url) => {
                let joined = url.join(&relative)?;
                match joined.to_file_path() {
                    Ok(path) => {
                        let path = path.display().to_string();
                        path.strip_prefix('/').map(str::to_string).unwrap_or(path)
                    }
                    Err(()) => joined.path().trim_start_matches('/').to_string(),
                }
            }
        };
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_json(mappings: &str) -> String {
        format!(r#"{{"version": 3, "sources": ["a.ts", "b.ts"], "names": ["x"], "mappings": "{mappings}"}}"#)
    }

    #[test]
    fn test_decode_vlq() {
        assert_eq!(decode_vlq(b"A", 0), Some((0, 1)));
        assert_eq!(decode_vlq(b"C", 0), Some((1, 1)));
        assert_eq!(decode_vlq(b"D", 0), Some((-1, 1)));
        assert_eq!(decode_vlq(b"gB", 0), Some((16, 2)));
        assert_eq!(decode_vlq(b"g", 0), None);
        assert_eq!(decode_vlq(b"!", 0), None);
    }

    #[test]
    fn test_parse_mappings() {
        let (map, log) = parse(&map_json("AAAA,EAAEA;ACCC"), "out/app.js.map");
        assert!(log.is_empty(), "{log:?}");
        let map = map.unwrap();
        assert_eq!(map.sources, ["out/a.ts", "out/b.ts"]);
        assert_eq!(map.mappings.len(), 3);
        assert_eq!(
            map.mappings[1],
            Mapping {
                generated_line: 0,
                generated_column: 2,
                source_index: 0,
                original_line: 0,
                original_column: 2,
                name_index: Some(0),
            }
        );
        assert_eq!(map.mappings[2].generated_line, 1);
        assert_eq!(map.mappings[2].source_index, 1);
        assert_eq!(map.mappings[2].original_line, 1);
        assert_eq!(map.find(0, 5).map(|m| m.generated_column), Some(2));
        assert_eq!(map.find(2, 0), None);
    }

    #[test]
    fn test_silently_ignored() {
        for source in [
            r#"{"sources": [], "mappings": "AAAA"}"#.to_string(),
            r#"{"version": 2, "sources": ["a"], "mappings": "AAAA"}"#.to_string(),
            map_json(""),
            map_json(";;"),
        ] {
            let (map, log) = parse(&source, "x.map");
            assert!(map.is_none(), "{source}");
            assert!(log.is_empty(), "{source}: {log:?}");
        }
    }

    #[test]
    fn test_malformed_vlq_warns_with_offset() {
        let source = map_json("AAAA,A!AA");
        let (map, log) = parse(&source, "x.map");
        assert!(map.is_none());
        assert_eq!(log.len(), 1);
        let warning = log.iter().next().unwrap();
        assert_eq!(
            warning.text,
            "Bad \"mappings\" data in source map at character 6: Missing source index"
        );
        assert_eq!(&source[warning.span.start as usize..][..1], "!");
    }

    #[test]
    fn test_invalid_indices() {
        let (_, log) = parse(&map_json("AEAA"), "x.map");
        assert!(log.iter().next().unwrap().text.ends_with("Invalid source index value: 2"));
        let (_, log) = parse(&map_json("AAAAC"), "x.map");
        assert!(log.iter().next().unwrap().text.ends_with("Invalid name index value: 1"));
        let (_, log) = parse(&map_json("D"), "x.map");
        assert!(log.iter().next().unwrap().text.ends_with("Invalid generated column value: -1"));
    }

    #[test]
    fn test_sort_only_after_negative_column_delta() {
        // Columns 4 then 2 on one line: sorted
        let (map, _) = parse(&map_json("IAAA,FACA"), "x.map");
        let columns: Vec<u32> = map.unwrap().mappings.iter().map(|m| m.generated_column).collect();
        assert_eq!(columns, [2, 4]);

        // Equal positions keep their source order
        let (map, _) = parse(&map_json("EAAA,AACA,DAAC"), "x.map");
        let order: Vec<(u32, u32)> = map
            .unwrap()
            .mappings
            .iter()
            .map(|m| (m.generated_column, m.original_line))
            .collect();
        assert_eq!(order, [(1, 1), (2, 0), (2, 1)]);
    }

    #[test]
    fn test_source_resolution() {
        let source = r#"{"version": 3, "sourceRoot": "src", "sources": ["a.ts", "https://x.test/b.ts"], "mappings": "AAAA"}"#;
        let (map, _) = parse(source, "/out/app.js.map");
        assert_eq!(map.unwrap().sources, ["/out/src/a.ts", "https://x.test/b.ts"]);

        let (map, _) = parse(source, "https://cdn.test/js/app.js.map");
        assert_eq!(
            map.unwrap().sources,
            ["https://cdn.test/js/src/a.ts", "https://x.test/b.ts"]
        );

        let (map, _) = parse(r#"{"version": 3, "sources": ["../a.ts"], "mappings": "AAAA"}"#, "dist/x.map");
        assert_eq!(map.unwrap().sources, ["a.ts"]);
    }

    #[test]
    fn test_invalid_source_url_warns() {
        let source = r#"{"version": 3, "sources": ["http://[::1"], "mappings": "AAAA"}"#;
        let (map, log) = parse(source, "x.map");
        assert_eq!(map.unwrap().sources, ["http://[::1"]);
        assert_eq!(log.warnings().count(), 1);
    }
}

//! JSON text encoding
//!
//! Options only change the byte layout of the backing file, never what it
//! decodes to.
//!
//! ## Defaults
//!
//! Compact output, non-ASCII characters written as `\uXXXX` and `/` written
//! as `\/`. [`EncodeOptions::readable`] turns all three off.

use serde::{Deserialize, Serialize};
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use std::io::{self, Write};

/// Byte-layout options for the backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Indent nested objects and arrays
    pub pretty_print: bool,
    /// Write every non-ASCII character as a `\uXXXX` escape
    pub escape_unicode: bool,
    /// Write `/` as `\/`
    pub escape_slashes: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            pretty_print: false,
            escape_unicode: true,
            escape_slashes: true,
        }
    }
}

impl EncodeOptions {
    /// Human-readable layout: indented, UTF-8 and slashes written as is
    pub fn readable() -> Self {
        EncodeOptions {
            pretty_print: true,
            escape_unicode: false,
            escape_slashes: false,
        }
    }

    /// Set pretty printing
    pub fn with_pretty_print(mut self, on: bool) -> Self {
        self.pretty_print = on;
        self
    }

    /// Set unicode escaping
    pub fn with_escape_unicode(mut self, on: bool) -> Self {
        self.escape_unicode = on;
        self
    }

    /// Set slash escaping
    pub fn with_escape_slashes(mut self, on: bool) -> Self {
        self.escape_slashes = on;
        self
    }

    /// Encode a document with these options
    pub fn encode(&self, document: &serde_json::Value) -> serde_json::Result<String> {
        let mut out = Vec::new();
        if self.pretty_print {
            self.write(&mut out, PrettyFormatter::new(), document)?;
        } else {
            self.write(&mut out, CompactFormatter, document)?;
        }
        String::from_utf8(out).map_err(serde::ser::Error::custom)
    }

    fn write<F: Formatter>(
        &self,
        out: &mut Vec<u8>,
        inner: F,
        document: &serde_json::Value,
    ) -> serde_json::Result<()> {
        let formatter = EscapingFormatter {
            inner,
            escape_unicode: self.escape_unicode,
            escape_slashes: self.escape_slashes,
        };
        let mut serializer = serde_json::Serializer::with_formatter(out, formatter);
        document.serialize(&mut serializer)
    }
}

/// Layout from `inner`, plus optional escaping inside string literals
struct EscapingFormatter<F> {
    inner: F,
    escape_unicode: bool,
    escape_slashes: bool,
}

impl<F: Formatter> Formatter for EscapingFormatter<F> {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        let mut start = 0;
        let mut units = [0u16; 2];
        for (i, c) in fragment.char_indices() {
            let slash = c == '/' && self.escape_slashes;
            let wide = !c.is_ascii() && self.escape_unicode;
            if !slash && !wide {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            if slash {
                writer.write_all(b"\\/")?;
            } else {
                for unit in c.encode_utf16(&mut units).iter() {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }

    // Layout hooks go to the wrapped formatter

    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.inner.begin_array(writer)
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.inner.begin_object(writer)
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.inner.end_object_value(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_layout() {
        let doc = json!({"path": "a/b", "name": "Zoë"});
        let text = EncodeOptions::default().encode(&doc).unwrap();
        assert_eq!(text, r#"{"name":"Zo\u00eb","path":"a\/b"}"#);
    }

    #[test]
    fn test_readable_layout() {
        let doc = json!({"path": "a/b", "name": "Zoë"});
        let text = EncodeOptions::readable().encode(&doc).unwrap();
        assert!(text.contains('\n'));
        assert!(text.contains("Zoë"));
        assert!(text.contains("a/b"));
    }

    #[test]
    fn test_astral_characters_use_surrogate_pairs() {
        let doc = json!({"emoji": "😀"});
        let text = EncodeOptions::default().encode(&doc).unwrap();
        assert_eq!(text, r#"{"emoji":"\ud83d\ude00"}"#);
    }

    #[test]
    fn test_escaped_text_decodes_to_same_document() {
        let doc = json!({"a/b": ["é", "http://x", {"k": "ü/€"}]});
        for options in [EncodeOptions::default(), EncodeOptions::readable()] {
            let text = options.encode(&doc).unwrap();
            let back: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(back, doc);
        }
    }

    #[test]
    fn test_escaping_is_limited_to_strings() {
        let doc = json!({"url": "http://x/y", "n": [1, 2.5]});
        let text = EncodeOptions::default().with_pretty_print(true).encode(&doc).unwrap();
        assert!(text.contains(r#""http:\/\/x\/y""#));
        assert!(text.contains("\n  \"n\": ["));
    }

    #[test]
    fn test_builders() {
        let options = EncodeOptions::default()
            .with_pretty_print(true)
            .with_escape_unicode(false)
            .with_escape_slashes(false);
        assert_eq!(options, EncodeOptions::readable());
    }
}

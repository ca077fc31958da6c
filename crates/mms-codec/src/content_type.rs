//! Content-Type header grammar: `type/subtype *(";" attribute "=" value)`,
//! per RFC 2616 section 3.7. Value is either an HTTP token or a
//! quoted-string with backslash escapes.

use std::fmt::Write as _;

use crate::error::DecodeError;

/// A parsed media type: `type/subtype` plus an ordered list of parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentType {
    pub type_: String,
    pub subtype: String,
    pub params: Vec<(String, String)>,
}

impl ContentType {
    pub fn new(type_: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            subtype: subtype.into(),
            params: Vec::new(),
        }
    }

    pub fn full(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn is_multipart_mixed(&self) -> bool {
        self.type_.eq_ignore_ascii_case("multipart") && self.subtype.eq_ignore_ascii_case("mixed")
    }

    pub fn is_multipart_related(&self) -> bool {
        self.type_.eq_ignore_ascii_case("multipart")
            && (self.subtype.eq_ignore_ascii_case("related")
                || self.subtype.eq_ignore_ascii_case("mixed"))
    }

    pub fn is_multipart(&self) -> bool {
        self.type_.eq_ignore_ascii_case("multipart")
    }
}

const TSPECIALS: &[u8] = b"()<>@,;:\\\"/[]?=";

fn is_token_char(b: u8) -> bool {
    b > 0x20 && b < 0x7F && !TSPECIALS.contains(&b)
}

fn value_needs_quoting(v: &str) -> bool {
    v.is_empty() || !v.bytes().all(is_token_char)
}

/// Parses a `Content-Type` header value.
pub fn parse(input: &str) -> Result<ContentType, DecodeError> {
    let bytes = input.as_bytes();

    fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
        while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
            i += 1;
        }
        i
    }

    let mut i = 0usize;
    i = skip_ws(bytes, i);
    let type_start = i;
    while i < bytes.len() && bytes[i] != b'/' {
        i += 1;
    }
    if i >= bytes.len() {
        return Err(DecodeError::MalformedContentType(input.to_string()));
    }
    let type_ = input[type_start..i].trim().to_string();
    i += 1; // skip '/'
    let sub_start = i;
    while i < bytes.len() && bytes[i] != b';' && !bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    let subtype = input[sub_start..i].to_string();
    if type_.is_empty() || subtype.is_empty() {
        return Err(DecodeError::MalformedContentType(input.to_string()));
    }

    let mut params = Vec::new();
    loop {
        i = skip_ws(bytes, i);
        if i >= bytes.len() {
            break;
        }
        if bytes[i] != b';' {
            return Err(DecodeError::MalformedContentType(input.to_string()));
        }
        i += 1;
        i = skip_ws(bytes, i);
        if i >= bytes.len() {
            break;
        }
        let attr_start = i;
        while i < bytes.len() && bytes[i] != b'=' && bytes[i] != b';' {
            i += 1;
        }
        let attr = input[attr_start..i].trim().to_string();
        if i >= bytes.len() || bytes[i] != b'=' {
            // attribute with no value; tolerate and skip.
            continue;
        }
        i += 1; // skip '='
        i = skip_ws(bytes, i);
        let (value, next) = if i < bytes.len() && bytes[i] == b'"' {
            read_quoted(bytes, i)?
        } else {
            let start = i;
            let mut j = i;
            while j < bytes.len() && bytes[j] != b';' && !bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            (input[start..j].to_string(), j)
        };
        i = next;
        if !attr.is_empty() {
            params.push((attr, value));
        }
    }

    Ok(ContentType {
        type_,
        subtype,
        params,
    })
}

fn read_quoted(bytes: &[u8], start: usize) -> Result<(String, usize), DecodeError> {
    debug_assert_eq!(bytes[start], b'"');
    let mut i = start + 1;
    let mut out = String::new();
    loop {
        if i >= bytes.len() {
            return Err(DecodeError::MalformedContentType(
                "unterminated quoted-string".into(),
            ));
        }
        match bytes[i] {
            b'"' => {
                i += 1;
                return Ok((out, i));
            }
            b'\\' if i + 1 < bytes.len() => {
                out.push(bytes[i + 1] as char);
                i += 2;
            }
            b => {
                out.push(b as char);
                i += 1;
            }
        }
    }
}

/// Renders a [`ContentType`] back to its `type/subtype; attr=value` form,
/// quoting any value that is not a valid HTTP token.
pub fn unparse(ct: &ContentType) -> String {
    let mut out = format!("{}/{}", ct.type_, ct.subtype);
    for (k, v) in &ct.params {
        let _ = write!(out, "; {k}=");
        if value_needs_quoting(v) {
            out.push('"');
            for c in v.chars() {
                if c == '"' || c == '\\' {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('"');
        } else {
            out.push_str(v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple() {
        let ct = parse("text/plain").unwrap();
        assert_eq!(ct.type_, "text");
        assert_eq!(ct.subtype, "plain");
        assert!(ct.params.is_empty());
    }

    #[test]
    fn parses_params_token_and_quoted() {
        let ct = parse(r#"multipart/related; boundary=abc123; type="application/smil""#).unwrap();
        assert_eq!(ct.full(), "multipart/related");
        assert_eq!(ct.param("boundary"), Some("abc123"));
        assert_eq!(ct.param("type"), Some("application/smil"));
    }

    #[test]
    fn parses_escaped_quotes() {
        let ct = parse(r#"text/plain; name="a\"b""#).unwrap();
        assert_eq!(ct.param("name"), Some(r#"a"b"#));
    }

    #[test]
    fn unparse_quotes_when_needed() {
        let ct = ContentType::new("application", "smil").with_param("start", "<0.smil>");
        let s = unparse(&ct);
        assert_eq!(s, r#"application/smil; start="<0.smil>""#);
    }

    #[test]
    fn unparse_round_trips_params() {
        let ct = parse("text/plain; charset=utf-8").unwrap();
        let s = unparse(&ct);
        let ct2 = parse(&s).unwrap();
        assert_eq!(ct.params, ct2.params);
        assert_eq!(ct.full(), ct2.full());
    }
}

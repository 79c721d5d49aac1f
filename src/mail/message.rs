//! Parsed email message and its serialized forms.

use super::DecodeError;
use mailparse::parse_headers;
use std::fmt;

/// A decoded message split into headers and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
  headers: Vec<(String, String)>,
  body: Vec<u8>,
}

impl Message {
  pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
    let (header_end, body_start) = split_header_block(bytes);
    let (parsed, _) = parse_headers(&bytes[..header_end])?;
    let headers = parsed
      .iter()
      .map(|h| {
        let value = String::from_utf8_lossy(h.get_value_raw());
        (h.get_key(), value.trim().to_string())
      })
      .collect();
    let body = bytes[body_start..].to_vec();
    Ok(Message { headers, body })
  }

  /// First value of header `name`, matched case-insensitively.
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }

  pub fn headers(&self) -> &[(String, String)] {
    &self.headers
  }

  pub fn body(&self) -> &[u8] {
    &self.body
  }

  /// CRLF-terminated form handed to the SMTP DATA phase.
  pub fn to_wire(&self) -> Vec<u8> {
    self.serialize(b"\r\n")
  }

  /// LF-terminated form returned by the dry-run endpoint, bytes untouched.
  pub fn to_text(&self) -> Vec<u8> {
    self.serialize(b"\n")
  }

  fn serialize(&self, eol: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(self.body.len() + 64 * self.headers.len());
    for (key, value) in &self.headers {
      out.extend_from_slice(key.as_bytes());
      out.extend_from_slice(b": ");
      out.extend_from_slice(&normalize_eol(value.as_bytes(), eol));
      out.extend_from_slice(eol);
    }
    out.extend_from_slice(eol);
    out.extend_from_slice(&normalize_eol(&self.body, eol));
    out
  }
}

/// Lossy text view of [`Message::to_text`].
impl fmt::Display for Message {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&String::from_utf8_lossy(&self.to_text()))
  }
}

/// Locate the end of the header block and the start of the body.
///
/// Headers stop at the first blank line, which is consumed, or at the first
/// line that is neither a `field-name:` line nor a continuation of one, which
/// becomes the first body line.
fn split_header_block(bytes: &[u8]) -> (usize, usize) {
  let mut pos = 0;
  let mut in_field = false;
  while pos < bytes.len() {
    let end = bytes[pos..]
      .iter()
      .position(|b| *b == b'\n')
      .map_or(bytes.len(), |i| pos + i + 1);
    let line = bytes[pos..end].strip_suffix(b"\n").unwrap_or(&bytes[pos..end]);
    let line = line.strip_suffix(b"\r").unwrap_or(line);

    if line.is_empty() {
      return (pos, end);
    }
    let continuation = in_field && matches!(line[0], b' ' | b'\t');
    if !continuation && !is_field_line(line) {
      return (pos, pos);
    }
    in_field = true;
    pos = end;
  }
  (bytes.len(), bytes.len())
}

/// `name:` where the name is printable ASCII without spaces or colons.
fn is_field_line(line: &[u8]) -> bool {
  match line.iter().position(|b| *b == b':') {
    Some(colon) if colon > 0 => line[..colon].iter().all(|b| (b'!'..=b'~').contains(b)),
    _ => false,
  }
}

/// Rewrite CRLF, bare CR and bare LF line breaks as `eol`.
fn normalize_eol(input: &[u8], eol: &[u8]) -> Vec<u8> {
  let mut out = Vec::with_capacity(input.len() + input.len() / 16);
  let mut i = 0;
  while i < input.len() {
    match input[i] {
      b'\r' => {
        out.extend_from_slice(eol);
        if input.get(i + 1) == Some(&b'\n') {
          i += 1;
        }
      }
      b'\n' => out.extend_from_slice(eol),
      b => out.push(b),
    }
    i += 1;
  }
  out
}

//! Intermediate artifacts on disk
//!
//! Two kinds of file pass between pipeline stages, possibly across
//! separate process invocations:
//! - the received raster dump, stored as text hex byte tokens
//! - the command file, one controller line per command
//!
//! Command files are written through a temporary file in the same
//! directory and renamed into place, so a failed pass never leaves a
//! half-written file behind.

use crate::error::{ArtifactError, Result};
use regex::Regex;
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;

/// Hex tokens per line in written dumps
const HEX_TOKENS_PER_LINE: usize = 16;

fn hex_token_regex() -> &'static Regex {
    static HEX_TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
    HEX_TOKEN_REGEX
        .get_or_init(|| Regex::new(r"(?:0[xX])?([0-9a-fA-F]{2})").expect("invalid regex pattern"))
}

/// Extract every two-digit hex token (optionally `0x` prefixed) from text.
///
/// Accepts `"AA 01 FF"`, `"0xAA,0x01,0xFF"`, continuous streams such as
/// `"AA01FF"` and any mix of separators and line breaks.
pub fn parse_hex_tokens(text: &str) -> Vec<u8> {
    hex_token_regex()
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .filter_map(|m| u8::from_str_radix(m.as_str(), 16).ok())
        .collect()
}

/// Render bytes as uppercase hex tokens, sixteen per line
pub fn format_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, chunk) in bytes.chunks(HEX_TOKENS_PER_LINE).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let line: Vec<String> = chunk.iter().map(|b| format!("{b:02X}")).collect();
        out.push_str(&line.join(" "));
    }
    out.push('\n');
    out
}

/// Write a received byte dump as hex text
pub fn write_hex(path: &Path, bytes: &[u8]) -> Result<()> {
    write_atomic(path, format_hex(bytes).as_bytes())?;
    tracing::debug!("Wrote {} bytes as hex to {}", bytes.len(), path.display());
    Ok(())
}

/// Read a hex text dump back into bytes
pub fn read_hex(path: &Path) -> Result<Vec<u8>> {
    let text = read_text(path)?;
    let bytes = parse_hex_tokens(&text);
    if bytes.is_empty() {
        return Err(ArtifactError::Empty {
            path: path.to_path_buf(),
            reason: "no hex byte tokens found".to_string(),
        }
        .into());
    }
    Ok(bytes)
}

/// Write text lines (each already newline terminated) atomically
pub fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let mut content = String::with_capacity(lines.iter().map(String::len).sum());
    for line in lines {
        content.push_str(line);
    }
    write_atomic(path, content.as_bytes())
}

/// Read the non-blank lines of a text artifact, trimmed
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = read_text(path)?;
    let lines: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if lines.is_empty() {
        return Err(ArtifactError::Empty {
            path: path.to_path_buf(),
            reason: "no command lines".to_string(),
        }
        .into());
    }
    Ok(lines)
}

fn read_text(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(ArtifactError::Missing {
            path: path.to_path_buf(),
        }
        .into());
    }
    let raw = std::fs::read(path).map_err(|e| ArtifactError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let write_failed = |e: &dyn std::fmt::Display| ArtifactError::WriteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| write_failed(&e))?;
    tmp.write_all(content).map_err(|e| write_failed(&e))?;
    tmp.flush().map_err(|e| write_failed(&e))?;
    tmp.persist(path).map_err(|e| write_failed(&e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_token_styles() {
        assert_eq!(parse_hex_tokens("AA 01 FF"), vec![0xAA, 0x01, 0xFF]);
        assert_eq!(parse_hex_tokens("0xAA,0x01,0xff"), vec![0xAA, 0x01, 0xFF]);
        assert_eq!(parse_hex_tokens("AA01FF\n10"), vec![0xAA, 0x01, 0xFF, 0x10]);
        assert!(parse_hex_tokens("no tokens here").is_empty());
    }

    #[test]
    fn test_format_hex_wraps_lines() {
        let bytes: Vec<u8> = (0..20).collect();
        let text = format_hex(&bytes);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("00 01 02"));
        assert_eq!(lines[1], "10 11 12 13");
    }
}

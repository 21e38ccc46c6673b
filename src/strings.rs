//! Small text helpers for building pages: slashing, html entities, base64 and md5.

use base64::{engine::general_purpose::STANDARD, Engine};

fn needs_slash(c: char) -> bool {
    matches!(c, '\'' | '"' | '\\')
}

/// Puts a backslash in front of `'`, `"` and `\`.
pub fn addslashes(s: &str) -> String {
    addnslashes(s, usize::MAX)
}

/// Like `addslashes`, but only looks at the first `n` characters. The rest is copied as is.
pub fn addnslashes(s: &str, n: usize) -> String {
    let mut out = String::with_capacity(s.len() + s.len() / 4);

    for (i, c) in s.chars().enumerate() {
        if i < n && needs_slash(c) {
            out.push('\\');
        }

        out.push(c);
    }

    out
}

/// Reverses `addslashes`.
pub fn stripslashes(s: &str) -> String {
    stripnslashes(s, usize::MAX)
}

/// Like `stripslashes`, limited to the first `n` characters.
pub fn stripnslashes(s: &str, n: usize) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().enumerate().peekable();

    while let Some((i, c)) = chars.next() {
        if i < n && c == '\\' {
            if let Some(&(_, next)) = chars.peek() {
                if needs_slash(next) {
                    continue;
                }
            }
        }

        out.push(c);
    }

    out
}

/// Escapes text for use inside html. Markup characters become named entities, anything outside
/// ASCII becomes a numeric entity.
pub fn htmlentities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());

    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c if c.is_ascii() => out.push(c),
            c => out.push_str(&format!("&#{};", c as u32)),
        }
    }

    out
}

pub fn base64_encode(data: impl AsRef<[u8]>) -> String {
    STANDARD.encode(data)
}

/// Decodes standard base64, `None` if the input is not valid base64
pub fn base64_decode(data: impl AsRef<[u8]>) -> Option<Vec<u8>> {
    STANDARD.decode(data).ok()
}

/// Lowercase hex md5 digest
pub fn md5_hex(data: impl AsRef<[u8]>) -> String {
    format!("{:x}", md5::compute(data))
}

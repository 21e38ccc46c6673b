//! Percent/plus escaping and the `name=value&name=value` decoder used for query strings, POST
//! bodies and session records.

use crate::{
    error::Error,
    formvars::{Entry, FormVars},
};

const HEX: &[u8; 16] = b"0123456789ABCDEF";

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn decode_into(encoded: &[u8], decoded: &mut Vec<u8>) {
    let mut i = 0;

    while i < encoded.len() {
        match encoded[i] {
            b'%' => {
                let escaped = encoded
                    .get(i + 1)
                    .and_then(|&h| hex_value(h))
                    .zip(encoded.get(i + 2).and_then(|&l| hex_value(l)));

                match escaped {
                    Some((high, low)) => {
                        decoded.push(high << 4 | low);
                        i += 2;
                    }
                    // Not an escape, keep the '%' and leave what follows alone
                    None => decoded.push(b'%'),
                }
            }

            b'+' => decoded.push(b' '),

            byte => decoded.push(byte),
        }

        i += 1;
    }
}

/// Reverses `encode`. `+` becomes a space and `%hh` becomes the byte `hh`. A `%` that isn't
/// followed by two hex digits is kept as is.
pub fn decode(encoded: impl AsRef<[u8]>) -> Vec<u8> {
    let encoded = encoded.as_ref();

    let mut decoded = Vec::with_capacity(encoded.len());

    decode_into(encoded, &mut decoded);

    decoded
}

/// Escapes everything except ASCII alphanumerics and `_-.`. Spaces become `+`.
pub fn encode(raw: impl AsRef<[u8]>) -> String {
    let raw = raw.as_ref();

    let mut encoded = String::with_capacity(raw.len() * 3);

    for &byte in raw {
        match byte {
            b' ' => encoded.push('+'),

            b'_' | b'-' | b'.' => encoded.push(byte as char),

            byte if byte.is_ascii_alphanumeric() => encoded.push(byte as char),

            byte => {
                encoded.push('%');
                encoded.push(HEX[(byte >> 4) as usize] as char);
                encoded.push(HEX[(byte & 0x0F) as usize] as char);
            }
        }
    }

    encoded
}

/// Splits `input` into units on `pair_sep`, and each unit into a name and a value on the first
/// `value_sep`. Values are decoded, names are kept verbatim. Units without a name are skipped.
///
/// Returns how many entries were appended to `list`.
pub fn parse_into(
    list: &mut FormVars,
    input: impl AsRef<[u8]>,
    value_sep: u8,
    pair_sep: u8,
) -> Result<usize, Error> {
    let mut added = 0;

    for unit in input.as_ref().split(|&b| b == pair_sep) {
        let (name, value) = match unit.iter().position(|&b| b == value_sep) {
            Some(idx) => (&unit[..idx], &unit[idx + 1..]),
            None => (unit, &b""[..]),
        };

        if name.is_empty() {
            continue;
        }

        let mut owned_name = Vec::new();
        owned_name.try_reserve_exact(name.len())?;
        owned_name.extend_from_slice(name);

        let mut owned_value = Vec::new();
        owned_value.try_reserve_exact(value.len())?;
        decode_into(value, &mut owned_value);

        list.try_reserve(1)?;
        list.push_entry(Entry::from_parts(owned_name, owned_value));

        added += 1;
    }

    Ok(added)
}

/// Decodes a query string or url encoded body into a new list.
pub fn parse(input: impl AsRef<[u8]>) -> Result<FormVars, Error> {
    let mut list = FormVars::new();

    parse_into(&mut list, input, b'=', b'&')?;

    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(list: &FormVars) -> Vec<(&str, &str)> {
        list.iter()
            .map(|e| {
                (
                    std::str::from_utf8(e.name()).unwrap(),
                    e.value_str().unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn decode_escapes() {
        assert_eq!(decode("three+three"), b"three three");
        assert_eq!(decode("%20.two-%30"), b" .two-0");
        assert_eq!(decode("%e1%C3"), vec![0xE1, 0xC3]);
    }

    #[test]
    fn decode_incomplete_escapes() {
        assert_eq!(decode("100%"), b"100%");
        assert_eq!(decode("100%4"), b"100%4");
        assert_eq!(decode("%zz1"), b"%zz1");
        assert_eq!(decode("%4%41"), b"%4A");
    }

    #[test]
    fn encode_charset() {
        let raw: Vec<u8> = (1..=255u8).collect();

        let encoded = encode(&raw);

        assert!(encoded
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"._%+-".contains(&b)));

        assert_eq!(decode(&encoded), raw);
    }

    #[test]
    fn encode_examples() {
        assert_eq!(encode("a b_c-d.e"), "a+b_c-d.e");
        assert_eq!(encode("a=b;c"), "a%3Db%3Bc");
        assert_eq!(encode("100%+"), "100%25%2B");
    }

    #[test]
    fn parse_basic() {
        let list = parse("1=one&second=%20.two-%30&33=three+three").unwrap();

        assert_eq!(
            pairs(&list),
            vec![
                ("1", "one"),
                ("second", " .two-0"),
                ("33", "three three"),
            ]
        );
    }

    #[test]
    fn parse_skips_empty_units() {
        let inputs = [
            "&1=one&second=%20.two-%30&33=three+three",
            "=noname&1=one&&second=%20.two-%30&33=three+three",
            "==&&=&&1=one&second=%20.two-%30&==&33=three+three&=&",
        ];

        for input in inputs {
            let list = parse(input).unwrap();

            assert_eq!(
                pairs(&list),
                vec![
                    ("1", "one"),
                    ("second", " .two-0"),
                    ("33", "three three"),
                ],
                "{input}"
            );
        }
    }

    #[test]
    fn parse_degenerate_inputs() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("&&&").unwrap().is_empty());

        let list = parse("lonely").unwrap();

        assert_eq!(pairs(&list), vec![("lonely", "")]);
    }

    #[test]
    fn names_are_not_decoded() {
        let list = parse("a%20b=c%20d").unwrap();

        assert_eq!(pairs(&list), vec![("a%20b", "c d")]);
    }

    #[test]
    fn parse_session_separators() {
        let mut list = FormVars::new();

        let added = parse_into(&mut list, "k1=v1;k2=a%3Bb", b'=', b';').unwrap();

        assert_eq!(added, 2);
        assert_eq!(list.get("k2"), Some(&b"a;b"[..]));
    }

    #[test]
    fn parse_appends_to_existing() {
        let mut list = parse("a=1").unwrap();

        let added = parse_into(&mut list, "", b'=', b'&').unwrap();
        assert_eq!(added, 0);

        parse_into(&mut list, "b=2", b'=', b'&').unwrap();

        assert_eq!(list.len(), 2);
    }
}

//! Helpers for parsing scheduler output

/// Splits `line` at the first `separator` into a trimmed key and value, returning None if
/// there is no separator
pub fn split_key_value(line: &[u8], separator: u8) -> Option<(&[u8], &[u8])> {
    let index = line.iter().position(|&c| c == separator)?;
    let (key, value) = line.split_at(index);

    Some((key.trim_ascii(), value[1..].trim_ascii()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_key_value() {
        assert_eq!(split_key_value(b"", b'='), None);
        assert_eq!(split_key_value(b"     wn01", b'='), None);
        assert_eq!(split_key_value(b"=", b'='), Some((&b""[..], &b""[..])));
        assert_eq!(
            split_key_value(b"     state = free", b'='),
            Some((&b"state"[..], &b"free"[..]))
        );
        assert_eq!(split_key_value(b"np=8 ", b'='), Some((&b"np"[..], &b"8"[..])));
        assert_eq!(
            split_key_value(b" status = opsys=linux,uname=x", b'='),
            Some((&b"status"[..], &b"opsys=linux,uname=x"[..]))
        );
    }
}

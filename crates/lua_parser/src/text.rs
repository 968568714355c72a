//! Lua sources are byte strings with no required encoding. A script read from disk is
//! carried as text holding one `char` per source byte (U+0000 to U+00FF), which the
//! tokenizer accepts and which [`encode`] maps back to the original bytes.

/// How the chars of a parsed source stand for bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    /// Ordinary text; a char stands for its UTF-8 bytes.
    Utf8,
    /// Produced by [`decode`]; a char below U+0100 stands for exactly one byte.
    Bytes,
}

impl SourceEncoding {
    pub(crate) fn push_char(self, bytes: &mut Vec<u8>, c: char) {
        match u8::try_from(c) {
            Ok(byte) if self == Self::Bytes => bytes.push(byte),
            _ => {
                let mut buffer = [0u8; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buffer).as_bytes());
            }
        }
    }
}

/// Maps every byte to the char with the same value.
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Inverse of [`decode`]. Chars above U+00FF, which only appear in synthesized text, are
/// written as UTF-8.
pub fn encode(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for c in text.chars() {
        SourceEncoding::Bytes.push_char(&mut bytes, c);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_byte_survives() {
        let bytes: Vec<u8> = (0..=255).collect();
        assert_eq!(encode(&decode(&bytes)), bytes);
    }

    #[test]
    fn test_utf8_source_keeps_its_bytes() {
        let source = "return 'héllo'";
        let text = decode(source.as_bytes());
        assert_ne!(text, source);
        assert_eq!(encode(&text), source.as_bytes());
    }

    #[test]
    fn test_push_char_by_encoding() {
        let mut bytes = Vec::new();
        SourceEncoding::Bytes.push_char(&mut bytes, '\u{e9}');
        SourceEncoding::Utf8.push_char(&mut bytes, '\u{e9}');
        assert_eq!(bytes, vec![0xe9, 0xc3, 0xa9]);
    }
}

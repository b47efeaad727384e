//! Character sets, ECI designators and byte-to-text decoding.

use encoding_rs::Encoding;

use crate::error::{DecodeError, EncodeError, Result};

/// Character sets reachable through ECI designators or hints
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterSet {
    Cp437,
    Iso8859_1,
    Iso8859_2,
    Iso8859_3,
    Iso8859_4,
    Iso8859_5,
    Iso8859_6,
    Iso8859_7,
    Iso8859_8,
    Iso8859_9,
    Iso8859_10,
    Iso8859_11,
    Iso8859_13,
    Iso8859_14,
    Iso8859_15,
    Iso8859_16,
    ShiftJis,
    Cp1250,
    Cp1251,
    Cp1252,
    Cp1256,
    Utf16Be,
    Utf8,
    Ascii,
    Big5,
    Gb18030,
    EucKr,
}

impl CharacterSet {
    /// Charset selected by an ECI value
    pub fn from_eci(value: u32) -> Option<Self> {
        use CharacterSet::*;
        Some(match value {
            0 | 2 => Cp437,
            1 | 3 => Iso8859_1,
            4 => Iso8859_2,
            5 => Iso8859_3,
            6 => Iso8859_4,
            7 => Iso8859_5,
            8 => Iso8859_6,
            9 => Iso8859_7,
            10 => Iso8859_8,
            11 => Iso8859_9,
            12 => Iso8859_10,
            13 => Iso8859_11,
            15 => Iso8859_13,
            16 => Iso8859_14,
            17 => Iso8859_15,
            18 => Iso8859_16,
            20 => ShiftJis,
            21 => Cp1250,
            22 => Cp1251,
            23 => Cp1252,
            24 => Cp1256,
            25 => Utf16Be,
            26 => Utf8,
            27 | 170 => Ascii,
            28 => Big5,
            29 => Gb18030,
            30 => EucKr,
            _ => return None,
        })
    }

    /// Primary ECI value designating this charset
    pub fn eci_value(self) -> u32 {
        use CharacterSet::*;
        match self {
            Cp437 => 2,
            Iso8859_1 => 3,
            Iso8859_2 => 4,
            Iso8859_3 => 5,
            Iso8859_4 => 6,
            Iso8859_5 => 7,
            Iso8859_6 => 8,
            Iso8859_7 => 9,
            Iso8859_8 => 10,
            Iso8859_9 => 11,
            Iso8859_10 => 12,
            Iso8859_11 => 13,
            Iso8859_13 => 15,
            Iso8859_14 => 16,
            Iso8859_15 => 17,
            Iso8859_16 => 18,
            ShiftJis => 20,
            Cp1250 => 21,
            Cp1251 => 22,
            Cp1252 => 23,
            Cp1256 => 24,
            Utf16Be => 25,
            Utf8 => 26,
            Ascii => 27,
            Big5 => 28,
            Gb18030 => 29,
            EucKr => 30,
        }
    }

    /// Parse a charset name such as `"UTF-8"`, `"Shift_JIS"` or `"ISO-8859-2"`
    pub fn from_name(name: &str) -> Option<Self> {
        use CharacterSet::*;
        let normalized = name.trim().to_ascii_uppercase().replace('_', "-");
        Some(match normalized.as_str() {
            "CP437" | "IBM437" => Cp437,
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" => Iso8859_1,
            "ISO-8859-2" | "ISO8859-2" => Iso8859_2,
            "ISO-8859-3" | "ISO8859-3" => Iso8859_3,
            "ISO-8859-4" | "ISO8859-4" => Iso8859_4,
            "ISO-8859-5" | "ISO8859-5" => Iso8859_5,
            "ISO-8859-6" | "ISO8859-6" => Iso8859_6,
            "ISO-8859-7" | "ISO8859-7" => Iso8859_7,
            "ISO-8859-8" | "ISO8859-8" => Iso8859_8,
            "ISO-8859-9" | "ISO8859-9" => Iso8859_9,
            "ISO-8859-10" | "ISO8859-10" => Iso8859_10,
            "ISO-8859-11" | "ISO8859-11" => Iso8859_11,
            "ISO-8859-13" | "ISO8859-13" => Iso8859_13,
            "ISO-8859-14" | "ISO8859-14" => Iso8859_14,
            "ISO-8859-15" | "ISO8859-15" => Iso8859_15,
            "ISO-8859-16" | "ISO8859-16" => Iso8859_16,
            "SHIFT-JIS" | "SJIS" => ShiftJis,
            "WINDOWS-1250" | "CP1250" => Cp1250,
            "WINDOWS-1251" | "CP1251" => Cp1251,
            "WINDOWS-1252" | "CP1252" => Cp1252,
            "WINDOWS-1256" | "CP1256" => Cp1256,
            "UTF-16BE" | "UNICODEBIGUNMARKED" => Utf16Be,
            "UTF-8" | "UTF8" => Utf8,
            "US-ASCII" | "ASCII" => Ascii,
            "BIG5" => Big5,
            "GB18030" | "GB2312" | "GBK" | "EUC-CN" => Gb18030,
            "EUC-KR" => EucKr,
            _ => return None,
        })
    }

    fn label(self) -> Option<&'static [u8]> {
        use CharacterSet::*;
        Some(match self {
            Cp437 | Iso8859_1 | Ascii | Utf8 => return None,
            Iso8859_2 => b"iso-8859-2",
            Iso8859_3 => b"iso-8859-3",
            Iso8859_4 => b"iso-8859-4",
            Iso8859_5 => b"iso-8859-5",
            Iso8859_6 => b"iso-8859-6",
            Iso8859_7 => b"iso-8859-7",
            Iso8859_8 => b"iso-8859-8",
            Iso8859_9 => b"iso-8859-9",
            Iso8859_10 => b"iso-8859-10",
            Iso8859_11 => b"iso-8859-11",
            Iso8859_13 => b"iso-8859-13",
            Iso8859_14 => b"iso-8859-14",
            Iso8859_15 => b"iso-8859-15",
            Iso8859_16 => b"iso-8859-16",
            ShiftJis => b"shift_jis",
            Cp1250 => b"windows-1250",
            Cp1251 => b"windows-1251",
            Cp1252 => b"windows-1252",
            Cp1256 => b"windows-1256",
            Utf16Be => b"utf-16be",
            Big5 => b"big5",
            Gb18030 => b"gb18030",
            EucKr => b"euc-kr",
        })
    }

    fn encoding(self) -> Option<&'static Encoding> {
        self.label().and_then(Encoding::for_label)
    }

    /// Decode bytes to text; unmappable sequences become U+FFFD
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            // encoding_rs has no code page 437; latin-1 keeps the ASCII half intact
            CharacterSet::Iso8859_1 | CharacterSet::Cp437 | CharacterSet::Ascii => {
                bytes.iter().map(|&b| b as char).collect()
            }
            CharacterSet::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            _ => match self.encoding() {
                Some(encoding) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
                None => bytes.iter().map(|&b| b as char).collect(),
            },
        }
    }

    /// Encode text, or `None` when a character cannot be represented
    pub fn encode(self, text: &str) -> Option<Vec<u8>> {
        match self {
            CharacterSet::Iso8859_1 | CharacterSet::Cp437 => {
                text.chars().map(|c| u8::try_from(c as u32).ok()).collect()
            }
            CharacterSet::Ascii => text.chars().map(|c| c.is_ascii().then_some(c as u8)).collect(),
            CharacterSet::Utf8 => Some(text.as_bytes().to_vec()),
            CharacterSet::Utf16Be => Some(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
            _ => {
                let (bytes, _, had_errors) = self.encoding()?.encode(text);
                (!had_errors).then(|| bytes.into_owned())
            }
        }
    }
}

/// Bytes to put in a symbol and the ECI designator they need, if any.
///
/// Without a hint, Latin-1 text needs no designator and anything else goes
/// out as UTF-8.
pub(crate) fn encode_with_eci(
    text: &str,
    charset: Option<CharacterSet>,
) -> std::result::Result<(Vec<u8>, Option<u32>), EncodeError> {
    match charset {
        Some(charset) if charset != CharacterSet::Iso8859_1 => {
            let bytes = charset.encode(text).ok_or_else(|| {
                let c = text
                    .chars()
                    .find(|c| charset.encode(&c.to_string()).is_none())
                    .unwrap_or('\u{fffd}');
                EncodeError::UnsupportedChar(c)
            })?;
            Ok((bytes, Some(charset.eci_value())))
        }
        _ => match CharacterSet::Iso8859_1.encode(text) {
            Some(bytes) => Ok((bytes, None)),
            None => Ok((text.as_bytes().to_vec(), Some(CharacterSet::Utf8.eci_value()))),
        },
    }
}

/// Guess how a byte segment without an ECI should be read
pub fn guess_encoding(bytes: &[u8], hint: Option<CharacterSet>) -> CharacterSet {
    if let Some(charset) = hint {
        return charset;
    }
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return CharacterSet::Utf8;
    }
    if !bytes.is_ascii() && std::str::from_utf8(bytes).is_ok() {
        return CharacterSet::Utf8;
    }
    CharacterSet::Iso8859_1
}

/// Accumulates bytes and flushes them through the active charset whenever an
/// ECI designator switches it
#[derive(Debug, Clone)]
pub struct EciStringBuilder {
    current_bytes: Vec<u8>,
    result: String,
    charset: CharacterSet,
    had_eci: bool,
}

impl Default for EciStringBuilder {
    fn default() -> Self {
        Self::new(CharacterSet::Iso8859_1)
    }
}

impl EciStringBuilder {
    /// Builder starting in `charset`
    pub fn new(charset: CharacterSet) -> Self {
        Self {
            current_bytes: Vec::new(),
            result: String::new(),
            charset,
            had_eci: false,
        }
    }

    /// Append one raw byte
    pub fn append_byte(&mut self, byte: u8) {
        self.current_bytes.push(byte);
    }

    /// Append raw bytes
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.current_bytes.extend_from_slice(bytes);
    }

    /// Append a character below U+0100 as one byte
    pub fn append_char(&mut self, c: char) {
        self.current_bytes.push(c as u32 as u8);
    }

    /// Append ASCII text
    pub fn append_str(&mut self, s: &str) {
        self.current_bytes.extend_from_slice(s.as_bytes());
    }

    /// Append already decoded text, flushing pending bytes first
    pub fn append_text(&mut self, s: &str) {
        self.flush();
        self.result.push_str(s);
    }

    /// Switch charset for following bytes
    pub fn append_eci(&mut self, value: u32) -> Result<()> {
        self.flush();
        self.charset = CharacterSet::from_eci(value).ok_or(DecodeError::Format("unknown ECI value"))?;
        self.had_eci = true;
        Ok(())
    }

    /// True once any ECI designator was seen
    pub fn had_eci(&self) -> bool {
        self.had_eci
    }

    /// True when nothing has been appended
    pub fn is_empty(&self) -> bool {
        self.current_bytes.is_empty() && self.result.is_empty()
    }

    fn flush(&mut self) {
        if !self.current_bytes.is_empty() {
            let text = self.charset.decode(&self.current_bytes);
            self.result.push_str(&text);
            self.current_bytes.clear();
        }
    }

    /// Decoded text so far
    pub fn finish(mut self) -> String {
        self.flush();
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eci_round_trip() {
        for value in [3, 4, 20, 22, 26, 28, 29, 30] {
            let charset = CharacterSet::from_eci(value).unwrap();
            assert_eq!(charset.eci_value(), value);
        }
        assert!(CharacterSet::from_eci(14).is_none());
    }

    #[test]
    fn test_from_name() {
        assert_eq!(CharacterSet::from_name("utf-8"), Some(CharacterSet::Utf8));
        assert_eq!(CharacterSet::from_name("Shift_JIS"), Some(CharacterSet::ShiftJis));
        assert_eq!(CharacterSet::from_name("GBK"), Some(CharacterSet::Gb18030));
        assert_eq!(CharacterSet::from_name("klingon"), None);
    }

    #[test]
    fn test_decode_latin1_and_sjis() {
        assert_eq!(CharacterSet::Iso8859_1.decode(&[0x48, 0xE9]), "Hé");
        assert_eq!(CharacterSet::ShiftJis.decode(&[0x93, 0xFA]), "日");
        assert_eq!(CharacterSet::Utf16Be.decode(&[0x00, 0x41]), "A");
    }

    #[test]
    fn test_encode() {
        assert_eq!(CharacterSet::Iso8859_1.encode("é"), Some(vec![0xE9]));
        assert_eq!(CharacterSet::Iso8859_1.encode("日"), None);
        assert_eq!(CharacterSet::ShiftJis.encode("日"), Some(vec![0x93, 0xFA]));
    }

    #[test]
    fn test_encode_with_eci() {
        assert_eq!(encode_with_eci("é", None), Ok((vec![0xE9], None)));
        assert_eq!(encode_with_eci("€", None), Ok((vec![0xE2, 0x82, 0xAC], Some(26))));
        assert_eq!(
            encode_with_eci("日", Some(CharacterSet::ShiftJis)),
            Ok((vec![0x93, 0xFA], Some(20)))
        );
        assert_eq!(
            encode_with_eci("日", Some(CharacterSet::Ascii)),
            Err(EncodeError::UnsupportedChar('日'))
        );
    }

    #[test]
    fn test_guess_encoding() {
        assert_eq!(guess_encoding(b"abc", None), CharacterSet::Iso8859_1);
        assert_eq!(guess_encoding("é".as_bytes(), None), CharacterSet::Utf8);
        assert_eq!(guess_encoding(&[0xE9], None), CharacterSet::Iso8859_1);
        assert_eq!(guess_encoding(&[0xE9], Some(CharacterSet::Cp1252)), CharacterSet::Cp1252);
    }

    #[test]
    fn test_eci_string_builder() {
        let mut builder = EciStringBuilder::default();
        builder.append_byte(0xE9);
        builder.append_eci(26).unwrap();
        builder.append_bytes("é".as_bytes());
        assert!(builder.had_eci());
        assert_eq!(builder.finish(), "éé");

        let mut builder = EciStringBuilder::default();
        assert!(builder.append_eci(999_999).is_err());
    }
}

use std::fmt;
use std::str::FromStr;

use encoding_rs::{DecoderResult, EncoderResult, UTF_16BE, UTF_16LE, UTF_8};

use crate::error::{DecodeError, EncodeError, Error, ErrorKind, Result};

/// Names accepted by common codec registries that are not WHATWG labels.
///
/// Each name is matched after lowercasing and replacing `_` with `-`.
const ALIASES: &[(&str, &str)] = &[
    ("u8", "utf-8"),
    ("utf", "utf-8"),
    ("utf8", "utf-8"),
    ("u16", "utf-16"),
    ("utf16", "utf-16"),
    ("utf-16-le", "utf-16le"),
    ("utf-16-be", "utf-16be"),
    ("cp932", "windows-31j"),
    ("ms932", "windows-31j"),
    ("mskanji", "windows-31j"),
    ("sjis", "shift_jis"),
    ("s-jis", "shift_jis"),
    ("cp936", "gbk"),
    ("cp949", "euc-kr"),
    ("cp950", "big5"),
    ("big5-tw", "big5"),
];

/// Names of ISO-8859-1 after normalization.
///
/// WHATWG maps all of these to windows-1252, which assigns printable
/// characters to 0x80..0x9F. They resolve to ISO-8859-1 proper instead.
const LATIN1: &[&str] = &[
    "latin-1",
    "latin1",
    "latin",
    "l1",
    "iso-8859-1",
    "iso8859-1",
    "iso88591",
    "iso-8859-1:1987",
    "iso-ir-100",
    "8859",
    "cp819",
    "ibm819",
    "csisolatin1",
];

/// A character encoding for CSV data on either side of a reader or writer.
///
/// An `Encoding` is usually obtained from a name with `Encoding::for_label`
/// (or `str::parse`). Every label known to the WHATWG Encoding Standard is
/// accepted, along with the common spellings used by codec registries such
/// as `latin_1`, `utf_16` or `cp932`.
///
/// `latin-1` and its aliases are ISO-8859-1: every byte decodes to the code
/// point of the same value, and characters above U+00FF cannot be encoded.
/// Use `windows-1252` (or `cp1252`) for the Windows code page.
///
/// Two names get special treatment with respect to byte order marks:
///
/// * `utf-16` (without an endianness) detects the byte order from a BOM
///   when reading, and writes a little endian BOM once when writing.
/// * `utf-8-sig` strips a leading UTF-8 BOM when reading, and writes one
///   when writing.
///
/// The default encoding is UTF-8, which is also the only encoding that
/// readers and writers pass through without transcoding.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Encoding {
    codec: Codec,
    bom: bool,
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum Codec {
    Whatwg(&'static encoding_rs::Encoding),
    Latin1,
}

impl Encoding {
    /// UTF-8 without any byte order mark handling.
    pub fn utf8() -> Encoding {
        Encoding { codec: Codec::Whatwg(UTF_8), bom: false }
    }

    /// ISO-8859-1.
    pub fn latin1() -> Encoding {
        Encoding { codec: Codec::Latin1, bom: false }
    }

    /// Resolve an encoding name.
    ///
    /// ```
    /// use ucsv::Encoding;
    ///
    /// assert_eq!(Encoding::for_label("latin-1")?.name(), "ISO-8859-1");
    /// assert_eq!(Encoding::for_label("cp1252")?.name(), "windows-1252");
    /// assert_eq!(Encoding::for_label("UTF_16")?.name(), "UTF-16");
    /// assert!(Encoding::for_label("klingon").is_err());
    /// # Ok::<(), ucsv::Error>(())
    /// ```
    pub fn for_label(label: &str) -> Result<Encoding> {
        let norm = label.trim().to_ascii_lowercase().replace('_', "-");
        let norm = ALIASES
            .iter()
            .find(|&&(alias, _)| alias == norm)
            .map(|&(_, target)| target.to_string())
            .unwrap_or(norm);
        match &*norm {
            "utf-16" => {
                return Ok(Encoding {
                    codec: Codec::Whatwg(UTF_16LE),
                    bom: true,
                });
            }
            "utf-8-sig" | "utf8-sig" => {
                return Ok(Encoding { codec: Codec::Whatwg(UTF_8), bom: true });
            }
            name if LATIN1.contains(&name) => return Ok(Encoding::latin1()),
            _ => {}
        }
        let candidates =
            [label.trim().to_string(), norm.clone(), norm.replace('-', "")];
        for candidate in candidates.iter() {
            let codec =
                encoding_rs::Encoding::for_label_no_replacement(
                    candidate.as_bytes(),
                );
            if let Some(codec) = codec {
                return Ok(Encoding::from_codec(codec));
            }
        }
        Err(Error::new(ErrorKind::UnknownEncoding(label.to_string())))
    }

    /// Wrap an `encoding_rs` codec without byte order mark handling.
    pub fn from_codec(codec: &'static encoding_rs::Encoding) -> Encoding {
        Encoding { codec: Codec::Whatwg(codec), bom: false }
    }

    /// The canonical name of this encoding.
    pub fn name(&self) -> &'static str {
        match self.codec {
            Codec::Latin1 => "ISO-8859-1",
            Codec::Whatwg(codec) if self.bom => {
                if codec == UTF_8 {
                    "UTF-8-SIG"
                } else {
                    "UTF-16"
                }
            }
            Codec::Whatwg(codec) => codec.name(),
        }
    }

    /// The underlying `encoding_rs` codec, if any.
    ///
    /// This is `None` for ISO-8859-1, which `encoding_rs` does not provide.
    pub fn codec(&self) -> Option<&'static encoding_rs::Encoding> {
        match self.codec {
            Codec::Whatwg(codec) => Some(codec),
            Codec::Latin1 => None,
        }
    }

    /// Returns true if and only if this is plain UTF-8, in which case no
    /// transcoding is ever done.
    pub fn is_utf8(&self) -> bool {
        self.codec == Codec::Whatwg(UTF_8) && !self.bom
    }

    /// Returns true if this encoding strips a byte order mark on read and
    /// writes one on write.
    pub fn uses_bom(&self) -> bool {
        self.bom
    }

    /// Create a streaming decoder for text in this encoding.
    ///
    /// Only the byte order mark of this encoding is ever stripped: a
    /// `utf-16` decoder does not switch to UTF-8 on a UTF-8 BOM, nor a
    /// `utf-8-sig` decoder to UTF-16.
    pub(crate) fn new_decoder(&self) -> Decoder {
        let kind = match self.codec {
            Codec::Latin1 => DecoderKind::Latin1,
            Codec::Whatwg(codec) if codec == UTF_8 && self.bom => {
                DecoderKind::Codec(codec.new_decoder_with_bom_removal())
            }
            Codec::Whatwg(_) if self.bom => {
                DecoderKind::Utf16Bom { seen: [0; 2], len: 0 }
            }
            Codec::Whatwg(codec) => {
                DecoderKind::Codec(codec.new_decoder_without_bom_handling())
            }
        };
        Decoder { kind, tail: Tail::default(), name: self.name() }
    }

    /// Create a stateful encoder producing bytes in this encoding.
    pub(crate) fn new_encoder(&self) -> Encoder {
        let kind = match self.codec {
            Codec::Latin1 => EncoderKind::Latin1,
            Codec::Whatwg(codec) if codec == UTF_8 => EncoderKind::Utf8,
            Codec::Whatwg(codec) if codec == UTF_16LE => {
                EncoderKind::Utf16 { big_endian: false }
            }
            Codec::Whatwg(codec) if codec == UTF_16BE => {
                EncoderKind::Utf16 { big_endian: true }
            }
            Codec::Whatwg(codec) => EncoderKind::Codec(codec.new_encoder()),
        };
        Encoder { kind, bom_pending: self.bom, name: self.name() }
    }
}

impl Default for Encoding {
    fn default() -> Encoding {
        Encoding::utf8()
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Encoding> {
        Encoding::for_label(s)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Encoding({})", self.name())
    }
}

/// The most recently consumed source bytes, kept so that a malformed
/// sequence that started in an earlier call can be reported in full.
const TAIL: usize = 8;

#[derive(Default)]
struct Tail {
    buf: [u8; TAIL],
    len: usize,
}

impl Tail {
    fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    fn push(&mut self, bytes: &[u8]) {
        if bytes.len() >= TAIL {
            self.buf.copy_from_slice(&bytes[bytes.len() - TAIL..]);
            self.len = TAIL;
            return;
        }
        let keep = (TAIL - bytes.len()).min(self.len);
        self.buf.copy_within(self.len - keep..self.len, 0);
        self.buf[keep..keep + bytes.len()].copy_from_slice(bytes);
        self.len = keep + bytes.len();
    }
}

/// A streaming decoder that never substitutes malformed input.
pub(crate) struct Decoder {
    kind: DecoderKind,
    tail: Tail,
    name: &'static str,
}

enum DecoderKind {
    Codec(encoding_rs::Decoder),
    Latin1,
    /// `utf-16` before its first two bytes are known.
    Utf16Bom { seen: [u8; 2], len: usize },
}

impl Decoder {
    /// Decode `src` into `dst`, returning the number of bytes of `src` that
    /// were consumed.
    ///
    /// Bytes of an incomplete sequence at the end of `src` are consumed and
    /// held by the decoder until the next call. When `last` is true, such a
    /// sequence is an error. `offset` is the position of `src` in the
    /// source, used for error reporting only.
    pub(crate) fn decode(
        &mut self,
        src: &[u8],
        dst: &mut String,
        last: bool,
        offset: u64,
    ) -> std::result::Result<usize, DecodeError> {
        let (seen, len, take) = match self.kind {
            DecoderKind::Codec(_) => {
                return self.decode_codec(src, dst, last, offset);
            }
            DecoderKind::Latin1 => {
                dst.extend(src.iter().map(|&b| char::from(b)));
                return Ok(src.len());
            }
            DecoderKind::Utf16Bom { ref mut seen, ref mut len } => {
                let take = (2 - *len).min(src.len());
                seen[*len..*len + take].copy_from_slice(&src[..take]);
                *len += take;
                if *len < 2 && !last {
                    return Ok(src.len());
                }
                (*seen, *len, take)
            }
        };
        let (codec, bom) = match &seen[..len] {
            [0xFF, 0xFE] => (UTF_16LE, 2),
            [0xFE, 0xFF] => (UTF_16BE, 2),
            _ => (UTF_16LE, 0),
        };
        self.kind =
            DecoderKind::Codec(codec.new_decoder_without_bom_handling());
        let rest = &src[take..];
        let held_offset = offset + take as u64 - len as u64 + bom as u64;
        self.decode_codec(
            &seen[bom..len],
            dst,
            last && rest.is_empty(),
            held_offset,
        )?;
        self.decode_codec(rest, dst, last, offset + take as u64)?;
        Ok(src.len())
    }

    fn decode_codec(
        &mut self,
        src: &[u8],
        dst: &mut String,
        last: bool,
        offset: u64,
    ) -> std::result::Result<usize, DecodeError> {
        let inner = match self.kind {
            DecoderKind::Codec(ref mut inner) => inner,
            _ => unreachable!("codec decoding without a codec"),
        };
        let mut read = 0;
        loop {
            let need = inner
                .max_utf8_buffer_length_without_replacement(src.len() - read)
                .unwrap_or(src.len() - read + 16);
            dst.reserve(need);
            let (res, n) = inner.decode_to_string_without_replacement(
                &src[read..],
                dst,
                last,
            );
            read += n;
            match res {
                DecoderResult::InputEmpty => {
                    self.tail.push(src);
                    return Ok(read);
                }
                DecoderResult::OutputFull => continue,
                DecoderResult::Malformed(bad, extra) => {
                    // The malformed sequence may have started in bytes
                    // consumed by an earlier call.
                    let mut seen = self.tail.as_slice().to_vec();
                    seen.extend_from_slice(&src[..read]);
                    let end = seen.len().saturating_sub(extra as usize);
                    let start = end.saturating_sub(bad as usize);
                    let base = offset.saturating_sub(self.tail.len as u64);
                    return Err(DecodeError::malformed(
                        self.name,
                        &seen[start..end],
                        base + start as u64,
                    ));
                }
            }
        }
    }
}

/// A stateful encoder that never substitutes unmappable characters.
///
/// State carries across calls: a byte order mark is written before the
/// first output only, and shift states of encodings like ISO-2022-JP
/// persist until `encode` is called with `last` set.
pub(crate) struct Encoder {
    kind: EncoderKind,
    bom_pending: bool,
    name: &'static str,
}

enum EncoderKind {
    Utf8,
    // encoding_rs only decodes UTF-16, so its encoder is ours.
    Utf16 { big_endian: bool },
    Latin1,
    Codec(encoding_rs::Encoder),
}

impl Encoder {
    /// Encode `src`, appending the bytes to `dst`.
    pub(crate) fn encode(
        &mut self,
        src: &str,
        dst: &mut Vec<u8>,
        last: bool,
    ) -> std::result::Result<(), EncodeError> {
        if self.bom_pending && !src.is_empty() {
            self.bom_pending = false;
            self.write_bom(dst);
        }
        match self.kind {
            EncoderKind::Utf8 => {
                dst.extend_from_slice(src.as_bytes());
            }
            EncoderKind::Utf16 { big_endian } => {
                dst.reserve(src.len() * 2);
                for unit in src.encode_utf16() {
                    if big_endian {
                        dst.extend_from_slice(&unit.to_be_bytes());
                    } else {
                        dst.extend_from_slice(&unit.to_le_bytes());
                    }
                }
            }
            EncoderKind::Latin1 => {
                dst.reserve(src.len());
                for ch in src.chars() {
                    if ch > '\u{FF}' {
                        return Err(EncodeError::new(self.name, ch));
                    }
                    dst.push(ch as u8);
                }
            }
            EncoderKind::Codec(ref mut enc) => {
                let mut read = 0;
                loop {
                    let need = enc
                        .max_buffer_length_from_utf8_without_replacement(
                            src.len() - read,
                        )
                        .unwrap_or(src.len() - read + 16);
                    dst.reserve(need);
                    let (res, n) = enc
                        .encode_from_utf8_to_vec_without_replacement(
                            &src[read..],
                            dst,
                            last,
                        );
                    read += n;
                    match res {
                        EncoderResult::InputEmpty => break,
                        EncoderResult::OutputFull => continue,
                        EncoderResult::Unmappable(ch) => {
                            return Err(EncodeError::new(self.name, ch));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn write_bom(&self, dst: &mut Vec<u8>) {
        match self.kind {
            EncoderKind::Utf8 => dst.extend_from_slice(b"\xEF\xBB\xBF"),
            EncoderKind::Utf16 { big_endian: false } => {
                dst.extend_from_slice(b"\xFF\xFE")
            }
            EncoderKind::Utf16 { big_endian: true } => {
                dst.extend_from_slice(b"\xFE\xFF")
            }
            EncoderKind::Latin1 | EncoderKind::Codec(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Encoding;

    fn enc(label: &str) -> Encoding {
        Encoding::for_label(label).unwrap()
    }

    fn encode_all(label: &str, chunks: &[&str]) -> Vec<u8> {
        let mut encoder = enc(label).new_encoder();
        let mut out = vec![];
        for chunk in chunks {
            encoder.encode(chunk, &mut out, false).unwrap();
        }
        encoder.encode("", &mut out, true).unwrap();
        out
    }

    #[test]
    fn labels() {
        assert_eq!(enc("utf-8"), Encoding::utf8());
        assert_eq!(enc("UTF8"), Encoding::utf8());
        assert_eq!(enc("utf_8"), Encoding::utf8());
        assert_eq!(enc("latin-1"), Encoding::latin1());
        assert_eq!(enc("latin_1").name(), "ISO-8859-1");
        assert_eq!(enc("ISO-8859-1").name(), "ISO-8859-1");
        assert_eq!(enc("iso8859_1").name(), "ISO-8859-1");
        assert_eq!(enc("cp1252").name(), "windows-1252");
        assert_eq!(enc("windows-1252").name(), "windows-1252");
        assert_eq!(enc("shift_jis").name(), "Shift_JIS");
        assert_eq!(enc("sjis").name(), "Shift_JIS");
        assert_eq!(enc("cp932").name(), "Shift_JIS");
        assert_eq!(enc("euc_jp").name(), "EUC-JP");
        assert_eq!(enc("utf-16").name(), "UTF-16");
        assert_eq!(enc("utf_16_le").name(), "UTF-16LE");
        assert_eq!(enc("UTF-16BE").name(), "UTF-16BE");
        assert_eq!(enc("utf-8-sig").name(), "UTF-8-SIG");
    }

    #[test]
    fn unknown_labels() {
        assert!(Encoding::for_label("").is_err());
        assert!(Encoding::for_label("ebcdic-klingon").is_err());
        // The WHATWG "replacement" encoding can never decode anything.
        assert!(Encoding::for_label("iso-2022-kr").is_err());
    }

    #[test]
    fn only_plain_utf8_is_utf8() {
        assert!(enc("utf-8").is_utf8());
        assert!(!enc("utf-8-sig").is_utf8());
        assert!(!enc("utf-16").is_utf8());
        assert!(!enc("latin1").is_utf8());
        assert!(Encoding::default().is_utf8());
    }

    #[test]
    fn parse_and_display() {
        let e: Encoding = "utf-16be".parse().unwrap();
        assert_eq!(e.to_string(), "UTF-16BE");
    }

    #[test]
    fn utf16_bom_written_once() {
        let got = encode_all("utf-16", &["a,", "b\r\n"]);
        assert_eq!(got, b"\xFF\xFEa\x00,\x00b\x00\r\x00\n\x00");
    }

    #[test]
    fn utf16be_without_bom() {
        let got = encode_all("utf-16be", &["é"]);
        assert_eq!(got, b"\x00\xE9");
    }

    #[test]
    fn utf16_surrogate_pairs() {
        let got = encode_all("utf-16le", &["\u{1F600}"]);
        assert_eq!(got, b"\x3D\xD8\x00\xDE");
    }

    #[test]
    fn latin1_unmappable() {
        let mut encoder = enc("latin-1").new_encoder();
        let mut out = vec![];
        let err = encoder.encode("José ☃", &mut out, false).unwrap_err();
        assert_eq!(err.character(), '☃');
        assert_eq!(err.encoding(), "ISO-8859-1");

        let err = encoder.encode("5 €", &mut out, false).unwrap_err();
        assert_eq!(err.character(), '€');
    }

    #[test]
    fn latin1_covers_c1_controls() {
        let mut out = vec![];
        let mut encoder = enc("latin1").new_encoder();
        encoder.encode("\u{85}\u{FF}", &mut out, true).unwrap();
        assert_eq!(out, b"\x85\xFF");

        let mut text = String::new();
        let n = enc("latin1")
            .new_decoder()
            .decode(b"\x80\x9F\xE9", &mut text, true, 0)
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(text, "\u{80}\u{9F}\u{E9}");
    }

    #[test]
    fn iso2022jp_shift_state_spans_calls() {
        let got = encode_all("iso-2022-jp", &["日", "本", "\n"]);
        let text = encoding_rs::ISO_2022_JP.decode(&got).0;
        assert_eq!(text, "日本\n");
        // One escape into JIS X 0208 and one back to ASCII.
        assert_eq!(got.iter().filter(|&&b| b == 0x1B).count(), 2);
    }

    #[test]
    fn decoder_handles_split_sequences() {
        let mut decoder = enc("utf-16le").new_decoder();
        let mut out = String::new();
        let n = decoder.decode(b"a\x00b", &mut out, false, 0).unwrap();
        assert_eq!(n, 3);
        let n = decoder.decode(b"\x00", &mut out, true, 3).unwrap();
        assert_eq!(n, 1);
        assert_eq!(out, "ab");
    }

    #[test]
    fn decoder_reports_malformed_offset() {
        let mut decoder = enc("utf-8-sig").new_decoder();
        let mut out = String::new();
        let err = decoder.decode(b"ok\xFFno", &mut out, true, 10).unwrap_err();
        assert_eq!(out, "ok");
        assert_eq!(err.bytes(), b"\xFF");
        assert_eq!(err.offset(), Some(12));
    }

    #[test]
    fn decoder_strips_bom_only_when_asked() {
        let mut out = String::new();
        enc("utf-16")
            .new_decoder()
            .decode(b"\xFE\xFF\x00a", &mut out, true, 0)
            .unwrap();
        assert_eq!(out, "a");

        let mut out = String::new();
        enc("utf-16le")
            .new_decoder()
            .decode(b"\xFF\xFEa\x00", &mut out, true, 0)
            .unwrap();
        assert_eq!(out, "\u{FEFF}a");
    }

    #[test]
    fn utf16_ignores_utf8_bom() {
        let mut out = String::new();
        enc("utf-16")
            .new_decoder()
            .decode(b"\xEF\xBB\xBF\x00", &mut out, true, 0)
            .unwrap();
        assert_eq!(out, "\u{BBEF}\u{BF}");
    }

    #[test]
    fn utf8_sig_rejects_utf16_bom() {
        let mut out = String::new();
        let err = enc("utf-8-sig")
            .new_decoder()
            .decode(b"\xFF\xFEa\x00", &mut out, true, 0)
            .unwrap_err();
        assert_eq!(err.bytes(), b"\xFF");
        assert_eq!(err.offset(), Some(0));
    }

    #[test]
    fn utf16_bom_split_across_calls() {
        let mut decoder = enc("utf-16").new_decoder();
        let mut out = String::new();
        for (i, b) in b"\xFE\xFF\x00a\x00b".iter().enumerate() {
            let n = decoder
                .decode(&[*b], &mut out, false, i as u64)
                .unwrap();
            assert_eq!(n, 1);
        }
        decoder.decode(b"", &mut out, true, 6).unwrap();
        assert_eq!(out, "ab");
    }

    #[test]
    fn malformed_sequence_spanning_calls() {
        let data = b"a\x00b\x00\x00\xDC";
        let mut decoder = enc("utf-16le").new_decoder();
        let mut out = String::new();
        let mut err = None;
        for (i, b) in data.iter().enumerate() {
            if let Err(e) = decoder.decode(&[*b], &mut out, false, i as u64) {
                err = Some(e);
                break;
            }
        }
        let err = err.unwrap();
        assert_eq!(out, "ab");
        assert_eq!(err.bytes(), b"\x00\xDC");
        assert_eq!(err.offset(), Some(4));
    }
}

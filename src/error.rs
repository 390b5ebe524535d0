use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::result;

use bstr::ByteSlice;

/// A type alias for `Result<T, ucsv::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when reading or writing CSV data in a non-UTF-8
/// encoding.
///
/// Errors raised by the underlying CSV parser or writer are passed through
/// unchanged as `ErrorKind::Csv`. Transcoding failures are reported as
/// `ErrorKind::Decode` or `ErrorKind::Encode`, even when they occurred deep
/// inside an I/O call made by the CSV parser.
#[derive(Debug)]
pub struct Error(Box<ErrorKind>);

impl Error {
    /// A crate private constructor for `Error`.
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error(Box::new(kind))
    }

    /// Return the specific type of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Unwrap this error into its underlying type.
    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns true if this is an I/O error.
    pub fn is_io_error(&self) -> bool {
        match *self.0 {
            ErrorKind::Io(_) => true,
            _ => false,
        }
    }

    /// Returns true if this error was caused by bytes that could not be
    /// decoded.
    pub fn is_decode_error(&self) -> bool {
        match *self.0 {
            ErrorKind::Decode(_) => true,
            _ => false,
        }
    }

    /// Returns true if this error was caused by text that could not be
    /// encoded.
    pub fn is_encode_error(&self) -> bool {
        match *self.0 {
            ErrorKind::Encode(_) => true,
            _ => false,
        }
    }
}

/// The specific type of an error.
#[derive(Debug)]
pub enum ErrorKind {
    /// An I/O error that occurred while reading or writing CSV data.
    Io(io::Error),
    /// An error reported by the underlying CSV parser or writer.
    Csv(csv::Error),
    /// Bytes that are not valid in the encoding they were declared in.
    Decode(DecodeError),
    /// Text containing a character the destination encoding cannot
    /// represent.
    Encode(EncodeError),
    /// An encoding name that does not resolve to any supported codec.
    UnknownEncoding(String),
    /// A dict writer was given a field name that is not one of its
    /// configured field names.
    UnknownField(String),
    /// Hints that destructuring should not be exhaustive.
    ///
    /// This enum may grow additional variants, so this makes sure clients
    /// don't count on exhaustive matching. (Otherwise, adding a new variant
    /// could break existing code.)
    #[doc(hidden)]
    __Nonexhaustive,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        // A recoder reports transcoding failures through `io::Read`, so
        // recover them here.
        if let Some(inner) = err.get_ref() {
            if let Some(err) = inner.downcast_ref::<DecodeError>() {
                return Error::new(ErrorKind::Decode(err.clone()));
            }
            if let Some(err) = inner.downcast_ref::<EncodeError>() {
                return Error::new(ErrorKind::Encode(err.clone()));
            }
        }
        Error::new(ErrorKind::Io(err))
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Error {
        if err.is_io_error() {
            if let csv::ErrorKind::Io(err) = err.into_kind() {
                return Error::from(err);
            }
            unreachable!("csv I/O error without an I/O kind");
        }
        Error::new(ErrorKind::Csv(err))
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Error {
        Error::new(ErrorKind::Decode(err))
    }
}

impl From<EncodeError> for Error {
    fn from(err: EncodeError) -> Error {
        Error::new(ErrorKind::Encode(err))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err.into_kind() {
            ErrorKind::Io(err) => err,
            ErrorKind::Decode(err) => err.into(),
            ErrorKind::Encode(err) => err.into(),
            kind => io::Error::new(io::ErrorKind::Other, Error::new(kind)),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self.0 {
            ErrorKind::Io(ref err) => Some(err),
            ErrorKind::Csv(ref err) => Some(err),
            ErrorKind::Decode(ref err) => Some(err),
            ErrorKind::Encode(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0 {
            ErrorKind::Io(ref err) => err.fmt(f),
            ErrorKind::Csv(ref err) => err.fmt(f),
            ErrorKind::Decode(ref err) => err.fmt(f),
            ErrorKind::Encode(ref err) => err.fmt(f),
            ErrorKind::UnknownEncoding(ref name) => {
                write!(f, "CSV encoding error: unknown encoding '{}'", name)
            }
            ErrorKind::UnknownField(ref name) => write!(
                f,
                "CSV write error: field '{}' is not one of the \
                 writer's field names",
                name
            ),
            _ => unreachable!(),
        }
    }
}

/// An error that occurs when bytes cannot be decoded.
///
/// This is reported either by a recoder, when the source bytes are
/// malformed under the source encoding, or by a reader, when a field
/// produced by the CSV parser is not valid UTF-8.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecodeError {
    encoding: &'static str,
    bytes: Vec<u8>,
    offset: Option<u64>,
    field: Option<usize>,
    pos: Option<csv::Position>,
}

impl DecodeError {
    /// Create an error for malformed bytes found at `offset` in a source.
    pub(crate) fn malformed(
        encoding: &'static str,
        bytes: &[u8],
        offset: u64,
    ) -> DecodeError {
        DecodeError {
            encoding,
            bytes: bytes.to_vec(),
            offset: Some(offset),
            field: None,
            pos: None,
        }
    }

    /// Create an error for a field that failed UTF-8 validation.
    pub(crate) fn field(
        bytes: &[u8],
        field: usize,
        pos: Option<csv::Position>,
    ) -> DecodeError {
        DecodeError {
            encoding: "UTF-8",
            bytes: bytes.to_vec(),
            offset: pos.as_ref().map(|p| p.byte()),
            field: Some(field),
            pos,
        }
    }

    /// The name of the encoding the bytes were decoded from.
    pub fn encoding(&self) -> &'static str {
        self.encoding
    }

    /// The bytes that could not be decoded.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The byte offset in the source at which the malformed bytes start, if
    /// known. For field errors, this is the offset of the record.
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    /// The index of the field that failed to decode, if this error came from
    /// field decoding.
    pub fn field_index(&self) -> Option<usize> {
        self.field
    }

    /// The position of the record containing the bad field, if available.
    pub fn position(&self) -> Option<&csv::Position> {
        self.pos.as_ref()
    }
}

impl StdError for DecodeError {}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.field, &self.pos, self.offset) {
            (Some(field), Some(pos), _) => write!(
                f,
                "CSV decode error: record {} (line {}, byte {}, field {}): \
                 invalid {} bytes {:?}",
                pos.record(),
                pos.line(),
                pos.byte(),
                field,
                self.encoding,
                self.bytes.as_bstr(),
            ),
            (Some(field), None, _) => write!(
                f,
                "CSV decode error: field {}: invalid {} bytes {:?}",
                field,
                self.encoding,
                self.bytes.as_bstr(),
            ),
            (None, _, Some(offset)) => write!(
                f,
                "CSV decode error: byte {}: invalid {} bytes {:?}",
                offset,
                self.encoding,
                self.bytes.as_bstr(),
            ),
            (None, _, None) => write!(
                f,
                "CSV decode error: invalid {} bytes {:?}",
                self.encoding,
                self.bytes.as_bstr(),
            ),
        }
    }
}

impl From<DecodeError> for io::Error {
    fn from(err: DecodeError) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }
}

/// An error that occurs when text contains a character that the
/// destination encoding cannot represent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncodeError {
    encoding: &'static str,
    ch: char,
}

impl EncodeError {
    pub(crate) fn new(encoding: &'static str, ch: char) -> EncodeError {
        EncodeError { encoding, ch }
    }

    /// The name of the destination encoding.
    pub fn encoding(&self) -> &'static str {
        self.encoding
    }

    /// The character that could not be encoded.
    pub fn character(&self) -> char {
        self.ch
    }
}

impl StdError for EncodeError {}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "CSV encode error: character {:?} (U+{:04X}) cannot be \
             encoded in {}",
            self.ch, self.ch as u32, self.encoding,
        )
    }
}

impl From<EncodeError> for io::Error {
    fn from(err: EncodeError) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, err)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::{DecodeError, EncodeError, Error, ErrorKind};

    #[test]
    fn decode_error_survives_io_round_trip() {
        let err = DecodeError::malformed("Shift_JIS", b"\x82", 7);
        let ioerr: io::Error = err.clone().into();
        assert_eq!(ioerr.kind(), io::ErrorKind::InvalidData);
        match Error::from(ioerr).into_kind() {
            ErrorKind::Decode(got) => assert_eq!(got, err),
            kind => panic!("expected decode error, got {:?}", kind),
        }
    }

    #[test]
    fn encode_error_survives_csv_io_error() {
        let err = EncodeError::new("windows-1252", '€');
        let csverr = csv::Error::from(io::Error::from(err.clone()));
        let err2 = Error::from(csverr);
        assert!(err2.is_encode_error());
        match err2.into_kind() {
            ErrorKind::Encode(got) => assert_eq!(got.character(), '€'),
            kind => panic!("expected encode error, got {:?}", kind),
        }
    }

    #[test]
    fn plain_io_error_stays_io() {
        let err = io::Error::new(io::ErrorKind::BrokenPipe, "closed");
        assert!(Error::from(err).is_io_error());
    }

    #[test]
    fn display_mentions_offset_and_bytes() {
        let err = DecodeError::malformed("UTF-16LE", b"\x00\xD8", 12);
        let msg = err.to_string();
        assert!(msg.contains("byte 12"), "{}", msg);
        assert!(msg.contains("UTF-16LE"), "{}", msg);
        assert!(msg.to_lowercase().contains(r"\xd8"), "{}", msg);
    }
}

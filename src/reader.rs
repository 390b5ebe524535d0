use std::collections::hash_map::{self, HashMap};
use std::io;
use std::str;

use csv::{ByteRecord, Position, Terminator};
#[cfg(feature = "serde")]
use serde::de::DeserializeOwned;

use crate::dialect::{CsvFormat, Dialect};
use crate::encoding::Encoding;
use crate::error::{DecodeError, EncodeError, Error, ErrorKind, Result};
use crate::recoder::Recoder;

/// Builds a CSV reader with various configuration knobs.
///
/// This builder can be used to tweak the encoding of the source, the
/// dialect handed to the CSV parser, and the parser's options. Once a
/// `ReaderBuilder` is configured, it can be used to build any number of
/// readers with `from_reader` or `dict_from_reader`.
#[derive(Debug)]
pub struct ReaderBuilder {
    encoding: Encoding,
    dialect: Dialect,
    has_headers: bool,
    flexible: bool,
    capacity: usize,
    fieldnames: Option<Vec<String>>,
    restval: Option<String>,
}

impl Default for ReaderBuilder {
    fn default() -> ReaderBuilder {
        ReaderBuilder {
            encoding: Encoding::utf8(),
            dialect: Dialect::excel(),
            has_headers: false,
            flexible: false,
            capacity: 8 * (1 << 10),
            fieldnames: None,
            restval: None,
        }
    }
}

impl ReaderBuilder {
    /// Create a new builder for configuring CSV parsing.
    ///
    /// To convert a builder into a reader, call one of the methods starting
    /// with `from_` or `dict_from_`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::error::Error;
    /// use ucsv::{Encoding, ReaderBuilder};
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let data = b"Jos\xE9;S\xE3o Paulo\n";
    ///     let mut rdr = ReaderBuilder::new()
    ///         .encoding(Encoding::for_label("latin-1")?)
    ///         .delimiter(b';')
    ///         .from_reader(&data[..]);
    ///
    ///     let mut records = rdr.records();
    ///     let record = records.next().unwrap()?;
    ///     assert_eq!(record, vec!["José", "São Paulo"]);
    ///     Ok(())
    /// }
    /// ```
    pub fn new() -> ReaderBuilder {
        ReaderBuilder::default()
    }

    /// Build a CSV reader from this configuration that reads rows as
    /// sequences of fields.
    pub fn from_reader<R: io::Read>(&self, rdr: R) -> Reader<R> {
        Reader::new(self, rdr, self.has_headers)
    }

    /// Build a CSV reader from this configuration that reads rows as
    /// mappings from field name to value.
    ///
    /// Unless field names were given with `fieldnames`, the first row of
    /// the data is used as field names. `has_headers` has no effect on dict
    /// readers.
    pub fn dict_from_reader<R: io::Read>(&self, rdr: R) -> DictReader<R> {
        DictReader {
            rdr: Reader::new(self, rdr, false),
            fieldnames: self.fieldnames.clone(),
            header_err: None,
            restval: self.restval.clone(),
            row: vec![],
        }
    }

    /// The encoding of the source data.
    ///
    /// This is UTF-8 by default, in which case the source is handed to the
    /// CSV parser without any transcoding.
    pub fn encoding(&mut self, encoding: Encoding) -> &mut ReaderBuilder {
        self.encoding = encoding;
        self
    }

    /// Replace the whole dialect. The default is `Dialect::excel()`.
    pub fn dialect(&mut self, dialect: Dialect) -> &mut ReaderBuilder {
        self.dialect = dialect;
        self
    }

    /// The field delimiter to use when parsing CSV.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut ReaderBuilder {
        self.update(|d| d.delimiter(delimiter))
    }

    /// The quote character to use when parsing CSV.
    pub fn quote(&mut self, quote: u8) -> &mut ReaderBuilder {
        self.update(|d| d.quote(quote))
    }

    /// The escape character to use when parsing CSV.
    pub fn escape(&mut self, escape: Option<u8>) -> &mut ReaderBuilder {
        self.update(|d| d.escape(escape))
    }

    /// Enable double quote escapes.
    pub fn double_quote(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.update(|d| d.double_quote(yes))
    }

    /// The record terminator to use when parsing CSV.
    pub fn terminator(&mut self, term: Terminator) -> &mut ReaderBuilder {
        self.update(|d| d.terminator(term))
    }

    /// The comment character to use when parsing CSV.
    pub fn comment(&mut self, comment: Option<u8>) -> &mut ReaderBuilder {
        self.update(|d| d.comment(comment))
    }

    /// Whether the first row of a sequence reader is a header row.
    ///
    /// This is disabled by default: every row is returned as data. When
    /// enabled, the first row is available from `Reader::headers`.
    pub fn has_headers(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.has_headers = yes;
        self
    }

    /// Whether the number of fields in records is allowed to change or not.
    ///
    /// When disabled (which is the default), the CSV parser returns an
    /// error when a record has a different number of fields than the
    /// first one.
    pub fn flexible(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.flexible = yes;
        self
    }

    /// Set the capacity (in bytes) of the buffers used to read and
    /// transcode the source.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut ReaderBuilder {
        self.capacity = capacity;
        self
    }

    /// Use the given field names for dict readers instead of reading them
    /// from the first row. The first row is then data.
    pub fn fieldnames<I, T>(&mut self, names: I) -> &mut ReaderBuilder
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.fieldnames = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// The value dict readers use for field names missing from short rows.
    ///
    /// By default, missing field names are absent from the record.
    pub fn restval<S>(&mut self, value: S) -> &mut ReaderBuilder
    where
        S: Into<String>,
    {
        self.restval = Some(value.into());
        self
    }

    fn update<F>(&mut self, f: F) -> &mut ReaderBuilder
    where
        F: FnOnce(Dialect) -> Dialect,
    {
        self.dialect = f(self.dialect.clone());
        self
    }
}

/// A CSV reader for data in any encoding.
///
/// The source is decoded from its encoding and handed to the CSV parser as
/// UTF-8. Every field the parser produces is then decoded from UTF-8 into a
/// `String`. When the source encoding is UTF-8, no transcoding happens
/// before parsing.
///
/// Records are returned as `Vec<String>`. By default, every row of the
/// source is a record; see `ReaderBuilder::has_headers`.
///
/// # Example
///
/// ```
/// use ucsv::{Encoding, ReaderBuilder};
///
/// # fn main() { example().unwrap(); }
/// fn example() -> Result<(), ucsv::Error> {
///     let utf16: Vec<u8> = "a,b\r\nc,d\r\n"
///         .encode_utf16()
///         .flat_map(|u| u.to_le_bytes().to_vec())
///         .collect();
///     let mut rdr = ReaderBuilder::new()
///         .encoding(Encoding::for_label("utf-16")?)
///         .from_reader(&utf16[..]);
///     let rows = rdr.records().collect::<Result<Vec<_>, _>>()?;
///     assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Reader<R> {
    rdr: csv::Reader<Recoder<R>>,
    dialect: Dialect,
    encoding: Encoding,
    record: ByteRecord,
    #[cfg(feature = "serde")]
    headers: Option<csv::StringRecord>,
}

impl<R: io::Read> Reader<R> {
    fn new(builder: &ReaderBuilder, rdr: R, has_headers: bool) -> Reader<R> {
        let recoder = Recoder::with_capacity(
            builder.capacity,
            rdr,
            builder.encoding,
            Encoding::utf8(),
        );
        let mut csv = csv::ReaderBuilder::new();
        csv.has_headers(has_headers)
            .flexible(builder.flexible)
            .buffer_capacity(builder.capacity);
        builder.dialect.configure_reader(&mut csv);
        Reader {
            rdr: csv.from_reader(recoder),
            dialect: builder.dialect.clone(),
            encoding: builder.encoding,
            record: ByteRecord::new(),
            #[cfg(feature = "serde")]
            headers: None,
        }
    }

    /// Create a new CSV reader for UTF-8 data with the excel dialect.
    ///
    /// To customize the encoding or the dialect, use a `ReaderBuilder`.
    pub fn from_reader(rdr: R) -> Reader<R> {
        ReaderBuilder::new().from_reader(rdr)
    }

    /// Read a single row into the given record, replacing its contents.
    ///
    /// Returns false when no more records could be read.
    ///
    /// If the row could not be decoded, an error is returned and `record`
    /// is left empty: a partially decoded row is never produced.
    pub fn read_record(&mut self, record: &mut Vec<String>) -> Result<bool> {
        record.clear();
        if !self.rdr.read_byte_record(&mut self.record)? {
            return Ok(false);
        }
        decode_record(&self.record, record)?;
        Ok(true)
    }

    /// Returns a borrowed iterator over all records.
    ///
    /// The iterator stops after yielding an I/O or decoding error.
    pub fn records(&mut self) -> RecordsIter<'_, R> {
        RecordsIter { rdr: self, done: false }
    }

    /// Returns an owned iterator over all records.
    pub fn into_records(self) -> RecordsIntoIter<R> {
        RecordsIntoIter { rdr: self, done: false }
    }

    /// Returns the decoded header row.
    ///
    /// This is only meaningful when `has_headers` was enabled. Otherwise,
    /// the first row is returned without being consumed.
    pub fn headers(&mut self) -> Result<Vec<String>> {
        let mut headers = vec![];
        decode_record(self.rdr.byte_headers()?, &mut headers)?;
        Ok(headers)
    }

    /// Returns an iterator deserializing each record into `D`.
    ///
    /// Fields are transcoded exactly as by `records`. When `has_headers` is
    /// enabled, the header row is used to match struct fields by name.
    #[cfg(feature = "serde")]
    pub fn deserialize<D>(&mut self) -> DeserializeRecordsIter<'_, R, D>
    where
        D: DeserializeOwned,
    {
        DeserializeRecordsIter {
            rdr: self,
            row: vec![],
            done: false,
            _priv: std::marker::PhantomData,
        }
    }

    #[cfg(feature = "serde")]
    fn deserialize_next<D: DeserializeOwned>(
        &mut self,
        row: &mut Vec<String>,
    ) -> Result<Option<D>> {
        if self.rdr.has_headers() && self.headers.is_none() {
            self.headers = Some(csv::StringRecord::from(self.headers()?));
        }
        if !self.read_record(row)? {
            return Ok(None);
        }
        let record = csv::StringRecord::from(&row[..]);
        Ok(Some(record.deserialize(self.headers.as_ref())?))
    }

    /// The position of the parser in the transcoded (UTF-8) data.
    ///
    /// For non-UTF-8 sources, byte offsets do not correspond to offsets in
    /// the source. Line and record numbers do.
    pub fn position(&self) -> &Position {
        self.rdr.position()
    }

    /// Returns true once the reader has exhausted its source.
    pub fn is_done(&self) -> bool {
        self.rdr.is_done()
    }

    /// Returns a reference to the underlying source.
    pub fn get_ref(&self) -> &R {
        self.rdr.get_ref().get_ref()
    }

    /// Unwrap this reader, returning the underlying source.
    ///
    /// Buffered data that was not yet parsed is lost.
    pub fn into_inner(self) -> R {
        self.rdr.into_inner().into_inner()
    }
}

impl<R> CsvFormat for Reader<R> {
    fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    fn encoding(&self) -> Encoding {
        self.encoding
    }
}

/// Decode every field of a UTF-8 byte record into `out`.
///
/// On failure, `out` is left empty.
fn decode_record(record: &ByteRecord, out: &mut Vec<String>) -> Result<()> {
    out.clear();
    for (i, field) in record.iter().enumerate() {
        match str::from_utf8(field) {
            Ok(field) => out.push(field.to_string()),
            Err(err) => {
                out.clear();
                let start = err.valid_up_to();
                let end = match err.error_len() {
                    Some(len) => start + len,
                    None => field.len(),
                };
                return Err(DecodeError::field(
                    &field[start..end],
                    i,
                    record.position().cloned(),
                )
                .into());
            }
        }
    }
    Ok(())
}

/// Whether an iterator should stop after yielding `err`.
///
/// Errors from the CSV parser itself leave it in a state where the next
/// record can be read. Failures of the source or of transcoding do not.
fn is_fatal(err: &Error) -> bool {
    match *err.kind() {
        ErrorKind::Csv(_) => false,
        _ => true,
    }
}

/// A borrowed iterator over records as sequences of fields.
///
/// The lifetime parameter `'r` refers to the lifetime of the underlying
/// CSV `Reader`.
pub struct RecordsIter<'r, R: 'r> {
    rdr: &'r mut Reader<R>,
    done: bool,
}

impl<'r, R: io::Read> RecordsIter<'r, R> {
    /// Return a reference to the underlying CSV reader.
    pub fn reader(&self) -> &Reader<R> {
        &self.rdr
    }
}

impl<'r, R: io::Read> Iterator for RecordsIter<'r, R> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Result<Vec<String>>> {
        if self.done {
            return None;
        }
        let mut record = vec![];
        match self.rdr.read_record(&mut record) {
            Ok(true) => Some(Ok(record)),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = is_fatal(&err);
                Some(Err(err))
            }
        }
    }
}

/// An owned iterator over records as sequences of fields.
pub struct RecordsIntoIter<R> {
    rdr: Reader<R>,
    done: bool,
}

impl<R: io::Read> RecordsIntoIter<R> {
    /// Return a reference to the underlying CSV reader.
    pub fn reader(&self) -> &Reader<R> {
        &self.rdr
    }

    /// Drop this iterator and return the underlying CSV reader.
    pub fn into_reader(self) -> Reader<R> {
        self.rdr
    }
}

impl<R: io::Read> Iterator for RecordsIntoIter<R> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Result<Vec<String>>> {
        if self.done {
            return None;
        }
        let mut record = vec![];
        match self.rdr.read_record(&mut record) {
            Ok(true) => Some(Ok(record)),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = is_fatal(&err);
                Some(Err(err))
            }
        }
    }
}

/// A borrowed iterator over deserialized records.
#[cfg(feature = "serde")]
pub struct DeserializeRecordsIter<'r, R: 'r, D> {
    rdr: &'r mut Reader<R>,
    row: Vec<String>,
    done: bool,
    _priv: std::marker::PhantomData<D>,
}

#[cfg(feature = "serde")]
impl<'r, R: io::Read, D: DeserializeOwned> Iterator
    for DeserializeRecordsIter<'r, R, D>
{
    type Item = Result<D>;

    fn next(&mut self) -> Option<Result<D>> {
        if self.done {
            return None;
        }
        match self.rdr.deserialize_next(&mut self.row) {
            Ok(Some(d)) => Some(Ok(d)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = is_fatal(&err);
                Some(Err(err))
            }
        }
    }
}

/// A single row read by a `DictReader`: a mapping from field name to value.
///
/// Values in a row beyond the number of field names are kept separately
/// and available from `rest`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DictRecord {
    fields: HashMap<String, String>,
    rest: Vec<String>,
}

impl DictRecord {
    /// Create a new empty record.
    pub fn new() -> DictRecord {
        DictRecord::default()
    }

    /// Return the value of the given field, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|v| &**v)
    }

    /// Returns true if this record has a value for the given field.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The number of named fields in this record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if this record has no named fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Values found after the last field name, in order.
    pub fn rest(&self) -> &[String] {
        &self.rest
    }

    /// Iterate over the `(name, value)` pairs in arbitrary order.
    pub fn iter(&self) -> DictRecordIter<'_> {
        DictRecordIter(self.fields.iter())
    }

    /// Return the mapping from field name to value, dropping `rest`.
    pub fn into_map(self) -> HashMap<String, String> {
        self.fields
    }

    fn clear(&mut self) {
        self.fields.clear();
        self.rest.clear();
    }
}

impl From<DictRecord> for HashMap<String, String> {
    fn from(record: DictRecord) -> HashMap<String, String> {
        record.into_map()
    }
}

impl<'a> IntoIterator for &'a DictRecord {
    type IntoIter = DictRecordIter<'a>;
    type Item = (&'a str, &'a str);

    fn into_iter(self) -> DictRecordIter<'a> {
        self.iter()
    }
}

/// An iterator over the `(name, value)` pairs of a `DictRecord`.
pub struct DictRecordIter<'a>(hash_map::Iter<'a, String, String>);

impl<'a> Iterator for DictRecordIter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<(&'a str, &'a str)> {
        self.0.next().map(|(k, v)| (&**k, &**v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

/// A CSV reader that returns each row as a mapping from field name to
/// value.
///
/// Field names are transcoded exactly like values, so non-ASCII headers
/// survive any source encoding.
///
/// # Example
///
/// ```
/// use ucsv::{DictReader, Encoding, ReaderBuilder};
///
/// # fn main() { example().unwrap(); }
/// fn example() -> Result<(), ucsv::Error> {
///     let data = b"nom,ville\nJos\xE9,S\xE3o Paulo\n";
///     let mut rdr = ReaderBuilder::new()
///         .encoding(Encoding::for_label("latin-1")?)
///         .dict_from_reader(&data[..]);
///     assert_eq!(rdr.fieldnames()?, &["nom", "ville"]);
///
///     let row = rdr.records().next().unwrap()?;
///     assert_eq!(row.get("ville"), Some("São Paulo"));
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct DictReader<R> {
    rdr: Reader<R>,
    fieldnames: Option<Vec<String>>,
    header_err: Option<HeaderError>,
    restval: Option<String>,
    row: Vec<String>,
}

/// Why the header row of a dict reader could not be read.
///
/// The row is consumed either way, so the failure is kept and reported by
/// every later read instead of taking the next row as the header.
#[derive(Debug)]
enum HeaderError {
    Decode(DecodeError),
    Encode(EncodeError),
    Io(io::ErrorKind, String),
}

impl HeaderError {
    fn new(err: &Error) -> HeaderError {
        match *err.kind() {
            ErrorKind::Decode(ref err) => HeaderError::Decode(err.clone()),
            ErrorKind::Encode(ref err) => HeaderError::Encode(err.clone()),
            ErrorKind::Io(ref ioerr) => {
                HeaderError::Io(ioerr.kind(), ioerr.to_string())
            }
            _ => HeaderError::Io(io::ErrorKind::Other, err.to_string()),
        }
    }

    fn to_error(&self) -> Error {
        match *self {
            HeaderError::Decode(ref err) => Error::from(err.clone()),
            HeaderError::Encode(ref err) => Error::from(err.clone()),
            HeaderError::Io(kind, ref msg) => {
                Error::from(io::Error::new(kind, msg.clone()))
            }
        }
    }
}

impl<R: io::Read> DictReader<R> {
    /// Create a new dict reader for UTF-8 data with the excel dialect,
    /// taking field names from the first row.
    pub fn from_reader(rdr: R) -> DictReader<R> {
        ReaderBuilder::new().dict_from_reader(rdr)
    }

    /// Returns the field names, reading the first row if necessary.
    ///
    /// An empty source has no field names. If the first row cannot be
    /// read, this and every later read fail with the same error.
    pub fn fieldnames(&mut self) -> Result<&[String]> {
        if let Some(ref err) = self.header_err {
            return Err(err.to_error());
        }
        if self.fieldnames.is_none() {
            let mut names = vec![];
            if let Err(err) = self.rdr.read_record(&mut names) {
                self.header_err = Some(HeaderError::new(&err));
                return Err(err);
            }
            self.fieldnames = Some(names);
        }
        Ok(self.fieldnames.as_ref().map(|v| &**v).unwrap_or(&[]))
    }

    /// Read a single row into the given record, replacing its contents.
    ///
    /// Returns false when no more records could be read.
    pub fn read_record(&mut self, record: &mut DictRecord) -> Result<bool> {
        record.clear();
        self.fieldnames()?;
        if !self.rdr.read_record(&mut self.row)? {
            return Ok(false);
        }
        let names: &[String] = match self.fieldnames {
            Some(ref names) => names,
            None => &[],
        };
        let mut values = self.row.drain(..);
        for name in names.iter() {
            match values.next() {
                Some(value) => {
                    record.fields.insert(name.clone(), value);
                }
                None => {
                    if let Some(ref restval) = self.restval {
                        record.fields.insert(name.clone(), restval.clone());
                    }
                }
            }
        }
        record.rest.extend(values);
        Ok(true)
    }

    /// Returns a borrowed iterator over all records.
    ///
    /// The iterator stops after yielding an I/O or decoding error.
    pub fn records(&mut self) -> DictRecordsIter<'_, R> {
        DictRecordsIter { rdr: self, done: false }
    }

    /// Returns an owned iterator over all records.
    pub fn into_records(self) -> DictRecordsIntoIter<R> {
        DictRecordsIntoIter { rdr: self, done: false }
    }

    /// Returns an iterator deserializing each record into `D`, matching
    /// struct fields against the field names.
    #[cfg(feature = "serde")]
    pub fn deserialize<D>(&mut self) -> DictDeserializeRecordsIter<'_, R, D>
    where
        D: DeserializeOwned,
    {
        DictDeserializeRecordsIter {
            rdr: self,
            done: false,
            _priv: std::marker::PhantomData,
        }
    }

    #[cfg(feature = "serde")]
    fn deserialize_next<D: DeserializeOwned>(&mut self) -> Result<Option<D>> {
        let headers = csv::StringRecord::from(self.fieldnames()?);
        if !self.rdr.read_record(&mut self.row)? {
            return Ok(None);
        }
        let record = csv::StringRecord::from(&self.row[..]);
        Ok(Some(record.deserialize(Some(&headers))?))
    }

    /// The position of the parser in the transcoded (UTF-8) data.
    pub fn position(&self) -> &Position {
        self.rdr.position()
    }

    /// Returns true once the reader has exhausted its source.
    pub fn is_done(&self) -> bool {
        self.rdr.is_done()
    }

    /// Returns a reference to the underlying source.
    pub fn get_ref(&self) -> &R {
        self.rdr.get_ref()
    }

    /// Unwrap this reader, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.rdr.into_inner()
    }
}

impl<R> CsvFormat for DictReader<R> {
    fn dialect(&self) -> &Dialect {
        self.rdr.dialect()
    }

    fn encoding(&self) -> Encoding {
        self.rdr.encoding()
    }
}

/// A borrowed iterator over the records of a `DictReader`.
pub struct DictRecordsIter<'r, R: 'r> {
    rdr: &'r mut DictReader<R>,
    done: bool,
}

impl<'r, R: io::Read> Iterator for DictRecordsIter<'r, R> {
    type Item = Result<DictRecord>;

    fn next(&mut self) -> Option<Result<DictRecord>> {
        if self.done {
            return None;
        }
        let mut record = DictRecord::new();
        match self.rdr.read_record(&mut record) {
            Ok(true) => Some(Ok(record)),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = is_fatal(&err);
                Some(Err(err))
            }
        }
    }
}

/// An owned iterator over the records of a `DictReader`.
pub struct DictRecordsIntoIter<R> {
    rdr: DictReader<R>,
    done: bool,
}

impl<R: io::Read> DictRecordsIntoIter<R> {
    /// Drop this iterator and return the underlying reader.
    pub fn into_reader(self) -> DictReader<R> {
        self.rdr
    }
}

impl<R: io::Read> Iterator for DictRecordsIntoIter<R> {
    type Item = Result<DictRecord>;

    fn next(&mut self) -> Option<Result<DictRecord>> {
        if self.done {
            return None;
        }
        let mut record = DictRecord::new();
        match self.rdr.read_record(&mut record) {
            Ok(true) => Some(Ok(record)),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = is_fatal(&err);
                Some(Err(err))
            }
        }
    }
}

/// A borrowed iterator over records of a `DictReader` deserialized into
/// `D`.
#[cfg(feature = "serde")]
pub struct DictDeserializeRecordsIter<'r, R: 'r, D> {
    rdr: &'r mut DictReader<R>,
    done: bool,
    _priv: std::marker::PhantomData<D>,
}

#[cfg(feature = "serde")]
impl<'r, R: io::Read, D: DeserializeOwned> Iterator
    for DictDeserializeRecordsIter<'r, R, D>
{
    type Item = Result<D>;

    fn next(&mut self) -> Option<Result<D>> {
        if self.done {
            return None;
        }
        match self.rdr.deserialize_next() {
            Ok(Some(d)) => Some(Ok(d)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = is_fatal(&err);
                Some(Err(err))
            }
        }
    }
}

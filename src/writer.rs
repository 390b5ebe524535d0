use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::rc::Rc;
use std::str;

use csv::{QuoteStyle, Terminator};
#[cfg(feature = "serde")]
use serde::Serialize;

use crate::dialect::{CsvFormat, Dialect};
use crate::encoding::{Encoder, Encoding};
use crate::error::{DecodeError, Error, ErrorKind, Result};

/// What a `DictWriter` does with field names that are not among its
/// configured field names.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExtraFields {
    /// Fail with `ErrorKind::UnknownField` without writing anything. This
    /// is the default.
    Error,
    /// Silently drop the unknown fields.
    Ignore,
}

impl Default for ExtraFields {
    fn default() -> ExtraFields {
        ExtraFields::Error
    }
}

/// Builds a CSV writer with various configuration knobs.
///
/// This builder can be used to tweak the encoding of the destination, the
/// dialect handed to the CSV writer, and the writer's options. Once a
/// `WriterBuilder` is configured, it can be used to build any number of
/// writers.
#[derive(Debug)]
pub struct WriterBuilder {
    encoding: Encoding,
    dialect: Dialect,
    has_headers: bool,
    flexible: bool,
    capacity: usize,
    restval: String,
    extra_fields: ExtraFields,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder {
            encoding: Encoding::utf8(),
            dialect: Dialect::excel(),
            has_headers: true,
            flexible: false,
            capacity: 8 * (1 << 10),
            restval: String::new(),
            extra_fields: ExtraFields::Error,
        }
    }
}

impl WriterBuilder {
    /// Create a new builder for configuring CSV writing.
    ///
    /// # Example
    ///
    /// ```
    /// use std::error::Error;
    /// use ucsv::{Encoding, WriterBuilder};
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let mut wtr = WriterBuilder::new()
    ///         .encoding(Encoding::for_label("latin-1")?)
    ///         .from_writer(vec![]);
    ///     wtr.write_record(&["José", "São Paulo"])?;
    ///
    ///     let data = wtr.into_inner()?;
    ///     assert_eq!(data, b"Jos\xE9,S\xE3o Paulo\r\n");
    ///     Ok(())
    /// }
    /// ```
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Build a CSV writer from this configuration that writes rows given as
    /// sequences of fields.
    pub fn from_writer<W: io::Write>(&self, wtr: W) -> Writer<W> {
        Writer::new(self, wtr)
    }

    /// Build a CSV writer from this configuration that writes rows given as
    /// mappings from field name to value, ordered by `fieldnames`.
    pub fn dict_from_writer<W, I, T>(
        &self,
        fieldnames: I,
        wtr: W,
    ) -> DictWriter<W>
    where
        W: io::Write,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let fieldnames: Vec<String> =
            fieldnames.into_iter().map(Into::into).collect();
        let index = fieldnames
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        DictWriter {
            wtr: Writer::new(self, wtr),
            fieldnames,
            index,
            restval: self.restval.clone(),
            extra_fields: self.extra_fields,
        }
    }

    /// The encoding of the destination.
    ///
    /// This is UTF-8 by default, in which case the CSV writer writes
    /// directly into the destination.
    pub fn encoding(&mut self, encoding: Encoding) -> &mut WriterBuilder {
        self.encoding = encoding;
        self
    }

    /// Replace the whole dialect. The default is `Dialect::excel()`.
    pub fn dialect(&mut self, dialect: Dialect) -> &mut WriterBuilder {
        self.dialect = dialect;
        self
    }

    /// The field delimiter to use when writing CSV.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut WriterBuilder {
        self.update(|d| d.delimiter(delimiter))
    }

    /// The quote character to use when writing CSV.
    pub fn quote(&mut self, quote: u8) -> &mut WriterBuilder {
        self.update(|d| d.quote(quote))
    }

    /// The escape character to use when writing CSV with `double_quote`
    /// disabled. `None` means a backslash.
    pub fn escape(&mut self, escape: Option<u8>) -> &mut WriterBuilder {
        self.update(|d| d.escape(escape))
    }

    /// Enable double quote escapes.
    pub fn double_quote(&mut self, yes: bool) -> &mut WriterBuilder {
        self.update(|d| d.double_quote(yes))
    }

    /// The quoting style to use when writing CSV.
    pub fn quote_style(&mut self, style: QuoteStyle) -> &mut WriterBuilder {
        self.update(|d| d.quote_style(style))
    }

    /// The record terminator to use when writing CSV.
    pub fn terminator(&mut self, term: Terminator) -> &mut WriterBuilder {
        self.update(|d| d.terminator(term))
    }

    /// Whether `serialize` writes a header row for structs. Enabled by
    /// default.
    pub fn has_headers(&mut self, yes: bool) -> &mut WriterBuilder {
        self.has_headers = yes;
        self
    }

    /// Whether records of different lengths may be written.
    pub fn flexible(&mut self, yes: bool) -> &mut WriterBuilder {
        self.flexible = yes;
        self
    }

    /// Set the capacity (in bytes) of the CSV writer's internal buffer.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut WriterBuilder {
        self.capacity = capacity;
        self
    }

    /// The value dict writers use for field names missing from a row.
    ///
    /// This is the empty string by default.
    pub fn restval<S>(&mut self, value: S) -> &mut WriterBuilder
    where
        S: Into<String>,
    {
        self.restval = value.into();
        self
    }

    /// What dict writers do with field names they do not know.
    pub fn extra_fields(&mut self, action: ExtraFields) -> &mut WriterBuilder {
        self.extra_fields = action;
        self
    }

    fn update<F>(&mut self, f: F) -> &mut WriterBuilder
    where
        F: FnOnce(Dialect) -> Dialect,
    {
        self.dialect = f(self.dialect.clone());
        self
    }
}

/// A field handed to the CSV writer as its UTF-8 bytes.
struct Utf8<T>(T);

impl<T: AsRef<str>> AsRef<[u8]> for Utf8<T> {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref().as_bytes()
    }
}

/// The intermediate buffer a transcoding writer formats one row into.
#[derive(Clone, Default)]
struct Spool(Rc<RefCell<Vec<u8>>>);

impl Spool {
    #[cfg(test)]
    fn len(&self) -> usize {
        self.0.borrow().len()
    }

    fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl io::Write for Spool {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

enum Sink<W: io::Write> {
    Direct(csv::Writer<W>),
    Transcode(Transcoder<W>),
}

struct Transcoder<W: io::Write> {
    csv: csv::Writer<Spool>,
    spool: Spool,
    encoder: Encoder,
    out: Vec<u8>,
    wtr: W,
}

impl<W: io::Write> Transcoder<W> {
    /// Run one write through the CSV writer and move its output to the
    /// destination.
    ///
    /// The spool is empty when this returns, whether or not it succeeded.
    fn write<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut csv::Writer<Spool>) -> csv::Result<()>,
    {
        let res = f(&mut self.csv);
        let flushed = self.csv.flush();
        if let Err(err) = res {
            self.spool.clear();
            return Err(Error::from(err));
        }
        if let Err(err) = flushed {
            self.spool.clear();
            return Err(Error::from(err));
        }
        self.drain()
    }

    fn drain(&mut self) -> Result<()> {
        self.out.clear();
        let res = {
            let mut buf = self.spool.0.borrow_mut();
            let res = transcode(&buf, &mut self.encoder, &mut self.out);
            buf.clear();
            res
        };
        if let Err(err) = res {
            self.out.clear();
            return Err(err);
        }
        tracing::trace!(len = self.out.len(), "transcoded row");
        self.wtr.write_all(&self.out)?;
        self.out.clear();
        Ok(())
    }

    fn finish(mut self) -> Result<W> {
        self.csv.flush()?;
        self.drain()?;
        self.encoder.encode("", &mut self.out, true)?;
        self.wtr.write_all(&self.out)?;
        self.wtr.flush()?;
        Ok(self.wtr)
    }
}

/// Decode the UTF-8 output of the CSV writer and encode it into `out`.
fn transcode(
    buf: &[u8],
    encoder: &mut Encoder,
    out: &mut Vec<u8>,
) -> Result<()> {
    let text = match str::from_utf8(buf) {
        Ok(text) => text,
        Err(err) => {
            let start = err.valid_up_to();
            let end = match err.error_len() {
                Some(len) => start + len,
                None => buf.len(),
            };
            return Err(DecodeError::malformed(
                "UTF-8",
                &buf[start..end],
                start as u64,
            )
            .into());
        }
    };
    encoder.encode(text, out, false)?;
    Ok(())
}

/// A CSV writer for data in any encoding.
///
/// Fields are given as text and handed to the CSV writer as UTF-8. When the
/// destination encoding is UTF-8, the CSV writer writes straight into the
/// destination. Otherwise, each row is formatted into an intermediate
/// buffer, decoded, re-encoded into the destination encoding and written
/// to the destination before the next row starts.
///
/// The encoder keeps its state for the lifetime of the writer: a UTF-16
/// byte order mark is written once, and shift states of stateful encodings
/// carry across rows. Call `into_inner` to finish such encodings; dropping
/// the writer does not.
///
/// # Example
///
/// ```
/// use ucsv::{Encoding, WriterBuilder};
///
/// # fn main() { example().unwrap(); }
/// fn example() -> Result<(), ucsv::Error> {
///     let mut wtr = WriterBuilder::new()
///         .encoding(Encoding::for_label("utf-16")?)
///         .from_writer(vec![]);
///     wtr.write_records(vec![vec!["a", "b"], vec!["c", "d"]])?;
///
///     let data = wtr.into_inner()?;
///     assert_eq!(&data[..4], b"\xFF\xFEa\x00");
///     Ok(())
/// }
/// ```
pub struct Writer<W: io::Write> {
    sink: Sink<W>,
    dialect: Dialect,
    encoding: Encoding,
}

impl<W: io::Write> Writer<W> {
    fn new(builder: &WriterBuilder, wtr: W) -> Writer<W> {
        let mut csv = csv::WriterBuilder::new();
        csv.has_headers(builder.has_headers)
            .flexible(builder.flexible)
            .buffer_capacity(builder.capacity);
        builder.dialect.configure_writer(&mut csv);
        let sink = if builder.encoding.is_utf8() {
            tracing::debug!("writer passthrough");
            Sink::Direct(csv.from_writer(wtr))
        } else {
            tracing::debug!(
                encoding = builder.encoding.name(),
                "writer transcoding"
            );
            let spool = Spool::default();
            Sink::Transcode(Transcoder {
                csv: csv.from_writer(spool.clone()),
                spool,
                encoder: builder.encoding.new_encoder(),
                out: vec![],
                wtr,
            })
        };
        Writer {
            sink,
            dialect: builder.dialect.clone(),
            encoding: builder.encoding,
        }
    }

    /// Create a new CSV writer that writes UTF-8 CSV data with the excel
    /// dialect.
    ///
    /// To customize the encoding or the dialect, use a `WriterBuilder`.
    pub fn from_writer(wtr: W) -> Writer<W> {
        WriterBuilder::new().from_writer(wtr)
    }

    /// Write a single record.
    ///
    /// If this fails, rows written before remain in the destination.
    ///
    /// # Example
    ///
    /// ```
    /// use ucsv::Writer;
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), ucsv::Error> {
    ///     let mut wtr = Writer::from_writer(vec![]);
    ///     wtr.write_record(&["a", "b,c"])?;
    ///     wtr.write_record(vec!["x".to_string(), "y".to_string()])?;
    ///
    ///     let data = String::from_utf8(wtr.into_inner()?).unwrap();
    ///     assert_eq!(data, "a,\"b,c\"\r\nx,y\r\n");
    ///     Ok(())
    /// }
    /// ```
    pub fn write_record<I, T>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let fields = record.into_iter().map(Utf8);
        match self.sink {
            Sink::Direct(ref mut csv) => Ok(csv.write_record(fields)?),
            Sink::Transcode(ref mut t) => {
                t.write(|csv| csv.write_record(fields))
            }
        }
    }

    /// Write every record in order, exactly as repeated calls to
    /// `write_record` would.
    ///
    /// Records written before a failure remain in the destination.
    pub fn write_records<I, R, T>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Serialize a single record with `serde` and write it.
    ///
    /// When `has_headers` is enabled and the record is a struct, a header
    /// row is written before the first record.
    #[cfg(feature = "serde")]
    pub fn serialize<S: Serialize>(&mut self, record: S) -> Result<()> {
        match self.sink {
            Sink::Direct(ref mut csv) => Ok(csv.serialize(record)?),
            Sink::Transcode(ref mut t) => t.write(|csv| csv.serialize(record)),
        }
    }

    /// Flush all buffered data to the destination, and flush the
    /// destination.
    pub fn flush(&mut self) -> Result<()> {
        match self.sink {
            Sink::Direct(ref mut csv) => csv.flush()?,
            Sink::Transcode(ref mut t) => {
                t.csv.flush()?;
                t.drain()?;
                t.wtr.flush()?;
            }
        }
        Ok(())
    }

    /// Flush this writer, finish the destination encoding and return the
    /// destination.
    ///
    /// Finishing writes whatever the encoder still owes, such as the
    /// sequence that returns ISO-2022-JP to ASCII.
    pub fn into_inner(self) -> Result<W> {
        match self.sink {
            Sink::Direct(mut csv) => {
                csv.flush()?;
                csv.into_inner().map_err(|err| {
                    let err = err.error();
                    Error::from(io::Error::new(err.kind(), err.to_string()))
                })
            }
            Sink::Transcode(t) => t.finish(),
        }
    }

    /// Returns a reference to the destination.
    pub fn get_ref(&self) -> &W {
        match self.sink {
            Sink::Direct(ref csv) => csv.get_ref(),
            Sink::Transcode(ref t) => &t.wtr,
        }
    }

    /// Returns true if rows go straight to the destination without
    /// transcoding.
    pub fn is_passthrough(&self) -> bool {
        match self.sink {
            Sink::Direct(_) => true,
            Sink::Transcode(_) => false,
        }
    }

    /// The number of bytes waiting in the intermediate buffer.
    #[cfg(test)]
    fn buffered_len(&self) -> usize {
        match self.sink {
            Sink::Direct(_) => 0,
            Sink::Transcode(ref t) => t.spool.len(),
        }
    }
}

impl<W: io::Write> CsvFormat for Writer<W> {
    fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl<W: io::Write + fmt::Debug> fmt::Debug for Writer<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Writer")
            .field("wtr", self.get_ref())
            .field("dialect", &self.dialect)
            .field("encoding", &self.encoding)
            .finish()
    }
}

/// A CSV writer that takes each row as a mapping from field name to value.
///
/// Values are written in the order of the field names given when the
/// writer was built. The field names themselves are written, transcoded
/// like any other row, by `write_header`.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use ucsv::{Encoding, WriterBuilder};
///
/// # fn main() { example().unwrap(); }
/// fn example() -> Result<(), ucsv::Error> {
///     let mut wtr = WriterBuilder::new()
///         .encoding(Encoding::for_label("latin-1")?)
///         .dict_from_writer(vec!["name", "city"], vec![]);
///     wtr.write_header()?;
///
///     let mut row = HashMap::new();
///     row.insert("city", "São Paulo");
///     row.insert("name", "José");
///     wtr.write_record(&row)?;
///
///     let data = wtr.into_inner()?;
///     assert_eq!(data, b"name,city\r\nJos\xE9,S\xE3o Paulo\r\n");
///     Ok(())
/// }
/// ```
pub struct DictWriter<W: io::Write> {
    wtr: Writer<W>,
    fieldnames: Vec<String>,
    index: HashMap<String, usize>,
    restval: String,
    extra_fields: ExtraFields,
}

impl<W: io::Write> DictWriter<W> {
    /// Create a new dict writer for UTF-8 CSV data with the excel dialect.
    pub fn from_writer<I, T>(fieldnames: I, wtr: W) -> DictWriter<W>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        WriterBuilder::new().dict_from_writer(fieldnames, wtr)
    }

    /// The field names, in the order values are written.
    pub fn fieldnames(&self) -> &[String] {
        &self.fieldnames
    }

    /// Write the field names as a row.
    pub fn write_header(&mut self) -> Result<()> {
        self.wtr.write_record(&self.fieldnames)
    }

    /// Write a single row given as `(name, value)` pairs.
    ///
    /// Field names missing from the row are written as the configured
    /// `restval`. Unknown field names are an error unless the writer was
    /// configured with `ExtraFields::Ignore`; on error, nothing is written.
    pub fn write_record<I, K, V>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut values: Vec<Option<V>> =
            self.fieldnames.iter().map(|_| None).collect();
        for (name, value) in record {
            match self.index.get(name.as_ref()) {
                Some(&i) => values[i] = Some(value),
                None => {
                    if self.extra_fields == ExtraFields::Error {
                        let name = name.as_ref().to_string();
                        return Err(Error::new(ErrorKind::UnknownField(name)));
                    }
                }
            }
        }
        let restval = &self.restval;
        self.wtr.write_record(values.iter().map(|v| match *v {
            Some(ref v) => v.as_ref(),
            None => restval.as_str(),
        }))
    }

    /// Write every row in order, exactly as repeated calls to
    /// `write_record` would.
    pub fn write_records<I, R, K, V>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Flush all buffered data to the destination.
    pub fn flush(&mut self) -> Result<()> {
        self.wtr.flush()
    }

    /// Flush this writer, finish the destination encoding and return the
    /// destination.
    pub fn into_inner(self) -> Result<W> {
        self.wtr.into_inner()
    }

    /// Returns a reference to the destination.
    pub fn get_ref(&self) -> &W {
        self.wtr.get_ref()
    }
}

impl<W: io::Write> CsvFormat for DictWriter<W> {
    fn dialect(&self) -> &Dialect {
        self.wtr.dialect()
    }

    fn encoding(&self) -> Encoding {
        self.wtr.encoding()
    }
}

impl<W: io::Write + fmt::Debug> fmt::Debug for DictWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DictWriter")
            .field("wtr", &self.wtr)
            .field("fieldnames", &self.fieldnames)
            .finish()
    }
}

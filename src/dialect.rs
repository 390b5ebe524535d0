use csv::{QuoteStyle, Terminator};

use crate::encoding::Encoding;

/// The formatting rules handed to the CSV parser and writer.
///
/// A dialect covers the delimiter, quoting and escaping policy, the record
/// terminator and the comment character. It does not cover the character
/// encoding, which is configured separately and applied outside of the CSV
/// parser and writer.
///
/// The default dialect is `Dialect::excel()`.
///
/// ```
/// use ucsv::Dialect;
///
/// let d = Dialect::excel().delimiter(b';').quote(b'\'');
/// assert_eq!(d.get_delimiter(), b';');
/// assert_eq!(d.get_quote(), b'\'');
/// ```
#[derive(Clone, Debug)]
pub struct Dialect {
    delimiter: u8,
    quote: u8,
    escape: Option<u8>,
    double_quote: bool,
    quote_style: QuoteStyle,
    terminator: Terminator,
    comment: Option<u8>,
}

impl Default for Dialect {
    fn default() -> Dialect {
        Dialect::excel()
    }
}

impl Dialect {
    /// The dialect of CSV files produced by Excel: comma delimited, fields
    /// quoted with `"` only when necessary, quotes escaped by doubling and
    /// records terminated by `\r\n`.
    ///
    /// When reading, the `CRLF` terminator accepts any of `\r`, `\n` or
    /// `\r\n`.
    pub fn excel() -> Dialect {
        Dialect {
            delimiter: b',',
            quote: b'"',
            escape: None,
            double_quote: true,
            quote_style: QuoteStyle::Necessary,
            terminator: Terminator::CRLF,
            comment: None,
        }
    }

    /// Like `excel`, but delimited by tabs.
    pub fn excel_tab() -> Dialect {
        Dialect::excel().delimiter(b'\t')
    }

    /// The dialect of CSV files produced on Unix systems: comma delimited,
    /// every field quoted and records terminated by `\n`.
    pub fn unix() -> Dialect {
        Dialect::excel()
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
    }

    /// Set the field delimiter.
    pub fn delimiter(mut self, delimiter: u8) -> Dialect {
        self.delimiter = delimiter;
        self
    }

    /// Set the quote character.
    pub fn quote(mut self, quote: u8) -> Dialect {
        self.quote = quote;
        self
    }

    /// Set the escape character used inside quoted fields when
    /// `double_quote` is disabled.
    pub fn escape(mut self, escape: Option<u8>) -> Dialect {
        self.escape = escape;
        self
    }

    /// Enable or disable escaping quotes by doubling them.
    pub fn double_quote(mut self, yes: bool) -> Dialect {
        self.double_quote = yes;
        self
    }

    /// Set the quoting style used when writing.
    ///
    /// When reading, `QuoteStyle::Never` disables quote handling entirely.
    pub fn quote_style(mut self, style: QuoteStyle) -> Dialect {
        self.quote_style = style;
        self
    }

    /// Set the record terminator.
    pub fn terminator(mut self, term: Terminator) -> Dialect {
        self.terminator = term;
        self
    }

    /// Set the comment character. Records starting with it are skipped when
    /// reading. Writers ignore it.
    pub fn comment(mut self, comment: Option<u8>) -> Dialect {
        self.comment = comment;
        self
    }

    /// The field delimiter.
    pub fn get_delimiter(&self) -> u8 {
        self.delimiter
    }

    /// The quote character.
    pub fn get_quote(&self) -> u8 {
        self.quote
    }

    /// The escape character, if any.
    pub fn get_escape(&self) -> Option<u8> {
        self.escape
    }

    /// Whether quotes are escaped by doubling them.
    pub fn get_double_quote(&self) -> bool {
        self.double_quote
    }

    /// The quoting style used when writing.
    pub fn get_quote_style(&self) -> QuoteStyle {
        self.quote_style
    }

    /// The record terminator.
    pub fn get_terminator(&self) -> Terminator {
        self.terminator
    }

    /// The comment character, if any.
    pub fn get_comment(&self) -> Option<u8> {
        self.comment
    }

    /// Apply this dialect to a CSV reader configuration.
    pub(crate) fn configure_reader(&self, builder: &mut csv::ReaderBuilder) {
        let quoting = match self.quote_style {
            QuoteStyle::Never => false,
            _ => true,
        };
        builder
            .delimiter(self.delimiter)
            .quote(self.quote)
            .escape(self.escape)
            .double_quote(self.double_quote)
            .quoting(quoting)
            .terminator(self.terminator)
            .comment(self.comment);
    }

    /// Apply this dialect to a CSV writer configuration.
    pub(crate) fn configure_writer(&self, builder: &mut csv::WriterBuilder) {
        builder
            .delimiter(self.delimiter)
            .quote(self.quote)
            .escape(self.escape.unwrap_or(b'\\'))
            .double_quote(self.double_quote)
            .quote_style(self.quote_style)
            .terminator(self.terminator);
    }
}

/// Explicit introspection of a CSV reader or writer.
///
/// Every reader and writer in this crate reports the dialect it hands to
/// the CSV engine and the encoding of the data on its outer side.
pub trait CsvFormat {
    /// The dialect used to parse or format records.
    fn dialect(&self) -> &Dialect;

    /// The encoding of the source (readers) or destination (writers).
    fn encoding(&self) -> Encoding;
}

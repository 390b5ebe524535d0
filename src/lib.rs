/*!
The `ucsv` crate reads and writes CSV data whose text is in any character
encoding, on top of the [`csv`](https://docs.rs/csv) crate.

The `csv` crate parses and writes bytes, and is happiest with UTF-8. This
crate sits on either side of it:

* A [`Reader`](struct.Reader.html) decodes its source from the source
  encoding with a [`Recoder`](struct.Recoder.html), hands the resulting
  UTF-8 to the CSV parser, and decodes every parsed field into a `String`.
* A [`Writer`](struct.Writer.html) hands text fields to the CSV writer as
  UTF-8, lets it format one row into an intermediate buffer, and re-encodes
  that row into the destination encoding before writing it out.

When the encoding is UTF-8, neither side transcodes anything: the source
goes straight to the parser and the CSV writer writes straight to the
destination.

[`DictReader`](struct.DictReader.html) and
[`DictWriter`](struct.DictWriter.html) do the same for rows given as
mappings from field name to value. Field names are transcoded like values.

# Example: reading UTF-16

```
use ucsv::{Encoding, ReaderBuilder};

# fn main() { example().unwrap(); }
fn example() -> Result<(), ucsv::Error> {
    let mut data = vec![0xFF, 0xFE];
    data.extend("city,pop\r\nTōkyō,37\r\n".encode_utf16().flat_map(|u| {
        u.to_le_bytes().to_vec()
    }));

    let mut rdr = ReaderBuilder::new()
        .encoding(Encoding::for_label("utf-16")?)
        .dict_from_reader(&data[..]);
    for result in rdr.records() {
        let row = result?;
        assert_eq!(row.get("city"), Some("Tōkyō"));
    }
    Ok(())
}
```

# Example: writing Shift_JIS

```
use ucsv::{Encoding, WriterBuilder};

# fn main() { example().unwrap(); }
fn example() -> Result<(), ucsv::Error> {
    let mut wtr = WriterBuilder::new()
        .encoding(Encoding::for_label("shift_jis")?)
        .from_writer(vec![]);
    wtr.write_record(&["名前", "年齢"])?;
    wtr.write_record(&["太郎", "20"])?;

    let data = wtr.into_inner()?;
    let (text, _, malformed) = encoding_rs::SHIFT_JIS.decode(&data);
    assert!(!malformed);
    assert_eq!(text, "名前,年齢\r\n太郎,20\r\n");
    Ok(())
}
```

# Errors

Bytes that are malformed in the source encoding, and characters that the
destination encoding cannot represent, are errors: nothing is ever replaced
or dropped. See [`ErrorKind`](enum.ErrorKind.html).
*/

#![deny(missing_docs)]

pub use csv::{Position, QuoteStyle, Terminator};

pub use crate::dialect::{CsvFormat, Dialect};
pub use crate::encoding::Encoding;
pub use crate::error::{DecodeError, EncodeError, Error, ErrorKind, Result};
#[cfg(feature = "serde")]
pub use crate::reader::{DeserializeRecordsIter, DictDeserializeRecordsIter};
pub use crate::reader::{
    DictReader, DictRecord, DictRecordIter, DictRecordsIntoIter,
    DictRecordsIter, Reader, ReaderBuilder, RecordsIntoIter, RecordsIter,
};
pub use crate::recoder::Recoder;
pub use crate::writer::{DictWriter, ExtraFields, Writer, WriterBuilder};

mod dialect;
mod encoding;
mod error;
mod reader;
mod recoder;
mod writer;

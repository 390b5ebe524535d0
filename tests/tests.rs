use std::collections::HashMap;

use ucsv::{
    CsvFormat, Dialect, DictReader, DictWriter, Encoding, ErrorKind, Reader,
    ReaderBuilder, Writer, WriterBuilder,
};

fn enc(label: &str) -> Encoding {
    Encoding::for_label(label).unwrap()
}

fn rows() -> Vec<Vec<String>> {
    let rows = vec![
        vec!["name", "city", "note"],
        vec!["José", "São Paulo", "says \"olá\""],
        vec!["Zoë", "Zürich", "multi\nline"],
        vec!["", "Ørsted", "a,b;c"],
    ];
    rows.into_iter()
        .map(|row| row.into_iter().map(String::from).collect())
        .collect()
}

fn write_all(label: &str, dialect: Dialect) -> Vec<u8> {
    let mut wtr = WriterBuilder::new()
        .encoding(enc(label))
        .dialect(dialect)
        .from_writer(vec![]);
    wtr.write_records(&rows()).unwrap();
    wtr.into_inner().unwrap()
}

fn read_all(label: &str, dialect: Dialect, data: &[u8]) -> Vec<Vec<String>> {
    ReaderBuilder::new()
        .encoding(enc(label))
        .dialect(dialect)
        .from_reader(data)
        .into_records()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn round_trip_sequences() {
    for label in &["utf-8", "utf-16", "utf-16be", "latin-1", "utf-8-sig"] {
        for dialect in vec![Dialect::excel(), Dialect::unix()] {
            let data = write_all(label, dialect.clone());
            let got = read_all(label, dialect, &data);
            assert_eq!(got, rows(), "encoding {}", label);
        }
    }
}

#[test]
fn round_trip_small_buffers() {
    let data = write_all("utf-16", Dialect::excel_tab());
    let got: Vec<Vec<String>> = ReaderBuilder::new()
        .encoding(enc("utf-16"))
        .dialect(Dialect::excel_tab())
        .buffer_capacity(1)
        .from_reader(&data[..])
        .into_records()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(got, rows());
}

#[test]
fn round_trip_dicts() {
    let fieldnames = vec!["prénom", "ville"];
    let mut expected = vec![];
    for &(name, city) in &[("José", "São Paulo"), ("Zoë", "Zürich")] {
        let mut row = HashMap::new();
        row.insert("prénom".to_string(), name.to_string());
        row.insert("ville".to_string(), city.to_string());
        expected.push(row);
    }

    for label in &["utf-8", "utf-16", "latin-1"] {
        let mut wtr = WriterBuilder::new()
            .encoding(enc(label))
            .dict_from_writer(fieldnames.clone(), vec![]);
        wtr.write_header().unwrap();
        wtr.write_records(&expected).unwrap();
        let data = wtr.into_inner().unwrap();

        let mut rdr = ReaderBuilder::new()
            .encoding(enc(label))
            .dict_from_reader(&data[..]);
        assert_eq!(rdr.fieldnames().unwrap(), &fieldnames[..]);
        let got: Vec<HashMap<String, String>> = rdr
            .records()
            .map(|r| r.map(HashMap::from))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(got, expected, "encoding {}", label);
    }
}

#[test]
fn utf8_writer_matches_csv_writer() {
    let mut ours = Writer::from_writer(vec![]);
    ours.write_records(&rows()).unwrap();

    let mut theirs = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(vec![]);
    for row in rows() {
        theirs.write_record(row.iter().map(|f| f.as_bytes())).unwrap();
    }
    assert_eq!(ours.into_inner().unwrap(), theirs.into_inner().unwrap());
}

#[test]
fn utf8_reader_matches_csv_reader() {
    let data = write_all("utf-8", Dialect::excel());
    let ours: Vec<Vec<String>> = Reader::from_reader(&data[..])
        .into_records()
        .collect::<Result<_, _>>()
        .unwrap();
    let theirs: Vec<Vec<String>> = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(&data[..])
        .into_records()
        .map(|r| r.map(|r| r.iter().map(String::from).collect()))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(ours, theirs);
}

#[test]
fn write_records_is_repeated_write_record() {
    let mut one = WriterBuilder::new()
        .encoding(enc("utf-16"))
        .from_writer(vec![]);
    for row in rows() {
        one.write_record(&row).unwrap();
    }
    assert_eq!(one.into_inner().unwrap(), write_all("utf-16", Dialect::excel()));
}

#[test]
fn utf16_lines() {
    let mut data = vec![];
    for line in &["a,b\r\n", "c,d\r\n"] {
        for unit in line.encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
    }
    let mut with_bom = vec![0xFF, 0xFE];
    with_bom.extend_from_slice(&data);

    for data in &[data, with_bom] {
        let got = read_all("utf-16", Dialect::excel(), data);
        assert_eq!(got, vec![vec!["a", "b"], vec!["c", "d"]]);
    }
}

#[test]
fn latin1_dict_writer() {
    let mut wtr = WriterBuilder::new()
        .encoding(enc("latin-1"))
        .dict_from_writer(vec!["name", "city"], vec![]);
    let mut row = HashMap::new();
    row.insert("name", "José");
    row.insert("city", "São Paulo");
    wtr.write_record(&row).unwrap();
    let data = wtr.into_inner().unwrap();
    assert_eq!(data, b"Jos\xE9,S\xE3o Paulo\r\n");

    let text: String = data.iter().map(|&b| char::from(b)).collect();
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(text.as_bytes());
    let record = rdr.records().next().unwrap().unwrap();
    let got: HashMap<&str, &str> =
        vec!["name", "city"].into_iter().zip(record.iter()).collect();
    let want: HashMap<&str, &str> = row.into_iter().collect();
    assert_eq!(got, want);
}

#[test]
fn latin1_is_iso_8859_1() {
    let mut wtr = WriterBuilder::new()
        .encoding(enc("latin-1"))
        .from_writer(vec![]);
    let err = wtr.write_record(&["5 €"]).unwrap_err();
    match err.into_kind() {
        ErrorKind::Encode(err) => {
            assert_eq!(err.character(), '€');
            assert_eq!(err.encoding(), "ISO-8859-1");
        }
        kind => panic!("expected encode error, got {:?}", kind),
    }
    wtr.write_record(&["\u{85}"]).unwrap();
    assert_eq!(wtr.into_inner().unwrap(), b"\x85\r\n");

    let got = read_all("latin-1", Dialect::excel(), b"\x80,\x9F\n");
    assert_eq!(got, vec![vec!["\u{80}", "\u{9F}"]]);

    let got = read_all("windows-1252", Dialect::excel(), b"\x80\n");
    assert_eq!(got, vec![vec!["€"]]);
}

#[test]
fn decode_failure_yields_no_partial_row() {
    // "a,b" then "c,<invalid>" in UTF-16LE: a lone low surrogate.
    let mut data = vec![];
    for unit in "a,b\r\nc,".encode_utf16() {
        data.extend_from_slice(&unit.to_le_bytes());
    }
    data.extend_from_slice(&[0x00, 0xDC]);
    for unit in "d\r\n".encode_utf16() {
        data.extend_from_slice(&unit.to_le_bytes());
    }

    let mut rdr = ReaderBuilder::new()
        .encoding(enc("utf-16le"))
        .from_reader(&data[..]);
    let results: Vec<_> = rdr.records().collect();
    assert_eq!(results.len(), 2);
    assert_eq!(*results[0].as_ref().unwrap(), vec!["a", "b"]);
    let err = results[1].as_ref().unwrap_err();
    match *err.kind() {
        ErrorKind::Decode(ref err) => {
            assert_eq!(err.encoding(), "UTF-16LE");
            assert_eq!(err.bytes(), b"\x00\xDC");
        }
        ref kind => panic!("expected decode error, got {:?}", kind),
    }
}

#[test]
fn encode_failure_keeps_flushed_rows() {
    let mut wtr = WriterBuilder::new()
        .encoding(enc("latin1"))
        .dict_from_writer(vec!["k"], vec![]);
    wtr.write_record(vec![("k", "fine")]).unwrap();
    let err = wtr.write_record(vec![("k", "日本")]).unwrap_err();
    assert!(err.is_encode_error());
    wtr.write_record(vec![("k", "après")]).unwrap();
    assert_eq!(wtr.into_inner().unwrap(), b"fine\r\napr\xE8s\r\n");
}

#[test]
fn shift_jis_header_round_trip() {
    let mut wtr = WriterBuilder::new()
        .encoding(enc("shift_jis"))
        .dict_from_writer(vec!["名前", "年齢"], vec![]);
    wtr.write_header().unwrap();
    wtr.write_record(vec![("名前", "太郎"), ("年齢", "20")]).unwrap();
    let data = wtr.into_inner().unwrap();

    let mut rdr = ReaderBuilder::new()
        .encoding(enc("sjis"))
        .dict_from_reader(&data[..]);
    let row = rdr.records().next().unwrap().unwrap();
    assert_eq!(row.get("名前"), Some("太郎"));
    assert_eq!(row.get("年齢"), Some("20"));
}

#[test]
fn unknown_encoding() {
    let err = "no-such-codec".parse::<Encoding>().unwrap_err();
    match err.into_kind() {
        ErrorKind::UnknownEncoding(name) => assert_eq!(name, "no-such-codec"),
        kind => panic!("expected unknown encoding, got {:?}", kind),
    }
}

#[test]
fn introspection() {
    let wtr = DictWriter::from_writer(vec!["a"], vec![]);
    assert!(wtr.encoding().is_utf8());
    assert_eq!(wtr.dialect().get_delimiter(), b',');

    let rdr = DictReader::from_reader(&b"a\n1\n"[..]);
    assert!(rdr.encoding().is_utf8());
    assert_eq!(rdr.dialect().get_quote(), b'"');
}

#[cfg(feature = "serde")]
mod serde_tests {
    use serde::{Deserialize, Serialize};

    use super::enc;
    use ucsv::{ReaderBuilder, WriterBuilder};

    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    struct City {
        name: String,
        population: u64,
    }

    #[test]
    fn serialize_then_deserialize() {
        let cities = vec![
            City { name: "São Paulo".to_string(), population: 12_330_000 },
            City { name: "Zürich".to_string(), population: 421_878 },
        ];
        for label in &["utf-8", "utf-16", "latin-1"] {
            let mut wtr =
                WriterBuilder::new().encoding(enc(label)).from_writer(vec![]);
            for city in &cities {
                wtr.serialize(city).unwrap();
            }
            let data = wtr.into_inner().unwrap();

            let mut rdr = ReaderBuilder::new()
                .encoding(enc(label))
                .has_headers(true)
                .from_reader(&data[..]);
            let got: Vec<City> =
                rdr.deserialize().collect::<Result<_, _>>().unwrap();
            assert_eq!(got, cities, "encoding {}", label);

            let mut rdr = ReaderBuilder::new()
                .encoding(enc(label))
                .dict_from_reader(&data[..]);
            let got: Vec<City> =
                rdr.deserialize().collect::<Result<_, _>>().unwrap();
            assert_eq!(got, cities, "encoding {}", label);
        }
    }
}

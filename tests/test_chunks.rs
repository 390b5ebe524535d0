use std::io::{self, BufRead, Read};

use ucsv::{Encoding, ReaderBuilder, Recoder};

/// A source that hands out its data in fixed, uneven chunk sizes, cycling
/// through `sizes`.
#[derive(Debug)]
struct ChunkReader<'a> {
    data: &'a [u8],
    sizes: &'a [usize],
    next: usize,
}

impl<'a> ChunkReader<'a> {
    fn new(data: &'a [u8], sizes: &'a [usize]) -> ChunkReader<'a> {
        ChunkReader { data, sizes, next: 0 }
    }
}

impl<'a> Read for ChunkReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let size = self.sizes[self.next % self.sizes.len()];
        self.next += 1;
        let n = size.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

const TEXT: &str = "col_a,col_b\r\n\
                    0ääää,0🦀🦀\r\n\
                    1日本,\"1,ß\"\r\n\
                    2€€€€,2ÿ\r\n";

fn encode(label: &str) -> Vec<u8> {
    let mut wtr = ucsv::WriterBuilder::new()
        .encoding(Encoding::for_label(label).unwrap())
        .from_writer(vec![]);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(TEXT.as_bytes());
    for record in rdr.records() {
        wtr.write_record(&record.unwrap()).unwrap();
    }
    wtr.into_inner().unwrap()
}

#[test]
fn recoder_chunks() {
    for label in &["utf-16", "utf-16be", "gb18030", "utf-8-sig"] {
        let data = encode(label);
        for sizes in &[&[1][..], &[3, 1, 2], &[7, 5], &[64]] {
            let src = ChunkReader::new(&data, sizes);
            let mut recoder = Recoder::with_capacity(
                4,
                src,
                Encoding::for_label(label).unwrap(),
                Encoding::utf8(),
            );
            let mut got = String::new();
            recoder.read_to_string(&mut got).unwrap();
            assert_eq!(got, TEXT, "{} in chunks {:?}", label, sizes);
        }
    }
}

#[test]
fn recoder_lines_in_chunks() {
    let data = encode("utf-16");
    let src = ChunkReader::new(&data, &[1, 2, 3]);
    let recoder = Recoder::new(
        src,
        Encoding::for_label("utf-16").unwrap(),
        Encoding::utf8(),
    );
    let lines: Vec<String> =
        recoder.lines().collect::<Result<_, _>>().unwrap();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[2], "1日本,\"1,ß\"");
}

#[test]
fn reader_chunks() {
    let expected: Vec<Vec<String>> = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(TEXT.as_bytes())
        .into_records()
        .map(|r| r.map(|r| r.iter().map(String::from).collect()))
        .collect::<Result<_, _>>()
        .unwrap();

    for label in &["utf-8", "utf-16", "gb18030"] {
        let data = encode(label);
        let src = ChunkReader::new(&data, &[2, 1, 5]);
        let got: Vec<Vec<String>> = ReaderBuilder::new()
            .encoding(Encoding::for_label(label).unwrap())
            .buffer_capacity(3)
            .from_reader(src)
            .into_records()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(got, expected, "encoding {}", label);
    }
}

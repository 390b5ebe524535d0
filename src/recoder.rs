use std::fmt;
use std::io::{self, BufRead};

use crate::encoding::{Decoder, Encoder, Encoding};
use crate::error::{DecodeError, EncodeError};

const DEFAULT_BUF_SIZE: usize = 8 * (1 << 10);

/// A reader that decodes bytes from one encoding and re-encodes them into
/// another.
///
/// A recoder is a single forward pass over its source. Each call to
/// `fill_buf` produces the next chunk of re-encoded bytes, and an empty
/// chunk once the source is exhausted. Multi-byte sequences that are split
/// across reads of the source are handled by the streaming decoder.
///
/// When the input and output encodings are the same, the source bytes are
/// passed through untouched and no decoding is done at all.
///
/// # Errors
///
/// Bytes that are malformed in the input encoding cause an `io::Error` of
/// kind `InvalidData` wrapping a [`DecodeError`](struct.DecodeError.html).
/// All output preceding the malformed bytes is produced first. From then
/// on, every read fails with the same error; the recoder never reports a
/// clean end of input after a failure. Characters that the output encoding
/// cannot represent fail the same way with an
/// [`EncodeError`](struct.EncodeError.html).
///
/// # Example
///
/// ```
/// use std::io::Read;
/// use ucsv::{Encoding, Recoder};
///
/// let latin1: &[u8] = b"Jos\xE9,S\xE3o Paulo\n";
/// let mut rdr = Recoder::new(
///     latin1,
///     Encoding::for_label("latin-1")?,
///     Encoding::utf8(),
/// );
/// let mut utf8 = String::new();
/// rdr.read_to_string(&mut utf8)?;
/// assert_eq!(utf8, "José,São Paulo\n");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Recoder<R> {
    rdr: R,
    input: Encoding,
    output: Encoding,
    codec: Option<Codec>,
    inbuf: Box<[u8]>,
    inpos: usize,
    inlen: usize,
    outbuf: Vec<u8>,
    outpos: usize,
    /// The number of source bytes handed to the decoder so far.
    offset: u64,
    eof: bool,
    done: bool,
    failed: Option<Failure>,
}

struct Codec {
    decoder: Decoder,
    encoder: Encoder,
    text: String,
}

#[derive(Clone)]
enum Failure {
    Decode(DecodeError),
    Encode(EncodeError),
}

impl Failure {
    fn to_io_error(&self) -> io::Error {
        match *self {
            Failure::Decode(ref err) => err.clone().into(),
            Failure::Encode(ref err) => err.clone().into(),
        }
    }
}

impl<R: io::Read> Recoder<R> {
    /// Create a recoder that reads `input` encoded bytes from `rdr` and
    /// produces `output` encoded bytes.
    pub fn new(rdr: R, input: Encoding, output: Encoding) -> Recoder<R> {
        Recoder::with_capacity(DEFAULT_BUF_SIZE, rdr, input, output)
    }

    /// Create a recoder whose reads of the source are at most `capacity`
    /// bytes.
    pub fn with_capacity(
        capacity: usize,
        rdr: R,
        input: Encoding,
        output: Encoding,
    ) -> Recoder<R> {
        let capacity = capacity.max(1);
        let codec = if input == output {
            tracing::debug!(encoding = input.name(), "recoder passthrough");
            None
        } else {
            tracing::debug!(
                input = input.name(),
                output = output.name(),
                "recoder transcoding"
            );
            Some(Codec {
                decoder: input.new_decoder(),
                encoder: output.new_encoder(),
                text: String::new(),
            })
        };
        Recoder {
            rdr,
            input,
            output,
            codec,
            inbuf: vec![0; capacity].into_boxed_slice(),
            inpos: 0,
            inlen: 0,
            outbuf: Vec::with_capacity(capacity),
            outpos: 0,
            offset: 0,
            eof: false,
            done: false,
            failed: None,
        }
    }

    /// Returns true if this recoder copies its source unchanged.
    pub fn is_passthrough(&self) -> bool {
        self.codec.is_none()
    }

    /// The encoding of the source.
    pub fn input_encoding(&self) -> Encoding {
        self.input
    }

    /// The encoding of the bytes this recoder produces.
    pub fn output_encoding(&self) -> Encoding {
        self.output
    }

    /// Return a reference to the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.rdr
    }

    /// Unwrap this recoder, returning the underlying source.
    ///
    /// Any source bytes that were read but not yet produced are lost.
    pub fn into_inner(self) -> R {
        self.rdr
    }

    /// Refill `outbuf` with the next chunk of re-encoded bytes. On return,
    /// `outbuf` is empty only at the end of input.
    fn fill_transcoded(&mut self) -> io::Result<()> {
        loop {
            if let Some(ref failure) = self.failed {
                return Err(failure.to_io_error());
            }
            if self.done {
                return Ok(());
            }
            if self.inpos == self.inlen && !self.eof {
                let n = read_source(&mut self.rdr, &mut self.inbuf)?;
                self.inpos = 0;
                self.inlen = n;
                self.eof = n == 0;
            }
            let last = self.eof;
            let codec = match self.codec {
                Some(ref mut codec) => codec,
                None => unreachable!("transcoding without a codec"),
            };
            let src = &self.inbuf[self.inpos..self.inlen];
            codec.text.clear();
            match codec.decoder.decode(src, &mut codec.text, last, self.offset)
            {
                Ok(read) => {
                    self.inpos += read;
                    self.offset += read as u64;
                    if last {
                        self.done = true;
                    }
                }
                Err(err) => {
                    // Keep the valid text that precedes the malformed bytes
                    // and fail on the next read.
                    self.failed = Some(Failure::Decode(err));
                }
            }
            if let Err(err) =
                codec.encoder.encode(&codec.text, &mut self.outbuf, last)
            {
                self.outbuf.clear();
                if self.failed.is_none() {
                    self.failed = Some(Failure::Encode(err));
                }
            }
            if !self.outbuf.is_empty() {
                tracing::trace!(
                    offset = self.offset,
                    len = self.outbuf.len(),
                    "recoded chunk"
                );
                return Ok(());
            }
        }
    }
}

fn read_source<R: io::Read>(rdr: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match rdr.read(buf) {
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
            res => return res,
        }
    }
}

impl<R: io::Read> io::Read for Recoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = {
            let chunk = self.fill_buf()?;
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            n
        };
        self.consume(n);
        Ok(n)
    }
}

impl<R: io::Read> io::BufRead for Recoder<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.outpos >= self.outbuf.len() {
            self.outbuf.clear();
            self.outpos = 0;
            if self.codec.is_none() {
                let cap = self.inbuf.len();
                self.outbuf.resize(cap, 0);
                let n = match read_source(&mut self.rdr, &mut self.outbuf) {
                    Ok(n) => n,
                    Err(err) => {
                        self.outbuf.clear();
                        return Err(err);
                    }
                };
                self.outbuf.truncate(n);
                self.offset += n as u64;
            } else {
                self.fill_transcoded()?;
            }
        }
        Ok(&self.outbuf[self.outpos..])
    }

    fn consume(&mut self, amt: usize) {
        self.outpos = (self.outpos + amt).min(self.outbuf.len());
    }
}

impl<R: fmt::Debug> fmt::Debug for Recoder<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Recoder")
            .field("rdr", &self.rdr)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("offset", &self.offset)
            .field("buffered", &(self.outbuf.len() - self.outpos))
            .finish()
    }
}

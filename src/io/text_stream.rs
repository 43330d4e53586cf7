use crate::error::StreamError;
use crate::io::Stream;
use crate::memory::MemoryBlock;
use std::fmt;
use std::str::FromStr;

/// Text encodings a [`TextStream`] can decode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Ascii,
    /// ISO-8859-1; every byte maps to the code point of the same value.
    Latin1,
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Utf8 => "UTF-8",
            Self::Ascii => "ASCII",
            Self::Latin1 => "ISO-8859-1",
        })
    }
}

impl FromStr for TextEncoding {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_'))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "utf8" => Ok(Self::Utf8),
            "ascii" | "usascii" => Ok(Self::Ascii),
            "latin1" | "iso88591" => Ok(Self::Latin1),
            _ => Err(StreamError::UnsupportedEncoding(s.to_owned())),
        }
    }
}

/// Outcome of decoding the longest valid prefix of a byte slice.
enum Decoded {
    /// The first `n` bytes are already valid UTF-8 and can be handed out as is.
    Verbatim(usize),
    /// The prefix had to be transcoded.
    Transcoded(String),
}

/// Decode as much of `bytes` as possible.
///
/// Returns the decoded output and the number of input bytes it covers; the
/// rest is an incomplete trailing sequence to be completed by the next chunk.
/// `Err` carries the index of the first invalid byte.
fn decode_prefix(encoding: TextEncoding, bytes: &[u8]) -> Result<(Decoded, usize), usize> {
    match encoding {
        TextEncoding::Utf8 => match std::str::from_utf8(bytes) {
            Ok(_) => Ok((Decoded::Verbatim(bytes.len()), bytes.len())),
            Err(e) if e.error_len().is_none() => {
                Ok((Decoded::Verbatim(e.valid_up_to()), e.valid_up_to()))
            }
            Err(e) => Err(e.valid_up_to()),
        },
        TextEncoding::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
            None => Ok((Decoded::Verbatim(bytes.len()), bytes.len())),
            Some(i) => Err(i),
        },
        TextEncoding::Latin1 => {
            if bytes.is_ascii() {
                Ok((Decoded::Verbatim(bytes.len()), bytes.len()))
            } else {
                let s = bytes.iter().copied().map(char::from).collect();
                Ok((Decoded::Transcoded(s), bytes.len()))
            }
        }
    }
}

/// Decodes the chunks of an inner stream into validated UTF-8 text.
///
/// Every chunk returned holds whole characters only; a multi-byte sequence
/// split across inner chunks is carried over and emitted with the next one.
/// Input is decoded in pieces of at most `chunk_size` bytes.
pub struct TextStream {
    inner: Box<dyn Stream>,
    encoding: TextEncoding,
    chunk_size: usize,
    pending: MemoryBlock,
    carry: Vec<u8>,
    // Stream offset of the first byte not yet emitted.
    offset: u64,
}

impl TextStream {
    pub fn new(inner: Box<dyn Stream>, encoding: TextEncoding, chunk_size: usize) -> Self {
        Self {
            inner,
            encoding,
            chunk_size: chunk_size.max(1),
            pending: MemoryBlock::empty(),
            carry: Vec::new(),
            offset: 0,
        }
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Read the next decoded chunk as a `String`.
    ///
    /// # Errors
    /// Same as [`Stream::read_chunk`].
    pub fn read_text(&mut self) -> Result<Option<String>, StreamError> {
        let Some(chunk) = self.read_chunk()? else {
            return Ok(None);
        };
        // Every emitted chunk is valid UTF-8.
        String::from_utf8(chunk.to_vec())
            .map(Some)
            .map_err(|_| self.decode_error(0))
    }

    fn decode_error(&self, index: usize) -> StreamError {
        StreamError::Decode {
            encoding: self.encoding,
            offset: self.offset + index as u64,
        }
    }
}

impl Stream for TextStream {
    fn read_chunk(&mut self) -> Result<Option<MemoryBlock>, StreamError> {
        loop {
            if self.pending.is_empty() {
                if let Some(chunk) = self.inner.read_chunk()? {
                    self.pending = chunk;
                    continue;
                }

                if self.carry.is_empty() {
                    return Ok(None);
                }
                // The input ends in the middle of a character.
                let err = self.decode_error(0);
                self.carry.clear();
                return Err(err);
            }

            let take = self.chunk_size.min(self.pending.len());
            let (piece, rest) = self.pending.split_at(take);
            self.pending = rest;

            let (output, consumed) = if self.carry.is_empty() {
                let (decoded, consumed) =
                    decode_prefix(self.encoding, &piece).map_err(|i| self.decode_error(i))?;

                self.carry.extend_from_slice(&piece[consumed..]);

                let output = match decoded {
                    Decoded::Verbatim(n) => piece.slice(0..n),
                    Decoded::Transcoded(s) => MemoryBlock::from_vec(s.into_bytes()),
                };
                (output, consumed)
            } else {
                let mut buf = std::mem::take(&mut self.carry);
                buf.extend_from_slice(&piece);

                let (decoded, consumed) =
                    decode_prefix(self.encoding, &buf).map_err(|i| self.decode_error(i))?;

                self.carry = buf[consumed..].to_vec();

                let output = match decoded {
                    Decoded::Verbatim(n) => {
                        buf.truncate(n);
                        MemoryBlock::from_vec(buf)
                    }
                    Decoded::Transcoded(s) => MemoryBlock::from_vec(s.into_bytes()),
                };
                (output, consumed)
            };

            self.offset += consumed as u64;

            if !output.is_empty() {
                return Ok(Some(output));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryStream;

    fn text_stream(bytes: &[u8], inner_chunk: usize, chunk: usize, enc: TextEncoding) -> TextStream {
        let inner = MemoryStream::with_chunk_size(MemoryBlock::from_vec(bytes.to_vec()), inner_chunk);
        TextStream::new(Box::new(inner), enc, chunk)
    }

    fn read_all(s: &mut TextStream) -> Result<Vec<String>, StreamError> {
        let mut out = Vec::new();
        while let Some(t) = s.read_text()? {
            out.push(t);
        }
        Ok(out)
    }

    #[test]
    fn multibyte_characters_are_never_split() {
        let text = "héllo wörld ✓ 🦀";
        for inner_chunk in 1..6 {
            for chunk in 1..6 {
                let mut s = text_stream(text.as_bytes(), inner_chunk, chunk, TextEncoding::Utf8);
                let pieces = read_all(&mut s).unwrap();
                assert_eq!(pieces.concat(), text, "inner={inner_chunk} chunk={chunk}");
            }
        }
    }

    #[test]
    fn invalid_utf8_reports_offset() {
        let mut s = text_stream(b"ab\xffcd", 16, 16, TextEncoding::Utf8);
        let err = s.read_chunk().unwrap_err();
        assert!(matches!(
            err,
            StreamError::Decode {
                encoding: TextEncoding::Utf8,
                offset: 2
            }
        ));
    }

    #[test]
    fn truncated_utf8_at_end_fails() {
        // First two bytes of a three byte sequence.
        let mut s = text_stream(b"ok\xe2\x9c", 16, 16, TextEncoding::Utf8);
        assert_eq!(s.read_text().unwrap().as_deref(), Some("ok"));
        assert!(matches!(
            s.read_chunk(),
            Err(StreamError::Decode { offset: 2, .. })
        ));
    }

    #[test]
    fn latin1_is_transcoded() {
        let mut s = text_stream(b"caf\xe9", 2, 2, TextEncoding::Latin1);
        assert_eq!(read_all(&mut s).unwrap().concat(), "café");
    }

    #[test]
    fn ascii_rejects_high_bytes() {
        let mut s = text_stream(b"abc\x80", 16, 16, TextEncoding::Ascii);
        assert!(matches!(
            s.read_chunk(),
            Err(StreamError::Decode { offset: 3, .. })
        ));
    }

    #[test]
    fn encoding_names() {
        assert_eq!("utf-8".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8);
        assert_eq!("UTF8".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8);
        assert_eq!("US-ASCII".parse::<TextEncoding>().unwrap(), TextEncoding::Ascii);
        assert_eq!("ISO-8859-1".parse::<TextEncoding>().unwrap(), TextEncoding::Latin1);
        assert!(matches!(
            "ebcdic".parse::<TextEncoding>(),
            Err(StreamError::UnsupportedEncoding(name)) if name == "ebcdic"
        ));
    }
}

use tokio::io::{AsyncRead, AsyncReadExt};

use super::{DecodeError, RawSample};

/// Upper bound for a single buffered record.
pub const MAX_RECORD_LEN: usize = 1 << 20;

const READ_CHUNK: usize = 8 * 1024;

/// Incrementally decodes a never-ending byte stream of concatenated JSON stats records.
///
/// The decoder owns the underlying reader; dropping it releases the stream.
#[derive(Debug)]
pub struct StatsDecoder<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R> StatsDecoder<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(READ_CHUNK),
        }
    }

    /// Waits for the next complete record.
    ///
    /// Returns `Ok(None)` once the stream ended cleanly between two records.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] for a malformed or oversized record, for a stream that
    /// ends in the middle of a record, or if reading fails.
    pub async fn next_sample(&mut self) -> Result<Option<RawSample>, DecodeError> {
        loop {
            if let Some(sample) = self.try_decode()? {
                return Ok(Some(sample));
            }
            if self.buf.len() > MAX_RECORD_LEN {
                return Err(DecodeError::RecordTooLarge {
                    limit: MAX_RECORD_LEN,
                });
            }

            // never buffer more than one byte past the limit
            let room = READ_CHUNK.min(MAX_RECORD_LEN + 1 - self.buf.len());
            self.buf.reserve(room);
            let n = (&mut self.reader)
                .take(room as u64)
                .read_buf(&mut self.buf)
                .await?;
            if n == 0 {
                return match self.buf.len() {
                    0 => Ok(None),
                    pending => Err(DecodeError::Truncated { pending }),
                };
            }
        }
    }

    /// Decodes one record from the buffer, consuming it. `Ok(None)` means more bytes are needed.
    fn try_decode(&mut self) -> Result<Option<RawSample>, DecodeError> {
        let start = self
            .buf
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(self.buf.len());
        self.buf.drain(..start);
        if self.buf.is_empty() {
            return Ok(None);
        }

        let mut records = serde_json::Deserializer::from_slice(&self.buf).into_iter::<RawSample>();
        match records.next() {
            Some(Ok(sample)) => {
                let consumed = records.byte_offset();
                self.buf.drain(..consumed);
                Ok(Some(sample))
            }
            Some(Err(err)) if err.is_eof() => Ok(None),
            Some(Err(err)) => Err(DecodeError::Malformed(err)),
            None => Ok(None),
        }
    }
}

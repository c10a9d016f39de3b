//! CRC-32 accumulating output sink.

use std::io::Write;

use crc32fast::Hasher;

/// Wraps the output sink so that every byte written is also folded into a
/// running CRC-32.
///
/// Nothing else writes to the sink while an image is being assembled; the
/// accumulator therefore covers exactly the bytes physically written, in
/// order. The checksum itself is emitted by [`ChecksumWriter::finish`] and is
/// never folded into the accumulator.
pub struct ChecksumWriter<W: Write> {
    inner: W,
    hasher: Hasher,
    written: u64,
}

impl<W: Write> ChecksumWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
            written: 0,
        }
    }

    /// Append `bytes` to the sink and fold them into the checksum.
    ///
    /// The accumulator is updated before the physical write. A failed or short
    /// write is fatal for the whole image, so the caller never retries and the
    /// accumulator never has to be rolled back.
    pub fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.hasher.update(bytes);
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    /// Current accumulator value.
    pub fn checksum(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Number of bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Write the checksum as the trailing little-endian field, flush, and hand
    /// back the sink together with the checksum value.
    pub fn finish(mut self) -> std::io::Result<(W, u32)> {
        let checksum = self.hasher.finalize();
        self.inner.write_all(&checksum.to_le_bytes())?;
        self.inner.flush()?;
        Ok((self.inner, checksum))
    }
}

//! Fixed-size chunked reads over a bounded `BufReader`.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use telemflow_core::types::Chunk;

use crate::error::Result;

/// Reads a byte stream as chunks of at most `chunk_bytes` bytes.
pub struct ChunkReader<R: Read> {
    inner: BufReader<R>,
    chunk_bytes: usize,
    done: bool,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(reader: R, chunk_bytes: usize) -> Self {
        let chunk_bytes = chunk_bytes.max(1);
        Self {
            inner: BufReader::with_capacity(chunk_bytes, reader),
            chunk_bytes,
            done: false,
        }
    }

    /// Next non-empty chunk, or `None` at end of input.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.done {
            return Ok(None);
        }
        let mut buf = Vec::with_capacity(self.chunk_bytes);
        let read = (&mut self.inner)
            .take(self.chunk_bytes as u64)
            .read_to_end(&mut buf)?;
        if read == 0 {
            self.done = true;
            return Ok(None);
        }
        Ok(Some(Chunk::from(buf)))
    }
}

/// Convenience helper to open a chunked reader on a file path.
pub fn chunks_from_path<P: AsRef<Path>>(path: P, chunk_bytes: usize) -> Result<ChunkReader<File>> {
    let file = File::open(path)?;
    Ok(ChunkReader::new(file, chunk_bytes))
}

//! Seekable streams over the blocks of a file
//!
//! A [`BlockReader`] pulls decoded blocks from the engine strictly in order
//! and keeps the bytes not yet handed out in a buffer. Reads of any size are
//! served from that buffer; seeking forward discards bytes and seeking
//! backward restarts from the first block.
//!
//! ```text
//! Streaming { next_block } --(block_info reports ERROR_EXIST)--> Exhausted
//!          ^                                                         |
//!          +----------------------- rewind --------------------------+
//! ```

use crate::entry::FileEntry;
use crate::error::{Error, Result};
use crate::native::NativeEngine;
use bytes::{Buf, Bytes, BytesMut};
use mpq_native::{BlockField, Engine};
use std::io::{self, SeekFrom};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Blocks from `next_block` on have not been decoded yet
    Streaming { next_block: u32 },
    /// Every block has been decoded
    Exhausted,
}

impl State {
    const START: Self = Self::Streaming { next_block: 0 };
}

/// A seekable byte stream over one file
///
/// Invariant: `position` is the number of bytes handed to the caller since
/// the last rewind and `buffer` holds only bytes not handed out yet.
#[derive(Debug)]
pub struct BlockReader<'a, E: NativeEngine = Engine> {
    entry: &'a FileEntry<'a, E>,
    position: u64,
    buffer: BytesMut,
    state: State,
}

impl<'a, E: NativeEngine> BlockReader<'a, E> {
    pub(crate) fn new(entry: &'a FileEntry<'a, E>) -> Self {
        Self {
            entry,
            position: 0,
            buffer: BytesMut::new(),
            state: State::START,
        }
    }

    /// Current position
    pub fn tell(&self) -> u64 {
        self.position
    }

    /// Check if every block has been decoded
    ///
    /// Bytes of the last block may still be buffered.
    pub fn is_exhausted(&self) -> bool {
        self.state == State::Exhausted
    }

    /// The entry this stream reads
    pub fn entry(&self) -> &'a FileEntry<'a, E> {
        self.entry
    }

    /// Read up to `len` bytes
    ///
    /// Returns fewer bytes only at the end of the file.
    pub fn read_up_to(&mut self, len: usize) -> Result<Bytes> {
        self.fill(Some(len))?;
        Ok(self.take(len))
    }

    /// Read everything from the current position to the end
    pub fn read_remaining(&mut self) -> Result<Bytes> {
        self.fill(None)?;
        Ok(self.take(self.buffer.len()))
    }

    /// Move to a new position
    ///
    /// Forward targets are reached by decoding and discarding bytes, targets
    /// behind the current position restart from the first block. A target
    /// past the end stops at the end, which `tell` then reports.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => self.entry.info().unpacked_size.checked_add_signed(delta),
        }
        .ok_or_else(|| Error::InvalidArgument(format!("Seek to a negative position: {pos:?}")))?;
        self.entry.raw()?;

        if target < self.position {
            log::trace!("Rewinding file {} from {}", self.entry.index(), self.position);
            self.rewind();
        }
        self.discard(target - self.position)?;
        Ok(self.position)
    }

    fn rewind(&mut self) {
        self.position = 0;
        self.buffer.clear();
        self.state = State::START;
    }

    fn take(&mut self, len: usize) -> Bytes {
        let len = len.min(self.buffer.len());
        self.position += len as u64;
        self.buffer.split_to(len).freeze()
    }

    fn discard(&mut self, mut count: u64) -> Result<()> {
        while count > 0 {
            if self.buffer.is_empty() {
                self.fill(Some(1))?;
                if self.buffer.is_empty() {
                    break;
                }
            }
            let skip = count.min(self.buffer.len() as u64) as usize;
            self.buffer.advance(skip);
            self.position += skip as u64;
            count -= skip as u64;
        }
        Ok(())
    }

    /// Decode blocks until `want` bytes are buffered, or all of them for `None`
    fn fill(&mut self, want: Option<usize>) -> Result<()> {
        let (raw, index) = self.entry.raw()?;

        while want.is_none_or(|len| self.buffer.len() < len) {
            let State::Streaming { next_block } = self.state else {
                break;
            };

            let mut size = 0;
            match self.entry.call(|engine| {
                engine.block_info(raw, index, next_block, BlockField::UnpackedSize, &mut size)
            }) {
                Ok(_) => {}
                Err(Error::NotFound) => {
                    log::trace!("File {index}: end of stream after {next_block} blocks");
                    self.state = State::Exhausted;
                    break;
                }
                Err(e) => return Err(e),
            }

            let size = usize::try_from(size).map_err(|_| Error::OutOfMemory)?;
            let mut block = Vec::new();
            block
                .try_reserve_exact(size)
                .map_err(|_| Error::OutOfMemory)?;
            block.resize(size, 0);

            let mut transferred = 0;
            self.entry.call(|engine| {
                engine.block_read(raw, index, next_block, &mut block, &mut transferred)
            })?;
            block.truncate((transferred as usize).min(size));

            if self.buffer.is_empty() {
                self.buffer = BytesMut::from(Bytes::from(block));
            } else {
                self.buffer.extend_from_slice(&block);
            }

            log::trace!("File {index}: block {next_block} gave {transferred} bytes");
            self.state = State::Streaming {
                next_block: next_block + 1,
            };
        }
        Ok(())
    }
}

impl<E: NativeEngine> io::Read for BlockReader<'_, E> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.read_up_to(buf.len())?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

impl<E: NativeEngine> io::Seek for BlockReader<'_, E> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        BlockReader::seek(self, pos).map_err(io::Error::from)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position)
    }
}

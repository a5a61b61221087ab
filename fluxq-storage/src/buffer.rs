//! Cursor-addressed buffer over a memory-mapped file.

use crate::error::BufferError;
use memmap2::{MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

/// Longest string the length-prefixed codec can carry.
pub const MAX_STRING_LEN: usize = 127;

/// Chunk size for zero-extending a short backing file.
const ZERO_CHUNK: usize = 64 * 1024;

/// A fixed-capacity byte region backed by a mapped file.
///
/// All access goes through a cursor: each primitive checks that its width
/// fits between the cursor and the capacity, then advances the cursor.
/// Multi-byte integers are big-endian. The buffer performs no internal
/// locking; sharing one across threads is the caller's responsibility.
pub struct MappedBuf {
    map: MmapMut,
    pos: usize,
    capacity: usize,
    file: File,
}

impl MappedBuf {
    /// Opens (creating if needed) `path` and maps exactly `len` bytes.
    ///
    /// Parent directories are created. An existing longer file is
    /// truncated down; a shorter one is zero-extended with explicit
    /// writes so the whole region is allocated on disk. Each step fails
    /// with its own error variant and nothing is retried.
    pub fn open(path: impl AsRef<Path>, len: usize) -> Result<Self, BufferError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| BufferError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| BufferError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let size = file
            .metadata()
            .map_err(|source| BufferError::Stat {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        let want = len as u64;
        if size > want {
            file.set_len(want).map_err(|source| BufferError::Truncate {
                path: path.to_path_buf(),
                len: want,
                source,
            })?;
        }
        if size < want {
            zero_extend(&mut file, size, want).map_err(|source| BufferError::Extend {
                path: path.to_path_buf(),
                len: want,
                source,
            })?;
        }

        let map = unsafe { MmapOptions::new().len(len).map_mut(&file) }.map_err(|source| {
            BufferError::Map {
                path: path.to_path_buf(),
                source,
            }
        })?;

        Ok(Self {
            map,
            pos: 0,
            capacity: len,
            file,
        })
    }

    /// Moves the cursor. The position is validated by the next access,
    /// not here.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Current cursor position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn check(&self, width: usize) -> Result<(), BufferError> {
        // set_pos is unchecked, so the cursor may sit anywhere; guard the
        // addition as well as the bound.
        match self.pos.checked_add(width) {
            Some(end) if end <= self.capacity => Ok(()),
            _ => Err(BufferError::OutOfRange {
                pos: self.pos,
                width,
                capacity: self.capacity,
            }),
        }
    }

    pub fn get_u8(&mut self) -> Result<u8, BufferError> {
        self.check(1)?;
        let value = self.map[self.pos];
        self.pos += 1;
        Ok(value)
    }

    pub fn put_u8(&mut self, value: u8) -> Result<(), BufferError> {
        self.check(1)?;
        self.map[self.pos] = value;
        self.pos += 1;
        Ok(())
    }

    pub fn get_i16(&mut self) -> Result<i16, BufferError> {
        self.check(2)?;
        let value = i16::from_be_bytes(self.map[self.pos..self.pos + 2].try_into().unwrap());
        self.pos += 2;
        Ok(value)
    }

    pub fn put_i16(&mut self, value: i16) -> Result<(), BufferError> {
        self.check(2)?;
        self.map[self.pos..self.pos + 2].copy_from_slice(&value.to_be_bytes());
        self.pos += 2;
        Ok(())
    }

    pub fn get_i32(&mut self) -> Result<i32, BufferError> {
        self.check(4)?;
        let value = i32::from_be_bytes(self.map[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(value)
    }

    pub fn put_i32(&mut self, value: i32) -> Result<(), BufferError> {
        self.check(4)?;
        self.map[self.pos..self.pos + 4].copy_from_slice(&value.to_be_bytes());
        self.pos += 4;
        Ok(())
    }

    pub fn get_i64(&mut self) -> Result<i64, BufferError> {
        self.check(8)?;
        let value = i64::from_be_bytes(self.map[self.pos..self.pos + 8].try_into().unwrap());
        self.pos += 8;
        Ok(value)
    }

    pub fn put_i64(&mut self, value: i64) -> Result<(), BufferError> {
        self.check(8)?;
        self.map[self.pos..self.pos + 8].copy_from_slice(&value.to_be_bytes());
        self.pos += 8;
        Ok(())
    }

    /// Returns a view of the next `n` bytes and advances the cursor.
    ///
    /// The slice borrows the mapping directly rather than copying; copy
    /// it out if it must outlive later writes through this buffer.
    pub fn get_bytes(&mut self, n: usize) -> Result<&[u8], BufferError> {
        self.check(n)?;
        let value = &self.map[self.pos..self.pos + n];
        self.pos += n;
        Ok(value)
    }

    pub fn put_bytes(&mut self, value: &[u8]) -> Result<(), BufferError> {
        self.check(value.len())?;
        self.map[self.pos..self.pos + value.len()].copy_from_slice(value);
        self.pos += value.len();
        Ok(())
    }

    /// Reads a length-prefixed string: one length byte, then 0..=127
    /// data bytes. Fails without moving the cursor when the stored
    /// length exceeds the limit.
    pub fn get_string(&mut self) -> Result<String, BufferError> {
        self.check(1)?;
        let n = self.map[self.pos];
        if n as usize > MAX_STRING_LEN {
            return Err(BufferError::InvalidStringLength(n));
        }
        self.check(1 + n as usize)?;

        let start = self.pos + 1;
        let value = String::from_utf8_lossy(&self.map[start..start + n as usize]).into_owned();
        self.pos += 1 + n as usize;
        Ok(value)
    }

    /// Writes a length-prefixed string. Fails without moving the cursor
    /// when the string exceeds 127 bytes.
    pub fn put_string(&mut self, value: &str) -> Result<(), BufferError> {
        let n = value.len();
        if n > MAX_STRING_LEN {
            return Err(BufferError::StringTooLong(n));
        }
        self.check(1 + n)?;

        self.map[self.pos] = n as u8;
        self.map[self.pos + 1..self.pos + 1 + n].copy_from_slice(value.as_bytes());
        self.pos += 1 + n;
        Ok(())
    }

    /// Flushes dirty pages of the mapping to the backing file.
    pub fn flush(&self) -> Result<(), BufferError> {
        self.map.flush().map_err(BufferError::Flush)
    }

    /// Flushes the mapping and syncs the file before releasing both.
    ///
    /// When both steps fail, the mapping-flush failure is reported.
    pub fn close(self) -> Result<(), BufferError> {
        let flushed = self.map.flush().map_err(BufferError::Flush);
        let synced = self.file.sync_all().map_err(BufferError::Sync);
        flushed.and(synced)
    }
}

fn zero_extend(file: &mut File, from: u64, to: u64) -> std::io::Result<()> {
    file.seek(SeekFrom::Start(from))?;
    let zeros = [0u8; ZERO_CHUNK];
    let mut remaining = (to - from) as usize;
    while remaining > 0 {
        let n = remaining.min(ZERO_CHUNK);
        file.write_all(&zeros[..n])?;
        remaining -= n;
    }
    Ok(())
}

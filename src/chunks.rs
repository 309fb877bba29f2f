// Chunk reader: chunk headers and bounded chunk data reads over a seekable stream.

use crate::{cast, AiffError, AiffResult, ChunkId, Read, Seek, SeekFrom};

/// Checked add for stream positions.
#[inline(always)]
fn pos_add(lhs: u64, rhs: u64) -> AiffResult<u64> {
    lhs.checked_add(rhs).ok_or(AiffError::Malformed("chunk position"))
}

/// `ChunkStream` tracks the absolute position of a `Read+Seek` stream so that
/// chunks can find out whether the stream is still at their cursor.
pub struct ChunkStream<R> {
    /// The underlying reader.
    stream: R,
    /// The current position from the absolute position 0.
    current_pos: u64,
    /// Position of the FORM literal. `None` until the stream has been located.
    origin: Option<u64>,
}

impl<R: Read + Seek> ChunkStream<R> {
    pub fn new(stream: R) -> ChunkStream<R> {
        ChunkStream {
            stream,
            current_pos: 0,
            origin: None
        }
    }

    /// Returns the stream origin, querying the stream position on first use.
    pub fn locate(&mut self) -> AiffResult<u64> {
        if let Some(origin) = self.origin {
            return Ok(origin);
        }
        let origin = self.stream.stream_position()?;
        self.current_pos = origin;
        self.origin = Some(origin);
        Ok(origin)
    }

    /// Current absolute position.
    pub fn pos(&self) -> u64 {
        self.current_pos
    }

    /// Reads until `buf` is full or the stream ends.
    pub fn read_up_to(&mut self, buf: &mut [u8]) -> AiffResult<usize> {
        let count = crate::read_up_to(&mut self.stream, buf)?;
        self.current_pos = pos_add(self.current_pos,
            cast::usize_to_u64(count, AiffError::SizeTooLarge)?)?;
        Ok(count)
    }

    /// Seeks to the given absolute position. Does nothing if the stream is already there.
    pub fn seek_to(&mut self, pos: u64) -> AiffResult<()> {
        if pos != self.current_pos {
            self.current_pos = self.stream.seek(SeekFrom::Start(pos))?;
        }
        Ok(())
    }

    /// Seeks backwards by `count` bytes relative to the current position.
    pub fn rewind_by(&mut self, count: u64) -> AiffResult<()> {
        if count == 0 {
            return Ok(());
        }
        if count > self.current_pos {
            return Err(AiffError::Malformed("rewind position"));
        }
        let offset = cast::u64_to_i64(count, AiffError::Malformed("rewind position"))?;
        self.current_pos = self.stream.seek(SeekFrom::Current(-offset))?;
        Ok(())
    }

    /// Seeks back to the stream origin. Does nothing if the stream hasn't been located.
    pub fn reset(&mut self) -> AiffResult<()> {
        if let Some(origin) = self.origin {
            self.current_pos = self.stream.seek(SeekFrom::Start(origin))?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> R {
        self.stream
    }

    pub const fn get_ref(&self) -> &R {
        &self.stream
    }

    /// The tracked position isn't updated if the caller moves the stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.stream
    }
}

/// Chunk kinds the decoder dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// "COMM".
    Format,
    /// "SSND".
    SoundData,
    /// "COMT".
    Comments,
    /// Apple "basc".
    AppleLoop,
    /// Apple "cate".
    AppleCategory,
    /// Apple "CHAN", recognized but not decoded.
    ChannelLayout,
    /// Apple "trns", recognized but not decoded.
    Transients,
    /// Anything else.
    Unknown,
}

impl ChunkKind {
    pub fn from_id(id: ChunkId) -> ChunkKind {
        match id {
            crate::CHUNKID_COMM => ChunkKind::Format,
            crate::CHUNKID_SSND => ChunkKind::SoundData,
            crate::CHUNKID_COMT => ChunkKind::Comments,
            crate::CHUNKID_BASC => ChunkKind::AppleLoop,
            crate::CHUNKID_CATE => ChunkKind::AppleCategory,
            crate::CHUNKID_CHAN => ChunkKind::ChannelLayout,
            crate::CHUNKID_TRNS => ChunkKind::Transients,
            _ => ChunkKind::Unknown,
        }
    }
}

/// A chunk header and a cursor over its data.
///
/// Reads are bounded to `size` bytes. If the stream has been moved since the last read,
/// the stream is seeked back to the chunk cursor before reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: ChunkId,
    /// Declared data size, not including the pad byte of odd sized chunks.
    pub size: u32,
    /// Absolute position of the first data byte.
    pub start: u64,
    /// Cursor within the chunk data.
    pos: u32,
}

impl Chunk {
    pub fn new(id: ChunkId, size: u32, start: u64) -> Chunk {
        Chunk { id, size, start, pos: 0 }
    }

    pub fn kind(&self) -> ChunkKind {
        ChunkKind::from_id(self.id)
    }

    /// Data size rounded up to an even number of bytes.
    pub fn padded_size(&self) -> u64 {
        let size = u64::from(self.size);
        if crate::is_even_u32(self.size) { size } else { size + 1 }
    }

    /// Absolute position of the next chunk header.
    pub fn padded_end(&self) -> AiffResult<u64> {
        pos_add(self.start, self.padded_size())
    }

    /// Header and padded data size, the byte count a stream must go back to revisit the chunk.
    pub fn total_size(&self) -> u64 {
        8 + self.padded_size()
    }

    /// Number of unread data bytes.
    pub fn remaining(&self) -> u32 {
        self.size - self.pos
    }

    pub fn is_consumed(&self) -> bool {
        self.pos >= self.size
    }

    /// Returns the part of this chunk starting at `offset` bytes from the chunk data start.
    pub fn narrow(&self, offset: u32) -> AiffResult<Chunk> {
        if offset > self.size {
            return Err(AiffError::Malformed("chunk offset"));
        }
        Ok(Chunk {
            id: self.id,
            size: self.size - offset,
            start: pos_add(self.start, u64::from(offset))?,
            pos: 0
        })
    }

    /// Reads up to `buf.len()` bytes of chunk data. Returns 0 when the chunk is consumed
    /// or the stream has ended.
    pub fn read<R: Read + Seek>(&mut self, stream: &mut ChunkStream<R>, buf: &mut [u8])
        -> AiffResult<usize> {
        let len = buf.len().min(cast::u32_to_usize(self.remaining()));
        if len == 0 {
            return Ok(0);
        }
        stream.seek_to(pos_add(self.start, u64::from(self.pos))?)?;
        let count = stream.read_up_to(&mut buf[..len])?;
        // count <= remaining, so it fits in u32
        self.pos += u32::try_from(count).map_err(|_| AiffError::SizeTooLarge)?;
        Ok(count)
    }

    /// Reads exactly `buf.len()` bytes of chunk data. Reading past the declared size or
    /// the end of the stream returns `Truncated(what)`.
    pub fn read_exact<R: Read + Seek>(&mut self, stream: &mut ChunkStream<R>, buf: &mut [u8],
        what: &'static str) -> AiffResult<()> {
        if self.read(stream, buf)? != buf.len() {
            return Err(AiffError::Truncated(what));
        }
        Ok(())
    }

    /// Reads the remaining chunk data. Memory grows with the data actually read, not with
    /// the declared size.
    pub fn read_to_vec<R: Read + Seek>(&mut self, stream: &mut ChunkStream<R>,
        what: &'static str) -> AiffResult<Vec<u8>> {
        let mut data = Vec::new();
        let mut block = [0u8; 4096];
        while !self.is_consumed() {
            let count = self.read(stream, &mut block)?;
            if count == 0 {
                return Err(AiffError::Truncated(what));
            }
            data.extend_from_slice(&block[..count]);
        }
        Ok(data)
    }

    /// Skips the rest of the chunk and its pad byte.
    pub fn skip<R: Read + Seek>(&mut self, stream: &mut ChunkStream<R>) -> AiffResult<()> {
        stream.seek_to(self.padded_end()?)?;
        self.pos = self.size;
        Ok(())
    }
}

/// Reads the next chunk header at the current stream position.
///
/// Returns `None` if the stream ends exactly at the chunk boundary or the position
/// has reached `form_end`. A partial header is `Truncated`.
pub fn next_chunk<R: Read + Seek>(stream: &mut ChunkStream<R>, form_end: u64)
    -> AiffResult<Option<Chunk>> {
    if stream.pos() >= form_end {
        return Ok(None);
    }
    let mut header = [0u8; 8];
    match stream.read_up_to(&mut header)? {
        0 => Ok(None),
        8 => {
            let id = [ header[0], header[1], header[2], header[3] ];
            let size = u32::from_be_bytes([ header[4], header[5], header[6], header[7] ]);
            Ok(Some(Chunk::new(id, size, stream.pos())))
        },
        _ => Err(AiffError::Truncated("chunk header")),
    }
}

/// Reads the 12-byte FORM header and returns the form type and the absolute position
/// where the FORM data ends.
pub fn read_form_header<R: Read + Seek>(stream: &mut ChunkStream<R>)
    -> AiffResult<(ChunkId, u64)> {
    let origin = stream.locate()?;
    stream.seek_to(origin)?;
    let mut header = [0u8; 12];
    let count = stream.read_up_to(&mut header)?;
    if count < 4 || header[0..4] != crate::CHUNKID_FORM {
        return Err(AiffError::UnsupportedContainer([ header[0], header[1], header[2], header[3] ]));
    }
    if count < 12 {
        return Err(AiffError::Truncated("FORM header"));
    }
    let form_size = u32::from_be_bytes([ header[4], header[5], header[6], header[7] ]);
    let form_type = [ header[8], header[9], header[10], header[11] ];
    if form_type != crate::CHUNKID_AIFF && form_type != crate::CHUNKID_AIFC {
        return Err(AiffError::UnsupportedContainer(form_type));
    }
    Ok((form_type, pos_add(pos_add(origin, 8)?, u64::from(form_size))?))
}

/// Big-endian field readers for chunk data that has been read to memory.
/// Reading past the end of `data` is `Truncated(what)`.
pub fn read_array<const N: usize>(data: &[u8], pos: &mut usize, what: &'static str)
    -> AiffResult<[u8; N]> {
    let Some(pos_end) = pos.checked_add(N) else {
        return Err(AiffError::Truncated(what));
    };
    if pos_end > data.len() {
        return Err(AiffError::Truncated(what));
    }
    let mut buf = [0u8; N];
    buf.copy_from_slice(&data[*pos..pos_end]);
    *pos = pos_end;
    Ok(buf)
}

pub fn read_u16(data: &[u8], pos: &mut usize, what: &'static str) -> AiffResult<u16> {
    Ok(u16::from_be_bytes(read_array(data, pos, what)?))
}

pub fn read_i16(data: &[u8], pos: &mut usize, what: &'static str) -> AiffResult<i16> {
    Ok(i16::from_be_bytes(read_array(data, pos, what)?))
}

pub fn read_u32(data: &[u8], pos: &mut usize, what: &'static str) -> AiffResult<u32> {
    Ok(u32::from_be_bytes(read_array(data, pos, what)?))
}

/// Returns `len` bytes from `data` at `pos`.
pub fn read_bytes<'a>(data: &'a [u8], pos: &mut usize, len: usize, what: &'static str)
    -> AiffResult<&'a [u8]> {
    let Some(pos_end) = pos.checked_add(len) else {
        return Err(AiffError::Truncated(what));
    };
    if pos_end > data.len() {
        return Err(AiffError::Truncated(what));
    }
    let bytes = &data[*pos..pos_end];
    *pos = pos_end;
    Ok(bytes)
}

//! # AIFF and AIFF-C Audio Format Decoder and Encoder
//!
//! This crate contains [`Decoder`] and [`Encoder`] for the Audio Interchange File Formats
//! AIFF and AIFF-C. Integer PCM samples (8, 16, 24 and 32 bits, big-endian or
//! little-endian "sowt"), μ-law and A-law sample data are supported.
//!
//! These audio formats are made of chunks, which contain header data (the COMM chunk),
//! audio sample data (the SSND chunk) and other data, such as comments (the COMT chunk)
//! or Apple loop metadata (the "basc" and "cate" chunks).
//!
//! The decoder tolerates chunks in any order. If the COMM chunk comes after other chunks,
//! the stream is rewound so that every chunk is still visited once.
//!
//! # Examples
//!
//! Reading samples:
//!
//! ```no_run
//! # fn example() -> aiff::AiffResult<()> {
//! let stream = std::io::BufReader::new(std::fs::File::open("test.aiff")?);
//! let mut decoder = aiff::Decoder::new(stream);
//! let info = decoder.read_format_info()?;
//! println!("{} channels at {} Hz", info.channels, info.sample_rate);
//! let buffer = decoder.read_all_pcm()?;
//! println!("Got {} samples", buffer.data.len());
//! # Ok(())
//! # }
//! ```
//!
//! Writing mono 16-bit AIFF at 22050 Hz:
//!
//! ```no_run
//! # fn example() -> aiff::AiffResult<()> {
//! let stream = std::io::BufWriter::new(std::fs::File::create("test.aiff")?);
//! let mut encoder = aiff::Encoder::new(stream, 22050.0, 16, 1)?;
//! encoder.write_samples(&[ 0, 10, -10, 0 ])?;
//! encoder.close()?;
//! # Ok(())
//! # }
//! ```

#![forbid(
    unsafe_code,
    clippy::panic,
    clippy::exit,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unimplemented,
    clippy::todo,
    clippy::unreachable,
)]
#![deny(
    clippy::cast_ptr_alignment,
    clippy::char_lit_as_u8,
    clippy::unnecessary_cast,
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::checked_conversions,
)]

use std::io::{Read, Write, Seek, SeekFrom};

mod aiffresult;
mod buffer;
mod cast;
mod chunks;
mod decoder;
mod encoder;
mod f80;
mod metadata;
mod sample;

pub use aiffresult::{AiffResult, AiffError, Unsupported};
pub use buffer::{Format, IntBuffer};
pub use decoder::{Decoder, DecoderConfig, DecoderState, FormatInfo, PcmRead};
pub use encoder::{Encoder, EncodeInfo};
pub use metadata::AppleMetadata;
pub use sample::{ByteOrder, SampleCodec, SampleEncoding};

/// A chunk id is a four byte identifier.
///
/// Chunk ids are case-sensitive.
pub type ChunkId = [u8; 4];

const CHUNKID_FORM: ChunkId = *b"FORM";
const CHUNKID_AIFF: ChunkId = *b"AIFF";
const CHUNKID_AIFC: ChunkId = *b"AIFC";

/// The common (header) "COMM" chunk id.
pub const CHUNKID_COMM: ChunkId = *b"COMM";
/// The format version "FVER" chunk id, written to AIFF-C streams.
pub const CHUNKID_FVER: ChunkId = *b"FVER";
/// The sound data "SSND" chunk id.
pub const CHUNKID_SSND: ChunkId = *b"SSND";
/// The comments "COMT" chunk id.
pub const CHUNKID_COMT: ChunkId = *b"COMT";
/// Apple loop info "basc" chunk id (beats, key, scale, time signature).
pub const CHUNKID_BASC: ChunkId = *b"basc";
/// Apple category "cate" chunk id (tags).
pub const CHUNKID_CATE: ChunkId = *b"cate";
/// Apple CoreAudio channel layout "CHAN" chunk id.
pub const CHUNKID_CHAN: ChunkId = *b"CHAN";
/// Apple transients "trns" chunk id.
pub const CHUNKID_TRNS: ChunkId = *b"trns";

/// The AIFC version 1 timestamp written to the FVER chunk.
const AIFC_VERSION_1: u32 = 0xA280_5140;

const COMPRESSIONTYPE_NONE: ChunkId = *b"NONE";
const COMPRESSIONTYPE_TWOS: ChunkId = *b"twos";
const COMPRESSIONTYPE_SOWT: ChunkId = *b"sowt";
const COMPRESSIONTYPE_RAW: ChunkId = *b"raw ";
const COMPRESSIONTYPE_IN24: ChunkId = *b"in24";
const COMPRESSIONTYPE_IN32: ChunkId = *b"in32";
const COMPRESSIONTYPE_ULAW: ChunkId = *b"ulaw";
const COMPRESSIONTYPE_ULAW_UPPER: ChunkId = *b"ULAW";
const COMPRESSIONTYPE_ALAW: ChunkId = *b"alaw";
const COMPRESSIONTYPE_ALAW_UPPER: ChunkId = *b"ALAW";

/// File format: AIFF or AIFF-C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// AIFF.
    Aiff,
    /// AIFF-C.
    Aifc
}

impl FileFormat {
    /// The form type literal following the FORM size.
    fn form_type(self) -> ChunkId {
        match self {
            FileFormat::Aiff => CHUNKID_AIFF,
            FileFormat::Aifc => CHUNKID_AIFC,
        }
    }
}

/// Checks if the given data is the start of AIFF or AIFF-C.
///
/// Only the first 12 bytes are checked. If the data length is less than 12 bytes,
/// then the result is always None.
///
/// # Examples
///
/// ```
/// match aiff::recognize(b"This is not an AIFF or AIFF-C") {
///     Some(aiff::FileFormat::Aiff) => { println!("It's AIFF"); },
///     Some(aiff::FileFormat::Aifc) => { println!("It's AIFF-C"); },
///     None => { println!("Not AIFF or AIFF-C"); },
/// }
/// ```
pub fn recognize(data: &[u8]) -> Option<FileFormat> {
    if data.len() < 12 || data[0..4] != CHUNKID_FORM {
        return None;
    }
    match [ data[8], data[9], data[10], data[11] ] {
        CHUNKID_AIFF => Some(FileFormat::Aiff),
        CHUNKID_AIFC => Some(FileFormat::Aifc),
        _ => None
    }
}

/// CountingWrite counts the bytes written to the underlying Write object.
struct CountingWrite<W> where W: Write {
    pub handle: W,
    pub bytes_written: u64
}

impl<W: Write> CountingWrite<W> {
    pub fn new(handle: W) -> CountingWrite<W> {
        CountingWrite {
            handle,
            bytes_written: 0
        }
    }

    /// Overwrites bytes at the given absolute position without counting them and
    /// returns to the end of the written data.
    fn patch(&mut self, pos: u64, buf: &[u8], end: u64) -> AiffResult<()> where W: Seek {
        self.handle.seek(SeekFrom::Start(pos))?;
        self.handle.write_all(buf)?;
        self.handle.seek(SeekFrom::Start(end))?;
        Ok(())
    }
}

impl<W: Write> Write for CountingWrite<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, std::io::Error> {
        self.handle.write_all(buf)?;
        self.bytes_written += u64::try_from(buf.len())
            .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))?;
        Ok(buf.len())
    }
    fn flush(&mut self) -> Result<(), std::io::Error> {
        self.handle.flush()
    }
}

fn is_even_u32(value: u32) -> bool {
    value & 1 == 0
}

/// Reads until `buf` is full or the stream ends. Returns the number of bytes read.
fn read_up_to(stream: &mut dyn Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match stream.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {},
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognize() {
        assert_eq!(recognize(&[]), None);
        assert_eq!(recognize(b"FORM"), None);
        assert_eq!(recognize(b"FORM....AIFX"), None);
        assert_eq!(recognize(b"RIFF....AIFF"), None);
        assert_eq!(recognize(b"FORM....AIFF"), Some(FileFormat::Aiff));
        assert_eq!(recognize(b"FORM....AIFC"), Some(FileFormat::Aifc));
        assert_eq!(recognize(b"FORM....AIFFCOMM....blahblah.."), Some(FileFormat::Aiff));
    }

    #[test]
    fn test_read_up_to_stops_at_end() -> AiffResult<()> {
        let mut data: &[u8] = &[ 1, 2, 3 ];
        let mut buf = [0u8; 5];
        assert_eq!(read_up_to(&mut data, &mut buf)?, 3);
        assert_eq!(buf, [ 1, 2, 3, 0, 0 ]);
        assert_eq!(read_up_to(&mut data, &mut buf)?, 0);
        Ok(())
    }
}

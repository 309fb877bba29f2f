// Sample codec table: conversions between encoded sample bytes and integer samples.

use crate::{cast, AiffError, AiffResult, Unsupported};

/// Byte order of multi-byte samples.
///
/// AIFF samples are big-endian. AIFF-C streams with the "sowt" compression type
/// store little-endian samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Big-endian, the AIFF default.
    BigEndian,
    /// Little-endian ("sowt").
    LittleEndian,
}

/// How samples are stored in the SSND chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    /// Linear integer samples. 8-bit samples are unsigned, others are signed
    /// two's complement.
    Pcm { bit_depth: u16, byte_order: ByteOrder },
    /// μ-law companded samples, one byte per sample, decoded to the 16-bit range.
    Ulaw,
    /// A-law companded samples, one byte per sample, decoded to the 16-bit range.
    Alaw,
}

impl SampleEncoding {
    /// Big-endian integer samples of the given bit depth.
    pub const fn pcm(bit_depth: u16) -> SampleEncoding {
        SampleEncoding::Pcm { bit_depth, byte_order: ByteOrder::BigEndian }
    }

    /// The bits per sample value written to the COMM chunk.
    pub const fn bit_depth(&self) -> u16 {
        match self {
            SampleEncoding::Pcm { bit_depth, .. } => *bit_depth,
            SampleEncoding::Ulaw | SampleEncoding::Alaw => 16,
        }
    }
}

/// Decodes exactly `width` bytes to a sample.
pub type DecodeFn = fn(&[u8]) -> i32;
/// Encodes a sample to exactly `width` bytes.
pub type EncodeFn = fn(i32, &mut [u8]);

/// A pair of sample conversion functions selected for a sample encoding.
///
/// # Examples
///
/// ```
/// # fn example() -> aiff::AiffResult<()> {
/// let codec = aiff::SampleCodec::new(24, aiff::ByteOrder::BigEndian)?;
/// assert_eq!(codec.width(), 3);
/// assert_eq!(codec.decode(&[ 0xff, 0xff, 0xfe ]), -2);
/// let mut out = [0u8; 3];
/// codec.encode(-2, &mut out);
/// assert_eq!(out, [ 0xff, 0xff, 0xfe ]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy)]
pub struct SampleCodec {
    encoding: SampleEncoding,
    width: usize,
    decode: DecodeFn,
    encode: EncodeFn,
}

impl std::fmt::Debug for SampleCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleCodec")
            .field("encoding", &self.encoding)
            .field("width", &self.width)
            .finish()
    }
}

impl SampleCodec {
    /// Returns the codec for integer samples with the given bit depth and byte order.
    /// The bit depth must be 8, 16, 24 or 32.
    pub fn new(bit_depth: u16, byte_order: ByteOrder) -> AiffResult<SampleCodec> {
        let (width, decode, encode): (usize, DecodeFn, EncodeFn) = match (bit_depth, byte_order) {
            // 8-bit samples are unsigned, so byte order doesn't matter
            (8, _) => (1, decode_u8, encode_u8),
            (16, ByteOrder::BigEndian) => (2, decode_i16_be, encode_i16_be),
            (16, ByteOrder::LittleEndian) => (2, decode_i16_le, encode_i16_le),
            (24, ByteOrder::BigEndian) => (3, decode_i24_be, encode_i24_be),
            (24, ByteOrder::LittleEndian) => (3, decode_i24_le, encode_i24_le),
            (32, ByteOrder::BigEndian) => (4, decode_i32_be, encode_i32_be),
            (32, ByteOrder::LittleEndian) => (4, decode_i32_le, encode_i32_le),
            _ => {
                return Err(AiffError::UnsupportedFormat(Unsupported::BitDepth(bit_depth)));
            }
        };
        Ok(SampleCodec {
            encoding: SampleEncoding::Pcm { bit_depth, byte_order },
            width,
            decode,
            encode
        })
    }

    /// Returns the codec for the given sample encoding.
    pub fn for_encoding(encoding: SampleEncoding) -> AiffResult<SampleCodec> {
        match encoding {
            SampleEncoding::Pcm { bit_depth, byte_order } => SampleCodec::new(bit_depth, byte_order),
            SampleEncoding::Ulaw => Ok(SampleCodec {
                encoding, width: 1, decode: decode_ulaw, encode: encode_ulaw
            }),
            SampleEncoding::Alaw => Ok(SampleCodec {
                encoding, width: 1, decode: decode_alaw, encode: encode_alaw
            }),
        }
    }

    /// The encoding this codec converts.
    pub fn encoding(&self) -> SampleEncoding {
        self.encoding
    }

    /// Size of one encoded sample in bytes.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Decodes one sample. `bytes` must be exactly `width()` bytes long.
    #[inline(always)]
    pub fn decode(&self, bytes: &[u8]) -> i32 {
        (self.decode)(bytes)
    }

    /// Encodes one sample to `out`, which must be exactly `width()` bytes long.
    /// Bits that don't fit in the sample width are dropped.
    #[inline(always)]
    pub fn encode(&self, sample: i32, out: &mut [u8]) {
        (self.encode)(sample, out)
    }

    /// Decodes whole samples from `bytes` to `out` and returns the number of samples decoded.
    /// A partial sample at the end of `bytes` is ignored.
    pub fn decode_slice(&self, bytes: &[u8], out: &mut [i32]) -> usize {
        let mut count = 0;
        for (src, dst) in bytes.chunks_exact(self.width).zip(out.iter_mut()) {
            *dst = (self.decode)(src);
            count += 1;
        }
        count
    }

    /// Encodes `samples` and appends the bytes to `out`.
    pub fn encode_slice(&self, samples: &[i32], out: &mut Vec<u8>) {
        let start = out.len();
        out.resize(start + samples.len() * self.width, 0);
        for (sample, dst) in samples.iter().zip(out[start..].chunks_exact_mut(self.width)) {
            (self.encode)(*sample, dst);
        }
    }
}

fn decode_u8(b: &[u8]) -> i32 {
    i32::from(b[0])
}

fn encode_u8(v: i32, out: &mut [u8]) {
    out[0] = v.to_le_bytes()[0];
}

fn decode_i16_be(b: &[u8]) -> i32 {
    i32::from(i16::from_be_bytes([ b[0], b[1] ]))
}

fn decode_i16_le(b: &[u8]) -> i32 {
    i32::from(i16::from_le_bytes([ b[0], b[1] ]))
}

fn encode_i16_be(v: i32, out: &mut [u8]) {
    let b = v.to_be_bytes();
    out.copy_from_slice(&b[2..4]);
}

fn encode_i16_le(v: i32, out: &mut [u8]) {
    let b = v.to_le_bytes();
    out.copy_from_slice(&b[0..2]);
}

/// Sign extends a 24-bit value stored in the lowest bits of `v`.
#[inline(always)]
fn sign_extend_24(v: i32) -> i32 {
    if v >= 0x80_0000 { v - 0x100_0000 } else { v }
}

fn decode_i24_be(b: &[u8]) -> i32 {
    sign_extend_24(i32::from(b[0]) << 16 | i32::from(b[1]) << 8 | i32::from(b[2]))
}

fn decode_i24_le(b: &[u8]) -> i32 {
    sign_extend_24(i32::from(b[2]) << 16 | i32::from(b[1]) << 8 | i32::from(b[0]))
}

fn encode_i24_be(v: i32, out: &mut [u8]) {
    let b = v.to_be_bytes();
    out.copy_from_slice(&b[1..4]);
}

fn encode_i24_le(v: i32, out: &mut [u8]) {
    let b = v.to_le_bytes();
    out.copy_from_slice(&b[0..3]);
}

fn decode_i32_be(b: &[u8]) -> i32 {
    i32::from_be_bytes([ b[0], b[1], b[2], b[3] ])
}

fn decode_i32_le(b: &[u8]) -> i32 {
    i32::from_le_bytes([ b[0], b[1], b[2], b[3] ])
}

fn encode_i32_be(v: i32, out: &mut [u8]) {
    out.copy_from_slice(&v.to_be_bytes());
}

fn encode_i32_le(v: i32, out: &mut [u8]) {
    out.copy_from_slice(&v.to_le_bytes());
}

fn decode_ulaw(b: &[u8]) -> i32 {
    i32::from(audio_codec_algorithms::decode_ulaw(b[0]))
}

fn encode_ulaw(v: i32, out: &mut [u8]) {
    out[0] = audio_codec_algorithms::encode_ulaw(cast::clamp_i32_to_i16(v));
}

fn decode_alaw(b: &[u8]) -> i32 {
    i32::from(audio_codec_algorithms::decode_alaw(b[0]))
}

fn encode_alaw(v: i32, out: &mut [u8]) {
    out[0] = audio_codec_algorithms::encode_alaw(cast::clamp_i32_to_i16(v));
}

use crate::{cast, metadata, AiffError, AiffResult, ByteOrder, ChunkId, CountingWrite, FileFormat,
    IntBuffer, SampleCodec, SampleEncoding, Seek, Unsupported, Write};

/// Checked add for writing.
#[inline(always)]
fn wchecked_add(lhs: u64, rhs: u64) -> AiffResult<u64> {
    lhs.checked_add(rhs).ok_or(AiffError::SizeTooLarge)
}

/// Audio info for `Encoder`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeInfo {
    /// File format: AIFF or AIFF-C.
    pub file_format: FileFormat,

    /// Number of channels. This must be greater than zero.
    pub channels: u16,

    /// Sample rate, samples per second. This must be a positive finite number.
    pub sample_rate: f64,

    /// Sample encoding to be written. AIFF-C allows all encodings, but AIFF allows only
    /// big-endian integer samples.
    pub encoding: SampleEncoding,
}

impl Default for EncodeInfo {
    /// Default values: AIFF with 2 channels, sample rate 44100 and 16-bit big-endian samples.
    fn default() -> Self {
        EncodeInfo {
            file_format: FileFormat::Aiff,
            channels: 2,
            sample_rate: 44100.0,
            encoding: SampleEncoding::pcm(16),
        }
    }
}

/// AIFF / AIFF-C encoder.
///
/// `Encoder` writes the FORM header, the COMM chunk and the SSND chunk header to
/// the given stream implementing `Write+Seek` when it's created. Samples are appended
/// to the SSND chunk. [`close()`](Encoder::close) writes the comments and patches
/// the FORM size, the COMM frame count and the SSND size.
///
/// Samples are interleaved and not scaled: 8-bit samples are unsigned (0..=255) and
/// μ-law and A-law samples are in the 16-bit range.
///
/// # Examples
///
/// Writing stereo AIFF-C with little-endian samples:
///
/// ```no_run
/// # fn example() -> aiff::AiffResult<()> {
/// let info = aiff::EncodeInfo {
///     file_format: aiff::FileFormat::Aifc,
///     channels: 2,
///     sample_rate: 48000.0,
///     encoding: aiff::SampleEncoding::Pcm {
///         bit_depth: 16,
///         byte_order: aiff::ByteOrder::LittleEndian
///     },
/// };
/// let stream = std::io::BufWriter::new(std::fs::File::create("test.aifc")?);
/// let mut encoder = aiff::Encoder::with_info(stream, &info)?;
/// encoder.write_samples(&[ 0, 0, 10, 10, 20, 20, 30, 30 ])?;
/// encoder.add_comment("four frames");
/// encoder.close()?;
/// # Ok(())
/// # }
/// ```
pub struct Encoder<W> where W: Write + Seek {
    /// The underlying writer.
    handle: CountingWrite<W>,

    /// Info written to the stream.
    info: EncodeInfo,

    /// Set by `close()`.
    closed: bool,

    /// Sample data byte count written to the SSND chunk.
    pcm_bytes: u64,

    /// FORM start position relative to the start of the stream (absolute position).
    initial_stream_pos: u64,

    /// Position of the COMM frame count, relative to the FORM start position.
    comm_frames_pos: u64,

    /// Position of the SSND size, relative to the FORM start position.
    ssnd_size_pos: u64,

    /// Comments written to the COMT chunk by `close()`.
    comments: Vec<String>,

    /// Reusable buffer for encoded samples.
    scratch: Vec<u8>,
}

impl<W: Write + Seek> Encoder<W> {
    /// Creates a new AIFF `Encoder` for big-endian integer samples.
    ///
    /// The header is written immediately. The bit depth is checked when samples are
    /// written.
    pub fn new(stream: W, sample_rate: f64, bit_depth: u16, channels: u16)
        -> AiffResult<Encoder<W>> {
        let info = EncodeInfo {
            file_format: FileFormat::Aiff,
            channels,
            sample_rate,
            encoding: SampleEncoding::pcm(bit_depth),
        };
        Encoder::with_info(stream, &info)
    }

    /// Creates a new `Encoder` for the given audio info.
    ///
    /// The header is written immediately. AIFF with other than big-endian integer
    /// samples returns `UnsupportedFormat`.
    pub fn with_info(mut stream: W, info: &EncodeInfo) -> AiffResult<Encoder<W>> {
        let initial_stream_pos = stream.stream_position()?;
        let mut write = CountingWrite::new(stream);
        let (comm_frames_pos, ssnd_size_pos) = write_header(&mut write, info)?;
        Ok(Encoder {
            handle: write,
            info: info.clone(),
            closed: false,
            pcm_bytes: 0,
            initial_stream_pos,
            comm_frames_pos,
            ssnd_size_pos,
            comments: Vec::new(),
            scratch: Vec::new(),
        })
    }

    /// Encodes the samples of `buffer` and appends them to the SSND chunk.
    ///
    /// `buffer.format` and `buffer.source_bit_depth` aren't checked against
    /// the encoder info.
    pub fn write(&mut self, buffer: &IntBuffer) -> AiffResult<()> {
        self.write_samples(&buffer.data)
    }

    /// Encodes interleaved samples and appends them to the SSND chunk.
    ///
    /// Returns `UnsupportedFormat` if the bit depth has no codec and `InvalidWriteState`
    /// after `close()`. Nothing is written if an error is returned before writing starts.
    /// After a write error, the encoder is closed without patching the header.
    pub fn write_samples(&mut self, samples: &[i32]) -> AiffResult<()> {
        if self.closed {
            return Err(AiffError::InvalidWriteState);
        }
        let codec = SampleCodec::for_encoding(self.info.encoding)?;
        self.scratch.clear();
        codec.encode_slice(samples, &mut self.scratch);
        let len = cast::usize_to_u64(self.scratch.len(), AiffError::SizeTooLarge)?;
        let pcm_bytes = wchecked_add(self.pcm_bytes, len)?;
        // the SSND size includes the offset and block size fields
        if u32::try_from(wchecked_add(pcm_bytes, 8)?).is_err() {
            return Err(AiffError::SizeTooLarge);
        }
        if let Err(e) = self.handle.write_all(&self.scratch) {
            // an unknown number of sample bytes may have been written
            self.closed = true;
            return Err(e.into());
        }
        self.pcm_bytes = pcm_bytes;
        Ok(())
    }

    /// Adds a comment to be written to the COMT chunk when the encoder is closed.
    /// Comment text is limited to 255 bytes and there can be at most 65535 comments.
    /// Longer texts make `close()` return `SizeTooLarge`.
    pub fn add_comment(&mut self, text: &str) {
        self.comments.push(text.to_string());
    }

    /// Writes the pad byte of the SSND chunk and the COMT chunk, patches the FORM size,
    /// COMM frame count and SSND size and flushes the stream.
    ///
    /// Calling this again returns `InvalidWriteState`.
    pub fn close(&mut self) -> AiffResult<()> {
        if self.closed {
            return Err(AiffError::InvalidWriteState);
        }
        self.closed = true;
        if self.pcm_bytes & 1 == 1 {
            self.handle.write_all(&[ 0 ])?;
        }
        if !self.comments.is_empty() {
            let size = metadata::comments_size(&self.comments)?;
            self.handle.write_all(&crate::CHUNKID_COMT)?;
            self.handle.write_all(&size.to_be_bytes())?;
            metadata::write_comments(&mut self.handle, &self.comments)?;
            if !crate::is_even_u32(size) {
                self.handle.write_all(&[ 0 ])?;
            }
        }
        self.update_header()?;
        self.handle.flush()?;
        Ok(())
    }

    fn update_header(&mut self) -> AiffResult<()> {
        let stream_size = self.handle.bytes_written;
        let end = wchecked_add(self.initial_stream_pos, stream_size)?;

        // ensure that the FORM size fits in a 32-bit integer
        let form_size = u32::try_from(stream_size - 8).map_err(|_| AiffError::SizeTooLarge)?;
        let form_pos = wchecked_add(self.initial_stream_pos, 4)?;
        self.handle.patch(form_pos, &form_size.to_be_bytes(), end)?;

        let frames_pos = wchecked_add(self.initial_stream_pos, self.comm_frames_pos)?;
        self.handle.patch(frames_pos, &self.frame_count()?.to_be_bytes(), end)?;

        let ssnd_size = u32::try_from(wchecked_add(self.pcm_bytes, 8)?)
            .map_err(|_| AiffError::SizeTooLarge)?;
        let ssnd_pos = wchecked_add(self.initial_stream_pos, self.ssnd_size_pos)?;
        self.handle.patch(ssnd_pos, &ssnd_size.to_be_bytes(), end)?;
        Ok(())
    }

    /// Returns the number of sample frames for the COMM chunk.
    fn frame_count(&self) -> AiffResult<u32> {
        if self.pcm_bytes == 0 {
            return Ok(0);
        }
        let width = SampleCodec::for_encoding(self.info.encoding)?.width();
        let frame_size = cast::usize_to_u64(width, AiffError::SizeTooLarge)?
            .checked_mul(u64::from(self.info.channels))
            .ok_or(AiffError::SizeTooLarge)?;
        // divisions are rounded up so that partially written frames are included
        u32::try_from(self.pcm_bytes.div_ceil(frame_size)).map_err(|_| AiffError::SizeTooLarge)
    }

    /// Consumes this `Encoder` and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.handle.handle
    }

    /// Gets a reference to the underlying writer.
    pub const fn get_ref(&self) -> &W {
        &self.handle.handle
    }
}

/// Returns the COMM compression type for the given encoding.
fn compression_type(encoding: SampleEncoding) -> ChunkId {
    match encoding {
        SampleEncoding::Pcm { byte_order: ByteOrder::BigEndian, .. } => crate::COMPRESSIONTYPE_NONE,
        SampleEncoding::Pcm { byte_order: ByteOrder::LittleEndian, .. } => crate::COMPRESSIONTYPE_SOWT,
        SampleEncoding::Ulaw => crate::COMPRESSIONTYPE_ULAW,
        SampleEncoding::Alaw => crate::COMPRESSIONTYPE_ALAW,
    }
}

/// Writes the FORM header, the COMM chunk and the SSND chunk header.
/// Returns the positions of the COMM frame count and the SSND size.
fn write_header(write: &mut dyn Write, info: &EncodeInfo) -> AiffResult<(u64, u64)> {
    if info.channels < 1 {
        return Err(AiffError::Malformed("channel count"));
    }
    if !info.sample_rate.is_finite() || info.sample_rate <= 0.0 {
        return Err(AiffError::Malformed("sample rate"));
    }
    let bit_depth = info.encoding.bit_depth();
    let positions = match info.file_format {
        FileFormat::Aiff => {
            if info.encoding != SampleEncoding::pcm(bit_depth) {
                return Err(AiffError::UnsupportedFormat(
                    Unsupported::Compression(compression_type(info.encoding))));
            }
            write.write_all(&crate::CHUNKID_FORM)?;
            write.write_all(&46u32.to_be_bytes())?;
            write.write_all(&info.file_format.form_type())?;
            write.write_all(&crate::CHUNKID_COMM)?;
            write.write_all(&18u32.to_be_bytes())?;
            write.write_all(&info.channels.to_be_bytes())?;
            write.write_all(&[ 0, 0, 0, 0 ])?; // frames
            write.write_all(&bit_depth.to_be_bytes())?;
            write.write_all(&crate::f80::f64_to_f80(info.sample_rate))?;
            (22, 42)
        },
        FileFormat::Aifc => {
            write.write_all(&crate::CHUNKID_FORM)?;
            write.write_all(&64u32.to_be_bytes())?;
            write.write_all(&info.file_format.form_type())?;
            write.write_all(&crate::CHUNKID_FVER)?;
            write.write_all(&4u32.to_be_bytes())?;
            write.write_all(&crate::AIFC_VERSION_1.to_be_bytes())?;
            write.write_all(&crate::CHUNKID_COMM)?;
            write.write_all(&24u32.to_be_bytes())?;
            write.write_all(&info.channels.to_be_bytes())?;
            write.write_all(&[ 0, 0, 0, 0 ])?; // frames
            write.write_all(&bit_depth.to_be_bytes())?;
            write.write_all(&crate::f80::f64_to_f80(info.sample_rate))?;
            write.write_all(&compression_type(info.encoding))?;
            write.write_all(&[ 0, 0 ])?; // empty compression name and its pad byte
            (34, 60)
        },
    };
    write.write_all(&crate::CHUNKID_SSND)?;
    write.write_all(&8u32.to_be_bytes())?;
    write.write_all(&[ 0, 0, 0, 0, 0, 0, 0, 0 ])?; // offset and block size
    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_new_transferring_ownership() -> AiffResult<()> {
        let mut output = vec![];
        let cursor = Cursor::new(&mut output);
        let mut encoder = Encoder::new(cursor, 44100.0, 16, 2)?;
        encoder.close()?;
        assert_eq!(output.len(), 54);
        Ok(())
    }

    #[test]
    fn test_close_aiff() -> AiffResult<()> {
        let mut output = vec![];
        let mut wr = Cursor::new(&mut output);
        let mut encoder = Encoder::new(&mut wr, 44100.0, 8, 1)?;
        encoder.write_samples(&[ 10, 11, 12, 13 ])?;
        encoder.close()?;
        assert_eq!(encoder.get_ref().position(), 58);
        assert_eq!(output, &[ b'F', b'O', b'R', b'M', 0, 0, 0, 50, b'A', b'I', b'F', b'F',
            b'C', b'O', b'M', b'M', 0, 0, 0, 18,
            0, 1, 0, 0, 0, 4, 0, 8, 64, 14, 172, 68, 0, 0, 0, 0, 0, 0,
            b'S', b'S', b'N', b'D', 0, 0, 0, 12, 0, 0, 0, 0, 0, 0, 0, 0, 10, 11, 12, 13 ]);
        Ok(())
    }

    #[test]
    fn test_close_aifc() -> AiffResult<()> {
        let info = EncodeInfo {
            file_format: FileFormat::Aifc,
            channels: 1,
            sample_rate: 44100.0,
            encoding: SampleEncoding::pcm(8),
        };
        let mut output = vec![];
        let mut wr = Cursor::new(&mut output);
        let mut encoder = Encoder::with_info(&mut wr, &info)?;
        encoder.write_samples(&[ 10, 11, 12, 13 ])?;
        encoder.close()?;
        assert_eq!(encoder.get_ref().position(), 76);
        assert_eq!(output, &[ b'F', b'O', b'R', b'M', 0, 0, 0, 68, b'A', b'I', b'F', b'C',
            b'F', b'V', b'E', b'R', 0, 0, 0, 4, 162, 128, 81, 64,
            b'C', b'O', b'M', b'M', 0, 0, 0, 24,
            0, 1, 0, 0, 0, 4, 0, 8, 64, 14, 172, 68, 0, 0, 0, 0, 0, 0,
            b'N', b'O', b'N', b'E',
            0, 0,
            b'S', b'S', b'N', b'D', 0, 0, 0, 12, 0, 0, 0, 0, 0, 0, 0, 0, 10, 11, 12, 13 ]);
        Ok(())
    }

    #[test]
    fn test_compression_types() -> AiffResult<()> {
        for (encoding, compression, bits) in [
            (SampleEncoding::Pcm { bit_depth: 24, byte_order: ByteOrder::LittleEndian }, b"sowt", 24),
            (SampleEncoding::Ulaw, b"ulaw", 16),
            (SampleEncoding::Alaw, b"alaw", 16),
        ] {
            let info = EncodeInfo {
                file_format: FileFormat::Aifc,
                channels: 2,
                sample_rate: 8000.0,
                encoding,
            };
            let mut output = vec![];
            Encoder::with_info(Cursor::new(&mut output), &info)?.close()?;
            assert_eq!(output[38..40], u16::to_be_bytes(bits));
            assert_eq!(&output[50..54], compression);
        }
        Ok(())
    }

    #[test]
    fn test_aiff_allows_only_big_endian_pcm() {
        for encoding in [
            SampleEncoding::Pcm { bit_depth: 16, byte_order: ByteOrder::LittleEndian },
            SampleEncoding::Ulaw,
            SampleEncoding::Alaw,
        ] {
            let info = EncodeInfo { encoding, ..EncodeInfo::default() };
            assert!(matches!(Encoder::with_info(Cursor::new(vec![]), &info),
                Err(AiffError::UnsupportedFormat(Unsupported::Compression(_)))));
        }
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(Encoder::new(Cursor::new(vec![]), 44100.0, 16, 0),
            Err(AiffError::Malformed("channel count"))));
        assert!(matches!(Encoder::new(Cursor::new(vec![]), 0.0, 16, 1),
            Err(AiffError::Malformed("sample rate"))));
        assert!(matches!(Encoder::new(Cursor::new(vec![]), f64::NAN, 16, 1),
            Err(AiffError::Malformed("sample rate"))));
    }

    #[test]
    fn test_unsupported_bit_depth() -> AiffResult<()> {
        let mut encoder = Encoder::new(Cursor::new(vec![]), 44100.0, 12, 1)?;
        assert!(matches!(encoder.write_samples(&[ 1 ]),
            Err(AiffError::UnsupportedFormat(Unsupported::BitDepth(12)))));
        encoder.close()?;
        assert_eq!(encoder.into_inner().into_inner().len(), 54);
        Ok(())
    }

    #[test]
    fn test_write_after_close() -> AiffResult<()> {
        let mut encoder = Encoder::new(Cursor::new(vec![]), 44100.0, 16, 1)?;
        encoder.close()?;
        assert!(matches!(encoder.write_samples(&[ 1 ]), Err(AiffError::InvalidWriteState)));
        assert!(matches!(encoder.close(), Err(AiffError::InvalidWriteState)));
        Ok(())
    }

    #[test]
    fn test_odd_ssnd_and_comments() -> AiffResult<()> {
        let mut encoder = Encoder::new(Cursor::new(vec![]), 44100.0, 8, 1)?;
        encoder.write_samples(&[ 1, 2, 3 ])?;
        encoder.add_comment("hi");
        encoder.close()?;
        let output = encoder.into_inner().into_inner();
        // SSND data, pad byte, COMT chunk
        assert_eq!(output[42..46], u32::to_be_bytes(11));
        assert_eq!(output[54..58], [ 1, 2, 3, 0 ]);
        // odd sized COMT chunk with a pad byte
        assert_eq!(output[58..], [ b'C', b'O', b'M', b'T', 0, 0, 0, 13,
            0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 2, b'h', b'i', 0 ]);
        assert_eq!(output[4..8], u32::to_be_bytes(72));
        assert_eq!(output[22..26], u32::to_be_bytes(3));
        Ok(())
    }

    #[test]
    fn test_non_zero_initial_position() -> AiffResult<()> {
        let mut cursor = Cursor::new(vec![ 0xff; 3 ]);
        cursor.set_position(3);
        let mut encoder = Encoder::new(cursor, 44100.0, 16, 2)?;
        encoder.write_samples(&[ 1, 2, 3, 4 ])?;
        encoder.close()?;
        let output = encoder.into_inner().into_inner();
        assert_eq!(output[0..7], [ 0xff, 0xff, 0xff, b'F', b'O', b'R', b'M' ]);
        assert_eq!(output[7..11], u32::to_be_bytes(54));
        assert_eq!(output[25..29], u32::to_be_bytes(2));
        assert_eq!(output[45..49], u32::to_be_bytes(16));
        Ok(())
    }

    /// Writer which fails when more than `limit` bytes would be in the stream.
    struct LimitedWrite {
        inner: Cursor<Vec<u8>>,
        limit: u64,
    }

    impl Write for LimitedWrite {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let room = self.limit.saturating_sub(self.inner.position());
            if room == 0 {
                return Err(std::io::Error::new(std::io::ErrorKind::WriteZero, "full"));
            }
            let len = buf.len().min(usize::try_from(room).unwrap_or(usize::MAX));
            self.inner.write(&buf[..len])
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Seek for LimitedWrite {
        fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_write_error_closes_encoder() -> AiffResult<()> {
        let stream = LimitedWrite { inner: Cursor::new(vec![]), limit: 58 };
        let mut encoder = Encoder::new(stream, 44100.0, 16, 1)?;
        assert!(matches!(encoder.write_samples(&[ 1, 2, 3, 4 ]), Err(AiffError::Io(_))));
        assert!(matches!(encoder.write_samples(&[ 1 ]), Err(AiffError::InvalidWriteState)));
        assert!(matches!(encoder.close(), Err(AiffError::InvalidWriteState)));
        // the header wasn't patched
        let output = encoder.into_inner().inner.into_inner();
        assert_eq!(output.len(), 58);
        assert_eq!(output[42..46], u32::to_be_bytes(8));
        Ok(())
    }
}

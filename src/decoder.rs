use crate::chunks::{self, Chunk, ChunkKind, ChunkStream};
use crate::metadata::{self, AppleMetadata};
use crate::{cast, AiffError, AiffResult, ByteOrder, ChunkId, FileFormat, Format, IntBuffer,
    Read, SampleCodec, SampleEncoding, Seek, Unsupported};

/// Decoder configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Logs skipped chunks and rewinds with `log::debug!`.
    pub debug: bool,
    /// Number of samples decoded per block by [`Decoder::read_all_pcm()`].
    /// This only affects I/O sizes, not the result.
    pub pcm_block_len: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            debug: false,
            pcm_block_len: 4096
        }
    }
}

/// Decoder lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Nothing has been read.
    Unopened,
    /// The FORM header has been read.
    HeaderRead,
    /// The COMM chunk has been read.
    FormatKnown,
    /// Chunks after the COMM chunk are being visited.
    Draining,
    /// All chunks have been visited.
    Done,
    /// A read failed. The same error is returned until [`Decoder::reset()`] is called.
    Failed,
}

/// Audio format read from the COMM chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatInfo {
    /// File format: AIFF or AIFF-C.
    pub file_format: FileFormat,
    /// Number of channels. Zero channels isn't an error, but [`Decoder::is_valid()`]
    /// returns `false` for it.
    pub channels: u16,
    /// Number of sample frames declared in the COMM chunk.
    pub frames: u32,
    /// Bits per sample declared in the COMM chunk.
    pub bit_depth: u16,
    /// Sample rate, decoded from an 80-bit extended float. May be zero, infinity or NaN.
    pub sample_rate: f64,
    /// AIFF-C compression type. Always `None` for AIFF.
    pub compression: Option<ChunkId>,
    /// AIFF-C human-readable compression name. Empty for AIFF.
    pub encoding_name: String,
}

impl FormatInfo {
    /// Returns the sample encoding of the SSND chunk data.
    ///
    /// Compression types without a sample codec return `UnsupportedFormat`.
    pub fn encoding(&self) -> AiffResult<SampleEncoding> {
        let Some(compression) = self.compression else {
            return Ok(SampleEncoding::pcm(self.bit_depth));
        };
        match compression {
            crate::COMPRESSIONTYPE_NONE |
            crate::COMPRESSIONTYPE_TWOS |
            crate::COMPRESSIONTYPE_RAW |
            crate::COMPRESSIONTYPE_IN24 |
            crate::COMPRESSIONTYPE_IN32 => Ok(SampleEncoding::pcm(self.bit_depth)),
            crate::COMPRESSIONTYPE_SOWT => Ok(SampleEncoding::Pcm {
                bit_depth: self.bit_depth,
                byte_order: ByteOrder::LittleEndian
            }),
            crate::COMPRESSIONTYPE_ULAW | crate::COMPRESSIONTYPE_ULAW_UPPER => Ok(SampleEncoding::Ulaw),
            crate::COMPRESSIONTYPE_ALAW | crate::COMPRESSIONTYPE_ALAW_UPPER => Ok(SampleEncoding::Alaw),
            _ => Err(AiffError::UnsupportedFormat(Unsupported::Compression(compression))),
        }
    }
}

/// Result of [`Decoder::read_pcm_into()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmRead {
    /// Number of samples written to the start of the buffer.
    pub count: usize,
    /// `true` if the sound data has been read to the end.
    pub end_of_stream: bool,
}

/// AIFF / AIFF-C decoder.
///
/// `Decoder` takes a stream implementing `Read+Seek`. The container may start at
/// a non-zero stream position: the position when the decoder first reads is the origin.
///
/// Chunks may appear in any order. The COMM chunk is located first. Chunks before it
/// are rewound over and visited afterwards, so that [`drain()`](Decoder::drain) visits
/// every chunk once.
///
/// After an I/O error or a structural error, every call returns the same error until
/// [`reset()`](Decoder::reset) is called.
///
/// # Examples
///
/// Reading samples block by block:
///
/// ```no_run
/// # fn example() -> aiff::AiffResult<()> {
/// let stream = std::io::BufReader::new(std::fs::File::open("test.aiff")?);
/// let mut decoder = aiff::Decoder::new(stream);
/// let info = decoder.read_format_info()?;
/// let format = aiff::Format { channels: info.channels, sample_rate: info.sample_rate };
/// let mut buffer = aiff::IntBuffer::new(format, 1024, info.bit_depth);
/// loop {
///     let read = decoder.read_pcm_into(&mut buffer)?;
///     println!("Got {} samples", read.count);
///     if read.end_of_stream {
///         break;
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Decoder<R> {
    stream: ChunkStream<R>,
    config: DecoderConfig,
    state: DecoderState,
    /// Recorded failure, returned by every entry point until reset.
    failure: Option<AiffError>,
    file_format: FileFormat,
    /// Absolute position where the FORM data ends. Zero until the header has been read.
    form_end: u64,
    /// Absolute position of the next chunk header to visit.
    next_header: u64,
    info: Option<FormatInfo>,
    comments: Vec<String>,
    /// COMT chunks starting before this position were parsed while locating the COMM chunk.
    comments_scanned_until: u64,
    apple: Option<AppleMetadata>,
    /// Sound data of the SSND chunk, without the offset and block size fields.
    pcm: Option<Chunk>,
    /// Reusable buffer for encoded samples.
    scratch: Vec<u8>,
}

impl<R: Read + Seek> Decoder<R> {
    /// Creates a new decoder with the default configuration. Nothing is read yet.
    pub fn new(stream: R) -> Decoder<R> {
        Decoder::with_config(stream, DecoderConfig::default())
    }

    /// Creates a new decoder with the given configuration. Nothing is read yet.
    pub fn with_config(stream: R, config: DecoderConfig) -> Decoder<R> {
        Decoder {
            stream: ChunkStream::new(stream),
            config,
            state: DecoderState::Unopened,
            failure: None,
            file_format: FileFormat::Aiff,
            form_end: 0,
            next_header: 0,
            info: None,
            comments: Vec::new(),
            comments_scanned_until: 0,
            apple: None,
            pcm: None,
            scratch: Vec::new(),
        }
    }

    /// Reads the FORM header and the COMM chunk and returns the audio format.
    ///
    /// Calling this again returns the same format without reading the stream.
    pub fn read_format_info(&mut self) -> AiffResult<FormatInfo> {
        self.check_failure()?;
        if let Some(info) = &self.info {
            return Ok(info.clone());
        }
        let result = self.scan_format();
        self.record(result)
    }

    /// Returns the audio format if it has been read.
    pub fn format_info(&self) -> Option<&FormatInfo> {
        self.info.as_ref()
    }

    /// Visits all remaining chunks. Comments and Apple metadata are parsed and
    /// the SSND chunk is located, but its sample data isn't read.
    ///
    /// The end of the stream at a chunk boundary ends draining without an error.
    pub fn drain(&mut self) -> AiffResult<()> {
        self.check_failure()?;
        let result = self.visit_chunks(false);
        self.record(result)
    }

    /// Visits chunks until the SSND chunk has been located. Does nothing if it has
    /// already been located.
    ///
    /// Returns `Malformed` if there's no SSND chunk.
    pub fn forward_to_pcm(&mut self) -> AiffResult<()> {
        self.check_failure()?;
        let result = self.locate_pcm();
        self.record(result)
    }

    /// Reads and decodes the remaining samples of the SSND chunk.
    ///
    /// Samples already read with [`read_pcm_into()`](Decoder::read_pcm_into) aren't
    /// returned again. The end of the stream before the end of the chunk isn't an error.
    /// A partial sample at the end is discarded.
    pub fn read_all_pcm(&mut self) -> AiffResult<IntBuffer> {
        self.check_failure()?;
        let result = self.locate_pcm();
        self.record(result)?;
        let (format, bit_depth, codec) = self.pcm_codec()?;
        let block_len = self.config.pcm_block_len.max(1).checked_mul(codec.width())
            .ok_or(AiffError::SizeTooLarge)?;
        let result = self.read_pcm_blocks(&codec, block_len);
        let data = self.record(result)?;
        Ok(IntBuffer { format, data, source_bit_depth: bit_depth })
    }

    /// Reads up to `buffer.data.len()` samples to the start of `buffer.data` and sets
    /// `buffer.format` and `buffer.source_bit_depth` from the audio format.
    ///
    /// Encoded sample bytes are read with one read call per block. A partial sample
    /// at the end of the sound data is discarded.
    pub fn read_pcm_into(&mut self, buffer: &mut IntBuffer) -> AiffResult<PcmRead> {
        self.check_failure()?;
        let result = self.locate_pcm();
        self.record(result)?;
        let (format, bit_depth, codec) = self.pcm_codec()?;
        buffer.format = format;
        buffer.source_bit_depth = bit_depth;
        let result = self.read_pcm_block(&codec, &mut buffer.data);
        self.record(result)
    }

    /// Seeks the stream back to the origin and clears everything read so far,
    /// including a recorded failure.
    pub fn reset(&mut self) -> AiffResult<()> {
        self.state = DecoderState::Unopened;
        self.failure = None;
        self.form_end = 0;
        self.next_header = 0;
        self.info = None;
        self.comments.clear();
        self.comments_scanned_until = 0;
        self.apple = None;
        self.pcm = None;
        self.stream.reset()
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Comments read so far.
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// Apple loop metadata, if a "basc" or "cate" chunk has been read.
    pub fn apple_metadata(&self) -> Option<&AppleMetadata> {
        self.apple.as_ref()
    }

    /// Byte length of the sample data once the SSND chunk has been located.
    pub fn pcm_len(&self) -> Option<u32> {
        self.pcm.as_ref().map(|pcm| pcm.size)
    }

    pub fn is_pcm_located(&self) -> bool {
        self.pcm.is_some()
    }

    /// Returns the duration in seconds (frame count divided by sample rate).
    ///
    /// A sample rate that isn't a positive finite number returns `Malformed`.
    pub fn duration(&mut self) -> AiffResult<f64> {
        let info = self.read_format_info()?;
        if !info.sample_rate.is_finite() || info.sample_rate <= 0.0 {
            return Err(AiffError::Malformed("sample rate"));
        }
        Ok(f64::from(info.frames) / info.sample_rate)
    }

    /// Checks that the stream has at least one channel, at least 8 bits per sample,
    /// a positive duration and a sample encoding which can be decoded.
    pub fn is_valid(&mut self) -> bool {
        let Ok(info) = self.read_format_info() else {
            return false;
        };
        if info.channels < 1 || info.bit_depth < 8 {
            return false;
        }
        if !matches!(self.duration(), Ok(d) if d > 0.0) {
            return false;
        }
        info.encoding().and_then(SampleCodec::for_encoding).is_ok()
    }

    /// Returns the tempo in beats per minute rounded to two decimals, or `None` if
    /// there is no Apple loop metadata or it has zero beats.
    pub fn tempo(&mut self) -> Option<f64> {
        let beats = match &self.apple {
            Some(meta) if meta.beats > 0 => f64::from(meta.beats),
            _ => return None,
        };
        let duration = self.duration().ok()?;
        let tempo = beats / (duration / 60.0);
        Some((tempo * 100.0).round() / 100.0)
    }

    /// Returns the underlying stream.
    pub fn into_inner(self) -> R {
        self.stream.into_inner()
    }

    /// Gets a reference to the underlying stream.
    pub const fn get_ref(&self) -> &R {
        self.stream.get_ref()
    }

    /// Gets a mutable reference to the underlying stream.
    ///
    /// Moving the stream position isn't tracked, so the stream should be seeked
    /// back before the decoder reads again.
    pub fn get_mut(&mut self) -> &mut R {
        self.stream.get_mut()
    }

    fn check_failure(&self) -> AiffResult<()> {
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(())
        }
    }

    /// Records an error as the sticky failure.
    fn record<T>(&mut self, result: AiffResult<T>) -> AiffResult<T> {
        if let Err(e) = &result {
            self.failure = Some(e.clone());
            self.state = DecoderState::Failed;
        }
        result
    }

    fn read_header(&mut self) -> AiffResult<()> {
        // the header is never re-read
        if self.form_end > 0 {
            return Ok(());
        }
        let (form_type, form_end) = chunks::read_form_header(&mut self.stream)?;
        self.file_format = if form_type == crate::CHUNKID_AIFC {
            FileFormat::Aifc
        } else {
            FileFormat::Aiff
        };
        self.form_end = form_end;
        self.next_header = self.stream.pos();
        self.state = DecoderState::HeaderRead;
        Ok(())
    }

    /// Reads chunk headers until the COMM chunk is found. Other chunks are only skipped
    /// and counted for the rewind, except COMT chunks, which are parsed as well.
    fn scan_format(&mut self) -> AiffResult<FormatInfo> {
        self.read_header()?;
        self.stream.seek_to(self.next_header)?;
        let mut rewind = 0;
        loop {
            let Some(mut chunk) = chunks::next_chunk(&mut self.stream, self.form_end)? else {
                return Err(AiffError::Malformed("stream without COMM chunk"));
            };
            match chunk.kind() {
                ChunkKind::Format => {
                    self.visit_format(&mut chunk, rewind)?;
                    self.state = DecoderState::FormatKnown;
                    return self.info.clone().ok_or(AiffError::Malformed("COMM chunk"));
                },
                ChunkKind::Comments => {
                    self.visit_metadata(&mut chunk)?;
                    self.comments_scanned_until = chunk.padded_end()?;
                },
                _ => {
                    if self.config.debug {
                        log::debug!("skipping {} chunk before COMM",
                            String::from_utf8_lossy(&chunk.id));
                    }
                },
            }
            rewind += chunk.total_size();
            chunk.skip(&mut self.stream)?;
        }
    }

    /// Parses the COMM chunk unless the format is already known. If `rewind` bytes were
    /// passed before it, seeks back to the first of them.
    fn visit_format(&mut self, chunk: &mut Chunk, rewind: u64) -> AiffResult<()> {
        if self.info.is_none() {
            let data = chunk.read_to_vec(&mut self.stream, "COMM chunk")?;
            self.info = Some(parse_comm(&data, self.file_format)?);
        }
        chunk.skip(&mut self.stream)?;
        if rewind > 0 {
            if self.config.debug {
                log::debug!("rewinding {} bytes to chunks before COMM", rewind);
            }
            self.stream.rewind_by(rewind + chunk.total_size())?;
        }
        self.next_header = self.stream.pos();
        Ok(())
    }

    /// Parses a metadata chunk. Errors other than I/O errors are logged and ignored.
    fn visit_metadata(&mut self, chunk: &mut Chunk) -> AiffResult<()> {
        let result = chunk.read_to_vec(&mut self.stream, "metadata chunk")
            .and_then(|data| match chunk.kind() {
                ChunkKind::Comments => metadata::parse_comments(&data, &mut self.comments),
                ChunkKind::AppleLoop => metadata::parse_basc(&data,
                    self.apple.get_or_insert_with(AppleMetadata::default)),
                ChunkKind::AppleCategory => metadata::parse_cate(&data,
                    self.apple.get_or_insert_with(AppleMetadata::default)),
                _ => Ok(()),
            });
        match result {
            Err(AiffError::Io(e)) => Err(AiffError::Io(e)),
            Err(e) => {
                log::warn!("ignoring {} chunk: {}", String::from_utf8_lossy(&chunk.id), e);
                Ok(())
            },
            Ok(()) => Ok(())
        }
    }

    /// Visits chunks from the current chunk position. Stops after the SSND chunk
    /// if `stop_at_pcm` is set.
    ///
    /// The COMM chunk is always located by `scan_format()` first, so chunks before it
    /// have been rewound over before the loop starts.
    fn visit_chunks(&mut self, stop_at_pcm: bool) -> AiffResult<()> {
        if self.info.is_none() {
            self.scan_format()?;
        }
        if self.state == DecoderState::Done {
            return Ok(());
        }
        self.state = DecoderState::Draining;
        loop {
            self.stream.seek_to(self.next_header)?;
            let Some(mut chunk) = chunks::next_chunk(&mut self.stream, self.form_end)? else {
                self.state = DecoderState::Done;
                return Ok(());
            };
            self.next_header = chunk.padded_end()?;
            match chunk.kind() {
                ChunkKind::Format => {
                    // already parsed by the scan, which also did any rewinding
                    self.visit_format(&mut chunk, 0)?;
                    continue;
                },
                ChunkKind::SoundData => {
                    if self.pcm.is_none() {
                        self.pcm = Some(read_ssnd_header(&mut chunk, &mut self.stream)?);
                        if stop_at_pcm {
                            return Ok(());
                        }
                    }
                },
                ChunkKind::Comments => {
                    if chunk.start >= self.comments_scanned_until {
                        self.visit_metadata(&mut chunk)?;
                    }
                },
                ChunkKind::AppleLoop | ChunkKind::AppleCategory => {
                    self.visit_metadata(&mut chunk)?;
                },
                ChunkKind::ChannelLayout | ChunkKind::Transients => {
                    if self.config.debug {
                        log::debug!("skipping {} chunk", String::from_utf8_lossy(&chunk.id));
                    }
                },
                ChunkKind::Unknown => {
                    if self.config.debug {
                        log::debug!("skipping unknown chunk {:?}", chunk.id);
                    }
                },
            }
            chunk.skip(&mut self.stream)?;
        }
    }

    fn locate_pcm(&mut self) -> AiffResult<()> {
        if self.pcm.is_some() {
            return Ok(());
        }
        self.visit_chunks(true)?;
        if self.pcm.is_none() {
            return Err(AiffError::Malformed("stream without SSND chunk"));
        }
        Ok(())
    }

    /// Returns the buffer format, the source bit depth and the codec for the sample data.
    /// Errors aren't recorded as failures.
    fn pcm_codec(&self) -> AiffResult<(Format, u16, SampleCodec)> {
        let info = self.info.as_ref().ok_or(AiffError::Malformed("COMM chunk"))?;
        let codec = SampleCodec::for_encoding(info.encoding()?)?;
        let format = Format { channels: info.channels, sample_rate: info.sample_rate };
        Ok((format, info.bit_depth, codec))
    }

    fn read_pcm_blocks(&mut self, codec: &SampleCodec, block_len: usize) -> AiffResult<Vec<i32>> {
        let Some(pcm) = self.pcm.as_mut() else {
            return Err(AiffError::Malformed("stream without SSND chunk"));
        };
        let width = codec.width();
        // the declared size isn't trusted for the initial allocation
        let mut data = Vec::with_capacity((cast::u32_to_usize(pcm.remaining()) / width).min(1 << 20));
        self.scratch.resize(block_len, 0);
        loop {
            let count = pcm.read(&mut self.stream, &mut self.scratch)?;
            if count == 0 {
                break;
            }
            data.extend(self.scratch[..count].chunks_exact(width).map(|b| codec.decode(b)));
        }
        Ok(data)
    }

    fn read_pcm_block(&mut self, codec: &SampleCodec, out: &mut [i32]) -> AiffResult<PcmRead> {
        let Some(pcm) = self.pcm.as_mut() else {
            return Err(AiffError::Malformed("stream without SSND chunk"));
        };
        let byte_len = out.len().checked_mul(codec.width()).ok_or(AiffError::SizeTooLarge)?;
        self.scratch.resize(byte_len, 0);
        let count = pcm.read(&mut self.stream, &mut self.scratch)?;
        Ok(PcmRead {
            count: codec.decode_slice(&self.scratch[..count], out),
            end_of_stream: count < byte_len || pcm.is_consumed()
        })
    }
}

/// Parses COMM chunk data.
fn parse_comm(data: &[u8], file_format: FileFormat) -> AiffResult<FormatInfo> {
    let mut pos = 0;
    let channels = chunks::read_u16(data, &mut pos, "COMM chunk")?;
    let frames = chunks::read_u32(data, &mut pos, "COMM chunk")?;
    let bit_depth = chunks::read_u16(data, &mut pos, "COMM chunk")?;
    let sample_rate = crate::f80::f80_to_f64(&chunks::read_array(data, &mut pos, "COMM chunk")?);
    let (compression, encoding_name) = match file_format {
        FileFormat::Aiff => (None, String::new()),
        FileFormat::Aifc => {
            let compression = chunks::read_array::<4>(data, &mut pos, "COMM chunk")?;
            // a missing or too long compression name is tolerated
            let name_len = chunks::read_array::<1>(data, &mut pos, "COMM chunk")
                .map_or(0, |len| usize::from(len[0]))
                .min(data.len().saturating_sub(pos));
            let name = chunks::read_bytes(data, &mut pos, name_len, "COMM chunk")?;
            (Some(compression), String::from_utf8_lossy(name).into_owned())
        },
    };
    Ok(FormatInfo {
        file_format,
        channels,
        frames,
        bit_depth,
        sample_rate,
        compression,
        encoding_name
    })
}

/// Reads the SSND offset and block size fields and returns the sound data part of the chunk.
fn read_ssnd_header<R: Read + Seek>(chunk: &mut Chunk, stream: &mut ChunkStream<R>)
    -> AiffResult<Chunk> {
    let mut header = [0u8; 8];
    chunk.read_exact(stream, &mut header, "SSND chunk")?;
    let offset = u32::from_be_bytes([ header[0], header[1], header[2], header[3] ]);
    // the block size (header[4..8]) isn't needed for reading
    if offset > chunk.size - 8 {
        return Err(AiffError::Malformed("SSND offset"));
    }
    chunk.narrow(8 + offset)
}

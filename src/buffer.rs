// Interleaved integer sample buffer exchanged with the decoder and encoder.

/// Channel count and sample rate of a buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Format {
    pub channels: u16,
    pub sample_rate: f64,
}

/// Interleaved integer samples.
///
/// `source_bit_depth` is the bit depth the samples were decoded from or are to be
/// encoded to. Samples are not scaled: 8-bit samples are in the range 0..=255,
/// 16-bit samples in the range -32768..=32767 and so on.
#[derive(Debug, Clone, PartialEq)]
pub struct IntBuffer {
    pub format: Format,
    pub data: Vec<i32>,
    pub source_bit_depth: u16,
}

impl IntBuffer {
    /// Creates a buffer of `len` zero samples.
    pub fn new(format: Format, len: usize, source_bit_depth: u16) -> IntBuffer {
        IntBuffer {
            format,
            data: vec![0; len],
            source_bit_depth
        }
    }

    /// Number of whole frames in the buffer.
    pub fn frames(&self) -> usize {
        match self.format.channels {
            0 => 0,
            channels => self.data.len() / usize::from(channels),
        }
    }
}

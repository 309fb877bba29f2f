// Metadata sub-decoders for comments and Apple loop chunks.

use crate::chunks::{read_array, read_bytes, read_i16, read_u16, read_u32};
use crate::{AiffError, AiffResult, Write};

/// Byte length of the fixed text slots in the "cate" chunk.
const CATE_TAG_LEN: usize = 50;

/// Apple loop metadata, written by programs such as Logic and GarageBand.
///
/// The decoder sets this from the "basc" and "cate" chunks. Mapping the numeric note
/// and scale codes to names is left to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppleMetadata {
    /// Number of beats in the sample.
    pub beats: u32,
    /// Root key of the sample (48 = C).
    pub note: u16,
    /// Musical scale: 0 = neither, 1 = minor, 2 = major, 4 = both.
    pub scale: u16,
    /// Time signature numerator.
    pub numerator: u16,
    /// Time signature denominator.
    pub denominator: u16,
    /// `true` for loops, `false` for one-shots.
    pub is_looping: bool,
    /// Tags describing the content, such as instrument and genre.
    pub tags: Vec<String>,
}

/// Parses "basc" chunk data into `meta`. Fields are set only if the whole chunk parses.
pub fn parse_basc(data: &[u8], meta: &mut AppleMetadata) -> AiffResult<()> {
    let mut pos = 0;
    let _version = read_u32(data, &mut pos, "basc chunk")?;
    let beats = read_u32(data, &mut pos, "basc chunk")?;
    let note = read_u16(data, &mut pos, "basc chunk")?;
    let scale = read_u16(data, &mut pos, "basc chunk")?;
    let numerator = read_u16(data, &mut pos, "basc chunk")?;
    let denominator = read_u16(data, &mut pos, "basc chunk")?;
    let _pad = read_array::<1>(data, &mut pos, "basc chunk")?;
    // 1 = loop, 2 = one-shot
    let loop_flag = read_u16(data, &mut pos, "basc chunk")?;
    meta.beats = beats;
    meta.note = note;
    meta.scale = scale;
    meta.numerator = numerator;
    meta.denominator = denominator;
    meta.is_looping = loop_flag == 1;
    Ok(())
}

/// Parses "cate" chunk data and appends its tags to `meta`.
/// Tags read before an error are kept.
pub fn parse_cate(data: &[u8], meta: &mut AppleMetadata) -> AiffResult<()> {
    let mut pos = 0;
    read_bytes(data, &mut pos, 4, "cate chunk")?;
    // instrument, instrument category, style, substyle
    for _ in 0..4 {
        push_tag(read_bytes(data, &mut pos, CATE_TAG_LEN, "cate chunk")?, &mut meta.tags);
    }
    read_bytes(data, &mut pos, 16, "cate chunk")?;
    let descriptor_count = read_i16(data, &mut pos, "cate chunk")?;
    for _ in 0..descriptor_count.max(0) {
        push_tag(read_bytes(data, &mut pos, CATE_TAG_LEN, "cate chunk")?, &mut meta.tags);
    }
    Ok(())
}

/// Appends the null terminated text in `slot` to `tags`, unless it's empty.
fn push_tag(slot: &[u8], tags: &mut Vec<String>) {
    let len = slot.iter().position(|b| *b == 0).unwrap_or(slot.len());
    if len > 0 {
        tags.push(String::from_utf8_lossy(&slot[..len]).into_owned());
    }
}

/// Parses "COMT" chunk data and appends the comment texts to `comments`.
///
/// Each comment is an 8-byte timestamp and marker id followed by a pascal string
/// (one length byte and the text). Trailing null bytes are trimmed. Comments read
/// before an error are kept.
pub fn parse_comments(data: &[u8], comments: &mut Vec<String>) -> AiffResult<()> {
    let mut pos = 0;
    let count = read_u16(data, &mut pos, "COMT chunk")?;
    for _ in 0..count {
        // timestamp and marker id aren't kept
        read_bytes(data, &mut pos, 8, "COMT chunk")?;
        let len = usize::from(read_array::<1>(data, &mut pos, "COMT chunk")?[0]);
        let text = read_bytes(data, &mut pos, len, "COMT chunk")?;
        let trimmed_len = text.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        comments.push(String::from_utf8_lossy(&text[..trimmed_len]).into_owned());
    }
    Ok(())
}

/// Writes "COMT" chunk data for the given comment texts with zero timestamps and
/// marker ids. The maximum comment count is 65535 and the maximum text length is 255.
pub fn write_comments(write: &mut dyn Write, comments: &[String]) -> AiffResult<()> {
    let count = u16::try_from(comments.len()).map_err(|_| AiffError::SizeTooLarge)?;
    write.write_all(&count.to_be_bytes())?;
    for comment in comments {
        let text = comment.as_bytes();
        let len = u8::try_from(text.len()).map_err(|_| AiffError::SizeTooLarge)?;
        write.write_all(&[ 0u8; 8 ])?;
        write.write_all(&[ len ])?;
        write.write_all(text)?;
    }
    Ok(())
}

/// Returns the byte size of the "COMT" chunk data for the given comment texts.
pub fn comments_size(comments: &[String]) -> AiffResult<u32> {
    let mut size: u64 = 2;
    for comment in comments {
        size += 9 + crate::cast::usize_to_u64(comment.len(), AiffError::SizeTooLarge)?;
    }
    u32::try_from(size).map_err(|_| AiffError::SizeTooLarge)
}

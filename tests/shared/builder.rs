// Builders for hand-crafted AIFF streams.
#![allow(dead_code)]

/// Returns a chunk with the given id and data. Odd sized data gets a pad byte.
pub fn chunk(id: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut v = id.to_vec();
    v.extend_from_slice(&(data.len() as u32).to_be_bytes());
    v.extend_from_slice(data);
    if data.len() % 2 == 1 {
        v.push(0);
    }
    v
}

/// Returns the FORM header followed by the given chunks.
pub fn form(form_type: &[u8; 4], chunks: &[Vec<u8>]) -> Vec<u8> {
    let body = chunks.concat();
    let mut v = b"FORM".to_vec();
    v.extend_from_slice(&(body.len() as u32 + 4).to_be_bytes());
    v.extend_from_slice(form_type);
    v.extend_from_slice(&body);
    v
}

/// 80-bit extended float for common sample rates.
pub fn rate_f80(rate: u32) -> [u8; 10] {
    match rate {
        8000 => [ 0x40, 0x0B, 0xFA, 0, 0, 0, 0, 0, 0, 0 ],
        22050 => [ 0x40, 0x0D, 0xAC, 0x44, 0, 0, 0, 0, 0, 0 ],
        44100 => [ 0x40, 0x0E, 0xAC, 0x44, 0, 0, 0, 0, 0, 0 ],
        48000 => [ 0x40, 0x0E, 0xBB, 0x80, 0, 0, 0, 0, 0, 0 ],
        _ => panic!("no f80 value for {rate}"),
    }
}

/// AIFF COMM chunk.
pub fn comm(channels: u16, frames: u32, bits: u16, rate: u32) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&channels.to_be_bytes());
    data.extend_from_slice(&frames.to_be_bytes());
    data.extend_from_slice(&bits.to_be_bytes());
    data.extend_from_slice(&rate_f80(rate));
    chunk(b"COMM", &data)
}

/// AIFF-C COMM chunk with a compression type and name.
pub fn comm_aifc(channels: u16, frames: u32, bits: u16, rate: u32, compression: &[u8; 4],
    name: &str) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&channels.to_be_bytes());
    data.extend_from_slice(&frames.to_be_bytes());
    data.extend_from_slice(&bits.to_be_bytes());
    data.extend_from_slice(&rate_f80(rate));
    data.extend_from_slice(compression);
    data.push(name.len() as u8);
    data.extend_from_slice(name.as_bytes());
    if name.len() % 2 == 0 {
        data.push(0);
    }
    chunk(b"COMM", &data)
}

/// FVER chunk.
pub fn fver() -> Vec<u8> {
    chunk(b"FVER", &[ 0xA2, 0x80, 0x51, 0x40 ])
}

/// SSND chunk with the given offset (filled with 0xee) and sample data.
pub fn ssnd(offset: u32, pcm: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&offset.to_be_bytes());
    data.extend_from_slice(&0u32.to_be_bytes());
    data.extend(std::iter::repeat(0xee).take(offset as usize));
    data.extend_from_slice(pcm);
    chunk(b"SSND", &data)
}

/// COMT chunk with zero timestamps and marker ids. Texts are pascal strings.
pub fn comt(texts: &[&str]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&(texts.len() as u16).to_be_bytes());
    for text in texts {
        data.extend_from_slice(&[ 0; 8 ]);
        data.push(text.len() as u8);
        data.extend_from_slice(text.as_bytes());
    }
    chunk(b"COMT", &data)
}

/// Apple "basc" chunk.
pub fn basc(beats: u32, note: u16, scale: u16, numerator: u16, denominator: u16,
    looping: bool) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(&beats.to_be_bytes());
    data.extend_from_slice(&note.to_be_bytes());
    data.extend_from_slice(&scale.to_be_bytes());
    data.extend_from_slice(&numerator.to_be_bytes());
    data.extend_from_slice(&denominator.to_be_bytes());
    data.push(0);
    data.extend_from_slice(&(if looping { 1u16 } else { 2u16 }).to_be_bytes());
    chunk(b"basc", &data)
}

/// Apple "cate" chunk with four main tags and extra descriptors.
pub fn cate(main: [&str; 4], descriptors: &[&str]) -> Vec<u8> {
    fn slot(text: &str) -> Vec<u8> {
        let mut v = text.as_bytes().to_vec();
        v.resize(50, 0);
        v
    }
    let mut data = vec![ 0u8; 4 ];
    for tag in main {
        data.extend(slot(tag));
    }
    data.extend_from_slice(&[ 0u8; 16 ]);
    data.extend_from_slice(&(descriptors.len() as i16).to_be_bytes());
    for tag in descriptors {
        data.extend(slot(tag));
    }
    chunk(b"cate", &data)
}

/// Big-endian 16-bit sample bytes.
pub fn i16_be(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_be_bytes()).collect()
}

/// Little-endian 16-bit sample bytes.
pub fn i16_le(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

// Helper for testing.
#![allow(dead_code)]

use serde::Deserialize;

/// Decoded stream contents, parsed from the output of `jsonify()`.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JsonDecoded {
    pub format: String,
    pub sample_rate: f64,
    pub channels: u16,
    pub frames: u32,
    pub sample_size: u16,
    pub codec: String,
    pub encoding_name: String,
    pub comments: Vec<String>,
    pub apple: Option<JsonApple>,
    pub tempo: Option<f64>,
    pub valid: bool,
    pub samples: Vec<i32>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JsonApple {
    pub beats: u32,
    pub note: u16,
    pub scale: u16,
    pub time_signature: String,
    pub looping: bool,
    pub tags: Vec<String>,
}

/// JSON output for errors.
#[derive(Debug, Deserialize, PartialEq)]
pub struct JsonError {
    pub error: String,
}

/// Reads data from the given Decoder and returns it as JSON.
pub fn jsonify<T>(decoder: &mut aiff::Decoder<T>) -> aiff::AiffResult<String>
    where T: std::io::Read + std::io::Seek {

    let info = match decoder.read_format_info() {
        Err(error) => {
            return Ok(format!("{{ \"error\": {:?} }}", error.to_string()));
        },
        Ok(val) => val
    };
    let valid = decoder.is_valid();
    if let Err(error) = decoder.drain() {
        return Ok(format!("{{ \"error\": {:?} }}", error.to_string()));
    }

    let mut json = String::new();
    json += "{\n";
    match info.file_format {
        aiff::FileFormat::Aiff => { json += "    \"format\": \"aiff\",\n"; },
        aiff::FileFormat::Aifc => { json += "    \"format\": \"aiff-c\",\n"; }
    }
    json += &format!("    \"sampleRate\": {},\n", info.sample_rate);
    json += &format!("    \"channels\": {},\n", info.channels);
    json += &format!("    \"frames\": {},\n", info.frames);
    json += &format!("    \"sampleSize\": {},\n", info.bit_depth);
    let codec = match info.encoding() {
        Ok(aiff::SampleEncoding::Pcm { byte_order: aiff::ByteOrder::BigEndian, .. }) => "pcm_be",
        Ok(aiff::SampleEncoding::Pcm { byte_order: aiff::ByteOrder::LittleEndian, .. }) => "pcm_le",
        Ok(aiff::SampleEncoding::Ulaw) => "ulaw",
        Ok(aiff::SampleEncoding::Alaw) => "alaw",
        Err(_) => "unsupported",
    };
    json += &format!("    \"codec\": \"{}\",\n", codec);
    json += &format!("    \"encodingName\": {:?},\n", info.encoding_name);
    json += &format!("    \"comments\": [ {} ],\n", decoder.comments().iter()
        .map(|c| format!("{:?}", c))
        .collect::<Vec<String>>()
        .join(", "));
    match decoder.apple_metadata() {
        Some(meta) => {
            json += "    \"apple\": {\n";
            json += &format!("        \"beats\": {},\n", meta.beats);
            json += &format!("        \"note\": {},\n", meta.note);
            json += &format!("        \"scale\": {},\n", meta.scale);
            json += &format!("        \"timeSignature\": \"{}/{}\",\n",
                meta.numerator, meta.denominator);
            json += &format!("        \"looping\": {},\n", meta.is_looping);
            json += &format!("        \"tags\": [ {} ]\n", meta.tags.iter()
                .map(|t| format!("{:?}", t))
                .collect::<Vec<String>>()
                .join(", "));
            json += "    },\n";
        },
        None => { json += "    \"apple\": null,\n"; }
    }
    match decoder.tempo() {
        Some(tempo) => { json += &format!("    \"tempo\": {},\n", tempo); },
        None => { json += "    \"tempo\": null,\n"; }
    }
    json += &format!("    \"valid\": {},\n", valid);
    let samples = match decoder.read_all_pcm() {
        Ok(buffer) => buffer.data,
        Err(aiff::AiffError::UnsupportedFormat(_)) => Vec::new(),
        Err(e) => { return Err(e); }
    };
    json += &format!("    \"samples\": [ {} ]\n", samples.iter()
        .map(|s| s.to_string())
        .collect::<Vec<String>>()
        .join(", "));
    json += "}\n";
    Ok(json)
}

/// Decodes the given stream and parses the JSON output.
pub fn decode(data: &[u8]) -> JsonDecoded {
    let mut decoder = aiff::Decoder::new(std::io::Cursor::new(data));
    let json = jsonify(&mut decoder).expect("jsonify failed");
    serde_json::from_str(&json).unwrap_or_else(|e| panic!("invalid json {e}: {json}"))
}

/// Decodes the given stream and returns the error message.
pub fn decode_error(data: &[u8]) -> String {
    let mut decoder = aiff::Decoder::new(std::io::Cursor::new(data));
    let json = jsonify(&mut decoder).expect("jsonify failed");
    let error: JsonError = serde_json::from_str(&json)
        .unwrap_or_else(|e| panic!("invalid json {e}: {json}"));
    error.error
}

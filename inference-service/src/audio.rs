use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::InferenceResult;

pub const FALLBACK_SAMPLE_RATE: u32 = 16_000;

/// Mono 16-bit PCM silence, returned when text-to-speech is unavailable.
pub fn silent_wav(seconds: u32) -> InferenceResult<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: FALLBACK_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut buffer = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut buffer), spec)?;
        for _ in 0..FALLBACK_SAMPLE_RATE.saturating_mul(seconds) {
            writer.write_sample(0i16)?;
        }
        writer.finalize()?;
    }
    Ok(buffer)
}

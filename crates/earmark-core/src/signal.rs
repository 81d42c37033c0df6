//! Audio decoding and signal preparation.
//!
//! Every input, whatever its container, codec, channel layout or rate, ends
//! up as one mono `f32` stream at the configured sample rate:
//!
//! 1. decode with symphonia (integer PCM is rescaled to [-1, 1] there)
//! 2. peak-normalize with the configured headroom
//! 3. downmix by averaging channels
//! 4. resample with a sinc resampler when the source rate differs

use std::fs::File;
use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::{debug, info, warn};

use crate::config::FingerprintConfig;
use crate::types::AudioSignal;
use crate::{Error, Result};

const RESAMPLE_CHUNK: usize = 1024;

/// Decodes audio files into normalized mono signals.
#[derive(Debug, Clone)]
pub struct SignalLoader {
    target_rate: u32,
    headroom_db: f32,
}

impl SignalLoader {
    /// Create a loader producing `target_rate` Hz output.
    pub fn new(target_rate: u32, headroom_db: f32) -> Self {
        Self {
            target_rate,
            headroom_db,
        }
    }

    /// Create a loader from a fingerprint configuration.
    pub fn from_config(config: &FingerprintConfig) -> Self {
        Self::new(config.sample_rate, config.headroom_db)
    }

    /// Output sample rate.
    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    /// Decode `path` into a prepared mono signal.
    pub fn decode(&self, path: impl AsRef<Path>) -> Result<AudioSignal> {
        let path = path.as_ref();
        info!("Decoding audio: {}", path.display());

        let decoded = decode_file(path)?;
        debug!(
            samples = decoded.samples.len(),
            channels = decoded.channels,
            rate = decoded.sample_rate,
            "Decoded source audio"
        );

        self.prepare(decoded.samples, decoded.channels, decoded.sample_rate)
    }

    /// Normalize, downmix and resample interleaved samples.
    pub fn prepare(
        &self,
        mut interleaved: Vec<f32>,
        channels: usize,
        sample_rate: u32,
    ) -> Result<AudioSignal> {
        if channels == 0 || sample_rate == 0 {
            return Err(Error::Internal(format!(
                "invalid stream layout: {channels} channels at {sample_rate} Hz"
            )));
        }

        normalize(&mut interleaved, self.headroom_db);
        let mono = to_mono(&interleaved, channels);
        let samples = resample(&mono, sample_rate, self.target_rate)?;

        Ok(AudioSignal::new(samples, self.target_rate))
    }
}

/// Interleaved samples straight out of the decoder.
struct DecodedAudio {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

fn decode_file(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path).map_err(|e| Error::decode(path, e))?;
    let media_source_stream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            media_source_stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::decode(path, e))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::decode(path, "no decodable audio track"))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::decode(path, e))?;

    let mut sample_rate = codec_params.sample_rate;
    let mut channels = codec_params.channels.map(|c| c.count());
    let mut samples = Vec::new();
    let mut decoded_packets = 0usize;
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(Error::decode(path, e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = Some(spec.rate);
                channels = Some(spec.channels.count());

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
                decoded_packets += 1;
            }
            Err(SymphoniaError::DecodeError(reason)) => {
                warn!(path = %path.display(), reason, "Skipping corrupt packet");
                skipped_packets += 1;
            }
            Err(e) => return Err(Error::decode(path, e)),
        }
    }

    if decoded_packets == 0 && skipped_packets > 0 {
        return Err(Error::decode(path, "every audio packet failed to decode"));
    }

    let sample_rate = sample_rate.ok_or_else(|| Error::decode(path, "unknown sample rate"))?;
    let channels = channels.ok_or_else(|| Error::decode(path, "unknown channel layout"))?;

    Ok(DecodedAudio {
        samples,
        channels,
        sample_rate,
    })
}

/// Scale so the loudest sample sits `headroom_db` below full scale.
fn normalize(samples: &mut [f32], headroom_db: f32) {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak == 0.0 {
        return;
    }

    let target = 10f32.powf(-headroom_db / 20.0);
    let gain = target / peak;
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
}

fn to_mono(input: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return input.to_vec();
    }

    input
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn resample(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
    if input_rate == output_rate || input.is_empty() {
        return Ok(input.to_vec());
    }

    let ratio = output_rate as f64 / input_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        oversampling_factor: 64,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLE_CHUNK, 1)
        .map_err(|e| Error::Internal(format!("resampler setup failed: {e}")))?;

    let expected = (input.len() as f64 * ratio).round() as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);

    let mut position = 0;
    while output.len() < expected + delay {
        let mut chunk = vec![0.0f32; RESAMPLE_CHUNK];
        if position < input.len() {
            let end = (position + RESAMPLE_CHUNK).min(input.len());
            chunk[..end - position].copy_from_slice(&input[position..end]);
        }
        position += RESAMPLE_CHUNK;

        let result = resampler
            .process(&[chunk], None)
            .map_err(|e| Error::Internal(format!("resampling failed: {e}")))?;
        output.extend_from_slice(&result[0]);
    }

    output.drain(..delay);
    output.truncate(expected);

    debug!(
        from = input_rate,
        to = output_rate,
        samples = output.len(),
        "Resampled signal"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
        let num_samples = (sample_rate as f32 * duration_secs) as usize;
        (0..num_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                amplitude * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_normalize_headroom() {
        let mut samples = vec![0.5, -0.25, 0.1];
        normalize(&mut samples, 20.0);
        assert!((samples[0] - 0.1).abs() < 1e-6);
        assert!((samples[1] + 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_silence_untouched() {
        let mut samples = vec![0.0; 16];
        normalize(&mut samples, 20.0);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_downmix_is_channel_mean() {
        let stereo = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(to_mono(&stereo, 2), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_prepare_same_rate_keeps_length() {
        let loader = SignalLoader::new(22_050, 20.0);
        let signal = loader
            .prepare(sine(440.0, 22_050, 1.0, 0.8), 1, 22_050)
            .unwrap();

        assert_eq!(signal.sample_rate, 22_050);
        assert_eq!(signal.len(), 22_050);
        let peak = signal.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!((peak - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_prepare_resamples_to_target_rate() {
        let loader = SignalLoader::new(22_050, 20.0);
        let signal = loader
            .prepare(sine(440.0, 44_100, 1.0, 0.5), 1, 44_100)
            .unwrap();

        assert_eq!(signal.sample_rate, 22_050);
        assert_eq!(signal.len(), 22_050);
        assert!((signal.duration_secs() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_prepare_empty_input() {
        let loader = SignalLoader::new(22_050, 20.0);
        let signal = loader.prepare(Vec::new(), 2, 44_100).unwrap();
        assert!(signal.is_empty());
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let loader = SignalLoader::new(22_050, 20.0);
        let err = loader.decode("/definitely/not/here.wav").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_garbage_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.mp3");
        std::fs::write(&path, b"this is not an audio file at all").unwrap();

        let loader = SignalLoader::new(22_050, 20.0);
        assert!(matches!(loader.decode(&path), Err(Error::Decode { .. })));
    }

    #[test]
    fn test_decode_stereo_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for sample in sine(440.0, 22_050, 0.5, 0.5) {
            let value = (sample * i16::MAX as f32) as i16;
            writer.write_sample(value).unwrap();
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();

        let loader = SignalLoader::new(22_050, 20.0);
        let signal = loader.decode(&path).unwrap();
        assert_eq!(signal.sample_rate, 22_050);
        assert_eq!(signal.len(), 11_025);
    }
}

use crate::audio::{downmix, samples_for, AudioCapture};
use crate::{Result, SentioError};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Write audio samples to a 16-bit PCM WAV file
///
/// # Arguments
/// * `path` - Path to the output WAV file
/// * `samples` - Audio samples (f32, range -1.0 to 1.0)
/// * `sample_rate` - Sample rate in Hz
/// * `channels` - Number of channels
pub fn write_wav<P: AsRef<Path>>(
    path: P,
    samples: &[f32],
    sample_rate: u32,
    channels: u16,
) -> Result<()> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path.as_ref(), spec)
        .map_err(|e| SentioError::IOError(format!("Failed to create WAV writer: {}", e)))?;

    for &sample in samples {
        let sample_i16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(sample_i16)
            .map_err(|e| SentioError::IOError(format!("Failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| SentioError::IOError(format!("Failed to finalize WAV file: {}", e)))?;

    debug!("Wrote {} samples to WAV file: {:?}", samples.len(), path.as_ref());
    Ok(())
}

/// Read audio samples from a WAV file
///
/// # Returns
/// * Tuple of (interleaved samples, sample_rate, channels)
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u32, u16)> {
    let mut reader = WavReader::open(path.as_ref())
        .map_err(|e| SentioError::IOError(format!("Failed to open WAV file: {}", e)))?;

    let spec = reader.spec();
    let read_err = |e: hound::Error| SentioError::IOError(format!("Failed to read sample: {}", e));

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, _) => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(read_err)?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
            .collect::<std::result::Result<_, _>>()
            .map_err(read_err)?,
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8_388_608.0)) // 2^23
            .collect::<std::result::Result<_, _>>()
            .map_err(read_err)?,
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / i32::MAX as f32))
            .collect::<std::result::Result<_, _>>()
            .map_err(read_err)?,
        (_, bits) => {
            return Err(SentioError::IOError(format!(
                "Unsupported bit depth: {}",
                bits
            )))
        }
    };

    debug!(
        "Read {} samples from WAV file ({} Hz, {} channels)",
        samples.len(),
        spec.sample_rate,
        spec.channels
    );

    Ok((samples, spec.sample_rate, spec.channels))
}

/// Capture that replays a recorded WAV file
///
/// The file is downmixed to mono, then truncated or padded with silence to
/// the requested duration.
pub struct WavFileCapture {
    path: PathBuf,
}

impl WavFileCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AudioCapture for WavFileCapture {
    fn capture(&mut self, duration: Duration, sample_rate: u32) -> Result<Vec<f32>> {
        let (samples, file_rate, channels) =
            read_wav(&self.path).map_err(|e| SentioError::Capture(e.to_string()))?;

        if file_rate != sample_rate {
            return Err(SentioError::Capture(format!(
                "{} is {} Hz, expected {} Hz",
                self.path.display(),
                file_rate,
                sample_rate
            )));
        }

        let mut mono = downmix(&samples, channels as usize);
        mono.resize(samples_for(duration, sample_rate), 0.0);

        info!("Replayed {} samples from {}", mono.len(), self.path.display());
        Ok(mono)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<f32> = (0..1600)
            .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / 16000.0).sin() * 0.5)
            .collect();

        write_wav(&path, &samples, 16000, 1).unwrap();
        let (read, rate, channels) = read_wav(&path).unwrap();

        assert_eq!(rate, 16000);
        assert_eq!(channels, 1);
        assert_eq!(read.len(), samples.len());
        assert!((read[100] - samples[100]).abs() < 1e-3);
    }

    #[test]
    fn test_replay_pads_to_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.wav");
        write_wav(&path, &[0.5; 800], 16000, 1).unwrap();

        let mut capture = WavFileCapture::new(&path);
        let samples = capture.capture(Duration::from_millis(100), 16000).unwrap();

        assert_eq!(samples.len(), 1600);
        assert!(samples[..800].iter().all(|s| (s - 0.5).abs() < 1e-3));
        assert!(samples[800..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_replay_rejects_other_sample_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cd.wav");
        write_wav(&path, &[0.0; 441], 44100, 1).unwrap();

        let mut capture = WavFileCapture::new(&path);
        let err = capture.capture(Duration::from_secs(1), 16000).unwrap_err();
        assert!(matches!(err, SentioError::Capture(_)));
    }

    #[test]
    fn test_missing_file_is_capture_error() {
        let mut capture = WavFileCapture::new("/nonexistent/input.wav");
        assert!(matches!(
            capture.capture(Duration::from_secs(1), 16000),
            Err(SentioError::Capture(_))
        ));
    }
}

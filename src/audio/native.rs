//! Native playback backend built on `rodio`, with transcoding fallback.
//!
//! `load` keeps the original file when `rodio` can decode it directly.
//! Otherwise the source is decoded with `symphonia` and re-encoded to a
//! PCM16 WAV temp file, which `rodio` is guaranteed to play. Track
//! duration comes from `lofty` metadata when available, or from the
//! decoded sample count when the transcoder had to run.
//!
//! Completion is detected by polling the sink: an empty sink means the
//! track finished. There is deliberately no secondary duration timer.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};
use lofty::file::AudioFile;
use log::{debug, warn};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tempfile::NamedTempFile;

use super::backend::{BackendError, PlaybackBackend};

/// Playback backend that mixes through the default `rodio` output stream.
pub struct RodioBackend {
    stream: OutputStream,
    sink: Option<Sink>,
    source_path: Option<PathBuf>,
    playback_path: Option<PathBuf>,
    // Keeps the transcoded WAV alive; dropping it removes the file.
    transcoded: Option<NamedTempFile>,
    duration: Option<Duration>,
    volume: f32,
}

impl RodioBackend {
    /// Open the default output stream. Fails when the host has no usable
    /// audio device, in which case the caller downgrades to the null backend.
    pub fn new() -> Result<Self, BackendError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| BackendError::OutputUnavailable(e.to_string()))?;
        // rodio logs to stderr when OutputStream is dropped. That's useful in
        // debugging, but noisy for an embedding application.
        stream.log_on_drop(false);

        Ok(Self {
            stream,
            sink: None,
            source_path: None,
            playback_path: None,
            transcoded: None,
            duration: None,
            volume: 1.0,
        })
    }

    fn cleanup_temp(&mut self) {
        // NamedTempFile removes the file on drop; removal errors are ignored.
        self.transcoded = None;
        self.playback_path = None;
    }

    /// Decide whether `rodio` can decode the file as-is.
    fn natively_decodable(path: &Path) -> bool {
        File::open(path)
            .ok()
            .and_then(|f| Decoder::new(BufReader::new(f)).ok())
            .is_some()
    }
}

impl PlaybackBackend for RodioBackend {
    fn name(&self) -> &'static str {
        "rodio"
    }

    fn load(&mut self, path: &Path) -> Result<(), BackendError> {
        if !path.exists() {
            return Err(BackendError::FileNotFound(path.to_path_buf()));
        }
        self.stop();
        self.cleanup_temp();
        self.source_path = Some(path.to_path_buf());

        self.duration = lofty::read_from_path(path)
            .ok()
            .map(|tagged| tagged.properties().duration());

        if Self::natively_decodable(path) {
            self.playback_path = Some(path.to_path_buf());
        } else {
            let (tmp, decoded_duration) = transcode_to_wav(path)?;
            self.playback_path = Some(tmp.path().to_path_buf());
            self.transcoded = Some(tmp);
            if self.duration.is_none() {
                self.duration = Some(decoded_duration);
            }
        }

        debug!(
            "rodio backend: loaded {:?} (duration {:?})",
            path, self.duration
        );
        Ok(())
    }

    fn play(&mut self, looped: bool) -> Result<(), BackendError> {
        let stale = self
            .playback_path
            .as_ref()
            .is_none_or(|p| !p.exists());
        if stale {
            // The prepared file may have been cleaned up; reload from source.
            match self.source_path.clone() {
                Some(source) => self.load(&source)?,
                None => return Err(BackendError::NoTrackLoaded),
            }
        }
        let path = self
            .playback_path
            .clone()
            .ok_or(BackendError::NoTrackLoaded)?;

        let file = File::open(&path).map_err(|e| BackendError::Play(e.to_string()))?;
        let source =
            Decoder::new(BufReader::new(file)).map_err(|e| BackendError::Play(e.to_string()))?;

        self.stop();
        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_volume(self.volume);
        if looped {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source);
        }
        sink.play();
        self.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn is_active(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| !s.empty())
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), BackendError> {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = self.sink.as_ref() {
            sink.set_volume(self.volume);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.stop();
        self.cleanup_temp();
    }

    fn supports_polling(&self) -> bool {
        true
    }
}

/// Decode `path` with symphonia and re-encode it as a PCM16 WAV temp file.
///
/// Returns the temp file (the file is deleted when it is dropped) and the
/// duration computed from the decoded sample count.
pub(super) fn transcode_to_wav(path: &Path) -> Result<(NamedTempFile, Duration), BackendError> {
    let file = File::open(path).map_err(|e| BackendError::UnsupportedFormat(e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| BackendError::UnsupportedFormat(e.to_string()))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| BackendError::UnsupportedFormat("no audio track".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| BackendError::UnsupportedFormat(e.to_string()))?;

    let tmp = tempfile::Builder::new()
        .prefix("bardbox_audio_")
        .suffix(".wav")
        .tempfile()
        .map_err(|e| BackendError::Transcode(e.to_string()))?;

    // The WAV spec is only known once the first packet has been decoded,
    // so the writer is created lazily.
    let mut writer: Option<WavWriter<std::io::BufWriter<File>>> = None;
    let mut sample_rate = 0u32;
    let mut frames = 0u64;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(BackendError::UnsupportedFormat(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // Recoverable; skip the bad packet.
                warn!("transcode: dropping undecodable packet in {:?}: {e}", path);
                continue;
            }
            Err(e) => return Err(BackendError::UnsupportedFormat(e.to_string())),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        let mut samples = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        samples.copy_interleaved_ref(decoded);

        if writer.is_none() {
            sample_rate = spec.rate;
            let wav_spec = WavSpec {
                channels: channels as u16,
                sample_rate: spec.rate,
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            };
            writer = Some(
                WavWriter::create(tmp.path(), wav_spec)
                    .map_err(|e| BackendError::Transcode(e.to_string()))?,
            );
        }
        if let Some(w) = writer.as_mut() {
            for sample in samples.samples() {
                let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                w.write_sample(value)
                    .map_err(|e| BackendError::Transcode(e.to_string()))?;
            }
        }
        if channels > 0 {
            frames += (samples.samples().len() / channels) as u64;
        }
    }

    match writer {
        Some(w) => w
            .finalize()
            .map_err(|e| BackendError::Transcode(e.to_string()))?,
        None => {
            return Err(BackendError::UnsupportedFormat(
                "no decodable audio data".to_string(),
            ));
        }
    }

    let duration = if sample_rate > 0 {
        Duration::from_secs_f64(frames as f64 / sample_rate as f64)
    } else {
        Duration::ZERO
    };
    Ok((tmp, duration))
}

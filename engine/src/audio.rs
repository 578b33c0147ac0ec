use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use serde::{Deserialize, Serialize};

use crate::net::HttpClient;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("decode failed: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),
    #[error("no output device: {0}")]
    Device(String),
    #[error("playback failed: {0}")]
    Playback(String),
}

/// Mirrors the browser audio-context lifecycle: output starts suspended and
/// only begins after an explicit user gesture resumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioState {
    Suspended,
    Running,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipSource {
    pub name: String,
    pub url: String,
}

impl ClipSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Encoded bytes of a clip that are known to decode.
#[derive(Clone)]
pub struct Clip {
    bytes: Arc<[u8]>,
}

impl fmt::Debug for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clip").field("len", &self.bytes.len()).finish()
    }
}

impl Clip {
    pub fn decode(bytes: Vec<u8>) -> Result<Self, AudioError> {
        let bytes: Arc<[u8]> = bytes.into();
        Decoder::new(Cursor::new(bytes.clone()))?;
        Ok(Self { bytes })
    }

    /// Mono 16-bit PCM, e.g. a generated beep.
    pub fn from_pcm16(sample_rate: u32, samples: &[i16]) -> Result<Self, AudioError> {
        Self::decode(pcm16_wav(sample_rate, samples))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn source(&self) -> Result<Decoder<Cursor<Arc<[u8]>>>, AudioError> {
        Ok(Decoder::new(Cursor::new(self.bytes.clone()))?)
    }
}

pub trait AudioOutput {
    fn play(&self, name: &str, clip: &Clip) -> Result<(), AudioError>;
}

/// Plays clips on the default output device, one detached sink per cue.
pub struct RodioOutput {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    volume: f32,
}

impl RodioOutput {
    pub fn try_default(volume: f32) -> Result<Self, AudioError> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| AudioError::Device(e.to_string()))?;
        Ok(Self {
            _stream: stream,
            handle,
            volume: volume.clamp(0.0, 1.0),
        })
    }
}

impl AudioOutput for RodioOutput {
    fn play(&self, _name: &str, clip: &Clip) -> Result<(), AudioError> {
        let sink = Sink::try_new(&self.handle).map_err(|e| AudioError::Playback(e.to_string()))?;
        sink.set_volume(self.volume);
        sink.append(clip.source()?);
        sink.detach();
        Ok(())
    }
}

/// Remembers which clips were played; for tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    played: Arc<Mutex<Vec<String>>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<String> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn take(&self) -> Vec<String> {
        self.played
            .lock()
            .map(|mut p| std::mem::take(&mut *p))
            .unwrap_or_default()
    }
}

impl AudioOutput for RecordingOutput {
    fn play(&self, name: &str, _clip: &Clip) -> Result<(), AudioError> {
        if let Ok(mut played) = self.played.lock() {
            played.push(name.to_string());
        }
        Ok(())
    }
}

/// Named clips, loaded once and played fire-and-forget.
pub struct SoundBank {
    clips: HashMap<String, Clip>,
    state: AudioState,
    output: Option<Box<dyn AudioOutput>>,
    http: Option<HttpClient>,
}

impl fmt::Debug for SoundBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.clips.keys().collect();
        names.sort();
        f.debug_struct("SoundBank")
            .field("clips", &names)
            .field("state", &self.state)
            .field("has_output", &self.output.is_some())
            .finish()
    }
}

impl Default for SoundBank {
    fn default() -> Self {
        Self::silent()
    }
}

impl SoundBank {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self {
            clips: HashMap::new(),
            state: AudioState::Suspended,
            output: Some(output),
            http: None,
        }
    }

    /// A bank with no output device; `play` is always a quiet no-op.
    pub fn silent() -> Self {
        Self {
            clips: HashMap::new(),
            state: AudioState::Suspended,
            output: None,
            http: None,
        }
    }

    pub fn with_http(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    pub fn state(&self) -> AudioState {
        self.state
    }

    pub fn resume(&mut self) {
        if self.state == AudioState::Suspended {
            self.state = AudioState::Running;
            tracing::debug!("audio resumed");
        }
    }

    pub fn suspend(&mut self) {
        if self.state == AudioState::Running {
            self.state = AudioState::Suspended;
        }
    }

    pub fn close(&mut self) {
        self.state = AudioState::Closed;
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, clip: Clip) {
        self.clips.insert(name.into(), clip);
    }

    /// Fetches and decodes `url` under `name`. Failures are logged and leave
    /// that name unplayable.
    pub async fn load(&mut self, name: &str, url: &str) {
        let clip = match self.fetch(url).await {
            Ok(bytes) => Clip::decode(bytes),
            Err(err) => Err(err),
        };
        match clip {
            Ok(clip) => {
                tracing::debug!(name, url, bytes = clip.len(), "sound loaded");
                self.clips.insert(name.to_string(), clip);
            }
            Err(err) => tracing::error!(name, url, "error loading sound: {err}"),
        }
    }

    pub async fn load_all(&mut self, sources: &[ClipSource]) {
        for source in sources {
            self.load(&source.name, &source.url).await;
        }
        let loaded = sources.iter().filter(|s| self.is_loaded(&s.name)).count();
        tracing::info!(loaded, requested = sources.len(), "sound loading attempted");
    }

    pub fn play(&self, name: &str) {
        let Some(clip) = self.clips.get(name) else {
            tracing::warn!("sound buffer not found for: {name}");
            return;
        };
        if self.state != AudioState::Running {
            tracing::warn!("audio state is {:?}; cannot play sound {name}", self.state);
            return;
        }
        let Some(output) = self.output.as_ref() else {
            tracing::trace!("no audio output; dropping {name}");
            return;
        };
        if let Err(err) = output.play(name, clip) {
            tracing::error!("error playing sound {name}: {err}");
        }
    }

    async fn fetch(&mut self, url: &str) -> Result<Vec<u8>, AudioError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            if self.http.is_none() {
                let client = HttpClient::new().map_err(|e| AudioError::Fetch(e.to_string()))?;
                self.http = Some(client);
            }
            let Some(http) = self.http.as_ref() else {
                return Err(AudioError::Fetch("no http client".to_string()));
            };
            let resp = http
                .get(url, &[])
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| AudioError::Fetch(e.to_string()))?;
            return Ok(resp.body.to_vec());
        }

        let path = url.strip_prefix("file://").unwrap_or(url);
        tokio::fs::read(path)
            .await
            .map_err(|e| AudioError::Fetch(format!("{path}: {e}")))
    }
}

/// Wraps mono 16-bit samples in a minimal RIFF/WAVE container.
pub fn pcm16_wav(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut out = Vec::with_capacity(44 + samples.len() * 2);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVEfmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

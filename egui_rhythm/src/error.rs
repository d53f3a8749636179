//! 错误类型
//!
//! 加载失败、音频设备和鼓组配置各有独立的错误枚举。

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 单个乐器的音频加载失败。只影响该乐器本身。
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read audio file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to decode audio file {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: rodio::decoder::DecoderError,
    },

    #[error("Audio file {0:?} contains no samples")]
    Empty(PathBuf),

    #[error("Loader worker for {0:?} failed")]
    Worker(PathBuf),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Failed to open audio output: {0}")]
    Stream(#[from] rodio::StreamError),

    #[error("Failed to create playback sink: {0}")]
    Sink(#[from] rodio::PlayError),

    #[error("Audio output has not been activated")]
    Inactive,
}

#[derive(Debug, Error)]
pub enum KitError {
    #[error("Kit file I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Kit file JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Kit contains no instruments")]
    Empty,

    #[error("Duplicate instrument name: {0}")]
    DuplicateInstrument(String),

    #[error("Instrument {name} has trigger beat {beat} outside 1..={max}")]
    InvalidBeat { name: String, beat: u8, max: u8 },

    #[error("Invalid tempo: {0} BPM")]
    InvalidTempo(f32),

    #[error("Invalid master volume: {0}")]
    InvalidVolume(f32),
}

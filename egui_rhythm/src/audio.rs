//! 循环播放后端
//!
//! 解码、输出设备和逐乐器的增益控制都放在 [`LoopBackend`] 之后，
//! 混音器核心只和这两个 trait 打交道。

use crate::error::{AudioError, LoadError};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::cell::OnceCell;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

/// 宿主可替换的循环播放后端。
pub trait LoopBackend {
    /// 打开输出设备。需要在用户手势之后调用，重复调用无副作用。
    fn activate(&mut self) -> Result<(), AudioError>;

    fn is_active(&self) -> bool;

    /// 为已解码的循环创建播放句柄
    fn create_voice(&mut self, decoded: DecodedLoop) -> Box<dyn LoopVoice>;
}

/// 单个乐器的循环播放句柄。
pub trait LoopVoice {
    /// 从循环内的 `offset` 处（重新）开始播放
    fn start(&mut self, offset: Duration) -> Result<(), AudioError>;

    fn pause(&mut self);

    /// 设置增益 (0.0 - 1.0)
    fn set_gain(&mut self, gain: f32);

    fn gain(&self) -> f32;

    fn is_playing(&self) -> bool;

    fn loop_duration(&self) -> Duration;
}

/// 解码后的交错 f32 采样，克隆代价很低。
#[derive(Clone, Debug)]
pub struct DecodedLoop {
    samples: Arc<[f32]>,
    channels: u16,
    sample_rate: u32,
}

impl DecodedLoop {
    pub fn from_samples(channels: u16, sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            samples: samples.into(),
            channels: channels.max(1),
            sample_rate: sample_rate.max(1),
        }
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }

    /// 偏移量对应的帧序号（按循环长度取模）
    pub fn frame_at(&self, offset: Duration) -> usize {
        let frames = self.frame_count();
        if frames == 0 {
            return 0;
        }
        (offset.as_secs_f64() * self.sample_rate as f64) as usize % frames
    }
}

/// 解码 rodio 支持的任意格式
pub fn decode_file(path: &Path) -> Result<DecodedLoop, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let decoder = Decoder::new(BufReader::new(file)).map_err(|source| LoadError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let channels = decoder.channels();
    let sample_rate = decoder.sample_rate();
    let samples: Vec<f32> = decoder.convert_samples::<f32>().collect();

    let decoded = DecodedLoop::from_samples(channels, sample_rate, samples);
    if decoded.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }

    log::debug!(
        "Decoded {:?}: {} frames, {} ch, {} Hz",
        path,
        decoded.frame_count(),
        channels,
        sample_rate
    );
    Ok(decoded)
}

/// 无限循环的音频源，可以从任意帧开始
pub struct LoopingSource {
    data: DecodedLoop,
    cursor: usize,
}

impl LoopingSource {
    pub fn starting_at(data: DecodedLoop, offset: Duration) -> Self {
        let cursor = data.frame_at(offset) * data.channels as usize;
        Self { data, cursor }
    }
}

impl Iterator for LoopingSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.data.frame_count() * self.data.channels as usize;
        if len == 0 {
            return None;
        }
        let sample = self.data.samples[self.cursor];
        self.cursor = (self.cursor + 1) % len;
        Some(sample)
    }
}

impl Source for LoopingSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.data.channels
    }

    fn sample_rate(&self) -> u32 {
        self.data.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// 默认的 rodio 后端：每个乐器一个 `Sink`，共用一个输出设备。
pub struct RodioBackend {
    _stream: Option<OutputStream>,
    output: Rc<OnceCell<OutputStreamHandle>>,
}

impl RodioBackend {
    pub fn new() -> Self {
        Self {
            _stream: None,
            output: Rc::new(OnceCell::new()),
        }
    }
}

impl Default for RodioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopBackend for RodioBackend {
    fn activate(&mut self) -> Result<(), AudioError> {
        if self.output.get().is_some() {
            return Ok(());
        }
        let (stream, handle) = OutputStream::try_default()?;
        let _ = self.output.set(handle);
        self._stream = Some(stream);
        log::info!("Audio output activated");
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.output.get().is_some()
    }

    fn create_voice(&mut self, decoded: DecodedLoop) -> Box<dyn LoopVoice> {
        Box::new(RodioVoice {
            output: Rc::clone(&self.output),
            decoded,
            sink: None,
            gain: 1.0,
        })
    }
}

struct RodioVoice {
    output: Rc<OnceCell<OutputStreamHandle>>,
    decoded: DecodedLoop,
    sink: Option<Sink>,
    gain: f32,
}

impl LoopVoice for RodioVoice {
    fn start(&mut self, offset: Duration) -> Result<(), AudioError> {
        let handle = self.output.get().ok_or(AudioError::Inactive)?;
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        let sink = Sink::try_new(handle)?;
        sink.set_volume(self.gain);
        sink.append(LoopingSource::starting_at(self.decoded.clone(), offset));
        self.sink = Some(sink);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.gain);
        }
    }

    fn gain(&self) -> f32 {
        self.gain
    }

    fn is_playing(&self) -> bool {
        self.sink.as_ref().is_some_and(|sink| !sink.is_paused())
    }

    fn loop_duration(&self) -> Duration {
        self.decoded.duration()
    }
}

/// 空实现，允许宿主禁用音频输出。句柄只记录状态。
#[derive(Default)]
pub struct NullBackend {
    active: bool,
}

impl LoopBackend for NullBackend {
    fn activate(&mut self) -> Result<(), AudioError> {
        self.active = true;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn create_voice(&mut self, decoded: DecodedLoop) -> Box<dyn LoopVoice> {
        Box::new(NullVoice {
            duration: decoded.duration(),
            gain: 1.0,
            playing: false,
        })
    }
}

struct NullVoice {
    duration: Duration,
    gain: f32,
    playing: bool,
}

impl LoopVoice for NullVoice {
    fn start(&mut self, _offset: Duration) -> Result<(), AudioError> {
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
    }

    fn gain(&self) -> f32 {
        self.gain
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn loop_duration(&self) -> Duration {
        self.duration
    }
}

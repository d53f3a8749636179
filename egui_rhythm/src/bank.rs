//! 播放器组
//!
//! 每个乐器一个循环句柄，外加状态表和按钮表。三张表都以 [`InstrumentId`] 为键，
//! 按注册表顺序排列。

use crate::audio::LoopVoice;
use crate::structure::{ControlState, InstrumentId, InstrumentRegistry, LoadStatus, PlayerState};
use crate::transport::loop_offset;
use std::collections::BTreeMap;

pub struct PlayerBank {
    states: BTreeMap<InstrumentId, PlayerState>,
    controls: BTreeMap<InstrumentId, ControlState>,
    voices: BTreeMap<InstrumentId, Box<dyn LoopVoice>>,
    master_volume: f32,
}

impl PlayerBank {
    pub fn new(registry: &InstrumentRegistry, master_volume: f32) -> Self {
        let states = registry
            .iter()
            .map(|(id, instrument)| (id, PlayerState::pending(instrument.name.clone())))
            .collect();
        let controls = registry
            .iter()
            .map(|(id, _)| (id, ControlState::default()))
            .collect();

        Self {
            states,
            controls,
            voices: BTreeMap::new(),
            master_volume: clamp_level(master_volume),
        }
    }

    /// 挂上加载成功的句柄：启用按钮、取消静音
    pub fn attach(&mut self, id: InstrumentId, voice: Box<dyn LoopVoice>) -> bool {
        let Some(state) = self.states.get_mut(&id) else {
            return false;
        };
        if state.status != LoadStatus::Pending {
            log::warn!("Ignoring duplicate load result for {}", state.name);
            return false;
        }
        state.status = LoadStatus::Loaded;
        state.muted = false;
        state.is_playing = false;

        self.controls.insert(id, ControlState { enabled: true, lit: true });
        self.voices.insert(id, voice);
        self.apply_gain(id);
        true
    }

    /// 加载失败：永久静音并禁用按钮
    pub fn mark_failed(&mut self, id: InstrumentId) -> bool {
        let Some(state) = self.states.get_mut(&id) else {
            return false;
        };
        if state.status != LoadStatus::Pending {
            return false;
        }
        state.status = LoadStatus::Failed;
        state.muted = true;
        state.is_playing = false;
        self.controls.insert(id, ControlState { enabled: false, lit: false });
        true
    }

    /// 切换静音，返回新的静音状态；未加载的乐器不受影响
    pub fn toggle_mute(&mut self, id: InstrumentId) -> Option<bool> {
        let state = self.states.get_mut(&id)?;
        if !state.loaded() {
            return None;
        }
        state.muted = !state.muted;
        let muted = state.muted;

        if let Some(control) = self.controls.get_mut(&id) {
            control.lit = !muted;
        }
        self.apply_gain(id);
        Some(muted)
    }

    pub fn set_master_volume(&mut self, level: f32) -> f32 {
        self.master_volume = clamp_level(level);
        let ids: Vec<InstrumentId> = self.voices.keys().copied().collect();
        for id in ids {
            self.apply_gain(id);
        }
        self.master_volume
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// 启动所有已加载、未静音且未在播放的乐器，返回实际启动的乐器
    pub fn start_ready(&mut self, position: f64) -> Vec<InstrumentId> {
        let ready: Vec<InstrumentId> = self
            .states
            .iter()
            .filter(|(_, s)| s.loaded() && !s.muted && !s.is_playing)
            .map(|(id, _)| *id)
            .collect();

        ready
            .into_iter()
            .filter(|id| self.start_one(*id, position))
            .collect()
    }

    /// 从时钟对应的循环位置启动单个乐器
    pub fn start_one(&mut self, id: InstrumentId, position: f64) -> bool {
        let (Some(state), Some(voice)) = (self.states.get_mut(&id), self.voices.get_mut(&id)) else {
            return false;
        };
        let offset = loop_offset(position, voice.loop_duration());
        match voice.start(offset) {
            Ok(()) => {
                state.is_playing = voice.is_playing();
                log::debug!("Started {} at loop offset {:?}", state.name, offset);
                state.is_playing
            }
            Err(e) => {
                log::error!("Failed to start {}: {}", state.name, e);
                state.is_playing = false;
                false
            }
        }
    }

    pub fn pause_all(&mut self) {
        for (id, voice) in self.voices.iter_mut() {
            if voice.is_playing() {
                voice.pause();
            }
            if let Some(state) = self.states.get_mut(id) {
                state.is_playing = voice.is_playing();
            }
        }
    }

    fn apply_gain(&mut self, id: InstrumentId) {
        let muted = self.states.get(&id).map_or(true, |s| s.muted);
        if let Some(voice) = self.voices.get_mut(&id) {
            voice.set_gain(if muted { 0.0 } else { self.master_volume });
        }
    }

    pub fn state(&self, id: InstrumentId) -> Option<&PlayerState> {
        self.states.get(&id)
    }

    pub fn control(&self, id: InstrumentId) -> ControlState {
        self.controls.get(&id).copied().unwrap_or_default()
    }

    pub fn states(&self) -> impl Iterator<Item = (InstrumentId, &PlayerState)> {
        self.states.iter().map(|(id, state)| (*id, state))
    }

    /// 句柄当前的实际增益；未加载时为 None
    pub fn voice_gain(&self, id: InstrumentId) -> Option<f32> {
        self.voices.get(&id).map(|v| v.gain())
    }

    pub fn count(&self, status: LoadStatus) -> usize {
        self.states.values().filter(|s| s.status == status).count()
    }

    pub fn playing_count(&self) -> usize {
        self.states.values().filter(|s| s.is_playing).count()
    }
}

/// 音量限制在 0..=1，非有限值按静音处理
fn clamp_level(level: f32) -> f32 {
    if level.is_finite() {
        level.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

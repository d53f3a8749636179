//! 数据结构模块
//!
//! 定义乐器注册表、播放器状态和节拍计数器。

use crate::error::KitError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// 每个节奏循环的拍数（八分音符）
pub const BEATS_PER_CYCLE: u8 = 8;

/// 注册表中的乐器序号，决定界面上的排列顺序。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentId(pub usize);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    /// 相对于素材目录的音频文件路径
    pub source: PathBuf,
    /// 触发拍位（1..=8），仅作展示；循环是连续播放的
    #[serde(default)]
    pub trigger_beats: Vec<u8>,
}

impl Instrument {
    pub fn new(name: impl Into<String>, trigger_beats: &[u8]) -> Self {
        let name = name.into();
        Self {
            source: PathBuf::from(format!("{}.wav", name)),
            name,
            trigger_beats: trigger_beats.to_vec(),
        }
    }
}

/// 进程启动时确定的乐器列表，之后不可变。
#[derive(Clone, Debug)]
pub struct InstrumentRegistry {
    instruments: Vec<Instrument>,
}

impl InstrumentRegistry {
    pub fn new(instruments: Vec<Instrument>) -> Result<Self, KitError> {
        if instruments.is_empty() {
            return Err(KitError::Empty);
        }

        let mut seen = HashSet::new();
        for instrument in &instruments {
            if !seen.insert(instrument.name.as_str()) {
                return Err(KitError::DuplicateInstrument(instrument.name.clone()));
            }
            if let Some(&beat) = instrument
                .trigger_beats
                .iter()
                .find(|&&b| b == 0 || b > BEATS_PER_CYCLE)
            {
                return Err(KitError::InvalidBeat {
                    name: instrument.name.clone(),
                    beat,
                    max: BEATS_PER_CYCLE,
                });
            }
        }

        Ok(Self { instruments })
    }

    /// 内置的九件套鼓组
    pub fn default_kit() -> Self {
        Self {
            instruments: default_instruments(),
        }
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn get(&self, id: InstrumentId) -> Option<&Instrument> {
        self.instruments.get(id.0)
    }

    /// 按名称查找乐器序号
    pub fn find(&self, name: &str) -> Option<InstrumentId> {
        self.instruments
            .iter()
            .position(|i| i.name == name)
            .map(InstrumentId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstrumentId, &Instrument)> {
        self.instruments
            .iter()
            .enumerate()
            .map(|(index, instrument)| (InstrumentId(index), instrument))
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }
}

pub(crate) fn default_instruments() -> Vec<Instrument> {
    vec![
        Instrument::new("kick", &[1, 5]),
        Instrument::new("snare", &[3, 7]),
        Instrument::new("clap", &[3, 7]),
        Instrument::new("hihat", &[1, 2, 3, 4, 5, 6, 7, 8]),
        Instrument::new("openhat", &[8]),
        Instrument::new("tom", &[6]),
        Instrument::new("shaker", &[2, 4, 6, 8]),
        Instrument::new("bass", &[1, 4, 7]),
        Instrument::new("chords", &[1]),
    ]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Pending,
    Loaded,
    Failed,
}

/// 每个乐器一份，进程生命周期内一直存在
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerState {
    pub name: String,
    pub status: LoadStatus,
    pub muted: bool,
    pub is_playing: bool,
}

impl PlayerState {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: LoadStatus::Pending,
            muted: false,
            is_playing: false,
        }
    }

    pub fn loaded(&self) -> bool {
        self.status == LoadStatus::Loaded
    }
}

/// 乐器按钮的显示状态
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlState {
    pub enabled: bool,
    /// 点亮表示有声
    pub lit: bool,
}

/// 1..=8 循环的拍计数器；第一次推进之前没有当前拍。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BeatCounter {
    value: u8,
}

impl BeatCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<u8> {
        (self.value != 0).then_some(self.value)
    }

    /// 推进一拍，返回新的当前拍
    pub fn advance(&mut self) -> u8 {
        self.value = self.value % BEATS_PER_CYCLE + 1;
        self.value
    }
}

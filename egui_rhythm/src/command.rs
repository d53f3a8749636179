//! 命令和事件模块
//!
//! 界面适配层只通过命令驱动混音器，再通过事件得知状态变化。

use crate::structure::InstrumentId;

#[derive(Clone, Debug, PartialEq)]
pub enum MixerCommand {
    ToggleMute {
        name: String,
    },
    TogglePlay,
    SetVolume {
        level: f32,
    },
    DismissNotice,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MixerEvent {
    InstrumentLoaded {
        id: InstrumentId,
    },
    InstrumentFailed {
        id: InstrumentId,
        reason: String,
    },
    MuteChanged {
        id: InstrumentId,
        muted: bool,
    },
    PlaybackStateChanged {
        is_playing: bool,
    },
    VolumeChanged {
        level: f32,
    },
    BeatChanged {
        previous: Option<u8>,
        current: u8,
    },
}

/// 需要用户确认的提示
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

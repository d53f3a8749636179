//! # egui_rhythm
//!
//! 多轨节奏循环混音器：一组固定的乐器循环按共享主时钟同步播放，
//! 支持逐乐器静音、主音量和 8 拍节拍指示。
//!
//! ## 功能特性
//!
//! - **后台加载**：每个乐器在独立线程解码，单个失败不影响其他乐器
//! - **走带控制**：播放/暂停共享主时钟，所有循环按时钟位置对齐
//! - **静音与主音量**：静音只改变增益，循环相位保持不变
//! - **节拍指示**：每个八分音符推进一格，1..8 循环
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use egui_rhythm::{KitFile, MixerCommand, RhythmMixer, RodioBackend};
//!
//! let mut mixer = RhythmMixer::new(KitFile::default(), Box::new(RodioBackend::new()))?;
//! mixer.load_all();
//!
//! // 每帧调用
//! mixer.update(0.0);
//! mixer.execute_command(MixerCommand::TogglePlay);
//! # Ok::<(), egui_rhythm::KitError>(())
//! ```
//!
//! ## 集成到宿主应用
//!
//! ```rust,ignore
//! let mut commands = Vec::new();
//! view.ui(ui, &mixer, &mut |cmd| commands.push(cmd));
//! for cmd in commands {
//!     mixer.execute_command(cmd);
//! }
//! ```

pub mod audio;
pub mod bank;
pub mod beat;
pub mod command;
pub mod error;
pub mod kit;
pub mod loader;
pub mod mixer;
pub mod structure;
pub mod transport;
pub mod ui;

pub use audio::{DecodedLoop, LoopBackend, LoopVoice, NullBackend, RodioBackend};
pub use command::{MixerCommand, MixerEvent, Notice};
pub use error::{AudioError, KitError, LoadError};
pub use kit::{KitFile, NoticeMode};
pub use mixer::RhythmMixer;
pub use structure::{Instrument, InstrumentId, InstrumentRegistry, LoadStatus, PlayerState};
pub use ui::{MixerView, MixerViewOptions};

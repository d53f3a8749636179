//! 鼓组配置文件模块
//!
//! 处理鼓组 JSON 文件的加载和保存：速度、主音量、提示方式和乐器列表。

use crate::error::KitError;
use crate::structure::{default_instruments, Instrument, InstrumentRegistry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 加载失败时如何通知用户
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeMode {
    /// 只写日志
    Log,
    /// 写日志并弹出可关闭的消息框
    #[default]
    MessageBox,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KitFile {
    pub version: String,
    #[serde(default = "default_bpm")]
    pub bpm: f32,
    #[serde(default = "default_master_volume")]
    pub master_volume: f32,
    #[serde(default)]
    pub notice_mode: NoticeMode,
    /// 素材目录；相对路径以鼓组文件所在目录为基准
    #[serde(default = "default_asset_dir")]
    pub asset_dir: PathBuf,
    pub instruments: Vec<Instrument>,
    /// 鼓组文件所在目录，不写入文件
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

fn default_bpm() -> f32 {
    120.0
}

fn default_master_volume() -> f32 {
    0.8
}

fn default_asset_dir() -> PathBuf {
    PathBuf::from("assets")
}

impl Default for KitFile {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            bpm: default_bpm(),
            master_volume: default_master_volume(),
            notice_mode: NoticeMode::default(),
            asset_dir: default_asset_dir(),
            instruments: default_instruments(),
            base_dir: None,
        }
    }
}

impl KitFile {
    /// 从指定路径加载鼓组，记录所在目录以便解析相对素材目录
    pub fn load_from_path(path: &Path) -> Result<Self, KitError> {
        let json_content = fs::read_to_string(path)?;
        let mut kit: KitFile = serde_json::from_str(&json_content)?;
        kit.validate()?;

        kit.base_dir = Some(path.parent().unwrap_or(Path::new(".")).to_path_buf());
        kit.master_volume = kit.master_volume.clamp(0.0, 1.0);

        log::info!(
            "Kit loaded: {:?} ({} instruments, {} BPM)",
            path,
            kit.instruments.len(),
            kit.bpm
        );
        Ok(kit)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), KitError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json_content = serde_json::to_string_pretty(self)?;
        fs::write(path, json_content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), KitError> {
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(KitError::InvalidTempo(self.bpm));
        }
        if !self.master_volume.is_finite() {
            return Err(KitError::InvalidVolume(self.master_volume));
        }
        self.registry().map(|_| ())
    }

    pub fn registry(&self) -> Result<InstrumentRegistry, KitError> {
        InstrumentRegistry::new(self.instruments.clone())
    }

    /// 实际使用的素材目录；相对路径以鼓组文件所在目录为基准
    pub fn resolved_asset_dir(&self) -> PathBuf {
        match &self.base_dir {
            Some(base) if self.asset_dir.is_relative() => base.join(&self.asset_dir),
            _ => self.asset_dir.clone(),
        }
    }

    /// 乐器音频文件的完整路径
    pub fn source_path(&self, instrument: &Instrument) -> PathBuf {
        self.resolved_asset_dir().join(&instrument.source)
    }
}

//! 节拍指示器
//!
//! 每个 tick 推进一拍，并保证任意时刻至多一个指示格处于“当前”状态。

use crate::structure::{BeatCounter, BEATS_PER_CYCLE};

/// 一次节拍切换
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BeatChange {
    pub previous: Option<u8>,
    pub current: u8,
}

#[derive(Clone, Debug)]
pub struct BeatIndicator {
    counter: BeatCounter,
    cells: [bool; BEATS_PER_CYCLE as usize],
}

impl Default for BeatIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl BeatIndicator {
    pub fn new() -> Self {
        Self {
            counter: BeatCounter::new(),
            cells: [false; BEATS_PER_CYCLE as usize],
        }
    }

    pub fn on_tick(&mut self) -> BeatChange {
        let previous = self.counter.current();
        if let Some(prev) = previous {
            self.cells[prev as usize - 1] = false;
        }
        let current = self.counter.advance();
        self.cells[current as usize - 1] = true;
        BeatChange { previous, current }
    }

    pub fn current(&self) -> Option<u8> {
        self.counter.current()
    }

    /// 指示格是否为当前拍，beat 从 1 开始
    pub fn is_current(&self, beat: u8) -> bool {
        beat >= 1 && beat <= BEATS_PER_CYCLE && self.cells[beat as usize - 1]
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }
}

//! 主时钟与走带控制
//!
//! 时钟由宿主每帧传入单调递增的秒数推进，以八分音符为单位产生 tick。

use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Running,
}

/// 共享主时钟。暂停期间的时间不计入位置。
#[derive(Clone, Debug)]
pub struct MasterClock {
    bpm: f32,
    position: f64,           // 走带位置（秒）
    last_update: Option<f64>, // 上次推进时的宿主时间，None 表示暂停
    ticks_fired: u64,
}

impl MasterClock {
    pub fn new(bpm: f32) -> Self {
        Self {
            bpm: bpm.max(1.0),
            position: 0.0,
            last_update: None,
            ticks_fired: 0,
        }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// 一个八分音符的时长（秒）
    pub fn tick_interval(&self) -> f64 {
        60.0 / self.bpm as f64 / 2.0
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn ticks_fired(&self) -> u64 {
        self.ticks_fired
    }

    pub fn is_running(&self) -> bool {
        self.last_update.is_some()
    }

    pub fn start(&mut self, now: f64) {
        if self.last_update.is_none() {
            self.last_update = Some(now);
        }
    }

    /// 冻结在当前位置
    pub fn pause(&mut self, now: f64) {
        self.advance_position(now);
        self.last_update = None;
    }

    /// 推进时钟并返回新到期的 tick 数。tick k 位于 k * interval。
    pub fn advance(&mut self, now: f64) -> u32 {
        if !self.is_running() {
            return 0;
        }
        self.advance_position(now);

        let interval = self.tick_interval();
        let mut due = 0;
        while self.ticks_fired as f64 * interval <= self.position {
            self.ticks_fired += 1;
            due += 1;
        }
        due
    }

    fn advance_position(&mut self, now: f64) {
        if let Some(last) = self.last_update {
            // 宿主时间不应倒退，倒退时按零处理
            self.position += (now - last).max(0.0);
            self.last_update = Some(now);
        }
    }
}

/// 两态走带：STOPPED / RUNNING
#[derive(Clone, Debug)]
pub struct Transport {
    state: TransportState,
    clock: MasterClock,
}

impl Transport {
    pub fn new(bpm: f32) -> Self {
        Self {
            state: TransportState::Stopped,
            clock: MasterClock::new(bpm),
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TransportState::Running
    }

    pub fn clock(&self) -> &MasterClock {
        &self.clock
    }

    pub fn start(&mut self, now: f64) {
        self.state = TransportState::Running;
        self.clock.start(now);
        log::info!("Transport started at {:.3}s", self.clock.position());
    }

    pub fn pause(&mut self, now: f64) {
        self.clock.pause(now);
        self.state = TransportState::Stopped;
        log::info!("Transport paused at {:.3}s", self.clock.position());
    }

    /// 返回新到期的 tick 数；停止时恒为 0
    pub fn advance(&mut self, now: f64) -> u32 {
        if self.state == TransportState::Running {
            self.clock.advance(now)
        } else {
            0
        }
    }
}

/// 时钟位置在给定循环内对应的偏移
pub fn loop_offset(position: f64, loop_len: Duration) -> Duration {
    let len = loop_len.as_secs_f64();
    if len <= 0.0 || position <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(position % len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_are_eighth_notes() {
        // 120 BPM：八分音符 = 0.25 秒
        let mut clock = MasterClock::new(120.0);
        assert_eq!(clock.tick_interval(), 0.25);

        clock.start(10.0);
        assert_eq!(clock.advance(10.0), 1); // tick 0 在起点
        assert_eq!(clock.advance(10.2), 0);
        assert_eq!(clock.advance(10.25), 1);
        assert_eq!(clock.advance(11.0), 3);
        assert_eq!(clock.ticks_fired(), 5);
    }

    #[test]
    fn paused_time_does_not_count() {
        let mut transport = Transport::new(120.0);
        transport.start(0.0);
        assert_eq!(transport.advance(0.0), 1);
        assert_eq!(transport.advance(0.375), 1);

        transport.pause(0.375);
        assert_eq!(transport.state(), TransportState::Stopped);
        assert_eq!(transport.advance(5.0), 0);
        assert_eq!(transport.clock().position(), 0.375);

        transport.start(10.0);
        assert_eq!(transport.advance(10.0625), 0);
        assert_eq!(transport.advance(10.125), 1); // 位置 0.5
    }

    #[test]
    fn loop_offset_wraps_position() {
        let len = Duration::from_secs(2);
        assert_eq!(loop_offset(0.0, len), Duration::ZERO);
        assert_eq!(loop_offset(5.0, len), Duration::from_secs(1));
        assert_eq!(loop_offset(3.0, Duration::ZERO), Duration::ZERO);
    }
}

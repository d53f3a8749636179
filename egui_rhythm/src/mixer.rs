//! 混音器上下文
//!
//! [`RhythmMixer`] 持有注册表、播放器组、走带和节拍指示器，
//! 所有用户操作都经由 [`MixerCommand`] 进入。

use crate::audio::LoopBackend;
use crate::bank::PlayerBank;
use crate::beat::BeatIndicator;
use crate::command::{MixerCommand, MixerEvent, Notice};
use crate::error::KitError;
use crate::kit::{KitFile, NoticeMode};
use crate::loader::{LoadOutcome, LoopLoader};
use crate::structure::{InstrumentId, InstrumentRegistry, LoadStatus};
use crate::transport::Transport;
use std::collections::VecDeque;
use std::path::PathBuf;

pub struct RhythmMixer {
    registry: InstrumentRegistry,
    asset_dir: PathBuf,
    notice_mode: NoticeMode,
    backend: Box<dyn LoopBackend>,
    bank: PlayerBank,
    transport: Transport,
    beat: BeatIndicator,
    loader: Option<LoopLoader>,
    notices: VecDeque<Notice>,
    now: f64, // 最近一次 update 的宿主时间（秒）

    // Events
    pending_events: Vec<MixerEvent>,
    event_listener: Option<Box<dyn FnMut(&MixerEvent)>>,
}

impl RhythmMixer {
    pub fn new(kit: KitFile, backend: Box<dyn LoopBackend>) -> Result<Self, KitError> {
        kit.validate()?;
        let registry = kit.registry()?;
        let bank = PlayerBank::new(&registry, kit.master_volume);

        Ok(Self {
            registry,
            asset_dir: kit.resolved_asset_dir(),
            notice_mode: kit.notice_mode,
            backend,
            bank,
            transport: Transport::new(kit.bpm),
            beat: BeatIndicator::new(),
            loader: None,
            notices: VecDeque::new(),
            now: 0.0,
            pending_events: Vec::new(),
            event_listener: None,
        })
    }

    pub fn set_event_listener(&mut self, listener: Box<dyn FnMut(&MixerEvent)>) {
        self.event_listener = Some(listener);
    }

    pub fn take_events(&mut self) -> Vec<MixerEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// 为所有尚未加载的乐器启动后台解码
    pub fn load_all(&mut self) {
        if self.loader.is_some() {
            return;
        }
        let jobs: Vec<(InstrumentId, PathBuf)> = self
            .registry
            .iter()
            .filter(|(id, _)| {
                self.bank
                    .state(*id)
                    .is_some_and(|s| s.status == LoadStatus::Pending)
            })
            .map(|(id, instrument)| (id, self.asset_dir.join(&instrument.source)))
            .collect();

        if jobs.is_empty() {
            return;
        }
        log::info!("Loading {} loops from {:?}", jobs.len(), self.asset_dir);
        self.loader = Some(LoopLoader::spawn(jobs));
    }

    /// 阻塞等待所有加载完成（无界面运行或测试时使用）
    pub fn wait_for_loads(&mut self) {
        if let Some(loader) = self.loader.take() {
            for outcome in loader.wait_all() {
                self.apply_load_outcome(outcome);
            }
        }
    }

    pub fn apply_load_outcome(&mut self, outcome: LoadOutcome) {
        let LoadOutcome { id, result } = outcome;
        let name = match self.registry.get(id) {
            Some(instrument) => instrument.name.clone(),
            None => {
                log::warn!("Load result for unknown instrument {:?}", id);
                return;
            }
        };

        match result {
            Ok(decoded) => {
                let voice = self.backend.create_voice(decoded);
                if self.bank.attach(id, voice) {
                    log::info!("Loaded {}", name);
                    self.emit_event(MixerEvent::InstrumentLoaded { id });
                    // 走带中途加载完成的乐器直接按时钟位置加入
                    if self.transport.is_running() {
                        let position = self.transport.clock().position();
                        self.bank.start_one(id, position);
                    }
                }
            }
            Err(e) => {
                if self.bank.mark_failed(id) {
                    log::warn!("Failed to load {}: {}", name, e);
                    self.push_notice(Notice {
                        title: "Audio load failed".to_string(),
                        message: format!("{} could not be loaded and has been disabled.\n{}", name, e),
                    });
                    self.emit_event(MixerEvent::InstrumentFailed {
                        id,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// 每帧调用：收取加载结果并推进时钟
    pub fn update(&mut self, now: f64) {
        self.now = now;

        let outcomes = match self.loader.as_mut() {
            Some(loader) => loader.poll(),
            None => Vec::new(),
        };
        for outcome in outcomes {
            self.apply_load_outcome(outcome);
        }
        if self.loader.as_ref().is_some_and(|l| l.is_finished()) {
            self.loader = None;
            log::info!(
                "Loading finished: {} loaded, {} failed",
                self.bank.count(LoadStatus::Loaded),
                self.bank.count(LoadStatus::Failed)
            );
        }

        self.advance_clock();
    }

    pub fn execute_command(&mut self, command: MixerCommand) {
        match command {
            MixerCommand::ToggleMute { name } => {
                self.toggle_mute(&name);
            }
            MixerCommand::TogglePlay => {
                self.toggle_play();
            }
            MixerCommand::SetVolume { level } => {
                let level = self.bank.set_master_volume(level);
                self.emit_event(MixerEvent::VolumeChanged { level });
            }
            MixerCommand::DismissNotice => {
                self.notices.pop_front();
            }
        }
    }

    fn toggle_mute(&mut self, name: &str) {
        let Some(id) = self.registry.find(name) else {
            log::warn!("Toggle for unknown instrument: {}", name);
            return;
        };
        let Some(muted) = self.bank.toggle_mute(id) else {
            log::debug!("Ignoring toggle for unloaded instrument {}", name);
            return;
        };

        // 走带中取消静音且尚未播放的乐器，按时钟位置补上
        if !muted
            && self.transport.is_running()
            && self.bank.state(id).is_some_and(|s| !s.is_playing)
        {
            let position = self.transport.clock().position();
            self.bank.start_one(id, position);
        }
        self.emit_event(MixerEvent::MuteChanged { id, muted });
    }

    fn toggle_play(&mut self) {
        if self.transport.is_running() {
            self.transport.pause(self.now);
            self.bank.pause_all();
            self.emit_event(MixerEvent::PlaybackStateChanged { is_playing: false });
            return;
        }

        if let Err(e) = self.backend.activate() {
            log::error!("Cannot start playback: {}", e);
            self.push_notice(Notice {
                title: "Audio output unavailable".to_string(),
                message: e.to_string(),
            });
            return;
        }

        self.transport.start(self.now);
        let started = self.bank.start_ready(self.transport.clock().position());
        log::info!("Started {} of {} players", started.len(), self.registry.len());
        self.emit_event(MixerEvent::PlaybackStateChanged { is_playing: true });
        self.advance_clock();
    }

    fn advance_clock(&mut self) {
        let due = self.transport.advance(self.now);
        for _ in 0..due {
            let change = self.beat.on_tick();
            self.emit_event(MixerEvent::BeatChanged {
                previous: change.previous,
                current: change.current,
            });
        }
    }

    fn push_notice(&mut self, notice: Notice) {
        if self.notice_mode == NoticeMode::MessageBox {
            self.notices.push_back(notice);
        }
    }

    fn emit_event(&mut self, event: MixerEvent) {
        if let Some(ref mut listener) = self.event_listener {
            listener(&event);
        }
        self.pending_events.push(event);
    }

    // Public getters
    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }

    pub fn bank(&self) -> &PlayerBank {
        &self.bank
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn beat(&self) -> &BeatIndicator {
        &self.beat
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_running()
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_some()
    }

    pub fn master_volume(&self) -> f32 {
        self.bank.master_volume()
    }

    /// 最早的一条未关闭提示
    pub fn notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    /// 按名称查询播放状态
    pub fn is_instrument_playing(&self, name: &str) -> bool {
        self.registry
            .find(name)
            .and_then(|id| self.bank.state(id))
            .is_some_and(|s| s.is_playing)
    }

    pub fn instrument_gain(&self, name: &str) -> Option<f32> {
        self.registry.find(name).and_then(|id| self.bank.voice_gain(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{DecodedLoop, LoopVoice, NullBackend};
    use crate::error::{AudioError, LoadError};
    use crate::structure::Instrument;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn two_second_loop() -> DecodedLoop {
        DecodedLoop::from_samples(1, 100, vec![0.0; 200])
    }

    fn kit(names: &[&str], notice_mode: NoticeMode) -> KitFile {
        KitFile {
            notice_mode,
            instruments: names.iter().map(|n| Instrument::new(*n, &[1])).collect(),
            ..KitFile::default()
        }
    }

    fn loaded_mixer(names: &[&str], failing: &[&str]) -> RhythmMixer {
        let mut mixer =
            RhythmMixer::new(kit(names, NoticeMode::MessageBox), Box::new(NullBackend::default()))
                .unwrap();
        for (index, name) in names.iter().enumerate() {
            let result = if failing.contains(name) {
                Err(LoadError::Empty(PathBuf::from(format!("{}.wav", name))))
            } else {
                Ok(two_second_loop())
            };
            mixer.apply_load_outcome(LoadOutcome { id: InstrumentId(index), result });
        }
        mixer
    }

    const NINE: [&str; 9] = [
        "kick", "snare", "clap", "hihat", "openhat", "tom", "shaker", "bass", "chords",
    ];

    #[test]
    fn nine_instruments_one_failure_scenario() {
        let mut mixer = loaded_mixer(&NINE, &["tom"]);
        let bank = mixer.bank();
        let enabled = NINE
            .iter()
            .filter(|n| bank.control(mixer.registry().find(n).unwrap()).enabled)
            .count();
        assert_eq!(enabled, 8);
        assert!(!bank.control(InstrumentId(5)).enabled);
        assert_eq!(mixer.notice().map(|n| n.title.as_str()), Some("Audio load failed"));

        mixer.update(0.0);
        mixer.execute_command(MixerCommand::TogglePlay);
        assert!(mixer.is_playing());
        assert_eq!(mixer.bank().playing_count(), 8);
        assert!(!mixer.is_instrument_playing("tom"));

        for name in ["kick", "snare", "bass"] {
            mixer.execute_command(MixerCommand::ToggleMute { name: name.to_string() });
        }
        for name in ["kick", "snare", "bass"] {
            assert_eq!(mixer.instrument_gain(name), Some(0.0));
        }
        for name in ["clap", "hihat", "openhat", "shaker", "chords"] {
            assert_eq!(mixer.instrument_gain(name), Some(0.8));
        }

        mixer.update(1.0);
        mixer.execute_command(MixerCommand::TogglePlay);
        assert!(!mixer.is_playing());
        assert_eq!(mixer.bank().playing_count(), 0);
    }

    #[test]
    fn failed_instrument_toggle_is_noop() {
        let mut mixer = loaded_mixer(&["kick", "tom"], &["tom"]);
        mixer.take_events();
        mixer.execute_command(MixerCommand::ToggleMute { name: "tom".to_string() });
        mixer.execute_command(MixerCommand::ToggleMute { name: "ghost".to_string() });
        assert!(mixer.take_events().is_empty());
        assert!(mixer.bank().state(InstrumentId(1)).unwrap().muted);
        assert_eq!(mixer.instrument_gain("tom"), None);

        mixer.execute_command(MixerCommand::TogglePlay);
        assert!(!mixer.is_instrument_playing("tom"));
    }

    #[test]
    fn beat_advances_only_while_running() {
        let mut mixer = loaded_mixer(&["kick"], &[]);
        mixer.update(0.0);
        assert_eq!(mixer.beat().current(), None);

        mixer.execute_command(MixerCommand::TogglePlay);
        assert_eq!(mixer.beat().current(), Some(1));

        // 120 BPM：每 0.25 秒一个八分音符
        let mut t = 0.0;
        for expected in [2, 3, 4, 5, 6, 7, 8, 1, 2] {
            t += 0.25;
            mixer.update(t);
            assert_eq!(mixer.beat().current(), Some(expected));
        }

        mixer.execute_command(MixerCommand::TogglePlay);
        mixer.update(100.0);
        assert_eq!(mixer.beat().current(), Some(2));

        mixer.update(200.0);
        mixer.execute_command(MixerCommand::TogglePlay);
        mixer.update(200.25);
        assert_eq!(mixer.beat().current(), Some(3));
    }

    #[test]
    fn events_reach_listener_and_queue() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut mixer = loaded_mixer(&["kick"], &[]);
        mixer.set_event_listener(Box::new(move |event: &MixerEvent| sink.borrow_mut().push(event.clone())));
        mixer.take_events();

        mixer.execute_command(MixerCommand::SetVolume { level: 1.7 });
        mixer.execute_command(MixerCommand::TogglePlay);

        let expected = vec![
            MixerEvent::VolumeChanged { level: 1.0 },
            MixerEvent::PlaybackStateChanged { is_playing: true },
            MixerEvent::BeatChanged { previous: None, current: 1 },
        ];
        assert_eq!(*seen.borrow(), expected);
        assert_eq!(mixer.take_events(), expected);
        assert_eq!(mixer.instrument_gain("kick"), Some(1.0));
    }

    #[test]
    fn log_mode_keeps_no_notices() {
        let mut mixer =
            RhythmMixer::new(kit(&["kick"], NoticeMode::Log), Box::new(NullBackend::default()))
                .unwrap();
        mixer.apply_load_outcome(LoadOutcome {
            id: InstrumentId(0),
            result: Err(LoadError::Empty(PathBuf::from("kick.wav"))),
        });
        assert!(mixer.notice().is_none());
        assert!(matches!(
            mixer.take_events().as_slice(),
            [MixerEvent::InstrumentFailed { .. }]
        ));
    }

    #[test]
    fn notices_are_dismissed_in_order() {
        let mut mixer = loaded_mixer(&["kick", "snare"], &["kick", "snare"]);
        assert!(mixer.notice().unwrap().message.starts_with("kick"));
        mixer.execute_command(MixerCommand::DismissNotice);
        assert!(mixer.notice().unwrap().message.starts_with("snare"));
        mixer.execute_command(MixerCommand::DismissNotice);
        assert!(mixer.notice().is_none());
    }

    /// 记录每次启动偏移的测试后端
    #[derive(Default)]
    struct RecordingBackend {
        starts: Vec<Rc<RefCell<Vec<Duration>>>>,
        fail_activate: bool,
    }

    struct RecordingVoice {
        starts: Rc<RefCell<Vec<Duration>>>,
        gain: f32,
        playing: bool,
    }

    impl LoopBackend for Rc<RefCell<RecordingBackend>> {
        fn activate(&mut self) -> Result<(), AudioError> {
            if self.borrow().fail_activate {
                Err(AudioError::Inactive)
            } else {
                Ok(())
            }
        }

        fn is_active(&self) -> bool {
            !self.borrow().fail_activate
        }

        fn create_voice(&mut self, _decoded: DecodedLoop) -> Box<dyn LoopVoice> {
            let starts = Rc::new(RefCell::new(Vec::new()));
            self.borrow_mut().starts.push(Rc::clone(&starts));
            Box::new(RecordingVoice { starts, gain: 1.0, playing: false })
        }
    }

    impl LoopVoice for RecordingVoice {
        fn start(&mut self, offset: Duration) -> Result<(), AudioError> {
            self.starts.borrow_mut().push(offset);
            self.playing = true;
            Ok(())
        }

        fn pause(&mut self) {
            self.playing = false;
        }

        fn set_gain(&mut self, gain: f32) {
            self.gain = gain;
        }

        fn gain(&self) -> f32 {
            self.gain
        }

        fn is_playing(&self) -> bool {
            self.playing
        }

        fn loop_duration(&self) -> Duration {
            Duration::from_secs(2)
        }
    }

    fn recording_mixer(backend: &Rc<RefCell<RecordingBackend>>) -> RhythmMixer {
        let mut mixer = RhythmMixer::new(
            kit(&["kick", "bass"], NoticeMode::MessageBox),
            Box::new(Rc::clone(backend)),
        )
        .unwrap();
        for id in 0..2 {
            mixer.apply_load_outcome(LoadOutcome {
                id: InstrumentId(id),
                result: Ok(two_second_loop()),
            });
        }
        mixer
    }

    #[test]
    fn restarts_are_clock_relative() {
        let backend = Rc::new(RefCell::new(RecordingBackend::default()));
        let mut mixer = recording_mixer(&backend);

        mixer.execute_command(MixerCommand::ToggleMute { name: "bass".to_string() });
        mixer.update(0.0);
        mixer.execute_command(MixerCommand::TogglePlay);

        // 走带中取消静音：从时钟位置开始
        mixer.update(1.25);
        mixer.execute_command(MixerCommand::ToggleMute { name: "bass".to_string() });
        assert!(mixer.is_instrument_playing("bass"));

        // 暂停 2.5 秒后恢复：两者都从冻结位置 2.5 % 2 = 0.5 开始
        mixer.update(2.5);
        mixer.execute_command(MixerCommand::TogglePlay);
        mixer.update(50.0);
        mixer.execute_command(MixerCommand::TogglePlay);

        let recorded = backend.borrow();
        let starts = &recorded.starts;
        assert_eq!(
            *starts[0].borrow(),
            vec![Duration::ZERO, Duration::from_millis(500)]
        );
        assert_eq!(
            *starts[1].borrow(),
            vec![Duration::from_millis(1250), Duration::from_millis(500)]
        );
    }

    #[test]
    fn muting_while_running_keeps_voice_playing() {
        let backend = Rc::new(RefCell::new(RecordingBackend::default()));
        let mut mixer = recording_mixer(&backend);
        mixer.update(0.0);
        mixer.execute_command(MixerCommand::TogglePlay);

        mixer.execute_command(MixerCommand::ToggleMute { name: "kick".to_string() });
        assert!(mixer.is_instrument_playing("kick"));
        assert_eq!(mixer.instrument_gain("kick"), Some(0.0));

        mixer.execute_command(MixerCommand::ToggleMute { name: "kick".to_string() });
        assert_eq!(mixer.instrument_gain("kick"), Some(0.8));
        // 一直在播放，不会重新启动
        assert_eq!(backend.borrow().starts[0].borrow().len(), 1);
    }

    #[test]
    fn activation_failure_keeps_transport_stopped() {
        let backend = Rc::new(RefCell::new(RecordingBackend {
            fail_activate: true,
            ..RecordingBackend::default()
        }));
        let mut mixer = recording_mixer(&backend);
        mixer.execute_command(MixerCommand::TogglePlay);

        assert!(!mixer.is_playing());
        assert_eq!(mixer.bank().playing_count(), 0);
        assert_eq!(
            mixer.notice().map(|n| n.title.as_str()),
            Some("Audio output unavailable")
        );
    }

    #[test]
    fn late_load_joins_running_transport() {
        let mut mixer =
            RhythmMixer::new(kit(&["kick", "snare"], NoticeMode::Log), Box::new(NullBackend::default()))
                .unwrap();
        mixer.apply_load_outcome(LoadOutcome { id: InstrumentId(0), result: Ok(two_second_loop()) });
        mixer.update(0.0);
        mixer.execute_command(MixerCommand::TogglePlay);
        assert!(!mixer.is_instrument_playing("snare"));

        mixer.update(0.5);
        mixer.apply_load_outcome(LoadOutcome { id: InstrumentId(1), result: Ok(two_second_loop()) });
        assert!(mixer.is_instrument_playing("snare"));
    }

    #[test]
    fn load_all_reads_asset_dir() {
        let dir = tempfile::tempdir().unwrap();
        crate::audio::tests::write_wav(&dir.path().join("kick.wav"), 8_000, 8_000);

        let kit = KitFile {
            asset_dir: dir.path().to_path_buf(),
            ..kit(&["kick", "snare"], NoticeMode::MessageBox)
        };
        let mut mixer = RhythmMixer::new(kit, Box::new(NullBackend::default())).unwrap();
        mixer.load_all();
        assert!(mixer.is_loading());
        mixer.wait_for_loads();

        assert!(!mixer.is_loading());
        assert_eq!(mixer.bank().count(LoadStatus::Loaded), 1);
        assert_eq!(mixer.bank().count(LoadStatus::Failed), 1);
        assert!(mixer.bank().control(InstrumentId(0)).enabled);
        assert!(!mixer.bank().control(InstrumentId(1)).enabled);
        assert!(mixer.notice().unwrap().message.starts_with("snare"));
    }

    #[test]
    fn panicking_decoder_marks_instrument_failed() {
        fn explode(_path: &std::path::Path) -> Result<DecodedLoop, LoadError> {
            panic!("corrupt stream");
        }

        let mut mixer =
            RhythmMixer::new(kit(&["kick"], NoticeMode::MessageBox), Box::new(NullBackend::default()))
                .unwrap();
        mixer.loader = Some(LoopLoader::spawn_with(
            vec![(InstrumentId(0), PathBuf::from("kick.wav"))],
            explode,
        ));

        let mut t = 0.0;
        while mixer.is_loading() {
            mixer.update(t);
            t += 0.01;
            std::thread::yield_now();
        }

        let state = mixer.bank().state(InstrumentId(0)).unwrap();
        assert_eq!(state.status, LoadStatus::Failed);
        assert!(state.muted);
        assert!(!mixer.bank().control(InstrumentId(0)).enabled);
        assert!(mixer.notice().unwrap().message.starts_with("kick"));
    }
}

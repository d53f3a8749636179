//! 工具栏：播放控制、主音量和状态显示

use crate::command::MixerCommand;
use crate::mixer::RhythmMixer;
use crate::structure::LoadStatus;
use egui::*;

pub struct Toolbar {
    is_playing: bool,
    master_volume: f32,
    bpm: f32,
    position: f64,
    loaded: usize,
    failed: usize,
    total: usize,
}

impl Toolbar {
    pub fn new(mixer: &RhythmMixer) -> Self {
        let bank = mixer.bank();
        Self {
            is_playing: mixer.is_playing(),
            master_volume: mixer.master_volume(),
            bpm: mixer.transport().clock().bpm(),
            position: mixer.transport().clock().position(),
            loaded: bank.count(LoadStatus::Loaded),
            failed: bank.count(LoadStatus::Failed),
            total: mixer.registry().len(),
        }
    }

    pub fn ui(&mut self, ui: &mut Ui, command_callback: &mut dyn FnMut(MixerCommand)) {
        ui.horizontal(|ui| {
            // Playback controls
            let ready = self.loaded > 0;
            if ui
                .add_enabled(
                    ready,
                    Button::new(if self.is_playing { "⏸ Pause" } else { "▶ Play" })
                        .min_size(Vec2::new(90.0, 0.0)),
                )
                .clicked()
            {
                command_callback(MixerCommand::TogglePlay);
            }

            ui.separator();

            ui.label("Volume:");
            let mut level = self.master_volume;
            if ui
                .add(Slider::new(&mut level, 0.0..=1.0).show_value(false))
                .changed()
            {
                command_callback(MixerCommand::SetVolume { level });
            }
            ui.label(format!("{:>3.0}%", level * 100.0));

            ui.separator();

            ui.label(format!("{:.0} BPM", self.bpm));
            ui.separator();

            let minutes = (self.position / 60.0) as u32;
            let seconds = self.position % 60.0;
            ui.label(format!("Time: {:02}:{:05.2}", minutes, seconds));

            ui.separator();

            let pending = self.total - self.loaded - self.failed;
            if pending > 0 {
                ui.spinner();
                ui.label(format!("Loading {}/{}", self.loaded + self.failed, self.total));
            } else if self.failed > 0 {
                ui.colored_label(
                    Color32::from_rgb(230, 160, 60),
                    format!("{} loaded, {} failed", self.loaded, self.failed),
                );
            } else {
                ui.label(format!("{} loaded", self.loaded));
            }
        });
    }
}

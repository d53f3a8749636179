//! 乐器按钮网格

use crate::command::MixerCommand;
use crate::mixer::RhythmMixer;
use crate::structure::LoadStatus;
use egui::*;

/// 每个乐器一个开关按钮。未加载的乐器按钮不可用。
pub struct InstrumentGrid<'a> {
    mixer: &'a RhythmMixer,
    button_size: Vec2,
}

impl<'a> InstrumentGrid<'a> {
    pub fn new(mixer: &'a RhythmMixer, button_size: Vec2) -> Self {
        Self { mixer, button_size }
    }

    pub fn ui(&self, ui: &mut Ui, command_callback: &mut dyn FnMut(MixerCommand)) {
        let bank = self.mixer.bank();
        ui.horizontal_wrapped(|ui| {
            for (id, instrument) in self.mixer.registry().iter() {
                let control = bank.control(id);
                let status = bank.state(id).map(|s| s.status);

                let fill = if control.lit {
                    Color32::from_rgb(70, 150, 90)
                } else {
                    Color32::from_gray(50)
                };
                let button = Button::new(RichText::new(&instrument.name).strong())
                    .min_size(self.button_size)
                    .fill(fill)
                    .selected(control.lit);

                let hover = match status {
                    Some(LoadStatus::Pending) => "Loading...".to_string(),
                    Some(LoadStatus::Failed) => "Failed to load, disabled".to_string(),
                    _ => format!("Beats: {}", format_beats(&instrument.trigger_beats)),
                };

                let response = ui.add_enabled(control.enabled, button);
                let response = if control.enabled {
                    response.on_hover_text(hover)
                } else {
                    response.on_disabled_hover_text(hover)
                };
                if response.clicked() {
                    command_callback(MixerCommand::ToggleMute {
                        name: instrument.name.clone(),
                    });
                }
            }
        });
    }
}

fn format_beats(beats: &[u8]) -> String {
    if beats.is_empty() {
        return "-".to_string();
    }
    beats
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

//! UI 模块
//!
//! 把混音器状态画成 egui 控件，用户操作全部转成 [`MixerCommand`] 交给宿主执行。

mod beat_row;
mod instrument_grid;
mod message_box;
mod toolbar;

use crate::command::MixerCommand;
use crate::mixer::RhythmMixer;
use egui::*;

pub use beat_row::BeatRow;
pub use instrument_grid::InstrumentGrid;
pub use message_box::MessageBox;
pub use toolbar::Toolbar;

#[derive(Clone)]
pub struct MixerViewOptions {
    pub beat_cell_size: f32,
    pub instrument_button_size: Vec2,
    /// 空格键切换播放/暂停
    pub space_toggles_play: bool,
}

impl Default for MixerViewOptions {
    fn default() -> Self {
        Self {
            beat_cell_size: 36.0,
            instrument_button_size: Vec2::new(110.0, 48.0),
            space_toggles_play: true,
        }
    }
}

/// 组合工具栏、节拍行和乐器按钮的完整视图
#[derive(Default)]
pub struct MixerView {
    options: MixerViewOptions,
}

impl MixerView {
    pub fn new(options: MixerViewOptions) -> Self {
        Self { options }
    }

    pub fn ui(
        &mut self,
        ui: &mut Ui,
        mixer: &RhythmMixer,
        command_callback: &mut dyn FnMut(MixerCommand),
    ) {
        if self.options.space_toggles_play
            && ui.input(|i| i.key_pressed(Key::Space))
            && !ui.ctx().wants_keyboard_input()
        {
            command_callback(MixerCommand::TogglePlay);
        }

        Toolbar::new(mixer).ui(ui, command_callback);
        ui.separator();

        ui.add_space(8.0);
        BeatRow::new(mixer.beat(), self.options.beat_cell_size).ui(ui);
        ui.add_space(12.0);

        InstrumentGrid::new(mixer, self.options.instrument_button_size).ui(ui, command_callback);
    }

    /// 有未关闭的提示时显示消息框
    pub fn notice_ui(
        &mut self,
        ctx: &Context,
        mixer: &RhythmMixer,
        command_callback: &mut dyn FnMut(MixerCommand),
    ) {
        if let Some(notice) = mixer.notice() {
            MessageBox::new(notice).show(ctx, command_callback);
        }
    }
}

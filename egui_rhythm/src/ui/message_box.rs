//! 加载失败等提示的消息框

use crate::command::{MixerCommand, Notice};
use egui::*;

/// 可关闭的提示窗口
pub struct MessageBox<'a> {
    notice: &'a Notice,
}

impl<'a> MessageBox<'a> {
    pub fn new(notice: &'a Notice) -> Self {
        Self { notice }
    }

    pub fn show(&self, ctx: &Context, command_callback: &mut dyn FnMut(MixerCommand)) {
        let mut dismissed = false;
        Window::new(self.notice.title.as_str())
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(self.notice.message.as_str());
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            });

        if dismissed || ctx.input(|i| i.key_pressed(Key::Escape)) {
            command_callback(MixerCommand::DismissNotice);
        }
    }
}

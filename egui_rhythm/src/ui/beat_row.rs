//! 节拍行：八个指示格

use crate::beat::BeatIndicator;
use egui::*;

/// 八个节拍指示格，当前拍高亮
pub struct BeatRow<'a> {
    indicator: &'a BeatIndicator,
    cell_size: f32,
}

impl<'a> BeatRow<'a> {
    pub fn new(indicator: &'a BeatIndicator, cell_size: f32) -> Self {
        Self {
            indicator,
            cell_size,
        }
    }

    pub fn ui(&self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            for (index, &current) in self.indicator.cells().iter().enumerate() {
                let (rect, _) =
                    ui.allocate_exact_size(Vec2::splat(self.cell_size), Sense::hover());
                let painter = ui.painter();

                let fill = if current {
                    Color32::from_rgb(255, 190, 70)
                } else if index % 2 == 0 {
                    Color32::from_gray(60)
                } else {
                    Color32::from_gray(45)
                };
                painter.rect_filled(rect, 4.0, fill);
                painter.rect_stroke(rect, 4.0, Stroke::new(1.0, Color32::from_gray(90)));

                let text_color = if current { Color32::BLACK } else { Color32::from_gray(180) };
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    format!("{}", index + 1),
                    FontId::proportional(self.cell_size * 0.4),
                    text_color,
                );
            }
        });
    }
}

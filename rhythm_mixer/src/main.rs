use eframe::egui;
use egui_rhythm::{KitFile, MixerCommand, MixerEvent, MixerView, RhythmMixer, RodioBackend};
use std::path::PathBuf;

fn main() -> eframe::Result<()> {
    // 配置日志：设置默认级别为 info，确保日志输出到 stderr
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let kit = load_kit(std::env::args().nth(1).map(PathBuf::from));

    let mixer = match RhythmMixer::new(kit, Box::new(RodioBackend::new())) {
        Ok(mixer) => mixer,
        Err(e) => {
            log::error!("Invalid kit: {}", e);
            std::process::exit(1);
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([720.0, 320.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Rhythm Mixer",
        native_options,
        Box::new(|_cc| Ok(Box::new(RhythmMixerApp::new(mixer)))),
    )
}

/// 命令行第一个参数是鼓组文件；没有或读取失败时使用内置鼓组
fn load_kit(path: Option<PathBuf>) -> KitFile {
    let Some(path) = path else {
        log::info!("No kit file given, using built-in kit with ./assets");
        return KitFile::default();
    };
    match KitFile::load_from_path(&path) {
        Ok(kit) => kit,
        Err(e) => {
            log::error!("Failed to load kit {:?}: {}, using built-in kit", path, e);
            KitFile::default()
        }
    }
}

struct RhythmMixerApp {
    mixer: RhythmMixer,
    view: MixerView,
}

impl RhythmMixerApp {
    fn new(mut mixer: RhythmMixer) -> Self {
        mixer.load_all();
        Self {
            mixer,
            view: MixerView::default(),
        }
    }

    fn execute(&mut self, commands: Vec<MixerCommand>) {
        for command in commands {
            self.mixer.execute_command(command);
        }
    }
}

impl eframe::App for RhythmMixerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let current_time = ctx.input(|i| i.time);
        self.mixer.update(current_time);

        let mut commands = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            self.view
                .ui(ui, &self.mixer, &mut |command| commands.push(command));
        });
        self.view
            .notice_ui(ctx, &self.mixer, &mut |command| commands.push(command));
        self.execute(commands);

        for event in self.mixer.take_events() {
            match event {
                MixerEvent::BeatChanged { .. } => log::trace!("[MixerEvent] {:?}", event),
                _ => log::debug!("[MixerEvent] {:?}", event),
            }
        }

        // 播放或加载期间持续刷新，节拍指示才能跟上时钟
        if self.mixer.is_playing() || self.mixer.is_loading() {
            ctx.request_repaint();
        }
    }
}

//! Sound amplifier window: egui/eframe application.
//!
//! # Architecture
//!
//! [`AmplifierApp`] is the top-level [`eframe::App`].  It never touches the
//! chain directly; everything goes through the session core:
//!
//! * [`ChainController`]: every slider edit and profile application.
//! * [`SessionLifecycle`]: start (spawned on the tokio runtime) and stop.
//! * [`ProfileCatalog`]: the profile picker and "save as".
//! * `events`: [`SessionEvent`] notices (state changes, start failures,
//!   high-gain warnings), drained with `try_recv` every frame.
//! * `spectrum`: the newest [`Spectrum`] frame for the bar display.
//!
//! # Layout
//!
//! | Section | Contents |
//! |---------|----------|
//! | Header | title, theme toggle |
//! | Transport | start/stop button, state label, running clock |
//! | Notices | high-gain banner, failure / save notices |
//! | Spectrum | live bars (flat while stopped) |
//! | Controls | pre-amp, volume, balance, six equalizer bands |
//! | Profiles | picker, active profile, "save as" |
//! | About | collapsible |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::audio::{BarLayout, Spectrum};
use crate::config::{AppConfig, Theme};
use crate::params::{
    ActiveProfile, Band, MAX_BALANCE, MAX_BAND_GAIN, MAX_GAIN, MIN_BALANCE, MIN_BAND_GAIN, MIN_GAIN,
};
use crate::profiles::ProfileCatalog;
use crate::session::{ChainController, EventReceiver, SessionEvent, SessionLifecycle, SessionState};

/// Number of bars drawn for the spectrum.
const BAR_COUNT: usize = 48;

/// Height of the spectrum canvas in logical pixels.
const SPECTRUM_HEIGHT: f32 = 96.0;

// ---------------------------------------------------------------------------
// Notice
// ---------------------------------------------------------------------------

/// A dismissible one-line message under the transport row.
#[derive(Debug, Clone, PartialEq)]
enum Notice {
    Failure(String),
    Info(String),
}

// ---------------------------------------------------------------------------
// AmplifierApp
// ---------------------------------------------------------------------------

pub struct AmplifierApp {
    // ── Session core ─────────────────────────────────────────────────────
    runtime: Handle,
    lifecycle: Arc<SessionLifecycle>,
    controller: Arc<ChainController>,
    catalog: ProfileCatalog,

    // ── Channels ─────────────────────────────────────────────────────────
    events: EventReceiver,
    spectrum: watch::Receiver<Spectrum>,

    // ── UI state ─────────────────────────────────────────────────────────
    /// Output gain of the pending high-gain warning, if any.
    warning: Option<f32>,
    notice: Option<Notice>,
    /// Contents of the "save as" field.
    save_name: String,

    // ── Configuration ────────────────────────────────────────────────────
    config: AppConfig,
    settings_file: PathBuf,
}

impl AmplifierApp {
    pub fn new(
        runtime: Handle,
        lifecycle: Arc<SessionLifecycle>,
        catalog: ProfileCatalog,
        events: EventReceiver,
        config: AppConfig,
        settings_file: PathBuf,
    ) -> Self {
        let controller = Arc::clone(lifecycle.controller());
        let spectrum = lifecycle.subscribe_spectrum();
        Self {
            runtime,
            lifecycle,
            controller,
            catalog,
            events,
            spectrum,
            warning: None,
            notice: None,
            save_name: String::new(),
            config,
            settings_file,
        }
    }

    /// Install the configured light/dark visuals.
    pub fn apply_theme(&self, ctx: &egui::Context) {
        let visuals = match self.config.ui.theme {
            Theme::Dark => egui::Visuals::dark(),
            Theme::Light => egui::Visuals::light(),
        };
        ctx.set_visuals(visuals);
    }

    // ── Channel polling ───────────────────────────────────────────────────

    fn poll_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                SessionEvent::StateChanged(state) => {
                    if state == SessionState::Idle {
                        self.warning = None;
                    }
                }
                SessionEvent::StartFailed { message } => {
                    self.notice = Some(Notice::Failure(message));
                }
                SessionEvent::HighGainWarning { output_gain } => {
                    self.warning = Some(output_gain);
                }
            }
        }
    }

    // ── Actions ───────────────────────────────────────────────────────────

    fn start(&mut self) {
        self.notice = None;
        let lifecycle = Arc::clone(&self.lifecycle);
        // Failures come back as SessionEvent::StartFailed.
        self.runtime.spawn(async move {
            if let Err(e) = lifecycle.start().await {
                log::debug!("[app] start did not complete: {e}");
            }
        });
    }

    fn stop(&mut self) {
        self.lifecycle.stop();
    }

    fn select_profile(&mut self, name: &str) {
        match self.controller.apply_profile(name, &self.catalog) {
            Ok(_) => self.notice = None,
            Err(e) => self.notice = Some(Notice::Failure(e.to_string())),
        }
    }

    /// Save the current parameters under the name typed in the field.
    ///
    /// Blank input is treated as "no save".
    fn save_profile(&mut self) {
        let name = self.save_name.trim().to_string();
        if name.is_empty() {
            return;
        }
        match self.catalog.save(&name, self.controller.params()) {
            Ok(profile) => {
                self.save_name.clear();
                self.notice = Some(Notice::Info(format!("Saved profile '{}'", profile.name)));
            }
            Err(e) => self.notice = Some(Notice::Failure(e.to_string())),
        }
    }

    fn toggle_theme(&mut self, ctx: &egui::Context) {
        self.config.ui.theme = self.config.ui.theme.toggled();
        self.apply_theme(ctx);
        if let Err(e) = self.config.save_to(&self.settings_file) {
            log::warn!("[app] could not persist theme ({e})");
        }
    }

    // ── Sections ──────────────────────────────────────────────────────────

    fn draw_header(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.horizontal(|ui| {
            ui.heading("Sound Amplifier");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let icon = match self.config.ui.theme {
                    Theme::Dark => "☀",
                    Theme::Light => "🌙",
                };
                if ui.button(icon).on_hover_text("Toggle theme").clicked() {
                    self.toggle_theme(ctx);
                }
            });
        });
    }

    fn draw_transport(&mut self, ui: &mut egui::Ui, state: SessionState) {
        ui.horizontal(|ui| {
            let (label, color) = if state.is_active() {
                ("⏹ Stop", egui::Color32::from_rgb(255, 80, 80))
            } else {
                ("▶ Start", egui::Color32::from_rgb(80, 200, 120))
            };
            let button = egui::Button::new(egui::RichText::new(label).size(16.0).color(color));
            if ui
                .add_enabled(state != SessionState::Stopping, button)
                .clicked()
            {
                if state.is_active() {
                    self.stop();
                } else {
                    self.start();
                }
            }

            ui.label(egui::RichText::new(state.label()).color(state_color(state)));

            if let Some(since) = self.lifecycle.live_since() {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(egui::RichText::new(format_elapsed(since.elapsed())).monospace());
                });
            }
        });
    }

    fn draw_notices(&mut self, ui: &mut egui::Ui) {
        if let Some(output_gain) = self.warning {
            let frame = egui::Frame::new()
                .fill(egui::Color32::from_rgb(120, 40, 20))
                .corner_radius(egui::CornerRadius::same(6))
                .inner_margin(egui::Margin::same(6));
            frame.show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    ui.label(
                        egui::RichText::new(format!(
                            "⚠ Volume is at {output_gain:.0} %. High levels can damage your hearing."
                        ))
                        .color(egui::Color32::WHITE),
                    );
                    if ui.button("Understood").clicked() {
                        self.controller.acknowledge_warning();
                        self.warning = None;
                    }
                });
            });
        }

        if let Some(notice) = self.notice.clone() {
            ui.horizontal(|ui| {
                let (text, color) = match &notice {
                    Notice::Failure(msg) => (msg.as_str(), egui::Color32::from_rgb(255, 136, 68)),
                    Notice::Info(msg) => (msg.as_str(), egui::Color32::from_rgb(80, 200, 120)),
                };
                ui.label(egui::RichText::new(text).color(color));
                if ui.small_button("✕").clicked() {
                    self.notice = None;
                }
            });
        }
    }

    /// Spectrum bars, bottom-aligned on the canvas.
    fn draw_spectrum(&self, ui: &mut egui::Ui) {
        let (rect, _) = ui.allocate_exact_size(
            egui::vec2(ui.available_width(), SPECTRUM_HEIGHT),
            egui::Sense::hover(),
        );

        let painter = ui.painter();
        painter.rect_filled(rect, 4.0, ui.visuals().extreme_bg_color);

        let layout = BarLayout::compute(&self.spectrum.borrow(), BAR_COUNT, rect.width(), rect.height());
        for bar in &layout.bars {
            let height = bar.height.max(1.0);
            let left = rect.left() + bar.x;
            painter.rect_filled(
                egui::Rect::from_min_max(
                    egui::pos2(left, rect.bottom() - height),
                    egui::pos2(left + bar.width, rect.bottom()),
                ),
                1.0,
                bar_color(bar.level),
            );
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        let params = self.controller.params();

        ui.label(egui::RichText::new("Levels").strong());
        let mut input_gain = params.input_gain;
        if ui
            .add(egui::Slider::new(&mut input_gain, MIN_GAIN..=MAX_GAIN).suffix(" %").text("Pre-amp"))
            .changed()
        {
            self.controller.set_input_gain(input_gain);
        }

        let mut output_gain = params.output_gain;
        if ui
            .add(egui::Slider::new(&mut output_gain, MIN_GAIN..=MAX_GAIN).suffix(" %").text("Volume"))
            .changed()
        {
            self.controller.set_output_gain(output_gain);
        }

        let mut balance = params.balance;
        if ui
            .add(egui::Slider::new(&mut balance, MIN_BALANCE..=MAX_BALANCE).text("Balance (L / R)"))
            .changed()
        {
            self.controller.set_balance(balance);
        }

        ui.add_space(6.0);
        ui.label(egui::RichText::new("Equalizer").strong());
        for band in Band::ALL {
            let mut db = params.eq.get(band);
            if ui
                .add(
                    egui::Slider::new(&mut db, MIN_BAND_GAIN..=MAX_BAND_GAIN)
                        .step_by(0.5)
                        .suffix(" dB")
                        .text(format!("{} Hz", band.label())),
                )
                .changed()
            {
                self.controller.set_band_gain(band, db);
            }
        }
    }

    fn draw_profiles(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("Profiles").strong());

        let active = self.controller.active_profile();
        let mut chosen: Option<String> = None;
        ui.horizontal(|ui| {
            egui::ComboBox::from_id_salt("profile-picker")
                .selected_text(active.name())
                .show_ui(ui, |ui| {
                    for name in self.catalog.names() {
                        let selected = matches!(&active, ActiveProfile::Named(n) if *n == name)
                            || (active == ActiveProfile::Default
                                && name == ActiveProfile::Default.name());
                        if ui.selectable_label(selected, name.as_str()).clicked() {
                            chosen = Some(name);
                        }
                    }
                });
            if active == ActiveProfile::Custom {
                ui.label(
                    egui::RichText::new("edited")
                        .italics()
                        .color(egui::Color32::from_rgb(150, 150, 150)),
                );
            }
        });
        if let Some(name) = chosen {
            self.select_profile(&name);
        }

        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.save_name)
                    .hint_text("Save current settings as…")
                    .desired_width(200.0),
            );
            let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Save").clicked() || submitted {
                self.save_profile();
            }
        });
    }

    fn draw_about(&self, ui: &mut egui::Ui) {
        egui::CollapsingHeader::new("About")
            .default_open(false)
            .show(ui, |ui| {
                ui.label(
                    "Routes your microphone to your headphones with adjustable gain, \
                     a six-band equalizer and left/right balance.",
                );
                ui.label(
                    egui::RichText::new(
                        "Not a medical device. Keep the volume moderate and use headphones \
                         to avoid feedback.",
                    )
                    .color(egui::Color32::from_rgb(255, 136, 68)),
                );
                if let Some((input, output)) = self.lifecycle.live_formats() {
                    ui.label(
                        egui::RichText::new(format!(
                            "Input {} Hz / {} ch, output {} Hz / {} ch",
                            input.sample_rate, input.channels, output.sample_rate, output.channels
                        ))
                        .small(),
                    );
                }
                ui.label(
                    egui::RichText::new(format!(
                        "Warning threshold: {:.0} %",
                        self.controller.high_gain_threshold()
                    ))
                    .small(),
                );
            });
    }

    fn frame_period(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.config.visual.frame_rate.clamp(1, 240)))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `m:ss` below an hour, `h:mm:ss` above.
fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

fn state_color(state: SessionState) -> egui::Color32 {
    match state {
        SessionState::Idle => egui::Color32::from_rgb(120, 120, 120),
        SessionState::Starting | SessionState::Stopping => egui::Color32::from_rgb(68, 136, 255),
        SessionState::Live => egui::Color32::from_rgb(80, 200, 120),
    }
}

/// Green at rest, shading to orange as the bucket gets louder.
fn bar_color(level: f32) -> egui::Color32 {
    let t = level.clamp(0.0, 1.0);
    egui::Color32::from_rgb(
        (80.0 + 175.0 * t) as u8,
        (200.0 - 64.0 * t) as u8,
        (120.0 - 52.0 * t) as u8,
    )
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for AmplifierApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_events();

        // State changes happen on the runtime; keep polling while anything
        // can still move.
        let state = self.lifecycle.state();
        match state {
            SessionState::Live => ctx.request_repaint_after(self.frame_period()),
            SessionState::Starting | SessionState::Stopping => {
                ctx.request_repaint_after(Duration::from_millis(50))
            }
            SessionState::Idle => ctx.request_repaint_after(Duration::from_millis(500)),
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_header(ui, ctx);
            ui.separator();
            self.draw_transport(ui, state);
            self.draw_notices(ui);
            ui.add_space(4.0);
            self.draw_spectrum(ui);
            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| {
                self.draw_controls(ui);
                ui.separator();
                self.draw_profiles(ui);
                ui.separator();
                self.draw_about(ui);
            });
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("[app] window closing, stopping session");
        self.lifecycle.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_clock_formats() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "0:00");
        assert_eq!(format_elapsed(Duration::from_secs(75)), "1:15");
        assert_eq!(format_elapsed(Duration::from_secs(3_725)), "1:02:05");
    }

    #[test]
    fn bar_color_spans_green_to_orange() {
        assert_eq!(bar_color(0.0), egui::Color32::from_rgb(80, 200, 120));
        assert_eq!(bar_color(1.0), egui::Color32::from_rgb(255, 136, 68));
        assert_eq!(bar_color(7.0), bar_color(1.0));
    }
}

//! Application entry point: Sound Amplifier.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Resolve [`AppPaths`] and load [`AppConfig`] (defaults on first run).
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Load the user profile list and build the [`ProfileCatalog`].
//! 5. Create the session event channel, the [`ChainController`] and the
//!    [`SessionLifecycle`] over the cpal backend.
//! 6. Run [`eframe::run_native`]; blocks the main thread until the window
//!    is closed.  No audio device is opened before the user presses Start.

use std::sync::Arc;

use eframe::egui;
use sound_amplifier::{
    app::AmplifierApp,
    audio::{AudioBackend, CpalBackend},
    config::{AppConfig, AppPaths},
    params::new_shared_store,
    profiles::{ProfileCatalog, UserProfiles},
    session::{event_channel, ChainController, SessionLifecycle},
};

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (width, height) = config.ui.window_size;
    let mut vp = egui::ViewportBuilder::default()
        .with_title("Sound Amplifier")
        .with_inner_size([width, height])
        .with_min_inner_size([360.0, 480.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Sound Amplifier starting up");

    // 2. Configuration
    let paths = AppPaths::new();
    let config = AppConfig::load_or_default(&paths.settings_file);

    // 3. Tokio runtime (start-up acquisition and the spectrum sampler)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Profiles
    let catalog = ProfileCatalog::new(UserProfiles::load_from(paths.profiles_file.clone()));
    log::info!(
        "{} built-in and {} saved profiles available",
        catalog.builtin().len(),
        catalog.user().len()
    );

    // 5. Session core
    let (event_tx, event_rx) = event_channel();
    let controller = Arc::new(ChainController::new(
        new_shared_store(),
        config.safety.high_gain_threshold,
        event_tx.clone(),
    ));
    let backend: Arc<dyn AudioBackend> = Arc::new(CpalBackend::new(&config.audio));
    let lifecycle = Arc::new(SessionLifecycle::new(
        backend,
        Arc::clone(&controller),
        config.visual.clone(),
        event_tx,
    ));

    // 6. Build the egui app and run it (blocks until the window is closed)
    let app = AmplifierApp::new(
        rt.handle().clone(),
        lifecycle,
        catalog,
        event_rx,
        config.clone(),
        paths.settings_file,
    );
    let options = native_options(&config);

    eframe::run_native(
        "Sound Amplifier",
        options,
        Box::new(move |cc| {
            app.apply_theme(&cc.egui_ctx);
            Ok(Box::new(app))
        }),
    )
}

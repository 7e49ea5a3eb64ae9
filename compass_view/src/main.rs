mod camera;
mod colors;
mod events;
mod logging;
mod scene;
mod ui;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use camera::CameraPlugin;
use compass_core::{
    ChannelOrientationSource, Command, Config, FixedPositionSource, OrientationSource,
    PositionSource, TrackingSession, UnavailablePositionSource, WatchScene, WebSocketTransport,
};
use events::{SessionLink, SessionLinkPlugin};
use scene::ScenePlugin;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::{error, info, warn};
use ui::ControlPanelPlugin;

fn main() {
    logging::init_logging();

    let mut config = match Config::load_or_default() {
        Ok(config) => config,
        Err(err) => {
            warn!(%err, "failed to load config, using defaults");
            Config::default()
        }
    };

    let (orientation, orientation_feed) = ChannelOrientationSource::new(config.orientation_consent);
    let position: Arc<dyn PositionSource> = match config.site {
        Some(site) => Arc::new(FixedPositionSource::new(site.to_sample())),
        None => Arc::new(UnavailablePositionSource),
    };
    let (scene, frames) = WatchScene::new();
    let last_frame = frames.clone();
    let (command_tx, command_rx) = unbounded_channel();

    // spawn the tracking session on its own runtime, handing off the command receiver
    let session_config = config.clone();
    let session_thread = std::thread::spawn(move || {
        run_session(session_config, Arc::new(orientation), position, scene, command_rx)
    });

    App::new()
        .insert_resource(ClearColor(colors::SKY_BACKGROUND))
        .insert_resource(SessionLink::new(
            frames,
            command_tx.clone(),
            orientation_feed,
        ))
        .add_plugins(
            DefaultPlugins
                .build()
                .disable::<LogPlugin>()
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Omni Compass".into(),
                        ..default()
                    }),
                    ..default()
                }),
        )
        .add_plugins(EguiPlugin::default())
        .add_plugins((SessionLinkPlugin, CameraPlugin, ScenePlugin, ControlPanelPlugin))
        .run();

    let _ = command_tx.send(Command::Shutdown);
    if session_thread.join().is_err() {
        error!("tracking session thread panicked");
    }

    let target = last_frame.borrow().target;
    match config.remember_target(target) {
        Ok(true) => info!(%target, "saved last target"),
        Ok(false) => {}
        Err(err) => warn!(%err, "failed to save config"),
    }
}

fn run_session(
    config: Config,
    orientation: Arc<dyn OrientationSource>,
    position: Arc<dyn PositionSource>,
    scene: WatchScene,
    commands: UnboundedReceiver<Command>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(%err, "failed to start the session runtime");
            return;
        }
    };

    runtime.block_on(async move {
        let session = TrackingSession::spawn(
            &config,
            Arc::new(WebSocketTransport),
            orientation,
            position,
            scene,
            commands,
        );
        session.join().await;
    });
    info!("tracking session stopped");
}

use bevy::prelude::*;
use compass_core::{Command, OrientationFeed, SceneFrame};
use tokio::sync::{mpsc::UnboundedSender, watch};
use tracing::warn;

/// Operator input headed for the tracking session.
#[derive(Message, Debug, Clone)]
pub struct CompassEvent(pub Command);

/// Connection between the render loop and the tracking session thread.
#[derive(Resource)]
pub struct SessionLink {
    frames: watch::Receiver<SceneFrame>,
    commands: UnboundedSender<Command>,
    pub orientation: OrientationFeed,
}

impl SessionLink {
    pub fn new(
        frames: watch::Receiver<SceneFrame>,
        commands: UnboundedSender<Command>,
        orientation: OrientationFeed,
    ) -> Self {
        Self {
            frames,
            commands,
            orientation,
        }
    }
}

/// The frame every system reads during this render tick.
#[derive(Resource, Default)]
pub struct CurrentFrame(pub SceneFrame);

pub struct SessionLinkPlugin;

impl Plugin for SessionLinkPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<CompassEvent>()
            .init_resource::<CurrentFrame>()
            .add_systems(PreUpdate, sync_frame_system)
            .add_systems(PostUpdate, forward_commands_system);
    }
}

/// Pick up the most recent frame published by the session, if any.
fn sync_frame_system(mut link: ResMut<SessionLink>, mut current: ResMut<CurrentFrame>) {
    if link.frames.has_changed().unwrap_or(false) {
        current.0 = link.frames.borrow_and_update().clone();
    }
}

fn forward_commands_system(mut events: MessageReader<CompassEvent>, link: Res<SessionLink>) {
    for CompassEvent(command) in events.read() {
        if link.commands.send(command.clone()).is_err() {
            warn!(?command, "tracking session is gone, dropping command");
        }
    }
}

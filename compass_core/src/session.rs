//! Session runtime.
//!
//! Every input (stream events, sensor samples and operator commands) is
//! funnelled into one task that owns the [`TrackingController`], so all
//! arbitration state is mutated serially and always read at event time.

use std::sync::Arc;
use tokio::{
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    controller::{Command, DirectionLink, SceneSink, TrackingController},
    sensors::{GeoSample, OrientationSample, OrientationSource, PositionSource, WatchHandle},
    stream::{DirectionStream, StreamEvent, Transport},
};

/// A running tracking session. Dropping it tears it down.
pub struct TrackingSession {
    stream: DirectionStream,
    orientation: Arc<dyn OrientationSource>,
    position: Arc<dyn PositionSource>,
    watch: Option<WatchHandle>,
    task: Option<JoinHandle<()>>,
    torn_down: bool,
}

struct Inputs {
    events: UnboundedReceiver<StreamEvent>,
    orientation_rx: UnboundedReceiver<OrientationSample>,
    orientation_tx: UnboundedSender<OrientationSample>,
    geo: UnboundedReceiver<GeoSample>,
    commands: UnboundedReceiver<Command>,
}

impl TrackingSession {
    /// Wire everything up, start watching the position and connect.
    ///
    /// Orientation sampling only starts after [`Command::EnableOrientation`]
    /// is granted. Must be called from within a tokio runtime.
    pub fn spawn<S>(
        config: &Config,
        transport: Arc<dyn Transport>,
        orientation: Arc<dyn OrientationSource>,
        position: Arc<dyn PositionSource>,
        scene: S,
        commands: UnboundedReceiver<Command>,
    ) -> Self
    where
        S: SceneSink + Send + 'static,
    {
        let (event_tx, events) = unbounded_channel();
        let stream = DirectionStream::new(
            config.endpoint.clone(),
            transport,
            config.reconnect_delay(),
            event_tx,
        );
        stream.subscribe_aircraft_status();

        let mut controller = TrackingController::new(stream.clone(), scene, config.initial_target);

        let (geo_tx, geo) = unbounded_channel();
        let watch = match position.watch(geo_tx) {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(%err, "geolocation unavailable");
                controller.geolocation_unavailable();
                None
            }
        };

        info!(
            endpoint = %config.endpoint,
            target = %config.initial_target,
            "starting tracking session"
        );
        stream.connect();

        let (orientation_tx, orientation_rx) = unbounded_channel();
        let inputs = Inputs {
            events,
            orientation_rx,
            orientation_tx,
            geo,
            commands,
        };
        let task = tokio::spawn(run(controller, orientation.clone(), inputs));

        Self {
            stream,
            orientation,
            position,
            watch,
            task: Some(task),
            torn_down: false,
        }
    }

    pub fn stream(&self) -> &DirectionStream {
        &self.stream
    }

    /// Wait for the loop to finish after [`Command::Shutdown`], then tear down.
    pub async fn join(mut self) {
        if let Some(task) = self.task.as_mut() {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    warn!(%err, "tracking loop ended abnormally");
                }
            }
            self.task = None;
        }
        self.teardown();
    }

    /// Stop orientation sampling, clear the position watch and disconnect.
    ///
    /// Every step runs even when an earlier one fails. Calling it again does
    /// nothing.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        if let Err(err) = self.orientation.stop() {
            warn!(%err, "failed to stop orientation sampling");
        }
        if let Some(handle) = self.watch.take() {
            if let Err(err) = self.position.clear(handle) {
                warn!(%err, "failed to clear position watch");
            }
        }
        self.stream.disconnect();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        info!("tracking session torn down");
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn run<L, S>(
    mut controller: TrackingController<L, S>,
    orientation: Arc<dyn OrientationSource>,
    mut inputs: Inputs,
) where
    L: DirectionLink,
    S: SceneSink,
{
    loop {
        tokio::select! {
            Some(event) = inputs.events.recv() => controller.handle_stream_event(event),
            Some(sample) = inputs.orientation_rx.recv() => controller.handle_orientation(sample),
            Some(sample) = inputs.geo.recv() => controller.handle_position(sample),
            command = inputs.commands.recv() => match command {
                Some(Command::Shutdown) | None => break,
                Some(Command::EnableOrientation) => {
                    if controller.frame().orientation_enabled {
                        debug!("orientation already enabled");
                        continue;
                    }
                    let granted = orientation.request_permission().await;
                    if granted {
                        if let Err(err) = orientation.start(inputs.orientation_tx.clone()) {
                            warn!(%err, "failed to start orientation sampling");
                            controller.orientation_permission(false);
                            continue;
                        }
                    }
                    controller.orientation_permission(granted);
                }
                Some(command) => controller.handle_command(command),
            },
        }
    }
    debug!("tracking loop finished");
}

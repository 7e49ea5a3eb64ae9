//! Composition of stream, sensors and arbitration into scene frames.

use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::{
    angle_math::{CameraPose, PointerAim},
    arbiter::{Axis, AxisModes, ManualValues, ModeArbiter},
    protocol::{AircraftState, TargetId},
    sensors::{GeoSample, OrientationSample},
    status::{self, manual_direction_status, position_readout, tracking_status},
    stream::{DirectionStream, StreamEvent},
};

/// Outbound half of the direction service as the controller sees it.
pub trait DirectionLink {
    /// Returns whether the message went out.
    fn send_location(&self, latitude: f64, longitude: f64, elevation: f64) -> bool;
    fn switch_target(&self, target: TargetId) -> bool;
}

impl DirectionLink for DirectionStream {
    fn send_location(&self, latitude: f64, longitude: f64, elevation: f64) -> bool {
        DirectionStream::send_location(self, latitude, longitude, elevation)
    }

    fn switch_target(&self, target: TargetId) -> bool {
        DirectionStream::switch_target(self, target)
    }
}

/// Everything the renderer and the control panel need to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneFrame {
    /// `None` until the first camera input resolves
    pub camera: Option<CameraPose>,
    /// `None` until the first direction is known; the pointer stays hidden
    pub pointer: Option<PointerAim>,
    pub status: String,
    pub position_readout: Option<String>,
    pub target: TargetId,
    pub orientation_enabled: bool,
    pub modes: AxisModes,
    pub manual: ManualValues,
}

impl Default for SceneFrame {
    fn default() -> Self {
        Self {
            camera: None,
            pointer: None,
            status: status::INITIALIZING.to_owned(),
            position_readout: None,
            target: TargetId::default(),
            orientation_enabled: false,
            modes: AxisModes::default(),
            manual: ManualValues::default(),
        }
    }
}

/// Receives every new frame.
pub trait SceneSink {
    fn present(&mut self, frame: &SceneFrame);
}

/// Publishes frames on a watch channel; the render loop reads the latest one
/// at paint time.
pub struct WatchScene {
    tx: watch::Sender<SceneFrame>,
}

impl WatchScene {
    pub fn new() -> (Self, watch::Receiver<SceneFrame>) {
        let (tx, rx) = watch::channel(SceneFrame::default());
        (Self { tx }, rx)
    }
}

impl SceneSink for WatchScene {
    fn present(&mut self, frame: &SceneFrame) {
        self.tx.send_replace(frame.clone());
    }
}

/// Operator input from the control surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetAxisMode { axis: Axis, manual: bool },
    SetManualBearing(f64),
    SetManualDirection { azimuth_deg: f64, altitude_deg: f64 },
    SetManualPosition {
        latitude_deg: f64,
        longitude_deg: f64,
        elevation_m: f64,
    },
    SetElevationOnly(bool),
    SelectTarget(TargetId),
    /// Ask for orientation permission and start sampling once granted
    EnableOrientation,
    /// Result of loading the pointer asset
    SceneLoaded(Result<(), String>),
    Shutdown,
}

/// Owns all tracking state for one session and turns every input into an
/// updated [`SceneFrame`].
pub struct TrackingController<L, S> {
    link: L,
    scene: S,
    arbiter: ModeArbiter,
    target: TargetId,
    frame: SceneFrame,
    /// Between `Opened` and `Closed`
    online: bool,
    ever_online: bool,
    last_sent: Option<GeoSample>,
}

impl<L: DirectionLink, S: SceneSink> TrackingController<L, S> {
    pub fn new(link: L, scene: S, target: TargetId) -> Self {
        let mut controller = Self {
            link,
            scene,
            arbiter: ModeArbiter::new(),
            target,
            frame: SceneFrame {
                target,
                ..SceneFrame::default()
            },
            online: false,
            ever_online: false,
            last_sent: None,
        };
        controller.refresh();
        controller
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn arbiter(&self) -> &ModeArbiter {
        &self.arbiter
    }

    pub fn frame(&self) -> &SceneFrame {
        &self.frame
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn handle_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Opened => {
                // The service starts every connection from scratch.
                self.online = true;
                self.ever_online = true;
                if self.connection_may_set_status() {
                    self.frame.status = self.waiting_status().to_owned();
                }
                self.link.switch_target(self.target);
                self.last_sent = None;
            }
            StreamEvent::Position(sample) => {
                if !self.arbiter.is_manual(Axis::Direction) {
                    self.frame.status = tracking_status(&sample);
                }
                self.arbiter.observe_direction(sample);
            }
            StreamEvent::AircraftStatus(aircraft) => {
                if !self.target.is_aircraft() {
                    trace!(?aircraft, "ignoring aircraft status for celestial target");
                    return;
                }
                debug!(state = ?aircraft.state, "aircraft status");
                if aircraft.state == AircraftState::Searching
                    && !self.arbiter.is_manual(Axis::Direction)
                {
                    self.frame.status = status::SEARCHING_AIRCRAFT.to_owned();
                }
            }
            StreamEvent::Error(err) => {
                debug!(%err, "direction stream reported an error");
                return;
            }
            StreamEvent::Closed => {
                self.online = false;
                if self.connection_may_set_status() {
                    self.frame.status = status::CONNECTION_LOST.to_owned();
                }
            }
        }
        self.refresh();
    }

    pub fn handle_orientation(&mut self, sample: OrientationSample) {
        self.arbiter.observe_orientation(sample);
        self.refresh();
    }

    pub fn handle_position(&mut self, sample: GeoSample) {
        self.arbiter.observe_position(sample);
        self.refresh();
    }

    /// Apply an operator command. Session level commands are ignored here.
    pub fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetAxisMode { axis, manual } => self.set_axis_mode(axis, manual),
            Command::SetManualBearing(bearing_deg) => {
                self.arbiter.set_manual_bearing(bearing_deg);
                self.refresh();
            }
            Command::SetManualDirection {
                azimuth_deg,
                altitude_deg,
            } => {
                self.arbiter.set_manual_direction(azimuth_deg, altitude_deg);
                if self.arbiter.is_manual(Axis::Direction) {
                    self.frame.status = manual_direction_status(azimuth_deg, altitude_deg);
                }
                self.refresh();
            }
            Command::SetManualPosition {
                latitude_deg,
                longitude_deg,
                elevation_m,
            } => {
                self.arbiter
                    .set_manual_position(latitude_deg, longitude_deg, elevation_m);
                self.refresh();
            }
            Command::SetElevationOnly(elevation_only) => {
                self.arbiter.set_elevation_only(elevation_only);
                self.refresh();
            }
            Command::SelectTarget(target) => self.select_target(target),
            Command::SceneLoaded(result) => self.scene_loaded(result),
            Command::EnableOrientation | Command::Shutdown => {
                trace!(?command, "session command reached the controller");
            }
        }
    }

    pub fn select_target(&mut self, target: TargetId) {
        info!(%target, "selecting target");
        self.target = target;
        self.frame.target = target;
        self.link.switch_target(target);
        if target.is_aircraft() {
            self.frame.status = status::SEARCHING_AIRCRAFT.to_owned();
        }
        self.refresh();
    }

    pub fn set_axis_mode(&mut self, axis: Axis, manual: bool) {
        self.arbiter.set_mode(axis, manual);
        if axis == Axis::Direction {
            if manual {
                let values = self.arbiter.manual();
                self.frame.status =
                    manual_direction_status(values.target_azimuth_deg, values.target_altitude_deg);
            } else if let Some(sample) = self.arbiter.latest_direction() {
                self.frame.status = tracking_status(sample);
            } else {
                self.frame.status = self.waiting_status().to_owned();
            }
        }
        self.refresh();
    }

    pub fn orientation_permission(&mut self, granted: bool) {
        self.frame.orientation_enabled = granted;
        if !granted {
            warn!("orientation permission denied");
            self.frame.status = status::ORIENTATION_DENIED.to_owned();
        }
        self.refresh();
    }

    pub fn geolocation_unavailable(&mut self) {
        self.frame.status = status::GEOLOCATION_UNAVAILABLE.to_owned();
        self.refresh();
    }

    pub fn scene_loaded(&mut self, result: Result<(), String>) {
        match result {
            Ok(()) if self.showing_sensor_warning() => {}
            Ok(()) => self.frame.status = status::ASSET_LOADED.to_owned(),
            Err(err) => {
                warn!(%err, "failed to load pointer asset");
                self.frame.status = status::ASSET_FAILED.to_owned();
            }
        }
        self.refresh();
    }

    /// Status shown while no direction sample is driving the pointer.
    fn waiting_status(&self) -> &'static str {
        match (self.online, self.ever_online) {
            (true, _) if self.target.is_aircraft() => status::SEARCHING_AIRCRAFT,
            (true, _) => status::CONNECTED,
            (false, true) => status::CONNECTION_LOST,
            (false, false) => status::INITIALIZING,
        }
    }

    /// Sensor problems stay visible until a direction sample replaces them.
    fn showing_sensor_warning(&self) -> bool {
        self.frame.status == status::ORIENTATION_DENIED
            || self.frame.status == status::GEOLOCATION_UNAVAILABLE
    }

    fn connection_may_set_status(&self) -> bool {
        !self.arbiter.is_manual(Axis::Direction) && !self.showing_sensor_warning()
    }

    /// Resolve every axis, push a changed position upstream and present the frame.
    fn refresh(&mut self) {
        let resolved = self.arbiter.resolve();
        if let Some(camera) = resolved.camera {
            self.frame.camera = Some(camera);
        }
        if let Some(pointer) = resolved.pointer {
            self.frame.pointer = Some(pointer);
        }
        if let Some(position) = resolved.position {
            self.frame.position_readout = Some(position_readout(&position));
            if self.online
                && self.last_sent != Some(position)
                && self.link.send_location(
                    position.latitude_deg,
                    position.longitude_deg,
                    position.elevation_m,
                )
            {
                self.last_sent = Some(position);
            }
        }
        self.frame.modes = self.arbiter.modes();
        self.frame.manual = self.arbiter.manual();
        self.scene.present(&self.frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        angle_math::{camera_bearing_orbit, pointer_orientation},
        protocol::{AircraftStatus, DirectionSample},
    };
    use chrono::Utc;
    use std::cell::{Cell, RefCell};

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Location(f64, f64, f64),
        Target(TargetId),
    }

    #[derive(Default)]
    struct FakeLink {
        open: Cell<bool>,
        sent: RefCell<Vec<Sent>>,
    }

    impl FakeLink {
        fn take(&self) -> Vec<Sent> {
            self.sent.take()
        }
    }

    impl DirectionLink for FakeLink {
        fn send_location(&self, latitude: f64, longitude: f64, elevation: f64) -> bool {
            if self.open.get() {
                self.sent
                    .borrow_mut()
                    .push(Sent::Location(latitude, longitude, elevation));
            }
            self.open.get()
        }

        fn switch_target(&self, target: TargetId) -> bool {
            if self.open.get() {
                self.sent.borrow_mut().push(Sent::Target(target));
            }
            self.open.get()
        }
    }

    #[derive(Default)]
    struct Frames(Vec<SceneFrame>);

    impl SceneSink for Frames {
        fn present(&mut self, frame: &SceneFrame) {
            self.0.push(frame.clone());
        }
    }

    fn controller() -> TrackingController<FakeLink, Frames> {
        let mut controller = TrackingController::new(FakeLink::default(), Frames::default(), TargetId::Sun);
        controller.link.open.set(true);
        controller.handle_stream_event(StreamEvent::Opened);
        controller.link.take();
        controller
    }

    fn sample(azimuth_deg: f64, altitude_deg: f64) -> DirectionSample {
        DirectionSample {
            target_id: "SUN".into(),
            azimuth_deg,
            altitude_deg,
            distance_km: 1.5e8,
            timestamp: Utc::now(),
            aircraft_altitude_m: None,
            ground_speed_kmh: None,
            vertical_speed_mps: None,
            origin_airport: None,
            destination_airport: None,
            horizontal_distance_km: None,
        }
    }

    #[test]
    fn test_initial_frame_is_presented() {
        let controller = TrackingController::new(FakeLink::default(), Frames::default(), TargetId::Mars);
        let frames = &controller.scene.0;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].status, status::INITIALIZING);
        assert_eq!(frames[0].target, TargetId::Mars);
        assert!(frames[0].pointer.is_none());
    }

    #[test]
    fn test_selecting_aircraft_sends_target_and_searches_immediately() {
        let mut controller = controller();
        controller.handle_stream_event(StreamEvent::Position(sample(10.0, 20.0)));

        controller.handle_command(Command::SelectTarget(TargetId::AircraftOverhead));

        assert_eq!(controller.link.take(), vec![Sent::Target(TargetId::AircraftOverhead)]);
        assert_eq!(controller.frame().status, status::SEARCHING_AIRCRAFT);
        assert_eq!(controller.target(), TargetId::AircraftOverhead);
        assert_eq!(controller.scene.0.last().unwrap().status, status::SEARCHING_AIRCRAFT);
    }

    #[test]
    fn test_selecting_a_planet_keeps_status_until_next_sample() {
        let mut controller = controller();
        controller.handle_stream_event(StreamEvent::Position(sample(10.0, 20.0)));
        let before = controller.frame().status.clone();

        controller.select_target(TargetId::Venus);
        assert_eq!(controller.link.take(), vec![Sent::Target(TargetId::Venus)]);
        assert_eq!(controller.frame().status, before);
    }

    #[test]
    fn test_pointer_waits_for_first_sample() {
        let mut controller = controller();
        controller.handle_orientation(OrientationSample::new(0.0, 0.0, 0.0));
        assert!(controller.frame().pointer.is_none());
        assert!(controller.frame().camera.is_some());

        controller.handle_stream_event(StreamEvent::Position(sample(90.0, 0.0)));
        assert_eq!(controller.frame().pointer, Some(pointer_orientation(90.0, 0.0)));
        assert!(controller.frame().status.starts_with("Tracking: SUN"));
    }

    #[test]
    fn test_manual_direction_wins_over_stream() {
        let mut controller = controller();
        controller.handle_command(Command::SetManualDirection {
            azimuth_deg: 90.0,
            altitude_deg: 0.0,
        });
        controller.set_axis_mode(Axis::Direction, true);
        assert_eq!(controller.frame().status, "Manual Direction (Az: 90.0, Alt: 0.0)");

        controller.handle_stream_event(StreamEvent::Position(sample(10.0, 45.0)));
        controller.handle_stream_event(StreamEvent::Closed);
        assert_eq!(controller.frame().pointer, Some(pointer_orientation(90.0, 0.0)));
        assert_eq!(controller.frame().status, "Manual Direction (Az: 90.0, Alt: 0.0)");

        controller.set_axis_mode(Axis::Direction, false);
        assert_eq!(controller.frame().pointer, Some(pointer_orientation(10.0, 45.0)));
        assert!(controller.frame().status.starts_with("Tracking: SUN"));
    }

    #[test]
    fn test_manual_bearing_ignores_device_orientation() {
        let mut controller = controller();
        controller.handle_command(Command::SetManualBearing(45.0));
        controller.handle_command(Command::SetAxisMode {
            axis: Axis::Bearing,
            manual: true,
        });
        controller.handle_orientation(OrientationSample::new(180.0, 10.0, 5.0));
        assert_eq!(controller.frame().camera, Some(camera_bearing_orbit(45.0)));
    }

    #[test]
    fn test_position_is_only_sent_when_it_changes() {
        let mut controller = controller();
        let fix = GeoSample::from_fix(45.5, -73.6, Some(30.0));

        controller.handle_position(fix);
        controller.handle_position(fix);
        controller.handle_orientation(OrientationSample::new(1.0, 2.0, 3.0));
        assert_eq!(controller.link.take(), vec![Sent::Location(45.5, -73.6, 30.0)]);
        assert_eq!(
            controller.frame().position_readout.as_deref(),
            Some("Lat: 45.500000°\nLon: -73.600000°\nElev: 30.0 m")
        );

        controller.handle_position(GeoSample::from_fix(45.6, -73.6, None));
        assert_eq!(controller.link.take(), vec![Sent::Location(45.6, -73.6, 0.0)]);
    }

    #[test]
    fn test_manual_elevation_rewrites_outbound_position() {
        let mut controller = controller();
        controller.handle_position(GeoSample::from_fix(45.5, -73.6, Some(30.0)));
        controller.link.take();

        controller.handle_command(Command::SetManualPosition {
            latitude_deg: 1.0,
            longitude_deg: 2.0,
            elevation_m: 500.0,
        });
        controller.set_axis_mode(Axis::Position, true);
        assert_eq!(controller.link.take(), vec![Sent::Location(45.5, -73.6, 500.0)]);

        controller.handle_command(Command::SetElevationOnly(false));
        assert_eq!(controller.link.take(), vec![Sent::Location(1.0, 2.0, 500.0)]);

        controller.handle_position(GeoSample::from_fix(10.0, 10.0, None));
        assert!(controller.link.take().is_empty());
    }

    #[test]
    fn test_reconnect_resends_target_and_position() {
        let mut controller = controller();
        controller.select_target(TargetId::Jupiter);
        controller.handle_position(GeoSample::from_fix(45.5, -73.6, None));
        controller.link.take();

        controller.link.open.set(false);
        controller.handle_stream_event(StreamEvent::Closed);
        assert_eq!(controller.frame().status, status::CONNECTION_LOST);
        controller.handle_position(GeoSample::from_fix(46.0, -73.6, None));
        assert!(controller.link.take().is_empty());

        controller.link.open.set(true);
        controller.handle_stream_event(StreamEvent::Opened);
        assert_eq!(
            controller.link.take(),
            vec![
                Sent::Target(TargetId::Jupiter),
                Sent::Location(46.0, -73.6, 0.0)
            ]
        );
        assert_eq!(controller.frame().status, status::CONNECTED);
    }

    #[test]
    fn test_aircraft_status_only_matters_for_aircraft_target() {
        let mut controller = controller();
        controller.handle_stream_event(StreamEvent::Position(sample(10.0, 20.0)));
        let searching = StreamEvent::AircraftStatus(AircraftStatus {
            state: AircraftState::Searching,
        });

        controller.handle_stream_event(searching.clone());
        assert!(controller.frame().status.starts_with("Tracking: SUN"));

        controller.select_target(TargetId::AircraftOverhead);
        controller.handle_stream_event(StreamEvent::Position(sample(10.0, 20.0)));
        assert!(controller.frame().status.starts_with("Tracking:"));
        controller.handle_stream_event(searching);
        assert_eq!(controller.frame().status, status::SEARCHING_AIRCRAFT);
    }

    #[test]
    fn test_sensor_and_asset_statuses() {
        let mut controller = controller();
        controller.handle_command(Command::SceneLoaded(Ok(())));
        assert_eq!(controller.frame().status, status::ASSET_LOADED);
        controller.handle_command(Command::SceneLoaded(Err("missing mesh".into())));
        assert_eq!(controller.frame().status, status::ASSET_FAILED);

        controller.orientation_permission(false);
        assert_eq!(controller.frame().status, status::ORIENTATION_DENIED);
        assert!(!controller.frame().orientation_enabled);
        controller.orientation_permission(true);
        assert!(controller.frame().orientation_enabled);

        controller.geolocation_unavailable();
        assert_eq!(controller.frame().status, status::GEOLOCATION_UNAVAILABLE);
    }

    #[test]
    fn test_missing_orientation_angle_keeps_last_camera() {
        let mut controller = controller();
        controller.handle_orientation(OrientationSample::new(30.0, 0.0, 0.0));
        let camera = controller.frame().camera;
        assert!(camera.is_some());

        controller.handle_orientation(OrientationSample {
            alpha: Some(90.0),
            beta: None,
            gamma: Some(0.0),
        });
        assert_eq!(controller.frame().camera, camera);
    }

    #[test]
    fn test_sensor_warnings_survive_connection_changes() {
        let mut controller =
            TrackingController::new(FakeLink::default(), Frames::default(), TargetId::Sun);
        controller.geolocation_unavailable();
        controller.link.open.set(true);
        controller.handle_stream_event(StreamEvent::Opened);
        assert_eq!(controller.frame().status, status::GEOLOCATION_UNAVAILABLE);

        controller.orientation_permission(false);
        controller.handle_command(Command::SceneLoaded(Ok(())));
        controller.link.open.set(false);
        controller.handle_stream_event(StreamEvent::Closed);
        controller.link.open.set(true);
        controller.handle_stream_event(StreamEvent::Opened);
        assert_eq!(controller.frame().status, status::ORIENTATION_DENIED);

        controller.handle_stream_event(StreamEvent::Position(sample(10.0, 20.0)));
        assert!(controller.frame().status.starts_with("Tracking: SUN"));
    }

    #[test]
    fn test_aircraft_search_survives_reconnect() {
        let mut controller = TrackingController::new(
            FakeLink::default(),
            Frames::default(),
            TargetId::AircraftOverhead,
        );
        controller.link.open.set(true);
        controller.handle_stream_event(StreamEvent::Opened);
        assert_eq!(controller.frame().status, status::SEARCHING_AIRCRAFT);

        controller.link.open.set(false);
        controller.handle_stream_event(StreamEvent::Closed);
        assert_eq!(controller.frame().status, status::CONNECTION_LOST);

        controller.link.open.set(true);
        controller.handle_stream_event(StreamEvent::Opened);
        assert_eq!(controller.frame().status, status::SEARCHING_AIRCRAFT);
        assert_eq!(
            controller.link.take(),
            vec![
                Sent::Target(TargetId::AircraftOverhead),
                Sent::Target(TargetId::AircraftOverhead)
            ]
        );
    }

    #[test]
    fn test_leaving_manual_direction_without_samples_waits() {
        let mut controller = controller();
        controller.set_axis_mode(Axis::Direction, true);
        assert!(controller.frame().status.starts_with("Manual Direction"));

        controller.set_axis_mode(Axis::Direction, false);
        assert_eq!(controller.frame().status, status::CONNECTED);

        let mut offline =
            TrackingController::new(FakeLink::default(), Frames::default(), TargetId::Sun);
        offline.set_axis_mode(Axis::Direction, true);
        offline.set_axis_mode(Axis::Direction, false);
        assert_eq!(offline.frame().status, status::INITIALIZING);
    }
}

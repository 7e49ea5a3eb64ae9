//! Human-readable status text.

use crate::{protocol::DirectionSample, sensors::GeoSample};

/// Kilometres per astronomical unit.
pub const AU_IN_KM: f64 = 149_597_870.7;
/// Kilometres per light-year.
pub const LY_IN_KM: f64 = 9.460_730_472_580_8e12;

/// Upper bound of the kilometre band.
const KM_BAND_LIMIT: f64 = 10_000_000.0;

pub const INITIALIZING: &str = "Initializing...";
pub const ASSET_LOADED: &str = "Arrow loaded. Waiting for location...";
pub const ASSET_FAILED: &str = "Error loading asset";
pub const ORIENTATION_DENIED: &str = "Orientation permission denied";
pub const SEARCHING_AIRCRAFT: &str = "Searching for aircraft within 15 km...";
pub const GEOLOCATION_UNAVAILABLE: &str = "Geolocation unavailable. Waiting for location...";
pub const CONNECTION_LOST: &str = "Connection lost. Reconnecting...";
pub const CONNECTED: &str = "Connected. Waiting for direction updates...";

/// Format a distance given in kilometres using banded units.
///
/// Below 1 km in whole metres, below 10 million km in kilometres with at most
/// one decimal, then astronomical units up to one light-year, then light-years.
pub fn format_distance(distance_km: f64) -> String {
    if distance_km < 1.0 {
        format!("{:.0} m", distance_km * 1000.0)
    } else if distance_km < KM_BAND_LIMIT {
        format!("{} km", group_tenths(distance_km))
    } else if distance_km < LY_IN_KM {
        format!("{:.2} AU", distance_km / AU_IN_KM)
    } else {
        format!("{:.2} ly", distance_km / LY_IN_KM)
    }
}

/// `1234.56` -> `1,234.6`, `42.0` -> `42`.
fn group_tenths(value: f64) -> String {
    let tenths = (value * 10.0).round() as u64;
    let whole = (tenths / 10).to_string();
    let fraction = tenths % 10;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if fraction == 0 {
        grouped
    } else {
        format!("{grouped}.{fraction}")
    }
}

/// Status text for a streamed direction sample, including aircraft details
/// when the service provides them.
pub fn tracking_status(sample: &DirectionSample) -> String {
    let mut info = format!(
        "Tracking: {}\nAz: {:.1}°, Alt: {:.1}°, Dist: {}",
        sample.target_id,
        sample.azimuth_deg,
        sample.altitude_deg,
        format_distance(sample.distance_km)
    );

    if let Some(horizontal) = sample.horizontal_distance_km {
        info.push_str(&format!("\nHoriz Dist: {}", format_distance(horizontal)));
    }
    if let Some(altitude) = sample.aircraft_altitude_m {
        info.push_str(&format!("\nFlight Alt: {altitude:.0} m"));
    }
    if let Some(speed) = sample.ground_speed_kmh {
        info.push_str(&format!("\nSpeed: {speed:.0} km/h"));
    }
    if let Some(vertical) = sample.vertical_speed_mps {
        info.push_str(&format!(", V.Spd: {vertical:.1} m/s"));
    }
    if sample.origin_airport.is_some() || sample.destination_airport.is_some() {
        info.push_str(&format!(
            "\nRoute: {} -> {}",
            sample.origin_airport.as_deref().unwrap_or("?"),
            sample.destination_airport.as_deref().unwrap_or("?")
        ));
    }

    info
}

pub fn manual_direction_status(azimuth_deg: f64, altitude_deg: f64) -> String {
    format!("Manual Direction (Az: {azimuth_deg:.1}, Alt: {altitude_deg:.1})")
}

/// Readout of the position reported upstream.
pub fn position_readout(position: &GeoSample) -> String {
    format!(
        "Lat: {:.6}°\nLon: {:.6}°\nElev: {:.1} m",
        position.latitude_deg, position.longitude_deg, position.elevation_m
    )
}

//! Proximity listing
//!
//! Distance and heading of each active sighting relative to an origin, split
//! into a prominent list and a list of suppressed species, both ordered by
//! distance.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{GeoPoint, Sighting};

/// Earth radius used to turn great-circle angles into meters
pub const EARTH_RADIUS_METERS: f64 = 6_366_468.241_830_914;

/// Per-axis difference in degrees below which no heading is reported
const HEADING_TOLERANCE_DEGREES: f64 = 1e-4;

const SECONDS_PER_DAY: i64 = 86_400;

/// Distance cutoffs applied when building a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPolicy {
    /// Prominent entries farther than this (meters) are dropped
    pub max_distance: u32,
    /// Suppressed entries are kept only when strictly closer than this (meters)
    pub suppressed_max_distance: u32,
}

impl Default for ReportPolicy {
    fn default() -> Self {
        Self {
            max_distance: 1000,
            suppressed_max_distance: 150,
        }
    }
}

/// One line of the proximity listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub id: i32,
    pub name: String,
    /// Compass heading from the origin, e.g. "NE", "W" or "" when on top of it
    pub card_dir: String,
    /// Great-circle distance in whole meters
    pub distance: u32,
    pub time_to_disappear: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Sightings near the origin, each list sorted by ascending distance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProximityReport {
    pub prominent: Vec<ReportEntry>,
    pub suppressed: Vec<ReportEntry>,
}

/// Build the proximity report for `sightings` as seen from `origin`.
///
/// Species in `suppressed` go to the secondary list when closer than
/// `policy.suppressed_max_distance`, everything else to the prominent list when
/// within `policy.max_distance`. Entries beyond their cutoff are dropped. Both
/// lists keep input order among equal distances.
pub fn compute_report(
    origin: GeoPoint,
    sightings: &[Sighting],
    suppressed: &HashSet<i32>,
    policy: &ReportPolicy,
    now: DateTime<Utc>,
) -> ProximityReport {
    let mut report = ProximityReport::default();

    for sighting in sightings {
        let entry = ReportEntry {
            id: sighting.pokemon_id,
            name: sighting.pokemon_name.clone(),
            card_dir: heading(&origin, &sighting.position),
            distance: distance_meters(&origin, &sighting.position),
            time_to_disappear: remaining_label((sighting.disappear_time - now).num_seconds()),
            latitude: sighting.position.latitude,
            longitude: sighting.position.longitude,
        };

        if suppressed.contains(&entry.id) {
            if entry.distance < policy.suppressed_max_distance {
                report.suppressed.push(entry);
            }
        } else if entry.distance <= policy.max_distance {
            report.prominent.push(entry);
        }
    }

    report.prominent.sort_by_key(|entry| entry.distance);
    report.suppressed.sort_by_key(|entry| entry.distance);
    report
}

/// Compass heading from `from` to `to`, north/south part first
pub fn heading(from: &GeoPoint, to: &GeoPoint) -> String {
    let diff_lat = to.latitude - from.latitude;
    let diff_lng = to.longitude - from.longitude;

    let mut label = String::with_capacity(2);
    if diff_lat.abs() > HEADING_TOLERANCE_DEGREES {
        label.push(if diff_lat >= 0.0 { 'N' } else { 'S' });
    }
    if diff_lng.abs() > HEADING_TOLERANCE_DEGREES {
        label.push(if diff_lng >= 0.0 { 'E' } else { 'W' });
    }
    label
}

/// Central angle between two points in radians (haversine form)
pub fn central_angle(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (0.5 * (lat2 - lat1)).sin();
    let dlng = (0.5 * (b.longitude - a.longitude).to_radians()).sin();
    let x = dlat * dlat + dlng * dlng * lat1.cos() * lat2.cos();
    2.0 * x.min(1.0).sqrt().asin()
}

/// Great-circle distance truncated to whole meters
pub fn distance_meters(a: &GeoPoint, b: &GeoPoint) -> u32 {
    (central_angle(a, b) * EARTH_RADIUS_METERS) as u32
}

/// Remaining time as "MMm SSs", or "SSs" under a minute
///
/// Only the seconds-of-day part of the duration is shown; whole days are
/// discarded and negative durations wrap.
pub fn remaining_label(seconds: i64) -> String {
    let seconds = seconds.rem_euclid(SECONDS_PER_DAY);
    let (minutes, seconds) = (seconds / 60, seconds % 60);
    if minutes == 0 {
        format!("{:02}s", seconds)
    } else {
        format!("{:02}m {:02}s", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 7, 20, 12, 0, 0).unwrap()
    }

    fn sighting(id: i32, lat: f64, lng: f64, seconds_left: i64) -> Sighting {
        Sighting {
            encounter_id: format!("enc-{}-{}-{}", id, lat, lng),
            spawnpoint_id: "sp".to_string(),
            pokemon_id: id,
            pokemon_name: format!("species-{}", id),
            position: GeoPoint::new(lat, lng),
            disappear_time: now() + Duration::seconds(seconds_left),
        }
    }

    #[test]
    fn sighting_at_origin() {
        let origin = GeoPoint::new(60.1699, 24.9384);
        assert_eq!(heading(&origin, &origin), "");
        assert_eq!(distance_meters(&origin, &origin), 0);
    }

    #[test]
    fn heading_within_tolerance_is_omitted() {
        let origin = GeoPoint::new(10.0, 10.0);
        assert_eq!(heading(&origin, &GeoPoint::new(10.00005, 10.00005)), "");
        assert_eq!(heading(&origin, &GeoPoint::new(10.00005, 10.001)), "E");
        assert_eq!(heading(&origin, &GeoPoint::new(9.999, 10.00005)), "S");
        assert_eq!(heading(&origin, &GeoPoint::new(10.001, 9.999)), "NW");
    }

    #[test]
    fn heading_due_east() {
        let origin = GeoPoint::new(45.0, 7.0);
        for step in [0.0002, 0.01, 1.0, 20.0] {
            let label = heading(&origin, &GeoPoint::new(45.0, 7.0 + step));
            assert_eq!(label, "E");
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(37.7749, -122.4194);
        let b = GeoPoint::new(37.7649, -122.4294);
        assert!((central_angle(&a, &b) - central_angle(&b, &a)).abs() < 1e-15);
        assert_eq!(distance_meters(&a, &b), distance_meters(&b, &a));
    }

    #[test]
    fn distance_of_a_millidegree_on_the_equator() {
        let d = distance_meters(&GeoPoint::new(0.0, 0.0), &GeoPoint::new(0.0, 0.001));
        assert_eq!(d, 111);
    }

    #[test]
    fn remaining_time_labels() {
        assert_eq!(remaining_label(45), "45s");
        assert_eq!(remaining_label(5), "05s");
        assert_eq!(remaining_label(75), "01m 15s");
        assert_eq!(remaining_label(600), "10m 00s");
        assert_eq!(remaining_label(6005), "100m 05s");
    }

    #[test]
    fn east_sighting_lands_in_prominent() {
        let sightings = vec![sighting(16, 0.0, 0.001, 45)];
        let report = compute_report(
            GeoPoint::new(0.0, 0.0),
            &sightings,
            &HashSet::new(),
            &ReportPolicy::default(),
            now(),
        );

        assert!(report.suppressed.is_empty());
        assert_eq!(report.prominent.len(), 1);
        let entry = &report.prominent[0];
        assert_eq!(entry.id, 16);
        assert_eq!(entry.card_dir, "E");
        assert_eq!(entry.distance, 111);
        assert_eq!(entry.time_to_disappear, "45s");
        assert_eq!(entry.longitude, 0.001);
    }

    #[test]
    fn suppressed_sighting_uses_its_own_cutoff() {
        let origin = GeoPoint::new(37.7749, -122.4194);
        let target = GeoPoint::new(37.7649, -122.4294);
        let distance = distance_meters(&origin, &target);
        assert!(distance > 1000 && distance < 2000);

        let sightings = vec![sighting(19, target.latitude, target.longitude, 3600)];
        let suppressed: HashSet<i32> = [19].into_iter().collect();

        let within = ReportPolicy {
            max_distance: 0,
            suppressed_max_distance: distance + 1,
        };
        let report = compute_report(origin, &sightings, &suppressed, &within, now());
        assert!(report.prominent.is_empty());
        assert_eq!(report.suppressed.len(), 1);
        assert_eq!(report.suppressed[0].card_dir, "SW");

        let exact = ReportPolicy {
            max_distance: u32::MAX,
            suppressed_max_distance: distance,
        };
        let report = compute_report(origin, &sightings, &suppressed, &exact, now());
        assert!(report.prominent.is_empty());
        assert!(report.suppressed.is_empty());
    }

    #[test]
    fn prominent_cutoff_is_inclusive() {
        let origin = GeoPoint::new(0.0, 0.0);
        let sightings = vec![sighting(1, 0.0, 0.001, 60)];
        let policy = ReportPolicy {
            max_distance: 111,
            suppressed_max_distance: 0,
        };
        let report = compute_report(origin, &sightings, &HashSet::new(), &policy, now());
        assert_eq!(report.prominent.len(), 1);

        let policy = ReportPolicy {
            max_distance: 110,
            ..policy
        };
        let report = compute_report(origin, &sightings, &HashSet::new(), &policy, now());
        assert!(report.prominent.is_empty());
    }

    #[test]
    fn lists_are_sorted_and_partitioned() {
        let origin = GeoPoint::new(0.0, 0.0);
        let sightings = vec![
            sighting(1, 0.0, 0.005, 100),
            sighting(2, 0.0, 0.0005, 100),
            sighting(1, 0.0, -0.002, 100),
            sighting(3, 0.0009, 0.0, 100),
            sighting(2, 0.0, 0.0001, 100),
            sighting(1, 0.0, 0.002, 100),
            sighting(4, 0.5, 0.5, 100),
        ];
        let suppressed: HashSet<i32> = [2].into_iter().collect();
        let policy = ReportPolicy {
            max_distance: 1000,
            suppressed_max_distance: 150,
        };

        let report = compute_report(origin, &sightings, &suppressed, &policy, now());

        let prominent: Vec<(i32, f64)> = report
            .prominent
            .iter()
            .map(|e| (e.id, e.longitude))
            .collect();
        // Equal distances keep input order: west before east
        assert_eq!(
            prominent,
            vec![(3, 0.0), (1, -0.002), (1, 0.002), (1, 0.005)]
        );
        assert!(report.prominent.iter().all(|e| !suppressed.contains(&e.id)));
        assert!(report
            .prominent
            .windows(2)
            .all(|w| w[0].distance <= w[1].distance));

        let ids: Vec<i32> = report.suppressed.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 2]);
        assert_eq!(report.suppressed[0].longitude, 0.0001);
        assert_eq!(report.suppressed[0].card_dir, "");
        assert_eq!(report.suppressed[1].card_dir, "E");
    }

    #[test]
    fn empty_input_gives_empty_report() {
        let report = compute_report(
            GeoPoint::new(1.0, 1.0),
            &[],
            &HashSet::new(),
            &ReportPolicy::default(),
            now(),
        );
        assert_eq!(report, ProximityReport::default());
    }
}

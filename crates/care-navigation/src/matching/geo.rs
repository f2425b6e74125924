use crate::beneficiary::Location;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Distance bands (upper bound in km, score) shared by provider and navigator proximity.
const DISTANCE_BANDS: [(f64, f64); 4] = [(5.0, 1.0), (10.0, 0.8), (20.0, 0.6), (50.0, 0.4)];
const FAR_DISTANCE_SCORE: f64 = 0.2;

/// Great-circle distance using the haversine formula.
pub fn haversine_km(from: &Location, to: &Location) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

pub fn distance_band_score(distance_km: f64) -> f64 {
    DISTANCE_BANDS
        .iter()
        .find(|(upper, _)| distance_km <= *upper)
        .map(|(_, score)| *score)
        .unwrap_or(FAR_DISTANCE_SCORE)
}

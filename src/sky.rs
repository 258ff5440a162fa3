//! Coordinate parsing and angular distances for picking the nearest catalog row.

/// Parses a right ascension in decimal degrees or `HH:MM:SS.s` (hours).
pub fn parse_ra(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.contains(':') || s.contains(' ') {
        sexagesimal(s).map(|hours| hours * 15.)
    } else {
        s.parse().ok()
    }
}

/// Parses a declination in decimal degrees or `±DD:MM:SS.s`.
pub fn parse_dec(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.contains(':') || s.contains(' ') {
        sexagesimal(s)
    } else {
        s.parse().ok()
    }
}

fn sexagesimal(s: &str) -> Option<f64> {
    let (sign, rest) = match s.strip_prefix('-') {
        Some(r) => (-1., r),
        None => (1., s.strip_prefix('+').unwrap_or(s)),
    };
    let mut parts = rest.split(|c: char| c == ':' || c == ' ').filter(|p| !p.is_empty());
    let units: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0.,
    };
    if parts.next().is_some() || minutes >= 60. || seconds >= 60. {
        return None;
    }
    Some(sign * (units + minutes / 60. + seconds / 3600.))
}

/// Great-circle distance between two (ra, dec) positions, all in degrees.
/// Vincenty form, stable at small and antipodal separations.
pub fn angular_separation(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    let (sin_dec1, cos_dec1) = dec1.to_radians().sin_cos();
    let (sin_dec2, cos_dec2) = dec2.to_radians().sin_cos();
    let (sin_dra, cos_dra) = (ra2 - ra1).to_radians().sin_cos();
    let num = ((cos_dec2 * sin_dra).powi(2)
        + (cos_dec1 * sin_dec2 - sin_dec1 * cos_dec2 * cos_dra).powi(2))
    .sqrt();
    let den = sin_dec1 * sin_dec2 + cos_dec1 * cos_dec2 * cos_dra;
    num.atan2(den).to_degrees()
}

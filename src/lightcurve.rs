use crate::error::{Error, Result};
use chrono::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Julian date of the Unix epoch, 1970-01-01T00:00:00 UTC.
pub const JD_UNIX_EPOCH: f64 = 2440587.5;

/// Columns a light curve file must have, in the order of the `Observation` fields.
pub const REQUIRED_COLUMNS: [&str; 6] = ["hjd", "camera", "mag", "mag_err", "flux", "flux_err"];

/// One photometric measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub hjd: f64,
    pub camera: String,
    pub mag: f64,
    pub mag_err: f64,
    /// mJy
    pub flux: f64,
    pub flux_err: f64,
}

/// A light curve as downloaded from ASAS-SN.
#[derive(Debug, Clone)]
pub struct Lightcurve {
    pub source: PathBuf,
    pub observations: Vec<Observation>,
}

impl Lightcurve {
    /// Init a Lightcurve from csv.
    /// Values that do not parse as numbers (e.g. upper limits like `>17.5`)
    /// become NAN, the observation itself is kept.
    pub fn from_csv<P: AsRef<Path>>(fin: P) -> Result<Lightcurve> {
        let file = std::fs::File::open(fin.as_ref())?;
        Lightcurve::from_reader(file, fin.as_ref())
    }

    pub fn from_reader<R: Read, P: AsRef<Path>>(reader: R, source: P) -> Result<Lightcurve> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = rdr.headers()?.clone();
        // photometry exports capitalise some headers (`HJD`, `Camera`)
        let positions: Vec<Option<usize>> = REQUIRED_COLUMNS
            .iter()
            .map(|c| headers.iter().position(|h| h.eq_ignore_ascii_case(c)))
            .collect();
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .zip(positions.iter())
            .filter(|(_, p)| p.is_none())
            .map(|(c, _)| *c)
            .collect();
        if !missing.is_empty() {
            return Err(Error::FileFormat(format!(
                "{} is missing column(s): {}",
                source.as_ref().display(),
                missing.join(", ")
            )));
        }
        let idx: Vec<usize> = positions.into_iter().flatten().collect();

        let mut observations = Vec::new();
        let mut invalid = 0usize;
        for record in rdr.records() {
            let record = record?;
            let mut number = |i: usize| -> f64 {
                let raw = record.get(idx[i]).unwrap_or("");
                match raw.parse::<f64>() {
                    Ok(v) => v,
                    Err(_) => {
                        log::debug!("invalid {} value '{}'", REQUIRED_COLUMNS[i], raw);
                        invalid += 1;
                        f64::NAN
                    }
                }
            };
            let hjd = number(0);
            let mag = number(2);
            let mag_err = number(3);
            let flux = number(4);
            let flux_err = number(5);
            let camera = record.get(idx[1]).unwrap_or("").to_string();
            observations.push(Observation {
                hjd,
                camera,
                mag,
                mag_err,
                flux,
                flux_err,
            });
        }
        if invalid > 0 {
            log::warn!("{} invalid value(s) replaced with NAN", invalid);
        }
        Ok(Lightcurve {
            source: source.as_ref().to_path_buf(),
            observations,
        })
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Distinct camera labels, in order of first appearance.
    pub fn cameras(&self) -> Vec<&str> {
        let mut cameras: Vec<&str> = Vec::new();
        for o in self.observations.iter() {
            if !cameras.contains(&o.camera.as_str()) {
                cameras.push(&o.camera);
            }
        }
        cameras
    }

    /// Observations grouped by camera; every observation is in exactly one group.
    pub fn by_camera(&self) -> Vec<(&str, Vec<&Observation>)> {
        let mut groups: Vec<(&str, Vec<&Observation>)> = self
            .cameras()
            .into_iter()
            .map(|c| (c, Vec::new()))
            .collect();
        for o in self.observations.iter() {
            if let Some((_, group)) = groups.iter_mut().find(|(c, _)| *c == o.camera) {
                group.push(o);
            }
        }
        groups
    }

    /// First and last observation time, ignoring invalid times.
    pub fn hjd_span(&self) -> Option<(f64, f64)> {
        let hjd: Vec<f64> = self.observations.iter().map(|o| o.hjd).collect();
        crate::min_and_max(&hjd)
    }
}

/// Calendar datetime of a Julian date; HJD differs from UTC by at most ~8.3 minutes.
pub fn jd_to_datetime(jd: f64) -> Option<DateTime<Utc>> {
    if !jd.is_finite() {
        return None;
    }
    let seconds = (jd - JD_UNIX_EPOCH) * 86400.;
    let secs = seconds.floor();
    let nanos = ((seconds - secs) * 1e9).round().min(999_999_999.) as u32;
    Utc.timestamp_opt(secs as i64, nanos).single()
}

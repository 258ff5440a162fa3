pub mod catalog;
pub mod download;
pub mod error;
pub mod fetch;
pub mod lightcurve;
pub mod plot;
pub mod query;
pub mod sky;

pub use error::{Error, Result};

pub const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

/// Reference Julian date subtracted from the observation times on plots.
pub const HJD_OFFSET: f64 = 2457000.;

/// Min and max of the comparable values of a slice (NAN is skipped),
/// None if there are none.
pub fn min_and_max<T: std::cmp::PartialOrd + Copy>(s: &[T]) -> Option<(T, T)> {
    let mut self_iter = s.iter().filter(|v| (**v).partial_cmp(*v).is_some());
    let (mut min, mut max) = match self_iter.next() {
        Some(v) => (*v, *v),
        None => return None,
    };
    for es in self_iter {
        if *es > max {
            max = *es
        }
        if *es < min {
            min = *es
        }
    }
    Some((min, max))
}

/// Time format for calendar axis labels, chosen from the span in days.
pub fn suitable_xfmt(span_days: f64) -> &'static str {
    if span_days > 730. {
        "%Y-%m"
    } else if span_days > 7. {
        "%y-%m-%d"
    } else if span_days > 1. {
        "%m-%d %H"
    } else {
        "%d %H:%M"
    }
}

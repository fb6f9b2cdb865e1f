use super::types::{FinalGradingBand, GradingBand};

/// A closed numeric range mapped to a grade.
pub trait Band {
    fn bounds(&self) -> (f64, f64);

    fn contains(&self, value: f64) -> bool {
        let (min, max) = self.bounds();
        min <= value && value <= max
    }
}

impl Band for GradingBand {
    fn bounds(&self) -> (f64, f64) {
        (self.min_score, self.max_score)
    }
}

impl Band for FinalGradingBand {
    fn bounds(&self) -> (f64, f64) {
        (self.min_value, self.max_value)
    }
}

/// First band, in the order supplied, whose range contains `value`.
pub fn resolve<B: Band>(value: f64, bands: &[B]) -> Option<&B> {
    bands.iter().find(|b| b.contains(value))
}

/// Stable ascending sort by lower bound; the scan order lookups return.
#[cfg(test)]
pub fn sort_by_min<B: Band>(bands: &mut [B]) {
    use std::cmp::Ordering;

    bands.sort_by(|a, b| {
        a.bounds()
            .0
            .partial_cmp(&b.bounds().0)
            .unwrap_or(Ordering::Equal)
    });
}

/// Checks a candidate range against existing bands before it is stored.
///
/// `skip` lets an update ignore the band it is replacing.
pub fn check_candidate<B, F>(
    min: f64,
    max: f64,
    existing: &[B],
    skip: F,
) -> Result<(), String>
where
    B: Band,
    F: Fn(&B) -> bool,
{
    if !min.is_finite() || !max.is_finite() {
        return Err("band bounds must be finite numbers".to_string());
    }
    if min > max {
        return Err(format!("min ({}) cannot exceed max ({})", min, max));
    }
    for b in existing.iter().filter(|b| !skip(*b)) {
        let (bmin, bmax) = b.bounds();
        if min <= bmax && bmin <= max {
            return Err(format!(
                "range {}..={} overlaps existing band {}..={}",
                min, max, bmin, bmax
            ));
        }
    }
    Ok(())
}

//! Whole-image distance and nearest-reference search.
//!
//! The metric is the mean absolute difference over the R, G and B channels
//! of every pixel, alpha ignored. It says nothing about faces specifically;
//! a change of pose or lighting moves the score as much as a change of person.

use crate::types::{MatchCandidate, NormalizedImage, Reference, CHANNELS};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("no references registered")]
    NoReferences,
    #[error("fingerprint sizes differ: {left}px vs {right}px")]
    DimensionMismatch { left: u32, right: u32 },
}

/// Mean absolute RGB difference between two fingerprints, in [0, 255].
pub fn distance(a: &NormalizedImage, b: &NormalizedImage) -> Result<f64, MatchError> {
    if a.size() != b.size() {
        return Err(MatchError::DimensionMismatch {
            left: a.size(),
            right: b.size(),
        });
    }

    let total: u64 = a
        .pixels()
        .chunks_exact(CHANNELS)
        .zip(b.pixels().chunks_exact(CHANNELS))
        .map(|(p, q)| (0..3).map(|c| p[c].abs_diff(q[c]) as u64).sum::<u64>())
        .sum();

    Ok(total as f64 / (a.pixel_count() * 3) as f64)
}

/// Strategy for finding the reference closest to a probe.
///
/// Implementations report the nearest candidate only; accepting or rejecting
/// it is up to the caller.
pub trait Matcher {
    fn nearest(
        &self,
        probe: &NormalizedImage,
        references: &[Reference],
    ) -> Result<MatchCandidate, MatchError>;
}

/// Linear scan in store order using [`distance`]. Ties keep the earlier reference.
pub struct MeanAbsoluteDifference;

impl Matcher for MeanAbsoluteDifference {
    fn nearest(
        &self,
        probe: &NormalizedImage,
        references: &[Reference],
    ) -> Result<MatchCandidate, MatchError> {
        let mut best: Option<MatchCandidate> = None;

        for (index, reference) in references.iter().enumerate() {
            let d = distance(probe, &reference.image)?;
            tracing::debug!(name = %reference.name, index, distance = d, "compared reference");

            let is_better = match &best {
                None => true,
                Some(prev) => d < prev.distance,
            };
            if is_better {
                best = Some(MatchCandidate {
                    name: reference.name.clone(),
                    distance: d,
                    index,
                });
            }
        }

        best.ok_or(MatchError::NoReferences)
    }
}

pub fn best_match(
    probe: &NormalizedImage,
    references: &[Reference],
) -> Result<MatchCandidate, MatchError> {
    MeanAbsoluteDifference.nearest(probe, references)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn solid(size: u32, rgba: [u8; 4]) -> NormalizedImage {
        let pixels = rgba.repeat((size * size) as usize);
        NormalizedImage::from_raw(size, pixels).unwrap()
    }

    fn reference(name: &str, image: NormalizedImage) -> Reference {
        Reference { name: name.into(), image }
    }

    #[test]
    fn test_distance_identical_is_zero() {
        let a = solid(4, [12, 34, 56, 255]);
        assert_eq!(distance(&a, &a).unwrap(), 0.0);
    }

    #[test]
    fn test_distance_ignores_alpha() {
        let a = solid(4, [100, 100, 100, 0]);
        let b = solid(4, [100, 100, 100, 255]);
        assert_eq!(distance(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_distance_full_scale() {
        let black = solid(2, [0, 0, 0, 255]);
        let white = solid(2, [255, 255, 255, 255]);
        assert_eq!(distance(&black, &white).unwrap(), 255.0);
    }

    #[test]
    fn test_distance_averages_channels() {
        // Only red differs, by 90: 90 / 3 = 30 per channel on average.
        let a = solid(3, [0, 50, 50, 255]);
        let b = solid(3, [90, 50, 50, 255]);
        assert!((distance(&a, &b).unwrap() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_dimension_mismatch() {
        let err = distance(&solid(2, [0; 4]), &solid(3, [0; 4])).unwrap_err();
        assert_eq!(err, MatchError::DimensionMismatch { left: 2, right: 3 });
    }

    #[test]
    fn test_nearest_empty_is_no_references() {
        let probe = solid(2, [0; 4]);
        assert_eq!(best_match(&probe, &[]).unwrap_err(), MatchError::NoReferences);
    }

    #[test]
    fn test_nearest_scans_all_references() {
        let probe = solid(2, [200, 200, 200, 255]);
        let refs = vec![
            reference("far", solid(2, [0, 0, 0, 255])),
            reference("mid", solid(2, [100, 100, 100, 255])),
            reference("near", solid(2, [190, 190, 190, 255])),
        ];
        let best = best_match(&probe, &refs).unwrap();
        assert_eq!(best.name, "near");
        assert_eq!(best.index, 2);
        assert!((best.distance - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_tie_keeps_first_in_store_order() {
        let probe = solid(2, [100, 100, 100, 255]);
        let refs = vec![
            reference("first", solid(2, [110, 110, 110, 255])),
            reference("second", solid(2, [90, 90, 90, 255])),
        ];
        let best = best_match(&probe, &refs).unwrap();
        assert_eq!(best.name, "first");
        assert_eq!(best.index, 0);
    }

    #[test]
    fn test_nearest_reports_far_candidate_without_deciding() {
        let probe = solid(2, [0, 0, 0, 255]);
        let refs = vec![reference("only", solid(2, [255, 255, 255, 255]))];
        let best = best_match(&probe, &refs).unwrap();
        assert_eq!(best.name, "only");
        assert_eq!(best.distance, 255.0);
    }

    fn arb_image(size: u32) -> impl Strategy<Value = NormalizedImage> {
        prop::collection::vec(any::<u8>(), (size * size * 4) as usize)
            .prop_map(move |pixels| NormalizedImage::from_raw(size, pixels).unwrap())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_distance_identity(x in arb_image(6)) {
            prop_assert_eq!(distance(&x, &x).unwrap(), 0.0);
        }

        #[test]
        fn prop_distance_symmetric(a in arb_image(6), b in arb_image(6)) {
            prop_assert_eq!(distance(&a, &b).unwrap(), distance(&b, &a).unwrap());
        }

        #[test]
        fn prop_distance_in_range(a in arb_image(6), b in arb_image(6)) {
            let d = distance(&a, &b).unwrap();
            prop_assert!((0.0..=255.0).contains(&d));
        }
    }
}

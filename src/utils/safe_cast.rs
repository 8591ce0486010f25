//! Safe casting utilities for pixel values and device properties

use crate::{Error, Result};

/// Safely convert a device-reported f64 property to u32
///
/// # Errors
///
/// Returns an error if the value is not finite, negative or above u32::MAX
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Truncation after bounds check is safe
pub fn f64_to_u32(value: f64) -> Result<u32> {
    if value.is_finite() && value >= 0.0 && value <= f64::from(u32::MAX) {
        Ok(value as u32)
    } else {
        Err(Error::InvalidInput(format!(
            "Value {value} cannot be safely converted to u32"
        )))
    }
}

/// Round and saturate an f64 into a pixel channel value
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Clamping ensures safe truncation
pub fn f64_to_u8_saturating(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_f64_to_u32() {
        assert_eq!(f64_to_u32(1280.0).unwrap(), 1280);
        assert_eq!(f64_to_u32(0.0).unwrap(), 0);
        assert_eq!(f64_to_u32(29.97).unwrap(), 29);

        assert!(f64_to_u32(-1.0).is_err());
        assert!(f64_to_u32(f64::NAN).is_err());
        assert!(f64_to_u32(f64::INFINITY).is_err());
        assert!(f64_to_u32(f64::from(u32::MAX) + 1.0).is_err());
    }

    #[test]
    fn test_f64_to_u8_saturating() {
        assert_eq!(f64_to_u8_saturating(127.4), 127);
        assert_eq!(f64_to_u8_saturating(127.5), 128);
        assert_eq!(f64_to_u8_saturating(-12.0), 0);
        assert_eq!(f64_to_u8_saturating(300.0), 255);
        assert_eq!(f64_to_u8_saturating(f64::NAN), 0);
        assert_eq!(f64_to_u8_saturating(f64::INFINITY), 255);
        assert_eq!(f64_to_u8_saturating(f64::NEG_INFINITY), 0);
    }

    proptest! {
        #[test]
        fn prop_u8_saturating_round_trips_channels(value in any::<u8>()) {
            prop_assert_eq!(f64_to_u8_saturating(f64::from(value)), value);
        }
    }
}

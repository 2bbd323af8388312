//! Unit newtypes for the restorable electrical fields carried by buses and branches.
//!
//! The topology engine never does electrical arithmetic itself, but bus voltages,
//! angles and branch phase shifts are captured and restored by [`crate::state`].
//! Wrapping them keeps a radian from being restored into a per-unit slot.
//!
//! ```
//! use lfnet_core::units::{PerUnit, Radians};
//!
//! assert_eq!(PerUnit(1.02).value(), 1.02);
//! assert_eq!(Radians(-0.5).to_string(), "-0.5000 rad");
//! ```

use serde::{Deserialize, Serialize};

macro_rules! impl_unit {
    ($type:ty, $unit_name:literal) => {
        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
            }
        }

        impl $type {
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }
        }
    };
}

/// Dimensionless per-unit quantity (voltage magnitude, ratio)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct PerUnit(pub f64);

impl_unit!(PerUnit, "pu");

/// Angle in radians
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Radians(pub f64);

impl_unit!(Radians, "rad");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(PerUnit(1.0).to_string(), "1.0000 pu");
        assert_eq!(Radians(-0.5).to_string(), "-0.5000 rad");
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&Radians(0.25)).unwrap();
        assert_eq!(json, "0.25");
        let back: PerUnit = serde_json::from_str("0.97").unwrap();
        assert_eq!(back.value(), 0.97);
    }
}

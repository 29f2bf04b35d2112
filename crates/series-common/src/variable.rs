//! Variable descriptors and interpolation kinds.

use serde::{Deserialize, Serialize};

/// How a variable is reconstructed when the native cadence is coarser than
/// the requested one, or when samples are missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Interpolation {
    /// Linear between the two bracketing samples.
    #[default]
    Linear,
    /// 4-point cubic Hermite, optionally clamped to a physical range.
    Hermite {
        #[serde(default)]
        bounds: Option<(f32, f32)>,
    },
    /// Backwards-averaged radiation, interpolated as clearness index.
    SolarBackwardsAveraged,
    /// Backwards sums (precipitation); rescaled by `dt_new / dt_old`.
    BackwardsSum,
    /// Step hold. The sample at or after `t` is used.
    Backwards,
}

impl Interpolation {
    /// Extra source steps needed on each side of the requested window.
    pub fn padding(&self) -> usize {
        match self {
            Self::Linear => 1,
            Self::Hermite { .. } => 2,
            Self::SolarBackwardsAveraged => 2,
            Self::BackwardsSum => 1,
            Self::Backwards => 0,
        }
    }

    /// Whether source samples describe the interval ending at their timestamp.
    pub fn is_backwards(&self) -> bool {
        matches!(
            self,
            Self::SolarBackwardsAveraged | Self::BackwardsSum | Self::Backwards
        )
    }

    /// Parse from a short name (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linear" => Some(Self::Linear),
            "hermite" => Some(Self::Hermite { bounds: None }),
            "solar" | "solar_backwards_averaged" => Some(Self::SolarBackwardsAveraged),
            "backwards_sum" | "sum" => Some(Self::BackwardsSum),
            "backwards" | "step" => Some(Self::Backwards),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Hermite { .. } => "hermite",
            Self::SolarBackwardsAveraged => "solar_backwards_averaged",
            Self::BackwardsSum => "backwards_sum",
            Self::Backwards => "backwards",
        }
    }
}

impl std::fmt::Display for Interpolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Describes a stored variable.
///
/// Implemented by [`crate::config::VariableConfig`] for YAML-configured
/// variables; callers with static variable tables can implement it on an enum.
pub trait VariableDescriptor: Send + Sync {
    /// Storage name, also the directory name under the domain root.
    fn name(&self) -> &str;

    /// Values are stored as `round(v * scale_factor)` in 16 bits.
    fn scale_factor(&self) -> f32;

    fn interpolation(&self) -> Interpolation;

    fn unit(&self) -> &str;

    /// Whether the value can be corrected for a station/model elevation
    /// difference (e.g. temperature lapse rate).
    fn is_elevation_correctable(&self) -> bool {
        false
    }

    /// Cumulative quantities whose baselines differ between sources. These are
    /// mixed on their deltas rather than raw values.
    fn requires_offset_correction(&self) -> bool {
        false
    }
}

impl<T: VariableDescriptor + ?Sized> VariableDescriptor for &T {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn scale_factor(&self) -> f32 {
        (**self).scale_factor()
    }
    fn interpolation(&self) -> Interpolation {
        (**self).interpolation()
    }
    fn unit(&self) -> &str {
        (**self).unit()
    }
    fn is_elevation_correctable(&self) -> bool {
        (**self).is_elevation_correctable()
    }
    fn requires_offset_correction(&self) -> bool {
        (**self).requires_offset_correction()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding() {
        assert_eq!(Interpolation::Linear.padding(), 1);
        assert_eq!(Interpolation::Hermite { bounds: None }.padding(), 2);
        assert_eq!(Interpolation::SolarBackwardsAveraged.padding(), 2);
        assert_eq!(Interpolation::BackwardsSum.padding(), 1);
        assert_eq!(Interpolation::Backwards.padding(), 0);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Interpolation::from_str("LINEAR"), Some(Interpolation::Linear));
        assert_eq!(Interpolation::from_str("sum"), Some(Interpolation::BackwardsSum));
        assert_eq!(Interpolation::from_str("cubic"), None);
    }

    #[test]
    fn test_yaml_tagged() {
        let hermite: Interpolation =
            serde_yaml::from_str("kind: hermite\nbounds: [0.0, 100.0]\n").unwrap();
        assert_eq!(
            hermite,
            Interpolation::Hermite {
                bounds: Some((0.0, 100.0))
            }
        );
        let solar: Interpolation = serde_yaml::from_str("kind: solar_backwards_averaged").unwrap();
        assert!(solar.is_backwards());
    }
}

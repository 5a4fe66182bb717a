use serde::{Deserialize, Serialize};

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both components finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Substituted when the device cannot report a position (Caxias do Sul city centre).
pub const FALLBACK_COORDINATE: Coordinate = Coordinate::new(-29.1683, -51.1894);

/// Why the device position could not be used. Advisory only; the map still renders.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied. Showing the default area.")]
    PermissionDenied,
    #[error("Your position is unavailable. Showing the default area.")]
    Unavailable,
    #[error("Timed out while locating you. Showing the default area.")]
    Timeout,
    #[error("This browser does not support geolocation. Showing the default area.")]
    Unsupported,
}

impl LocationError {
    /// Map a `GeolocationPositionError.code` onto the taxonomy.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            3 => Self::Timeout,
            _ => Self::Unavailable,
        }
    }
}

/// One-shot acquisition state. Transitions exactly once per view lifetime.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationState {
    Pending,
    Resolved {
        coordinate: Coordinate,
        used_fallback: bool,
        advisory: Option<LocationError>,
    },
}

impl LocationState {
    pub fn from_fix(coordinate: Coordinate) -> Self {
        if !coordinate.is_valid() {
            return Self::from_failure(LocationError::Unavailable);
        }
        Self::Resolved {
            coordinate,
            used_fallback: false,
            advisory: None,
        }
    }

    pub fn from_failure(error: LocationError) -> Self {
        Self::Resolved {
            coordinate: FALLBACK_COORDINATE,
            used_fallback: true,
            advisory: Some(error),
        }
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            Self::Pending => None,
            Self::Resolved { coordinate, .. } => Some(*coordinate),
        }
    }

    pub fn advisory(&self) -> Option<&LocationError> {
        match self {
            Self::Pending => None,
            Self::Resolved { advisory, .. } => advisory.as_ref(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    /// Apply an outcome. Ignored once resolved.
    pub fn resolve(&mut self, outcome: Result<Coordinate, LocationError>) -> bool {
        if self.is_resolved() {
            return false;
        }
        *self = match outcome {
            Ok(coordinate) => Self::from_fix(coordinate),
            Err(error) => Self::from_failure(error),
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_resolves_to_fallback_with_advisory() {
        let mut state = LocationState::Pending;
        assert!(state.resolve(Err(LocationError::PermissionDenied)));
        assert_eq!(state.coordinate(), Some(Coordinate::new(-29.1683, -51.1894)));
        assert_eq!(state.advisory(), Some(&LocationError::PermissionDenied));
        assert!(matches!(
            state,
            LocationState::Resolved {
                used_fallback: true,
                ..
            }
        ));
    }

    #[test]
    fn unsupported_platform_uses_fallback() {
        let state = LocationState::from_failure(LocationError::Unsupported);
        assert_eq!(state.coordinate(), Some(FALLBACK_COORDINATE));
        assert!(state.advisory().is_some());
    }

    #[test]
    fn success_keeps_device_coordinate() {
        let mut state = LocationState::Pending;
        state.resolve(Ok(Coordinate::new(-23.55, -46.63)));
        assert_eq!(state.coordinate(), Some(Coordinate::new(-23.55, -46.63)));
        assert_eq!(state.advisory(), None);
    }

    #[test]
    fn resolves_only_once() {
        let mut state = LocationState::Pending;
        assert!(state.resolve(Ok(Coordinate::new(1.0, 2.0))));
        assert!(!state.resolve(Err(LocationError::Timeout)));
        assert_eq!(state.coordinate(), Some(Coordinate::new(1.0, 2.0)));
    }

    #[test]
    fn invalid_fix_falls_back() {
        let state = LocationState::from_fix(Coordinate::new(f64::NAN, 0.0));
        assert_eq!(state.coordinate(), Some(FALLBACK_COORDINATE));
        assert_eq!(state.advisory(), Some(&LocationError::Unavailable));
    }

    #[test]
    fn maps_position_error_codes() {
        assert_eq!(LocationError::from_code(1), LocationError::PermissionDenied);
        assert_eq!(LocationError::from_code(2), LocationError::Unavailable);
        assert_eq!(LocationError::from_code(3), LocationError::Timeout);
    }
}

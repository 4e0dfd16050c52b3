//! Maps `Box<dyn Error>` from trait boundaries to typed `NodeError`.
//!
//! The traits in `loadnode_traits` use `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `loadnode_hardware::HwError`
//! downcasting.

use crate::error::NodeError;

/// Which collaborator produced the error; picks the fallback variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Sensor,
    Store,
    Link,
}

/// Map a trait-boundary error to a typed `NodeError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static), boundary: Boundary) -> NodeError {
    #[cfg(feature = "hardware-errors")]
    {
        use loadnode_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match (hw, boundary) {
                (HwError::Store(msg), _) => NodeError::Storage(msg.clone()),
                // any failure opening or writing the store is a storage fault
                (other, Boundary::Store) => NodeError::Storage(other.to_string()),
                (HwError::Timeout | HwError::DataReadyTimeout, _) => NodeError::Timeout,
                (HwError::Disconnected, _) => NodeError::Link(hw.to_string()),
                (other, _) => NodeError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    match boundary {
        Boundary::Sensor if s.to_lowercase().contains("timeout") => NodeError::Timeout,
        Boundary::Sensor => NodeError::Hardware(s),
        Boundary::Store => NodeError::Storage(s),
        Boundary::Link => NodeError::Link(s),
    }
}

/// Convenience for `Box<dyn Error + Send + Sync>` values.
pub fn map_boxed(e: &loadnode_traits::BoxError, boundary: Boundary) -> NodeError {
    map_hw_error(&**e, boundary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_timeout_text_maps_to_timeout() {
        let e: loadnode_traits::BoxError = "hx711 read timeout".into();
        assert!(matches!(map_boxed(&e, Boundary::Sensor), NodeError::Timeout));
    }

    #[test]
    fn boundary_selects_fallback_variant() {
        let e: loadnode_traits::BoxError = "disk full".into();
        assert!(matches!(map_boxed(&e, Boundary::Store), NodeError::Storage(_)));
        assert!(matches!(map_boxed(&e, Boundary::Link), NodeError::Link(_)));
        assert!(matches!(map_boxed(&e, Boundary::Sensor), NodeError::Hardware(_)));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn downcasts_typed_hw_error() {
        let e: loadnode_traits::BoxError = Box::new(loadnode_hardware::error::HwError::DataReadyTimeout);
        assert!(matches!(map_boxed(&e, Boundary::Link), NodeError::Timeout));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn store_io_errors_are_storage_faults() {
        use loadnode_hardware::error::HwError;
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let e = HwError::Io(io);
        assert!(matches!(map_hw_error(&e, Boundary::Store), NodeError::Storage(_)));
        let e = HwError::Store("parse store.toml".into());
        assert!(matches!(map_hw_error(&e, Boundary::Sensor), NodeError::Storage(_)));
    }
}

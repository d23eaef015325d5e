//! Best-effort device location.
//!
//! Grounded reasoning wants a position but must never wait on one. A
//! single read is attempted with a short timeout; denied, absent, or
//! slow reads all collapse to a fixed default (central New Delhi) and
//! the triage proceeds.

use std::time::Duration;

use async_trait::async_trait;

/// Geographic position used to localize grounded reasoning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Position assumed when no provider answers.
pub const DEFAULT_POSITION: Coordinates = Coordinates {
    lat: 28.6139,
    lng: 77.2090,
};

/// How long a position read may take before the default is used.
pub const POSITION_TIMEOUT: Duration = Duration::from_millis(3_000);

/// Source of the device position. Implementations wrap whatever the
/// platform offers; `None` means unavailable (permission denied, no fix).
#[async_trait]
pub trait GeoProvider: Send + Sync {
    async fn locate(&self) -> Option<Coordinates>;
}

/// Resolve the device position with the standard timeout.
pub async fn resolve_position(provider: &dyn GeoProvider) -> Coordinates {
    resolve_position_within(provider, POSITION_TIMEOUT).await
}

/// Resolve the device position with an explicit timeout.
pub async fn resolve_position_within(provider: &dyn GeoProvider, timeout: Duration) -> Coordinates {
    match tokio::time::timeout(timeout, provider.locate()).await {
        Ok(Some(position)) => position,
        Ok(None) => {
            tracing::warn!("Position unavailable, using default area");
            DEFAULT_POSITION
        }
        Err(_) => {
            tracing::warn!("Position read timed out, using default area");
            DEFAULT_POSITION
        }
    }
}

/// Provider that reports a fixed position. Useful for kiosks installed
/// at a known site, and for tests.
pub struct FixedPosition(pub Coordinates);

#[async_trait]
impl GeoProvider for FixedPosition {
    async fn locate(&self) -> Option<Coordinates> {
        Some(self.0)
    }
}

/// Provider that always declines.
pub struct NoPosition;

#[async_trait]
impl GeoProvider for NoPosition {
    async fn locate(&self) -> Option<Coordinates> {
        None
    }
}

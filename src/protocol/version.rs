//! Protocol versioning
//!
//! The worker refuses requests it cannot serve instead of guessing.

use serde::{Deserialize, Serialize};

/// Current protocol version
pub const PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion {
    major: 1,
    minor: 0,
    patch: 0,
};

/// Protocol version identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ProtocolVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Whether a worker speaking `self` can serve a request made with `request`
    ///
    /// Major versions must match; the worker's minor version must be at
    /// least the request's.
    pub fn accepts(&self, request: &ProtocolVersion) -> bool {
        self.major == request.major && self.minor >= request.minor
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        PROTOCOL_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_display() {
        assert_eq!(ProtocolVersion::new(1, 2, 3).to_string(), "1.2.3");
    }

    #[test]
    fn test_worker_accepts_older_minor() {
        let worker = ProtocolVersion::new(1, 1, 0);
        assert!(worker.accepts(&ProtocolVersion::new(1, 0, 7)));
        assert!(worker.accepts(&ProtocolVersion::new(1, 1, 0)));
    }

    #[test]
    fn test_worker_rejects_newer_minor_and_other_major() {
        let worker = ProtocolVersion::new(1, 0, 0);
        assert!(!worker.accepts(&ProtocolVersion::new(1, 1, 0)));
        assert!(!worker.accepts(&ProtocolVersion::new(2, 0, 0)));
        assert!(!ProtocolVersion::new(2, 0, 0).accepts(&worker));
    }
}

//! Mountable API routers.

use axum::Router;

/// An opaque router plus the paths it wants advertised, relative to the
/// mount point.
pub struct ApiMount {
    router: Router,
    paths: Vec<String>,
}

impl ApiMount {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            paths: Vec::new(),
        }
    }

    /// Advertise a path (relative to the API prefix) in the service descriptor.
    pub fn advertise(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub(crate) fn into_parts(self) -> (Router, Vec<String>) {
        (self.router, self.paths)
    }
}

impl Default for ApiMount {
    fn default() -> Self {
        Self::new(Router::new())
    }
}

//! Detects container and sandbox runtimes so startup logs say where the
//! process runs.

use std::path::Path;

const DOCKER_MARKER: &str = "/.dockerenv";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeEnvironment {
    pub docker: bool,
    /// Value of `SNAP` when running as a snap.
    pub snap: Option<String>,
}

impl RuntimeEnvironment {
    pub fn detect() -> Self {
        Self::detect_with(Path::new(DOCKER_MARKER), std::env::var("SNAP").ok())
    }

    fn detect_with(docker_marker: &Path, snap: Option<String>) -> Self {
        Self {
            docker: docker_marker.exists(),
            snap: snap.filter(|s| !s.is_empty()),
        }
    }

    pub fn describe(&self) -> &'static str {
        match (self.docker, self.snap.is_some()) {
            (true, _) => "docker",
            (false, true) => "snap",
            (false, false) => "native",
        }
    }
}

//! Error taxonomy for the renderer core.
//!
//! Per the error handling design: configuration and scene-load problems are
//! fatal and propagate as [`RenderError`]. Numerical degeneracies and
//! algorithmic preconditions that are not yet satisfied (e.g. gathering
//! indirect light before photons have been traced) are *not* represented
//! here — those are logged once and handled by returning a neutral value,
//! never by returning `Err`.

use std::sync::atomic::{AtomicBool, Ordering};

/// Fatal errors: configuration and scene construction problems that leave
/// the renderer unable to proceed. Never raised for intersection-time
/// numerical degeneracies, which are always treated as "no hit".
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("unknown option {name:?}")]
    UnknownOption { name: String },

    #[error("image dimensions must be nonzero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("sphere_horiz must be even, got {0}")]
    OddSphereHoriz(u32),

    #[error("face references vertex index {index}, but the scene has {count} vertices")]
    BadVertexIndex { index: u32, count: u32 },

    #[error("face references material {0:?}, which was never registered")]
    MissingMaterial(String),

    #[error("portal side transform is not invertible")]
    DegeneratePortalTransform,

    #[error("scene has no camera configured")]
    MissingCamera,
}

/// Logs `message` via [`log::warn!`] exactly once per call site.
///
/// Used for unmet algorithmic preconditions that should log once and fall
/// back to a neutral value rather than propagate as an error
/// (gather-before-trace, form-factor access before compute): call sites
/// hold a `static` [`DiagnosticLatch`] and check it before logging.
pub struct DiagnosticLatch(AtomicBool);

impl DiagnosticLatch {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Logs `message` at `warn` level the first time this is called; does
    /// nothing on subsequent calls.
    pub fn warn_once(&self, message: &str) {
        if !self.0.swap(true, Ordering::Relaxed) {
            log::warn!("{}", message);
        }
    }
}

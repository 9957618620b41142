//! Renderer-wide configuration.

use crate::error::RenderError;
use crate::math::Rgb;

/// Which quantity [`crate::renderer::Renderer::pack_mesh`] should visualize.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum RenderMode {
    Materials,
    Radiance,
    FormFactors,
    Lights,
    Undistributed,
    Absorbed,
}

impl Default for RenderMode {
    fn default() -> Self {
        RenderMode::Materials
    }
}

/// Visualization toggles; these affect `PackMesh`/debug output only and
/// never the traced radiance values themselves.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct VisualizationOptions {
    pub interpolate: bool,
    pub wireframe: bool,
    pub render_photons: bool,
    pub render_photon_directions: bool,
    pub render_kdtree: bool,
}

/// All renderer-wide options.
#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,

    pub num_bounces: u32,
    pub num_shadow_samples: u32,
    pub num_antialias_samples: u32,
    pub num_glossy_samples: u32,

    pub ambient_light: Rgb,
    pub intersect_backfacing: bool,

    pub num_form_factor_samples: u32,

    pub sphere_horiz: u32,
    pub sphere_vert: u32,

    pub num_photons_to_shoot: u32,
    pub num_photons_to_collect: u32,
    pub gather_indirect: bool,

    pub render_mode: RenderMode,
    pub visualization: VisualizationOptions,

    pub portal_recursion_depth: u32,
    pub portal_tint: Rgb,

    pub gloss: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            num_bounces: 0,
            num_shadow_samples: 0,
            num_antialias_samples: 1,
            num_glossy_samples: 1,
            ambient_light: Rgb::new(0.1, 0.1, 0.1),
            intersect_backfacing: false,
            num_form_factor_samples: 1,
            sphere_horiz: 8,
            sphere_vert: 4,
            num_photons_to_shoot: 0,
            num_photons_to_collect: 25,
            gather_indirect: false,
            render_mode: RenderMode::Materials,
            visualization: VisualizationOptions::default(),
            portal_recursion_depth: 2,
            portal_tint: Rgb::ONE,
            gloss: false,
        }
    }
}

impl RenderOptions {
    /// Validates fields whose violation is a configuration error, rather
    /// than a numerical degeneracy to be swallowed.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::ZeroDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.sphere_horiz % 2 != 0 {
            return Err(RenderError::OddSphereHoriz(self.sphere_horiz));
        }
        Ok(())
    }
}

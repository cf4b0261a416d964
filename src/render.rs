//! Render composition and pipeline batching.
//!
//! Flows describe what they want drawn with a [`Render`]; the engine sorts
//! everything it collects into [`Batches`], one per pipeline and stage:
//!
//! 1. `basic`: unlit opaque meshes
//! 2. `physical`: lit opaque meshes
//! 3. `transmissive`: lit meshes that refract what is behind them; drawn
//!    after the opaque stages were copied into the transmission buffer
//! 4. `overlays`: flat quads on top of the tone-mapped frame, followed by
//!    text when the `ui` feature is enabled

use crate::data_structures::{material::Material, model::Mesh};
#[cfg(feature = "ui")]
use crate::gui::text::PanelText;

/// A mesh, the surface it is drawn with and its per-instance transforms.
#[derive(Clone, Copy, Debug)]
pub struct Drawable<'a> {
    pub mesh: &'a Mesh,
    pub material: &'a Material,
    pub instance: &'a wgpu::Buffer,
    pub amount: u32,
}

/// Pre-transformed 2D geometry (NDC positions) with a `u16` index buffer.
#[derive(Clone, Copy, Debug)]
pub struct Flat<'a> {
    pub vertex: &'a wgpu::Buffer,
    pub index: &'a wgpu::Buffer,
    pub amount: u32,
}

/// Specifies how a flow should be rendered.
///
/// # Variants
///
/// - `None` renders nothing
/// - `Mesh(Drawable)` renders a single mesh
/// - `Meshes(Vec<Drawable>)` renders a batch of meshes
/// - `Overlay(Flat)` renders 2D elements above everything else
/// - `Text(PanelText)` renders labels above the overlays (feature `ui`)
/// - `Composed(Vec<Render>)` recursively renders a composition of renders
#[derive(Debug, Default)]
pub enum Render<'a> {
    #[default]
    None,
    Mesh(Drawable<'a>),
    Meshes(Vec<Drawable<'a>>),
    Overlay(Flat<'a>),
    #[cfg(feature = "ui")]
    Text(&'a PanelText),
    Composed(Vec<Render<'a>>),
}

/// Everything collected for one frame, grouped by draw stage.
#[derive(Debug, Default)]
pub struct Batches<'a> {
    pub basic: Vec<Drawable<'a>>,
    pub physical: Vec<Drawable<'a>>,
    pub transmissive: Vec<Drawable<'a>>,
    pub overlays: Vec<Flat<'a>>,
    #[cfg(feature = "ui")]
    pub texts: Vec<&'a PanelText>,
}

impl<'a> Batches<'a> {
    fn push(&mut self, drawable: Drawable<'a>) {
        if drawable.amount == 0 || drawable.instance.size() == 0 {
            log::warn!(
                "you attempted to render {} with zero instances",
                drawable.mesh.name
            );
            return;
        }
        match drawable.material {
            Material::Basic(_) => self.basic.push(drawable),
            m if m.is_transmissive() => self.transmissive.push(drawable),
            Material::Physical(_) => self.physical.push(drawable),
        }
    }

    /// Whether any mesh would be drawn in the transmissive stage.
    pub fn has_transmission(&self) -> bool {
        !self.transmissive.is_empty()
    }

    /// Whether the overlay pass has anything to draw.
    pub fn has_overlays(&self) -> bool {
        #[cfg(feature = "ui")]
        if !self.texts.is_empty() {
            return true;
        }
        !self.overlays.is_empty()
    }
}

impl<'a> Render<'a> {
    pub(crate) fn sort_into(self, batches: &mut Batches<'a>) {
        match self {
            Render::None => (),
            Render::Mesh(drawable) => batches.push(drawable),
            Render::Meshes(drawables) => drawables.into_iter().for_each(|d| batches.push(d)),
            Render::Overlay(flat) => batches.overlays.push(flat),
            #[cfg(feature = "ui")]
            Render::Text(text) => batches.texts.push(text),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.sort_into(batches)),
        }
    }
}

impl<'a> FromIterator<Render<'a>> for Batches<'a> {
    fn from_iter<T: IntoIterator<Item = Render<'a>>>(iter: T) -> Self {
        let mut batches = Batches::default();
        iter.into_iter()
            .for_each(|render| render.sort_into(&mut batches));
        batches
    }
}

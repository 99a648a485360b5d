//! The rendered-image contract and the base operator.
//!
//! Every pipeline node implements [`RenderedImage`]: it advertises bounds, a
//! tile grid, sample and color descriptors, named properties, and answers
//! tile, region and copy requests. Requests are pulled: a node satisfies one
//! by issuing (possibly transformed) requests to its sources, recursively,
//! until leaves produce pixels.
//!
//! [`OperatorBase`] holds the bookkeeping shared by all nodes so that a
//! concrete operator only has to implement [`RenderedImage::copy_data`].

use crate::core::context::RenderContext;
use crate::core::error::{NodeId, RasterError, RasterResult};
use crate::core::geometry::Rect;
use crate::core::grid::{TileGrid, TileRange};
use crate::core::layout::{ColorModel, SampleLayout};
use crate::core::property::{PropertyMap, PropertyValue};
use crate::core::raster::{Raster, RasterMut, WritableRaster};
use indexmap::IndexSet;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a pipeline node.
///
/// Downstream nodes hold references to their sources; a source may feed any
/// number of consumers.
pub type RenderedRef = Arc<dyn RenderedImage>;

/// Bookkeeping common to every pipeline node.
///
/// Once constructed, bounds, grid and descriptors never change; downstream
/// operators cache geometry derived from them.
#[derive(Clone)]
pub struct OperatorBase {
    id: NodeId,
    kind: &'static str,
    primary: Option<RenderedRef>,
    sources: Vec<RenderedRef>,
    bounds: Rect,
    tile_grid: TileGrid,
    layout: SampleLayout,
    color_model: ColorModel,
    properties: PropertyMap,
}

impl OperatorBase {
    /// Create the base for a node without sources.
    pub fn leaf(
        kind: &'static str,
        bounds: Rect,
        layout: SampleLayout,
        color_model: ColorModel,
        tile_grid: TileGrid,
    ) -> RasterResult<Self> {
        Self::new(kind, Vec::new(), bounds, layout, color_model, tile_grid)
    }

    /// Create the base for a node whose sample and color descriptors are
    /// inherited from `primary`.
    pub fn derived(
        kind: &'static str,
        primary: RenderedRef,
        bounds: Rect,
        tile_grid: TileGrid,
    ) -> RasterResult<Self> {
        let layout = primary.sample_layout();
        let color_model = primary.color_model();
        Self::new(kind, vec![primary], bounds, layout, color_model, tile_grid)
    }

    /// Create the base from explicit parts.
    ///
    /// The first source, if any, becomes the primary source that property
    /// lookups delegate to. Fails on empty bounds, bounds whose maximum
    /// corner leaves the `i32` range, a non-positive tile size, or a color
    /// model that cannot describe the layout.
    pub fn new(
        kind: &'static str,
        sources: Vec<RenderedRef>,
        bounds: Rect,
        layout: SampleLayout,
        color_model: ColorModel,
        tile_grid: TileGrid,
    ) -> RasterResult<Self> {
        if bounds.is_empty() {
            return Err(RasterError::invalid(format!(
                "{} bounds {} are degenerate",
                kind, bounds
            )));
        }
        if !bounds.is_representable() {
            return Err(RasterError::invalid(format!(
                "{} bounds {} end past the coordinate range",
                kind, bounds
            )));
        }
        if tile_grid.tile_width <= 0 || tile_grid.tile_height <= 0 {
            return Err(RasterError::invalid(format!(
                "{} tile size {}x{} is not positive",
                kind, tile_grid.tile_width, tile_grid.tile_height
            )));
        }
        if !color_model.is_compatible_with(layout) {
            return Err(RasterError::invalid(format!(
                "{} color model {:?} cannot describe {}",
                kind, color_model, layout
            )));
        }
        Ok(Self {
            id: NodeId::new(),
            kind,
            primary: sources.first().cloned(),
            sources,
            bounds,
            tile_grid,
            layout,
            color_model,
            properties: PropertyMap::new(),
        })
    }

    /// Attach a property that overrides the primary source's value.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Make `source` the primary source, adding it to the sources if needed.
    pub fn with_primary(mut self, source: RenderedRef) -> Self {
        if !self.sources.iter().any(|s| Arc::ptr_eq(s, &source)) {
            self.sources.push(Arc::clone(&source));
        }
        self.primary = Some(source);
        self
    }

    /// Node identifier.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Operator kind, used in logs and errors.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// The source property lookups delegate to.
    pub fn primary(&self) -> Option<&RenderedRef> {
        self.primary.as_ref()
    }

    /// All sources, primary first unless overridden.
    pub fn sources(&self) -> &[RenderedRef] {
        &self.sources
    }

    /// Bounds in this node's coordinate space.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Tile grid.
    pub fn tile_grid(&self) -> TileGrid {
        self.tile_grid
    }

    /// Sample layout.
    pub fn sample_layout(&self) -> SampleLayout {
        self.layout
    }

    /// Color model.
    pub fn color_model(&self) -> ColorModel {
        self.color_model
    }

    /// Indices of the tiles covering the bounds.
    pub fn tile_range(&self) -> TileRange {
        self.tile_grid.tiles_in(&self.bounds)
    }

    /// The rectangle of tile `(tx, ty)` clipped to the bounds.
    ///
    /// Fails with [`RasterError::TileOutOfRange`] for an index outside the
    /// grid covering the bounds.
    pub fn tile_bounds(&self, tx: i32, ty: i32) -> RasterResult<Rect> {
        let range = self.tile_range();
        let clipped = if range.contains(tx, ty) {
            self.tile_grid.tile_rect(tx, ty).intersection(&self.bounds)
        } else {
            None
        };
        clipped.ok_or(RasterError::TileOutOfRange {
            node_id: self.id,
            tile_x: tx,
            tile_y: ty,
            min_tile_x: range.min_x,
            max_tile_x: range.max_x,
            min_tile_y: range.min_y,
            max_tile_y: range.max_y,
        })
    }

    /// `region` clipped to the bounds, failing if nothing is left.
    pub fn clip_region(&self, region: &Rect) -> RasterResult<Rect> {
        region
            .intersection(&self.bounds)
            .ok_or(RasterError::RegionOutOfBounds {
                region: *region,
                bounds: self.bounds,
            })
    }

    /// Property lookup: own overrides first, then the primary source.
    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        if let Some(value) = self.properties.get(name) {
            return Some(value.clone());
        }
        self.primary.as_ref().and_then(|p| p.property(name))
    }

    /// Own property names followed by the primary source's, without
    /// duplicates.
    pub fn property_names(&self) -> Vec<String> {
        let mut names: IndexSet<String> = self.properties.keys().cloned().collect();
        if let Some(primary) = &self.primary {
            names.extend(primary.property_names());
        }
        names.into_iter().collect()
    }
}

impl fmt::Debug for OperatorBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorBase")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("sources", &self.sources.len())
            .field("bounds", &self.bounds)
            .field("tile_grid", &self.tile_grid)
            .field("layout", &self.layout)
            .field("color_model", &self.color_model)
            .field("properties", &self.properties)
            .finish()
    }
}

/// The uniform surface every pipeline node exposes.
///
/// Implementors supply [`base`](RenderedImage::base) and
/// [`copy_data`](RenderedImage::copy_data); every other method has a default
/// built on those two. Nodes are immutable after construction, so a node may
/// be read from several threads at once.
pub trait RenderedImage: Send + Sync + fmt::Debug {
    /// Shared bookkeeping.
    fn base(&self) -> &OperatorBase;

    /// Write this node's pixels into `dest`, touching only the overlap of
    /// the node's bounds and `dest`'s bounds.
    fn copy_data(&self, dest: &mut RasterMut<'_>, ctx: &RenderContext) -> RasterResult<()>;

    /// Node identifier.
    fn id(&self) -> NodeId {
        self.base().id()
    }

    /// Operator kind.
    fn kind(&self) -> &'static str {
        self.base().kind()
    }

    /// Bounds in this node's coordinate space. Constant for the node's life.
    fn bounds(&self) -> Rect {
        self.base().bounds()
    }

    /// Tile grid.
    fn tile_grid(&self) -> TileGrid {
        self.base().tile_grid()
    }

    /// Indices of the tiles this node can produce.
    fn tile_range(&self) -> TileRange {
        self.base().tile_range()
    }

    /// Sample layout of produced rasters.
    fn sample_layout(&self) -> SampleLayout {
        self.base().sample_layout()
    }

    /// Color interpretation of produced rasters.
    fn color_model(&self) -> ColorModel {
        self.base().color_model()
    }

    /// Upstream nodes.
    fn sources(&self) -> &[RenderedRef] {
        self.base().sources()
    }

    /// Side-channel property lookup.
    fn property(&self, name: &str) -> Option<PropertyValue> {
        self.base().property(name)
    }

    /// Names of every property visible on this node.
    fn property_names(&self) -> Vec<String> {
        self.base().property_names()
    }

    /// The raster for tile `(tx, ty)`, clipped to the bounds.
    ///
    /// Fails with [`RasterError::TileOutOfRange`] when the index lies outside
    /// the node's tile grid.
    fn tile(&self, tx: i32, ty: i32, ctx: &RenderContext) -> RasterResult<Raster> {
        ctx.check_interrupted()?;
        ctx.record_tile();
        let rect = self.base().tile_bounds(tx, ty)?;
        log::trace!("{} {} computing tile ({}, {})", self.kind(), self.id(), tx, ty);
        compute_region(self, rect, ctx)
    }

    /// A raster covering the whole bounds. Expensive for large nodes.
    fn data(&self, ctx: &RenderContext) -> RasterResult<Raster> {
        self.data_region(self.bounds(), ctx)
    }

    /// A raster covering `region` clipped to the bounds.
    ///
    /// Fails with [`RasterError::RegionOutOfBounds`] when `region` does not
    /// overlap the bounds.
    fn data_region(&self, region: Rect, ctx: &RenderContext) -> RasterResult<Raster> {
        ctx.check_interrupted()?;
        ctx.record_region();
        let rect = self.base().clip_region(&region)?;
        compute_region(self, rect, ctx)
    }

    /// Copy into an owned destination and hand it back, for chaining.
    fn copy_into(&self, mut dest: WritableRaster, ctx: &RenderContext) -> RasterResult<WritableRaster> {
        self.copy_data(&mut dest.as_mut(), ctx)?;
        Ok(dest)
    }
}

/// Allocate a raster for `rect` and fill it through `copy_data`.
///
/// `rect` must already be clipped to the node's bounds.
pub fn compute_region<N>(node: &N, rect: Rect, ctx: &RenderContext) -> RasterResult<Raster>
where
    N: RenderedImage + ?Sized,
{
    let mut out = WritableRaster::new(rect, node.sample_layout())?;
    ctx.record_allocation(rect.area());
    node.copy_data(&mut out.as_mut(), ctx)?;
    Ok(out.into_raster())
}

//! Render orchestration: one view instance owning its device buffers.
//!
//! A view is either unbuilt (no device buffers) or rendered (grid, escape
//! field, and image present and mutually consistent). Every parameter
//! change goes through a full re-derivation (grid build, escape dispatch,
//! colour dispatch) in strict dependency order; there is no incremental
//! recompute. A view is single-owner and single-writer (`&mut self`);
//! independent views may render concurrently, including on different
//! devices.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, trace};

use crate::buffer::{self, Buffer};
use crate::colour::{ColourParams, ColourPipeline, Palette};
use crate::complex::Complex;
use crate::device::GpuContext;
use crate::encoder;
use crate::error::Error;
use crate::escape::{EscapeParams, EscapePipeline};
use crate::export::ColourImage;
use crate::pool::MemoryPool;
use crate::settings::{SettingsUpdate, ViewSettings};
use crate::var::Var;
use crate::view::{self, Frame, GridSize};

/// Host copy of the per-pixel escape counts from the last run.
#[derive(Clone, Debug, PartialEq)]
pub struct EscapeField {
    pub size: GridSize,
    pub counts: Vec<u32>,
}

impl EscapeField {
    pub fn count_at(&self, px: u32, py: u32) -> Option<u32> {
        (px < self.size.width && py < self.size.height)
            .then(|| self.counts[py as usize * self.size.width as usize + px as usize])
    }
}

/// Device-resident storage for one render target size. Dropping the set
/// returns every byte to the pool.
struct ViewBuffers {
    size: GridSize,
    grid: Buffer<Complex>,
    counts: Buffer<u32>,
    channel_a: Buffer<u32>,
    channel_b: Buffer<u32>,
    channel_c: Buffer<u32>,
    staging_counts: Buffer<u32>,
    staging_a: Buffer<u32>,
    staging_b: Buffer<u32>,
    staging_c: Buffer<u32>,
    escape_params: Var<EscapeParams>,
    colour_params: Var<ColourParams>,
}

impl ViewBuffers {
    fn new(device: &wgpu::Device, pool: &Arc<MemoryPool>, size: GridSize) -> Result<Self, Error> {
        let len = size.pixel_count() as u64;

        let grid = buffer::Builder::<Complex>::new(len)
            .with_label("coordinate-grid")
            .with_usage(wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST)
            .create(device, pool)?;

        let storage = |label| {
            buffer::Builder::<u32>::new(len)
                .with_label(label)
                .with_usage(wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC)
                .create(device, pool)
        };
        let counts = storage("escape-counts")?;
        let channel_a = storage("channel-a")?;
        let channel_b = storage("channel-b")?;
        let channel_c = storage("channel-c")?;

        let staging = |label| {
            buffer::Builder::<u32>::new(len)
                .with_label(label)
                .with_usage(wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST)
                .create(device, pool)
        };
        let staging_counts = staging("escape-counts-staging")?;
        let staging_a = staging("channel-a-staging")?;
        let staging_b = staging("channel-b-staging")?;
        let staging_c = staging("channel-c-staging")?;

        let escape_params = Var::init(device, pool, "escape-params", EscapeParams::new(0, 0))?;
        let colour_params = Var::init(
            device,
            pool,
            "colormap-params",
            ColourParams::new(0, Palette::default()),
        )?;

        Ok(ViewBuffers {
            size,
            grid,
            counts,
            channel_a,
            channel_b,
            channel_c,
            staging_counts,
            staging_a,
            staging_b,
            staging_c,
            escape_params,
            colour_params,
        })
    }
}

pub struct MandelbrotView {
    ctx: Arc<GpuContext>,
    pool: Arc<MemoryPool>,
    settings: ViewSettings,
    frame: Frame,
    escape_pipeline: EscapePipeline,
    colour_pipeline: ColourPipeline,
    buffers: Option<ViewBuffers>,
    escape_field: Option<EscapeField>,
    image: Option<ColourImage>,
}

impl MandelbrotView {
    /// Validate and store the view. No device memory is touched until the
    /// first render.
    pub fn new(
        ctx: Arc<GpuContext>,
        pool: Arc<MemoryPool>,
        settings: ViewSettings,
    ) -> Result<Self, Error> {
        settings.validate()?;
        let frame = Frame::from_center(
            settings.center,
            settings.magnification,
            settings.aspect_ratio,
        );
        let escape_pipeline = EscapePipeline::new(&ctx.device);
        let colour_pipeline = ColourPipeline::new(&ctx.device);
        Ok(MandelbrotView {
            ctx,
            pool,
            settings,
            frame,
            escape_pipeline,
            colour_pipeline,
            buffers: None,
            escape_field: None,
            image: None,
        })
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    /// The plane bounds with reversal flags applied.
    pub fn frame(&self) -> Frame {
        self.frame
            .oriented(self.settings.reversed_x, self.settings.reversed_y)
    }

    pub fn grid_size(&self) -> GridSize {
        GridSize::from_settings(self.settings.pixels_per_side, self.settings.aspect_ratio)
    }

    /// Partial parameter update; call [`render_full`](Self::render_full)
    /// afterwards to materialize. The last rendered image stays available
    /// until then.
    pub fn update(&mut self, update: SettingsUpdate) -> Result<(), Error> {
        let next = update.applied_to(&self.settings);
        next.validate()?;
        self.settings = next;
        self.frame = Frame::from_center(next.center, next.magnification, next.aspect_ratio);
        Ok(())
    }

    /// Plane coordinate under a pixel of the current grid (click/hover →
    /// inspection point). Grid-exact: corners land on the frame bounds.
    pub fn pixel_to_coord(&self, px: u32, py: u32) -> (f64, f64) {
        view::grid_coord(
            &self.frame(),
            self.grid_size(),
            self.settings.swap_axes,
            px,
            py,
        )
    }

    /// Stage 1: derive the oriented frame and upload the pixel→coordinate
    /// grid.
    pub fn build_coordinate_grid(&mut self) -> Result<(), Error> {
        let started = Instant::now();
        let size = self.grid_size();
        self.ensure_buffers(size)?;

        let grid = view::coordinate_grid(&self.frame(), size, self.settings.swap_axes);
        let buffers = self.buffers.as_ref().ok_or(Error::Unbuilt)?;
        buffers.grid.write(&self.ctx.queue, &grid);
        debug!("coordinate grid built in {:?}", started.elapsed());
        Ok(())
    }

    /// Stage 2: one data-parallel dispatch over every pixel, then blocking
    /// readback of the counts.
    pub fn run_escape_computation(&mut self) -> Result<(), Error> {
        let started = Instant::now();
        let buffers = self.buffers.as_ref().ok_or(Error::Unbuilt)?;
        let device = &self.ctx.device;
        let pipeline = &self.escape_pipeline;

        buffers.escape_params.write(
            &self.ctx.queue,
            EscapeParams::new(
                buffers.size.pixel_count() as u32,
                self.settings.max_iterations,
            ),
        );

        let commands = encoder::record(device, Some("escape"), |command_encoder| {
            pipeline.encode(
                device,
                command_encoder,
                &buffers.escape_params,
                &buffers.grid,
                &buffers.counts,
            );
            buffer::copy(command_encoder, &buffers.counts, &buffers.staging_counts);
        });
        self.ctx.queue.submit([commands]);

        let counts = buffers.staging_counts.read_back(device)?;
        self.escape_field = Some(EscapeField {
            size: buffers.size,
            counts,
        });
        debug!("escape computation in {:?}", started.elapsed());
        Ok(())
    }

    /// Stage 3: colour-map the current escape field and read the image
    /// back. Recolouring alone is valid on a rendered view: a palette
    /// switch does not re-run the escape computation.
    pub fn render_image(&mut self, palette: Palette) -> Result<&ColourImage, Error> {
        let started = Instant::now();
        if self.escape_field.is_none() {
            return Err(Error::Unbuilt);
        }
        self.settings.palette = palette;

        let buffers = self.buffers.as_ref().ok_or(Error::Unbuilt)?;
        let device = &self.ctx.device;
        let pipeline = &self.colour_pipeline;

        trace!("begin colour mapping");
        buffers.colour_params.write(
            &self.ctx.queue,
            ColourParams::new(buffers.size.pixel_count() as u32, palette),
        );

        let commands = encoder::record(device, Some("colormap"), |command_encoder| {
            pipeline.encode(
                device,
                command_encoder,
                &buffers.colour_params,
                &buffers.counts,
                [&buffers.channel_a, &buffers.channel_b, &buffers.channel_c],
            );
            buffer::copy(command_encoder, &buffers.channel_a, &buffers.staging_a);
            buffer::copy(command_encoder, &buffers.channel_b, &buffers.staging_b);
            buffer::copy(command_encoder, &buffers.channel_c, &buffers.staging_c);
        });
        self.ctx.queue.submit([commands]);

        let narrow = |values: Vec<u32>| values.into_iter().map(|value| value as u8).collect();
        let image = ColourImage {
            size: buffers.size,
            channel_a: narrow(buffers.staging_a.read_back(device)?),
            channel_b: narrow(buffers.staging_b.read_back(device)?),
            channel_c: narrow(buffers.staging_c.read_back(device)?),
        };
        debug!("colour mapping in {:?}", started.elapsed());
        Ok(self.image.insert(image))
    }

    /// Full recompute in strict stage order: grid → escape → colour.
    /// Atomic from the caller's view: an allocation failure leaves the
    /// previous rendered state untouched.
    pub fn render_full(&mut self) -> Result<&ColourImage, Error> {
        self.build_coordinate_grid()?;
        self.run_escape_computation()?;
        self.render_image(self.settings.palette)
    }

    pub fn escape_field(&self) -> Option<&EscapeField> {
        self.escape_field.as_ref()
    }

    pub fn image(&self) -> Option<&ColourImage> {
        self.image.as_ref()
    }

    /// PNG bytes of the current image.
    pub fn export_png(&self) -> Result<Vec<u8>, Error> {
        self.image.as_ref().ok_or(Error::Unbuilt)?.encode_png()
    }

    /// Release all device buffers and derived state, returning to the
    /// unbuilt state. Dropping the view has the same effect on the pool.
    pub fn reset(&mut self) {
        self.buffers = None;
        self.escape_field = None;
        self.image = None;
    }

    /// Reuse the buffer set when the target size is unchanged; otherwise
    /// reserve the replacement set before releasing the old one, so an
    /// allocation failure leaves the last rendered state intact.
    fn ensure_buffers(&mut self, size: GridSize) -> Result<(), Error> {
        if self.buffers.as_ref().map(|buffers| buffers.size) == Some(size) {
            return Ok(());
        }
        let next = ViewBuffers::new(&self.ctx.device, &self.pool, size)?;
        self.buffers = Some(next);
        Ok(())
    }
}

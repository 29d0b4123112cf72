//! Adapter and device acquisition.

use std::sync::Arc;

use log::info;

use crate::error::Error;

/// The wgpu device and queue for one accelerator.
///
/// Independent contexts (different adapters) render concurrently with no
/// shared state; each view belongs to exactly one context.
pub struct GpuContext {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Compute-only context for offscreen rendering and tests.
    pub fn headless() -> Result<Arc<Self>, Error> {
        let instance = wgpu::Instance::new(wgpu::Backends::all());
        Self::request(&instance, None)
    }

    /// Context whose adapter can present to `surface`.
    pub fn for_surface(
        instance: &wgpu::Instance,
        surface: &wgpu::Surface,
    ) -> Result<Arc<Self>, Error> {
        Self::request(instance, Some(surface))
    }

    fn request(
        instance: &wgpu::Instance,
        surface: Option<&wgpu::Surface>,
    ) -> Result<Arc<Self>, Error> {
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: surface,
        }))
        .ok_or(Error::NoAdapter)?;

        info!("adapter: {:?}", adapter.get_info());

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("mandelview-device"),
                features: wgpu::Features::empty(),
                limits: wgpu::Limits::default(),
            },
            None,
        ))?;

        Ok(Arc::new(GpuContext {
            adapter,
            device,
            queue,
        }))
    }
}

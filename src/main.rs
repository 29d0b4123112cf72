use std::num::NonZeroU32;
use std::sync::Arc;

use log::{debug, error, info};
use winit::{
    dpi::PhysicalSize,
    event::{
        ElementState, Event, KeyboardInput, MouseButton, MouseScrollDelta, VirtualKeyCode,
        WindowEvent,
    },
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

use mandelview::{
    encoder, ColourImage, GpuContext, GridSize, MandelbrotView, MemoryPool, Palette,
    SettingsUpdate, ViewSettings,
};

/// Device-buffer budget for the render core.
const POOL_LIMIT: u64 = 4 * 1024 * 1024 * 1024;

/// Magnification multiplier per zoom step.
const ZOOM_RATE: f64 = 1.5;

/// Interaction state around the core render handle. Every toggle lives
/// here; the core never sees them.
struct Shell {
    view: MandelbrotView,
    startup: ViewSettings,
    crosshair: bool,
    cursor: Option<(u32, u32)>,
    frame_size: GridSize,
    frame_rgba: Vec<u8>,
}

impl Shell {
    fn new(view: MandelbrotView) -> Self {
        let startup = *view.settings();
        let frame_size = view.grid_size();
        Shell {
            view,
            startup,
            crosshair: false,
            cursor: None,
            frame_size,
            frame_rgba: Vec::new(),
        }
    }

    /// Full recompute. On failure the previous frame stays on screen.
    fn rerender(&mut self) {
        match self.view.render_full() {
            Ok(image) => {
                let (size, rgba) = (image.size, rgba_frame(image));
                self.frame_size = size;
                self.frame_rgba = rgba;
            }
            Err(render_error) => error!("render failed, keeping last image: {render_error}"),
        }
    }

    fn apply(&mut self, update: SettingsUpdate) {
        match self.view.update(update) {
            Ok(()) => self.rerender(),
            Err(update_error) => error!("rejected update: {update_error}"),
        }
    }

    /// Recenter on the clicked coordinate and step the magnification.
    fn zoom_at(&mut self, px: u32, py: u32, zoom_in: bool) {
        let magnification = self.view.settings().magnification;
        let magnification = if zoom_in {
            magnification * ZOOM_RATE
        } else {
            magnification / ZOOM_RATE
        };
        let center = self.view.pixel_to_coord(px, py);
        self.apply(SettingsUpdate {
            center: Some(center),
            magnification: Some(magnification),
            ..SettingsUpdate::default()
        });
    }

    /// The flipped axis accounts for a swapped view, so the on-screen
    /// direction always matches the pressed key.
    fn flip(&mut self, horizontal: bool) {
        let settings = *self.view.settings();
        let update = if horizontal != settings.swap_axes {
            SettingsUpdate {
                reversed_x: Some(!settings.reversed_x),
                ..SettingsUpdate::default()
            }
        } else {
            SettingsUpdate {
                reversed_y: Some(!settings.reversed_y),
                ..SettingsUpdate::default()
            }
        };
        self.apply(update);
    }

    fn swap_axes(&mut self) {
        let swap = !self.view.settings().swap_axes;
        self.apply(SettingsUpdate {
            swap_axes: Some(swap),
            ..SettingsUpdate::default()
        });
    }

    /// Back to the startup view, clearing flips and swap.
    fn reset(&mut self) {
        let startup = self.startup;
        self.apply(SettingsUpdate {
            center: Some(startup.center),
            magnification: Some(startup.magnification),
            pixels_per_side: Some(startup.pixels_per_side),
            max_iterations: Some(startup.max_iterations),
            palette: Some(startup.palette),
            aspect_ratio: Some(startup.aspect_ratio),
            reversed_x: Some(false),
            reversed_y: Some(false),
            swap_axes: Some(false),
        });
    }

    /// Recolour the current escape field; no escape recompute.
    fn set_palette(&mut self, palette: Palette) {
        match self.view.render_image(palette) {
            Ok(image) => {
                let (size, rgba) = (image.size, rgba_frame(image));
                self.frame_size = size;
                self.frame_rgba = rgba;
            }
            Err(palette_error) => error!("palette change failed: {palette_error}"),
        }
    }

    fn save_image(&self) {
        match self.view.export_png() {
            Ok(bytes) => match std::fs::write("mandelbrot.png", bytes) {
                Ok(()) => info!("saved mandelbrot.png"),
                Err(write_error) => error!("could not write mandelbrot.png: {write_error}"),
            },
            Err(export_error) => error!("export failed: {export_error}"),
        }
    }

    /// The current frame with the crosshair composited in when enabled.
    fn composited_frame(&self) -> Vec<u8> {
        let mut rgba = self.frame_rgba.clone();
        if let (true, Some((cx, cy))) = (self.crosshair, self.cursor) {
            let width = self.frame_size.width as usize;
            let height = self.frame_size.height as usize;
            let (cx, cy) = (cx as usize, cy as usize);
            if cx < width && cy < height && rgba.len() == width * height * 4 {
                for x in 0..width {
                    let offset = (cy * width + x) * 4;
                    rgba[offset..offset + 3].fill(0);
                }
                for y in 0..height {
                    let offset = (y * width + cx) * 4;
                    rgba[offset..offset + 3].fill(0);
                }
            }
        }
        rgba
    }
}

fn rgba_frame(image: &ColourImage) -> Vec<u8> {
    image
        .to_rgb()
        .chunks(3)
        .flat_map(|pixel| [pixel[0], pixel[1], pixel[2], 0xff])
        .collect()
}

fn create_frame_texture(device: &wgpu::Device, size: GridSize) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("frame-texture"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
    })
}

fn create_frame_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture_view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("frame-bind-group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(texture_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn upload_frame(queue: &wgpu::Queue, texture: &wgpu::Texture, size: GridSize, rgba: &[u8]) {
    // Nothing rendered yet (or the first render failed): keep the clear colour.
    if rgba.len() < size.pixel_count() * 4 {
        return;
    }
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: NonZeroU32::new(4 * size.width),
            rows_per_image: NonZeroU32::new(size.height),
        },
        wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
    );
}

/// Window cursor position → image pixel, stretching with the window.
fn to_image_pixel(
    cursor: Option<(f64, f64)>,
    window: PhysicalSize<u32>,
    image: GridSize,
) -> Option<(u32, u32)> {
    let (x, y) = cursor?;
    if window.width == 0 || window.height == 0 || x < 0.0 || y < 0.0 {
        return None;
    }
    let px = (x * image.width as f64 / window.width as f64) as u32;
    let py = (y * image.height as f64 / window.height as f64) as u32;
    (px < image.width && py < image.height).then_some((px, py))
}

#[allow(clippy::too_many_arguments)]
fn present_frame(
    ctx: &GpuContext,
    shell: &Shell,
    bind_group_layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    texture_size: &mut GridSize,
    frame_texture: &mut wgpu::Texture,
    frame_bind_group: &mut wgpu::BindGroup,
    window: &winit::window::Window,
) {
    if shell.frame_size != *texture_size {
        *texture_size = shell.frame_size;
        *frame_texture = create_frame_texture(&ctx.device, *texture_size);
        let frame_view = frame_texture.create_view(&wgpu::TextureViewDescriptor::default());
        *frame_bind_group = create_frame_bind_group(&ctx.device, bind_group_layout, &frame_view, sampler);
    }
    upload_frame(&ctx.queue, frame_texture, *texture_size, &shell.composited_frame());
    window.request_redraw();
}

fn main() {
    env_logger::init();

    let settings = ViewSettings::default();
    let image_size = GridSize::from_settings(settings.pixels_per_side, settings.aspect_ratio);

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("mandelview")
        .with_inner_size(PhysicalSize::new(image_size.width, image_size.height))
        .build(&event_loop)
        .unwrap();

    let instance = wgpu::Instance::new(wgpu::Backends::all());
    let surface = unsafe { instance.create_surface(&window) };
    let ctx = GpuContext::for_surface(&instance, &surface).expect("GPU initialization failed");
    let pool = Arc::new(MemoryPool::new(POOL_LIMIT));

    let view = MandelbrotView::new(Arc::clone(&ctx), pool, settings).expect("view creation failed");
    let mut shell = Shell::new(view);
    shell.rerender();

    let mut window_size = window.inner_size();
    let mut surface_configuration = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface.get_supported_formats(&ctx.adapter)[0],
        width: window_size.width,
        height: window_size.height,
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode: wgpu::CompositeAlphaMode::Auto,
    };
    surface.configure(&ctx.device, &surface_configuration);

    let shader_module = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("blit-shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
    });

    let bind_group_layout =
        ctx.device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("blit-bind-group-layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                        count: None,
                    },
                ],
            });

    let pipeline_layout = ctx
        .device
        .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blit-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

    let render_pipeline = ctx
        .device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("blit-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: "vertex_main",
                buffers: &[],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: "fragment_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_configuration.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
        });

    let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor::default());

    let mut texture_size = shell.frame_size;
    let mut frame_texture = create_frame_texture(&ctx.device, texture_size);
    let frame_view = frame_texture.create_view(&wgpu::TextureViewDescriptor::default());
    let mut frame_bind_group =
        create_frame_bind_group(&ctx.device, &bind_group_layout, &frame_view, &sampler);

    upload_frame(&ctx.queue, &frame_texture, texture_size, &shell.composited_frame());

    let mut cursor_position: Option<(f64, f64)> = None;

    event_loop.run(move |event, _, control_flow| {
        control_flow.set_wait();

        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    *control_flow = ControlFlow::Exit;
                }
                WindowEvent::Resized(size) => {
                    debug!("resizing to {:?}", size);
                    window_size = size;
                    surface_configuration.width = size.width.max(1);
                    surface_configuration.height = size.height.max(1);
                    surface.configure(&ctx.device, &surface_configuration);
                    window.request_redraw();
                }
                WindowEvent::CursorMoved { position, .. } => {
                    cursor_position = Some((position.x, position.y));
                    if let Some(pixel) = to_image_pixel(cursor_position, window_size, shell.frame_size)
                    {
                        shell.cursor = Some(pixel);
                        if shell.crosshair {
                            present_frame(
                                &ctx,
                                &shell,
                                &bind_group_layout,
                                &sampler,
                                &mut texture_size,
                                &mut frame_texture,
                                &mut frame_bind_group,
                                &window,
                            );
                        }
                    }
                }
                WindowEvent::MouseInput {
                    state: ElementState::Pressed,
                    button: MouseButton::Left,
                    ..
                } => {
                    if let Some((px, py)) =
                        to_image_pixel(cursor_position, window_size, shell.frame_size)
                    {
                        shell.zoom_at(px, py, true);
                        present_frame(
                            &ctx,
                            &shell,
                            &bind_group_layout,
                            &sampler,
                            &mut texture_size,
                            &mut frame_texture,
                            &mut frame_bind_group,
                            &window,
                        );
                    }
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let dy = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y as f64,
                        MouseScrollDelta::PixelDelta(position) => position.y,
                    };
                    if dy != 0.0 {
                        if let Some((px, py)) =
                            to_image_pixel(cursor_position, window_size, shell.frame_size)
                        {
                            shell.zoom_at(px, py, dy > 0.0);
                            present_frame(
                                &ctx,
                                &shell,
                                &bind_group_layout,
                                &sampler,
                                &mut texture_size,
                                &mut frame_texture,
                                &mut frame_bind_group,
                                &window,
                            );
                        }
                    }
                }
                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state: ElementState::Pressed,
                            virtual_keycode: Some(key),
                            ..
                        },
                    ..
                } => {
                    match key {
                        VirtualKeyCode::X => shell.flip(true),
                        VirtualKeyCode::Y => shell.flip(false),
                        VirtualKeyCode::T => shell.swap_axes(),
                        VirtualKeyCode::R => shell.reset(),
                        VirtualKeyCode::Key1 => shell.set_palette(Palette::Hsv0),
                        VirtualKeyCode::Key2 => shell.set_palette(Palette::Hsv1),
                        VirtualKeyCode::Key3 => shell.set_palette(Palette::Hsv2),
                        VirtualKeyCode::C => shell.crosshair = !shell.crosshair,
                        VirtualKeyCode::S => {
                            shell.save_image();
                            return;
                        }
                        _ => return,
                    }
                    present_frame(
                        &ctx,
                        &shell,
                        &bind_group_layout,
                        &sampler,
                        &mut texture_size,
                        &mut frame_texture,
                        &mut frame_bind_group,
                        &window,
                    );
                }
                _ => {}
            },
            Event::RedrawRequested(window_id) if window_id == window.id() => {
                match surface.get_current_texture() {
                    Ok(surface_texture) => {
                        let surface_view = surface_texture
                            .texture
                            .create_view(&wgpu::TextureViewDescriptor::default());

                        let commands =
                            encoder::record(&ctx.device, Some("present"), |command_encoder| {
                                let mut render_pass =
                                    command_encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                                        label: Some("present-pass"),
                                        color_attachments: &[Some(
                                            wgpu::RenderPassColorAttachment {
                                                view: &surface_view,
                                                resolve_target: None,
                                                ops: wgpu::Operations {
                                                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                                                    store: true,
                                                },
                                            },
                                        )],
                                        depth_stencil_attachment: None,
                                    });
                                render_pass.set_pipeline(&render_pipeline);
                                render_pass.set_bind_group(0, &frame_bind_group, &[]);
                                render_pass.draw(0..4, 0..1);
                            });
                        ctx.queue.submit([commands]);
                        surface_texture.present();
                    }
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        surface.configure(&ctx.device, &surface_configuration);
                    }
                    Err(surface_error) => error!("surface error: {surface_error}"),
                }
            }
            _ => {}
        }
    });
}

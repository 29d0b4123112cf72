//! The escape-iteration kernel and its host-side mirror.

use bytemuck::{Pod, Zeroable};

use crate::buffer::Buffer;
use crate::complex::Complex;
use crate::compute::dispatch_size;
use crate::var::Var;

/// Uniform block for `escape.wgsl`, padded to 16 bytes.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug)]
pub struct EscapeParams {
    pub pixel_count: u32,
    pub max_iterations: u32,
    _pad0: u32,
    _pad1: u32,
}

impl EscapeParams {
    pub fn new(pixel_count: u32, max_iterations: u32) -> Self {
        EscapeParams {
            pixel_count,
            max_iterations,
            _pad0: 0,
            _pad1: 0,
        }
    }
}

pub struct EscapePipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl EscapePipeline {
    pub fn new(device: &wgpu::Device) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("escape-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("escape.wgsl").into()),
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("escape-bind-group-layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("escape-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("escape-pipeline"),
            layout: Some(&layout),
            module: &module,
            entry_point: "escape",
        });

        EscapePipeline {
            pipeline,
            bind_group_layout,
        }
    }

    /// Encode one dispatch covering every grid pixel.
    pub fn encode(
        &self,
        device: &wgpu::Device,
        command_encoder: &mut wgpu::CommandEncoder,
        params: &Var<EscapeParams>,
        grid: &Buffer<Complex>,
        counts: &Buffer<u32>,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("escape-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params.binding_resource(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: grid.binding_resource(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: counts.binding_resource(),
                },
            ],
        });

        let (x, y, z) = dispatch_size(grid.len() as usize);
        let mut compute_pass =
            command_encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("escape-pass"),
            });
        compute_pass.set_pipeline(&self.pipeline);
        compute_pass.set_bind_group(0, &bind_group, &[]);
        compute_pass.dispatch_workgroups(x, y, z);
    }
}

/// Host mirror of the kernel for one coordinate.
///
/// The iterate starts at `c` (not the canonical 0), and the recorded count
/// is the *last* iteration whose magnitude exceeded 2, not the first.
/// Every rendered image depends on both choices; they must match
/// `escape.wgsl` exactly.
pub fn escape_count(c: Complex, max_iterations: u32) -> u32 {
    let mut q = c;
    let mut m = 0;
    for j in 0..max_iterations {
        q = Complex::new(q.re * q.re - q.im * q.im + c.re, 2.0 * q.re * q.im + c.im);
        if q.re * q.re + q.im * q.im > 4.0 {
            m = j;
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_never_escapes() {
        // q0 = c = 0, so every iterate stays at 0.
        for budget in [1, 10, 1000] {
            assert_eq!(escape_count(Complex::ZERO, budget), 0);
        }
    }

    #[test]
    fn interior_point_stays_at_zero() {
        assert_eq!(escape_count(Complex::new(-0.5, 0.0), 500), 0);
    }

    #[test]
    fn exterior_point_records_last_breach() {
        // c = 3: q0 = 3, then 12, 147, ...: every iteration breaches, so
        // the count is the final index, not the first breach.
        assert_eq!(escape_count(Complex::new(3.0, 0.0), 5), 4);
        assert_eq!(escape_count(Complex::new(3.0, 0.0), 1), 0);
    }

    #[test]
    fn breach_on_first_iteration_only_counts_as_zero() {
        // c = 2: q0 = 2, q1 = 6 breaches at j = 0; the orbit then blows up
        // and keeps breaching, so a larger budget raises the count.
        assert_eq!(escape_count(Complex::new(2.0, 0.0), 1), 0);
        assert!(escape_count(Complex::new(2.0, 0.0), 8) > 0);
    }
}

//! Colour mapping from escape counts to HSV-like channel triples.

use bytemuck::{Pod, Zeroable};

use crate::buffer::Buffer;
use crate::compute::dispatch_size;
use crate::var::Var;

/// Palette id for the colour-mapping kernel.
///
/// Channel A is hue-like and cycles with period 255 under all three
/// palettes; high iteration budgets band rather than stretch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Palette {
    Hsv0,
    Hsv1,
    Hsv2,
}

impl Palette {
    pub fn from_index(index: u32) -> Option<Palette> {
        match index {
            0 => Some(Palette::Hsv0),
            1 => Some(Palette::Hsv1),
            2 => Some(Palette::Hsv2),
            _ => None,
        }
    }

    pub fn index(self) -> u32 {
        match self {
            Palette::Hsv0 => 0,
            Palette::Hsv1 => 1,
            Palette::Hsv2 => 2,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::Hsv1
    }
}

/// Host mirror of the kernel for one escape count. Count 0 is the fixed
/// background regardless of palette; the B channel subtractions narrow like
/// a byte store.
pub fn map_count(palette: Palette, count: u32) -> [u8; 3] {
    if count == 0 {
        return [0, 0, 0];
    }
    let a = (count % 255) as u8;
    let b = match palette {
        Palette::Hsv0 => 255,
        Palette::Hsv1 => 255u32.wrapping_sub(count / 255) as u8,
        Palette::Hsv2 => 255u32.wrapping_sub(count * 64 / 255) as u8,
    };
    [a, b, 255]
}

/// Uniform block for `colormap.wgsl`, padded to 16 bytes.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug)]
pub struct ColourParams {
    pub pixel_count: u32,
    pub palette: u32,
    _pad0: u32,
    _pad1: u32,
}

impl ColourParams {
    pub fn new(pixel_count: u32, palette: Palette) -> Self {
        ColourParams {
            pixel_count,
            palette: palette.index(),
            _pad0: 0,
            _pad1: 0,
        }
    }
}

pub struct ColourPipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl ColourPipeline {
    pub fn new(device: &wgpu::Device) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("colormap-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("colormap.wgsl").into()),
        });

        let storage = |binding, read_only| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("colormap-bind-group-layout"),
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
                    storage(1, true),
                    storage(2, false),
                    storage(3, false),
                    storage(4, false),
                ],
            });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("colormap-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("colormap-pipeline"),
            layout: Some(&layout),
            module: &module,
            entry_point: "colormap",
        });

        ColourPipeline {
            pipeline,
            bind_group_layout,
        }
    }

    /// Encode one dispatch mapping every escape count to its channel triple.
    pub fn encode(
        &self,
        device: &wgpu::Device,
        command_encoder: &mut wgpu::CommandEncoder,
        params: &Var<ColourParams>,
        counts: &Buffer<u32>,
        channels: [&Buffer<u32>; 3],
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("colormap-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params.binding_resource(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: counts.binding_resource(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: channels[0].binding_resource(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: channels[1].binding_resource(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: channels[2].binding_resource(),
                },
            ],
        });

        let (x, y, z) = dispatch_size(counts.len() as usize);
        let mut compute_pass =
            command_encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("colormap-pass"),
            });
        compute_pass.set_pipeline(&self.pipeline);
        compute_pass.set_bind_group(0, &bind_group, &[]);
        compute_pass.dispatch_workgroups(x, y, z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_zero_is_background_under_every_palette() {
        for palette in [Palette::Hsv0, Palette::Hsv1, Palette::Hsv2] {
            assert_eq!(map_count(palette, 0), [0, 0, 0]);
        }
    }

    #[test]
    fn hue_cycles_with_period_255() {
        // 255 mod 255 wraps back to hue 0 while staying fully saturated.
        assert_eq!(map_count(Palette::Hsv0, 255), [0, 255, 255]);
        assert_eq!(map_count(Palette::Hsv0, 256), [1, 255, 255]);
        assert_eq!(map_count(Palette::Hsv0, 510), [0, 255, 255]);
    }

    #[test]
    fn hsv1_desaturates_with_iteration_depth() {
        assert_eq!(map_count(Palette::Hsv1, 1), [1, 255, 255]);
        assert_eq!(map_count(Palette::Hsv1, 510), [0, 253, 255]);
        assert_eq!(map_count(Palette::Hsv1, 1000), [235, 252, 255]);
    }

    #[test]
    fn hsv2_desaturates_faster() {
        // b = 255 - (count * 64) / 255, integer division.
        assert_eq!(map_count(Palette::Hsv2, 100), [100, 230, 255]);
        assert_eq!(map_count(Palette::Hsv2, 1000), [235, 5, 255]);
    }

    #[test]
    fn palette_index_round_trips() {
        for index in 0..3 {
            assert_eq!(Palette::from_index(index).unwrap().index(), index);
        }
        assert_eq!(Palette::from_index(3), None);
    }
}

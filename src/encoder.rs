/// Record commands into a one-shot command buffer.
pub fn record(
    device: &wgpu::Device,
    label: Option<&str>,
    function: impl FnOnce(&mut wgpu::CommandEncoder),
) -> wgpu::CommandBuffer {
    let mut command_encoder =
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label });
    function(&mut command_encoder);
    command_encoder.finish()
}

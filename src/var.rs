//! Single-value uniform buffers, pool-tracked like [`crate::buffer`].

use std::{marker::PhantomData, mem::size_of, sync::Arc};

use wgpu::util::DeviceExt;

use crate::error::Error;
use crate::pool::MemoryPool;

pub struct Var<A> {
    buffer: wgpu::Buffer,
    bytes: u64,
    pool: Arc<MemoryPool>,
    phantom_data: PhantomData<A>,
}

impl<A: bytemuck::Pod + bytemuck::Zeroable> Var<A> {
    pub fn init(
        device: &wgpu::Device,
        pool: &Arc<MemoryPool>,
        label: &str,
        contents: A,
    ) -> Result<Self, Error> {
        let bytes = size_of::<A>() as u64;
        pool.reserve(bytes)?;

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&[contents]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Ok(Var {
            buffer,
            bytes,
            pool: Arc::clone(pool),
            phantom_data: PhantomData,
        })
    }

    pub fn write(&self, queue: &wgpu::Queue, contents: A) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[contents]));
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.buffer.as_entire_binding()
    }
}

impl<A> Drop for Var<A> {
    fn drop(&mut self) {
        self.buffer.destroy();
        self.pool.release(self.bytes);
    }
}

/*!
Typed, pool-tracked `wgpu` buffers.

[`bytemuck`](https://docs.rs/bytemuck/latest/bytemuck/) casts Rust datatypes
to bytes the GPU can consume. Doing that cast at every call site is error
prone; nothing stops a buffer "of" `A`s from being filled with `B`s. So
buffers carry their element type.

Every buffer also reserves its byte size against the device [`MemoryPool`]
before creation and returns it on drop; the pool is where explicit
allocation failures come from.
*/

use std::{marker::PhantomData, mem::size_of, sync::mpsc, sync::Arc};

use crate::error::Error;
use crate::pool::MemoryPool;

pub struct Buffer<A> {
    buffer: wgpu::Buffer,
    len: u64,
    bytes: u64,
    pool: Arc<MemoryPool>,
    phantom_data: PhantomData<A>,
}

impl<A: bytemuck::Pod + bytemuck::Zeroable> Buffer<A> {
    /// Number of `A` elements.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn write(&self, queue: &wgpu::Queue, contents: &[A]) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(contents));
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.buffer.as_entire_binding()
    }

    /// Blocking readback of a `MAP_READ` staging buffer.
    pub fn read_back(&self, device: &wgpu::Device) -> Result<Vec<A>, Error> {
        let slice = self.buffer.slice(..);

        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|_| Error::Execution("buffer map callback dropped".into()))??;

        let contents = {
            let view = slice.get_mapped_range();
            bytemuck::cast_slice(&view).to_vec()
        };
        self.buffer.unmap();
        Ok(contents)
    }
}

impl<A> Drop for Buffer<A> {
    fn drop(&mut self) {
        self.buffer.destroy();
        self.pool.release(self.bytes);
    }
}

pub struct Builder<'a, A> {
    label: Option<&'a str>,
    len: u64,
    usage: wgpu::BufferUsages,
    phantom_data: PhantomData<A>,
}

impl<'a, A: bytemuck::Pod + bytemuck::Zeroable> Builder<'a, A> {
    /// A buffer holding `len` elements of `A`.
    pub fn new(len: u64) -> Self {
        Self {
            label: None,
            len,
            usage: wgpu::BufferUsages::empty(),
            phantom_data: PhantomData,
        }
    }

    pub fn with_label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_usage(mut self, usage: wgpu::BufferUsages) -> Self {
        self.usage |= usage;
        self
    }

    pub fn create(self, device: &wgpu::Device, pool: &Arc<MemoryPool>) -> Result<Buffer<A>, Error> {
        let bytes = self.len * size_of::<A>() as u64;
        pool.reserve(bytes)?;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: self.label,
            size: bytes,
            usage: self.usage,
            mapped_at_creation: false,
        });

        Ok(Buffer {
            buffer,
            len: self.len,
            bytes,
            pool: Arc::clone(pool),
            phantom_data: PhantomData,
        })
    }
}

/// Encode a full copy between two equally shaped typed buffers.
pub fn copy<A: bytemuck::Pod + bytemuck::Zeroable>(
    command_encoder: &mut wgpu::CommandEncoder,
    source: &Buffer<A>,
    destination: &Buffer<A>,
) {
    command_encoder.copy_buffer_to_buffer(
        source.buffer(),
        0,
        destination.buffer(),
        0,
        source.len() * size_of::<A>() as u64,
    );
}

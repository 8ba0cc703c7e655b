use bytemuck::Pod;

use crate::device::{BufferUsage, CommandQueue, Device, GpuError};

/// One small device-resident record rewritten by the CPU.
///
/// `write` overwrites the whole record. It must not run while a submitted frame that reads
/// this buffer is still in flight; `FrameSynchronizer` guarantees that for the render loop.
pub struct UniformBuffer<B, T> {
    buffer: B,
    value: T,
}

impl<B, T: Pod> UniformBuffer<B, T> {
    pub fn create<D>(device: &D, label: &str, initial: T) -> Result<Self, GpuError>
    where
        D: Device<Buffer = B>,
    {
        let buffer = device.new_buffer(label, bytemuck::bytes_of(&initial), BufferUsage::Uniform)?;
        Ok(Self {
            buffer,
            value: initial,
        })
    }

    pub fn write<Q>(&mut self, queue: &Q, value: T)
    where
        Q: CommandQueue<Buffer = B>,
    {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&value));
        self.value = value;
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    /// Last value written.
    pub fn value(&self) -> &T {
        &self.value
    }
}

/// `N` uniform buffers, one per frame that may be in flight.
///
/// Frame `k` uses slot `k mod N`, so the CPU never rewrites a record the GPU may still be
/// reading for an earlier frame.
pub struct UniformRing<B, T> {
    slots: Vec<UniformBuffer<B, T>>,
}

impl<B, T: Pod> UniformRing<B, T> {
    pub fn new<D>(device: &D, label: &str, initial: T, count: usize) -> Result<Self, GpuError>
    where
        D: Device<Buffer = B>,
    {
        let slots = (0..count.max(1))
            .map(|i| UniformBuffer::create(device, &format!("{label} {i}"), initial))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { slots })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot_index(&self, frame_index: u64) -> usize {
        (frame_index % self.slots.len() as u64) as usize
    }

    pub fn slot(&self, frame_index: u64) -> &UniformBuffer<B, T> {
        &self.slots[self.slot_index(frame_index)]
    }

    pub fn slot_mut(&mut self, frame_index: u64) -> &mut UniformBuffer<B, T> {
        let i = self.slot_index(frame_index);
        &mut self.slots[i]
    }
}

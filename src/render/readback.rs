//! Blocking GPU -> CPU buffer readback.
//!
//! Every call stalls the calling thread until the queue has drained the
//! work that touches `source`. Only the bake path reads back; the
//! per-frame path never calls into this module.

use bytemuck::Pod;

use crate::core::error::Error;
use crate::core::types::Result;

/// Copy `count` elements of `T` starting at `offset` bytes out of `source`.
///
/// `source` must have been created with `COPY_SRC`.
pub fn read_buffer<T: Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &wgpu::Buffer,
    offset: u64,
    count: usize,
) -> Result<Vec<T>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let size = (count * std::mem::size_of::<T>()) as u64;
    if offset + size > source.size() {
        return Err(Error::Readback(format!(
            "read of {} bytes at {} overruns {}-byte buffer",
            size, offset, source.size()
        )));
    }

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback_staging"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback_encoder"),
    });
    encoder.copy_buffer_to_buffer(source, offset, &staging, 0, size);
    queue.submit([encoder.finish()]);

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::Wait { submission_index: None, timeout: None })
        .map_err(|e| Error::Readback(e.to_string()))?;

    rx.recv()
        .map_err(|e| Error::Readback(e.to_string()))?
        .map_err(|e| Error::Readback(e.to_string()))?;

    let values = {
        let data = slice.get_mapped_range();
        bytemuck::cast_slice::<u8, T>(&data).to_vec()
    };
    staging.unmap();

    log::debug!("Read back {} bytes from {:?}", size, source);
    Ok(values)
}

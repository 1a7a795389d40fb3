pub struct DeviceBuffer {
    pub gpu_buffer: wgpu::Buffer,
}

impl DeviceBuffer {
    /// Uploads `data` through a host-visible scratch buffer into a new
    /// device-local buffer, blocking until the copy has completed.
    pub fn from_data(
        label: &str,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        usage: wgpu::BufferUsages,
        data: &[u8],
    ) -> Self {
        let size = padded_copy_size(data.len());

        let scratch_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label}_SCRATCH_BUFFER")),
            size,
            usage: wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: true,
        });

        scratch_buffer.slice(..).get_mapped_range_mut()[..data.len()].copy_from_slice(data);
        scratch_buffer.unmap();

        let gpu_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(&format!("{label}_UPLOAD_COMMAND_ENCODER")),
        });
        encoder.copy_buffer_to_buffer(&scratch_buffer, 0, &gpu_buffer, 0, size);

        queue.submit(std::iter::once(encoder.finish()));
        device.poll(wgpu::Maintain::Wait);

        log::debug!("Uploaded {size} bytes into {label}");

        Self { gpu_buffer }
    }

    pub fn zeroed(
        label: &str,
        device: &wgpu::Device,
        usage: wgpu::BufferUsages,
        size: usize,
    ) -> Self {
        let size = padded_copy_size(size);

        let gpu_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        });

        Self { gpu_buffer }
    }
}

/// Copies and mappings need a non-zero multiple of `COPY_BUFFER_ALIGNMENT`.
fn padded_copy_size(size: usize) -> wgpu::BufferAddress {
    (size as wgpu::BufferAddress)
        .max(1)
        .next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
}

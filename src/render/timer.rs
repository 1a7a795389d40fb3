use anyhow::Result;

const QUERY_COUNT: u32 = 2;
const QUERY_BUFFER_SIZE: wgpu::BufferAddress = QUERY_COUNT as u64 * wgpu::QUERY_SIZE as u64;

/// Which of the two frame timestamps a pass writes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PassTimestamps {
    FrameStart,
    FrameEnd,
    WholeFrame,
}

impl PassTimestamps {
    fn write_indices(self) -> (Option<u32>, Option<u32>) {
        match self {
            PassTimestamps::FrameStart => (Some(0), None),
            PassTimestamps::FrameEnd => (None, Some(1)),
            PassTimestamps::WholeFrame => (Some(0), Some(1)),
        }
    }
}

/// GPU frame time from a pair of timestamp queries.
pub struct GpuTimer {
    query_set: wgpu::QuerySet,
    resolve_buffer: wgpu::Buffer,
    readback_buffer: wgpu::Buffer,
    period_ns: f32,
}

impl GpuTimer {
    pub fn from_device(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let query_set = device.create_query_set(&wgpu::QuerySetDescriptor {
            label: Some("GPU_TIMER_QUERY_SET"),
            ty: wgpu::QueryType::Timestamp,
            count: QUERY_COUNT,
        });

        let resolve_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("GPU_TIMER_RESOLVE_BUFFER"),
            size: QUERY_BUFFER_SIZE,
            usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let readback_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("GPU_TIMER_READBACK_BUFFER"),
            size: QUERY_BUFFER_SIZE,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            query_set,
            resolve_buffer,
            readback_buffer,
            period_ns: queue.get_timestamp_period(),
        }
    }

    pub fn render_pass_writes(&self, timestamps: PassTimestamps) -> wgpu::RenderPassTimestampWrites<'_> {
        let (beginning_of_pass_write_index, end_of_pass_write_index) = timestamps.write_indices();

        wgpu::RenderPassTimestampWrites {
            query_set: &self.query_set,
            beginning_of_pass_write_index,
            end_of_pass_write_index,
        }
    }

    pub fn compute_pass_writes(&self, timestamps: PassTimestamps) -> wgpu::ComputePassTimestampWrites<'_> {
        let (beginning_of_pass_write_index, end_of_pass_write_index) = timestamps.write_indices();

        wgpu::ComputePassTimestampWrites {
            query_set: &self.query_set,
            beginning_of_pass_write_index,
            end_of_pass_write_index,
        }
    }

    pub fn resolve(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.resolve_query_set(&self.query_set, 0..QUERY_COUNT, &self.resolve_buffer, 0);
        encoder.copy_buffer_to_buffer(
            &self.resolve_buffer,
            0,
            &self.readback_buffer,
            0,
            QUERY_BUFFER_SIZE,
        );
    }

    /// Reads the resolved timestamps back. The frame's commands must have been submitted.
    pub fn read_elapsed_ms(&self, device: &wgpu::Device) -> Result<f64> {
        let slice = self.readback_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();

        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        receiver.recv()??;

        let timestamps: [u64; 2] = {
            let view = slice.get_mapped_range();
            bytemuck::pod_read_unaligned(&view[..QUERY_BUFFER_SIZE as usize])
        };
        self.readback_buffer.unmap();

        Ok(elapsed_ms(timestamps[0], timestamps[1], self.period_ns))
    }
}

fn elapsed_ms(begin: u64, end: u64, period_ns: f32) -> f64 {
    end.wrapping_sub(begin) as f64 * f64::from(period_ns) * 1e-6
}

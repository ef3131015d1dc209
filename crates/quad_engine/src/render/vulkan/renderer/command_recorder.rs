//! Command recording for the quad
//!
//! [`QuadDraw`] describes one frame's draw and records it into any
//! [`DrawCommandSink`]. The real sink is `commands::CommandRecorder`; tests
//! use a sink that only logs calls.

use ash::vk;

use crate::render::vulkan::commands::{CommandPool, CommandRecorder};
use crate::render::vulkan::context::{VulkanContext, VulkanError, VulkanResult};

/// Clear color for the single color attachment
pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Draw commands the quad needs, in recording order
pub trait DrawCommandSink {
    /// Begin the render pass over `render_area`
    fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_values: &[vk::ClearValue],
    );
    /// Set dynamic viewport 0
    fn set_viewport(&mut self, viewport: vk::Viewport);
    /// Set dynamic scissor 0
    fn set_scissor(&mut self, scissor: vk::Rect2D);
    /// Bind the graphics pipeline
    fn bind_pipeline(&mut self, pipeline: vk::Pipeline);
    /// Bind the vertex buffer at binding 0
    fn bind_vertex_buffer(&mut self, buffer: vk::Buffer);
    /// Bind the index buffer
    fn bind_index_buffer(&mut self, buffer: vk::Buffer, index_type: vk::IndexType);
    /// Bind descriptor set 0
    fn bind_descriptor_set(&mut self, layout: vk::PipelineLayout, descriptor_set: vk::DescriptorSet);
    /// One indexed draw of a single instance
    fn draw_indexed(&mut self, index_count: u32);
    /// End the render pass
    fn end_render_pass(&mut self);
}

/// Viewport covering the whole extent with the full depth range
pub fn full_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

/// Scissor covering the whole extent
pub fn full_scissor(extent: vk::Extent2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }
}

/// Everything needed to record one frame of the quad
#[derive(Debug, Clone, Copy)]
pub struct QuadDraw {
    /// Render pass to begin
    pub render_pass: vk::RenderPass,
    /// Framebuffer of the acquired image
    pub framebuffer: vk::Framebuffer,
    /// Current swapchain extent
    pub extent: vk::Extent2D,
    /// Graphics pipeline
    pub pipeline: vk::Pipeline,
    /// Layout the descriptor set is bound through
    pub pipeline_layout: vk::PipelineLayout,
    /// Device-local vertex buffer
    pub vertex_buffer: vk::Buffer,
    /// Device-local `u16` index buffer
    pub index_buffer: vk::Buffer,
    /// Number of indices to draw
    pub index_count: u32,
    /// The slot's descriptor set
    pub descriptor_set: vk::DescriptorSet,
}

impl QuadDraw {
    /// Record the frame into `sink`
    pub fn record<S: DrawCommandSink + ?Sized>(&self, sink: &mut S) {
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue { float32: CLEAR_COLOR },
        }];

        sink.begin_render_pass(self.render_pass, self.framebuffer, full_scissor(self.extent), &clear_values);
        sink.set_viewport(full_viewport(self.extent));
        sink.set_scissor(full_scissor(self.extent));
        sink.bind_pipeline(self.pipeline);
        sink.bind_vertex_buffer(self.vertex_buffer);
        sink.bind_index_buffer(self.index_buffer, vk::IndexType::UINT16);
        sink.bind_descriptor_set(self.pipeline_layout, self.descriptor_set);
        sink.draw_indexed(self.index_count);
        sink.end_render_pass();
    }
}

/// One primary command buffer per frame slot, re-recorded every frame
pub struct FrameCommands {
    recorders: Vec<CommandRecorder>,
    // Declared last: freeing the pool frees the recorders' buffers
    _command_pool: CommandPool,
}

impl FrameCommands {
    /// Allocate `frames` command buffers on the graphics family
    pub fn new(context: &VulkanContext, frames: usize) -> VulkanResult<Self> {
        log::debug!("Creating FrameCommands...");

        let command_pool = CommandPool::new(context.raw_device(), context.queue_families().graphics)?;
        let recorders = command_pool
            .allocate_command_buffers(frames as u32)?
            .into_iter()
            .map(|buffer| CommandRecorder::new(buffer, context.raw_device()))
            .collect();

        Ok(Self {
            recorders,
            _command_pool: command_pool,
        })
    }

    /// Reset and re-record the buffer of `slot`
    pub fn record(&mut self, slot: usize, draw: &QuadDraw) -> VulkanResult<vk::CommandBuffer> {
        let recorder = self.recorders.get_mut(slot).ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("No command buffer for frame slot {slot}"),
        })?;

        recorder.reset()?;
        recorder.begin(vk::CommandBufferUsageFlags::empty())?;
        draw.record(recorder);
        recorder.end()
    }

    /// Command buffer of `slot`
    pub fn command_buffer(&self, slot: usize) -> Option<vk::CommandBuffer> {
        self.recorders.get(slot).map(CommandRecorder::handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[derive(Debug, Clone, PartialEq)]
    enum Recorded {
        BeginRenderPass(vk::Framebuffer, vk::Extent2D),
        Viewport(f32, f32),
        Scissor(vk::Extent2D),
        BindPipeline,
        BindVertexBuffer,
        BindIndexBuffer(vk::IndexType),
        BindDescriptorSet(vk::DescriptorSet),
        DrawIndexed(u32),
        EndRenderPass,
    }

    #[derive(Default)]
    struct LogSink(Vec<Recorded>);

    impl DrawCommandSink for LogSink {
        fn begin_render_pass(
            &mut self,
            _render_pass: vk::RenderPass,
            framebuffer: vk::Framebuffer,
            render_area: vk::Rect2D,
            clear_values: &[vk::ClearValue],
        ) {
            assert_eq!(clear_values.len(), 1);
            self.0.push(Recorded::BeginRenderPass(framebuffer, render_area.extent));
        }
        fn set_viewport(&mut self, viewport: vk::Viewport) {
            self.0.push(Recorded::Viewport(viewport.width, viewport.height));
        }
        fn set_scissor(&mut self, scissor: vk::Rect2D) {
            self.0.push(Recorded::Scissor(scissor.extent));
        }
        fn bind_pipeline(&mut self, _pipeline: vk::Pipeline) {
            self.0.push(Recorded::BindPipeline);
        }
        fn bind_vertex_buffer(&mut self, _buffer: vk::Buffer) {
            self.0.push(Recorded::BindVertexBuffer);
        }
        fn bind_index_buffer(&mut self, _buffer: vk::Buffer, index_type: vk::IndexType) {
            self.0.push(Recorded::BindIndexBuffer(index_type));
        }
        fn bind_descriptor_set(&mut self, _layout: vk::PipelineLayout, descriptor_set: vk::DescriptorSet) {
            self.0.push(Recorded::BindDescriptorSet(descriptor_set));
        }
        fn draw_indexed(&mut self, index_count: u32) {
            self.0.push(Recorded::DrawIndexed(index_count));
        }
        fn end_render_pass(&mut self) {
            self.0.push(Recorded::EndRenderPass);
        }
    }

    fn quad_draw(extent: vk::Extent2D) -> QuadDraw {
        QuadDraw {
            render_pass: vk::RenderPass::from_raw(1),
            framebuffer: vk::Framebuffer::from_raw(2),
            extent,
            pipeline: vk::Pipeline::from_raw(3),
            pipeline_layout: vk::PipelineLayout::from_raw(4),
            vertex_buffer: vk::Buffer::from_raw(5),
            index_buffer: vk::Buffer::from_raw(6),
            index_count: crate::render::INDICES.len() as u32,
            descriptor_set: vk::DescriptorSet::from_raw(7),
        }
    }

    #[test]
    fn test_records_exactly_one_indexed_draw_of_six() {
        let mut sink = LogSink::default();
        quad_draw(vk::Extent2D { width: 800, height: 600 }).record(&mut sink);

        let draws: Vec<_> = sink.0.iter().filter(|c| matches!(c, Recorded::DrawIndexed(_))).collect();
        assert_eq!(draws, vec![&Recorded::DrawIndexed(6)]);
        assert_eq!(sink.0.first(), Some(&Recorded::BeginRenderPass(vk::Framebuffer::from_raw(2), vk::Extent2D { width: 800, height: 600 })));
        assert_eq!(sink.0.last(), Some(&Recorded::EndRenderPass));
        assert!(sink.0.contains(&Recorded::BindIndexBuffer(vk::IndexType::UINT16)));
        assert!(sink.0.contains(&Recorded::BindDescriptorSet(vk::DescriptorSet::from_raw(7))));
    }

    #[test]
    fn test_state_bound_before_draw() {
        let mut sink = LogSink::default();
        quad_draw(vk::Extent2D { width: 800, height: 600 }).record(&mut sink);

        let draw_at = sink.0.iter().position(|c| matches!(c, Recorded::DrawIndexed(_))).unwrap();
        for expected in [Recorded::BindPipeline, Recorded::BindVertexBuffer, Recorded::Viewport(800.0, 600.0)] {
            let at = sink.0.iter().position(|c| *c == expected).unwrap();
            assert!(at < draw_at, "{expected:?} recorded after the draw");
        }
    }

    #[test]
    fn test_viewport_follows_resized_extent() {
        let resized = vk::Extent2D { width: 1280, height: 720 };

        let mut before = LogSink::default();
        quad_draw(vk::Extent2D { width: 800, height: 600 }).record(&mut before);
        let mut after = LogSink::default();
        quad_draw(resized).record(&mut after);

        assert!(before.0.contains(&Recorded::Viewport(800.0, 600.0)));
        assert!(after.0.contains(&Recorded::Viewport(1280.0, 720.0)));
        assert!(after.0.contains(&Recorded::Scissor(resized)));
    }

    #[test]
    fn test_full_viewport_depth_range() {
        let viewport = full_viewport(vk::Extent2D { width: 4, height: 3 });
        assert_eq!((viewport.min_depth, viewport.max_depth), (0.0, 1.0));
        assert_eq!(full_scissor(vk::Extent2D { width: 4, height: 3 }).offset, vk::Offset2D { x: 0, y: 0 });
    }
}

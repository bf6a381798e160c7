//! Per-frame command sequence
//!
//! [`FrameRecording`] describes everything one frame draws and writes it into
//! any [`CommandSink`]. The Vulkan backend's sink forwards to `vkCmd*`; the
//! test backend keeps a log, which is how ordering rules are checked.

use ash::vk;

use crate::render::barrier::BufferTransition;
use crate::render::frame_params::FrameParameters;

/// Descriptor set index of the per-frame scene uniforms
pub const SCENE_SET: u32 = 0;
/// Descriptor set index of the per-object texture
pub const OBJECT_SET: u32 = 1;

/// Depth the depth attachment is cleared to
pub const CLEAR_DEPTH: f32 = 1.0;

/// Recording interface for one primary command buffer
pub trait CommandSink {
    /// Whole-buffer pipeline barrier
    fn buffer_barrier(&mut self, buffer: vk::Buffer, transition: BufferTransition);
    /// In-band buffer update (at most 65536 bytes, multiple of 4)
    fn update_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, data: &[u8]);
    /// Begin `render_pass` on `framebuffer` with inline contents
    fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_color: [f32; 4],
        clear_depth: f32,
    );
    /// Bind a graphics pipeline
    fn bind_pipeline(&mut self, pipeline: vk::Pipeline);
    /// Bind one descriptor set at `set_index`
    fn bind_descriptor_set(&mut self, layout: vk::PipelineLayout, set_index: u32, set: vk::DescriptorSet);
    /// Bind vertex buffers starting at `first_binding`, all at offset zero
    fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[vk::Buffer]);
    /// Non-indexed draw of one instance
    fn draw(&mut self, vertex_count: u32);
    /// End the current render pass
    fn end_render_pass(&mut self);
}

/// One mesh drawn with one pipeline
///
/// Handles are borrowed from the scene, which outlives every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawBatch {
    /// Position stream, vertex binding 0
    pub positions: vk::Buffer,
    /// Texcoord stream, vertex binding 1
    pub texcoords: vk::Buffer,
    /// Vertices in both streams
    pub vertex_count: u32,
    /// Per-object descriptor set bound at set 1
    pub object_set: vk::DescriptorSet,
}

/// Static scene handles shared by both draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneBindings {
    /// Layout shared by the opaque and alpha pipelines
    pub pipeline_layout: vk::PipelineLayout,
    /// Scene descriptor set bound at set 0
    pub scene_set: vk::DescriptorSet,
    /// Uniform buffer receiving [`FrameParameters`]
    pub uniform_buffer: vk::Buffer,
    /// Ground plane, drawn first with the opaque pipeline
    pub opaque: DrawBatch,
    /// Sprite, drawn second with the alpha pipeline
    pub alpha: DrawBatch,
}

/// Everything needed to record one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameRecording<'a> {
    /// Render pass of the current surface generation
    pub render_pass: vk::RenderPass,
    /// Framebuffer of the acquired image
    pub framebuffer: vk::Framebuffer,
    /// Surface extent
    pub extent: vk::Extent2D,
    /// Color clear value
    pub clear_color: [f32; 4],
    /// Uniform contents for this frame
    pub parameters: &'a FrameParameters,
    /// Opaque pipeline
    pub opaque_pipeline: vk::Pipeline,
    /// Alpha-blended pipeline
    pub alpha_pipeline: vk::Pipeline,
    /// Scene handles
    pub scene: &'a SceneBindings,
}

impl FrameRecording<'_> {
    /// Write the frame into `sink`
    ///
    /// Uniform update first, bracketed by its barrier pair, then the render
    /// pass with the opaque draw strictly before the alpha draw so the floor
    /// depth is in place before the sprite blends over it.
    pub fn record(&self, sink: &mut dyn CommandSink) {
        let scene = self.scene;

        sink.buffer_barrier(scene.uniform_buffer, BufferTransition::UNIFORM_READ_TO_TRANSFER_WRITE);
        sink.update_buffer(scene.uniform_buffer, 0, self.parameters.as_bytes());
        sink.buffer_barrier(scene.uniform_buffer, BufferTransition::TRANSFER_WRITE_TO_UNIFORM_READ);

        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: self.extent,
        };
        sink.begin_render_pass(self.render_pass, self.framebuffer, render_area, self.clear_color, CLEAR_DEPTH);

        sink.bind_pipeline(self.opaque_pipeline);
        sink.bind_descriptor_set(scene.pipeline_layout, SCENE_SET, scene.scene_set);
        Self::draw_batch(sink, scene.pipeline_layout, &scene.opaque);

        // Same layout, so set 0 stays bound across the pipeline switch
        sink.bind_pipeline(self.alpha_pipeline);
        Self::draw_batch(sink, scene.pipeline_layout, &scene.alpha);

        sink.end_render_pass();
    }

    fn draw_batch(sink: &mut dyn CommandSink, layout: vk::PipelineLayout, batch: &DrawBatch) {
        sink.bind_descriptor_set(layout, OBJECT_SET, batch.object_set);
        sink.bind_vertex_buffers(0, &[batch.positions, batch.texcoords]);
        sink.draw(batch.vertex_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraSettings;
    use crate::render::testing::{sample_scene, RecordedCommand, RecordingSink};
    use ash::vk::Handle;

    fn record_sample() -> (SceneBindings, Vec<RecordedCommand>) {
        let scene = sample_scene();
        let extent = vk::Extent2D { width: 640, height: 480 };
        let parameters = FrameParameters::compute(extent, &CameraSettings::default());
        let recording = FrameRecording {
            render_pass: vk::RenderPass::from_raw(1),
            framebuffer: vk::Framebuffer::from_raw(2),
            extent,
            clear_color: [0.1, 0.1, 0.1, 1.0],
            parameters: &parameters,
            opaque_pipeline: vk::Pipeline::from_raw(3),
            alpha_pipeline: vk::Pipeline::from_raw(4),
            scene: &scene,
        };

        let mut sink = RecordingSink::default();
        recording.record(&mut sink);
        (scene, sink.commands)
    }

    fn position(commands: &[RecordedCommand], wanted: &RecordedCommand) -> usize {
        commands
            .iter()
            .position(|c| c == wanted)
            .unwrap_or_else(|| panic!("{wanted:?} not recorded"))
    }

    #[test]
    fn test_uniform_update_is_bracketed_by_barriers() {
        let (scene, commands) = record_sample();

        assert_eq!(
            commands[0],
            RecordedCommand::Barrier(scene.uniform_buffer, BufferTransition::UNIFORM_READ_TO_TRANSFER_WRITE)
        );
        assert_eq!(
            commands[1],
            RecordedCommand::UpdateBuffer {
                buffer: scene.uniform_buffer,
                offset: 0,
                len: FrameParameters::SIZE,
            }
        );
        assert_eq!(
            commands[2],
            RecordedCommand::Barrier(scene.uniform_buffer, BufferTransition::TRANSFER_WRITE_TO_UNIFORM_READ)
        );
        assert!(matches!(commands[3], RecordedCommand::BeginRenderPass { .. }));
    }

    #[test]
    fn test_opaque_draw_precedes_alpha_draw() {
        let (scene, commands) = record_sample();

        let opaque = position(&commands, &RecordedCommand::BindPipeline(vk::Pipeline::from_raw(3)));
        let alpha = position(&commands, &RecordedCommand::BindPipeline(vk::Pipeline::from_raw(4)));
        let draws: Vec<usize> = commands
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, RecordedCommand::Draw(_)))
            .map(|(i, _)| i)
            .collect();

        assert_eq!(draws.len(), 2);
        assert!(opaque < draws[0] && draws[0] < alpha && alpha < draws[1]);
        assert_eq!(commands[draws[0]], RecordedCommand::Draw(scene.opaque.vertex_count));
        assert_eq!(commands[draws[1]], RecordedCommand::Draw(scene.alpha.vertex_count));
    }

    #[test]
    fn test_only_object_set_changes_between_draws() {
        let (scene, commands) = record_sample();

        let binds: Vec<&RecordedCommand> = commands
            .iter()
            .filter(|c| matches!(c, RecordedCommand::BindDescriptorSet { .. }))
            .collect();

        assert_eq!(
            binds,
            vec![
                &RecordedCommand::BindDescriptorSet {
                    layout: scene.pipeline_layout,
                    set_index: SCENE_SET,
                    set: scene.scene_set,
                },
                &RecordedCommand::BindDescriptorSet {
                    layout: scene.pipeline_layout,
                    set_index: OBJECT_SET,
                    set: scene.opaque.object_set,
                },
                &RecordedCommand::BindDescriptorSet {
                    layout: scene.pipeline_layout,
                    set_index: OBJECT_SET,
                    set: scene.alpha.object_set,
                },
            ]
        );
    }

    #[test]
    fn test_render_pass_clears_and_closes() {
        let (scene, commands) = record_sample();

        assert_eq!(
            commands[3],
            RecordedCommand::BeginRenderPass {
                render_pass: vk::RenderPass::from_raw(1),
                framebuffer: vk::Framebuffer::from_raw(2),
                extent: vk::Extent2D { width: 640, height: 480 },
                clear_color: [0.1, 0.1, 0.1, 1.0],
                clear_depth: 1.0,
            }
        );
        assert_eq!(commands.last(), Some(&RecordedCommand::EndRenderPass));
        assert!(commands.contains(&RecordedCommand::BindVertexBuffers {
            first_binding: 0,
            buffers: vec![scene.alpha.positions, scene.alpha.texcoords],
        }));
    }
}

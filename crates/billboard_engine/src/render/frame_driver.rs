//! Frame driver
//!
//! Runs the per-frame protocol over a [`FrameBackend`]:
//!
//! ```text
//! Idle -> Acquiring -> WaitingForSlot -> Recording -> Submitted -> Presenting -> Idle
//!            |                                                        |
//!            +------------------> SurfaceStale <----------------------+
//! ```
//!
//! A resize event can also enter `SurfaceStale`. Whenever it is entered the
//! driver rebuilds the surface generation before the next acquisition.
//!
//! Each surface image owns a [`FrameSlot`]. The slot's fence is waited on and
//! reset before its command buffer is re-recorded, which bounds the frames in
//! flight to the number of surface images.

use ash::vk;

use crate::config::{CameraSettings, RendererConfig};
use crate::error::{EngineError, EngineResult};
use crate::input::FrameInput;
use crate::render::backend::{
    AcquireOutcome, FrameBackend, GpuHandle, PresentOutcome, SurfaceChanges, SurfaceInfo,
};
use crate::render::commands::{FrameRecording, SceneBindings};
use crate::render::frame_params::FrameParameters;
use crate::render::pipeline::{PipelineSet, PipelineVariant};

/// Where the driver is in the per-frame protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Between iterations
    Idle,
    /// Waiting for the surface to hand out an image index
    Acquiring,
    /// Waiting on the acquired slot's completion fence
    WaitingForSlot,
    /// Writing the slot's command buffer
    Recording,
    /// Command buffer queued on the graphics queue
    Submitted,
    /// Image queued for presentation
    Presenting,
    /// Surface must be rebuilt before the next acquisition
    SurfaceStale,
}

/// What one call to [`FrameDriver::run_iteration`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame was submitted and queued for presentation
    Presented {
        /// Surface image that was rendered
        image_index: u32,
    },
    /// Acquisition found the surface stale; nothing was recorded or submitted
    SkippedStaleSurface,
    /// The framebuffer has zero area; rendering is paused
    Minimized,
    /// The input asked to close; nothing was rendered
    CloseRequested,
}

/// Counters over the driver's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames submitted and presented
    pub frames_presented: u64,
    /// Iterations skipped because acquisition found a stale surface
    pub frames_skipped: u64,
    /// Completed surface recreations
    pub recreations: u64,
}

/// Fixed per-frame settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSettings {
    /// Camera pose and projection parameters
    pub camera: CameraSettings,
    /// Color attachment clear value
    pub clear_color: [f32; 4],
}

impl From<&RendererConfig> for FrameSettings {
    fn from(config: &RendererConfig) -> Self {
        Self {
            camera: config.camera,
            clear_color: config.clear_color,
        }
    }
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self::from(&RendererConfig::default())
    }
}

/// Recording and synchronization resources for one surface image
pub struct FrameSlot<B: FrameBackend> {
    command_buffer: B::CommandBuffer,
    completion_fence: B::Fence,
    image_available: B::Semaphore,
    render_finished: B::Semaphore,
}

impl<B: FrameBackend> FrameSlot<B> {
    fn new(backend: &B) -> EngineResult<Self> {
        Ok(Self {
            command_buffer: backend.allocate_command_buffer()?,
            // Signaled so the first wait on a fresh slot returns immediately
            completion_fence: backend.create_fence(true)?,
            image_available: backend.create_semaphore()?,
            render_finished: backend.create_semaphore()?,
        })
    }
}

fn create_slots<B: FrameBackend>(backend: &B, count: usize) -> EngineResult<Vec<FrameSlot<B>>> {
    (0..count).map(|_| FrameSlot::new(backend)).collect()
}

/// Orchestrates acquire, slot wait, record, submit and present
///
/// Owns every per-generation object (render pass, depth buffer, framebuffers,
/// pipelines) and all frame slots. Fields drop in declaration order, so
/// everything created through the backend is released before the backend.
pub struct FrameDriver<B: FrameBackend> {
    slots: Vec<FrameSlot<B>>,
    acquire_semaphore: B::Semaphore,
    pipelines: PipelineSet<B::Pipeline>,
    framebuffers: Vec<B::Framebuffer>,
    depth_buffer: B::DepthBuffer,
    render_pass: B::RenderPass,
    scene: SceneBindings,
    settings: FrameSettings,
    surface: SurfaceInfo,
    window_extent: vk::Extent2D,
    state: FrameState,
    stats: FrameStats,
    backend: B,
}

impl<B: FrameBackend> FrameDriver<B> {
    /// Build the driver for the backend's current surface generation
    pub fn new(
        backend: B,
        scene: SceneBindings,
        settings: FrameSettings,
        window_extent: vk::Extent2D,
    ) -> EngineResult<Self> {
        let surface = backend.surface_info();
        log::debug!(
            "Creating FrameDriver with {} frame slots at {}x{}",
            surface.image_count,
            surface.extent.width,
            surface.extent.height
        );

        let slots = create_slots(&backend, surface.image_count)?;
        let acquire_semaphore = backend.create_semaphore()?;
        let render_pass = backend.create_render_pass(surface.format)?;
        let depth_buffer = backend.create_depth_buffer(surface.extent)?;
        let framebuffers = backend.create_framebuffers(&render_pass, &depth_buffer)?;
        let pipelines = PipelineSet::try_build(|variant| {
            backend.create_pipeline(&render_pass, variant, surface.extent)
        })?;

        Ok(Self {
            slots,
            acquire_semaphore,
            pipelines,
            framebuffers,
            depth_buffer,
            render_pass,
            scene,
            settings,
            surface,
            window_extent,
            state: FrameState::Idle,
            stats: FrameStats::default(),
            backend,
        })
    }

    /// Current protocol state
    pub const fn state(&self) -> FrameState {
        self.state
    }

    /// Lifetime counters
    pub const fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Current surface generation
    pub const fn surface(&self) -> SurfaceInfo {
        self.surface
    }

    /// Number of frame slots (one per surface image)
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// The backend
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Render pass of the current generation
    pub const fn render_pass(&self) -> &B::RenderPass {
        &self.render_pass
    }

    /// Depth buffer of the current generation
    pub const fn depth_buffer(&self) -> &B::DepthBuffer {
        &self.depth_buffer
    }

    /// Framebuffers of the current generation, by image index
    pub fn framebuffers(&self) -> &[B::Framebuffer] {
        &self.framebuffers
    }

    /// Pipelines of the current generation
    pub const fn pipelines(&self) -> &PipelineSet<B::Pipeline> {
        &self.pipelines
    }

    /// Run one iteration of the frame loop
    ///
    /// Errors are fatal for the session: only surface staleness is recovered
    /// from, and that never surfaces as an error.
    pub fn run_iteration(&mut self, input: &FrameInput) -> EngineResult<FrameOutcome> {
        if input.close_requested() {
            return Ok(FrameOutcome::CloseRequested);
        }

        if let Some((width, height)) = input.latest_resize() {
            self.window_extent = vk::Extent2D { width, height };
            self.mark_stale("window resized");
        }

        if self.window_extent.width == 0 || self.window_extent.height == 0 {
            return Ok(FrameOutcome::Minimized);
        }

        if self.state == FrameState::SurfaceStale {
            self.recover_surface()?;
        }

        let outcome = self.render_frame()?;

        if self.state == FrameState::SurfaceStale {
            self.recover_surface()?;
        } else {
            self.transition(FrameState::Idle);
        }

        Ok(outcome)
    }

    /// Block until the GPU has finished all submitted frames
    pub fn wait_idle(&self) -> EngineResult<()> {
        self.backend.wait_idle()
    }

    fn render_frame(&mut self) -> EngineResult<FrameOutcome> {
        self.transition(FrameState::Acquiring);
        let image_index = match self.backend.acquire_next_image(&self.acquire_semaphore)? {
            AcquireOutcome::Ready(index) => index,
            AcquireOutcome::Stale => {
                self.mark_stale("acquire reported a stale surface");
                self.stats.frames_skipped += 1;
                return Ok(FrameOutcome::SkippedStaleSurface);
            }
        };

        let slot_index = image_index as usize;
        if slot_index >= self.slots.len() || slot_index >= self.framebuffers.len() {
            return Err(EngineError::ImageIndexOutOfRange {
                index: image_index,
                count: self.slots.len(),
            });
        }

        self.transition(FrameState::WaitingForSlot);
        {
            let slot = &mut self.slots[slot_index];
            self.backend.wait_for_fence(&slot.completion_fence)?;
            self.backend.reset_fence(&slot.completion_fence)?;
            // The slot's previous acquire semaphore was consumed by the submission
            // the fence just guarded, so it becomes the spare for the next acquire.
            std::mem::swap(&mut slot.image_available, &mut self.acquire_semaphore);
        }

        let parameters = FrameParameters::compute(self.surface.extent, &self.settings.camera);

        self.transition(FrameState::Recording);
        {
            let recording = FrameRecording {
                render_pass: self.render_pass.handle(),
                framebuffer: self.framebuffers[slot_index].handle(),
                extent: self.surface.extent,
                clear_color: self.settings.clear_color,
                parameters: &parameters,
                opaque_pipeline: self.pipelines.get(PipelineVariant::Opaque).handle(),
                alpha_pipeline: self.pipelines.get(PipelineVariant::Alpha).handle(),
                scene: &self.scene,
            };
            let slot = &self.slots[slot_index];
            self.backend
                .record(&slot.command_buffer, |sink| recording.record(sink))?;
            self.backend.submit(
                &slot.command_buffer,
                &slot.image_available,
                &slot.render_finished,
                &slot.completion_fence,
            )?;
        }
        self.transition(FrameState::Submitted);

        self.transition(FrameState::Presenting);
        let presented = self
            .backend
            .present(image_index, &self.slots[slot_index].render_finished)?;
        self.stats.frames_presented += 1;

        if presented == PresentOutcome::Stale {
            self.mark_stale("present reported a stale surface");
        }

        Ok(FrameOutcome::Presented { image_index })
    }

    /// Rebuild everything tied to the surface generation
    ///
    /// The render pass is rebuilt only on a format change. Depth buffer and
    /// framebuffers are always rebuilt. Pipelines bake the viewport and must
    /// match the render pass formats, so they follow either change.
    fn recover_surface(&mut self) -> EngineResult<()> {
        self.backend.wait_idle()?;

        // Framebuffers reference the outgoing swapchain views
        self.framebuffers.clear();

        let changes = self.backend.recreate_surface(self.window_extent)?;
        let surface = self.backend.surface_info();
        log::info!(
            "Surface recreated: {}x{} {:?}, {} images, changes {:?}",
            surface.extent.width,
            surface.extent.height,
            surface.format,
            surface.image_count,
            changes
        );

        // A suboptimal acquire may have left the spare semaphore signaled
        self.acquire_semaphore = self.backend.create_semaphore()?;

        if surface.image_count != self.slots.len() {
            log::debug!(
                "Image count changed from {} to {}, rebuilding frame slots",
                self.slots.len(),
                surface.image_count
            );
            self.slots = create_slots(&self.backend, surface.image_count)?;
        }

        let format_changed = changes.contains(SurfaceChanges::FORMAT);
        if format_changed {
            self.render_pass = self.backend.create_render_pass(surface.format)?;
        }

        self.depth_buffer = self.backend.create_depth_buffer(surface.extent)?;
        self.framebuffers = self
            .backend
            .create_framebuffers(&self.render_pass, &self.depth_buffer)?;

        if format_changed || changes.contains(SurfaceChanges::SIZE) {
            let backend = &self.backend;
            let render_pass = &self.render_pass;
            self.pipelines = PipelineSet::try_build(|variant| {
                backend.create_pipeline(render_pass, variant, surface.extent)
            })?;
        }

        self.surface = surface;
        self.stats.recreations += 1;
        self.transition(FrameState::Idle);
        Ok(())
    }

    fn mark_stale(&mut self, reason: &str) {
        if self.state != FrameState::SurfaceStale {
            log::warn!("Surface stale: {}", reason);
        }
        self.transition(FrameState::SurfaceStale);
    }

    fn transition(&mut self, next: FrameState) {
        log::trace!("Frame state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

impl<B: FrameBackend> Drop for FrameDriver<B> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.wait_idle() {
            log::error!("Failed to idle device during frame driver teardown: {}", e);
        }
    }
}

//! In-memory backend and command log for exercising the frame protocol
//!
//! [`MockBackend`] tracks fence and semaphore states and panics on the misuse
//! a real driver would turn into a hang or a validation error: waiting on a
//! fence nothing will signal, re-recording a command buffer the GPU may still
//! read, or signaling a semaphore twice.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::marker::PhantomData;
use std::rc::Rc;

use ash::vk::{self, Handle};

use crate::error::EngineResult;
use crate::render::backend::{
    AcquireOutcome, FrameBackend, GpuHandle, PresentOutcome, SurfaceChanges, SurfaceInfo,
};
use crate::render::barrier::BufferTransition;
use crate::render::commands::{CommandSink, DrawBatch, SceneBindings};
use crate::render::pipeline::PipelineVariant;
use crate::render::vulkan::VulkanError;

/// One call into a [`CommandSink`]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RecordedCommand {
    Barrier(vk::Buffer, BufferTransition),
    UpdateBuffer {
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        len: usize,
    },
    BeginRenderPass {
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_color: [f32; 4],
        clear_depth: f32,
    },
    BindPipeline(vk::Pipeline),
    BindDescriptorSet {
        layout: vk::PipelineLayout,
        set_index: u32,
        set: vk::DescriptorSet,
    },
    BindVertexBuffers {
        first_binding: u32,
        buffers: Vec<vk::Buffer>,
    },
    Draw(u32),
    EndRenderPass,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub commands: Vec<RecordedCommand>,
}

impl CommandSink for RecordingSink {
    fn buffer_barrier(&mut self, buffer: vk::Buffer, transition: BufferTransition) {
        self.commands.push(RecordedCommand::Barrier(buffer, transition));
    }

    fn update_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, data: &[u8]) {
        self.commands.push(RecordedCommand::UpdateBuffer {
            buffer,
            offset,
            len: data.len(),
        });
    }

    fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_color: [f32; 4],
        clear_depth: f32,
    ) {
        self.commands.push(RecordedCommand::BeginRenderPass {
            render_pass,
            framebuffer,
            extent: render_area.extent,
            clear_color,
            clear_depth,
        });
    }

    fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        self.commands.push(RecordedCommand::BindPipeline(pipeline));
    }

    fn bind_descriptor_set(&mut self, layout: vk::PipelineLayout, set_index: u32, set: vk::DescriptorSet) {
        self.commands.push(RecordedCommand::BindDescriptorSet { layout, set_index, set });
    }

    fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[vk::Buffer]) {
        self.commands.push(RecordedCommand::BindVertexBuffers {
            first_binding,
            buffers: buffers.to_vec(),
        });
    }

    fn draw(&mut self, vertex_count: u32) {
        self.commands.push(RecordedCommand::Draw(vertex_count));
    }

    fn end_render_pass(&mut self) {
        self.commands.push(RecordedCommand::EndRenderPass);
    }
}

/// Scene handles with distinct fake values
pub(crate) fn sample_scene() -> SceneBindings {
    SceneBindings {
        pipeline_layout: vk::PipelineLayout::from_raw(100),
        scene_set: vk::DescriptorSet::from_raw(101),
        uniform_buffer: vk::Buffer::from_raw(102),
        opaque: DrawBatch {
            positions: vk::Buffer::from_raw(110),
            texcoords: vk::Buffer::from_raw(111),
            vertex_count: 6,
            object_set: vk::DescriptorSet::from_raw(112),
        },
        alpha: DrawBatch {
            positions: vk::Buffer::from_raw(120),
            texcoords: vk::Buffer::from_raw(121),
            vertex_count: 6,
            object_set: vk::DescriptorSet::from_raw(122),
        },
    }
}

/// Fake GPU object identified by a unique id
#[derive(Debug)]
pub(crate) struct MockObject<H> {
    id: u64,
    _handle: PhantomData<H>,
}

impl<H> MockObject<H> {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<H: Handle> GpuHandle<H> for MockObject<H> {
    fn handle(&self) -> H {
        H::from_raw(self.id)
    }
}

/// Frame-level backend calls, in call order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    Acquire { stale: bool },
    WaitFence(u64),
    ResetFence(u64),
    Record { command_buffer: u64 },
    Submit {
        command_buffer: u64,
        wait: u64,
        signal: u64,
        fence: u64,
    },
    Present { image_index: u32 },
    WaitIdle,
    RecreateSurface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    Unsignaled,
    Pending,
    Signaled,
}

#[derive(Debug, Clone, Copy)]
enum ScriptedAcquire {
    Outcome(AcquireOutcome),
    /// Image handed out and semaphore signaled, but the surface is stale
    Suboptimal,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    fences: HashMap<u64, FenceState>,
    signaled_semaphores: HashSet<u64>,
    in_flight: HashMap<u64, u64>,
    submit_calls: u32,
    last_recording: Vec<RecordedCommand>,
}

impl MockState {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn signal(&mut self, semaphore: u64) {
        assert!(
            self.signaled_semaphores.insert(semaphore),
            "semaphore {semaphore} signaled while already signaled"
        );
    }

    fn consume(&mut self, semaphore: u64) {
        assert!(
            self.signaled_semaphores.remove(&semaphore),
            "waiting on semaphore {semaphore} that nothing signaled"
        );
    }
}

pub(crate) struct MockBackend {
    surface: SurfaceInfo,
    next_image: u32,
    acquire_calls: u32,
    present_calls: u32,
    acquire_script: HashMap<u32, ScriptedAcquire>,
    present_script: HashMap<u32, PresentOutcome>,
    recreations: VecDeque<SurfaceInfo>,
    submit_failure: Option<(u32, vk::Result)>,
    last_window_extent: Option<vk::Extent2D>,
    state: RefCell<MockState>,
    log: Rc<RefCell<Vec<Event>>>,
}

impl MockBackend {
    pub fn new(surface: SurfaceInfo) -> Self {
        Self {
            surface,
            next_image: 0,
            acquire_calls: 0,
            present_calls: 0,
            acquire_script: HashMap::new(),
            present_script: HashMap::new(),
            recreations: VecDeque::new(),
            submit_failure: None,
            last_window_extent: None,
            state: RefCell::new(MockState {
                // Keep ids clear of the fake scene handles
                next_id: 1000,
                ..MockState::default()
            }),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Override the outcome of the `call`-th acquire (1-based)
    pub fn script_acquire(&mut self, call: u32, outcome: AcquireOutcome) {
        self.acquire_script.insert(call, ScriptedAcquire::Outcome(outcome));
    }

    /// Make the `call`-th acquire signal its semaphore yet report staleness
    pub fn script_suboptimal_acquire(&mut self, call: u32) {
        self.acquire_script.insert(call, ScriptedAcquire::Suboptimal);
    }

    /// Override the outcome of the `call`-th present (1-based)
    pub fn script_present(&mut self, call: u32, outcome: PresentOutcome) {
        self.present_script.insert(call, outcome);
    }

    /// Queue the surface the next recreation produces
    ///
    /// Without a queued surface, recreation keeps the current one.
    pub fn script_recreation(&mut self, surface: SurfaceInfo) {
        self.recreations.push_back(surface);
    }

    /// Fail the `call`-th submit (1-based) with `result`
    pub fn fail_submit_on(&mut self, call: u32, result: vk::Result) {
        self.submit_failure = Some((call, result));
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.borrow().clone()
    }

    /// Event log that outlives the backend
    pub fn shared_log(&self) -> Rc<RefCell<Vec<Event>>> {
        Rc::clone(&self.log)
    }

    pub fn last_recording(&self) -> Vec<RecordedCommand> {
        self.state.borrow().last_recording.clone()
    }

    pub const fn last_window_extent(&self) -> Option<vk::Extent2D> {
        self.last_window_extent
    }

    fn push(&self, event: Event) {
        self.log.borrow_mut().push(event);
    }

    fn object<H>(&self) -> MockObject<H> {
        MockObject {
            id: self.state.borrow_mut().allocate(),
            _handle: PhantomData,
        }
    }
}

impl FrameBackend for MockBackend {
    type Fence = MockObject<vk::Fence>;
    type Semaphore = MockObject<vk::Semaphore>;
    type CommandBuffer = MockObject<vk::CommandBuffer>;
    type RenderPass = MockObject<vk::RenderPass>;
    type DepthBuffer = MockObject<vk::Image>;
    type Framebuffer = MockObject<vk::Framebuffer>;
    type Pipeline = MockObject<vk::Pipeline>;

    fn surface_info(&self) -> SurfaceInfo {
        self.surface
    }

    fn create_fence(&self, signaled: bool) -> EngineResult<Self::Fence> {
        let fence = self.object();
        let initial = if signaled {
            FenceState::Signaled
        } else {
            FenceState::Unsignaled
        };
        self.state.borrow_mut().fences.insert(fence.id(), initial);
        Ok(fence)
    }

    fn create_semaphore(&self) -> EngineResult<Self::Semaphore> {
        Ok(self.object())
    }

    fn allocate_command_buffer(&self) -> EngineResult<Self::CommandBuffer> {
        Ok(self.object())
    }

    fn wait_for_fence(&self, fence: &Self::Fence) -> EngineResult<()> {
        self.push(Event::WaitFence(fence.id()));
        let mut state = self.state.borrow_mut();
        let current = state.fences.get_mut(&fence.id()).expect("unknown fence");
        match *current {
            FenceState::Unsignaled => panic!("fence {} would never signal", fence.id()),
            FenceState::Pending | FenceState::Signaled => *current = FenceState::Signaled,
        }
        Ok(())
    }

    fn reset_fence(&self, fence: &Self::Fence) -> EngineResult<()> {
        self.push(Event::ResetFence(fence.id()));
        let mut state = self.state.borrow_mut();
        let current = state.fences.get_mut(&fence.id()).expect("unknown fence");
        assert_ne!(*current, FenceState::Pending, "reset of in-flight fence {}", fence.id());
        *current = FenceState::Unsignaled;
        Ok(())
    }

    fn acquire_next_image(&mut self, signal: &Self::Semaphore) -> EngineResult<AcquireOutcome> {
        self.acquire_calls += 1;
        let scripted = self.acquire_script.get(&self.acquire_calls).copied();

        let outcome = match scripted {
            Some(ScriptedAcquire::Outcome(AcquireOutcome::Stale)) => AcquireOutcome::Stale,
            Some(ScriptedAcquire::Outcome(AcquireOutcome::Ready(index))) => {
                self.state.borrow_mut().signal(signal.id());
                AcquireOutcome::Ready(index)
            }
            Some(ScriptedAcquire::Suboptimal) => {
                self.state.borrow_mut().signal(signal.id());
                AcquireOutcome::Stale
            }
            None => {
                self.state.borrow_mut().signal(signal.id());
                let index = self.next_image;
                self.next_image = (self.next_image + 1) % self.surface.image_count as u32;
                AcquireOutcome::Ready(index)
            }
        };

        self.push(Event::Acquire {
            stale: outcome == AcquireOutcome::Stale,
        });
        Ok(outcome)
    }

    fn record<F>(&self, command_buffer: &Self::CommandBuffer, commands: F) -> EngineResult<()>
    where
        F: FnOnce(&mut dyn CommandSink),
    {
        self.push(Event::Record {
            command_buffer: command_buffer.id(),
        });
        {
            let state = self.state.borrow();
            if let Some(fence) = state.in_flight.get(&command_buffer.id()) {
                assert_ne!(
                    state.fences.get(fence),
                    Some(&FenceState::Pending),
                    "command buffer {} re-recorded while in flight",
                    command_buffer.id()
                );
            }
        }

        let mut sink = RecordingSink::default();
        commands(&mut sink);
        self.state.borrow_mut().last_recording = sink.commands;
        Ok(())
    }

    fn submit(
        &self,
        command_buffer: &Self::CommandBuffer,
        wait: &Self::Semaphore,
        signal: &Self::Semaphore,
        fence: &Self::Fence,
    ) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        state.submit_calls += 1;
        if let Some((call, result)) = self.submit_failure {
            if call == state.submit_calls {
                return Err(VulkanError::Api {
                    operation: "vkQueueSubmit",
                    result,
                }
                .into());
            }
        }

        state.consume(wait.id());
        state.signal(signal.id());
        let current = state.fences.get_mut(&fence.id()).expect("unknown fence");
        assert_eq!(*current, FenceState::Unsignaled, "submit with fence {} not reset", fence.id());
        *current = FenceState::Pending;
        state.in_flight.insert(command_buffer.id(), fence.id());
        drop(state);

        self.push(Event::Submit {
            command_buffer: command_buffer.id(),
            wait: wait.id(),
            signal: signal.id(),
            fence: fence.id(),
        });
        Ok(())
    }

    fn present(&mut self, image_index: u32, wait: &Self::Semaphore) -> EngineResult<PresentOutcome> {
        self.present_calls += 1;
        assert!((image_index as usize) < self.surface.image_count);
        self.state.borrow_mut().consume(wait.id());
        self.push(Event::Present { image_index });
        Ok(self
            .present_script
            .get(&self.present_calls)
            .copied()
            .unwrap_or(PresentOutcome::Presented))
    }

    fn wait_idle(&self) -> EngineResult<()> {
        self.push(Event::WaitIdle);
        for fence in self.state.borrow_mut().fences.values_mut() {
            if *fence == FenceState::Pending {
                *fence = FenceState::Signaled;
            }
        }
        Ok(())
    }

    fn recreate_surface(&mut self, window_extent: vk::Extent2D) -> EngineResult<SurfaceChanges> {
        self.push(Event::RecreateSurface);
        self.last_window_extent = Some(window_extent);
        let next = self.recreations.pop_front().unwrap_or(self.surface);
        let changes = SurfaceChanges::between(&self.surface, &next);
        self.surface = next;
        self.next_image = 0;
        Ok(changes)
    }

    fn create_render_pass(&self, _color_format: vk::Format) -> EngineResult<Self::RenderPass> {
        Ok(self.object())
    }

    fn create_depth_buffer(&self, _extent: vk::Extent2D) -> EngineResult<Self::DepthBuffer> {
        Ok(self.object())
    }

    fn create_framebuffers(
        &self,
        _render_pass: &Self::RenderPass,
        _depth_buffer: &Self::DepthBuffer,
    ) -> EngineResult<Vec<Self::Framebuffer>> {
        Ok((0..self.surface.image_count).map(|_| self.object()).collect())
    }

    fn create_pipeline(
        &self,
        _render_pass: &Self::RenderPass,
        _variant: PipelineVariant,
        _extent: vk::Extent2D,
    ) -> EngineResult<Self::Pipeline> {
        Ok(self.object())
    }
}

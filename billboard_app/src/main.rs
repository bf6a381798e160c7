//! Billboard demo application
//!
//! Renders a textured ground strip with an alpha-blended sprite standing on
//! it. Resize the window to exercise surface recreation; Escape or closing
//! the window exits.
//!
//! Usage: `billboard [config.toml|config.ron]`

use std::sync::Arc;

use billboard_engine::foundation::logging;
use billboard_engine::prelude::*;

// Field order is drop order: the driver drains the device before the scene
// buffers go, and the window outlives the surface created from it.
struct BillboardApp {
    driver: FrameDriver<VulkanBackend>,
    _scene: SceneResources,
    window: Window,
}

impl BillboardApp {
    fn new(config: &RendererConfig) -> EngineResult<Self> {
        log::info!("Creating window...");
        let mut window = Window::new(&config.window.title, config.window.width, config.window.height)?;

        log::info!("Creating Vulkan context...");
        let context = Arc::new(VulkanContext::new(
            &mut window,
            &config.window.title,
            config.enable_validation,
        )?);

        let backend = VulkanBackend::new(Arc::clone(&context), &config.assets, window.framebuffer_extent())?;
        let scene = SceneResources::load(context, &backend, &config.assets)?;
        let driver = FrameDriver::new(
            backend,
            scene.bindings(),
            FrameSettings::from(config),
            window.framebuffer_extent(),
        )?;

        Ok(Self {
            driver,
            _scene: scene,
            window,
        })
    }

    fn run(&mut self) -> EngineResult<()> {
        log::info!("Entering render loop");
        loop {
            let input = self.window.poll_input();
            match self.driver.run_iteration(&input)? {
                FrameOutcome::CloseRequested => break,
                FrameOutcome::Minimized => self.window.wait_events(),
                FrameOutcome::Presented { .. } | FrameOutcome::SkippedStaleSurface => {}
            }
        }

        self.driver.wait_idle()?;
        let stats = self.driver.stats();
        log::info!(
            "Exiting: {} frames presented, {} skipped, {} surface recreations",
            stats.frames_presented,
            stats.frames_skipped,
            stats.recreations
        );
        Ok(())
    }
}

fn load_config() -> EngineResult<RendererConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {}", path);
            Ok(RendererConfig::load_from_file(path)?)
        }
        None => Ok(RendererConfig::default()),
    }
}

fn run() -> EngineResult<()> {
    let config = load_config()?;
    let mut app = BillboardApp::new(&config)?;
    app.run()
}

fn main() {
    logging::init();
    log::info!("Starting billboard demo");

    if let Err(e) = run() {
        log::error!("Fatal error: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

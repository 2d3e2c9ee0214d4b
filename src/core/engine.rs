//! Core Engine struct and main render loop

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{CursorGrabMode, Window, WindowId},
};

use crate::core::Time;
use crate::core::debug::DebugInfo;
use crate::input::Input;
use crate::renderer::{Renderer, RendererError};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Enable VSync
    pub vsync: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: String::from("PBR Demo"),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

impl EngineConfig {
    /// Set the window title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set window dimensions
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable VSync
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }
}

/// Errors that stop the engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Renderer(#[from] RendererError),
    #[error("game initialization failed: {0:#}")]
    Init(anyhow::Error),
}

/// Game trait that demos implement
pub trait Game: 'static {
    /// Called once after the window and renderer exist
    fn init(&mut self, engine: &mut EngineContext) -> anyhow::Result<()>;

    /// Called every frame for game logic updates
    fn update(&mut self, engine: &mut EngineContext);

    /// Called every frame for rendering
    fn render(&mut self, engine: &mut EngineContext);

    /// Called when the window is resized
    fn on_resize(&mut self, _engine: &mut EngineContext, _width: u32, _height: u32) {}

    /// Called when the game is shutting down
    fn shutdown(&mut self, _engine: &mut EngineContext) {}
}

/// Context passed to game callbacks
pub struct EngineContext {
    /// Time tracking
    pub time: Time,
    /// Input state
    pub input: Input,
    /// Scene objects
    pub world: hecs::World,
    /// Frame statistics
    pub debug: DebugInfo,
    renderer: Renderer,
    window_size: PhysicalSize<u32>,
    should_quit: bool,
    cursor_request: Option<bool>,
}

impl EngineContext {
    fn new(renderer: Renderer, window_size: PhysicalSize<u32>) -> Self {
        Self {
            time: Time::new(),
            input: Input::new(),
            world: hecs::World::new(),
            debug: DebugInfo::new(),
            renderer,
            window_size,
            should_quit: false,
            cursor_request: None,
        }
    }

    /// Get the renderer
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Get the renderer mutably
    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    /// Get window width
    pub fn width(&self) -> u32 {
        self.window_size.width
    }

    /// Get window height
    pub fn height(&self) -> u32 {
        self.window_size.height
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Check if engine should quit
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Grab and hide the cursor (`true`) or release it (`false`).
    ///
    /// Applied to the window at the end of the current update.
    pub fn set_cursor_captured(&mut self, captured: bool) {
        self.cursor_request = Some(captured);
    }

    fn take_cursor_request(&mut self) -> Option<bool> {
        self.cursor_request.take()
    }
}

/// Main engine struct
pub struct Engine<G: Game> {
    config: EngineConfig,
    game: G,
    context: Option<EngineContext>,
    window: Option<Arc<Window>>,
    error: Option<EngineError>,
}

impl<G: Game> Engine<G> {
    /// Create a new engine with the given game
    pub fn new(config: EngineConfig, game: G) -> Self {
        Self {
            config,
            game,
            context: None,
            window: None,
            error: None,
        }
    }

    /// Run the engine until the window closes.
    ///
    /// # Errors
    ///
    /// Returns the first error that stopped the loop: event loop, window or
    /// renderer creation, or game initialisation.
    pub fn run(mut self) -> Result<(), EngineError> {
        // A logger installed by the caller wins
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init();
        log::info!("Starting engine: {}", self.config.title);

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;

        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<(), EngineError> {
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let renderer = pollster::block_on(Renderer::new(Arc::clone(&window), self.config.vsync))?;

        let mut context = EngineContext::new(renderer, window.inner_size());
        self.game.init(&mut context).map_err(EngineError::Init)?;

        if let Some(captured) = context.take_cursor_request() {
            apply_cursor_capture(&window, captured);
        }

        self.context = Some(context);
        self.window = Some(window);
        log::info!("Engine initialized successfully");
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(context) = self.context.as_mut() {
            self.game.shutdown(context);
        }
        event_loop.exit();
    }
}

impl<G: Game> ApplicationHandler for Engine<G> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(error) = self.initialize(event_loop) {
            log::error!("{error}");
            self.error = Some(error);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if matches!(event, WindowEvent::CloseRequested) {
            log::info!("Close requested, shutting down");
            self.shutdown(event_loop);
            return;
        }

        let Some(context) = self.context.as_mut() else {
            return;
        };

        match event {
            WindowEvent::Resized(new_size) => {
                if new_size.width > 0 && new_size.height > 0 {
                    context.window_size = new_size;
                    context.renderer.resize(new_size.width, new_size.height);
                    self.game
                        .on_resize(context, new_size.width, new_size.height);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let winit::keyboard::PhysicalKey::Code(key_code) = event.physical_key {
                    context.input.process_keyboard(key_code, event.state);
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                context.input.process_mouse_button(button, state);
            }

            WindowEvent::CursorMoved { position, .. } => {
                context
                    .input
                    .process_mouse_motion(glam::Vec2::new(position.x as f32, position.y as f32));
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    winit::event::MouseScrollDelta::LineDelta(x, y) => glam::Vec2::new(x, y),
                    winit::event::MouseScrollDelta::PixelDelta(pos) => {
                        glam::Vec2::new(pos.x as f32, pos.y as f32)
                    }
                };
                context.input.process_scroll(scroll);
            }

            WindowEvent::RedrawRequested => {
                context.time.update();
                context.debug.record_frame(context.time.delta());

                self.game.update(context);

                if let (Some(captured), Some(window)) =
                    (context.take_cursor_request(), &self.window)
                {
                    apply_cursor_capture(window, captured);
                }

                if context.should_quit() {
                    self.shutdown(event_loop);
                    return;
                }

                self.game.render(context);

                // Clear per-frame input state
                context.input.update();

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let (DeviceEvent::MouseMotion { delta }, Some(context)) = (event, self.context.as_mut())
        {
            context
                .input
                .process_mouse_delta(glam::Vec2::new(delta.0 as f32, delta.1 as f32));
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn apply_cursor_capture(window: &Window, captured: bool) {
    let result = if captured {
        window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
    } else {
        window.set_cursor_grab(CursorGrabMode::None)
    };

    if let Err(e) = result {
        log::warn!("Cursor grab change failed: {e}");
    }
    window.set_cursor_visible(!captured);
}

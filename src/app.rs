use std::num::NonZeroU32;

use winit::application::ApplicationHandler;
use winit::error::EventLoopError;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::geometry::Mesh;
use crate::render::mode::RenderMode;
use crate::resource::shader::ShaderBinaryLoader;
use crate::view::ViewSystem;

const WINDOW_TITLE: &str = "meshlet_viewer";

pub struct App {
    event_loop_proxy: EventLoopProxy<UserEvent>,
    mesh: Mesh,
    shader_loader: Box<dyn ShaderBinaryLoader>,
    meshlet_group_size: NonZeroU32,
    requested_mode: Option<RenderMode>,
    render_mode: RenderMode,
    view_system: Option<ViewSystem>,
    initialized: bool,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(
        event_loop: &EventLoop<UserEvent>,
        mesh: Mesh,
        shader_loader: Box<dyn ShaderBinaryLoader>,
        meshlet_group_size: NonZeroU32,
        requested_mode: Option<RenderMode>,
    ) -> Self {
        App {
            event_loop_proxy: event_loop.create_proxy(),
            mesh,
            shader_loader,
            meshlet_group_size,
            requested_mode,
            render_mode: RenderMode::Indexed,
            view_system: None,
            initialized: false,
            error: None,
        }
    }

    pub fn create_event_loop() -> Result<EventLoop<UserEvent>, EventLoopError> {
        EventLoop::<UserEvent>::with_user_event().build()
    }

    /// The fatal error that stopped the event loop, if any.
    pub fn into_result(self) -> anyhow::Result<()> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        self.error = Some(error);
        event_loop.exit();
    }

    async fn initialize_view_system(
        event_loop_proxy: EventLoopProxy<UserEvent>,
        window: Window,
        mesh: &Mesh,
        shader_loader: &dyn ShaderBinaryLoader,
        meshlet_group_size: NonZeroU32,
    ) {
        let event = match ViewSystem::from_window(window, mesh, shader_loader, meshlet_group_size)
            .await
        {
            Ok(view_system) => UserEvent::ViewSystemReady(view_system),
            Err(error) => UserEvent::ViewSystemFailed(error),
        };

        if event_loop_proxy.send_event(event).is_err() {
            log::error!("The event loop closed before the view system was ready");
        }
    }

    fn toggle_render_mode(&mut self) {
        let view_system = match &self.view_system {
            Some(view_system) => view_system,
            None => return,
        };

        let render_mode = self
            .render_mode
            .toggled(view_system.render_system.supports_meshlets());

        if render_mode == self.render_mode {
            log::warn!("Meshlet rendering is not supported by the adapter");
            return;
        }

        log::info!("Switched to {render_mode} rendering");
        self.render_mode = render_mode;
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let view_system = match &mut self.view_system {
            Some(view_system) => view_system,
            None => return,
        };

        let error = match view_system.update_view(self.render_mode) {
            Ok(_) => None,
            Err(error) => match error.downcast_ref::<wgpu::SurfaceError>() {
                Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    view_system.render_system.sync_view_dimensions();
                    None
                }
                Some(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("OutOfMemory");
                    Some(error)
                }
                Some(wgpu::SurfaceError::Timeout) => {
                    log::warn!("Surface timeout");
                    None
                }
                None => Some(error),
            },
        };

        view_system.window.request_redraw();

        if let Some(error) = error {
            self.fail(event_loop, error);
        }
    }
}

impl ApplicationHandler<UserEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        log::info!("Application resumed");

        if self.initialized {
            return;
        }
        self.initialized = true;

        let window = match event_loop
            .create_window(Window::default_attributes().with_title(WINDOW_TITLE))
        {
            Ok(window) => window,
            Err(error) => {
                self.fail(event_loop, error.into());
                return;
            }
        };

        pollster::block_on(App::initialize_view_system(
            self.event_loop_proxy.clone(),
            window,
            &self.mesh,
            self.shader_loader.as_ref(),
            self.meshlet_group_size,
        ));
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let view_system = match &mut self.view_system {
            Some(view_system) => view_system,
            None => return,
        };

        if view_system.window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::KeyR),
                        repeat: false,
                        ..
                    },
                ..
            } => self.toggle_render_mode(),
            WindowEvent::Resized(new_size) => {
                view_system.render_system.set_view_dimensions(new_size)
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: UserEvent) {
        let view_system = match event {
            UserEvent::ViewSystemReady(view_system) => view_system,
            UserEvent::ViewSystemFailed(error) => {
                self.fail(event_loop, error);
                return;
            }
        };

        log::info!("View system created");

        self.render_mode = RenderMode::initial(
            self.requested_mode,
            view_system.render_system.supports_meshlets(),
        );
        log::info!("Rendering in {} mode", self.render_mode);

        view_system.window.request_redraw();
        self.view_system = Some(view_system);
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(view_system) = &self.view_system {
            view_system.render_system.wait_idle();
        }

        log::info!("Application exiting");
    }
}

pub enum UserEvent {
    ViewSystemReady(ViewSystem),
    ViewSystemFailed(anyhow::Error),
}

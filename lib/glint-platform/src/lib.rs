use std::{
    ffi::CString,
    num::NonZeroU32,
    path::PathBuf,
    time::{Duration, Instant},
};

use eyre::{eyre, Context, Result};
use glint_gl::{gl, GlContext};
use glutin::{
    config::{Api, Config, ConfigTemplateBuilder},
    context::{ContextApi, ContextAttributesBuilder, GlProfile, Version},
    display::GetGlDisplay,
    prelude::*,
    surface::{SurfaceAttributesBuilder, WindowSurface},
};
use glutin_winit::DisplayBuilder;
use raw_window_handle::HasRawWindowHandle;
pub use winit::dpi::{LogicalSize, PhysicalSize};
use winit::{
    event::{Event, KeyboardInput, StartCause, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoopBuilder},
    window::WindowBuilder,
};

pub mod tracing_hook;

const FRAME_TIME: Duration = Duration::from_nanos(16_666_667);

#[derive(Debug, Clone)]
pub struct WindowDesc {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// JSON log written next to the console output; `GLINT_LOG_FILE` overrides it.
    pub log_file: Option<PathBuf>,
}

impl Default for WindowDesc {
    fn default() -> Self {
        Self {
            title: "glint".to_string(),
            width: 800,
            height: 600,
            log_file: Some(PathBuf::from(tracing_hook::LOG_FILE)),
        }
    }
}

impl WindowDesc {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_log_file(mut self, log_file: Option<impl Into<PathBuf>>) -> Self {
        self.log_file = log_file.map(Into::into);
        self
    }
}

#[derive(Debug)]
pub struct RenderContext<'flow> {
    pub elapsed: Duration,
    pub dt: Duration,
    control_flow: &'flow mut ControlFlow,
}

impl<'flow> RenderContext<'flow> {
    pub fn quit(&mut self) {
        self.control_flow.set_exit();
    }
}

/// An application driven by [`run`]. Every method is called on the thread owning the GL context, with
/// the context current.
pub trait Application: Sized {
    fn new(size: PhysicalSize<f32>, gc: &GlContext) -> Result<Self>;
    fn resize(&mut self, _size: PhysicalSize<u32>) -> Result<()> {
        Ok(())
    }
    fn render(&mut self, ctx: RenderContext) -> Result<()>;
}

fn is_suitable(config: &Config) -> bool {
    config.api().contains(Api::OPENGL) && config.depth_size() >= 24
}

/// First configuration accepted by `suitable`, otherwise the first one offered.
fn pick_config<C>(configs: impl Iterator<Item = C>, suitable: impl Fn(&C) -> bool) -> Option<C> {
    let mut fallback = None;
    for config in configs {
        if suitable(&config) {
            return Some(config);
        }
        fallback.get_or_insert(config);
    }
    fallback
}

fn surface_size(size: PhysicalSize<u32>) -> Option<(NonZeroU32, NonZeroU32)> {
    Some((NonZeroU32::new(size.width)?, NonZeroU32::new(size.height)?))
}

fn log_driver_strings(gc: &GlContext) {
    let get = |name| {
        gc.get_string(name)
            .unwrap_or_else(|_| "<None>".to_string())
    };
    tracing::info!(
        target: "gl",
        version=%get(gl::VERSION),
        vendor=%get(gl::VENDOR),
        renderer=%get(gl::RENDERER),
        shading_language=%get(gl::SHADING_LANGUAGE_VERSION),
    );
}

/// Opens the window, creates an OpenGL 3.3 core context and runs `App` until the window closes.
///
/// The application is dropped when the event loop is torn down, with the context still current, so GPU
/// resources it owns are released against a live context.
pub fn run<App: 'static + Application>(desc: WindowDesc) -> Result<()> {
    let log_file = tracing_hook::log_file_from_env(desc.log_file.as_deref());
    tracing_hook::enable(log_file.as_deref())?;

    let event_loop = EventLoopBuilder::new().build();
    let template = ConfigTemplateBuilder::new()
        .with_api(Api::OPENGL)
        .with_depth_size(24);
    let display_builder = DisplayBuilder::new().with_window_builder(Some(
        WindowBuilder::new()
            .with_title(&desc.title)
            .with_inner_size(PhysicalSize::new(desc.width, desc.height)),
    ));

    let (window, gl_config) = display_builder
        .build(&event_loop, template, |configs| {
            let configs = configs.inspect(|config| tracing::debug!(message="Potential config", api=?config.api(), depth_size=%config.depth_size()));
            // glutin fails the build itself when no configuration matches the template at all.
            pick_config(configs, is_suitable).expect("glutin offered an empty configuration list")
        })
        .map_err(|err| eyre!("Cannot create OpenGL configuration & window: {}", err))?;
    if !is_suitable(&gl_config) {
        return Err(eyre!(
            "No OpenGL configuration with a 24-bit depth buffer (best offered: api {:?}, depth {})",
            gl_config.api(),
            gl_config.depth_size()
        ));
    }
    let window = window.ok_or_else(|| eyre!("No window despite configuration"))?;
    tracing::debug!(message="Using config", api=?gl_config.api(), depth_size=%gl_config.depth_size());

    let gl_display = gl_config.display();
    let context_attributes = ContextAttributesBuilder::new()
        .with_debug(cfg!(debug_assertions))
        .with_profile(GlProfile::Core)
        .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
        .build(Some(window.raw_window_handle()));
    let not_current_gl_context = unsafe {
        gl_display
            .create_context(&gl_config, &context_attributes)
            .context("Cannot create OpenGL display context")?
    };

    let inner_size = window.inner_size();
    let (width, height) =
        surface_size(inner_size).ok_or_else(|| eyre!("Window has an empty client area"))?;
    let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        window.raw_window_handle(),
        width,
        height,
    );
    let gl_surface = unsafe {
        gl_display
            .create_window_surface(&gl_config, &attrs)
            .context("Cannot create window surface")?
    };
    let context = not_current_gl_context
        .make_current(&gl_surface)
        .context("Cannot make OpenGL context current")?;

    let mut load_error = None;
    let gc = GlContext::load_with(|sym| match CString::new(sym) {
        Ok(sym) => gl_display.get_proc_address(sym.as_c_str()).cast(),
        Err(err) => {
            load_error.get_or_insert(err);
            std::ptr::null()
        }
    });
    if let Some(err) = load_error {
        return Err(eyre::Report::new(err).wrap_err("Invalid OpenGL symbol name"));
    }
    glint_gl::debug::hook_gl_to_tracing(&gc);
    log_driver_strings(&gc);

    let mut app = Some(App::new(inner_size.cast(), &gc).context("Cannot run app")?);

    let start = Instant::now();
    let mut last_frame_time = Instant::now();
    let mut next_frame_time = Instant::now() + FRAME_TIME;
    event_loop.run(move |event, _, control_flow| {
        control_flow.set_wait_until(next_frame_time);

        match event {
            Event::RedrawRequested(_) => {
                let Some(app) = app.as_mut() else { return };
                let _span = tracing::trace_span!("frame").entered();
                let frame_start = Instant::now();
                let result = app.render(RenderContext {
                    elapsed: start.elapsed(),
                    dt: last_frame_time.elapsed(),
                    control_flow: &mut *control_flow,
                });
                if let Err(err) = result {
                    tracing::error!("Frame failed: {:?}", err);
                    control_flow.set_exit();
                    return;
                }
                if let Err(err) = gl_surface.swap_buffers(&context) {
                    tracing::error!("Cannot swap buffers: {}", err);
                    control_flow.set_exit();
                    return;
                }
                let frame_time = frame_start.elapsed().as_secs_f32();
                tracing::debug!(%frame_time);
                next_frame_time = frame_start + FRAME_TIME;
                last_frame_time = Instant::now();
            }
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested
                | WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            virtual_keycode: Some(VirtualKeyCode::Escape),
                            ..
                        },
                    ..
                } => control_flow.set_exit(),
                WindowEvent::Resized(new_size) => {
                    let Some((width, height)) = surface_size(new_size) else {
                        return;
                    };
                    gl_surface.resize(&context, width, height);
                    unsafe {
                        gc.raw()
                            .Viewport(0, 0, new_size.width as _, new_size.height as _)
                    };
                    if let Some(app) = app.as_mut() {
                        if let Err(err) = app.resize(new_size) {
                            tracing::error!("Resize failed: {:?}", err);
                            control_flow.set_exit();
                            return;
                        }
                    }
                    window.request_redraw();
                }
                _ => {}
            },
            Event::NewEvents(StartCause::ResumeTimeReached { .. }) => window.request_redraw(),
            Event::LoopDestroyed => {
                drop(app.take());
                tracing::debug!("Application released");
            }
            _ => {}
        }
    });
}

//! Transmission console - press play, listen to the static

use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use transmission_console::audio::{AudioBackend, CpalBackend, OfflineBackend};
use transmission_console::cli::Args;
use transmission_console::params::audio_constants::OFFLINE_SAMPLE_RATE_HZ;
use transmission_console::params::RenderConfig;
use transmission_console::rendering::Presenter;
use transmission_console::surface::{DrawingSurface, Framebuffer};
use transmission_console::telemetry::ConsoleView;
use transmission_console::{ConsoleError, RenderError, TransmissionConsole};

type Console = TransmissionConsole<Box<dyn AudioBackend>>;

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    presenter: Option<Presenter>,
    frame: Framebuffer,

    console: Console,

    // Configuration
    render_config: RenderConfig,

    // Time tracking
    start_time: Instant,
    last_frame_ms: u64,
    title: String,

    /// Fatal error raised inside the event loop
    error: Option<ConsoleError>,
}

impl App {
    fn new(console: Console, render_config: RenderConfig) -> Result<Self, ConsoleError> {
        let frame = blank_frame(&console, &render_config)?;
        Ok(Self {
            window: None,
            presenter: None,
            frame,
            console,
            render_config,
            start_time: Instant::now(),
            last_frame_ms: 0,
            title: String::new(),
            error: None,
        })
    }

    fn init_window(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
    ) -> Result<(), ConsoleError> {
        let window_attributes = Window::default_attributes()
            .with_title("Transmission Console")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width(),
                self.render_config.window_height(),
            ));

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .map_err(|e| RenderError::Window(e.to_string()))?,
        );

        let presenter = pollster::block_on(Presenter::new(
            Arc::clone(&window),
            self.render_config.surface_width,
            self.render_config.surface_height,
        ))?;
        presenter.upload(&self.frame)?;

        println!("\nTransmission console is running!");
        println!("Space / Enter / click toggles the transmission, ESC quits\n");
        print!("{}", self.view());

        self.window = Some(window);
        self.presenter = Some(presenter);
        Ok(())
    }

    fn view(&self) -> ConsoleView {
        panel(&self.console)
    }

    fn toggle(&mut self) {
        let now_ms = self.elapsed_ms();
        self.console.advance_to(now_ms);
        match self.console.toggle() {
            Ok(state) => log::debug!("Console is now {:?}", state),
            Err(e) => log::error!("Transmission failed to start: {}", e),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    fn fail(&mut self, event_loop: &winit::event_loop::ActiveEventLoop, error: ConsoleError) {
        log::error!("{}", error);
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        if let Err(e) = self.init_window(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => match code {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::Space | KeyCode::Enter => self.toggle(),
                _ => {}
            },
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.toggle(),
            WindowEvent::Resized(size) => {
                if let Some(presenter) = self.presenter.as_mut() {
                    presenter.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render_frame() {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }
}

impl App {
    /// Advance the console to wall-clock time and present one frame
    fn render_frame(&mut self) -> Result<(), ConsoleError> {
        let now_ms = self.elapsed_ms();
        self.console.advance_to(now_ms);

        // No-op on device streams; offline (--mute) graphs render here
        let elapsed_frames =
            now_ms.saturating_sub(self.last_frame_ms) as f32 * OFFLINE_SAMPLE_RATE_HZ / 1000.0;
        self.console.pump_audio(elapsed_frames.round() as usize);
        self.last_frame_ms = now_ms;

        let Some(presenter) = self.presenter.as_ref() else {
            return Ok(());
        };

        if self.console.on_animation_frame(Some(&mut self.frame)) {
            presenter.upload(&self.frame)?;
        }
        presenter.render()?;

        let title = self.view().title();
        if title != self.title {
            if let Some(window) = &self.window {
                window.set_title(&title);
            }
            log::info!("{}", title);
            self.title = title;
        }
        Ok(())
    }
}

/// Surface-sized frame cleared to the console background
fn blank_frame(
    console: &Console,
    render_config: &RenderConfig,
) -> Result<Framebuffer, ConsoleError> {
    let mut frame = Framebuffer::new(render_config.surface_width, render_config.surface_height)?;
    let (width, height) = (frame.width() as f32, frame.height() as f32);
    let background = console.visualizer().config().background;
    frame.fill_rect(0.0, 0.0, width, height, background);
    Ok(frame)
}

fn panel(console: &Console) -> ConsoleView {
    ConsoleView::new(
        console.state(),
        console.signal_strength(),
        chrono::Utc::now(),
    )
}

/// One transmission on a simulated clock, no window
fn run_headless(args: &Args, mut console: Console) -> Result<(), ConsoleError> {
    let render_config = args.render_config();
    let mut frame = blank_frame(&console, &render_config)?;
    let frame_duration = Duration::from_secs_f64(1.0 / args.fps as f64);
    let audio_frames_per_frame = (OFFLINE_SAMPLE_RATE_HZ / args.fps as f32).round() as usize;

    console.start()?;
    print!("{}", panel(&console));

    let mut drawn = 0usize;
    let mut last_strength = console.signal_strength();
    for index in 0u64.. {
        let now_ms = index * 1000 / args.fps as u64;
        if now_ms > args.duration_ms {
            break;
        }

        console.advance_to(now_ms);
        console.pump_audio(audio_frames_per_frame);
        if console.on_animation_frame(Some(&mut frame)) {
            drawn += 1;
        }

        if console.signal_strength() != last_strength {
            last_strength = console.signal_strength();
            log::debug!("[{:>6}ms] Signal: {}%", now_ms, last_strength);
        }

        // Device playback runs on the wall clock
        if !args.mute {
            std::thread::sleep(frame_duration);
        }
    }

    log::info!("Headless run finished: {} frames drawn", drawn);
    print!("{}", panel(&console));

    if let Some(path) = &args.snapshot {
        frame.save_png(path)?;
        println!("Saved snapshot to {}", path.display());
    }
    Ok(())
}

fn run_windowed(args: &Args, console: Console) -> Result<(), ConsoleError> {
    let mut app = App::new(console, args.render_config())?;
    let event_loop = EventLoop::new().map_err(|e| RenderError::Window(e.to_string()))?;
    event_loop
        .run_app(&mut app)
        .map_err(|e| RenderError::Window(e.to_string()))?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn run(args: Args) -> Result<(), ConsoleError> {
    args.validate()?;

    let backend: Box<dyn AudioBackend> = if args.mute {
        Box::new(OfflineBackend::new(OFFLINE_SAMPLE_RATE_HZ))
    } else {
        Box::new(CpalBackend::new())
    };
    let console = TransmissionConsole::with_config(backend, args.console_config())?;

    if args.headless {
        run_headless(&args, console)
    } else {
        run_windowed(&args, console)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

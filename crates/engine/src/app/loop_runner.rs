use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use super::metrics::MetricsAccumulator;
use super::scene::SceneHost;
use super::{InputEvent, Key, PointerPosition, Renderer, Scene, SceneCommand};

pub const MAX_FPS_ENV_VAR: &str = "STAY_STILL_MAX_FPS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub metrics_log_interval: Duration,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Stay Still".to_string(),
            window_width: 960,
            window_height: 640,
            metrics_log_interval: Duration::from_secs(5),
            max_render_fps: Some(60),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;

    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(5));
    let effective_render_cap = normalize_render_fps_cap(resolve_render_fps_cap(config.max_render_fps));
    let render_frame_target = target_frame_duration(effective_render_cap);
    info!(
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    let mut host = SceneHost::new(scene);
    let startup = Instant::now();
    host.load(startup);
    info!("scene_loaded");

    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval, startup);
    let mut last_frame_instant = startup;
    let mut last_present_instant = startup;
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                    window.request_redraw();
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                    window.request_redraw();
                }
                WindowEvent::RedrawRequested => {
                    // Single authoritative FPS cap sleep point for render pacing.
                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    let now = Instant::now();
                    let frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    if let Err(error) = renderer.render_with(|canvas| host.render(canvas, now)) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();
                    metrics_accumulator.record_frame(frame_dt);

                    let next_title = host.title();
                    if next_title != last_applied_title {
                        match &next_title {
                            Some(title) => window.set_title(title),
                            None => window.set_title(&config.window_title),
                        }
                        last_applied_title = next_title;
                    }
                }
                other => {
                    let Some(input) = translate_window_event(&other) else {
                        return;
                    };
                    metrics_accumulator.record_input_event();
                    debug!(kind = input.kind(), "input_event");
                    if host.handle_input(input, Instant::now()) == SceneCommand::Quit {
                        info!(reason = "scene_quit", "shutdown_requested");
                        window_target.exit();
                    }
                }
            },
            Event::AboutToWait => {
                let now = Instant::now();
                metrics_accumulator.record_wakeup();
                if host.update(now) == SceneCommand::Quit {
                    info!(reason = "scene_quit", "shutdown_requested");
                    window_target.exit();
                    return;
                }

                if host.take_redraw_request() {
                    window.request_redraw();
                }
                window_target.set_control_flow(plan_control_flow(
                    host.wants_continuous_frames(),
                    host.next_deadline(),
                ));

                if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                    info!(
                        fps = snapshot.fps,
                        wakeups_per_second = snapshot.wakeups_per_second,
                        input_events_per_second = snapshot.input_events_per_second,
                        frame_time_ms = snapshot.frame_time_ms,
                        worst_frame_time_ms = snapshot.worst_frame_time_ms,
                        "loop_metrics"
                    );
                }
            }
            Event::LoopExiting => {
                host.shutdown();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Maps a window message onto the backend-independent input vocabulary.
/// Messages with no input meaning map to `None`, as do synthetic key presses
/// replayed on focus gain and OS auto-repeat of a held key. A held key has
/// already been reported once, when it went down.
fn translate_window_event(event: &WindowEvent) -> Option<InputEvent> {
    match event {
        WindowEvent::CursorMoved { position, .. } => Some(InputEvent::PointerMoved(
            PointerPosition::new(position.x as f32, position.y as f32),
        )),
        WindowEvent::CursorLeft { .. } => Some(InputEvent::PointerLeft),
        WindowEvent::MouseInput {
            state: ElementState::Pressed,
            ..
        } => Some(InputEvent::PointerPressed),
        WindowEvent::MouseWheel { .. } => Some(InputEvent::Scrolled),
        WindowEvent::KeyboardInput {
            event,
            is_synthetic: false,
            ..
        } if is_fresh_press(event.state, event.repeat) => {
            let key = key_from_parts(event.physical_key, event.text.as_deref());
            Some(InputEvent::KeyPressed(key))
        }
        WindowEvent::Focused(focused) => Some(InputEvent::FocusChanged { focused: *focused }),
        WindowEvent::Occluded(occluded) => {
            Some(InputEvent::VisibilityChanged { hidden: *occluded })
        }
        _ => None,
    }
}

fn is_fresh_press(state: ElementState, repeat: bool) -> bool {
    state == ElementState::Pressed && !repeat
}

fn key_from_parts(physical_key: PhysicalKey, text: Option<&str>) -> Key {
    match physical_key {
        PhysicalKey::Code(KeyCode::Space) => Key::Space,
        PhysicalKey::Code(KeyCode::Enter) | PhysicalKey::Code(KeyCode::NumpadEnter) => Key::Enter,
        PhysicalKey::Code(KeyCode::Backspace) => Key::Backspace,
        PhysicalKey::Code(KeyCode::Escape) => Key::Escape,
        PhysicalKey::Code(KeyCode::Tab) => Key::Tab,
        _ => single_printable_char(text).map_or(Key::Other, Key::Character),
    }
}

fn single_printable_char(text: Option<&str>) -> Option<char> {
    let mut chars = text?.chars();
    let ch = chars.next()?;
    if chars.next().is_some() || ch.is_control() {
        return None;
    }
    Some(ch)
}

fn plan_control_flow(continuous_frames: bool, next_deadline: Option<Instant>) -> ControlFlow {
    if continuous_frames {
        return ControlFlow::Poll;
    }
    match next_deadline {
        Some(deadline) => ControlFlow::WaitUntil(deadline),
        None => ControlFlow::Wait,
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

fn resolve_render_fps_cap(config_cap: Option<u32>) -> Option<u32> {
    match env::var(MAX_FPS_ENV_VAR) {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(fps) => Some(fps),
            Err(_) => {
                warn!(
                    env_var = MAX_FPS_ENV_VAR,
                    value = value.as_str(),
                    "invalid fps cap env var value; falling back to config"
                );
                config_cap
            }
        },
        Err(env::VarError::NotPresent) => config_cap,
        Err(err) => {
            warn!(
                env_var = MAX_FPS_ENV_VAR,
                error = %err,
                "unable to read fps cap env var; falling back to config"
            );
            config_cap
        }
    }
}

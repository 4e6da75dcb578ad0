use std::time::Instant;

use super::input::InputEvent;
use super::rendering::Canvas;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

/// A single screen driven by the loop runner.
///
/// All methods receive the loop's notion of "now" so scenes never read the
/// clock themselves. Input arrives in window-message order, before the
/// per-iteration `update` call.
pub trait Scene {
    fn load(&mut self, now: Instant);
    fn handle_input(&mut self, event: InputEvent, now: Instant) -> SceneCommand;
    fn update(&mut self, now: Instant) -> SceneCommand;
    fn render(&mut self, canvas: &mut Canvas<'_>, now: Instant);
    fn unload(&mut self);
    /// When true the loop redraws every iteration; otherwise it only redraws
    /// after input or a scene deadline.
    fn wants_continuous_frames(&self) -> bool {
        false
    }
    /// Earliest instant at which `update` has work to do.
    fn next_deadline(&self) -> Option<Instant> {
        None
    }
    fn title(&self) -> Option<String> {
        None
    }
}

pub(crate) struct SceneHost {
    scene: Box<dyn Scene>,
    is_loaded: bool,
    redraw_requested: bool,
}

impl SceneHost {
    pub(crate) fn new(scene: Box<dyn Scene>) -> Self {
        Self {
            scene,
            is_loaded: false,
            redraw_requested: true,
        }
    }

    pub(crate) fn load(&mut self, now: Instant) {
        if self.is_loaded {
            return;
        }
        self.scene.load(now);
        self.is_loaded = true;
        self.redraw_requested = true;
    }

    pub(crate) fn handle_input(&mut self, event: InputEvent, now: Instant) -> SceneCommand {
        if !self.is_loaded {
            return SceneCommand::None;
        }
        self.redraw_requested = true;
        self.scene.handle_input(event, now)
    }

    pub(crate) fn update(&mut self, now: Instant) -> SceneCommand {
        if !self.is_loaded {
            return SceneCommand::None;
        }
        if self
            .scene
            .next_deadline()
            .is_some_and(|deadline| deadline <= now)
        {
            self.redraw_requested = true;
        }
        self.scene.update(now)
    }

    pub(crate) fn render(&mut self, canvas: &mut Canvas<'_>, now: Instant) {
        self.redraw_requested = false;
        self.scene.render(canvas, now);
    }

    pub(crate) fn take_redraw_request(&mut self) -> bool {
        let requested = self.redraw_requested || self.scene.wants_continuous_frames();
        self.redraw_requested = false;
        requested
    }

    pub(crate) fn wants_continuous_frames(&self) -> bool {
        self.is_loaded && self.scene.wants_continuous_frames()
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        if !self.is_loaded {
            return None;
        }
        self.scene.next_deadline()
    }

    pub(crate) fn title(&self) -> Option<String> {
        self.scene.title()
    }

    pub(crate) fn shutdown(&mut self) {
        if self.is_loaded {
            self.scene.unload();
            self.is_loaded = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct RecordingScene {
        loads: Rc<Cell<u32>>,
        unloads: Rc<Cell<u32>>,
        inputs: Vec<InputEvent>,
        continuous: bool,
        deadline: Option<Instant>,
    }

    impl Scene for RecordingScene {
        fn load(&mut self, _now: Instant) {
            self.loads.set(self.loads.get() + 1);
        }

        fn handle_input(&mut self, event: InputEvent, _now: Instant) -> SceneCommand {
            self.inputs.push(event);
            SceneCommand::None
        }

        fn update(&mut self, _now: Instant) -> SceneCommand {
            SceneCommand::None
        }

        fn render(&mut self, _canvas: &mut Canvas<'_>, _now: Instant) {}

        fn unload(&mut self) {
            self.unloads.set(self.unloads.get() + 1);
        }

        fn wants_continuous_frames(&self) -> bool {
            self.continuous
        }

        fn next_deadline(&self) -> Option<Instant> {
            self.deadline
        }
    }

    #[test]
    fn load_is_idempotent_and_shutdown_unloads_once() {
        let scene = RecordingScene::default();
        let loads = Rc::clone(&scene.loads);
        let unloads = Rc::clone(&scene.unloads);
        let mut host = SceneHost::new(Box::new(scene));
        let now = Instant::now();
        host.load(now);
        host.load(now);
        host.shutdown();
        host.shutdown();

        assert_eq!(loads.get(), 1);
        assert_eq!(unloads.get(), 1);
        assert!(host.next_deadline().is_none());
    }

    #[test]
    fn input_before_load_is_dropped() {
        let mut host = SceneHost::new(Box::new(RecordingScene::default()));
        let command = host.handle_input(InputEvent::Scrolled, Instant::now());
        assert_eq!(command, SceneCommand::None);
    }

    #[test]
    fn input_requests_a_single_redraw() {
        let mut host = SceneHost::new(Box::new(RecordingScene::default()));
        let now = Instant::now();
        host.load(now);
        assert!(host.take_redraw_request());
        assert!(!host.take_redraw_request());

        host.handle_input(InputEvent::PointerPressed, now);
        assert!(host.take_redraw_request());
        assert!(!host.take_redraw_request());
    }

    #[test]
    fn due_deadline_requests_redraw() {
        let now = Instant::now();
        let scene = RecordingScene {
            deadline: Some(now + Duration::from_secs(1)),
            ..RecordingScene::default()
        };
        let mut host = SceneHost::new(Box::new(scene));
        host.load(now);
        let _ = host.take_redraw_request();

        host.update(now);
        assert!(!host.take_redraw_request());
        host.update(now + Duration::from_secs(1));
        assert!(host.take_redraw_request());
    }

    #[test]
    fn continuous_scenes_always_redraw() {
        let scene = RecordingScene {
            continuous: true,
            ..RecordingScene::default()
        };
        let mut host = SceneHost::new(Box::new(scene));
        host.load(Instant::now());
        assert!(host.wants_continuous_frames());
        assert!(host.take_redraw_request());
        assert!(host.take_redraw_request());
    }
}

use glam::Vec2;

/// Logical keys the game reacts to. The windowing layer maps physical key
/// codes onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Forward,
    Backward,
    Left,
    Right,
    Jump,
    Sprint,
    /// Flip every piston.
    Toggle,
    Other(u32),
}

/// Input event types the engine understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown(Key),
    KeyUp(Key),
    /// Relative mouse motion in pixels.
    MouseMotion { dx: f32, dy: f32 },
    /// Wheel movement; positive is away from the user.
    MouseWheel { delta: f32 },
}

/// A queue of input events.
/// The windowing layer pushes events; the driver drains them each frame.
pub struct InputQueue {
    events: Vec<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(32),
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Drain all pending events. Returns a Vec and clears the queue.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Held/not-held state of one key with edge detection.
/// `press` and `release` report `true` only when the state actually changes,
/// which filters out OS key repeat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pressed: bool,
}

impl KeyState {
    pub fn press(&mut self) -> bool {
        !std::mem::replace(&mut self.pressed, true)
    }

    pub fn release(&mut self) -> bool {
        std::mem::replace(&mut self.pressed, false)
    }

    pub fn reset(&mut self) {
        self.pressed = false;
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }
}

/// What the player asked for during one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Intent {
    /// Sum of held movement keys in camera space: +y forward, +x to the left.
    pub direction: Vec2,
    pub sprint_held: bool,
    /// Sprint key went down this frame.
    pub sprint_pressed: bool,
    /// Jump key went down this frame.
    pub jump: bool,
    /// Toggle key went down this frame.
    pub toggle: bool,
    /// Accumulated mouse motion.
    pub look: Vec2,
    /// Accumulated wheel movement.
    pub zoom: f32,
}

/// Folds raw input events into key states and a per-frame [`Intent`].
#[derive(Debug, Default)]
pub struct Controls {
    forward: KeyState,
    backward: KeyState,
    left: KeyState,
    right: KeyState,
    sprint: KeyState,
    jump: KeyState,
    toggle: KeyState,
    pending: Intent,
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: InputEvent) {
        match event {
            InputEvent::KeyDown(key) => {
                let Some(state) = self.state_mut(key) else { return };
                if state.press() {
                    match key {
                        Key::Jump => self.pending.jump = true,
                        Key::Sprint => self.pending.sprint_pressed = true,
                        Key::Toggle => self.pending.toggle = true,
                        _ => {}
                    }
                }
            }
            InputEvent::KeyUp(key) => {
                if let Some(state) = self.state_mut(key) {
                    state.release();
                }
            }
            InputEvent::MouseMotion { dx, dy } => self.pending.look += Vec2::new(dx, dy),
            InputEvent::MouseWheel { delta } => self.pending.zoom += delta,
        }
    }

    pub fn handle_all(&mut self, queue: &mut InputQueue) {
        for event in queue.drain() {
            self.handle(event);
        }
    }

    /// Snapshot of held keys plus the edges and motion gathered since the
    /// last call. Edges and motion are consumed.
    pub fn take_intent(&mut self) -> Intent {
        let mut direction = Vec2::ZERO;
        if self.forward.is_pressed() {
            direction.y += 1.0;
        }
        if self.backward.is_pressed() {
            direction.y -= 1.0;
        }
        if self.left.is_pressed() {
            direction.x += 1.0;
        }
        if self.right.is_pressed() {
            direction.x -= 1.0;
        }
        let edges = std::mem::take(&mut self.pending);
        Intent {
            direction,
            sprint_held: self.sprint.is_pressed(),
            ..edges
        }
    }

    /// Forget every held key (e.g. on focus loss or level reload).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn state_mut(&mut self, key: Key) -> Option<&mut KeyState> {
        match key {
            Key::Forward => Some(&mut self.forward),
            Key::Backward => Some(&mut self.backward),
            Key::Left => Some(&mut self.left),
            Key::Right => Some(&mut self.right),
            Key::Jump => Some(&mut self.jump),
            Key::Sprint => Some(&mut self.sprint),
            Key::Toggle => Some(&mut self.toggle),
            Key::Other(_) => None,
        }
    }
}

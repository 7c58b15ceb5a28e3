use rustc_hash::FxHashSet;
use winit::keyboard::KeyCode;

/// Logical "is this key currently held" view, sampled once per tick.
pub trait InputState {
    fn is_key_held(&self, key: KeyCode) -> bool;
}

/// No keys held. Used when input is irrelevant (auto play, edit mode).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoInput;

impl InputState for NoInput {
    #[inline(always)]
    fn is_key_held(&self, _key: KeyCode) -> bool {
        false
    }
}

/// Held-key set fed from key-down/up events by the host's event loop.
#[derive(Clone, Debug, Default)]
pub struct KeyboardState {
    held: FxHashSet<KeyCode>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.held.insert(key);
        } else {
            self.held.remove(&key);
        }
    }

    #[inline(always)]
    pub fn press(&mut self, key: KeyCode) {
        self.handle_key(key, true);
    }

    #[inline(always)]
    pub fn release(&mut self, key: KeyCode) {
        self.handle_key(key, false);
    }
}

impl InputState for KeyboardState {
    #[inline(always)]
    fn is_key_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }
}

/// Physical key that types `c` on a US layout, case-insensitive.
pub fn keycode_for_char(c: char) -> Option<KeyCode> {
    let key = match c.to_ascii_lowercase() {
        'a' => KeyCode::KeyA,
        'b' => KeyCode::KeyB,
        'c' => KeyCode::KeyC,
        'd' => KeyCode::KeyD,
        'e' => KeyCode::KeyE,
        'f' => KeyCode::KeyF,
        'g' => KeyCode::KeyG,
        'h' => KeyCode::KeyH,
        'i' => KeyCode::KeyI,
        'j' => KeyCode::KeyJ,
        'k' => KeyCode::KeyK,
        'l' => KeyCode::KeyL,
        'm' => KeyCode::KeyM,
        'n' => KeyCode::KeyN,
        'o' => KeyCode::KeyO,
        'p' => KeyCode::KeyP,
        'q' => KeyCode::KeyQ,
        'r' => KeyCode::KeyR,
        's' => KeyCode::KeyS,
        't' => KeyCode::KeyT,
        'u' => KeyCode::KeyU,
        'v' => KeyCode::KeyV,
        'w' => KeyCode::KeyW,
        'x' => KeyCode::KeyX,
        'y' => KeyCode::KeyY,
        'z' => KeyCode::KeyZ,
        '0' => KeyCode::Digit0,
        '1' => KeyCode::Digit1,
        '2' => KeyCode::Digit2,
        '3' => KeyCode::Digit3,
        '4' => KeyCode::Digit4,
        '5' => KeyCode::Digit5,
        '6' => KeyCode::Digit6,
        '7' => KeyCode::Digit7,
        '8' => KeyCode::Digit8,
        '9' => KeyCode::Digit9,
        '-' => KeyCode::Minus,
        '=' => KeyCode::Equal,
        '[' => KeyCode::BracketLeft,
        ']' => KeyCode::BracketRight,
        ';' => KeyCode::Semicolon,
        '\'' => KeyCode::Quote,
        ',' => KeyCode::Comma,
        '.' => KeyCode::Period,
        '/' => KeyCode::Slash,
        ' ' => KeyCode::Space,
        _ => return None,
    };
    Some(key)
}

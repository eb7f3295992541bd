//! Turns raw controller and keyboard edges into per-player intents.
//!
//! The router holds no game state. Player numbers are 1-based on the wire and
//! converted to [`PlayerIndex`] here and nowhere else.

use std::collections::HashSet;

use party_shared::protocol::{ClientMsg, ControllerMsg, KeyMsg};

/// Client frames larger than this are dropped unparsed.
pub const MAX_MESSAGE_BYTES: usize = 4096;

/// 0-based roster slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerIndex(usize);

impl PlayerIndex {
    pub const FIRST: PlayerIndex = PlayerIndex(0);

    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// Convert a 1-based wire player number, rejecting numbers outside the roster.
    pub fn from_wire(player: u32, roster_size: usize) -> Option<Self> {
        let player = player as usize;
        if player == 0 || player > roster_size {
            return None;
        }
        Some(Self(player - 1))
    }

    pub fn to_wire(self) -> u32 {
        self.0 as u32 + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    Left,
    Right,
    Jump,
    Hit,
    Still,
    /// A release edge with no action held.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Controller,
    Keyboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intent {
    pub player: PlayerIndex,
    pub kind: IntentKind,
    pub source: InputSource,
    pub timestamp_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("malformed client message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("client message too large ({0} bytes)")]
    TooLarge(usize),
}

/// Parse one client frame. Callers log and drop errors; they are never fatal.
pub fn decode_client_msg(text: &str) -> Result<ClientMsg, InputError> {
    if text.len() > MAX_MESSAGE_BYTES {
        return Err(InputError::TooLarge(text.len()));
    }
    Ok(serde_json::from_str(text)?)
}

fn kind_from_code(code: &str) -> Option<IntentKind> {
    match code.trim() {
        "L" => Some(IntentKind::Left),
        "R" => Some(IntentKind::Right),
        "J" => Some(IntentKind::Jump),
        "B1" | "B2" => Some(IntentKind::Hit),
        "N" => Some(IntentKind::Still),
        _ => None,
    }
}

fn kind_from_flags(msg: &ControllerMsg) -> Option<IntentKind> {
    let flags = [
        (msg.left, IntentKind::Left),
        (msg.right, IntentKind::Right),
        (msg.jump, IntentKind::Jump),
        (msg.button, IntentKind::Hit),
        (msg.button1, IntentKind::Hit),
        (msg.button2, IntentKind::Hit),
        (msg.still, IntentKind::Still),
    ];
    let mut seen = false;
    for (flag, kind) in flags {
        match flag {
            Some(true) => return Some(kind),
            Some(false) => seen = true,
            None => {}
        }
    }
    seen.then_some(IntentKind::None)
}

/// Maps controller messages onto intents for the current roster.
#[derive(Debug, Clone)]
pub struct InputRouter {
    roster_size: usize,
}

impl InputRouter {
    pub fn new(roster_size: usize) -> Self {
        Self { roster_size }
    }

    pub fn set_roster_size(&mut self, roster_size: usize) {
        self.roster_size = roster_size;
    }

    /// At most one intent per message. A recognised `data` code wins over flags.
    pub fn route(&self, msg: &ControllerMsg, now_ms: u64) -> Option<Intent> {
        let Some(player) = PlayerIndex::from_wire(msg.player, self.roster_size) else {
            tracing::debug!(
                "Ignoring controller input for player {} (roster of {})",
                msg.player,
                self.roster_size
            );
            return None;
        };
        let kind = msg
            .data
            .as_deref()
            .and_then(kind_from_code)
            .or_else(|| kind_from_flags(msg))?;
        Some(Intent {
            player,
            kind,
            source: InputSource::Controller,
            timestamp_ms: now_ms,
        })
    }
}

/// Local keyboard fallback, always driving the first slot.
#[derive(Debug, Default)]
pub struct KeyboardRouter {
    pressed: HashSet<String>,
}

impl KeyboardRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, msg: &KeyMsg, now_ms: u64) -> Option<Intent> {
        if msg.down {
            self.key_down(&msg.key, now_ms)
        } else {
            self.key_up(&msg.key, now_ms)
        }
    }

    /// Auto-repeated key-downs are swallowed until the matching key-up.
    pub fn key_down(&mut self, key: &str, now_ms: u64) -> Option<Intent> {
        let kind = match key {
            "ArrowLeft" => IntentKind::Left,
            "ArrowRight" => IntentKind::Right,
            "ArrowUp" => IntentKind::Jump,
            " " => IntentKind::Hit,
            _ => return None,
        };
        if !self.pressed.insert(key.to_string()) {
            return None;
        }
        Some(Self::intent(kind, now_ms))
    }

    /// Releasing a direction stops the avatar; other releases only clear repeat state.
    pub fn key_up(&mut self, key: &str, now_ms: u64) -> Option<Intent> {
        if !self.pressed.remove(key) {
            return None;
        }
        matches!(key, "ArrowLeft" | "ArrowRight").then(|| Self::intent(IntentKind::Still, now_ms))
    }

    pub fn reset(&mut self) {
        self.pressed.clear();
    }

    fn intent(kind: IntentKind, now_ms: u64) -> Intent {
        Intent {
            player: PlayerIndex::FIRST,
            kind,
            source: InputSource::Keyboard,
            timestamp_ms: now_ms,
        }
    }
}

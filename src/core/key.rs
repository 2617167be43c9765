//! Platform-independent keystrokes and Vim key notation (`<Esc>`, `<C-[>`).

use std::fmt;

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const CTRL = 1;
        const ALT = 1 << 1;
        const SHIFT = 1 << 2;
    }
}

/// Non-printable keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialKey {
    Esc,
    Return,
    Backspace,
    Delete,
    Tab,
    Insert,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
}

impl SpecialKey {
    /// Keys insert mode lets the host handle natively without losing track
    /// of what was typed.
    pub const ALLOWED_FOR_INSERT: &'static [SpecialKey] = &[
        SpecialKey::Return,
        SpecialKey::Backspace,
        SpecialKey::Delete,
        SpecialKey::Tab,
        SpecialKey::Insert,
    ];

    pub const ARROWS: &'static [SpecialKey] = &[
        SpecialKey::Left,
        SpecialKey::Right,
        SpecialKey::Up,
        SpecialKey::Down,
    ];

    fn notation(&self) -> String {
        match self {
            SpecialKey::Esc => "Esc".to_string(),
            SpecialKey::Return => "CR".to_string(),
            SpecialKey::Backspace => "BS".to_string(),
            SpecialKey::Delete => "Del".to_string(),
            SpecialKey::Tab => "Tab".to_string(),
            SpecialKey::Insert => "Insert".to_string(),
            SpecialKey::Left => "Left".to_string(),
            SpecialKey::Right => "Right".to_string(),
            SpecialKey::Up => "Up".to_string(),
            SpecialKey::Down => "Down".to_string(),
            SpecialKey::Home => "Home".to_string(),
            SpecialKey::End => "End".to_string(),
            SpecialKey::PageUp => "PageUp".to_string(),
            SpecialKey::PageDown => "PageDown".to_string(),
            SpecialKey::F(n) => format!("F{n}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Special(SpecialKey),
}

/// One keystroke as delivered by the host, or synthesised by the engine.
///
/// Virtual strokes come from the engine itself (mapped right-hand sides,
/// programmatic text injection) and are never forwarded to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyStroke {
    pub key: Key,
    pub modifiers: Modifiers,
    is_virtual: bool,
}

impl KeyStroke {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self {
            key,
            modifiers,
            is_virtual: false,
        }
    }

    pub fn char(c: char) -> Self {
        Self::new(Key::Char(c), Modifiers::empty())
    }

    pub fn ctrl(c: char) -> Self {
        Self::new(Key::Char(c.to_ascii_lowercase()), Modifiers::CTRL)
    }

    pub fn special(key: SpecialKey) -> Self {
        Self::new(Key::Special(key), Modifiers::empty())
    }

    pub fn into_virtual(self) -> Self {
        Self {
            is_virtual: true,
            ..self
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    /// `<Esc>` or `<C-[>`.
    pub fn is_escape(&self) -> bool {
        match self.key {
            Key::Special(SpecialKey::Esc) => self.modifiers.is_empty(),
            Key::Char('[') => self.modifiers == Modifiers::CTRL,
            _ => false,
        }
    }

    pub fn is_ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    /// The character of an unmodified (or shifted) printable stroke.
    pub fn character(&self) -> Option<char> {
        match self.key {
            Key::Char(c) if !self.modifiers.intersects(Modifiers::CTRL | Modifiers::ALT) => {
                Some(c)
            }
            _ => None,
        }
    }

    pub fn special_key(&self) -> Option<SpecialKey> {
        match self.key {
            Key::Special(k) => Some(k),
            Key::Char(_) => None,
        }
    }
}

impl fmt::Display for KeyStroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut prefix = String::new();
        if self.modifiers.contains(Modifiers::CTRL) {
            prefix.push_str("C-");
        }
        if self.modifiers.contains(Modifiers::ALT) {
            prefix.push_str("A-");
        }
        if self.modifiers.contains(Modifiers::SHIFT) {
            prefix.push_str("S-");
        }
        match self.key {
            Key::Char('<') if prefix.is_empty() => write!(f, "<lt>"),
            Key::Char(' ') if prefix.is_empty() => write!(f, "<Space>"),
            Key::Char(c) if prefix.is_empty() => write!(f, "{c}"),
            Key::Char(c) => write!(f, "<{prefix}{c}>"),
            Key::Special(k) => write!(f, "<{prefix}{}>", k.notation()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("unknown key name <{0}>")]
    UnknownKey(String),
    #[error("empty key name <>")]
    EmptyKey,
}

/// Parses Vim key notation such as `"3iab<Esc>"` or `"<C-r>"`.
///
/// A `<` without a closing `>` is taken literally.
pub fn parse_keys(notation: &str) -> Result<Vec<KeyStroke>, KeyParseError> {
    let mut strokes = Vec::new();
    let mut rest = notation;
    while let Some(c) = rest.chars().next() {
        if c == '<' {
            if let Some(close) = rest[1..].find('>') {
                let name = &rest[1..1 + close];
                if !name.is_empty() && !name.contains('<') {
                    strokes.push(parse_bracketed(name)?);
                    rest = &rest[close + 2..];
                    continue;
                }
                if name.is_empty() {
                    return Err(KeyParseError::EmptyKey);
                }
            }
        }
        strokes.push(KeyStroke::char(c));
        rest = &rest[c.len_utf8()..];
    }
    Ok(strokes)
}

fn parse_bracketed(name: &str) -> Result<KeyStroke, KeyParseError> {
    let mut modifiers = Modifiers::empty();
    let mut key = name;
    // Modifier prefixes need something after the dash, so "<C-->" is Ctrl+'-'.
    while key.len() > 2 && key.as_bytes()[1] == b'-' {
        let modifier = match key.as_bytes()[0].to_ascii_uppercase() {
            b'C' => Modifiers::CTRL,
            b'A' | b'M' => Modifiers::ALT,
            b'S' => Modifiers::SHIFT,
            _ => break,
        };
        modifiers |= modifier;
        key = &key[2..];
    }

    let mut chars = key.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        let c = if modifiers.contains(Modifiers::CTRL) {
            c.to_ascii_lowercase()
        } else {
            c
        };
        return Ok(KeyStroke::new(Key::Char(c), modifiers));
    }

    let lower = key.to_ascii_lowercase();
    let parsed = match lower.as_str() {
        "esc" | "escape" => Key::Special(SpecialKey::Esc),
        "cr" | "enter" | "return" => Key::Special(SpecialKey::Return),
        "bs" | "backspace" => Key::Special(SpecialKey::Backspace),
        "del" | "delete" => Key::Special(SpecialKey::Delete),
        "tab" => Key::Special(SpecialKey::Tab),
        "insert" => Key::Special(SpecialKey::Insert),
        "left" => Key::Special(SpecialKey::Left),
        "right" => Key::Special(SpecialKey::Right),
        "up" => Key::Special(SpecialKey::Up),
        "down" => Key::Special(SpecialKey::Down),
        "home" => Key::Special(SpecialKey::Home),
        "end" => Key::Special(SpecialKey::End),
        "pageup" => Key::Special(SpecialKey::PageUp),
        "pagedown" => Key::Special(SpecialKey::PageDown),
        "space" => Key::Char(' '),
        "lt" => Key::Char('<'),
        "bar" => Key::Char('|'),
        "bslash" => Key::Char('\\'),
        _ => match lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
            Some(n) if (1..=12).contains(&n) => Key::Special(SpecialKey::F(n)),
            _ => return Err(KeyParseError::UnknownKey(name.to_string())),
        },
    };
    Ok(KeyStroke::new(parsed, modifiers))
}

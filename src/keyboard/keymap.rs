//! Key code definitions and the character encoding table
//!
//! Characters are translated to Linux input scancodes for a single US
//! QWERTY layout. Letters are looked up case-insensitively; the shift
//! state is resolved separately by [`needs_modifier`], so a digit and
//! its shifted symbol share one scancode.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Represents a physical key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub const KEY_1: KeyCode = KeyCode(2);
    pub const KEY_2: KeyCode = KeyCode(3);
    pub const KEY_3: KeyCode = KeyCode(4);
    pub const KEY_4: KeyCode = KeyCode(5);
    pub const KEY_5: KeyCode = KeyCode(6);
    pub const KEY_6: KeyCode = KeyCode(7);
    pub const KEY_7: KeyCode = KeyCode(8);
    pub const KEY_8: KeyCode = KeyCode(9);
    pub const KEY_9: KeyCode = KeyCode(10);
    pub const KEY_0: KeyCode = KeyCode(11);
    pub const MINUS: KeyCode = KeyCode(12);
    pub const EQUAL: KeyCode = KeyCode(13);
    pub const TAB: KeyCode = KeyCode(15);
    pub const Q: KeyCode = KeyCode(16);
    pub const LEFT_BRACE: KeyCode = KeyCode(26);
    pub const RIGHT_BRACE: KeyCode = KeyCode(27);
    pub const ENTER: KeyCode = KeyCode(28);
    pub const A: KeyCode = KeyCode(30);
    pub const SEMICOLON: KeyCode = KeyCode(39);
    pub const APOSTROPHE: KeyCode = KeyCode(40);
    pub const GRAVE: KeyCode = KeyCode(41);
    pub const LEFT_SHIFT: KeyCode = KeyCode(42);
    pub const BACKSLASH: KeyCode = KeyCode(43);
    pub const Z: KeyCode = KeyCode(44);
    pub const COMMA: KeyCode = KeyCode(51);
    pub const DOT: KeyCode = KeyCode(52);
    pub const SLASH: KeyCode = KeyCode(53);
    pub const SPACE: KeyCode = KeyCode(57);

    pub const BTN_LEFT: KeyCode = KeyCode(0x110);
    pub const BTN_RIGHT: KeyCode = KeyCode(0x111);
    pub const BTN_MIDDLE: KeyCode = KeyCode(0x112);

    pub fn new(code: u16) -> Self {
        Self(code)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl From<u16> for KeyCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The modifier pressed around shifted characters
pub const SHIFT_KEY: KeyCode = KeyCode::LEFT_SHIFT;

/// Characters that are typed with shift held, beyond uppercase letters
const SHIFTED_SYMBOLS: &str = "!@#$%^&*()_+{}|:\"<>?~";

/// Encoding of a single character on the emulated keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharMapping {
    /// Physical key to press
    pub scancode: KeyCode,
    /// Whether shift must be held while pressing it
    pub needs_modifier: bool,
}

/// Outcome of a scancode lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found(KeyCode),
    NotMapped,
}

impl Lookup {
    pub fn scancode(self) -> Option<KeyCode> {
        match self {
            Lookup::Found(code) => Some(code),
            Lookup::NotMapped => None,
        }
    }
}

/// Static character table for the US layout, keyed by unshifted or
/// shifted character (letters only in lowercase)
pub static CHARMAP: LazyLock<HashMap<char, KeyCode>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Letter rows, in physical order
    for (row_start, row) in [(16u16, "qwertyuiop"), (30, "asdfghjkl"), (44, "zxcvbnm")] {
        for (offset, c) in row.chars().enumerate() {
            map.insert(c, KeyCode(row_start + offset as u16));
        }
    }

    // Number row, plain and shifted
    for (offset, (plain, shifted)) in "1234567890".chars().zip("!@#$%^&*()".chars()).enumerate() {
        let code = KeyCode(KeyCode::KEY_1.0 + offset as u16);
        map.insert(plain, code);
        map.insert(shifted, code);
    }

    // Punctuation, plain and shifted
    let punctuation = [
        ('-', '_', KeyCode::MINUS),
        ('=', '+', KeyCode::EQUAL),
        ('[', '{', KeyCode::LEFT_BRACE),
        (']', '}', KeyCode::RIGHT_BRACE),
        (';', ':', KeyCode::SEMICOLON),
        ('\'', '"', KeyCode::APOSTROPHE),
        ('`', '~', KeyCode::GRAVE),
        ('\\', '|', KeyCode::BACKSLASH),
        (',', '<', KeyCode::COMMA),
        ('.', '>', KeyCode::DOT),
        ('/', '?', KeyCode::SLASH),
    ];
    for (plain, shifted, code) in punctuation {
        map.insert(plain, code);
        map.insert(shifted, code);
    }

    // Whitespace
    map.insert(' ', KeyCode::SPACE);
    map.insert('\t', KeyCode::TAB);
    map.insert('\n', KeyCode::ENTER);

    map
});

/// Resolve the scancode for a character.
///
/// Alphabetic input is lower-cased first; the emulated device has one
/// physical layout and shift state is handled by [`needs_modifier`].
pub fn scancode_for(c: char) -> Lookup {
    match CHARMAP.get(&c.to_ascii_lowercase()) {
        Some(code) => Lookup::Found(*code),
        None => Lookup::NotMapped,
    }
}

/// Whether the character is typed with shift held.
///
/// Independent of whether the character has a table entry.
pub fn needs_modifier(c: char) -> bool {
    c.is_ascii_uppercase() || SHIFTED_SYMBOLS.contains(c)
}

/// Full mapping for a character, or `None` if it cannot be typed
pub fn lookup(c: char) -> Option<CharMapping> {
    scancode_for(c).scancode().map(|scancode| CharMapping {
        scancode,
        needs_modifier: needs_modifier(c),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_are_case_insensitive() {
        assert_eq!(scancode_for('a'), Lookup::Found(KeyCode::A));
        assert_eq!(scancode_for('A'), Lookup::Found(KeyCode::A));
        assert_eq!(scancode_for('q'), Lookup::Found(KeyCode::Q));
        assert_eq!(scancode_for('Z'), Lookup::Found(KeyCode::Z));
        assert_eq!(scancode_for('m'), Lookup::Found(KeyCode(50)));
        assert_eq!(scancode_for('l'), Lookup::Found(KeyCode(38)));
    }

    #[test]
    fn digits_follow_number_row() {
        assert_eq!(scancode_for('1'), Lookup::Found(KeyCode::KEY_1));
        assert_eq!(scancode_for('5'), Lookup::Found(KeyCode::KEY_5));
        assert_eq!(scancode_for('9'), Lookup::Found(KeyCode::KEY_9));
        assert_eq!(scancode_for('0'), Lookup::Found(KeyCode::KEY_0));
    }

    #[test]
    fn digit_and_shifted_symbol_share_scancode() {
        assert_eq!(scancode_for('1'), scancode_for('!'));
        assert!(!needs_modifier('1'));
        assert!(needs_modifier('!'));

        assert_eq!(scancode_for('0'), scancode_for(')'));
        assert_eq!(scancode_for('/'), scancode_for('?'));
        assert!(!needs_modifier('/'));
        assert!(needs_modifier('?'));
    }

    #[test]
    fn needs_modifier_ignores_mappability() {
        // Non-ASCII uppercase is not mappable and not shifted
        assert!(!needs_modifier('É'));
        assert_eq!(scancode_for('É'), Lookup::NotMapped);
        assert!(needs_modifier('A'));
        assert!(!needs_modifier('a'));
        assert!(!needs_modifier(' '));
    }

    #[test]
    fn whitespace_and_terminator_are_mapped() {
        assert_eq!(scancode_for(' '), Lookup::Found(KeyCode::SPACE));
        assert_eq!(scancode_for('\t'), Lookup::Found(KeyCode::TAB));
        assert_eq!(scancode_for('\n'), Lookup::Found(KeyCode::ENTER));
    }

    #[test]
    fn control_characters_are_not_mapped() {
        assert_eq!(scancode_for('\x07'), Lookup::NotMapped);
        assert_eq!(scancode_for('\r'), Lookup::NotMapped);
        assert_eq!(lookup('\x1b'), None);
    }

    #[test]
    fn lookup_is_stable() {
        for c in "abcXYZ019!?-_ ".chars() {
            assert_eq!(scancode_for(c), scancode_for(c));
            assert_eq!(lookup(c), lookup(c));
        }
    }

    #[test]
    fn every_shifted_symbol_is_mapped() {
        for c in SHIFTED_SYMBOLS.chars() {
            let mapping = lookup(c).unwrap_or_else(|| panic!("{:?} not mapped", c));
            assert!(mapping.needs_modifier);
        }
    }

    #[test]
    fn all_scancodes_fit_key_capability_range() {
        assert!(CHARMAP.values().all(|code| code.0 < 256));
    }
}

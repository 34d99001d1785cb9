//! Keypad input.
use std::fmt;

/// One of the 16 keys of the COSMAC VIP hexadecimal keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyCode {
    Key0 = 0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF = 0xF,
}

impl KeyCode {
    #[inline(always)]
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let key_id = self.as_u8();
        write!(f, "k{key_id:x}")
    }
}

impl From<KeyCode> for u8 {
    fn from(keycode: KeyCode) -> Self {
        keycode.as_u8()
    }
}

impl TryFrom<u8> for KeyCode {
    type Error = InvalidKeyCode;

    fn try_from(key_id: u8) -> Result<Self, Self::Error> {
        match key_id {
            0 => Ok(Self::Key0),
            1 => Ok(Self::Key1),
            2 => Ok(Self::Key2),
            3 => Ok(Self::Key3),
            4 => Ok(Self::Key4),
            5 => Ok(Self::Key5),
            6 => Ok(Self::Key6),
            7 => Ok(Self::Key7),
            8 => Ok(Self::Key8),
            9 => Ok(Self::Key9),
            10 => Ok(Self::KeyA),
            11 => Ok(Self::KeyB),
            12 => Ok(Self::KeyC),
            13 => Ok(Self::KeyD),
            14 => Ok(Self::KeyE),
            15 => Ok(Self::KeyF),
            _ => Err(InvalidKeyCode),
        }
    }
}

#[derive(Debug)]
pub struct InvalidKeyCode;

impl std::error::Error for InvalidKeyCode {}

impl fmt::Display for InvalidKeyCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "keycode must be in range 0 <= keycode < 16")
    }
}

/// Translation table from host keyboard characters to Chip-8 keys.
///
/// The default layout maps the left-hand 4x4 block of a QWERTY keyboard
/// onto the keypad:
///
/// ```text
/// 1 2 3 4      1 2 3 C
/// q w e r  ->  4 5 6 D
/// a s d f      7 8 9 E
/// z x c v      A 0 B F
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    keys: Box<[(char, KeyCode)]>,
}

impl Default for KeyMap {
    #[rustfmt::skip]
    fn default() -> Self {
        use KeyCode::*;
        Self::new([
            ('1', Key1), ('2', Key2), ('3', Key3), ('4', KeyC),
            ('q', Key4), ('w', Key5), ('e', Key6), ('r', KeyD),
            ('a', Key7), ('s', Key8), ('d', Key9), ('f', KeyE),
            ('z', KeyA), ('x', Key0), ('c', KeyB), ('v', KeyF),
        ])
    }
}

impl KeyMap {
    pub fn new(keys: impl IntoIterator<Item = (char, KeyCode)>) -> Self {
        Self {
            keys: keys
                .into_iter()
                .map(|(host_key, keycode)| (host_key.to_ascii_lowercase(), keycode))
                .collect(),
        }
    }

    /// Given a host key, map it to a Chip-8 key.
    ///
    /// Unrecognised keys map to `None` and should be ignored by the caller.
    pub fn map_key(&self, host_key: char) -> Option<KeyCode> {
        let host_key = host_key.to_ascii_lowercase();
        self.keys
            .iter()
            .find(|(key, _)| *key == host_key)
            .map(|(_, keycode)| *keycode)
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, KeyCode)> + '_ {
        self.keys.iter().copied()
    }
}

#[cfg(feature = "serde")]
mod de {
    use std::{collections::BTreeMap, fmt::Display};

    use num_traits::AsPrimitive;
    use serde::de::{Deserialize, Error, Expected, Unexpected, Visitor};

    use super::*;

    impl Expected for InvalidKeyCode {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            <Self as Display>::fmt(self, f)
        }
    }

    impl<'de> Deserialize<'de> for KeyCode {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            // YAML integer type, or a hex digit string
            deserializer.deserialize_any(KeyCodeVisitor)
        }
    }

    impl<'de> Deserialize<'de> for KeyMap {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            let table = BTreeMap::<char, KeyCode>::deserialize(deserializer)?;
            Ok(KeyMap::new(table))
        }
    }

    struct KeyCodeVisitor;

    impl KeyCodeVisitor {
        #[inline]
        fn check_int<N, E>(val: N) -> Result<KeyCode, E>
        where
            N: AsPrimitive<i64>,
            E: Error,
        {
            let n = val.as_();
            if n < 0 || n > u8::MAX as i64 {
                return Err(E::invalid_value(Unexpected::Signed(n), &InvalidKeyCode));
            }
            KeyCode::try_from(n as u8).map_err(|err| E::invalid_value(Unexpected::Signed(n), &err))
        }
    }

    impl<'de> Visitor<'de> for KeyCodeVisitor {
        type Value = KeyCode;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "an integer between 0 and 15, or a hex digit")
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Self::check_int(v)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            if v > u8::MAX as u64 {
                return Err(E::invalid_value(Unexpected::Unsigned(v), &InvalidKeyCode));
            }
            Self::check_int(v as i64)
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            let digits = v.trim_start_matches("0x");
            u8::from_str_radix(digits, 16)
                .ok()
                .and_then(|key_id| KeyCode::try_from(key_id).ok())
                .ok_or_else(|| E::invalid_value(Unexpected::Str(v), &InvalidKeyCode))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keycode_range() {
        for key_id in 0..16 {
            assert_eq!(KeyCode::try_from(key_id).unwrap().as_u8(), key_id);
        }
        assert!(KeyCode::try_from(16).is_err());
    }

    #[test]
    fn test_default_keymap() {
        let keymap = KeyMap::default();
        assert_eq!(keymap.map_key('1'), Some(KeyCode::Key1));
        assert_eq!(keymap.map_key('4'), Some(KeyCode::KeyC));
        assert_eq!(keymap.map_key('x'), Some(KeyCode::Key0));
        assert_eq!(keymap.map_key('V'), Some(KeyCode::KeyF));
        assert_eq!(keymap.map_key('p'), None);
        assert_eq!(keymap.iter().count(), 16);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_keymap() {
        let keymap: KeyMap = serde_yaml::from_str("{ h: 4, j: '0xA', k: f }").unwrap();
        assert_eq!(keymap.map_key('h'), Some(KeyCode::Key4));
        assert_eq!(keymap.map_key('j'), Some(KeyCode::KeyA));
        assert_eq!(keymap.map_key('k'), Some(KeyCode::KeyF));
        assert_eq!(keymap.map_key('1'), None);

        assert!(serde_yaml::from_str::<KeyCode>("16").is_err());
    }
}

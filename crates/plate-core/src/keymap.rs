use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::commands::Command;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeymapError {
    #[error("key binding `{0}` names no key")]
    EmptyKey(String),
    #[error("unknown modifier `{modifier}` in key binding `{binding}`")]
    UnknownModifier { binding: String, modifier: String },
}

/// A key plus modifiers, e.g. `Mod-Shift-z`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct KeyCombo {
    pub key: String,
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl KeyCombo {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// Parses a binding; `Mod` resolves to `Meta` on macOS and `Ctrl` elsewhere.
    pub fn parse(binding: &str) -> Result<Self, KeymapError> {
        Self::parse_for(binding, cfg!(target_os = "macos"))
    }

    pub fn parse_for(binding: &str, mac: bool) -> Result<Self, KeymapError> {
        // A trailing `-` is the minus key itself.
        let (mods, key) = match binding.strip_suffix("--") {
            Some(rest) => (rest, "-"),
            None if binding == "-" => ("", "-"),
            None => match binding.rsplit_once('-') {
                Some((mods, key)) => (mods, key),
                None => ("", binding),
            },
        };
        if key.is_empty() {
            return Err(KeymapError::EmptyKey(binding.to_string()));
        }

        let mut combo = KeyCombo::new(if key == "Space" { " " } else { key });
        for modifier in mods.split('-').filter(|m| !m.is_empty()) {
            match modifier {
                "Mod" if mac => combo.meta = true,
                "Mod" => combo.ctrl = true,
                "Ctrl" | "Control" | "c" => combo.ctrl = true,
                "Alt" | "a" => combo.alt = true,
                "Shift" | "s" => combo.shift = true,
                "Meta" | "Cmd" | "m" => combo.meta = true,
                other => {
                    return Err(KeymapError::UnknownModifier {
                        binding: binding.to_string(),
                        modifier: other.to_string(),
                    });
                }
            }
        }
        Ok(combo)
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alt {
            f.write_str("Alt-")?;
        }
        if self.ctrl {
            f.write_str("Ctrl-")?;
        }
        if self.meta {
            f.write_str("Meta-")?;
        }
        if self.shift {
            f.write_str("Shift-")?;
        }
        if self.key == " " {
            f.write_str("Space")
        } else {
            f.write_str(&self.key)
        }
    }
}

#[derive(Clone, Default)]
pub struct Keymap {
    bindings: HashMap<KeyCombo, Command>,
}

impl fmt::Debug for Keymap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.bindings.keys().map(ToString::to_string).collect();
        keys.sort();
        f.debug_struct("Keymap").field("bindings", &keys).finish()
    }
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later bindings for the same combo replace earlier ones.
    pub fn bind(&mut self, binding: &str, command: Command) -> Result<&mut Self, KeymapError> {
        let combo = KeyCombo::parse(binding)?;
        self.bindings.insert(combo, command);
        Ok(self)
    }

    pub fn from_bindings<'a>(
        bindings: impl IntoIterator<Item = (&'a str, Command)>,
    ) -> Result<Self, KeymapError> {
        let mut keymap = Self::new();
        for (binding, command) in bindings {
            keymap.bind(binding, command)?;
        }
        Ok(keymap)
    }

    pub fn lookup(&self, combo: &KeyCombo) -> Option<&Command> {
        self.bindings.get(combo)
    }

    pub fn contains(&self, combo: &KeyCombo) -> bool {
        self.bindings.contains_key(combo)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mod_resolves_per_platform() {
        assert_eq!(
            KeyCombo::parse_for("Mod-b", true).unwrap(),
            KeyCombo::new("b").meta()
        );
        assert_eq!(
            KeyCombo::parse_for("Mod-b", false).unwrap(),
            KeyCombo::new("b").ctrl()
        );
    }

    #[test]
    fn trailing_dash_is_the_minus_key() {
        assert_eq!(
            KeyCombo::parse_for("Ctrl--", false).unwrap(),
            KeyCombo::new("-").ctrl()
        );
        assert_eq!(KeyCombo::parse_for("-", false).unwrap(), KeyCombo::new("-"));
    }
}

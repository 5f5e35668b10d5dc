use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use stickies_core::ai::AiSettings;

pub const DEFAULT_APP_ID: &str = "default-sticky-notes-app-local";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Keymap {
    pub quit: String,
    pub undo: String,
    pub help: String,
    pub dismiss: String,
    pub focus_next: String,
    pub focus_form: String,
    pub delete: String,
    pub toggle_strike: String,
    pub cycle_color: String,
    pub summarize: String,
    pub expand: String,
    pub edit: String,
    pub generate: String,
}

impl Default for Keymap {
    fn default() -> Self {
        Self {
            quit: "ctrl-q".to_string(),
            undo: "ctrl-z".to_string(),
            help: "f1".to_string(),
            dismiss: "ctrl-x".to_string(),
            focus_next: "tab".to_string(),
            focus_form: "ctrl-n".to_string(),
            delete: "d".to_string(),
            toggle_strike: "s".to_string(),
            cycle_color: "c".to_string(),
            summarize: "m".to_string(),
            expand: "x".to_string(),
            edit: "e".to_string(),
            generate: "ctrl-g".to_string(),
        }
    }
}

impl Keymap {
    /// Does `key` trigger the chord written as `binding`?
    pub fn matches(binding: &str, key: &KeyEvent) -> bool {
        KeyChord::parse(binding).is_some_and(|chord| chord.matches(key))
    }
}

/// A key plus modifiers, written like `ctrl-z`, `alt-enter` or `f1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyChord {
    pub fn parse(binding: &str) -> Option<Self> {
        let binding = binding.trim().to_ascii_lowercase();
        if binding.is_empty() {
            return None;
        }

        // A trailing "-" is the minus key itself, as in "ctrl--".
        let (prefix, key) = match binding.strip_suffix("--") {
            Some(prefix) => (prefix, "-"),
            None => match binding.rsplit_once('-') {
                Some((prefix, key)) if !key.is_empty() => (prefix, key),
                _ => ("", binding.as_str()),
            },
        };

        let mut modifiers = KeyModifiers::NONE;
        for part in prefix.split('-').filter(|part| !part.is_empty()) {
            modifiers |= match part {
                "ctrl" | "control" => KeyModifiers::CONTROL,
                "alt" => KeyModifiers::ALT,
                "shift" => KeyModifiers::SHIFT,
                _ => return None,
            };
        }

        let code = match key {
            "enter" => KeyCode::Enter,
            "esc" | "escape" => KeyCode::Esc,
            "tab" => KeyCode::Tab,
            "backtab" => KeyCode::BackTab,
            "space" => KeyCode::Char(' '),
            "backspace" => KeyCode::Backspace,
            "delete" | "del" => KeyCode::Delete,
            "insert" => KeyCode::Insert,
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "home" => KeyCode::Home,
            "end" => KeyCode::End,
            "pageup" => KeyCode::PageUp,
            "pagedown" => KeyCode::PageDown,
            other if other.len() > 1 && other.starts_with('f') => KeyCode::F(other[1..].parse().ok()?),
            other => {
                let mut chars = other.chars();
                let ch = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                KeyCode::Char(ch)
            }
        };

        Some(Self { code, modifiers })
    }

    pub fn matches(&self, key: &KeyEvent) -> bool {
        match (self.code, key.code) {
            // Terminals report shifted letters as uppercase, with or without SHIFT.
            (KeyCode::Char(expected), KeyCode::Char(actual)) => {
                let relevant = KeyModifiers::CONTROL | KeyModifiers::ALT;
                expected.eq_ignore_ascii_case(&actual)
                    && (key.modifiers & relevant) == (self.modifiers & relevant)
            }
            (expected, actual) => expected == actual && key.modifiers == self.modifiers,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Relative paths are resolved against the config file's directory
    pub database_path: PathBuf,
    pub app_id: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("stickies.db"),
            app_id: DEFAULT_APP_ID.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: PathBuf::from("logs"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub ai: AiSettings,
    pub logging: LoggingConfig,
    pub keymap: Keymap,
}

impl Config {
    /// Apply environment overrides through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(app_id) = lookup("STICKIES_APP_ID").filter(|value| !value.trim().is_empty()) {
            self.store.app_id = app_id;
        }
        let key = lookup("GEMINI_API_KEY")
            .or_else(|| lookup("STICKIES_AI_API_KEY"))
            .filter(|value| !value.trim().is_empty());
        if key.is_some() {
            self.ai.api_key = key;
        }
    }

    /// Make relative store and log paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        if self.store.database_path.is_relative() {
            self.store.database_path = base.join(&self.store.database_path);
        }
        if self.logging.directory.is_relative() {
            self.logging.directory = base.join(&self.logging.directory);
        }
    }
}

/// Read `path`, writing a default config there first if it does not exist.
/// Environment overrides are applied and relative paths resolved.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }
        let toml = toml::to_string(&Config::default()).context("Failed to serialize default config")?;
        fs::write(path, toml).with_context(|| format!("Failed to write default config {}", path.display()))?;
    }

    let content = fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
    let mut config: Config =
        toml::from_str(&content).with_context(|| format!("Failed to parse config file {}", path.display()))?;

    config.apply_overrides(|name| std::env::var(name).ok());
    let base = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    config.resolve_paths(&base);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_parse_chords() {
        let chord = KeyChord::parse("ctrl-z").unwrap();
        assert_eq!(chord.code, KeyCode::Char('z'));
        assert_eq!(chord.modifiers, KeyModifiers::CONTROL);

        assert_eq!(KeyChord::parse("F1").unwrap().code, KeyCode::F(1));
        assert_eq!(KeyChord::parse("alt-enter").unwrap().modifiers, KeyModifiers::ALT);
        assert_eq!(KeyChord::parse("ctrl--").unwrap().code, KeyCode::Char('-'));
        assert!(KeyChord::parse("hyper-z").is_none());
        assert!(KeyChord::parse("").is_none());
    }

    #[test]
    fn test_chord_matching() {
        assert!(Keymap::matches("ctrl-z", &key(KeyCode::Char('z'), KeyModifiers::CONTROL)));
        assert!(Keymap::matches("ctrl-z", &key(KeyCode::Char('Z'), KeyModifiers::CONTROL | KeyModifiers::SHIFT)));
        assert!(!Keymap::matches("ctrl-z", &key(KeyCode::Char('z'), KeyModifiers::NONE)));
        assert!(Keymap::matches("tab", &key(KeyCode::Tab, KeyModifiers::NONE)));
        assert!(!Keymap::matches("tab", &key(KeyCode::Tab, KeyModifiers::CONTROL)));
        assert!(Keymap::matches("d", &key(KeyCode::Char('D'), KeyModifiers::SHIFT)));
    }

    #[test]
    fn test_default_config_roundtrips_through_toml() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.store.app_id, DEFAULT_APP_ID);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config = toml::from_str("[ai]\nmodel = \"gemini-pro\"\n[keymap]\nquit = \"ctrl-c\"\n").unwrap();
        assert_eq!(parsed.ai.model, "gemini-pro");
        assert_eq!(parsed.keymap.quit, "ctrl-c");
        assert_eq!(parsed.keymap.undo, "ctrl-z");
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|name| match name {
            "STICKIES_APP_ID" => Some("my-app".to_string()),
            "STICKIES_AI_API_KEY" => Some("k-123".to_string()),
            _ => None,
        });
        assert_eq!(config.store.app_id, "my-app");
        assert_eq!(config.ai.api_key.as_deref(), Some("k-123"));

        config.apply_overrides(|name| (name == "GEMINI_API_KEY").then(|| "  ".to_string()));
        assert_eq!(config.ai.api_key.as_deref(), Some("k-123"));
    }

    #[test]
    fn test_load_creates_default_file_and_resolves_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = load_config(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.store.database_path, dir.path().join("nested").join("stickies.db"));
        assert_eq!(config.logging.directory, dir.path().join("nested").join("logs"));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[store\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}

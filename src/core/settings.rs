use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}. Check JSON syntax.")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write settings: {0}")]
    Write(#[from] std::io::Error),
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Left-hand side -> right-hand side, both in key notation.
pub type MappingTable = BTreeMap<String, String>;

/// Engine settings loaded from ~/.config/vimcode/modes.json
///
/// When adding a field: give it `#[serde(default = "default_...")]`, add the
/// default function and update the `Default` impl. `Settings::load()`
/// rewrites existing files so new fields show up with their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Group everything typed in one insert session into a single undo step.
    #[serde(default = "default_atomic_inserts")]
    pub atomic_inserts: bool,

    /// Auto-indent new lines to match current line's leading whitespace
    #[serde(default = "default_auto_indent")]
    pub auto_indent: bool,

    /// Insert spaces instead of a literal tab character on Tab key press
    #[serde(default = "default_expand_tab")]
    pub expand_tab: bool,

    /// Number of spaces a Tab key inserts (when expand_tab is true)
    #[serde(default = "default_tabstop")]
    pub tabstop: u8,

    #[serde(default = "default_shift_width")]
    pub shift_width: u8,

    /// Let arrow keys through in insert mode. Each one restarts the text
    /// recorded for `.`.
    #[serde(default = "default_allow_arrows_in_insert")]
    pub allow_arrows_in_insert: bool,

    #[serde(default = "default_undo_levels")]
    pub undo_levels: usize,

    /// Key mappings per keymap name (`normal`, `insert`, `visual`).
    #[serde(default)]
    pub mappings: BTreeMap<String, MappingTable>,
}

fn default_atomic_inserts() -> bool {
    true
}

fn default_auto_indent() -> bool {
    true
}

fn default_expand_tab() -> bool {
    true
}

fn default_tabstop() -> u8 {
    4
}

fn default_shift_width() -> u8 {
    4
}

fn default_allow_arrows_in_insert() -> bool {
    false
}

fn default_undo_levels() -> usize {
    1000
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            atomic_inserts: default_atomic_inserts(),
            auto_indent: default_auto_indent(),
            expand_tab: default_expand_tab(),
            tabstop: default_tabstop(),
            shift_width: default_shift_width(),
            allow_arrows_in_insert: default_allow_arrows_in_insert(),
            undo_levels: default_undo_levels(),
            mappings: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from ~/.config/vimcode/modes.json, falling back to
    /// defaults when the file is missing or invalid.
    pub fn load() -> Self {
        Self::load_or_init(&Self::settings_path())
    }

    /// Like [`Self::load_from`], but never fails. The file is rewritten
    /// afterwards so fields added since it was last saved appear with their
    /// defaults.
    pub fn load_or_init(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(settings) => {
                if let Err(e) = settings.save_to(path) {
                    warn!("Failed to update settings file: {e}");
                }
                settings
            }
            Err(e) => {
                warn!("{e}. Using defaults.");
                let defaults = Settings::default();
                if let Err(save_err) = defaults.save_to(path) {
                    warn!("Failed to write default settings: {save_err}");
                }
                defaults
            }
        }
    }

    /// Load settings from an explicit path without touching the file.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Adds a mapping to the keymap called `keymap`.
    pub fn map(&mut self, keymap: &str, lhs: &str, rhs: &str) {
        self.mappings
            .entry(keymap.to_string())
            .or_default()
            .insert(lhs.to_string(), rhs.to_string());
    }

    /// Apply a single vim `:set` argument and update `self` in place.
    ///
    /// Does **not** persist to disk; call [`Self::save`] afterwards.
    ///
    /// Supported forms:
    /// - `option`: enable a boolean option (e.g. `expandtab`)
    /// - `nooption`: disable a boolean option (e.g. `noautoindent`)
    /// - `option?`: query current value; returns display string, no mutation
    /// - `option=N`: set a numeric option (e.g. `tabstop=4`)
    pub fn parse_set_option(&mut self, arg: &str) -> Result<String, String> {
        if let Some(opt) = arg.strip_suffix('?') {
            return self.query_option(opt.trim());
        }

        if let Some(eq_pos) = arg.find('=') {
            let name = arg[..eq_pos].trim();
            let value = arg[eq_pos + 1..].trim();
            self.set_value_option(name, value)?;
            return Ok(format!("{name}={value}"));
        }

        if let Some(opt) = arg.strip_prefix("no") {
            self.set_bool_option(opt, false)?;
            return Ok(format!("no{opt}"));
        }

        self.set_bool_option(arg, true)?;
        Ok(arg.to_string())
    }

    /// One-line summary of all current settings, as `:set` shows it.
    pub fn display_all(&self) -> String {
        let flag = |on: bool, name: &str| {
            if on {
                name.to_string()
            } else {
                format!("no{name}")
            }
        };
        format!(
            "{}  {}  {}  {}  ts={}  sw={}  ul={}",
            flag(self.atomic_inserts, "atomicinsert"),
            flag(self.expand_tab, "expandtab"),
            flag(self.auto_indent, "autoindent"),
            flag(self.allow_arrows_in_insert, "insertarrows"),
            self.tabstop,
            self.shift_width,
            self.undo_levels
        )
    }

    fn set_bool_option(&mut self, opt: &str, enable: bool) -> Result<(), String> {
        match opt {
            "atomicinsert" | "ati" => self.atomic_inserts = enable,
            "expandtab" | "et" => self.expand_tab = enable,
            "autoindent" | "ai" => self.auto_indent = enable,
            "insertarrows" | "ia" => self.allow_arrows_in_insert = enable,
            _ => return Err(format!("Unknown option: {opt}")),
        }
        Ok(())
    }

    fn set_value_option(&mut self, name: &str, value: &str) -> Result<(), String> {
        let invalid = || format!("Invalid value for {name}: '{value}'");
        match name {
            "tabstop" | "ts" => {
                let n: u8 = value.parse().map_err(|_| invalid())?;
                if n == 0 {
                    return Err("tabstop must be greater than 0".to_string());
                }
                self.tabstop = n;
            }
            "shiftwidth" | "sw" => {
                self.shift_width = value.parse().map_err(|_| invalid())?;
            }
            "undolevels" | "ul" => {
                self.undo_levels = value.parse().map_err(|_| invalid())?;
            }
            _ => return Err(format!("Unknown option: {name}")),
        }
        Ok(())
    }

    fn query_option(&self, opt: &str) -> Result<String, String> {
        let flag = |on: bool, name: &str| {
            Ok(if on {
                name.to_string()
            } else {
                format!("no{name}")
            })
        };
        match opt {
            "atomicinsert" | "ati" => flag(self.atomic_inserts, "atomicinsert"),
            "expandtab" | "et" => flag(self.expand_tab, "expandtab"),
            "autoindent" | "ai" => flag(self.auto_indent, "autoindent"),
            "insertarrows" | "ia" => flag(self.allow_arrows_in_insert, "insertarrows"),
            "tabstop" | "ts" => Ok(format!("tabstop={}", self.tabstop)),
            "shiftwidth" | "sw" => Ok(format!("shiftwidth={}", self.shift_width)),
            "undolevels" | "ul" => Ok(format!("undolevels={}", self.undo_levels)),
            _ => Err(format!("Unknown option: {opt}")),
        }
    }

    /// Save settings to ~/.config/vimcode/modes.json
    pub fn save(&self) -> Result<(), SettingsError> {
        self.save_to(&Self::settings_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    fn settings_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".config")
            .join("vimcode")
            .join("modes.json")
    }
}

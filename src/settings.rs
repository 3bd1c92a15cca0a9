// ============================================================================
// EDITOR SETTINGS — persisted knobs, JSON in the platform config directory
// ============================================================================

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::layout::patterns::FillPattern;

/// Persistable editor preferences. Every field carries a serde default so a
/// settings file written by an older build still loads.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Brush footprint in cells (grid mode) or in multiples of the circle
    /// step (layout eraser).
    pub brush_size: u32,
    /// Placed-circle diameter in inches.
    pub circle_size_in: f64,
    /// Extra center gap beyond the diameter, in millimeters.
    pub circle_separation_mm: f64,
    /// Guide trace brightness threshold, 0..1.
    pub sensitivity: f64,
    /// Trace bright regions instead of dark ones.
    pub invert_guide: bool,
    /// Automatic placement strategy for guide fills.
    pub fill_pattern: FillPattern,
    /// Maximum number of undo snapshots kept.
    pub max_undo_steps: usize,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            brush_size: 1,
            circle_size_in: 0.5,
            circle_separation_mm: 12.0,
            sensitivity: 0.20,
            invert_guide: false,
            fill_pattern: FillPattern::Hexagonal,
            max_undo_steps: 50,
        }
    }
}

impl EditorSettings {
    /// Center-to-center minimum spacing between circles, in millimeters.
    pub fn step_mm(&self) -> f64 {
        self.circle_diameter_mm() + self.circle_separation_mm
    }

    pub fn circle_diameter_mm(&self) -> f64 {
        self.circle_size_in * crate::layout::INCH_TO_MM
    }

    /// Path to the settings file.
    /// Linux:   `$XDG_CONFIG_HOME/dotboard/dotboard_settings.json` (or `~/.config`)
    /// macOS:   `~/Library/Application Support/dotboard/dotboard_settings.json`
    /// Windows: `%APPDATA%\dotboard\dotboard_settings.json`
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        let base = std::env::var("APPDATA").ok().map(PathBuf::from);
        #[cfg(target_os = "macos")]
        let base = std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library").join("Application Support"));
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        let base = std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")));

        let dir = base?.join("dotboard");
        let _ = std::fs::create_dir_all(&dir);
        Some(dir.join("dotboard_settings.json"))
    }

    /// Load saved settings, falling back to defaults on any failure.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                crate::log_warn!("settings file unreadable, using defaults: {}", e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Persist to the settings path. Best-effort.
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else {
            return;
        };
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    crate::log_warn!("could not write settings: {}", e);
                }
            }
            Err(e) => crate::log_err!("could not serialize settings: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_derivation() {
        let settings = EditorSettings::default();
        // 0.5 in → 12.7 mm diameter, + 12 mm separation.
        assert!((settings.circle_diameter_mm() - 12.7).abs() < 1e-9);
        assert!((settings.step_mm() - 24.7).abs() < 1e-9);
    }

    #[test]
    fn test_partial_settings_json_loads() {
        let parsed: EditorSettings =
            serde_json::from_str(r#"{ "brush_size": 3 }"#).unwrap();
        assert_eq!(parsed.brush_size, 3);
        assert_eq!(parsed.max_undo_steps, 50);
    }
}

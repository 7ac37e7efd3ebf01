//! user-facing settings for polytrace.
//! persisted as JSON; every field falls back to its default when missing.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{TraceError, TraceResult};
use crate::raster::RasterBuffer;
use crate::render::CpuRenderer;
use crate::search_config::SearchConfig;
use crate::shape::ShapeKind;

/// starting canvas color
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Fill {
    /// average of the target's border pixels
    #[default]
    Auto,
    Rgb([u8; 3]),
}

impl Fill {
    pub fn resolve(self, target: &RasterBuffer) -> [u8; 3] {
        match self {
            Fill::Auto => target.border_average(),
            Fill::Rgb(rgb) => rgb,
        }
    }
}

fn parse_hex(s: &str) -> Option<[u8; 3]> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

fn parse_rgb_fn(s: &str) -> Option<[u8; 3]> {
    let inner = s.strip_prefix("rgb(")?.strip_suffix(')')?;
    let mut parts = inner.split(',').map(|p| p.trim().parse::<u8>().ok());
    let rgb = [parts.next()??, parts.next()??, parts.next()??];
    parts.next().is_none().then_some(rgb)
}

impl FromStr for Fill {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "auto" {
            return Ok(Fill::Auto);
        }
        parse_hex(&s)
            .or_else(|| parse_rgb_fn(&s))
            .map(Fill::Rgb)
            .ok_or_else(|| {
                TraceError::configuration(format!(
                    "invalid fill '{s}' (expected auto, #rrggbb or rgb(r, g, b))"
                ))
            })
    }
}

impl TryFrom<String> for Fill {
    type Error = TraceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fill> for String {
    fn from(fill: Fill) -> Self {
        fill.to_string()
    }
}

impl fmt::Display for Fill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fill::Auto => f.write_str("auto"),
            Fill::Rgb([r, g, b]) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// longer side of the working image, in pixels
    pub compute_size: u32,
    /// longer side of the rendered output, in pixels
    pub view_size: u32,

    pub steps: u64,
    /// candidates sampled per round
    pub shapes: usize,
    pub alpha: f32,
    /// failed mutations tolerated before a refinement stops
    pub mutations: usize,
    pub mutate_alpha: bool,
    pub shape_types: Vec<ShapeKind>,
    pub fill: Fill,
    pub seed: u64,

    pub antialiasing: bool,
    /// None = strict in debug builds only
    pub strict_consistency: Option<bool>,
}

impl Default for Settings {
    fn default() -> Self {
        let search = SearchConfig::default();
        Self {
            compute_size: 100,
            view_size: 275,
            steps: search.rounds,
            shapes: search.breadth,
            alpha: search.alpha,
            mutations: search.patience,
            mutate_alpha: search.mutate_alpha,
            shape_types: search.shape_kinds,
            fill: Fill::Auto,
            seed: search.seed,
            antialiasing: true,
            strict_consistency: None,
        }
    }
}

impl Settings {
    /// load settings from a JSON file, or return defaults if it doesn't exist or doesn't parse
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to parse settings, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> TraceResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// engine view of these settings, validated
    pub fn to_search_config(&self) -> TraceResult<SearchConfig> {
        if self.compute_size == 0 || self.view_size == 0 {
            return Err(TraceError::configuration("compute and view sizes must be positive"));
        }
        let mut kinds = Vec::with_capacity(self.shape_types.len());
        for kind in &self.shape_types {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        let cfg = SearchConfig {
            rounds: self.steps,
            breadth: self.shapes,
            patience: self.mutations,
            alpha: self.alpha,
            mutate_alpha: self.mutate_alpha,
            shape_kinds: kinds,
            seed: self.seed,
            strict_consistency: self.strict_consistency.unwrap_or(cfg!(debug_assertions)),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn renderer(&self) -> CpuRenderer {
        CpuRenderer::new(self.antialiasing)
    }
}

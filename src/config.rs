use crate::foundation::{
    core::{LIGHT_GRAY, Rgba8, WHITE},
    error::{StackError, StackResult},
};

pub const DEFAULT_MEMORY_CEILING: u64 = 2 * 1024 * 1024 * 1024;
pub const MEMORY_CEILING_ENV: &str = "IMGSTACK_MEMORY_CEILING";

/// Dashed horizontal rule drawn between adjacent images.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeparatorStyle {
    pub color: Rgba8,
    /// Pixels drawn per dash.
    pub dash_on: u32,
    /// Pixels skipped between dashes.
    pub dash_off: u32,
}

impl Default for SeparatorStyle {
    fn default() -> Self {
        Self {
            color: LIGHT_GRAY,
            dash_on: 5,
            dash_off: 5,
        }
    }
}

impl SeparatorStyle {
    /// Whether column `x` falls on a dash.
    pub fn is_dash(&self, x: u32) -> bool {
        let period = u64::from(self.dash_on) + u64::from(self.dash_off);
        if period == 0 {
            return false;
        }
        u64::from(x) % period < u64::from(self.dash_on)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeConfig {
    /// Upper bound on the estimated canvas size in bytes.
    pub memory_ceiling_bytes: u64,
    pub draw_separator: bool,
    pub background: Rgba8,
    pub separator: SeparatorStyle,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            memory_ceiling_bytes: DEFAULT_MEMORY_CEILING,
            draw_separator: false,
            background: WHITE,
            separator: SeparatorStyle::default(),
        }
    }
}

impl MergeConfig {
    /// Defaults with `IMGSTACK_MEMORY_CEILING` applied when it parses as a positive integer.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(raw) = std::env::var(MEMORY_CEILING_ENV) {
            match parse_ceiling(&raw) {
                Some(v) => cfg.memory_ceiling_bytes = v,
                None => tracing::warn!(
                    value = %raw,
                    "ignoring invalid {MEMORY_CEILING_ENV}, expected a positive byte count"
                ),
            }
        }
        cfg
    }

    pub fn with_separator(mut self, draw: bool) -> Self {
        self.draw_separator = draw;
        self
    }

    pub fn with_memory_ceiling(mut self, bytes: u64) -> Self {
        self.memory_ceiling_bytes = bytes;
        self
    }

    pub fn validate(&self) -> StackResult<()> {
        if self.memory_ceiling_bytes == 0 {
            return Err(StackError::argument("memory ceiling must be non-zero"));
        }
        if self.separator.dash_on == 0 {
            return Err(StackError::argument("separator dash length must be non-zero"));
        }
        Ok(())
    }
}

/// Parse a positive byte count. Accepts an optional `K`/`M`/`G` binary suffix.
pub fn parse_ceiling(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let (digits, scale) = match raw.char_indices().last() {
        Some((i, c)) if c.eq_ignore_ascii_case(&'k') => (&raw[..i], 1u64 << 10),
        Some((i, c)) if c.eq_ignore_ascii_case(&'m') => (&raw[..i], 1u64 << 20),
        Some((i, c)) if c.eq_ignore_ascii_case(&'g') => (&raw[..i], 1u64 << 30),
        _ => (raw, 1),
    };
    digits
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|v| v.checked_mul(scale))
        .filter(|&v| v > 0)
}

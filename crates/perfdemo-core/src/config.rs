//! Runner options, workload sizes and the optional TOML configuration file.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default base count for the scaled profile
pub const DEFAULT_SCALE: u64 = 1_000_000;

/// Upper bound on warm-up invocations per case
const MAX_WARMUP_ITERATIONS: u64 = 1_000;

/// Upper bound on fan-out tasks per invocation
const MAX_TASKS: u64 = 100_000;

/// The scaled profile's warm-up pass runs every size divided by this
const WARMUP_DIVISOR: u64 = 10_000;

/// Sizing profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// Every size derives from one base count; one measured invocation.
    #[default]
    Scaled,
    /// Fixed per-operation sizes; three measured invocations.
    Fixed,
}

impl FromStr for Profile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scaled" => Ok(Self::Scaled),
            "fixed" => Ok(Self::Fixed),
            other => Err(Error::UnknownProfile {
                name: other.to_string(),
            }),
        }
    }
}

impl Profile {
    /// Whether warm-up is a separate pass over reduced sizes rather than
    /// discarded full-size invocations of each case.
    #[must_use]
    pub const fn reduced_warmup(self) -> bool {
        matches!(self, Self::Scaled)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scaled => f.write_str("scaled"),
            Self::Fixed => f.write_str("fixed"),
        }
    }
}

/// How the runner executes each case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    warmup: bool,
    warmup_iterations: u64,
    track_allocations: bool,
}

impl RunnerConfig {
    /// Create a validated runner configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if warm-up is enabled with zero
    /// invocations or more than the allowed maximum.
    pub fn new(warmup: bool, warmup_iterations: u64, track_allocations: bool) -> Result<Self> {
        if warmup && warmup_iterations == 0 {
            return Err(Error::invalid_config(
                "warmup_iterations must be greater than 0 when warm-up is enabled",
            ));
        }
        if warmup_iterations > MAX_WARMUP_ITERATIONS {
            return Err(Error::invalid_config(format!(
                "warmup_iterations {warmup_iterations} exceeds maximum {MAX_WARMUP_ITERATIONS}"
            )));
        }
        Ok(Self {
            warmup,
            warmup_iterations,
            track_allocations,
        })
    }

    /// Enable or disable the warm-up pass.
    #[must_use]
    pub const fn with_warmup(mut self, warmup: bool) -> Self {
        self.warmup = warmup;
        self
    }

    /// Enable or disable allocation tracking.
    #[must_use]
    pub const fn with_allocation_tracking(mut self, track: bool) -> Self {
        self.track_allocations = track;
        self
    }

    #[must_use]
    pub const fn warmup(&self) -> bool {
        self.warmup
    }

    /// Warm-up invocations per case; zero when warm-up is disabled.
    #[must_use]
    pub const fn warmup_iterations(&self) -> u64 {
        if self.warmup { self.warmup_iterations } else { 0 }
    }

    #[must_use]
    pub const fn track_allocations(&self) -> bool {
        self.track_allocations
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            warmup: true,
            warmup_iterations: 1,
            track_allocations: true,
        }
    }
}

/// Per-operation sizes for the standard catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadSizes {
    pub string_concat: u64,
    pub list_items: u64,
    pub dictionary_entries: u64,
    /// Keys pre-populated by the lookup case's setup
    pub lookup_keys: u64,
    pub filter_items: u64,
    pub filter_passes: u64,
    pub sort_len: u64,
    pub scan_passes: u64,
    pub task_count: u64,
    pub regex_passes: u64,
    /// Measured invocations per case
    pub iterations: u64,
}

impl WorkloadSizes {
    /// Sizes derived from one base count: `base`, `base / 10`, `base / 100`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use perfdemo_core::WorkloadSizes;
    /// let sizes = WorkloadSizes::scaled(1_000_000);
    /// assert_eq!(sizes.dictionary_entries, 100_000);
    /// assert_eq!(sizes.filter_items, 10_000);
    /// assert_eq!(sizes.iterations, 1);
    /// ```
    #[must_use]
    pub fn scaled(base: u64) -> Self {
        let base = base.max(100);
        Self {
            string_concat: base,
            list_items: base,
            dictionary_entries: base / 10,
            lookup_keys: base / 10,
            filter_items: base / 100,
            filter_passes: 100,
            sort_len: base,
            scan_passes: base / 100,
            task_count: 100,
            regex_passes: base / 100,
            iterations: 1,
        }
    }

    /// Fixed per-operation sizes with three measured invocations.
    #[must_use]
    pub const fn fixed() -> Self {
        Self {
            string_concat: 1_000,
            list_items: 10_000,
            dictionary_entries: 1_000,
            lookup_keys: 100_000,
            filter_items: 10_000,
            filter_passes: 1,
            sort_len: 10_000,
            scan_passes: 100,
            task_count: 100,
            regex_passes: 100,
            iterations: 3,
        }
    }

    /// Sizes for a profile, with `scale` applied to the scaled profile.
    #[must_use]
    pub fn for_profile(profile: Profile, scale: u64) -> Self {
        match profile {
            Profile::Scaled => Self::scaled(scale),
            Profile::Fixed => Self::fixed(),
        }
    }

    /// Sizes for the reduced warm-up pass: every count divided by 10,000
    /// (rounded up), one invocation per case.
    ///
    /// # Examples
    ///
    /// ```
    /// # use perfdemo_core::WorkloadSizes;
    /// let warmup = WorkloadSizes::scaled(1_000_000).warmup();
    /// assert_eq!(warmup.string_concat, 100);
    /// assert_eq!(warmup.sort_len, 100);
    /// assert!(warmup.validate().is_ok());
    /// ```
    #[must_use]
    pub const fn warmup(&self) -> Self {
        Self {
            string_concat: self.string_concat.div_ceil(WARMUP_DIVISOR),
            list_items: self.list_items.div_ceil(WARMUP_DIVISOR),
            dictionary_entries: self.dictionary_entries.div_ceil(WARMUP_DIVISOR),
            lookup_keys: self.lookup_keys.div_ceil(WARMUP_DIVISOR),
            filter_items: self.filter_items.div_ceil(WARMUP_DIVISOR),
            filter_passes: self.filter_passes.div_ceil(WARMUP_DIVISOR),
            sort_len: max_u64(self.sort_len.div_ceil(WARMUP_DIVISOR), 2),
            scan_passes: self.scan_passes.div_ceil(WARMUP_DIVISOR),
            task_count: self.task_count.div_ceil(WARMUP_DIVISOR),
            regex_passes: self.regex_passes.div_ceil(WARMUP_DIVISOR),
            iterations: 1,
        }
    }

    /// Check every size is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("string_concat", self.string_concat),
            ("list_items", self.list_items),
            ("dictionary_entries", self.dictionary_entries),
            ("lookup_keys", self.lookup_keys),
            ("filter_items", self.filter_items),
            ("filter_passes", self.filter_passes),
            ("scan_passes", self.scan_passes),
            ("task_count", self.task_count),
            ("regex_passes", self.regex_passes),
            ("iterations", self.iterations),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(Error::invalid_config(format!(
                "{field} must be greater than 0"
            )));
        }
        if self.sort_len < 2 {
            return Err(Error::invalid_config("sort_len must be at least 2"));
        }
        if self.task_count > MAX_TASKS {
            return Err(Error::invalid_config(format!(
                "task_count {} exceeds maximum {MAX_TASKS}",
                self.task_count
            )));
        }
        Ok(())
    }

    fn apply(&mut self, overrides: &SizeOverrides) {
        let fields = [
            (&mut self.string_concat, overrides.string_concat),
            (&mut self.list_items, overrides.list_items),
            (&mut self.dictionary_entries, overrides.dictionary_entries),
            (&mut self.lookup_keys, overrides.lookup_keys),
            (&mut self.filter_items, overrides.filter_items),
            (&mut self.filter_passes, overrides.filter_passes),
            (&mut self.sort_len, overrides.sort_len),
            (&mut self.scan_passes, overrides.scan_passes),
            (&mut self.task_count, overrides.task_count),
            (&mut self.regex_passes, overrides.regex_passes),
            (&mut self.iterations, overrides.iterations),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                *field = value;
            }
        }
    }
}

const fn max_u64(a: u64, b: u64) -> u64 {
    if a > b { a } else { b }
}

impl Default for WorkloadSizes {
    fn default() -> Self {
        Self::scaled(DEFAULT_SCALE)
    }
}

/// Optional per-field overrides from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizeOverrides {
    pub string_concat: Option<u64>,
    pub list_items: Option<u64>,
    pub dictionary_entries: Option<u64>,
    pub lookup_keys: Option<u64>,
    pub filter_items: Option<u64>,
    pub filter_passes: Option<u64>,
    pub sort_len: Option<u64>,
    pub scan_passes: Option<u64>,
    pub task_count: Option<u64>,
    pub regex_passes: Option<u64>,
    pub iterations: Option<u64>,
}

/// Contents of a `perfdemo.toml` file. Every field is optional.
///
/// ```toml
/// profile = "fixed"
/// warmup = true
/// warmup_iterations = 2
/// track_allocations = false
///
/// [sizes]
/// task_count = 10
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    pub profile: Option<Profile>,
    pub scale: Option<u64>,
    pub warmup: Option<bool>,
    pub warmup_iterations: Option<u64>,
    pub track_allocations: Option<bool>,
    pub sizes: SizeOverrides,
}

impl BenchConfig {
    /// Parse a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TomlParseFailed`] on malformed TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::TomlParseFailed {
            reason: e.to_string(),
        })
    }

    /// Read and parse a config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigReadFailed`] if the file cannot be read, or a
    /// parse error as in [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config_read_failed(path, e.to_string()))?;
        Self::from_toml_str(&text)
    }

    /// Layer `other` on top of `self`: fields set in `other` win.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        let sizes = SizeOverrides {
            string_concat: other.sizes.string_concat.or(self.sizes.string_concat),
            list_items: other.sizes.list_items.or(self.sizes.list_items),
            dictionary_entries: other
                .sizes
                .dictionary_entries
                .or(self.sizes.dictionary_entries),
            lookup_keys: other.sizes.lookup_keys.or(self.sizes.lookup_keys),
            filter_items: other.sizes.filter_items.or(self.sizes.filter_items),
            filter_passes: other.sizes.filter_passes.or(self.sizes.filter_passes),
            sort_len: other.sizes.sort_len.or(self.sizes.sort_len),
            scan_passes: other.sizes.scan_passes.or(self.sizes.scan_passes),
            task_count: other.sizes.task_count.or(self.sizes.task_count),
            regex_passes: other.sizes.regex_passes.or(self.sizes.regex_passes),
            iterations: other.sizes.iterations.or(self.sizes.iterations),
        };
        Self {
            profile: other.profile.or(self.profile),
            scale: other.scale.or(self.scale),
            warmup: other.warmup.or(self.warmup),
            warmup_iterations: other.warmup_iterations.or(self.warmup_iterations),
            track_allocations: other.track_allocations.or(self.track_allocations),
            sizes,
        }
    }

    /// Profile in effect (defaults to [`Profile::Scaled`]).
    #[must_use]
    pub fn effective_profile(&self) -> Profile {
        self.profile.unwrap_or_default()
    }

    /// Resolve into validated runner options and workload sizes.
    ///
    /// `warmup_iterations = 0` turns warm-up off.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the result fails validation.
    pub fn resolve(&self) -> Result<(RunnerConfig, WorkloadSizes)> {
        let defaults = RunnerConfig::default();
        let warmup_iterations = self.warmup_iterations.unwrap_or(defaults.warmup_iterations);
        let runner = RunnerConfig::new(
            self.warmup.unwrap_or(defaults.warmup) && warmup_iterations > 0,
            warmup_iterations,
            self.track_allocations
                .unwrap_or(defaults.track_allocations),
        )?;

        let scale = self.scale.unwrap_or(DEFAULT_SCALE);
        if scale == 0 {
            return Err(Error::invalid_config("scale must be greater than 0"));
        }
        let mut sizes = WorkloadSizes::for_profile(self.effective_profile(), scale);
        sizes.apply(&self.sizes);
        sizes.validate()?;

        Ok((runner, sizes))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::arithmetic_side_effects)]

    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_profile_from_str() {
        assert_eq!("fixed".parse::<Profile>().unwrap(), Profile::Fixed);
        assert_eq!(" Scaled ".parse::<Profile>().unwrap(), Profile::Scaled);
        assert!(matches!(
            "turbo".parse::<Profile>(),
            Err(Error::UnknownProfile { .. })
        ));
    }

    #[test]
    fn test_runner_config_validation() {
        assert!(RunnerConfig::new(true, 1, true).is_ok());
        assert!(RunnerConfig::new(false, 0, true).is_ok());
        assert!(matches!(
            RunnerConfig::new(true, 0, true),
            Err(Error::InvalidConfig { .. })
        ));
        assert!(matches!(
            RunnerConfig::new(true, 1_001, true),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_warmup_iterations_zero_when_disabled() {
        let config = RunnerConfig::default().with_warmup(false);
        assert_eq!(config.warmup_iterations(), 0);
    }

    #[test]
    fn test_scaled_sizes_follow_base() {
        let sizes = WorkloadSizes::scaled(1_000_000);
        assert_eq!(sizes.string_concat, 1_000_000);
        assert_eq!(sizes.dictionary_entries, 100_000);
        assert_eq!(sizes.regex_passes, 10_000);
        assert_eq!(sizes.task_count, 100);
        assert!(sizes.validate().is_ok());
    }

    #[test]
    fn test_tiny_scale_stays_valid() {
        assert!(WorkloadSizes::scaled(1).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_and_short_sort() {
        let mut sizes = WorkloadSizes::fixed();
        sizes.task_count = 0;
        assert!(sizes.validate().is_err());

        let mut sizes = WorkloadSizes::fixed();
        sizes.sort_len = 1;
        assert!(sizes.validate().is_err());

        let mut sizes = WorkloadSizes::fixed();
        sizes.task_count = MAX_TASKS + 1;
        assert!(sizes.validate().is_err());
    }

    #[test]
    fn test_toml_overrides_profile() {
        let config = BenchConfig::from_toml_str(
            r#"
            profile = "fixed"
            warmup = false

            [sizes]
            task_count = 10
            iterations = 5
            "#,
        )
        .unwrap();

        let (runner, sizes) = config.resolve().unwrap();
        assert!(!runner.warmup());
        assert_eq!(sizes.task_count, 10);
        assert_eq!(sizes.iterations, 5);
        assert_eq!(sizes.sort_len, 10_000);
    }

    #[test]
    fn test_toml_unknown_key_rejected() {
        assert!(matches!(
            BenchConfig::from_toml_str("warmpu = true"),
            Err(Error::TomlParseFailed { .. })
        ));
    }

    #[test]
    fn test_merge_prefers_later_layer() {
        let file = BenchConfig {
            profile: Some(Profile::Fixed),
            warmup_iterations: Some(3),
            ..BenchConfig::default()
        };
        let flags = BenchConfig {
            warmup_iterations: Some(5),
            ..BenchConfig::default()
        };
        let merged = file.merge(flags);
        assert_eq!(merged.profile, Some(Profile::Fixed));
        assert_eq!(merged.warmup_iterations, Some(5));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "scale = 1000").unwrap();
        let config = BenchConfig::load(file.path()).unwrap();
        let (_, sizes) = config.resolve().unwrap();
        assert_eq!(sizes.list_items, 1000);
        assert_eq!(sizes.filter_items, 10);
    }

    #[test]
    fn test_load_missing_file() {
        let result = BenchConfig::load(Path::new("/nonexistent/perfdemo.toml"));
        assert!(matches!(result, Err(Error::ConfigReadFailed { .. })));
    }

    #[test]
    fn test_zero_warmup_iterations_disables_warmup() {
        let config = BenchConfig {
            warmup_iterations: Some(0),
            ..BenchConfig::default()
        };
        let (runner, _) = config.resolve().unwrap();
        assert!(!runner.warmup());
        assert_eq!(runner.warmup_iterations(), 0);

        let explicit = BenchConfig::from_toml_str("warmup = true\nwarmup_iterations = 0").unwrap();
        assert!(!explicit.resolve().unwrap().0.warmup());
    }

    #[test]
    fn test_warmup_sizes_are_reduced() {
        let full = WorkloadSizes::scaled(DEFAULT_SCALE);
        let warmup = full.warmup();
        assert_eq!(warmup.string_concat, 100);
        assert_eq!(warmup.dictionary_entries, 10);
        assert_eq!(warmup.filter_items, 1);
        assert_eq!(warmup.task_count, 1);
        assert_eq!(warmup.iterations, 1);
        assert!(warmup.validate().is_ok());

        let tiny = WorkloadSizes::scaled(1).warmup();
        assert_eq!(tiny.sort_len, 2);
        assert!(tiny.validate().is_ok());

        assert!(Profile::Scaled.reduced_warmup());
        assert!(!Profile::Fixed.reduced_warmup());
    }

    #[test]
    fn test_zero_scale_rejected() {
        let config = BenchConfig {
            scale: Some(0),
            ..BenchConfig::default()
        };
        assert!(config.resolve().is_err());
    }
}

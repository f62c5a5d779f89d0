use std::str::FromStr;

pub const DEFAULT_FIELD_COMPLEXITY: usize = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid complexity configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Settings of the complexity analyzer, usually read from the `[complexity]`
/// table of a TOML configuration file.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryComplexityConfig {
    /// Complexity of a field without a declared cost, or with a declared cost
    /// that leaves the complexity unset.
    pub default_complexity: usize,
    /// Operations folding to a higher complexity are rejected.
    pub max_complexity: Option<usize>,
}

impl Default for QueryComplexityConfig {
    fn default() -> Self {
        QueryComplexityConfig {
            default_complexity: DEFAULT_FIELD_COMPLEXITY,
            max_complexity: None,
        }
    }
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    complexity: QueryComplexityConfig,
}

impl QueryComplexityConfig {
    /// Reads the `[complexity]` table of a TOML document. Other tables are ignored.
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str::<ConfigFile>(input)?.complexity)
    }
}

impl FromStr for QueryComplexityConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_toml(s)
    }
}

/// The complexity analyzer attached to a [`crate::Schema`].
///
/// Its settings are fixed at construction and shared by every validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryComplexity {
    default_complexity: usize,
    max_complexity: usize,
}

impl QueryComplexity {
    pub fn new(max_complexity: usize) -> Self {
        QueryComplexity {
            default_complexity: DEFAULT_FIELD_COMPLEXITY,
            max_complexity,
        }
    }

    #[must_use]
    pub fn with_default_complexity(mut self, default_complexity: usize) -> Self {
        self.default_complexity = default_complexity;
        self
    }

    pub fn default_complexity(&self) -> usize {
        self.default_complexity
    }

    pub fn max_complexity(&self) -> usize {
        self.max_complexity
    }
}

impl From<&QueryComplexityConfig> for QueryComplexity {
    fn from(config: &QueryComplexityConfig) -> Self {
        let max_complexity = config.max_complexity.unwrap_or_else(|| {
            tracing::warn!("Query complexity analysis enabled without a max_complexity, no operation will be rejected");
            usize::MAX
        });

        QueryComplexity::new(max_complexity).with_default_complexity(config.default_complexity)
    }
}

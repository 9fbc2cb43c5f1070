use std::fmt;

/// Import map validation error
///
/// Returned by [`ImportMap::validate`](super::ImportMap::validate) and by the
/// loaders when a map violates the import map shape rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportMapError {
    /// A specifier key was the empty string
    EmptyKey {
        /// Scope the key belongs to, `None` for top-level `imports`
        scope: Option<String>,
    },
    /// A prefix key (ending in `/`) maps to a target without a trailing `/`
    InvalidPrefixTarget {
        /// The offending key
        key: String,
        /// Its target
        target: String,
    },
    /// A scope key was empty
    EmptyScope,
}

impl fmt::Display for ImportMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMapError::EmptyKey { scope: None } => {
                write!(f, "import map error: empty specifier key in \"imports\"")
            }
            ImportMapError::EmptyKey { scope: Some(scope) } => {
                write!(f, "import map error: empty specifier key in scope '{scope}'")
            }
            ImportMapError::InvalidPrefixTarget { key, target } => {
                write!(
                    f,
                    "import map error: prefix key '{key}' must map to a target ending in '/', got '{target}'"
                )
            }
            ImportMapError::EmptyScope => write!(f, "import map error: empty scope key"),
        }
    }
}

impl std::error::Error for ImportMapError {}

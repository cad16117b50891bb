/// Result alias that carries the custom [`RhythmError`] type.
pub type Result<T> = std::result::Result<T, RhythmError>;

/// Common error type for the core crate.
///
/// Only configuration problems end up here. A missed beat, a collision or a
/// hit outside every window are ordinary run outcomes and are reported
/// through [`crate::RunState`] instead.
#[derive(Debug, thiserror::Error)]
pub enum RhythmError {
    /// The level selector matched neither a slug, an index nor a name.
    #[error("level not found: {selector}")]
    LevelNotFound { selector: String },
    /// A level definition breaks one of the pattern invariants.
    #[error("invalid level `{slug}`: {reason}")]
    InvalidLevel { slug: String, reason: String },
    /// Two catalog entries share the same slug.
    #[error("duplicate level slug `{0}`")]
    DuplicateSlug(String),
    /// Engine configuration values that cannot describe a playable world.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed level catalog or configuration document.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl RhythmError {
    pub(crate) fn invalid_level(slug: &str, reason: impl Into<String>) -> Self {
        Self::InvalidLevel {
            slug: slug.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let err = RhythmError::LevelNotFound {
            selector: "tango".to_string(),
        };
        assert_eq!(err.to_string(), "level not found: tango");

        let err = RhythmError::invalid_level("zamba_6_8", "tempo must be positive");
        assert_eq!(
            err.to_string(),
            "invalid level `zamba_6_8`: tempo must be positive"
        );
    }

    #[test]
    fn json_errors_convert_with_question_mark() {
        fn parse(input: &str) -> Result<Vec<f64>> {
            Ok(serde_json::from_str(input)?)
        }
        assert!(matches!(parse("[1.0,"), Err(RhythmError::Json(_))));
    }
}

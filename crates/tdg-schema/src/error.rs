//! Error types for schema resolution

/// Raised when a document cannot be normalized into endpoints.
///
/// Resolution errors are fatal for the request that triggered them.
#[derive(Debug, thiserror::Error)]
pub enum SchemaResolutionError {
    /// A `$ref` pointer does not locate anything in the document
    #[error("unresolved reference: {pointer}")]
    UnresolvedRef {
        /// The pointer as written in the document
        pointer: String,
    },

    /// A `$ref` that points outside the document
    #[error("unsupported reference '{reference}': only document-local pointers are resolved")]
    UnsupportedRef {
        /// The offending reference
        reference: String,
    },

    /// Structural problem in the document itself
    #[error("malformed document at {location}: {reason}")]
    MalformedDocument {
        /// Where the problem was found
        location: String,
        /// What is wrong
        reason: String,
    },

    /// A schema object that does not fit the schema model
    #[error("malformed schema at {location}: {source}")]
    MalformedSchema {
        /// Where the schema was found
        location: String,
        /// Underlying deserialization error
        #[source]
        source: serde_json::Error,
    },
}

impl SchemaResolutionError {
    /// Shorthand for [`SchemaResolutionError::MalformedDocument`]
    #[must_use]
    pub fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error came from a `$ref`
    #[inline]
    #[must_use]
    pub fn is_reference_error(&self) -> bool {
        matches!(self, Self::UnresolvedRef { .. } | Self::UnsupportedRef { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_classification() {
        let err = SchemaResolutionError::UnresolvedRef {
            pointer: "#/components/schemas/Missing".into(),
        };
        assert!(err.is_reference_error());
        assert!(err.to_string().contains("Missing"));

        let err = SchemaResolutionError::malformed("paths", "expected an object");
        assert!(!err.is_reference_error());
        assert_eq!(
            err.to_string(),
            "malformed document at paths: expected an object"
        );
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Error returned when a sketch or tracker is constructed with invalid parameters.
///
/// Raised for a zero width, depth or `k`, and for a decay base that is not a finite
/// number greater than one.
#[ohno::error]
#[display("invalid hot-key detector parameter: {parameter}")]
pub struct ConfigError {
    parameter: &'static str,
}

impl ConfigError {
    /// Creates a configuration error for the named parameter.
    #[must_use]
    pub fn for_parameter(parameter: &'static str) -> Self {
        Self::new(parameter)
    }

    /// Name of the parameter that failed validation.
    #[must_use]
    pub fn parameter(&self) -> &'static str {
        self.parameter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_parameter() {
        let error = ConfigError::for_parameter("width");
        assert_eq!(error.parameter(), "width");
        assert!(error.to_string().contains("width"));
    }
}

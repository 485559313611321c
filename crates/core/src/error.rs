/// Result alias that carries the custom [`InductionError`] type.
pub type Result<T> = std::result::Result<T, InductionError>;

/// Coarse classification of an [`InductionError`], used by callers that only
/// care about which channel degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    AudioBackend,
    CueResourceMissing,
    RenderSurface,
    Io,
}

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum InductionError {
    /// Out-of-range or structurally invalid parameters. Raised synchronously
    /// and never applied, so the previous valid state stays in effect.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// The audio device or graph failed. Audio is silenced, visuals continue.
    #[error("audio backend failure: {0}")]
    AudioBackend(String),
    /// A cue referenced a sample or text resource that does not exist.
    #[error("cue resource missing: {0}")]
    CueResourceMissing(String),
    /// The render surface failed to present a frame.
    #[error("render surface failure: {0}")]
    RenderSurface(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Fft(#[from] realfft::FftError),
}

impl InductionError {
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn audio<T: Into<String>>(msg: T) -> Self {
        Self::AudioBackend(msg.into())
    }

    pub fn cue_missing<T: Into<String>>(msg: T) -> Self {
        Self::CueResourceMissing(msg.into())
    }

    pub fn surface<T: Into<String>>(msg: T) -> Self {
        Self::RenderSurface(msg.into())
    }

    /// Returns the taxonomy bucket this error belongs to. Serialisation and
    /// FFT failures only occur while handling configuration or offline
    /// analysis input, so they are reported as configuration problems.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::Json(_) | Self::Fft(_) => ErrorKind::Configuration,
            Self::AudioBackend(_) => ErrorKind::AudioBackend,
            Self::CueResourceMissing(_) => ErrorKind::CueResourceMissing,
            Self::RenderSurface(_) => ErrorKind::RenderSurface,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_variant() {
        assert_eq!(InductionError::config("x").kind(), ErrorKind::Configuration);
        assert_eq!(InductionError::audio("x").kind(), ErrorKind::AudioBackend);
        assert_eq!(InductionError::cue_missing("x").kind(), ErrorKind::CueResourceMissing);
        assert_eq!(InductionError::surface("x").kind(), ErrorKind::RenderSurface);
    }

    #[test]
    fn messages_carry_the_payload() {
        let err = InductionError::config("base frequency 5000 Hz outside [100, 1000]");
        assert!(format!("{err}").contains("5000"));
    }
}

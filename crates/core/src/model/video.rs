use std::fmt;
use thiserror::Error;
use url::Url;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VideoUrlError {
    #[error("video URL cannot be empty")]
    Empty,

    #[error("video URL is not a valid absolute URL: {0}")]
    Invalid(String),

    #[error("video URL must use http or https, got {0}")]
    UnsupportedScheme(String),
}

//
// ─── VIDEO URL ─────────────────────────────────────────────────────────────────
//

/// Validated location of a lesson's video.
///
/// The domain only guarantees the value is an absolute http(s) URL; how the
/// video gets delivered or embedded is the presentation layer's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoUrl(Url);

impl VideoUrl {
    /// Parses and validates a video URL.
    ///
    /// # Errors
    ///
    /// Returns `VideoUrlError` if the value is empty, not an absolute URL, or
    /// uses a scheme other than http/https.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, VideoUrlError> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(VideoUrlError::Empty);
        }
        let url = Url::parse(raw).map_err(|_| VideoUrlError::Invalid(raw.to_owned()))?;
        match url.scheme() {
            "http" | "https" => Ok(Self(url)),
            other => Err(VideoUrlError::UnsupportedScheme(other.to_owned())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for VideoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_https_url() {
        let url = VideoUrl::parse("https://videos.example.com/intro.mp4").unwrap();
        assert_eq!(url.as_str(), "https://videos.example.com/intro.mp4");
    }

    #[test]
    fn parse_trims_whitespace() {
        let url = VideoUrl::parse("  https://videos.example.com/intro.mp4  ").unwrap();
        assert_eq!(url.as_str(), "https://videos.example.com/intro.mp4");
    }

    #[test]
    fn parse_rejects_empty() {
        assert_eq!(VideoUrl::parse("   ").unwrap_err(), VideoUrlError::Empty);
    }

    #[test]
    fn parse_rejects_relative_path() {
        let err = VideoUrl::parse("videos/intro.mp4").unwrap_err();
        assert!(matches!(err, VideoUrlError::Invalid(_)));
    }

    #[test]
    fn parse_rejects_non_http_scheme() {
        let err = VideoUrl::parse("ftp://example.com/intro.mp4").unwrap_err();
        assert_eq!(err, VideoUrlError::UnsupportedScheme("ftp".into()));
    }
}

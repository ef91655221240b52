use thiserror::Error;
use url::Url;

/// Why an entry link was not handed to the browser.
#[derive(Error, Debug, PartialEq)]
pub enum LinkError {
    #[error("Invalid link: {0}")]
    Invalid(#[from] url::ParseError),
    #[error("Refusing to open {0} link")]
    UnsupportedScheme(String),
}

/// Check an entry link before launching it with the system opener.
///
/// Relative links resolve against `base` (the API root) when one is known.
/// Only `http` and `https` targets are opened; `file:`, `javascript:` and
/// custom schemes are rejected.
pub fn validate_link(raw: &str, base: Option<&Url>) -> Result<Url, LinkError> {
    let raw = raw.trim();
    let url = match (Url::parse(raw), base) {
        (Ok(url), _) => url,
        (Err(url::ParseError::RelativeUrlWithoutBase), Some(base)) => base.join(raw)?,
        (Err(e), _) => return Err(e.into()),
    };

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LinkError::UnsupportedScheme(other.to_string())),
    }
}

use thiserror::Error;

/// Failures inside the crawl. Every variant is recoverable at page or table
/// scope; the pipeline logs it and moves on.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out after {secs}s waiting for `{selector}` on {url}")]
    WaitTimeout {
        url: String,
        selector: String,
        secs: u64,
    },

    #[error("no priced table found on {url}")]
    TableNotFound { url: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid selector `{0}`")]
    Selector(String),
}

impl ScrapeError {
    pub fn navigation(url: &str, reason: impl ToString) -> Self {
        Self::Navigation {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

/// Failures of the prediction service. These are turned into `{ "error": … }`
/// payloads at the HTTP boundary instead of crossing it as faults.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("unknown {field} value `{value}`")]
    UnknownCategory { field: &'static str, value: String },

    #[error("model artifact not loaded: {0}")]
    ArtifactMissing(String),

    #[error("artifact {path}: {reason}")]
    Artifact { path: String, reason: String },

    #[error("model error: {0}")]
    Model(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_message_names_url() {
        let e = ScrapeError::navigation("https://example.org/x", "HTTP 503");
        assert_eq!(
            e.to_string(),
            "navigation to https://example.org/x failed: HTTP 503"
        );
    }

    #[test]
    fn unknown_category_message() {
        let e = PredictError::UnknownCategory {
            field: "city",
            value: "Атлантида".into(),
        };
        assert_eq!(e.to_string(), "unknown city value `Атлантида`");
    }
}

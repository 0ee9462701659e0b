use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Short user-facing failure message, ready for the UI's notice area.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorNotice {
    pub title: String,
    pub message: String,
    pub hint: String,
}

impl ErrorNotice {
    pub fn from_error(e: &Error) -> Self {
        match e {
            Error::Api { status, message } => Self::from_api(*status, message),
            Error::Http(e) => Self {
                title: "Network Error".into(),
                message: truncate(&e.to_string(), 80),
                hint: "Check your connection".into(),
            },
            other => Self {
                title: "Error".into(),
                message: truncate(&other.to_string(), 80),
                hint: "Your changes may not have been saved".into(),
            },
        }
    }

    fn from_api(status: u16, body: &str) -> Self {
        let extracted_message = extract_json_message(body);

        match status {
            401 => Self {
                title: "Unauthorized".into(),
                message: "Invalid API token".into(),
                hint: "Check your config.toml".into(),
            },
            404 => Self {
                title: "Not Found".into(),
                message: extracted_message.unwrap_or_else(|| "Page or block not found".into()),
                hint: "It may have been deleted elsewhere".into(),
            },
            429 => Self {
                title: "Rate Limited".into(),
                message: extracted_message.unwrap_or_else(|| "Too many requests".into()),
                hint: "Wait a moment and try again".into(),
            },
            500 => Self {
                title: "Server Error".into(),
                message: "The notes server returned an error".into(),
                hint: "Try again later".into(),
            },
            _ => Self {
                title: format!("API Error ({})", status),
                message: extracted_message.unwrap_or_else(|| truncate(body, 200)),
                hint: "Reload the page to re-sync".into(),
            },
        }
    }
}

fn extract_json_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message")?.as_str().map(String::from))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
        })
    }
}

/// A single field-level complaint inside a [`Problem`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProblemItem {
    pub name: String,
    pub description: String,
}

/// `application/problem+json` body returned by the gateway on rejected requests.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Problem {
    #[serde(rename = "type", default)]
    pub problem_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub problems: Vec<ProblemItem>,
}

impl Problem {
    /// Human readable summary: detail, falling back to title, plus each field problem.
    pub fn summary(&self) -> String {
        let mut summary = self
            .detail
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_default();
        for item in &self.problems {
            if !summary.is_empty() {
                summary.push_str("; ");
            }
            summary.push_str(&format!("{}: {}", item.name, item.description));
        }
        summary
    }
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Gateway transport error: {0}")]
    Transport(String),
    #[error("Gateway responded with HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        problem: Option<Problem>,
    },
    #[error("Unexpected gateway response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GatewayError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn problem(&self) -> Option<&Problem> {
        match self {
            GatewayError::Http { problem, .. } => problem.as_ref(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::InvalidResponse(err.to_string())
    }
}

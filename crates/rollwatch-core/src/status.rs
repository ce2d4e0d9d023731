use serde::{Deserialize, Serialize};
use std::fmt;

pub mod icons {
    pub const ROLLOUT: &str = "⟳";
    pub const REVISION: &str = "#";
    pub const REPLICA_SET: &str = "⧉";
    pub const POD: &str = "□";
    pub const EXPERIMENT: &str = "Σ";
    pub const ANALYSIS: &str = "α";
    pub const JOB: &str = "⊞";

    pub const OK: &str = "✓";
    pub const BAD: &str = "✗";
    pub const UNKNOWN: &str = "?";
    pub const WARNING: &str = "⚠";
    pub const PROGRESSING: &str = "◌";
    pub const WAITING: &str = "◷";
    pub const PAUSED: &str = "॥";
    pub const NEUTRAL: &str = "•";
}

/// Lifecycle label shared by the root resource and every child node.
///
/// Producers are free to emit labels outside the known table; those are kept
/// verbatim in `Other` and render with the unknown icon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Progressing,
    Healthy,
    Successful,
    Running,
    Pending,
    Paused,
    Degraded,
    Failed,
    Error,
    Inconclusive,
    ScaledDown,
    Completed,
    Terminating,
    Unknown,
    Other(String),
}

impl Default for Status {
    fn default() -> Self {
        Self::Unknown
    }
}

impl Status {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.to_lowercase().as_str() {
            "progressing" => Status::Progressing,
            "healthy" => Status::Healthy,
            "successful" | "success" => Status::Successful,
            "running" => Status::Running,
            "pending" => Status::Pending,
            "paused" => Status::Paused,
            "degraded" => Status::Degraded,
            "failed" | "failure" => Status::Failed,
            "error" => Status::Error,
            "inconclusive" => Status::Inconclusive,
            "scaleddown" | "scaled-down" | "scaled_down" => Status::ScaledDown,
            "completed" => Status::Completed,
            "terminating" => Status::Terminating,
            "" | "unknown" => Status::Unknown,
            _ => Status::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Progressing => "Progressing",
            Status::Healthy => "Healthy",
            Status::Successful => "Successful",
            Status::Running => "Running",
            Status::Pending => "Pending",
            Status::Paused => "Paused",
            Status::Degraded => "Degraded",
            Status::Failed => "Failed",
            Status::Error => "Error",
            Status::Inconclusive => "Inconclusive",
            Status::ScaledDown => "ScaledDown",
            Status::Completed => "Completed",
            Status::Terminating => "Terminating",
            Status::Unknown => "Unknown",
            Status::Other(label) => label,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Status::Healthy | Status::Successful | Status::Completed => icons::OK,
            Status::Failed | Status::Degraded => icons::BAD,
            Status::Error => icons::WARNING,
            Status::Progressing | Status::Running | Status::Terminating => icons::PROGRESSING,
            Status::Pending => icons::WAITING,
            Status::Paused => icons::PAUSED,
            Status::ScaledDown => icons::NEUTRAL,
            Status::Inconclusive | Status::Unknown | Status::Other(_) => icons::UNKNOWN,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Status {
    fn from(value: &str) -> Self {
        Status::parse(value)
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        Status::parse(&value)
    }
}

impl From<Status> for String {
    fn from(value: Status) -> Self {
        value.as_str().to_string()
    }
}

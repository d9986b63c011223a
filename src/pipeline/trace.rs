//! Per-request milestone log returned to the caller

use serde::Serialize;

/// Append-only list of human-readable progress markers.
///
/// Every entry is mirrored to the `tracing` log so the returned trace and the
/// server log tell the same story.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PipelineTrace {
    milestones: Vec<String>,
}

impl PipelineTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, milestone: impl Into<String>) {
        let milestone = milestone.into();
        tracing::info!(milestone = %milestone);
        self.milestones.push(milestone);
    }

    pub fn milestones(&self) -> &[String] {
        &self.milestones
    }

    pub fn into_milestones(self) -> Vec<String> {
        self.milestones
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_keeps_order() {
        let mut trace = PipelineTrace::new();
        trace.push("first");
        trace.push(String::from("second"));
                assert_eq!(trace.milestones(), &["first".to_string(), "second".to_string()]);
        assert_eq!(
            serde_json::to_value(&trace).unwrap(),
            serde_json::json!(["first", "second"])
        );
    }
}

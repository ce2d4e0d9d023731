pub mod age;
pub mod snapshot;
pub mod status;

pub use snapshot::{
    order_children, AnalysisRunNode, CanaryProgress, ChildNode, ExperimentNode, ImageRef,
    JobNode, Measurement, MetricSeries, NodeKind, ObjectMeta, PodNode, ReplicaCounts,
    ReplicaSetNode, Revision, RootKind, StatusSnapshot, Strategy, Tally,
};
pub use status::{icons, Status};

use thiserror::Error;

pub const TAG_STABLE: &str = "stable";
pub const TAG_CANARY: &str = "canary";
pub const TAG_ACTIVE: &str = "active";
pub const TAG_PREVIEW: &str = "preview";
pub const TAG_PING: &str = "ping";
pub const TAG_PONG: &str = "pong";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid snapshot json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("feed contains no snapshots")]
    Empty,
}

/// Decode a single snapshot document.
pub fn decode_snapshot(input: &str) -> Result<StatusSnapshot, SnapshotError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SnapshotError::Empty);
    }
    Ok(serde_json::from_str(trimmed)?)
}

/// Decode every snapshot in a feed. Documents may be newline-delimited or
/// simply concatenated (pretty-printed documents are accepted).
pub fn decode_feed(input: &str) -> Result<Vec<StatusSnapshot>, SnapshotError> {
    let mut snapshots = Vec::new();
    for item in serde_json::Deserializer::from_str(input).into_iter::<StatusSnapshot>() {
        snapshots.push(item?);
    }
    if snapshots.is_empty() {
        return Err(SnapshotError::Empty);
    }
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLLOUT: &str = r#"{
        "meta": {"name": "guestbook", "namespace": "default", "createdAt": "2026-03-01T11:00:00Z"},
        "status": "Progressing",
        "message": "more replicas need to be updated",
        "strategy": {"type": "Canary", "step": 1, "totalSteps": 3, "setWeight": 20, "actualWeight": 20},
        "replicas": {"desired": 5, "current": 5, "updated": 1, "ready": 5, "available": 5},
        "images": [{"image": "argoproj/rollouts-demo:blue", "tags": ["stable"]}],
        "revisions": [
            {"number": 2, "children": [
                {"kind": "ReplicaSet", "meta": {"name": "guestbook-6c5f"}, "status": "Healthy", "canary": true,
                 "pods": [{"meta": {"name": "guestbook-6c5f-x1"}, "status": "Running", "ready": "1/1"}]},
                {"kind": "AnalysisRun", "meta": {"name": "guestbook-6c5f-2"}, "status": "Failed",
                 "successful": 3, "failed": 1,
                 "jobs": [{"meta": {"name": "guestbook-6c5f-2-job"}, "status": "Failed", "metricName": "smoke"}]}
            ]}
        ],
        "observedAt": "2026-03-01T12:00:00Z"
    }"#;

    #[test]
    fn decodes_rollout_snapshot() {
        let snapshot = decode_snapshot(ROLLOUT).expect("decode");
        assert_eq!(snapshot.kind, RootKind::Rollout);
        assert_eq!(snapshot.meta.name, "guestbook");
        assert_eq!(snapshot.status, Status::Progressing);
        let canary = snapshot.strategy.canary().expect("canary strategy");
        assert_eq!(canary.set_weight, 20);
        assert_eq!(snapshot.replicas.updated, 1);
        assert_eq!(snapshot.revisions.len(), 1);

        let children = &snapshot.revisions[0].children;
        assert_eq!(children.len(), 2);
        match &children[0] {
            ChildNode::ReplicaSet(rs) => {
                assert!(rs.canary);
                assert!(!rs.stable);
                assert_eq!(rs.pods[0].ready, "1/1");
            }
            other => panic!("unexpected child: {other:?}"),
        }
        match &children[1] {
            ChildNode::AnalysisRun(run) => {
                assert_eq!(run.tally.successful, 3);
                assert_eq!(run.tally.failed, 1);
                assert_eq!(run.jobs[0].metric_name.as_deref(), Some("smoke"));
            }
            other => panic!("unexpected child: {other:?}"),
        }
        assert_eq!(snapshot.age_of(&snapshot.meta), "60m");
    }

    #[test]
    fn missing_optional_sections_fall_back_to_defaults() {
        let snapshot = decode_snapshot(r#"{"meta": {"name": "bare"}}"#).expect("decode");
        assert_eq!(snapshot.status, Status::Unknown);
        assert_eq!(snapshot.strategy, Strategy::Unknown);
        assert!(snapshot.revisions.is_empty());
        assert!(snapshot.tally.is_empty());
    }

    #[test]
    fn unknown_strategy_type_is_tolerated() {
        let snapshot = decode_snapshot(r#"{"meta": {"name": "x"}, "strategy": {"type": "Rolling"}}"#)
            .expect("decode");
        assert_eq!(snapshot.strategy, Strategy::Unknown);
    }

    #[test]
    fn feed_accepts_ndjson_and_pretty_documents() {
        let feed = format!(
            "{}\n{}\n{ROLLOUT}\n",
            r#"{"meta": {"name": "a"}, "status": "Paused"}"#,
            r#"{"meta": {"name": "b"}, "status": "Healthy"}"#
        );
        let snapshots = decode_feed(&feed).expect("decode feed");
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0].status, Status::Paused);
        assert_eq!(snapshots[2].meta.name, "guestbook");
    }

    #[test]
    fn empty_feed_is_an_error() {
        assert!(matches!(decode_feed("   \n"), Err(SnapshotError::Empty)));
        assert!(matches!(decode_snapshot(""), Err(SnapshotError::Empty)));
        assert!(matches!(decode_feed("{not json"), Err(SnapshotError::Json(_))));
    }
}

use crate::age;
use crate::status::{icons, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RootKind {
    #[default]
    Rollout,
    AnalysisRun,
}

impl RootKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RootKind::Rollout => "Rollout",
            RootKind::AnalysisRun => "AnalysisRun",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            RootKind::Rollout => icons::ROLLOUT,
            RootKind::AnalysisRun => icons::ANALYSIS,
        }
    }
}

impl fmt::Display for RootKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanaryProgress {
    #[serde(default)]
    pub step: Option<u32>,
    #[serde(default)]
    pub total_steps: Option<u32>,
    #[serde(default)]
    pub set_weight: u32,
    #[serde(default)]
    pub actual_weight: u32,
}

impl CanaryProgress {
    pub fn step_label(&self) -> String {
        match (self.step, self.total_steps) {
            (Some(step), Some(total)) => format!("{step}/{total}"),
            (Some(step), None) => step.to_string(),
            (None, _) => "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Strategy {
    Canary(CanaryProgress),
    BlueGreen,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Canary(_) => "Canary",
            Strategy::BlueGreen => "BlueGreen",
            Strategy::Unknown => "Unknown",
        }
    }

    pub fn canary(&self) -> Option<&CanaryProgress> {
        match self {
            Strategy::Canary(progress) => Some(progress),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaCounts {
    #[serde(default)]
    pub desired: u32,
    #[serde(default)]
    pub current: u32,
    #[serde(default)]
    pub updated: u32,
    #[serde(default)]
    pub ready: u32,
    #[serde(default)]
    pub available: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub image: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Sub-result counts of an analysis. They need not add up to the number of
/// jobs or measurements; in-flight results are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    #[serde(default)]
    pub successful: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub inconclusive: u32,
    #[serde(default)]
    pub error: u32,
}

impl Tally {
    pub fn is_empty(&self) -> bool {
        self.successful == 0 && self.failed == 0 && self.inconclusive == 0 && self.error == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub metric_name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSeries<'a> {
    pub metric_name: &'a str,
    pub measurements: Vec<&'a Measurement>,
}

impl<'a> MetricSeries<'a> {
    pub fn latest(&self) -> Option<&'a Measurement> {
        self.measurements.last().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    ReplicaSet,
    Experiment,
    AnalysisRun,
    Job,
    Pod,
}

impl NodeKind {
    /// Position of the kind group when children are listed under a parent.
    pub fn rank(&self) -> u8 {
        match self {
            NodeKind::ReplicaSet => 0,
            NodeKind::Experiment => 1,
            NodeKind::AnalysisRun => 2,
            NodeKind::Job => 3,
            NodeKind::Pod => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::ReplicaSet => "ReplicaSet",
            NodeKind::Experiment => "Experiment",
            NodeKind::AnalysisRun => "AnalysisRun",
            NodeKind::Job => "Job",
            NodeKind::Pod => "Pod",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            NodeKind::ReplicaSet => icons::REPLICA_SET,
            NodeKind::Experiment => icons::EXPERIMENT,
            NodeKind::AnalysisRun => icons::ANALYSIS,
            NodeKind::Job => icons::JOB,
            NodeKind::Pod => icons::POD,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodNode {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub ready: String,
    #[serde(default)]
    pub restarts: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaSetNode {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub stable: bool,
    #[serde(default)]
    pub canary: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub preview: bool,
    #[serde(default)]
    pub ping: bool,
    #[serde(default)]
    pub pong: bool,
    #[serde(default)]
    pub scale_down_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pods: Vec<PodNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobNode {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub metric_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRunNode {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub status: Status,
    #[serde(flatten)]
    pub tally: Tally,
    #[serde(default)]
    pub jobs: Vec<JobNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentNode {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub children: Vec<ChildNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ChildNode {
    ReplicaSet(ReplicaSetNode),
    Experiment(ExperimentNode),
    AnalysisRun(AnalysisRunNode),
    Job(JobNode),
    Pod(PodNode),
}

impl ChildNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            ChildNode::ReplicaSet(_) => NodeKind::ReplicaSet,
            ChildNode::Experiment(_) => NodeKind::Experiment,
            ChildNode::AnalysisRun(_) => NodeKind::AnalysisRun,
            ChildNode::Job(_) => NodeKind::Job,
            ChildNode::Pod(_) => NodeKind::Pod,
        }
    }

    pub fn meta(&self) -> &ObjectMeta {
        match self {
            ChildNode::ReplicaSet(node) => &node.meta,
            ChildNode::Experiment(node) => &node.meta,
            ChildNode::AnalysisRun(node) => &node.meta,
            ChildNode::Job(node) => &node.meta,
            ChildNode::Pod(node) => &node.meta,
        }
    }

    pub fn status(&self) -> &Status {
        match self {
            ChildNode::ReplicaSet(node) => &node.status,
            ChildNode::Experiment(node) => &node.status,
            ChildNode::AnalysisRun(node) => &node.status,
            ChildNode::Job(node) => &node.status,
            ChildNode::Pod(node) => &node.status,
        }
    }
}

/// Children grouped by kind (ReplicaSet, Experiment, AnalysisRun, ...) with
/// the producer's order kept inside each group.
pub fn order_children(children: &[ChildNode]) -> Vec<&ChildNode> {
    let mut ordered: Vec<&ChildNode> = children.iter().collect();
    ordered.sort_by_key(|child| child.kind().rank());
    ordered
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub number: i64,
    #[serde(default)]
    pub children: Vec<ChildNode>,
}

impl Revision {
    pub fn name(&self) -> String {
        format!("revision:{}", self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    #[serde(default)]
    pub kind: RootKind,
    pub meta: ObjectMeta,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub replicas: ReplicaCounts,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub revisions: Vec<Revision>,
    #[serde(default)]
    pub tally: Tally,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
    #[serde(default = "Utc::now")]
    pub observed_at: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn new(kind: RootKind, meta: ObjectMeta, observed_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            meta,
            status: Status::default(),
            message: None,
            strategy: Strategy::default(),
            replicas: ReplicaCounts::default(),
            images: Vec::new(),
            revisions: Vec::new(),
            tally: Tally::default(),
            measurements: Vec::new(),
            observed_at,
        }
    }

    pub fn age_of(&self, meta: &ObjectMeta) -> String {
        age::age(meta.created_at, self.observed_at)
    }

    /// Measurements grouped by metric name, in order of first appearance.
    pub fn metric_series(&self) -> Vec<MetricSeries<'_>> {
        let mut series: Vec<MetricSeries<'_>> = Vec::new();
        for measurement in &self.measurements {
            match series
                .iter_mut()
                .find(|entry| entry.metric_name == measurement.metric_name)
            {
                Some(entry) => entry.measurements.push(measurement),
                None => series.push(MetricSeries {
                    metric_name: &measurement.metric_name,
                    measurements: vec![measurement],
                }),
            }
        }
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rs(name: &str) -> ChildNode {
        ChildNode::ReplicaSet(ReplicaSetNode {
            meta: ObjectMeta::new(name),
            ..ReplicaSetNode::default()
        })
    }

    fn ar(name: &str) -> ChildNode {
        ChildNode::AnalysisRun(AnalysisRunNode {
            meta: ObjectMeta::new(name),
            ..AnalysisRunNode::default()
        })
    }

    fn exp(name: &str) -> ChildNode {
        ChildNode::Experiment(ExperimentNode {
            meta: ObjectMeta::new(name),
            ..ExperimentNode::default()
        })
    }

    fn names(children: &[&ChildNode]) -> Vec<String> {
        children.iter().map(|child| child.meta().name.clone()).collect()
    }

    #[test]
    fn order_children_groups_by_kind_and_keeps_insertion_order() {
        let children = vec![ar("ar-1"), rs("rs-b"), exp("exp-1"), rs("rs-a"), ar("ar-0")];
        let ordered = order_children(&children);
        assert_eq!(names(&ordered), vec!["rs-b", "rs-a", "exp-1", "ar-1", "ar-0"]);
    }

    #[test]
    fn metric_series_groups_in_first_appearance_order() {
        let observed = Utc
            .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp");
        let mut snapshot = StatusSnapshot::new(RootKind::AnalysisRun, ObjectMeta::new("ar"), observed);
        for (metric, value) in [("latency", "120"), ("errors", "0"), ("latency", "95")] {
            snapshot.measurements.push(Measurement {
                metric_name: metric.to_string(),
                value: Some(value.to_string()),
                status: Status::Successful,
                started_at: None,
            });
        }
        let series = snapshot.metric_series();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].metric_name, "latency");
        assert_eq!(series[0].measurements.len(), 2);
        assert_eq!(
            series[0].latest().and_then(|m| m.value.as_deref()),
            Some("95")
        );
        assert_eq!(series[1].metric_name, "errors");
    }

    #[test]
    fn canary_step_label() {
        let progress = CanaryProgress {
            step: Some(1),
            total_steps: Some(3),
            set_weight: 20,
            actual_weight: 20,
        };
        assert_eq!(progress.step_label(), "1/3");
        assert_eq!(CanaryProgress::default().step_label(), "-");
    }
}

use crate::layout::{align_columns, Layout};
use crate::palette::{Colorizer, Glyphs};
use crate::RenderError;
use rollwatch_core::{
    icons, order_children, AnalysisRunNode, ChildNode, ExperimentNode, ImageRef, JobNode,
    NodeKind, PodNode, ReplicaSetNode, Revision, RootKind, Status, StatusSnapshot, Tally,
    TAG_ACTIVE, TAG_CANARY, TAG_PING, TAG_PONG, TAG_PREVIEW, TAG_STABLE,
};
use std::io::Write;

pub const BRANCH: &str = "├── ";
pub const LAST_BRANCH: &str = "└── ";
pub const PIPE: &str = "│   ";
pub const BLANK: &str = "    ";

pub const COLUMN_HEADER: &str = "NAME\tKIND\tSTATUS\tAGE\tINFO";
const LABEL_WIDTH: usize = 17;

/// Line prefix for a node and the sub-prefix handed to its children.
pub fn prefixes(is_last: bool, parent_subpfx: &str) -> (String, String) {
    if is_last {
        (
            format!("{parent_subpfx}{LAST_BRANCH}"),
            format!("{parent_subpfx}{BLANK}"),
        )
    } else {
        (
            format!("{parent_subpfx}{BRANCH}"),
            format!("{parent_subpfx}{PIPE}"),
        )
    }
}

fn table_row(label: &str, value: impl std::fmt::Display) -> String {
    format!("{label:<LABEL_WIDTH$}{value}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Summary block followed by the tree.
    Describe,
    /// Tree only.
    Tree,
}

pub struct TreeRenderer<'a> {
    colors: &'a dyn Colorizer,
    glyphs: &'a dyn Glyphs,
    layout: Layout,
}

impl<'a> TreeRenderer<'a> {
    pub fn new(colors: &'a dyn Colorizer, glyphs: &'a dyn Glyphs) -> Self {
        Self {
            colors,
            glyphs,
            layout: Layout::default(),
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Write one snapshot to `out`, line by line. The first failed write
    /// aborts the remaining lines of this call.
    pub fn render<W: Write + ?Sized>(
        &self,
        snapshot: &StatusSnapshot,
        view: View,
        out: &mut W,
    ) -> Result<(), RenderError> {
        let lines = match view {
            View::Describe => self.describe_lines(snapshot),
            View::Tree => self.tree_lines(snapshot),
        };
        for (idx, line) in lines.iter().enumerate() {
            writeln!(out, "{line}").map_err(|source| RenderError::Write { line: idx, source })?;
        }
        out.flush().map_err(RenderError::Flush)
    }

    pub fn describe_lines(&self, snapshot: &StatusSnapshot) -> Vec<String> {
        let mut lines = self.summary_lines(snapshot);
        lines.push(String::new());
        lines.extend(self.tree_lines(snapshot));
        lines
    }

    pub fn summary_lines(&self, snapshot: &StatusSnapshot) -> Vec<String> {
        let mut lines = vec![
            table_row("Name:", &snapshot.meta.name),
            table_row("Namespace:", &snapshot.meta.namespace),
            table_row("Status:", self.status_cell(&snapshot.status)),
        ];
        if let Some(message) = snapshot.message.as_deref().filter(|m| !m.is_empty()) {
            lines.push(table_row("Message:", message));
        }
        lines.push(table_row("Strategy:", snapshot.strategy.name()));
        if let Some(canary) = snapshot.strategy.canary() {
            lines.push(table_row("  Step:", canary.step_label()));
            lines.push(table_row("  SetWeight:", canary.set_weight));
            lines.push(table_row("  ActualWeight:", canary.actual_weight));
        }
        for (idx, image) in snapshot.images.iter().enumerate() {
            let label = if idx == 0 { "Images:" } else { "" };
            lines.push(table_row(label, self.format_image(image)));
        }
        lines.push("Replicas:".to_string());
        let replicas = &snapshot.replicas;
        lines.push(table_row("  Desired:", replicas.desired));
        lines.push(table_row("  Current:", replicas.current));
        lines.push(table_row("  Updated:", replicas.updated));
        lines.push(table_row("  Ready:", replicas.ready));
        lines.push(table_row("  Available:", replicas.available));

        if snapshot.kind == RootKind::AnalysisRun {
            let series = snapshot.metric_series();
            if !series.is_empty() {
                lines.push("Metrics:".to_string());
                for entry in series {
                    let (status, value) = match entry.latest() {
                        Some(latest) => (
                            latest.status.clone(),
                            latest.value.clone().unwrap_or_else(|| "-".to_string()),
                        ),
                        None => (Status::Unknown, "-".to_string()),
                    };
                    lines.push(table_row(
                        &format!("  {}:", entry.metric_name),
                        format!(
                            "{} value:{} measurements:{}",
                            self.status_cell(&status),
                            value,
                            entry.measurements.len()
                        ),
                    ));
                }
            }
        }
        lines
    }

    pub fn tree_lines(&self, snapshot: &StatusSnapshot) -> Vec<String> {
        let mut lines = vec![COLUMN_HEADER.to_string()];
        let info = match snapshot.kind {
            RootKind::AnalysisRun => self.tally_badges(&snapshot.tally),
            RootKind::Rollout => String::new(),
        };
        lines.push(self.row(
            "",
            self.glyphs.root_icon(snapshot.kind),
            &snapshot.meta.name,
            snapshot.kind.as_str(),
            &snapshot.status,
            &snapshot.age_of(&snapshot.meta),
            &info,
        ));
        let total = snapshot.revisions.len();
        for (idx, revision) in snapshot.revisions.iter().enumerate() {
            let (prefix, subpfx) = prefixes(idx + 1 == total, "");
            lines.extend(self.revision_lines(snapshot, revision, &prefix, &subpfx));
        }
        match self.layout {
            Layout::Aligned => align_columns(&lines),
            Layout::Tabs => lines,
        }
    }

    pub fn revision_lines(
        &self,
        snapshot: &StatusSnapshot,
        revision: &Revision,
        prefix: &str,
        subpfx: &str,
    ) -> Vec<String> {
        let mut lines = vec![format!(
            "{prefix}{} {}\t\t \t\t",
            self.glyphs.revision_icon(),
            revision.name()
        )];
        lines.extend(self.children_lines(snapshot, &revision.children, subpfx));
        lines
    }

    fn children_lines(
        &self,
        snapshot: &StatusSnapshot,
        children: &[ChildNode],
        subpfx: &str,
    ) -> Vec<String> {
        let ordered = order_children(children);
        let total = ordered.len();
        let mut lines = Vec::new();
        for (idx, child) in ordered.into_iter().enumerate() {
            let (prefix, child_subpfx) = prefixes(idx + 1 == total, subpfx);
            lines.extend(self.node_lines(snapshot, child, &prefix, &child_subpfx));
        }
        lines
    }

    /// Lines for `node` and its descendants. `prefix` precedes the node's own
    /// line and `subpfx` is the base for its children's prefixes.
    pub fn node_lines(
        &self,
        snapshot: &StatusSnapshot,
        node: &ChildNode,
        prefix: &str,
        subpfx: &str,
    ) -> Vec<String> {
        match node {
            ChildNode::ReplicaSet(rs) => self.replica_set_lines(snapshot, rs, prefix, subpfx),
            ChildNode::Experiment(exp) => self.experiment_lines(snapshot, exp, prefix, subpfx),
            ChildNode::AnalysisRun(run) => self.analysis_run_lines(snapshot, run, prefix, subpfx),
            ChildNode::Job(job) => vec![self.job_line(snapshot, job, prefix)],
            ChildNode::Pod(pod) => vec![self.pod_line(snapshot, pod, prefix)],
        }
    }

    fn replica_set_lines(
        &self,
        snapshot: &StatusSnapshot,
        rs: &ReplicaSetNode,
        prefix: &str,
        subpfx: &str,
    ) -> Vec<String> {
        let mut tags = Vec::new();
        if rs.stable {
            tags.push(TAG_STABLE);
        }
        if rs.canary {
            tags.push(TAG_CANARY);
        } else if rs.active {
            tags.push(TAG_ACTIVE);
        } else if rs.preview {
            tags.push(TAG_PREVIEW);
        }
        if rs.ping {
            tags.push(TAG_PING);
        }
        if rs.pong {
            tags.push(TAG_PONG);
        }

        let name = match tags.last() {
            Some(tag) => self.colors.paint(&rs.meta.name, tag),
            None => rs.meta.name.clone(),
        };
        let mut info: Vec<String> = tags.iter().map(|tag| self.colors.colorize(tag)).collect();
        if let Some(deadline) = rs.scale_down_deadline {
            info.push(format!(
                "delay:{}",
                rollwatch_core::age::scale_down_delay(deadline, snapshot.observed_at)
            ));
        }

        let mut lines = vec![self.row(
            prefix,
            self.glyphs.kind_icon(NodeKind::ReplicaSet),
            &name,
            NodeKind::ReplicaSet.as_str(),
            &rs.status,
            &snapshot.age_of(&rs.meta),
            &info.join(","),
        )];
        let total = rs.pods.len();
        for (idx, pod) in rs.pods.iter().enumerate() {
            let (pod_prefix, _) = prefixes(idx + 1 == total, subpfx);
            lines.push(self.pod_line(snapshot, pod, &pod_prefix));
        }
        lines
    }

    fn experiment_lines(
        &self,
        snapshot: &StatusSnapshot,
        exp: &ExperimentNode,
        prefix: &str,
        subpfx: &str,
    ) -> Vec<String> {
        let name = self.colors.paint(&exp.meta.name, exp.status.as_str());
        let mut lines = vec![self.row(
            prefix,
            self.glyphs.kind_icon(NodeKind::Experiment),
            &name,
            NodeKind::Experiment.as_str(),
            &exp.status,
            &snapshot.age_of(&exp.meta),
            "",
        )];
        lines.extend(self.children_lines(snapshot, &exp.children, subpfx));
        lines
    }

    fn analysis_run_lines(
        &self,
        snapshot: &StatusSnapshot,
        run: &AnalysisRunNode,
        prefix: &str,
        subpfx: &str,
    ) -> Vec<String> {
        let name = self.colors.paint(&run.meta.name, run.status.as_str());
        let mut lines = vec![self.row(
            prefix,
            self.glyphs.kind_icon(NodeKind::AnalysisRun),
            &name,
            NodeKind::AnalysisRun.as_str(),
            &run.status,
            &snapshot.age_of(&run.meta),
            &self.tally_badges(&run.tally),
        )];
        let total = run.jobs.len();
        for (idx, job) in run.jobs.iter().enumerate() {
            let (job_prefix, _) = prefixes(idx + 1 == total, subpfx);
            lines.push(self.job_line(snapshot, job, &job_prefix));
        }
        lines
    }

    fn job_line(&self, snapshot: &StatusSnapshot, job: &JobNode, prefix: &str) -> String {
        let name = self.colors.paint(&job.meta.name, job.status.as_str());
        let info = job
            .metric_name
            .as_deref()
            .map(|metric| format!("metric:{metric}"))
            .unwrap_or_default();
        self.row(
            prefix,
            self.glyphs.kind_icon(NodeKind::Job),
            &name,
            NodeKind::Job.as_str(),
            &job.status,
            &snapshot.age_of(&job.meta),
            &info,
        )
    }

    fn pod_line(&self, snapshot: &StatusSnapshot, pod: &PodNode, prefix: &str) -> String {
        let mut info = vec![format!("ready:{}", pod.ready)];
        if pod.restarts > 0 {
            info.push(format!("restarts:{}", pod.restarts));
        }
        self.row(
            prefix,
            self.glyphs.kind_icon(NodeKind::Pod),
            &pod.meta.name,
            NodeKind::Pod.as_str(),
            &pod.status,
            &snapshot.age_of(&pod.meta),
            &info.join(","),
        )
    }

    /// `✓ 3,✗ 1`; a zero count suppresses its badge entirely.
    pub fn tally_badges(&self, tally: &Tally) -> String {
        let counts = [
            (icons::OK, tally.successful),
            (icons::BAD, tally.failed),
            (icons::UNKNOWN, tally.inconclusive),
            (icons::WARNING, tally.error),
        ];
        counts
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(icon, count)| format!("{} {}", self.colors.colorize(icon), count))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn format_image(&self, image: &ImageRef) -> String {
        if image.tags.is_empty() {
            return image.image.clone();
        }
        let tags: Vec<String> = image
            .tags
            .iter()
            .map(|tag| self.colors.colorize(tag))
            .collect();
        format!("{} ({})", image.image, tags.join(", "))
    }

    fn status_cell(&self, status: &Status) -> String {
        format!(
            "{} {}",
            self.colors.colorize(self.glyphs.status_icon(status)),
            status
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn row(
        &self,
        prefix: &str,
        icon: &str,
        name: &str,
        kind: &str,
        status: &Status,
        age: &str,
        info: &str,
    ) -> String {
        format!(
            "{prefix}{icon} {name}\t{kind}\t{}\t{age}\t{info}",
            self.status_cell(status)
        )
    }
}

use crossterm::style::{Color, Stylize};
use rollwatch_core::{
    icons, NodeKind, RootKind, Status, TAG_ACTIVE, TAG_CANARY, TAG_PING, TAG_PONG, TAG_PREVIEW,
    TAG_STABLE,
};

/// Maps a label (status, icon or role tag) to its terminal styling.
pub trait Colorizer {
    /// Style `text` with the color registered for `label`.
    fn paint(&self, text: &str, label: &str) -> String;

    fn colorize(&self, label: &str) -> String {
        self.paint(label, label)
    }
}

/// Maps statuses and node kinds to display glyphs.
pub trait Glyphs {
    fn status_icon(&self, status: &Status) -> &str;
    fn kind_icon(&self, kind: NodeKind) -> &str;
    fn root_icon(&self, kind: RootKind) -> &str;
    fn revision_icon(&self) -> &str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGlyphs;

impl Glyphs for DefaultGlyphs {
    fn status_icon(&self, status: &Status) -> &str {
        status.icon()
    }

    fn kind_icon(&self, kind: NodeKind) -> &str {
        kind.icon()
    }

    fn root_icon(&self, kind: RootKind) -> &str {
        kind.icon()
    }

    fn revision_icon(&self) -> &str {
        icons::REVISION
    }
}

pub fn tag_color(tag: &str) -> Option<Color> {
    match tag {
        TAG_STABLE => Some(Color::Green),
        TAG_CANARY => Some(Color::Yellow),
        TAG_ACTIVE => Some(Color::Blue),
        TAG_PREVIEW => Some(Color::Magenta),
        TAG_PING => Some(Color::DarkCyan),
        TAG_PONG => Some(Color::DarkMagenta),
        _ => None,
    }
}

pub fn icon_color(icon: &str) -> Option<Color> {
    match icon {
        icons::OK => Some(Color::Green),
        icons::BAD | icons::WARNING => Some(Color::Red),
        icons::UNKNOWN | icons::WAITING => Some(Color::Yellow),
        icons::PROGRESSING => Some(Color::Cyan),
        icons::PAUSED | icons::NEUTRAL => Some(Color::White),
        _ => None,
    }
}

pub fn status_color(status: &Status) -> Option<Color> {
    match status {
        Status::Successful | Status::Healthy | Status::Completed => Some(Color::Green),
        Status::Failed | Status::Error | Status::Degraded => Some(Color::Red),
        Status::Inconclusive | Status::Pending => Some(Color::Yellow),
        Status::Progressing | Status::Running => Some(Color::Cyan),
        Status::Paused => Some(Color::White),
        Status::ScaledDown | Status::Terminating => Some(Color::DarkGrey),
        Status::Unknown | Status::Other(_) => None,
    }
}

/// Role tags win over icons, icons over status labels.
pub fn label_color(label: &str) -> Option<Color> {
    tag_color(label)
        .or_else(|| icon_color(label))
        .or_else(|| status_color(&Status::parse(label)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn ansi() -> Self {
        Self { enabled: true }
    }

    pub fn plain() -> Self {
        Self { enabled: false }
    }

    pub fn new(color: bool) -> Self {
        Self { enabled: color }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Colorizer for Palette {
    fn paint(&self, text: &str, label: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        match label_color(label) {
            Some(color) => text.with(color).to_string(),
            None => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::strip_ansi;

    #[test]
    fn plain_palette_is_identity() {
        let palette = Palette::plain();
        assert_eq!(palette.colorize("canary"), "canary");
        assert_eq!(palette.paint("guestbook-6c5f", "Failed"), "guestbook-6c5f");
        assert_eq!(palette.colorize(icons::OK), icons::OK);
    }

    #[test]
    fn ansi_palette_keeps_text_content() {
        let palette = Palette::ansi();
        assert_eq!(strip_ansi(&palette.colorize("stable")), "stable");
        assert_eq!(strip_ansi(&palette.paint("rs-1", "Successful")), "rs-1");
        assert_eq!(palette.colorize("no-such-label"), "no-such-label");
    }

    #[test]
    fn status_labels_map_to_fixed_colors() {
        assert_eq!(label_color("Successful"), Some(Color::Green));
        assert_eq!(label_color("Failed"), Some(Color::Red));
        assert_eq!(label_color("Error"), Some(Color::Red));
        assert_eq!(label_color("Inconclusive"), Some(Color::Yellow));
        assert_eq!(label_color("Progressing"), Some(Color::Cyan));
        assert_eq!(label_color("Unknown"), None);
    }

    #[test]
    fn role_tags_use_distinct_colors() {
        let tags = [TAG_STABLE, TAG_CANARY, TAG_ACTIVE, TAG_PREVIEW, TAG_PING, TAG_PONG];
        let colors: Vec<Color> = tags
            .iter()
            .map(|tag| tag_color(tag).expect("tag color"))
            .collect();
        for (i, color) in colors.iter().enumerate() {
            assert!(!colors[i + 1..].contains(color), "duplicate color for {}", tags[i]);
        }
    }
}

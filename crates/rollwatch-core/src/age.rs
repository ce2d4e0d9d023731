use chrono::{DateTime, Utc};

pub const UNKNOWN_AGE: &str = "<unknown>";

/// Kubernetes-style human duration (`5m`, `3h12m`, `2d4h`).
pub fn human_duration(seconds: i64) -> String {
    if seconds < -1 {
        return "<invalid>".to_string();
    }
    if seconds < 0 {
        return "0s".to_string();
    }
    if seconds < 60 * 2 {
        return format!("{seconds}s");
    }

    let minutes = seconds / 60;
    if minutes < 10 {
        let secs = seconds % 60;
        if secs == 0 {
            return format!("{minutes}m");
        }
        return format!("{minutes}m{secs}s");
    }
    if minutes < 60 * 3 {
        return format!("{minutes}m");
    }

    let hours = minutes / 60;
    if hours < 8 {
        let mins = minutes % 60;
        if mins == 0 {
            return format!("{hours}h");
        }
        return format!("{hours}h{mins}m");
    }
    if hours < 48 {
        return format!("{hours}h");
    }
    if hours < 24 * 8 {
        let rem = hours % 24;
        if rem == 0 {
            return format!("{}d", hours / 24);
        }
        return format!("{}d{}h", hours / 24, rem);
    }
    if hours < 24 * 365 * 2 {
        return format!("{}d", hours / 24);
    }
    if hours < 24 * 365 * 8 {
        let days = (hours / 24) % 365;
        if days == 0 {
            return format!("{}y", hours / 24 / 365);
        }
        return format!("{}y{}d", hours / 24 / 365, days);
    }
    format!("{}y", hours / 24 / 365)
}

pub fn age(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match created_at {
        Some(created) => human_duration(now.signed_duration_since(created).num_seconds()),
        None => UNKNOWN_AGE.to_string(),
    }
}

/// Clock-style duration with every unit down to seconds, e.g. `1h2m3s`, `45s`.
pub fn clock_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h{minutes}m{secs}s")
    } else if minutes > 0 {
        format!("{minutes}m{secs}s")
    } else {
        format!("{secs}s")
    }
}

pub fn scale_down_delay(deadline: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = deadline.signed_duration_since(now);
    let millis = remaining.num_milliseconds();
    if millis <= 0 {
        return "passed".to_string();
    }
    // Round partial seconds up so a pending deadline never reads as 0s.
    let seconds = (millis + 999) / 1000;
    clock_duration(seconds)
}

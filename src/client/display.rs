use chrono::{DateTime, Duration, Utc};

use crate::db::models::Notification;
use crate::domain::NotificationKind;

/// Where tapping a notification goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLink {
    Post(String),
    Profile(String),
}

pub fn notification_icon(kind: &NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Follow => "user-plus",
        NotificationKind::Upvote => "arrow-up",
        NotificationKind::Comment => "message-circle",
        NotificationKind::Mention => "at-sign",
        NotificationKind::LevelUp => "award",
        NotificationKind::Other(_) => "bell",
    }
}

/// The post wins over the sender.
pub fn deep_link(notification: &Notification) -> Option<DeepLink> {
    if let Some(post_id) = &notification.post_id {
        Some(DeepLink::Post(post_id.clone()))
    } else {
        notification
            .from_user_id
            .as_ref()
            .map(|id| DeepLink::Profile(id.clone()))
    }
}

/// Short age for the notification list: `Nm`, `Nh`, `Nd`, then the date.
pub fn notification_time(dt: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let diff = (*now - *dt).max(Duration::zero());

    let minutes = diff.num_minutes();
    if minutes < 60 {
        return format!("{}m", minutes);
    }
    let hours = diff.num_hours();
    if hours < 24 {
        return format!("{}h", hours);
    }
    let days = diff.num_days();
    if days < 7 {
        return format!("{}d", days);
    }
    short_date(dt)
}

/// Day-granular age for post cards.
pub fn post_date(dt: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let days = (*now - *dt).max(Duration::zero()).num_days();
    match days {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{} days ago", days),
        _ => short_date(dt),
    }
}

fn short_date(dt: &DateTime<Utc>) -> String {
    dt.format("%-m/%-d/%Y").to_string()
}

/// Stored timestamps are RFC 3339 (`2026-01-01T00:00:00.000Z`).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn notification(post_id: Option<&str>, from: Option<&str>) -> Notification {
        Notification {
            id: "n1".into(),
            user_id: "u1".into(),
            kind: "comment".into(),
            title: "New Comment".into(),
            message: "Someone commented on your post".into(),
            from_user_id: from.map(String::from),
            post_id: post_id.map(String::from),
            is_read: false,
            created_at: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn icons_per_kind() {
        for (tag, icon) in [
            ("follow", "user-plus"),
            ("upvote", "arrow-up"),
            ("comment", "message-circle"),
            ("mention", "at-sign"),
            ("level_up", "award"),
            ("something_else", "bell"),
        ] {
            assert_eq!(notification_icon(&NotificationKind::parse(tag)), icon);
        }
    }

    #[test]
    fn deep_link_prefers_post() {
        assert_eq!(
            deep_link(&notification(Some("p1"), Some("u2"))),
            Some(DeepLink::Post("p1".into()))
        );
        assert_eq!(
            deep_link(&notification(None, Some("u2"))),
            Some(DeepLink::Profile("u2".into()))
        );
        assert_eq!(deep_link(&notification(None, None)), None);
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn notification_time_boundaries() {
        let now = at(2026, 3, 10, 12, 0);
        let ago = |d: Duration| notification_time(&(now - d), &now);

        assert_eq!(ago(Duration::seconds(10)), "0m");
        assert_eq!(ago(Duration::minutes(59)), "59m");
        assert_eq!(ago(Duration::minutes(60)), "1h");
        assert_eq!(ago(Duration::hours(23)), "23h");
        assert_eq!(ago(Duration::hours(24)), "1d");
        assert_eq!(ago(Duration::days(6)), "6d");
        assert_eq!(ago(Duration::days(7)), "3/3/2026");
    }

    #[test]
    fn post_date_boundaries() {
        let now = at(2026, 3, 10, 12, 0);
        let ago = |d: Duration| post_date(&(now - d), &now);

        assert_eq!(ago(Duration::hours(23)), "Today");
        assert_eq!(ago(Duration::hours(24)), "Yesterday");
        assert_eq!(ago(Duration::hours(47)), "Yesterday");
        assert_eq!(ago(Duration::days(2)), "2 days ago");
        assert_eq!(ago(Duration::days(6)), "6 days ago");
        assert_eq!(ago(Duration::days(7)), "3/3/2026");
    }

    #[test]
    fn future_timestamps_read_as_now() {
        let now = at(2026, 3, 10, 12, 0);
        let later = now + Duration::minutes(5);
        assert_eq!(notification_time(&later, &now), "0m");
        assert_eq!(post_date(&later, &now), "Today");
    }

    #[test]
    fn parses_stored_timestamps() {
        assert_eq!(
            parse_timestamp("2025-01-15T12:00:00.000Z"),
            Some(at(2025, 1, 15, 12, 0))
        );
        assert_eq!(parse_timestamp("not-a-date"), None);
    }
}

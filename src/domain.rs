//! Small value types shared by the server and the client.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Notification type tag as stored in `notifications.type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    Follow,
    Upvote,
    Comment,
    Mention,
    LevelUp,
    Other(String),
}

impl NotificationKind {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationKind::Follow => "follow",
            NotificationKind::Upvote => "upvote",
            NotificationKind::Comment => "comment",
            NotificationKind::Mention => "mention",
            NotificationKind::LevelUp => "level_up",
            NotificationKind::Other(tag) => tag,
        }
    }

    pub fn parse(tag: &str) -> Self {
        match tag {
            "follow" => NotificationKind::Follow,
            "upvote" => NotificationKind::Upvote,
            "comment" => NotificationKind::Comment,
            "mention" => NotificationKind::Mention,
            "level_up" => NotificationKind::LevelUp,
            other => NotificationKind::Other(other.to_string()),
        }
    }

    /// Default (title, message) pair used when the server fans out a notification.
    pub fn default_text(&self) -> (String, String) {
        let (title, message) = match self {
            NotificationKind::Follow => ("New Follower", "Someone started following you"),
            NotificationKind::Upvote => ("Post Upvoted", "Someone upvoted your post"),
            NotificationKind::Comment => ("New Comment", "Someone commented on your post"),
            NotificationKind::Mention => ("New Mention", "Someone mentioned you"),
            NotificationKind::LevelUp => ("Level Up", "Your reputation level increased"),
            NotificationKind::Other(_) => ("Notification", "You have a new notification"),
        };
        (title.to_string(), message.to_string())
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reputation tiers derived from a user's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReputationLevel {
    Beginner,
    Rising,
    Skilled,
    Expert,
    Master,
}

impl ReputationLevel {
    pub fn from_score(score: i64) -> Self {
        match score {
            s if s >= 1000 => ReputationLevel::Master,
            s if s >= 500 => ReputationLevel::Expert,
            s if s >= 200 => ReputationLevel::Skilled,
            s if s >= 50 => ReputationLevel::Rising,
            _ => ReputationLevel::Beginner,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReputationLevel::Beginner => "Beginner",
            ReputationLevel::Rising => "Rising",
            ReputationLevel::Skilled => "Skilled",
            ReputationLevel::Expert => "Expert",
            ReputationLevel::Master => "Master",
        }
    }
}

impl fmt::Display for ReputationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moderation state of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Dismissed,
    Actioned,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::Dismissed => "dismissed",
            ReportStatus::Actioned => "actioned",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReportStatus::Pending),
            "reviewed" => Ok(ReportStatus::Reviewed),
            "dismissed" => Ok(ReportStatus::Dismissed),
            "actioned" => Ok(ReportStatus::Actioned),
            other => Err(format!("Unknown report status: {}", other)),
        }
    }
}

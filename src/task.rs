use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Backend record identifier. Older backend revisions send numbers, newer ones strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

pub type TaskId = RecordId;
pub type ContactId = RecordId;

/// Identifier of the signed-in CRM user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OwnerId(pub i64);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Number(n) => Self(n.to_string()),
        })
    }
}

impl<'de> Deserialize<'de> for OwnerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawId::deserialize(deserializer)? {
            RawId::Number(n) => Ok(Self(n)),
            RawId::Text(s) => s
                .trim()
                .parse()
                .map(Self)
                .map_err(|_| serde::de::Error::custom(format!("invalid owner id {s:?}"))),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The four deal stages, in board order. The serialized names are the backend's labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "Revision", alias = "Revisión")]
    Review,
    #[serde(rename = "En contacto")]
    InContact,
    #[serde(rename = "Toques finales")]
    FinishingTouches,
    #[serde(rename = "Esperando Confirmación", alias = "Esperando Confirmacion")]
    AwaitingConfirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Stage {
    pub const ALL: [Self; 4] = [
        Self::Review,
        Self::InContact,
        Self::FinishingTouches,
        Self::AwaitingConfirmation,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::Review => 0,
            Self::InContact => 1,
            Self::FinishingTouches => 2,
            Self::AwaitingConfirmation => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Review => "Revision",
            Self::InContact => "En contacto",
            Self::FinishingTouches => "Toques finales",
            Self::AwaitingConfirmation => "Esperando Confirmación",
        }
    }

    /// Adjacent stage in `direction`, or `None` at the first/last column.
    pub fn step(self, direction: Direction) -> Option<Self> {
        let index = self.index();
        match direction {
            Direction::Forward => Self::from_index(index + 1),
            Direction::Backward => index.checked_sub(1).and_then(Self::from_index),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[serde(alias = "Low", alias = "baja")]
    Low,
    #[default]
    #[serde(alias = "Medium", alias = "media")]
    Medium,
    #[serde(alias = "High", alias = "alta")]
    High,
}

impl Priority {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "" | "medium" | "m" | "media" => Some(Self::Medium),
            "low" | "l" | "baja" => Some(Self::Low),
            "high" | "h" | "alta" => Some(Self::High),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(alias = "TaskID", alias = "taskId", alias = "task_id", alias = "_id")]
    pub id: TaskId,
    #[serde(alias = "Title", alias = "content")]
    pub title: String,
    #[serde(default, alias = "Description", alias = "descrip")]
    pub description: String,
    #[serde(alias = "Status", alias = "estado")]
    pub status: Stage,
    #[serde(
        default,
        alias = "due_date",
        alias = "DueDate",
        deserialize_with = "lenient_date"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(default, alias = "Priority")]
    pub priority: Priority,
    #[serde(alias = "OwnerID", alias = "owner_id", alias = "ownerID")]
    pub owner_id: OwnerId,
}

/// Body of a task creation request.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: Stage,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub owner_id: OwnerId,
}

/// Accepts `YYYY-MM-DD` or a full ISO timestamp; anything else reads as no due date.
fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        let day = s.get(..10).unwrap_or(&s);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_stops_at_both_ends() {
        assert_eq!(Stage::Review.step(Direction::Backward), None);
        assert_eq!(Stage::AwaitingConfirmation.step(Direction::Forward), None);
        assert_eq!(
            Stage::InContact.step(Direction::Forward),
            Some(Stage::FinishingTouches)
        );
        assert_eq!(
            Stage::InContact.step(Direction::Backward),
            Some(Stage::Review)
        );
    }

    #[test]
    fn task_accepts_mixed_casing_and_numeric_ids() {
        let json = r#"{
            "TaskID": 42,
            "Title": "Call supplier",
            "Status": "Toques finales",
            "due_date": "2025-03-01T00:00:00.000Z",
            "OwnerID": "7"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, TaskId::from("42"));
        assert_eq!(task.status, Stage::FinishingTouches);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.owner_id, OwnerId(7));
        assert!(task.description.is_empty());
    }

    #[test]
    fn unreadable_due_date_is_dropped() {
        let json = r#"{"id":"t1","title":"x","status":"Revision","dueDate":"soon","ownerId":1}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.due_date, None);
    }

    #[test]
    fn stage_serializes_to_backend_label() {
        let json = serde_json::to_string(&Stage::AwaitingConfirmation).unwrap();
        assert_eq!(json, "\"Esperando Confirmación\"");
    }

    #[test]
    fn priority_parse_accepts_blank_as_default() {
        assert_eq!(Priority::parse("  "), Some(Priority::Medium));
        assert_eq!(Priority::parse("HIGH"), Some(Priority::High));
        assert_eq!(Priority::parse("urgent"), None);
    }
}

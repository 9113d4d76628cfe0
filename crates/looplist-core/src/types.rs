//! Core types for LoopList.
//!
//! Loops, check-ins and reactions serialize with camelCase field names so a
//! snapshot has the same shape as the records the web client kept in local
//! storage.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for users, loops, check-ins and reactions.
/// Generated values use `UUIDv7`; seeded and legacy ids are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub String);

impl Id {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// --- Enumerations ---

/// How often a loop is meant to be performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Frequency {
    #[default]
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "weekdays")]
    Weekdays,
    #[serde(rename = "3x-weekly")]
    ThreeTimesWeekly,
    /// Only the weekdays listed in `Loop::custom_days`.
    #[serde(rename = "custom")]
    Custom,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekdays => "weekdays",
            Self::ThreeTimesWeekly => "3x-weekly",
            Self::Custom => "custom",
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekdays" => Ok(Self::Weekdays),
            "3x-weekly" => Ok(Self::ThreeTimesWeekly),
            "custom" => Ok(Self::Custom),
            _ => Err(format!(
                "invalid frequency '{s}', expected: daily, weekdays, 3x-weekly, custom"
            )),
        }
    }
}

/// Who may see a loop. Only `Public` loops appear in trending and
/// loop-of-the-day queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
    Friends,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
            Self::Friends => "friends",
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "public" => Ok(Self::Public),
            "friends" => Ok(Self::Friends),
            _ => Err(format!(
                "invalid visibility '{s}', expected: private, public, friends"
            )),
        }
    }
}

/// Loop lifecycle status.
///
/// `Active` and `Broken` are derived from the current streak on every
/// check-in. `Completed` is only ever set by an explicit update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopStatus {
    #[default]
    Active,
    Broken,
    Completed,
}

impl LoopStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Broken => "broken",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for LoopStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "broken" => Ok(Self::Broken),
            "completed" => Ok(Self::Completed),
            _ => Err(format!(
                "invalid status '{s}', expected: active, broken, completed"
            )),
        }
    }
}

/// Reaction type. Only cheers exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    #[default]
    Cheer,
}

/// How the current streak is resolved after a check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakPolicy {
    /// Matches the web client: a completed check-in adds one on top of the
    /// scanned run, which already includes the check-in itself.
    #[default]
    Legacy,
    /// Plain count of consecutive completed days ending at the most recent one.
    Consecutive,
}

impl StreakPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Consecutive => "consecutive",
        }
    }
}

impl FromStr for StreakPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "consecutive" => Ok(Self::Consecutive),
            _ => Err(format!(
                "invalid streak policy '{s}', expected: legacy, consecutive"
            )),
        }
    }
}

// --- Entities ---

/// An account, owned by the identity provider. The store only sees ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A habit definition and its running aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loop {
    pub id: Id,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
    /// Weekday indices (0 = Sunday). Only meaningful for `Frequency::Custom`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_days: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub visibility: Visibility,
    /// Owner. Never changes after creation.
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    /// Completed check-ins divided by all check-ins, in `[0, 1]`.
    #[serde(default)]
    pub completion_rate: f64,
    #[serde(default)]
    pub status: LoopStatus,
    #[serde(default)]
    pub cheers: u32,
    #[serde(default)]
    pub clones: u32,
}

impl Loop {
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn is_owned_by(&self, user_id: &Id) -> bool {
        &self.user_id == user_id
    }

    /// Ranking score for trending and loop-of-the-day.
    pub fn popularity(&self) -> u64 {
        u64::from(self.cheers) + u64::from(self.clones)
    }
}

/// One record per (loop, user, calendar day).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub id: Id,
    pub loop_id: Id,
    pub user_id: Id,
    #[serde(with = "day_format")]
    pub date: NaiveDate,
    pub completed: bool,
}

impl CheckIn {
    /// Id used for fresh check-ins, e.g. `checkin-<loop>-2024-03-01`.
    pub fn id_for(loop_id: &Id, date: NaiveDate) -> Id {
        Id::from_string(format!("checkin-{loop_id}-{}", date.format(day_format::FORMAT)))
    }

    pub fn matches(&self, loop_id: &Id, user_id: &Id, date: NaiveDate) -> bool {
        &self.loop_id == loop_id && &self.user_id == user_id && self.date == date
    }
}

/// A user's cheer on a loop. At most one per (user, loop).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub id: Id,
    pub loop_id: Id,
    pub user_id: Id,
    #[serde(rename = "type", default)]
    pub kind: ReactionKind,
    pub created_at: DateTime<Utc>,
}

// --- Inputs ---

/// Fields accepted when creating a loop. Anything left out gets a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewLoop {
    pub title: Option<String>,
    pub emoji: Option<String>,
    pub cover_image: Option<String>,
    pub frequency: Option<Frequency>,
    pub custom_days: Option<Vec<u8>>,
    pub start_date: Option<DateTime<Utc>>,
    pub visibility: Option<Visibility>,
    pub category: Option<String>,
}

/// Partial update of the user-editable fields of a loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoopPatch {
    pub title: Option<String>,
    pub emoji: Option<String>,
    pub cover_image: Option<String>,
    pub frequency: Option<Frequency>,
    pub custom_days: Option<Vec<u8>>,
    pub start_date: Option<DateTime<Utc>>,
    pub visibility: Option<Visibility>,
    pub category: Option<String>,
    pub status: Option<LoopStatus>,
}

impl LoopPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the present fields into `target`.
    pub fn apply(&self, target: &mut Loop) {
        if let Some(ref title) = self.title {
            target.title.clone_from(title);
        }
        if let Some(ref emoji) = self.emoji {
            target.emoji = Some(emoji.clone());
        }
        if let Some(ref cover_image) = self.cover_image {
            target.cover_image = Some(cover_image.clone());
        }
        if let Some(frequency) = self.frequency {
            target.frequency = frequency;
        }
        if let Some(ref days) = self.custom_days {
            target.custom_days = Some(days.clone());
        }
        if let Some(start_date) = self.start_date {
            target.start_date = start_date;
        }
        if let Some(visibility) = self.visibility {
            target.visibility = visibility;
        }
        if let Some(ref category) = self.category {
            target.category = Some(category.clone());
        }
        if let Some(status) = self.status {
            target.status = status;
        }
    }
}

/// Calendar-day encoding for `CheckIn::date`.
///
/// Writes `YYYY-MM-DD`. Reads that, or a full RFC 3339 timestamp as written
/// by older snapshots, keeping only its date.
pub mod day_format {
    use chrono::{DateTime, NaiveDate};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveDate, String> {
        if let Ok(date) = NaiveDate::parse_from_str(raw, FORMAT) {
            return Ok(date);
        }
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.date_naive())
            .map_err(|e| format!("invalid check-in date '{raw}': {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_loop() -> Loop {
        Loop {
            id: Id::from_string("loop-1"),
            title: "Read 10 pages".to_string(),
            emoji: Some("📚".to_string()),
            cover_image: None,
            frequency: Frequency::Daily,
            custom_days: None,
            category: None,
            start_date: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            visibility: Visibility::Public,
            user_id: Id::from_string("1"),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            current_streak: 3,
            longest_streak: 5,
            completion_rate: 0.75,
            status: LoopStatus::Active,
            cheers: 4,
            clones: 2,
        }
    }

    #[test]
    fn id_generates_unique_values() {
        let id1 = Id::new();
        let id2 = Id::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn frequency_serializes_like_web_client() {
        assert_eq!(
            serde_json::to_string(&Frequency::ThreeTimesWeekly).unwrap(),
            "\"3x-weekly\""
        );
        assert_eq!(serde_json::to_string(&Frequency::Daily).unwrap(), "\"daily\"");
        assert_eq!("3x-weekly".parse::<Frequency>().unwrap(), Frequency::ThreeTimesWeekly);
        assert!("hourly".parse::<Frequency>().is_err());
    }

    #[test]
    fn defaults_match_creation_defaults() {
        assert_eq!(Frequency::default(), Frequency::Daily);
        assert_eq!(Visibility::default(), Visibility::Private);
        assert_eq!(LoopStatus::default(), LoopStatus::Active);
        assert_eq!(StreakPolicy::default(), StreakPolicy::Legacy);
    }

    #[test]
    fn loop_serializes_with_camel_case_fields() {
        let json = serde_json::to_value(sample_loop()).unwrap();
        assert_eq!(json["userId"], "1");
        assert_eq!(json["currentStreak"], 3);
        assert_eq!(json["completionRate"], 0.75);
        assert_eq!(json["visibility"], "public");
        assert!(json.get("coverImage").is_none());
    }

    #[test]
    fn popularity_sums_cheers_and_clones() {
        assert_eq!(sample_loop().popularity(), 6);
    }

    #[test]
    fn check_in_date_is_written_as_plain_day() {
        let check_in = CheckIn {
            id: Id::from_string("c1"),
            loop_id: Id::from_string("loop-1"),
            user_id: Id::from_string("1"),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            completed: true,
        };
        let json = serde_json::to_value(&check_in).unwrap();
        assert_eq!(json["date"], "2024-03-05");
        assert_eq!(json["loopId"], "loop-1");
    }

    #[test]
    fn check_in_date_accepts_legacy_timestamps() {
        let raw = r#"{"id":"c1","loopId":"1","userId":"1","date":"2023-05-01T00:00:00.000Z","completed":false}"#;
        let check_in: CheckIn = serde_json::from_str(raw).unwrap();
        assert_eq!(check_in.date, NaiveDate::from_ymd_opt(2023, 5, 1).unwrap());
        assert!(!check_in.completed);
    }

    #[test]
    fn reaction_kind_uses_type_field() {
        let reaction = Reaction {
            id: Id::from_string("r1"),
            loop_id: Id::from_string("loop-1"),
            user_id: Id::from_string("2"),
            kind: ReactionKind::Cheer,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(&reaction).unwrap();
        assert_eq!(json["type"], "cheer");
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let mut target = sample_loop();
        let patch = LoopPatch {
            title: Some("Read 20 pages".to_string()),
            status: Some(LoopStatus::Completed),
            ..LoopPatch::default()
        };
        patch.apply(&mut target);
        assert_eq!(target.title, "Read 20 pages");
        assert_eq!(target.status, LoopStatus::Completed);
        assert_eq!(target.emoji.as_deref(), Some("📚"));
        assert_eq!(target.cheers, 4);
        assert!(LoopPatch::default().is_empty());
        assert!(!patch.is_empty());
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub number: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub students: Vec<Student>,
    /// Row-major, `seat_rows * seat_columns` slots.
    #[serde(default, deserialize_with = "deserialize_seats")]
    pub seats: Vec<Option<String>>,
    #[serde(default)]
    pub seat_rows: u32,
    #[serde(default)]
    pub seat_columns: u32,
    #[serde(default)]
    pub is_main: bool,
}

impl Classroom {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            students: Vec::new(),
            seats: Vec::new(),
            seat_rows: 0,
            seat_columns: 0,
            is_main: false,
        }
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }
}

// Empty strings were written for cleared seats by older clients; treat them
// the same as null.
fn deserialize_seats<'de, D>(deserializer: D) -> Result<Vec<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Option<String>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|slot| slot.filter(|id| !id.is_empty()))
        .collect())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Number,
    Seat,
}

impl DisplayMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "number" => Some(Self::Number),
            "seat" => Some(Self::Seat),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkboard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_mode: DisplayMode,
    #[serde(default)]
    pub classroom_id: String,
    #[serde(default)]
    pub student_ids: Vec<String>,
}

impl Checkboard {
    pub fn includes(&self, student_id: &str) -> bool {
        self.student_ids.iter().any(|id| id == student_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub time: String,
    pub data: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
}

/// Identifies one checkboard's check state on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayKey {
    pub classroom_id: String,
    pub checkboard_id: String,
    pub date: NaiveDate,
}

impl DayKey {
    pub fn new(classroom_id: &str, checkboard_id: &str, date: NaiveDate) -> Self {
        Self {
            classroom_id: classroom_id.to_string(),
            checkboard_id: checkboard_id.to_string(),
            date,
        }
    }

    pub fn live_key(&self) -> String {
        format!(
            "check_{}_{}_{}",
            self.classroom_id,
            self.checkboard_id,
            self.date.format(DATE_FORMAT)
        )
    }

    pub fn snapshots_key(&self) -> String {
        format!(
            "checkboard_saves_{}_{}_{}",
            self.classroom_id,
            self.checkboard_id,
            self.date.format(DATE_FORMAT)
        )
    }
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

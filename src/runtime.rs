//! One "run" of a checkboard on a selected day.
//!
//! A session resolves the checkboard and its classroom once, then keeps the
//! live check set and the day's snapshots in memory. Every mutation is
//! written through to the store before returning.

use crate::error::{CoreError, CoreResult};
use crate::model::{Checkboard, Classroom, DayKey, DisplayMode, SnapshotEntry, Student, DATE_FORMAT};
use crate::repo::Repository;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

pub const SNAPSHOT_TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCard {
    pub id: String,
    pub number: i64,
    pub name: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RunLayout {
    Number {
        students: Vec<RunCard>,
    },
    Seat {
        rows: u32,
        columns: u32,
        slots: Vec<Option<RunCard>>,
    },
}

#[derive(Debug, Clone)]
pub struct RunSession {
    checkboard: Checkboard,
    classroom: Classroom,
    date: NaiveDate,
    checked: Vec<String>,
    snapshots: Vec<SnapshotEntry>,
}

impl RunSession {
    /// Fails with `NotFound` for a missing checkboard, and with a distinct
    /// `NotFound` for a checkboard whose classroom no longer exists.
    pub fn open(repo: &Repository, checkboard_id: &str, date: NaiveDate) -> CoreResult<Self> {
        let checkboard = repo
            .get_checkboard(checkboard_id)
            .ok_or_else(|| CoreError::not_found("checkboard", checkboard_id))?;
        let classroom = repo
            .get_classroom(&checkboard.classroom_id)
            .ok_or_else(|| CoreError::not_found("classroom", checkboard.classroom_id.clone()))?;

        let mut session = Self {
            checkboard,
            classroom,
            date,
            checked: Vec::new(),
            snapshots: Vec::new(),
        };
        session.reload_day(repo);
        tracing::info!(
            checkboard_id,
            classroom_id = %session.classroom.id,
            date = %session.date.format(DATE_FORMAT),
            "run session opened"
        );
        Ok(session)
    }

    fn reload_day(&mut self, repo: &Repository) {
        let key = self.day_key();
        self.checked = repo.load_live_checks(&key);
        self.snapshots = repo.load_snapshots(&key);
    }

    pub fn day_key(&self) -> DayKey {
        DayKey::new(&self.classroom.id, &self.checkboard.id, self.date)
    }

    pub fn checkboard(&self) -> &Checkboard {
        &self.checkboard
    }

    pub fn classroom(&self) -> &Classroom {
        &self.classroom
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn checked(&self) -> &[String] {
        &self.checked
    }

    pub fn snapshots(&self) -> &[SnapshotEntry] {
        &self.snapshots
    }

    pub fn is_checked(&self, student_id: &str) -> bool {
        self.checked.iter().any(|id| id == student_id)
    }

    /// Switches to another day. The previous day is already persisted under
    /// its own key, so its in-memory state is simply dropped.
    pub fn select_date(&mut self, repo: &Repository, date: NaiveDate) {
        self.date = date;
        self.reload_day(repo);
    }

    /// Roster entries active on this checkboard, in roster order. Ids that no
    /// longer exist on the roster are skipped.
    pub fn effective_students(&self) -> Vec<&Student> {
        self.classroom
            .students
            .iter()
            .filter(|s| self.checkboard.includes(&s.id))
            .collect()
    }

    fn card(&self, student: &Student) -> RunCard {
        RunCard {
            id: student.id.clone(),
            number: student.number,
            name: student.name.clone(),
            checked: self.is_checked(&student.id),
        }
    }

    pub fn layout(&self) -> RunLayout {
        match self.checkboard.display_mode {
            DisplayMode::Number => {
                let mut students = self.effective_students();
                students.sort_by_key(|s| s.number);
                RunLayout::Number {
                    students: students.into_iter().map(|s| self.card(s)).collect(),
                }
            }
            DisplayMode::Seat => {
                // A seat holding a student who is not on this checkboard
                // renders empty; the classroom's assignment is untouched.
                let slots = self
                    .classroom
                    .seats
                    .iter()
                    .map(|slot| {
                        let sid = slot.as_deref()?;
                        if !self.checkboard.includes(sid) {
                            return None;
                        }
                        self.classroom.student(sid).map(|s| self.card(s))
                    })
                    .collect();
                RunLayout::Seat {
                    rows: self.classroom.seat_rows,
                    columns: self.classroom.seat_columns,
                    slots,
                }
            }
        }
    }

    /// Flips `student_id` in the live set and persists it. Returns whether the
    /// student is now checked. Ids already in the live set can always be
    /// unchecked even if they have since left the roster.
    pub fn toggle_check(&mut self, repo: &Repository, student_id: &str) -> CoreResult<bool> {
        let now_checked = if let Some(pos) = self.checked.iter().position(|id| id == student_id) {
            self.checked.remove(pos);
            false
        } else {
            let active = self.effective_students().iter().any(|s| s.id == student_id);
            if !active {
                return Err(CoreError::not_found("student", student_id));
            }
            self.checked.push(student_id.to_string());
            true
        };
        repo.save_live_checks(&self.day_key(), &self.checked);
        Ok(now_checked)
    }

    pub fn reset_checks(&mut self, repo: &Repository) {
        self.checked.clear();
        repo.save_live_checks(&self.day_key(), &self.checked);
        tracing::info!(checkboard_id = %self.checkboard.id, "live checks reset");
    }

    /// Appends a copy of the live set labelled with the selected date and the
    /// wall-clock time `now`. Labels may repeat.
    pub fn save_snapshot(&mut self, repo: &Repository, now: NaiveTime) -> SnapshotEntry {
        let entry = SnapshotEntry {
            time: format!(
                "{} {}",
                self.date.format(DATE_FORMAT),
                now.format(SNAPSHOT_TIME_FORMAT)
            ),
            data: self.checked.clone(),
        };
        self.snapshots.push(entry.clone());
        repo.save_snapshots(&self.day_key(), &self.snapshots);
        tracing::info!(checkboard_id = %self.checkboard.id, label = %entry.time, "snapshot saved");
        entry
    }

    /// Replaces the live set with the first snapshot labelled `label` and
    /// persists it as the new live set.
    pub fn load_snapshot(&mut self, repo: &Repository, label: &str) -> CoreResult<()> {
        let entry = self
            .snapshots
            .iter()
            .find(|s| s.time == label)
            .ok_or_else(|| CoreError::not_found("snapshot", label))?;
        self.checked = entry.data.clone();
        repo.save_live_checks(&self.day_key(), &self.checked);
        Ok(())
    }

    /// Removes the snapshot at `index`; the live set is not touched.
    pub fn delete_snapshot(&mut self, repo: &Repository, index: usize) -> CoreResult<SnapshotEntry> {
        if index >= self.snapshots.len() {
            return Err(CoreError::validation(format!(
                "snapshot index {} out of range (0..{})",
                index,
                self.snapshots.len()
            )));
        }
        let removed = self.snapshots.remove(index);
        repo.save_snapshots(&self.day_key(), &self.snapshots);
        Ok(removed)
    }
}

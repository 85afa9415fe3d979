use super::{Repository, CLASSROOMS_KEY};
use crate::error::{CoreError, CoreResult};
use crate::model::{Classroom, Student};
use crate::roster::{self, BulkAddReport};
use uuid::Uuid;

/// Upper bound on `rows * columns` for one classroom.
pub const MAX_SEATS: usize = 2_500;

impl Repository {
    pub fn list_classrooms(&self) -> Vec<Classroom> {
        let main = self.main_classroom_id();
        let mut classrooms: Vec<Classroom> = self.store.load(CLASSROOMS_KEY).unwrap_or_default();
        for c in classrooms.iter_mut() {
            c.is_main = main.as_deref() == Some(c.id.as_str());
        }
        classrooms
    }

    pub fn get_classroom(&self, id: &str) -> Option<Classroom> {
        self.list_classrooms().into_iter().find(|c| c.id == id)
    }

    fn require_classroom(&self, id: &str) -> CoreResult<Classroom> {
        self.get_classroom(id)
            .ok_or_else(|| CoreError::not_found("classroom", id))
    }

    /// Replaces the classroom with the same id or appends it. Passing
    /// `is_main = true` promotes it; the current main cannot be demoted this
    /// way, only replaced by another main.
    pub fn upsert_classroom(&self, classroom: Classroom) {
        let mut main = self.main_classroom_id();
        if classroom.is_main {
            main = Some(classroom.id.clone());
        }
        let mut classrooms = self.list_classrooms();
        match classrooms.iter_mut().find(|c| c.id == classroom.id) {
            Some(slot) => *slot = classroom,
            None => classrooms.push(classroom),
        }
        self.flush_classrooms(classrooms, main);
    }

    /// Adds a classroom with an empty roster. The first classroom in the
    /// store becomes main.
    pub fn create_classroom(&self, name: &str) -> CoreResult<Classroom> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("classroom name must not be empty"));
        }
        let mut classrooms = self.list_classrooms();
        let mut classroom = Classroom::new(Uuid::new_v4().to_string(), name.to_string());
        let main = if classrooms.is_empty() {
            Some(classroom.id.clone())
        } else {
            self.main_classroom_id()
        };
        classroom.is_main = main.as_deref() == Some(classroom.id.as_str());
        classrooms.push(classroom.clone());
        self.flush_classrooms(classrooms, main);
        tracing::info!(classroom_id = %classroom.id, "classroom created");
        Ok(classroom)
    }

    pub fn rename_classroom(&self, id: &str, name: &str) -> CoreResult<Classroom> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("classroom name must not be empty"));
        }
        let mut classroom = self.require_classroom(id)?;
        classroom.name = name.to_string();
        self.upsert_classroom(classroom.clone());
        Ok(classroom)
    }

    /// Removes the classroom. If it was main, the first remaining classroom
    /// takes over, or main is cleared when none remain. Checkboards bound to
    /// it are left in place with a dangling reference.
    pub fn delete_classroom(&self, id: &str) -> CoreResult<()> {
        let classrooms = self.list_classrooms();
        if !classrooms.iter().any(|c| c.id == id) {
            return Err(CoreError::not_found("classroom", id));
        }
        let mut main = self.main_classroom_id();
        let remaining: Vec<Classroom> = classrooms.into_iter().filter(|c| c.id != id).collect();
        if main.as_deref() == Some(id) {
            main = remaining.first().map(|c| c.id.clone());
        }
        self.flush_classrooms(remaining, main);
        tracing::info!(classroom_id = id, "classroom deleted");
        Ok(())
    }

    pub fn set_main_classroom(&self, id: &str) -> CoreResult<()> {
        let classrooms = self.list_classrooms();
        if !classrooms.iter().any(|c| c.id == id) {
            return Err(CoreError::not_found("classroom", id));
        }
        self.flush_classrooms(classrooms, Some(id.to_string()));
        Ok(())
    }

    pub fn add_students_bulk(&self, classroom_id: &str, input: &str) -> CoreResult<BulkAddReport> {
        let mut classroom = self.require_classroom(classroom_id)?;
        let report = roster::parse_bulk_students(input, &classroom.students, || {
            Uuid::new_v4().to_string()
        });
        if !report.added.is_empty() {
            classroom.students.extend(report.added.iter().cloned());
            self.upsert_classroom(classroom);
        }
        if !report.rejected.is_empty() {
            tracing::info!(
                classroom_id,
                added = report.added.len(),
                rejected = report.rejected.len(),
                "bulk student input partially rejected"
            );
        }
        Ok(report)
    }

    /// Removes a student from the roster and clears every seat holding them.
    /// Checkboards referencing the student keep the id.
    pub fn delete_student(&self, classroom_id: &str, student_id: &str) -> CoreResult<Classroom> {
        let mut classroom = self.require_classroom(classroom_id)?;
        if classroom.student(student_id).is_none() {
            return Err(CoreError::not_found("student", student_id));
        }
        classroom.students.retain(|s| s.id != student_id);
        for slot in classroom.seats.iter_mut() {
            if slot.as_deref() == Some(student_id) {
                *slot = None;
            }
        }
        self.upsert_classroom(classroom.clone());
        Ok(classroom)
    }

    /// Replaces the seat layout with `rows * columns` empty slots.
    pub fn resize_seats(&self, classroom_id: &str, rows: i64, columns: i64) -> CoreResult<Classroom> {
        if rows <= 0 || columns <= 0 {
            return Err(CoreError::validation(
                "seat rows and columns must be positive",
            ));
        }
        let (rows, columns) = match (u32::try_from(rows), u32::try_from(columns)) {
            (Ok(r), Ok(c)) => (r, c),
            _ => return Err(CoreError::validation("seat dimensions are too large")),
        };
        let total = (rows as usize)
            .checked_mul(columns as usize)
            .filter(|total| *total <= MAX_SEATS)
            .ok_or_else(|| {
                CoreError::validation(format!(
                    "seat dimensions are too large (at most {} seats)",
                    MAX_SEATS
                ))
            })?;
        let mut classroom = self.require_classroom(classroom_id)?;
        classroom.seat_rows = rows;
        classroom.seat_columns = columns;
        classroom.seats = vec![None; total];
        self.upsert_classroom(classroom.clone());
        Ok(classroom)
    }

    pub fn assign_seat(
        &self,
        classroom_id: &str,
        seat_index: usize,
        student_id: Option<&str>,
    ) -> CoreResult<Classroom> {
        let mut classroom = self.require_classroom(classroom_id)?;
        if seat_index >= classroom.seats.len() {
            return Err(CoreError::validation(format!(
                "seat index {} out of range (0..{})",
                seat_index,
                classroom.seats.len()
            )));
        }
        let student_id = student_id.filter(|id| !id.is_empty());
        if let Some(sid) = student_id {
            if classroom.student(sid).is_none() {
                return Err(CoreError::not_found("student", sid));
            }
            let seated_elsewhere = classroom
                .seats
                .iter()
                .enumerate()
                .any(|(i, slot)| i != seat_index && slot.as_deref() == Some(sid));
            if seated_elsewhere {
                return Err(CoreError::validation(format!(
                    "student {} already has a seat",
                    sid
                )));
            }
        }
        classroom.seats[seat_index] = student_id.map(str::to_string);
        self.upsert_classroom(classroom.clone());
        Ok(classroom)
    }

    /// Students that may be placed in `seat_index`: everyone not seated
    /// elsewhere, plus the slot's current occupant.
    pub fn available_students_for_seat(
        &self,
        classroom_id: &str,
        seat_index: usize,
    ) -> CoreResult<Vec<Student>> {
        let classroom = self.require_classroom(classroom_id)?;
        let seated_elsewhere: Vec<&str> = classroom
            .seats
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != seat_index)
            .filter_map(|(_, slot)| slot.as_deref())
            .collect();
        Ok(classroom
            .students
            .iter()
            .filter(|s| !seated_elsewhere.contains(&s.id.as_str()))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CoreError;
    use crate::model::{Checkboard, DisplayMode};
    use crate::model::Classroom;
    use crate::repo::test_support::repo;
    use crate::repo::{Repository, CLASSROOMS_KEY, MAIN_CLASSROOM_KEY};

    fn assert_main_invariant(r: &Repository) {
        let classrooms = r.list_classrooms();
        let flagged: Vec<&str> = classrooms
            .iter()
            .filter(|c| c.is_main)
            .map(|c| c.id.as_str())
            .collect();
        assert!(flagged.len() <= 1, "more than one main: {:?}", flagged);
        let stored: Option<String> = r
            .store()
            .load::<String>(MAIN_CLASSROOM_KEY)
            .filter(|s| !s.is_empty());
        assert_eq!(flagged.first().map(|s| s.to_string()), stored);
        let raw: Vec<Classroom> = r.store().load(CLASSROOMS_KEY).unwrap_or_default();
        assert_eq!(raw.iter().filter(|c| c.is_main).count(), flagged.len());
    }

    #[test]
    fn first_classroom_becomes_main() {
        let r = repo();
        let a = r.create_classroom("1-1").expect("create");
        let b = r.create_classroom("1-2").expect("create");
        assert!(a.is_main);
        assert!(!b.is_main);
        assert_eq!(r.main_classroom_id(), Some(a.id));
        assert_main_invariant(&r);
    }

    #[test]
    fn empty_name_is_rejected() {
        let r = repo();
        assert!(matches!(
            r.create_classroom("   "),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn main_invariant_holds_across_add_set_delete() {
        let r = repo();
        let a = r.create_classroom("A").expect("a");
        let b = r.create_classroom("B").expect("b");
        let c = r.create_classroom("C").expect("c");
        assert_main_invariant(&r);

        r.set_main_classroom(&c.id).expect("set main");
        assert_eq!(r.main_classroom_id(), Some(c.id.clone()));
        assert_main_invariant(&r);

        r.delete_classroom(&c.id).expect("delete main");
        assert_eq!(r.main_classroom_id(), Some(a.id.clone()));
        assert_main_invariant(&r);

        r.delete_classroom(&b.id).expect("delete other");
        assert_eq!(r.main_classroom_id(), Some(a.id.clone()));
        assert_main_invariant(&r);

        r.delete_classroom(&a.id).expect("delete last");
        assert_eq!(r.main_classroom_id(), None);
        assert_main_invariant(&r);
    }

    #[test]
    fn upsert_with_main_flag_promotes() {
        let r = repo();
        r.create_classroom("A").expect("a");
        let mut b = r.create_classroom("B").expect("b");
        b.is_main = true;
        r.upsert_classroom(b.clone());
        assert_eq!(r.main_classroom_id(), Some(b.id));
        assert_main_invariant(&r);
    }

    #[test]
    fn deleting_student_clears_seats_but_not_checkboards() {
        let r = repo();
        let c = r.create_classroom("A").expect("a");
        let report = r.add_students_bulk(&c.id, "1 Kim\n2 Lee").expect("add");
        let kim = report.added[0].id.clone();
        let lee = report.added[1].id.clone();
        r.resize_seats(&c.id, 1, 3).expect("resize");
        r.assign_seat(&c.id, 0, Some(&kim)).expect("seat kim");
        r.assign_seat(&c.id, 2, Some(&lee)).expect("seat lee");
        let board = Checkboard {
            id: "b1".into(),
            name: "Homework".into(),
            display_mode: DisplayMode::Seat,
            classroom_id: c.id.clone(),
            student_ids: vec![kim.clone(), lee.clone()],
        };
        r.upsert_checkboard(board);

        let after = r.delete_student(&c.id, &kim).expect("delete student");
        assert_eq!(after.seats, vec![None, None, Some(lee.clone())]);
        assert!(after.student(&kim).is_none());
        let board = r.get_checkboard("b1").expect("board");
        assert!(board.includes(&kim));
    }

    #[test]
    fn resize_rejects_non_positive_and_discards_assignments() {
        let r = repo();
        let c = r.create_classroom("A").expect("a");
        let added = r.add_students_bulk(&c.id, "1 Kim").expect("add").added;
        r.resize_seats(&c.id, 2, 2).expect("resize");
        r.assign_seat(&c.id, 3, Some(&added[0].id)).expect("assign");
        assert!(matches!(
            r.resize_seats(&c.id, 0, 4),
            Err(CoreError::Validation(_))
        ));
        let resized = r.resize_seats(&c.id, 1, 2).expect("resize again");
        assert_eq!(resized.seats, vec![None, None]);
        assert_eq!((resized.seat_rows, resized.seat_columns), (1, 2));
    }

    #[test]
    fn resize_rejects_oversized_grids_without_touching_seats() {
        let r = repo();
        let c = r.create_classroom("A").expect("a");
        r.resize_seats(&c.id, 2, 3).expect("resize");
        for (rows, columns) in [
            (i32::MAX as i64, i32::MAX as i64),
            (i64::MAX, 1),
            (51, 50),
        ] {
            assert!(matches!(
                r.resize_seats(&c.id, rows, columns),
                Err(CoreError::Validation(_))
            ));
        }
        let kept = r.get_classroom(&c.id).expect("classroom");
        assert_eq!((kept.seat_rows, kept.seat_columns), (2, 3));
        assert_eq!(kept.seats.len(), 6);
        let at_limit = r.resize_seats(&c.id, 50, 50).expect("at limit");
        assert_eq!(at_limit.seats.len(), super::MAX_SEATS);
    }

    #[test]
    fn assign_seat_checks_index_and_student() {
        let r = repo();
        let c = r.create_classroom("A").expect("a");
        r.resize_seats(&c.id, 1, 1).expect("resize");
        assert!(matches!(
            r.assign_seat(&c.id, 1, None),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            r.assign_seat(&c.id, 0, Some("nobody")),
            Err(CoreError::NotFound { entity: "student", .. })
        ));
    }

    #[test]
    fn available_students_exclude_other_seats() {
        let r = repo();
        let c = r.create_classroom("A").expect("a");
        let added = r.add_students_bulk(&c.id, "1 Kim\n2 Lee\n3 Park").expect("add").added;
        r.resize_seats(&c.id, 1, 2).expect("resize");
        r.assign_seat(&c.id, 0, Some(&added[0].id)).expect("seat 0");
        r.assign_seat(&c.id, 1, Some(&added[1].id)).expect("seat 1");

        let for_seat0: Vec<i64> = r
            .available_students_for_seat(&c.id, 0)
            .expect("available")
            .iter()
            .map(|s| s.number)
            .collect();
        assert_eq!(for_seat0, vec![1, 3]);
    }
}

use super::{Repository, CHECKBOARDS_KEY};
use crate::error::{CoreError, CoreResult};
use crate::model::{Checkboard, DisplayMode};
use uuid::Uuid;

/// Fields editable from the checkboard detail page. `None` leaves the field
/// as stored.
#[derive(Debug, Clone, Default)]
pub struct CheckboardPatch {
    pub name: Option<String>,
    pub display_mode: Option<DisplayMode>,
    pub student_ids: Option<Vec<String>>,
}

impl Repository {
    pub fn list_checkboards(&self) -> Vec<Checkboard> {
        self.store.load(CHECKBOARDS_KEY).unwrap_or_default()
    }

    fn flush_checkboards(&self, checkboards: &[Checkboard]) {
        self.store.save(CHECKBOARDS_KEY, checkboards);
    }

    /// Checkboards bound to the main classroom; empty when no main is set.
    pub fn list_checkboards_for_main_classroom(&self) -> Vec<Checkboard> {
        let Some(main) = self.main_classroom_id() else {
            return Vec::new();
        };
        self.list_checkboards()
            .into_iter()
            .filter(|b| b.classroom_id == main)
            .collect()
    }

    pub fn get_checkboard(&self, id: &str) -> Option<Checkboard> {
        self.list_checkboards().into_iter().find(|b| b.id == id)
    }

    pub fn upsert_checkboard(&self, checkboard: Checkboard) {
        let mut checkboards = self.list_checkboards();
        match checkboards.iter_mut().find(|b| b.id == checkboard.id) {
            Some(slot) => *slot = checkboard,
            None => checkboards.push(checkboard),
        }
        self.flush_checkboards(&checkboards);
    }

    /// Creates an empty checkboard bound to the current main classroom.
    pub fn create_checkboard(&self, name: &str, display_mode: DisplayMode) -> CoreResult<Checkboard> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("checkboard name must not be empty"));
        }
        let Some(classroom_id) = self.main_classroom_id() else {
            return Err(CoreError::validation("no main classroom is set"));
        };
        let checkboard = Checkboard {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            display_mode,
            classroom_id,
            student_ids: Vec::new(),
        };
        self.upsert_checkboard(checkboard.clone());
        tracing::info!(checkboard_id = %checkboard.id, classroom_id = %checkboard.classroom_id, "checkboard created");
        Ok(checkboard)
    }

    pub fn update_checkboard(&self, id: &str, patch: CheckboardPatch) -> CoreResult<Checkboard> {
        let mut checkboard = self
            .get_checkboard(id)
            .ok_or_else(|| CoreError::not_found("checkboard", id))?;
        if let Some(name) = patch.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(CoreError::validation("checkboard name must not be empty"));
            }
            checkboard.name = name.to_string();
        }
        if let Some(mode) = patch.display_mode {
            checkboard.display_mode = mode;
        }
        if let Some(ids) = patch.student_ids {
            let mut deduped: Vec<String> = Vec::with_capacity(ids.len());
            for sid in ids {
                if !deduped.contains(&sid) {
                    deduped.push(sid);
                }
            }
            checkboard.student_ids = deduped;
        }
        self.upsert_checkboard(checkboard.clone());
        Ok(checkboard)
    }

    /// Flips whether `student_id` is active on the checkboard.
    pub fn toggle_checkboard_student(&self, id: &str, student_id: &str) -> CoreResult<Checkboard> {
        let mut checkboard = self
            .get_checkboard(id)
            .ok_or_else(|| CoreError::not_found("checkboard", id))?;
        if checkboard.includes(student_id) {
            checkboard.student_ids.retain(|sid| sid != student_id);
        } else {
            checkboard.student_ids.push(student_id.to_string());
        }
        self.upsert_checkboard(checkboard.clone());
        Ok(checkboard)
    }

    /// Removes the checkboard. Its per-date check entries stay in the store.
    pub fn delete_checkboard(&self, id: &str) -> CoreResult<()> {
        let checkboards = self.list_checkboards();
        if !checkboards.iter().any(|b| b.id == id) {
            return Err(CoreError::not_found("checkboard", id));
        }
        let remaining: Vec<Checkboard> = checkboards.into_iter().filter(|b| b.id != id).collect();
        self.flush_checkboards(&remaining);
        tracing::info!(checkboard_id = id, "checkboard deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::test_support::repo;

    #[test]
    fn create_requires_main_classroom() {
        let r = repo();
        assert!(matches!(
            r.create_checkboard("Homework", DisplayMode::Number),
            Err(CoreError::Validation(_))
        ));
        let c = r.create_classroom("A").expect("a");
        let b = r.create_checkboard("Homework", DisplayMode::Seat).expect("create");
        assert_eq!(b.classroom_id, c.id);
        assert!(b.student_ids.is_empty());
    }

    #[test]
    fn listing_follows_main_classroom() {
        let r = repo();
        let a = r.create_classroom("A").expect("a");
        let b = r.create_classroom("B").expect("b");
        let on_a = r.create_checkboard("Lunch", DisplayMode::Number).expect("on a");
        r.set_main_classroom(&b.id).expect("main b");
        let on_b = r.create_checkboard("Forms", DisplayMode::Number).expect("on b");

        let ids: Vec<String> = r
            .list_checkboards_for_main_classroom()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![on_b.id]);

        r.set_main_classroom(&a.id).expect("main a");
        let ids: Vec<String> = r
            .list_checkboards_for_main_classroom()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![on_a.id]);
    }

    #[test]
    fn no_main_lists_nothing() {
        let r = repo();
        let a = r.create_classroom("A").expect("a");
        r.create_checkboard("Lunch", DisplayMode::Number).expect("board");
        r.delete_classroom(&a.id).expect("delete");
        assert!(r.list_checkboards_for_main_classroom().is_empty());
        assert_eq!(r.list_checkboards().len(), 1);
    }

    #[test]
    fn toggle_student_twice_restores() {
        let r = repo();
        r.create_classroom("A").expect("a");
        let b = r.create_checkboard("Lunch", DisplayMode::Number).expect("board");
        let on = r.toggle_checkboard_student(&b.id, "s1").expect("on");
        assert_eq!(on.student_ids, vec!["s1".to_string()]);
        let off = r.toggle_checkboard_student(&b.id, "s1").expect("off");
        assert!(off.student_ids.is_empty());
    }

    #[test]
    fn update_applies_patch_fields() {
        let r = repo();
        r.create_classroom("A").expect("a");
        let b = r.create_checkboard("Lunch", DisplayMode::Number).expect("board");
        let updated = r
            .update_checkboard(
                &b.id,
                CheckboardPatch {
                    name: Some(" Lunch money ".into()),
                    display_mode: Some(DisplayMode::Seat),
                    student_ids: Some(vec!["s1".into(), "s2".into(), "s1".into()]),
                },
            )
            .expect("update");
        assert_eq!(updated.name, "Lunch money");
        assert_eq!(updated.display_mode, DisplayMode::Seat);
        assert_eq!(updated.student_ids, vec!["s1".to_string(), "s2".to_string()]);
        assert_eq!(r.get_checkboard(&b.id), Some(updated));
    }

    #[test]
    fn delete_unknown_is_not_found() {
        let r = repo();
        assert!(matches!(
            r.delete_checkboard("nope"),
            Err(CoreError::NotFound { entity: "checkboard", .. })
        ));
    }
}

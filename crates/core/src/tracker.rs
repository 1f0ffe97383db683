//! Progress aggregation and lesson sequencing over an ordered course.
//!
//! Everything here is pure: callers assemble an ordered `&[ModuleOutline]`
//! (active modules with their active lessons, both sorted by order index) and
//! a session's progress records, and get answers with no I/O involved.

use crate::model::{Lesson, LessonId, Module, Percent, ProgressRecord};

//
// ─── MODULE OUTLINE ────────────────────────────────────────────────────────────
//

/// One module together with its ordered lessons, as consumed by the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleOutline {
    pub module: Module,
    pub lessons: Vec<Lesson>,
}

impl ModuleOutline {
    #[must_use]
    pub fn new(module: Module, lessons: Vec<Lesson>) -> Self {
        Self { module, lessons }
    }
}

//
// ─── PROGRESS QUERIES ──────────────────────────────────────────────────────────
//

fn lesson_completed(records: &[ProgressRecord], lesson_id: LessonId) -> bool {
    records
        .iter()
        .any(|r| r.lesson_id() == lesson_id && r.is_completed())
}

fn completion_ratio(completed: usize, total: usize) -> Percent {
    if total == 0 {
        return Percent::ZERO;
    }
    // Math-style rounding so 2 of 3 lessons reads as 67%, not 66%.
    let rounded = ((completed as f64 / total as f64) * 100.0).round() as i64;
    Percent::clamped(rounded)
}

/// Completion percentage for one module's lessons.
///
/// Returns 0 for a module with no lessons.
#[must_use]
pub fn module_progress(lessons: &[Lesson], records: &[ProgressRecord]) -> Percent {
    let completed = lessons
        .iter()
        .filter(|l| lesson_completed(records, l.id()))
        .count();
    completion_ratio(completed, lessons.len())
}

/// Completion percentage across every lesson in the course.
#[must_use]
pub fn overall_progress(outline: &[ModuleOutline], records: &[ProgressRecord]) -> Percent {
    let total = outline.iter().map(|entry| entry.lessons.len()).sum();
    let completed = outline
        .iter()
        .flat_map(|entry| &entry.lessons)
        .filter(|l| lesson_completed(records, l.id()))
        .count();
    completion_ratio(completed, total)
}

//
// ─── UNLOCK GATING ─────────────────────────────────────────────────────────────
//

/// Whether the module at `index` is accessible to the session.
///
/// The first module is always unlocked; each later module unlocks only once
/// its predecessor reaches 100%. An empty outline or an out-of-range index
/// answers false rather than panicking.
#[must_use]
pub fn is_module_unlocked(
    index: usize,
    outline: &[ModuleOutline],
    records: &[ProgressRecord],
) -> bool {
    if index >= outline.len() {
        return false;
    }
    if index == 0 {
        return true;
    }
    module_progress(&outline[index - 1].lessons, records).is_complete()
}

//
// ─── SEQUENCING ────────────────────────────────────────────────────────────────
//

/// The lesson that follows `current` in course order.
///
/// Looks within the current module first, then falls through to the first
/// lesson of the next module that has any lessons. Returns `None` when
/// `current` is the last lesson of the course, or when `current` does not
/// belong to the outline at all (a data inconsistency the caller must treat
/// as "stop sequencing", not an error to raise mid-playback).
#[must_use]
pub fn next_lesson<'a>(current: &Lesson, outline: &'a [ModuleOutline]) -> Option<&'a Lesson> {
    let module_pos = outline
        .iter()
        .position(|entry| entry.module.id() == current.module_id())?;

    let entry = &outline[module_pos];
    let lesson_pos = entry.lessons.iter().position(|l| l.id() == current.id())?;

    if let Some(next) = entry.lessons.get(lesson_pos + 1) {
        return Some(next);
    }

    // A following module with zero lessons must not dead-end the course, so
    // skip ahead to the first module that actually has content.
    outline[module_pos + 1..]
        .iter()
        .find_map(|later| later.lessons.first())
}

/// Where a session should pick a module back up: the first lesson without a
/// completed record, falling back to the module's first lesson.
#[must_use]
pub fn resume_lesson<'a>(lessons: &'a [Lesson], records: &[ProgressRecord]) -> Option<&'a Lesson> {
    lessons
        .iter()
        .find(|l| !lesson_completed(records, l.id()))
        .or_else(|| lessons.first())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModuleId, ProgressRecord, SessionId};
    use crate::time::fixed_now;

    fn module(id: u64, order: u32) -> Module {
        Module::new(
            ModuleId::new(id),
            format!("Module {id}"),
            None,
            None,
            None,
            order,
            true,
            fixed_now(),
        )
        .unwrap()
    }

    fn lesson(id: u64, module_id: u64, order: u32) -> Lesson {
        Lesson::new(
            LessonId::new(id),
            ModuleId::new(module_id),
            format!("Lesson {id}"),
            None,
            None,
            None,
            order,
            true,
            fixed_now(),
        )
        .unwrap()
    }

    fn completed_record(lesson_id: u64, module_id: u64) -> ProgressRecord {
        ProgressRecord::completed(
            SessionId::new("session_1_test").unwrap(),
            LessonId::new(lesson_id),
            ModuleId::new(module_id),
            fixed_now(),
        )
    }

    /// Module A (lessons 1, 2), Module B (lesson 3).
    fn two_module_course() -> Vec<ModuleOutline> {
        vec![
            ModuleOutline::new(module(1, 0), vec![lesson(1, 1, 0), lesson(2, 1, 1)]),
            ModuleOutline::new(module(2, 1), vec![lesson(3, 2, 0)]),
        ]
    }

    #[test]
    fn module_progress_of_empty_module_is_zero() {
        assert_eq!(module_progress(&[], &[]), Percent::ZERO);
    }

    #[test]
    fn module_progress_counts_completed_lessons() {
        let lessons = vec![lesson(1, 1, 0), lesson(2, 1, 1)];
        let records = vec![completed_record(1, 1)];
        assert_eq!(module_progress(&lessons, &records).value(), 50);
    }

    #[test]
    fn module_progress_rounds_to_nearest() {
        let lessons = vec![lesson(1, 1, 0), lesson(2, 1, 1), lesson(3, 1, 2)];
        let one = vec![completed_record(1, 1)];
        let two = vec![completed_record(1, 1), completed_record(2, 1)];
        assert_eq!(module_progress(&lessons, &one).value(), 33);
        assert_eq!(module_progress(&lessons, &two).value(), 67);
    }

    #[test]
    fn module_progress_ignores_incomplete_records() {
        let lessons = vec![lesson(1, 1, 0)];
        let records = vec![ProgressRecord::started(
            SessionId::new("session_1_test").unwrap(),
            LessonId::new(1),
            ModuleId::new(1),
            Percent::new(99).unwrap(),
            fixed_now(),
        )];
        assert_eq!(module_progress(&lessons, &records), Percent::ZERO);
    }

    #[test]
    fn first_module_is_always_unlocked() {
        let outline = two_module_course();
        assert!(is_module_unlocked(0, &outline, &[]));
    }

    #[test]
    fn later_module_locked_until_predecessor_complete() {
        let outline = two_module_course();
        assert!(!is_module_unlocked(1, &outline, &[]));

        let partial = vec![completed_record(1, 1)];
        assert!(!is_module_unlocked(1, &outline, &partial));

        let full = vec![completed_record(1, 1), completed_record(2, 1)];
        assert!(is_module_unlocked(1, &outline, &full));
    }

    #[test]
    fn unlock_is_defensive_about_bad_indexes() {
        let outline = two_module_course();
        assert!(!is_module_unlocked(5, &outline, &[]));
        assert!(!is_module_unlocked(0, &[], &[]));
    }

    #[test]
    fn next_lesson_within_module() {
        let outline = two_module_course();
        let next = next_lesson(&outline[0].lessons[0], &outline).unwrap();
        assert_eq!(next.id(), LessonId::new(2));
    }

    #[test]
    fn next_lesson_crosses_module_boundary() {
        let outline = two_module_course();
        let next = next_lesson(&outline[0].lessons[1], &outline).unwrap();
        assert_eq!(next.id(), LessonId::new(3));
    }

    #[test]
    fn next_lesson_at_end_of_course_is_none() {
        let outline = two_module_course();
        assert!(next_lesson(&outline[1].lessons[0], &outline).is_none());
    }

    #[test]
    fn next_lesson_skips_empty_module() {
        let outline = vec![
            ModuleOutline::new(module(1, 0), vec![lesson(1, 1, 0)]),
            ModuleOutline::new(module(2, 1), vec![]),
            ModuleOutline::new(module(3, 2), vec![lesson(2, 3, 0)]),
        ];
        let next = next_lesson(&outline[0].lessons[0], &outline).unwrap();
        assert_eq!(next.id(), LessonId::new(2));
    }

    #[test]
    fn next_lesson_with_unknown_module_is_none() {
        let outline = two_module_course();
        let stray = lesson(99, 42, 0);
        assert!(next_lesson(&stray, &outline).is_none());
    }

    #[test]
    fn overall_progress_spans_modules() {
        let outline = two_module_course();
        let records = vec![completed_record(1, 1), completed_record(2, 1)];
        assert_eq!(overall_progress(&outline, &records).value(), 67);
    }

    #[test]
    fn resume_picks_first_incomplete_lesson() {
        let lessons = vec![lesson(1, 1, 0), lesson(2, 1, 1)];
        let records = vec![completed_record(1, 1)];
        assert_eq!(
            resume_lesson(&lessons, &records).unwrap().id(),
            LessonId::new(2)
        );
    }

    #[test]
    fn resume_falls_back_to_first_lesson_when_all_done() {
        let lessons = vec![lesson(1, 1, 0), lesson(2, 1, 1)];
        let records = vec![completed_record(1, 1), completed_record(2, 1)];
        assert_eq!(
            resume_lesson(&lessons, &records).unwrap().id(),
            LessonId::new(1)
        );
    }

    #[test]
    fn sequential_course_walkthrough() {
        let outline = two_module_course();
        let mut records: Vec<ProgressRecord> = Vec::new();

        assert!(!is_module_unlocked(1, &outline, &records));

        records.push(completed_record(1, 1));
        records.push(completed_record(2, 1));
        assert!(module_progress(&outline[0].lessons, &records).is_complete());
        assert!(is_module_unlocked(1, &outline, &records));

        let b1 = next_lesson(&outline[0].lessons[1], &outline).unwrap();
        assert_eq!(b1.id(), LessonId::new(3));
        assert!(next_lesson(b1, &outline).is_none());
    }
}

//! Sequential-unlock rules for online courses.
//!
//! Ordering is strictly section-major, lesson-minor: a section opens once
//! every lesson of the previous section is completed, a lesson once every
//! earlier lesson of its own section is. No cross-section lesson
//! dependencies exist, so everything here is a linear scan over the course
//! structure. All functions are side-effect free and safe to call per
//! request.

use std::collections::HashSet;

use uuid::Uuid;

use crate::model::entity::CourseStructure;

/// Composite progress key. Lesson ids are only unique within their section,
/// so a completed-lesson reference is always the pair, never the lesson id
/// alone.
pub fn lesson_key(section_id: Uuid, lesson_id: Uuid) -> String {
    format!("{section_id}-{lesson_id}")
}

pub fn can_access_section(
    course: &CourseStructure,
    completed: &HashSet<String>,
    section_id: Uuid,
) -> bool {
    let Some(index) = course.sections.iter().position(|s| s.id == section_id) else {
        return false; // unknown sections are simply inaccessible
    };

    if index == 0 {
        return true;
    }

    let previous = &course.sections[index - 1];
    previous
        .lessons
        .iter()
        .all(|l| completed.contains(&lesson_key(previous.id, l.id)))
}

pub fn can_access_lesson(
    course: &CourseStructure,
    completed: &HashSet<String>,
    section_id: Uuid,
    lesson_id: Uuid,
) -> bool {
    if !can_access_section(course, completed, section_id) {
        return false;
    }

    let Some(section) = course.sections.iter().find(|s| s.id == section_id) else {
        return false;
    };
    let Some(index) = section.lessons.iter().position(|l| l.id == lesson_id) else {
        return false;
    };

    section.lessons[..index]
        .iter()
        .all(|l| completed.contains(&lesson_key(section.id, l.id)))
}

/// Keeps only keys that reference an actual lesson of the course, so stray
/// client keys never inflate the completion count.
pub fn retain_known_keys(course: &CourseStructure, keys: Vec<String>) -> Vec<String> {
    let known: HashSet<String> = course
        .sections
        .iter()
        .flat_map(|s| s.lessons.iter().map(|l| lesson_key(s.id, l.id)))
        .collect();

    let mut seen = HashSet::new();
    keys.into_iter()
        .filter(|k| known.contains(k) && seen.insert(k.clone()))
        .collect()
}

/// Number of distinct course lessons present in the completed set.
pub fn completed_count(course: &CourseStructure, completed: &HashSet<String>) -> usize {
    course
        .sections
        .iter()
        .flat_map(|s| s.lessons.iter().map(|l| lesson_key(s.id, l.id)))
        .filter(|k| completed.contains(k))
        .count()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::entity::{LessonNode, SectionNode};

    fn lesson(id: Uuid) -> LessonNode {
        LessonNode {
            id,
            title: String::from("lesson"),
            video_url: None,
            duration_label: None,
        }
    }

    /// 2 sections x 2 lessons.
    fn course() -> (CourseStructure, [Uuid; 2], [Uuid; 4]) {
        let sections = [Uuid::new_v4(), Uuid::new_v4()];
        let lessons = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let structure = CourseStructure {
            course_id: Uuid::new_v4(),
            sections: vec![
                SectionNode {
                    id: sections[0],
                    title: String::from("s1"),
                    lessons: vec![lesson(lessons[0]), lesson(lessons[1])],
                },
                SectionNode {
                    id: sections[1],
                    title: String::from("s2"),
                    lessons: vec![lesson(lessons[2]), lesson(lessons[3])],
                },
            ],
        };
        (structure, sections, lessons)
    }

    #[test]
    fn first_section_always_open() {
        let (course, sections, lessons) = course();
        let completed = HashSet::new();

        assert!(can_access_section(&course, &completed, sections[0]));
        assert!(can_access_lesson(&course, &completed, sections[0], lessons[0]));
        assert!(!can_access_lesson(&course, &completed, sections[0], lessons[1]));
    }

    #[test]
    fn second_section_locked_until_first_done() {
        let (course, sections, lessons) = course();
        let mut completed = HashSet::new();

        assert!(!can_access_section(&course, &completed, sections[1]));

        completed.insert(lesson_key(sections[0], lessons[0]));
        assert!(!can_access_section(&course, &completed, sections[1]));

        completed.insert(lesson_key(sections[0], lessons[1]));
        assert!(can_access_section(&course, &completed, sections[1]));
        assert!(can_access_lesson(&course, &completed, sections[1], lessons[2]));
        // later lessons of the newly opened section stay locked
        assert!(!can_access_lesson(&course, &completed, sections[1], lessons[3]));
    }

    #[test]
    fn accessible_lesson_implies_all_predecessors_done() {
        // monotonicity: walk every lesson in section-major order and check
        // that accessibility implies completed prefix (or first overall)
        let (course, _, _) = course();
        let mut completed = HashSet::new();

        let ordered: Vec<(Uuid, Uuid)> = course
            .sections
            .iter()
            .flat_map(|s| s.lessons.iter().map(move |l| (s.id, l.id)))
            .collect();

        for (i, (sid, lid)) in ordered.iter().enumerate() {
            if can_access_lesson(&course, &completed, *sid, *lid) {
                assert!(
                    i == 0
                        || ordered[..i]
                            .iter()
                            .all(|(s, l)| completed.contains(&lesson_key(*s, *l)))
                );
            }
            completed.insert(lesson_key(*sid, *lid));
        }
    }

    #[test]
    fn unknown_ids_are_inaccessible() {
        let (course, sections, _) = course();
        let completed = HashSet::new();

        assert!(!can_access_section(&course, &completed, Uuid::new_v4()));
        assert!(!can_access_lesson(&course, &completed, sections[0], Uuid::new_v4()));
    }

    #[test]
    fn retain_known_keys_drops_strays_and_duplicates() {
        let (course, sections, lessons) = course();
        let keys = vec![
            lesson_key(sections[0], lessons[0]),
            lesson_key(sections[0], lessons[0]),
            String::from("garbage"),
            lesson_key(Uuid::new_v4(), lessons[1]),
        ];

        let kept = retain_known_keys(&course, keys);
        assert_eq!(kept, vec![lesson_key(sections[0], lessons[0])]);
    }
}

//! Quiz grading against the authoritative answer key.

use std::collections::HashMap;

use uuid::Uuid;

use crate::model::entity::{QuestionOutcome, QuizQuestion};

/// Program-wide passing threshold, inclusive. Treated as an invariant of the
/// platform, not per-course data.
pub const PASS_THRESHOLD: f64 = 0.70;

/// Maximum grading attempts per (user, course) and UTC calendar day.
pub const DAILY_ATTEMPT_QUOTA: i64 = 3;

#[derive(Debug, Clone)]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    pub selected_answer: String,
}

#[derive(Debug, Clone)]
pub struct GradeOutcome {
    pub score: i32,
    pub total: i32,
    pub passed: bool,
    pub detail: Vec<QuestionOutcome>,
}

/// Builds the questionId -> correct answer lookup from the stored quiz.
/// Client-supplied keys are never consulted.
pub fn answer_key(questions: &[QuizQuestion]) -> HashMap<Uuid, String> {
    questions
        .iter()
        .map(|q| (q.id(), q.correct_answer().to_string()))
        .collect()
}

/// Correctness is an exact match of the selected answer against the stored
/// key; unknown question ids grade as incorrect. Pass iff
/// score / total_submitted >= PASS_THRESHOLD.
pub fn grade(key: &HashMap<Uuid, String>, answers: &[SubmittedAnswer]) -> GradeOutcome {
    let mut detail = Vec::with_capacity(answers.len());
    let mut score = 0;

    for answer in answers {
        let correct = key
            .get(&answer.question_id)
            .is_some_and(|expected| *expected == answer.selected_answer);
        if correct {
            score += 1;
        }
        detail.push(QuestionOutcome {
            question_id: answer.question_id,
            correct,
        });
    }

    let total = answers.len() as i32;
    let passed = total > 0 && f64::from(score) / f64::from(total) >= PASS_THRESHOLD;

    GradeOutcome {
        score,
        total,
        passed,
        detail,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn key_of(n: usize) -> (HashMap<Uuid, String>, Vec<Uuid>) {
        let ids: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
        let key = ids.iter().map(|id| (*id, String::from("A"))).collect();
        (key, ids)
    }

    fn submit(ids: &[Uuid], correct: usize) -> Vec<SubmittedAnswer> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| SubmittedAnswer {
                question_id: *id,
                selected_answer: String::from(if i < correct { "A" } else { "B" }),
            })
            .collect()
    }

    #[test]
    fn seven_of_ten_passes() {
        let (key, ids) = key_of(10);
        let outcome = grade(&key, &submit(&ids, 7));
        assert_eq!(outcome.score, 7);
        assert_eq!(outcome.total, 10);
        assert!(outcome.passed); // threshold is inclusive
    }

    #[test]
    fn six_of_ten_fails() {
        let (key, ids) = key_of(10);
        let outcome = grade(&key, &submit(&ids, 6));
        assert_eq!(outcome.score, 6);
        assert!(!outcome.passed);
    }

    #[test]
    fn unknown_question_grades_incorrect() {
        let (key, _) = key_of(1);
        let answers = vec![SubmittedAnswer {
            question_id: Uuid::new_v4(),
            selected_answer: String::from("A"),
        }];
        let outcome = grade(&key, &answers);
        assert_eq!(outcome.score, 0);
        assert!(!outcome.detail[0].correct);
    }

    #[test]
    fn detail_tracks_each_submitted_answer() {
        let (key, ids) = key_of(3);
        let outcome = grade(&key, &submit(&ids, 2));
        assert_eq!(outcome.detail.len(), 3);
        assert!(outcome.detail[0].correct);
        assert!(outcome.detail[1].correct);
        assert!(!outcome.detail[2].correct);
    }

    #[test]
    fn empty_submission_never_passes() {
        let (key, _) = key_of(4);
        let outcome = grade(&key, &[]);
        assert_eq!(outcome.total, 0);
        assert!(!outcome.passed);
    }
}

// src/services/scoring.rs

//! Answer scoring and result aggregation.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{
    question::{Question, QuestionType},
    submission::{QuestionSnapshot, SubmittedAnswers},
};

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

fn word_counts(text: &str) -> HashMap<String, f64> {
    let mut counts = HashMap::new();
    for word in WORD.find_iter(&text.to_lowercase()) {
        *counts.entry(word.as_str().to_string()).or_insert(0.0) += 1.0;
    }
    counts
}

/// Cosine similarity of the two texts' word-frequency vectors, in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let left = word_counts(a);
    let right = word_counts(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let dot: f64 = left
        .iter()
        .filter_map(|(word, n)| right.get(word).map(|m| n * m))
        .sum();
    let norm = |v: &HashMap<String, f64>| v.values().map(|n| n * n).sum::<f64>().sqrt();

    (dot / (norm(&left) * norm(&right))).clamp(0.0, 1.0)
}

/// Marks earned by a descriptive answer, never more than `marks`.
pub fn descriptive_score(answer: &str, reference: &str, marks: f64) -> f64 {
    (similarity(answer, reference) * marks).min(marks)
}

/// Rounds half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn class_average(scores: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, n) = scores
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), s| (sum + s, n + 1));
    if n == 0 {
        return 0.0;
    }
    round2(sum / n as f64)
}

/// Outcome of scoring one submission.
#[derive(Debug, Clone)]
pub struct ScoreSheet {
    pub score: f64,
    pub total_marks: f64,
    /// The questions that were actually scored.
    pub snapshot: QuestionSnapshot,
}

/// Scores answers against a token's pool.
///
/// Answers naming a question outside the pool, or of the wrong kind, are ignored.
/// Only the first answer to a given question counts.
pub fn score_submission(answers: &SubmittedAnswers, pool: &[Question]) -> ScoreSheet {
    let by_id: HashMap<i64, &Question> = pool.iter().map(|q| (q.id, q)).collect();
    let mut seen = HashSet::new();

    let mut score = 0.0;
    let mut total_marks = 0.0;
    let mut snapshot = QuestionSnapshot::default();

    for entry in &answers.mcq {
        let Some(question) = by_id.get(&entry.id) else { continue };
        if question.kind() != Some(QuestionType::Mcq) || !seen.insert(entry.id) {
            continue;
        }
        if entry.answer == question.correct_answer {
            score += question.marks;
        }
        total_marks += question.marks;
        snapshot.mcq.push((*question).clone());
    }

    for entry in &answers.descriptive {
        let Some(question) = by_id.get(&entry.id) else { continue };
        if question.kind() != Some(QuestionType::Descriptive) || !seen.insert(entry.id) {
            continue;
        }
        score += descriptive_score(&entry.answer, &question.correct_answer, question.marks);
        total_marks += question.marks;
        snapshot.descriptive.push((*question).clone());
    }

    ScoreSheet {
        score: round2(score),
        total_marks,
        snapshot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::submission::AnswerEntry;
    use sqlx::types::Json;

    fn question(id: i64, kind: &str, correct: &str, marks: f64) -> Question {
        Question {
            id,
            token: "t".to_string(),
            question_type: kind.to_string(),
            question: "What is being asked here?".to_string(),
            options: Json(vec![]),
            correct_answer: correct.to_string(),
            correct_index: 0,
            marks,
            context: None,
            difficulty: None,
            subject: "General".to_string(),
            pdf_content: None,
            created_at: chrono::Utc::now(),
        }
    }

    fn entry(id: i64, answer: &str) -> AnswerEntry {
        AnswerEntry { id, answer: answer.to_string() }
    }

    #[test]
    fn similarity_bounds() {
        assert_eq!(similarity("", "anything"), 0.0);
        assert!((similarity("The Cell", "the cell") - 1.0).abs() < 1e-9);
        assert_eq!(similarity("alpha beta", "gamma delta"), 0.0);
        let partial = similarity("plants make sugar", "plants make sugar from light");
        assert!(partial > 0.5 && partial < 1.0);
    }

    #[test]
    fn descriptive_score_is_capped_at_marks() {
        let full = descriptive_score("same words", "same words", 10.0);
        assert!((full - 10.0).abs() < 1e-9 && full <= 10.0);
        assert_eq!(descriptive_score("", "reference", 10.0), 0.0);
    }

    #[test]
    fn rounding_and_average() {
        assert_eq!(round2(3.14159), 3.14);
        assert_eq!(round2(2.675000001), 2.68);
        assert_eq!(class_average(Vec::<f64>::new()), 0.0);
        assert_eq!(class_average([10.0, 5.0, 0.0]), 5.0);
        assert_eq!(class_average([1.0, 1.0, 2.0]), 1.33);
    }

    #[test]
    fn mcq_scoring_is_exact_match() {
        let pool = vec![question(1, "mcq", "Paris", 2.0), question(2, "mcq", "Rome", 2.0)];
        let answers = SubmittedAnswers {
            mcq: vec![entry(1, "Paris"), entry(2, "rome")],
            descriptive: vec![],
        };
        let sheet = score_submission(&answers, &pool);
        assert_eq!(sheet.score, 2.0);
        assert_eq!(sheet.total_marks, 4.0);
        assert_eq!(sheet.snapshot.mcq.len(), 2);
    }

    #[test]
    fn foreign_duplicate_and_mistyped_answers_are_ignored() {
        let pool = vec![question(1, "mcq", "Paris", 2.0), question(2, "descriptive", "Light", 10.0)];
        let answers = SubmittedAnswers {
            mcq: vec![entry(1, "Paris"), entry(1, "Paris"), entry(99, "x"), entry(2, "Light")],
            descriptive: vec![entry(2, "light"), entry(1, "Paris")],
        };
        let sheet = score_submission(&answers, &pool);
        assert_eq!(sheet.total_marks, 12.0);
        assert_eq!(sheet.score, 12.0);
        assert_eq!(sheet.snapshot.mcq.len(), 1);
        assert_eq!(sheet.snapshot.descriptive.len(), 1);
    }
}

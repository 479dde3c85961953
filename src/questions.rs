use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rand::seq::IndexedRandom;

/// Questions used when no external source is supplied.
pub const FIXED_QUESTIONS: &[&str] = &[
    "What is a SEG Portal?",
    "What is SarawakID?",
    "I cant register my SarawakID bc it says that my IC has been registered before, what should i do",
    "What is the difference between SarawakID and SarawakID Corp?",
    "If I want to enroll in the Senior Citizen Health Benefit, what are some of the eligibility?",
    "How much is the fee for upgrading the registration class in the electrical field?",
    "Check the gas bill 056-G2299 and seb bill 201166495100.",
    "May I know which agency has my talikhidmat case assigned to? Case number: 20240325-0006",
];

/// Pool of candidate questions for a run.
#[derive(Debug, Clone)]
pub struct QuestionPool {
    questions: Vec<String>,
}

impl QuestionPool {
    /// The built-in fixed question set.
    pub fn builtin() -> Self {
        Self {
            questions: FIXED_QUESTIONS.iter().map(|q| q.to_string()).collect(),
        }
    }

    /// Load a pool from a plain text file, one question per line. Blank
    /// lines are skipped and surrounding whitespace is trimmed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read question file {}", path.display()))?;
        let questions: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
        if questions.is_empty() {
            bail!("Question file {} contains no questions", path.display());
        }
        Ok(Self { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Pick `count` distinct questions at random. When `count` exceeds the
    /// pool, the whole pool is returned in shuffled order.
    pub fn pick(&self, count: usize) -> Vec<String> {
        let mut rng = rand::rng();
        self.questions
            .choose_multiple(&mut rng, count)
            .cloned()
            .collect()
    }
}

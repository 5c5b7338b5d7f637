// Quiz minigame: multiple-choice questions with a petal prize for the
// first correct answer.
//
// Questions come from a YAML catalog validated at startup. The Discord
// layer runs the buttons and the race; this module owns the question pool.

use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

pub const MAX_CHOICES: usize = 4;

#[derive(Debug, Clone, Deserialize)]
pub struct QuizQuestion {
    pub prompt: String,
    pub choices: Vec<String>,
    /// Index into `choices`.
    pub answer: usize,
    #[serde(default = "default_prize")]
    pub prize: i64,
    #[serde(default)]
    pub category: Option<String>,
}

fn default_prize() -> i64 {
    100
}

impl QuizQuestion {
    pub fn correct_choice(&self) -> &str {
        &self.choices[self.answer]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizCatalog {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("The quiz scroll is empty")]
    EmptyCatalog,

    #[error("Question {index} is malformed: {problem}")]
    MalformedQuestion { index: usize, problem: String },
}

#[derive(Debug)]
pub struct QuizService {
    catalog: QuizCatalog,
}

impl QuizService {
    /// Validate the catalog up front so a bad question file fails at boot,
    /// not mid-game.
    pub fn new(catalog: QuizCatalog) -> Result<Self, QuizError> {
        if catalog.questions.is_empty() {
            return Err(QuizError::EmptyCatalog);
        }
        for (index, q) in catalog.questions.iter().enumerate() {
            if q.choices.len() < 2 || q.choices.len() > MAX_CHOICES {
                return Err(QuizError::MalformedQuestion {
                    index,
                    problem: format!("expected 2 to {MAX_CHOICES} choices, got {}", q.choices.len()),
                });
            }
            if q.answer >= q.choices.len() {
                return Err(QuizError::MalformedQuestion {
                    index,
                    problem: format!("answer index {} out of range", q.answer),
                });
            }
            if q.prize <= 0 {
                return Err(QuizError::MalformedQuestion {
                    index,
                    problem: format!("prize must be positive, got {}", q.prize),
                });
            }
        }
        Ok(Self { catalog })
    }

    pub fn draw(&self, rng: &mut impl Rng) -> &QuizQuestion {
        let index = rng.gen_range(0..self.catalog.questions.len());
        &self.catalog.questions[index]
    }

    pub fn question_count(&self) -> usize {
        self.catalog.questions.len()
    }
}

//! Output formatting for `digit-recognizer predict`.
//!
//! Supports two modes: a human-readable table (default) and JSON (--json).

use tabled::{Table, Tabled};

use crate::ml::Prediction;

/// Output mode for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

#[derive(Tabled)]
pub struct ProbabilityRow {
    #[tabled(rename = "Digit")]
    pub digit: usize,
    #[tabled(rename = "Probability")]
    pub probability: String,
    #[tabled(rename = "")]
    pub marker: &'static str,
}

pub fn probability_rows(prediction: &Prediction) -> Vec<ProbabilityRow> {
    prediction
        .probabilities
        .iter()
        .enumerate()
        .map(|(digit, p)| ProbabilityRow {
            digit,
            probability: format!("{:.4}", p),
            marker: if digit == prediction.digit { "<" } else { "" },
        })
        .collect()
}

pub fn print_prediction(prediction: &Prediction) {
    println!(
        "Predicted digit: {} (confidence {:.2}%)",
        prediction.digit,
        prediction.confidence * 100.0
    );
    println!("{}", Table::new(probability_rows(prediction)));
}

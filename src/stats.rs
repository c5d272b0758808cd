//! Pure statistics over the answer log. Everything here reads the log and
//! never mutates it.

use itertools::{Itertools, MinMaxResult};

use crate::answer::{Answer, AnswerStatus, RoundType};

pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

pub fn std_dev(data: &[f64]) -> Option<f64> {
    match (mean(data), data.len()) {
        (Some(data_mean), count) if count > 0 => {
            let variance = data
                .iter()
                .map(|value| {
                    let diff = data_mean - *value;

                    diff * diff
                })
                .sum::<f64>()
                / count as f64;

            Some(variance.sqrt())
        }
        _ => None,
    }
}

/// Fraction of correct answers in the most recent `mean_size` machine-paced
/// rounds.
///
/// Scans the log backward consuming only machine-paced entries. A no-response
/// that the following answer reclassified via carryover is skipped without
/// counting (the late press already represents that round). When fewer than
/// `mean_size` entries exist, every missing slot counts as correct so the
/// ratio stays optimistic at test start. Returns NaN for a zero window.
pub fn rolling_correct_ratio(answers: &[Answer], mean_size: u32) -> f64 {
    if mean_size == 0 {
        return f64::NAN;
    }

    let mut collected = 0u32;
    let mut correct = 0u32;

    for (idx, answer) in answers.iter().enumerate().rev() {
        if collected == mean_size {
            break;
        }
        if answer.round_type != RoundType::MachinePaced {
            continue;
        }
        if answer.status == AnswerStatus::NoResponse {
            let reclassified = answers
                .get(idx + 1)
                .is_some_and(|next| next.carryover_classification.is_some());
            if reclassified {
                continue;
            }
        }
        collected += 1;
        if answer.status == AnswerStatus::Correct {
            correct += 1;
        }
    }

    // Optimistic padding for the slots the log cannot fill yet.
    correct += mean_size - collected;

    f64::from(correct) / f64::from(mean_size)
}

/// Per-status counts and response-time aggregates over machine-paced rounds.
/// The time aggregates are `None` when no machine-paced round ever happened;
/// a test can legitimately end before pacing starts.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct MachinePacedAggregates {
    pub correct: usize,
    pub incorrect: usize,
    pub no_response: usize,
    pub min_response_ms: Option<f64>,
    pub max_response_ms: Option<f64>,
    pub mean_response_ms: Option<f64>,
    pub std_dev_response_ms: Option<f64>,
}

pub fn machine_paced_aggregates(answers: &[Answer]) -> MachinePacedAggregates {
    let paced = answers
        .iter()
        .filter(|a| a.round_type == RoundType::MachinePaced)
        .collect::<Vec<_>>();

    let mut agg = MachinePacedAggregates::default();
    for answer in &paced {
        match answer.status {
            AnswerStatus::Correct => agg.correct += 1,
            AnswerStatus::Incorrect => agg.incorrect += 1,
            AnswerStatus::NoResponse => agg.no_response += 1,
        }
    }

    let times = paced.iter().map(|a| a.time_taken_ms).collect::<Vec<_>>();
    match times.iter().copied().minmax() {
        MinMaxResult::NoElements => {}
        MinMaxResult::OneElement(only) => {
            agg.min_response_ms = Some(only);
            agg.max_response_ms = Some(only);
        }
        MinMaxResult::MinMax(min, max) => {
            agg.min_response_ms = Some(min);
            agg.max_response_ms = Some(max);
        }
    }
    agg.mean_response_ms = mean(&times);
    agg.std_dev_response_ms = std_dev(&times);

    agg
}

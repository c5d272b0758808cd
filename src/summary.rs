//! Terminal reduction of a finished test: the answer log and block record
//! collapse into an immutable report for the results collaborator.

use std::path::Path;

use chrono::{DateTime, Local, Offset, Utc};
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use uuid::Uuid;

use crate::answer::Answer;
use crate::config::CpiConfig;
use crate::stats::{self, MachinePacedAggregates};

/// Why the test ended. Code 0 is the only success.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ExitCode {
    Success,
    PracticeCapExceeded,
    SelfPacedWrongLimit,
    SelfPacedSlowLimit,
    BlockLimit,
    PostBlockWrongLimit,
    RestartWrongLimit,
    TimedOut,
    Abandoned,
}

impl ExitCode {
    pub fn code(self) -> u8 {
        match self {
            ExitCode::Success => 0,
            ExitCode::PracticeCapExceeded => 1,
            ExitCode::SelfPacedWrongLimit => 2,
            ExitCode::SelfPacedSlowLimit => 3,
            ExitCode::BlockLimit => 4,
            ExitCode::PostBlockWrongLimit => 5,
            ExitCode::RestartWrongLimit => 6,
            ExitCode::TimedOut => 7,
            ExitCode::Abandoned => 8,
        }
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Success
    }

    pub fn message(self) -> &'static str {
        match self {
            ExitCode::Success => "test completed successfully",
            ExitCode::PracticeCapExceeded => {
                "practice rounds exhausted without a qualifying streak"
            }
            ExitCode::SelfPacedWrongLimit => "too many wrong answers during self-paced startup",
            ExitCode::SelfPacedSlowLimit => "too many slow correct answers during startup",
            ExitCode::BlockLimit => "maximum number of blocks reached",
            ExitCode::PostBlockWrongLimit => "too many wrong answers after a block",
            ExitCode::RestartWrongLimit => "too many wrong answers during a restart",
            ExitCode::TimedOut => "maximum test duration reached",
            ExitCode::Abandoned => "test abandoned",
        }
    }
}

/// The final immutable report. Produced exactly once per test and never
/// updated afterward.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub test_id: Uuid,
    pub taken_at_utc: DateTime<Utc>,
    pub timezone_offset_minutes: i32,
    pub status_code: u8,
    pub status: String,
    pub message: String,
    pub success: bool,
    pub test_duration_ms: f64,
    pub number_of_rounds: usize,
    /// Mean of the last two blocking durations; `None` before two blocks.
    pub blocking_round_duration_ms: Option<f64>,
    pub cognitive_processing_index: Option<f64>,
    pub block_count: usize,
    pub block_min_ms: Option<f64>,
    pub block_max_ms: Option<f64>,
    pub restart_count: u32,
    pub machine_paced: MachinePacedAggregates,
    pub answer_logs: Vec<Answer>,
}

impl Report {
    pub fn compile(
        code: ExitCode,
        answers: &[Answer],
        blocking_durations: &[f64],
        restart_count: u32,
        test_duration_ms: f64,
        cpi: &CpiConfig,
    ) -> Self {
        // The first entry is the -1 seed sentinel, not a real block.
        let blocks = &blocking_durations[1.min(blocking_durations.len())..];

        let blocking_round_duration_ms = if blocks.len() >= 2 {
            stats::mean(&blocks[blocks.len() - 2..])
        } else {
            None
        };

        let cognitive_processing_index =
            blocking_round_duration_ms.map(|brd| cognitive_processing_index(brd, cpi));

        let (block_min_ms, block_max_ms) = match blocks.iter().copied().minmax() {
            MinMaxResult::NoElements => (None, None),
            MinMaxResult::OneElement(only) => (Some(only), Some(only)),
            MinMaxResult::MinMax(min, max) => (Some(min), Some(max)),
        };

        let local_now = Local::now();

        Self {
            test_id: Uuid::new_v4(),
            taken_at_utc: Utc::now(),
            timezone_offset_minutes: local_now.offset().fix().local_minus_utc() / 60,
            status_code: code.code(),
            status: code.to_string(),
            message: code.message().to_string(),
            success: code.is_success(),
            test_duration_ms,
            number_of_rounds: answers.len(),
            blocking_round_duration_ms,
            cognitive_processing_index,
            block_count: blocks.len(),
            block_min_ms,
            block_max_ms,
            restart_count,
            machine_paced: stats::machine_paced_aggregates(answers),
            answer_logs: answers.to_vec(),
        }
    }

    /// Export the answer log as CSV, one row per recorded answer.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record([
            "status",
            "round_type",
            "answer_location",
            "location_clicked",
            "query_number",
            "query_representation",
            "timeout_allowed_ms",
            "time_taken_ms",
            "carryover",
            "ratio",
            "rolling_mean_ratio",
            "timestamp_ms",
        ])?;
        for answer in &self.answer_logs {
            wtr.write_record([
                answer.status.to_string(),
                answer.round_type.to_string(),
                answer.answer_location.to_string(),
                answer
                    .location_clicked
                    .map_or(String::new(), |l| l.to_string()),
                answer.query.number.to_string(),
                answer.query.representation.to_string(),
                format!("{:.2}", answer.timeout_allowed_ms),
                format!("{:.2}", answer.time_taken_ms),
                answer
                    .carryover_classification
                    .map_or(String::new(), |c| c.to_string()),
                format!("{:.4}", answer.ratio),
                answer
                    .correct_rolling_mean_ratio
                    .map_or(String::new(), |r| format!("{r:.4}")),
                format!("{:.2}", answer.timestamp_ms),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Linear map from blocking round duration to the CPI scale:
/// `M * (brd - brd_min) + 100` with `M = (cpi_max - cpi_min) / (brd_min - brd_max)`.
pub fn cognitive_processing_index(brd_ms: f64, cpi: &CpiConfig) -> f64 {
    let m = (cpi.cpi_max - cpi.cpi_min) / (cpi.brd_min_ms - cpi.brd_max_ms);
    m * (brd_ms - cpi.brd_min_ms) + 100.0
}

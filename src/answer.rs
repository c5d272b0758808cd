use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// How a query digit is shown to the subject.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Representation {
    Numeric,
    DotPattern,
}

impl Representation {
    pub fn opposite(self) -> Self {
        match self {
            Representation::Numeric => Representation::DotPattern,
            Representation::DotPattern => Representation::Numeric,
        }
    }
}

/// The stimulus shown for one round: a digit 1..=9 in one of two representations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub number: u8,
    pub representation: Representation,
}

impl Query {
    pub fn new(number: u8, representation: Representation) -> Self {
        Self {
            number,
            representation,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AnswerStatus {
    Correct,
    Incorrect,
    NoResponse,
}

/// Round types, in the order a full test progresses through them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RoundType {
    Training,
    Practice,
    SelfPacedStartup,
    MachinePaced,
    PostBlock,
    SelfPacedRestart,
    Final,
}

impl RoundType {
    /// Rounds where the machine imposes the response deadline. Everywhere else
    /// the subject only faces a generous no-response ceiling and the recorded
    /// `timeout_allowed_ms` is the -1 sentinel.
    pub fn is_paced(self) -> bool {
        matches!(self, RoundType::MachinePaced | RoundType::Final)
    }
}

/// Sentinel for "no timeout applies" (unpaced rounds) and for the seed entry
/// of the block record.
pub const UNPACED: f64 = -1.0;

/// One recorded response (or non-response), immutable once appended to the log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub status: AnswerStatus,
    pub round_type: RoundType,
    /// The correct button location for this round, 1..=6.
    pub answer_location: u8,
    /// Where the subject actually pressed; `None` means the round timed out.
    pub location_clicked: Option<u8>,
    pub query: Query,
    /// Deadline the subject had to respond within, or [`UNPACED`].
    pub timeout_allowed_ms: f64,
    /// Elapsed ms since the previous answer (or test start for the first one).
    pub time_taken_ms: f64,
    /// Set when a late press was credited/debited to the previous round's
    /// stimulus instead of being judged purely against this round.
    pub carryover_classification: Option<AnswerStatus>,
    /// `time_taken_ms / timeout_allowed_ms`, 0 for unpaced rounds.
    pub ratio: f64,
    /// Rolling correct ratio at the moment this answer was appended; recorded
    /// for machine-paced rounds only.
    pub correct_rolling_mean_ratio: Option<f64>,
    /// Absolute time of the answer event, ms on the machine's clock.
    pub timestamp_ms: f64,
}

/// Outbound "display round" signal handed to the rendering collaborator
/// whenever a new round begins.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundPresentation {
    pub round_type: RoundType,
    pub answer_location: u8,
    pub query: Query,
    pub decoys: [Query; 5],
    /// Deadline armed for this round; a no-response is recorded when it fires.
    pub timeout_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_representation_opposite() {
        assert_eq!(
            Representation::Numeric.opposite(),
            Representation::DotPattern
        );
        assert_eq!(
            Representation::DotPattern.opposite(),
            Representation::Numeric
        );
    }

    #[test]
    fn test_round_type_pacing() {
        assert!(RoundType::MachinePaced.is_paced());
        assert!(RoundType::Final.is_paced());
        assert!(!RoundType::Training.is_paced());
        assert!(!RoundType::Practice.is_paced());
        assert!(!RoundType::SelfPacedStartup.is_paced());
        assert!(!RoundType::PostBlock.is_paced());
        assert!(!RoundType::SelfPacedRestart.is_paced());
    }

    #[test]
    fn test_round_type_display() {
        assert_eq!(
            RoundType::SelfPacedStartup.to_string(),
            "self-paced-startup"
        );
        assert_eq!(RoundType::MachinePaced.to_string(), "machine-paced");
        assert_eq!(AnswerStatus::NoResponse.to_string(), "no-response");
    }

    #[test]
    fn test_query_serde_roundtrip() {
        let q = Query::new(7, Representation::DotPattern);
        let json = serde_json::to_string(&q).unwrap();
        assert!(json.contains("dot-pattern"));
        let back: Query = serde_json::from_str(&json).unwrap();
        assert_eq!(q, back);
    }
}

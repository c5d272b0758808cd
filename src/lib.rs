// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod answer;
pub mod config;
pub mod history;
pub mod machine;
pub mod runtime;
pub mod stats;
pub mod stimulus;
pub mod summary;
pub mod timer;

pub use answer::{Answer, AnswerStatus, Query, Representation, RoundPresentation, RoundType};
pub use config::{CogSpeedConfig, ConfigError, ConfigStore, FileConfigStore};
pub use machine::{Advance, MachineError, RoundMachine};
pub use summary::{ExitCode, Report};

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cogspeed::history::HistoryDb;
use cogspeed::machine::Advance;
use cogspeed::summary::ExitCode;
use cogspeed::{CogSpeedConfig, ConfigStore, FileConfigStore, RoundMachine, RoundPresentation};

/// headless simulator for the adaptive reaction-time engine
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Drives a synthetic subject through a full adaptive reaction-time test \
                  with deterministic timestamps and prints the final report as JSON."
)]
struct Cli {
    /// path to a JSON config file; the builtin profile is used when omitted
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// seed for the stimulus RNG and the simulated subject
    #[clap(short, long, default_value_t = 42)]
    seed: u64,

    /// mean response time of the simulated subject
    #[clap(long, default_value_t = 650.0)]
    mean_rt_ms: f64,

    /// probability that an in-time response hits the right button
    #[clap(long, default_value_t = 0.95)]
    accuracy: f64,

    /// safety cap on simulated events
    #[clap(long, default_value_t = 5000)]
    max_events: u32,

    /// record the finished report into the local history database
    #[clap(long)]
    save: bool,

    /// export the answer log as CSV to the given path
    #[clap(long)]
    csv: Option<PathBuf>,
}

/// A synthetic subject: responds around `mean_rt_ms` with jitter, misses the
/// deadline when the pacing outruns it, and slows further while lapsing so
/// that blocks actually form.
struct Subject {
    rng: StdRng,
    mean_rt_ms: f64,
    accuracy: f64,
    consecutive_misses: u32,
}

impl Subject {
    fn new(seed: u64, mean_rt_ms: f64, accuracy: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed.wrapping_add(1)),
            mean_rt_ms,
            accuracy: accuracy.clamp(0.0, 1.0),
            consecutive_misses: 0,
        }
    }

    /// Decide the response to one round: `(elapsed_ms, pressed_location)`,
    /// where `None` means the deadline fired first.
    fn respond(&mut self, round: &RoundPresentation) -> (f64, Option<u8>) {
        let lapse = f64::from(self.consecutive_misses) * 200.0;
        let rt = (self.mean_rt_ms + lapse + self.rng.gen_range(-120.0..120.0)).max(180.0);

        if round.round_type.is_paced() && rt >= round.timeout_ms {
            self.consecutive_misses += 1;
            return (round.timeout_ms, None);
        }
        self.consecutive_misses = 0;

        let location = if self.rng.gen_bool(self.accuracy) {
            round.answer_location
        } else {
            // Any of the five wrong buttons.
            let mut wrong = self.rng.gen_range(1..=6u8);
            if wrong == round.answer_location {
                wrong = if wrong == 6 { 1 } else { wrong + 1 };
            }
            wrong
        };
        (rt, Some(location))
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => FileConfigStore::with_path(path).load()?,
        None => CogSpeedConfig::builtin(),
    };
    config.rng_seed = Some(cli.seed);

    let mut machine = RoundMachine::new(config)?;
    let mut subject = Subject::new(cli.seed, cli.mean_rt_ms, cli.accuracy);

    let mut clock = 0.0;
    let mut round = machine.start(Some(0.0))?;

    let mut code = ExitCode::Abandoned;
    for _ in 0..cli.max_events {
        let (elapsed, location) = subject.respond(&round);
        clock += elapsed;
        match machine.record_response(location, Some(clock))? {
            Advance::Next(next) => round = next,
            Advance::Finished(exit) => {
                code = exit;
                break;
            }
            Advance::Ignored => break,
        }
    }
    if machine.report().is_none() {
        machine.stop(code, Some(clock));
    }

    // report() is always populated after the loop above.
    let report = machine.report().expect("report after stop");
    println!("{}", serde_json::to_string_pretty(report)?);

    if let Some(path) = &cli.csv {
        report.write_csv(path)?;
    }
    if cli.save {
        HistoryDb::new()?.record_report(report)?;
    }

    Ok(())
}

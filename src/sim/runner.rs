use std::io;
use std::path::PathBuf;

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use super::context::TickContext;
use super::system::{SimSystem, TickFrequency};
use crate::flush::flush_to_jsonl;
use crate::model::date::{DAYS_PER_MONTH, DAYS_PER_YEAR, MONTHS_PER_YEAR};
use crate::model::{SimDate, Society};

/// Configuration for a simulation run.
pub struct SimConfig {
    pub start_year: u32,
    pub num_years: u32,
    pub seed: u64,
    /// If set, flush class state every N years.
    pub flush_interval: Option<u32>,
    /// Directory to write flush checkpoints into.
    pub output_dir: Option<PathBuf>,
}

impl SimConfig {
    pub fn new(start_year: u32, num_years: u32, seed: u64) -> Self {
        Self {
            start_year,
            num_years,
            seed,
            flush_interval: None,
            output_dir: None,
        }
    }

    /// Write a checkpoint under `dir` every `interval` years and after the last year.
    pub fn with_flush(mut self, interval: u32, dir: impl Into<PathBuf>) -> Self {
        self.flush_interval = Some(interval.max(1));
        self.output_dir = Some(dir.into());
        self
    }
}

/// Returns true if a system with the given frequency should fire on this date.
pub fn should_fire(freq: TickFrequency, date: SimDate) -> bool {
    match freq {
        TickFrequency::Daily => true,
        TickFrequency::Monthly => date.is_month_start(),
        TickFrequency::Yearly => date.is_year_start(),
    }
}

/// Set `society.current_date` and call each system whose frequency matches.
///
/// Signal delivery is **single-pass, non-cascading**:
///
/// 1. **Phase 1 (tick):** Each system's `tick()` runs in registration order.
///    All signals emitted during this phase are collected into a shared buffer.
/// 2. **Phase 2 (react):** If any signals were emitted, each system's
///    `handle_signals()` is called with the full signal buffer as `ctx.inbox`.
///    Signals pushed during this phase are discarded at the end of the cycle.
///
/// A reaction that needs to propagate further must do so through society state
/// that a later tick's Phase 1 observes.
pub fn dispatch_systems(
    society: &mut Society,
    systems: &mut [Box<dyn SimSystem>],
    rng: &mut dyn RngCore,
    date: SimDate,
) {
    society.current_date = date;

    // Phase 1: tick systems, collecting signals
    let mut signals = Vec::new();
    for system in systems.iter_mut() {
        if should_fire(system.frequency(), date) {
            let mut ctx = TickContext {
                society,
                rng,
                signals: &mut signals,
                inbox: &[],
            };
            system.tick(&mut ctx);
        }
    }

    // Phase 2: deliver signals for reaction (only if any were emitted)
    if !signals.is_empty() {
        for system in systems.iter_mut() {
            if should_fire(system.frequency(), date) {
                let mut new_signals = Vec::new();
                let mut ctx = TickContext {
                    society,
                    rng,
                    signals: &mut new_signals,
                    inbox: &signals,
                };
                system.handle_signals(&mut ctx);
            }
        }
    }
}

/// Run the simulation for the configured number of years.
///
/// Creates a deterministic RNG from `config.seed`, so the same seed and inputs
/// always produce the same history. The loop iterates at the finest granularity
/// needed by any registered system.
pub fn run(
    society: &mut Society,
    systems: &mut [Box<dyn SimSystem>],
    config: SimConfig,
) -> io::Result<()> {
    let Some(finest) = systems.iter().map(|s| s.frequency()).max() else {
        return Ok(());
    };
    if config.num_years == 0 {
        return Ok(());
    }

    let mut rng = SmallRng::seed_from_u64(config.seed);
    tracing::info!(
        start_year = config.start_year,
        num_years = config.num_years,
        seed = config.seed,
        systems = systems.len(),
        "simulation started"
    );

    for year_offset in 0..config.num_years {
        let year = config.start_year + year_offset;
        match finest {
            TickFrequency::Yearly => {
                dispatch_systems(society, systems, &mut rng, SimDate::new(year, 1));
            }
            TickFrequency::Monthly => {
                for month in 0..MONTHS_PER_YEAR {
                    let day = month * DAYS_PER_MONTH + 1;
                    dispatch_systems(society, systems, &mut rng, SimDate::new(year, day));
                }
            }
            TickFrequency::Daily => {
                for day in 1..=DAYS_PER_YEAR {
                    dispatch_systems(society, systems, &mut rng, SimDate::new(year, day));
                }
            }
        }

        // Flush checkpoint at configured interval
        if let (Some(interval), Some(dir)) = (config.flush_interval, &config.output_dir) {
            let is_last_year = year_offset == config.num_years - 1;
            if is_last_year || (year_offset + 1) % interval.max(1) == 0 {
                let checkpoint_dir = dir.join(format!("year_{year:06}"));
                flush_to_jsonl(society, &checkpoint_dir)?;
            }
        }
    }

    tracing::info!(
        end_year = config.start_year + config.num_years - 1,
        conflicts = society.classes.conflicts().len(),
        events = society.events.len(),
        "simulation finished"
    );
    Ok(())
}

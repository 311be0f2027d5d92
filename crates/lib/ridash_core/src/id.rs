//! Snowflake-style 64-bit ID generation.
//!
//! Layout (most significant first): 43 bits of milliseconds since
//! 2024-01-01T00:00:00Z, 10 bits of machine ID, 10 bits of sequence.
//! IDs are positive, unique per machine and increase monotonically.

use std::sync::Mutex;

use chrono::Utc;
use thiserror::Error;

/// 2024-01-01T00:00:00Z in Unix milliseconds.
const EPOCH_MS: i64 = 1_704_067_200_000;

const BITS_SEQUENCE: u32 = 10;
const BITS_MACHINE_ID: u32 = 10;
const BITS_TIME: u32 = 63 - BITS_SEQUENCE - BITS_MACHINE_ID;

const MAX_SEQUENCE: i64 = (1 << BITS_SEQUENCE) - 1;
const MAX_MACHINE_ID: u16 = (1 << BITS_MACHINE_ID) - 1;
const MAX_ELAPSED: i64 = (1 << BITS_TIME) - 1;

/// ID generation errors.
#[derive(Debug, Error)]
pub enum IdError {
    #[error("machine ID {0} out of range (0..={MAX_MACHINE_ID})")]
    InvalidMachineId(u16),

    #[error("clock is before the generator epoch")]
    ClockBeforeEpoch,

    #[error("generator time space exhausted")]
    Exhausted,

    #[error("generator state poisoned")]
    Poisoned,
}

/// Source of unique 64-bit identifiers.
///
/// A single process-wide instance is created at start-up and passed by
/// reference to whatever needs new IDs.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Result<i64, IdError>;
}

#[derive(Debug)]
struct SnowflakeState {
    elapsed: i64,
    sequence: i64,
}

/// Time-ordered ID generator.
#[derive(Debug)]
pub struct Snowflake {
    machine_id: u16,
    state: Mutex<SnowflakeState>,
}

impl Snowflake {
    /// Create a generator for the given machine ID (0..=1023).
    pub fn new(machine_id: u16) -> Result<Self, IdError> {
        if machine_id > MAX_MACHINE_ID {
            return Err(IdError::InvalidMachineId(machine_id));
        }
        Ok(Self {
            machine_id,
            state: Mutex::new(SnowflakeState {
                elapsed: -1,
                sequence: MAX_SEQUENCE,
            }),
        })
    }

    fn elapsed_now(&self) -> Result<i64, IdError> {
        let elapsed = Utc::now().timestamp_millis() - EPOCH_MS;
        if elapsed < 0 {
            return Err(IdError::ClockBeforeEpoch);
        }
        Ok(elapsed)
    }

    fn compose(&self, elapsed: i64, sequence: i64) -> Result<i64, IdError> {
        if elapsed > MAX_ELAPSED {
            return Err(IdError::Exhausted);
        }
        Ok((elapsed << (BITS_SEQUENCE + BITS_MACHINE_ID))
            | (i64::from(self.machine_id) << BITS_SEQUENCE)
            | sequence)
    }
}

impl IdGenerator for Snowflake {
    fn next_id(&self) -> Result<i64, IdError> {
        let now = self.elapsed_now()?;
        let mut state = self.state.lock().map_err(|_| IdError::Poisoned)?;

        if now > state.elapsed {
            state.elapsed = now;
            state.sequence = 0;
        } else {
            // Same tick (or the clock stepped back): continue on the last tick
            // and borrow the next one once the sequence wraps.
            state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
            if state.sequence == 0 {
                state.elapsed += 1;
            }
        }

        self.compose(state.elapsed, state.sequence)
    }
}

/// Extract the machine ID bits from an ID.
pub fn machine_id_of(id: i64) -> u16 {
    ((id >> BITS_SEQUENCE) & i64::from(MAX_MACHINE_ID)) as u16
}

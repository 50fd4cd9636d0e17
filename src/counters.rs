//! Plain per-session counters
//!
//! Words, characters, deletion patterns and the pressure accumulator.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterBank {
    pub words_typed: u32,
    pub characters_typed: u32,
    /// Every backspace press, whatever its purpose
    pub backspaces: u32,
    /// Deletions of a complete word or sentence
    pub word_or_sentence_deletions: u32,
    /// Runs of two or more consecutive backspaces
    pub backspace_bursts: u32,
    /// Longest burst seen so far
    pub max_backspace_burst: u32,
    /// Character deletions, including partial selections and one per burst
    pub characters_deleted: u32,
    /// Net pressure counter (samples added minus samples removed)
    pub pressure: i64,
}

impl CounterBank {
    pub fn word_typed(&mut self) {
        self.words_typed += 1;
    }

    pub fn character_typed(&mut self) {
        self.characters_typed += 1;
    }

    pub fn backspace_pressed(&mut self) {
        self.backspaces += 1;
    }

    pub fn word_or_sentence_deleted(&mut self) {
        self.word_or_sentence_deletions += 1;
    }

    /// Record a burst of `length` consecutive backspaces.
    ///
    /// Also counts as one character deletion.
    pub fn backspace_burst(&mut self, length: u32) {
        self.backspace_bursts += 1;
        self.characters_deleted += 1;
        if length > self.max_backspace_burst {
            self.max_backspace_burst = length;
        }
    }

    pub fn character_deleted(&mut self) {
        self.characters_deleted += 1;
    }

    /// Add a pressure sample. Negative samples and overflow leave the
    /// counter untouched.
    pub fn add_pressure(&mut self, amount: i64) -> Result<(), EngineError> {
        if amount < 0 {
            return Err(EngineError::InvalidPressure(amount));
        }
        self.pressure = self
            .pressure
            .checked_add(amount)
            .ok_or(EngineError::PressureOverflow)?;
        Ok(())
    }

    pub fn remove_pressure(&mut self, amount: i64) -> Result<(), EngineError> {
        if amount < 0 {
            return Err(EngineError::InvalidPressure(amount));
        }
        self.pressure = self
            .pressure
            .checked_sub(amount)
            .ok_or(EngineError::PressureOverflow)?;
        Ok(())
    }
}

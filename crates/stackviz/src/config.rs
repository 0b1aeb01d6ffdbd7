use crate::layout::{Endianness, StackLayout, WORD_LENGTH_BYTES};
use crate::{Error, Result};

/// Rows the window materializes when a run starts.
pub const INITIAL_ROW_COUNT: usize = 36;

/// Rows added when the stack pointer gets close to the end of the window.
pub const GROWTH_BATCH: usize = 5;

/// Distance (in rows) from the window end that triggers a growth batch.
pub const REMAINING_ROWS_THRESHOLD: usize = 5;

/// Extra rows added past a store that lands beyond the window.
pub const LOOKAHEAD_ROWS: usize = 10;

/// Constructor parameters of a [`StackTracker`](crate::StackTracker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub layout: StackLayout,
    pub word_size: u32,
    pub endianness: Endianness,
    pub initial_rows: usize,
    pub growth_batch: usize,
    pub growth_threshold: usize,
    pub lookahead_rows: usize,
    /// Treat a `j` right after an instruction that wrote `$ra` as a call.
    pub detect_jal_equivalents: bool,
    /// Only `jr $ra` returns; `jr` through other registers is an indirect jump.
    pub ra_only_returns: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            layout: StackLayout::default(),
            word_size: WORD_LENGTH_BYTES,
            endianness: Endianness::default(),
            initial_rows: INITIAL_ROW_COUNT,
            growth_batch: GROWTH_BATCH,
            growth_threshold: REMAINING_ROWS_THRESHOLD,
            lookahead_rows: LOOKAHEAD_ROWS,
            detect_jal_equivalents: false,
            ra_only_returns: false,
        }
    }
}

impl TrackerConfig {
    #[must_use]
    pub fn with_layout(mut self, layout: StackLayout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn with_initial_rows(mut self, rows: usize) -> Self {
        self.initial_rows = rows;
        self
    }

    #[must_use]
    pub fn with_growth(mut self, batch: usize, threshold: usize) -> Self {
        self.growth_batch = batch;
        self.growth_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    #[must_use]
    pub fn with_jal_equivalents(mut self, enabled: bool) -> Self {
        self.detect_jal_equivalents = enabled;
        self
    }

    #[must_use]
    pub fn with_ra_only_returns(mut self, enabled: bool) -> Self {
        self.ra_only_returns = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.word_size.is_power_of_two() || self.word_size > WORD_LENGTH_BYTES {
            return Err(Error::InvalidConfig(format!(
                "word size {} must be a power of two no larger than {WORD_LENGTH_BYTES}",
                self.word_size
            )));
        }
        self.layout.validate().map_err(Error::InvalidConfig)?;
        if self.growth_batch == 0 {
            return Err(Error::InvalidConfig(
                "growth batch must add at least one row".to_string(),
            ));
        }
        Ok(())
    }
}

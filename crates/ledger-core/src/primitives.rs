//! # Ledger Primitives
//!
//! Hardcoded runtime constants for the movement ledger.
//!
//! These are compiled into the binary. The only value callers may override
//! is the history window, through `LedgerPolicy`.

/// Default length of the accepted business-date window, in years.
///
/// A business date earlier than `today - DEFAULT_HISTORY_YEARS` is rejected
/// with `TooOld`.
pub const DEFAULT_HISTORY_YEARS: u32 = 10;

/// Maximum length for movement notes, in bytes.
pub const MAX_NOTES_LENGTH: usize = 1024;

/// Maximum length for the `processed_by` actor name, in bytes.
pub const MAX_ACTOR_LENGTH: usize = 128;

/// Maximum length for asset, unit and site identifiers, in bytes.
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Metadata key holding the next sequence to allocate.
pub const NEXT_SEQUENCE_KEY: &str = "next_sequence";

/// First sequence handed out by an empty store.
pub const FIRST_SEQUENCE: u64 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_window_is_ten_years() {
        assert_eq!(DEFAULT_HISTORY_YEARS, 10);
    }

    #[test]
    fn sequences_start_above_zero() {
        assert!(FIRST_SEQUENCE > 0);
    }
}

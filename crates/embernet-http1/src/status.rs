//! Outcome of a single [`crate::RequestDecoder::feed`] call.

/// Status returned from [`crate::RequestDecoder::feed`].
///
/// See the driver algorithm documented on [`crate::RequestDecoder::feed`] for
/// the exact rules governing which status is returned when several could
/// apply during a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeStatus {
    /// All bytes of this slice were consumed; more input may follow.
    DecodingInProgress,
    /// The decoder is blocked waiting for more bytes; a prefix may already
    /// have been consumed.
    NeedMoreInput,
    /// The end of the header block was reached (`CRLF CRLF`).
    Complete,
    /// A grammar violation was detected, or the caller's buffer was full
    /// with no fallback available to make progress.
    IllFormed,
    /// The decoder was misused: called before `reset`, with an empty slice,
    /// or after a terminal status.
    InternalError,
}

impl DecodeStatus {
    /// True for [`DecodeStatus::Complete`] and [`DecodeStatus::IllFormed`],
    /// the two statuses after which the decoder requires an explicit
    /// [`crate::RequestDecoder::reset`] before any further `feed` call can
    /// do anything but return [`DecodeStatus::InternalError`].
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::IllFormed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(DecodeStatus::Complete.is_terminal());
        assert!(DecodeStatus::IllFormed.is_terminal());
        assert!(!DecodeStatus::DecodingInProgress.is_terminal());
        assert!(!DecodeStatus::NeedMoreInput.is_terminal());
        assert!(!DecodeStatus::InternalError.is_terminal());
    }
}

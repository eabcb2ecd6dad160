//! Output stream capability flags
//!
//! Every output stream carries one fixed set of capability flags describing
//! what the remote end does with the channel: render it locally (`PLAY`),
//! re-transmit it to a further peer (`RELAY`), or consume metadata only
//! (`METADATA`). The flags combine freely — a GUI client that watches while
//! relaying is `PLAY | RELAY` — so admission control reasons in
//! per-capability counts, not physical connection counts.

use std::ops::{BitOr, BitOrAssign};

/// Bit-set of output stream capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OutputStreamType(u8);

impl OutputStreamType {
    /// Empty capability set
    pub const NONE: Self = Self(0);
    /// Renders the channel locally
    pub const PLAY: Self = Self(1);
    /// Re-transmits the channel to a downstream peer
    pub const RELAY: Self = Self(1 << 1);
    /// Consumes channel metadata only
    pub const METADATA: Self = Self(1 << 2);

    /// Whether every flag in `other` is set in `self`
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no flag is set
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Raw flag bits
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for OutputStreamType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for OutputStreamType {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::fmt::Display for OutputStreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "None");
        }
        let mut first = true;
        for (flag, label) in [
            (Self::PLAY, "Play"),
            (Self::RELAY, "Relay"),
            (Self::METADATA, "Metadata"),
        ] {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{label}")?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        let combined = OutputStreamType::PLAY | OutputStreamType::RELAY;

        assert!(combined.contains(OutputStreamType::PLAY));
        assert!(combined.contains(OutputStreamType::RELAY));
        assert!(!combined.contains(OutputStreamType::METADATA));
        // Every set contains the empty set
        assert!(combined.contains(OutputStreamType::NONE));
        assert!(OutputStreamType::NONE.contains(OutputStreamType::NONE));
    }

    #[test]
    fn test_empty() {
        assert!(OutputStreamType::NONE.is_empty());
        assert!(!OutputStreamType::METADATA.is_empty());
        assert!(!OutputStreamType::NONE.contains(OutputStreamType::PLAY));
    }

    #[test]
    fn test_display() {
        assert_eq!(OutputStreamType::NONE.to_string(), "None");
        assert_eq!(OutputStreamType::RELAY.to_string(), "Relay");
        assert_eq!(
            (OutputStreamType::PLAY | OutputStreamType::RELAY | OutputStreamType::METADATA)
                .to_string(),
            "Play|Relay|Metadata"
        );
    }
}

//! Event identifiers and posting flags.

use super::EventId;
use bitflags::bitflags;

bitflags! {
    /// Which callbacks the sound engine should raise for a posted event
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CallbackFlags: u32 {
        const END_OF_EVENT = 0x0001;
        const END_OF_DYNAMIC_SEQUENCE_ITEM = 0x0002;
        const MARKER = 0x0004;
        const DURATION = 0x0008;
        const STARVATION = 0x0020;
        const MUSIC_PLAYLIST_SELECT = 0x0040;
        const MUSIC_PLAY_STARTED = 0x0080;
        const MUSIC_SYNC_BEAT = 0x0100;
        const MUSIC_SYNC_BAR = 0x0200;
    }
}

impl CallbackFlags {
    /// Converts a raw mask as passed from scripting, dropping unknown bits.
    pub fn from_mask(mask: i32) -> Self {
        Self::from_bits_truncate(mask as u32)
    }
}

/// Hashes an object name to the 32-bit short id the sound engine uses.
///
/// FNV-1 over the lower-cased UTF-8 bytes of the name.
pub fn short_id(name: &str) -> u32 {
    const OFFSET_BASIS: u32 = 2_166_136_261;
    const PRIME: u32 = 16_777_619;

    name.to_lowercase()
        .bytes()
        .fold(OFFSET_BASIS, |hash, byte| hash.wrapping_mul(PRIME) ^ u32::from(byte))
}

/// An event, referenced either by short id or by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventRef {
    Id(EventId),
    Name(String),
}

impl EventRef {
    pub fn id(&self) -> EventId {
        match self {
            Self::Id(id) => *id,
            Self::Name(name) => EventId(short_id(name)),
        }
    }
}

impl From<EventId> for EventRef {
    fn from(id: EventId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for EventRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_ids_match_generated_bank_ids() {
        assert_eq!(short_id("Play_Fireplace"), 1_501_216_439);
        assert_eq!(short_id("Play_Footstep"), 1_602_358_412);
        assert_eq!(short_id("PauseGame"), 1_589_270_263);
    }

    #[test]
    fn short_ids_ignore_case() {
        assert_eq!(short_id("RELEASE"), short_id("release"));
        assert_eq!(EventRef::from("Release").id(), EventId(2_405_648_188));
    }

    #[test]
    fn unknown_callback_bits_are_dropped() {
        let flags = CallbackFlags::from_mask(0x0001 | 0x4000_0000);
        assert_eq!(flags, CallbackFlags::END_OF_EVENT);
    }
}

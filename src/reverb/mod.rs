//! Per-emitter reverb sends.
//!
//! Every room reverb an emitter sends to is a [`ReverbSendControl`] that fades
//! its gain in and out. A [`ReverbSendTable`] keeps those sends within the
//! world's `max_simultaneous_reverb_volumes` budget and tells its owner when
//! the list the engine holds is out of date.

pub mod control;
pub mod table;

pub use control::{FadeState, ReverbSendControl};
pub use table::{ReverbCandidate, ReverbSendTable};

use crate::engine::{AuxBusId, RoomId};
use std::cmp::Ordering;

/// Lifecycle of a single reverb send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeState {
    /// Ramping toward a live target
    FadingIn,
    Steady,
    /// Ramping toward zero, removed once silent
    FadingOut,
    Removed,
}

/// One fading auxiliary send of an emitter toward a room's reverb bus.
///
/// The gain always stays within [0, 1]. `update` moves the current gain
/// toward the target at `fade_rate` gain units per second; a fade rate of zero
/// or less snaps immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct ReverbSendControl {
    aux_bus: AuxBusId,
    source_room: RoomId,
    current: f32,
    target: f32,
    fade_rate: f32,
    priority: f32,
    state: FadeState,
    exempt: bool,
    sequence: u64,
}

impl ReverbSendControl {
    /// Creates a send fading in from silence.
    ///
    /// `sequence` records insertion order and breaks priority ties.
    pub fn new(
        aux_bus: AuxBusId,
        source_room: RoomId,
        target: f32,
        fade_rate: f32,
        priority: f32,
        sequence: u64,
    ) -> Self {
        let target = target.clamp(0.0, 1.0);
        Self {
            aux_bus,
            source_room,
            current: 0.0,
            target,
            fade_rate,
            priority,
            state: if target > 0.0 {
                FadeState::FadingIn
            } else {
                FadeState::Steady
            },
            exempt: false,
            sequence,
        }
    }

    pub fn aux_bus(&self) -> AuxBusId {
        self.aux_bus
    }

    pub fn source_room(&self) -> RoomId {
        self.source_room
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn fade_rate(&self) -> f32 {
        self.fade_rate
    }

    pub fn priority(&self) -> f32 {
        self.priority
    }

    pub fn state(&self) -> FadeState {
        self.state
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Exempt sends belong to a spatial audio room the emitter is inside and
    /// are never evicted for budget reasons.
    pub fn is_exempt(&self) -> bool {
        self.exempt
    }

    pub fn set_exempt(&mut self, exempt: bool) {
        self.exempt = exempt;
    }

    pub fn is_fading_out(&self) -> bool {
        self.state == FadeState::FadingOut
    }

    pub fn is_removed(&self) -> bool {
        self.state == FadeState::Removed
    }

    /// Counts against the send budget
    pub fn is_active(&self) -> bool {
        matches!(self.state, FadeState::FadingIn | FadeState::Steady)
    }

    /// Advances the fade by `dt` seconds.
    ///
    /// Returns whether the gain changed.
    pub fn update(&mut self, dt: f32) -> bool {
        if self.state == FadeState::Removed {
            return false;
        }

        let previous = self.current;
        if self.fade_rate <= 0.0 {
            self.current = self.target;
        } else {
            let step = self.fade_rate * dt.max(0.0);
            self.current = if self.current < self.target {
                (self.current + step).min(self.target)
            } else {
                (self.current - step).max(self.target)
            };
        }
        self.current = self.current.clamp(0.0, 1.0);

        if self.current == self.target {
            self.settle();
        }
        self.current != previous
    }

    /// Snaps the gain to its target without fading.
    pub fn force_to_target(&mut self) {
        self.current = self.target;
        self.settle();
    }

    /// Points a live or fading-out send at a new target. A send that was
    /// fading out fades back in from its current gain.
    pub fn retarget(&mut self, target: f32, fade_rate: f32, priority: f32) {
        self.target = target.clamp(0.0, 1.0);
        self.fade_rate = fade_rate;
        self.priority = priority;
        self.state = if self.current == self.target {
            FadeState::Steady
        } else {
            FadeState::FadingIn
        };
    }

    pub fn set_source_room(&mut self, room: RoomId) {
        self.source_room = room;
    }

    /// Starts fading toward silence. Removal happens once `update` reaches zero.
    pub fn begin_fade_out(&mut self) {
        if self.state == FadeState::Removed {
            return;
        }
        self.target = 0.0;
        self.exempt = false;
        self.state = FadeState::FadingOut;
    }

    fn settle(&mut self) {
        self.state = match self.state {
            FadeState::FadingOut | FadeState::Removed => FadeState::Removed,
            FadeState::FadingIn | FadeState::Steady => FadeState::Steady,
        };
    }

    /// Keep order of two sends: the ones that sort first are kept, the tail
    /// is evicted first.
    ///
    /// Fading-out sends sort last, then lower priority, then later insertion.
    pub fn priority_order(a: &Self, b: &Self) -> Ordering {
        a.is_fading_out()
            .cmp(&b.is_fading_out())
            .then_with(|| b.priority.total_cmp(&a.priority))
            .then_with(|| a.sequence.cmp(&b.sequence))
    }

    /// Whether `a` outranks `b` when the send budget is exceeded.
    pub fn prioritize(a: &Self, b: &Self) -> bool {
        Self::priority_order(a, b) == Ordering::Less
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn control(target: f32, fade_rate: f32) -> ReverbSendControl {
        ReverbSendControl::new(AuxBusId(10), RoomId(1), target, fade_rate, 1.0, 0)
    }

    #[test]
    fn converges_after_enough_time() {
        let mut send = control(0.8, 0.5);
        // 0.8 / 0.5 = 1.6 seconds, spread over uneven ticks
        for dt in [0.3, 0.016, 0.5, 0.25, 0.034, 0.2, 0.3, 0.1] {
            send.update(dt);
        }
        assert_eq!(send.current(), 0.8);
        assert_eq!(send.state(), FadeState::Steady);
    }

    #[test]
    fn update_reports_changes_only_while_fading() {
        let mut send = control(0.5, 1.0);
        assert!(send.update(0.25));
        assert_relative_eq!(send.current(), 0.25);
        assert!(send.update(0.25));
        assert!(!send.update(0.25));
    }

    #[test]
    fn non_positive_fade_rate_snaps() {
        let mut send = control(0.6, 0.0);
        assert!(send.update(0.001));
        assert_eq!(send.current(), 0.6);
    }

    #[test]
    fn gain_stays_in_unit_range() {
        let mut send = control(3.0, 100.0);
        send.update(1.0);
        assert_eq!(send.current(), 1.0);
        send.begin_fade_out();
        send.update(1.0);
        assert_eq!(send.current(), 0.0);
    }

    #[test]
    fn fade_out_ends_removed() {
        let mut send = control(0.4, 1.0);
        send.force_to_target();
        send.begin_fade_out();
        assert!(send.is_fading_out());
        send.update(0.2);
        assert_relative_eq!(send.current(), 0.2);
        assert!(!send.is_removed());
        send.update(0.2);
        assert!(send.is_removed());
        assert!(!send.update(1.0));
    }

    #[test]
    fn retarget_revives_a_fading_send() {
        let mut send = control(0.4, 1.0);
        send.force_to_target();
        send.begin_fade_out();
        send.update(0.1);
        send.retarget(0.4, 1.0, 2.0);
        assert_eq!(send.state(), FadeState::FadingIn);
        send.update(1.0);
        assert_eq!(send.current(), 0.4);
        assert_eq!(send.state(), FadeState::Steady);
    }

    #[test]
    fn fading_out_sends_rank_last() {
        let high = ReverbSendControl::new(AuxBusId(1), RoomId(1), 1.0, 1.0, 9.0, 0);
        let low = ReverbSendControl::new(AuxBusId(2), RoomId(2), 1.0, 1.0, 1.0, 1);
        assert!(ReverbSendControl::prioritize(&high, &low));

        let mut fading = high.clone();
        fading.begin_fade_out();
        assert!(ReverbSendControl::prioritize(&low, &fading));
    }

    #[test]
    fn equal_priorities_keep_insertion_order() {
        let first = ReverbSendControl::new(AuxBusId(1), RoomId(1), 1.0, 1.0, 1.0, 3);
        let second = ReverbSendControl::new(AuxBusId(2), RoomId(2), 1.0, 1.0, 1.0, 4);
        assert!(ReverbSendControl::prioritize(&first, &second));
        assert!(!ReverbSendControl::prioritize(&second, &first));
    }
}

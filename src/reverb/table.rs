use super::control::ReverbSendControl;
use crate::engine::{AuxBusId, AuxSendValue, RoomId};

/// A room reverb the emitter should currently be sending to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbCandidate {
    pub room: RoomId,
    pub aux_bus: AuxBusId,
    pub send_level: f32,
    pub fade_rate: f32,
    pub priority: f32,
    /// Spatial audio room the emitter is physically inside; not subject to the budget
    pub exempt: bool,
}

/// The bounded set of reverb sends of one emitter.
///
/// Each tick the owner calls [`recompute`](Self::recompute) with the rooms
/// currently containing the emitter, then [`advance`](Self::advance), then
/// [`pending_update`](Self::pending_update) to learn whether the engine needs
/// a new send list. The list only counts as sent once it is
/// [`commit`](Self::commit)ted.
#[derive(Debug)]
pub struct ReverbSendTable {
    controls: Vec<ReverbSendControl>,
    max_active: usize,
    snap_initial: bool,
    epsilon: f32,
    assigned_once: bool,
    next_sequence: u64,
    last_sent: Vec<AuxSendValue>,
}

impl ReverbSendTable {
    /// # Arguments
    ///
    /// * `max_active` - Maximum number of non-exempt sends fading in or steady
    /// * `snap_initial` - Snap the very first sends of the emitter instead of fading them in
    /// * `epsilon` - Gain difference below which the send list counts as unchanged
    pub fn new(max_active: usize, snap_initial: bool, epsilon: f32) -> Self {
        Self {
            controls: Vec::new(),
            max_active,
            snap_initial,
            epsilon,
            assigned_once: false,
            next_sequence: 0,
            last_sent: Vec::new(),
        }
    }

    pub fn max_active(&self) -> usize {
        self.max_active
    }

    pub fn set_max_active(&mut self, max_active: usize) {
        self.max_active = max_active;
    }

    pub fn controls(&self) -> &[ReverbSendControl] {
        &self.controls
    }

    pub fn control(&self, aux_bus: AuxBusId) -> Option<&ReverbSendControl> {
        self.controls.iter().find(|c| c.aux_bus() == aux_bus)
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Number of non-exempt sends counting against the budget
    pub fn active_count(&self) -> usize {
        self.controls
            .iter()
            .filter(|c| c.is_active() && !c.is_exempt())
            .count()
    }

    /// The send list as last pushed to the engine
    pub fn last_sent(&self) -> &[AuxSendValue] {
        &self.last_sent
    }

    /// Reconciles the sends with the rooms currently containing the emitter.
    ///
    /// Sends of rooms that were left start fading out, new rooms get a send
    /// fading in, and the lowest-priority sends are evicted while the
    /// non-exempt sends exceed the budget. A room that would be evicted right
    /// away gets no send at all until the budget frees up.
    pub fn recompute(&mut self, candidates: &[ReverbCandidate]) {
        let desired = merge_by_aux_bus(candidates);
        let snap = self.snap_initial && !self.assigned_once;

        for control in &mut self.controls {
            let still_wanted = desired.iter().any(|d| d.aux_bus == control.aux_bus());
            if !still_wanted && !control.is_fading_out() && !control.is_removed() {
                log::debug!("Reverb send to {} fading out", control.aux_bus());
                control.begin_fade_out();
            }
        }

        for wanted in &desired {
            let existing = self
                .controls
                .iter()
                .position(|c| c.aux_bus() == wanted.aux_bus && !c.is_removed());
            match existing {
                Some(i) => {
                    let revive = wanted.exempt
                        || !self.controls[i].is_fading_out()
                        || self.has_room_for(wanted.priority, Some(self.controls[i].sequence()));
                    let control = &mut self.controls[i];
                    control.set_source_room(wanted.room);
                    if revive {
                        control.retarget(wanted.send_level, wanted.fade_rate, wanted.priority);
                        control.set_exempt(wanted.exempt);
                    }
                }
                None => {
                    if !wanted.exempt && !self.has_room_for(wanted.priority, None) {
                        continue;
                    }
                    let mut control = ReverbSendControl::new(
                        wanted.aux_bus,
                        wanted.room,
                        wanted.send_level,
                        wanted.fade_rate,
                        wanted.priority,
                        self.next_sequence,
                    );
                    self.next_sequence += 1;
                    control.set_exempt(wanted.exempt);
                    if snap {
                        control.force_to_target();
                    }
                    log::debug!(
                        "Reverb send to {} added for {} (target {})",
                        wanted.aux_bus,
                        wanted.room,
                        wanted.send_level
                    );
                    self.controls.push(control);
                }
            }
        }
        self.assigned_once |= !desired.is_empty();

        self.evict_over_budget();
    }

    /// Whether a non-exempt send with `priority` would survive eviction.
    ///
    /// `sequence` is the send's insertion order, `None` for a send not
    /// created yet.
    fn has_room_for(&self, priority: f32, sequence: Option<u64>) -> bool {
        let outranking = self
            .controls
            .iter()
            .filter(|c| c.is_active() && !c.is_exempt() && Some(c.sequence()) != sequence)
            .filter(|c| {
                c.priority() > priority
                    || (c.priority() == priority && sequence.is_none_or(|s| c.sequence() < s))
            })
            .count();
        outranking < self.max_active
    }

    fn evict_over_budget(&mut self) {
        let mut budgeted: Vec<usize> = (0..self.controls.len())
            .filter(|&i| self.controls[i].is_active() && !self.controls[i].is_exempt())
            .collect();
        if budgeted.len() <= self.max_active {
            return;
        }

        budgeted.sort_by(|&a, &b| {
            ReverbSendControl::priority_order(&self.controls[a], &self.controls[b])
        });
        for &index in &budgeted[self.max_active..] {
            let control = &mut self.controls[index];
            log::debug!(
                "Reverb send to {} evicted (priority {}, budget {})",
                control.aux_bus(),
                control.priority(),
                self.max_active
            );
            control.begin_fade_out();
        }
    }

    /// Advances every fade by `dt` seconds and drops sends that finished
    /// fading out.
    ///
    /// Returns whether any gain changed or any send was dropped.
    pub fn advance(&mut self, dt: f32) -> bool {
        let mut changed = false;
        for control in &mut self.controls {
            changed |= control.update(dt);
        }
        let before = self.controls.len();
        self.controls.retain(|c| !c.is_removed());
        changed || self.controls.len() != before
    }

    /// Current send list: exempt sends first, then by priority.
    ///
    /// Sends still fading toward silence stay in the list until they reach
    /// zero, whatever the budget.
    pub fn sends(&self) -> Vec<AuxSendValue> {
        let mut audible: Vec<&ReverbSendControl> = self
            .controls
            .iter()
            .filter(|c| !c.is_removed() && (c.is_active() || c.current() > 0.0))
            .collect();
        audible.sort_by(|a, b| {
            b.is_exempt()
                .cmp(&a.is_exempt())
                .then_with(|| b.priority().total_cmp(&a.priority()))
                .then_with(|| a.sequence().cmp(&b.sequence()))
        });
        audible
            .into_iter()
            .map(|c| AuxSendValue {
                aux_bus: c.aux_bus(),
                gain: c.current(),
            })
            .collect()
    }

    /// Returns the send list if it differs from the one the engine last
    /// accepted. Nothing is recorded until [`commit`](Self::commit).
    pub fn pending_update(&self) -> Option<Vec<AuxSendValue>> {
        let sends = self.sends();
        (!same_sends(&sends, &self.last_sent, self.epsilon)).then_some(sends)
    }

    /// Records `sends` as accepted by the engine.
    pub fn commit(&mut self, sends: &[AuxSendValue]) {
        self.last_sent = sends.to_vec();
    }

    /// Drops every send immediately, without waiting for fades.
    ///
    /// Returns the empty list to push if the engine still holds sends.
    pub fn flush(&mut self) -> Option<Vec<AuxSendValue>> {
        self.controls.clear();
        if self.last_sent.is_empty() {
            return None;
        }
        self.last_sent.clear();
        Some(Vec::new())
    }
}

fn merge_by_aux_bus(candidates: &[ReverbCandidate]) -> Vec<ReverbCandidate> {
    let mut merged: Vec<ReverbCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match merged.iter_mut().find(|m| m.aux_bus == candidate.aux_bus) {
            Some(existing) => {
                let exempt = existing.exempt || candidate.exempt;
                if candidate.send_level > existing.send_level {
                    *existing = *candidate;
                }
                existing.exempt = exempt;
            }
            None => merged.push(*candidate),
        }
    }
    merged
}

fn same_sends(a: &[AuxSendValue], b: &[AuxSendValue], epsilon: f32) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.aux_bus == y.aux_bus && (x.gain - y.gain).abs() <= epsilon
        })
}

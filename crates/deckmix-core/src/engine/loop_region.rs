//! Loop points, hot cues and the region set derived from them

use std::collections::BTreeMap;

use crate::error::{DeckError, DeckResult};

use super::tempo::beats_to_secs;

/// Width of a hot cue marker region in seconds
pub const HOT_CUE_MARKER_SECS: f64 = 0.1;

/// Identity of a region on the playback engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegionId {
    Loop,
    HotCue(u8),
}

/// A region handed to the playback engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Region {
    /// The loop region; only audibly loops when `looping` is set
    Loop { start: f64, end: f64, looping: bool },
    /// A short marker at a hot cue
    HotCue { slot: u8, at: f64 },
}

impl Region {
    pub fn id(&self) -> RegionId {
        match self {
            Region::Loop { .. } => RegionId::Loop,
            Region::HotCue { slot, .. } => RegionId::HotCue(*slot),
        }
    }

    pub fn start(&self) -> f64 {
        match self {
            Region::Loop { start, .. } => *start,
            Region::HotCue { at, .. } => *at,
        }
    }

    pub fn end(&self) -> f64 {
        match self {
            Region::Loop { end, .. } => *end,
            Region::HotCue { at, .. } => at + HOT_CUE_MARKER_SECS,
        }
    }

    /// True if playback should wrap inside this region
    pub fn is_looping(&self) -> bool {
        matches!(self, Region::Loop { looping: true, .. })
    }
}

/// Where the loop model currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Neither point set
    NoLoop,
    /// At least one point set, but not a valid `start < end` pair
    ArmedUnset,
    /// Valid points, loop inactive
    Armed,
    /// Valid points, loop active
    Looping,
}

/// Result of pressing a hot cue pad
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HotCueAction {
    /// Slot was empty and now holds this position
    Set(f64),
    /// Slot was occupied; playback should jump here
    Jump(f64),
}

/// Per-deck loop and hot cue state
#[derive(Debug, Clone)]
pub struct LoopRegionModel {
    loop_start: Option<f64>,
    loop_end: Option<f64>,
    looping: bool,
    hot_cues: BTreeMap<u8, f64>,
    hot_cue_slots: u8,
}

impl LoopRegionModel {
    /// Create an empty model with hot cue slots `1..=hot_cue_slots`
    pub fn new(hot_cue_slots: u8) -> Self {
        Self {
            loop_start: None,
            loop_end: None,
            looping: false,
            hot_cues: BTreeMap::new(),
            hot_cue_slots,
        }
    }

    /// Forget all loop points and hot cues
    pub fn reset(&mut self) {
        self.loop_start = None;
        self.loop_end = None;
        self.looping = false;
        self.hot_cues.clear();
    }

    pub fn phase(&self) -> LoopPhase {
        if self.looping {
            LoopPhase::Looping
        } else if self.points_valid() {
            LoopPhase::Armed
        } else if self.loop_start.is_none() && self.loop_end.is_none() {
            LoopPhase::NoLoop
        } else {
            LoopPhase::ArmedUnset
        }
    }

    pub fn loop_start(&self) -> Option<f64> {
        self.loop_start
    }

    pub fn loop_end(&self) -> Option<f64> {
        self.loop_end
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Both points set with `start < end`
    pub fn points_valid(&self) -> bool {
        self.loop_points().is_some()
    }

    /// The loop points if they form a valid pair
    pub fn loop_points(&self) -> Option<(f64, f64)> {
        match (self.loop_start, self.loop_end) {
            (Some(start), Some(end)) if start < end => Some((start, end)),
            _ => None,
        }
    }

    /// Record loop-in at `position`
    pub fn set_loop_in(&mut self, position: f64) -> LoopPhase {
        self.loop_start = Some(position);
        self.drop_loop_if_invalid();
        self.phase()
    }

    /// Record loop-out at `position`
    pub fn set_loop_out(&mut self, position: f64) -> LoopPhase {
        self.loop_end = Some(position);
        self.drop_loop_if_invalid();
        self.phase()
    }

    /// Derive a loop of `beats` beats starting at `position`
    ///
    /// A beat count that is not positive is rejected and existing points are
    /// kept. If the loop would run past `duration` both points are cleared and
    /// the loop is deactivated. An active loop picks up the new points directly.
    pub fn set_beat_loop(
        &mut self,
        position: f64,
        beats: f64,
        tempo: f64,
        duration: f64,
    ) -> DeckResult<(f64, f64)> {
        if !(beats.is_finite() && beats > 0.0) {
            return Err(DeckError::InvalidLoopPoints {
                start: Some(position),
                end: Some(position),
            });
        }
        let start = position;
        let end = start + beats_to_secs(beats, tempo);

        if end > duration {
            self.loop_start = None;
            self.loop_end = None;
            self.looping = false;
            return Err(DeckError::LoopExceedsTrack { end, duration });
        }

        self.loop_start = Some(start);
        self.loop_end = Some(end);
        self.drop_loop_if_invalid();
        Ok((start, end))
    }

    /// Activate the loop
    ///
    /// Rejected (and left inactive) unless both points are set and ordered.
    pub fn enable_loop(&mut self) -> DeckResult<(f64, f64)> {
        match self.loop_points() {
            Some(points) => {
                self.looping = true;
                Ok(points)
            }
            None => {
                self.looping = false;
                Err(DeckError::InvalidLoopPoints {
                    start: self.loop_start,
                    end: self.loop_end,
                })
            }
        }
    }

    /// Deactivate the loop, keeping its points for later
    pub fn disable_loop(&mut self) {
        self.looping = false;
    }

    fn drop_loop_if_invalid(&mut self) {
        if self.looping && !self.points_valid() {
            log::debug!("Loop points no longer valid, deactivating loop");
            self.looping = false;
        }
    }

    // --- Hot cues ---

    pub fn hot_cue_slots(&self) -> u8 {
        self.hot_cue_slots
    }

    fn check_slot(&self, slot: u8) -> DeckResult<()> {
        if slot == 0 || slot > self.hot_cue_slots {
            return Err(DeckError::InvalidHotCueSlot(slot));
        }
        Ok(())
    }

    /// Press hot cue pad `slot` with the playhead at `position`
    ///
    /// An empty slot records `position`; an occupied slot is left untouched
    /// and its stored offset is returned as a jump target.
    pub fn trigger_hot_cue(&mut self, slot: u8, position: f64) -> DeckResult<HotCueAction> {
        self.check_slot(slot)?;
        match self.hot_cues.get(&slot) {
            Some(&at) => Ok(HotCueAction::Jump(at)),
            None => {
                self.hot_cues.insert(slot, position);
                Ok(HotCueAction::Set(position))
            }
        }
    }

    pub fn hot_cue(&self, slot: u8) -> Option<f64> {
        self.hot_cues.get(&slot).copied()
    }

    /// Occupied slots in slot order
    pub fn hot_cues(&self) -> impl Iterator<Item = (u8, f64)> + '_ {
        self.hot_cues.iter().map(|(&slot, &at)| (slot, at))
    }

    pub fn clear_hot_cues(&mut self) {
        self.hot_cues.clear();
    }

    /// Full region set to show on the playback engine
    ///
    /// Hot cue markers first, then the loop region when its points are
    /// valid (active or not).
    pub fn regions(&self) -> Vec<Region> {
        let mut regions: Vec<Region> = self
            .hot_cues()
            .map(|(slot, at)| Region::HotCue { slot, at })
            .collect();
        if let Some((start, end)) = self.loop_points() {
            regions.push(Region::Loop {
                start,
                end,
                looping: self.looping,
            });
        }
        regions
    }

    /// The region playback wraps in, if any
    pub fn playable_region(&self) -> Option<Region> {
        self.regions().into_iter().find(Region::is_looping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases() {
        let mut model = LoopRegionModel::new(4);
        assert_eq!(model.phase(), LoopPhase::NoLoop);

        assert_eq!(model.set_loop_in(10.0), LoopPhase::ArmedUnset);
        assert_eq!(model.set_loop_out(14.0), LoopPhase::Armed);

        model.enable_loop().unwrap();
        assert_eq!(model.phase(), LoopPhase::Looping);

        model.disable_loop();
        assert_eq!(model.phase(), LoopPhase::Armed);
        // Points survive, so re-enabling reuses them
        assert_eq!(model.enable_loop(), Ok((10.0, 14.0)));
    }

    #[test]
    fn test_invalid_order_is_rejected() {
        let mut model = LoopRegionModel::new(4);
        model.set_loop_in(20.0);
        model.set_loop_out(20.0);
        assert_eq!(model.phase(), LoopPhase::ArmedUnset);

        let err = model.enable_loop().unwrap_err();
        assert_eq!(
            err,
            DeckError::InvalidLoopPoints {
                start: Some(20.0),
                end: Some(20.0)
            }
        );
        assert!(!model.is_looping());
        assert!(model.playable_region().is_none());
        assert!(model.regions().is_empty());
    }

    #[test]
    fn test_moving_point_past_other_drops_active_loop() {
        let mut model = LoopRegionModel::new(4);
        model.set_loop_in(1.0);
        model.set_loop_out(3.0);
        model.enable_loop().unwrap();

        assert_eq!(model.set_loop_in(5.0), LoopPhase::ArmedUnset);
        assert!(!model.is_looping());
    }

    #[test]
    fn test_beat_loop() {
        let mut model = LoopRegionModel::new(4);
        assert_eq!(model.set_beat_loop(30.0, 4.0, 120.0, 200.0), Ok((30.0, 32.0)));
        assert_eq!(model.phase(), LoopPhase::Armed);

        // While looping the active region follows the new length
        model.enable_loop().unwrap();
        model.set_beat_loop(31.0, 8.0, 120.0, 200.0).unwrap();
        assert_eq!(
            model.playable_region(),
            Some(Region::Loop {
                start: 31.0,
                end: 35.0,
                looping: true
            })
        );
    }

    #[test]
    fn test_beat_loop_past_end_clears_points() {
        let mut model = LoopRegionModel::new(4);
        model.set_beat_loop(10.0, 2.0, 120.0, 200.0).unwrap();
        model.enable_loop().unwrap();

        let err = model.set_beat_loop(199.0, 4.0, 120.0, 200.0).unwrap_err();
        assert!(matches!(err, DeckError::LoopExceedsTrack { .. }));
        assert_eq!(model.phase(), LoopPhase::NoLoop);
        assert!(model.loop_start().is_none());
        assert!(model.loop_end().is_none());
    }

    #[test]
    fn test_beat_loop_rejects_non_positive_length() {
        let mut model = LoopRegionModel::new(4);
        model.set_beat_loop(10.0, 4.0, 120.0, 200.0).unwrap();

        for beats in [0.0, -4.0, f64::NAN] {
            let err = model.set_beat_loop(20.0, beats, 120.0, 200.0).unwrap_err();
            assert!(matches!(err, DeckError::InvalidLoopPoints { .. }));
        }
        // Earlier points survive
        assert_eq!(model.loop_points(), Some((10.0, 12.0)));
        assert_eq!(model.phase(), LoopPhase::Armed);
    }

    #[test]
    fn test_hot_cue_first_press_records_then_jumps() {
        let mut model = LoopRegionModel::new(4);
        assert_eq!(model.trigger_hot_cue(2, 42.5), Ok(HotCueAction::Set(42.5)));
        // A later press at another position does not overwrite the slot
        assert_eq!(model.trigger_hot_cue(2, 80.0), Ok(HotCueAction::Jump(42.5)));
        assert_eq!(model.hot_cue(2), Some(42.5));
    }

    #[test]
    fn test_hot_cue_slot_bounds() {
        let mut model = LoopRegionModel::new(4);
        assert_eq!(model.trigger_hot_cue(0, 1.0), Err(DeckError::InvalidHotCueSlot(0)));
        assert_eq!(model.trigger_hot_cue(5, 1.0), Err(DeckError::InvalidHotCueSlot(5)));
        assert!(model.trigger_hot_cue(4, 1.0).is_ok());
    }

    #[test]
    fn test_regions_keep_loop_and_hot_cues_apart() {
        let mut model = LoopRegionModel::new(4);
        model.trigger_hot_cue(3, 12.0).unwrap();
        model.trigger_hot_cue(1, 4.0).unwrap();
        model.set_loop_in(8.0);
        model.set_loop_out(16.0);

        let ids: Vec<RegionId> = model.regions().iter().map(Region::id).collect();
        assert_eq!(ids, vec![RegionId::HotCue(1), RegionId::HotCue(3), RegionId::Loop]);

        let marker = model.regions()[0];
        assert!((marker.end() - marker.start() - HOT_CUE_MARKER_SECS).abs() < 1e-12);
        assert!(!marker.is_looping());

        // Clearing hot cues leaves the armed loop region alone
        model.clear_hot_cues();
        assert_eq!(model.regions().len(), 1);
        assert_eq!(model.phase(), LoopPhase::Armed);
    }

    #[test]
    fn test_reset() {
        let mut model = LoopRegionModel::new(4);
        model.trigger_hot_cue(1, 4.0).unwrap();
        model.set_loop_in(1.0);
        model.set_loop_out(2.0);
        model.enable_loop().unwrap();

        model.reset();
        assert_eq!(model.phase(), LoopPhase::NoLoop);
        assert_eq!(model.hot_cues().count(), 0);
    }
}

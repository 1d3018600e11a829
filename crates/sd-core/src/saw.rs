//! The saw demo synth's parameter table
//!
//! Ids are deliberately arbitrary so creation index and id never get confused.

use crate::{ParamId, ParamInfo};

pub const UNISON_COUNT: ParamId = ParamId(1378);
pub const UNISON_SPREAD: ParamId = ParamId(2391);
pub const OSC_DETUNE: ParamId = ParamId(8_675_309);

pub const AMP_ATTACK: ParamId = ParamId(2874);
pub const AMP_RELEASE: ParamId = ParamId(728);
pub const AMP_IS_GATE: ParamId = ParamId(1942);

pub const PRE_FILTER_VCA: ParamId = ParamId(87612);

pub const CUTOFF: ParamId = ParamId(17);
pub const RESONANCE: ParamId = ParamId(94);
pub const FILTER_MODE: ParamId = ParamId(14255);

/// Maximum unison voices per note
pub const MAX_UNISON: f64 = 7.0;

/// Filter modes, in the order the filter mode parameter encodes them
pub const FILTER_MODES: [(i32, &str); 6] = [
    (0, "LP"),
    (1, "BP"),
    (2, "HP"),
    (3, "Notch"),
    (4, "Peak"),
    (5, "All"),
];

pub const PARAMS: [ParamInfo; 10] = [
    ParamInfo::new(UNISON_COUNT, "uni count", 1.0, MAX_UNISON, 3.0).stepped(),
    ParamInfo::new(UNISON_SPREAD, "uni spread", 0.0, 100.0, 10.0),
    ParamInfo::new(OSC_DETUNE, "osc detune", -200.0, 200.0, 0.0),
    ParamInfo::new(AMP_ATTACK, "Attack", 0.0, 1.0, 0.01),
    ParamInfo::new(AMP_RELEASE, "Release", 0.0, 1.0, 0.2),
    ParamInfo::new(AMP_IS_GATE, "Amp Envelope", 0.0, 1.0, 0.0).stepped(),
    ParamInfo::new(PRE_FILTER_VCA, "VCA", 0.0, 1.0, 1.0),
    ParamInfo::new(CUTOFF, "cutoff", 1.0, 127.0, 69.0),
    ParamInfo::new(RESONANCE, "resonance", 0.0, 1.0, 0.7),
    ParamInfo::new(FILTER_MODE, "filter mode", 0.0, 5.0, 0.0).stepped(),
];

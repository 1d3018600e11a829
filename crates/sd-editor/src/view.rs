//! Saw demo editor layout
//!
//! Header, oscillator section, amplifier section, filter section, footer.
//! Attack and release are disabled while the amp envelope is bypassed
//! (gate mode).

use sd_bridge::UiBus;
use sd_core::ParamId;
use sd_core::saw::{
    self, AMP_ATTACK, AMP_IS_GATE, AMP_RELEASE, CUTOFF, FILTER_MODE, OSC_DETUNE, PRE_FILTER_VCA,
    RESONANCE, UNISON_COUNT, UNISON_SPREAD,
};
use sd_gpu::{Color, DrawList, Rect};

use crate::{ControlState, ParamControls};

const MARGIN: f32 = 10.0;
const BAR_HEIGHT: f32 = 26.0;
const ROW_HEIGHT: f32 = 16.0;
const ROW_GAP: f32 = 5.0;
const METER_HEIGHT: f32 = 6.0;
const SWITCH_SIZE: f32 = 16.0;

/// Voices at which the polyphony meter is full
const METER_VOICES: f32 = 64.0;

const BAR_COLOR: Color = Color::new(0.16, 0.29, 0.48, 0.27);
const SEPARATOR_COLOR: Color = Color::new(0.43, 0.43, 0.50, 0.50);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlKind {
    Slider { min: f64, max: f64 },
    Switch { reverse: bool },
    Radio,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSlot {
    pub id: ParamId,
    pub kind: ControlKind,
    pub rect: Rect,
}

enum Row {
    Control(ParamId, ControlKind),
    Separator,
}

fn slider(id: ParamId) -> Row {
    let (min, max) = saw::PARAMS
        .iter()
        .find(|info| info.id == id)
        .map_or((0.0, 1.0), |info| (info.min, info.max));
    Row::Control(id, ControlKind::Slider { min, max })
}

fn rows() -> [Row; 13] {
    [
        slider(UNISON_COUNT),
        slider(UNISON_SPREAD),
        slider(OSC_DETUNE),
        Row::Separator,
        slider(PRE_FILTER_VCA),
        Row::Control(AMP_IS_GATE, ControlKind::Switch { reverse: true }),
        slider(AMP_ATTACK),
        slider(AMP_RELEASE),
        Row::Separator,
        Row::Control(FILTER_MODE, ControlKind::Radio),
        slider(CUTOFF),
        slider(RESONANCE),
        Row::Separator,
    ]
}

pub struct SawDemoView {
    width: u32,
    height: u32,
    header: Rect,
    meter: Rect,
    footer: Rect,
    separators: Vec<Rect>,
    slots: Vec<ControlSlot>,
    polyphony: i32,
}

impl SawDemoView {
    pub fn new(width: u32, height: u32) -> Self {
        let mut view = Self {
            width: 0,
            height: 0,
            header: Rect::default(),
            meter: Rect::default(),
            footer: Rect::default(),
            separators: Vec::new(),
            slots: Vec::new(),
            polyphony: 0,
        };
        view.relayout(width, height);
        view
    }

    /// Recompute control rectangles for a new window size
    pub fn relayout(&mut self, width: u32, height: u32) {
        let w = width as f32;
        let inner = (w - 2.0 * MARGIN).max(0.0);

        self.width = width;
        self.height = height;
        self.separators.clear();
        self.slots.clear();

        self.header = Rect::new(0.0, 0.0, w, BAR_HEIGHT);
        let mut y = BAR_HEIGHT + ROW_GAP;

        self.meter = Rect::new(MARGIN, y, inner, METER_HEIGHT);
        y += METER_HEIGHT + ROW_GAP;

        for row in rows() {
            match row {
                Row::Separator => {
                    self.separators.push(Rect::new(MARGIN, y, inner, 1.0));
                    y += 1.0 + ROW_GAP;
                }
                Row::Control(id, kind) => {
                    let rect = match kind {
                        ControlKind::Switch { .. } => Rect::new(MARGIN, y, SWITCH_SIZE, ROW_HEIGHT),
                        _ => Rect::new(MARGIN, y, inner, ROW_HEIGHT),
                    };
                    self.slots.push(ControlSlot { id, kind, rect });
                    y += ROW_HEIGHT + ROW_GAP;
                }
            }
        }

        self.footer = Rect::new(0.0, y, w, BAR_HEIGHT);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn slots(&self) -> &[ControlSlot] {
        &self.slots
    }

    pub fn slot(&self, id: ParamId) -> Option<&ControlSlot> {
        self.slots.iter().find(|s| s.id == id)
    }

    /// Voice count shown in the last rendered frame
    pub fn polyphony(&self) -> i32 {
        self.polyphony
    }

    /// Draw one frame and route pointer input to the controls
    pub fn render(&mut self, bus: &mut UiBus, state: &mut ControlState, list: &mut DrawList) {
        self.polyphony = bus.status().polyphony();

        list.fill_rect(self.header, BAR_COLOR);
        list.fill_rect(self.meter, Color::TRACK);
        let voices = (self.polyphony.max(0) as f32 / METER_VOICES).min(1.0);
        list.fill_rect(self.meter.left_fraction(voices), Color::ACCENT);
        for separator in &self.separators {
            list.fill_rect(*separator, SEPARATOR_COLOR);
        }
        list.fill_rect(self.footer, BAR_COLOR);

        let modes: Vec<i32> = saw::FILTER_MODES.iter().map(|(mode, _)| *mode).collect();
        let mut controls = ParamControls::begin(bus, state, list);

        for slot in &self.slots {
            match slot.kind {
                ControlKind::Slider { min, max } => {
                    let gated = matches!(slot.id, AMP_ATTACK | AMP_RELEASE)
                        && controls.value(AMP_IS_GATE) > 0.5;
                    controls.slider(slot.id, slot.rect, min, max, !gated);
                }
                ControlKind::Switch { reverse } => {
                    controls.switch(slot.id, slot.rect, reverse);
                }
                ControlKind::Radio => {
                    controls.radio(slot.id, slot.rect, &modes);
                }
            }
        }

        controls.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_core::{PREFERRED_HEIGHT, PREFERRED_WIDTH};

    #[test]
    fn test_layout_fits_preferred_size() {
        let view = SawDemoView::new(PREFERRED_WIDTH, PREFERRED_HEIGHT);
        assert_eq!(view.slots().len(), 10);
        assert!(view.footer.y + view.footer.h <= PREFERRED_HEIGHT as f32);
    }

    #[test]
    fn test_every_param_has_a_control() {
        let view = SawDemoView::new(PREFERRED_WIDTH, PREFERRED_HEIGHT);
        for info in saw::PARAMS.iter() {
            assert!(view.slot(info.id).is_some(), "{} has no control", info.name);
        }
    }

    #[test]
    fn test_controls_do_not_overlap() {
        let view = SawDemoView::new(PREFERRED_WIDTH, PREFERRED_HEIGHT);
        for pair in view.slots().windows(2) {
            assert!(pair[0].rect.y + pair[0].rect.h <= pair[1].rect.y);
        }
    }

    #[test]
    fn test_relayout_stretches_sliders() {
        let mut view = SawDemoView::new(PREFERRED_WIDTH, PREFERRED_HEIGHT);
        view.relayout(800, 600);
        let cutoff = view.slot(CUTOFF).unwrap();
        assert_eq!(cutoff.rect.w, 800.0 - 2.0 * MARGIN);
        assert_eq!(view.size(), (800, 600));
    }
}

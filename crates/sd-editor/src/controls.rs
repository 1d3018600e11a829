//! Parameter widgets
//!
//! Immediate-mode: every frame each control reads the mirror, hit-tests the
//! pointer, reports edit gestures to the bus and draws itself.
//!
//! Gesture rules:
//! - Slider: BeginEdit when grabbed, AdjustValue on every change, EndEdit on release
//! - Switch / radio: a single AdjustValue per click

use sd_bridge::UiBus;
use sd_core::ParamId;
use sd_gpu::{Color, DrawList, Rect};

/// Pointer position and button, in window pixels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    pub x: f32,
    pub y: f32,
    pub down: bool,
}

impl PointerState {
    pub fn at(x: f32, y: f32, down: bool) -> Self {
        Self { x, y, down }
    }
}

/// Interaction state carried between frames
#[derive(Debug, Default)]
pub struct ControlState {
    pointer: PointerState,
    was_down: bool,
    active: Option<ParamId>,
}

impl ControlState {
    pub fn set_pointer(&mut self, pointer: PointerState) {
        self.pointer = pointer;
    }

    pub fn pointer(&self) -> PointerState {
        self.pointer
    }

    /// Slider currently held
    pub fn active(&self) -> Option<ParamId> {
        self.active
    }
}

const DISABLED_ALPHA: f32 = 0.35;

/// Widgets for one frame
pub struct ParamControls<'a> {
    bus: &'a mut UiBus,
    state: &'a mut ControlState,
    draw: &'a mut DrawList,
    /// Button went down this frame
    pressed: bool,
}

impl<'a> ParamControls<'a> {
    pub fn begin(bus: &'a mut UiBus, state: &'a mut ControlState, draw: &'a mut DrawList) -> Self {
        let pressed = state.pointer.down && !state.was_down;
        Self {
            bus,
            state,
            draw,
            pressed,
        }
    }

    /// Mirror value, or 0 for unknown ids
    #[inline]
    pub fn value(&self, id: ParamId) -> f64 {
        self.bus.value(id).unwrap_or(0.0)
    }

    fn clicked(&self, rect: &Rect) -> bool {
        let p = self.state.pointer;
        self.pressed && rect.contains(p.x, p.y)
    }

    /// Horizontal slider over `min..=max`. Returns true if the value changed.
    pub fn slider(&mut self, id: ParamId, rect: Rect, min: f64, max: f64, enabled: bool) -> bool {
        let current = self.bus.value(id).unwrap_or(min);

        if enabled && self.state.active.is_none() && self.clicked(&rect) {
            self.state.active = Some(id);
        }

        let grabbed = self.state.active == Some(id);
        let held = grabbed && self.state.pointer.down;
        let mut changed = false;

        if held {
            let value = self.pointer_value(id, &rect, min, max);
            if !self.bus.is_editing(id) {
                // Also re-marks the edit after a snapshot cleared it; the
                // bus never sends a second BeginEdit for an open gesture
                self.bus.report_begin(id, value);
            }
            if value != current {
                self.bus.report_adjust(id, value);
                changed = true;
            }
        } else if grabbed {
            self.bus.report_end(id, current);
            self.state.active = None;
        }

        let shown = self.bus.value(id).unwrap_or(current);
        let fraction = if max > min {
            ((shown - min) / (max - min)) as f32
        } else {
            0.0
        };
        let fill = if held { Color::ACTIVE } else { Color::ACCENT };
        let alpha = if enabled { 1.0 } else { DISABLED_ALPHA };

        self.draw.fill_rect(rect, Color::TRACK.with_alpha(alpha));
        self.draw
            .fill_rect(rect.inset(2.0).left_fraction(fraction), fill.with_alpha(alpha));

        changed
    }

    fn pointer_value(&self, id: ParamId, rect: &Rect, min: f64, max: f64) -> f64 {
        let t = if rect.w > 0.0 {
            ((self.state.pointer.x - rect.x) / rect.w).clamp(0.0, 1.0) as f64
        } else {
            0.0
        };
        let value = min + t * (max - min);
        match self.bus.params().info(id) {
            Some(info) => info.constrain(value),
            None => value,
        }
    }

    /// Checkbox. With `reverse`, checked means a value of 0.
    pub fn switch(&mut self, id: ParamId, rect: Rect, reverse: bool) -> bool {
        let current = self.value(id);
        let mut on = if reverse { current <= 0.5 } else { current >= 0.5 };
        let mut changed = false;

        if self.state.active.is_none() && self.clicked(&rect) {
            on = !on;
            let value = if on != reverse { 1.0 } else { 0.0 };
            self.bus.report_adjust(id, value);
            changed = true;
        }

        self.draw.fill_rect(rect, Color::TRACK);
        if on {
            self.draw.fill_rect(rect.inset(3.0), Color::ACCENT);
        }
        changed
    }

    /// One button per option, laid out left to right across `rect`
    pub fn radio(&mut self, id: ParamId, rect: Rect, options: &[i32]) -> bool {
        if options.is_empty() {
            return false;
        }

        let previous = self.value(id) as i32;
        let mut selected = previous;
        let cell_w = rect.w / options.len() as f32;

        for (i, &option) in options.iter().enumerate() {
            let cell = Rect::new(rect.x + i as f32 * cell_w, rect.y, cell_w, rect.h).inset(1.0);
            if self.state.active.is_none() && self.clicked(&cell) {
                selected = option;
            }
            let color = if option == selected {
                Color::ACCENT
            } else {
                Color::TRACK
            };
            self.draw.fill_rect(cell, color);
        }

        if selected != previous {
            self.bus.report_adjust(id, selected as f64);
            true
        } else {
            false
        }
    }

    /// Close the frame. A slider whose control vanished mid-drag still
    /// gets its EndEdit.
    pub fn finish(mut self) {
        if !self.state.pointer.down {
            if let Some(id) = self.state.active.take() {
                let value = self.value(id);
                self.bus.report_end(id, value);
            }
        }
        self.state.was_down = self.state.pointer.down;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_bridge::{AudioBus, MessageBus};
    use sd_core::saw::{AMP_IS_GATE, CUTOFF, FILTER_MODE, UNISON_COUNT};
    use sd_core::{MessageKind, ParamBank, ParamMessage};
    use std::sync::Arc;

    const SLIDER: Rect = Rect::new(0.0, 0.0, 100.0, 10.0);

    fn buses() -> (UiBus, AudioBus) {
        let (mut ui, audio) = MessageBus::new(Arc::new(ParamBank::saw_demo()), 64).split();
        ui.attach();
        (ui, audio)
    }

    fn frame(
        ui: &mut UiBus,
        state: &mut ControlState,
        pointer: PointerState,
        body: impl FnOnce(&mut ParamControls<'_>),
    ) {
        let mut list = DrawList::new(200, 100);
        state.set_pointer(pointer);
        let mut controls = ParamControls::begin(ui, state, &mut list);
        body(&mut controls);
        controls.finish();
    }

    fn cutoff(c: &mut ParamControls<'_>) {
        c.slider(CUTOFF, SLIDER, 1.0, 127.0, true);
    }

    fn count(c: &mut ParamControls<'_>) {
        c.slider(UNISON_COUNT, SLIDER, 1.0, 7.0, true);
    }

    fn sent(audio: &mut AudioBus) -> Vec<ParamMessage> {
        let mut out = Vec::new();
        audio.apply_ui_events(|msg| out.push(*msg));
        out
    }

    fn kinds(msgs: &[ParamMessage]) -> Vec<MessageKind> {
        msgs.iter().map(|m| m.kind).collect()
    }

    #[test]
    fn test_slider_gesture() {
        let (mut ui, mut audio) = buses();
        let mut state = ControlState::default();

        frame(&mut ui, &mut state, PointerState::at(50.0, 5.0, true), cutoff);
        assert!(ui.is_editing(CUTOFF));
        frame(&mut ui, &mut state, PointerState::at(75.0, 5.0, true), cutoff);
        // Held still: nothing to send
        frame(&mut ui, &mut state, PointerState::at(75.0, 5.0, true), cutoff);
        frame(&mut ui, &mut state, PointerState::at(75.0, 5.0, false), cutoff);

        let msgs = sent(&mut audio);
        assert_eq!(
            kinds(&msgs),
            vec![
                MessageKind::BeginEdit,
                MessageKind::AdjustValue,
                MessageKind::AdjustValue,
                MessageKind::EndEdit
            ]
        );
        assert_eq!(msgs[1].value, 64.0);
        assert_eq!(msgs[3].value, 95.5);
        assert!(!ui.is_editing(CUTOFF));
        assert_eq!(ui.value(CUTOFF), Some(95.5));
        assert_eq!(audio.params().get(CUTOFF), Some(95.5));
    }

    #[test]
    fn test_slider_press_outside_ignored() {
        let (mut ui, mut audio) = buses();
        let mut state = ControlState::default();

        // Pressed elsewhere, then dragged across the slider
        frame(&mut ui, &mut state, PointerState::at(150.0, 50.0, true), cutoff);
        frame(&mut ui, &mut state, PointerState::at(50.0, 5.0, true), cutoff);
        frame(&mut ui, &mut state, PointerState::at(50.0, 5.0, false), cutoff);

        assert!(sent(&mut audio).is_empty());
    }

    #[test]
    fn test_stepped_slider_rounds() {
        let (mut ui, mut audio) = buses();
        let mut state = ControlState::default();

        frame(&mut ui, &mut state, PointerState::at(40.0, 5.0, true), count);
        frame(&mut ui, &mut state, PointerState::at(40.0, 5.0, false), count);

        let msgs = sent(&mut audio);
        assert!(msgs.iter().all(|m| m.value == m.value.round()));
        assert_eq!(ui.value(UNISON_COUNT), Some(3.0));
    }

    #[test]
    fn test_disabled_slider_inert() {
        let (mut ui, mut audio) = buses();
        let mut state = ControlState::default();
        frame(&mut ui, &mut state, PointerState::at(50.0, 5.0, true), |c| {
            assert!(!c.slider(CUTOFF, SLIDER, 1.0, 127.0, false));
        });
        assert!(state.active().is_none());
        assert!(sent(&mut audio).is_empty());
    }

    #[test]
    fn test_snapshot_mid_drag_keeps_gesture_paired() {
        let (mut ui, mut audio) = buses();
        let mut state = ControlState::default();

        frame(&mut ui, &mut state, PointerState::at(50.0, 5.0, true), cutoff);
        assert_eq!(kinds(&sent(&mut audio)), vec![MessageKind::BeginEdit, MessageKind::AdjustValue]);

        // Automation lands while the user is dragging
        assert!(audio.publish_value(CUTOFF, 10.0));
        ui.drain_inbound();
        assert_eq!(ui.value(CUTOFF), Some(10.0));
        assert!(!ui.is_editing(CUTOFF));

        frame(&mut ui, &mut state, PointerState::at(60.0, 5.0, true), cutoff);
        assert!(ui.is_editing(CUTOFF));
        frame(&mut ui, &mut state, PointerState::at(60.0, 5.0, false), cutoff);

        assert_eq!(
            kinds(&sent(&mut audio)),
            vec![MessageKind::AdjustValue, MessageKind::EndEdit]
        );
    }

    #[test]
    fn test_vanished_slider_still_ends_gesture() {
        let (mut ui, mut audio) = buses();
        let mut state = ControlState::default();

        frame(&mut ui, &mut state, PointerState::at(50.0, 5.0, true), |c| {
            c.slider(CUTOFF, SLIDER, 1.0, 127.0, true);
        });
        frame(&mut ui, &mut state, PointerState::at(50.0, 5.0, false), |_| {});

        let msgs = sent(&mut audio);
        assert_eq!(msgs.last().map(|m| m.kind), Some(MessageKind::EndEdit));
        assert!(state.active().is_none());
    }

    #[test]
    fn test_reverse_switch_single_adjust() {
        let (mut ui, mut audio) = buses();
        let mut state = ControlState::default();
        let rect = Rect::new(0.0, 0.0, 16.0, 16.0);

        // Gate is 0, shown checked (envelope on); clicking turns gate on
        frame(&mut ui, &mut state, PointerState::at(8.0, 8.0, true), |c| {
            assert!(c.switch(AMP_IS_GATE, rect, true));
        });
        // Holding the button is not a second click
        frame(&mut ui, &mut state, PointerState::at(8.0, 8.0, true), |c| {
            assert!(!c.switch(AMP_IS_GATE, rect, true));
        });

        let msgs = sent(&mut audio);
        assert_eq!(kinds(&msgs), vec![MessageKind::AdjustValue]);
        assert_eq!(msgs[0].value, 1.0);
        assert_eq!(ui.value(AMP_IS_GATE), Some(1.0));
    }

    #[test]
    fn test_radio_selects_option() {
        let (mut ui, mut audio) = buses();
        let mut state = ControlState::default();
        let rect = Rect::new(0.0, 0.0, 60.0, 10.0);
        let modes = [0, 1, 2, 3, 4, 5];

        frame(&mut ui, &mut state, PointerState::at(25.0, 5.0, true), |c| {
            assert!(c.radio(FILTER_MODE, rect, &modes));
        });
        frame(&mut ui, &mut state, PointerState::at(25.0, 5.0, false), |_| {});
        // Same option again: no message
        frame(&mut ui, &mut state, PointerState::at(25.0, 5.0, true), |c| {
            assert!(!c.radio(FILTER_MODE, rect, &modes));
        });

        let msgs = sent(&mut audio);
        assert_eq!(kinds(&msgs), vec![MessageKind::AdjustValue]);
        assert_eq!(msgs[0].value, 2.0);
    }
}

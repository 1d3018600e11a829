//! Parameter identifiers, cross-thread messages and the shared value bank

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Parameter ID (stable, small integer domain)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParamId(pub u32);

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MESSAGES
// ═══════════════════════════════════════════════════════════════════════════════

/// What a [`ParamMessage`] means.
///
/// The audio thread only ever sends `ValueSnapshot`. The UI sends the edit
/// gesture kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Current value as seen by the audio thread
    ValueSnapshot,
    /// User grabbed a control
    BeginEdit,
    /// Value changed during an edit
    AdjustValue,
    /// User released a control
    EndEdit,
}

impl MessageKind {
    /// True for the kinds only the UI may send
    #[inline]
    pub fn is_from_ui(self) -> bool {
        !matches!(self, Self::ValueSnapshot)
    }
}

/// A tagged value record flowing between the UI and audio threads.
///
/// `Copy` and fixed-size so queues never allocate per message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamMessage {
    pub id: ParamId,
    pub kind: MessageKind,
    pub value: f64,
}

impl ParamMessage {
    #[inline]
    pub const fn snapshot(id: ParamId, value: f64) -> Self {
        Self {
            id,
            kind: MessageKind::ValueSnapshot,
            value,
        }
    }

    #[inline]
    pub const fn begin_edit(id: ParamId, value: f64) -> Self {
        Self {
            id,
            kind: MessageKind::BeginEdit,
            value,
        }
    }

    #[inline]
    pub const fn adjust(id: ParamId, value: f64) -> Self {
        Self {
            id,
            kind: MessageKind::AdjustValue,
            value,
        }
    }

    #[inline]
    pub const fn end_edit(id: ParamId, value: f64) -> Self {
        Self {
            id,
            kind: MessageKind::EndEdit,
            value,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETER METADATA
// ═══════════════════════════════════════════════════════════════════════════════

/// Static description of one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamInfo {
    pub id: ParamId,
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    /// Integer-valued (unison count, filter mode, switches)
    pub stepped: bool,
}

impl ParamInfo {
    pub const fn new(id: ParamId, name: &'static str, min: f64, max: f64, default: f64) -> Self {
        Self {
            id,
            name,
            min,
            max,
            default,
            stepped: false,
        }
    }

    pub const fn stepped(mut self) -> Self {
        self.stepped = true;
        self
    }

    /// Clamp (and round, for stepped params) into range
    #[inline]
    pub fn constrain(&self, value: f64) -> f64 {
        let v = value.clamp(self.min, self.max);
        if self.stepped { v.round() } else { v }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETER BANK
// ═══════════════════════════════════════════════════════════════════════════════

/// Atomic parameter for lock-free access
pub struct AtomicParam {
    bits: AtomicU64,
}

impl AtomicParam {
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    #[inline]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl fmt::Debug for AtomicParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicParam").field(&self.get()).finish()
    }
}

/// Fixed set of parameters with atomically readable current values.
///
/// The audio thread is the only writer in normal operation; the UI thread
/// reads it for the initial snapshot when processing is stopped. Lookups are
/// a bounded linear scan, so every method is real-time safe.
#[derive(Debug)]
pub struct ParamBank {
    infos: Box<[ParamInfo]>,
    values: Box<[AtomicParam]>,
}

impl ParamBank {
    /// Build a bank with every parameter at its default
    pub fn new(infos: &[ParamInfo]) -> Self {
        let values = infos.iter().map(|info| AtomicParam::new(info.default)).collect();
        Self {
            infos: infos.into(),
            values,
        }
    }

    /// The saw demo's ten parameters
    pub fn saw_demo() -> Self {
        Self::new(&crate::saw::PARAMS)
    }

    #[inline]
    fn index_of(&self, id: ParamId) -> Option<usize> {
        self.infos.iter().position(|info| info.id == id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: ParamId) -> bool {
        self.index_of(id).is_some()
    }

    /// Parameter ids in declaration order
    pub fn ids(&self) -> impl Iterator<Item = ParamId> + '_ {
        self.infos.iter().map(|info| info.id)
    }

    pub fn infos(&self) -> &[ParamInfo] {
        &self.infos
    }

    pub fn info(&self, id: ParamId) -> Option<&ParamInfo> {
        self.index_of(id).map(|idx| &self.infos[idx])
    }

    /// Current value, `None` for unknown ids
    #[inline]
    pub fn get(&self, id: ParamId) -> Option<f64> {
        self.index_of(id).map(|idx| self.values[idx].get())
    }

    /// Store a value (constrained to the parameter's range).
    ///
    /// Returns false for unknown ids.
    #[inline]
    pub fn set(&self, id: ParamId, value: f64) -> bool {
        match self.index_of(id) {
            Some(idx) => {
                self.values[idx].set(self.infos[idx].constrain(value));
                true
            }
            None => false,
        }
    }

    /// `(id, value)` pairs for every parameter
    pub fn iter(&self) -> impl Iterator<Item = (ParamId, f64)> + '_ {
        self.infos
            .iter()
            .zip(self.values.iter())
            .map(|(info, value)| (info.id, value.get()))
    }

    /// Reset every parameter to its default
    pub fn reset(&self) {
        for (info, value) in self.infos.iter().zip(self.values.iter()) {
            value.set(info.default);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const A: ParamId = ParamId(10);
    const B: ParamId = ParamId(20);

    fn bank() -> ParamBank {
        ParamBank::new(&[
            ParamInfo::new(A, "a", 0.0, 1.0, 0.25),
            ParamInfo::new(B, "b", 0.0, 5.0, 2.0).stepped(),
        ])
    }

    #[test]
    fn test_bank_defaults() {
        let bank = bank();
        assert_eq!(bank.len(), 2);
        assert_relative_eq!(bank.get(A).unwrap(), 0.25);
        assert_relative_eq!(bank.get(B).unwrap(), 2.0);
        assert!(bank.get(ParamId(99)).is_none());
    }

    #[test]
    fn test_bank_set_constrains() {
        let bank = bank();
        assert!(bank.set(A, 3.0));
        assert_relative_eq!(bank.get(A).unwrap(), 1.0);

        assert!(bank.set(B, 2.6));
        assert_relative_eq!(bank.get(B).unwrap(), 3.0);

        assert!(!bank.set(ParamId(99), 0.5));
    }

    #[test]
    fn test_bank_reset() {
        let bank = bank();
        bank.set(A, 0.9);
        bank.reset();
        assert_relative_eq!(bank.get(A).unwrap(), 0.25);
    }

    #[test]
    fn test_message_kinds() {
        let msg = ParamMessage::adjust(A, 0.5);
        assert_eq!(msg.kind, MessageKind::AdjustValue);
        assert!(msg.kind.is_from_ui());
        assert!(!ParamMessage::snapshot(A, 0.5).kind.is_from_ui());
    }

    #[test]
    fn test_saw_demo_bank_ids_unique() {
        let bank = ParamBank::saw_demo();
        let mut ids: Vec<_> = bank.ids().collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), bank.len());
    }
}

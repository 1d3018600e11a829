//! Message bus: one queue per direction plus the UI's parameter mirror
//!
//! [`MessageBus::split`] hands out a UI-side and an audio-side handle. Each
//! handle owns the producer of one queue and the consumer of the other, so
//! each queue has exactly one writer thread and one reader thread.

use std::sync::Arc;

use sd_core::{MessageKind, ParamBank, ParamId, ParamMessage};

use crate::{EngineStatus, ParamQueue, QueueConsumer, QueueProducer};

// ============================================================================
// BUS
// ============================================================================

/// Owns both queues until split between the threads
pub struct MessageBus {
    to_ui: (QueueProducer, QueueConsumer),
    from_ui: (QueueProducer, QueueConsumer),
    params: Arc<ParamBank>,
    status: Arc<EngineStatus>,
}

impl MessageBus {
    /// Create a bus with `capacity` slots in each direction
    pub fn new(params: Arc<ParamBank>, capacity: usize) -> Self {
        Self {
            to_ui: ParamQueue::with_capacity(capacity),
            from_ui: ParamQueue::with_capacity(capacity),
            params,
            status: Arc::new(EngineStatus::new()),
        }
    }

    pub fn status(&self) -> &Arc<EngineStatus> {
        &self.status
    }

    /// Split into UI-side and audio-side handles
    pub fn split(self) -> (UiBus, AudioBus) {
        let (to_ui_tx, to_ui_rx) = self.to_ui;
        let (from_ui_tx, from_ui_rx) = self.from_ui;

        let ui = UiBus {
            inbound: to_ui_rx,
            outbound: from_ui_tx,
            mirror: ParamMirror::new(&self.params),
            params: self.params.clone(),
            status: self.status.clone(),
            flush_request: None,
            reported_drops: 0,
        };

        let audio = AudioBus {
            outbound: to_ui_tx,
            inbound: from_ui_rx,
            params: self.params,
            status: self.status,
        };

        (ui, audio)
    }
}

// ============================================================================
// PARAMETER MIRROR
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct MirrorEntry {
    id: ParamId,
    value: f64,
    /// Visible "user is dragging" marker; cleared by fresh snapshots
    in_edit: bool,
    /// A BeginEdit went out without its EndEdit yet
    gesture_open: bool,
}

/// UI-thread copy of every parameter's last known value
#[derive(Debug, Clone)]
pub struct ParamMirror {
    entries: Vec<MirrorEntry>,
}

impl ParamMirror {
    fn new(params: &ParamBank) -> Self {
        let entries = params
            .infos()
            .iter()
            .map(|info| MirrorEntry {
                id: info.id,
                value: info.default,
                in_edit: false,
                gesture_open: false,
            })
            .collect();
        Self { entries }
    }

    fn entry_mut(&mut self, id: ParamId) -> Option<&mut MirrorEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    fn entry(&self, id: ParamId) -> Option<&MirrorEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn value(&self, id: ParamId) -> Option<f64> {
        self.entry(id).map(|e| e.value)
    }

    pub fn is_editing(&self, id: ParamId) -> bool {
        self.entry(id).is_some_and(|e| e.in_edit)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamId, f64)> + '_ {
        self.entries.iter().map(|e| (e.id, e.value))
    }
}

// ============================================================================
// UI-SIDE HANDLE
// ============================================================================

/// How the initial snapshot reached the mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotMode {
    /// Processing was stopped: values were read straight from the bank
    Immediate,
    /// Processing was running: the audio thread will publish at its next block
    Deferred,
}

/// Handle for the UI thread: drains snapshots, reports edit gestures
pub struct UiBus {
    inbound: QueueConsumer,
    outbound: QueueProducer,
    mirror: ParamMirror,
    params: Arc<ParamBank>,
    status: Arc<EngineStatus>,
    flush_request: Option<Box<dyn FnMut() + Send>>,
    reported_drops: u64,
}

impl UiBus {
    /// Callback asking the host for a parameter flush.
    ///
    /// Invoked after an edit is queued while the audio thread is not
    /// processing, since nothing would otherwise drain the UI → audio queue.
    pub fn set_flush_request(&mut self, request: impl FnMut() + Send + 'static) {
        self.flush_request = Some(Box::new(request));
    }

    pub fn status(&self) -> &EngineStatus {
        &self.status
    }

    pub fn params(&self) -> &ParamBank {
        &self.params
    }

    pub fn mirror(&self) -> &ParamMirror {
        &self.mirror
    }

    #[inline]
    pub fn value(&self, id: ParamId) -> Option<f64> {
        self.mirror.value(id)
    }

    #[inline]
    pub fn is_editing(&self, id: ParamId) -> bool {
        self.mirror.is_editing(id)
    }

    /// Dequeue every pending audio → UI message into the mirror.
    ///
    /// A fresh snapshot overwrites the value and clears the visible edit
    /// marker even mid-drag. Returns the number of messages applied.
    pub fn drain_inbound(&mut self) -> usize {
        let mut applied = 0;
        while let Some(msg) = self.inbound.try_dequeue() {
            if msg.kind != MessageKind::ValueSnapshot {
                log::warn!("Ignoring {:?} for {} on the audio → UI queue", msg.kind, msg.id);
                continue;
            }
            if let Some(entry) = self.mirror.entry_mut(msg.id) {
                entry.value = msg.value;
                entry.in_edit = false;
                applied += 1;
            }
        }

        let dropped = self.inbound.stats().dropped();
        if dropped > self.reported_drops {
            log::warn!(
                "Audio → UI queue saturated: {} snapshot(s) dropped so far",
                dropped
            );
            self.reported_drops = dropped;
        }

        applied
    }

    /// User grabbed a control. Sends BeginEdit unless a gesture is already open.
    pub fn report_begin(&mut self, id: ParamId, value: f64) -> bool {
        let Some(entry) = self.mirror.entry_mut(id) else {
            return false;
        };
        entry.value = value;
        entry.in_edit = true;
        if entry.gesture_open {
            return true;
        }
        entry.gesture_open = true;
        self.send(ParamMessage::begin_edit(id, value))
    }

    /// Value changed; mirror updates immediately, without a round trip
    pub fn report_adjust(&mut self, id: ParamId, value: f64) -> bool {
        let Some(entry) = self.mirror.entry_mut(id) else {
            return false;
        };
        entry.value = value;
        self.send(ParamMessage::adjust(id, value))
    }

    /// User released a control. Sends EndEdit only to close an open gesture.
    pub fn report_end(&mut self, id: ParamId, value: f64) -> bool {
        let Some(entry) = self.mirror.entry_mut(id) else {
            return false;
        };
        entry.value = value;
        entry.in_edit = false;
        if !entry.gesture_open {
            return true;
        }
        entry.gesture_open = false;
        self.send(ParamMessage::end_edit(id, value))
    }

    /// One-time full snapshot on editor attach.
    ///
    /// While the audio thread is processing only it may write the audio → UI
    /// queue, so the publish is deferred to its next block. Otherwise the
    /// bank is quiescent and is copied into the mirror directly.
    pub fn attach(&mut self) -> SnapshotMode {
        self.status.set_ui_attached(true);

        if self.status.is_processing() {
            self.status.request_refresh();
            log::debug!("Editor attached mid-processing: snapshot deferred to audio thread");
            return SnapshotMode::Deferred;
        }

        for (id, value) in self.params.iter() {
            if let Some(entry) = self.mirror.entry_mut(id) {
                entry.value = value;
                entry.in_edit = false;
            }
        }
        log::debug!("Editor attached: {} parameter(s) snapshotted", self.params.len());
        SnapshotMode::Immediate
    }

    /// Editor is going away: close any open gestures and stop snapshots
    pub fn detach(&mut self) {
        self.status.set_ui_attached(false);

        let open: Vec<(ParamId, f64)> = self
            .mirror
            .entries
            .iter()
            .filter(|e| e.gesture_open)
            .map(|e| (e.id, e.value))
            .collect();
        for (id, value) in open {
            self.report_end(id, value);
        }
        for entry in &mut self.mirror.entries {
            entry.in_edit = false;
        }
    }

    /// Snapshots the audio thread could not deliver
    pub fn dropped_inbound(&self) -> u64 {
        self.inbound.stats().dropped()
    }

    /// Edits this side could not deliver
    pub fn dropped_outbound(&self) -> u64 {
        self.outbound.stats().dropped()
    }

    fn send(&mut self, msg: ParamMessage) -> bool {
        let sent = self.outbound.try_enqueue(msg);
        if !sent {
            log::warn!("UI → audio queue full, dropped {:?} for {}", msg.kind, msg.id);
        }
        if !self.status.is_processing() {
            if let Some(request) = self.flush_request.as_mut() {
                request();
            }
        }
        sent
    }
}

// ============================================================================
// AUDIO-SIDE HANDLE
// ============================================================================

/// Handle for the audio thread. Every method is real-time safe.
pub struct AudioBus {
    outbound: QueueProducer,
    inbound: QueueConsumer,
    params: Arc<ParamBank>,
    status: Arc<EngineStatus>,
}

impl AudioBus {
    pub fn params(&self) -> &ParamBank {
        &self.params
    }

    pub fn status(&self) -> &EngineStatus {
        &self.status
    }

    /// Report a current value to the UI.
    ///
    /// No-op (false) while no editor is attached; false if the queue is full.
    #[inline]
    pub fn publish_value(&mut self, id: ParamId, value: f64) -> bool {
        if !self.status.ui_attached() {
            return false;
        }
        self.outbound.try_enqueue(ParamMessage::snapshot(id, value))
    }

    /// Publish every parameter if the UI asked for a refresh.
    ///
    /// Call at the top of each block. Returns the number of snapshots queued.
    pub fn service_refresh(&mut self) -> usize {
        if !self.status.take_refresh() {
            return 0;
        }
        let mut sent = 0;
        let params = Arc::clone(&self.params);
        for (id, value) in params.iter() {
            if self.publish_value(id, value) {
                sent += 1;
            }
        }
        sent
    }

    /// Apply pending UI edits to the bank, handing each message to `on_event`
    /// so the host glue can emit gesture and value events.
    pub fn apply_ui_events(&mut self, mut on_event: impl FnMut(&ParamMessage)) -> usize {
        let mut applied = 0;
        while let Some(msg) = self.inbound.try_dequeue() {
            match msg.kind {
                MessageKind::AdjustValue | MessageKind::EndEdit => {
                    self.params.set(msg.id, msg.value);
                }
                MessageKind::BeginEdit => {}
                MessageKind::ValueSnapshot => continue,
            }
            on_event(&msg);
            applied += 1;
        }
        applied
    }

    pub fn start_processing(&self) {
        self.status.start_processing();
    }

    pub fn stop_processing(&self) {
        self.status.stop_processing();
    }

    pub fn dropped_outbound(&self) -> u64 {
        self.outbound.stats().dropped()
    }
}

//! Whiteboard synchronization engine.
//!
//! DESIGN
//! ======
//! The engine keeps an append-only log of draw events and clear markers
//! plus the raster they produce. Replaying the log from a blank canvas in
//! log order reproduces the canvas exactly; a clear marker truncates the
//! visual state but the log itself is only ever appended to.
//!
//! Local strokes and remote events go through the same render path, so a
//! segment looks identical no matter which client drew it. Remote apply
//! never creates checkpoints and never republishes.
//!
//! Undo/redo operate on local-only full-canvas checkpoints captured at
//! stroke boundaries. They are never published — peers are unaffected
//! until this client's later strokes go out.
//!
//! ORDERING
//! ========
//! Segments from one author are applied in that author's sequence order
//! (the broker preserves per-publisher order); segments from different
//! authors apply in receipt order. Overlaps are last-drawn-wins, which is
//! acceptable because strokes are idempotent visual overlays. A per-author
//! high-water mark makes own-echo and duplicate delivery a no-op.

use std::collections::HashMap;

use tracing::debug;

use crate::config::Config;
use crate::event::{ClearEvent, DrawEvent, ParticipantId, ToolKind, now_ms};
use crate::raster::{Raster, Snapshot, parse_color};

const FALLBACK_COLOR: u32 = 0xFF00_0000;

/// One entry of the append-only whiteboard log.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    Draw(DrawEvent),
    Clear { author_id: ParticipantId, seq: u64 },
}

/// Per-room whiteboard replica.
pub struct WhiteboardSyncEngine {
    self_id: ParticipantId,
    raster: Raster,
    log: Vec<LogEntry>,
    /// Next sequence number for locally authored events.
    next_seq: u64,
    /// Highest applied sequence number per author, self included.
    applied: HashMap<ParticipantId, u64>,
    stroke_active: bool,
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
}

impl WhiteboardSyncEngine {
    #[must_use]
    pub fn new(self_id: ParticipantId, config: &Config) -> Self {
        Self {
            self_id,
            raster: Raster::new(config.canvas_width, config.canvas_height),
            log: Vec::new(),
            next_seq: 1,
            applied: HashMap::new(),
            stroke_active: false,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    // =========================================================================
    // LOCAL STROKE LIFECYCLE
    // =========================================================================

    /// Start a local stroke: capture an undo checkpoint of the current
    /// raster. Starting a new stroke invalidates the redo history.
    pub fn begin_stroke(&mut self) {
        if self.stroke_active {
            return;
        }
        self.undo_stack.push(self.raster.snapshot());
        self.redo_stack.clear();
        self.stroke_active = true;
    }

    /// Apply one segment of the in-progress stroke locally and return the
    /// event to publish. Returns `None` when no stroke is in progress —
    /// a silent no-op, not an error.
    pub fn extend_stroke(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        color: &str,
        width: f64,
        tool: ToolKind,
    ) -> Option<DrawEvent> {
        if !self.stroke_active {
            return None;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        let event = DrawEvent {
            author_id: self.self_id,
            seq,
            x1: from.0,
            y1: from.1,
            x2: to.0,
            y2: to.1,
            color: color.to_owned(),
            width,
            tool,
            ts: now_ms(),
        };
        self.record(self.self_id, seq);
        self.render(&event);
        self.log.push(LogEntry::Draw(event.clone()));
        Some(event)
    }

    /// Close the in-progress stroke, if any.
    pub fn end_stroke(&mut self) {
        self.stroke_active = false;
    }

    /// Blank the canvas locally and return the clear marker to publish.
    /// The log keeps all prior entries; only visual state is truncated.
    pub fn clear(&mut self) -> ClearEvent {
        self.undo_stack.push(self.raster.snapshot());
        self.redo_stack.clear();
        self.stroke_active = false;

        let seq = self.next_seq;
        self.next_seq += 1;
        self.record(self.self_id, seq);
        self.raster.clear();
        self.log.push(LogEntry::Clear { author_id: self.self_id, seq });
        ClearEvent { author_id: self.self_id, seq }
    }

    // =========================================================================
    // REMOTE APPLY
    // =========================================================================

    /// Render a remote segment exactly as `extend_stroke` would. Returns
    /// `false` for duplicates (including the broker echoing this client's
    /// own publishes back).
    pub fn apply_remote(&mut self, event: &DrawEvent) -> bool {
        if !self.record(event.author_id, event.seq) {
            debug!(author = %event.author_id, seq = event.seq, "whiteboard: duplicate draw dropped");
            return false;
        }
        self.render(event);
        self.log.push(LogEntry::Draw(event.clone()));
        true
    }

    /// Apply a remote clear marker. Duplicates are dropped.
    pub fn apply_remote_clear(&mut self, event: &ClearEvent) -> bool {
        if !self.record(event.author_id, event.seq) {
            debug!(author = %event.author_id, seq = event.seq, "whiteboard: duplicate clear dropped");
            return false;
        }
        self.raster.clear();
        self.log.push(LogEntry::Clear { author_id: event.author_id, seq: event.seq });
        true
    }

    // =========================================================================
    // UNDO / REDO (local-only)
    // =========================================================================

    /// Restore the most recent checkpoint not yet undone. Returns `false`
    /// when there is nothing to undo. Never published.
    pub fn undo(&mut self) -> bool {
        let Some(checkpoint) = self.undo_stack.pop() else {
            return false;
        };
        self.redo_stack.push(self.raster.snapshot());
        self.raster.restore(&checkpoint);
        true
    }

    /// Restore the most recently undone state. Returns `false` when there
    /// is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(checkpoint) = self.redo_stack.pop() else {
            return false;
        };
        self.undo_stack.push(self.raster.snapshot());
        self.raster.restore(&checkpoint);
        true
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    #[must_use]
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    #[must_use]
    pub fn stroke_active(&self) -> bool {
        self.stroke_active
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    /// Advance the author's high-water mark. Returns `false` when the
    /// sequence number was already applied (duplicate or own echo).
    fn record(&mut self, author: ParticipantId, seq: u64) -> bool {
        let high_water = self.applied.entry(author).or_insert(0);
        if seq <= *high_water {
            return false;
        }
        *high_water = seq;
        true
    }

    fn render(&mut self, event: &DrawEvent) {
        let color = parse_color(&event.color).unwrap_or(FALLBACK_COLOR);
        self.raster
            .stamp_segment(event.x1, event.y1, event.x2, event.y2, color, event.width, event.tool);
    }
}

#[cfg(test)]
#[path = "whiteboard_test.rs"]
mod tests;

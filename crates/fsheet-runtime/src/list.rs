#![forbid(unsafe_code)]

//! Virtualized list model hosted inside the sheet.
//!
//! [`VirtualList`] owns the item data, a key extractor, and a size hint. It
//! answers "which items are on screen" for a scroll offset and implements the
//! [`ListView`] contract the scroll sync drives. Every offset change and drag
//! or momentum boundary is queued as a [`ScrollEvent`] for the animation
//! context to consume.
//!
//! Item heights are estimated, not measured: every row is
//! `estimated_item_size` tall. Hosts with variable rows can re-estimate via
//! [`VirtualList::set_estimated_item_size`].

use std::ops::Range;

use crate::scroll::{ListView, ScrollEvent};

type KeyExtractor<T> = Box<dyn Fn(&T, usize) -> String + Send>;

/// Default extra rows rendered above and below the viewport.
const DEFAULT_OVERSCAN: usize = 4;

/// A visible row.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleItem<'a, T> {
    pub index: usize,
    pub key: String,
    pub item: &'a T,
    /// Top edge relative to the list content origin.
    pub top: f64,
}

/// Item data plus scroll position for a virtualized list.
pub struct VirtualList<T> {
    data: Vec<T>,
    key_extractor: KeyExtractor<T>,
    estimated_item_size: f64,
    viewport_height: f64,
    overscan: usize,
    offset: f64,
    attached: bool,
    dragging: bool,
    events: Vec<ScrollEvent>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for VirtualList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualList")
            .field("len", &self.data.len())
            .field("estimated_item_size", &self.estimated_item_size)
            .field("viewport_height", &self.viewport_height)
            .field("offset", &self.offset)
            .field("attached", &self.attached)
            .finish_non_exhaustive()
    }
}

impl<T> VirtualList<T> {
    /// Create a detached list. Call [`attach`](Self::attach) once the host
    /// view is mounted.
    #[must_use]
    pub fn new(
        data: Vec<T>,
        estimated_item_size: f64,
        key_extractor: impl Fn(&T, usize) -> String + Send + 'static,
    ) -> Self {
        Self {
            data,
            key_extractor: Box::new(key_extractor),
            estimated_item_size: sanitize_size(estimated_item_size),
            viewport_height: 0.0,
            overscan: DEFAULT_OVERSCAN,
            offset: 0.0,
            attached: false,
            dragging: false,
            events: Vec::new(),
        }
    }

    /// Rows rendered beyond each viewport edge.
    #[must_use]
    pub fn with_overscan(mut self, rows: usize) -> Self {
        self.overscan = rows;
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Replace the data. The offset is clamped to the new content height.
    pub fn set_data(&mut self, data: Vec<T>) {
        self.data = data;
        self.clamp_offset();
    }

    pub fn set_estimated_item_size(&mut self, size: f64) {
        self.estimated_item_size = sanitize_size(size);
        self.clamp_offset();
    }

    /// Height of the visible area, normally the sheet's on-screen height
    /// minus its header.
    pub fn set_viewport_height(&mut self, height: f64) {
        self.viewport_height = if height.is_finite() { height.max(0.0) } else { 0.0 };
        self.clamp_offset();
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    #[must_use]
    pub fn content_height(&self) -> f64 {
        self.data.len() as f64 * self.estimated_item_size
    }

    #[must_use]
    pub fn max_offset(&self) -> f64 {
        (self.content_height() - self.viewport_height).max(0.0)
    }

    /// Stable key for row `index`.
    #[must_use]
    pub fn key_of(&self, index: usize) -> Option<String> {
        self.data
            .get(index)
            .map(|item| (self.key_extractor)(item, index))
    }

    /// Indices to render for the current offset, overscan included.
    #[must_use]
    pub fn visible_range(&self) -> Range<usize> {
        if self.data.is_empty() {
            return 0..0;
        }
        let size = self.estimated_item_size;
        let first = (self.offset / size).floor() as usize;
        let last = ((self.offset + self.viewport_height) / size).ceil() as usize;
        let start = first.saturating_sub(self.overscan);
        let end = last.saturating_add(self.overscan).min(self.data.len());
        start.min(end)..end
    }

    /// Rows to render, in order.
    #[must_use]
    pub fn visible_items(&self) -> Vec<VisibleItem<'_, T>> {
        self.visible_range()
            .map(|index| {
                let item = &self.data[index];
                VisibleItem {
                    index,
                    key: (self.key_extractor)(item, index),
                    item,
                    top: index as f64 * self.estimated_item_size,
                }
            })
            .collect()
    }

    /// Render visible rows with `render_item`.
    pub fn render_visible<R>(&self, mut render_item: impl FnMut(&T, usize) -> R) -> Vec<R> {
        self.visible_range()
            .map(|index| render_item(&self.data[index], index))
            .collect()
    }

    // ── user scrolling ──────────────────────────────────────────────

    /// The user put a finger on the list.
    pub fn begin_drag(&mut self) {
        self.dragging = true;
        self.events.push(ScrollEvent::BeginDrag);
    }

    /// Scroll by `delta` pixels (positive reveals later rows).
    pub fn scroll_by(&mut self, delta: f64) {
        self.set_offset(self.offset + delta);
    }

    /// Finger lifted. `momentum` starts a coasting phase.
    pub fn end_drag(&mut self, momentum: bool) {
        self.dragging = false;
        self.events.push(ScrollEvent::EndDrag);
        if momentum {
            self.events.push(ScrollEvent::MomentumBegin);
        }
    }

    pub fn end_momentum(&mut self) {
        self.events.push(ScrollEvent::MomentumEnd);
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Hand queued scroll events to the caller.
    pub fn take_events(&mut self) -> Vec<ScrollEvent> {
        std::mem::take(&mut self.events)
    }

    fn set_offset(&mut self, offset: f64) {
        let clamped = if offset.is_finite() {
            offset.clamp(0.0, self.max_offset())
        } else {
            self.offset
        };
        if clamped != self.offset {
            self.offset = clamped;
            self.events.push(ScrollEvent::Offset(clamped));
        }
    }

    fn clamp_offset(&mut self) {
        self.set_offset(self.offset);
    }
}

impl<T> ListView for VirtualList<T> {
    fn is_attached(&self) -> bool {
        self.attached
    }

    fn scroll_to_offset(&mut self, offset: f64, _animated: bool) {
        if self.attached {
            self.set_offset(offset);
        }
    }

    fn effective_offset(&self) -> f64 {
        self.offset
    }
}

fn sanitize_size(size: f64) -> f64 {
    if size.is_finite() && size > 0.0 { size } else { 1.0 }
}

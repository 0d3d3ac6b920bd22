//! Box layout for the simulated page.
//!
//! A small model of CSS: blocks stack vertically, `display:flex`
//! lays children out in a row, explicit `height`/`width` in px win over
//! content size, and `position:absolute|fixed` take their box from inline
//! `top`/`left`/`width`/`height`. Elements tagged `data-visible-on="phone ..."`
//! only render at the listed breakpoints; everything they contain gets a zero
//! box otherwise. Text runs are one 24px line.

use crate::breakpoint::{Breakpoint, Viewport};
use crate::dom::{Document, NodeId};
use serde::{Deserialize, Serialize};

/// Height of one text line
pub const LINE_HEIGHT: f64 = 24.0;

/// Axis-aligned rectangle in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Rect {
    /// Create a rectangle
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Non-zero in both dimensions
    #[must_use]
    pub fn is_rendered(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Bottom edge
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Centre point
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether the point lies inside
    #[must_use]
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}

/// Computed box for one element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutBox {
    /// Page coordinates, or viewport coordinates when `fixed`
    pub rect: Rect,
    /// Positioned against the viewport
    pub fixed: bool,
    /// Effective stacking order
    pub z_index: i32,
}

/// Layout of a whole document at one viewport size
#[derive(Debug, Clone, Default)]
pub struct Layout {
    boxes: Vec<Option<LayoutBox>>,
    document_height: f64,
}

impl Layout {
    /// Lay out every attached element
    #[must_use]
    pub fn compute(doc: &Document, viewport: Viewport) -> Self {
        let mut engine = Engine {
            doc,
            viewport,
            breakpoint: viewport.breakpoint(),
            boxes: vec![None; doc.node_count()],
            absolute_bottom: 0.0,
        };
        let flow = engine.children(doc.root(), 0.0, 0.0, f64::from(viewport.width), false, 0);
        let document_height = flow
            .max(engine.absolute_bottom)
            .max(f64::from(viewport.height));
        Self {
            boxes: engine.boxes,
            document_height,
        }
    }

    /// Box of `node`, if it was laid out
    #[must_use]
    pub fn layout_box(&self, node: NodeId) -> Option<LayoutBox> {
        self.boxes.get(node.index()).copied().flatten()
    }

    /// Viewport-relative bounding box; zero for nodes without a box
    #[must_use]
    pub fn client_rect(&self, node: NodeId, scroll_y: f64) -> Rect {
        match self.layout_box(node) {
            Some(b) if b.fixed => b.rect,
            Some(b) => Rect::new(b.rect.x, b.rect.y - scroll_y, b.rect.width, b.rect.height),
            None => Rect::default(),
        }
    }

    /// Scrollable height of the document (never below the viewport)
    #[must_use]
    pub const fn document_height(&self) -> f64 {
        self.document_height
    }

    /// Every laid-out element with a non-empty box
    pub fn rendered(&self) -> impl Iterator<Item = (usize, LayoutBox)> + '_ {
        self.boxes
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.filter(|b| b.rect.is_rendered()).map(|b| (i, b)))
    }
}

struct Engine<'a> {
    doc: &'a Document,
    viewport: Viewport,
    breakpoint: Breakpoint,
    boxes: Vec<Option<LayoutBox>>,
    absolute_bottom: f64,
}

impl Engine<'_> {
    fn record(&mut self, node: NodeId, layout_box: LayoutBox) {
        if let Some(slot) = self.boxes.get_mut(node.index()) {
            *slot = Some(layout_box);
        }
    }

    fn collapse(&mut self, node: NodeId, x: f64, y: f64, fixed: bool) {
        let empty = LayoutBox {
            rect: Rect::new(x, y, 0.0, 0.0),
            fixed,
            z_index: 0,
        };
        self.record(node, empty);
        let doc = self.doc;
        for d in doc.descendants(node) {
            if doc.is_element(d) {
                self.record(d, empty);
            }
        }
    }

    fn is_displayed(&self, node: NodeId) -> bool {
        if self.doc.has_attribute(node, "hidden") || self.doc.style(node, "display") == Some("none") {
            return false;
        }
        self.doc
            .attribute(node, "data-visible-on")
            .map_or(true, |list| {
                list.split_whitespace()
                    .any(|b| b == self.breakpoint.as_str())
            })
    }

    /// Lays out `node`; returns the height it takes in normal flow
    fn element(&mut self, node: NodeId, x: f64, y: f64, avail: f64, fixed: bool, z: i32) -> f64 {
        if !self.is_displayed(node) {
            self.collapse(node, x, y, fixed);
            return 0.0;
        }
        let doc = self.doc;
        let z = doc
            .style(node, "z-index")
            .and_then(|v| v.trim().parse::<i32>().ok())
            .unwrap_or(z);

        match doc.style(node, "position") {
            Some(pos @ ("fixed" | "absolute")) => {
                let fixed = fixed || pos == "fixed";
                let basis = if pos == "fixed" {
                    f64::from(self.viewport.width)
                } else {
                    avail
                };
                let vertical = if pos == "fixed" {
                    f64::from(self.viewport.height)
                } else {
                    0.0
                };
                let left = length(doc.style(node, "left"), basis).unwrap_or(0.0);
                let top = length(doc.style(node, "top"), vertical).unwrap_or(0.0);
                let width = length(doc.style(node, "width"), basis).unwrap_or(basis);
                let content = self.children(node, left, top, width, fixed, z);
                let height = length(doc.style(node, "height"), vertical)
                    .filter(|h| *h > 0.0 || !is_percent(doc.style(node, "height")))
                    .unwrap_or(content);
                self.record(
                    node,
                    LayoutBox {
                        rect: Rect::new(left, top, width, height),
                        fixed,
                        z_index: z,
                    },
                );
                if !fixed {
                    self.absolute_bottom = self.absolute_bottom.max(top + height);
                }
                0.0
            }
            _ => {
                let width = length(doc.style(node, "width"), avail).unwrap_or(avail);
                let content = self.children(node, x, y, width, fixed, z);
                let height = if is_percent(doc.style(node, "height")) {
                    content
                } else {
                    length(doc.style(node, "height"), 0.0).unwrap_or(content)
                };
                self.record(
                    node,
                    LayoutBox {
                        rect: Rect::new(x, y, width, height),
                        fixed,
                        z_index: z,
                    },
                );
                height
            }
        }
    }

    /// Lays out the children of `node` inside a `width`-wide box at (x, y)
    fn children(&mut self, node: NodeId, x: f64, y: f64, width: f64, fixed: bool, z: i32) -> f64 {
        let doc = self.doc;
        let kids: Vec<NodeId> = doc.children(node).to_vec();
        let gap = length(doc.style(node, "gap"), width).unwrap_or(0.0);
        let row = doc.style(node, "display") == Some("flex")
            && doc.style(node, "flex-direction") != Some("column");

        if row {
            let in_flow: Vec<NodeId> = kids
                .iter()
                .copied()
                .filter(|&k| self.in_flow(k))
                .collect();
            let count = in_flow.len().max(1) as f64;
            let cell = ((width - gap * (count - 1.0)) / count).max(0.0);
            let mut tallest: f64 = 0.0;
            let mut cursor = x;
            for k in kids {
                if in_flow.contains(&k) {
                    let h = self.flow_child(k, cursor, y, cell, fixed, z);
                    tallest = tallest.max(h);
                    cursor += cell + gap;
                } else {
                    self.flow_child(k, x, y, width, fixed, z);
                }
            }
            tallest
        } else {
            let mut cursor = y;
            let mut first = true;
            for k in kids {
                let in_flow = self.in_flow(k);
                if in_flow && !first {
                    cursor += gap;
                }
                let h = self.flow_child(k, x, cursor, width, fixed, z);
                cursor += h;
                if in_flow && h > 0.0 {
                    first = false;
                }
            }
            cursor - y
        }
    }

    fn flow_child(&mut self, node: NodeId, x: f64, y: f64, width: f64, fixed: bool, z: i32) -> f64 {
        if self.doc.is_text(node) {
            return if self.doc.text_content(node).trim().is_empty() {
                0.0
            } else {
                LINE_HEIGHT
            };
        }
        self.element(node, x, y, width, fixed, z)
    }

    fn in_flow(&self, node: NodeId) -> bool {
        if self.doc.is_text(node) {
            return !self.doc.text_content(node).trim().is_empty();
        }
        self.doc.is_element(node)
            && self.is_displayed(node)
            && !matches!(self.doc.style(node, "position"), Some("fixed" | "absolute"))
    }
}

fn is_percent(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().ends_with('%'))
}

/// Parse `12px`, `12` or `50%` (of `basis`)
#[must_use]
pub fn length(value: Option<&str>, basis: f64) -> Option<f64> {
    let v = value?.trim();
    if let Some(pct) = v.strip_suffix('%') {
        return pct.trim().parse::<f64>().ok().map(|p| basis * p / 100.0);
    }
    v.strip_suffix("px").unwrap_or(v).trim().parse::<f64>().ok()
}

//! Rasteriser for simulated screenshots.
//!
//! Paints the page white, then every rendered element with an inline
//! `background`/`background-color`, then one bar per text run in the element's
//! `color`. Painting follows stacking order: z-index first, then fixed boxes
//! above flow boxes, then document order. Output is in device pixels.

use crate::dom::NodeId;
use crate::layout::Rect;
use crate::page::Page;
use crate::result::{SiteError, SiteResult};
use image::{ImageEncoder, Rgba, RgbaImage};

const PAGE_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const DEFAULT_TEXT: Rgba<u8> = Rgba([26, 26, 26, 255]);
const GLYPH_WIDTH: f64 = 8.0;
const TEXT_BAR_HEIGHT: f64 = 12.0;

struct PaintItem {
    z: i32,
    fixed: bool,
    order: usize,
    rect: Rect,
    color: Rgba<u8>,
}

/// Paint the visible viewport of `page`
#[must_use]
pub fn rasterize(page: &Page) -> RgbaImage {
    let scale = page.profile().device_scale_factor.max(0.1);
    let viewport = page.viewport();
    let width = (f64::from(viewport.width) * scale).round() as u32;
    let height = (f64::from(viewport.height) * scale).round() as u32;
    let mut img = RgbaImage::from_pixel(width.max(1), height.max(1), PAGE_BACKGROUND);

    let mut items = paint_list(page);
    items.sort_by_key(|i| (i.z, i.fixed, i.order));
    for item in items {
        fill(&mut img, item.rect, scale, item.color);
    }
    img
}

fn paint_list(page: &Page) -> Vec<PaintItem> {
    let doc = page.document();
    let layout = page.layout();
    let scroll_y = page.scroll_y();
    let mut items = Vec::new();

    for (order, node) in doc.descendants(doc.root()).enumerate() {
        if doc.is_text(node) {
            if let Some(item) = text_item(page, node, order) {
                items.push(item);
            }
            continue;
        }
        let Some(b) = layout.layout_box(node) else {
            continue;
        };
        if !b.rect.is_rendered() {
            continue;
        }
        let fill = doc
            .style(node, "background")
            .or_else(|| doc.style(node, "background-color"))
            .and_then(parse_color);
        if let Some(color) = fill {
            items.push(PaintItem {
                z: b.z_index,
                fixed: b.fixed,
                order,
                rect: layout.client_rect(node, scroll_y),
                color,
            });
        }
    }
    items
}

fn text_item(page: &Page, node: NodeId, order: usize) -> Option<PaintItem> {
    let doc = page.document();
    let text = doc.text_content(node);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let parent = doc.parent_element(node)?;
    let b = page.layout().layout_box(parent)?;
    if !b.rect.is_rendered() {
        return None;
    }
    let rect = page.layout().client_rect(parent, page.scroll_y());
    let run = (text.chars().count() as f64 * GLYPH_WIDTH).min(rect.width);
    let color = doc
        .style(parent, "color")
        .and_then(parse_color)
        .unwrap_or(DEFAULT_TEXT);
    Some(PaintItem {
        z: b.z_index,
        fixed: b.fixed,
        order,
        rect: Rect::new(rect.x, rect.y + 6.0, run, TEXT_BAR_HEIGHT.min(rect.height)),
        color,
    })
}

fn fill(img: &mut RgbaImage, rect: Rect, scale: f64, color: Rgba<u8>) {
    let (w, h) = (f64::from(img.width()), f64::from(img.height()));
    let x0 = (rect.x * scale).round().clamp(0.0, w) as u32;
    let y0 = (rect.y * scale).round().clamp(0.0, h) as u32;
    let x1 = ((rect.x + rect.width) * scale).round().clamp(0.0, w) as u32;
    let y1 = ((rect.y + rect.height) * scale).round().clamp(0.0, h) as u32;
    for y in y0..y1 {
        for x in x0..x1 {
            let under = *img.get_pixel(x, y);
            img.put_pixel(x, y, blend(under, color));
        }
    }
}

/// Source-over compositing onto an opaque pixel
fn blend(under: Rgba<u8>, over: Rgba<u8>) -> Rgba<u8> {
    let a = f64::from(over[3]) / 255.0;
    let mix = |o: u8, u: u8| (f64::from(o) * a + f64::from(u) * (1.0 - a)).round() as u8;
    Rgba([mix(over[0], under[0]), mix(over[1], under[1]), mix(over[2], under[2]), 255])
}

/// Parse `rgb(r, g, b)`, `rgba(r, g, b, a)`, `#rrggbb`, `#rgb` or a few names
#[must_use]
pub fn parse_color(text: &str) -> Option<Rgba<u8>> {
    let text = text.trim();
    match text {
        "white" => return Some(Rgba([255, 255, 255, 255])),
        "black" => return Some(Rgba([0, 0, 0, 255])),
        "transparent" | "none" => return None,
        _ => {}
    }
    if let Some(hex) = text.strip_prefix('#') {
        let digits: Vec<u8> = hex
            .chars()
            .map(|c| c.to_digit(16).and_then(|d| u8::try_from(d).ok()))
            .collect::<Option<_>>()?;
        return match digits.as_slice() {
            &[r, g, b] => Some(Rgba([r * 17, g * 17, b * 17, 255])),
            &[r1, r2, g1, g2, b1, b2] => Some(Rgba([r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2, 255])),
            _ => None,
        };
    }
    let inner = text
        .strip_prefix("rgba(")
        .or_else(|| text.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    let channel = |s: &str| s.parse::<u8>().ok();
    match parts.as_slice() {
        [r, g, b] => Some(Rgba([channel(r)?, channel(g)?, channel(b)?, 255])),
        [r, g, b, a] => {
            let alpha = a.parse::<f64>().ok()?.clamp(0.0, 1.0);
            if alpha <= 0.0 {
                return None;
            }
            Some(Rgba([channel(r)?, channel(g)?, channel(b)?, (alpha * 255.0).round() as u8]))
        }
        _ => None,
    }
}

/// Encode an image as PNG.
///
/// # Errors
///
/// Returns an error if the encoder rejects the buffer.
pub fn encode_png(img: &RgbaImage) -> SiteResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buffer);
    encoder
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| SiteError::Screenshot {
            message: format!("Failed to encode PNG: {e}"),
        })?;
    Ok(buffer)
}

/// Rasterise and PNG-encode the page.
///
/// # Errors
///
/// Returns an error if PNG encoding fails.
pub fn screenshot(page: &Page) -> SiteResult<Vec<u8>> {
    encode_png(&rasterize(page))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::breakpoint::DeviceProfile;
    use crate::dom::Document;
    use crate::template::ElementTemplate;

    fn page(profile: DeviceProfile) -> Page {
        let mut doc = Document::new();
        let body = ElementTemplate::new("body")
            .child(
                ElementTemplate::new("header")
                    .style("height", "100px")
                    .style("background", "rgb(242, 240, 233)"),
            )
            .child(
                ElementTemplate::new("section")
                    .style("height", "2000px")
                    .style("background", "#000"),
            )
            .child(
                ElementTemplate::new("div")
                    .style("position", "fixed")
                    .style("top", "0")
                    .style("height", "10px")
                    .style("background", "#ff0000")
                    .style("z-index", "5"),
            )
            .instantiate(&mut doc);
        doc.append_child(doc.root(), body);
        Page::new(doc, profile, "/")
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("rgb(242, 240, 233)"), Some(Rgba([242, 240, 233, 255])));
        assert_eq!(parse_color("#fff"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_color("#102030"), Some(Rgba([16, 32, 48, 255])));
        assert_eq!(parse_color("rgba(0, 0, 0, 0)"), None);
        assert_eq!(parse_color("hsl(0, 0%, 0%)"), None);
    }

    #[test]
    fn test_blend() {
        let half = blend(Rgba([255, 255, 255, 255]), Rgba([0, 0, 0, 128]));
        assert_eq!(half, Rgba([127, 127, 127, 255]));
        assert_eq!(blend(Rgba([1, 2, 3, 255]), Rgba([9, 9, 9, 255])), Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn test_paints_in_stacking_order() {
        let p = page(DeviceProfile::desktop());
        let img = rasterize(&p);
        assert_eq!(img.dimensions(), (1400, 900));
        assert_eq!(*img.get_pixel(10, 5), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(10, 50), Rgba([242, 240, 233, 255]));
        assert_eq!(*img.get_pixel(10, 500), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_device_scale_factor() {
        let p = page(DeviceProfile::phone());
        let img = rasterize(&p);
        assert_eq!(img.dimensions(), (780, 1688));
        assert_eq!(*img.get_pixel(10, 199), Rgba([242, 240, 233, 255]));
        assert_eq!(*img.get_pixel(10, 201), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_png_decodes() {
        let p = page(DeviceProfile::tablet());
        let png = screenshot(&p).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 900);
    }
}

/// Draw element boxes and their ref labels on a screenshot.
///
/// Each node gets a translucent fill, a solid border and a label with its
/// ref (e.g. "e7"), colored by a fixed 7-color rotation so the Nth node
/// always gets the same color for the same tree.
use image::{imageops, DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use crate::perception::color::luminance;
use crate::perception::refs::flatten;
use crate::perception::types::{BoundingBox, ElementNode};

/// Okabe–Ito colorblind-safe palette.
pub const PALETTE: [[u8; 3]; 7] = [
    [230, 159, 0],   // orange
    [86, 180, 233],  // sky blue
    [0, 158, 115],   // bluish green
    [240, 228, 66],  // yellow
    [0, 114, 178],   // blue
    [213, 94, 0],    // vermillion
    [204, 121, 167], // reddish purple
];

const BLACK: [u8; 3] = [0, 0, 0];
const WHITE: [u8; 3] = [255, 255, 255];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    /// Alpha of the box fill (38 ≈ 15%).
    pub fill_alpha: u8,
    pub border_width: u32,
    /// Offset of the label from the box's top-left corner.
    pub label_margin: u32,
    pub label_padding: u32,
    /// Glyph scale; `None` picks 2× above 1600 px width.
    pub label_scale: Option<u32>,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            fill_alpha: 38,
            border_width: 2,
            label_margin: 2,
            label_padding: 2,
            label_scale: None,
        }
    }
}

impl RenderStyle {
    fn scale_for(&self, image_width: u32) -> u32 {
        self.label_scale
            .unwrap_or(if image_width > 1600 { 2 } else { 1 })
            .max(1)
    }
}

pub fn palette_color(index: usize) -> [u8; 3] {
    PALETTE[index % PALETTE.len()]
}

/// Black on light backgrounds, white on dark ones.
pub fn text_color(background: [u8; 3]) -> [u8; 3] {
    if luminance(background) > 127.5 {
        BLACK
    } else {
        WHITE
    }
}

/// Pixel extents of `text` in the bitmap font at `scale`.
pub fn measure_text(text: &str, scale: u32) -> (u32, u32) {
    let n = text.chars().count() as u32;
    if n == 0 {
        return (0, 0);
    }
    let step = 5 * scale + scale;
    (n * step - scale, 5 * scale)
}

/// Label background rectangle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Place a label of `text_size` anchored at `anchor` + `margin`, pushed
/// left/up as needed so it stays fully inside `canvas`.
pub fn place_label(
    anchor: (i64, i64),
    text_size: (u32, u32),
    padding: u32,
    margin: u32,
    canvas: (u32, u32),
) -> LabelBox {
    let width = text_size.0 + 2 * padding;
    let height = text_size.1 + 2 * padding;
    let mut x = anchor.0 + margin as i64;
    let mut y = anchor.1 + margin as i64;
    if x + width as i64 > canvas.0 as i64 {
        x = canvas.0 as i64 - width as i64;
    }
    if y + height as i64 > canvas.1 as i64 {
        y = canvas.1 as i64 - height as i64;
    }
    LabelBox {
        x: x.max(0) as i32,
        y: y.max(0) as i32,
        width,
        height,
    }
}

/// Render every node of `forest` onto a copy of `image`.
///
/// Fills go to a transparent overlay; borders and labels go straight onto
/// the opaque copy. The overlay is composited last.
pub fn render(image: &DynamicImage, forest: &[ElementNode], style: &RenderStyle) -> RgbaImage {
    let mut canvas = image.to_rgba8();
    let (w, h) = canvas.dimensions();
    let mut overlay = RgbaImage::new(w, h);
    let scale = style.scale_for(w);

    let nodes = flatten(forest);
    let mut drawn = 0usize;
    for (index, node) in nodes.iter().enumerate() {
        let color = palette_color(index);
        let Some(bbox) = node.bounding_box.to_box() else {
            continue;
        };
        let Some(rect) = box_rect(&bbox, (w, h)) else {
            continue;
        };

        let [r, g, b] = color;
        draw_filled_rect_mut(&mut overlay, rect, Rgba([r, g, b, style.fill_alpha]));
        draw_border(&mut canvas, rect, Rgba([r, g, b, 255]), style.border_width);

        if let Some(label) = node.ref_id.as_deref() {
            draw_label(&mut canvas, label, (rect.left() as i64, rect.top() as i64), color, style, scale);
        }
        drawn += 1;
    }

    imageops::overlay(&mut canvas, &overlay, 0, 0);
    tracing::debug!(nodes = nodes.len(), drawn, "element overlay rendered");
    canvas
}

/// Drawing rectangle for a box, intersected with the canvas. Inverted boxes
/// are drawn by their extents; `None` when nothing lands on the canvas.
fn box_rect(bbox: &BoundingBox, canvas: (u32, u32)) -> Option<Rect> {
    let c = bbox.clamped(canvas.0, canvas.1);
    let (left, right) = (c.x_min.min(c.x_max), c.x_min.max(c.x_max));
    let (top, bottom) = (c.y_min.min(c.y_max), c.y_min.max(c.y_max));
    if left >= canvas.0 as i64 || top >= canvas.1 as i64 {
        return None;
    }
    let width = u32::try_from((right - left).max(1)).ok()?;
    let height = u32::try_from((bottom - top).max(1)).ok()?;
    Some(Rect::at(i32::try_from(left).ok()?, i32::try_from(top).ok()?).of_size(width, height))
}

fn draw_border(canvas: &mut RgbaImage, rect: Rect, col: Rgba<u8>, thickness: u32) {
    for t in 0..thickness {
        let inset_w = rect.width() as i64 - 2 * t as i64;
        let inset_h = rect.height() as i64 - 2 * t as i64;
        if inset_w <= 0 || inset_h <= 0 {
            break;
        }
        let inner = Rect::at(rect.left() + t as i32, rect.top() + t as i32)
            .of_size(inset_w as u32, inset_h as u32);
        draw_hollow_rect_mut(canvas, inner, col);
    }
}

fn draw_label(
    canvas: &mut RgbaImage,
    text: &str,
    anchor: (i64, i64),
    bg: [u8; 3],
    style: &RenderStyle,
    scale: u32,
) {
    let dims = canvas.dimensions();
    let text_size = measure_text(text, scale);
    let lb = place_label(anchor, text_size, style.label_padding, style.label_margin, dims);
    if lb.width == 0 || lb.height == 0 {
        return;
    }

    let [r, g, b] = bg;
    draw_filled_rect_mut(
        canvas,
        Rect::at(lb.x, lb.y).of_size(lb.width, lb.height),
        Rgba([r, g, b, 255]),
    );

    let fg = text_color(bg);
    let step = 6 * scale;
    let tx = lb.x as u32 + style.label_padding;
    let ty = lb.y as u32 + style.label_padding;
    for (i, c) in text.chars().enumerate() {
        draw_glyph(canvas, c, tx + i as u32 * step, ty, fg, scale);
    }
}

// ── Bitmap font ──────────────────────────────────────────────────────────────

fn glyph_for(c: char) -> Option<[u8; 5]> {
    match c.to_ascii_uppercase() {
        d @ '0'..='9' => Some(FONT_5X5[(d as u8 - b'0') as usize]),
        l @ 'A'..='Z' => Some(FONT_5X5[10 + (l as u8 - b'A') as usize]),
        '-' => Some([0b00000, 0b00000, 0b11111, 0b00000, 0b00000]),
        '_' => Some([0b00000, 0b00000, 0b00000, 0b00000, 0b11111]),
        ':' => Some([0b00000, 0b00100, 0b00000, 0b00100, 0b00000]),
        _ => None,
    }
}

fn draw_glyph(canvas: &mut RgbaImage, c: char, px: u32, py: u32, col: [u8; 3], scale: u32) {
    let Some(glyph) = glyph_for(c) else { return };
    let (w, h) = canvas.dimensions();
    for (row, &bits) in glyph.iter().enumerate() {
        for bit in 0..5u32 {
            if (bits >> (4 - bit)) & 1 == 0 {
                continue;
            }
            for sy in 0..scale {
                for sx in 0..scale {
                    let x = px + bit * scale + sx;
                    let y = py + row as u32 * scale + sy;
                    if x < w && y < h {
                        canvas.put_pixel(x, y, Rgba([col[0], col[1], col[2], 255]));
                    }
                }
            }
        }
    }
}

/// 5×5 glyphs: digits 0-9 then letters A-Z; bit 4 is the leftmost pixel.
const FONT_5X5: [[u8; 5]; 36] = [
    [0b01110, 0b10001, 0b10001, 0b10001, 0b01110], // 0
    [0b00100, 0b01100, 0b00100, 0b00100, 0b01110], // 1
    [0b01110, 0b10001, 0b00110, 0b01000, 0b11111], // 2
    [0b11110, 0b00001, 0b00110, 0b00001, 0b11110], // 3
    [0b00110, 0b01010, 0b10010, 0b11111, 0b00010], // 4
    [0b11111, 0b10000, 0b11110, 0b00001, 0b11110], // 5
    [0b01110, 0b10000, 0b11110, 0b10001, 0b01110], // 6
    [0b11111, 0b00001, 0b00010, 0b00100, 0b00100], // 7
    [0b01110, 0b10001, 0b01110, 0b10001, 0b01110], // 8
    [0b01110, 0b10001, 0b01111, 0b00001, 0b01110], // 9
    [0b01110, 0b10001, 0b11111, 0b10001, 0b10001], // A
    [0b11110, 0b10001, 0b11110, 0b10001, 0b11110], // B
    [0b01110, 0b10000, 0b10000, 0b10000, 0b01110], // C
    [0b11100, 0b10010, 0b10001, 0b10010, 0b11100], // D
    [0b11111, 0b10000, 0b11110, 0b10000, 0b11111], // E
    [0b11111, 0b10000, 0b11110, 0b10000, 0b10000], // F
    [0b01110, 0b10000, 0b10011, 0b10001, 0b01110], // G
    [0b10001, 0b10001, 0b11111, 0b10001, 0b10001], // H
    [0b01110, 0b00100, 0b00100, 0b00100, 0b01110], // I
    [0b00111, 0b00010, 0b00010, 0b10010, 0b01100], // J
    [0b10001, 0b10010, 0b11100, 0b10010, 0b10001], // K
    [0b10000, 0b10000, 0b10000, 0b10000, 0b11111], // L
    [0b10001, 0b11011, 0b10101, 0b10001, 0b10001], // M
    [0b10001, 0b11001, 0b10101, 0b10011, 0b10001], // N
    [0b01110, 0b10001, 0b10001, 0b10001, 0b01110], // O
    [0b11110, 0b10001, 0b11110, 0b10000, 0b10000], // P
    [0b01110, 0b10001, 0b10101, 0b10010, 0b01101], // Q
    [0b11110, 0b10001, 0b11110, 0b10010, 0b10001], // R
    [0b01111, 0b10000, 0b01110, 0b00001, 0b11110], // S
    [0b11111, 0b00100, 0b00100, 0b00100, 0b00100], // T
    [0b10001, 0b10001, 0b10001, 0b10001, 0b01110], // U
    [0b10001, 0b10001, 0b10001, 0b01010, 0b00100], // V
    [0b10001, 0b10001, 0b10101, 0b11011, 0b10001], // W
    [0b10001, 0b01010, 0b00100, 0b01010, 0b10001], // X
    [0b10001, 0b01010, 0b00100, 0b00100, 0b00100], // Y
    [0b11111, 0b00010, 0b00100, 0b01000, 0b11111], // Z
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::refs::assign_refs;
    use crate::perception::types::{AriaRole, RawBox};
    use image::RgbImage;
    use std::collections::HashSet;

    fn white(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, image::Rgb([255, 255, 255])))
    }

    fn close(a: [u8; 3], b: [u8; 3], tol: i32) -> bool {
        (0..3).all(|i| (a[i] as i32 - b[i] as i32).abs() <= tol)
    }

    fn rgb_at(img: &RgbaImage, x: u32, y: u32) -> [u8; 3] {
        let p = img.get_pixel(x, y);
        [p[0], p[1], p[2]]
    }

    /// `n` side-by-side boxes, 30 px wide, in a single row.
    fn row_of_boxes(n: usize) -> Vec<ElementNode> {
        let mut forest: Vec<ElementNode> = (0..n as i64)
            .map(|i| {
                ElementNode::new(
                    AriaRole::Button,
                    format!("b{i}"),
                    BoundingBox::new(10, 10 + i * 40, 70, 40 + i * 40),
                )
            })
            .collect();
        assign_refs(&mut forest);
        forest
    }

    #[test]
    fn palette_has_seven_distinct_colors_and_cycles() {
        let distinct: HashSet<[u8; 3]> = (0..7).map(palette_color).collect();
        assert_eq!(distinct.len(), 7);
        assert_eq!(palette_color(7), palette_color(0));
        assert_eq!(palette_color(15), palette_color(1));
    }

    #[test]
    fn borders_follow_color_rotation() {
        let forest = row_of_boxes(9);
        let out = render(&white(400, 100), &forest, &RenderStyle::default());
        for i in 0..9u32 {
            // left border, below the label
            let px = rgb_at(&out, 10 + i * 40, 50);
            assert!(close(px, palette_color(i as usize), 2), "node {i}: {px:?}");
        }
        assert_eq!(rgb_at(&out, 10, 50), rgb_at(&out, 10 + 7 * 40, 50));
    }

    #[test]
    fn fill_is_translucent() {
        let forest = row_of_boxes(1);
        let out = render(&white(100, 100), &forest, &RenderStyle::default());
        let inside = rgb_at(&out, 25, 55);
        let [r, g, b] = palette_color(0);
        let a = 38.0 / 255.0;
        let expected = [r, g, b].map(|c| (255.0 * (1.0 - a) + c as f32 * a).round() as u8);
        assert!(close(inside, expected, 3), "{inside:?} vs {expected:?}");
        // outside untouched
        assert_eq!(rgb_at(&out, 90, 90), [255, 255, 255]);
    }

    #[test]
    fn input_is_not_mutated() {
        let img = white(60, 60);
        let before = img.clone();
        let forest = row_of_boxes(1);
        let _ = render(&img, &forest, &RenderStyle::default());
        assert_eq!(img, before);
    }

    #[test]
    fn malformed_boxes_are_skipped_but_consume_a_color() {
        let mut forest = row_of_boxes(2);
        let good = forest[1].clone();
        forest[0].bounding_box = RawBox(vec![1, 2, 3]);
        let out = render(&white(200, 100), &forest, &RenderStyle::default());
        // first slot is blank
        assert_eq!(rgb_at(&out, 10, 50), [255, 255, 255]);
        assert!(close(rgb_at(&out, 50, 50), palette_color(1), 2));
        assert_eq!(forest[1], good);
    }

    #[test]
    fn unvalidated_children_are_cut_to_the_canvas() {
        // children of a malformed node never went through clamping
        let mut forest = vec![ElementNode {
            role: AriaRole::Group,
            name: "bad".into(),
            bounding_box: RawBox(vec![1, 2, 3]),
            children: vec![
                ElementNode::new(AriaRole::Button, "far", BoundingBox::new(0, 2_000_000_000, 10, 2_100_000_000)),
                ElementNode::new(AriaRole::Img, "huge", BoundingBox::new(i64::MIN, i64::MIN, i64::MAX, i64::MAX)),
                ElementNode::new(AriaRole::Link, "edge", BoundingBox::new(-50, 90, 40, 300)),
            ],
            ref_id: None,
        }];
        assign_refs(&mut forest);
        let out = render(&white(100, 100), &forest, &RenderStyle::default());
        assert_eq!(out.dimensions(), (100, 100));
        // "huge" covers the whole canvas, "edge" is cut at the right border
        assert!(close(rgb_at(&out, 0, 50), palette_color(2), 2));
        assert!(close(rgb_at(&out, 90, 20), palette_color(3), 2));
        assert_eq!(box_rect(&BoundingBox::new(0, 2_000_000_000, 10, 2_100_000_000), (100, 100)), None);
        assert_eq!(
            box_rect(&BoundingBox::new(-50, 90, 40, 300), (100, 100)),
            Some(Rect::at(90, 0).of_size(10, 40))
        );
    }

    #[test]
    fn label_is_shifted_back_onto_canvas() {
        let lb = place_label((95, 95), (17, 5), 2, 2, (100, 100));
        assert_eq!(lb, LabelBox { x: 79, y: 91, width: 21, height: 9 });
        let lb = place_label((10, 20), (17, 5), 2, 2, (100, 100));
        assert_eq!((lb.x, lb.y), (12, 22));
    }

    #[test]
    fn oversized_label_pins_to_origin() {
        let lb = place_label((0, 0), (200, 5), 2, 2, (50, 50));
        assert_eq!((lb.x, lb.y), (0, 0));
    }

    #[test]
    fn label_text_contrasts_with_background() {
        assert_eq!(text_color([240, 228, 66]), BLACK);
        assert_eq!(text_color([0, 114, 178]), WHITE);
        assert_eq!(text_color([128, 128, 128]), BLACK);
        assert_eq!(text_color([127, 127, 127]), WHITE);
    }

    #[test]
    fn measure_text_scales() {
        assert_eq!(measure_text("e1", 1), (11, 5));
        assert_eq!(measure_text("e12", 2), (34, 10));
        assert_eq!(measure_text("", 1), (0, 0));
    }

    #[test]
    fn label_in_bottom_right_corner_stays_visible() {
        let mut forest = vec![ElementNode::new(
            AriaRole::Button,
            "corner",
            BoundingBox::new(95, 95, 100, 100),
        )];
        assign_refs(&mut forest);
        let out = render(&white(100, 100), &forest, &RenderStyle::default());
        // label background occupies the corner in the node color
        assert!(close(rgb_at(&out, 99, 99), palette_color(0), 2));
        assert!(close(rgb_at(&out, 86, 92), palette_color(0), 2));
    }
}

use glam::{Mat4, Vec3};
use markerview_common::{ElementLayout, ElementSize};

/// Clip-space transform that places a canvas laid out as `layout` inside a
/// surface of size `surface`. Parts of the canvas outside the surface fall
/// outside clip space and are cropped.
pub fn crop_transform(layout: ElementLayout, surface: ElementSize) -> Mat4 {
    if layout.size.is_empty() || surface.is_empty() {
        return Mat4::IDENTITY;
    }
    let (w, h) = (layout.size.width as f32, layout.size.height as f32);
    let (sw, sh) = (surface.width as f32, surface.height as f32);
    let (ml, mt) = (layout.margin_left as f32, layout.margin_top as f32);

    let scale = Vec3::new(w / sw, h / sh, 1.0);
    let offset = Vec3::new((2.0 * ml + w) / sw - 1.0, 1.0 - (2.0 * mt + h) / sh, 0.0);
    Mat4::from_translation(offset) * Mat4::from_scale(scale)
}

/// Pixel rectangle `(x, y, width, height)` of the canvas that lands on the
/// surface, or `None` if none of it does.
pub fn visible_rect(layout: ElementLayout, surface: ElementSize) -> Option<(u32, u32, u32, u32)> {
    let x0 = layout.margin_left.max(0) as i64;
    let y0 = layout.margin_top.max(0) as i64;
    let x1 = (layout.margin_left as i64 + layout.size.width as i64).min(surface.width as i64);
    let y1 = (layout.margin_top as i64 + layout.size.height as i64).min(surface.height as i64);
    (x1 > x0 && y1 > y0).then(|| (x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn clip(m: Mat4, x: f32, y: f32) -> (f32, f32) {
        let p = m * Vec4::new(x, y, 0.0, 1.0);
        (p.x, p.y)
    }

    #[test]
    fn matching_layout_is_identity() {
        let size = ElementSize::new(640, 480);
        assert_eq!(crop_transform(ElementLayout::fixed(size), size), Mat4::IDENTITY);
    }

    #[test]
    fn overflow_is_cropped_symmetrically() {
        let surface = ElementSize::new(1000, 500);
        let layout = ElementLayout::cover(ElementSize::new(640, 480), surface);
        let m = crop_transform(layout, surface);
        let (x, y) = clip(m, 1.0, 1.0);
        assert!((x - 1.0).abs() < 1e-6);
        assert!((y - 1.5).abs() < 1e-6);
        let (_, y) = clip(m, 0.0, -1.0);
        assert!((y + 1.5).abs() < 1e-6);
    }

    #[test]
    fn smaller_canvas_sits_top_left() {
        let surface = ElementSize::new(1280, 720);
        let m = crop_transform(ElementLayout::fixed(ElementSize::new(640, 360)), surface);
        let (x, y) = clip(m, -1.0, 1.0);
        assert!((x + 1.0).abs() < 1e-6 && (y - 1.0).abs() < 1e-6);
        let (x, y) = clip(m, 1.0, -1.0);
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
    }

    #[test]
    fn visible_rect_clamps_to_surface() {
        let surface = ElementSize::new(1000, 500);
        let layout = ElementLayout {
            size: ElementSize::new(1000, 750),
            margin_left: 0,
            margin_top: -125,
        };
        assert_eq!(visible_rect(layout, surface), Some((0, 0, 1000, 500)));

        let small = ElementLayout::fixed(ElementSize::new(640, 480));
        assert_eq!(visible_rect(small, ElementSize::new(1280, 720)), Some((0, 0, 640, 480)));
    }

    #[test]
    fn fully_offscreen_is_none() {
        let layout = ElementLayout {
            size: ElementSize::new(100, 100),
            margin_left: -200,
            margin_top: 0,
        };
        assert_eq!(visible_rect(layout, ElementSize::new(640, 480)), None);
    }
}

use markerview_capture::VideoSource;
use markerview_common::{ElementLayout, ElementSize, SizedElement};
use markerview_track::DetectionContext;

/// What a resize pass touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeOutcome {
    /// Source element layout after the pass.
    pub layout: ElementLayout,
    pub surface: bool,
    /// False when the context had no detection canvas yet.
    pub canvas: bool,
}

/// Lay the source out for `viewport`, then copy its element size to the
/// render surface and, once the context is initialized, to the detection
/// canvas.
pub fn on_resize(
    source: &mut dyn VideoSource,
    viewport: ElementSize,
    surface: &mut dyn SizedElement,
    context: &mut DetectionContext,
) -> ResizeOutcome {
    source.on_resize_element(viewport);
    source.copy_element_size_to(surface);

    let canvas = match context.controller_canvas_mut() {
        Some(canvas) => {
            source.copy_element_size_to(canvas);
            true
        }
        None => false,
    };

    let layout = source.layout();
    tracing::debug!(
        %viewport,
        element = %layout.size,
        margin_left = layout.margin_left,
        margin_top = layout.margin_top,
        canvas,
        "resize"
    );
    ResizeOutcome {
        layout,
        surface: true,
        canvas,
    }
}

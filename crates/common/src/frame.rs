use crate::ElementSize;

/// One decoded video frame, packed RGBA8, row-major, no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    /// Monotonic per-source frame counter.
    pub index: u64,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>, index: u64) -> Self {
        debug_assert_eq!(
            rgba.len(),
            width as usize * height as usize * 4,
            "rgba buffer does not match frame dimensions"
        );
        Self {
            width,
            height,
            rgba,
            index,
        }
    }

    /// A frame filled with a single colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4], index: u64) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self::new(width, height, data, index)
    }

    pub fn size(&self) -> ElementSize {
        ElementSize::new(self.width, self.height)
    }
}

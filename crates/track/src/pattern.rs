use crate::TrackError;

/// An ARToolKit marker template (`.patt`).
///
/// The text file holds four orientations, each three colour planes of
/// `resolution x resolution` integers in `0..=255`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub resolution: usize,
    pub data: Vec<u8>,
}

impl Pattern {
    const ORIENTATIONS: usize = 4;
    const PLANES: usize = 3;

    pub fn parse(text: &str) -> Result<Self, TrackError> {
        let data = text
            .split_whitespace()
            .map(|tok| {
                tok.parse::<u8>()
                    .map_err(|_| TrackError::Pattern(format!("invalid value {tok:?}")))
            })
            .collect::<Result<Vec<u8>, _>>()?;

        let per_plane = data.len() / (Self::ORIENTATIONS * Self::PLANES);
        let resolution = (per_plane as f64).sqrt() as usize;
        if resolution == 0 || resolution * resolution * Self::ORIENTATIONS * Self::PLANES != data.len() {
            return Err(TrackError::Pattern(format!(
                "{} values do not form 4 x 3 square planes",
                data.len()
            )));
        }
        Ok(Self { resolution, data })
    }

    /// Serialize in the `.patt` text layout: one row per line, a blank line
    /// after each orientation.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for chunk in self.data.chunks(self.resolution * self.resolution * Self::PLANES) {
            for row in chunk.chunks(self.resolution) {
                let line: Vec<String> = row.iter().map(|v| format!("{v:4}")).collect();
                out.push_str(&line.join(""));
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }

    /// Generated 16x16 template for demos and fixtures: a dark glyph with an
    /// off-centre dot on white, so every orientation differs.
    pub fn demo() -> Self {
        const N: usize = 16;
        let glyph = |row: usize, col: usize| -> u8 {
            let bars = (4..6).contains(&col) || (10..12).contains(&col);
            let bridge = (7..9).contains(&row) && (4..12).contains(&col);
            let dot = (1..3).contains(&row) && (1..3).contains(&col);
            let inside = (3..13).contains(&row);
            if dot || (inside && (bars || bridge)) {
                0
            } else {
                255
            }
        };

        let mut data = Vec::with_capacity(N * N * Self::PLANES * Self::ORIENTATIONS);
        for orientation in 0..Self::ORIENTATIONS {
            for _ in 0..Self::PLANES {
                for row in 0..N {
                    for col in 0..N {
                        // Each orientation is the previous one turned 90 degrees.
                        let (mut r, mut c) = (row, col);
                        for _ in 0..orientation {
                            (r, c) = (c, N - 1 - r);
                        }
                        data.push(glyph(r, c));
                    }
                }
            }
        }
        Self { resolution: N, data }
    }

    /// One colour plane of one orientation.
    pub fn plane(&self, orientation: usize, channel: usize) -> Option<&[u8]> {
        if orientation >= Self::ORIENTATIONS || channel >= Self::PLANES {
            return None;
        }
        let len = self.resolution * self.resolution;
        let start = (orientation * Self::PLANES + channel) * len;
        self.data.get(start..start + len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_text(resolution: usize) -> String {
        let mut out = String::new();
        for o in 0..4 {
            for c in 0..3 {
                for row in 0..resolution {
                    let line: Vec<String> = (0..resolution)
                        .map(|col| ((o * 60 + c * 20 + row + col) % 256).to_string())
                        .collect();
                    out.push_str(&line.join(" "));
                    out.push('\n');
                }
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn parses_sixteen_square() {
        let p = Pattern::parse(&pattern_text(16)).unwrap();
        assert_eq!(p.resolution, 16);
        assert_eq!(p.data.len(), 3072);
        assert_eq!(p.plane(1, 2).unwrap()[0], 100);
    }

    #[test]
    fn rejects_wrong_count() {
        let mut text = pattern_text(16);
        text.push_str(" 7");
        assert!(matches!(Pattern::parse(&text), Err(TrackError::Pattern(_))));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let text = pattern_text(16).replacen("0", "256", 1);
        assert!(Pattern::parse(&text).is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(Pattern::parse("").is_err());
    }

    #[test]
    fn demo_template_survives_text_form() {
        let demo = Pattern::demo();
        assert_eq!(demo.resolution, 16);
        assert_eq!(Pattern::parse(&demo.to_text()).unwrap(), demo);
    }

    #[test]
    fn shipped_pattern_is_the_demo_template() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data/patt.hiro");
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(Pattern::parse(&text).unwrap(), Pattern::demo());
    }

    #[test]
    fn demo_orientations_differ() {
        let demo = Pattern::demo();
        let planes: Vec<_> = (0..4).map(|o| demo.plane(o, 0).unwrap()).collect();
        for a in 0..4 {
            for b in a + 1..4 {
                assert_ne!(planes[a], planes[b], "orientations {a} and {b}");
            }
        }
        assert_eq!(demo.plane(0, 0), demo.plane(0, 2));
    }

    #[test]
    fn plane_out_of_range() {
        let p = Pattern::parse(&pattern_text(4)).unwrap();
        assert!(p.plane(4, 0).is_none());
        assert!(p.plane(0, 3).is_none());
    }
}

use glam::Mat4;
use markerview_common::ElementSize;

use crate::TrackError;

/// Camera intrinsics as stored in an ARToolKit `camera_para.dat` file.
///
/// Layout, big-endian: `i32 xsize`, `i32 ysize`, `f64 mat[3][4]`, then the
/// distortion factors. The factor count is implied by the file length.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraCalibration {
    pub size: ElementSize,
    pub mat: [[f64; 4]; 3],
    pub dist_factor: Vec<f64>,
}

const HEADER_LEN: usize = 8 + 12 * 8;

/// Known file sizes and their distortion factor counts.
const VERSIONS: [(usize, usize); 4] = [(136, 4), (144, 5), (152, 6), (176, 9)];

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn i32(&mut self) -> i32 {
        i32::from_be_bytes(self.take())
    }

    fn f64(&mut self) -> f64 {
        f64::from_be_bytes(self.take())
    }
}

impl CameraCalibration {
    /// Parse the binary parameter file.
    pub fn parse(bytes: &[u8]) -> Result<Self, TrackError> {
        let factors = VERSIONS
            .iter()
            .find(|(len, _)| *len == bytes.len())
            .map(|(_, n)| *n)
            .ok_or_else(|| {
                TrackError::Calibration(format!(
                    "unexpected length {} (expected one of 136, 144, 152, 176 bytes)",
                    bytes.len()
                ))
            })?;
        debug_assert!(HEADER_LEN + factors * 8 == bytes.len(), "version table mismatch");

        let mut r = Reader { bytes, pos: 0 };
        let xsize = r.i32();
        let ysize = r.i32();
        if xsize <= 0 || ysize <= 0 {
            return Err(TrackError::Calibration(format!(
                "invalid image size {xsize}x{ysize}"
            )));
        }

        let mut mat = [[0.0; 4]; 3];
        for row in &mut mat {
            for v in row.iter_mut() {
                *v = r.f64();
            }
        }
        let dist_factor: Vec<f64> = (0..factors).map(|_| r.f64()).collect();

        if mat.iter().flatten().chain(&dist_factor).any(|v| !v.is_finite()) {
            return Err(TrackError::Calibration("non-finite value".into()));
        }
        if mat[0][0] <= 0.0 || mat[1][1] <= 0.0 {
            return Err(TrackError::Calibration("focal length must be positive".into()));
        }

        Ok(Self {
            size: ElementSize::new(xsize as u32, ysize as u32),
            mat,
            dist_factor,
        })
    }

    /// Serialize back to the binary layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.dist_factor.len() * 8);
        out.extend_from_slice(&(self.size.width as i32).to_be_bytes());
        out.extend_from_slice(&(self.size.height as i32).to_be_bytes());
        for v in self.mat.iter().flatten().chain(&self.dist_factor) {
            out.extend_from_slice(&v.to_be_bytes());
        }
        out
    }

    /// Focal lengths and principal point: `(fx, fy, cx, cy)` in pixels.
    pub fn intrinsics(&self) -> (f64, f64, f64, f64) {
        (self.mat[0][0], self.mat[1][1], self.mat[0][2], self.mat[1][2])
    }

    /// Pinhole projection for a right-handed, Y-up camera looking down -Z.
    pub fn projection(&self, near: f64, far: f64) -> Mat4 {
        let (fx, fy, cx, cy) = self.intrinsics();
        let w = self.size.width as f64;
        let h = self.size.height as f64;
        #[rustfmt::skip]
        let rows = [
            2.0 * fx / w, 0.0,          1.0 - 2.0 * cx / w,           0.0,
            0.0,          2.0 * fy / h, 2.0 * cy / h - 1.0,           0.0,
            0.0,          0.0,          -(far + near) / (far - near), -2.0 * far * near / (far - near),
            0.0,          0.0,          -1.0,                         0.0,
        ];
        Mat4::from_cols_array(&rows.map(|v| v as f32)).transpose()
    }

    /// A plausible 640x480 webcam calibration, for tests and demos.
    pub fn nominal_640x480() -> Self {
        Self {
            size: ElementSize::new(640, 480),
            mat: [
                [700.0, 0.0, 320.0, 0.0],
                [0.0, 700.0, 240.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
            dist_factor: vec![320.0, 240.0, 0.0, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn parses_its_own_serialization() {
        let c = CameraCalibration::nominal_640x480();
        let bytes = c.to_bytes();
        assert_eq!(bytes.len(), 136);
        assert_eq!(CameraCalibration::parse(&bytes).unwrap(), c);
    }

    #[test]
    fn shipped_calibration_is_nominal() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data/camera_para.dat");
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(CameraCalibration::parse(&bytes).unwrap(), CameraCalibration::nominal_640x480());
    }

    #[test]
    fn nine_factor_files_are_accepted() {
        let mut c = CameraCalibration::nominal_640x480();
        c.dist_factor = vec![0.0; 9];
        let parsed = CameraCalibration::parse(&c.to_bytes()).unwrap();
        assert_eq!(parsed.dist_factor.len(), 9);
    }

    #[test]
    fn rejects_truncated_file() {
        let bytes = CameraCalibration::nominal_640x480().to_bytes();
        let err = CameraCalibration::parse(&bytes[..100]).unwrap_err();
        assert!(matches!(err, TrackError::Calibration(_)));
    }

    #[test]
    fn rejects_bad_image_size() {
        let mut bytes = CameraCalibration::nominal_640x480().to_bytes();
        bytes[..4].copy_from_slice(&0i32.to_be_bytes());
        assert!(CameraCalibration::parse(&bytes).is_err());
    }

    #[test]
    fn rejects_nan() {
        let mut bytes = CameraCalibration::nominal_640x480().to_bytes();
        bytes[8..16].copy_from_slice(&f64::NAN.to_be_bytes());
        assert!(CameraCalibration::parse(&bytes).is_err());
    }

    #[test]
    fn projection_maps_principal_axis_to_centre() {
        let c = CameraCalibration::nominal_640x480();
        let p = c.projection(0.1, 1000.0);
        let clip = p * Vec4::new(0.0, 0.0, -10.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5, "ndc {ndc:?}");
        assert!(ndc.z > -1.0 && ndc.z < 1.0);
    }
}

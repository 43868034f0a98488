use image::imageops::FilterType;
use image::GrayImage;

use crate::config::CANONICAL_RESOLUTION;

use super::decode::PixelMatrix;

/// Rescale an intensity matrix to the full 8-bit range and resample it to
/// the canonical resolution.
///
/// Negative intensities are floored to zero (out-of-range artifacts), then
/// every value is scaled by the matrix maximum. A uniform-zero matrix has
/// no usable maximum and maps to a fully black canonical image instead of
/// dividing by zero.
pub fn normalize(matrix: &PixelMatrix) -> GrayImage {
    let max = matrix.data.iter().copied().fold(0.0f32, f32::max);

    let scaled: Vec<u8> = if max <= 0.0 {
        vec![0; matrix.data.len()]
    } else {
        matrix
            .data
            .iter()
            .map(|&v| ((v.max(0.0) / max) * 255.0) as u8)
            .collect()
    };

    let raster = GrayImage::from_raw(matrix.cols, matrix.rows, scaled)
        .expect("matrix dimensions are validated at construction");

    image::imageops::resize(
        &raster,
        CANONICAL_RESOLUTION,
        CANONICAL_RESOLUTION,
        FilterType::Triangle,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: u32, cols: u32, data: Vec<f32>) -> PixelMatrix {
        PixelMatrix::new(rows, cols, data).unwrap()
    }

    #[test]
    fn output_is_always_canonical_resolution() {
        for (rows, cols) in [(2, 2), (16, 8), (700, 300)] {
            let m = matrix(rows, cols, vec![100.0; (rows * cols) as usize]);
            let out = normalize(&m);
            assert_eq!(out.dimensions(), (CANONICAL_RESOLUTION, CANONICAL_RESOLUTION));
        }
    }

    #[test]
    fn all_zero_input_yields_black_image() {
        let m = matrix(4, 4, vec![0.0; 16]);
        let out = normalize(&m);
        assert!(out.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn all_negative_input_yields_black_image() {
        let m = matrix(4, 4, vec![-50.0; 16]);
        let out = normalize(&m);
        assert!(out.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn maximum_intensity_maps_to_full_white() {
        let mut data = vec![0.0f32; 512 * 512];
        data[0] = 4095.0; // 12-bit well depth, common for CR plates
        let m = matrix(512, 512, data);
        let out = normalize(&m);
        // Resampling may bleed a little, but the peak must stay near white.
        assert!(out.get_pixel(0, 0).0[0] >= 250);
    }

    #[test]
    fn negatives_floored_before_scaling() {
        // Without flooring, -100 would scale below zero and wrap.
        let m = matrix(2, 2, vec![-100.0, 0.0, 50.0, 100.0]);
        let out = normalize(&m);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn uniform_positive_input_maps_to_white() {
        let m = matrix(4, 4, vec![7.0; 16]);
        let out = normalize(&m);
        assert!(out.pixels().all(|p| p.0[0] == 255));
    }
}

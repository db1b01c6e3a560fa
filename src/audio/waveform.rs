//! Per-column min/max envelope mesh.

use glam::Vec2;

use crate::entities::{Size2, TriMesh};

/// Sample index range `[x0, x1]` covered by output column `x`.
pub fn column_range(x: usize, width: usize, count: usize) -> (usize, usize) {
    if count == 0 {
        return (0, 0);
    }
    let last = count - 1;
    if width <= 1 {
        return (0, last);
    }
    let scale = last as f64 / (width - 1) as f64;
    let x0 = ((x as f64 * scale) as usize).min(last);
    let x1 = (((x + 1) as f64 * scale) as usize).min(last);
    (x0, x1.max(x0))
}

/// Build the envelope of mono `samples` (nominally -1..1) as one quad per
/// pixel column. Quad height is min/max scaled about the vertical center of
/// `size`, y growing downward.
pub fn audio_mesh(samples: &[f32], size: Size2) -> TriMesh {
    let width = size.width as usize;
    if width == 0 || size.height == 0 || samples.is_empty() {
        return TriMesh::default();
    }

    let h2 = size.height as f32 / 2.0;
    let mut mesh = TriMesh::with_capacity(width);
    for x in 0..width {
        let (x0, x1) = column_range(x, width, samples.len());
        let (min, max) = samples[x0..=x1]
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)));
        let min = min.clamp(-1.0, 1.0);
        let max = max.clamp(-1.0, 1.0);
        mesh.push_quad(
            Vec2::new(x as f32, h2 - h2 * max),
            Vec2::new((x + 1) as f32, h2 - h2 * min),
        );
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(peak: f32, freq: f32, rate: u32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| (i as f32 * 2.0 * std::f32::consts::PI * freq / rate as f32).sin() * peak)
            .collect()
    }

    #[test]
    fn test_column_range_covers_all_samples() {
        let (width, count) = (10, 100);
        assert_eq!(column_range(0, width, count).0, 0);
        assert_eq!(column_range(width - 1, width, count), (99, 99));
        for x in 1..width {
            // Adjacent columns touch
            assert_eq!(column_range(x - 1, width, count).1, column_range(x, width, count).0);
        }
        assert_eq!(column_range(0, 1, count), (0, 99));
    }

    #[test]
    fn test_sine_span_matches_peak() {
        let peak = 0.8;
        let size = Size2::new(100, 50);
        let mesh = audio_mesh(&sine(peak, 440.0, 48000, 48000), size);
        assert_eq!(mesh.vertices.len(), 400);
        assert_eq!(mesh.triangles.len(), 200);

        let expected = peak * size.height as f32;
        // Last column maps to a single sample
        for (x, quad) in mesh.vertices.chunks(4).enumerate().take(99) {
            let (top, bottom) = (quad[0].y, quad[2].y);
            let span = bottom - top;
            assert!((span - expected).abs() < expected * 0.02, "column {} span {}", x, span);
            assert!(top >= 0.0 && bottom <= size.height as f32);
        }
    }

    #[test]
    fn test_silence_is_flat_at_center() {
        let mesh = audio_mesh(&[0.0; 64], Size2::new(8, 10));
        assert!(mesh.vertices.iter().all(|v| v.y == 5.0));
    }

    #[test]
    fn test_clipping_stays_in_bounds() {
        let mesh = audio_mesh(&[4.0, -4.0, 4.0, -4.0], Size2::new(2, 10));
        assert!(mesh.vertices.iter().all(|v| v.y >= 0.0 && v.y <= 10.0));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(audio_mesh(&[], Size2::new(10, 10)).is_empty());
        assert!(audio_mesh(&[0.5], Size2::new(0, 10)).is_empty());
        assert!(audio_mesh(&[0.5], Size2::new(10, 0)).is_empty());
    }
}

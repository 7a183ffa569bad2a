use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Freehand signature captured as pen strokes on a canvas of `width` x `height` units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub width: f32,
    pub height: f32,
    pub strokes: Vec<Vec<Point>>,
}

impl Signature {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            strokes: Vec::new(),
        }
    }

    /// Pen down. Points are clamped to the canvas.
    pub fn begin_stroke(&mut self, p: Point) {
        let p = self.clamp(p);
        self.strokes.push(vec![p]);
    }

    /// Pen move. Ignored when no stroke is in progress.
    pub fn extend(&mut self, p: Point) {
        let p = self.clamp(p);
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.push(p);
        }
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.iter().all(|s| s.is_empty())
    }

    pub fn point_count(&self) -> usize {
        self.strokes.iter().map(Vec::len).sum()
    }

    /// SHA-256 hex of the canonical JSON form.
    pub fn digest(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&canonical))
    }

    fn clamp(&self, p: Point) -> Point {
        Point::new(p.x.clamp(0.0, self.width.max(0.0)), p.y.clamp(0.0, self.height.max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_signature_is_empty() {
        let sig = Signature::new(300.0, 150.0);
        assert!(sig.is_empty());
        assert_eq!(sig.point_count(), 0);
    }

    #[test]
    fn test_extend_without_stroke_is_ignored() {
        let mut sig = Signature::new(300.0, 150.0);
        sig.extend(Point::new(5.0, 5.0));
        assert!(sig.is_empty());
    }

    #[test]
    fn test_strokes_and_clear() {
        let mut sig = Signature::new(300.0, 150.0);
        sig.begin_stroke(Point::new(10.0, 10.0));
        sig.extend(Point::new(20.0, 30.0));
        sig.begin_stroke(Point::new(100.0, 100.0));
        assert_eq!(sig.strokes.len(), 2);
        assert_eq!(sig.point_count(), 3);
        assert!(!sig.is_empty());
        sig.clear();
        assert!(sig.is_empty());
    }

    #[test]
    fn test_points_clamped_to_canvas() {
        let mut sig = Signature::new(300.0, 150.0);
        sig.begin_stroke(Point::new(-4.0, 500.0));
        assert_eq!(sig.strokes[0][0], Point::new(0.0, 150.0));
    }

    #[test]
    fn test_digest_tracks_content() {
        let mut a = Signature::new(300.0, 150.0);
        a.begin_stroke(Point::new(1.0, 2.0));
        let mut b = a.clone();
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
        b.extend(Point::new(3.0, 4.0));
        assert_ne!(a.digest(), b.digest());
    }
}

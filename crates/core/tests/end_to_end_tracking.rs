use std::path::Path;

use approx::assert_abs_diff_eq;

use facetrack_core::capture::infrastructure::image_sequence_source::ImageSequenceSource;
use facetrack_core::detection::domain::cascade_classifier::ModelError;
use facetrack_core::detection::domain::detection_strategy::DetectionStrategy;
use facetrack_core::detection::domain::face_detector::FaceDetector;
use facetrack_core::pipeline::frame_processor::{FrameProcessor, ProcessorConfig};
use facetrack_core::pipeline::mode::Mode;
use facetrack_core::pipeline::overlay::OverlayShape;
use facetrack_core::shared::frame::Frame;
use facetrack_core::shared::geometry::{OrientedRegion, Rect};

const SIZE: u32 = 160;
const SIDE: u32 = 40;

/// Reports a fixed face only while the frame's centre region is coloured.
struct CentreDetector {
    face: Rect,
}

impl FaceDetector for CentreDetector {
    fn load_model(&mut self, path: &Path) -> Result<(), ModelError> {
        Err(ModelError::NotFound(path.to_path_buf()))
    }

    fn has_model(&self) -> bool {
        true
    }

    fn detect(
        &mut self,
        frame: &Frame,
        _strategy: DetectionStrategy,
    ) -> Result<Vec<Rect>, Box<dyn std::error::Error>> {
        let (cx, cy) = self.face.center();
        let offset = ((cy as u32 * frame.width() + cx as u32) * 3) as usize;
        let lit = frame.data()[offset..offset + 3].iter().any(|&c| c > 0);
        Ok(if lit { vec![self.face] } else { Vec::new() })
    }
}

/// Writes a PNG with a solid blue square whose top-left corner is `(x, y)`.
fn write_square(dir: &Path, name: &str, square_at: Option<(u32, u32)>) {
    let mut img = image::RgbImage::new(SIZE, SIZE);
    if let Some((x0, y0)) = square_at {
        for y in y0..y0 + SIDE {
            for x in x0..x0 + SIDE {
                img.put_pixel(x, y, image::Rgb([0, 0, 255]));
            }
        }
    }
    img.save(dir.join(name)).unwrap();
}

fn open(dir: &Path) -> FrameProcessor {
    let source = ImageSequenceSource::new(dir, 15.0);
    let detector = CentreDetector {
        face: Rect::new(50, 50, SIDE as i32, SIDE as i32),
    };
    let config = ProcessorConfig {
        load_default_cascade: false,
        ..ProcessorConfig::default()
    };
    FrameProcessor::open(Box::new(source), Box::new(detector), config)
}

fn tracked(shapes: &[OverlayShape]) -> Option<OrientedRegion> {
    shapes.iter().find_map(|shape| match shape {
        OverlayShape::Region(region) => Some(*region),
        OverlayShape::Rectangle(_) => None,
    })
}

#[test]
fn test_follows_a_slowly_moving_face() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..6u32 {
        write_square(dir.path(), &format!("{i:03}.png"), Some((50 + 2 * i, 50)));
    }

    let mut processor = open(dir.path());
    processor.set_mode(Mode::Tracking).unwrap();

    for i in 0..6u32 {
        let out = processor.tick().unwrap();
        let region = tracked(&out.shapes).unwrap();
        let expected_x = (50 + 2 * i + SIDE / 2) as f32;
        assert_abs_diff_eq!(region.center.0, expected_x, epsilon = 3.0);
        assert_abs_diff_eq!(region.center.1, 70.0, epsilon = 3.0);
    }
    assert_eq!(processor.mode(), Mode::Tracking);
}

#[test]
fn test_reacquires_after_the_face_leaves() {
    let dir = tempfile::tempdir().unwrap();
    write_square(dir.path(), "000.png", Some((50, 50)));
    write_square(dir.path(), "001.png", None);
    write_square(dir.path(), "002.png", None);
    write_square(dir.path(), "003.png", Some((50, 50)));

    let mut processor = open(dir.path());
    processor.set_mode(Mode::Tracking).unwrap();

    assert!(tracked(&processor.tick().unwrap().shapes).is_some());
    assert!(processor.target().is_some());

    assert!(tracked(&processor.tick().unwrap().shapes).is_none());
    assert_eq!(processor.target(), None);

    let waiting = processor.tick().unwrap();
    assert!(waiting.shapes.is_empty());
    assert_eq!(waiting.status, "tracking: awaiting target");

    let back = tracked(&processor.tick().unwrap().shapes).unwrap();
    assert_abs_diff_eq!(back.center.0, 70.0, epsilon = 2.0);
    assert_abs_diff_eq!(back.center.1, 70.0, epsilon = 2.0);
}

#[test]
fn test_detection_reports_rectangles_without_tracking() {
    let dir = tempfile::tempdir().unwrap();
    write_square(dir.path(), "000.png", Some((50, 50)));

    let mut processor = open(dir.path());
    processor.set_mode(Mode::Detecting).unwrap();
    let out = processor.tick().unwrap();

    assert_eq!(
        out.shapes,
        vec![OverlayShape::Rectangle(Rect::new(50, 50, 40, 40))]
    );
    assert!(out.status.starts_with("detecting: 1 face(s)"));
    assert_eq!(processor.target(), None);
}

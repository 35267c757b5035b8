// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/plugin_test.rs - 目标检测插件测试
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{
  path::Path,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  thread,
};

use image::{Rgb, RgbImage};
use mockall::mock;
use serde_json::{Map, Value, json};
use thiserror::Error;

use shanan_detect_objects::{
  BoundingBox, Category, Detection, DetectorFactory, Frame, FrameImage, HostContext,
  ObjectDetectionPlugin, ObjectDetector, ObjectDetectorOptions, ObjectDetectorResult, PixelFormat,
  Plane, PluginError,
};

#[derive(Error, Debug)]
#[error("fake detector failure: {0}")]
pub struct FakeError(String);

/// 返回固定结果，并记录收到的图像尺寸
pub struct FakeDetector {
  detections: Vec<Detection>,
  seen: Arc<parking_lot::Mutex<Vec<(u32, u32)>>>,
}

impl FakeDetector {
  fn new(detections: Vec<Detection>) -> Self {
    Self {
      detections,
      seen: Arc::default(),
    }
  }
}

impl ObjectDetector for FakeDetector {
  type Error = FakeError;

  fn detect(&self, image: &RgbImage) -> Result<ObjectDetectorResult, Self::Error> {
    self.seen.lock().push(image.dimensions());
    Ok(ObjectDetectorResult {
      detections: self.detections.clone(),
      timestamp_ms: 0,
    })
  }
}

mock! {
  pub Factory {}

  impl DetectorFactory for Factory {
    type Detector = FakeDetector;
    type Error = FakeError;

    fn create_from_options(
      &self,
      context: &HostContext,
      options: &ObjectDetectorOptions,
    ) -> Result<FakeDetector, FakeError>;
  }
}

fn init_tracing() {
  let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn arguments(value: Value) -> Map<String, Value> {
  match value {
    Value::Object(map) => map,
    _ => panic!("arguments must be an object"),
  }
}

fn image_frame() -> Frame {
  Frame::from_rgb_image(RgbImage::from_pixel(8, 6, Rgb([30, 60, 90])), 1_000)
}

fn sample_detections() -> Vec<Detection> {
  vec![
    Detection::new(
      vec![Category::new(0, 0.875, "person")],
      BoundingBox::new(10.0, 20.0, 110.0, 220.0),
    ),
    Detection::new(vec![], BoundingBox::new(0.0, 0.0, 5.0, 5.0)),
    Detection::new(
      vec![
        Category::new(16, 0.5, "dog"),
        Category::new(15, 0.25, "cat"),
        Category::new(21, 0.125, "bear"),
      ],
      BoundingBox::new(1.5, 2.5, 4.0, 8.0),
    ),
  ]
}

#[test]
fn frame_without_image_returns_empty() {
  init_tracing();
  let mut factory = MockFactory::new();
  factory.expect_create_from_options().never();
  let plugin = ObjectDetectionPlugin::new(HostContext::new("/assets"), factory);

  for args in [
    None,
    Some(arguments(json!({"modelFile": "m", "maxResults": 5}))),
    Some(arguments(json!({"maxResults": "invalid"}))),
  ] {
    let records = plugin.detect_objects(&Frame::empty(0), args.as_ref()).unwrap();
    assert!(records.is_empty());
  }
  assert!(!plugin.is_initialized());
}

#[test]
fn detector_built_with_max_results_and_threshold() {
  init_tracing();
  let mut factory = MockFactory::new();
  factory
    .expect_create_from_options()
    .withf(|_, options| {
      options.base_options().model_asset_path() == Path::new("/assets/m")
        && options.max_results() == Some(5)
        && options.score_threshold() == Some(0.3)
    })
    .times(1)
    .returning(|_, _| Ok(FakeDetector::new(vec![])));
  let plugin = ObjectDetectionPlugin::new(HostContext::new("/assets"), factory);

  let args = arguments(json!({"modelFile": "m", "maxResults": 5, "scoreThreshold": 0.3}));
  plugin.detect_objects(&image_frame(), Some(&args)).unwrap();
}

#[test]
fn zero_threshold_is_not_applied() {
  init_tracing();
  let mut factory = MockFactory::new();
  factory
    .expect_create_from_options()
    .withf(|_, options| options.score_threshold().is_none() && options.max_results() == Some(2))
    .times(1)
    .returning(|_, _| Ok(FakeDetector::new(vec![])));
  let plugin = ObjectDetectionPlugin::new(HostContext::new("/assets"), factory);

  let args = arguments(json!({"modelFile": "m", "maxResults": 2, "scoreThreshold": 0}));
  plugin.detect_objects(&image_frame(), Some(&args)).unwrap();
}

#[test]
fn detections_without_categories_are_dropped() {
  init_tracing();
  let mut factory = MockFactory::new();
  factory
    .expect_create_from_options()
    .times(1)
    .returning(|_, _| Ok(FakeDetector::new(sample_detections())));
  let plugin = ObjectDetectionPlugin::new(HostContext::new("/assets"), factory);

  let args = arguments(json!({"modelFile": "m"}));
  let records = plugin.detect_objects(&image_frame(), Some(&args)).unwrap();

  assert_eq!(records.len(), 2);
  assert_eq!(records[0].labels.len(), 1);
  assert_eq!(records[1].labels.len(), 3);
  let labels: Vec<&str> = records[1].labels.iter().map(|l| l.label.as_str()).collect();
  assert_eq!(labels, vec!["dog", "cat", "bear"]);
  assert_eq!(records[1].labels[2].index, 21);
  assert_eq!(records[1].labels[2].confidence, 0.125);
}

#[test]
fn first_configuration_wins() {
  init_tracing();
  let mut factory = MockFactory::new();
  factory
    .expect_create_from_options()
    .withf(|_, options| options.base_options().model_asset_path() == Path::new("/assets/first"))
    .times(1)
    .returning(|_, _| Ok(FakeDetector::new(sample_detections())));
  let plugin = ObjectDetectionPlugin::new(HostContext::new("/assets"), factory);

  let first = arguments(json!({"modelFile": "first"}));
  let second = arguments(json!({"modelFile": "second", "scoreThreshold": 0.9}));
  let a = plugin.detect_objects(&image_frame(), Some(&first)).unwrap();
  let b = plugin.detect_objects(&image_frame(), Some(&second)).unwrap();

  assert_eq!(a, b);
  assert_eq!(
    plugin.active_config().unwrap().model_file,
    shanan_detect_objects::ModelAsset::Asset("first".to_string())
  );
}

#[test]
fn later_arguments_are_ignored_once_created() {
  init_tracing();
  let mut factory = MockFactory::new();
  factory
    .expect_create_from_options()
    .withf(|_, options| options.max_results() == Some(4))
    .times(1)
    .returning(|_, _| Ok(FakeDetector::new(sample_detections())));
  let plugin = ObjectDetectionPlugin::new(HostContext::new("/assets"), factory);

  let args = arguments(json!({"modelFile": "m", "maxResults": 4}));
  let first = plugin.detect_objects(&image_frame(), Some(&args)).unwrap();
  assert_eq!(first.len(), 2);

  let missing = plugin.detect_objects(&image_frame(), None).unwrap();
  let zero = arguments(json!({"modelFile": "m", "maxResults": 0}));
  let invalid = plugin.detect_objects(&image_frame(), Some(&zero)).unwrap();
  assert_eq!(missing, first);
  assert_eq!(invalid, first);
}

#[test]
fn bounding_box_fields_are_widened() {
  init_tracing();
  let mut factory = MockFactory::new();
  factory
    .expect_create_from_options()
    .returning(|_, _| Ok(FakeDetector::new(sample_detections())));
  let plugin = ObjectDetectionPlugin::new(HostContext::new("/assets"), factory);

  let args = arguments(json!({"modelFile": "m"}));
  let records = plugin.detect_objects(&image_frame(), Some(&args)).unwrap();

  let bbox = sample_detections()[2].bounding_box;
  assert_eq!(records[1].top, bbox.top as f64);
  assert_eq!(records[1].left, bbox.left as f64);
  assert_eq!(records[1].width, bbox.width() as f64);
  assert_eq!(records[1].height, bbox.height() as f64);
}

#[test]
fn factory_error_propagates() {
  init_tracing();
  let mut factory = MockFactory::new();
  factory
    .expect_create_from_options()
    .times(1)
    .returning(|_, options| {
      Err(FakeError(
        options.base_options().model_asset_path().display().to_string(),
      ))
    });
  let plugin = ObjectDetectionPlugin::new(HostContext::new("/assets"), factory);

  let args = arguments(json!({"modelFile": "missing.tflite"}));
  let err = plugin.detect_objects(&image_frame(), Some(&args)).unwrap_err();
  assert!(matches!(err, PluginError::CreateDetector(_)));
  assert!(err.to_string().contains("missing.tflite"));
}

#[test]
fn yuv_frame_is_converted_before_detection() {
  init_tracing();
  let detector = FakeDetector::new(vec![]);
  let seen = detector.seen.clone();
  let detector = parking_lot::Mutex::new(Some(detector));
  let mut factory = MockFactory::new();
  factory
    .expect_create_from_options()
    .times(1)
    .returning(move |_, _| Ok(detector.lock().take().unwrap()));
  let plugin = ObjectDetectionPlugin::new(HostContext::new("/assets"), factory);

  let frame = Frame::new(
    Some(FrameImage::new(
      4,
      2,
      PixelFormat::Yuv420,
      vec![
        Plane::new(vec![128; 8], 4, 1),
        Plane::new(vec![128; 2], 2, 1),
        Plane::new(vec![128; 2], 2, 1),
      ],
    )),
    7,
  );
  let args = arguments(json!({"modelFile": "m"}));
  plugin.detect_objects(&frame, Some(&args)).unwrap();

  assert_eq!(*seen.lock(), vec![(4, 2)]);
}

#[test]
fn malformed_frame_is_an_error() {
  init_tracing();
  let mut factory = MockFactory::new();
  factory.expect_create_from_options().never();
  let plugin = ObjectDetectionPlugin::new(HostContext::new("/assets"), factory);

  let frame = Frame::new(
    Some(FrameImage::new(
      4,
      4,
      PixelFormat::Rgba8888,
      vec![Plane::new(vec![0; 8], 16, 4)],
    )),
    0,
  );
  let args = arguments(json!({"modelFile": "m"}));
  let err = plugin.detect_objects(&frame, Some(&args)).unwrap_err();
  assert!(matches!(err, PluginError::Frame(_)));
}

#[test]
fn concurrent_first_use_creates_one_detector() {
  init_tracing();
  let calls = Arc::new(AtomicUsize::new(0));
  let counter = calls.clone();
  let plugin = ObjectDetectionPlugin::new(
    HostContext::new("/assets"),
    move |_: &HostContext, _: &ObjectDetectorOptions| {
      counter.fetch_add(1, Ordering::SeqCst);
      thread::sleep(std::time::Duration::from_millis(10));
      Ok::<_, FakeError>(FakeDetector::new(sample_detections()))
    },
  );
  let args = arguments(json!({"modelFile": "m"}));

  thread::scope(|scope| {
    for _ in 0..8 {
      scope.spawn(|| {
        let records = plugin.detect_objects(&image_frame(), Some(&args)).unwrap();
        assert_eq!(records.len(), 2);
      });
    }
  });

  assert_eq!(calls.load(Ordering::SeqCst), 1);
}

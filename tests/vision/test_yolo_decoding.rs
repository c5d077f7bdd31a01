// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Raw YOLO tensors through decoding, suppression and scan filtering

use ndarray::ArrayD;
use ndarray::IxDyn;
use scan_inference_node::scan::{aggregate, filter_detections, ClassNames, Label};
use scan_inference_node::vision::detector::{
    decode_yolo_output, non_max_suppression, parse_class_names, MAX_DETECTIONS, NMS_IOU_THRESHOLD,
};

const ANCHORS: usize = 16;

/// Build a channels-first `[1, 4 + nc, N]` tensor, padding unused anchors with zeros
fn tensor(rows: &[[f32; 8]]) -> ArrayD<f32> {
    let attrs = 8;
    let mut data = vec![0.0f32; attrs * ANCHORS];
    for (anchor, row) in rows.iter().enumerate() {
        for (attr, value) in row.iter().enumerate() {
            data[attr * ANCHORS + anchor] = *value;
        }
    }
    ArrayD::from_shape_vec(IxDyn(&[1, attrs, ANCHORS]), data).unwrap()
}

#[test]
fn test_overlapping_boxes_collapse_to_best_and_order_is_kept() {
    // cx, cy, w, h, lice, nits, dandruff, psoriasis
    let output = tensor(&[
        [100.0, 100.0, 40.0, 40.0, 0.60, 0.0, 0.0, 0.0],
        [101.0, 101.0, 40.0, 40.0, 0.92, 0.0, 0.0, 0.0],
        [300.0, 300.0, 20.0, 20.0, 0.0, 0.55, 0.0, 0.0],
        [500.0, 500.0, 20.0, 20.0, 0.0, 0.0, 0.10, 0.0],
        [200.0, 200.0, 30.0, 30.0, 0.0, 0.0, 0.0, 0.40],
        [400.0, 400.0, 10.0, 10.0, 0.0, 0.0, 0.0, 0.0],
    ]);

    let candidates = decode_yolo_output(&output.view(), 0.25).unwrap();
    assert_eq!(candidates.len(), 4);

    let kept = non_max_suppression(candidates, NMS_IOU_THRESHOLD, MAX_DETECTIONS);
    assert_eq!(kept.len(), 3);

    let outcome = filter_detections(&kept, 0.5, &ClassNames::default());
    let result = aggregate(outcome.detections);

    assert_eq!(result.label, Label::Lice);
    assert!((result.confidence - 0.92).abs() < 1e-6);
    assert_eq!(
        result
            .detections
            .iter()
            .map(|d| d.label)
            .collect::<Vec<_>>(),
        vec![Label::Lice, Label::Nits]
    );
    assert!((result.detections[0].width - 40.0).abs() < 1e-4);
    assert_eq!(outcome.stats.below_threshold, 1);
}

#[test]
fn test_embedded_class_names_drive_labels() {
    let names = parse_class_names("{0: 'nits', 1: 'louse', 2: 'scalp', 3: 'psoriasis'}");
    let class_names = ClassNames::new(names);
    let output = tensor(&[
        [50.0, 50.0, 10.0, 10.0, 0.8, 0.0, 0.0, 0.0],
        [150.0, 150.0, 10.0, 10.0, 0.0, 0.7, 0.0, 0.0],
        [250.0, 250.0, 10.0, 10.0, 0.0, 0.0, 0.9, 0.0],
    ]);

    let kept = non_max_suppression(
        decode_yolo_output(&output.view(), 0.25).unwrap(),
        NMS_IOU_THRESHOLD,
        MAX_DETECTIONS,
    );
    let outcome = filter_detections(&kept, 0.25, &class_names);
    let result = aggregate(outcome.detections);

    // "scalp" is not a scan label, so the 0.9 box never surfaces
    assert_eq!(outcome.stats.clear_dropped, 1);
    assert_eq!(result.label, Label::Nits);
    assert_eq!(result.detections[1].label, Label::Lice);
}

#[test]
fn test_unexpected_shape_is_an_error() {
    let output = ArrayD::<f32>::zeros(IxDyn(&[2, 8, 4]));
    assert!(decode_yolo_output(&output.view(), 0.25).is_err());
}

use arcam::core::synthetic::planar;
use arcam::prelude::*;

#[test]
fn calibrate_solve_and_project_through_the_prelude() {
    let truth = PinholeCamera::new(
        Intrinsics::new(790.0, 790.0, 320.0, 240.0).unwrap(),
        BrownConrady5 {
            k1: -0.08,
            ..Default::default()
        },
    );
    let board = planar::board_points(6, 9, 1.0);
    let poses = planar::orbit_poses(7, &planar::board_center(6, 9, 1.0), 20.0);

    let mut collector = CornerObservationCollector::new(GridSize::default(), 1.0);
    for pose in &poses {
        let view = planar::project_view(&truth, &board, pose).unwrap();
        collector.accept(&view.points_2d).unwrap();
    }
    let result = CalibrationEstimator::default()
        .estimate(collector.all(), ImageSize::new(640, 480))
        .unwrap();
    assert!(result.rms < 0.5);

    let frame = ObservationSet {
        points_3d: collector.target_points().to_vec(),
        points_2d: collector.all()[3].points_2d.clone(),
    };
    let solution = PoseEstimator::default()
        .solve(&frame, &result.camera)
        .unwrap();
    assert!(solution.pose.rotation_angle_to(&poses[3]) < 1e-2);

    let cube = OverlayLibrary::builtin().get("cube").cloned().unwrap();
    let pixels = project_points(&cube.points, &solution.pose, &result.camera);
    assert_eq!(pixels.len(), 8);
    assert!(pixels.iter().all(|p| p.is_some()));
}

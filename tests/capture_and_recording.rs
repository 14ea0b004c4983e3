use flashcam::device::Mirror;
use flashcam::device::simulated::{DeviceCall, SimulatedRig};
use flashcam::{
    AppConfig, AppEvent, CameraApp, CameraFacing, Error, FlashSetting, PermissionKind, Readiness,
    SwipeDirection,
};
use image::{DynamicImage, Luma};
use qrcode::QrCode;
use std::time::Duration;

async fn started_app(rig: &SimulatedRig, facing: CameraFacing) -> CameraApp {
    let mut config = AppConfig::default();
    config.camera.facing = facing;
    let mut app = CameraApp::new(rig.devices(), &config);
    assert_eq!(app.start().await.expect("start app"), Readiness::Ready);
    rig.log.clear();
    app
}

async fn back_flash_on(app: &mut CameraApp) {
    app.toggle_flash().await.expect("auto");
    app.toggle_flash().await.expect("on");
    assert_eq!(app.flash().setting(), FlashSetting::On);
}

#[tokio::test]
async fn back_on_uses_hardware_shutter() {
    let rig = SimulatedRig::new();
    let mut app = started_app(&rig, CameraFacing::Back).await;
    back_flash_on(&mut app).await;
    rig.log.clear();

    let saved = app.take_photo().await.expect("photo");
    assert_eq!(saved, "sim://library/1/photo-1.jpg");
    assert_eq!(app.last_media(), Some(saved.as_str()));
    assert_eq!(
        rig.log.calls(),
        vec![
            DeviceCall::TakePicture,
            DeviceCall::Save {
                uri: "sim://camera/photo-1.jpg".to_string()
            }
        ]
    );
}

#[tokio::test]
async fn back_torch_uses_preview_snapshot() {
    let rig = SimulatedRig::new();
    let mut app = started_app(&rig, CameraFacing::Back).await;
    back_flash_on(&mut app).await;
    app.toggle_torch().await.expect("torch");
    rig.log.clear();

    app.take_photo().await.expect("photo");
    assert_eq!(rig.log.count(&DeviceCall::TakePicture), 0);
    assert_eq!(
        rig.log.calls(),
        vec![
            DeviceCall::PreviewFrame {
                mirror: Mirror::None
            },
            DeviceCall::Save {
                uri: "sim://preview/frame-1.jpg".to_string()
            }
        ]
    );
    assert_eq!(app.flash().setting(), FlashSetting::Torch);
}

#[tokio::test]
async fn front_on_pulses_screen_around_shutter() {
    let rig = SimulatedRig::new();
    let mut app = started_app(&rig, CameraFacing::Front).await;
    app.toggle_flash().await.expect("on");
    rig.log.clear();

    app.take_photo().await.expect("photo");
    assert_eq!(
        rig.log.calls(),
        vec![
            DeviceCall::SetBrightness { level: 1.0 },
            DeviceCall::TakePicture,
            DeviceCall::ResetBrightness,
            DeviceCall::Save {
                uri: "sim://camera/photo-1.jpg".to_string()
            }
        ]
    );
    assert_eq!(app.flash().setting(), FlashSetting::On);
}

#[tokio::test]
async fn failed_front_shot_still_reverts_pulse() {
    let rig = SimulatedRig::new();
    let mut app = started_app(&rig, CameraFacing::Front).await;
    app.toggle_flash().await.expect("on");
    rig.camera.fail_captures(true);

    let err = app.dispatch(AppEvent::TakePhoto).await.unwrap_err();
    assert!(matches!(err, Error::CaptureFailed(_)));
    assert_eq!(app.flash().setting(), FlashSetting::On);
    assert_eq!(rig.brightness.level(), None);
    assert_eq!(app.last_media(), None);

    rig.camera.fail_captures(false);
    app.take_photo().await.expect("recovers after failure");
}

#[tokio::test]
async fn recording_promotes_on_to_torch_and_stop_keeps_it() {
    let rig = SimulatedRig::new();
    let mut app = started_app(&rig, CameraFacing::Back).await;
    back_flash_on(&mut app).await;

    app.start_recording().await.expect("record");
    assert!(app.is_recording());
    assert_eq!(app.flash().setting(), FlashSetting::Torch);
    assert_eq!(rig.notifier.rationales(PermissionKind::Microphone), 1);

    let clip = app.stop_recording().await.expect("stop");
    assert_eq!(clip.as_deref(), Some("sim://library/1/clip-1.mp4"));
    assert_eq!(app.last_media(), Some("sim://thumbnails/clip-1.jpg"));
    assert_eq!(
        rig.log.count(&DeviceCall::Thumbnail {
            uri: "sim://library/1/clip-1.mp4".to_string()
        }),
        1
    );
    assert!(!app.is_recording());
    assert_eq!(app.flash().setting(), FlashSetting::Torch);

    assert_eq!(app.stop_recording().await.expect("idle stop"), None);
}

#[tokio::test]
async fn front_recording_lights_screen() {
    let rig = SimulatedRig::new();
    let mut app = started_app(&rig, CameraFacing::Front).await;
    app.toggle_flash().await.expect("on");

    app.start_recording().await.expect("record");
    assert_eq!(app.flash().setting(), FlashSetting::Torch);
    assert_eq!(rig.brightness.level(), Some(1.0));
}

#[tokio::test]
async fn photo_while_recording_grabs_mirrored_preview() {
    let rig = SimulatedRig::new();
    let mut app = started_app(&rig, CameraFacing::Front).await;
    app.toggle_flash().await.expect("on");
    app.start_recording().await.expect("record");
    app.toggle_torch().await.expect("back to on");
    rig.log.clear();

    app.take_photo().await.expect("photo");
    assert_eq!(rig.log.count(&DeviceCall::TakePicture), 0);
    assert_eq!(
        rig.log.count(&DeviceCall::PreviewFrame {
            mirror: Mirror::Horizontal
        }),
        1
    );
    // No pulse while the video is rolling.
    assert!(!rig.log.touched_brightness());
}

#[tokio::test]
async fn microphone_denied_blocks_recording() {
    let rig = SimulatedRig::new();
    rig.permissions.deny(PermissionKind::Microphone);
    let mut app = started_app(&rig, CameraFacing::Back).await;
    back_flash_on(&mut app).await;

    let err = app.start_recording().await.unwrap_err();
    assert!(matches!(
        err,
        Error::PermissionDenied(PermissionKind::Microphone)
    ));
    assert!(!app.is_recording());
    assert_eq!(app.flash().setting(), FlashSetting::On);
    assert_eq!(rig.log.count(&DeviceCall::StartRecording), 0);
}

#[tokio::test]
async fn failed_recording_start_changes_nothing() {
    let rig = SimulatedRig::new();
    let mut app = started_app(&rig, CameraFacing::Back).await;
    back_flash_on(&mut app).await;
    rig.camera.fail_captures(true);

    let err = app.start_recording().await.unwrap_err();
    assert!(matches!(err, Error::CaptureFailed(_)));
    assert!(!app.is_recording());
    assert_eq!(app.flash().setting(), FlashSetting::On);
}

#[tokio::test]
async fn flip_while_recording_saves_clip() {
    let rig = SimulatedRig::new();
    let mut app = started_app(&rig, CameraFacing::Back).await;
    app.start_recording().await.expect("record");

    app.flip().await.expect("flip");
    assert!(!app.is_recording());
    assert_eq!(app.flash().facing(), CameraFacing::Front);
    assert_eq!(app.last_media(), Some("sim://thumbnails/clip-1.jpg"));
    assert_eq!(rig.media.saved(), vec!["sim://library/1/clip-1.mp4"]);
    assert_eq!(rig.log.count(&DeviceCall::StopRecording), 1);
}

#[tokio::test]
async fn failed_stop_keeps_recording_until_flip() {
    let rig = SimulatedRig::new();
    let mut app = started_app(&rig, CameraFacing::Back).await;
    app.start_recording().await.expect("record");
    rig.camera.fail_captures(true);

    let err = app.stop_recording().await.unwrap_err();
    assert!(matches!(err, Error::CaptureFailed(_)));
    assert!(app.is_recording());
    assert_eq!(app.last_media(), None);

    assert_eq!(app.flip().await.expect("flip"), CameraFacing::Front);
    assert!(!app.is_recording());
    assert_eq!(app.flash().facing(), CameraFacing::Front);
    assert_eq!(app.last_media(), None);
    assert!(rig.media.saved().is_empty());
}

#[tokio::test]
async fn rejected_initial_state_keeps_capture_disabled() {
    let rig = SimulatedRig::new();
    rig.camera.fail_configuration(true);
    let mut app = CameraApp::new(rig.devices(), &AppConfig::default());

    assert!(matches!(app.start().await, Err(Error::Unavailable(_))));
    assert_eq!(app.readiness(), Readiness::Pending);
    assert!(matches!(
        app.take_photo().await.unwrap_err(),
        Error::Unavailable(_)
    ));
    assert_eq!(rig.log.count(&DeviceCall::TakePicture), 0);

    rig.camera.fail_configuration(false);
    assert_eq!(app.start().await.expect("retry"), Readiness::Ready);
    assert_eq!(
        rig.log.count(&DeviceCall::RequestPermission {
            kind: PermissionKind::Camera
        }),
        1
    );
    app.take_photo().await.expect("photo");
}

#[tokio::test]
async fn blocked_startup_refuses_capture_but_keeps_ui_alive() {
    let rig = SimulatedRig::new();
    rig.permissions.deny(PermissionKind::MediaLibrary);
    let mut app = CameraApp::new(rig.devices(), &AppConfig::default());

    assert_eq!(
        app.start().await.expect("start"),
        Readiness::Blocked(PermissionKind::MediaLibrary)
    );
    let err = app.take_photo().await.unwrap_err();
    assert!(err.is_permission_denied());
    assert_eq!(rig.log.count(&DeviceCall::TakePicture), 0);

    app.dispatch(AppEvent::ToggleFlash).await.expect("flash still works");
    assert_eq!(app.flash().setting(), FlashSetting::Auto);
}

#[tokio::test]
async fn capture_before_start_is_unavailable() {
    let rig = SimulatedRig::new();
    let mut app = CameraApp::new(rig.devices(), &AppConfig::default());
    assert!(matches!(
        app.take_photo().await.unwrap_err(),
        Error::Unavailable(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn swipes_cycle_ratios_with_transient_overlay() {
    let rig = SimulatedRig::new();
    let mut app = started_app(&rig, CameraFacing::Back).await;

    assert_eq!(app.swipe(SwipeDirection::Left).await.expect("early swipe"), None);
    assert!(rig.log.calls().is_empty());

    app.dispatch(AppEvent::CameraReady).await.expect("ready");
    assert_eq!(app.ratio(), Some("4:3"));
    assert_eq!(
        rig.log.calls(),
        vec![DeviceCall::SetRatio {
            ratio: "4:3".to_string()
        }]
    );

    app.dispatch(AppEvent::Swipe(SwipeDirection::Left))
        .await
        .expect("swipe");
    assert_eq!(app.ratio(), Some("16:9"));
    assert_eq!(app.ratio_overlay().as_deref(), Some("16:9"));

    tokio::time::sleep(Duration::from_millis(1000)).await;
    app.dispatch(AppEvent::Swipe(SwipeDirection::Right))
        .await
        .expect("swipe back");
    assert_eq!(app.ratio_overlay().as_deref(), Some("4:3"));

    tokio::time::sleep(Duration::from_millis(1499)).await;
    assert_eq!(app.ratio_overlay().as_deref(), Some("4:3"));
    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(app.ratio_overlay(), None);
    assert_eq!(app.ratio(), Some("4:3"));
}

#[tokio::test(start_paused = true)]
async fn barcode_link_stays_while_code_is_in_view() {
    let rig = SimulatedRig::new();
    let mut app = started_app(&rig, CameraFacing::Back).await;
    let link = "https://example.com/menu";

    app.dispatch(AppEvent::BarcodeScanned(link.to_string()))
        .await
        .expect("scan");
    tokio::time::sleep(Duration::from_millis(700)).await;
    app.barcode_scanned(link.to_string());
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(app.barcode_link().as_deref(), Some(link));

    tokio::time::sleep(Duration::from_millis(301)).await;
    assert_eq!(app.barcode_link(), None);
}

#[tokio::test]
async fn tapping_banner_opens_only_web_links() {
    let rig = SimulatedRig::new();
    let mut app = started_app(&rig, CameraFacing::Back).await;

    assert_eq!(app.open_link().await.expect("nothing shown"), None);

    app.barcode_scanned("WIFI:S:home;T:WPA;P:secret;;".to_string());
    app.dispatch(AppEvent::OpenLink).await.expect("plain text");
    assert!(rig.links.opened().is_empty());

    app.barcode_scanned(" https://example.com/menu ".to_string());
    app.dispatch(AppEvent::OpenLink).await.expect("open");
    assert_eq!(rig.links.opened(), vec!["https://example.com/menu"]);
}

#[tokio::test]
async fn software_qr_path_feeds_the_banner() {
    let rig = SimulatedRig::new();
    let mut app = started_app(&rig, CameraFacing::Back).await;

    let code = QrCode::new(b"https://example.com/wifi").expect("encode");
    let frame = DynamicImage::ImageLuma8(code.render::<Luma<u8>>().min_dimensions(300, 300).build());

    let payload = app.scan_frame(&frame).expect("decode");
    assert!(payload.is_link());
    assert_eq!(
        app.barcode_link().as_deref(),
        Some("https://example.com/wifi")
    );
}

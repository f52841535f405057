//! Export pipeline over a live editor session.

use easel_core::notify::NoticeLevel;
use easel_core::{AttributePatch, Color, DesignRecord, Dimensions, EditorConfig, EditorSession, ObjectKind};
use easel_render::{EXPORT_FAILED, ExportFormat, ExportOptions, Exporter, FontBook, Rasterizer};

fn session_with_two_objects() -> EditorSession {
    let mut session = EditorSession::new(EditorConfig::default());
    session.open_design(&DesignRecord {
        id: "export".into(),
        title: "Summer Sale!".into(),
        dimensions: Dimensions::new(1080, 1080),
        ..DesignRecord::default()
    });
    session.add_object(
        ObjectKind::Rect,
        &AttributePatch {
            left: Some(100.0),
            top: Some(100.0),
            width: Some(200.0),
            height: Some(150.0),
            fill: Some(Color::INDIGO),
            ..AttributePatch::default()
        },
    );
    session.add_object(
        ObjectKind::Ellipse,
        &AttributePatch {
            left: Some(500.0),
            top: Some(400.0),
            angle: Some(30.0),
            fill: Some(Color::rgb(236, 72, 153)),
            ..AttributePatch::default()
        },
    );
    session.take_notices();
    session
}

fn exporter() -> Exporter {
    Exporter::new(Rasterizer::new().with_fonts(FontBook::empty()))
}

#[test]
fn test_png_export_is_deterministic_and_ignores_selection() {
    let mut session = session_with_two_objects();
    session.select_all();
    let selected_before = session.selection().ids().to_vec();
    let options = ExportOptions::new(ExportFormat::Png).with_multiplier(2.0);

    let mut exporter = exporter();
    let first = exporter.export_session(&mut session, &options).unwrap();
    let second = exporter.export_session(&mut session, &options).unwrap();

    assert_eq!((first.width, first.height), (2160, 2160));
    assert_eq!((second.width, second.height), (2160, 2160));
    assert_eq!(first.bytes, second.bytes);
    assert_eq!(first.filename, "summer_sale_.png");
    assert_eq!(first.mime_type, "image/png");
    assert_eq!(session.selection().ids(), selected_before.as_slice());

    session.clear_selection();
    let unselected = exporter.export_session(&mut session, &options).unwrap();
    assert_eq!(unselected.bytes, first.bytes);

    let decoded = image::load_from_memory(&first.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (2160, 2160));

    let notices = session.take_notices();
    assert_eq!(notices.len(), 3);
    assert!(notices.iter().all(|n| n.level == NoticeLevel::Success));
    assert_eq!(notices[0].message, "Exported as PNG successfully!");
}

#[test]
fn test_jpeg_export_uses_multiplier() {
    let mut session = session_with_two_objects();
    let options = ExportOptions::new(ExportFormat::Jpeg)
        .with_quality(0.8)
        .with_multiplier(1.0);

    let artifact = exporter().export_session(&mut session, &options).unwrap();
    assert_eq!((artifact.width, artifact.height), (1080, 1080));
    assert_eq!(artifact.filename, "summer_sale_.jpg");
    assert_eq!(&artifact.bytes[..2], &[0xFF, 0xD8]);
}

#[test]
fn test_pdf_export_is_one_page_at_canvas_size() {
    let mut session = session_with_two_objects();
    let options = ExportOptions::new(ExportFormat::Pdf).with_multiplier(4.0);

    let artifact = exporter().export_session(&mut session, &options).unwrap();
    assert_eq!(artifact.mime_type, "application/pdf");
    assert_eq!((artifact.width, artifact.height), (1080, 1080));

    let doc = lopdf::Document::load_mem(&artifact.bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[test]
fn test_failed_export_leaves_scene_and_notifies() {
    let mut session = EditorSession::new(EditorConfig::default());
    session.open_design(&DesignRecord {
        id: "broken".into(),
        dimensions: Dimensions::new(0, 0),
        ..DesignRecord::default()
    });
    session.add_object(ObjectKind::Rect, &AttributePatch::default());
    let before = session.snapshot();
    session.take_notices();

    assert!(exporter().export_session(&mut session, &ExportOptions::default()).is_none());
    assert_eq!(session.snapshot(), before);
    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].message, EXPORT_FAILED);
}

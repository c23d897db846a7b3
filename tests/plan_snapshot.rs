use image_translator_rust::{Detection, OverlayPlanner, OverlayStyle};

#[test]
fn overlay_plan_snapshot() {
    let planner = OverlayPlanner::new(OverlayStyle {
        text_color: "#000000".to_string(),
        fill_color: "#ffffff".to_string(),
    });
    let detections = [
        Detection::from_rect(10, 10, 100, 30, "สวัสดี", 0.93),
        Detection::from_rect(12, 60, 40, 10, "ครับ", 0.41),
    ];
    let texts = ["hello", "sir"];

    let instructions: Vec<_> = detections
        .iter()
        .zip(texts)
        .map(|(detection, text)| planner.plan(detection, text))
        .collect();

    let rendered = serde_json::to_string_pretty(&instructions).expect("serialize plan");
    insta::assert_snapshot!(rendered);
}

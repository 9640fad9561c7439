use super::*;
use serde_json::json;

fn compiled() -> Option<CompiledArtifact> {
    Some(CompiledArtifact(json!({ "program": [1, 2, 3] })))
}

fn assert_slots_aligned(line: &Line) {
    let n = line.frames().len();
    assert_eq!(line.enabled_frames().len(), n);
    assert_eq!(line.frame_names().len(), n);
    assert_eq!(line.frame_repetitions().len(), n);
}

fn scripted_frame(duration: u64, content: &str) -> Frame {
    Frame::new(duration).with_script(Script::new(content, "bali"))
}

#[test]
fn slot_vectors_stay_aligned_through_edits() {
    let mut line = Line::with_frames(0, [1, 2, 4]);
    assert_slots_aligned(&line);

    line.insert_frame(FrameId(1), scripted_frame(3, "a").with_name("intro"));
    assert_slots_aligned(&line);
    assert_eq!(line.frames(), &[1, 3, 2, 4]);
    assert_eq!(line.frame_names()[1].as_deref(), Some("intro"));

    line.remove_frame(FrameId(0)).expect("remove first");
    assert_slots_aligned(&line);

    line.insert_frame(FrameId(99), Frame::new(8));
    assert_slots_aligned(&line);
    assert_eq!(line.frames(), &[3, 2, 4, 8]);

    assert!(line.set_frame(FrameId(2), Frame::new(5)));
    assert!(!line.set_frame(FrameId(10), Frame::new(5)));
    assert_slots_aligned(&line);
}

#[test]
fn scripts_follow_their_slot_on_insert_and_remove() {
    let mut line = Line::new(0);
    line.push_frame(scripted_frame(1, "first"));
    line.push_frame(scripted_frame(1, "second"));

    line.insert_frame(FrameId(0), scripted_frame(2, "new"));
    let contents: Vec<_> = (0..3)
        .map(|i| line.script(FrameId(i)).expect("script").content.clone())
        .collect();
    assert_eq!(contents, ["new", "first", "second"]);

    let removed = line.remove_frame(FrameId(1)).expect("remove");
    assert_eq!(removed.script.content, "first");
    assert_eq!(line.script(FrameId(1)).expect("script").content, "second");
    assert_eq!(line.script(FrameId(1)).expect("script").index, 1);
}

#[test]
fn frame_round_trips_through_a_line() {
    let mut line = Line::new(4);
    let frame = Frame {
        duration: 3,
        enabled: false,
        name: Some("drop".into()),
        script: Script::new("d1 bd", "bali"),
        repetitions: 2,
    };
    line.push_frame(frame.clone());
    let mut expected = frame;
    expected.script.index = 0;
    assert_eq!(line.frame(FrameId(0)), Some(expected));
    assert_eq!(line.frame(FrameId(1)), None);
    assert_eq!(line.length(), 6);
}

#[test]
fn inbound_line_with_short_vectors_is_normalized() {
    let line: Line = serde_json::from_value(json!({
        "frames": [1, 1, 2],
        "enabled_frames": [false],
        "frame_names": [],
        "frame_repetitions": [1, 1, 1, 1, 1],
        "scripts": [{ "content": "x", "lang": "bali", "index": 7 }],
        "speed_factor": 2.0,
        "index": 1
    }))
    .expect("decode");

    assert_slots_aligned(&line);
    assert_eq!(line.enabled_frames(), &[false, true, true]);
    assert!(line.scripts().is_empty());
    assert_eq!(line.speed_factor, 2.0);
}

#[test]
fn add_line_hands_out_unique_indices() {
    let mut scene = Scene::new(16);
    scene.add_line();
    scene.push_line(Line::new(5)).expect("push");
    let added = scene.add_line().index();
    assert_eq!(added, LineId(6));

    let err = scene.push_line(Line::new(5)).expect_err("duplicate");
    assert_eq!(err, ProtocolError::DuplicateLineIndex(LineId(5)));

    scene.remove_line(LineId(0)).expect("remove");
    assert_eq!(scene.line_count(), 2);
    assert!(scene.line(LineId(0)).is_none());
}

#[test]
fn scene_with_duplicate_line_indices_fails_to_decode() {
    let raw = json!({
        "length": 8,
        "lines": [{ "index": 0 }, { "index": 0 }]
    });
    assert!(serde_json::from_value::<Scene>(raw).is_err());
}

#[test]
fn sanitizing_strips_compiled_and_is_idempotent() {
    let mut script = Script::new("d1 sn", "bali");
    script.compiled = compiled();
    let frame = Frame::new(1).with_script(script);

    let once = frame.clone().sanitized();
    assert!(!once.has_compiled_artifact());
    assert_eq!(once.clone().sanitized(), once);
    assert_eq!(once.script.content, "d1 sn");

    let mut line = Line::new(0);
    line.push_frame(frame.clone());
    line.push_frame(frame);
    assert!(line.has_compiled_artifact());
    let mut scene = Scene::new(4);
    scene.push_line(line).expect("push");

    let clean = scene.sanitized();
    assert!(!clean.has_compiled_artifact());
    assert_eq!(clean.clone().sanitized(), clean);

    let encoded = serde_json::to_value(&clean).expect("encode");
    assert!(!encoded.to_string().contains("compiled"));
}

#[test]
fn length_saturates_on_huge_engine_durations() {
    let line: Line = serde_json::from_value(json!({
        "frames": [u64::MAX, 1],
        "frame_repetitions": [2, 1],
        "index": 0
    }))
    .expect("decode");
    assert_eq!(line.length(), u64::MAX);
}

#[test]
fn add_line_after_topmost_index_reuses_a_free_one() {
    let mut scene: Scene = serde_json::from_value(json!({
        "length": 8,
        "lines": [{ "frames": [1], "index": usize::MAX }]
    }))
    .expect("decode");
    assert_eq!(scene.add_line().index(), LineId(0));
    assert_eq!(scene.add_line().index(), LineId(1));
    assert_eq!(scene.line_count(), 3);
}

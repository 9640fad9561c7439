use super::*;
use crate::scene::{CompiledArtifact, Script};
use serde_json::json;

fn frame_with_compiled() -> Frame {
    let mut script = Script::new("d1 hh", "bali");
    script.compiled = Some(CompiledArtifact(json!(["op"])));
    Frame::new(2).with_script(script)
}

#[test]
fn timed_command_always_carries_timing_on_the_wire() {
    let message = ClientMessage::RemoveFrame {
        line_id: LineId(0),
        frame_id: FrameId(2),
        timing: ActionTiming::AtNextBeat,
    };
    let encoded = serde_json::to_value(&message).expect("encode");
    assert_eq!(
        encoded,
        json!({
            "type": "remove_frame",
            "payload": {
                "line_id": 0,
                "frame_id": 2,
                "timing": { "type": "at_next_beat" }
            }
        })
    );
    let decoded: ClientMessage = serde_json::from_value(encoded).expect("decode");
    assert_eq!(decoded, message);
}

#[test]
fn timed_command_without_timing_fails_to_decode() {
    let raw = json!({ "type": "set_tempo", "payload": { "tempo": 120.0 } });
    assert!(serde_json::from_value::<ClientMessage>(raw).is_err());
}

#[test]
fn queries_carry_no_timing() {
    assert_eq!(ClientMessage::GetScene.timing(), None);
    assert_eq!(ClientMessage::GetSnapshot.timing(), None);
    assert_eq!(
        ClientMessage::Chat {
            message: "hi".into()
        }
        .timing(),
        None
    );
    assert_eq!(
        ClientMessage::SetTempo {
            tempo: 90.0,
            timing: ActionTiming::AtBeat(4.0),
        }
        .timing(),
        Some(ActionTiming::AtBeat(4.0))
    );
}

#[test]
fn sanitizing_clears_single_and_batch_frame_payloads() {
    let single = ClientMessage::AddFrame {
        line_id: LineId(1),
        frame_id: FrameId(0),
        frame: frame_with_compiled(),
        timing: ActionTiming::AtNextBeat,
    };
    assert_eq!(
        single.validate(),
        Err(ProtocolError::CompiledArtifactPresent {
            line_id: LineId(1),
            frame_id: Some(FrameId(0)),
        })
    );
    let single = single.sanitized();
    assert_eq!(single.validate(), Ok(()));
    assert_eq!(single.clone().sanitized(), single);

    let batch = ClientMessage::SetFrames {
        frames: vec![
            (LineId(0), FrameId(0), Frame::new(1)),
            (LineId(0), FrameId(1), frame_with_compiled()),
        ],
        timing: ActionTiming::Immediate,
    };
    assert!(batch.validate().is_err());
    let batch = batch.sanitized();
    assert_eq!(batch.validate(), Ok(()));
    assert!(!serde_json::to_string(&batch)
        .expect("encode")
        .contains("compiled"));
}

#[test]
fn sanitizing_clears_line_and_scene_payloads() {
    let mut line = Line::new(3);
    line.push_frame(frame_with_compiled());
    let message = ClientMessage::SetLines {
        lines: vec![(LineId(3), line.clone())],
        timing: ActionTiming::Immediate,
    };
    assert!(message.validate().is_err());
    assert_eq!(message.sanitized().validate(), Ok(()));

    let mut scene = Scene::new(8);
    scene.push_line(line).expect("push");
    let message = ClientMessage::SetScene {
        scene,
        timing: ActionTiming::Immediate,
    };
    assert!(message.validate().is_err());
    assert_eq!(message.sanitized().validate(), Ok(()));
}

#[test]
fn server_envelopes_decode() {
    let ack: ServerEnvelope =
        serde_json::from_value(json!({ "type": "ack", "payload": { "request_id": 7 } }))
            .expect("ack");
    assert_eq!(
        ack,
        ServerEnvelope::Ack {
            request_id: RequestId(7)
        }
    );

    let rejected: ServerEnvelope = serde_json::from_value(json!({
        "type": "rejected",
        "payload": {
            "request_id": 8,
            "error": { "code": "not_found", "message": "no line 9" }
        }
    }))
    .expect("rejected");
    assert!(matches!(
        rejected,
        ServerEnvelope::Rejected { request_id: RequestId(8), ref error } if error.code == crate::error::ErrorCode::NotFound
    ));

    let push: ServerEnvelope = serde_json::from_value(json!({
        "type": "push",
        "payload": {
            "type": "compilation_error_occurred",
            "payload": { "lang": "bali", "from": 3, "to": 9, "info": "unexpected token" }
        }
    }))
    .expect("push");
    match push {
        ServerEnvelope::Push(ServerMessage::CompilationErrorOccurred(details)) => {
            assert_eq!(details.from, 3);
            assert_eq!(details.to, 9);
            assert_eq!(details.line_id, None);
        }
        other => panic!("unexpected envelope: {other:?}"),
    }
}

#[test]
fn unschedulable_values_are_rejected() {
    let tempo = ClientMessage::SetTempo {
        tempo: 0.0,
        timing: ActionTiming::Immediate,
    };
    assert!(matches!(
        tempo.validate(),
        Err(ProtocolError::InvalidValue { field: "tempo", .. })
    ));

    let beat = ClientMessage::TransportStart {
        timing: ActionTiming::AtBeat(f64::NAN),
    };
    assert!(matches!(
        beat.validate(),
        Err(ProtocolError::InvalidValue { field: "beat", .. })
    ));

    let fine = ClientMessage::TransportStart {
        timing: ActionTiming::AtBeat(32.0),
    };
    assert_eq!(fine.validate(), Ok(()));
}

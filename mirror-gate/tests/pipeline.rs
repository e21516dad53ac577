//! End-to-end admission tests across gate, ledger, scope and cleanup.

use mirror_core::SharedRoots;
use mirror_gate::{
    ApplyError, Clock, DedupLedger, GateConfig, ManualClock, MessageGate, RejectKind, StateSink,
};
use mirror_types::{EditorAction, EditorState, Envelope, MessageId, PeerId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const NOW: u64 = 1_760_000_000_000;

#[derive(Default)]
struct RecordingSink {
    applied: Mutex<Vec<EditorState>>,
}

impl StateSink for RecordingSink {
    fn apply(&self, state: &EditorState) -> Result<(), ApplyError> {
        self.applied.lock().unwrap().push(state.clone());
        Ok(())
    }
}

fn raw(id: &str, sender: &str, file: &str, ts: u64) -> Vec<u8> {
    Envelope {
        message_id: MessageId::from(id),
        sender_identifier: PeerId::from(sender),
        payload: EditorState::now(EditorAction::Navigate, file, true).at(ts),
    }
    .to_json()
    .unwrap()
    .into_bytes()
}

#[test]
fn end_to_end_admit_then_duplicate() {
    let sink = Arc::new(RecordingSink::default());
    let gate = MessageGate::new(
        &GateConfig::default(),
        Arc::new(PeerId::from("peerB")),
        Arc::new(vec!["/ws/a".to_string()]),
        sink.clone(),
    )
    .with_clock(Arc::new(ManualClock::new(NOW)));

    let message = raw("m1", "peerA", "/ws/a/f.ts", NOW);

    let first = gate.handle(&message);
    assert!(first.is_admitted());

    let second = gate.handle(&message);
    assert_eq!(second.reject_kind(), Some(RejectKind::Duplicate));

    let applied = sink.applied.lock().unwrap();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].file_path, "/ws/a/f.ts");
}

#[test]
fn wire_message_from_another_editor_is_admitted() {
    let gate = MessageGate::new(
        &GateConfig::default(),
        Arc::new(PeerId::from("intellij-1")),
        Arc::new(vec![r"C:\Users\dev\proj".to_string()]),
        Arc::new(RecordingSink::default()),
    )
    .with_clock(Arc::new(ManualClock::new(NOW)));

    let json = format!(
        r#"{{
            "messageId": "a6b2",
            "senderIdentifier": "vscode-1",
            "state": {{
                "action": "select",
                "filePath": "c:/Users/dev/proj/src/App.tsx",
                "isActive": true,
                "timestamp": {},
                "cursor": {{ "line": 10, "column": 2 }},
                "selection": {{
                    "start": {{ "line": 10, "column": 2 }},
                    "end": {{ "line": 12, "column": 0 }}
                }}
            }}
        }}"#,
        NOW - 120
    );

    let decision = gate.handle(json.as_bytes());
    assert!(decision.is_admitted(), "got {:?}", decision);
}

#[test]
fn roots_added_at_runtime_take_effect() {
    let roots = Arc::new(SharedRoots::new(vec!["/ws/a".to_string()]));
    let gate = MessageGate::new(
        &GateConfig::default(),
        Arc::new(PeerId::from("peerB")),
        roots.clone(),
        Arc::new(RecordingSink::default()),
    )
    .with_clock(Arc::new(ManualClock::new(NOW)));

    let before = gate.handle(&raw("m1", "peerA", "/ws/b/x.ts", NOW));
    assert_eq!(before.reject_kind(), Some(RejectKind::OutOfScope));

    roots.add("/ws/b");
    let after = gate.handle(&raw("m2", "peerA", "/ws/b/x.ts", NOW));
    assert!(after.is_admitted());
}

#[test]
fn concurrent_deliveries_admit_each_id_once() {
    struct CountingSink(AtomicUsize);

    impl StateSink for CountingSink {
        fn apply(&self, _state: &EditorState) -> Result<(), ApplyError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let sink = Arc::new(CountingSink(AtomicUsize::new(0)));
    let gate = Arc::new(
        MessageGate::new(
            &GateConfig::default(),
            Arc::new(PeerId::from("peerB")),
            Arc::new(vec!["/ws".to_string()]),
            sink.clone(),
        )
        .with_clock(Arc::new(ManualClock::new(NOW))),
    );

    // 8 threads each deliver the same 50 messages
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let gate = Arc::clone(&gate);
            std::thread::spawn(move || {
                for i in 0..50 {
                    gate.handle(&raw(&format!("m{}", i), "peerA", "/ws/f.ts", NOW));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(sink.0.load(Ordering::SeqCst), 50);
    let snap = gate.metrics().snapshot();
    assert_eq!(snap.admitted, 50);
    assert_eq!(snap.duplicates, 350);
}

#[test]
fn ledger_stays_bounded_under_load() {
    let ledger = Arc::new(DedupLedger::default());
    let gate = MessageGate::new(
        &GateConfig::default(),
        Arc::new(PeerId::from("peerB")),
        Arc::new(vec!["/ws".to_string()]),
        Arc::new(RecordingSink::default()),
    )
    .with_ledger(Arc::clone(&ledger))
    .with_clock(Arc::new(ManualClock::new(NOW)));

    for i in 0..2500 {
        gate.handle(&raw(&format!("m{}", i), "peerA", "/ws/f.ts", NOW));
        assert!(ledger.len() <= 1000);
    }
    assert_eq!(ledger.len(), 1000);
}

#[tokio::test(start_paused = true)]
async fn expired_ids_can_be_admitted_again_after_cleanup() {
    let clock = Arc::new(ManualClock::new(NOW));
    let gate = MessageGate::new(
        &GateConfig::default(),
        Arc::new(PeerId::from("peerB")),
        Arc::new(vec!["/ws".to_string()]),
        Arc::new(RecordingSink::default()),
    )
    .with_clock(clock.clone());
    let cleanup = gate.start_cleanup(GateConfig::default().cleanup);

    assert!(gate.handle(&raw("m1", "peerA", "/ws/f.ts", NOW)).is_admitted());

    // Six minutes later on both clocks
    clock.advance(360_000);
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(!gate.ledger().seen(&MessageId::from("m1")));

    let resent = raw("m1", "peerA", "/ws/f.ts", clock.now_millis());
    assert!(gate.handle(&resent).is_admitted());

    cleanup.shutdown().await;
}

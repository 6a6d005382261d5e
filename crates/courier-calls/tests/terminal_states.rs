// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Once a call reaches a terminal status, no operation changes it.

use std::sync::Arc;

use courier_calls::CallManager;
use courier_config::model::CallsConfig;
use courier_core::{Call, CallStatus, CallType};
use courier_signal::SignalingRelay;
use courier_test_utils::{MemoryCallStore, RecordingTransport};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Answer,
    Decline,
    End,
    Timeout,
    Fail,
}

fn any_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Answer),
        Just(Op::Decline),
        Just(Op::End),
        Just(Op::Timeout),
        Just(Op::Fail),
    ]
}

fn expected_after(status: CallStatus, op: Op) -> CallStatus {
    use CallStatus::*;
    match (status, op) {
        (Ringing, Op::Answer) => Active,
        (Ringing, Op::Decline) => Declined,
        (Ringing | Active, Op::End) => Ended,
        (Ringing, Op::Timeout) => Missed,
        (Ringing | Active, Op::Fail) => Failed,
        (unchanged, _) => unchanged,
    }
}

proptest! {
    #[test]
    fn terminal_statuses_are_final(ops in prop::collection::vec(any_op(), 1..12)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let store = Arc::new(MemoryCallStore::new());
            store.insert_call(Call::ringing("c1", "conv1", "alice", CallType::Voice)).await;
            store.add_participants("c1", &["alice", "bob"]).await;
            let manager = CallManager::new(
                store.clone(),
                SignalingRelay::new(Arc::new(RecordingTransport::new())),
                CallsConfig::default(),
            );

            let mut status = CallStatus::Ringing;
            for op in ops {
                let transition = match op {
                    Op::Answer => manager.answer("c1").await,
                    Op::Decline => manager.decline("c1").await,
                    Op::End => manager.end("c1").await,
                    Op::Timeout => manager.timeout("c1").await,
                    Op::Fail => manager.fail("c1", "boom").await,
                }
                .unwrap();

                let next = expected_after(status, op);
                assert_eq!(transition.is_applied(), next != status, "{op:?} from {status}");
                let stored = store.call("c1").await.unwrap().status;
                assert_eq!(stored, next);
                if status.is_terminal() {
                    assert_eq!(stored, status);
                }
                status = stored;
            }
        });
    }
}

//! Integration tests across the whole engine.
//!
//! These tests exercise the paths a peer actually takes: table text -> tree ->
//! encode -> frame -> TCP -> session -> current tree -> decode, and check that
//! output matches input at each end.

use huffcoder_core::{
    code_text::wrap_code,
    framing::{encode_message, Message},
    network::{connect, listen, TransportConfig},
    state::{Delivery, Session, TreeHandle},
    table, CodeTree, WeightedAlphabet,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

fn alphabet(entries: &[(char, f64)]) -> WeightedAlphabet {
    WeightedAlphabet::from_entries(entries.iter().copied()).expect("valid alphabet")
}

/// Table text in, codes out, text back.
#[test]
fn test_table_to_codes_round_trip() {
    let parsed = table::parse("a\t1\nb\t1\nc\t2\nd\t2\n").expect("table parse failed");
    let tree = CodeTree::build(&parsed).expect("non-empty alphabet");

    let code = tree.encode("abcdcba").expect("encode failed");
    assert_eq!(code, "00011011100100");

    // Compact formatting must not change the decode
    let wrapped = wrap_code(&code, 4);
    assert_eq!(wrapped, "0001\n1011\n1001\n00");
    assert_eq!(tree.decode(&wrapped).expect("decode failed"), "abcdcba");
}

/// Alphabet counted from a text always covers that text.
#[test]
fn test_alphabet_from_text_covers_text() {
    let text = "the quick brown fox jumps over the lazy dog\n\tand again\n";
    let tree = CodeTree::build(&WeightedAlphabet::from_text(text)).expect("non-empty alphabet");

    let code = tree.encode(text).expect("encode failed");
    assert_eq!(tree.decode(&code).expect("decode failed"), text);
}

/// Export form carries codes that match the rebuilt tree.
#[test]
fn test_export_import_rebuilds_same_tree() {
    let source = alphabet(&[('e', 12.0), ('t', 9.0), ('a', 8.0), ('o', 7.5), (' ', 18.0), ('z', 0.1)]);
    let tree = CodeTree::build(&source).unwrap();

    let exported = table::serialize_with_codes(&tree);
    let imported = table::parse_with_codes(&exported).unwrap();
    let rebuilt = CodeTree::build(&imported).unwrap();

    assert_eq!(rebuilt.fingerprint(), tree.fingerprint());
    for line in exported.lines() {
        let columns: Vec<&str> = line.split('\t').collect();
        let symbol = columns[0].chars().next().unwrap();
        assert_eq!(rebuilt.code_of(symbol), Some(columns[2]));
    }
}

/// Seeded random alphabets and texts: round trip always holds.
#[test]
fn test_random_alphabets_round_trip() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);

    for _ in 0..200 {
        let m = rng.gen_range(2..40);
        let entries: Vec<(char, f64)> = (0..m)
            .map(|i| {
                let symbol = char::from_u32(0x21 + i as u32).unwrap();
                (symbol, rng.gen_range(0..50) as f64)
            })
            .collect();
        let tree = CodeTree::build(&alphabet(&entries)).unwrap();
        assert!(tree.is_well_formed());

        let text: String = (0..rng.gen_range(0..100))
            .map(|_| entries[rng.gen_range(0..entries.len())].0)
            .collect();
        let code = tree.encode(&text).unwrap();
        assert_eq!(tree.decode(&code).unwrap(), text);
    }
}

/// Readers holding a snapshot are never disturbed by a swap.
#[test]
fn test_concurrent_readers_see_whole_trees() {
    let first = CodeTree::build(&alphabet(&[('a', 1.0), ('b', 1.0), ('c', 2.0)])).unwrap();
    let handle = TreeHandle::with_tree(first);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let handle = handle.clone();
            scope.spawn(move || {
                for _ in 0..500 {
                    let tree: Arc<CodeTree> = handle.current().expect("tree present");
                    assert!(tree.is_well_formed());
                    let text: String = tree.alphabet().symbols().collect();
                    let code = tree.encode(&text).unwrap();
                    assert_eq!(tree.decode(&code).unwrap(), text);
                }
            });
        }

        let writer = handle.clone();
        scope.spawn(move || {
            for i in 0..200 {
                let entries: Vec<(char, f64)> = (0..(2 + i % 10))
                    .map(|k| (char::from(b'a' + k as u8), (k + i) as f64))
                    .collect();
                writer.replace(CodeTree::build(&alphabet(&entries)).unwrap());
            }
        });
    });

    assert!(handle.current().is_some());
}

/// Full peer flow over loopback TCP.
#[tokio::test]
async fn test_peer_session_over_tcp() {
    let config = TransportConfig::default();
    let (server_events_tx, server_events_rx) = config.event_channel();
    let (deliveries_tx, mut deliveries) = mpsc::channel(16);

    let session = Session::new(TreeHandle::new());
    let receiver_tree = session.tree();
    let session_task = tokio::spawn(session.run(server_events_rx, deliveries_tx));

    let listener = listen("127.0.0.1:0", config, server_events_tx).await.unwrap();
    let (client_events_tx, _client_events_rx) = config.event_channel();
    let mut link = connect(listener.local_addr(), config, client_events_tx).await.unwrap();

    assert!(matches!(deliveries.recv().await, Some(Delivery::Peer(_))));

    // 't': receiver adopts the sender's tree
    let sender_tree = CodeTree::build(&alphabet(&[('h', 1.0), ('i', 1.0), ('!', 2.0)])).unwrap();
    assert!(link.send(&Message::tree_update(&sender_tree)).await);
    match deliveries.recv().await {
        Some(Delivery::TreeReplaced { symbols, fingerprint, .. }) => {
            assert_eq!(symbols, 3);
            assert_eq!(fingerprint, sender_tree.fingerprint());
        }
        other => panic!("expected tree replacement, got {other:?}"),
    }
    assert_eq!(receiver_tree.current().unwrap().fingerprint(), sender_tree.fingerprint());

    // Malformed 't' from a raw socket: rejected, tree untouched
    let mut raw = TcpStream::connect(listener.local_addr()).await.unwrap();
    assert!(matches!(deliveries.recv().await, Some(Delivery::Peer(_))));
    raw.write_all(b"th\tnot-a-number\n").await.unwrap();
    assert!(matches!(deliveries.recv().await, Some(Delivery::Rejected { .. })));
    assert_eq!(receiver_tree.current().unwrap().fingerprint(), sender_tree.fingerprint());
    drop(raw);
    assert!(matches!(deliveries.recv().await, Some(Delivery::Closed { .. })));

    // 'c': delivered as-is; the consumer decides to decode it
    let code = sender_tree.encode("hi!").unwrap();
    assert!(link.send(&Message::ciphertext(code.clone()).unwrap()).await);
    match deliveries.recv().await {
        Some(Delivery::Ciphertext { code: received, .. }) => {
            assert_eq!(received, code);
            let tree = receiver_tree.current().unwrap();
            assert_eq!(tree.decode(&received).unwrap(), "hi!");
        }
        other => panic!("expected ciphertext, got {other:?}"),
    }

    link.close().await;
    assert!(matches!(deliveries.recv().await, Some(Delivery::Closed { .. })));

    listener.shutdown();
    drop(deliveries);
    let metrics = session_task.await.unwrap();
    assert_eq!(metrics.trees_applied, 1);
    assert_eq!(metrics.trees_rejected, 1);
    assert_eq!(metrics.ciphertexts_received, 1);
    assert_eq!(metrics.connections_opened, 2);
    assert_eq!(metrics.connections_closed, 2);
}

/// The frame bytes for a tree update are exactly 't' + table text.
#[test]
fn test_tree_frame_is_tag_plus_table() {
    let source = alphabet(&[('x', 2.0), ('\n', 1.0)]);
    let frame = encode_message(&Message::TreeUpdate(source.clone()));
    let mut expected = vec![b't'];
    expected.extend_from_slice(table::serialize(&source).as_bytes());
    assert_eq!(frame, expected);
}

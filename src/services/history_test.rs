use super::*;

fn draw(seq: f64) -> CanvasOp {
    CanvasOp::Draw {
        x: seq,
        y: seq,
        color: "#000".into(),
        size: 2.0,
        platform: "nodejs".into(),
        client_id: 1,
    }
}

fn x_of(op: &CanvasOp) -> f64 {
    match op {
        CanvasOp::Draw { x, .. } => *x,
        CanvasOp::Clear { .. } => panic!("history should never retain a clear"),
    }
}

#[test]
fn append_preserves_order() {
    let mut log = HistoryLog::new();
    for seq in 0..5 {
        log.append(draw(f64::from(seq)));
    }

    let snapshot = log.snapshot();
    assert_eq!(snapshot.len(), 5);
    for (seq, op) in snapshot.iter().enumerate() {
        assert!((x_of(op) - seq as f64).abs() < f64::EPSILON);
    }
}

#[test]
fn length_never_exceeds_cap() {
    let mut log = HistoryLog::new();
    for seq in 0..(MAX_HISTORY + 250) {
        log.append(draw(seq as f64));
        assert!(log.len() <= MAX_HISTORY);
    }
    assert_eq!(log.len(), MAX_HISTORY);
}

#[test]
fn eviction_is_fifo() {
    let mut log = HistoryLog::new();
    for seq in 0..(MAX_HISTORY + 3) {
        log.append(draw(seq as f64));
    }

    let snapshot = log.snapshot();
    // The three oldest entries (0, 1, 2) were evicted.
    assert!((x_of(&snapshot[0]) - 3.0).abs() < f64::EPSILON);
    assert!(
        (x_of(snapshot.last().expect("log is non-empty")) - (MAX_HISTORY + 2) as f64).abs()
            < f64::EPSILON
    );
}

#[test]
fn clear_empties_the_log() {
    let mut log = HistoryLog::new();
    for seq in 0..10 {
        log.append(draw(f64::from(seq)));
    }

    log.clear();
    assert!(log.is_empty());
    assert!(log.snapshot().is_empty());

    // Appending after a clear starts a fresh sequence.
    log.append(draw(99.0));
    assert_eq!(log.len(), 1);
}

#[test]
fn snapshot_is_detached_from_the_log() {
    let mut log = HistoryLog::new();
    log.append(draw(1.0));

    let snapshot = log.snapshot();
    log.clear();

    assert_eq!(snapshot.len(), 1);
    assert!(log.is_empty());
}

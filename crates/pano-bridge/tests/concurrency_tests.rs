//! Configuration lifecycle under concurrent stitching

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pano_bridge::{ConfigState, StitchContext, StitchScript, StubEngine};

#[test]
fn test_concurrent_stitches_stay_balanced() {
    let engine = Arc::new(StubEngine::with_script(StitchScript::succeed(
        8,
        4,
        3,
        vec![42; 96],
    )));
    let ctx = Arc::new(StitchContext::new(engine.clone()));
    assert!(ctx.init_config(Some("config.cfg")));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ctx = ctx.clone();
            thread::spawn(move || {
                let paths = [format!("{i}/a.jpg"), format!("{i}/b.jpg")];
                ctx.stitch(&paths, None).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let result = handle.join().unwrap();
        assert_eq!(result.data, vec![42; 96]);
    }

    assert_eq!(engine.stitch_calls(), 8);
    assert!(engine.is_balanced());
}

#[test]
fn test_reinit_waits_for_in_flight_stitch() {
    let engine = Arc::new(StubEngine::new());
    engine.set_delay(Some(Duration::from_millis(100)));
    let ctx = Arc::new(StitchContext::new(engine.clone()));
    assert!(ctx.init_config(Some("first.cfg")));

    let stitcher = {
        let ctx = ctx.clone();
        thread::spawn(move || ctx.stitch(&["a.jpg", "b.jpg"], None))
    };

    // Let the stitch get into the engine before re-initialising.
    while engine.stitch_calls() == 0 {
        thread::sleep(Duration::from_millis(1));
    }
    assert!(ctx.init_config(Some("second.cfg")));

    stitcher.join().unwrap().unwrap();

    assert_eq!(engine.init_overlaps(), 0);
    assert!(matches!(
        ctx.config_state(),
        ConfigState::Ready { generation: 2, .. }
    ));
    assert!(engine.is_balanced());
}

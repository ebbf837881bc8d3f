use crate::common::TestHarness;
use aodv_core::*;

fn run(seed: u64) -> TestHarness {
    let mut h = TestHarness::dense(seed);
    h.route_to_farthest();
    assert!(h.run_until_complete());
    h.sim.trigger_route_error().unwrap();
    assert!(h.run_until_complete());
    h
}

#[test]
fn test_determinism_across_runs() {
    let seed = 12345;
    let h1 = run(seed);
    let h2 = run(seed);

    assert_eq!(h1.sim.topology_snapshot(), h2.sim.topology_snapshot());
    assert_eq!(h1.sim.status(), h2.sim.status(), "Session status mismatch");
    assert_eq!(h1.sim.time, h2.sim.time, "Completion time mismatch");
    assert!(h1.sim.status().delivered);
    assert!(h1.seen.len() > h1.sim.config.max_active_packets);

    let e1 = h1.recorded.borrow();
    let e2 = h2.recorded.borrow();
    assert_eq!(e1.len(), e2.len(), "Event count mismatch");
    for (i, (a, b)) in e1.iter().zip(e2.iter()).enumerate() {
        assert_eq!(a, b, "Event mismatch at index {}", i);
    }
}

#[test]
fn test_determinism_with_different_seeds() {
    let h1 = TestHarness::new_with_seed(100);
    let h2 = TestHarness::new_with_seed(200);

    let p1: Vec<Position> = h1.sim.topology.nodes().iter().map(|n| n.position).collect();
    let p2: Vec<Position> = h2.sim.topology.nodes().iter().map(|n| n.position).collect();
    assert_ne!(p1, p2, "Different seeds should produce different layouts");
}

#[test]
fn test_route_error_pick_is_seeded() {
    let links = [(0, 1), (1, 2), (2, 3), (3, 4), (4, 5)];
    let pick = |seed: u64| {
        let mut h = TestHarness::from_links_with(SimConfig::default().with_seed(seed), 6, &links);
        h.route(0, 5);
        assert!(h.run_until_complete());
        h.sim.trigger_route_error().unwrap();
        let kind = h
            .sim
            .scheduler
            .iter()
            .map(|(p, _)| p.kind)
            .find(|k| matches!(k, PacketKind::RouteError { .. }));
        kind
    };
    assert_eq!(pick(9), pick(9));
}

use crate::common::TestHarness;
use aodv_core::*;

// Best path 0-3-5-7, plus a dead-end branch 0-1-2 so node 0 has two neighbors.
const LINKS: [(NodeId, NodeId); 5] = [(0, 3), (3, 5), (5, 7), (0, 1), (1, 2)];

fn delivered(seed: u64, reset_best: bool) -> TestHarness {
    let mut config = SimConfig::default().with_seed(seed);
    config.reset_best_on_rerequest = reset_best;
    let mut h = TestHarness::from_links_with(config, 8, &LINKS);
    h.route(0, 7);
    assert!(h.run_until_complete());
    assert_eq!(h.sim.status().best_path, vec![0, 3, 5, 7]);
    h
}

fn route_errors(sim: &Simulation) -> Vec<InFlightPacket> {
    sim.scheduler
        .iter()
        .map(|(p, _)| p)
        .filter(|p| matches!(p.kind, PacketKind::RouteError { .. }))
        .cloned()
        .collect()
}

// The error packet names the broken link in its kind, but it does not travel
// that two-node link. It walks the reversed upstream prefix of the best path,
// so it always ends at the source that has to re-flood.
#[test]
fn test_break_point_is_interior_link() {
    for seed in 0..16 {
        let mut h = delivered(seed, false);
        h.sim.trigger_route_error().unwrap();

        let errors = route_errors(&h.sim);
        assert_eq!(errors.len(), 1);
        let PacketKind::RouteError { link } = errors[0].kind else {
            unreachable!()
        };
        match link {
            (0, 3) => assert_eq!(errors[0].path, vec![3, 0]),
            (3, 5) => assert_eq!(errors[0].path, vec![5, 3, 0]),
            other => panic!("seed {}: unexpected broken link {:?}", seed, other),
        }
        assert_eq!(h.sim.status().phase, Phase::Repairing);
        assert!(h.sim.status().running);
    }
}

#[test]
fn test_route_error_restarts_discovery_at_source() {
    let mut h = delivered(3, false);
    let old_id = h.sim.status().discovery_id;

    h.sim.trigger_route_error().unwrap();
    let reflooded = h.run_until(60.0, |sim| sim.status().discovery_id != old_id);
    assert!(reflooded, "route error should reach node 0 and restart the flood");

    assert_eq!(h.sim.status().discovery_id, old_id + 1);
    assert_eq!(h.sim.status().phase, Phase::Flooding);
    assert_eq!(h.events_of(EventKind::Rediscovery).len(), 1);

    // Fresh seeds toward every neighbor of 0, and nothing else yet.
    let new_id = h.sim.status().discovery_id;
    let mut seeds: Vec<Vec<NodeId>> = h
        .sim
        .scheduler
        .iter()
        .map(|(p, _)| p)
        .filter(|p| p.kind == PacketKind::RouteRequest && p.discovery_id == new_id)
        .map(|p| p.path.clone())
        .collect();
    seeds.sort();
    assert_eq!(seeds, vec![vec![0, 1], vec![0, 3]]);
}

#[test]
fn test_stale_best_path_is_reused_after_rediscovery() {
    let mut h = delivered(5, false);
    let replies_before = h.paths_of(PacketKind::RouteReply).len();

    h.sim.trigger_route_error().unwrap();
    assert!(h.run_until_complete());

    let status = h.sim.status();
    assert!(status.delivered);
    assert_eq!(status.best_path, vec![0, 3, 5, 7]);
    assert_eq!(status.best_hop_count, Some(3));
    // The same 3-hop path is not "better", so no new reply is sent.
    assert_eq!(h.paths_of(PacketKind::RouteReply).len(), replies_before);
    assert_eq!(status.discovered_paths, 2);
    assert_eq!(h.paths_of(PacketKind::Data).len(), 2);
}

#[test]
fn test_reset_best_on_rerequest_finds_path_again() {
    let mut h = delivered(5, true);
    let better_before = h.events_of(EventKind::BetterPathFound).len();

    h.sim.trigger_route_error().unwrap();
    assert!(h.run_until_complete());

    let status = h.sim.status();
    assert!(status.delivered);
    assert_eq!(status.best_path, vec![0, 3, 5, 7]);
    assert_eq!(status.discovered_paths, 1, "history cleared before the new flood");
    assert_eq!(h.events_of(EventKind::BetterPathFound).len(), better_before + 1);
    assert_eq!(h.paths_of(PacketKind::RouteReply).len(), 2);
}

#[test]
fn test_route_error_needs_three_node_path() {
    let mut h = TestHarness::from_links(3, &[(0, 1), (1, 2)]);
    assert_eq!(
        h.sim.trigger_route_error(),
        Err(CommandError::NoEstablishedRoute)
    );
    assert_eq!(h.events_of(EventKind::CommandRejected).len(), 1);

    // Direct route 0-1 is only two nodes long.
    h.route(0, 1);
    assert!(h.run_until_complete());
    assert_eq!(h.sim.status().best_path, vec![0, 1]);
    assert_eq!(
        h.sim.trigger_route_error(),
        Err(CommandError::NoEstablishedRoute)
    );
    assert!(h.sim.scheduler.is_idle());
    assert!(h.sim.status().complete, "rejected command leaves the session alone");
}

// Short route 0-1-2-9 and a long dead-end chain 0-3-4-5-6-7-8. The chain is
// still being flooded when DATA reaches 9.
const CHAIN: [(NodeId, NodeId); 9] = [
    (0, 1), (1, 2), (2, 9),
    (0, 3), (3, 4), (4, 5), (5, 6), (6, 7), (7, 8),
];

#[test]
fn test_requests_from_old_flood_are_ignored() {
    let mut h = TestHarness::from_links(10, &CHAIN);
    h.route(0, 9);
    assert!(h.run_until_complete());
    let old_id = h.sim.status().discovery_id;
    let leftover: Vec<InFlightPacket> = h
        .sim
        .scheduler
        .iter()
        .map(|(p, _)| p.clone())
        .filter(|p| p.kind == PacketKind::RouteRequest)
        .collect();
    assert!(!leftover.is_empty(), "chain requests should outlive the delivery");
    assert!(leftover.iter().all(|p| p.discovery_id == old_id));

    h.sim.trigger_route_error().unwrap();
    assert!(h.run_until_complete());
    let status = h.sim.status();
    assert_eq!(status.discovery_id, old_id + 1);
    assert!(status.delivered);
    assert_eq!(status.discovered_paths, 2, "one arrival per flood");

    // The new flood still walks the whole chain: no stale packet claimed
    // node 8 under the new discovery id.
    let far_end: Vec<NodeId> = vec![0, 3, 4, 5, 6, 7, 8];
    assert!(h
        .seen
        .iter()
        .any(|p| p.discovery_id == status.discovery_id && p.path == far_end));
    assert!(h.sim.topology.node(8).unwrap().has_forwarded(0, status.discovery_id));
    assert_eq!(
        h.sim
            .router
            .session
            .request_paths
            .iter()
            .filter(|p| **p == far_end)
            .count(),
        1,
        "the old flood's copy was dropped at node 7"
    );
}

#[test]
fn test_five_routes_satisfy_discovery() {
    // Best path 0-3-5-7 has three hops, so only the route count can satisfy.
    // Each flood reaches 7 once; repairs keep the earlier routes.
    let links = [(0, 3), (3, 5), (5, 7), (0, 1), (1, 2), (7, 8), (8, 9)];
    let mut h = TestHarness::from_links_with(SimConfig::default().with_seed(2), 10, &links);
    h.route(0, 7);
    assert!(h.run_until_complete());

    for round in 2..=5 {
        assert!(!h.sim.status().satisfied, "satisfied before route {}", round);
        h.sim.trigger_route_error().unwrap();
        assert!(h.run_until_complete(), "repair {} did not finish", round);
        assert_eq!(h.sim.status().discovered_paths, round);
    }

    let status = h.sim.status();
    assert!(status.satisfied);
    assert!(status.delivered);
    assert_eq!(status.best_hop_count, Some(3));
    assert_eq!(h.events_of(EventKind::DiscoverySatisfied { paths: 5 }).len(), 1);
    assert_eq!(h.events_of(EventKind::DiscoverySatisfied { paths: 4 }).len(), 0);

    // Earlier floods went past 7; the satisfied one stops there.
    let last = status.discovery_id;
    let past_destination = |id: u64| {
        h.seen
            .iter()
            .filter(|p| p.kind == PacketKind::RouteRequest && p.discovery_id == id)
            .any(|p| p.path.contains(&8))
    };
    assert!(past_destination(last - 1));
    assert!(!past_destination(last));
}

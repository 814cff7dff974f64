// Port Allocation Contract Tests
//
// These tests verify INVARIANTS that MUST NEVER BREAK regardless of implementation.
// nginx refuses to start when two server blocks listen on the same port, and the
// streamer trusts the descriptor's node list blindly, so every property below is
// visible to operators the moment it regresses.

use std::cell::Cell;
use std::collections::BTreeSet;

use fastocloud_env::port::{AllocationSession, PortAllocator, PortProbe, ScanRange};
use fastocloud_env::EnvError;

/// Host where a fixed set of ports is already listened on
struct BoundPorts {
    bound: BTreeSet<u16>,
    probes: Cell<usize>,
}

impl BoundPorts {
    fn new(bound: impl IntoIterator<Item = u16>) -> Self {
        Self {
            bound: bound.into_iter().collect(),
            probes: Cell::new(0),
        }
    }
}

impl PortProbe for BoundPorts {
    fn is_port_free(&self, _host: &str, port: u16) -> bool {
        self.probes.set(self.probes.get() + 1);
        !self.bound.contains(&port)
    }
}

fn allocator(bound: impl IntoIterator<Item = u16>, range: ScanRange) -> PortAllocator<BoundPorts> {
    PortAllocator::new("127.0.0.1", range, BoundPorts::new(bound))
}

/// WHY: Every listener port in a run is unique
/// REASON: nginx fails to load when two site files listen on the same port
/// BREAKS: The whole CDN; nginx -t rejects the generated configs
/// SACRIFICES: If this fails, groups are sharing ports
#[test]
fn assignments_are_disjoint_across_groups() {
    let alloc = allocator([1, 2, 7, 9, 10], ScanRange::new(1, 200).unwrap());
    let mut session = AllocationSession::new();

    let counts = [("hls", 17), ("vods", 5), ("cods", 31)];
    let mut union = BTreeSet::new();
    let mut total = 0;
    for (group, n) in counts {
        let assignment = alloc.allocate(&mut session, group, n).unwrap();
        assert_eq!(assignment.len(), n);
        total += n;
        union.extend(assignment.ports.iter().copied());
    }

    assert_eq!(union.len(), total, "duplicate ports across groups");
    assert_eq!(&union, session.claimed());
    assert!(union.iter().all(|p| ![1, 2, 7, 9, 10].contains(p)));
}

/// WHY: Allocation is ascending from the start of the scan range
/// REASON: Re-running on an idle host must produce the same configs
/// BREAKS: Reproducible deployments; diffs between runs become noise
#[test]
fn idle_host_allocates_lowest_ports() {
    let alloc = allocator([], ScanRange::default());
    let mut session = AllocationSession::new();

    let assignment = alloc.allocate(&mut session, "hls", 5).unwrap();
    assert_eq!(assignment.ports, vec![1, 2, 3, 4, 5]);

    let zero_based = allocator([], ScanRange::new(0, 100).unwrap());
    let mut session = AllocationSession::new();
    assert_eq!(
        zero_based.allocate(&mut session, "hls", 3).unwrap().ports,
        vec![0, 1, 2]
    );
}

/// WHY: Same inputs, same ports
/// REASON: The allocator holds no hidden state outside the session
/// BREAKS: Deterministic output across runs
#[test]
fn allocation_is_deterministic() {
    let bound = [3u16, 4, 8];
    let run = || {
        let alloc = allocator(bound, ScanRange::new(1, 100).unwrap());
        let mut session = AllocationSession::new();
        let hls = alloc.allocate(&mut session, "hls", 4).unwrap();
        let vods = alloc.allocate(&mut session, "vods", 2).unwrap();
        (hls.ports, vods.ports)
    };
    assert_eq!(run(), run());
    assert_eq!(run(), (vec![1, 2, 5, 6], vec![7, 9]));
}

/// WHY: Exhaustion fails the call and claims nothing
/// REASON: A short list would silently under-provision the CDN
/// BREAKS: Atomicity; a leaked partial claim would starve later groups
/// SACRIFICES: If this fails, a failed group still consumed ports
#[test]
fn exhaustion_is_atomic() {
    let alloc = allocator([12, 13], ScanRange::new(10, 15).unwrap());
    let mut session = AllocationSession::new();
    alloc.allocate(&mut session, "hls", 2).unwrap();
    let before = session.claimed().clone();

    match alloc.allocate(&mut session, "vods", 5) {
        Err(EnvError::PortExhausted { group, requested, found }) => {
            assert_eq!(group, "vods");
            assert_eq!(requested, 5);
            assert_eq!(found, 2);
        }
        other => panic!("Expected PortExhausted, got {:?}", other),
    }

    assert_eq!(session.claimed(), &before);
    assert!(session.assignment("vods").is_none());

    // The remaining ports are still available to a smaller request
    let vods = alloc.allocate(&mut session, "vods", 2).unwrap();
    assert_eq!(vods.ports, vec![14, 15]);
}

/// WHY: n = 0 does no work
/// REASON: A group switched off in interactive mode must not probe the host
#[test]
fn zero_count_never_probes() {
    let alloc = allocator([], ScanRange::default());
    let mut session = AllocationSession::new();

    let assignment = alloc.allocate(&mut session, "cods", 0).unwrap();
    assert!(assignment.is_empty());
    assert!(session.claimed().is_empty());
}

/// WHY: Claimed ports are skipped before probing
/// REASON: Ports handed to an earlier group are not listened on yet, so the
///         probe alone would report them free
/// BREAKS: Disjointness across groups
#[test]
fn claimed_ports_are_never_reprobed() {
    let probe = BoundPorts::new([]);
    let alloc = PortAllocator::new("127.0.0.1", ScanRange::new(1, 50).unwrap(), &probe);
    let mut session = AllocationSession::new();

    alloc.allocate(&mut session, "hls", 10).unwrap();
    let after_first = probe.probes.get();
    assert_eq!(after_first, 10);

    let vods = alloc.allocate(&mut session, "vods", 3).unwrap();
    assert_eq!(vods.ports, vec![11, 12, 13]);
    assert_eq!(probe.probes.get() - after_first, 3);
}

/// WHY: The reference scenario from the CDN setup walkthrough
/// REASON: Ports 0-2 are taken by other services on the box
/// BREAKS: Documented behaviour operators rely on
#[test]
fn hls_and_vods_after_prebound_ports() {
    for range in [ScanRange::new(0, u16::MAX).unwrap(), ScanRange::default()] {
        let alloc = allocator([0, 1, 2], range);
        let mut session = AllocationSession::new();

        let hls = alloc.allocate(&mut session, "hls", 2).unwrap();
        let vods = alloc.allocate(&mut session, "vods", 1).unwrap();

        assert_eq!(hls.ports, vec![3, 4]);
        assert_eq!(vods.ports, vec![5]);
        assert_eq!(session.claimed().iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
    }
}

/// WHY: One assignment per group per run
/// REASON: A second allocation would leave the first block orphaned in the session
#[test]
fn group_allocated_once_per_session() {
    let alloc = allocator([], ScanRange::default());
    let mut session = AllocationSession::new();
    alloc.allocate(&mut session, "hls", 1).unwrap();

    let err = alloc.allocate(&mut session, "hls", 1).unwrap_err();
    assert!(matches!(err, EnvError::GroupAlreadyAllocated(ref g) if g == "hls"));
    assert_eq!(session.claimed().len(), 1);
}

/**
 * allocator.rs
 * Session-scoped listener port allocation for CDN service groups
 *
 * One AllocationSession lives for one CLI run. Each group asks for N ports;
 * the allocator walks the scan range in ascending order and takes the first
 * N ports that are neither claimed earlier in the session nor in use on the
 * host.
 *
 * Example (ports 0-2 bound, scan from 0):
 * - hls  x2 → [3, 4]
 * - vods x1 → [5]
 * - session claimed set → {3, 4, 5}
 *
 * A request that cannot be satisfied claims nothing.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::errors::{EnvError, Result};
use crate::port::probe::PortProbe;

/// Inclusive range of candidate ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRange {
    pub start: u16,
    pub end: u16,
}

impl ScanRange {
    pub fn new(start: u16, end: u16) -> Result<Self> {
        if start > end {
            return Err(EnvError::Config(format!(
                "Invalid scan range {}-{}: start is above end",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Check if port is within this range
    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && port <= self.end
    }

    /// Number of candidate ports in the range
    pub fn len(&self) -> usize {
        (self.end as usize).saturating_sub(self.start as usize) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

impl Default for ScanRange {
    /// 1..=65535; port 0 means "any port" to the OS and is never a listener
    fn default() -> Self {
        Self {
            start: 1,
            end: u16::MAX,
        }
    }
}

/// Ports assigned to one service group, in ascending order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortAssignment {
    pub group: String,
    pub ports: Vec<u16>,
}

impl PortAssignment {
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

/// Ports claimed during one run
#[derive(Debug, Default)]
pub struct AllocationSession {
    claimed: BTreeSet<u16>,
    assignments: Vec<PortAssignment>,
}

impl AllocationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_claimed(&self, port: u16) -> bool {
        self.claimed.contains(&port)
    }

    /// All ports claimed so far, ascending
    pub fn claimed(&self) -> &BTreeSet<u16> {
        &self.claimed
    }

    /// Assignments in the order groups were allocated
    pub fn assignments(&self) -> &[PortAssignment] {
        &self.assignments
    }

    /// Get the assignment recorded for a group
    pub fn assignment(&self, group: &str) -> Option<&PortAssignment> {
        self.assignments.iter().find(|a| a.group == group)
    }

    /// Claim ports chosen by the operator (interactive manual nodes)
    ///
    /// The whole list is checked before anything is claimed: a port repeated
    /// in `ports` or already claimed fails the call and the session is left
    /// untouched.
    ///
    /// # Errors
    /// - `GroupAlreadyAllocated` if the group already has an assignment
    /// - `PortAlreadyClaimed` for the first conflicting port
    pub fn claim_manual(&mut self, group: &str, ports: &[u16]) -> Result<PortAssignment> {
        if self.assignment(group).is_some() {
            return Err(EnvError::GroupAlreadyAllocated(group.to_string()));
        }

        let mut seen = BTreeSet::new();
        for &port in ports {
            if self.claimed.contains(&port) || !seen.insert(port) {
                return Err(EnvError::PortAlreadyClaimed {
                    group: group.to_string(),
                    port,
                });
            }
        }

        let assignment = PortAssignment {
            group: group.to_string(),
            ports: ports.to_vec(),
        };
        self.commit(&assignment);
        Ok(assignment)
    }

    fn commit(&mut self, assignment: &PortAssignment) {
        self.claimed.extend(assignment.ports.iter().copied());
        self.assignments.push(assignment.clone());
    }
}

/// Allocator scanning a host's port space through a [`PortProbe`]
pub struct PortAllocator<P: PortProbe> {
    host: String,
    range: ScanRange,
    probe: P,
}

impl<P: PortProbe> PortAllocator<P> {
    /// Create an allocator for a host
    ///
    /// # Arguments
    /// * `host` - Interface the listeners will bind to
    /// * `range` - Candidate ports, scanned in ascending order
    /// * `probe` - Availability check
    pub fn new(host: impl Into<String>, range: ScanRange, probe: P) -> Self {
        Self {
            host: host.into(),
            range,
            probe,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn range(&self) -> ScanRange {
        self.range
    }

    /// Allocate `count` ports for a group
    ///
    /// # Returns
    /// The assignment, also recorded in `session`
    ///
    /// # Errors
    /// - `GroupAlreadyAllocated` if the group already went through the allocator
    /// - `PortExhausted` if the range holds fewer than `count` usable ports;
    ///   the session is left untouched
    pub fn allocate(
        &self,
        session: &mut AllocationSession,
        group: &str,
        count: usize,
    ) -> Result<PortAssignment> {
        if session.assignment(group).is_some() {
            return Err(EnvError::GroupAlreadyAllocated(group.to_string()));
        }

        let mut ports = Vec::with_capacity(count.min(self.range.len()));
        if count > 0 {
            for candidate in self.range.start..=self.range.end {
                if session.is_claimed(candidate) {
                    continue;
                }
                if !self.probe.is_port_free(&self.host, candidate) {
                    debug!(group, port = candidate, "port in use, skipping");
                    continue;
                }
                ports.push(candidate);
                if ports.len() == count {
                    break;
                }
            }
        }

        if ports.len() < count {
            return Err(EnvError::PortExhausted {
                group: group.to_string(),
                requested: count,
                found: ports.len(),
            });
        }

        let assignment = PortAssignment {
            group: group.to_string(),
            ports,
        };
        session.commit(&assignment);

        info!(
            group,
            count,
            first = assignment.ports.first().copied(),
            last = assignment.ports.last().copied(),
            "allocated listener ports"
        );
        Ok(assignment)
    }
}

/**
 * port module
 * Listener port probing and session-scoped allocation
 */

pub mod allocator;
pub mod probe;

pub use allocator::{AllocationSession, PortAllocator, PortAssignment, ScanRange};
pub use probe::{probe_for, BindProbe, ConnectProbe, PortProbe, ProbeMethod};

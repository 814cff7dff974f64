//! Integration tests for the CDN setup run
//!
//! Drives `CdnSetup` end to end against temporary nginx directories:
//! - Allocation across hls, vods and cods
//! - Site files and descriptor on disk
//! - Dry run, symlink mode, manual nodes
//! - Refusal to overwrite on a second run

use std::collections::BTreeSet;
use std::fs;
use std::io::Cursor;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use fastocloud_env::cdn::render::NodeMap;
use fastocloud_env::cdn::{
    default_groups, CdnOptions, CdnSetup, ConfigWriter, DescriptorVariant, EnableMode, GroupPlan,
    NodeSource, Prompter,
};
use fastocloud_env::port::ConnectProbe;
use fastocloud_env::{AllocationSession, EnvError, PortAllocator, PortProbe, ScanRange};
use tempfile::TempDir;

/// Host with a fixed set of busy ports
struct Busy(BTreeSet<u16>);

impl PortProbe for Busy {
    fn is_port_free(&self, _host: &str, port: u16) -> bool {
        !self.0.contains(&port)
    }
}

fn writer(root: &Path, mode: EnableMode) -> ConfigWriter {
    for dir in ["sites-available", "sites-enabled", "etc"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    ConfigWriter::new(
        root.join("sites-available"),
        root.join("sites-enabled"),
        root.join("etc"),
        mode,
    )
}

fn setup(root: &Path, busy: &[u16], mode: EnableMode) -> CdnSetup<Busy> {
    CdnSetup::new(
        PortAllocator::new(
            "127.0.0.1",
            ScanRange::default(),
            Busy(busy.iter().copied().collect()),
        ),
        writer(root, mode),
    )
}

fn options(variant: DescriptorVariant, dry_run: bool) -> CdnOptions {
    CdnOptions {
        alias: "cdn.example.com".to_string(),
        variant,
        descriptor_template: None,
        dry_run,
    }
}

/// Node lists of the three standard groups from a rendered descriptor
fn descriptor_nodes(descriptor: &str) -> NodeMap {
    let parsed: serde_yaml::Value = serde_yaml::from_str(descriptor).unwrap();
    ["hls_nodes", "vods_nodes", "cods_nodes"]
        .iter()
        .map(|key| {
            let entries = serde_yaml::from_value(parsed[*key].clone()).unwrap();
            (key.to_string(), entries)
        })
        .collect()
}

#[test]
fn test_complete_cdn_setup() {
    let temp_dir = TempDir::new().unwrap();
    let setup = setup(temp_dir.path(), &[1, 2], EnableMode::Copy);
    let mut session = AllocationSession::new();

    let plans = GroupPlan::allocate_all(&default_groups(), 2);
    let report = setup
        .run(&mut session, &plans, &options(DescriptorVariant::Pro, false))
        .unwrap();

    // 1. Ports skip the busy ones and never overlap
    let ports: Vec<Vec<u16>> = report.assignments.iter().map(|a| a.ports.clone()).collect();
    assert_eq!(ports, vec![vec![3, 4], vec![5, 6], vec![7, 8]]);

    // 2. Three site pairs plus the descriptor
    assert_eq!(report.written.len(), 7);
    for name in ["fastocloud_hls", "fastocloud_vods", "fastocloud_cods"] {
        let available = fs::read_to_string(setup.writer().available_path(name)).unwrap();
        let enabled = fs::read_to_string(setup.writer().enabled_path(name)).unwrap();
        assert_eq!(available, enabled);
        assert_eq!(available.matches("server {").count(), 2);
    }

    let vods = fs::read_to_string(setup.writer().available_path("fastocloud_vods")).unwrap();
    assert!(vods.contains("listen 5;"));
    assert!(vods.contains("listen [::]:6;"));
    assert!(vods.contains("access_log /var/log/nginx/fastocloud_vods_6_access.log;"));

    // 3. Descriptor parses as YAML and lists every endpoint
    let descriptor = fs::read_to_string(setup.writer().descriptor_path("fastocloud_pro.conf")).unwrap();
    let parsed: serde_yaml::Value = serde_yaml::from_str(&descriptor).unwrap();
    assert_eq!(parsed["alias"].as_str(), Some("cdn.example.com"));

    let nodes = descriptor_nodes(&descriptor);
    assert_eq!(nodes["hls_nodes"].len(), 2);
    assert_eq!(nodes["hls_nodes"][0].host, "http://127.0.0.1:3");
    assert_eq!(nodes["cods_nodes"][1].host, "http://127.0.0.1:8");
    assert!(nodes.values().flatten().all(|n| n.node_type == 1));
}

#[test]
fn test_dry_run_leaves_directories_empty() {
    let temp_dir = TempDir::new().unwrap();
    let setup = setup(temp_dir.path(), &[], EnableMode::Copy);
    let mut session = AllocationSession::new();

    let plans = GroupPlan::allocate_all(&default_groups(), 1);
    let report = setup
        .run(&mut session, &plans, &options(DescriptorVariant::Ml, true))
        .unwrap();

    assert!(report.written.is_empty());
    assert_eq!(report.descriptor.filename, "fastocloud_pro_ml.conf");
    assert!(report.descriptor.contents.contains("alias: cdn.example.com"));
    for dir in ["sites-available", "sites-enabled", "etc"] {
        assert!(fs::read_dir(temp_dir.path().join(dir)).unwrap().next().is_none());
    }
}

#[cfg(unix)]
#[test]
fn test_symlink_mode_links_enabled_sites() {
    let temp_dir = TempDir::new().unwrap();
    let setup = setup(temp_dir.path(), &[], EnableMode::Symlink);
    let mut session = AllocationSession::new();

    let plans = GroupPlan::allocate_all(&default_groups(), 1);
    setup
        .run(&mut session, &plans, &options(DescriptorVariant::Pro, false))
        .unwrap();

    let enabled = setup.writer().enabled_path("fastocloud_hls");
    let target = fs::read_link(&enabled).unwrap();
    assert_eq!(target, setup.writer().available_path("fastocloud_hls"));
}

#[test]
fn test_second_run_refuses_to_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    let plans = GroupPlan::allocate_all(&default_groups(), 1);

    let first = setup(temp_dir.path(), &[], EnableMode::Copy);
    first
        .run(&mut AllocationSession::new(), &plans, &options(DescriptorVariant::Pro, false))
        .unwrap();
    let before = fs::read_to_string(first.writer().available_path("fastocloud_hls")).unwrap();

    // Different busy ports would render different files
    let second = setup(temp_dir.path(), &[1, 2, 3], EnableMode::Copy);
    let err = second
        .run(&mut AllocationSession::new(), &plans, &options(DescriptorVariant::Pro, false))
        .unwrap_err();

    assert!(matches!(err, EnvError::ConfigCollision(_)));
    let after = fs::read_to_string(second.writer().available_path("fastocloud_hls")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_interactive_manual_nodes() {
    let temp_dir = TempDir::new().unwrap();
    let setup = setup(temp_dir.path(), &[], EnableMode::Copy);
    let groups = default_groups();

    // hls: 1 manual node, vods: 0 nodes, cods: default count
    let answers = "1\nhttp://10.0.0.5\n9001\n2\n0\n\n";
    let mut prompter = Prompter::new(Cursor::new(answers.as_bytes().to_vec()), Vec::new());

    let mut plans = Vec::new();
    for group in &groups {
        let count = prompter.node_count(&group.name, 2).unwrap();
        let source = if group.name == "hls" {
            let nodes = (0..count)
                .map(|i| prompter.manual_node(&group.name, i, "http://127.0.0.1").unwrap())
                .collect();
            NodeSource::Manual(nodes)
        } else {
            NodeSource::Allocate(count)
        };
        plans.push(GroupPlan {
            group: group.clone(),
            source,
        });
    }

    let mut session = AllocationSession::new();
    let report = setup
        .run(&mut session, &plans, &options(DescriptorVariant::Pro, false))
        .unwrap();

    assert_eq!(report.assignments[0].ports, vec![9001]);
    assert!(report.assignments[1].is_empty());
    assert_eq!(report.assignments[2].ports, vec![1, 2]);
    assert!(session.is_claimed(9001));

    let nodes = descriptor_nodes(&report.descriptor.contents);
    assert_eq!(nodes["hls_nodes"][0].host, "http://10.0.0.5:9001");
    assert_eq!(nodes["hls_nodes"][0].node_type, 2);
    assert!(nodes["vods_nodes"].is_empty());

    let vods = fs::read_to_string(setup.writer().available_path("fastocloud_vods")).unwrap();
    assert!(!vods.contains("server {"));
}

#[test]
fn test_connect_probe_skips_listening_port() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let busy = listener.local_addr().unwrap().port();
    let Some(end) = busy.checked_add(20) else {
        return;
    };

    let alloc = PortAllocator::new(
        "127.0.0.1",
        ScanRange::new(busy, end).unwrap(),
        ConnectProbe::new(Duration::from_millis(250)),
    );
    let mut session = AllocationSession::new();
    let assignment = alloc.allocate(&mut session, "hls", 3).unwrap();

    assert_eq!(assignment.len(), 3);
    assert!(!assignment.ports.contains(&busy));
    drop(listener);
}

// Config Write Contract Tests
//
// These tests verify INVARIANTS that MUST NEVER BREAK regardless of implementation.
// Operators hand-edit nginx site files and the service descriptor after the
// first run. The writer must never destroy those edits.

use std::fs;
use std::path::Path;

use fastocloud_env::cdn::render::{render_descriptor, render_group, NodeEntry, NodeMap, RenderedConfig};
use fastocloud_env::cdn::{default_groups, ConfigWriter, DescriptorVariant, EnableMode, ServiceGroup};
use fastocloud_env::{EnvError, PortAssignment};
use tempfile::TempDir;

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

fn rendered(filename: &str, contents: &str) -> RenderedConfig {
    RenderedConfig {
        filename: filename.to_string(),
        contents: contents.to_string(),
    }
}

/// WHY: An existing site file is never overwritten
/// REASON: Operators tune generated site files by hand
/// BREAKS: Manual nginx changes vanish on the next run
/// SACRIFICES: If this fails, the tool clobbers production configs
#[test]
fn existing_site_file_is_left_untouched() {
    let temp = TempDir::new().unwrap();
    let writer = writer(temp.path(), EnableMode::Copy);
    let available = writer.available_path("fastocloud_hls");
    fs::write(&available, "# tuned by hand\n").unwrap();

    let err = writer.write_site(&rendered("fastocloud_hls", "listen 3;\n")).unwrap_err();

    assert!(matches!(err, EnvError::ConfigCollision(ref p) if p.contains("fastocloud_hls")));
    assert_eq!(fs::read_to_string(&available).unwrap(), "# tuned by hand\n");
}

/// WHY: Either site path colliding fails before anything is written
/// REASON: A half-written pair leaves sites-available and sites-enabled out of sync
/// BREAKS: Re-running after a partial failure
#[test]
fn collision_in_either_site_dir_writes_nothing() {
    for mode in [EnableMode::Copy, EnableMode::Symlink] {
        let temp = TempDir::new().unwrap();
        let writer = writer(temp.path(), mode);
        let enabled = writer.enabled_path("fastocloud_vods");
        fs::write(&enabled, "keep").unwrap();

        let err = writer.write_site(&rendered("fastocloud_vods", "new")).unwrap_err();

        assert!(matches!(err, EnvError::ConfigCollision(_)));
        assert!(!writer.available_path("fastocloud_vods").exists());
        assert_eq!(fs::read_to_string(&enabled).unwrap(), "keep");
    }
}

/// WHY: A dangling symlink counts as an existing file
/// REASON: Following it would write through to wherever it points
/// BREAKS: Files outside the nginx directories
#[cfg(unix)]
#[test]
fn dangling_enabled_symlink_is_a_collision() {
    let temp = TempDir::new().unwrap();
    let writer = writer(temp.path(), EnableMode::Copy);
    let enabled = writer.enabled_path("fastocloud_cods");
    std::os::unix::fs::symlink(temp.path().join("gone"), &enabled).unwrap();

    let err = writer.write_site(&rendered("fastocloud_cods", "new")).unwrap_err();

    assert!(matches!(err, EnvError::ConfigCollision(_)));
    assert!(!temp.path().join("gone").exists());
}

/// WHY: The descriptor follows the same collision rule
/// REASON: The streamer's descriptor holds credentials and custom settings
/// BREAKS: A running streamer loses its configuration
#[test]
fn existing_descriptor_is_left_untouched() {
    let temp = TempDir::new().unwrap();
    let writer = writer(temp.path(), EnableMode::Copy);
    let path = writer.descriptor_path(DescriptorVariant::Pro.filename());
    fs::write(&path, "alias: production\n").unwrap();

    let err = writer
        .write_descriptor(&rendered(DescriptorVariant::Pro.filename(), "alias: localhost\n"))
        .unwrap_err();

    assert!(matches!(err, EnvError::ConfigCollision(_)));
    assert_eq!(fs::read_to_string(&path).unwrap(), "alias: production\n");
}

/// WHY: Both enable modes produce the same content in sites-enabled
/// REASON: nginx reads sites-enabled; mode is a packaging choice only
#[test]
fn enabled_site_matches_available_site() {
    for mode in [EnableMode::Copy, EnableMode::Symlink] {
        let temp = TempDir::new().unwrap();
        let writer = writer(temp.path(), mode);

        let written = writer.write_site(&rendered("fastocloud_hls", "listen 3;\n")).unwrap();

        assert_eq!(
            fs::read_to_string(&written.available).unwrap(),
            fs::read_to_string(&written.enabled).unwrap()
        );
        let is_link = written.enabled.symlink_metadata().unwrap().file_type().is_symlink();
        assert_eq!(is_link, mode == EnableMode::Symlink);
    }
}

/// WHY: Rendering is byte-identical for identical inputs
/// REASON: Operators diff generated output between hosts and runs
/// BREAKS: Review of config changes; every run looks like a change
#[test]
fn rendering_is_byte_identical() {
    let group: ServiceGroup = default_groups().remove(0);
    let block = group.load_server_block().unwrap();
    let assignment = PortAssignment {
        group: group.name.clone(),
        ports: vec![3, 4, 9],
    };

    let first = render_group(&group, &block, &assignment).unwrap();
    for _ in 0..5 {
        assert_eq!(render_group(&group, &block, &assignment).unwrap(), first);
    }

    let mut nodes = NodeMap::new();
    nodes.insert("vods_nodes".to_string(), vec![NodeEntry::new("127.0.0.1", 5, 1)]);
    nodes.insert("hls_nodes".to_string(), vec![NodeEntry::new("127.0.0.1", 3, 1)]);
    let template = DescriptorVariant::Pro.builtin_template();

    let descriptor = render_descriptor(DescriptorVariant::Pro, &template, "localhost", &nodes).unwrap();
    let again = render_descriptor(DescriptorVariant::Pro, &template, "localhost", &nodes).unwrap();
    assert_eq!(descriptor.contents, again.contents);

    // Keys come out sorted regardless of insertion order
    let hls = descriptor.contents.find("hls_nodes").unwrap();
    let vods = descriptor.contents.find("vods_nodes").unwrap();
    assert!(hls < vods);
}

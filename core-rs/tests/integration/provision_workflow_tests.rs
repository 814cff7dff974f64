//! Integration tests for the provisioning workflow
//!
//! Runs the `Provisioner` with a recording runner so the exact command
//! sequence can be checked without touching the host:
//! - System package installation per platform
//! - Tool installation
//! - Component builds from the catalog, honoring --with / --without
//! - Repo builds that take GStreamer from the distribution

use std::fs;
use std::path::{Path, PathBuf};

use fastocloud_env::provision::executor::ProvisionOptions;
use fastocloud_env::provision::{catalog, BuildDriver, Component, Fetch, Provisioner};
use fastocloud_env::{
    ComponentFlags, DryRunRunner, EnvError, MediaVersions, PackageSelection, PlatformId,
};
use tempfile::TempDir;

fn options(root: &Path, dry_run: bool) -> ProvisionOptions {
    ProvisionOptions {
        prefix: PathBuf::from("/opt/fastocloud"),
        build_dir: root.join("build_env"),
        jobs: 4,
        dry_run,
        nginx_dir: None,
        sites_enabled: root.join("sites-enabled"),
        hostname_file: root.join("hostname"),
    }
}

fn lines(runner: &DryRunRunner) -> Vec<String> {
    runner.commands().iter().map(|c| c.to_string()).collect()
}

#[test]
fn test_debian_package_sequence() {
    let temp_dir = TempDir::new().unwrap();
    let provisioner = Provisioner::new(PlatformId::Debian, DryRunRunner::new(), options(temp_dir.path(), true));

    provisioner.install_packages(&PackageSelection::default()).unwrap();

    let commands = provisioner.runner().commands();
    assert_eq!(commands[0].to_string(), "apt-get update");
    assert_eq!(
        commands[1].to_string(),
        "apt-get install -y --no-install-recommends git"
    );
    assert_eq!(
        commands[1].env.get("DEBIAN_FRONTEND").map(String::as_str),
        Some("noninteractive")
    );

    // One install per selected package, nothing else
    let selected = PlatformId::Debian.packages().select(&PackageSelection::default());
    assert_eq!(commands.len(), selected.len() + 1);
}

#[test]
fn test_redhat_links_ninja_after_install() {
    let temp_dir = TempDir::new().unwrap();
    let provisioner = Provisioner::new(PlatformId::RedHat, DryRunRunner::new(), options(temp_dir.path(), true));

    provisioner.install_packages(&PackageSelection::default()).unwrap();

    let lines = lines(provisioner.runner());
    assert_eq!(lines.first().map(String::as_str), Some("yum makecache -y"));
    assert_eq!(
        lines.last().map(String::as_str),
        Some("ln -sf /usr/bin/ninja-build /usr/bin/ninja")
    );
}

#[test]
fn test_tools_pin_meson_version() {
    let temp_dir = TempDir::new().unwrap();
    let provisioner = Provisioner::new(PlatformId::Debian, DryRunRunner::new(), options(temp_dir.path(), true));

    provisioner.install_tools(&MediaVersions::default().meson).unwrap();

    let lines = lines(provisioner.runner());
    assert!(lines.contains(&"pip3 install meson==0.62.0".to_string()));
    assert!(lines.contains(&"cargo install --version 0.9.21 cargo-c".to_string()));
}

#[test]
fn test_default_catalog_dry_run_order() {
    let temp_dir = TempDir::new().unwrap();
    let provisioner = Provisioner::new(PlatformId::Debian, DryRunRunner::new(), options(temp_dir.path(), true));

    let components = catalog(&ComponentFlags::default(), &MediaVersions::default(), Path::new("fastogt_patch"));
    let built = provisioner.build_all(&components).unwrap();
    assert_eq!(built, 17);

    let commands = provisioner.runner().commands();
    assert!(commands.iter().all(|c| c.program != "git" && c.program != "tar"));

    // gst-plugins-base is patched before it is configured
    let base_src = temp_dir.path().join("build_env").join("gst-plugins-base");
    let base: Vec<String> = commands
        .iter()
        .filter(|c| c.cwd.as_deref() == Some(base_src.as_path()))
        .map(|c| c.to_string())
        .collect();
    assert_eq!(
        base,
        vec![
            "patch -p1 -i fastogt_patch/gst-plugins-base.patch".to_string(),
            "meson setup build_meson --prefix=/opt/fastocloud --buildtype=release -Dexamples=disabled".to_string(),
            "ninja -C build_meson install".to_string(),
        ]
    );

    // gstreamer core is installed before any plugin set
    let position = |name: &str| {
        let dir = temp_dir.path().join("build_env").join(name);
        commands
            .iter()
            .position(|c| c.cwd.as_deref() == Some(dir.as_path()))
            .unwrap()
    };
    assert!(position("gstreamer") < position("gst-plugins-base"));
    assert!(position("gst-plugins-base") < position("gst-plugins-good"));
    assert!(position("gst-plugins-bad") < position("gst-rtsp-server"));
}

#[test]
fn test_without_removes_components() {
    let temp_dir = TempDir::new().unwrap();
    let provisioner = Provisioner::new(PlatformId::Debian, DryRunRunner::new(), options(temp_dir.path(), true));

    let mut flags = ComponentFlags::default();
    flags.apply(&["opencv"], &["faac", "gst-plugins-bad"]).unwrap();
    let components = catalog(&flags, &MediaVersions::default(), Path::new("fastogt_patch"));
    provisioner.build_all(&components).unwrap();

    let build_env = temp_dir.path().join("build_env");
    let dirs: Vec<PathBuf> = provisioner
        .runner()
        .commands()
        .iter()
        .filter_map(|c| c.cwd.clone())
        .collect();
    assert!(dirs.contains(&build_env.join("opencv")));
    assert!(!dirs.contains(&build_env.join("faac")));
    assert!(!dirs.contains(&build_env.join("gst-plugins-bad")));

    let err = flags.apply(&["gst-plugins-nope"], &[]).unwrap_err();
    assert!(matches!(err, EnvError::UnknownComponent(_)));
}

#[test]
fn test_repo_build_skips_gstreamer_sources() {
    let temp_dir = TempDir::new().unwrap();
    let provisioner = Provisioner::new(PlatformId::Debian, DryRunRunner::new(), options(temp_dir.path(), true));

    // 1. Distribution GStreamer packages replace the source build
    let selection = PackageSelection {
        repo_build: true,
        ..Default::default()
    };
    provisioner.install_packages(&selection).unwrap();
    let packages = lines(provisioner.runner());
    assert!(packages.iter().any(|l| l.ends_with(" libgstreamer1.0-dev")));

    // 2. Only the support libraries are built, in dependency order
    let mut flags = ComponentFlags::default();
    flags.restrict_to_repo_build();
    let components = catalog(&flags, &MediaVersions::default(), Path::new("fastogt_patch"));
    let built = provisioner.build_all(&components).unwrap();
    assert_eq!(built, 5);

    let build_env = temp_dir.path().join("build_env");
    let mut order: Vec<String> = Vec::new();
    for command in provisioner.runner().commands() {
        let Some(name) = command
            .cwd
            .as_deref()
            .and_then(|dir| dir.strip_prefix(&build_env).ok())
            .map(|dir| dir.display().to_string())
        else {
            continue;
        };
        if order.last() != Some(&name) {
            order.push(name);
        }
    }
    assert_eq!(order, vec!["json-c", "libev", "common", "fastotv_cpp", "libyaml"]);
}

#[test]
fn test_local_source_is_built_in_place() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("fastoml");
    fs::create_dir_all(&src).unwrap();

    let provisioner = Provisioner::new(PlatformId::Debian, DryRunRunner::new(), options(temp_dir.path(), false));
    let component = Component::new("fastoml", Fetch::Local { path: src.clone() }, BuildDriver::Cmake);

    provisioner.build(&component).unwrap();

    let commands = provisioner.runner().commands();
    assert_eq!(commands.len(), 2);
    assert!(commands.iter().all(|c| c.cwd.as_deref() == Some(src.as_path())));
    assert_eq!(
        commands[1].to_string(),
        "cmake --build build_cmake --target install -j4"
    );
}

#[test]
fn test_hostname_written_on_linux_only() {
    let temp_dir = TempDir::new().unwrap();

    let linux = Provisioner::new(PlatformId::Debian, DryRunRunner::new(), options(temp_dir.path(), false));
    linux.set_hostname("cdn.fastocloud.com").unwrap();
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("hostname")).unwrap(),
        "cdn.fastocloud.com"
    );

    let other = TempDir::new().unwrap();
    let mac = Provisioner::new(PlatformId::MacOsx, DryRunRunner::new(), options(other.path(), false));
    mac.set_hostname("cdn.fastocloud.com").unwrap();
    assert!(!other.path().join("hostname").exists());
}

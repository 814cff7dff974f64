//! Third-party component catalog
//!
//! The ordered list of everything the media server environment builds from
//! source. Order matters: later components link against earlier ones
//! (plugin sets need gstreamer core, gst-plugins-bad needs libva, ...).

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{EnvError, Result};
use crate::provision::component::{BuildDriver, Component, Fetch};

const GSTREAMER_SRC_ROOT: &str = "https://gstreamer.freedesktop.org/src";
const GST_RUST_PLUGINS_URL: &str = "https://gitlab.freedesktop.org/gstreamer/gst-plugins-rs";
const AWS_SDK_URL: &str = "https://github.com/aws/aws-sdk-cpp";
const AWS_S3_URL: &str = "https://github.com/amzn/amazon-s3-gst-plugin";
const GST_NICE_URL: &str = "https://gitlab.freedesktop.org/libnice/libnice";
const NDI_URL: &str = "https://github.com/Palakis/obs-ndi";
const FAAC_URL: &str = "https://github.com/knik0/faac/archive/1_30.tar.gz";
const OPENH264_URL: &str = "https://github.com/cisco/openh264";
const OPENH264_BRANCH: &str = "v2.1.1";
const LIBVA_URL: &str = "https://github.com/intel/libva";
const LIBVA_UTILS_URL: &str = "https://github.com/intel/libva-utils";
const INTEL_VAAPI_DRIVER_URL: &str = "https://github.com/intel/intel-vaapi-driver";
const GMM_LIB_URL: &str = "https://github.com/intel/gmmlib";
const INTEL_MEDIA_DRIVER_URL: &str = "https://github.com/intel/media-driver";
const MEDIA_SDK_URL: &str = "https://github.com/Intel-Media-SDK/MediaSDK";
const GSTREAMER_MFX_URL: &str = "https://github.com/fastogt/gstreamer-media-SDK";
const OPENCV_URL: &str = "https://github.com/opencv/opencv";
const WPE_RELEASES_URL: &str = "https://wpewebkit.org/releases";
const SRT_SRC_URL: &str = "https://github.com/Haivision/srt/archive";
const FFMPEG_URL: &str = "https://github.com/FFmpeg/FFmpeg";
const FASTOGT_GITHUB: &str = "https://github.com/fastogt";

const MESON_RELEASE: &str = "--buildtype=release";

/// Versions of the tarball-based components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaVersions {
    pub gstreamer: String,
    pub srt: String,
    pub meson: String,
    pub wpe: String,
    pub wpe_backend: String,
    pub wpe_webkit: String,
}

impl Default for MediaVersions {
    fn default() -> Self {
        Self {
            gstreamer: "1.22.10".to_string(),
            srt: "1.5.3".to_string(),
            meson: "0.62.0".to_string(),
            wpe: "1.14.1".to_string(),
            wpe_backend: "1.14.2".to_string(),
            wpe_webkit: "2.42.0".to_string(),
        }
    }
}

/// Which component families to build
///
/// Toggled from the command line with `--with <name>` / `--without <name>`
/// using the kebab-case names in [`ComponentFlags::NAMES`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ComponentFlags {
    pub faac: bool,
    pub openh264: bool,
    pub libva: bool,
    pub vaapi: bool,
    pub mfx: bool,
    pub wpe: bool,
    pub srt: bool,
    pub ffmpeg: bool,
    pub opencv: bool,
    pub jsonc: bool,
    pub libev: bool,
    pub aws: bool,
    pub common: bool,
    pub ndi: bool,
    pub fastotv_cpp: bool,
    pub libyaml: bool,
    pub fastoml: bool,
    pub gstreamer: bool,
    pub gst_plugins_base: bool,
    pub gst_plugins_good: bool,
    pub gst_nice: bool,
    pub gst_plugins_bad: bool,
    pub gst_plugins_ugly: bool,
    pub gst_fastoml: bool,
    pub gst_awss3: bool,
    pub gst_rs_plugins: bool,
    pub gst_libav: bool,
    pub gst_rtsp: bool,
}

impl Default for ComponentFlags {
    fn default() -> Self {
        Self {
            faac: true,
            openh264: true,
            libva: false,
            vaapi: false,
            mfx: false,
            wpe: false,
            srt: true,
            ffmpeg: true,
            opencv: false,
            jsonc: true,
            libev: true,
            aws: false,
            common: true,
            ndi: false,
            fastotv_cpp: true,
            libyaml: true,
            fastoml: false,
            gstreamer: true,
            gst_plugins_base: true,
            gst_plugins_good: true,
            gst_nice: true,
            gst_plugins_bad: true,
            gst_plugins_ugly: true,
            gst_fastoml: false,
            gst_awss3: false,
            gst_rs_plugins: false,
            gst_libav: true,
            gst_rtsp: true,
        }
    }
}

impl ComponentFlags {
    pub const NAMES: [&'static str; 28] = [
        "faac",
        "openh264",
        "libva",
        "vaapi",
        "mfx",
        "wpe",
        "srt",
        "ffmpeg",
        "opencv",
        "json-c",
        "libev",
        "aws",
        "common",
        "ndi",
        "fastotv-cpp",
        "libyaml",
        "fastoml",
        "gstreamer",
        "gst-plugins-base",
        "gst-plugins-good",
        "gst-nice",
        "gst-plugins-bad",
        "gst-plugins-ugly",
        "gst-fastoml",
        "gst-awss3",
        "gst-rs-plugins",
        "gst-libav",
        "gst-rtsp",
    ];

    fn flag_mut(&mut self, name: &str) -> Option<&mut bool> {
        let flag = match name {
            "faac" => &mut self.faac,
            "openh264" => &mut self.openh264,
            "libva" => &mut self.libva,
            "vaapi" => &mut self.vaapi,
            "mfx" => &mut self.mfx,
            "wpe" => &mut self.wpe,
            "srt" => &mut self.srt,
            "ffmpeg" => &mut self.ffmpeg,
            "opencv" => &mut self.opencv,
            "json-c" => &mut self.jsonc,
            "libev" => &mut self.libev,
            "aws" => &mut self.aws,
            "common" => &mut self.common,
            "ndi" => &mut self.ndi,
            "fastotv-cpp" => &mut self.fastotv_cpp,
            "libyaml" => &mut self.libyaml,
            "fastoml" => &mut self.fastoml,
            "gstreamer" => &mut self.gstreamer,
            "gst-plugins-base" => &mut self.gst_plugins_base,
            "gst-plugins-good" => &mut self.gst_plugins_good,
            "gst-nice" => &mut self.gst_nice,
            "gst-plugins-bad" => &mut self.gst_plugins_bad,
            "gst-plugins-ugly" => &mut self.gst_plugins_ugly,
            "gst-fastoml" => &mut self.gst_fastoml,
            "gst-awss3" => &mut self.gst_awss3,
            "gst-rs-plugins" => &mut self.gst_rs_plugins,
            "gst-libav" => &mut self.gst_libav,
            "gst-rtsp" => &mut self.gst_rtsp,
            _ => return None,
        };
        Some(flag)
    }

    /// Toggle a family by name
    ///
    /// # Errors
    /// `UnknownComponent` if the name is not one of [`ComponentFlags::NAMES`]
    pub fn set(&mut self, name: &str, enabled: bool) -> Result<()> {
        let flag = self
            .flag_mut(name)
            .ok_or_else(|| EnvError::UnknownComponent(name.to_string()))?;
        *flag = enabled;
        Ok(())
    }

    /// Selection for a distribution-packaged GStreamer
    ///
    /// Only the fastogt support libraries stay as configured; the media stack
    /// comes from system packages, so every other family is switched off.
    /// `--with` applied afterwards can still turn single families back on.
    pub fn restrict_to_repo_build(&mut self) {
        *self = Self {
            jsonc: self.jsonc,
            libev: self.libev,
            common: self.common,
            fastotv_cpp: self.fastotv_cpp,
            libyaml: self.libyaml,
            ..Self::none()
        };
    }

    fn none() -> Self {
        let mut flags = Self::default();
        for name in Self::NAMES {
            if let Some(flag) = flags.flag_mut(name) {
                *flag = false;
            }
        }
        flags
    }

    /// Apply `--with` then `--without` lists
    pub fn apply<S: AsRef<str>>(&mut self, with: &[S], without: &[S]) -> Result<()> {
        for name in with {
            self.set(name.as_ref(), true)?;
        }
        for name in without {
            self.set(name.as_ref(), false)?;
        }
        Ok(())
    }
}

fn gst_tarball(root: &str, module: &str, version: &str) -> Fetch {
    Fetch::archive(format!("{}/{}/{}-{}.tar.xz", root, module, module, version))
}

fn fastogt(repo: &str) -> Fetch {
    Fetch::git(format!("{}/{}", FASTOGT_GITHUB, repo))
}

fn meson_gst(module: &str, versions: &MediaVersions) -> Component {
    Component::new(module, gst_tarball(GSTREAMER_SRC_ROOT, module, &versions.gstreamer), BuildDriver::Meson)
        .with_args([MESON_RELEASE])
}

/// Build the ordered component list
///
/// Every component is listed; disabled ones carry `enabled == false` so
/// callers can show what would be skipped. Patch files are looked up in
/// `patch_dir`.
pub fn catalog(flags: &ComponentFlags, versions: &MediaVersions, patch_dir: &Path) -> Vec<Component> {
    let f = flags;
    let v = versions;

    vec![
        Component::new(
            "faac",
            Fetch::archive(FAAC_URL),
            BuildDriver::Bootstrap {
                script: "bootstrap".to_string(),
            },
        )
        .enabled(f.faac),
        Component::new("openh264", Fetch::git_branch(OPENH264_URL, OPENH264_BRANCH), BuildDriver::Meson)
            .with_args([MESON_RELEASE])
            .enabled(f.openh264),
        Component::new("libva", Fetch::git(LIBVA_URL), BuildDriver::MesonSystem)
            .with_args([MESON_RELEASE])
            .enabled(f.libva || f.mfx),
        Component::new("libva-utils", Fetch::git(LIBVA_UTILS_URL), BuildDriver::MesonSystem)
            .with_args([MESON_RELEASE, "-Ddrm=true"])
            .enabled(f.libva || f.mfx),
        Component::new("intel-vaapi-driver", Fetch::git(INTEL_VAAPI_DRIVER_URL), BuildDriver::MesonSystem)
            .with_args([MESON_RELEASE])
            .enabled(f.vaapi),
        Component::new("gmmlib", Fetch::git(GMM_LIB_URL), BuildDriver::Cmake).enabled(f.mfx),
        Component::new("media-driver", Fetch::git(INTEL_MEDIA_DRIVER_URL), BuildDriver::Cmake).enabled(f.mfx),
        Component::new("mediasdk", Fetch::git(MEDIA_SDK_URL), BuildDriver::Cmake)
            .with_args(["-DENABLE_OPENCL=OFF"])
            .enabled(f.mfx),
        Component::new(
            "libwpe",
            Fetch::archive(format!("{}/libwpe-{}.tar.xz", WPE_RELEASES_URL, v.wpe)),
            BuildDriver::Cmake,
        )
        .enabled(f.wpe),
        Component::new(
            "wpebackend-fdo",
            Fetch::archive(format!("{}/wpebackend-fdo-{}.tar.xz", WPE_RELEASES_URL, v.wpe_backend)),
            BuildDriver::Meson,
        )
        .with_args([MESON_RELEASE])
        .enabled(f.wpe),
        Component::new(
            "srt",
            Fetch::archive(format!("{}/v{}.tar.gz", SRT_SRC_URL, v.srt)),
            BuildDriver::Cmake,
        )
        .enabled(f.srt),
        Component::new("ffmpeg", Fetch::git(FFMPEG_URL), BuildDriver::Autotools)
            .with_args(["--disable-doc", "--disable-programs", "--enable-shared", "--disable-static"])
            .enabled(f.ffmpeg),
        Component::new("opencv", Fetch::git(OPENCV_URL), BuildDriver::Cmake)
            .with_args([
                "-DBUILD_JAVA=OFF",
                "-DBUILD_TESTS=OFF",
                "-DWITH_GSTREAMER=OFF",
                "-DOPENCV_GENERATE_PKGCONFIG=ON",
            ])
            .enabled(f.opencv),
        Component::new("json-c", fastogt("json-c"), BuildDriver::Cmake)
            .with_args(["-DBUILD_SHARED_LIBS=OFF", "-DBUILD_TESTING=OFF"])
            .enabled(f.jsonc),
        Component::new(
            "libev",
            fastogt("libev"),
            BuildDriver::Bootstrap {
                script: "autogen.sh".to_string(),
            },
        )
        .with_args(["--with-pic", "--disable-shared", "--enable-static"])
        .enabled(f.libev),
        Component::new("aws-sdk-cpp", Fetch::git(AWS_SDK_URL), BuildDriver::Cmake)
            .with_args(["-DBUILD_ONLY=s3;sts"])
            .enabled(f.aws),
        Component::new("common", fastogt("common"), BuildDriver::Cmake)
            .with_args(["-DQT_ENABLED=OFF"])
            .enabled(f.common),
        Component::new("obs-ndi", Fetch::git(NDI_URL), BuildDriver::Cmake).enabled(f.ndi),
        Component::new("fastotv_cpp", fastogt("fastotv_cpp"), BuildDriver::Cmake).enabled(f.fastotv_cpp),
        Component::new("libyaml", fastogt("libyaml"), BuildDriver::Cmake).enabled(f.libyaml),
        Component::new("fastoml", fastogt("fastoml"), BuildDriver::Cmake).enabled(f.fastoml),
        meson_gst("gstreamer", v).enabled(f.gstreamer),
        meson_gst("gst-plugins-base", v)
            .with_args(["-Dexamples=disabled"])
            .with_patch(patch_dir.join("gst-plugins-base.patch"))
            .enabled(f.gst_plugins_base),
        Component::new(
            "wpewebkit",
            Fetch::archive(format!("{}/wpewebkit-{}.tar.xz", WPE_RELEASES_URL, v.wpe_webkit)),
            BuildDriver::Cmake,
        )
        .with_args([
            "-DPORT=WPE",
            "-DUSE_SOUP2=ON",
            "-DENABLE_ACCESSIBILITY=OFF",
            "-DUSE_OPENJPEG=OFF",
            "-DUSE_WOFF2=OFF",
            "-DUSE_LCMS=OFF",
            "-DUSE_AVIF=OFF",
            "-DENABLE_BUBBLEWRAP_SANDBOX=OFF",
            "-DENABLE_INTROSPECTION=OFF",
        ])
        .enabled(f.wpe),
        meson_gst("gst-plugins-good", v).enabled(f.gst_plugins_good),
        Component::new("libnice", Fetch::git(GST_NICE_URL), BuildDriver::Meson)
            .with_args([MESON_RELEASE])
            .enabled(f.gst_nice),
        meson_gst("gst-plugins-bad", v)
            .with_args(["-Dgpl=enabled"])
            .with_patch(patch_dir.join("gst-plugins-bad.patch"))
            .enabled(f.gst_plugins_bad),
        Component::new("gstreamer-media-sdk", Fetch::git(GSTREAMER_MFX_URL), BuildDriver::Cmake)
            .with_args(["-DWITH_WAYLAND=OFF", "-DMFX_SINK=OFF"])
            .enabled(f.gst_plugins_bad && f.mfx),
        meson_gst("gstreamer-vaapi", v).enabled(f.gst_plugins_bad && f.vaapi),
        meson_gst("gst-plugins-ugly", v)
            .with_args(["-Dgpl=enabled"])
            .enabled(f.gst_plugins_ugly),
        Component::new("gst-fastoml", fastogt("gst-fastoml"), BuildDriver::Meson)
            .with_args([MESON_RELEASE])
            .enabled(f.gst_fastoml),
        Component::new("amazon-s3-gst-plugin", Fetch::git(AWS_S3_URL), BuildDriver::Meson)
            .with_args([MESON_RELEASE])
            .enabled(f.gst_awss3),
        Component::new(
            "gst-plugins-rs",
            Fetch::git(GST_RUST_PLUGINS_URL),
            BuildDriver::CargoC {
                packages: vec!["gst-plugin-ndi".to_string(), "gst-plugin-webrtchttp".to_string()],
            },
        )
        .enabled(f.gst_rs_plugins),
        meson_gst("gst-libav", v).enabled(f.gst_libav),
        meson_gst("gst-rtsp-server", v).enabled(f.gst_rtsp),
    ]
}

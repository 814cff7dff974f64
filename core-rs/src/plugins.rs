//! GStreamer plugin verification
//!
//! After a build, every element the streamer relies on is looked up with
//! `gst-inspect-1.0`. A missing element is reported, never fatal: the
//! operator decides whether the gap matters for their pipelines.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::errors::{EnvError, Result};
use crate::provision::runner::{CommandRunner, ExternalCommand};

pub const GST_INSPECT: &str = "gst-inspect-1.0";

/// Elements used by the COM/PRO streamer
pub const PLUGINS: &[&str] = &[
    "decodebin", "fakesink", "testsink", "testsrcbin", "videotestsrc", "audiotestsrc", "ximagesrc",
    "autovideosink", "autoaudiosink", "queue", "queue2", "h264parse", "h265parse",
    "mpegvideoparse", "aacparse", "ac3parse", "mpegaudioparse", "rawaudioparse", "opusparse",
    "tee", "flvmux", "mp4mux", "qtmux", "mpegtsmux", "webmmux", "filesink", "rtpmux", "rtpmp2tpay",
    "rtph264pay", "rtph265pay", "rtpmp4apay", "rtpac3pay", "rtppcmupay", "rtpmp2tdepay",
    "rtph264depay", "rtph265depay", "rtpmp4adepay", "rtpac3depay", "v4l2src", "splitmuxsink",
    "alsasrc", "multifilesrc", "appsrc", "filesrc", "fakesrc", "wpevideosrc", "wpesrc", "cefsrc",
    "imagefreeze", "capsfilter", "audioconvert", "rgvolume", "volume", "faac", "opusenc",
    "voaacenc", "audioresample", "lamemp3enc", "videoconvert", "avdeinterlace", "deinterlace",
    "videoflip", "aspectratiocrop", "udpsink", "rtspclientsink", "tcpserversink", "rtmpsink",
    "rtmp2sink", "httpsink", "hlssink", "hlssink2", "souphttpsrc", "dvbsrc", "videoscale",
    "videorate", "multifilesink", "nvh264enc", "nvh265enc", "msdkh264enc", "vp8enc", "vp9enc",
    "x264enc", "x265enc", "mpeg2enc", "eavcenc", "openh264enc", "udpsrc", "rtmpsrc", "rtmp2src",
    "rtspsrc", "rtpsrc", "tcpserversrc", "vaapih264enc", "vaapimpeg2enc", "vaapidecodebin",
    "vaapipostproc", "gdkpixbufoverlay", "rsvgoverlay", "videobox", "videomixer", "audiomixer",
    "compositor", "alpha", "interleave", "deinterleave", "textoverlay", "videocrop", "spectrum",
    "level", "hlsdemux", "decklinkvideosink", "decklinkaudiosink", "interlace", "autovideoconvert",
    "glvideomixer", "glalpha", "cudascale", "cudaconvert", "cudadownload", "tsparse", "avdec_h264",
    "tsdemux", "avdec_ac3", "avdec_ac3_fixed", "avdec_aac", "avdec_aac_fixed",
    "souphttpclientsink", "mfxh264enc", "mfxvpp", "mfxh264dec", "srtsrc", "srtsink",
    "input-selector", "kvssink", "s3sink", "webrtcbin",
];

/// Additional elements used by the ML streamer
pub const PLUGINS_ML: &[&str] = &[
    "tinyyolov2", "tinyyolov3", "detectionoverlay", "nvinfer", "nvtracker", "nvvideoconvert",
    "nvstreammux", "nvv4l2h264enc", "nvv4l2h265enc", "nvv4l2vp8enc", "nvv4l2vp9enc", "nvdsosd",
    "dsfastogt", "fastogtbackground", "fastogtaudio",
];

/// Element lists in the order they are checked and printed
pub const PLUGIN_SETS: &[(&str, &[&str])] = &[("FastoCloud COM/PRO", PLUGINS), ("FastoCloud ML", PLUGINS_ML)];

/// Library directories of the TensorRT and VideoFX SDKs
pub const ML_LIBRARY_DIRS: &[&str] = &["/usr/local/TensorRT-7.2.2.3/lib", "/usr/local/VideoFX/lib"];

/// Outcome of inspecting one element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginReport {
    pub name: String,
    /// Exit code of gst-inspect, -1 if it could not be started
    pub code: i32,
}

impl PluginReport {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// Reports for one element list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginSetReport {
    pub title: String,
    pub reports: Vec<PluginReport>,
}

impl PluginSetReport {
    pub fn missing(&self) -> usize {
        self.reports.iter().filter(|r| !r.is_ok()).count()
    }
}

/// Runs gst-inspect for element lists
pub struct PluginInspector<R: CommandRunner> {
    runner: R,
    env: BTreeMap<String, String>,
}

impl<R: CommandRunner> PluginInspector<R> {
    /// Inspector searching `<prefix>/lib/gstreamer-1.0` on top of the
    /// inherited plugin path
    pub fn new(runner: R, prefix: &Path) -> Self {
        let plugin_dir = prefix.join("lib").join("gstreamer-1.0");
        let mut env = BTreeMap::new();
        env.insert(
            "GST_PLUGIN_PATH".to_string(),
            extend_path_var(std::env::var("GST_PLUGIN_PATH").ok().as_deref(), &[&plugin_dir.display().to_string()]),
        );
        env.insert(
            "LD_LIBRARY_PATH".to_string(),
            extend_path_var(std::env::var("LD_LIBRARY_PATH").ok().as_deref(), ML_LIBRARY_DIRS),
        );
        Self { runner, env }
    }

    /// Append configured search directories
    pub fn with_extra_paths(mut self, plugin_path: &[PathBuf], library_path: &[PathBuf]) -> Self {
        for (key, dirs) in [("GST_PLUGIN_PATH", plugin_path), ("LD_LIBRARY_PATH", library_path)] {
            let extra: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
            let current = self.env.get(key).cloned();
            self.env.insert(key.to_string(), extend_path_var(current.as_deref(), &extra));
        }
        self
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Inspect one element
    pub fn inspect(&self, name: &str) -> PluginReport {
        let mut command = ExternalCommand::new(GST_INSPECT).arg(name).quiet();
        for (key, value) in &self.env {
            command = command.env(key.as_str(), value.as_str());
        }

        let code = match self.runner.status(&command) {
            Ok(code) => code,
            Err(e) => {
                warn!(plugin = name, error = %e, "gst-inspect could not be started");
                -1
            }
        };
        debug!(plugin = name, code, "inspected");

        PluginReport {
            name: name.to_string(),
            code,
        }
    }

    /// Inspect every element in order; failures never stop the sweep
    pub fn check(&self, plugins: &[&str]) -> Vec<PluginReport> {
        plugins.iter().map(|name| self.inspect(name)).collect()
    }

    /// Inspect every list in [`PLUGIN_SETS`]
    pub fn check_sets(&self) -> Vec<PluginSetReport> {
        PLUGIN_SETS
            .iter()
            .map(|(title, plugins)| PluginSetReport {
                title: title.to_string(),
                reports: self.check(plugins),
            })
            .collect()
    }
}

/// Exit policy of a plugin check
///
/// Missing plugins are only reported unless `strict` is set, in which case
/// any failure becomes `PluginsMissing`.
pub fn enforce(sets: &[PluginSetReport], strict: bool) -> Result<()> {
    let missing: usize = sets.iter().map(PluginSetReport::missing).sum();
    if strict && missing > 0 {
        return Err(EnvError::PluginsMissing(missing));
    }
    Ok(())
}

/// Machine-readable report list
pub fn reports_json(reports: &[PluginReport]) -> Result<String> {
    Ok(serde_json::to_string_pretty(reports)?)
}

fn extend_path_var<S: AsRef<str>>(current: Option<&str>, extra: &[S]) -> String {
    current
        .filter(|value| !value.is_empty())
        .into_iter()
        .chain(extra.iter().map(|s| s.as_ref()))
        .collect::<Vec<_>>()
        .join(":")
}

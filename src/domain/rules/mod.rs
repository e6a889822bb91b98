// Domain rules - Copy-compatibility and encode argument policies

use crate::domain::model::*;

/// Video codecs that are safe to pass through without re-encoding
pub const COPY_SAFE_VIDEO_CODECS: &[&str] = &["h264", "hevc", "vp9", "prores"];

/// Channel count of normalized composition audio
pub const NORMALIZED_AUDIO_CHANNELS: u32 = 2;

/// Sample rate of normalized composition audio
pub const NORMALIZED_AUDIO_SAMPLE_RATE: u32 = 48_000;

/// Business rules for deciding whether inputs can be joined without re-encoding
pub struct CompatibilityChecker;

impl CompatibilityChecker {
    /// Check that every input matches the first one on all copy-relevant parameters.
    ///
    /// Equality on these fields is transitive, so comparing against the first
    /// input is equivalent to a pairwise check. Returns the first mismatch found.
    pub fn check(inputs: &[MediaMetadata]) -> Result<(), String> {
        let Some(reference) = inputs.first() else {
            return Err("no inputs".to_string());
        };

        for (index, candidate) in inputs.iter().enumerate().skip(1) {
            if let Some(reason) = Self::mismatch(reference, candidate) {
                return Err(format!("input 0 vs input {}: {}", index, reason));
            }
        }

        Ok(())
    }

    /// Whether a set of inputs can be joined in copy mode
    pub fn all_compatible(inputs: &[MediaMetadata]) -> bool {
        Self::check(inputs).is_ok()
    }

    fn mismatch(a: &MediaMetadata, b: &MediaMetadata) -> Option<String> {
        if a.extension() != b.extension() {
            return Some(format!(
                "container .{} vs .{}",
                a.extension(),
                b.extension()
            ));
        }

        match (&a.video, &b.video) {
            (Some(va), Some(vb)) => {
                if let Some(reason) = Self::video_mismatch(va, vb) {
                    return Some(reason);
                }
            }
            (None, None) => {}
            _ => return Some("video stream present in only one input".to_string()),
        }

        match (&a.audio, &b.audio) {
            (Some(aa), Some(ab)) => Self::audio_mismatch(aa, ab),
            (None, None) => None,
            _ => Some("audio stream present in only one input".to_string()),
        }
    }

    fn video_mismatch(a: &VideoParams, b: &VideoParams) -> Option<String> {
        if !EncodeArgPlanner::can_copy_video(a) || !EncodeArgPlanner::can_copy_video(b) {
            return Some("incomplete video parameters".to_string());
        }
        if a.codec != b.codec {
            return Some(format!("video codec {} vs {}", a.codec, b.codec));
        }
        if a.width != b.width || a.height != b.height {
            return Some(format!(
                "resolution {}x{} vs {}x{}",
                a.width, a.height, b.width, b.height
            ));
        }
        if a.frame_rate != b.frame_rate {
            return Some(format!("frame rate {} vs {}", a.frame_rate, b.frame_rate));
        }
        if a.pixel_format != b.pixel_format {
            return Some(format!(
                "pixel format {} vs {}",
                a.pixel_format, b.pixel_format
            ));
        }
        None
    }

    fn audio_mismatch(a: &AudioParams, b: &AudioParams) -> Option<String> {
        if a.codec != b.codec {
            return Some(format!("audio codec {} vs {}", a.codec, b.codec));
        }
        if a.channels != b.channels {
            return Some(format!("audio channels {} vs {}", a.channels, b.channels));
        }
        if a.sample_rate_hz != b.sample_rate_hz {
            return Some(format!(
                "sample rate {} vs {}",
                a.sample_rate_hz, b.sample_rate_hz
            ));
        }
        None
    }
}

/// Builds minimal encode argument sets from probed source parameters
pub struct EncodeArgPlanner;

impl EncodeArgPlanner {
    /// True iff codec, width and height are all present and non-empty/non-zero
    pub fn can_copy_video(params: &VideoParams) -> bool {
        !params.codec.trim().is_empty() && params.width > 0 && params.height > 0
    }

    /// Whether the source codec is on the passthrough allow-list
    pub fn is_copy_safe_codec(codec: &str) -> bool {
        COPY_SAFE_VIDEO_CODECS.contains(&codec.to_lowercase().as_str())
    }

    /// Video arguments for an unfiltered output: passthrough when safe, otherwise re-encode.
    ///
    /// The pixel format is left untouched.
    pub fn video_args_from_source(params: &VideoParams) -> EncodeArgs {
        if Self::can_copy_video(params) && Self::is_copy_safe_codec(&params.codec) {
            return EncodeArgs::new().opt("-c:v", "copy");
        }
        Self::encoder_args("libx264")
    }

    /// Video arguments for an output that must be re-encoded (filtered or precisely trimmed).
    ///
    /// Keeps the source codec family when it is allow-listed. A pixel format is
    /// only forced when `uniform_pixels` is requested by the composition.
    pub fn video_encode_args(params: Option<&VideoParams>, uniform_pixels: bool) -> EncodeArgs {
        let encoder = params
            .filter(|p| Self::is_copy_safe_codec(&p.codec))
            .map(|p| Self::encoder_for(&p.codec))
            .unwrap_or("libx264");

        let args = Self::encoder_args(encoder);
        if !uniform_pixels {
            return args;
        }

        let pixel_format = if encoder == "prores_ks" {
            "yuv422p10le"
        } else {
            "yuv420p"
        };
        args.opt("-pix_fmt", pixel_format)
    }

    /// Audio arguments: normalized stereo/48 kHz re-encode, or zero-cost passthrough
    pub fn audio_args(normalize: bool) -> EncodeArgs {
        if normalize {
            EncodeArgs::new()
                .opt("-c:a", "aac")
                .opt("-b:a", "192k")
                .opt("-ac", NORMALIZED_AUDIO_CHANNELS.to_string())
                .opt("-ar", NORMALIZED_AUDIO_SAMPLE_RATE.to_string())
        } else {
            EncodeArgs::new().opt("-c:a", "copy")
        }
    }

    /// Whether an audio stream already matches the normalized composition format
    pub fn is_normalized_audio(params: &AudioParams) -> bool {
        params.codec == "aac"
            && params.channels == NORMALIZED_AUDIO_CHANNELS
            && params.sample_rate_hz == NORMALIZED_AUDIO_SAMPLE_RATE
    }

    /// Encoder name for a source codec family
    pub fn encoder_for(codec: &str) -> &'static str {
        match codec.to_lowercase().as_str() {
            "hevc" | "h265" => "libx265",
            "vp9" => "libvpx-vp9",
            "prores" => "prores_ks",
            _ => "libx264",
        }
    }

    fn encoder_args(encoder: &str) -> EncodeArgs {
        let args = EncodeArgs::new().opt("-c:v", encoder);
        match encoder {
            "libx264" | "libx265" => args.opt("-preset", "veryfast").opt("-crf", "20"),
            "libvpx-vp9" => args.opt("-crf", "32").opt("-b:v", "0"),
            "prores_ks" => args.opt("-profile:v", "2"),
            _ => args,
        }
    }
}

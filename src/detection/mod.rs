//! Face presence, liveness and recognition collaborators.
//!
//! The attendance service only talks to these traits. The models behind them
//! live outside this crate; [`command`] wires them up as external programs.

pub mod command;

use crate::config::{Config, IdentityPolicy, LivenessFallback};
use anyhow::{Result, bail};
use derive_more::Display;
use image::DynamicImage;
use std::sync::Arc;

pub use command::{CommandFaceDetector, CommandLivenessChecker, CommandRecognizer};

#[derive(Debug, Display)]
pub enum DetectionError {
    #[display(fmt = "failed to run {}: {}", program, reason)]
    Spawn { program: String, reason: String },

    #[display(fmt = "{} returned unexpected output: {}", program, output)]
    BadOutput { program: String, output: String },
}

impl std::error::Error for DetectionError {}

/// A submitted photo: the raw bytes as received plus the decoded pixels.
pub struct Photo<'a> {
    pub bytes: &'a [u8],
    pub image: DynamicImage,
}

impl<'a> Photo<'a> {
    /// Decodes `bytes` as JPEG or PNG. `None` when it is not a readable image.
    pub fn decode(bytes: &'a [u8]) -> Option<Self> {
        let image = image::load_from_memory(bytes).ok()?;
        if image.width() == 0 || image.height() == 0 {
            return None;
        }
        Some(Self { bytes, image })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

pub trait FaceDetector: Send + Sync {
    /// Number of faces found in the photo.
    fn count_faces(&self, photo: &Photo<'_>) -> Result<usize, DetectionError>;
}

pub trait LivenessChecker: Send + Sync {
    /// `true` if the photo shows a live subject rather than a print or screen.
    fn is_live(&self, bytes: &[u8]) -> Result<bool, DetectionError>;
}

pub trait FaceRecognizer: Send + Sync {
    /// Name of the person in the photo, `None` when nobody is recognized.
    fn recognize(&self, bytes: &[u8]) -> Result<Option<String>, DetectionError>;
}

/// Permissive checker installed only under [`LivenessFallback::FailOpen`].
pub struct AlwaysLive;

impl LivenessChecker for AlwaysLive {
    fn is_live(&self, _bytes: &[u8]) -> Result<bool, DetectionError> {
        Ok(true)
    }
}

/// What a photo was judged to be by the collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    NoFace,
    Spoof,
    Accepted { recognized: Option<String> },
}

#[derive(Clone)]
pub struct Collaborators {
    pub face_detector: Arc<dyn FaceDetector>,
    pub liveness: Arc<dyn LivenessChecker>,
    pub recognizer: Option<Arc<dyn FaceRecognizer>>,
}

impl Collaborators {
    pub fn from_config(config: &Config) -> Result<Self> {
        let Some(face_cmd) = &config.face_detector_cmd else {
            bail!("FACE_DETECTOR_CMD must be set");
        };
        let face_detector: Arc<dyn FaceDetector> = Arc::new(CommandFaceDetector::parse(face_cmd)?);

        let liveness: Arc<dyn LivenessChecker> = match (&config.liveness_cmd, config.liveness_fallback) {
            (Some(cmd), _) => Arc::new(CommandLivenessChecker::parse(cmd)?),
            (None, LivenessFallback::FailOpen) => {
                tracing::warn!(
                    "LIVENESS_CMD not set and LIVENESS_FALLBACK=fail_open: every photo will be treated as live"
                );
                Arc::new(AlwaysLive)
            }
            (None, LivenessFallback::FailClosed) => {
                bail!("LIVENESS_CMD must be set (or LIVENESS_FALLBACK=fail_open)")
            }
        };

        let recognizer: Option<Arc<dyn FaceRecognizer>> = match (&config.recognizer_cmd, config.identity_policy) {
            (Some(cmd), IdentityPolicy::Recognized) => Some(Arc::new(CommandRecognizer::parse(cmd)?)),
            (None, IdentityPolicy::Recognized) => {
                bail!("RECOGNIZER_CMD must be set when IDENTITY_POLICY=recognized")
            }
            (_, IdentityPolicy::FixedLabel) => None,
        };

        Ok(Self {
            face_detector,
            liveness,
            recognizer,
        })
    }

    /// Runs the checks in order: face presence, liveness, then recognition.
    ///
    /// Blocking; call from a blocking context. Undecodable bytes are judged
    /// [`Verdict::NoFace`].
    pub fn judge(&self, bytes: &[u8]) -> Result<Verdict, DetectionError> {
        let Some(photo) = Photo::decode(bytes) else {
            return Ok(Verdict::NoFace);
        };
        let (width, height) = photo.dimensions();
        tracing::debug!(width, height, "photo decoded");

        if self.face_detector.count_faces(&photo)? == 0 {
            return Ok(Verdict::NoFace);
        }
        if !self.liveness.is_live(bytes)? {
            return Ok(Verdict::Spoof);
        }
        let recognized = match &self.recognizer {
            Some(recognizer) => recognizer.recognize(bytes)?,
            None => None,
        };
        Ok(Verdict::Accepted { recognized })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn undecodable_bytes_are_no_face() {
        let collab = collaborators(1, true);
        assert_eq!(collab.judge(b"definitely not an image").unwrap(), Verdict::NoFace);
    }

    #[test]
    fn zero_faces_is_no_face_and_skips_liveness() {
        let liveness = Arc::new(FixedLiveness::new(true));
        let collab = Collaborators {
            face_detector: Arc::new(FixedFaces(0)),
            liveness: liveness.clone(),
            recognizer: None,
        };
        assert_eq!(collab.judge(&png_bytes()).unwrap(), Verdict::NoFace);
        assert_eq!(liveness.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failed_liveness_is_spoof() {
        let collab = collaborators(1, false);
        assert_eq!(collab.judge(&png_bytes()).unwrap(), Verdict::Spoof);
    }

    #[test]
    fn accepted_carries_recognized_name() {
        let mut collab = collaborators(2, true);
        assert_eq!(
            collab.judge(&png_bytes()).unwrap(),
            Verdict::Accepted { recognized: None }
        );

        collab.recognizer = Some(Arc::new(FixedName(Some("Ada"))));
        assert_eq!(
            collab.judge(&png_bytes()).unwrap(),
            Verdict::Accepted {
                recognized: Some("Ada".into())
            }
        );
    }

    #[test]
    fn detector_failure_propagates() {
        let collab = Collaborators {
            face_detector: Arc::new(BrokenDetector),
            liveness: Arc::new(AlwaysLive),
            recognizer: None,
        };
        assert!(collab.judge(&png_bytes()).is_err());
    }

    #[test]
    fn missing_liveness_fails_closed_by_default() {
        let config = Config::from_lookup(|key| match key {
            "FACE_DETECTOR_CMD" => Some("face-count".into()),
            _ => None,
        })
        .unwrap();
        let err = Collaborators::from_config(&config).err().unwrap();
        assert!(err.to_string().contains("LIVENESS_CMD"));
    }

    #[test]
    fn missing_liveness_fails_open_when_configured() {
        let config = Config::from_lookup(|key| match key {
            "FACE_DETECTOR_CMD" => Some("face-count".into()),
            "LIVENESS_FALLBACK" => Some("fail_open".into()),
            _ => None,
        })
        .unwrap();
        let collab = Collaborators::from_config(&config).unwrap();
        assert!(collab.liveness.is_live(b"anything").unwrap());
        assert!(collab.recognizer.is_none());
    }

    #[test]
    fn recognized_policy_requires_a_recognizer() {
        let config = Config::from_lookup(|key| match key {
            "FACE_DETECTOR_CMD" => Some("face-count".into()),
            "LIVENESS_CMD" => Some("liveness".into()),
            "IDENTITY_POLICY" => Some("recognized".into()),
            _ => None,
        })
        .unwrap();
        assert!(Collaborators::from_config(&config).is_err());
    }

    #[test]
    fn face_detector_is_required() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert!(Collaborators::from_config(&config).is_err());
    }
}

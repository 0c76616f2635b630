// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text recognition with the `ocrs` engine, backed by neural network models
// executed via `rten`.
//
// The engine needs two model files, `text-detection.rten` and
// `text-recognition.rten`. Running `ocrs-cli` once downloads them to
// `$XDG_CACHE_HOME/ocrs`, which is where they are looked for by default.

use std::path::{Path, PathBuf};

use cyberpdf_core::error::{CyberPdfError, Result};
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Locations of the detection and recognition models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrModels {
    pub detection: PathBuf,
    pub recognition: PathBuf,
}

impl Default for OcrModels {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrModels {
    /// Both models inside `dir`, under their usual file names.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection: dir.join(DETECTION_MODEL_FILENAME),
            recognition: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (kind, path) in [("detection", &self.detection), ("recognition", &self.recognition)] {
            if !path.exists() {
                return Err(CyberPdfError::Ocr(format!(
                    "{kind} model not found at {}; run `ocrs-cli` once to download the models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Whether both models are present in the default location.
pub fn models_available() -> bool {
    OcrModels::default().validate().is_ok()
}

/// A loaded OCR engine. Loading the models is the expensive step, so one
/// engine should serve every page of a run.
pub struct OcrEngine {
    engine: OcrsEngine,
}

impl OcrEngine {
    #[instrument(skip_all, fields(detection = %models.detection.display()))]
    pub fn new(models: &OcrModels) -> Result<Self> {
        models.validate()?;

        let load = |path: &Path| {
            Model::load_file(path).map_err(|err| {
                CyberPdfError::Ocr(format!("failed to load model {}: {err}", path.display()))
            })
        };
        let detection_model = load(&models.detection)?;
        let recognition_model = load(&models.recognition)?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| CyberPdfError::Ocr(format!("failed to initialise OCR engine: {err}")))?;

        info!("OCR engine ready");
        Ok(Self { engine })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(&OcrModels::default())
    }

    /// Recognised text of `image`, lines separated by newlines.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn recognize_text(&self, image: &DynamicImage) -> Result<String> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            CyberPdfError::Ocr(format!("bad image source ({width}x{height}): {err}"))
        })?;

        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| CyberPdfError::Ocr(format!("preprocessing failed: {err}")))?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|err| CyberPdfError::Ocr(format!("recognition failed: {err}")))?;

        debug!(lines = text.lines().count(), "image recognised");
        Ok(text)
    }

    /// Recognise each image and join the results with a blank line.
    pub fn recognize_all(&self, images: &[DynamicImage]) -> Result<String> {
        let texts = images
            .iter()
            .map(|image| self.recognize_text(image).map(|t| t.trim().to_string()))
            .collect::<Result<Vec<_>>>()?;
        Ok(texts
            .into_iter()
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn models_from_dir() {
        let models = OcrModels::from_dir("/tmp/my-models");
        assert_eq!(
            models.detection,
            PathBuf::from("/tmp/my-models/text-detection.rten")
        );
        assert_eq!(
            models.recognition,
            PathBuf::from("/tmp/my-models/text-recognition.rten")
        );
    }

    #[test]
    fn missing_models_are_reported() {
        let models = OcrModels::from_dir("/nonexistent/path/ocr-models");
        assert!(matches!(models.validate(), Err(CyberPdfError::Ocr(_))));
        assert!(OcrEngine::new(&models).is_err());
    }
}

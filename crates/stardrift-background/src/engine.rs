//! The rendering engine descriptor and the sources it can be loaded from.
//!
//! The engine is versioned and decides how point brightness maps to
//! glyphs. It is either bundled or fetched from a URL as JSON:
//!
//! ```json
//! { "version": "r128", "ramp": [{ "threshold": 0.02, "glyph": "." }] }
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::chars::{BUNDLED_RAMP, BUNDLED_VERSION};
use crate::loader::{AssetSource, LoadError};

/// One step of the brightness ramp.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RampStep {
    /// Minimum apparent size (in cells) for this glyph.
    pub threshold: f32,
    pub glyph: char,
}

/// Versioned rasterisation parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Engine {
    pub version: String,
    pub ramp: Vec<RampStep>,
}

impl Engine {
    /// The engine compiled into the binary.
    pub fn bundled() -> Self {
        Self {
            version: BUNDLED_VERSION.to_string(),
            ramp: BUNDLED_RAMP
                .iter()
                .map(|&(threshold, glyph)| RampStep { threshold, glyph })
                .collect(),
        }
    }

    /// Parse and validate a JSON descriptor.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let engine: Self =
            serde_json::from_str(json).map_err(|e| LoadError::Parse(e.to_string()))?;
        engine.validate()?;
        Ok(engine)
    }

    /// The ramp must be non-empty with strictly increasing positive thresholds.
    pub fn validate(&self) -> Result<(), LoadError> {
        let Some(first) = self.ramp.first() else {
            return Err(LoadError::Invalid("empty glyph ramp".to_string()));
        };
        if first.threshold.is_nan() || first.threshold <= 0.0 {
            return Err(LoadError::Invalid(format!(
                "ramp threshold {} is not positive",
                first.threshold
            )));
        }
        if let Some(pair) = self
            .ramp
            .windows(2)
            .find(|pair| pair[1].threshold.is_nan() || pair[1].threshold <= pair[0].threshold)
        {
            return Err(LoadError::Invalid(format!(
                "ramp thresholds not increasing at {}",
                pair[1].threshold
            )));
        }
        Ok(())
    }

    /// Brightness of the first ramp step: the dimmest a visible point can be.
    pub fn faintest(&self) -> f32 {
        self.ramp.first().map_or(0.0, |step| step.threshold)
    }

    /// Glyph for a cell of the given brightness, or `None` if it stays empty.
    pub fn glyph_for(&self, intensity: f32) -> Option<char> {
        self.ramp
            .iter()
            .take_while(|step| intensity >= step.threshold)
            .last()
            .map(|step| step.glyph)
    }
}

/// Source for the built-in engine; never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledEngine;

impl AssetSource for BundledEngine {
    type Asset = Engine;

    fn describe(&self) -> String {
        format!("bundled engine {BUNDLED_VERSION}")
    }

    fn fetch(&self) -> Result<Engine, LoadError> {
        Ok(Engine::bundled())
    }
}

/// Source that downloads the engine descriptor over HTTP.
#[derive(Debug, Clone)]
pub struct RemoteEngine {
    url: String,
    timeout: Duration,
}

impl RemoteEngine {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

impl AssetSource for RemoteEngine {
    type Asset = Engine;

    fn describe(&self) -> String {
        format!("engine from {}", self.url)
    }

    fn fetch(&self) -> Result<Engine, LoadError> {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .build()
            .new_agent();

        let body = agent
            .get(&self.url)
            .call()
            .map_err(|e| LoadError::Network(e.to_string()))?
            .body_mut()
            .read_to_string()
            .map_err(|e| LoadError::Network(e.to_string()))?;

        Engine::from_json(&body)
    }
}

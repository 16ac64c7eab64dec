//! Glyph ramp of the bundled rendering engine.

/// Version reported by the bundled engine.
pub const BUNDLED_VERSION: &str = "r128";

/// `(threshold, glyph)` steps from faintest to brightest.
///
/// Thresholds are apparent point sizes in cells. Any projected point shows
/// at least the first step; nearer points reach the brighter ones.
pub const BUNDLED_RAMP: &[(f32, char)] = &[
    (0.02, '.'),
    (0.04, '·'),
    (0.08, '+'),
    (0.16, '*'),
    (0.32, '✧'),
    (0.64, '✦'),
];

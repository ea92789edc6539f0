//! Master volume scaling
//!
//! Every voice plays at `master × asset volume`. Both factors are clamped to
//! be non-negative and the product is pushed to the voice as soon as either
//! changes. There is no ramping: a jump in either factor is heard
//! immediately.

/// Clamp a volume to be non-negative (NaN and infinities count as silence)
pub fn clamp_volume(volume: f32) -> f32 {
    if !volume.is_finite() {
        0.0
    } else {
        volume.max(0.0)
    }
}

/// Volume actually written to a voice; a product that overflows is silenced
pub fn effective_volume(master: f32, asset_volume: f32) -> f32 {
    clamp_volume(master * asset_volume)
}

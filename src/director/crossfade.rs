// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::f64::consts::FRAC_PI_2;

/// Equal-power gains for the outgoing and incoming graphs at `blend`.
pub fn equal_power_gains(blend: f64) -> (f32, f32) {
    let blend = blend.clamp(0.0, 1.0);
    (
        (blend * FRAC_PI_2).cos() as f32,
        ((1.0 - blend) * FRAC_PI_2).cos() as f32,
    )
}

/// Advances a blend factor by one block. A crossfade with no length, or a
/// length that is not a number, completes immediately.
pub fn advance_blend(blend: f64, frames: usize, sample_rate: u32, seconds: f64) -> f64 {
    if !seconds.is_finite() || seconds <= 0.0 || sample_rate == 0 {
        return 1.0;
    }
    (blend + frames as f64 / sample_rate as f64 / seconds).min(1.0)
}

/// Sums the two decks into the output with the given gains.
pub fn mix(out: &mut [f32], a: &[f32], gain_a: f32, b: &[f32], gain_b: f32) {
    for ((out, a), b) in out.iter_mut().zip(a).zip(b) {
        *out = a * gain_a + b * gain_b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_equal_power_endpoints() {
        let (a, b) = equal_power_gains(0.0);
        assert_eq!(a, 1.0);
        assert!(b.abs() < EPSILON);

        let (a, b) = equal_power_gains(1.0);
        assert!(a.abs() < EPSILON);
        assert_eq!(b, 1.0);

        let (a, b) = equal_power_gains(0.5);
        assert!((a - std::f32::consts::FRAC_1_SQRT_2).abs() < EPSILON);
        assert!((b - std::f32::consts::FRAC_1_SQRT_2).abs() < EPSILON);
    }

    #[test]
    fn test_constant_power() {
        for step in 0..=20 {
            let (a, b) = equal_power_gains(step as f64 / 20.0);
            assert!((a * a + b * b - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_advance_blend() {
        // 1 second crossfade at 1000Hz in blocks of 250.
        let mut blend = 0.0;
        for expected in [0.25, 0.5, 0.75, 1.0] {
            blend = advance_blend(blend, 250, 1000, 1.0);
            assert_eq!(blend, expected);
        }
        assert_eq!(advance_blend(0.9, 250, 1000, 1.0), 1.0);
    }

    #[test]
    fn test_zero_length_completes() {
        assert_eq!(advance_blend(0.0, 1, 44100, 0.0), 1.0);
        assert_eq!(advance_blend(0.0, 1, 44100, -2.0), 1.0);
        assert_eq!(advance_blend(0.0, 1, 44100, f64::NAN), 1.0);
    }

    #[test]
    fn test_mix() {
        let mut out = [0.0; 3];
        mix(&mut out, &[1.0, 1.0, 1.0], 0.5, &[2.0, 0.0, -2.0], 0.25);
        assert_eq!(out, [1.0, 0.5, 0.0]);
    }
}

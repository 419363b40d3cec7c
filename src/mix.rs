//! Weighted easing curves.
//!
//! `strength` selects the curve: 1 is linear, 2 quad, 3 cubic, 4 quart, 5 quint.
//! Each `mix*` function has an `unmix*` inverse that recovers the percent from
//! a mixed value.

pub fn mix(start: f64, end: f64, percent: f64, strength: f64) -> f64 {
    mix_in(start, end, percent, strength)
}

pub fn mix_in(start: f64, end: f64, percent: f64, strength: f64) -> f64 {
    percent.powf(strength) * (end - start) + start
}

pub fn mix_out(start: f64, end: f64, percent: f64, strength: f64) -> f64 {
    (1.0 - (1.0 - percent).powf(strength)) * (end - start) + start
}

pub fn mix_in_out(start: f64, end: f64, percent: f64, strength: f64) -> f64 {
    let half = (end - start) / 2.0 + start;
    if percent < 0.5 {
        mix_in(start, half, percent * 2.0, strength)
    } else {
        mix_out(half, end, (percent - 0.5) * 2.0, strength)
    }
}

pub fn mix_out_in(start: f64, end: f64, percent: f64, strength: f64) -> f64 {
    let half = (end - start) / 2.0 + start;
    if percent < 0.5 {
        mix_out(start, half, percent * 2.0, strength)
    } else {
        mix_in(half, end, (percent - 0.5) * 2.0, strength)
    }
}

pub fn unmix(start: f64, end: f64, value: f64, strength: f64) -> f64 {
    unmix_in(start, end, value, strength)
}

pub fn unmix_in(start: f64, end: f64, value: f64, strength: f64) -> f64 {
    ((value - start) / (end - start)).powf(1.0 / strength)
}

pub fn unmix_out(start: f64, end: f64, value: f64, strength: f64) -> f64 {
    1.0 - (1.0 - (value - start) / (end - start)).powf(1.0 / strength)
}

pub fn unmix_in_out(start: f64, end: f64, value: f64, strength: f64) -> f64 {
    let half = (end - start) / 2.0 + start;
    if (value - start).abs() < (half - start).abs() {
        unmix_in(start, half, value, strength) / 2.0
    } else {
        unmix_out(half, end, value, strength) / 2.0 + 0.5
    }
}

pub fn unmix_out_in(start: f64, end: f64, value: f64, strength: f64) -> f64 {
    let half = (end - start) / 2.0 + start;
    if (value - start).abs() < (half - start).abs() {
        unmix_out(start, half, value, strength) / 2.0
    } else {
        unmix_in(half, end, value, strength) / 2.0 + 0.5
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Adaptive sampling policy.
//!
//! Every ingestion response tells the client when to report next. Fast
//! movement tightens the cadence, low battery and explicit optimization
//! modes stretch it. The result is always within [1, 30] seconds.

use crate::models::BatteryOptimization;

/// Hard bounds on the reporting interval, in seconds.
pub const MIN_INTERVAL_SECS: u32 = 1;
pub const MAX_INTERVAL_SECS: u32 = 30;

/// Next reporting interval in seconds.
///
/// `speed_kmh` is the raw wire value (km/h, before the m/s normalization
/// applied to stored samples).
pub fn next_interval(
    battery_level: u8,
    speed_kmh: f64,
    optimization: BatteryOptimization,
) -> u32 {
    // Base interval by speed
    let mut interval: f64 = 5.0;
    if speed_kmh > 80.0 {
        interval = 2.0;
    } else if speed_kmh > 30.0 {
        interval = 3.0;
    } else if speed_kmh < 5.0 {
        interval = 10.0;
    }

    // Battery factor
    if battery_level < 10 {
        interval *= 3.0;
    } else if battery_level < 20 {
        interval *= 2.0;
    } else if battery_level < 50 {
        interval *= 1.5;
    }

    // Optimization mode factor
    interval *= match optimization {
        BatteryOptimization::None => 1.0,
        BatteryOptimization::Low => 1.5,
        BatteryOptimization::Medium => 2.0,
        BatteryOptimization::High => 3.0,
    };

    (interval.round() as u32).clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS)
}

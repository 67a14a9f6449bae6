/*********************************************************************
 * IO-Link Cycle Time
 *
 * Copyright (C) 2023 Marcel Maage
 *
 * This library is free software; you can redistribute it and/or
 * modify it under the terms of the GNU Lesser General Public
 * License as published by the Free Software Foundation; either
 * version 2.1 of the License, or (at your option) any later version.
 *
 * This library is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * LICENSE file for more details.
 */

//! Cycle time encoding of MasterCycleTime and MinCycleTime (Table B.3).
//!
//! ```text
//!  7   6   5   4   3   2   1   0
//! ┌───────┬───────────────────────┐
//! │ base  │      multiplier       │
//! └───────┴───────────────────────┘
//! ```
//!
//! The duration is `offset[base] + multiplier * timebase[base]`.

const TOTAL_TIME_ENCODINGS: usize = 3;
const TIME_BASE_LUT: [u32; TOTAL_TIME_ENCODINGS] = [100, 400, 1600]; // us
const TIME_OFFSET_LUT: [u32; TOTAL_TIME_ENCODINGS] = [0, 6400, 32000]; // us

const TIME_BASE_OFFSET: u8 = 6;
const MULTIPLIER_MASK: u8 = 0x3F;
const MAX_MULTIPLIER: u32 = MULTIPLIER_MASK as u32;

/// Longest encodable cycle time (132.8 ms)
pub const MAX_CYCLE_TIME_US: u32 =
    TIME_OFFSET_LUT[TOTAL_TIME_ENCODINGS - 1] + MAX_MULTIPLIER * TIME_BASE_LUT[TOTAL_TIME_ENCODINGS - 1];

/// Decode a cycle time octet into microseconds.
///
/// Returns `None` for the reserved time base `0b11`.
pub fn decode(encoded: u8) -> Option<u32> {
    let base = usize::from(encoded >> TIME_BASE_OFFSET);
    let multiplier = u32::from(encoded & MULTIPLIER_MASK);
    if base >= TOTAL_TIME_ENCODINGS {
        return None;
    }
    Some(TIME_OFFSET_LUT[base] + multiplier * TIME_BASE_LUT[base])
}

/// Encode a cycle time in microseconds.
///
/// Durations that fall between two steps round up to the next encodable
/// value, so the result never decodes below `cycle_time_us`. Anything above
/// [`MAX_CYCLE_TIME_US`] saturates.
pub fn encode(cycle_time_us: u32) -> u8 {
    for base in 0..TOTAL_TIME_ENCODINGS {
        let offset = TIME_OFFSET_LUT[base];
        let time_base = TIME_BASE_LUT[base];
        if cycle_time_us <= offset + MAX_MULTIPLIER * time_base {
            let multiplier = cycle_time_us.saturating_sub(offset).div_ceil(time_base);
            return ((base as u8) << TIME_BASE_OFFSET) | multiplier as u8;
        }
    }
    ((TOTAL_TIME_ENCODINGS as u8 - 1) << TIME_BASE_OFFSET) | MULTIPLIER_MASK
}

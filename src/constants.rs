// SPDX-License-Identifier: GPL-3.0-only

//! Renderer-wide constants
//!
//! The preprocessing kernel and the radix sort are specialized with the same
//! workgroup size and keys-per-thread values; both read them from here.

/// Invocations per workgroup for the preprocessing kernel and every sort kernel.
///
/// The sort kernels give each invocation one radix bin, so this must equal
/// [`RADIX_BASE`].
pub const WORKGROUP_SIZE: u32 = 256;

/// Keys each sort invocation walks per block.
///
/// One sort block (and one indirect sort workgroup) covers
/// `WORKGROUP_SIZE * SORT_KEYS_PER_THREAD` keys.
pub const SORT_KEYS_PER_THREAD: u32 = 15;

/// Keys covered by one histogram/scatter workgroup
pub const SORT_BLOCK_SIZE: u32 = WORKGROUP_SIZE * SORT_KEYS_PER_THREAD;

/// Bits consumed per radix pass
pub const RADIX_BITS_PER_DIGIT: u32 = 8;

/// Bins per radix pass
pub const RADIX_BASE: u32 = 1 << RADIX_BITS_PER_DIGIT;

/// Passes needed to sort a 32-bit key
pub const RADIX_DIGIT_PLACES: u32 = 32 / RADIX_BITS_PER_DIGIT;

/// Bytes per record in the splat buffer
pub const SPLAT_STRIDE: u64 = 32;

/// Bytes of one device-side counter (sort key count, instance count)
pub const COUNTER_SIZE: u64 = 4;

/// Two triangles per splat quad
pub const VERTICES_PER_SPLAT: u32 = 6;

/// Byte offset of `instance_count` inside the indirect draw arguments
pub const INSTANCE_COUNT_OFFSET: u64 = 4;

/// Highest spherical-harmonics degree the preprocessing kernel evaluates
pub const MAX_SH_DEGREE: u32 = 3;

/// SH coefficients stored per point (degree 3)
pub const SH_COEFF_COUNT: usize = 16;

/// Gaussian scale multiplier a new renderer starts with
pub const DEFAULT_SCALE_MULTIPLIER: f32 = 1.0;

/// Clear color used when no other background is configured
pub const DEFAULT_CLEAR_COLOR: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

// The scatter kernel maps invocation index to radix bin
const _: () = assert!(WORKGROUP_SIZE == RADIX_BASE);
const _: () = assert!(RADIX_DIGIT_PLACES % 2 == 0, "sorted result must land in ping-pong slot 0");

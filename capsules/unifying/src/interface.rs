// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! The capability a board must supply to drive this protocol engine.
//!
//! Unlike this workspace's usual HIL style (e.g.
//! `capsules_core::aes::Aes128Ctr`, which is callback-driven and
//! completes asynchronously), every method here is synchronous: the
//! protocol's timing model assumes `transmit`/`receive` block until the
//! radio has actually done the work, and schedules its own retries and
//! timeouts on top rather than waiting on a completion callback.

use crate::consts;
use crate::error::Result;

/// Everything the engine needs from the board: a radio transceiver, a
/// millisecond clock, and an AES-128 block encryption primitive.
pub trait RadioInterface {
    /// Send `payload` on the currently configured channel/address.
    /// Blocks until the transmission completes or fails.
    fn transmit(&mut self, payload: &[u8]) -> Result<()>;

    /// Copy the oldest received payload into `buffer`, returning the
    /// number of bytes written. Must not block past what's already
    /// buffered by the radio hardware/driver.
    fn receive(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// True if at least one received payload is waiting.
    fn payload_available(&self) -> bool;

    /// Size in bytes of the oldest received payload, if any.
    fn payload_size(&self) -> Option<usize>;

    /// Reconfigure the radio's RF address.
    fn set_address(&mut self, address: &[u8; consts::ADDRESS_LEN]) -> Result<()>;

    /// Reconfigure the radio's RF channel.
    fn set_channel(&mut self, channel: u8) -> Result<()>;

    /// Current time in milliseconds, from a monotonic clock. May wrap.
    fn time(&self) -> u32;

    /// Encrypt one 16-byte AES-128 block in place under `key` (ECB,
    /// single block — CTR-mode keystream generation is built from this
    /// by the caller in `pairing.rs`).
    fn encrypt(
        &mut self,
        key: &[u8; consts::AES_BLOCK_LEN],
        block: &mut [u8; consts::AES_BLOCK_LEN],
    ) -> Result<()>;
}

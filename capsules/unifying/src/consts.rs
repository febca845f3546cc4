// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Protocol constants: sizes, fixed byte tables, and HID++ sub-id/error
//! values. All tables here are read-only and immutable for the lifetime
//! of the process; no synchronization is required to read them.

/// Fraction of the declared timeout that elapses before a keep-alive is
/// emitted.
pub const TIMEOUT_COEFFICIENT_NUM: u32 = 7;
pub const TIMEOUT_COEFFICIENT_DEN: u32 = 8;

/// Per-entry timeout override value meaning "do not change the timeout".
pub const TIMEOUT_UNCHANGED: u16 = 0;

pub const AES_BLOCK_LEN: usize = 16;
pub const AES_NONCE_PREFIX_LEN: usize = 7;
pub const AES_NONCE_SUFFIX_LEN: usize = 5;
pub const AES_DATA_LEN: usize = 8;

pub const CHANNELS_LEN: usize = 25;
pub const PAIRING_CHANNELS_LEN: usize = 11;
pub const ADDRESS_LEN: usize = 5;
pub const MAX_PAYLOAD_LEN: usize = 22;
pub const MAX_NAME_LEN: usize = 16;
pub const KEYS_LEN: usize = 6;

pub const PAIR_REQUEST_1_LEN: usize = 22;
pub const PAIR_RESPONSE_1_LEN: usize = 22;
pub const PAIR_REQUEST_2_LEN: usize = 22;
pub const PAIR_RESPONSE_2_LEN: usize = 22;
pub const PAIR_REQUEST_3_LEN: usize = 22;
pub const PAIR_RESPONSE_3_LEN: usize = 10;
pub const PAIR_COMPLETE_REQUEST_LEN: usize = 10;

pub const WAKE_UP_REQUEST_1_LEN: usize = 22;
pub const WAKE_UP_REQUEST_2_LEN: usize = 10;

pub const SET_TIMEOUT_REQUEST_LEN: usize = 10;
pub const KEEP_ALIVE_REQUEST_LEN: usize = 5;

pub const HIDPP_1_0_SHORT_LEN: usize = 10;
pub const HIDPP_1_0_SHORT_PARAMS_LEN: usize = 4;
pub const HIDPP_1_0_LONG_LEN: usize = 22;
pub const HIDPP_1_0_LONG_PARAMS_LEN: usize = 17;

pub const HIDPP_1_0_SUB_ID_SET_REGISTER: u8 = 0x80;
pub const HIDPP_1_0_SUB_ID_GET_REGISTER: u8 = 0x81;
pub const HIDPP_1_0_SUB_ID_SET_LONG_REGISTER: u8 = 0x82;
pub const HIDPP_1_0_SUB_ID_GET_LONG_REGISTER: u8 = 0x83;
pub const HIDPP_1_0_SUB_ID_ERROR_MSG: u8 = 0x8F;

pub const HIDPP_1_0_ERROR_SUCCESS: u8 = 0x00;
pub const HIDPP_1_0_ERROR_INVALID_SUBID: u8 = 0x01;
pub const HIDPP_1_0_ERROR_INVALID_ADDRESS: u8 = 0x02;
pub const HIDPP_1_0_ERROR_INVALID_VALUE: u8 = 0x03;
pub const HIDPP_1_0_ERROR_CONNECT_FAIL: u8 = 0x04;
pub const HIDPP_1_0_ERROR_TOO_MANY_DEVICES: u8 = 0x05;
pub const HIDPP_1_0_ERROR_ALREADY_EXISTS: u8 = 0x06;
pub const HIDPP_1_0_ERROR_BUSY: u8 = 0x07;
pub const HIDPP_1_0_ERROR_UNKNOWN_DEVICE: u8 = 0x08;
pub const HIDPP_1_0_ERROR_RESOURCE_ERROR: u8 = 0x09;
pub const HIDPP_1_0_ERROR_REQUEST_UNAVAILABLE: u8 = 0x0A;
pub const HIDPP_1_0_ERROR_INVALID_PARAM_VALUE: u8 = 0x0B;
pub const HIDPP_1_0_ERROR_WRONG_PIN_CODE: u8 = 0x0C;

/// The only default timeouts sanctioned by the HID++ 1.0 specification.
pub const DEFAULT_TIMEOUT_KEYBOARD: u16 = 20;
pub const DEFAULT_TIMEOUT_MOUSE: u16 = 8;

pub const ENCRYPTED_KEYSTROKE_REQUEST_LEN: usize = 22;
pub const MOUSE_MOVE_REQUEST_LEN: usize = 10;

/// Frame type markers, tabulated in the wire format section of the
/// codec documentation.
pub const FRAME_PAIR: u8 = 0x5F;
pub const FRAME_PAIR_COMPLETE: u8 = 0x0F;
pub const FRAME_KEEP_ALIVE: u8 = 0x40;
pub const FRAME_SET_TIMEOUT: u8 = 0x4F;
pub const FRAME_HIDPP_SHORT_REQUEST: u8 = 0x10;
pub const FRAME_HIDPP_SHORT_RESPONSE: u8 = 0x50;
pub const FRAME_HIDPP_LONG: u8 = 0x11;
pub const FRAME_ENCRYPTED_KEYSTROKE: u8 = 0xD3;
pub const FRAME_MOUSE: u8 = 0xC2;
pub const FRAME_WAKE_UP_LONG: u8 = 0x51;
pub const FRAME_WAKE_UP_SHORT: u8 = 0x50;

pub const PAIR_STEP_1: u8 = 0x01;
pub const PAIR_STEP_2: u8 = 0x02;
pub const PAIR_STEP_3: u8 = 0x03;
pub const PAIR_STEP_COMPLETE: u8 = 0x06;

pub const PROTOCOL_VERSION: u8 = 0x04;

/// Bitmask used to de-obfuscate an AES key.
pub const AES_KEY_BITMASK: [u8; AES_BLOCK_LEN] = [
    0xFF, 0x00, 0xFF, 0xFF, 0xFF, 0x00, 0xAA, 0xFF, 0xFF, 0xFF, 0x00, 0xFF, 0xFF, 0xAA, 0xFF, 0xFF,
];

/// AES key byte indices used to de-obfuscate an AES key. No OEIS match;
/// appears to be an arbitrary vendor-chosen permutation.
pub const AES_KEY_INDEX: [u8; AES_BLOCK_LEN] = [
    0x07, 0x01, 0x00, 0x03, 0x0A, 0x02, 0x09, 0x0E, 0x08, 0x06, 0x0C, 0x05, 0x0D, 0x0F, 0x04, 0x0B,
];

/// AES nonce that prefixes the AES counter in the IV.
pub const AES_NONCE_PREFIX: [u8; AES_NONCE_PREFIX_LEN] = [0x04, 0x14, 0x1D, 0x1F, 0x27, 0x28, 0x0D];

/// AES nonce that suffixes the AES counter in the IV.
pub const AES_NONCE_SUFFIX: [u8; AES_NONCE_SUFFIX_LEN] = [0x0A, 0x0D, 0x13, 0x26, 0x0E];

/// All RF channels a Unifying receiver listens on during normal
/// operation.
pub const CHANNELS: [u8; CHANNELS_LEN] = [
    5, 8, 11, 14, 17, 20, 23, 26, 29, 32, 35, 38, 41, 44, 47, 50, 53, 56, 59, 62, 65, 68, 71, 74,
    77,
];

/// RF channels a Unifying receiver listens on during pairing.
pub const PAIRING_CHANNELS: [u8; PAIRING_CHANNELS_LEN] =
    [5, 8, 17, 32, 35, 41, 44, 62, 65, 71, 74];

/// Fixed RF address used before a session address is assigned, MSB
/// first.
pub const PAIRING_ADDRESS: [u8; ADDRESS_LEN] = [0xBB, 0x0A, 0xDC, 0xA5, 0x75];

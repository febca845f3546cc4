// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Byte-exact wire frame shapes. Every frame carries a trailing 1-byte
//! checksum computed after all other fields are set; all `unknown_*`
//! regions are zero-filled unless otherwise noted.

use super::{checksum, checksum_verify, uint16_pack, uint16_unpack, uint32_pack, uint32_unpack};
use crate::consts;
use crate::error::{Error, Result};

/// First pairing request, sent by the device.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PairRequest1 {
    pub id: u8,
    pub timeout: u8,
    pub product_id: u16,
    pub device_type: u16,
}

impl PairRequest1 {
    pub fn pack(&self) -> [u8; consts::PAIR_REQUEST_1_LEN] {
        let mut packed = [0u8; consts::PAIR_REQUEST_1_LEN];
        packed[0] = self.id;
        packed[1] = consts::FRAME_PAIR;
        packed[2] = consts::PAIR_STEP_1;
        packed[8] = self.timeout;
        packed[9..11].copy_from_slice(&uint16_pack(self.product_id));
        packed[11] = consts::PROTOCOL_VERSION;
        packed[13..15].copy_from_slice(&uint16_pack(self.device_type));
        packed[20] = 0x01;
        let sum = checksum(&packed[..consts::PAIR_REQUEST_1_LEN - 1]);
        packed[consts::PAIR_REQUEST_1_LEN - 1] = sum;
        packed
    }
}

/// First pairing response, received from the receiver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PairResponse1 {
    pub id: u8,
    pub step: u8,
    pub address: [u8; consts::ADDRESS_LEN],
    pub product_id: u16,
    pub device_type: u16,
}

impl PairResponse1 {
    pub fn unpack(packed: &[u8]) -> Result<Self> {
        if packed.len() != consts::PAIR_RESPONSE_1_LEN {
            return Err(Error::PayloadLengthError);
        }
        if !checksum_verify(packed) {
            return Err(Error::ChecksumError);
        }
        let mut address = [0u8; consts::ADDRESS_LEN];
        address.copy_from_slice(&packed[3..8]);
        Ok(PairResponse1 {
            id: packed[0],
            step: packed[2],
            address,
            product_id: uint16_unpack(&[packed[9], packed[10]]),
            device_type: uint16_unpack(&[packed[13], packed[14]]),
        })
    }
}

/// Second pairing request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PairRequest2 {
    pub crypto: u32,
    pub serial: u32,
    pub capabilities: u16,
}

impl PairRequest2 {
    pub fn pack(&self) -> [u8; consts::PAIR_REQUEST_2_LEN] {
        let mut packed = [0u8; consts::PAIR_REQUEST_2_LEN];
        packed[1] = consts::FRAME_PAIR;
        packed[2] = consts::PAIR_STEP_2;
        packed[3..7].copy_from_slice(&uint32_pack(self.crypto));
        packed[7..11].copy_from_slice(&uint32_pack(self.serial));
        packed[11..13].copy_from_slice(&uint16_pack(self.capabilities));
        packed[20] = 0x01;
        let sum = checksum(&packed[..consts::PAIR_REQUEST_2_LEN - 1]);
        packed[consts::PAIR_REQUEST_2_LEN - 1] = sum;
        packed
    }
}

/// Second pairing response.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PairResponse2 {
    pub step: u8,
    pub crypto: u32,
    pub serial: u32,
    pub capabilities: u16,
}

impl PairResponse2 {
    pub fn unpack(packed: &[u8]) -> Result<Self> {
        if packed.len() != consts::PAIR_RESPONSE_2_LEN {
            return Err(Error::PayloadLengthError);
        }
        if !checksum_verify(packed) {
            return Err(Error::ChecksumError);
        }
        Ok(PairResponse2 {
            step: packed[2],
            crypto: uint32_unpack(&[packed[3], packed[4], packed[5], packed[6]]),
            serial: uint32_unpack(&[packed[7], packed[8], packed[9], packed[10]]),
            capabilities: uint16_unpack(&[packed[11], packed[12]]),
        })
    }
}

/// Third pairing request, carrying the device name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PairRequest3 {
    pub name: [u8; consts::MAX_NAME_LEN],
    pub name_length: u8,
}

impl PairRequest3 {
    pub fn pack(&self) -> [u8; consts::PAIR_REQUEST_3_LEN] {
        let mut packed = [0u8; consts::PAIR_REQUEST_3_LEN];
        packed[1] = consts::FRAME_PAIR;
        packed[2] = consts::PAIR_STEP_3;
        packed[3] = 0x01;
        packed[4] = self.name_length;
        packed[5..5 + consts::MAX_NAME_LEN].copy_from_slice(&self.name);
        let sum = checksum(&packed[..consts::PAIR_REQUEST_3_LEN - 1]);
        packed[consts::PAIR_REQUEST_3_LEN - 1] = sum;
        packed
    }
}

/// Third pairing response; only the step is meaningful.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PairResponse3 {
    pub step: u8,
}

impl PairResponse3 {
    pub fn unpack(packed: &[u8]) -> Result<Self> {
        if packed.len() != consts::PAIR_RESPONSE_3_LEN {
            return Err(Error::PayloadLengthError);
        }
        if !checksum_verify(packed) {
            return Err(Error::ChecksumError);
        }
        Ok(PairResponse3 { step: packed[2] })
    }
}

/// Final request completing the pairing handshake.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct PairComplete;

impl PairComplete {
    pub fn pack(&self) -> [u8; consts::PAIR_COMPLETE_REQUEST_LEN] {
        let mut packed = [0u8; consts::PAIR_COMPLETE_REQUEST_LEN];
        packed[1] = consts::FRAME_PAIR_COMPLETE;
        packed[2] = consts::PAIR_STEP_COMPLETE;
        packed[3] = 0x01;
        let sum = checksum(&packed[..consts::PAIR_COMPLETE_REQUEST_LEN - 1]);
        packed[consts::PAIR_COMPLETE_REQUEST_LEN - 1] = sum;
        packed
    }
}

/// Periodic keep-alive frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KeepAlive {
    pub timeout: u16,
}

impl KeepAlive {
    pub fn pack(&self) -> [u8; consts::KEEP_ALIVE_REQUEST_LEN] {
        let mut packed = [0u8; consts::KEEP_ALIVE_REQUEST_LEN];
        packed[1] = consts::FRAME_KEEP_ALIVE;
        packed[2..4].copy_from_slice(&uint16_pack(self.timeout));
        let sum = checksum(&packed[..consts::KEEP_ALIVE_REQUEST_LEN - 1]);
        packed[consts::KEEP_ALIVE_REQUEST_LEN - 1] = sum;
        packed
    }
}

/// Requests the receiver adopt a new declared timeout.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SetTimeout {
    pub timeout: u16,
}

impl SetTimeout {
    pub fn pack(&self) -> [u8; consts::SET_TIMEOUT_REQUEST_LEN] {
        let mut packed = [0u8; consts::SET_TIMEOUT_REQUEST_LEN];
        packed[1] = consts::FRAME_SET_TIMEOUT;
        packed[3..5].copy_from_slice(&uint16_pack(self.timeout));
        let sum = checksum(&packed[..consts::SET_TIMEOUT_REQUEST_LEN - 1]);
        packed[consts::SET_TIMEOUT_REQUEST_LEN - 1] = sum;
        packed
    }
}

/// Short-form HID++ 1.0 frame, used both for requests (report =
/// [`consts::FRAME_HIDPP_SHORT_REQUEST`]) and responses (report =
/// [`consts::FRAME_HIDPP_SHORT_RESPONSE`]).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HidPp10Short {
    pub report: u8,
    pub index: u8,
    pub sub_id: u8,
    pub params: [u8; consts::HIDPP_1_0_SHORT_PARAMS_LEN],
}

impl HidPp10Short {
    pub fn pack(&self) -> [u8; consts::HIDPP_1_0_SHORT_LEN] {
        let mut packed = [0u8; consts::HIDPP_1_0_SHORT_LEN];
        packed[1] = self.report;
        packed[2] = self.index;
        packed[3] = self.sub_id;
        packed[4..8].copy_from_slice(&self.params);
        let sum = checksum(&packed[..consts::HIDPP_1_0_SHORT_LEN - 1]);
        packed[consts::HIDPP_1_0_SHORT_LEN - 1] = sum;
        packed
    }

    pub fn unpack(packed: &[u8]) -> Result<Self> {
        if packed.len() != consts::HIDPP_1_0_SHORT_LEN {
            return Err(Error::PayloadLengthError);
        }
        if !checksum_verify(packed) {
            return Err(Error::ChecksumError);
        }
        let mut params = [0u8; consts::HIDPP_1_0_SHORT_PARAMS_LEN];
        params.copy_from_slice(&packed[4..8]);
        Ok(HidPp10Short {
            report: packed[1],
            index: packed[2],
            sub_id: packed[3],
            params,
        })
    }
}

/// Long-form HID++ 1.0 frame.
///
/// Note: the checksum is placed at the true trailing byte of this
/// 22-byte frame rather than at byte 9, unlike the historical C
/// implementation this protocol was ported from (which writes the
/// checksum at the short frame's offset, apparently by copy-paste from
/// `unifying_hidpp_1_0_short_pack`). This crate treats that as a bug in
/// the original rather than a feature to preserve.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HidPp10Long {
    pub index: u8,
    pub sub_id: u8,
    pub params: [u8; consts::HIDPP_1_0_LONG_PARAMS_LEN],
}

impl HidPp10Long {
    pub fn pack(&self) -> [u8; consts::HIDPP_1_0_LONG_LEN] {
        let mut packed = [0u8; consts::HIDPP_1_0_LONG_LEN];
        packed[1] = consts::FRAME_HIDPP_LONG;
        packed[2] = self.index;
        packed[3] = self.sub_id;
        packed[4..21].copy_from_slice(&self.params);
        let sum = checksum(&packed[..consts::HIDPP_1_0_LONG_LEN - 1]);
        packed[consts::HIDPP_1_0_LONG_LEN - 1] = sum;
        packed
    }

    pub fn unpack(packed: &[u8]) -> Result<Self> {
        if packed.len() != consts::HIDPP_1_0_LONG_LEN {
            return Err(Error::PayloadLengthError);
        }
        if !checksum_verify(packed) {
            return Err(Error::ChecksumError);
        }
        let mut params = [0u8; consts::HIDPP_1_0_LONG_PARAMS_LEN];
        params.copy_from_slice(&packed[4..21]);
        Ok(HidPp10Long {
            index: packed[2],
            sub_id: packed[3],
            params,
        })
    }
}

/// Encrypted keystroke request. `ciphertext` is the AES-CTR output of
/// the 8-byte plaintext block; `counter` is the AES-CTR counter value
/// used to build the IV for this ciphertext.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EncryptedKeystroke {
    pub ciphertext: [u8; consts::AES_DATA_LEN],
    pub counter: u32,
}

impl EncryptedKeystroke {
    pub fn pack(&self) -> [u8; consts::ENCRYPTED_KEYSTROKE_REQUEST_LEN] {
        let mut packed = [0u8; consts::ENCRYPTED_KEYSTROKE_REQUEST_LEN];
        packed[1] = consts::FRAME_ENCRYPTED_KEYSTROKE;
        packed[2..10].copy_from_slice(&self.ciphertext);
        packed[10..14].copy_from_slice(&uint32_pack(self.counter));
        let sum = checksum(&packed[..consts::ENCRYPTED_KEYSTROKE_REQUEST_LEN - 1]);
        packed[consts::ENCRYPTED_KEYSTROKE_REQUEST_LEN - 1] = sum;
        packed
    }
}

/// Plaintext keyboard-report block encrypted into an
/// [`EncryptedKeystroke`]. Other keystroke kinds (e.g. multimedia usage
/// codes) are not modeled: the original implementation never defined
/// their wire layout either.
///
/// TODO: extend with the other keystroke plaintext shapes if a real
/// multimedia keystroke layout is ever observed on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KeystrokePlaintext {
    pub modifiers: u8,
    pub keys: [u8; consts::KEYS_LEN],
}

impl KeystrokePlaintext {
    pub fn pack(&self) -> [u8; consts::AES_DATA_LEN] {
        let mut packed = [0u8; consts::AES_DATA_LEN];
        packed[0] = self.modifiers;
        packed[1..7].copy_from_slice(&self.keys);
        packed[7] = 0xC9;
        packed
    }
}

/// AES-CTR initialization vector for a keystroke: vendor nonce prefix,
/// the 32-bit counter, vendor nonce suffix.
pub fn keystroke_iv(counter: u32) -> [u8; consts::AES_BLOCK_LEN] {
    let mut iv = [0u8; consts::AES_BLOCK_LEN];
    iv[0..7].copy_from_slice(&consts::AES_NONCE_PREFIX);
    iv[7..11].copy_from_slice(&uint32_pack(counter));
    iv[11..16].copy_from_slice(&consts::AES_NONCE_SUFFIX);
    iv
}

/// Mouse movement/button/wheel report.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MouseMove {
    pub buttons: u8,
    /// Pre-clamped to `[-2048, 2047]` by the caller (see
    /// [`super::clamp_i12`]).
    pub move_x: i16,
    pub move_y: i16,
    pub wheel_x: i8,
    pub wheel_y: i8,
}

impl MouseMove {
    pub fn pack(&self) -> [u8; consts::MOUSE_MOVE_REQUEST_LEN] {
        let mut packed = [0u8; consts::MOUSE_MOVE_REQUEST_LEN];
        packed[1] = consts::FRAME_MOUSE;
        packed[2] = self.buttons;
        let x = self.move_x;
        let y = self.move_y;
        packed[4] = ((x >> 4) & 0xFF) as u8;
        packed[5] = (((x << 4) | (y >> 8)) & 0xFF) as u8;
        packed[6] = (y & 0xFF) as u8;
        packed[7] = self.wheel_x as u8;
        packed[8] = self.wheel_y as u8;
        let sum = checksum(&packed[..consts::MOUSE_MOVE_REQUEST_LEN - 1]);
        packed[consts::MOUSE_MOVE_REQUEST_LEN - 1] = sum;
        packed
    }
}

/// Long-form wake-up frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WakeUp1 {
    pub index: u8,
}

impl WakeUp1 {
    pub fn pack(&self) -> [u8; consts::WAKE_UP_REQUEST_1_LEN] {
        let mut packed = [0u8; consts::WAKE_UP_REQUEST_1_LEN];
        packed[0] = self.index;
        packed[1] = consts::FRAME_WAKE_UP_LONG;
        packed[2] = self.index;
        packed[4] = 0x00;
        packed[5] = 0x01;
        packed[6] = 0x01;
        packed[7] = 0x01;
        let sum = checksum(&packed[..consts::WAKE_UP_REQUEST_1_LEN - 1]);
        packed[consts::WAKE_UP_REQUEST_1_LEN - 1] = sum;
        packed
    }
}

/// Short-form wake-up frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WakeUp2 {
    pub index: u8,
}

impl WakeUp2 {
    pub fn pack(&self) -> [u8; consts::WAKE_UP_REQUEST_2_LEN] {
        let mut packed = [0u8; consts::WAKE_UP_REQUEST_2_LEN];
        packed[0] = self.index;
        packed[1] = consts::FRAME_WAKE_UP_SHORT;
        packed[2] = 0x01;
        packed[3] = 0x4B;
        packed[4] = 0x01;
        let sum = checksum(&packed[..consts::WAKE_UP_REQUEST_2_LEN - 1]);
        packed[consts::WAKE_UP_REQUEST_2_LEN - 1] = sum;
        packed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_request_1_layout() {
        // Scenario 3 of the testable-properties catalog.
        let req = PairRequest1 {
            id: 0x5A,
            timeout: 0x08,
            product_id: 0x1234,
            device_type: 0x0001,
        };
        let packed = req.pack();
        assert_eq!(packed[0], 0x5A);
        assert_eq!(packed[1], 0x5F);
        assert_eq!(packed[2], 0x01);
        assert_eq!(packed[8], 0x08);
        assert_eq!(&packed[9..11], &[0x12, 0x34]);
        assert_eq!(packed[11], 0x04);
        assert_eq!(&packed[13..15], &[0x00, 0x01]);
        assert_eq!(packed[20], 0x01);
        let sum = packed.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        assert_eq!(sum, 0);
    }

    #[test]
    fn pair_response_1_round_trip() {
        let req = PairRequest1 {
            id: 0x5A,
            timeout: 0x08,
            product_id: 0x1234,
            device_type: 0x0001,
        };
        // Build a response by hand with the same layout to check the
        // unpacker reads the right offsets.
        let mut packed = [0u8; consts::PAIR_RESPONSE_1_LEN];
        packed[0] = req.id;
        packed[1] = consts::FRAME_PAIR;
        packed[2] = consts::PAIR_STEP_1;
        packed[3..8].copy_from_slice(&[0x11, 0x22, 0x33, 0x44, 0x55]);
        packed[9..11].copy_from_slice(&[0xAB, 0xCD]);
        packed[13..15].copy_from_slice(&[0x00, 0x02]);
        let sum = checksum(&packed[..consts::PAIR_RESPONSE_1_LEN - 1]);
        packed[consts::PAIR_RESPONSE_1_LEN - 1] = sum;

        let resp = PairResponse1::unpack(&packed).unwrap();
        assert_eq!(resp.id, 0x5A);
        assert_eq!(resp.step, 1);
        assert_eq!(resp.address, [0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(resp.product_id, 0xABCD);
        assert_eq!(resp.device_type, 0x0002);
    }

    #[test]
    fn pair_response_1_rejects_bad_checksum() {
        let mut packed = [0u8; consts::PAIR_RESPONSE_1_LEN];
        packed[1] = consts::FRAME_PAIR;
        packed[consts::PAIR_RESPONSE_1_LEN - 1] = 0xFF;
        assert_eq!(PairResponse1::unpack(&packed), Err(Error::ChecksumError));
    }

    #[test]
    fn pair_response_1_rejects_bad_length() {
        let packed = [0u8; 10];
        assert_eq!(
            PairResponse1::unpack(&packed),
            Err(Error::PayloadLengthError)
        );
    }

    #[test]
    fn keep_alive_checksum_law() {
        let frame = KeepAlive { timeout: 0x0014 };
        assert_eq!(frame.pack(), [0x00, 0x40, 0x00, 0x14, 0xAC]);
    }

    #[test]
    fn hidpp_short_round_trip() {
        let frame = HidPp10Short {
            report: consts::FRAME_HIDPP_SHORT_RESPONSE,
            index: 0x03,
            sub_id: consts::HIDPP_1_0_SUB_ID_ERROR_MSG,
            params: [0x80, consts::HIDPP_1_0_ERROR_INVALID_SUBID, 0x00, 0x00],
        };
        let packed = frame.pack();
        let unpacked = HidPp10Short::unpack(&packed).unwrap();
        assert_eq!(unpacked, frame);
    }

    #[test]
    fn hidpp_long_checksum_at_trailing_byte() {
        let mut params = [0u8; consts::HIDPP_1_0_LONG_PARAMS_LEN];
        params[5] = 0xAB; // lands at packed byte 9, mid-params
        let frame = HidPp10Long {
            index: 0x01,
            sub_id: 0x02,
            params,
        };
        let packed = frame.pack();
        assert_eq!(packed[9], 0xAB); // byte 9 is mid-params, not the checksum
        let sum = packed.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        assert_eq!(sum, 0);
        assert_eq!(HidPp10Long::unpack(&packed).unwrap(), frame);
    }

    #[test]
    fn encrypted_keystroke_counter_field() {
        let frame = EncryptedKeystroke {
            ciphertext: [0xAAu8; consts::AES_DATA_LEN],
            counter: 0x0000_0001,
        };
        let packed = frame.pack();
        assert_eq!(&packed[10..14], &[0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn mouse_move_packs_signed_12_bit_pair() {
        let frame = MouseMove {
            buttons: 0x01,
            move_x: -1,
            move_y: 256,
            wheel_x: 0,
            wheel_y: 0,
        };
        let packed = frame.pack();
        let x = (((packed[4] as i16) << 4) | ((packed[5] as i16) >> 4)) << 4 >> 4;
        let y = (((packed[5] as i16 & 0x0F) << 8) | packed[6] as i16) << 4 >> 4;
        assert_eq!(x, -1);
        assert_eq!(y, 256);
    }
}

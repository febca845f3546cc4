// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Closed error taxonomy for the Unifying protocol engine.

/// Every fallible operation in this crate returns one of these variants.
///
/// The set is closed: callers must not rely on matching a catch-all arm,
/// and this crate must not grow new variants silently (see the open
/// question on HID++ response correctness).
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Pairing name exceeds [`crate::consts::MAX_NAME_LEN`] bytes.
    #[error("device name exceeds the maximum pairing name length")]
    NameLengthError,
    /// The radio refused to set its address.
    #[error("failed to set the radio address")]
    SetAddressError,
    /// The radio refused to set its channel.
    #[error("failed to set the radio channel")]
    SetChannelError,
    /// The radio refused to transmit a payload.
    #[error("failed to transmit a payload")]
    TransmitError,
    /// No payload was available when one was expected.
    #[error("failed to receive a payload")]
    ReceiveError,
    /// A payload's actual length did not match its declared or expected
    /// length.
    #[error("payload length does not match its expected length")]
    PayloadLengthError,
    /// A frame's computed checksum did not match its stated checksum.
    #[error("payload checksum does not match its stated checksum")]
    ChecksumError,
    /// A pairing response carried an unexpected step value.
    #[error("received a pairing response with an unexpected step")]
    PairStepError,
    /// A pairing response carried an id that does not match the request.
    #[error("received a pairing response with a mismatched id")]
    PairIdError,
    /// The AES primitive failed.
    #[error("encryption failed")]
    EncryptionError,
    /// A queue was full when an entry was pushed.
    #[error("buffer is full")]
    BufferFull,
    /// A queue was empty when an entry was popped or peeked.
    #[error("buffer is empty")]
    BufferEmpty,
    /// Failed to create a queue entry.
    #[error("failed to create a buffered entry")]
    CreateError,
}

impl Error {
    /// Stable machine-readable name, matching the on-the-wire debug
    /// vocabulary this protocol's tooling already uses.
    pub const fn name(&self) -> &'static str {
        match self {
            Error::NameLengthError => "NAME_LENGTH_ERROR",
            Error::SetAddressError => "SET_ADDRESS_ERROR",
            Error::SetChannelError => "SET_CHANNEL_ERROR",
            Error::TransmitError => "TRANSMIT_ERROR",
            Error::ReceiveError => "RECEIVE_ERROR",
            Error::PayloadLengthError => "PAYLOAD_LENGTH_ERROR",
            Error::ChecksumError => "CHECKSUM_ERROR",
            Error::PairStepError => "PAIR_STEP_ERROR",
            Error::PairIdError => "PAIR_ID_ERROR",
            Error::EncryptionError => "ENCRYPTION_ERROR",
            Error::BufferFull => "BUFFER_FULL_ERROR",
            Error::BufferEmpty => "BUFFER_EMPTY_ERROR",
            Error::CreateError => "CREATE_ERROR",
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_stable() {
        assert_eq!(Error::PairStepError.name(), "PAIR_STEP_ERROR");
    }

    #[test]
    fn message_matches_spec_example() {
        assert_eq!(
            std::format!("{}", Error::PairStepError),
            "received a pairing response with an unexpected step"
        );
    }
}

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE},
    Engine as _,
};
use std::fmt;
use std::str::FromStr;

use crate::errors::WalletError;

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const FLAG_TESTNET: u8 = 0x80;
const FRIENDLY_LEN: usize = 48;

/// A TON account address: workchain plus 256-bit account id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TonAddress {
    workchain: i8,
    hash: [u8; 32],
}

impl TonAddress {
    pub fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }

    pub fn workchain(&self) -> i8 {
        self.workchain
    }

    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    /// Raw form, `workchain:hex`
    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    /// User-friendly url-safe base64 form
    pub fn to_friendly(&self, bounceable: bool, testnet: bool) -> String {
        let mut tag = if bounceable { TAG_BOUNCEABLE } else { TAG_NON_BOUNCEABLE };
        if testnet {
            tag |= FLAG_TESTNET;
        }

        let mut bytes = Vec::with_capacity(36);
        bytes.push(tag);
        bytes.push(self.workchain as u8);
        bytes.extend_from_slice(&self.hash);
        let crc = crc16_xmodem(&bytes);
        bytes.extend_from_slice(&crc.to_be_bytes());

        URL_SAFE.encode(bytes)
    }

    /// Non-bounceable form, shown to users for their own wallet
    pub fn to_non_bounceable(&self, testnet: bool) -> String {
        self.to_friendly(false, testnet)
    }

    fn parse_raw(s: &str) -> Result<Self, WalletError> {
        let (wc, hash_hex) = s
            .split_once(':')
            .ok_or_else(|| WalletError::InvalidAddress(s.to_string()))?;

        let workchain: i8 = wc
            .parse()
            .map_err(|_| WalletError::InvalidAddress(format!("bad workchain in {}", s)))?;

        let decoded = hex::decode(hash_hex)
            .map_err(|_| WalletError::InvalidAddress(format!("bad hex in {}", s)))?;
        let hash: [u8; 32] = decoded
            .try_into()
            .map_err(|_| WalletError::InvalidAddress(format!("account id must be 32 bytes: {}", s)))?;

        Ok(Self { workchain, hash })
    }

    fn parse_friendly(s: &str) -> Result<Self, WalletError> {
        if s.len() != FRIENDLY_LEN {
            return Err(WalletError::InvalidAddress(format!("unexpected length: {}", s)));
        }

        let normalized = s.replace('-', "+").replace('_', "/");
        let bytes = STANDARD
            .decode(normalized)
            .map_err(|_| WalletError::InvalidAddress(format!("bad base64: {}", s)))?;
        if bytes.len() != 36 {
            return Err(WalletError::InvalidAddress(format!("unexpected length: {}", s)));
        }

        let expected = u16::from_be_bytes([bytes[34], bytes[35]]);
        if crc16_xmodem(&bytes[..34]) != expected {
            return Err(WalletError::InvalidAddress(format!("checksum mismatch: {}", s)));
        }

        let tag = bytes[0] & !FLAG_TESTNET;
        if tag != TAG_BOUNCEABLE && tag != TAG_NON_BOUNCEABLE {
            return Err(WalletError::InvalidAddress(format!("unknown tag {:#04x}: {}", bytes[0], s)));
        }

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[2..34]);

        Ok(Self {
            workchain: bytes[1] as i8,
            hash,
        })
    }
}

impl FromStr for TonAddress {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains(':') {
            Self::parse_raw(s)
        } else {
            Self::parse_friendly(s)
        }
    }
}

impl fmt::Display for TonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw())
    }
}

/// CRC-16/XMODEM (poly 0x1021, init 0)
fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

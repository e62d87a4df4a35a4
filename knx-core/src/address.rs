use crate::error::{KnxError, KnxResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Individual address of a single device on the bus
///
/// An individual address is a 16-bit value split into an area (4 bits),
/// a line (4 bits) and a device number (8 bits), written as
/// "area.line.device". The default value 0.0.0 is the unassigned
/// address used as the source of outgoing telegrams.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct IndividualAddr(u16);

impl IndividualAddr {
    /// Create a new individual address from its three parts
    ///
    /// # Arguments
    ///
    /// * `area` - Area number (0-15)
    /// * `line` - Line number (0-15)
    /// * `device` - Device number (0-255)
    ///
    /// # Returns
    ///
    /// Returns `Ok(IndividualAddr)` if all parts are in range,
    /// `Err(KnxError::InvalidAddress)` otherwise
    pub fn new(area: u8, line: u8, device: u8) -> KnxResult<Self> {
        if area > 0xF {
            return Err(KnxError::InvalidAddress(format!(
                "Area out of range: {}",
                area
            )));
        }
        if line > 0xF {
            return Err(KnxError::InvalidAddress(format!(
                "Line out of range: {}",
                line
            )));
        }
        Ok(Self(
            ((area as u16) << 12) | ((line as u16) << 8) | device as u16,
        ))
    }

    /// Get the area number (upper 4 bits)
    pub fn area(&self) -> u8 {
        (self.0 >> 12) as u8
    }

    /// Get the line number (middle 4 bits)
    pub fn line(&self) -> u8 {
        ((self.0 >> 8) & 0xF) as u8
    }

    /// Get the device number (lower 8 bits)
    pub fn device(&self) -> u8 {
        self.0 as u8
    }

    /// Get the raw 16-bit representation
    pub fn raw(&self) -> u16 {
        self.0
    }
}

impl From<u16> for IndividualAddr {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl fmt::Display for IndividualAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.area(), self.line(), self.device())
    }
}

impl FromStr for IndividualAddr {
    type Err = KnxError;

    fn from_str(s: &str) -> KnxResult<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(KnxError::InvalidAddress(format!(
                "Expected \"area.line.device\", got: {}",
                s
            )));
        }

        let area = parse_part(parts[0])?;
        let line = parse_part(parts[1])?;
        let device = parse_part(parts[2])?;
        Self::new(area, line, device)
    }
}

/// Group address for one-to-many telegrams
///
/// A group address is a 16-bit value in three-level notation: a main
/// group (5 bits), a middle group (3 bits) and a sub group (8 bits),
/// written as "main/middle/sub".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GroupAddr(u16);

impl GroupAddr {
    /// Create a new group address from its three parts
    ///
    /// # Arguments
    ///
    /// * `main` - Main group (0-31)
    /// * `middle` - Middle group (0-7)
    /// * `sub` - Sub group (0-255)
    ///
    /// # Returns
    ///
    /// Returns `Ok(GroupAddr)` if all parts are in range,
    /// `Err(KnxError::InvalidAddress)` otherwise
    pub fn new(main: u8, middle: u8, sub: u8) -> KnxResult<Self> {
        if main > 0x1F {
            return Err(KnxError::InvalidAddress(format!(
                "Main group out of range: {}",
                main
            )));
        }
        if middle > 0x7 {
            return Err(KnxError::InvalidAddress(format!(
                "Middle group out of range: {}",
                middle
            )));
        }
        Ok(Self(
            ((main as u16) << 11) | ((middle as u16) << 8) | sub as u16,
        ))
    }

    /// Get the main group (upper 5 bits)
    pub fn main(&self) -> u8 {
        (self.0 >> 11) as u8
    }

    /// Get the middle group (3 bits)
    pub fn middle(&self) -> u8 {
        ((self.0 >> 8) & 0x7) as u8
    }

    /// Get the sub group (lower 8 bits)
    pub fn sub(&self) -> u8 {
        self.0 as u8
    }

    /// Get the raw 16-bit representation
    pub fn raw(&self) -> u16 {
        self.0
    }
}

impl From<u16> for GroupAddr {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl fmt::Display for GroupAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.main(), self.middle(), self.sub())
    }
}

impl FromStr for GroupAddr {
    type Err = KnxError;

    fn from_str(s: &str) -> KnxResult<Self> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 3 {
            return Err(KnxError::InvalidAddress(format!(
                "Expected \"main/middle/sub\", got: {}",
                s
            )));
        }

        let main = parse_part(parts[0])?;
        let middle = parse_part(parts[1])?;
        let sub = parse_part(parts[2])?;
        Self::new(main, middle, sub)
    }
}

fn parse_part(part: &str) -> KnxResult<u8> {
    part.parse::<u8>()
        .map_err(|_| KnxError::InvalidAddress(format!("Invalid number: {}", part)))
}

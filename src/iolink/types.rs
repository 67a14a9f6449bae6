/*********************************************************************
 * IO-Link Types
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

/// Device mode as seen by the application.
///
/// Ordered so that `Start < Preoperate < Operate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Start,
    Preoperate,
    Operate,
}

/// Internal link state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    WaitWake,       // Waiting for wake-up request
    WaitValidFrame, // Waiting for a valid master message
    RunMode,        // Master started communication with the device
}

/// Transmission rates defined for IO-Link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BaudRate {
    Com1 = 4800,
    Com2 = 38400,
    Com3 = 230400,
}

impl BaudRate {
    pub fn bits_per_second(self) -> u32 {
        self as u32
    }
}

/// Table A.5
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PdStatus {
    Valid = 0,
    Invalid = 1,
}

/// Communication channel addressed by the MC octet (Table A.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Process = 0,
    Page = 1,
    Diagnosis = 2,
    Isdu = 3,
}

impl Channel {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Channel::Process,
            1 => Channel::Page,
            2 => Channel::Diagnosis,
            _ => Channel::Isdu,
        }
    }
}

/// Table A.2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Access {
    Write = 0,
    Read = 1,
}

/// Table A.3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MSeqType {
    Type0 = 0,
    Type1 = 1,
    Type2 = 2,
}

impl MSeqType {
    /// Returns `None` for the reserved code 3.
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0x03 {
            0 => Some(MSeqType::Type0),
            1 => Some(MSeqType::Type1),
            2 => Some(MSeqType::Type2),
            _ => None,
        }
    }
}

/// Master commands written to DP1 address 0x00 (Table B.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MasterCommand {
    Fallback,
    MasterIdent,
    DeviceIdent,
    DeviceStartup,
    PdOutOperate,
    DeviceOperate,
    DevicePreoperate,
}

impl MasterCommand {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            master_command::FALLBACK => Some(MasterCommand::Fallback),
            master_command::MASTER_IDENT => Some(MasterCommand::MasterIdent),
            master_command::DEVICE_IDENT => Some(MasterCommand::DeviceIdent),
            master_command::DEVICE_STARTUP => Some(MasterCommand::DeviceStartup),
            master_command::PD_OUT_OPERATE => Some(MasterCommand::PdOutOperate),
            master_command::DEVICE_OPERATE => Some(MasterCommand::DeviceOperate),
            master_command::DEVICE_PREOPERATE => Some(MasterCommand::DevicePreoperate),
            _ => None,
        }
    }

    /// Mode the device enters after this command, if any.
    pub fn target_mode(self) -> Option<Mode> {
        match self {
            MasterCommand::Fallback => None,
            MasterCommand::MasterIdent
            | MasterCommand::DeviceIdent
            | MasterCommand::DeviceStartup => Some(Mode::Start),
            MasterCommand::DevicePreoperate => Some(Mode::Preoperate),
            MasterCommand::PdOutOperate | MasterCommand::DeviceOperate => Some(Mode::Operate),
        }
    }
}

#[allow(dead_code)]
pub mod master_command {
    pub const FALLBACK: u8 = 0x5A;
    pub const MASTER_IDENT: u8 = 0x95;
    pub const DEVICE_IDENT: u8 = 0x96;
    pub const DEVICE_STARTUP: u8 = 0x97;
    pub const PD_OUT_OPERATE: u8 = 0x98; // ProcessDataOutputOperate
    pub const DEVICE_OPERATE: u8 = 0x99;
    pub const DEVICE_PREOPERATE: u8 = 0x9A;
}

/// MC octet, Figure A.1
#[allow(dead_code)]
pub mod mc_bits {
    pub const ACCESS_OFFSET: u8 = 7;
    pub const CHANNEL_OFFSET: u8 = 5;
    pub const CHANNEL_MASK: u8 = 0x03;
    pub const ADDRESS_MASK: u8 = 0x1F;
}

/// CKT octet, Figure A.2
#[allow(dead_code)]
pub mod ckt_bits {
    pub const MSEQ_TYPE_OFFSET: u8 = 6;
    pub const MSEQ_TYPE_MASK: u8 = 0x03;
    pub const CHECKSUM_MASK: u8 = 0x3F;
}

/// CKS octet, Figure A.3
#[allow(dead_code)]
pub mod cks_bits {
    pub const EVENT_FLAG_OFFSET: u8 = 7;
    pub const PD_STATUS_OFFSET: u8 = 6;
    pub const CHECKSUM_MASK: u8 = 0x3F;
}

/// Direct Parameter Page 1 addresses (Table B.1)
#[allow(dead_code)]
pub mod dp1_addr {
    pub const MASTER_COMMAND: u8 = 0x00;
    pub const MASTER_CYCLE_TIME: u8 = 0x01;
    pub const MIN_CYCLE_TIME: u8 = 0x02;
    pub const MSEQ_CAPABILITY: u8 = 0x03;
    pub const REVISION_ID: u8 = 0x04;
    pub const PROCESS_DATA_IN: u8 = 0x05;
    pub const PROCESS_DATA_OUT: u8 = 0x06;
    pub const VENDOR_ID_1: u8 = 0x07;
    pub const VENDOR_ID_2: u8 = 0x08;
    pub const DEVICE_ID_1: u8 = 0x09;
    pub const DEVICE_ID_2: u8 = 0x0A;
    pub const DEVICE_ID_3: u8 = 0x0B;
    pub const FUNCTION_ID_1: u8 = 0x0C;
    pub const FUNCTION_ID_2: u8 = 0x0D;
    pub const RESERVED: u8 = 0x0E;
    pub const SYSTEM_COMMAND: u8 = 0x0F;
}

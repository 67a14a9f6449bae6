/*********************************************************************
 * IO-Link Direct Parameter Page 1
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

use super::cycle_time;
use super::types::{dp1_addr, MasterCommand};

pub const DP1_SIZE: usize = 16;
const PD_LENGTH_BYTE_FLAG: u8 = 0x80;
const PD_LENGTH_MASK: u8 = 0x1F;

/// Identification registers of DP1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identification {
    pub vendor_id: u16,
    /// 24 bit
    pub device_id: u32,
    pub function_id: u16,
    pub revision_id: u8,
}

impl Default for Identification {
    fn default() -> Self {
        Identification {
            vendor_id: 0,
            device_id: 0,
            function_id: 0,
            revision_id: 0x11,
        }
    }
}

/// Outcome of a page write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PageWrite {
    Command(MasterCommand),
    /// Unknown value written to MasterCommand
    UnknownCommand(u8),
    Accepted,
    /// Read-only or page 2 address
    Ignored,
}

/// ProcessDataIn/ProcessDataOut register value for `len` octets
/// (B.1.6). SIO is always reported as unsupported.
pub fn encode_pd_length(len: usize) -> u8 {
    match len {
        0 => 0,
        1 | 2 => (len * 8) as u8,
        _ => PD_LENGTH_BYTE_FLAG | ((len - 1) as u8 & PD_LENGTH_MASK),
    }
}

/// Number of octets described by a ProcessDataIn/Out register, rounded up.
pub fn decode_pd_length(value: u8) -> usize {
    let length = usize::from(value & PD_LENGTH_MASK);
    if value & PD_LENGTH_BYTE_FLAG != 0 {
        length + 1
    } else {
        length.div_ceil(8)
    }
}

pub struct ParameterPage {
    data: [u8; DP1_SIZE],
}

impl ParameterPage {
    pub fn new(
        ident: &Identification,
        min_cycle_time: u8,
        mseq_capability: u8,
        pd_in_len: usize,
        pd_out_len: usize,
    ) -> Self {
        let mut data = [0; DP1_SIZE];
        let vendor_id = ident.vendor_id.to_be_bytes();
        let device_id = ident.device_id.to_be_bytes();
        let function_id = ident.function_id.to_be_bytes();

        data[usize::from(dp1_addr::MIN_CYCLE_TIME)] = min_cycle_time;
        data[usize::from(dp1_addr::MSEQ_CAPABILITY)] = mseq_capability;
        data[usize::from(dp1_addr::REVISION_ID)] = ident.revision_id;
        data[usize::from(dp1_addr::PROCESS_DATA_IN)] = encode_pd_length(pd_in_len);
        data[usize::from(dp1_addr::PROCESS_DATA_OUT)] = encode_pd_length(pd_out_len);
        data[usize::from(dp1_addr::VENDOR_ID_1)] = vendor_id[0];
        data[usize::from(dp1_addr::VENDOR_ID_2)] = vendor_id[1];
        data[usize::from(dp1_addr::DEVICE_ID_1)] = device_id[1];
        data[usize::from(dp1_addr::DEVICE_ID_2)] = device_id[2];
        data[usize::from(dp1_addr::DEVICE_ID_3)] = device_id[3];
        data[usize::from(dp1_addr::FUNCTION_ID_1)] = function_id[0];
        data[usize::from(dp1_addr::FUNCTION_ID_2)] = function_id[1];
        ParameterPage { data }
    }

    /// Page 2 addresses read as zero.
    pub fn read(&self, address: u8) -> u8 {
        self.data.get(usize::from(address)).copied().unwrap_or(0)
    }

    pub fn write(&mut self, address: u8, value: u8) -> PageWrite {
        match address {
            dp1_addr::MASTER_COMMAND => {
                self.data[usize::from(address)] = value;
                match MasterCommand::from_u8(value) {
                    Some(command) => PageWrite::Command(command),
                    None => PageWrite::UnknownCommand(value),
                }
            }
            dp1_addr::MASTER_CYCLE_TIME | dp1_addr::SYSTEM_COMMAND => {
                self.data[usize::from(address)] = value;
                PageWrite::Accepted
            }
            _ => PageWrite::Ignored,
        }
    }

    /// Negotiated cycle time, `None` until the master wrote a valid value.
    pub fn master_cycle_time_us(&self) -> Option<u32> {
        match self.data[usize::from(dp1_addr::MASTER_CYCLE_TIME)] {
            0 => None,
            encoded => cycle_time::decode(encoded),
        }
    }

    pub fn as_bytes(&self) -> &[u8; DP1_SIZE] {
        &self.data
    }
}

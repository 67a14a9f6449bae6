/*********************************************************************
 * IO-Link Process Data
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

use super::codec::MAX_PD;
use super::types::PdStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PdError {
    /// Process data is only exchanged in operate mode
    NotOperate,
    DataTooLong,
    BufferTooSmall,
}

/// Process data buffers of both directions
pub struct ProcessData {
    pd_in: [u8; MAX_PD],
    pd_in_len: usize,
    pd_in_status: PdStatus,
    pd_out: [u8; MAX_PD],
    pd_out_len: usize,
    pd_out_status: PdStatus,
}

impl ProcessData {
    /// Lengths are validated by the caller.
    pub fn new(pd_in_len: usize, pd_out_len: usize) -> Self {
        ProcessData {
            pd_in: [0; MAX_PD],
            pd_in_len: pd_in_len.min(MAX_PD),
            pd_in_status: PdStatus::Valid,
            pd_out: [0; MAX_PD],
            pd_out_len: pd_out_len.min(MAX_PD),
            pd_out_status: PdStatus::Invalid,
        }
    }

    pub fn pd_in_len(&self) -> usize {
        self.pd_in_len
    }

    pub fn pd_out_len(&self) -> usize {
        self.pd_out_len
    }

    pub fn pd_in(&self) -> &[u8] {
        &self.pd_in[..self.pd_in_len]
    }

    pub fn pd_in_status(&self) -> PdStatus {
        self.pd_in_status
    }

    #[cfg(test)]
    pub fn pd_out_status(&self) -> PdStatus {
        self.pd_out_status
    }

    /// Shorter input leaves the trailing octets unchanged.
    pub fn set_pd_in(&mut self, data: &[u8]) -> Result<(), PdError> {
        if data.len() > self.pd_in_len {
            return Err(PdError::DataTooLong);
        }
        self.pd_in[..data.len()].copy_from_slice(data);
        Ok(())
    }

    pub fn set_pd_in_status(&mut self, status: PdStatus) {
        self.pd_in_status = status;
    }

    pub fn get_pd_out(&self, buffer: &mut [u8]) -> Result<PdStatus, PdError> {
        let target = buffer
            .get_mut(..self.pd_out_len)
            .ok_or(PdError::BufferTooSmall)?;
        target.copy_from_slice(&self.pd_out[..self.pd_out_len]);
        Ok(self.pd_out_status)
    }

    /// Process data received from the master
    pub fn write_pd_out(&mut self, data: &[u8]) {
        let len = data.len().min(self.pd_out_len);
        self.pd_out[..len].copy_from_slice(&data[..len]);
        self.pd_out_status = PdStatus::Valid;
    }

    pub fn invalidate_pd_out(&mut self) {
        self.pd_out_status = PdStatus::Invalid;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status() {
        let pd = ProcessData::new(2, 1);
        assert_eq!(pd.pd_in_status(), PdStatus::Valid);
        assert_eq!(pd.pd_out_status(), PdStatus::Invalid);
        assert_eq!(pd.pd_in(), &[0, 0]);
    }

    #[test]
    fn pd_in_length_checked() {
        let mut pd = ProcessData::new(2, 0);
        assert_eq!(pd.set_pd_in(&[1, 2, 3]), Err(PdError::DataTooLong));
        assert_eq!(pd.pd_in(), &[0, 0]);
        pd.set_pd_in(&[7]).unwrap();
        assert_eq!(pd.pd_in(), &[7, 0]);
        pd.set_pd_in(&[1, 2]).unwrap();
        assert_eq!(pd.pd_in(), &[1, 2]);
    }

    #[test]
    fn pd_out_copy() {
        let mut pd = ProcessData::new(0, 2);
        pd.write_pd_out(&[0xAA, 0x55]);
        let mut small = [0u8; 1];
        assert_eq!(pd.get_pd_out(&mut small), Err(PdError::BufferTooSmall));
        let mut buffer = [0u8; 4];
        assert_eq!(pd.get_pd_out(&mut buffer), Ok(PdStatus::Valid));
        assert_eq!(buffer, [0xAA, 0x55, 0, 0]);
        pd.invalidate_pd_out();
        assert_eq!(pd.get_pd_out(&mut buffer), Ok(PdStatus::Invalid));
    }
}

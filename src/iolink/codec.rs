/*********************************************************************
 * IO-Link Codec
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

use heapless::Vec;

use super::codec_hw_interface::{CodecHwInterface, HwConfig};
use super::types::{cks_bits, ckt_bits, mc_bits, Access, Channel, MSeqType, PdStatus};

pub const MAX_PD: usize = 32;
pub const MAX_OD: usize = 32;
const MC_SIZE: usize = 1;
const CHECKSUM_SIZE: usize = 1;
pub const MAX_MESSAGE_SIZE: usize = MC_SIZE + CHECKSUM_SIZE + MAX_OD + MAX_PD;
/// Offset of the CKT octet in a master message
pub const CKT_OFFSET: usize = 1;

const CHECKSUM_SEED: u8 = 0x52;

/// Master command octet (Figure A.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mc {
    pub access: Access,
    pub channel: Channel,
    pub address: u8,
}

impl Mc {
    pub fn new(access: Access, channel: Channel, address: u8) -> Self {
        Self {
            access,
            channel,
            address: address & mc_bits::ADDRESS_MASK,
        }
    }

    pub fn from_octet(octet: u8) -> Self {
        let access = if (octet >> mc_bits::ACCESS_OFFSET) & 0x01 == 1 {
            Access::Read
        } else {
            Access::Write
        };
        Self {
            access,
            channel: Channel::from_bits((octet >> mc_bits::CHANNEL_OFFSET) & mc_bits::CHANNEL_MASK),
            address: octet & mc_bits::ADDRESS_MASK,
        }
    }

    pub fn octet(&self) -> u8 {
        ((self.access as u8) << mc_bits::ACCESS_OFFSET)
            | ((self.channel as u8 & mc_bits::CHANNEL_MASK) << mc_bits::CHANNEL_OFFSET)
            | (self.address & mc_bits::ADDRESS_MASK)
    }
}

/// M-sequence control and checksum octet of the master message (Figure A.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ckt {
    pub mseq_type: MSeqType,
    pub checksum: u8,
}

impl Ckt {
    /// Returns `None` if the octet announces the reserved M-sequence type.
    pub fn from_octet(octet: u8) -> Option<Self> {
        let mseq_type =
            MSeqType::from_bits((octet >> ckt_bits::MSEQ_TYPE_OFFSET) & ckt_bits::MSEQ_TYPE_MASK)?;
        Some(Self {
            mseq_type,
            checksum: octet & ckt_bits::CHECKSUM_MASK,
        })
    }

    pub fn octet(&self) -> u8 {
        ((self.mseq_type as u8) << ckt_bits::MSEQ_TYPE_OFFSET)
            | (self.checksum & ckt_bits::CHECKSUM_MASK)
    }
}

/// Checksum and status octet of the device message (Figure A.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cks {
    pub event: bool,
    pub pd_status: PdStatus,
    pub checksum: u8,
}

impl Cks {
    pub fn from_octet(octet: u8) -> Self {
        let pd_status = if (octet >> cks_bits::PD_STATUS_OFFSET) & 0x01 == 1 {
            PdStatus::Invalid
        } else {
            PdStatus::Valid
        };
        Self {
            event: (octet >> cks_bits::EVENT_FLAG_OFFSET) & 0x01 == 1,
            pd_status,
            checksum: octet & cks_bits::CHECKSUM_MASK,
        }
    }

    pub fn octet(&self) -> u8 {
        (u8::from(self.event) << cks_bits::EVENT_FLAG_OFFSET)
            | ((self.pd_status as u8) << cks_bits::PD_STATUS_OFFSET)
            | (self.checksum & cks_bits::CHECKSUM_MASK)
    }
}

/// IO-Link checksum (A.1.6).
///
/// The octets are XORed onto the seed 0x52 and the result is compressed
/// to six bits. The checksum bits of CKT/CKS must be zero in `data`.
pub fn calc_checksum(data: &[u8]) -> u8 {
    let ck8 = data.iter().fold(CHECKSUM_SEED, |acc, x| acc ^ x);
    let bit = |n: u8| (ck8 >> n) & 0x01;

    let d5 = bit(7) ^ bit(5) ^ bit(3) ^ bit(1);
    let d4 = bit(6) ^ bit(4) ^ bit(2) ^ bit(0);
    let d3 = bit(7) ^ bit(6);
    let d2 = bit(5) ^ bit(4);
    let d1 = bit(3) ^ bit(2);
    let d0 = bit(1) ^ bit(0);

    (d5 << 5) | (d4 << 4) | (d3 << 3) | (d2 << 2) | (d1 << 1) | d0
}

/// Recompute the checksum of `frame` with the checksum bits at
/// `checksum_offset` cleared and compare it against the received ones.
pub fn checksum_valid(frame: &[u8], checksum_offset: usize) -> bool {
    let Some(&received) = frame.get(checksum_offset) else {
        return false;
    };
    let mut ck8 = CHECKSUM_SEED;
    for (i, x) in frame.iter().enumerate() {
        ck8 ^= if i == checksum_offset {
            x & !ckt_bits::CHECKSUM_MASK
        } else {
            *x
        };
    }
    // calc_checksum applies the seed itself, undo it here
    calc_checksum(&[ck8 ^ CHECKSUM_SEED]) == received & ckt_bits::CHECKSUM_MASK
}

/// Assemble a device message: OD octets, PDIn octets and CKS.
///
/// Returns the number of octets to transmit.
pub fn message_device(
    buffer: &mut [u8],
    od: &[u8],
    pd: &[u8],
    event: bool,
    pd_status: PdStatus,
) -> usize {
    let len = od.len() + pd.len();
    buffer[..od.len()].copy_from_slice(od);
    buffer[od.len()..len].copy_from_slice(pd);
    let cks = Cks {
        event,
        pd_status,
        checksum: 0,
    }
    .octet();
    buffer[len] = cks;
    buffer[len] = cks | calc_checksum(&buffer[..=len]);
    len + CHECKSUM_SIZE
}

/// Assemble a master message: MC, CKT, PDOut octets and OD octets.
///
/// The device never sends these; they are used to drive the link in tests
/// and by tooling that emulates a master.
pub fn message_master(
    buffer: &mut [u8],
    mc: Mc,
    mseq_type: MSeqType,
    pd: &[u8],
    od: &[u8],
) -> usize {
    buffer[0] = mc.octet();
    buffer[CKT_OFFSET] = Ckt {
        mseq_type,
        checksum: 0,
    }
    .octet();
    let pd_start = CKT_OFFSET + 1;
    let od_start = pd_start + pd.len();
    let len = od_start + od.len();
    buffer[pd_start..od_start].copy_from_slice(pd);
    buffer[od_start..len].copy_from_slice(od);
    buffer[CKT_OFFSET] |= calc_checksum(&buffer[..len]);
    len
}

/// Framing faults while receiving a master message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxError {
    /// CKT announced an M-sequence the current mode does not use
    UnexpectedMSeq,
    /// More octets than any M-sequence can carry
    Overrun,
    /// Inter-octet gap exceeded inside a message
    Timeout,
}

pub enum RxEvent {
    /// No complete message yet
    Idle,
    Frame(Vec<u8, MAX_MESSAGE_SIZE>),
    Discarded(RxError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    WaitMc,
    WaitCkt,
    GetData,
}

pub struct CodecConfig {
    pub rx_gap_tbit: u32,
}

impl CodecConfig {
    pub fn rx_gap_tbit(mut self, rx_gap_tbit: u32) -> Self {
        self.rx_gap_tbit = rx_gap_tbit;
        self
    }
}

impl Default for CodecConfig {
    fn default() -> CodecConfig {
        CodecConfig { rx_gap_tbit: 33 }
    }
}

pub struct Codec<SerialInterface> {
    config: CodecConfig,
    hw_interface: SerialInterface,

    rx_buffer: Vec<u8, MAX_MESSAGE_SIZE>,
    rx_expected: usize,
    last_rx_time_in_us: u32,
    stream_state: StreamState,

    tx_buffer: [u8; MAX_MESSAGE_SIZE],

    timeout_max_rx_gap_in_us: Option<u32>,
}

impl<SerialInterface> Codec<SerialInterface>
where
    SerialInterface: CodecHwInterface,
{
    pub fn new(hw_interface: SerialInterface, config: CodecConfig) -> Self {
        Self {
            config,
            hw_interface,
            rx_buffer: Vec::new(),
            rx_expected: 0,
            last_rx_time_in_us: 0,
            stream_state: StreamState::WaitMc,
            tx_buffer: [0; MAX_MESSAGE_SIZE],
            timeout_max_rx_gap_in_us: None,
        }
    }

    /// Configure the transceiver and derive the receive timeouts from the
    /// transmission rate.
    pub fn configure(&mut self, config: &HwConfig) {
        let baudrate = config.baudrate.bits_per_second();
        self.timeout_max_rx_gap_in_us =
            Some(self.config.rx_gap_tbit.saturating_mul(1_000_000) / baudrate);

        self.hw_interface.config_transceiver_pins(&config.pins);
        self.hw_interface.config_uart(config.baudrate);
        self.hw_interface.config_wakeup(config.wakeup_edge);
        self.hw_interface.tx_disable();
        self.reset_data_stream();
        info!("codec start, {} baud", baudrate);
    }

    pub fn is_configured(&self) -> bool {
        self.timeout_max_rx_gap_in_us.is_some()
    }

    pub fn reset_data_stream(&mut self) {
        self.rx_buffer.clear();
        self.rx_expected = 0;
        self.stream_state = StreamState::WaitMc;
    }

    /// Drop everything received so far, including octets still queued in
    /// the transport.
    pub fn flush_rx(&mut self) {
        while self.hw_interface.get_uart_value().is_some() {}
        self.reset_data_stream();
    }

    pub fn is_wakeup_active(&mut self) -> bool {
        self.hw_interface.is_wakeup_active()
    }

    pub fn clear_wakeup(&mut self) {
        self.hw_interface.clear_wakeup();
    }

    pub fn take_wakeup_request(&mut self) -> bool {
        self.hw_interface.take_wakeup_request()
    }

    pub fn micros(&mut self) -> u32 {
        self.hw_interface.micros()
    }

    pub fn get_interface(&mut self) -> &mut SerialInterface {
        &mut self.hw_interface
    }

    /// Drain the receiver until a master message is complete.
    ///
    /// `expected_len` maps the MC and CKT octets to the total message
    /// length, or `None` if the message cannot be handled in the current
    /// state.
    pub fn receive<F>(&mut self, expected_len: F) -> RxEvent
    where
        F: Fn(u8, u8) -> Option<usize>,
    {
        let now = self.hw_interface.micros();
        let mut received = false;

        while let Some(data) = self.hw_interface.get_uart_value() {
            received = true;
            self.last_rx_time_in_us = now;
            if self.rx_buffer.push(data).is_err() {
                self.reset_data_stream();
                return RxEvent::Discarded(RxError::Overrun);
            }

            match self.stream_state {
                StreamState::WaitMc => self.stream_state = StreamState::WaitCkt,
                StreamState::WaitCkt => {
                    match expected_len(self.rx_buffer[0], self.rx_buffer[CKT_OFFSET]) {
                        Some(len) if len <= MAX_MESSAGE_SIZE => {
                            self.rx_expected = len;
                            self.stream_state = StreamState::GetData;
                        }
                        _ => {
                            self.reset_data_stream();
                            return RxEvent::Discarded(RxError::UnexpectedMSeq);
                        }
                    }
                }
                StreamState::GetData => (),
            }

            if StreamState::GetData == self.stream_state && self.rx_buffer.len() >= self.rx_expected
            {
                let frame = core::mem::take(&mut self.rx_buffer);
                self.reset_data_stream();
                return RxEvent::Frame(frame);
            }
        }

        if !received && !self.rx_buffer.is_empty() {
            if let Some(gap) = self.timeout_max_rx_gap_in_us {
                if now.wrapping_sub(self.last_rx_time_in_us) > gap {
                    self.reset_data_stream();
                    return RxEvent::Discarded(RxError::Timeout);
                }
            }
        }
        RxEvent::Idle
    }

    pub fn tx_buffer(&mut self) -> &mut [u8] {
        &mut self.tx_buffer[..]
    }

    pub fn transmit(&mut self, tx_len: usize) {
        self.hw_interface.wait_for_activ_transmission();
        self.hw_interface.tx_enable();
        self.hw_interface.send_uart_data(&self.tx_buffer[..tx_len]);
        self.hw_interface.tx_disable();
        trace!("sent {} octets", tx_len);
    }
}

/*********************************************************************
 * IO-Link Device
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

use super::codec::{Codec, CodecConfig, RxEvent, MAX_PD};
use super::codec_hw_interface::{CodecHwInterface, HwConfig};
use super::data_handling_interface::DataHandlingInterface;
use super::dp1::Identification;
use super::event::{Event, EventError};
use super::link::{Link, LinkAction};
use super::process_data::PdError;
use super::types::{DeviceState, Mode, PdStatus};

const MAX_DEVICE_ID: u32 = 0x00FF_FFFF;
/// Master cycles without a valid message before Operate is given up
const SUPERVISION_CYCLES: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    PdInTooLarge,
    PdOutTooLarge,
    /// DeviceID is 24 bit
    DeviceIdOutOfRange,
}

pub struct DeviceConfig {
    pd_in_len: usize,
    pd_out_len: usize,
    min_cycle_time_us: u32,
    ident: Identification,
    codec_config: CodecConfig,
}

impl DeviceConfig {
    /// `pd_in_len` octets are sent to the master, `pd_out_len` octets are
    /// received from it.
    pub fn new(pd_in_len: usize, pd_out_len: usize, min_cycle_time_us: u32) -> Self {
        DeviceConfig {
            pd_in_len,
            pd_out_len,
            min_cycle_time_us,
            ident: Identification::default(),
            codec_config: CodecConfig::default(),
        }
    }

    pub fn vendor_id(mut self, vendor_id: u16) -> Self {
        self.ident.vendor_id = vendor_id;
        self
    }

    pub fn device_id(mut self, device_id: u32) -> Self {
        self.ident.device_id = device_id;
        self
    }

    pub fn function_id(mut self, function_id: u16) -> Self {
        self.ident.function_id = function_id;
        self
    }

    pub fn revision_id(mut self, revision_id: u8) -> Self {
        self.ident.revision_id = revision_id;
        self
    }

    pub fn rx_gap_tbit(mut self, rx_gap_tbit: u32) -> Self {
        self.codec_config = self.codec_config.rx_gap_tbit(rx_gap_tbit);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pd_in_len > MAX_PD {
            return Err(ConfigError::PdInTooLarge);
        }
        if self.pd_out_len > MAX_PD {
            return Err(ConfigError::PdOutTooLarge);
        }
        if self.ident.device_id > MAX_DEVICE_ID {
            return Err(ConfigError::DeviceIdOutOfRange);
        }
        Ok(())
    }
}

pub struct Device<CodecInterface, DataHandling> {
    codec: Codec<CodecInterface>,
    link: Link,
    data_handling_interface: DataHandling,
    last_message_us: u32,
}

impl<CodecInterface, DataHandling> Device<CodecInterface, DataHandling>
where
    CodecInterface: CodecHwInterface,
    DataHandling: DataHandlingInterface,
{
    pub fn new(
        codec_interface: CodecInterface,
        data_handling_interface: DataHandling,
        config: DeviceConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let link = Link::new(
            &config.ident,
            config.min_cycle_time_us,
            config.pd_in_len,
            config.pd_out_len,
        );
        Ok(Self {
            codec: Codec::new(codec_interface, config.codec_config),
            link,
            data_handling_interface,
            last_message_us: 0,
        })
    }

    /// Configure the transceiver. Nothing is received before this is called.
    pub fn begin(&mut self, hw_config: &HwConfig) {
        self.codec.configure(hw_config);
        self.link.reset();
    }

    /// Poll the transport once. Handles at most one master message.
    pub fn run(&mut self) {
        if !self.codec.is_configured() {
            return;
        }

        let wakeup_request = self.codec.take_wakeup_request();
        let wakeup = self.codec.is_wakeup_active();
        if wakeup_request && self.link.state() != DeviceState::WaitWake {
            // queued octets belong to the new startup
            info!("new wake-up request");
            self.codec.reset_data_stream();
            self.link.reset();
        }

        if self.link.state() == DeviceState::WaitWake {
            if !wakeup {
                self.codec.flush_rx();
                return;
            }
            self.codec.reset_data_stream();
            self.link.wake();
            self.last_message_us = self.codec.micros();
        } else if !wakeup {
            self.codec.reset_data_stream();
            self.link.reset();
            return;
        } else if self.supervision_expired() {
            warn!("no master message within {} cycles", SUPERVISION_CYCLES);
            self.codec.clear_wakeup();
            self.codec.reset_data_stream();
            self.link.reset();
            return;
        }

        loop {
            let link = &self.link;
            match self.codec.receive(|mc, ckt| link.expected_master_len(mc, ckt)) {
                RxEvent::Idle => break,
                RxEvent::Discarded(error) => {
                    warn!("message discarded: {}", error);
                    self.link.resync();
                }
                RxEvent::Frame(frame) => {
                    self.handle_message(&frame[..]);
                    break;
                }
            }
        }
    }

    fn handle_message(&mut self, frame: &[u8]) {
        let Some(exchange) = self.link.process_message(frame, self.codec.tx_buffer()) else {
            return;
        };
        self.codec.transmit(exchange.tx_len);
        self.last_message_us = self.codec.micros();

        if self.link.complete_exchange() == LinkAction::Fallback {
            self.codec.clear_wakeup();
            self.codec.reset_data_stream();
        }
        if exchange.new_cycle && self.link.mode() == Mode::Operate {
            self.data_handling_interface.on_new_cycle(&mut self.link);
        }
        if self.link.take_events_processed() {
            self.data_handling_interface.on_events_processed();
        }
    }

    /// Operate is supervised against the cycle time written by the master.
    fn supervision_expired(&mut self) -> bool {
        if self.link.mode() != Mode::Operate {
            return false;
        }
        let Some(cycle_time_us) = self.link.master_cycle_time_us().filter(|&c| c > 0) else {
            return false;
        };
        let elapsed = self.codec.micros().wrapping_sub(self.last_message_us);
        elapsed > cycle_time_us.saturating_mul(SUPERVISION_CYCLES)
    }

    pub fn mode(&self) -> Mode {
        self.link.mode()
    }

    pub fn state(&self) -> DeviceState {
        self.link.state()
    }

    pub fn get_pd_out(&self, buffer: &mut [u8]) -> Result<PdStatus, PdError> {
        self.link.get_pd_out(buffer)
    }

    pub fn set_pd_in(&mut self, data: &[u8]) -> Result<(), PdError> {
        self.link.set_pd_in(data)
    }

    pub fn set_pd_in_status(&mut self, status: PdStatus) -> Result<(), PdError> {
        self.link.set_pd_in_status(status)
    }

    pub fn set_event(&mut self, event: Event) -> Result<(), EventError> {
        self.link.set_event(event)
    }

    /// Cycle time written by the master during startup
    pub fn master_cycle_time_us(&self) -> Option<u32> {
        self.link.master_cycle_time_us()
    }

    pub fn link(&mut self) -> &mut Link {
        &mut self.link
    }

    pub fn get_interface(&mut self) -> &mut CodecInterface {
        self.codec.get_interface()
    }

    pub fn data_handling(&mut self) -> &mut DataHandling {
        &mut self.data_handling_interface
    }
}

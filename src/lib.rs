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

//! Device side of the IO-Link data link layer (IEC 61131-9).
//!
//! The [`Device`] answers master messages on a half-duplex UART: startup,
//! preoperate and operate M-sequences, Direct Parameter Page 1, process
//! data and the event memory. The transport is abstracted by
//! [`CodecHwInterface`]; [`IolHwInterface`] implements it for
//! embedded-hal serial ports.
//!
//! ```ignore
//! static WAKEUP: WakeSignal = WakeSignal::new();
//!
//! struct Sensor;
//!
//! impl DataHandlingInterface for Sensor {
//!     fn on_new_cycle(&mut self, link: &mut Link) {
//!         let mut pd_out = [0u8; 1];
//!         if let Ok(PdStatus::Valid) = link.get_pd_out(&mut pd_out) {
//!             link.set_pd_in(&pd_out).ok();
//!         }
//!     }
//! }
//!
//! let hw = IolHwInterface::new(serial, tx_en, &WAKEUP);
//! let config = DeviceConfig::new(1, 1, 50_000).vendor_id(0x0815).device_id(0x000042);
//! let mut device = Device::new(hw, Sensor, config)?;
//! device.begin(&HwConfig::new(BaudRate::Com2, WakeupEdge::Falling, 4, 5));
//! loop {
//!     device.run();
//! }
//! ```
#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// must be first, the other modules use its macros
#[macro_use]
mod fmt;

pub mod iol_interface;
pub mod iolink;

pub use iol_interface::{IolHwInterface, WakeSignal};
pub use iolink::{
    BaudRate, CodecHwInterface, ConfigError, DataHandlingInterface, Device, DeviceConfig,
    DeviceState, Event, EventError, EventInstance, EventMode, EventType, HwConfig, Link, Mode,
    PdError, PdStatus, WakeupEdge,
};

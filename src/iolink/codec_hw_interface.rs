/*********************************************************************
 * HwInterface
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

use super::types::BaudRate;

/// Edge of the transceiver wake-up output that signals a wake-up request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeupEdge {
    Falling,
    Rising,
}

/// Pin assignment handed to the platform adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig {
    pub tx_en: u8,
    pub wakeup: u8,
    /// Only needed on platforms with a routable UART
    pub tx: Option<u8>,
    pub rx: Option<u8>,
}

/// Hardware configuration consumed by `Device::begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwConfig {
    pub baudrate: BaudRate,
    pub wakeup_edge: WakeupEdge,
    pub pins: PinConfig,
}

impl HwConfig {
    pub fn new(baudrate: BaudRate, wakeup_edge: WakeupEdge, tx_en: u8, wakeup: u8) -> Self {
        HwConfig {
            baudrate,
            wakeup_edge,
            pins: PinConfig {
                tx_en,
                wakeup,
                tx: None,
                rx: None,
            },
        }
    }

    pub fn uart_pins(mut self, tx: u8, rx: u8) -> Self {
        self.pins.tx = Some(tx);
        self.pins.rx = Some(rx);
        self
    }
}

/// Transport capabilities the device engine relies on.
///
/// Reads never block. The wake-up state is a latch set from the wake-up
/// interrupt and cleared by [`CodecHwInterface::clear_wakeup`]. Each wake-up
/// pulse additionally raises a request that the engine consumes once with
/// [`CodecHwInterface::take_wakeup_request`].
pub trait CodecHwInterface {
    fn config_uart(&mut self, _baudrate: BaudRate) {}

    fn config_transceiver_pins(&mut self, _pins: &PinConfig) {}

    fn config_wakeup(&mut self, _edge: WakeupEdge) {}

    fn wait_for_activ_transmission(&mut self) {}

    fn tx_enable(&mut self) {}

    fn tx_disable(&mut self) {}

    fn get_uart_value(&mut self) -> Option<u8> {
        None
    }

    fn send_uart_data(&mut self, _value: &[u8]) {}

    fn is_wakeup_active(&mut self) -> bool {
        false
    }

    fn clear_wakeup(&mut self) {}

    /// Returns `true` once per wake-up pulse seen since the last call.
    fn take_wakeup_request(&mut self) -> bool {
        false
    }

    /// Free running microsecond counter; a constant value disables the
    /// inter-octet gap supervision.
    fn micros(&mut self) -> u32 {
        0
    }
}

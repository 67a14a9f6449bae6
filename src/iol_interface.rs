/*********************************************************************
 * IOL Interface
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

use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::digital::v2::OutputPin;
use embedded_hal::serial::{Read, Write};

use crate::iolink::{CodecHwInterface, PinConfig};

/// Wake-up latch shared with the transceiver interrupt.
///
/// ```ignore
/// static WAKEUP: WakeSignal = WakeSignal::new();
///
/// #[interrupt]
/// fn EXTI0() {
///     WAKEUP.signal();
/// }
/// ```
pub struct WakeSignal {
    active: AtomicBool,
    /// Set by every pulse, consumed by the device
    request: AtomicBool,
}

impl WakeSignal {
    pub const fn new() -> Self {
        WakeSignal {
            active: AtomicBool::new(false),
            request: AtomicBool::new(false),
        }
    }

    pub fn signal(&self) {
        self.active.store(true, Ordering::Release);
        self.request.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.active.store(false, Ordering::Release);
        self.request.store(false, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn take_request(&self) -> bool {
        self.request.swap(false, Ordering::AcqRel)
    }
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// `CodecHwInterface` on top of an embedded-hal UART and the TX enable pin
/// of the IO-Link transceiver.
pub struct IolHwInterface<'a, Serial, TxEn> {
    serial: Serial,
    tx_en: TxEn,
    wakeup: &'a WakeSignal,
    micros: Option<fn() -> u32>,
}

impl<'a, Serial, TxEn> IolHwInterface<'a, Serial, TxEn> {
    pub fn new(serial: Serial, tx_en: TxEn, wakeup: &'a WakeSignal) -> Self {
        IolHwInterface {
            serial,
            tx_en,
            wakeup,
            micros: None,
        }
    }

    /// Enables the inter-octet gap supervision.
    pub fn with_micros(mut self, micros: fn() -> u32) -> Self {
        self.micros = Some(micros);
        self
    }

    pub fn release(self) -> (Serial, TxEn) {
        (self.serial, self.tx_en)
    }
}

impl<'a, Serial, TxEn> CodecHwInterface for IolHwInterface<'a, Serial, TxEn>
where
    Serial: Read<u8> + Write<u8>,
    TxEn: OutputPin,
{
    fn config_transceiver_pins(&mut self, _pins: &PinConfig) {
        self.tx_en.set_low().ok();
    }

    fn wait_for_activ_transmission(&mut self) {
        nb::block!(self.serial.flush()).ok();
    }

    fn tx_enable(&mut self) {
        self.tx_en.set_high().ok();
    }

    fn tx_disable(&mut self) {
        self.tx_en.set_low().ok();
    }

    fn get_uart_value(&mut self) -> Option<u8> {
        match self.serial.read() {
            Ok(value) => Some(value),
            Err(nb::Error::WouldBlock) => None,
            Err(nb::Error::Other(_)) => {
                warn!("uart receive error");
                None
            }
        }
    }

    fn send_uart_data(&mut self, value: &[u8]) {
        for octet in value {
            if nb::block!(self.serial.write(*octet)).is_err() {
                warn!("uart transmit error");
                return;
            }
        }
        // the driver must stay enabled until the last stop bit is out
        nb::block!(self.serial.flush()).ok();
    }

    fn is_wakeup_active(&mut self) -> bool {
        self.wakeup.is_set()
    }

    fn clear_wakeup(&mut self) {
        self.wakeup.clear();
    }

    fn take_wakeup_request(&mut self) -> bool {
        self.wakeup.take_request()
    }

    fn micros(&mut self) -> u32 {
        self.micros.map_or(0, |micros| micros())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::vec::Vec;

    #[derive(Default)]
    struct Bus {
        tx_en: bool,
        rx: VecDeque<nb::Result<u8, ()>>,
        written: Vec<(u8, bool)>,
        flushes: usize,
    }

    struct MockSerial(Rc<RefCell<Bus>>);
    struct MockPin(Rc<RefCell<Bus>>);

    impl Read<u8> for MockSerial {
        type Error = ();

        fn read(&mut self) -> nb::Result<u8, ()> {
            self.0
                .borrow_mut()
                .rx
                .pop_front()
                .unwrap_or(Err(nb::Error::WouldBlock))
        }
    }

    impl Write<u8> for MockSerial {
        type Error = ();

        fn write(&mut self, word: u8) -> nb::Result<(), ()> {
            let mut bus = self.0.borrow_mut();
            let tx_en = bus.tx_en;
            bus.written.push((word, tx_en));
            Ok(())
        }

        fn flush(&mut self) -> nb::Result<(), ()> {
            self.0.borrow_mut().flushes += 1;
            Ok(())
        }
    }

    impl OutputPin for MockPin {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().tx_en = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().tx_en = true;
            Ok(())
        }
    }

    fn interface(wakeup: &WakeSignal) -> (IolHwInterface<'_, MockSerial, MockPin>, Rc<RefCell<Bus>>) {
        let bus = Rc::new(RefCell::new(Bus::default()));
        let hw = IolHwInterface::new(MockSerial(bus.clone()), MockPin(bus.clone()), wakeup);
        (hw, bus)
    }

    #[test]
    fn wake_signal_latches() {
        let signal = WakeSignal::new();
        assert!(!signal.is_set());
        signal.signal();
        signal.signal();
        assert!(signal.is_set());
        signal.clear();
        assert!(!signal.is_set());
    }

    #[test]
    fn wakeup_follows_signal() {
        let signal = WakeSignal::new();
        let (mut hw, _bus) = interface(&signal);
        assert!(!hw.is_wakeup_active());
        signal.signal();
        assert!(hw.is_wakeup_active());
        hw.clear_wakeup();
        assert!(!signal.is_set());
    }

    #[test]
    fn each_pulse_is_one_request() {
        let signal = WakeSignal::new();
        let (mut hw, _bus) = interface(&signal);
        assert!(!hw.take_wakeup_request());
        signal.signal();
        assert!(hw.take_wakeup_request());
        assert!(!hw.take_wakeup_request());
        assert!(hw.is_wakeup_active());

        // pulse while the latch is still set
        signal.signal();
        assert!(hw.take_wakeup_request());

        signal.signal();
        hw.clear_wakeup();
        assert!(!hw.take_wakeup_request());
    }

    #[test]
    fn receive_is_non_blocking() {
        let signal = WakeSignal::new();
        let (mut hw, bus) = interface(&signal);
        bus.borrow_mut().rx.extend([Ok(0xA2), Err(nb::Error::Other(())), Ok(0x00)]);
        assert_eq!(hw.get_uart_value(), Some(0xA2));
        assert_eq!(hw.get_uart_value(), None);
        assert_eq!(hw.get_uart_value(), Some(0x00));
        assert_eq!(hw.get_uart_value(), None);
    }

    #[test]
    fn transmit_drives_tx_enable() {
        let signal = WakeSignal::new();
        let (mut hw, bus) = interface(&signal);
        hw.tx_enable();
        hw.send_uart_data(&[0x8C, 0x35]);
        hw.tx_disable();
        let bus = bus.borrow();
        assert_eq!(bus.written, [(0x8C, true), (0x35, true)]);
        assert!(!bus.tx_en);
        assert_eq!(bus.flushes, 1);
    }

    #[test]
    fn micros_source_is_optional() {
        let signal = WakeSignal::new();
        let (mut hw, _bus) = interface(&signal);
        assert_eq!(hw.micros(), 0);
        let mut hw = hw.with_micros(|| 1234);
        assert_eq!(hw.micros(), 1234);
    }
}

/*********************************************************************
 * IO-Link Data Link Layer
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

use super::codec::{checksum_valid, message_device, CKT_OFFSET, MAX_OD};
use super::cycle_time;
use super::dp1::{Identification, PageWrite, ParameterPage};
use super::event::{Event, EventError, EventMemory};
use super::mseq::{mseq_capability, MSeqLayout, MasterMessage};
use super::process_data::{PdError, ProcessData};
use super::types::{Access, Channel, DeviceState, MSeqType, MasterCommand, Mode, PdStatus};

/// Result of a handled master message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    /// Octets of the device message in the transmit buffer
    pub tx_len: usize,
    /// The message belonged to an operate cycle
    pub new_cycle: bool,
}

/// Follow-up once the device message is on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    None,
    /// Fallback: release the wake-up latch
    Fallback,
}

/// Protocol state of the device: mode, DP1, process data and event memory.
///
/// Handed to the application in [`DataHandlingInterface::on_new_cycle`].
///
/// [`DataHandlingInterface::on_new_cycle`]: super::data_handling_interface::DataHandlingInterface::on_new_cycle
pub struct Link {
    state: DeviceState,
    mode: Mode,
    layout: MSeqLayout,
    pending_command: Option<MasterCommand>,
    page: ParameterPage,
    process_data: ProcessData,
    events: EventMemory,
}

impl Link {
    pub fn new(
        ident: &Identification,
        min_cycle_time_us: u32,
        pd_in_len: usize,
        pd_out_len: usize,
    ) -> Self {
        let page = ParameterPage::new(
            ident,
            cycle_time::encode(min_cycle_time_us),
            mseq_capability(pd_in_len, pd_out_len, false),
            pd_in_len,
            pd_out_len,
        );
        Link {
            state: DeviceState::WaitWake,
            mode: Mode::Start,
            layout: MSeqLayout::for_mode(Mode::Start, pd_in_len, pd_out_len),
            pending_command: None,
            page,
            process_data: ProcessData::new(pd_in_len, pd_out_len),
            events: EventMemory::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn layout(&self) -> &MSeqLayout {
        &self.layout
    }

    pub fn parameter_page(&self) -> &ParameterPage {
        &self.page
    }

    pub fn master_cycle_time_us(&self) -> Option<u32> {
        self.page.master_cycle_time_us()
    }

    pub fn get_pd_out(&self, buffer: &mut [u8]) -> Result<PdStatus, PdError> {
        self.require_operate()?;
        self.process_data.get_pd_out(buffer)
    }

    pub fn set_pd_in(&mut self, data: &[u8]) -> Result<(), PdError> {
        self.require_operate()?;
        self.process_data.set_pd_in(data)
    }

    pub fn set_pd_in_status(&mut self, status: PdStatus) -> Result<(), PdError> {
        self.require_operate()?;
        self.process_data.set_pd_in_status(status);
        Ok(())
    }

    pub fn set_event(&mut self, event: Event) -> Result<(), EventError> {
        self.events.set_event(event)
    }

    pub fn events_pending(&self) -> bool {
        self.events.pending()
    }

    fn require_operate(&self) -> Result<(), PdError> {
        if self.mode == Mode::Operate {
            Ok(())
        } else {
            Err(PdError::NotOperate)
        }
    }

    /// Wake-up request detected
    pub fn wake(&mut self) {
        if self.state == DeviceState::WaitWake {
            info!("wake-up");
            self.state = DeviceState::WaitValidFrame;
        }
    }

    /// Wake-up lost or Fallback: back to the power-up state
    pub fn reset(&mut self) {
        if self.state != DeviceState::WaitWake || self.mode != Mode::Start {
            info!("communication lost, back to startup");
        }
        self.state = DeviceState::WaitWake;
        self.pending_command = None;
        self.process_data.invalidate_pd_out();
        self.events.abort_read();
        self.set_mode(Mode::Start);
    }

    /// Framing fault: wait for the next valid message
    pub fn resync(&mut self) {
        if self.state == DeviceState::RunMode {
            self.state = DeviceState::WaitValidFrame;
        }
    }

    /// Length of the master message that starts with `mc` and `ckt`.
    pub fn expected_master_len(&self, mc: u8, ckt: u8) -> Option<usize> {
        if self.state == DeviceState::WaitWake {
            return None;
        }
        self.layout.expected_master_len(mc, ckt)
    }

    /// Handle a complete master message and assemble the device message in
    /// `tx_buffer`.
    ///
    /// Returns `None` if the message is discarded; no response is sent then.
    pub fn process_message(&mut self, frame: &[u8], tx_buffer: &mut [u8]) -> Option<Exchange> {
        if !checksum_valid(frame, CKT_OFFSET) {
            warn!("checksum mismatch, message discarded");
            return None;
        }
        let layout = self.layout;
        let Some(message) = MasterMessage::parse(frame, &layout) else {
            warn!("unexpected message length {}", frame.len());
            return None;
        };

        if self.state == DeviceState::WaitValidFrame {
            debug!("first valid message");
            self.state = DeviceState::RunMode;
        }
        let new_cycle = self.mode == Mode::Operate;

        if layout.mseq_type == MSeqType::Type2 {
            self.process_data.write_pd_out(message.pd_out);
        }

        let mc = message.mc;
        let od_len = match mc.access {
            Access::Read => layout.od_len,
            Access::Write => 0,
        };
        let mut od = [0u8; MAX_OD];
        match (mc.channel, mc.access) {
            (Channel::Page, Access::Read) => od[0] = self.page.read(mc.address),
            (Channel::Page, Access::Write) => {
                let value = message.od.first().copied().unwrap_or(0);
                self.page_write(mc.address, value);
            }
            (Channel::Diagnosis, Access::Read) => {
                self.events.read(mc.address, &mut od[..od_len]);
            }
            (Channel::Diagnosis, Access::Write) => {
                if mc.address == 0 {
                    self.events.confirm();
                }
            }
            // no on-request data on the process channel, ISDU unsupported
            (Channel::Process, _) | (Channel::Isdu, _) => (),
        }

        let (pd_in, pd_status) = match layout.mseq_type {
            MSeqType::Type2 => (
                self.process_data.pd_in(),
                self.process_data.pd_in_status(),
            ),
            _ => (&[][..], PdStatus::Valid),
        };
        let tx_len = message_device(
            tx_buffer,
            &od[..od_len],
            pd_in,
            self.events.pending(),
            pd_status,
        );
        Some(Exchange { tx_len, new_cycle })
    }

    fn page_write(&mut self, address: u8, value: u8) {
        match self.page.write(address, value) {
            PageWrite::Command(command) => {
                debug!("master command {:x}", value);
                self.pending_command = Some(command);
            }
            PageWrite::UnknownCommand(value) => warn!("unknown master command {:x}", value),
            PageWrite::Accepted => trace!("page write {:x} = {:x}", address, value),
            PageWrite::Ignored => debug!("write to read-only page address {:x}", address),
        }
    }

    /// Apply the master command of the last message. Called once its
    /// response has been transmitted.
    pub fn complete_exchange(&mut self) -> LinkAction {
        let Some(command) = self.pending_command.take() else {
            return LinkAction::None;
        };
        match command.target_mode() {
            None => {
                info!("fallback");
                self.reset();
                LinkAction::Fallback
            }
            Some(target) if target > self.mode => {
                self.set_mode(target);
                LinkAction::None
            }
            Some(target) => {
                if target < self.mode {
                    warn!("master command {} ignored in {}", command, self.mode);
                }
                LinkAction::None
            }
        }
    }

    pub fn take_events_processed(&mut self) -> bool {
        self.events.take_processed()
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            info!("mode {} -> {}", self.mode, mode);
        }
        self.mode = mode;
        self.layout = MSeqLayout::for_mode(
            mode,
            self.process_data.pd_in_len(),
            self.process_data.pd_out_len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iolink::codec::{message_master, Cks, Mc, MAX_MESSAGE_SIZE};
    use crate::iolink::event::{EventInstance, EventMode, EventType};
    use crate::iolink::types::{dp1_addr, master_command};

    struct Harness {
        link: Link,
        tx: [u8; MAX_MESSAGE_SIZE],
    }

    impl Harness {
        fn new(pd_in: usize, pd_out: usize) -> Self {
            let mut link = Link::new(&Identification::default(), 50_000, pd_in, pd_out);
            link.wake();
            Harness {
                link,
                tx: [0; MAX_MESSAGE_SIZE],
            }
        }

        fn exchange(&mut self, mc: Mc, pd: &[u8], od: &[u8]) -> Option<std::vec::Vec<u8>> {
            let mut frame = [0u8; MAX_MESSAGE_SIZE];
            let layout = *self.link.layout();
            let len = message_master(&mut frame, mc, layout.mseq_type, pd, od);
            let exchange = self.link.process_message(&frame[..len], &mut self.tx)?;
            self.link.complete_exchange();
            Some(self.tx[..exchange.tx_len].to_vec())
        }

        fn command(&mut self, command: u8) {
            let od_len = self.link.layout().od_len;
            let pd_len = self.link.layout().pd_out_len;
            let mut od = std::vec![0u8; od_len];
            od[0] = command;
            let pd = std::vec![0u8; pd_len];
            self.exchange(
                Mc::new(Access::Write, Channel::Page, dp1_addr::MASTER_COMMAND),
                &pd,
                &od,
            )
            .unwrap();
        }

        fn to_operate(&mut self) {
            self.command(master_command::DEVICE_PREOPERATE);
            self.command(master_command::DEVICE_OPERATE);
        }
    }

    fn warning(code: u16) -> Event {
        Event::new(
            EventInstance::Application,
            EventType::Warning,
            EventMode::Appears,
            code,
        )
    }

    #[test]
    fn initial_state() {
        let link = Link::new(&Identification::default(), 50_000, 1, 1);
        assert_eq!(link.state(), DeviceState::WaitWake);
        assert_eq!(link.mode(), Mode::Start);
        assert_eq!(link.parameter_page().read(dp1_addr::MIN_CYCLE_TIME), 0x8C);
        assert_eq!(link.parameter_page().read(dp1_addr::MSEQ_CAPABILITY), 0x2A);
        assert_eq!(link.expected_master_len(0xA2, 0x00), None);
    }

    #[test]
    fn process_data_gated_outside_operate() {
        let mut link = Link::new(&Identification::default(), 50_000, 1, 1);
        let mut buffer = [0u8; 1];
        assert_eq!(link.get_pd_out(&mut buffer), Err(PdError::NotOperate));
        assert_eq!(link.set_pd_in(&[1]), Err(PdError::NotOperate));
        assert_eq!(
            link.set_pd_in_status(PdStatus::Invalid),
            Err(PdError::NotOperate)
        );
    }

    #[test]
    fn page_read_returns_register() {
        let mut h = Harness::new(1, 1);
        let response = h
            .exchange(Mc::new(Access::Read, Channel::Page, dp1_addr::MIN_CYCLE_TIME), &[], &[])
            .unwrap();
        assert_eq!(response, [0x8C, 0x35]);
        assert_eq!(h.link.state(), DeviceState::RunMode);
    }

    #[test]
    fn corrupted_message_is_discarded() {
        let mut h = Harness::new(1, 1);
        let mut tx = [0u8; MAX_MESSAGE_SIZE];
        assert_eq!(h.link.process_message(&[0xA2, 0x01], &mut tx), None);
        assert_eq!(h.link.state(), DeviceState::WaitValidFrame);
    }

    #[test]
    fn mode_changes_after_response() {
        let mut h = Harness::new(1, 1);
        let mut frame = [0u8; MAX_MESSAGE_SIZE];
        let mc = Mc::new(Access::Write, Channel::Page, dp1_addr::MASTER_COMMAND);
        let len = message_master(&mut frame, mc, MSeqType::Type0, &[], &[0x9A]);
        let exchange = h.link.process_message(&frame[..len], &mut h.tx).unwrap();
        assert_eq!(&h.tx[..exchange.tx_len], &[0x2D]);
        assert_eq!(h.link.mode(), Mode::Start);
        assert_eq!(h.link.complete_exchange(), LinkAction::None);
        assert_eq!(h.link.mode(), Mode::Preoperate);
        assert_eq!(h.link.layout().mseq_type, MSeqType::Type1);
    }

    #[test]
    fn modes_only_move_forward() {
        let mut h = Harness::new(1, 1);
        h.to_operate();
        assert_eq!(h.link.mode(), Mode::Operate);
        h.command(master_command::DEVICE_PREOPERATE);
        assert_eq!(h.link.mode(), Mode::Operate);
        h.command(master_command::MASTER_IDENT);
        assert_eq!(h.link.mode(), Mode::Operate);
    }

    #[test]
    fn fallback_resets_link() {
        let mut h = Harness::new(1, 1);
        h.to_operate();
        let mut frame = [0u8; MAX_MESSAGE_SIZE];
        let mc = Mc::new(Access::Write, Channel::Page, dp1_addr::MASTER_COMMAND);
        let len = message_master(&mut frame, mc, MSeqType::Type2, &[0], &[0x5A, 0x00]);
        h.link.process_message(&frame[..len], &mut h.tx).unwrap();
        assert_eq!(h.link.complete_exchange(), LinkAction::Fallback);
        assert_eq!(h.link.mode(), Mode::Start);
        assert_eq!(h.link.state(), DeviceState::WaitWake);
    }

    #[test]
    fn operate_exchanges_process_data() {
        let mut h = Harness::new(1, 1);
        h.to_operate();
        h.link.set_pd_in(&[0x42]).unwrap();

        let response = h
            .exchange(Mc::new(Access::Write, Channel::Process, 0), &[0x0F], &[0, 0])
            .unwrap();
        assert_eq!(response.len(), 2);
        assert_eq!(response[0], 0x42);
        let cks = Cks::from_octet(response[1]);
        assert_eq!(cks.pd_status, PdStatus::Valid);
        assert!(!cks.event);

        let mut buffer = [0u8; 1];
        assert_eq!(h.link.get_pd_out(&mut buffer), Ok(PdStatus::Valid));
        assert_eq!(buffer, [0x0F]);
    }

    #[test]
    fn pd_in_status_reported_in_cks() {
        let mut h = Harness::new(1, 1);
        h.to_operate();
        h.link.set_pd_in_status(PdStatus::Invalid).unwrap();
        let response = h
            .exchange(Mc::new(Access::Read, Channel::Page, 0), &[0x00], &[])
            .unwrap();
        assert_eq!(response.len(), 4);
        assert_eq!(Cks::from_octet(response[3]).pd_status, PdStatus::Invalid);
    }

    #[test]
    fn new_cycle_only_in_operate() {
        let mut h = Harness::new(1, 1);
        let mut frame = [0u8; MAX_MESSAGE_SIZE];
        let len = message_master(
            &mut frame,
            Mc::new(Access::Read, Channel::Page, 2),
            MSeqType::Type0,
            &[],
            &[],
        );
        let exchange = h.link.process_message(&frame[..len], &mut h.tx).unwrap();
        assert!(!exchange.new_cycle);

        h.to_operate();
        let len = message_master(
            &mut frame,
            Mc::new(Access::Read, Channel::Page, 2),
            MSeqType::Type2,
            &[0],
            &[],
        );
        let exchange = h.link.process_message(&frame[..len], &mut h.tx).unwrap();
        assert!(exchange.new_cycle);
    }

    #[test]
    fn identity_write_is_ignored() {
        let mut h = Harness::new(1, 1);
        h.exchange(
            Mc::new(Access::Write, Channel::Page, dp1_addr::MIN_CYCLE_TIME),
            &[],
            &[0x00],
        )
        .unwrap();
        assert_eq!(h.link.parameter_page().read(dp1_addr::MIN_CYCLE_TIME), 0x8C);

        h.exchange(
            Mc::new(Access::Write, Channel::Page, dp1_addr::MASTER_CYCLE_TIME),
            &[],
            &[0x8C],
        )
        .unwrap();
        assert_eq!(h.link.master_cycle_time_us(), Some(51_200));
    }

    #[test]
    fn diagnosis_read_drains_events() {
        let mut h = Harness::new(1, 1);
        h.command(master_command::DEVICE_PREOPERATE);
        h.link.set_event(warning(0x8CA0)).unwrap();

        let response = h
            .exchange(Mc::new(Access::Read, Channel::Diagnosis, 0), &[], &[])
            .unwrap();
        // three octets of the event memory in an 8 octet OD
        assert_eq!(&response[..4], &[0x81, 0xE4, 0x8C, 0x00]);
        assert!(Cks::from_octet(response[8]).event);
        assert!(!h.link.take_events_processed());

        let response = h
            .exchange(Mc::new(Access::Read, Channel::Diagnosis, 3), &[], &[])
            .unwrap();
        assert_eq!(response[0], 0xA0);
        assert!(!Cks::from_octet(response[8]).event);
        assert!(h.link.take_events_processed());
        assert!(!h.link.events_pending());
    }

    #[test]
    fn event_flag_set_while_queued() {
        let mut h = Harness::new(1, 1);
        h.link.set_event(warning(0x1000)).unwrap();
        let response = h
            .exchange(Mc::new(Access::Read, Channel::Page, 2), &[], &[])
            .unwrap();
        assert!(Cks::from_octet(response[1]).event);
    }

    #[test]
    fn diagnosis_write_confirms_events() {
        let mut h = Harness::new(1, 1);
        h.link.set_event(warning(0x1000)).unwrap();
        h.exchange(Mc::new(Access::Read, Channel::Diagnosis, 0), &[], &[])
            .unwrap();
        assert_eq!(
            h.link.set_event(warning(0x1001)),
            Err(EventError::ProcessingEvents)
        );
        let response = h
            .exchange(Mc::new(Access::Write, Channel::Diagnosis, 0), &[], &[0x00])
            .unwrap();
        assert_eq!(response, [0x2D]);
        assert!(h.link.take_events_processed());
        h.link.set_event(warning(0x1001)).unwrap();
    }

    #[test]
    fn isdu_read_returns_zeros() {
        let mut h = Harness::new(1, 1);
        let response = h
            .exchange(Mc::new(Access::Read, Channel::Isdu, 0x10), &[], &[])
            .unwrap();
        assert_eq!(response[0], 0x00);
    }

    #[test]
    fn wrong_mseq_type_is_not_accepted() {
        let mut h = Harness::new(1, 1);
        assert_eq!(h.link.expected_master_len(0x00, 0x85), None);
        h.to_operate();
        assert_eq!(h.link.expected_master_len(0x00, 0x85), Some(5));
        assert_eq!(h.link.expected_master_len(0xA2, 0x00), None);
    }

    #[test]
    fn resync_keeps_mode() {
        let mut h = Harness::new(1, 1);
        h.to_operate();
        h.link.resync();
        assert_eq!(h.link.state(), DeviceState::WaitValidFrame);
        assert_eq!(h.link.mode(), Mode::Operate);
    }

    #[test]
    fn reset_invalidates_pd_out() {
        let mut h = Harness::new(1, 1);
        h.to_operate();
        h.exchange(Mc::new(Access::Write, Channel::Process, 0), &[0x0F], &[0, 0])
            .unwrap();
        h.link.reset();
        h.link.wake();
        h.to_operate();
        let mut buffer = [0u8; 1];
        assert_eq!(h.link.get_pd_out(&mut buffer), Ok(PdStatus::Invalid));
    }
}

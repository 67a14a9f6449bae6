/*********************************************************************
 * IO-Link M-Sequence
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

use super::codec::{Ckt, Mc, CKT_OFFSET};
use super::types::{Access, MSeqType, Mode};

/// On-request data octets per M-sequence in each mode
pub struct OdSize {
    pub startup: usize,
    pub preoperate: usize,
    pub operate: usize,
}

/// TYPE_0 in startup, TYPE_1_V with 8 octets in preoperate and
/// TYPE_2_V with 2 octets in operate
pub const OD_SIZE: OdSize = OdSize {
    startup: 1,
    preoperate: 8,
    operate: 2,
};

const MSEQ_CAP_ISDU_OFFSET: u8 = 0;
const MSEQ_CAP_OPERATE_OFFSET: u8 = 1;
const MSEQ_CAP_PREOPERATE_OFFSET: u8 = 4;

/// Octet counts of one M-sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MSeqLayout {
    pub mseq_type: MSeqType,
    pub od_len: usize,
    pub pd_in_len: usize,
    pub pd_out_len: usize,
}

impl MSeqLayout {
    pub fn for_mode(mode: Mode, pd_in_len: usize, pd_out_len: usize) -> Self {
        match mode {
            Mode::Start => MSeqLayout {
                mseq_type: MSeqType::Type0,
                od_len: OD_SIZE.startup,
                pd_in_len: 0,
                pd_out_len: 0,
            },
            Mode::Preoperate => MSeqLayout {
                mseq_type: MSeqType::Type1,
                od_len: OD_SIZE.preoperate,
                pd_in_len: 0,
                pd_out_len: 0,
            },
            // TYPE_1_2 for devices without process data
            Mode::Operate if pd_in_len == 0 && pd_out_len == 0 => MSeqLayout {
                mseq_type: MSeqType::Type1,
                od_len: OD_SIZE.operate,
                pd_in_len: 0,
                pd_out_len: 0,
            },
            Mode::Operate => MSeqLayout {
                mseq_type: MSeqType::Type2,
                od_len: OD_SIZE.operate,
                pd_in_len,
                pd_out_len,
            },
        }
    }

    /// MC + CKT + PDOut + OD (write only)
    pub fn master_len(&self, access: Access) -> usize {
        let od = match access {
            Access::Write => self.od_len,
            Access::Read => 0,
        };
        CKT_OFFSET + 1 + self.pd_out_len + od
    }

    /// OD (read only) + PDIn + CKS
    pub fn device_len(&self, access: Access) -> usize {
        let od = match access {
            Access::Read => self.od_len,
            Access::Write => 0,
        };
        od + self.pd_in_len + 1
    }

    /// Total length of a master message starting with `mc` and `ckt`, or
    /// `None` if it does not belong to this layout.
    pub fn expected_master_len(&self, mc: u8, ckt: u8) -> Option<usize> {
        let ckt = Ckt::from_octet(ckt)?;
        if ckt.mseq_type != self.mseq_type {
            return None;
        }
        Some(self.master_len(Mc::from_octet(mc).access))
    }
}

fn preoperate_code(od_len: usize) -> u8 {
    match od_len {
        1 => 0,
        2 => 1,
        8 => 2,
        _ => 3,
    }
}

fn operate_code(od_len: usize, with_pd: bool) -> u8 {
    match (od_len, with_pd) {
        (1, false) => 0,
        (2, false) => 1,
        (1, true) => 4,
        (2, true) => 5,
        (8, _) => 6,
        _ => 7,
    }
}

/// MSeqCapability (B.1.4)
///
/// ```text
///  7   6   5   4   3   2   1   0
/// ┌───────┬───────┬───────────┬────┐
/// │ res.  │ PREOP │  OPERATE  │ISDU│
/// └───────┴───────┴───────────┴────┘
/// ```
pub fn mseq_capability(pd_in_len: usize, pd_out_len: usize, isdu: bool) -> u8 {
    let with_pd = pd_in_len > 0 || pd_out_len > 0;
    (preoperate_code(OD_SIZE.preoperate) << MSEQ_CAP_PREOPERATE_OFFSET)
        | (operate_code(OD_SIZE.operate, with_pd) << MSEQ_CAP_OPERATE_OFFSET)
        | (u8::from(isdu) << MSEQ_CAP_ISDU_OFFSET)
}

/// Fields of a received master message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterMessage<'a> {
    pub mc: Mc,
    pub ckt: Ckt,
    pub pd_out: &'a [u8],
    pub od: &'a [u8],
}

impl<'a> MasterMessage<'a> {
    /// Split `frame` according to `layout`.
    ///
    /// Returns `None` if the length or the CKT octet does not match.
    pub fn parse(frame: &'a [u8], layout: &MSeqLayout) -> Option<Self> {
        let mc = Mc::from_octet(*frame.first()?);
        let ckt = Ckt::from_octet(*frame.get(CKT_OFFSET)?)?;
        if ckt.mseq_type != layout.mseq_type || frame.len() != layout.master_len(mc.access) {
            return None;
        }
        let pd_start = CKT_OFFSET + 1;
        let od_start = pd_start + layout.pd_out_len;
        Some(MasterMessage {
            mc,
            ckt,
            pd_out: &frame[pd_start..od_start],
            od: &frame[od_start..],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iolink::types::Channel;

    #[test]
    fn startup_layout() {
        let layout = MSeqLayout::for_mode(Mode::Start, 1, 1);
        assert_eq!(layout.mseq_type, MSeqType::Type0);
        assert_eq!(layout.master_len(Access::Read), 2);
        assert_eq!(layout.master_len(Access::Write), 3);
        assert_eq!(layout.device_len(Access::Read), 2);
        assert_eq!(layout.device_len(Access::Write), 1);
    }

    #[test]
    fn preoperate_layout() {
        let layout = MSeqLayout::for_mode(Mode::Preoperate, 4, 2);
        assert_eq!(layout.mseq_type, MSeqType::Type1);
        assert_eq!(layout.master_len(Access::Write), 10);
        assert_eq!(layout.device_len(Access::Read), 9);
        assert_eq!(layout.pd_in_len, 0);
    }

    #[test]
    fn operate_layout() {
        let layout = MSeqLayout::for_mode(Mode::Operate, 3, 1);
        assert_eq!(layout.mseq_type, MSeqType::Type2);
        assert_eq!(layout.master_len(Access::Read), 3);
        assert_eq!(layout.master_len(Access::Write), 5);
        assert_eq!(layout.device_len(Access::Read), 6);
        assert_eq!(layout.device_len(Access::Write), 4);

        let layout = MSeqLayout::for_mode(Mode::Operate, 0, 0);
        assert_eq!(layout.mseq_type, MSeqType::Type1);
        assert_eq!(layout.od_len, 2);
    }

    #[test]
    fn expected_length_requires_matching_type() {
        let layout = MSeqLayout::for_mode(Mode::Start, 1, 1);
        assert_eq!(layout.expected_master_len(0xA2, 0x00), Some(2));
        assert_eq!(layout.expected_master_len(0x20, 0x36), Some(3));
        // TYPE_2 while in startup
        assert_eq!(layout.expected_master_len(0x00, 0x85), None);
        // reserved type
        assert_eq!(layout.expected_master_len(0x20, 0xC0), None);
    }

    #[test]
    fn capability_codes() {
        assert_eq!(mseq_capability(1, 1, false), 0x2A);
        assert_eq!(mseq_capability(0, 0, false), 0x22);
        assert_eq!(mseq_capability(0, 1, true), 0x2B);
    }

    #[test]
    fn capability_code_tables() {
        assert_eq!(preoperate_code(1), 0);
        assert_eq!(preoperate_code(2), 1);
        assert_eq!(preoperate_code(8), 2);
        assert_eq!(preoperate_code(32), 3);
        assert_eq!(operate_code(1, false), 0);
        assert_eq!(operate_code(8, false), 6);
        assert_eq!(operate_code(32, true), 7);
        assert_eq!(operate_code(1, true), 4);
    }

    #[test]
    fn parse_process_write() {
        let layout = MSeqLayout::for_mode(Mode::Operate, 1, 1);
        let frame = [0x00, 0x85, 0x0F, 0x00, 0x00];
        let message = MasterMessage::parse(&frame, &layout).unwrap();
        assert_eq!(message.mc.channel, Channel::Process);
        assert_eq!(message.mc.access, Access::Write);
        assert_eq!(message.pd_out, &[0x0F]);
        assert_eq!(message.od, &[0x00, 0x00]);
    }

    #[test]
    fn parse_rejects_length_mismatch() {
        let layout = MSeqLayout::for_mode(Mode::Start, 0, 0);
        assert!(MasterMessage::parse(&[0x20, 0x36], &layout).is_none());
        assert!(MasterMessage::parse(&[0xA2], &layout).is_none());
        let message = MasterMessage::parse(&[0xA2, 0x00], &layout).unwrap();
        assert!(message.od.is_empty());
    }
}

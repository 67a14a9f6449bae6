/*********************************************************************
 * IO-Link Event Memory
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

//! Event memory read by the master over the Diagnosis channel (A.6).
//!
//! ```text
//! address 0      status code  0x80 | one bit per occupied slot
//! address 1..3   event 1      qualifier, code MSB, code LSB
//! ...
//! address 16..18 event 6
//! ```

pub const MAX_EVENTS: usize = 6;
pub const SIZE_RAW_EVENT: usize = 3;
const SIZE_STATUS_CODE: usize = 1;
const STATUS_CODE_DEFAULT: u8 = 0x80;
const EVENT_MEMORY_SIZE: usize = SIZE_STATUS_CODE + MAX_EVENTS * SIZE_RAW_EVENT;
/// Octets of the event memory carried by one Diagnosis access
const MAX_READ_CHUNK: usize = 3;

pub mod qualifier_bits {
    pub const INSTANCE_OFFSET: u8 = 0;
    pub const SOURCE_OFFSET: u8 = 3;
    pub const TYPE_OFFSET: u8 = 4;
    pub const MODE_OFFSET: u8 = 6;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventInstance {
    Unknown = 0,
    Application = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventSource {
    Device = 0,
    Master = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventType {
    Notification = 1,
    Warning = 2,
    Error = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventMode {
    SingleShot = 1,
    Disappears = 2,
    Appears = 3,
}

/// Figure A.24
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventQualifier {
    pub instance: EventInstance,
    pub source: EventSource,
    pub event_type: EventType,
    pub mode: EventMode,
}

impl EventQualifier {
    pub fn octet(&self) -> u8 {
        ((self.instance as u8) << qualifier_bits::INSTANCE_OFFSET)
            | ((self.source as u8) << qualifier_bits::SOURCE_OFFSET)
            | ((self.event_type as u8) << qualifier_bits::TYPE_OFFSET)
            | ((self.mode as u8) << qualifier_bits::MODE_OFFSET)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Event {
    pub qualifier: EventQualifier,
    pub code: u16,
}

impl Event {
    /// Device sourced event
    pub fn new(instance: EventInstance, event_type: EventType, mode: EventMode, code: u16) -> Self {
        Event {
            qualifier: EventQualifier {
                instance,
                source: EventSource::Device,
                event_type,
                mode,
            },
            code,
        }
    }

    pub fn source(mut self, source: EventSource) -> Self {
        self.qualifier.source = source;
        self
    }

    pub fn to_bytes(&self) -> [u8; SIZE_RAW_EVENT] {
        let code = self.code.to_be_bytes();
        [self.qualifier.octet(), code[0], code[1]]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventError {
    /// All slots are occupied
    MemoryFull,
    /// The master is reading the event memory
    ProcessingEvents,
}

pub struct EventMemory {
    memory: [u8; EVENT_MEMORY_SIZE],
    total_events: usize,
    reading: bool,
    /// One bit per octet transmitted in the current read cycle
    transmitted: u32,
    processed: bool,
}

impl Default for EventMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl EventMemory {
    pub fn new() -> Self {
        let mut memory = [0; EVENT_MEMORY_SIZE];
        memory[0] = STATUS_CODE_DEFAULT;
        EventMemory {
            memory,
            total_events: 0,
            reading: false,
            transmitted: 0,
            processed: false,
        }
    }

    pub fn set_event(&mut self, event: Event) -> Result<(), EventError> {
        if self.reading {
            return Err(EventError::ProcessingEvents);
        }
        if self.total_events >= MAX_EVENTS {
            return Err(EventError::MemoryFull);
        }
        let start = SIZE_STATUS_CODE + self.total_events * SIZE_RAW_EVENT;
        self.memory[start..start + SIZE_RAW_EVENT].copy_from_slice(&event.to_bytes());
        self.memory[0] |= 1 << self.total_events;
        self.total_events += 1;
        debug!("event {:x} queued, {} pending", event.code, self.total_events);
        Ok(())
    }

    pub fn pending(&self) -> bool {
        self.total_events > 0
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.total_events
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.total_events == 0
    }

    #[cfg(test)]
    pub fn is_reading(&self) -> bool {
        self.reading
    }

    #[cfg(test)]
    pub fn status_code(&self) -> u8 {
        self.memory[0]
    }

    /// Serve a Diagnosis read of `out.len()` octets (at most 3) starting at
    /// `address`. Returns the number of octets written.
    ///
    /// Once every octet from the status code to the last queued event went
    /// out, the memory is released.
    pub fn read(&mut self, address: u8, out: &mut [u8]) -> usize {
        let start = usize::from(address);
        let len = out.len().min(MAX_READ_CHUNK);
        for (i, octet) in out[..len].iter_mut().enumerate() {
            *octet = self.memory.get(start + i).copied().unwrap_or(0);
        }

        if self.pending() {
            if !self.reading {
                trace!("event memory read started");
                self.reading = true;
            }
            for address in start..(start + len).min(EVENT_MEMORY_SIZE) {
                self.transmitted |= 1 << address;
            }
            let used = SIZE_STATUS_CODE + self.total_events * SIZE_RAW_EVENT;
            let complete = (1u32 << used) - 1;
            if self.transmitted & complete == complete {
                self.drain();
            }
        }
        len
    }

    /// Diagnosis write to the status code address
    pub fn confirm(&mut self) {
        if self.pending() || self.reading {
            self.drain();
        }
    }

    /// Communication lost during a read cycle, the events stay queued.
    pub fn abort_read(&mut self) {
        self.reading = false;
        self.transmitted = 0;
    }

    /// Returns `true` once per completed read cycle.
    pub fn take_processed(&mut self) -> bool {
        core::mem::take(&mut self.processed)
    }

    fn drain(&mut self) {
        debug!("event memory processed, {} events", self.total_events);
        self.memory = [0; EVENT_MEMORY_SIZE];
        self.memory[0] = STATUS_CODE_DEFAULT;
        self.total_events = 0;
        self.reading = false;
        self.transmitted = 0;
        self.processed = true;
    }
}

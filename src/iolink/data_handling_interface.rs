/*********************************************************************
 * DataHandlingInterface
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

use super::link::Link;

/// Application hooks called from `Device::run`.
pub trait DataHandlingInterface {
    /// A master message received in operate mode has been answered.
    ///
    /// Process data for the next cycle is exchanged through `link`.
    fn on_new_cycle(&mut self, _link: &mut Link) {}

    /// The master has read the complete event memory.
    fn on_events_processed(&mut self) {}
}

/// Device without application hooks
impl DataHandlingInterface for () {}

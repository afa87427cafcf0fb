// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for device identification and attribute values.

mod attr_value;
mod dev_state;
mod device_name;
mod obs_state;

pub use attr_value::AttrValue;
pub use dev_state::DevState;
pub use device_name::DeviceName;
pub use obs_state::ObsState;

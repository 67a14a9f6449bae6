pub use codec::{calc_checksum, checksum_valid, Cks, Ckt, Mc, RxError, MAX_MESSAGE_SIZE, MAX_OD, MAX_PD};
pub use codec_hw_interface::{CodecHwInterface, HwConfig, PinConfig, WakeupEdge};
pub use data_handling_interface::DataHandlingInterface;
pub use device::{ConfigError, Device, DeviceConfig};
pub use dp1::{decode_pd_length, encode_pd_length, Identification, PageWrite, ParameterPage, DP1_SIZE};
pub use event::{
    Event, EventError, EventInstance, EventMode, EventQualifier, EventSource, EventType,
    MAX_EVENTS,
};
pub use link::{Exchange, Link, LinkAction};
pub use mseq::{mseq_capability, MSeqLayout, OD_SIZE};
pub use process_data::PdError;
pub use types::{
    dp1_addr, master_command, Access, BaudRate, Channel, DeviceState, MSeqType, MasterCommand,
    Mode, PdStatus,
};

pub mod codec;
pub mod codec_hw_interface;
pub mod cycle_time;
pub mod data_handling_interface;
mod device;
mod dp1;
mod event;
mod link;
mod mseq;
mod process_data;
mod types;

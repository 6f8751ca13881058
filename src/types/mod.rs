pub mod data_kind;
pub mod field;
pub mod frame;
pub mod location;
pub mod observation;
pub mod period;

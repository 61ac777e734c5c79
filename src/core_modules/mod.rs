pub mod brightness_sampler;
pub mod event_dispatcher;
pub mod frame_annotator;
pub mod frame_handoff;
pub mod luma;
pub mod reference_calibrator;
pub mod region;
pub mod serial_sink;
pub mod utils;
pub mod zone;
pub mod zone_state_machine;

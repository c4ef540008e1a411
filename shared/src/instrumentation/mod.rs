//! Instrumentation facade: one span source, one counter and the request
//! duration histogram per process.

pub mod facade;
pub mod names;

pub use facade::{
    Counter, Instrumentation, InstrumentationSettings, RequestDuration, ScopedSpan,
    REQUEST_DURATION_BOUNDARIES, REQUEST_DURATION_NAME, TEST_COUNTER_DESCRIPTION,
    TEST_COUNTER_NAME,
};
pub use names::{
    validate_instrument_name, validate_source_name, InstrumentationError, MAX_INSTRUMENT_NAME_LEN,
};

//! Test scaffolding: a reference micro-op interpreter, a flat guest
//! memory, instruction encoders and a prebuilt rig. Compiled only for
//! tests and the `test-helpers` feature; none of this is a host back end.

pub mod enc;
pub mod exec;

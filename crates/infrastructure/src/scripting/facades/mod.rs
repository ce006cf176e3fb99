//! Objects exposed to scripts: `bru`, `req`, `res` and the test recorder.

mod bru;
mod request;
mod response;
mod recorder;

pub use bru::BruFacade;
pub use request::RequestFacade;
pub use response::ResponseFacade;
pub use recorder::{failure_details, is_limit, root_cause};

use rhai::Engine;

use super::session::Session;

/// Registers every facade type; `test`, `expect` and `assert` only when `with_tests`.
pub fn register(engine: &mut Engine, session: &Session, with_tests: bool) {
    bru::register(engine);
    request::register(engine);
    response::register(engine);
    if with_tests {
        recorder::register(engine, session);
    }
}

//! The `console` object and Rhai's `print`/`debug` forwarding.

use relay_domain::{ConsoleEntry, ConsoleLevel};
use rhai::{Dynamic, Engine};

use super::bridge::render;
use super::session::Session;

/// Script-side `console`.
#[derive(Clone)]
pub struct ConsoleFacade {
    session: Session,
}

impl ConsoleFacade {
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    fn write(&self, level: ConsoleLevel, args: &[Dynamic]) {
        let args = args.iter().map(render).collect();
        self.session.emit_console(ConsoleEntry::new(level, args));
    }
}

const LEVELS: [(&str, ConsoleLevel); 5] = [
    ("log", ConsoleLevel::Log),
    ("info", ConsoleLevel::Info),
    ("warn", ConsoleLevel::Warn),
    ("error", ConsoleLevel::Error),
    ("debug", ConsoleLevel::Debug),
];

/// Registers `console.<level>(...)` for up to four arguments, plus `print` and `debug`.
pub fn register(engine: &mut Engine, session: &Session) {
    engine.register_type_with_name::<ConsoleFacade>("Console");

    for (name, level) in LEVELS {
        engine
            .register_fn(name, move |c: &mut ConsoleFacade| c.write(level, &[]))
            .register_fn(name, move |c: &mut ConsoleFacade, a: Dynamic| {
                c.write(level, &[a]);
            })
            .register_fn(name, move |c: &mut ConsoleFacade, a: Dynamic, b: Dynamic| {
                c.write(level, &[a, b]);
            })
            .register_fn(
                name,
                move |c: &mut ConsoleFacade, a: Dynamic, b: Dynamic, d: Dynamic| {
                    c.write(level, &[a, b, d]);
                },
            )
            .register_fn(
                name,
                move |c: &mut ConsoleFacade, a: Dynamic, b: Dynamic, d: Dynamic, e: Dynamic| {
                    c.write(level, &[a, b, d, e]);
                },
            );
    }

    let printer = session.clone();
    engine.on_print(move |text| {
        printer.emit_console(ConsoleEntry::new(ConsoleLevel::Log, vec![text.to_string()]));
    });
    let debugger = session.clone();
    engine.on_debug(move |text, _source, _pos| {
        debugger.emit_console(ConsoleEntry::new(ConsoleLevel::Debug, vec![text.to_string()]));
    });
}

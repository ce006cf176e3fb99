//! `bru`: variable access and run control.

use std::time::{Duration, Instant};

use relay_application::variable_resolver::interpolate;
use relay_domain::{VariableMap, environment::validate_variable_name};
use rhai::{Dynamic, Engine, INT};

use crate::scripting::bridge::{to_dynamic, to_json};
use crate::scripting::session::{RhaiResult, Session, script_error};

/// Script-side `bru`.
#[derive(Clone)]
pub struct BruFacade {
    session: Session,
}

impl BruFacade {
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    fn get(map: &VariableMap, name: &str) -> RhaiResult<Dynamic> {
        checked(name)?;
        Ok(map.get(name).map_or(Dynamic::UNIT, to_dynamic))
    }

    fn set(map: &mut VariableMap, name: &str, value: &Dynamic) -> RhaiResult<()> {
        checked(name)?;
        match to_json(value) {
            Some(json) => {
                map.insert(name.to_string(), json);
            }
            None => {
                map.remove(name);
            }
        }
        Ok(())
    }

    fn folder_var(&self, name: &str) -> RhaiResult<Dynamic> {
        checked(name)?;
        let folders = &self.session.frame().scopes.folders;
        Ok(folders
            .iter()
            .rev()
            .find_map(|group| group.get(name))
            .map_or(Dynamic::UNIT, to_dynamic))
    }

    fn sleep(&self, ms: INT) {
        let mut wait = Duration::from_millis(u64::try_from(ms).unwrap_or(0));
        if let Some(deadline) = self.session.frame().deadline {
            wait = wait.min(deadline.saturating_duration_since(Instant::now()));
        }
        std::thread::sleep(wait);
    }
}

fn checked(name: &str) -> RhaiResult<()> {
    validate_variable_name(name).map_err(|e| script_error(e.to_string()))
}

fn optional_string(value: Option<&str>) -> Dynamic {
    value.map_or(Dynamic::UNIT, |s| Dynamic::from(s.to_string()))
}

pub fn register(engine: &mut Engine) {
    engine
        .register_type_with_name::<BruFacade>("Bru")
        .register_fn("getEnvVar", |b: &mut BruFacade, name: &str| {
            BruFacade::get(&b.session.state().env, name)
        })
        .register_fn("setEnvVar", |b: &mut BruFacade, name: &str, value: Dynamic| {
            BruFacade::set(&mut b.session.state_mut().env, name, &value)
        })
        .register_fn("hasEnvVar", |b: &mut BruFacade, name: &str| -> RhaiResult<bool> {
            checked(name)?;
            Ok(b.session.state().env.contains_key(name))
        })
        .register_fn("deleteEnvVar", |b: &mut BruFacade, name: &str| -> RhaiResult<()> {
            checked(name)?;
            b.session.state_mut().env.remove(name);
            Ok(())
        })
        .register_fn("getVar", |b: &mut BruFacade, name: &str| {
            BruFacade::get(&b.session.state().runtime, name)
        })
        .register_fn("setVar", |b: &mut BruFacade, name: &str, value: Dynamic| {
            BruFacade::set(&mut b.session.state_mut().runtime, name, &value)
        })
        .register_fn("hasVar", |b: &mut BruFacade, name: &str| -> RhaiResult<bool> {
            checked(name)?;
            Ok(b.session.state().runtime.contains_key(name))
        })
        .register_fn("deleteVar", |b: &mut BruFacade, name: &str| -> RhaiResult<()> {
            checked(name)?;
            b.session.state_mut().runtime.remove(name);
            Ok(())
        })
        .register_fn("getCollectionVar", |b: &mut BruFacade, name: &str| {
            BruFacade::get(&b.session.frame().scopes.collection, name)
        })
        .register_fn("getFolderVar", |b: &mut BruFacade, name: &str| b.folder_var(name))
        .register_fn("getRequestVar", |b: &mut BruFacade, name: &str| {
            BruFacade::get(&b.session.frame().scopes.request, name)
        })
        .register_fn("getProcessEnv", |b: &mut BruFacade, name: &str| {
            optional_string(b.session.frame().scopes.process_env.get(name))
        })
        .register_fn("getEnvName", |b: &mut BruFacade| {
            optional_string(b.session.frame().scopes.environment_name.as_deref())
        })
        .register_fn("cwd", |b: &mut BruFacade| {
            b.session.frame().collection_root.display().to_string()
        })
        .register_fn("setNextRequest", |b: &mut BruFacade, name: &str| {
            b.session.state_mut().next_request_name = Some(name.to_string());
        })
        .register_fn("skipRequest", |b: &mut BruFacade| {
            b.session.state_mut().skip_request = true;
        })
        .register_fn("interpolate", |b: &mut BruFacade, template: &str| {
            interpolate(template, &b.session.current_scopes())
        })
        .register_fn("sleep", |b: &mut BruFacade, ms: INT| b.sleep(ms));
}

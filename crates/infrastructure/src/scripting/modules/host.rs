//! Host modules importable by scripts.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use md5::Md5;
use rhai::{Dynamic, INT, Map, Module};
use sha2::{Digest, Sha256, Sha512};

use crate::scripting::bridge::{to_dynamic, to_json};
use crate::scripting::session::{RhaiResult, script_error};

/// Names of every host module, in the order they are listed in errors.
pub const HOST_MODULES: [&str; 6] = ["json", "crypto", "encoding", "url", "time", "fs"];

/// Builds the host module `name`; `fs` paths resolve against `root`.
pub fn build(name: &str, root: &Path) -> Option<Module> {
    let module = match name {
        "json" => json(),
        "crypto" => crypto(),
        "encoding" => encoding(),
        "url" => url(),
        "time" => time(),
        "fs" => fs(root.to_path_buf()),
        _ => return None,
    };
    Some(module)
}

fn json() -> Module {
    let mut module = Module::new();
    module.set_native_fn("parse", |text: &str| -> RhaiResult<Dynamic> {
        serde_json::from_str(text)
            .map(|v| to_dynamic(&v))
            .map_err(|e| script_error(format!("json::parse: {e}")))
    });
    module.set_native_fn("stringify", |value: Dynamic| -> RhaiResult<String> {
        Ok(to_json(&value).unwrap_or_default().to_string())
    });
    module.set_native_fn("pretty", |value: Dynamic| -> RhaiResult<String> {
        serde_json::to_string_pretty(&to_json(&value).unwrap_or_default())
            .map_err(|e| script_error(e.to_string()))
    });
    module
}

fn crypto() -> Module {
    let mut module = Module::new();
    module.set_native_fn("md5", |text: &str| -> RhaiResult<String> {
        Ok(hex::encode(Md5::digest(text.as_bytes())))
    });
    module.set_native_fn("sha256", |text: &str| -> RhaiResult<String> {
        Ok(hex::encode(Sha256::digest(text.as_bytes())))
    });
    module.set_native_fn("sha512", |text: &str| -> RhaiResult<String> {
        Ok(hex::encode(Sha512::digest(text.as_bytes())))
    });
    module.set_native_fn("hmac_sha256", |key: &str, text: &str| -> RhaiResult<String> {
        let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
            .map_err(|e| script_error(e.to_string()))?;
        mac.update(text.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    });
    module.set_native_fn("uuid", || -> RhaiResult<String> {
        Ok(uuid::Uuid::new_v4().to_string())
    });
    module
}

fn encoding() -> Module {
    let mut module = Module::new();
    module.set_native_fn("base64_encode", |text: &str| -> RhaiResult<String> {
        Ok(STANDARD.encode(text))
    });
    module.set_native_fn("base64_decode", |text: &str| -> RhaiResult<String> {
        let bytes = STANDARD
            .decode(text.trim())
            .map_err(|e| script_error(format!("encoding::base64_decode: {e}")))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    });
    module.set_native_fn("hex_encode", |text: &str| -> RhaiResult<String> {
        Ok(hex::encode(text))
    });
    module.set_native_fn("hex_decode", |text: &str| -> RhaiResult<String> {
        let bytes =
            hex::decode(text).map_err(|e| script_error(format!("encoding::hex_decode: {e}")))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    });
    module.set_native_fn("url_encode", |text: &str| -> RhaiResult<String> {
        Ok(urlencoding::encode(text).into_owned())
    });
    module.set_native_fn("url_decode", |text: &str| -> RhaiResult<String> {
        urlencoding::decode(text)
            .map(std::borrow::Cow::into_owned)
            .map_err(|e| script_error(format!("encoding::url_decode: {e}")))
    });
    module
}

fn url() -> Module {
    let mut module = Module::new();
    module.set_native_fn("parse", |text: &str| -> RhaiResult<Map> {
        let parsed =
            url::Url::parse(text).map_err(|e| script_error(format!("url::parse: {e}")))?;
        let query: Map = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned().into(), Dynamic::from(v.into_owned())))
            .collect();
        let mut map = Map::new();
        map.insert("protocol".into(), Dynamic::from(format!("{}:", parsed.scheme())));
        map.insert(
            "host".into(),
            Dynamic::from(parsed.host_str().unwrap_or_default().to_string()),
        );
        map.insert(
            "port".into(),
            parsed
                .port_or_known_default()
                .map_or(Dynamic::UNIT, |p| Dynamic::from_int(INT::from(p))),
        );
        map.insert("path".into(), Dynamic::from(parsed.path().to_string()));
        map.insert("query".into(), Dynamic::from_map(query));
        map.insert(
            "hash".into(),
            Dynamic::from(parsed.fragment().unwrap_or_default().to_string()),
        );
        map.insert(
            "origin".into(),
            Dynamic::from(parsed.origin().ascii_serialization()),
        );
        Ok(map)
    });
    module.set_native_fn("encode", |text: &str| -> RhaiResult<String> {
        Ok(urlencoding::encode(text).into_owned())
    });
    module.set_native_fn("decode", |text: &str| -> RhaiResult<String> {
        urlencoding::decode(text)
            .map(std::borrow::Cow::into_owned)
            .map_err(|e| script_error(format!("url::decode: {e}")))
    });
    module
}

fn time() -> Module {
    let mut module = Module::new();
    module.set_native_fn("now_ms", || -> RhaiResult<INT> {
        Ok(Utc::now().timestamp_millis())
    });
    module.set_native_fn("unix", || -> RhaiResult<INT> { Ok(Utc::now().timestamp()) });
    module.set_native_fn("now_iso", || -> RhaiResult<String> {
        Ok(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
    });
    module
}

fn fs(root: PathBuf) -> Module {
    let resolve = move |path: &str| {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    };
    let mut module = Module::new();
    let read_root = resolve.clone();
    module.set_native_fn("read", move |path: &str| -> RhaiResult<String> {
        std::fs::read_to_string(read_root(path))
            .map_err(|e| script_error(format!("fs::read {path}: {e}")))
    });
    let write_root = resolve.clone();
    module.set_native_fn("write", move |path: &str, content: &str| -> RhaiResult<()> {
        std::fs::write(write_root(path), content)
            .map_err(|e| script_error(format!("fs::write {path}: {e}")))
    });
    module.set_native_fn("exists", move |path: &str| -> RhaiResult<bool> {
        Ok(resolve(path).exists())
    });
    module
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_module_builds() {
        for name in HOST_MODULES {
            assert!(build(name, Path::new("/tmp")).is_some(), "{name}");
        }
        assert!(build("net", Path::new("/tmp")).is_none());
    }
}

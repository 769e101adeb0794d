// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Deployment policy configuration. A site can raise the minimum key
//! sizes accepted by the engine above the built-in table; floors can
//! only tighten the policy, never relax it.

use std::env;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::pkcs11::vendor::SKR_CONFIG_ERROR;
use crate::pkcs11::*;

use once_cell::sync::Lazy;
use serde::de;
use serde::{Deserialize, Serialize};
use toml;

#[cfg(not(test))]
const DEFAULT_CONF_DIR: &str = {
    match option_env!("CONFDIR") {
        Some(p) => p,
        None => "/usr/local/etc",
    }
};
#[cfg(test)]
const DEFAULT_CONF_DIR: &str = "test";

/// The default configuration file name
pub const DEFAULT_CONF_NAME: &str = "policy.conf";

/// A minimum key size floor for one key type, expressed in bits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeySizeFloor {
    /// Key type name, e.g. "aes" or "generic-secret"
    pub key_type: String,
    /// Minimum accepted key size in bits
    pub min_bits: u64,
}

/// The engine configuration
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Site specific key size floors
    #[serde(default)]
    pub key_size_floors: Vec<KeySizeFloor>,
}

/// Maps a configuration key type name to the key type id
fn name_to_key_type(name: &str) -> Result<CK_KEY_TYPE> {
    match name {
        "generic-secret" => Ok(CKK_GENERIC_SECRET),
        "aes" => Ok(CKK_AES),
        "des3" => Ok(CKK_DES3),
        "hmac-sha1" => Ok(CKK_SHA_1_HMAC),
        "hmac-sha224" => Ok(CKK_SHA224_HMAC),
        "hmac-sha256" => Ok(CKK_SHA256_HMAC),
        "hmac-sha384" => Ok(CKK_SHA384_HMAC),
        "hmac-sha512" => Ok(CKK_SHA512_HMAC),
        "rsa" => Ok(CKK_RSA),
        "ec" => Ok(CKK_EC),
        _ => Err(Error::ck_rv_with_errmsg(
            SKR_CONFIG_ERROR,
            format!("unknown key type '{}'", name),
        )),
    }
}

fn config_error<E: de::Error + 'static>(error: E) -> Error {
    Error::ck_rv_from_error(CKR_TOKEN_NOT_RECOGNIZED, error)
}

impl Config {
    /// Creates an empty configuration with no floors
    pub fn new() -> Config {
        Config {
            key_size_floors: Vec::new(),
        }
    }

    /// Locates the configuration file
    pub fn find_conf() -> Result<String> {
        /* First check for our own env var,
         * this has the highest precedence */
        match env::var("SEKRIS_CONF") {
            Ok(var) => return Ok(var),
            Err(_) => (),
        }
        /* Freedesktop specification for config dirs first
         * then fallback to use $HOME/.config, if that is also not
         * available see if we have access to a system config */
        let conffile = match env::var("XDG_CONFIG_HOME") {
            Ok(xdg) => format!("{}/sekris/{}", xdg, DEFAULT_CONF_NAME),
            Err(_) => match env::var("HOME") {
                Ok(home) => {
                    format!("{}/.config/sekris/{}", home, DEFAULT_CONF_NAME)
                }
                Err(_) => {
                    format!("{}/sekris/{}", DEFAULT_CONF_DIR, DEFAULT_CONF_NAME)
                }
            },
        };
        if Path::new(&conffile).is_file() {
            Ok(conffile)
        } else {
            Err(CKR_ARGUMENTS_BAD)?
        }
    }

    /// Loads and validates the configuration from a TOML file
    pub fn from_file(filename: &str) -> Result<Config> {
        let config_str = fs::read_to_string(filename)?;
        let conf: Config =
            toml::from_str(&config_str).map_err(config_error)?;
        for floor in &conf.key_size_floors {
            /* reject unknown key type names outright instead of
             * silently not enforcing the requested floor */
            let _ = name_to_key_type(&floor.key_type)?;
            if floor.min_bits == 0 {
                return Err(Error::ck_rv_with_errmsg(
                    SKR_CONFIG_ERROR,
                    format!("invalid floor for '{}'", floor.key_type),
                ));
            }
        }
        Ok(conf)
    }

    /// Loads the configuration from the default location, falling back
    /// to an empty configuration when no file is found
    pub fn load_default() -> Config {
        match Self::find_conf() {
            Ok(name) => match Self::from_file(&name) {
                Ok(conf) => conf,
                Err(_) => Config::new(),
            },
            Err(_) => Config::new(),
        }
    }

    /// Returns the configured floor in bits for the given key type
    pub fn min_bits(&self, key_type: CK_KEY_TYPE) -> Option<CK_ULONG> {
        for floor in &self.key_size_floors {
            match name_to_key_type(&floor.key_type) {
                Ok(kt) => {
                    if kt == key_type {
                        return CK_ULONG::try_from(floor.min_bits).ok();
                    }
                }
                Err(_) => (),
            }
        }
        None
    }
}

/// The process-wide configuration, loaded once
static CONFIG: Lazy<Config> = Lazy::new(Config::load_default);

/// Returns a reference to the process-wide configuration
pub fn current() -> &'static Config {
    &CONFIG
}

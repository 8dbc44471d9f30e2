//! INI configuration surface (spec §6).
//!
//! Parsing itself belongs to an external collaborator (spec §1 names the INI parser as
//! out-of-core); this module only defines the sections the core consumes and the glue that
//! turns a parsed `ini::Ini` into them. Swap-compatible with any INI library since `ini::Ini`
//! is itself just a multi-map of sections to key/value pairs.

use std::path::Path;

use ini::Ini;

use crate::error::Error;

pub mod zap_section {
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct ZapSectionConfig {
        pub security_level: Option<String>,
        pub domain: Option<String>,
        pub server_public_key: Option<String>,
        pub client_public_key: Option<String>,
        pub client_private_key: Option<String>,
        pub plain_username: Option<String>,
        pub plain_password: Option<String>,
    }
}

pub use zap_section::ZapSectionConfig;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OperatorConfig {
    pub address: String,
    pub zap: ZapSectionConfig,
    pub time_out_ms: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BroadcastConfig {
    pub name: String,
    pub frontend_address: String,
    pub backend_address: String,
    pub frontend_high_water_mark: Option<i32>,
    pub backend_high_water_mark: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceConfig {
    pub name: String,
    pub frontend_address: String,
    pub backend_address: String,
    pub frontend_high_water_mark: Option<i32>,
    pub backend_high_water_mark: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct IncrementerConfig {
    pub sqlite3_file_name: String,
    pub backend_address: String,
    pub initial_value: i64,
    pub increment: i32,
    pub zap: ZapSectionConfig,
}

fn get(section: &ini::Properties, key: &str) -> Option<String> {
    section.get(key).map(str::to_string)
}

fn get_i32(section: &ini::Properties, key: &str) -> Option<i32> {
    section.get(key).and_then(|v| v.parse().ok())
}

fn get_i64(section: &ini::Properties, key: &str) -> Option<i64> {
    section.get(key).and_then(|v| v.parse().ok())
}

fn zap_section(ini: &Ini, section_name: &str) -> ZapSectionConfig {
    let Some(section) = ini.section(Some(section_name)) else {
        return ZapSectionConfig::default();
    };
    ZapSectionConfig {
        security_level: get(section, "zap.security_level"),
        domain: get(section, "zap.domain"),
        server_public_key: get(section, "zap.server_public_key"),
        client_public_key: get(section, "zap.client_public_key"),
        client_private_key: get(section, "zap.client_private_key"),
        plain_username: get(section, "zap.plain_username"),
        plain_password: get(section, "zap.plain_password"),
    }
}

fn load(path: impl AsRef<Path>) -> Result<Ini, Error> {
    Ini::load_from_file(path.as_ref())
        .map_err(|error| Error::io_failure(format!("{}: {error}", path.as_ref().display())))
}

pub fn load_operator_config(path: impl AsRef<Path>) -> Result<OperatorConfig, Error> {
    let ini = load(path)?;
    let section = ini
        .section(Some("uOperator"))
        .ok_or_else(|| Error::not_found("[uOperator] section missing".to_string()))?;
    Ok(OperatorConfig {
        address: get(section, "address")
            .ok_or_else(|| Error::invalid_argument("uOperator.address is required"))?,
        zap: zap_section(&ini, "uOperator"),
        time_out_ms: get_i64(section, "time_out_ms"),
    })
}

pub fn load_broadcast_config(
    path: impl AsRef<Path>,
    section_name: &str,
) -> Result<BroadcastConfig, Error> {
    let ini = load(path)?;
    let section = ini
        .section(Some(section_name))
        .ok_or_else(|| Error::not_found(format!("[{section_name}] section missing")))?;
    Ok(BroadcastConfig {
        name: get(section, "name").unwrap_or_else(|| section_name.to_string()),
        frontend_address: get(section, "frontendAddress")
            .ok_or_else(|| Error::invalid_argument("frontendAddress is required"))?,
        backend_address: get(section, "backendAddress")
            .ok_or_else(|| Error::invalid_argument("backendAddress is required"))?,
        frontend_high_water_mark: get_i32(section, "frontendHighWaterMark"),
        backend_high_water_mark: get_i32(section, "backendHighWaterMark"),
    })
}

pub fn load_service_config(
    path: impl AsRef<Path>,
    section_name: &str,
) -> Result<ServiceConfig, Error> {
    let broadcast = load_broadcast_config(path, section_name)?;
    Ok(ServiceConfig {
        name: broadcast.name,
        frontend_address: broadcast.frontend_address,
        backend_address: broadcast.backend_address,
        frontend_high_water_mark: broadcast.frontend_high_water_mark,
        backend_high_water_mark: broadcast.backend_high_water_mark,
    })
}

pub fn load_incrementer_config(path: impl AsRef<Path>) -> Result<IncrementerConfig, Error> {
    let ini = load(path)?;
    let section = ini
        .section(Some("Incrementer"))
        .ok_or_else(|| Error::not_found("[Incrementer] section missing".to_string()))?;
    Ok(IncrementerConfig {
        sqlite3_file_name: get(section, "sqlite3FileName")
            .ok_or_else(|| Error::invalid_argument("sqlite3FileName is required"))?,
        backend_address: get(section, "backendAddress")
            .ok_or_else(|| Error::invalid_argument("backendAddress is required"))?,
        initial_value: get_i64(section, "initialValue").unwrap_or(0),
        increment: get_i32(section, "increment").unwrap_or(1),
        zap: zap_section(&ini, "Incrementer"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_ini(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_operator_section() {
        let file = write_ini(
            "[uOperator]\naddress = tcp://127.0.0.1:5550\ntime_out_ms = 1000\nzap.security_level = strawhouse\n",
        );
        let config = load_operator_config(file.path()).unwrap();
        assert_eq!(config.address, "tcp://127.0.0.1:5550");
        assert_eq!(config.time_out_ms, Some(1000));
        assert_eq!(config.zap.security_level.as_deref(), Some("strawhouse"));
    }

    #[test]
    fn parses_incrementer_section() {
        let file = write_ini(
            "[Incrementer]\nsqlite3FileName = /tmp/counters.db\nbackendAddress = tcp://127.0.0.1:5560\ninitialValue = 5\nincrement = 5\n",
        );
        let config = load_incrementer_config(file.path()).unwrap();
        assert_eq!(config.initial_value, 5);
        assert_eq!(config.increment, 5);
    }

    #[test]
    fn missing_section_is_not_found() {
        let file = write_ini("[Other]\nfoo = bar\n");
        let error = load_operator_config(file.path()).unwrap_err();
        assert!(matches!(error, Error::NotFound { .. }));
    }
}

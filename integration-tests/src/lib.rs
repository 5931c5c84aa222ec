//! Live checks against a real FireMon host. Connection details come from
//! `secrets.json` in the working directory.

pub mod config;

#![deny(warnings)]
#![deny(rust_2018_idioms)]

use config::{Config, File};
use feed_consumer::settings::Settings;

pub mod consumer;
pub mod feed;

#[test]
fn test_local_settings_are_valid() {
    Config::builder()
        .add_source(File::with_name("config/local.yml").required(true))
        .build()
        .unwrap()
        .try_deserialize::<Settings>()
        .unwrap();
}

#[test]
fn test_development_settings_are_valid() {
    Config::builder()
        .add_source(File::with_name("config/development.yml").required(true))
        .build()
        .unwrap()
        .try_deserialize::<Settings>()
        .unwrap();
}

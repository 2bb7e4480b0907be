// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod ast;
pub mod builder;
pub mod common;
pub mod config;
pub mod datamodel;
pub mod dimensions;
pub mod lems;
pub mod parser;
pub mod render;
pub mod token;
pub mod units;

pub use self::builder::{Export, export, export_json};
pub use self::common::{Error, ErrorCode, ErrorKind, Result};
pub use self::config::ExportOptions;
pub use self::dimensions::{UNITS_ARTIFACT_NAME, UnitCatalogue, units_artifact};
pub use self::lems::Document;
pub use self::render::render;

// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use serde::{Deserialize, Serialize};

use crate::dimensions::UNITS_ARTIFACT_NAME;

/// NeuroML core type definitions every generated document includes.
pub const DEFAULT_CORE_INCLUDES: &[&str] = &[
    "NeuroMLCoreDimensions.xml",
    "NeuroMLCoreCompTypes.xml",
    "Cells.xml",
    "Networks.xml",
    "Simulation.xml",
];

/// Knobs for a single export. Every field has a default, so an options
/// file only needs the fields it changes.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportOptions {
    /// The units constants file to include; `None` opts out of the
    /// include and of copying the artifact.
    pub units_file: Option<String>,
    pub core_includes: Vec<String>,
    pub network_id: String,
    pub simulation_id: String,
    /// emit a `Display` per recorded variable
    pub displays: bool,
    /// emit an `OutputFile` per recorded variable
    pub output_files: bool,
    pub display_ymin: f64,
    pub display_ymax: f64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            units_file: Some(UNITS_ARTIFACT_NAME.to_owned()),
            core_includes: DEFAULT_CORE_INCLUDES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            network_id: "net".to_owned(),
            simulation_id: "sim1".to_owned(),
            displays: true,
            output_files: true,
            display_ymin: -0.1,
            display_ymax: 0.1,
        }
    }
}

#[test]
fn test_partial_options() {
    let opts: ExportOptions =
        serde_json::from_str(r#"{"units_file": null, "displays": false}"#).unwrap();
    assert_eq!(None, opts.units_file);
    assert!(!opts.displays);
    assert!(opts.output_files);
    assert_eq!("net", opts.network_id);
    assert_eq!(5, opts.core_includes.len());
}

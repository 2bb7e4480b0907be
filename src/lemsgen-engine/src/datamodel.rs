// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The standardized run dictionary, as produced by the model collector.
//!
//! The top level is a JSON array of runs. Each run maps component kinds
//! (`neurongroup`, `statemonitor`, ...) to ordered lists of objects; those
//! are decoded here into the closed [`Component`] type.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::common::Result;
use crate::dimensions::{Dimensions, UnitCatalogue};
use crate::units::Quantity;
use crate::{import_err, model_err};

/// A physical quantity as written in the run dictionary.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum QuantityDef {
    /// a bare number is dimensionless
    Number(f64),
    /// a model-grammar expression such as `-65 * mV`; for refractory
    /// periods this may also be a condition
    Text(String),
    WithUnit {
        value: f64,
        unit: String,
    },
    WithDimensions {
        value: f64,
        dimensions: [i32; 7],
    },
}

impl QuantityDef {
    pub fn resolve(&self, catalogue: &UnitCatalogue) -> Result<Quantity> {
        match self {
            QuantityDef::Number(n) => Ok(Quantity::dimensionless(*n)),
            QuantityDef::Text(source) => Quantity::parse(source, catalogue),
            QuantityDef::WithUnit { value, unit } => {
                let unit = Quantity::parse(unit, catalogue)?;
                Ok(Quantity::new(*value, unit.dims))
            }
            QuantityDef::WithDimensions { value, dimensions } => {
                Ok(Quantity::new(*value, Dimensions(*dimensions)))
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
pub enum EquationKind {
    #[serde(rename = "differential equation", alias = "differential")]
    Differential,
    #[serde(rename = "subexpression")]
    Subexpression,
    #[serde(rename = "parameter")]
    Parameter,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Equation {
    #[serde(rename = "type")]
    pub kind: EquationKind,
    /// unit expression, e.g. `volt` or `metre ** 2`; `1` when dimensionless
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub expr: Option<String>,
    #[serde(default)]
    pub flags: Vec<String>,
}

impl Equation {
    /// Whether the variable is frozen while its neuron is refractory.
    pub fn unless_refractory(&self) -> bool {
        self.flags.iter().any(|flag| {
            matches!(
                flag.as_str(),
                "unless refractory" | "unless_refractory" | "unless-refractory"
            )
        })
    }

    pub fn dims(&self, catalogue: &UnitCatalogue) -> Result<Dimensions> {
        match self.unit.as_deref() {
            None | Some("") | Some("1") => Ok(Dimensions::NONE),
            Some(unit) => Ok(Quantity::parse(unit, catalogue)?.dims),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Code {
    pub code: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Event {
    pub threshold: Code,
    #[serde(default)]
    pub reset: Option<Code>,
    #[serde(default)]
    pub refractory: Option<QuantityDef>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NeuronGroup {
    pub name: String,
    #[serde(rename = "N")]
    pub n: u64,
    #[serde(default)]
    pub equations: IndexMap<String, Equation>,
    #[serde(default)]
    pub identifiers: IndexMap<String, QuantityDef>,
    #[serde(default)]
    pub events: IndexMap<String, Event>,
}

/// Which instances a monitor records.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Record {
    All(bool),
    Indices(Vec<u64>),
}

impl Default for Record {
    fn default() -> Self {
        Record::All(true)
    }
}

impl Record {
    /// The recorded indices for a population of size `n`.
    pub fn indices(&self, n: u64) -> Result<Vec<u64>> {
        match self {
            Record::All(true) => Ok((0..n).collect()),
            Record::All(false) => Ok(vec![]),
            Record::Indices(indices) => {
                if let Some(bad) = indices.iter().find(|&&idx| idx >= n) {
                    return model_err!(
                        BadRecordIndex,
                        format!("index {bad} in a population of {n}")
                    );
                }
                Ok(indices.clone())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StateMonitor {
    pub name: String,
    pub source: String,
    pub variables: Vec<String>,
    #[serde(default)]
    pub record: Record,
    #[serde(default)]
    pub dt: Option<QuantityDef>,
}

fn spike() -> String {
    "spike".to_owned()
}

/// Spike and event monitors share one shape; spike monitors watch the
/// `spike` event.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct EventMonitor {
    pub name: String,
    pub source: String,
    #[serde(default = "spike")]
    pub event: String,
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub record: Record,
}

/// Any component we recognize but cannot export.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Unsupported {
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Component {
    NeuronGroup(NeuronGroup),
    StateMonitor(StateMonitor),
    SpikeMonitor(EventMonitor),
    EventMonitor(EventMonitor),
    Synapses(Unsupported),
    PoissonInput(Unsupported),
    PoissonGroup(Unsupported),
    SpikeGeneratorGroup(Unsupported),
}

impl Component {
    pub fn name(&self) -> &str {
        match self {
            Component::NeuronGroup(group) => &group.name,
            Component::StateMonitor(mon) => &mon.name,
            Component::SpikeMonitor(mon) | Component::EventMonitor(mon) => &mon.name,
            Component::Synapses(u)
            | Component::PoissonInput(u)
            | Component::PoissonGroup(u)
            | Component::SpikeGeneratorGroup(u) => &u.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Component::NeuronGroup(_) => "neurongroup",
            Component::StateMonitor(_) => "statemonitor",
            Component::SpikeMonitor(_) => "spikemonitor",
            Component::EventMonitor(_) => "eventmonitor",
            Component::Synapses(_) => "synapses",
            Component::PoissonInput(_) => "poissoninput",
            Component::PoissonGroup(_) => "poissongroup",
            Component::SpikeGeneratorGroup(_) => "spikegeneratorgroup",
        }
    }

    /// The group a monitor watches.
    pub fn source(&self) -> Option<&str> {
        match self {
            Component::StateMonitor(mon) => Some(&mon.source),
            Component::SpikeMonitor(mon) | Component::EventMonitor(mon) => Some(&mon.source),
            _ => None,
        }
    }

    /// Decode one component object of the given kind.
    fn decode(kind: &str, value: Value) -> Result<Self> {
        fn from_value<T: for<'de> Deserialize<'de>>(kind: &str, value: Value) -> Result<T> {
            serde_json::from_value(value)
                .or_else(|err| import_err!(InputDeserialization, format!("{kind}: {err}")))
        }

        let component = match kind {
            "neurongroup" => Component::NeuronGroup(from_value(kind, value)?),
            "statemonitor" => Component::StateMonitor(from_value(kind, value)?),
            "spikemonitor" => Component::SpikeMonitor(from_value(kind, value)?),
            "eventmonitor" => Component::EventMonitor(from_value(kind, value)?),
            "synapses" => Component::Synapses(from_value(kind, value)?),
            "poissoninput" => Component::PoissonInput(from_value(kind, value)?),
            "poissongroup" => Component::PoissonGroup(from_value(kind, value)?),
            "spikegeneratorgroup" => Component::SpikeGeneratorGroup(from_value(kind, value)?),
            _ => return import_err!(UnknownComponentKind, kind.to_owned()),
        };
        Ok(component)
    }
}

/// Which instances an initializer applies to.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InitIndex {
    All(bool),
    Condition(String),
    Indices(Vec<u64>),
}

impl Default for InitIndex {
    fn default() -> Self {
        InitIndex::All(true)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Initializer {
    pub source: String,
    pub variable: String,
    pub value: QuantityDef,
    #[serde(default)]
    pub index: InitIndex,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Connector {
    pub synapses: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InitializerOrConnector {
    Initializer(Initializer),
    Connect(Connector),
}

/// One run dictionary as it appears on the wire.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RunDict {
    pub duration: QuantityDef,
    #[serde(default)]
    pub dt: Option<QuantityDef>,
    #[serde(default)]
    pub components: IndexMap<String, Vec<Value>>,
    #[serde(default)]
    pub initializers_connectors: Vec<InitializerOrConnector>,
}

/// A decoded run: components in input order, kinds checked.
#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    pub duration: QuantityDef,
    pub dt: Option<QuantityDef>,
    pub components: Vec<Component>,
    pub initializers: Vec<Initializer>,
    pub connectors: Vec<Connector>,
}

impl Run {
    pub fn decode(dict: RunDict) -> Result<Self> {
        let mut components = Vec::new();
        for (kind, items) in dict.components.into_iter() {
            let kind = kind.to_lowercase();
            for item in items.into_iter() {
                components.push(Component::decode(&kind, item)?);
            }
        }

        let mut initializers = Vec::new();
        let mut connectors = Vec::new();
        for entry in dict.initializers_connectors.into_iter() {
            match entry {
                InitializerOrConnector::Initializer(init) => initializers.push(init),
                InitializerOrConnector::Connect(conn) => connectors.push(conn),
            }
        }

        Ok(Run {
            duration: dict.duration,
            dt: dict.dt,
            components,
            initializers,
            connectors,
        })
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name() == name)
    }

    pub fn neuron_groups(&self) -> impl Iterator<Item = &NeuronGroup> {
        self.components.iter().filter_map(|c| match c {
            Component::NeuronGroup(group) => Some(group),
            _ => None,
        })
    }

    /// The run's integration step: explicit, else the first monitor's,
    /// else 0.1 ms.
    pub fn dt(&self) -> QuantityDef {
        if let Some(dt) = &self.dt {
            return dt.clone();
        }
        self.components
            .iter()
            .find_map(|c| match c {
                Component::StateMonitor(mon) => mon.dt.clone(),
                _ => None,
            })
            .unwrap_or_else(|| QuantityDef::Text("0.1 * ms".to_owned()))
    }
}

/// Parse the serialized dictionary into its list of runs.
pub fn runs_from_json(json: &str) -> Result<Vec<RunDict>> {
    match serde_json::from_str(json) {
        Ok(runs) => Ok(runs),
        Err(err) => import_err!(InputDeserialization, err.to_string()),
    }
}

/// The single run an export works on.
pub fn single_run(mut runs: Vec<RunDict>) -> Result<Run> {
    match runs.len() {
        0 => model_err!(NoRuns, "the dictionary has no runs".to_owned()),
        1 => Run::decode(runs.remove(0)),
        n => model_err!(MultipleRuns, format!("{n} runs, only one is supported")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;

    const RUN: &str = r#"[{
        "duration": "100 * ms",
        "components": {
            "neurongroup": [{
                "name": "neurongroup",
                "N": 10,
                "equations": {
                    "v": {"type": "differential equation", "unit": "volt",
                          "expr": "(v_rest - v) / tau", "flags": ["unless refractory"]},
                    "g": {"type": "parameter", "unit": "siemens"},
                    "I": {"type": "subexpression", "unit": "amp", "expr": "g * v"}
                },
                "identifiers": {"v_rest": "-65 * mV", "tau": {"value": 0.01, "unit": "second"}},
                "events": {"spike": {"threshold": {"code": "v > -50*mV"},
                                     "reset": {"code": "v = v_rest"},
                                     "refractory": "5 * ms"}}
            }],
            "statemonitor": [{"name": "mon", "source": "neurongroup",
                              "variables": ["v"], "record": [0, 1], "dt": "0.05 * ms"}],
            "spikemonitor": [{"name": "spikes", "source": "neurongroup"}]
        },
        "initializers_connectors": [
            {"type": "initializer", "source": "neurongroup", "variable": "v",
             "value": "v_rest", "index": true}
        ]
    }]"#;

    #[test]
    fn test_decode_run() {
        let run = single_run(runs_from_json(RUN).unwrap()).unwrap();
        assert_eq!(3, run.components.len());
        assert_eq!(
            vec!["neurongroup", "statemonitor", "spikemonitor"],
            run.components.iter().map(|c| c.kind()).collect::<Vec<_>>()
        );

        let group = run.neuron_groups().next().unwrap();
        assert_eq!(10, group.n);
        // equation order follows the document
        assert_eq!(vec!["v", "g", "I"], group.equations.keys().collect::<Vec<_>>());
        assert_eq!(vec!["v_rest", "tau"], group.identifiers.keys().collect::<Vec<_>>());
        assert_eq!(Some(1), group.identifiers.get_index_of("tau"));
        let v = group.equations.get("v").unwrap();
        assert_eq!(EquationKind::Differential, v.kind);
        assert!(v.unless_refractory());
        assert_eq!(
            Some(&QuantityDef::Text("5 * ms".to_owned())),
            group.events.get("spike").unwrap().refractory.as_ref()
        );

        match run.component("spikes").unwrap() {
            Component::SpikeMonitor(mon) => {
                assert_eq!("spike", mon.event);
                assert_eq!(Record::All(true), mon.record);
            }
            other => panic!("unexpected {other:?}"),
        }

        assert_eq!(1, run.initializers.len());
        assert_eq!(InitIndex::All(true), run.initializers[0].index);
        assert_eq!(QuantityDef::Text("0.05 * ms".to_owned()), run.dt());
    }

    #[test]
    fn test_quantity_forms() {
        let catalogue = UnitCatalogue::bundled().unwrap();
        let forms: Vec<QuantityDef> =
            serde_json::from_str(r#"[3, "10 * ms", {"value": 0.01, "unit": "second"},
                                   {"value": 0.01, "dimensions": [0, 0, 1, 0, 0, 0, 0]}]"#)
                .unwrap();
        let resolved: Vec<Quantity> = forms
            .iter()
            .map(|q| q.resolve(&catalogue).unwrap())
            .collect();
        assert!(resolved[0].is_dimensionless());
        for q in resolved[1..].iter() {
            assert_eq!(Dimensions::TIME, q.dims);
            assert!((q.value - 0.01).abs() < 1e-12);
        }
    }

    #[test]
    fn test_run_count() {
        let err = single_run(runs_from_json("[]").unwrap()).unwrap_err();
        assert_eq!(ErrorCode::NoRuns, err.code);

        let two = r#"[{"duration": 1}, {"duration": 1}]"#;
        let err = single_run(runs_from_json(two).unwrap()).unwrap_err();
        assert_eq!(ErrorCode::MultipleRuns, err.code);
    }

    #[test]
    fn test_component_kinds() {
        let unknown = r#"[{"duration": 1, "components": {"spatialneuron": [{"name": "x"}]}}]"#;
        let err = single_run(runs_from_json(unknown).unwrap()).unwrap_err();
        assert_eq!(ErrorCode::UnknownComponentKind, err.code);

        let synapses = r#"[{"duration": 1, "components": {"synapses": [{"name": "syn"}]},
                           "initializers_connectors": [{"type": "connect", "synapses": "syn"}]}]"#;
        let run = single_run(runs_from_json(synapses).unwrap()).unwrap();
        assert!(matches!(run.components[0], Component::Synapses(_)));
        assert_eq!("syn", run.connectors[0].synapses);
    }

    #[test]
    fn test_record_indices() {
        assert_eq!(vec![0, 1, 2], Record::All(true).indices(3).unwrap());
        assert!(Record::All(false).indices(3).unwrap().is_empty());
        assert_eq!(vec![2], Record::Indices(vec![2]).indices(3).unwrap());
        let err = Record::Indices(vec![3]).indices(3).unwrap_err();
        assert_eq!(ErrorCode::BadRecordIndex, err.code);
    }

    #[test]
    fn test_bad_input() {
        let err = runs_from_json("{not json").unwrap_err();
        assert_eq!(ErrorCode::InputDeserialization, err.code);
    }
}

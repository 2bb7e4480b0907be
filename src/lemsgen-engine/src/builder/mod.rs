// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Turns one decoded run into a LEMS document.
//!
//! Every reference is checked before anything is built, so a failed
//! export never yields part of a document.

use std::collections::{HashMap, HashSet};

use crate::common::Result;
use crate::config::ExportOptions;
use crate::datamodel::{Component, QuantityDef, Run, RunDict, runs_from_json, single_run};
use crate::dimensions::{Dimensions, UnitCatalogue};
use crate::lems::{self, Document, Network, Simulation};
use crate::units::{Quantity, UnitRegistry};
use crate::{import_err, model_err};

pub mod cell;
pub mod population;
pub mod recording;

use self::cell::BuiltGroup;
use self::population::{Population, instantiate};
use self::recording::{RecordTarget, RecordingAssembler};

/// The result of an export: the document plus the names of the files a
/// simulator writes when running it.
#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq)]
pub struct Export {
    pub document: Document,
    pub recording_files: Vec<String>,
    /// the units artifact to copy next to the document, if included
    pub units_file: Option<String>,
}

impl Export {
    pub fn population(&self, group: &str) -> Option<&lems::Population> {
        let id = population::population_id(group);
        self.document.network.populations().find(|pop| pop.id == id)
    }
}

/// Export a serialized run list.
pub fn export_json(json: &str, catalogue: &UnitCatalogue, options: &ExportOptions) -> Result<Export> {
    export(runs_from_json(json)?, catalogue, options)
}

pub fn export(
    runs: Vec<RunDict>,
    catalogue: &UnitCatalogue,
    options: &ExportOptions,
) -> Result<Export> {
    let run = single_run(runs)?;
    validate(&run)?;

    let mut registry = UnitRegistry::new();
    let duration = time_quantity(&run.duration, "duration", catalogue)?;
    let dt = time_quantity(&run.dt(), "dt", catalogue)?;

    let mut component_types = vec![];
    let mut components = vec![];
    let mut network = Network::new(&options.network_id);
    let mut placed: HashMap<&str, (BuiltGroup, Population)> = HashMap::new();

    for group in run.neuron_groups() {
        let initializers: Vec<_> = run
            .initializers
            .iter()
            .filter(|init| init.source == group.name)
            .collect();
        let built = cell::build(group, &initializers, catalogue, &mut registry)?;
        let population = instantiate(&built, group.n)?;

        component_types.push(built.component_type.clone());
        match population {
            Population::Single { ref component, .. } => components.push(component.clone()),
            Population::Multi {
                ref component_type,
                ..
            } => component_types.push(component_type.clone()),
        }
        network.elements.push(population.network_element());
        placed.insert(group.name.as_str(), (built, population));
    }

    let simulation = Simulation::new(
        &options.simulation_id,
        &registry.format_lems(catalogue, &duration),
        &registry.format_lems(catalogue, &dt),
        &options.network_id,
    );
    let mut recorder = RecordingAssembler::new(simulation, duration.value * 1e3, options);
    for component in run.components.iter() {
        let source = match component.source() {
            Some(source) => source,
            None => continue,
        };
        // validate() guarantees every monitor source was placed
        let (built, population) = match placed.get(source) {
            Some(entry) => entry,
            None => return model_err!(DoesNotExist, source.to_owned()),
        };
        let target = RecordTarget {
            population: population.id(),
            size: built.size,
            component_type: &built.component_type,
        };
        match component {
            Component::StateMonitor(monitor) => recorder.add_state_monitor(monitor, &target)?,
            Component::SpikeMonitor(monitor) | Component::EventMonitor(monitor) => {
                recorder.add_event_monitor(monitor, &target)?
            }
            _ => {}
        }
    }
    let (simulation, recording_files) = recorder.finish();

    let mut includes = options.core_includes.clone();
    if let Some(ref units_file) = options.units_file {
        includes.push(units_file.clone());
    }

    let document = Document {
        includes,
        dimensions: registry.dimensions().to_vec(),
        units: registry.units().to_vec(),
        component_types,
        components,
        network,
        target: simulation.id.clone(),
        simulation,
    };

    log::info!(
        "exported {} component types and {} recording files",
        document.component_types.len(),
        recording_files.len()
    );

    Ok(Export {
        document,
        recording_files,
        units_file: options.units_file.clone(),
    })
}

fn time_quantity(
    def: &QuantityDef,
    what: &str,
    catalogue: &UnitCatalogue,
) -> Result<Quantity> {
    let q = def.resolve(catalogue)?;
    if q.dims != Dimensions::TIME {
        return import_err!(BadQuantity, format!("{what} must be a time, not {}", q.dims));
    }
    Ok(q)
}

/// Check names, references and component kinds before building.
fn validate(run: &Run) -> Result<()> {
    let mut names = HashSet::new();
    for component in run.components.iter() {
        if !names.insert(component.name()) {
            return model_err!(DuplicateName, component.name().to_owned());
        }
    }

    let is_group = |name: &str| run.neuron_groups().any(|group| group.name == name);

    for component in run.components.iter() {
        if let Some(source) = component.source() {
            if !is_group(source) {
                return model_err!(
                    DoesNotExist,
                    format!("{} {} watches unknown group {}", component.kind(), component.name(), source)
                );
            }
        }
    }
    for init in run.initializers.iter() {
        if !is_group(&init.source) {
            return model_err!(
                DoesNotExist,
                format!("initializer for {}.{}", init.source, init.variable)
            );
        }
    }
    for conn in run.connectors.iter() {
        if run.component(&conn.synapses).is_none() {
            return model_err!(DoesNotExist, format!("connector for {}", conn.synapses));
        }
    }

    for component in run.components.iter() {
        match component {
            Component::NeuronGroup(group) => {
                if group.n == 0 {
                    return model_err!(BadPopulationSize, format!("{} has no neurons", group.name));
                }
            }
            Component::StateMonitor(_) | Component::SpikeMonitor(_) | Component::EventMonitor(_) => {}
            Component::Synapses(_) => {
                return model_err!(SynapsesNotSupported, component.name().to_owned());
            }
            Component::PoissonInput(_)
            | Component::PoissonGroup(_)
            | Component::SpikeGeneratorGroup(_) => {
                return model_err!(
                    UnsupportedComponent,
                    format!("{} {}", component.kind(), component.name())
                );
            }
        }
    }

    Ok(())
}

// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::builder::cell::{BuiltGroup, SIZE_VARIABLE, population_parameter};
use crate::common::Result;
use crate::dimensions::DIMENSIONLESS;
use crate::lems::{
    self, Assign, Component, ComponentType, MultiInstantiate, NetworkElement, Parameter, Structure,
};
use crate::model_err;

/// Base type of generated population wrappers.
pub const BASE_POPULATION: &str = "basePopulation";

/// The network-level id of a group's instances.
pub fn population_id(group: &str) -> String {
    format!("{group}pop")
}

/// How a group is placed in the network. A single neuron is a plain
/// component; larger groups get a wrapper type that multi-instantiates
/// the cell.
#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq)]
pub enum Population {
    Single {
        component: Component,
        population: lems::Population,
    },
    Multi {
        component_type: ComponentType,
        component: Component,
    },
}

impl Population {
    /// The id recording paths start from.
    pub fn id(&self) -> &str {
        match self {
            Population::Single { population, .. } => &population.id,
            Population::Multi { component, .. } => &component.id,
        }
    }

    pub fn network_element(&self) -> NetworkElement {
        match self {
            Population::Single { population, .. } => NetworkElement::Population(population.clone()),
            Population::Multi { component, .. } => NetworkElement::Component(component.clone()),
        }
    }
}

pub fn instantiate(built: &BuiltGroup, n: u64) -> Result<Population> {
    match n {
        0 => model_err!(BadPopulationSize, format!("{} has no neurons", built.name)),
        1 => Ok(single(built)),
        _ => Ok(multi(built, n)),
    }
}

fn single(built: &BuiltGroup) -> Population {
    let mut component = Component::new(&format!("{}Comp", built.name), &built.name);
    for (name, value) in built.parameter_values.iter() {
        component.set(name, value.clone());
    }

    let population = lems::Population {
        id: population_id(&built.name),
        component: component.id.clone(),
        size: 1,
    };

    Population::Single {
        component,
        population,
    }
}

fn multi(built: &BuiltGroup, n: u64) -> Population {
    let type_name = format!("{}Multi", built.name);
    let mut ct = ComponentType::new(&type_name, Some(BASE_POPULATION));
    let mut component = Component::new(&population_id(&built.name), &type_name);

    ct.parameters.push(Parameter {
        name: SIZE_VARIABLE.to_owned(),
        dimension: DIMENSIONLESS.to_owned(),
    });
    component.set(SIZE_VARIABLE, n.to_string());

    let mut assignments = vec![];
    for (name, value) in built.parameter_values.iter() {
        let parameter = population_parameter(name);
        let dimension = match built.component_type.property(name) {
            Some(property) => property.dimension.clone(),
            None => DIMENSIONLESS.to_owned(),
        };
        ct.parameters.push(Parameter {
            name: parameter.clone(),
            dimension,
        });
        component.set(&parameter, value.clone());
        assignments.push(Assign {
            property: name.clone(),
            value: parameter,
        });
    }

    for indexed in built.indexed_properties.iter() {
        for constant in indexed.constants.iter() {
            ct.add_constant(constant.clone());
        }
        assignments.push(Assign {
            property: indexed.property.clone(),
            value: indexed.value.clone(),
        });
    }

    ct.structure = Some(Structure {
        multi_instantiates: vec![MultiInstantiate {
            component_type: built.name.clone(),
            number: SIZE_VARIABLE.to_owned(),
            assignments,
        }],
    });

    log::debug!("{n} instances of {} via {type_name}", built.name);

    Population::Multi {
        component_type: ct,
        component,
    }
}

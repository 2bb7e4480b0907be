// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use quick_xml::Writer;

use crate::common::Result;
use crate::lems::{
    ToXml, XmlWriter, write_container, write_empty_tag_with_attrs, write_tag_end,
    write_tag_start_with_attrs,
};

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub dimension: String,
}

/// A per-instance value; unlike a `Parameter` it can be set by an
/// `Assign` inside a `MultiInstantiate`.
#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub dimension: String,
    pub default_value: Option<String>,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct Constant {
    pub name: String,
    pub dimension: String,
    pub value: String,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct Exposure {
    pub name: String,
    pub dimension: String,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct EventPort {
    pub name: String,
    pub direction: String,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct StateVariable {
    pub name: String,
    pub dimension: String,
    pub exposure: Option<String>,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedVariable {
    pub name: String,
    pub dimension: String,
    pub exposure: Option<String>,
    pub value: String,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct TimeDerivative {
    pub variable: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateAssignment {
    pub variable: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    EventOut(String),
    StateAssignment(StateAssignment),
    Transition(String),
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq, Default)]
pub struct OnStart {
    pub assignments: Vec<StateAssignment>,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq, Default)]
pub struct OnEntry {
    pub assignments: Vec<StateAssignment>,
}

/// An event handler: when `test` becomes true the actions run in order.
#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct OnCondition {
    pub test: String,
    pub actions: Vec<Action>,
}

impl OnCondition {
    pub fn transitions(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().filter_map(|action| match action {
            Action::Transition(regime) => Some(regime.as_str()),
            _ => None,
        })
    }
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct Regime {
    pub name: String,
    pub initial: bool,
    pub time_derivatives: Vec<TimeDerivative>,
    pub on_entry: Option<OnEntry>,
    pub on_conditions: Vec<OnCondition>,
}

impl Regime {
    pub fn derives(&self, variable: &str) -> bool {
        self.time_derivatives.iter().any(|td| td.variable == variable)
    }
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Dynamics {
    pub state_variables: Vec<StateVariable>,
    pub derived_variables: Vec<DerivedVariable>,
    /// derivatives of a flat (regime-less) block
    pub time_derivatives: Vec<TimeDerivative>,
    pub on_start: Option<OnStart>,
    pub on_conditions: Vec<OnCondition>,
    pub regimes: Vec<Regime>,
}

impl Dynamics {
    pub fn state_variable(&self, name: &str) -> Option<&StateVariable> {
        self.state_variables.iter().find(|sv| sv.name == name)
    }

    pub fn regime(&self, name: &str) -> Option<&Regime> {
        self.regimes.iter().find(|r| r.name == name)
    }

    fn is_empty(&self) -> bool {
        self.state_variables.is_empty()
            && self.derived_variables.is_empty()
            && self.time_derivatives.is_empty()
            && self.on_start.is_none()
            && self.on_conditions.is_empty()
            && self.regimes.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assign {
    pub property: String,
    pub value: String,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct MultiInstantiate {
    pub component_type: String,
    /// a literal count or the name of a parameter holding it
    pub number: String,
    pub assignments: Vec<Assign>,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Structure {
    pub multi_instantiates: Vec<MultiInstantiate>,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct ComponentType {
    pub name: String,
    pub extends: Option<String>,
    pub parameters: Vec<Parameter>,
    pub properties: Vec<Property>,
    pub constants: Vec<Constant>,
    pub exposures: Vec<Exposure>,
    pub event_ports: Vec<EventPort>,
    pub structure: Option<Structure>,
    pub dynamics: Option<Dynamics>,
}

impl ComponentType {
    pub fn new(name: &str, extends: Option<&str>) -> Self {
        ComponentType {
            name: name.to_owned(),
            extends: extends.map(|s| s.to_owned()),
            parameters: vec![],
            properties: vec![],
            constants: vec![],
            exposures: vec![],
            event_ports: vec![],
            structure: None,
            dynamics: None,
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.iter().find(|c| c.name == name)
    }

    /// Add a constant unless one with the same name is already declared.
    pub fn add_constant(&mut self, constant: Constant) {
        if self.constant(&constant.name).is_none() {
            self.constants.push(constant);
        }
    }
}

impl ToXml<XmlWriter> for Parameter {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let attrs = [
            ("name", self.name.as_str()),
            ("dimension", self.dimension.as_str()),
        ];
        write_empty_tag_with_attrs(writer, "Parameter", &attrs)
    }
}

impl ToXml<XmlWriter> for Property {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let mut attrs = vec![
            ("name", self.name.as_str()),
            ("dimension", self.dimension.as_str()),
        ];
        if let Some(ref default_value) = self.default_value {
            attrs.push(("defaultValue", default_value.as_str()));
        }
        write_empty_tag_with_attrs(writer, "Property", &attrs)
    }
}

impl ToXml<XmlWriter> for Constant {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let attrs = [
            ("name", self.name.as_str()),
            ("value", self.value.as_str()),
            ("dimension", self.dimension.as_str()),
        ];
        write_empty_tag_with_attrs(writer, "Constant", &attrs)
    }
}

impl ToXml<XmlWriter> for Exposure {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let attrs = [
            ("name", self.name.as_str()),
            ("dimension", self.dimension.as_str()),
        ];
        write_empty_tag_with_attrs(writer, "Exposure", &attrs)
    }
}

impl ToXml<XmlWriter> for EventPort {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let attrs = [
            ("name", self.name.as_str()),
            ("direction", self.direction.as_str()),
        ];
        write_empty_tag_with_attrs(writer, "EventPort", &attrs)
    }
}

impl ToXml<XmlWriter> for StateVariable {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let mut attrs = vec![
            ("name", self.name.as_str()),
            ("dimension", self.dimension.as_str()),
        ];
        if let Some(ref exposure) = self.exposure {
            attrs.push(("exposure", exposure.as_str()));
        }
        write_empty_tag_with_attrs(writer, "StateVariable", &attrs)
    }
}

impl ToXml<XmlWriter> for DerivedVariable {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let mut attrs = vec![
            ("name", self.name.as_str()),
            ("dimension", self.dimension.as_str()),
        ];
        if let Some(ref exposure) = self.exposure {
            attrs.push(("exposure", exposure.as_str()));
        }
        attrs.push(("value", self.value.as_str()));
        write_empty_tag_with_attrs(writer, "DerivedVariable", &attrs)
    }
}

impl ToXml<XmlWriter> for TimeDerivative {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let attrs = [
            ("variable", self.variable.as_str()),
            ("value", self.value.as_str()),
        ];
        write_empty_tag_with_attrs(writer, "TimeDerivative", &attrs)
    }
}

impl ToXml<XmlWriter> for StateAssignment {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let attrs = [
            ("variable", self.variable.as_str()),
            ("value", self.value.as_str()),
        ];
        write_empty_tag_with_attrs(writer, "StateAssignment", &attrs)
    }
}

impl ToXml<XmlWriter> for Action {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        match self {
            Action::EventOut(port) => {
                write_empty_tag_with_attrs(writer, "EventOut", &[("port", port.as_str())])
            }
            Action::StateAssignment(assignment) => assignment.write_xml(writer),
            Action::Transition(regime) => {
                write_empty_tag_with_attrs(writer, "Transition", &[("regime", regime.as_str())])
            }
        }
    }
}

impl ToXml<XmlWriter> for OnStart {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        write_container(writer, "OnStart", &[], &self.assignments)
    }
}

impl ToXml<XmlWriter> for OnEntry {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        write_container(writer, "OnEntry", &[], &self.assignments)
    }
}

impl ToXml<XmlWriter> for OnCondition {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        write_container(writer, "OnCondition", &[("test", self.test.as_str())], &self.actions)
    }
}

impl ToXml<XmlWriter> for Regime {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let mut attrs = vec![("name", self.name.as_str())];
        if self.initial {
            attrs.push(("initial", "true"));
        }
        write_tag_start_with_attrs(writer, "Regime", &attrs)?;
        for td in self.time_derivatives.iter() {
            td.write_xml(writer)?;
        }
        if let Some(ref on_entry) = self.on_entry {
            on_entry.write_xml(writer)?;
        }
        for oc in self.on_conditions.iter() {
            oc.write_xml(writer)?;
        }
        write_tag_end(writer, "Regime")
    }
}

impl ToXml<XmlWriter> for Dynamics {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        if self.is_empty() {
            return write_empty_tag_with_attrs(writer, "Dynamics", &[]);
        }
        write_tag_start_with_attrs(writer, "Dynamics", &[])?;
        for sv in self.state_variables.iter() {
            sv.write_xml(writer)?;
        }
        for dv in self.derived_variables.iter() {
            dv.write_xml(writer)?;
        }
        for td in self.time_derivatives.iter() {
            td.write_xml(writer)?;
        }
        if let Some(ref on_start) = self.on_start {
            on_start.write_xml(writer)?;
        }
        for oc in self.on_conditions.iter() {
            oc.write_xml(writer)?;
        }
        for regime in self.regimes.iter() {
            regime.write_xml(writer)?;
        }
        write_tag_end(writer, "Dynamics")
    }
}

impl ToXml<XmlWriter> for Assign {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let attrs = [
            ("property", self.property.as_str()),
            ("value", self.value.as_str()),
        ];
        write_empty_tag_with_attrs(writer, "Assign", &attrs)
    }
}

impl ToXml<XmlWriter> for MultiInstantiate {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let attrs = [
            ("componentType", self.component_type.as_str()),
            ("number", self.number.as_str()),
        ];
        write_container(writer, "MultiInstantiate", &attrs, &self.assignments)
    }
}

impl ToXml<XmlWriter> for Structure {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        write_container(writer, "Structure", &[], &self.multi_instantiates)
    }
}

impl ToXml<XmlWriter> for ComponentType {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let mut attrs = vec![("name", self.name.as_str())];
        if let Some(ref extends) = self.extends {
            attrs.push(("extends", extends.as_str()));
        }
        write_tag_start_with_attrs(writer, "ComponentType", &attrs)?;

        for p in self.parameters.iter() {
            p.write_xml(writer)?;
        }
        for p in self.properties.iter() {
            p.write_xml(writer)?;
        }
        for c in self.constants.iter() {
            c.write_xml(writer)?;
        }
        for e in self.exposures.iter() {
            e.write_xml(writer)?;
        }
        for port in self.event_ports.iter() {
            port.write_xml(writer)?;
        }
        if let Some(ref structure) = self.structure {
            structure.write_xml(writer)?;
        }
        if let Some(ref dynamics) = self.dynamics {
            dynamics.write_xml(writer)?;
        }

        write_tag_end(writer, "ComponentType")
    }
}

// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The LEMS document tree and its XML writer.
//!
//! Element and attribute names follow LEMS and NeuroML2 exactly so the
//! output loads in jLEMS, pyLEMS and the NeuroML tool chain.

use std::io::{Cursor, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use crate::common::{Error, ErrorCode, ErrorKind, Result};
use crate::dimensions::{BASE_DIMENSIONS, DimensionDef, UnitDef};

pub mod component;
pub mod simulation;

pub use self::component::{
    Action, Assign, ComponentType, Constant, DerivedVariable, Dynamics, EventPort, Exposure,
    MultiInstantiate, OnCondition, OnEntry, OnStart, Parameter, Property, Regime,
    StateAssignment, StateVariable, Structure, TimeDerivative,
};
pub use self::simulation::{
    Component, Display, EventOutputFile, EventSelection, Line, Network, NetworkElement,
    OutputColumn, OutputFile, Population, Simulation,
};

pub(crate) trait ToXml<W: Clone + Write> {
    fn write_xml(&self, writer: &mut Writer<W>) -> Result<()>;
}

pub(crate) type XmlWriter = Cursor<Vec<u8>>;

pub(crate) fn xml_error(err: std::io::Error) -> Error {
    Error::new(
        ErrorKind::Export,
        ErrorCode::XmlSerialization,
        Some(err.to_string()),
    )
}

pub(crate) fn write_tag_start(writer: &mut Writer<XmlWriter>, tag_name: &str) -> Result<()> {
    write_tag_start_with_attrs(writer, tag_name, &[])
}

pub(crate) fn write_tag_start_with_attrs(
    writer: &mut Writer<XmlWriter>,
    tag_name: &str,
    attrs: &[(&str, &str)],
) -> Result<()> {
    let mut elem = BytesStart::new(tag_name);
    for attr in attrs.iter() {
        elem.push_attribute(*attr);
    }
    writer.write_event(Event::Start(elem)).map_err(xml_error)
}

pub(crate) fn write_tag_end(writer: &mut Writer<XmlWriter>, tag_name: &str) -> Result<()> {
    writer
        .write_event(Event::End(BytesEnd::new(tag_name)))
        .map_err(xml_error)
}

/// Write a childless element, `<tag a="b"/>`.
pub(crate) fn write_empty_tag_with_attrs(
    writer: &mut Writer<XmlWriter>,
    tag_name: &str,
    attrs: &[(&str, &str)],
) -> Result<()> {
    let mut elem = BytesStart::new(tag_name);
    for attr in attrs.iter() {
        elem.push_attribute(*attr);
    }
    writer.write_event(Event::Empty(elem)).map_err(xml_error)
}

/// Write `items` wrapped in `tag_name`, or an empty element when there
/// are no children.
pub(crate) fn write_container<T: ToXml<XmlWriter>>(
    writer: &mut Writer<XmlWriter>,
    tag_name: &str,
    attrs: &[(&str, &str)],
    items: &[T],
) -> Result<()> {
    if items.is_empty() {
        return write_empty_tag_with_attrs(writer, tag_name, attrs);
    }
    write_tag_start_with_attrs(writer, tag_name, attrs)?;
    for item in items.iter() {
        item.write_xml(writer)?;
    }
    write_tag_end(writer, tag_name)
}

impl ToXml<XmlWriter> for DimensionDef {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let exps: Vec<String> = self.dims.0.iter().map(|e| e.to_string()).collect();
        let mut attrs = vec![("name", self.name.as_str())];
        for (base, exp) in BASE_DIMENSIONS.iter().zip(exps.iter()) {
            if exp != "0" {
                attrs.push((base, exp.as_str()));
            }
        }
        write_empty_tag_with_attrs(writer, "Dimension", &attrs)
    }
}

impl ToXml<XmlWriter> for UnitDef {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let power = self.power.to_string();
        let scale = self.scale.to_string();
        let mut attrs = vec![
            ("symbol", self.symbol.as_str()),
            ("dimension", self.dimension.as_str()),
            ("power", power.as_str()),
        ];
        if self.scale != 1.0 {
            attrs.push(("scale", scale.as_str()));
        }
        write_empty_tag_with_attrs(writer, "Unit", &attrs)
    }
}

/// The root `Lems` element.
#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq)]
pub struct Document {
    pub includes: Vec<String>,
    /// dimensions and units the catalogue lacked
    pub dimensions: Vec<DimensionDef>,
    pub units: Vec<UnitDef>,
    pub component_types: Vec<ComponentType>,
    pub components: Vec<Component>,
    pub network: Network,
    pub simulation: Simulation,
    /// the component the simulator runs
    pub target: String,
}

impl Document {
    pub fn component_type(&self, name: &str) -> Option<&ComponentType> {
        self.component_types.iter().find(|ct| ct.name == name)
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 4);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        self.write_xml(&mut writer)?;

        let result = writer.into_inner().into_inner();

        String::from_utf8(result).map_err(|_err| {
            Error::new(
                ErrorKind::Export,
                ErrorCode::XmlSerialization,
                Some("problem converting to UTF-8".to_owned()),
            )
        })
    }
}

impl ToXml<XmlWriter> for Document {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        write_tag_start(writer, "Lems")?;

        write_empty_tag_with_attrs(writer, "Target", &[("component", self.target.as_str())])?;

        for include in self.includes.iter() {
            write_empty_tag_with_attrs(writer, "Include", &[("file", include.as_str())])?;
        }

        for dim in self.dimensions.iter() {
            dim.write_xml(writer)?;
        }
        for unit in self.units.iter() {
            unit.write_xml(writer)?;
        }

        for ct in self.component_types.iter() {
            ct.write_xml(writer)?;
        }
        for component in self.components.iter() {
            component.write_xml(writer)?;
        }

        self.network.write_xml(writer)?;
        self.simulation.write_xml(writer)?;

        write_tag_end(writer, "Lems")
    }
}

// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use quick_xml::Writer;

use crate::common::Result;
use crate::lems::{
    ToXml, XmlWriter, write_container, write_empty_tag_with_attrs, write_tag_end,
    write_tag_start_with_attrs,
};

/// An instance of a component type; `attributes` carry parameter values
/// in insertion order.
#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct Component {
    pub id: String,
    pub type_name: String,
    pub attributes: Vec<(String, String)>,
}

impl Component {
    pub fn new(id: &str, type_name: &str) -> Self {
        Component {
            id: id.to_owned(),
            type_name: type_name.to_owned(),
            attributes: vec![],
        }
    }

    pub fn set(&mut self, name: &str, value: String) {
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some(attr) => attr.1 = value,
            None => self.attributes.push((name.to_owned(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct Population {
    pub id: String,
    pub component: String,
    pub size: usize,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub enum NetworkElement {
    Population(Population),
    Component(Component),
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct Network {
    pub id: String,
    pub elements: Vec<NetworkElement>,
}

impl Network {
    pub fn new(id: &str) -> Self {
        Network {
            id: id.to_owned(),
            elements: vec![],
        }
    }

    pub fn populations(&self) -> impl Iterator<Item = &Population> {
        self.elements.iter().filter_map(|el| match el {
            NetworkElement::Population(pop) => Some(pop),
            NetworkElement::Component(_) => None,
        })
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.elements.iter().filter_map(|el| match el {
            NetworkElement::Component(c) => Some(c),
            NetworkElement::Population(_) => None,
        })
    }
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq)]
pub struct Line {
    pub id: String,
    pub quantity: String,
    pub scale: String,
    pub time_scale: String,
    pub color: String,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq)]
pub struct Display {
    pub id: String,
    pub title: String,
    pub time_scale: String,
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub lines: Vec<Line>,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct OutputColumn {
    pub id: String,
    pub quantity: String,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub id: String,
    pub file_name: String,
    pub columns: Vec<OutputColumn>,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct EventSelection {
    pub id: String,
    pub select: String,
    pub event_port: String,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct EventOutputFile {
    pub id: String,
    pub file_name: String,
    pub format: String,
    pub selections: Vec<EventSelection>,
}

#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq)]
pub struct Simulation {
    pub id: String,
    pub length: String,
    pub step: String,
    pub target: String,
    pub displays: Vec<Display>,
    pub output_files: Vec<OutputFile>,
    pub event_output_files: Vec<EventOutputFile>,
}

impl Simulation {
    pub fn new(id: &str, length: &str, step: &str, target: &str) -> Self {
        Simulation {
            id: id.to_owned(),
            length: length.to_owned(),
            step: step.to_owned(),
            target: target.to_owned(),
            displays: vec![],
            output_files: vec![],
            event_output_files: vec![],
        }
    }

    fn has_children(&self) -> bool {
        !(self.displays.is_empty()
            && self.output_files.is_empty()
            && self.event_output_files.is_empty())
    }
}

impl ToXml<XmlWriter> for Component {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let mut attrs = vec![("id", self.id.as_str()), ("type", self.type_name.as_str())];
        for (name, value) in self.attributes.iter() {
            attrs.push((name.as_str(), value.as_str()));
        }
        write_empty_tag_with_attrs(writer, "Component", &attrs)
    }
}

impl ToXml<XmlWriter> for Population {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let size = self.size.to_string();
        let attrs = [
            ("id", self.id.as_str()),
            ("component", self.component.as_str()),
            ("size", size.as_str()),
        ];
        write_empty_tag_with_attrs(writer, "population", &attrs)
    }
}

impl ToXml<XmlWriter> for NetworkElement {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        match self {
            NetworkElement::Population(pop) => pop.write_xml(writer),
            NetworkElement::Component(c) => c.write_xml(writer),
        }
    }
}

impl ToXml<XmlWriter> for Network {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        write_container(writer, "network", &[("id", self.id.as_str())], &self.elements)
    }
}

impl ToXml<XmlWriter> for Line {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let attrs = [
            ("id", self.id.as_str()),
            ("quantity", self.quantity.as_str()),
            ("scale", self.scale.as_str()),
            ("timeScale", self.time_scale.as_str()),
            ("color", self.color.as_str()),
        ];
        write_empty_tag_with_attrs(writer, "Line", &attrs)
    }
}

impl ToXml<XmlWriter> for Display {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let xmin = self.xmin.to_string();
        let xmax = self.xmax.to_string();
        let ymin = self.ymin.to_string();
        let ymax = self.ymax.to_string();
        let attrs = [
            ("id", self.id.as_str()),
            ("title", self.title.as_str()),
            ("timeScale", self.time_scale.as_str()),
            ("xmin", xmin.as_str()),
            ("xmax", xmax.as_str()),
            ("ymin", ymin.as_str()),
            ("ymax", ymax.as_str()),
        ];
        write_container(writer, "Display", &attrs, &self.lines)
    }
}

impl ToXml<XmlWriter> for OutputColumn {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let attrs = [("id", self.id.as_str()), ("quantity", self.quantity.as_str())];
        write_empty_tag_with_attrs(writer, "OutputColumn", &attrs)
    }
}

impl ToXml<XmlWriter> for OutputFile {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let attrs = [("id", self.id.as_str()), ("fileName", self.file_name.as_str())];
        write_container(writer, "OutputFile", &attrs, &self.columns)
    }
}

impl ToXml<XmlWriter> for EventSelection {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let attrs = [
            ("id", self.id.as_str()),
            ("select", self.select.as_str()),
            ("eventPort", self.event_port.as_str()),
        ];
        write_empty_tag_with_attrs(writer, "EventSelection", &attrs)
    }
}

impl ToXml<XmlWriter> for EventOutputFile {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let attrs = [
            ("id", self.id.as_str()),
            ("fileName", self.file_name.as_str()),
            ("format", self.format.as_str()),
        ];
        write_container(writer, "EventOutputFile", &attrs, &self.selections)
    }
}

impl ToXml<XmlWriter> for Simulation {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let attrs = [
            ("id", self.id.as_str()),
            ("length", self.length.as_str()),
            ("step", self.step.as_str()),
            ("target", self.target.as_str()),
        ];
        if !self.has_children() {
            return write_empty_tag_with_attrs(writer, "Simulation", &attrs);
        }

        write_tag_start_with_attrs(writer, "Simulation", &attrs)?;
        for display in self.displays.iter() {
            display.write_xml(writer)?;
        }
        for of in self.output_files.iter() {
            of.write_xml(writer)?;
        }
        for eof in self.event_output_files.iter() {
            eof.write_xml(writer)?;
        }
        write_tag_end(writer, "Simulation")
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn write<T: ToXml<XmlWriter>>(item: &T) -> String {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        item.write_xml(&mut writer).unwrap();
        String::from_utf8(writer.into_inner().into_inner()).unwrap()
    }

    #[test]
    fn test_component_attributes() {
        let mut c = Component::new("cellpop", "cellMulti");
        c.set("N", "50".to_owned());
        c.set("tau_p", "10ms".to_owned());
        c.set("N", "40".to_owned());
        assert_eq!(Some("40"), c.get("N"));
        assert_eq!(
            r#"<Component id="cellpop" type="cellMulti" N="40" tau_p="10ms"/>"#,
            write(&c)
        );
    }

    #[test]
    fn test_network() {
        let mut net = Network::new("net");
        net.elements.push(NetworkElement::Population(Population {
            id: "cellpop".to_owned(),
            component: "cellComp".to_owned(),
            size: 1,
        }));
        net.elements
            .push(NetworkElement::Component(Component::new("grppop", "grpMulti")));
        assert_eq!(1, net.populations().count());
        assert_eq!(1, net.components().count());
        assert_eq!(
            concat!(
                r#"<network id="net">"#,
                r#"<population id="cellpop" component="cellComp" size="1"/>"#,
                r#"<Component id="grppop" type="grpMulti"/>"#,
                "</network>"
            ),
            write(&net)
        );
    }

    #[test]
    fn test_simulation_children() {
        let mut sim = Simulation::new("sim1", "100ms", "0.1ms", "net");
        sim.displays.push(Display {
            id: "disp0".to_owned(),
            title: "mon v".to_owned(),
            time_scale: "1ms".to_owned(),
            xmin: 0.0,
            xmax: 100.0,
            ymin: -0.1,
            ymax: 0.1,
            lines: vec![Line {
                id: "line0".to_owned(),
                quantity: "cellpop[0]/v".to_owned(),
                scale: "1".to_owned(),
                time_scale: "1ms".to_owned(),
                color: "#1f77b4".to_owned(),
            }],
        });
        sim.event_output_files.push(EventOutputFile {
            id: "eof0".to_owned(),
            file_name: "spikes.spikes".to_owned(),
            format: "ID_TIME".to_owned(),
            selections: vec![EventSelection {
                id: "0".to_owned(),
                select: "cellpop[0]".to_owned(),
                event_port: "spike".to_owned(),
            }],
        });

        let xml = write(&sim);
        assert!(xml.starts_with(
            r#"<Simulation id="sim1" length="100ms" step="0.1ms" target="net"><Display id="disp0" title="mon v" timeScale="1ms" xmin="0" xmax="100" ymin="-0.1" ymax="0.1">"#
        ));
        assert!(xml.contains(
            r##"<Line id="line0" quantity="cellpop[0]/v" scale="1" timeScale="1ms" color="#1f77b4"/>"##
        ));
        assert!(xml.contains(
            r#"<EventOutputFile id="eof0" fileName="spikes.spikes" format="ID_TIME"><EventSelection id="0" select="cellpop[0]" eventPort="spike"/></EventOutputFile>"#
        ));
        assert!(xml.ends_with("</Simulation>"));
    }
}

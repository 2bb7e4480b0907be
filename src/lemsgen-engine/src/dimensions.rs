// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The catalogue of canonical LEMS dimensions and units.
//!
//! The catalogue is read once from the bundled `LEMSUnitsConstants.xml`
//! and is immutable afterwards; callers pass it around by reference.

use std::fmt;
use std::ops::{Div, Mul};

use serde::Deserialize;

use crate::common::Result;
use crate::{import_err, model_err};

/// File name of the bundled units artifact; generated documents include it.
pub const UNITS_ARTIFACT_NAME: &str = "LEMSUnitsConstants.xml";

const UNITS_ARTIFACT: &str = include_str!("../resources/LEMSUnitsConstants.xml");

/// The name LEMS uses for dimensionless quantities.
pub const DIMENSIONLESS: &str = "none";

/// Base SI exponent names in vector order.
pub const BASE_DIMENSIONS: [&str; 7] = ["m", "l", "t", "i", "k", "n", "j"];

/// The text of the bundled units artifact, for copying next to a
/// generated document.
pub fn units_artifact() -> &'static str {
    UNITS_ARTIFACT
}

/// Exponents of mass, length, time, current, temperature, amount of
/// substance and luminous intensity.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dimensions(pub [i32; 7]);

impl Dimensions {
    pub const NONE: Dimensions = Dimensions([0; 7]);
    pub const TIME: Dimensions = Dimensions([0, 0, 1, 0, 0, 0, 0]);

    pub fn is_dimensionless(&self) -> bool {
        self.0.iter().all(|&e| e == 0)
    }

    pub fn powi(&self, exp: i32) -> Self {
        let mut result = *self;
        for e in result.0.iter_mut() {
            *e *= exp;
        }
        result
    }
}

impl Mul for Dimensions {
    type Output = Dimensions;

    fn mul(self, rhs: Dimensions) -> Dimensions {
        let mut result = self;
        for (e, r) in result.0.iter_mut().zip(rhs.0.iter()) {
            *e += r;
        }
        result
    }
}

impl Div for Dimensions {
    type Output = Dimensions;

    fn div(self, rhs: Dimensions) -> Dimensions {
        self * rhs.powi(-1)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = BASE_DIMENSIONS
            .iter()
            .zip(self.0.iter())
            .filter(|(_, e)| **e != 0)
            .map(|(name, e)| format!("{name}={e}"))
            .collect();
        if parts.is_empty() {
            write!(f, "{DIMENSIONLESS}")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DimensionDef {
    pub name: String,
    pub dims: Dimensions,
}

/// A named unit: one `symbol` is `scale * 10^power` of its dimension's
/// SI base combination.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitDef {
    pub symbol: String,
    pub dimension: String,
    pub power: i32,
    pub scale: f64,
    pub offset: f64,
}

impl UnitDef {
    /// Size of one of this unit in SI base units.
    pub fn si_factor(&self) -> f64 {
        self.scale * 10f64.powi(self.power)
    }
}

#[derive(Deserialize)]
struct DimensionXml {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@m")]
    m: Option<i32>,
    #[serde(rename = "@l")]
    l: Option<i32>,
    #[serde(rename = "@t")]
    t: Option<i32>,
    #[serde(rename = "@i")]
    i: Option<i32>,
    #[serde(rename = "@k")]
    k: Option<i32>,
    #[serde(rename = "@n")]
    n: Option<i32>,
    #[serde(rename = "@j")]
    j: Option<i32>,
}

#[derive(Deserialize)]
struct UnitXml {
    #[serde(rename = "@symbol")]
    symbol: String,
    #[serde(rename = "@dimension")]
    dimension: String,
    #[serde(rename = "@power")]
    power: Option<i32>,
    #[serde(rename = "@scale")]
    scale: Option<f64>,
    #[serde(rename = "@offset")]
    offset: Option<f64>,
}

#[derive(Deserialize)]
struct LemsUnitsXml {
    #[serde(rename = "Dimension", default)]
    dimensions: Vec<DimensionXml>,
    #[serde(rename = "Unit", default)]
    units: Vec<UnitXml>,
}

impl From<DimensionXml> for DimensionDef {
    fn from(dim: DimensionXml) -> Self {
        let exps = [dim.m, dim.l, dim.t, dim.i, dim.k, dim.n, dim.j];
        DimensionDef {
            name: dim.name,
            dims: Dimensions(exps.map(|e| e.unwrap_or(0))),
        }
    }
}

impl From<UnitXml> for UnitDef {
    fn from(unit: UnitXml) -> Self {
        UnitDef {
            symbol: unit.symbol,
            dimension: unit.dimension,
            power: unit.power.unwrap_or(0),
            scale: unit.scale.unwrap_or(1.0),
            offset: unit.offset.unwrap_or(0.0),
        }
    }
}

/// Canonical dimensions and units, in catalogue order.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitCatalogue {
    dimensions: Vec<DimensionDef>,
    units: Vec<UnitDef>,
}

impl UnitCatalogue {
    /// Load the catalogue bundled with this crate.
    pub fn bundled() -> Result<Self> {
        Self::from_xml(UNITS_ARTIFACT)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        use quick_xml::de;
        let file: LemsUnitsXml = match de::from_str(xml) {
            Ok(file) => file,
            Err(err) => {
                return import_err!(BadCatalogue, err.to_string());
            }
        };

        let catalogue = UnitCatalogue {
            dimensions: file.dimensions.into_iter().map(DimensionDef::from).collect(),
            units: file.units.into_iter().map(UnitDef::from).collect(),
        };

        for unit in catalogue.units.iter() {
            if catalogue.dimension(&unit.dimension).is_none() {
                return import_err!(
                    BadCatalogue,
                    format!("unit {} has unknown dimension {}", unit.symbol, unit.dimension)
                );
            }
        }

        Ok(catalogue)
    }

    /// Name of the first catalogue dimension whose exponents equal `dims`.
    /// Scale plays no part: millivolts and volts are both `voltage`.
    pub fn dimension_of(&self, dims: &Dimensions) -> Result<&str> {
        if dims.is_dimensionless() {
            return Ok(DIMENSIONLESS);
        }
        match self.find_dimension(dims) {
            Some(def) => Ok(&def.name),
            None => model_err!(UnknownDimension, format!("no dimension matches {dims}")),
        }
    }

    pub fn find_dimension(&self, dims: &Dimensions) -> Option<&DimensionDef> {
        self.dimensions.iter().find(|def| def.dims == *dims)
    }

    pub fn dimension(&self, name: &str) -> Option<&DimensionDef> {
        self.dimensions.iter().find(|def| def.name == name)
    }

    pub fn unit(&self, symbol: &str) -> Option<&UnitDef> {
        self.units.iter().find(|unit| unit.symbol == symbol)
    }

    /// Units belonging to the named dimension, in catalogue order.
    pub fn units_of<'a>(&'a self, dimension: &'a str) -> impl Iterator<Item = &'a UnitDef> + 'a {
        self.units.iter().filter(move |unit| unit.dimension == dimension)
    }

    /// The exponent vector of a catalogue unit.
    pub fn unit_dims(&self, unit: &UnitDef) -> Option<Dimensions> {
        self.dimension(&unit.dimension).map(|def| def.dims)
    }

    pub fn dimensions(&self) -> &[DimensionDef] {
        &self.dimensions
    }

    pub fn units(&self) -> &[UnitDef] {
        &self.units
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;

    #[test]
    fn test_bundled_catalogue() {
        let catalogue = UnitCatalogue::bundled().unwrap();
        let voltage = catalogue.dimension("voltage").unwrap();
        assert_eq!(Dimensions([1, 2, -3, -1, 0, 0, 0]), voltage.dims);

        let mv = catalogue.unit("mV").unwrap();
        assert_eq!("voltage", mv.dimension);
        assert_eq!(-3, mv.power);
        assert!((mv.si_factor() - 1e-3).abs() < 1e-15);

        let min = catalogue.unit("min").unwrap();
        assert!((min.si_factor() - 60.0).abs() < 1e-12);

        let deg_c = catalogue.unit("degC").unwrap();
        assert!((deg_c.offset - 273.15).abs() < 1e-12);
    }

    #[test]
    fn test_dimension_of() {
        let catalogue = UnitCatalogue::bundled().unwrap();
        assert_eq!("none", catalogue.dimension_of(&Dimensions::NONE).unwrap());
        assert_eq!("time", catalogue.dimension_of(&Dimensions::TIME).unwrap());
        assert_eq!(
            "conductance",
            catalogue
                .dimension_of(&Dimensions([-1, -2, 3, 2, 0, 0, 0]))
                .unwrap()
        );

        let err = catalogue
            .dimension_of(&Dimensions([0, 0, 7, 0, 0, 0, 0]))
            .unwrap_err();
        assert_eq!(ErrorCode::UnknownDimension, err.code);
    }

    #[test]
    fn test_first_match_wins() {
        let xml = r#"<Lems>
            <Dimension name="time" t="1"/>
            <Dimension name="duration" t="1"/>
            <Unit symbol="s" dimension="time" power="0"/>
        </Lems>"#;
        let catalogue = UnitCatalogue::from_xml(xml).unwrap();
        assert_eq!("time", catalogue.dimension_of(&Dimensions::TIME).unwrap());
    }

    #[test]
    fn test_bad_catalogue() {
        let xml = r#"<Lems><Unit symbol="s" dimension="time" power="0"/></Lems>"#;
        let err = UnitCatalogue::from_xml(xml).unwrap_err();
        assert_eq!(ErrorCode::BadCatalogue, err.code);
    }

    #[test]
    fn test_dimension_algebra() {
        let voltage = Dimensions([1, 2, -3, -1, 0, 0, 0]);
        let current = Dimensions([0, 0, 0, 1, 0, 0, 0]);
        let resistance = voltage / current;
        assert_eq!(Dimensions([1, 2, -3, -2, 0, 0, 0]), resistance);
        assert_eq!(Dimensions::NONE, voltage / voltage);
        assert_eq!("t=-2", format!("{}", Dimensions::TIME.powi(-2)));
        assert_eq!("none", format!("{}", Dimensions::NONE));
    }
}

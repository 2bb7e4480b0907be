// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Dimensioned quantities, unit-name lookup and LEMS value formatting.

use std::collections::HashSet;
use std::ops::{Div, Mul, Neg};

use float_cmp::approx_eq;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::common::Result;
use crate::dimensions::{DimensionDef, Dimensions, UnitCatalogue, UnitDef};
use crate::parser::parse;
use crate::render::format_number;
use crate::token::LexerType;
use crate::{expr_err, model_err};

/// Significant digits kept when printing a scaled value, enough to hide
/// the noise of dividing by powers of ten.
const SIGNIFICANT_DIGITS: usize = 12;

const SHORT_PREFIXES: &[(&str, i32)] = &[
    ("Y", 24),
    ("Z", 21),
    ("E", 18),
    ("P", 15),
    ("T", 12),
    ("G", 9),
    ("M", 6),
    ("k", 3),
    ("h", 2),
    ("da", 1),
    ("d", -1),
    ("c", -2),
    ("m", -3),
    ("u", -6),
    ("n", -9),
    ("p", -12),
    ("f", -15),
    ("a", -18),
    ("z", -21),
    ("y", -24),
];

const LONG_PREFIXES: &[(&str, i32)] = &[
    ("yotta", 24),
    ("zetta", 21),
    ("exa", 18),
    ("peta", 15),
    ("tera", 12),
    ("giga", 9),
    ("mega", 6),
    ("kilo", 3),
    ("hecto", 2),
    ("deka", 1),
    ("deca", 1),
    ("deci", -1),
    ("centi", -2),
    ("milli", -3),
    ("micro", -6),
    ("nano", -9),
    ("pico", -12),
    ("femto", -15),
    ("atto", -18),
    ("zepto", -21),
    ("yocto", -24),
];

/// Prefixes tried when formatting with a named SI unit.
const FORMAT_PREFIXES: &[(&str, i32)] = &[
    ("T", 12),
    ("G", 9),
    ("M", 6),
    ("k", 3),
    ("", 0),
    ("m", -3),
    ("u", -6),
    ("n", -9),
    ("p", -12),
    ("f", -15),
];

struct SiUnit {
    name: &'static str,
    symbol: &'static str,
    dims: [i32; 7],
    factor: f64,
    /// named coherent units are offered when formatting values
    named: bool,
}

const fn si(name: &'static str, symbol: &'static str, dims: [i32; 7], factor: f64, named: bool) -> SiUnit {
    SiUnit {
        name,
        symbol,
        dims,
        factor,
        named,
    }
}

#[rustfmt::skip]
const SI_UNITS: &[SiUnit] = &[
    si("metre",     "m",   [0, 1, 0, 0, 0, 0, 0], 1.0, false),
    si("meter",     "m",   [0, 1, 0, 0, 0, 0, 0], 1.0, false),
    si("gram",      "g",   [1, 0, 0, 0, 0, 0, 0], 1e-3, false),
    si("second",    "s",   [0, 0, 1, 0, 0, 0, 0], 1.0, false),
    si("amp",       "A",   [0, 0, 0, 1, 0, 0, 0], 1.0, false),
    si("ampere",    "A",   [0, 0, 0, 1, 0, 0, 0], 1.0, false),
    si("kelvin",    "K",   [0, 0, 0, 0, 1, 0, 0], 1.0, false),
    si("mole",      "mol", [0, 0, 0, 0, 0, 1, 0], 1.0, false),
    si("candela",   "cd",  [0, 0, 0, 0, 0, 0, 1], 1.0, false),
    si("volt",      "V",   [1, 2, -3, -1, 0, 0, 0], 1.0, true),
    si("siemens",   "S",   [-1, -2, 3, 2, 0, 0, 0], 1.0, true),
    si("farad",     "F",   [-1, -2, 4, 2, 0, 0, 0], 1.0, true),
    si("ohm",       "ohm", [1, 2, -3, -2, 0, 0, 0], 1.0, true),
    si("hertz",     "Hz",  [0, 0, -1, 0, 0, 0, 0], 1.0, true),
    si("coulomb",   "C",   [0, 0, 1, 1, 0, 0, 0], 1.0, true),
    si("newton",    "N",   [1, 1, -2, 0, 0, 0, 0], 1.0, true),
    si("joule",     "J",   [1, 2, -2, 0, 0, 0, 0], 1.0, true),
    si("watt",      "W",   [1, 2, -3, 0, 0, 0, 0], 1.0, true),
    si("pascal",    "Pa",  [1, -1, -2, 0, 0, 0, 0], 1.0, true),
    si("tesla",     "T",   [1, 0, -2, -1, 0, 0, 0], 1.0, true),
    si("weber",     "Wb",  [1, 2, -2, -1, 0, 0, 0], 1.0, true),
    si("henry",     "H",   [1, 2, -2, -2, 0, 0, 0], 1.0, true),
    si("katal",     "kat", [0, 0, -1, 0, 0, 1, 0], 1.0, true),
    si("becquerel", "Bq",  [0, 0, -1, 0, 0, 0, 0], 1.0, false),
    si("gray",      "Gy",  [0, 2, -2, 0, 0, 0, 0], 1.0, true),
    si("lux",       "lx",  [0, -2, 0, 0, 0, 0, 1], 1.0, true),
    si("litre",     "l",   [0, 3, 0, 0, 0, 0, 0], 1e-3, false),
    si("liter",     "l",   [0, 3, 0, 0, 0, 0, 0], 1e-3, false),
    si("molar",     "M",   [0, -3, 0, 0, 0, 1, 0], 1e3, false),
    si("radian",    "rad", [0, 0, 0, 0, 0, 0, 0], 1.0, false),
    si("steradian", "sr",  [0, 0, 0, 0, 0, 0, 0], 1.0, false),
];

/// Symbols of the SI base units, in exponent-vector order.
const BASE_SYMBOLS: [&str; 7] = ["kg", "m", "s", "A", "K", "mol", "cd"];

/// A value in SI base units together with its dimension exponents.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub dims: Dimensions,
}

impl Quantity {
    pub fn new(value: f64, dims: Dimensions) -> Self {
        Quantity { value, dims }
    }

    pub fn dimensionless(value: f64) -> Self {
        Quantity {
            value,
            dims: Dimensions::NONE,
        }
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dims.is_dimensionless()
    }

    pub fn powi(&self, exp: i32) -> Self {
        Quantity {
            value: self.value.powi(exp),
            dims: self.dims.powi(exp),
        }
    }

    /// Evaluate a quantity written in the model grammar, such as
    /// `-65 * mV`, `10. * msecond` or `siemens / metre ** 2`.
    pub fn parse(source: &str, catalogue: &UnitCatalogue) -> Result<Self> {
        let expr = match parse(source, LexerType::Units) {
            Ok(Some(expr)) => expr,
            Ok(None) => return expr_err!(EmptyEquation, format!("`{source}`")),
            Err(err) => return Err(err.in_equation(source)),
        };
        eval_quantity(&expr, catalogue).map_err(|mut err| {
            err.details = Some(format!(
                "{} in `{}`",
                err.details.unwrap_or_default(),
                source
            ));
            err
        })
    }
}

impl Mul for Quantity {
    type Output = Quantity;

    fn mul(self, rhs: Quantity) -> Quantity {
        Quantity {
            value: self.value * rhs.value,
            dims: self.dims * rhs.dims,
        }
    }
}

impl Div for Quantity {
    type Output = Quantity;

    fn div(self, rhs: Quantity) -> Quantity {
        Quantity {
            value: self.value / rhs.value,
            dims: self.dims / rhs.dims,
        }
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Quantity {
        Quantity {
            value: -self.value,
            dims: self.dims,
        }
    }
}

fn base_unit(name: &str, catalogue: &UnitCatalogue) -> Option<Quantity> {
    if let Some(unit) = catalogue.unit(name) {
        let dims = catalogue.unit_dims(unit)?;
        return Some(Quantity::new(unit.si_factor(), dims));
    }
    SI_UNITS
        .iter()
        .find(|u| u.name == name || u.symbol == name)
        .map(|u| Quantity::new(u.factor, Dimensions(u.dims)))
}

/// Resolve a unit name: catalogue symbols first, then SI names and
/// symbols, then a prefix (`m`, `milli`, ...) on either of those, then a
/// trailing `2` or `3` power (`umetre2`).
pub fn lookup_unit(name: &str, catalogue: &UnitCatalogue) -> Option<Quantity> {
    if let Some(q) = base_unit(name, catalogue) {
        return Some(q);
    }

    for (prefix, power) in LONG_PREFIXES.iter().chain(SHORT_PREFIXES.iter()) {
        if let Some(rest) = name.strip_prefix(prefix) {
            if rest.is_empty() {
                continue;
            }
            if let Some(q) = base_unit(rest, catalogue) {
                return Some(Quantity::new(q.value * 10f64.powi(*power), q.dims));
            }
        }
    }

    for (suffix, exp) in [("2", 2), ("3", 3)] {
        if let Some(stem) = name.strip_suffix(suffix) {
            if !stem.is_empty() && !stem.ends_with(|c: char| c.is_ascii_digit()) {
                if let Some(q) = lookup_unit(stem, catalogue) {
                    return Some(q.powi(exp));
                }
            }
        }
    }

    None
}

fn eval_quantity(expr: &Expr, catalogue: &UnitCatalogue) -> Result<Quantity> {
    match expr {
        Expr::Const(_, n, _) => Ok(Quantity::dimensionless(*n)),
        Expr::Var(id, _) => match lookup_unit(id, catalogue) {
            Some(q) => Ok(q),
            None => model_err!(UnknownUnit, id.clone()),
        },
        Expr::App(func, _, _) => model_err!(BadQuantity, format!("call to {func}")),
        Expr::Op1(op, r, _) => {
            let r = eval_quantity(r, catalogue)?;
            match op {
                UnaryOp::Positive => Ok(r),
                UnaryOp::Negative => Ok(-r),
                UnaryOp::Not => model_err!(BadQuantity, "boolean operator".to_owned()),
            }
        }
        Expr::Op2(op, l, r, _) => {
            let l = eval_quantity(l, catalogue)?;
            let r = eval_quantity(r, catalogue)?;
            match op {
                BinaryOp::Add | BinaryOp::Sub => {
                    if l.dims != r.dims {
                        return model_err!(
                            DimensionMismatch,
                            format!("{} and {}", l.dims, r.dims)
                        );
                    }
                    let value = if *op == BinaryOp::Add {
                        l.value + r.value
                    } else {
                        l.value - r.value
                    };
                    Ok(Quantity::new(value, l.dims))
                }
                BinaryOp::Mul => Ok(l * r),
                BinaryOp::Div => {
                    if r.value == 0.0 {
                        return model_err!(BadQuantity, "division by zero".to_owned());
                    }
                    Ok(l / r)
                }
                BinaryOp::Exp => {
                    let exp = r.value.round();
                    if !r.is_dimensionless() || !approx_eq!(f64, r.value, exp) {
                        return model_err!(
                            BadQuantity,
                            "exponents must be dimensionless integers".to_owned()
                        );
                    }
                    Ok(l.powi(exp as i32))
                }
                _ => model_err!(BadQuantity, "comparison or boolean operator".to_owned()),
            }
        }
    }
}

/// The dimension of a model expression. `resolve` supplies the
/// dimensions of model names; anything it does not know must be a unit.
pub fn eval_dimensions<F>(expr: &Expr, catalogue: &UnitCatalogue, resolve: &F) -> Result<Dimensions>
where
    F: Fn(&str) -> Option<Dimensions>,
{
    match expr {
        Expr::Const(_, _, _) => Ok(Dimensions::NONE),
        Expr::Var(id, _) => match resolve(id) {
            Some(dims) => Ok(dims),
            None => match lookup_unit(id, catalogue) {
                Some(q) => Ok(q.dims),
                None => model_err!(UnknownUnit, id.clone()),
            },
        },
        Expr::App(func, args, _) => {
            let mut arg_dims = vec![];
            for arg in args.iter() {
                arg_dims.push(eval_dimensions(arg, catalogue, resolve)?);
            }
            match (func.as_str(), arg_dims.as_slice()) {
                ("abs" | "ceil", [dims]) => Ok(*dims),
                ("sqrt", [dims]) => {
                    if dims.0.iter().any(|e| e % 2 != 0) {
                        return model_err!(BadQuantity, format!("sqrt of {dims}"));
                    }
                    let mut root = *dims;
                    for e in root.0.iter_mut() {
                        *e /= 2;
                    }
                    Ok(root)
                }
                (_, dims) if dims.iter().all(|d| d.is_dimensionless()) => Ok(Dimensions::NONE),
                _ => model_err!(BadQuantity, format!("{func} of a dimensioned value")),
            }
        }
        Expr::Op1(UnaryOp::Not, _, _) => {
            model_err!(BadQuantity, "boolean operator".to_owned())
        }
        Expr::Op1(_, r, _) => eval_dimensions(r, catalogue, resolve),
        Expr::Op2(op, l, r, _) => {
            let left = eval_dimensions(l, catalogue, resolve)?;
            match op {
                BinaryOp::Add | BinaryOp::Sub => {
                    let right = eval_dimensions(r, catalogue, resolve)?;
                    if left != right {
                        return model_err!(DimensionMismatch, format!("{left} and {right}"));
                    }
                    Ok(left)
                }
                BinaryOp::Mul => Ok(left * eval_dimensions(r, catalogue, resolve)?),
                BinaryOp::Div => Ok(left / eval_dimensions(r, catalogue, resolve)?),
                BinaryOp::Exp => {
                    if left.is_dimensionless() {
                        return Ok(left);
                    }
                    // a dimensioned base needs a literal integer exponent
                    let exp = match eval_quantity(r, catalogue) {
                        Ok(q) if q.is_dimensionless() && approx_eq!(f64, q.value, q.value.round()) => {
                            q.value.round() as i32
                        }
                        _ => {
                            return model_err!(
                                BadQuantity,
                                "exponents must be dimensionless integers".to_owned()
                            );
                        }
                    };
                    Ok(left.powi(exp))
                }
                _ => model_err!(BadQuantity, "comparison or boolean operator".to_owned()),
            }
        }
    }
}

/// Round to a fixed number of significant digits and print %g style.
pub fn format_value(value: f64) -> String {
    let rounded = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, value)
        .parse::<f64>()
        .unwrap_or(value);
    format_number(rounded)
}

/// Turn a unit expression into a LEMS-safe symbol: `^` markers are
/// dropped, `/` becomes `_per_` and `*` becomes `_`.
pub fn lems_symbol(unit: &str) -> String {
    unit.replace(' ', "")
        .replace('^', "")
        .replace('/', "_per_")
        .replace('*', "_")
}

/// The base-SI spelling of a dimension, e.g. `kg*m^2/s^3/A`.
fn base_si_unit(dims: &Dimensions) -> String {
    fn term(symbol: &str, exp: i32) -> String {
        if exp == 1 {
            symbol.to_owned()
        } else {
            format!("{symbol}^{exp}")
        }
    }

    let numerator: Vec<String> = BASE_SYMBOLS
        .iter()
        .zip(dims.0.iter())
        .filter(|(_, e)| **e > 0)
        .map(|(s, e)| term(s, *e))
        .collect();
    let denominator: Vec<String> = BASE_SYMBOLS
        .iter()
        .zip(dims.0.iter())
        .filter(|(_, e)| **e < 0)
        .map(|(s, e)| term(s, -*e))
        .collect();

    let mut unit = if numerator.is_empty() {
        "per".to_owned()
    } else {
        numerator.join("*")
    };
    for d in denominator.iter() {
        unit.push('/');
        unit.push_str(d);
    }
    unit
}

/// Fewer leading or trailing zeros is better: 65 beats 0.065 and 65000.
fn zeros_penalty(scaled: f64) -> i32 {
    (scaled.abs().log10().floor() as i32).abs()
}

struct Candidate {
    symbol: String,
    dimension: String,
    power: i32,
    factor: f64,
}

/// Dimensions and units a run needed beyond the catalogue, in the order
/// they were first used. Each is registered once.
#[derive(Clone, Debug, Default)]
pub struct UnitRegistry {
    dimensions: Vec<DimensionDef>,
    units: Vec<UnitDef>,
    symbols: HashSet<String>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        UnitRegistry::default()
    }

    pub fn dimensions(&self) -> &[DimensionDef] {
        &self.dimensions
    }

    pub fn units(&self) -> &[UnitDef] {
        &self.units
    }

    /// The dimension name for `dims`, registering a synthetic dimension
    /// when neither the catalogue nor this registry has one.
    pub fn dimension_name(&mut self, catalogue: &UnitCatalogue, dims: &Dimensions) -> String {
        if let Ok(name) = catalogue.dimension_of(dims) {
            return name.to_owned();
        }
        if let Some(def) = self.dimensions.iter().find(|def| def.dims == *dims) {
            return def.name.clone();
        }

        let name = lems_symbol(&base_si_unit(dims));
        log::debug!("registering dimension {name} ({dims})");
        self.dimensions.push(DimensionDef {
            name: name.clone(),
            dims: *dims,
        });
        name
    }

    fn register_unit(&mut self, catalogue: &UnitCatalogue, candidate: &Candidate) {
        if catalogue.unit(&candidate.symbol).is_some() || self.symbols.contains(&candidate.symbol)
        {
            return;
        }
        log::debug!(
            "registering unit {} ({}, power {})",
            candidate.symbol,
            candidate.dimension,
            candidate.power
        );
        self.symbols.insert(candidate.symbol.clone());
        self.units.push(UnitDef {
            symbol: candidate.symbol.clone(),
            dimension: candidate.dimension.clone(),
            power: candidate.power,
            scale: 1.0,
            offset: 0.0,
        });
    }

    fn known_candidates(&self, catalogue: &UnitCatalogue, dims: &Dimensions) -> Vec<Candidate> {
        let dimension = match catalogue.find_dimension(dims) {
            Some(def) => def.name.clone(),
            None => match self.dimensions.iter().find(|def| def.dims == *dims) {
                Some(def) => def.name.clone(),
                None => return vec![],
            },
        };

        catalogue
            .units_of(&dimension)
            .chain(self.units.iter().filter(|u| u.dimension == dimension))
            .filter(|u| u.offset == 0.0)
            .map(|u| Candidate {
                symbol: u.symbol.clone(),
                dimension: dimension.clone(),
                power: u.power,
                factor: u.si_factor(),
            })
            .collect()
    }

    fn named_si_candidates(&mut self, catalogue: &UnitCatalogue, dims: &Dimensions) -> Vec<Candidate> {
        let named: Vec<&SiUnit> = SI_UNITS
            .iter()
            .filter(|u| u.named && Dimensions(u.dims) == *dims)
            .collect();
        if named.is_empty() {
            return vec![];
        }

        let dimension = self.dimension_name(catalogue, dims);
        named
            .iter()
            .flat_map(|u| {
                FORMAT_PREFIXES.iter().map(|(prefix, power)| Candidate {
                    symbol: format!("{}{}", prefix, u.symbol),
                    dimension: dimension.clone(),
                    power: *power,
                    factor: u.factor * 10f64.powi(*power),
                })
            })
            .collect()
    }

    /// Format a quantity as a LEMS literal and unit symbol, choosing the
    /// unit that leaves the fewest leading or trailing zeros. Units the
    /// catalogue lacks are registered on first use.
    pub fn format(&mut self, catalogue: &UnitCatalogue, q: &Quantity) -> (String, String) {
        if q.value == 0.0 {
            return ("0".to_owned(), String::new());
        }
        if q.is_dimensionless() {
            return (format_value(q.value), String::new());
        }

        let mut candidates = self.known_candidates(catalogue, &q.dims);
        if catalogue.find_dimension(&q.dims).is_none() {
            let named = self.named_si_candidates(catalogue, &q.dims);
            candidates.extend(named);
        }
        if candidates.is_empty() {
            let dimension = self.dimension_name(catalogue, &q.dims);
            candidates.push(Candidate {
                symbol: lems_symbol(&base_si_unit(&q.dims)),
                dimension,
                power: 0,
                factor: 1.0,
            });
        }

        let mut best = 0;
        let mut best_penalty = i32::MAX;
        for (i, candidate) in candidates.iter().enumerate() {
            let penalty = zeros_penalty(q.value / candidate.factor);
            if penalty < best_penalty {
                best = i;
                best_penalty = penalty;
            }
        }

        let winner = &candidates[best];
        self.register_unit(catalogue, winner);
        (
            format_value(q.value / winner.factor),
            winner.symbol.clone(),
        )
    }

    /// Format a quantity as a single LEMS value string like `-65mV`.
    pub fn format_lems(&mut self, catalogue: &UnitCatalogue, q: &Quantity) -> String {
        let (literal, symbol) = self.format(catalogue, q);
        format!("{literal}{symbol}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use proptest::prelude::*;

    fn catalogue() -> UnitCatalogue {
        UnitCatalogue::bundled().unwrap()
    }

    fn quantity(source: &str) -> Quantity {
        Quantity::parse(source, &catalogue()).unwrap()
    }

    #[test]
    fn test_lookup_unit() {
        let catalogue = catalogue();
        let mv = lookup_unit("mV", &catalogue).unwrap();
        assert!(approx_eq!(f64, 1e-3, mv.value));
        assert_eq!(Dimensions([1, 2, -3, -1, 0, 0, 0]), mv.dims);

        for name in ["mvolt", "millivolt"] {
            let q = lookup_unit(name, &catalogue).unwrap();
            assert!(approx_eq!(f64, 1e-3, q.value, ulps = 2), "{name}");
            assert_eq!(mv.dims, q.dims, "{name}");
        }

        let ms = lookup_unit("msecond", &catalogue).unwrap();
        assert!(approx_eq!(f64, 1e-3, ms.value, ulps = 2));
        assert_eq!(Dimensions::TIME, ms.dims);

        let um2 = lookup_unit("umetre2", &catalogue).unwrap();
        assert!(approx_eq!(f64, 1e-12, um2.value, ulps = 4));
        assert_eq!(Dimensions([0, 2, 0, 0, 0, 0, 0]), um2.dims);

        assert!(lookup_unit("kW", &catalogue).is_some());
        assert!(lookup_unit("bogus", &catalogue).is_none());
    }

    #[test]
    fn test_parse_quantity() {
        let q = quantity("-65 * mV");
        assert!(approx_eq!(f64, -0.065, q.value, ulps = 2));

        let q = quantity("10. * msecond");
        assert!(approx_eq!(f64, 0.01, q.value, ulps = 2));
        assert_eq!(Dimensions::TIME, q.dims);

        let q = quantity("siemens / metre ** 2");
        assert_eq!(Dimensions([-1, -4, 3, 2, 0, 0, 0]), q.dims);

        let q = quantity("m^2");
        assert_eq!(Dimensions([0, 2, 0, 0, 0, 0, 0]), q.dims);

        let q = quantity("1");
        assert!(q.is_dimensionless());
    }

    #[test]
    fn test_parse_quantity_errors() {
        let catalogue = catalogue();
        let err = Quantity::parse("10 * furlong", &catalogue).unwrap_err();
        assert_eq!(ErrorCode::UnknownUnit, err.code);
        assert!(err.get_details().unwrap().contains("furlong"));

        let err = Quantity::parse("1 * mV + 1 * ms", &catalogue).unwrap_err();
        assert_eq!(ErrorCode::DimensionMismatch, err.code);

        let err = Quantity::parse("metre ** 0.5", &catalogue).unwrap_err();
        assert_eq!(ErrorCode::BadQuantity, err.code);

        let err = Quantity::parse("", &catalogue).unwrap_err();
        assert_eq!(ErrorCode::EmptyEquation, err.code);
    }

    #[test]
    fn test_eval_dimensions() {
        use crate::render::parse_source;

        let catalogue = catalogue();
        let resolve = |name: &str| match name {
            "tau" => Some(Dimensions::TIME),
            "v" => Some(quantity("1 * mV").dims),
            _ => None,
        };
        let dims = |source: &str| eval_dimensions(&parse_source(source).unwrap(), &catalogue, &resolve);

        assert_eq!(Dimensions::TIME, dims("2 * tau + 3 * ms").unwrap());
        assert_eq!(Dimensions::TIME, dims("abs(v) / v * tau").unwrap());
        assert_eq!(Dimensions::TIME, dims("sqrt(tau ** 2)").unwrap());
        assert_eq!(Dimensions::NONE, dims("exp(-tau / ms)").unwrap());
        assert_eq!(quantity("1 * mV").dims, dims("2 * v").unwrap());

        assert_eq!(ErrorCode::DimensionMismatch, dims("tau + v").unwrap_err().code);
        assert_eq!(ErrorCode::UnknownUnit, dims("tau * bogus").unwrap_err().code);
        assert_eq!(ErrorCode::BadQuantity, dims("exp(tau)").unwrap_err().code);
        assert_eq!(ErrorCode::BadQuantity, dims("tau ** v").unwrap_err().code);
    }

    #[test]
    fn test_format_zero_and_dimensionless() {
        let catalogue = catalogue();
        let mut registry = UnitRegistry::new();
        assert_eq!(
            ("0".to_owned(), "".to_owned()),
            registry.format(&catalogue, &quantity("0 * mV"))
        );
        assert_eq!(
            ("2.5".to_owned(), "".to_owned()),
            registry.format(&catalogue, &Quantity::dimensionless(2.5))
        );
        assert!(registry.units().is_empty());
    }

    #[test]
    fn test_format_best_unit() {
        let catalogue = catalogue();
        let mut registry = UnitRegistry::new();
        let cases = [
            ("-65 * mV", "-65", "mV"),
            ("10 * ms", "10", "ms"),
            ("0.5 * nS", "0.5", "nS"),
            ("200 * pF", "0.2", "nF"),
            ("1 * second", "1", "s"),
            ("3 * kohm", "3", "kohm"),
        ];
        for (source, literal, symbol) in cases.iter() {
            let (l, s) = registry.format(&catalogue, &quantity(source));
            assert_eq!((*literal, *symbol), (l.as_str(), s.as_str()), "{source}");
        }
        assert!(registry.units().is_empty());
        assert_eq!("-65mV", registry.format_lems(&catalogue, &quantity("-65*mV")));
    }

    #[test]
    fn test_format_registers_prefixed_si_unit() {
        let catalogue = catalogue();
        let mut registry = UnitRegistry::new();

        let (literal, symbol) = registry.format(&catalogue, &quantity("2 * kwatt"));
        assert_eq!(("2", "kW"), (literal.as_str(), symbol.as_str()));

        assert_eq!(1, registry.dimensions().len());
        assert_eq!("kg_m2_per_s3", registry.dimensions()[0].name);
        assert_eq!(1, registry.units().len());
        assert_eq!("kW", registry.units()[0].symbol);
        assert_eq!(3, registry.units()[0].power);
    }

    #[test]
    fn test_format_registers_composite_unit() {
        let catalogue = catalogue();
        let mut registry = UnitRegistry::new();

        let q = Quantity::new(4.0, Dimensions([1, 2, -3, -1, 0, 0, 0]).powi(2));
        let (literal, symbol) = registry.format(&catalogue, &q);
        assert_eq!("4", literal);
        assert_eq!("kg2_m4_per_s6_per_A2", symbol);
        assert_eq!(symbol, registry.units()[0].symbol);
        assert_eq!(symbol, registry.units()[0].dimension);
    }

    #[test]
    fn test_registration_converges() {
        let catalogue = catalogue();
        let mut registry = UnitRegistry::new();
        let q = quantity("3 * newton");

        let first = registry.format(&catalogue, &q);
        let second = registry.format(&catalogue, &q);
        assert_eq!(first, second);
        assert_eq!(1, registry.units().len());
        assert_eq!(1, registry.dimensions().len());

        // later values of the same dimension reuse the registered units
        let (_, symbol) = registry.format(&catalogue, &quantity("3000 * newton"));
        assert_eq!("kN", symbol);
        assert_eq!(2, registry.units().len());
        assert_eq!(1, registry.dimensions().len());
    }

    #[test]
    fn test_lems_symbol() {
        assert_eq!("m2", lems_symbol("m^2"));
        assert_eq!("kg_m2_per_s3_per_A", lems_symbol("kg*m^2/s^3/A"));
        assert_eq!(
            "kg_m2_per_s3_per_A",
            lems_symbol(&base_si_unit(&Dimensions([1, 2, -3, -1, 0, 0, 0])))
        );
        assert_eq!("per_s", lems_symbol(&base_si_unit(&Dimensions::TIME.powi(-1))));
    }

    #[test]
    fn test_format_value() {
        assert_eq!("65", format_value(65.00000000000001));
        assert_eq!("0.1", format_value(0.1 + 0.2 - 0.2));
        assert_eq!("-0.5", format_value(-0.5));
    }

    proptest! {
        #[test]
        fn dimension_of_is_scale_independent(idx in 0usize..26, value in -1e6f64..1e6f64) {
            let catalogue = catalogue();
            let def = &catalogue.dimensions()[idx % catalogue.dimensions().len()];
            let q = Quantity::new(value, def.dims);
            let one = Quantity::dimensionless(1.0);

            let name = catalogue.dimension_of(&q.dims).unwrap();
            prop_assert_eq!(name, catalogue.dimension_of(&(q * one).dims).unwrap());
            prop_assert_eq!(name, def.name.as_str());
        }

        #[test]
        fn formatting_never_duplicates_registrations(exps in proptest::array::uniform7(-3i32..4)) {
            let catalogue = catalogue();
            let mut registry = UnitRegistry::new();
            let q = Quantity::new(1.5, Dimensions(exps));
            let first = registry.format(&catalogue, &q);
            let units = registry.units().len();
            let second = registry.format(&catalogue, &q);
            prop_assert_eq!(first, second);
            prop_assert_eq!(units, registry.units().len());
        }
    }
}

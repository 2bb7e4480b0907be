// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Builds one LEMS `ComponentType` from a neuron group.
//!
//! A group whose `spike` event declares a refractory period gets a two
//! regime machine: `integrating` (initial) fires, resets and moves to
//! `refractory`, which stamps `lastspike` on entry and moves back once
//! its exit test holds. Groups without one get a flat dynamics block.

use std::collections::BTreeSet;

use crate::ast::Expr;
use crate::common::Result;
use crate::datamodel::{EquationKind, Event, InitIndex, Initializer, NeuronGroup, QuantityDef};
use crate::dimensions::{Dimensions, UnitCatalogue};
use crate::lems::{
    Action, ComponentType, Constant, DerivedVariable, Dynamics, EventPort, Exposure, OnCondition,
    OnEntry, OnStart, Parameter, Property, Regime, StateAssignment, StateVariable, TimeDerivative,
};
use crate::render::{LemsFormatter, parse_code, parse_source};
use crate::units::{Quantity, UnitRegistry, eval_dimensions, lookup_unit};
use crate::model_err;

/// Base type every generated cell extends.
pub const BASE_CELL: &str = "baseCell";
/// The event that may carry a refractory period.
pub const SPIKE_EVENT: &str = "spike";
pub const INTEGRATING_REGIME: &str = "integrating";
pub const REFRACTORY_REGIME: &str = "refractory";
/// State variable stamped with the time of the last spike.
pub const LAST_SPIKE: &str = "lastspike";
/// LEMS simulation time.
pub const TIME: &str = "t";
/// The per-instance iteration variable in model code.
pub const ITERATION_VARIABLE: &str = "i";
/// The iteration variable inside a `MultiInstantiate`.
pub const INDEX_VARIABLE: &str = "index";
/// Population size in model code.
pub const SIZE_VARIABLE: &str = "N";

/// Names with a fixed meaning in model code. They are never looked up as
/// units: `N` would otherwise resolve to newtons.
const RESERVED_IDENTIFIERS: &[&str] = &[
    TIME,
    "dt",
    SIZE_VARIABLE,
    ITERATION_VARIABLE,
    INDEX_VARIABLE,
    LAST_SPIKE,
    "True",
    "False",
];

/// A per-instance property whose value depends on the iteration
/// variable. The population assigns it inside its `MultiInstantiate`.
#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq, Eq)]
pub struct IndexedProperty {
    /// the cell property being assigned
    pub property: String,
    /// the assignment expression, with `i` rendered as `index`
    pub value: String,
    /// unit literals the expression needs
    pub constants: Vec<Constant>,
}

/// A built component type plus what the population step needs.
#[cfg_attr(feature = "debug-derive", derive(Debug))]
#[derive(Clone, PartialEq)]
pub struct BuiltGroup {
    pub name: String,
    pub size: u64,
    pub component_type: ComponentType,
    /// identifier values formatted for LEMS, in declaration order
    pub parameter_values: Vec<(String, String)>,
    pub indexed_properties: Vec<IndexedProperty>,
}

impl BuiltGroup {
    pub fn is_refractory(&self) -> bool {
        self.component_type
            .dynamics
            .as_ref()
            .is_some_and(|dynamics| !dynamics.regimes.is_empty())
    }
}

/// Declare each unit literal `expr` references as a `Constant`. Names in
/// `known` are model variables; anything that is neither known nor a unit
/// is left for LEMS to resolve.
pub(crate) fn declare_unit_literals(
    expr: &Expr,
    known: &BTreeSet<String>,
    catalogue: &UnitCatalogue,
    registry: &mut UnitRegistry,
    constants: &mut Vec<Constant>,
) {
    for ident in expr.identifiers() {
        if known.contains(&ident)
            || RESERVED_IDENTIFIERS.contains(&ident.as_str())
            || constants.iter().any(|c| c.name == ident)
        {
            continue;
        }
        match lookup_unit(&ident, catalogue) {
            Some(unit) => {
                let dimension = registry.dimension_name(catalogue, &unit.dims);
                let value = registry.format_lems(catalogue, &unit);
                constants.push(Constant {
                    name: ident,
                    dimension,
                    value,
                });
            }
            None => log::warn!("unresolved identifier `{ident}` left as-is"),
        }
    }
}

struct CellBuilder<'a> {
    group: &'a NeuronGroup,
    catalogue: &'a UnitCatalogue,
    registry: &'a mut UnitRegistry,
    formatter: LemsFormatter,
    known: BTreeSet<String>,
    constants: Vec<Constant>,
}

impl<'a> CellBuilder<'a> {
    fn new(
        group: &'a NeuronGroup,
        catalogue: &'a UnitCatalogue,
        registry: &'a mut UnitRegistry,
    ) -> Self {
        // the population size is known here, so cell code sees a literal
        let mut formatter =
            LemsFormatter::new().with_substitution(SIZE_VARIABLE, &group.n.to_string());
        if group.n == 1 {
            formatter = formatter.with_substitution(ITERATION_VARIABLE, "0");
        }

        let known = group
            .equations
            .keys()
            .chain(group.identifiers.keys())
            .map(|name| name.to_owned())
            .collect();

        CellBuilder {
            group,
            catalogue,
            registry,
            formatter,
            known,
            constants: vec![],
        }
    }

    fn dimension(&mut self, dims: &Dimensions) -> String {
        self.registry.dimension_name(self.catalogue, dims)
    }

    fn render_expr(&mut self, expr: &Expr) -> Result<String> {
        let rendered = self.formatter.format_expr(expr)?;
        declare_unit_literals(
            expr,
            &self.known,
            self.catalogue,
            self.registry,
            &mut self.constants,
        );
        Ok(rendered)
    }

    fn render(&mut self, source: &str) -> Result<String> {
        let expr = parse_source(source)?;
        self.render_expr(&expr)
    }

    /// A quantity as a LEMS expression, `-65 * mV`, declaring its unit as
    /// a constant.
    fn quantity_expr(&mut self, q: &Quantity) -> String {
        let (literal, symbol) = self.registry.format(self.catalogue, q);
        if symbol.is_empty() {
            return literal;
        }
        if !self.constants.iter().any(|c| c.name == symbol) {
            let dimension = self.dimension(&q.dims);
            self.constants.push(Constant {
                name: symbol.clone(),
                dimension,
                value: format!("1{symbol}"),
            });
        }
        format!("{literal} * {symbol}")
    }

    /// Whether `expr` only mentions numbers and unit names.
    fn is_literal(&self, expr: &Expr) -> bool {
        expr.identifiers().iter().all(|ident| {
            !self.known.contains(ident) && !RESERVED_IDENTIFIERS.contains(&ident.as_str())
        })
    }

    /// The dimension of a model expression over this group's names.
    fn expr_dimensions(&self, expr: &Expr) -> Result<Dimensions> {
        let resolve = |name: &str| match name {
            TIME | LAST_SPIKE | "dt" => Some(Dimensions::TIME),
            SIZE_VARIABLE | ITERATION_VARIABLE | INDEX_VARIABLE => Some(Dimensions::NONE),
            _ => match self.group.equations.get(name) {
                Some(eq) => eq.dims(self.catalogue).ok(),
                None => self
                    .group
                    .identifiers
                    .get(name)
                    .and_then(|value| value.resolve(self.catalogue).ok())
                    .map(|q| q.dims),
            },
        };
        eval_dimensions(expr, self.catalogue, &resolve)
    }

    fn equation_dimension(&mut self, name: &str) -> Result<String> {
        let dims = match self.group.equations.get(name) {
            Some(eq) => eq.dims(self.catalogue)?,
            None => return model_err!(DoesNotExist, format!("{}.{}", self.group.name, name)),
        };
        Ok(self.dimension(&dims))
    }

    fn on_condition(&mut self, name: &str, event: &Event) -> Result<OnCondition> {
        let test = self.render(&event.threshold.code)?;

        let mut actions = vec![Action::EventOut(name.to_owned())];
        if let Some(ref reset) = event.reset {
            for stmt in parse_code(&reset.code)?.iter() {
                if !self.group.equations.contains_key(&stmt.target) {
                    return model_err!(
                        DoesNotExist,
                        format!("reset of {} assigns unknown {}", self.group.name, stmt.target)
                    );
                }
                let value = self.formatter.format_assignment(stmt)?;
                declare_unit_literals(
                    &stmt.value,
                    &self.known,
                    self.catalogue,
                    self.registry,
                    &mut self.constants,
                );
                actions.push(Action::StateAssignment(StateAssignment {
                    variable: stmt.target.clone(),
                    value,
                }));
            }
        }

        Ok(OnCondition { test, actions })
    }

    /// The condition that ends refractoriness.
    fn exit_test(&mut self, refractory: &QuantityDef) -> Result<String> {
        let duration = match refractory {
            QuantityDef::Text(source) => {
                let expr = match parse_source(source) {
                    Ok(expr) => expr,
                    Err(err) => {
                        return model_err!(BadRefractory, format!("{}: {}", self.group.name, err));
                    }
                };
                if expr.is_boolean() {
                    return self.render_expr(&expr);
                }
                match self.expr_dimensions(&expr) {
                    Ok(dims) if dims == Dimensions::TIME => {}
                    Ok(_) => {
                        return model_err!(
                            BadRefractory,
                            format!("{}: `{}` is not a duration", self.group.name, source)
                        );
                    }
                    Err(err) => {
                        return model_err!(BadRefractory, format!("{}: {}", self.group.name, err));
                    }
                }
                self.render_expr(&expr)?
            }
            other => {
                let q = other.resolve(self.catalogue)?;
                if q.dims != Dimensions::TIME {
                    return model_err!(
                        BadRefractory,
                        format!("{}: refractory period has dimension {}", self.group.name, q.dims)
                    );
                }
                self.quantity_expr(&q)
            }
        };
        Ok(format!("{TIME} .gt. ( {LAST_SPIKE} + {duration} )"))
    }
}

/// Build the component type for `group`. `initializers` must already be
/// restricted to this group.
pub fn build(
    group: &NeuronGroup,
    initializers: &[&Initializer],
    catalogue: &UnitCatalogue,
    registry: &mut UnitRegistry,
) -> Result<BuiltGroup> {
    let mut cb = CellBuilder::new(group, catalogue, registry);
    let mut ct = ComponentType::new(&group.name, Some(BASE_CELL));
    let mut dynamics = Dynamics::default();
    let is_multi = group.n > 1;

    let mut parameter_values = vec![];
    for (name, value) in group.identifiers.iter() {
        let q = value.resolve(catalogue)?;
        let dimension = cb.dimension(&q.dims);
        parameter_values.push((name.to_owned(), cb.registry.format_lems(catalogue, &q)));
        if is_multi {
            ct.properties.push(Property {
                name: name.to_owned(),
                dimension,
                default_value: None,
            });
        } else {
            ct.parameters.push(Parameter {
                name: name.to_owned(),
                dimension,
            });
        }
    }

    // per-instance initial values, decided up front since they change how
    // the affected variables are declared
    let mut on_start = vec![];
    let mut indexed_properties = vec![];
    let mut property_backed = BTreeSet::new();
    for init in initializers.iter() {
        let eq = match group.equations.get(&init.variable) {
            Some(eq) => eq,
            None => {
                return model_err!(DoesNotExist, format!("{}.{}", group.name, init.variable));
            }
        };
        if init.index != InitIndex::All(true) {
            return model_err!(
                UnsupportedInitializer,
                format!("{}.{}: only whole-group initializers are supported", group.name, init.variable)
            );
        }
        if eq.kind == EquationKind::Subexpression {
            return model_err!(
                BadInitializer,
                format!("{}.{} is a subexpression", group.name, init.variable)
            );
        }

        let expr = match init.value {
            QuantityDef::Text(ref source) => Some(parse_source(source)?),
            _ => None,
        };

        if let Some(ref expr) = expr {
            if is_multi && expr.references(ITERATION_VARIABLE) {
                let dimension = cb.equation_dimension(&init.variable)?;
                let property = match eq.kind {
                    EquationKind::Parameter => init.variable.clone(),
                    _ => format!("{}_init", init.variable),
                };
                let indexed = indexed_property(group, &property, expr, catalogue, cb.registry)?;
                // a later initializer of the same variable wins
                indexed_properties.retain(|p: &IndexedProperty| p.property != property);
                indexed_properties.push(indexed);
                on_start.retain(|a: &StateAssignment| a.variable != init.variable);
                if ct.property(&property).is_none() {
                    ct.properties.push(Property {
                        name: property.clone(),
                        dimension,
                        default_value: None,
                    });
                }
                if eq.kind == EquationKind::Parameter {
                    property_backed.insert(init.variable.clone());
                } else {
                    on_start.push(StateAssignment {
                        variable: init.variable.clone(),
                        value: property,
                    });
                }
                continue;
            }
        }

        if property_backed.contains(&init.variable) {
            return model_err!(
                BadInitializer,
                format!("{}.{} is already set per instance", group.name, init.variable)
            );
        }
        on_start.retain(|a: &StateAssignment| a.variable != init.variable);
        let init_property = format!("{}_init", init.variable);
        if indexed_properties.iter().any(|p: &IndexedProperty| p.property == init_property) {
            indexed_properties.retain(|p: &IndexedProperty| p.property != init_property);
            ct.properties.retain(|p| p.name != init_property);
        }

        let value = match expr {
            Some(ref expr) if !cb.is_literal(expr) => cb.render_expr(expr)?,
            _ => {
                let q = init.value.resolve(catalogue)?;
                cb.quantity_expr(&q)
            }
        };
        on_start.push(StateAssignment {
            variable: init.variable.clone(),
            value,
        });
    }

    let refractory = match refractory_event(group)? {
        Some(event) => event.refractory.as_ref(),
        None => None,
    };

    let mut derivatives = vec![];
    for (name, eq) in group.equations.iter() {
        if property_backed.contains(name) {
            continue;
        }
        let dimension = cb.equation_dimension(name)?;
        ct.exposures.push(Exposure {
            name: name.to_owned(),
            dimension: dimension.clone(),
        });

        match eq.kind {
            EquationKind::Differential => {
                let value = cb.render(eq.expr.as_deref().unwrap_or(""))?;
                derivatives.push((
                    TimeDerivative {
                        variable: name.to_owned(),
                        value,
                    },
                    eq.unless_refractory(),
                ));
                dynamics.state_variables.push(StateVariable {
                    name: name.to_owned(),
                    dimension,
                    exposure: Some(name.to_owned()),
                });
            }
            EquationKind::Parameter => {
                dynamics.state_variables.push(StateVariable {
                    name: name.to_owned(),
                    dimension,
                    exposure: Some(name.to_owned()),
                });
            }
            EquationKind::Subexpression => {
                let value = cb.render(eq.expr.as_deref().unwrap_or(""))?;
                dynamics.derived_variables.push(DerivedVariable {
                    name: name.to_owned(),
                    dimension,
                    exposure: Some(name.to_owned()),
                    value,
                });
            }
        }
    }

    let mut spike_handler = None;
    for (name, event) in group.events.iter() {
        ct.event_ports.push(EventPort {
            name: name.to_owned(),
            direction: "out".to_owned(),
        });
        let handler = cb.on_condition(name, event)?;
        if refractory.is_some() && name == SPIKE_EVENT {
            spike_handler = Some(handler);
        } else {
            dynamics.on_conditions.push(handler);
        }
    }

    match (refractory, spike_handler) {
        (Some(refractory), Some(mut fire)) => {
            let exit_test = cb.exit_test(refractory)?;
            fire.actions.push(Action::Transition(REFRACTORY_REGIME.to_owned()));

            let time = cb.dimension(&Dimensions::TIME);
            dynamics.state_variables.push(StateVariable {
                name: LAST_SPIKE.to_owned(),
                dimension: time,
                exposure: None,
            });

            dynamics.regimes.push(Regime {
                name: INTEGRATING_REGIME.to_owned(),
                initial: true,
                time_derivatives: derivatives.iter().map(|(td, _)| td.clone()).collect(),
                on_entry: None,
                on_conditions: vec![fire],
            });
            dynamics.regimes.push(Regime {
                name: REFRACTORY_REGIME.to_owned(),
                initial: false,
                time_derivatives: derivatives
                    .iter()
                    .filter(|(_, unless_refractory)| !unless_refractory)
                    .map(|(td, _)| td.clone())
                    .collect(),
                on_entry: Some(OnEntry {
                    assignments: vec![StateAssignment {
                        variable: LAST_SPIKE.to_owned(),
                        value: TIME.to_owned(),
                    }],
                }),
                on_conditions: vec![OnCondition {
                    test: exit_test,
                    actions: vec![Action::Transition(INTEGRATING_REGIME.to_owned())],
                }],
            });
        }
        _ => {
            dynamics.time_derivatives = derivatives.into_iter().map(|(td, _)| td).collect();
        }
    }

    if !on_start.is_empty() {
        dynamics.on_start = Some(OnStart {
            assignments: on_start,
        });
    }

    ct.constants = cb.constants;
    ct.dynamics = Some(dynamics);

    log::debug!(
        "built component type {} ({} state variables, {} regimes)",
        ct.name,
        ct.dynamics.as_ref().map_or(0, |d| d.state_variables.len()),
        ct.dynamics.as_ref().map_or(0, |d| d.regimes.len()),
    );

    Ok(BuiltGroup {
        name: group.name.clone(),
        size: group.n,
        component_type: ct,
        parameter_values,
        indexed_properties,
    })
}

/// The `spike` event when it declares a refractory period. Any other
/// event declaring one is an error.
fn refractory_event(group: &NeuronGroup) -> Result<Option<&Event>> {
    let mut found = None;
    for (name, event) in group.events.iter() {
        if event.refractory.is_none() {
            continue;
        }
        if name != SPIKE_EVENT {
            return model_err!(
                MultipleRefractoryEvents,
                format!("{}: event {} declares a refractory period", group.name, name)
            );
        }
        found = Some(event);
    }
    Ok(found)
}

/// Render an index-dependent initial value for use inside the population
/// type, where the group's identifiers are `<name>_p` parameters.
fn indexed_property(
    group: &NeuronGroup,
    property: &str,
    expr: &Expr,
    catalogue: &UnitCatalogue,
    registry: &mut UnitRegistry,
) -> Result<IndexedProperty> {
    let mut formatter = LemsFormatter::new().with_substitution(ITERATION_VARIABLE, INDEX_VARIABLE);
    for name in group.identifiers.keys() {
        formatter = formatter.with_substitution(name, &population_parameter(name));
    }
    let value = formatter.format_expr(expr)?;

    let known = group
        .equations
        .keys()
        .chain(group.identifiers.keys())
        .map(|name| name.to_owned())
        .collect();
    let mut constants = vec![];
    declare_unit_literals(expr, &known, catalogue, registry, &mut constants);

    Ok(IndexedProperty {
        property: property.to_owned(),
        value,
        constants,
    })
}

/// The population-level parameter that feeds the cell property `name`.
pub fn population_parameter(name: &str) -> String {
    format!("{name}_p")
}

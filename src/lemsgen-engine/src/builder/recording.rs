// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::builder::cell::SPIKE_EVENT;
use crate::common::Result;
use crate::config::ExportOptions;
use crate::datamodel::{EventMonitor, StateMonitor};
use crate::lems::{
    ComponentType, Display, EventOutputFile, EventSelection, Line, OutputColumn, OutputFile,
    Simulation,
};
use crate::model_err;

const LINE_COLORS: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// What a monitor watches: a placed group and its cell type.
pub struct RecordTarget<'a> {
    pub population: &'a str,
    pub size: u64,
    pub component_type: &'a ComponentType,
}

impl RecordTarget<'_> {
    fn check_variable(&self, monitor: &str, variable: &str) -> Result<()> {
        let known = self.component_type.dynamics.as_ref().is_some_and(|dynamics| {
            dynamics.state_variables.iter().any(|sv| sv.name == variable)
                || dynamics.derived_variables.iter().any(|dv| dv.name == variable)
        }) || self.component_type.property(variable).is_some();
        if !known {
            return model_err!(
                DoesNotExist,
                format!("{monitor} records {variable}, which {} lacks", self.component_type.name)
            );
        }
        Ok(())
    }

    fn check_event(&self, monitor: &str, event: &str) -> Result<()> {
        if !self.component_type.event_ports.iter().any(|port| port.name == event) {
            return model_err!(
                DoesNotExist,
                format!("{monitor} watches event {event}, which {} lacks", self.component_type.name)
            );
        }
        Ok(())
    }

    fn path(&self, idx: u64, variable: &str) -> String {
        format!("{}[{}]/{}", self.population, idx, variable)
    }
}

/// Attaches displays and output files to a simulation. Element ids come
/// from counters owned here, so monitors must be added in input order.
pub struct RecordingAssembler<'a> {
    simulation: Simulation,
    options: &'a ExportOptions,
    /// simulation length in the displays' time scale
    xmax: f64,
    displays: usize,
    lines: usize,
    output_files: usize,
    event_files: usize,
    file_names: Vec<String>,
}

impl<'a> RecordingAssembler<'a> {
    pub fn new(simulation: Simulation, duration_ms: f64, options: &'a ExportOptions) -> Self {
        RecordingAssembler {
            simulation,
            options,
            xmax: duration_ms,
            displays: 0,
            lines: 0,
            output_files: 0,
            event_files: 0,
            file_names: vec![],
        }
    }

    pub fn add_state_monitor(&mut self, monitor: &StateMonitor, target: &RecordTarget) -> Result<()> {
        let indices = monitor.record.indices(target.size)?;
        for variable in monitor.variables.iter() {
            target.check_variable(&monitor.name, variable)?;

            if self.options.displays {
                let lines = indices
                    .iter()
                    .map(|&idx| self.next_line(target.path(idx, variable)))
                    .collect();
                let display = Display {
                    id: format!("disp{}", self.displays),
                    title: format!("{} {}", monitor.name, variable),
                    time_scale: "1ms".to_owned(),
                    xmin: 0.0,
                    xmax: self.xmax,
                    ymin: self.options.display_ymin,
                    ymax: self.options.display_ymax,
                    lines,
                };
                self.displays += 1;
                self.simulation.displays.push(display);
            }

            if self.options.output_files {
                let file_name = format!("{}_{}.dat", monitor.name, variable);
                let columns = indices
                    .iter()
                    .map(|&idx| OutputColumn {
                        id: format!("{variable}_{idx}"),
                        quantity: target.path(idx, variable),
                    })
                    .collect();
                self.simulation.output_files.push(OutputFile {
                    id: format!("of{}", self.output_files),
                    file_name: file_name.clone(),
                    columns,
                });
                self.output_files += 1;
                self.file_names.push(file_name);
            }
        }
        log::debug!("recording {} from {}", monitor.name, target.population);
        Ok(())
    }

    /// Spike and event monitors share one shape; only the file suffix
    /// differs.
    pub fn add_event_monitor(&mut self, monitor: &EventMonitor, target: &RecordTarget) -> Result<()> {
        target.check_event(&monitor.name, &monitor.event)?;
        let indices = monitor.record.indices(target.size)?;

        let suffix = if monitor.event == SPIKE_EVENT { "spikes" } else { "dat" };
        let file_name = format!("{}.{}", monitor.name, suffix);
        let selections = indices
            .iter()
            .map(|&idx| EventSelection {
                id: idx.to_string(),
                select: format!("{}[{}]", target.population, idx),
                event_port: monitor.event.clone(),
            })
            .collect();

        self.simulation.event_output_files.push(EventOutputFile {
            id: format!("eof{}", self.event_files),
            file_name: file_name.clone(),
            format: "ID_TIME".to_owned(),
            selections,
        });
        self.event_files += 1;
        self.file_names.push(file_name);
        log::debug!("recording {} events from {}", monitor.event, target.population);
        Ok(())
    }

    fn next_line(&mut self, quantity: String) -> Line {
        let line = Line {
            id: format!("line{}", self.lines),
            quantity,
            scale: "1".to_owned(),
            time_scale: "1ms".to_owned(),
            color: LINE_COLORS[self.lines % LINE_COLORS.len()].to_owned(),
        };
        self.lines += 1;
        line
    }

    /// The finished simulation and the recording files it writes.
    pub fn finish(self) -> (Simulation, Vec<String>) {
        (self.simulation, self.file_names)
    }
}

//! Plain-data form of a [`Problem`] for surrounding tooling.
//!
//! Maps use `-1` for unmapped positions. Functions are stored by name and
//! resolved again on import.

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{BoxConstraints, FunctionEntry, FunctionMap, Problem, ProblemStatus};
use crate::distribution::UncertaintyMapping;
use crate::element::{Element, ElementProperties, PropertiesFactory};
use crate::error::{Error, Result};
use crate::problem::Function;
use crate::types::{Direction, ElementType};

/// Record of one [`ElementProperties`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PropertiesRecord {
    /// Unique ID, preserved on import.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Units.
    pub units: String,
    /// Value type.
    pub element_type: ElementType,
    /// Optimization direction.
    pub direction: Direction,
}

/// Record of one wired function.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FunctionRecord {
    /// Name passed to the resolver on import.
    pub name: String,
    /// Decision variable per input, `-1` if unmapped.
    pub decisions: Vec<i64>,
    /// Parameter per input, `-1` if unmapped.
    pub parameters: Vec<i64>,
    /// Objective per output, `-1` if unmapped.
    pub objectives: Vec<i64>,
    /// Constraint per output, `-1` if unmapped.
    pub constraints: Vec<i64>,
    /// Unused slot per output, `-1` if unmapped.
    pub unused: Vec<i64>,
    /// Output uncertainty.
    pub output_uncertainty: Vec<Option<UncertaintyMapping>>,
}

/// Record of a whole [`Problem`].
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProblemRecord {
    /// Decision variables.
    pub decisions: Vec<PropertiesRecord>,
    /// Parameters.
    pub parameters: Vec<PropertiesRecord>,
    /// Objectives.
    pub objectives: Vec<PropertiesRecord>,
    /// Constraints.
    pub constraints: Vec<PropertiesRecord>,
    /// Unused outputs.
    pub unused: Vec<PropertiesRecord>,
    /// Parameter values.
    pub parameter_values: Vec<f64>,
    /// Lower bound per decision variable.
    pub lower_bounds: Vec<f64>,
    /// Upper bound per decision variable.
    pub upper_bounds: Vec<f64>,
    /// Wired functions.
    pub functions: Vec<FunctionRecord>,
    /// Decision variable uncertainty.
    pub decision_uncertainty: Vec<Option<UncertaintyMapping>>,
    /// Goals.
    pub goals: Vec<Option<f64>>,
    /// Priorities.
    pub priorities: Vec<f64>,
    /// Constraint thresholds.
    pub thresholds: Vec<f64>,
    /// Essential objective flags.
    pub essential: Vec<bool>,
    /// Known ideal vector.
    pub ideal: Option<Vec<f64>>,
    /// Known anti-ideal vector.
    pub anti_ideal: Option<Vec<f64>>,
    /// Known nadir vector.
    pub nadir: Option<Vec<f64>>,
}

fn props_to_record(props: &[ElementProperties]) -> Vec<PropertiesRecord> {
    props
        .iter()
        .map(|p| PropertiesRecord {
            id: p.id().to_string(),
            name: p.name().to_string(),
            description: p.description().to_string(),
            units: p.units().to_string(),
            element_type: p.element_type(),
            direction: p.direction(),
        })
        .collect()
}

fn props_from_record(records: &[PropertiesRecord]) -> Vec<ElementProperties> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            PropertiesFactory::builder(r.name.clone())
                .index(i)
                .description(r.description.clone())
                .units(r.units.clone())
                .element_type(r.element_type)
                .direction(r.direction)
                .restore(r.id.clone())
        })
        .collect()
}

#[allow(clippy::cast_possible_wrap)]
fn map_to_record(map: &[Option<usize>]) -> Vec<i64> {
    map.iter().map(|m| m.map_or(-1, |v| v as i64)).collect()
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn map_from_record(map: &[i64]) -> Vec<Option<usize>> {
    map.iter()
        .map(|&v| if v < 0 { None } else { Some(v as usize) })
        .collect()
}

pub(super) fn to_record(problem: &Problem) -> ProblemRecord {
    ProblemRecord {
        decisions: props_to_record(&problem.decisions),
        parameters: props_to_record(&problem.parameters),
        objectives: props_to_record(&problem.objectives),
        constraints: props_to_record(&problem.constraints),
        unused: props_to_record(&problem.unused),
        parameter_values: problem.parameter_values.iter().map(Element::value).collect(),
        lower_bounds: problem.bounds.lower_values(),
        upper_bounds: problem.bounds.upper_values(),
        functions: problem
            .functions
            .iter()
            .map(|f| FunctionRecord {
                name: f.function.name().to_string(),
                decisions: map_to_record(&f.map.decisions),
                parameters: map_to_record(&f.map.parameters),
                objectives: map_to_record(&f.map.objectives),
                constraints: map_to_record(&f.map.constraints),
                unused: map_to_record(&f.map.unused),
                output_uncertainty: f.output_uncertainty.clone(),
            })
            .collect(),
        decision_uncertainty: problem.decision_uncertainty.clone(),
        goals: problem.goals.clone(),
        priorities: problem.priorities.clone(),
        thresholds: problem.thresholds.clone(),
        essential: problem.essential.clone(),
        ideal: problem.ideal.clone(),
        anti_ideal: problem.anti_ideal.clone(),
        nadir: problem.nadir.clone(),
    }
}

pub(super) fn from_record<R>(record: &ProblemRecord, resolver: R) -> Result<Problem>
where
    R: Fn(&str) -> Option<Arc<dyn Function>>,
{
    let decisions = props_from_record(&record.decisions);
    let parameters = props_from_record(&record.parameters);

    let mut bounds = BoxConstraints::new();
    for ((props, &low), &high) in decisions
        .iter()
        .zip(&record.lower_bounds)
        .zip(&record.upper_bounds)
    {
        let ty = props.element_type();
        bounds.push(Element::new(ty, low), Element::new(ty, high));
    }

    let mut functions = Vec::with_capacity(record.functions.len());
    for f in &record.functions {
        let function = resolver(&f.name).ok_or_else(|| Error::UnknownFunction(f.name.clone()))?;
        functions.push(FunctionEntry {
            function,
            map: FunctionMap {
                decisions: map_from_record(&f.decisions),
                parameters: map_from_record(&f.parameters),
                objectives: map_from_record(&f.objectives),
                constraints: map_from_record(&f.constraints),
                unused: map_from_record(&f.unused),
            },
            output_uncertainty: f.output_uncertainty.clone(),
        });
    }

    let parameter_values = parameters
        .iter()
        .zip(&record.parameter_values)
        .map(|(p, &v)| Element::new(p.element_type(), v))
        .collect();

    let mut problem = Problem {
        decisions,
        parameters,
        objectives: props_from_record(&record.objectives),
        constraints: props_from_record(&record.constraints),
        unused: props_from_record(&record.unused),
        parameter_values,
        bounds,
        functions,
        decision_uncertainty: record.decision_uncertainty.clone(),
        goals: record.goals.clone(),
        priorities: record.priorities.clone(),
        thresholds: record.thresholds.clone(),
        essential: record.essential.clone(),
        ideal: record.ideal.clone(),
        anti_ideal: record.anti_ideal.clone(),
        nadir: record.nadir.clone(),
        status: ProblemStatus::UnprocessedChanges,
    };
    problem.process();
    Ok(problem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::FnFunction;

    fn resolver(name: &str) -> Option<Arc<dyn Function>> {
        (name == "lin").then(|| Arc::new(FnFunction::new("lin", 1, 2, |x| vec![x[0], 2.0 * x[0]])) as Arc<dyn Function>)
    }

    #[test]
    fn test_record_round_trip() {
        let mut p = Problem::new();
        let x = p.append_decision_variable(PropertiesFactory::create("x", ElementType::Real), -1.0, 2.0);
        let o = p.append_objective(PropertiesFactory::create("f", ElementType::Real));
        let c = p.append_constraint(PropertiesFactory::create("g", ElementType::Real), 0.5);
        let map = FunctionMap::new(1, 2).decision(0, x).objective(0, o).constraint(1, c);
        p.append_function(resolver("lin").unwrap(), map);
        assert_eq!(p.process(), ProblemStatus::FullyDefined);

        let record = p.to_record();
        assert_eq!(record.functions[0].decisions, vec![0]);
        assert_eq!(record.functions[0].objectives, vec![0, -1]);
        assert_eq!(record.functions[0].constraints, vec![-1, 0]);

        let q = Problem::from_record(&record, resolver).unwrap();
        assert_eq!(q.status(), ProblemStatus::FullyDefined);
        assert_eq!(q.decision_properties()[0].id(), p.decision_properties()[0].id());
        assert_eq!(q.thresholds(), &[0.5]);
        assert_eq!(q.to_record(), record);
    }

    #[test]
    fn test_unknown_function() {
        let record = ProblemRecord {
            functions: vec![FunctionRecord {
                name: "missing".into(),
                decisions: vec![],
                parameters: vec![],
                objectives: vec![],
                constraints: vec![],
                unused: vec![],
                output_uncertainty: vec![],
            }],
            ..ProblemRecord::default()
        };
        assert!(matches!(
            Problem::from_record(&record, resolver),
            Err(Error::UnknownFunction(name)) if name == "missing"
        ));
    }
}

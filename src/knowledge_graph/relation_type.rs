//! Closed set of relation labels allowed as Neo4j edge types
//!
//! Relationship types cannot be passed as Cypher parameters, so a label is
//! interpolated into the statement text only after it parses into
//! [`RelationType`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// True if `value` can be spliced into Cypher as a label, type or index name
pub fn is_identifier(value: &str) -> bool {
    IDENTIFIER.is_match(value)
}

/// Known relation labels (DiaKG annotation scheme plus generic clinical verbs)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RelationType {
    TestItemsDisease,
    TestDisease,
    SymptomDisease,
    TreatmentDisease,
    DrugDisease,
    AnatomyDisease,
    ReasonDisease,
    PathogenesisDisease,
    OperationDisease,
    ClassDisease,
    MethodDrug,
    DurationDrug,
    AmountDrug,
    FrequencyDrug,
    AdeDrug,
    Treats,
    Causes,
}

impl RelationType {
    pub const ALL: [RelationType; 17] = [
        RelationType::TestItemsDisease,
        RelationType::TestDisease,
        RelationType::SymptomDisease,
        RelationType::TreatmentDisease,
        RelationType::DrugDisease,
        RelationType::AnatomyDisease,
        RelationType::ReasonDisease,
        RelationType::PathogenesisDisease,
        RelationType::OperationDisease,
        RelationType::ClassDisease,
        RelationType::MethodDrug,
        RelationType::DurationDrug,
        RelationType::AmountDrug,
        RelationType::FrequencyDrug,
        RelationType::AdeDrug,
        RelationType::Treats,
        RelationType::Causes,
    ];

    /// Edge type as written to the graph
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::TestItemsDisease => "Test_items_Disease",
            RelationType::TestDisease => "Test_Disease",
            RelationType::SymptomDisease => "Symptom_Disease",
            RelationType::TreatmentDisease => "Treatment_Disease",
            RelationType::DrugDisease => "Drug_Disease",
            RelationType::AnatomyDisease => "Anatomy_Disease",
            RelationType::ReasonDisease => "Reason_Disease",
            RelationType::PathogenesisDisease => "Pathogenesis_Disease",
            RelationType::OperationDisease => "Operation_Disease",
            RelationType::ClassDisease => "Class_Disease",
            RelationType::MethodDrug => "Method_Drug",
            RelationType::DurationDrug => "Duration_Drug",
            RelationType::AmountDrug => "Amount_Drug",
            RelationType::FrequencyDrug => "Frequency_Drug",
            RelationType::AdeDrug => "ADE_Drug",
            RelationType::Treats => "TREATS",
            RelationType::Causes => "CAUSES",
        }
    }
}

impl FromStr for RelationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_identifier(s) {
            return Err(Error::InvalidRelationType(s.to_string()));
        }

        RelationType::ALL
            .iter()
            .find(|r| r.as_str() == s)
            .copied()
            .ok_or_else(|| Error::InvalidRelationType(s.to_string()))
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

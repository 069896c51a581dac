use std::fmt;

use serde::{Deserialize, Serialize};

/// Relation of a class to the means of production.
///
/// Labels are pure discriminants; everything else about a label lives in the static
/// [`LABEL_TABLE`] and is read through the accessor methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ClassLabel {
    None,
    CommunalMember,
    Landowner,
    Landless,
    Craftsman,
    Laborer,
    Elder,
    Chief,
}

tagged_enum!(ClassLabel {
    None => "NONE",
    CommunalMember => "COMMUNAL_MEMBER",
    Landowner => "LANDOWNER",
    Landless => "LANDLESS",
    Craftsman => "CRAFTSMAN",
    Laborer => "LABORER",
    Elder => "ELDER",
    Chief => "CHIEF",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Exploiter,
    Exploited,
    Neither,
}

struct LabelInfo {
    display_name: &'static str,
    development_level: u8,
    relation: Relation,
    base_political_power: f64,
}

/// Indexed by `ClassLabel as usize`.
const LABEL_TABLE: [LabelInfo; 8] = [
    LabelInfo {
        display_name: "no class",
        development_level: 0,
        relation: Relation::Neither,
        base_political_power: 0.0,
    },
    LabelInfo {
        display_name: "communal member",
        development_level: 1,
        relation: Relation::Neither,
        base_political_power: 0.1,
    },
    LabelInfo {
        display_name: "landowner",
        development_level: 2,
        relation: Relation::Exploiter,
        base_political_power: 0.5,
    },
    LabelInfo {
        display_name: "landless",
        development_level: 2,
        relation: Relation::Exploited,
        base_political_power: 0.0,
    },
    LabelInfo {
        display_name: "craftsman",
        development_level: 2,
        relation: Relation::Neither,
        base_political_power: 0.2,
    },
    LabelInfo {
        display_name: "laborer",
        development_level: 2,
        relation: Relation::Exploited,
        base_political_power: 0.0,
    },
    LabelInfo {
        display_name: "elder",
        development_level: 1,
        relation: Relation::Neither,
        base_political_power: 0.3,
    },
    LabelInfo {
        display_name: "chief",
        development_level: 2,
        relation: Relation::Exploiter,
        base_political_power: 0.5,
    },
];

impl ClassLabel {
    fn info(self) -> &'static LabelInfo {
        &LABEL_TABLE[self as usize]
    }

    pub fn display_name(self) -> &'static str {
        self.info().display_name
    }

    /// Ordering used for display and sorting only.
    pub fn development_level(self) -> u8 {
        self.info().development_level
    }

    pub fn is_exploiter(self) -> bool {
        self.info().relation == Relation::Exploiter
    }

    pub fn is_exploited(self) -> bool {
        self.info().relation == Relation::Exploited
    }

    /// Political power a class record starts with when the label first appears.
    pub fn base_political_power(self) -> f64 {
        self.info().base_political_power
    }

    /// Labels that only exist once private property does.
    pub fn marks_class_society(self) -> bool {
        !matches!(self, ClassLabel::None | ClassLabel::CommunalMember)
    }

    pub fn exploiters() -> impl Iterator<Item = ClassLabel> {
        Self::ALL.iter().copied().filter(|l| l.is_exploiter())
    }

    pub fn exploited() -> impl Iterator<Item = ClassLabel> {
        Self::ALL.iter().copied().filter(|l| l.is_exploited())
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

//! Fixed 12-factor risk table
//!
//! Every behavioral proposition is scored against twelve named risk
//! dimensions by the upstream detector. Factor ids (1-12) and names map
//! bijectively; anything outside this table is rejected.

/// Number of risk factors in the fixed table
pub const FACTOR_COUNT: usize = 12;

/// One entry in the fixed factor table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Factor {
    /// Stable numeric identifier (1-12)
    pub id: u8,
    /// Canonical snake_case name
    pub name: &'static str,
    /// Short definition handed to the reasoning service
    pub definition: &'static str,
}

/// The fixed factor table, in id order
pub const FACTORS: [Factor; FACTOR_COUNT] = [
    Factor {
        id: 1,
        name: "identity_mismatch",
        definition: "The proposition asserts an identity or trait the user may not self-identify with.",
    },
    Factor {
        id: 2,
        name: "surveillance",
        definition: "The proposition reveals that the user's activity was observed in a way they may find intrusive.",
    },
    Factor {
        id: 3,
        name: "inferred_intent",
        definition: "The proposition attributes a goal or motivation that was inferred rather than stated.",
    },
    Factor {
        id: 4,
        name: "face_threat",
        definition: "The proposition could embarrass the user or threaten their self-image if surfaced.",
    },
    Factor {
        id: 5,
        name: "over_positive",
        definition: "The proposition is flattering in a way that may be inaccurate or unearned.",
    },
    Factor {
        id: 6,
        name: "opacity",
        definition: "It is unclear from the proposition how the conclusion was reached from the evidence.",
    },
    Factor {
        id: 7,
        name: "generalization",
        definition: "The proposition generalizes from few observations to a broad habitual claim.",
    },
    Factor {
        id: 8,
        name: "privacy",
        definition: "The proposition touches sensitive personal information (health, finances, relationships).",
    },
    Factor {
        id: 9,
        name: "actor_observer",
        definition: "The proposition explains behavior by disposition where the user would cite circumstance.",
    },
    Factor {
        id: 10,
        name: "reputation_risk",
        definition: "The proposition could harm the user's standing if disclosed to others.",
    },
    Factor {
        id: 11,
        name: "ambiguity",
        definition: "The underlying evidence supports several readings and the proposition picked one.",
    },
    Factor {
        id: 12,
        name: "tone_imbalance",
        definition: "The proposition's tone (judgmental, clinical, dismissive) does not match the evidence.",
    },
];

/// Resolve a factor name to its numeric id
///
/// Returns `None` for names outside the fixed table.
pub fn factor_id_from_name(name: &str) -> Option<u8> {
    FACTORS.iter().find(|f| f.name == name).map(|f| f.id)
}

/// Resolve a factor id to its canonical name
pub fn factor_name_from_id(id: u8) -> Option<&'static str> {
    FACTORS.iter().find(|f| f.id == id).map(|f| f.name)
}

/// Check that a numeric id falls within the fixed table
pub fn is_valid_factor_id(id: u8) -> bool {
    (1..=FACTOR_COUNT as u8).contains(&id)
}

/// Definition text for a factor id, for prompt construction
pub fn factor_definition(id: u8) -> Option<&'static str> {
    FACTORS.iter().find(|f| f.id == id).map(|f| f.definition)
}

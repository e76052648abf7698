//! Table catalog and entity relationship diagram
//!
//! Every table in the schema, the tier it belongs to and the tables its key
//! is inherited from.

use std::fmt;

/// How a table is populated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Reference data seeded at deployment and left alone afterwards
    Lookup,
    /// Rows entered by the acquisition software or by hand
    Manual,
    /// Rows owned by a master row and inserted alongside it
    Part,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Lookup => "lookup",
            Tier::Manual => "manual",
            Tier::Part => "part",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TableInfo {
    pub name: &'static str,
    pub tier: Tier,
    /// Tables whose primary key is part of this table's primary key
    pub parents: &'static [&'static str],
    /// Tables referenced from non-key attributes
    pub references: &'static [&'static str],
    pub comment: &'static str,
}

pub const TABLES: &[TableInfo] = &[
    TableInfo {
        name: "liquid_calibration",
        tier: Tier::Manual,
        parents: &[],
        references: &[],
        comment: "Liquid delivery calibration sessions for each probe",
    },
    TableInfo {
        name: "liquid_calibration_pulse_weight",
        tier: Tier::Part,
        parents: &["liquid_calibration"],
        references: &[],
        comment: "Data for volume per pulse duty cycle estimation",
    },
    TableInfo {
        name: "experiment_type",
        tier: Tier::Lookup,
        parents: &[],
        references: &[],
        comment: "Experiment type",
    },
    TableInfo {
        name: "task",
        tier: Tier::Lookup,
        parents: &[],
        references: &["experiment_type"],
        comment: "Behavioral experiment parameters",
    },
    TableInfo {
        name: "mouse_weight",
        tier: Tier::Manual,
        parents: &[],
        references: &[],
        comment: "Weight of the animal",
    },
    TableInfo {
        name: "session",
        tier: Tier::Manual,
        parents: &[],
        references: &[],
        comment: "Behavior session info",
    },
    TableInfo {
        name: "condition",
        tier: Tier::Manual,
        parents: &["session"],
        references: &[],
        comment: "Unique stimulus conditions",
    },
    TableInfo {
        name: "trial",
        tier: Tier::Manual,
        parents: &["session", "condition"],
        references: &[],
        comment: "Trial information",
    },
    TableInfo {
        name: "lick",
        tier: Tier::Manual,
        parents: &["session"],
        references: &[],
        comment: "Lick timestamps",
    },
    TableInfo {
        name: "liquid_delivery",
        tier: Tier::Manual,
        parents: &["session"],
        references: &[],
        comment: "Liquid delivery timestamps",
    },
    TableInfo {
        name: "airpuff_delivery",
        tier: Tier::Manual,
        parents: &["session"],
        references: &[],
        comment: "Air puff delivery timestamps",
    },
    TableInfo {
        name: "movie",
        tier: Tier::Lookup,
        parents: &[],
        references: &[],
        comment: "Movies used for generating clips and stills",
    },
    TableInfo {
        name: "movie_still",
        tier: Tier::Part,
        parents: &["movie"],
        references: &[],
        comment: "Cached still frames from the movie",
    },
    TableInfo {
        name: "movie_clip",
        tier: Tier::Part,
        parents: &["movie"],
        references: &[],
        comment: "Clips from movies",
    },
    TableInfo {
        name: "movie_clip_cond",
        tier: Tier::Manual,
        parents: &["condition"],
        references: &["movie_clip"],
        comment: "Movie clip conditions",
    },
    TableInfo {
        name: "grating_cond",
        tier: Tier::Manual,
        parents: &["condition"],
        references: &[],
        comment: "Orientation gratings conditions",
    },
    TableInfo {
        name: "reward_cond",
        tier: Tier::Manual,
        parents: &["condition"],
        references: &[],
        comment: "Reward probe conditions",
    },
];

pub fn find(name: &str) -> Option<&'static TableInfo> {
    TABLES.iter().find(|t| t.name == name)
}

/// Tables that own rows of `name` through their key
pub fn children(name: &str) -> Vec<&'static TableInfo> {
    TABLES.iter().filter(|t| t.parents.contains(&name)).collect()
}

/// Render the schema as a Graphviz digraph.
///
/// Solid edges are key inheritance, dashed edges are plain references.
pub fn to_dot() -> String {
    let mut out = String::from("digraph behavior {\n    rankdir=TB;\n    node [fontname=\"Helvetica\"];\n");

    for t in TABLES {
        let (shape, style) = match t.tier {
            Tier::Lookup => ("box", "filled,rounded"),
            Tier::Manual => ("box", "filled"),
            Tier::Part => ("plaintext", "solid"),
        };
        out.push_str(&format!(
            "    {} [shape={}, style=\"{}\", tooltip=\"{}\"];\n",
            t.name, shape, style, t.comment
        ));
    }

    for t in TABLES {
        for parent in t.parents {
            out.push_str(&format!("    {} -> {};\n", parent, t.name));
        }
        for reference in t.references {
            out.push_str(&format!("    {} -> {} [style=dashed];\n", reference, t.name));
        }
    }

    out.push_str("}\n");
    out
}

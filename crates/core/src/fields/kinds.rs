//! The closed set of field types understood by the engine.

use serde::{Deserialize, Serialize};

/// Field type name used in declarations (`"type": "repeater"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    /// Single-line string.
    Text,
    /// URL-safe lowercase identifier.
    Slug,
    /// Integer or decimal number.
    Number,
    /// Pair of numbers `[from, to]`.
    Range,
    /// Boolean toggle.
    Checkbox,
    /// One key out of a fixed choice map.
    Select,
    /// List of free-form or restricted strings.
    Chips,
    /// Calendar date as a millisecond timestamp.
    Date,
    /// Time of day as milliseconds since midnight.
    Time,
    /// Point in time as a millisecond timestamp.
    DateTime,
    /// Reference to one record of another collection.
    Record,
    /// References to several records of another collection.
    Records,
    /// List of entries sharing one subfield schema.
    Repeater,
    /// Single nested object with fixed subfields.
    Object,
    /// List of entries whose schema is selected by a `$key` discriminator.
    Structure,
    /// List of named blocks resolved from the block registry.
    Blocks,
}

impl FieldKind {
    pub const ALL: [FieldKind; 16] = [
        Self::Text,
        Self::Slug,
        Self::Number,
        Self::Range,
        Self::Checkbox,
        Self::Select,
        Self::Chips,
        Self::Date,
        Self::Time,
        Self::DateTime,
        Self::Record,
        Self::Records,
        Self::Repeater,
        Self::Object,
        Self::Structure,
        Self::Blocks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Slug => "slug",
            Self::Number => "number",
            Self::Range => "range",
            Self::Checkbox => "checkbox",
            Self::Select => "select",
            Self::Chips => "chips",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "date-time",
            Self::Record => "record",
            Self::Records => "records",
            Self::Repeater => "repeater",
            Self::Object => "object",
            Self::Structure => "structure",
            Self::Blocks => "blocks",
        }
    }

    /// Whether values of this kind contain nested declarations.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Repeater | Self::Object | Self::Structure | Self::Blocks)
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "string" => Ok(Self::Text),
            "slug" => Ok(Self::Slug),
            "number" => Ok(Self::Number),
            "range" => Ok(Self::Range),
            "checkbox" | "switch" => Ok(Self::Checkbox),
            "select" => Ok(Self::Select),
            "chips" | "tags" => Ok(Self::Chips),
            "date" => Ok(Self::Date),
            "time" => Ok(Self::Time),
            "date-time" | "datetime" => Ok(Self::DateTime),
            "record" => Ok(Self::Record),
            "records" => Ok(Self::Records),
            "repeater" => Ok(Self::Repeater),
            "object" => Ok(Self::Object),
            "structure" => Ok(Self::Structure),
            "blocks" => Ok(Self::Blocks),
            _ => Err(format!("unknown field type: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("text".parse::<FieldKind>().unwrap(), FieldKind::Text);
        assert_eq!("datetime".parse::<FieldKind>().unwrap(), FieldKind::DateTime);
        assert_eq!("switch".parse::<FieldKind>().unwrap(), FieldKind::Checkbox);
        assert!("gallery".parse::<FieldKind>().is_err());
    }

    #[test]
    fn test_kind_serde_names_match_display() {
        for kind in FieldKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json.as_str(), Some(kind.as_str()));
        }
    }

    #[test]
    fn test_composite_kinds() {
        let composite: Vec<_> = FieldKind::ALL.iter().filter(|k| k.is_composite()).collect();
        assert_eq!(composite.len(), 4);
    }
}

/// Field separator used when a mapping names none
pub const DEFAULT_SEPARATOR: &str = "\t";

/// Settings of one conversion. Each converter owns its copy; nothing here is global.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeConfig {
    /// Expand choice groups only to the alternative recorded for them. When off, all
    /// alternatives are expanded side by side as optional members.
    pub manage_choices: bool,
    /// Create `minOccurs` instances of every element when its parent is expanded
    pub auto_duplicate: bool,
    /// Check loaded documents against the schema and collect the problems
    pub validate_document: bool,
    /// Attribute holding the target of a reference element when it has no text
    pub reference_attribute: String,
    /// Tag of elements that refer to another element through its `xs:ID`
    pub id_reference_tag: String,
    /// Attribute that identifies elements
    pub id_attribute: String,
}

impl TreeConfig {
    pub fn flattener() -> Self {
        Self {
            manage_choices: false,
            auto_duplicate: false,
            validate_document: false,
            reference_attribute: String::from("ref"),
            id_reference_tag: String::from("refType"),
            id_attribute: String::from("id"),
        }
    }

    pub fn maker() -> Self {
        Self {
            manage_choices: true,
            auto_duplicate: true,
            ..Self::flattener()
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::flattener()
    }
}
